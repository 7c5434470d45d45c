use std::{collections::HashMap, sync::RwLock};

/// Read-only view of one meter: an event count plus exponentially weighted
/// per-second rates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Meter {
    /// Events recorded since start.
    pub count: u64,
    /// Events per second since start.
    pub mean_rate: f64,
    /// Events per second over the last minute.
    pub one_minute_rate: f64,
    /// Events per second over the last five minutes.
    pub five_minute_rate: f64,
    /// Events per second over the last fifteen minutes.
    pub fifteen_minute_rate: f64,
}

/// Meters read by the block chain aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricsKey {
    /// One event per applied transaction.
    BlockchainTps,
    /// Milliseconds spent processing blocks.
    BlockProcessTime,
    /// One event per processed block.
    BlockCount,
}

/// Source of process-wide meters, updated elsewhere.
pub trait MeterSource {
    /// Current state of the meter for `key`.
    fn meter(&self, key: MetricsKey) -> Meter;
}

impl<M: MeterSource + ?Sized> MeterSource for &M {
    fn meter(&self, key: MetricsKey) -> Meter {
        (**self).meter(key)
    }
}

/// In-process [`MeterSource`] whose meters are set explicitly. Unset meters
/// read as zero.
#[derive(Debug, Default)]
pub struct MemoryMeters {
    meters: RwLock<HashMap<MetricsKey, Meter>>,
}

impl MemoryMeters {
    /// No meters set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the meter for `key`.
    pub fn set(&self, key: MetricsKey, meter: Meter) {
        let mut meters = self
            .meters
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        meters.insert(key, meter);
    }
}

impl MeterSource for MemoryMeters {
    fn meter(&self, key: MetricsKey) -> Meter {
        let meters = self
            .meters
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        meters.get(&key).copied().unwrap_or_default()
    }
}
