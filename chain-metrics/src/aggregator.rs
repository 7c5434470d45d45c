use crate::{
    BlockHeaderInfo, MeterSource, MetricsKey, RateInfo, RateKind, VersionTracker,
    WitnessDirectory, WitnessInfo,
};

/// Block chain metrics derived from a [`MeterSource`].
///
/// Owns the producer version table; create one per node and hand out
/// references to it.
#[derive(Debug)]
pub struct BlockChainMetrics<M> {
    meters: M,
    versions: VersionTracker,
}

impl<M: MeterSource> BlockChainMetrics<M> {
    /// Aggregator over `meters` with an empty version table.
    pub fn new(meters: M) -> Self {
        Self {
            meters,
            versions: VersionTracker::new(),
        }
    }

    /// The version table.
    pub fn versions(&self) -> &VersionTracker {
        &self.versions
    }

    /// Record the producer version of an applied block.
    pub fn apply_block(&mut self, header: &BlockHeaderInfo, directory: &impl WitnessDirectory) {
        self.versions.observe(header, directory);
    }

    /// Active producers whose latest block is not on the highest version
    /// seen.
    pub fn not_upgraded<A: AsRef<[u8]>>(&self, active: &[A]) -> Vec<WitnessInfo> {
        self.versions.not_upgraded(active)
    }

    /// Average processing time per block over `kind`'s window.
    ///
    /// [`RateKind::Average`] divides the total processing time by the block
    /// count. The windowed kinds divide the rounded event totals of the two
    /// meters over the window. No blocks, or no blocks in the window, gives
    /// `0.0`.
    pub fn average_block_process_time(&self, kind: RateKind) -> f64 {
        let process_time = self.meters.meter(MetricsKey::BlockProcessTime);
        let blocks = self.meters.meter(MetricsKey::BlockCount);
        if blocks.count == 0 {
            return 0.0;
        }

        let (time, count) = match kind.minutes() {
            None => (process_time.count as f64, blocks.count as f64),
            Some(minutes) => {
                let seconds = f64::from(minutes) * 60.0;
                (
                    (kind.rate_of(&process_time) * seconds).round(),
                    (kind.rate_of(&blocks) * seconds).round(),
                )
            }
        };
        if count == 0.0 { 0.0 } else { time / count }
    }

    /// [`average_block_process_time`](Self::average_block_process_time) for
    /// every window.
    pub fn block_process_time(&self) -> RateInfo {
        RateInfo::from_fn(|kind| self.average_block_process_time(kind))
    }

    /// Transactions per second.
    pub fn transaction_rate(&self) -> RateInfo {
        RateInfo::from_meter(&self.meters.meter(MetricsKey::BlockchainTps))
    }
}

#[cfg(test)]
mod tests {
    use crate::{MemoryMeters, Meter};

    use super::*;

    fn meters() -> MemoryMeters {
        let meters = MemoryMeters::new();
        meters.set(
            MetricsKey::BlockProcessTime,
            Meter {
                count: 9_000,
                mean_rate: 30.0,
                one_minute_rate: 25.0,
                five_minute_rate: 20.0,
                fifteen_minute_rate: 0.5,
            },
        );
        meters.set(
            MetricsKey::BlockCount,
            Meter {
                count: 300,
                mean_rate: 1.0 / 3.0,
                one_minute_rate: 1.0 / 3.0,
                five_minute_rate: 0.25,
                fifteen_minute_rate: 0.0001,
            },
        );
        meters.set(
            MetricsKey::BlockchainTps,
            Meter {
                count: 12_345,
                mean_rate: 41.0,
                one_minute_rate: 40.0,
                five_minute_rate: 39.0,
                fifteen_minute_rate: 38.0,
            },
        );
        meters
    }

    #[test]
    fn block_process_time_per_window() {
        let metrics = BlockChainMetrics::new(meters());
        let info = metrics.block_process_time();

        // 9000 ms over 300 blocks.
        assert_eq!(info.mean_rate, 30.0);
        // 1500 ms over 20 blocks.
        assert_eq!(info.one_minute_rate, 75.0);
        // 6000 ms over 75 blocks.
        assert_eq!(info.five_minute_rate, 80.0);
        // 0.0001 * 900 rounds to zero blocks.
        assert_eq!(info.fifteen_minute_rate, 0.0);
    }

    #[test]
    fn no_blocks_gives_zero() {
        let metrics = BlockChainMetrics::new(MemoryMeters::new());
        assert_eq!(metrics.block_process_time(), RateInfo::default());
        assert_eq!(metrics.average_block_process_time(RateKind::Average), 0.0);
    }

    #[test]
    fn transaction_rate_reads_tps_meter() {
        let meters = meters();
        let metrics = BlockChainMetrics::new(&meters);
        assert_eq!(
            metrics.transaction_rate(),
            RateInfo {
                mean_rate: 41.0,
                one_minute_rate: 40.0,
                five_minute_rate: 39.0,
                fifteen_minute_rate: 38.0,
            }
        );
    }

    #[test]
    fn apply_block_feeds_version_table() {
        let mut metrics = BlockChainMetrics::new(MemoryMeters::new());
        let directory = |address: &[u8]| address != b"unknown";
        for (address, version) in [
            (b"a".to_vec(), 1),
            (b"b".to_vec(), 2),
            (b"unknown".to_vec(), 3),
        ] {
            metrics.apply_block(
                &BlockHeaderInfo {
                    witness_address: address,
                    version,
                },
                &directory,
            );
        }

        assert_eq!(metrics.versions().current_version(), 3);
        let laggards = metrics.not_upgraded(&[b"a".to_vec(), b"b".to_vec(), b"unknown".to_vec()]);
        assert_eq!(laggards.len(), 2);
        assert_eq!(laggards[0].address, b"a".to_vec());
        assert_eq!(laggards[1].version, 2);
    }
}
