use crate::Meter;

/// Window a rate is computed over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RateKind {
    /// Since start.
    Average,
    /// Last minute.
    OneMinute,
    /// Last five minutes.
    FiveMinute,
    /// Last fifteen minutes.
    FifteenMinute,
}

impl RateKind {
    /// Every kind, in [`RateInfo`] field order.
    pub const ALL: [RateKind; 4] = [
        RateKind::Average,
        RateKind::OneMinute,
        RateKind::FiveMinute,
        RateKind::FifteenMinute,
    ];

    /// Length of the window in minutes, `None` for [`RateKind::Average`].
    pub fn minutes(self) -> Option<u32> {
        match self {
            RateKind::Average => None,
            RateKind::OneMinute => Some(1),
            RateKind::FiveMinute => Some(5),
            RateKind::FifteenMinute => Some(15),
        }
    }

    /// The rate of `meter` over this window.
    pub fn rate_of(self, meter: &Meter) -> f64 {
        match self {
            RateKind::Average => meter.mean_rate,
            RateKind::OneMinute => meter.one_minute_rate,
            RateKind::FiveMinute => meter.five_minute_rate,
            RateKind::FifteenMinute => meter.fifteen_minute_rate,
        }
    }
}

/// One value per [`RateKind`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RateInfo {
    /// [`RateKind::Average`]
    pub mean_rate: f64,
    /// [`RateKind::OneMinute`]
    pub one_minute_rate: f64,
    /// [`RateKind::FiveMinute`]
    pub five_minute_rate: f64,
    /// [`RateKind::FifteenMinute`]
    pub fifteen_minute_rate: f64,
}

impl RateInfo {
    /// Evaluate `f` for every kind.
    pub fn from_fn(mut f: impl FnMut(RateKind) -> f64) -> Self {
        Self {
            mean_rate: f(RateKind::Average),
            one_minute_rate: f(RateKind::OneMinute),
            five_minute_rate: f(RateKind::FiveMinute),
            fifteen_minute_rate: f(RateKind::FifteenMinute),
        }
    }

    /// The rates of `meter`.
    pub fn from_meter(meter: &Meter) -> Self {
        Self::from_fn(|kind| kind.rate_of(meter))
    }

    /// The value for `kind`.
    pub fn get(&self, kind: RateKind) -> f64 {
        match kind {
            RateKind::Average => self.mean_rate,
            RateKind::OneMinute => self.one_minute_rate,
            RateKind::FiveMinute => self.five_minute_rate,
            RateKind::FifteenMinute => self.fifteen_minute_rate,
        }
    }
}
