//! Pressure history and the rising/falling/steady trend.

use std::collections::VecDeque;

/// Span of pressure history the trend is computed over.
const TREND_WINDOW_SECS: i64 = 3 * 60 * 60;

/// Change (mb) over the window beyond which the trend is not steady.
const TREND_THRESHOLD_MB: f64 = 1.0;

/// Direction of barometric pressure over the last three hours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PressureTrend {
    Rising,
    Falling,
    #[default]
    Steady,
}

impl PressureTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            PressureTrend::Rising => "rising",
            PressureTrend::Falling => "falling",
            PressureTrend::Steady => "steady",
        }
    }
}

impl std::fmt::Display for PressureTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time-ordered pressure samples covering the trend window.
#[derive(Debug, Default)]
pub struct PressureHistory {
    samples: VecDeque<(i64, f64)>,
}

impl PressureHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample taken at `epoch` seconds and return the new trend.
    ///
    /// Samples older than the window, measured from `epoch`, are dropped.
    /// A sample older than the newest one already held restarts the history,
    /// which covers a hub clock that jumped backwards.
    pub fn record(&mut self, epoch: i64, pressure: f64) -> PressureTrend {
        if let Some(&(newest, _)) = self.samples.back() {
            if epoch < newest {
                self.samples.clear();
            }
        }
        self.samples.push_back((epoch, pressure));

        while let Some(&(oldest, _)) = self.samples.front() {
            if epoch - oldest > TREND_WINDOW_SECS {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        self.trend()
    }

    /// Pressure change between the oldest and newest sample in the window.
    pub fn delta(&self) -> f64 {
        match (self.samples.front(), self.samples.back()) {
            (Some(&(_, first)), Some(&(_, last))) => last - first,
            _ => 0.0,
        }
    }

    pub fn trend(&self) -> PressureTrend {
        let delta = self.delta();
        if delta > TREND_THRESHOLD_MB {
            PressureTrend::Rising
        } else if delta < -TREND_THRESHOLD_MB {
            PressureTrend::Falling
        } else {
            PressureTrend::Steady
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
