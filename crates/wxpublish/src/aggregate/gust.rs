//! Maximum-hold gust tracking over a fixed number of summary samples.

/// Number of counted wind samples per gust hold interval.
pub const GUST_INTERVAL: u32 = 30;

/// A wind sample: speed (m/s) and direction (degrees).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gust {
    pub speed: f64,
    pub direction: f64,
}

/// Maximum-hold tracker for wind gusts.
///
/// Holds the strongest sample seen in the current interval. Only counted
/// samples ([`observe`](Self::observe), one per sky summary) advance the
/// interval; every [`GUST_INTERVAL`]-th one ends it and becomes the held
/// value outright, whatever its speed, so an old peak cannot be held
/// forever. Rapid-wind samples go through [`hold`](Self::hold) and can only
/// raise the held value.
#[derive(Debug, Clone, Default)]
pub struct GustTracker {
    held: Gust,
    count: u32,
}

impl GustTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a counted sample, ending the interval on every
    /// [`GUST_INTERVAL`]-th one.
    pub fn observe(&mut self, speed: f64, direction: f64) {
        let sample = Gust { speed, direction };
        self.count += 1;
        if self.count >= GUST_INTERVAL {
            self.held = sample;
            self.count = 0;
        } else if speed > self.held.speed {
            self.held = sample;
        }
    }

    /// Raise the held gust if `speed` beats it. Does not advance the interval.
    pub fn hold(&mut self, speed: f64, direction: f64) {
        if speed > self.held.speed {
            self.held = Gust { speed, direction };
        }
    }

    pub fn current(&self) -> Gust {
        self.held
    }

    /// Samples observed since the last interval reset.
    pub fn count(&self) -> u32 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_the_maximum_within_an_interval() {
        let mut tracker = GustTracker::new();
        tracker.observe(3.0, 10.0);
        tracker.observe(7.0, 20.0);
        tracker.observe(5.0, 30.0);
        assert_eq!(
            tracker.current(),
            Gust {
                speed: 7.0,
                direction: 20.0
            }
        );
    }

    #[test]
    fn interval_boundary_resets_to_latest_sample_not_zero() {
        let mut tracker = GustTracker::new();
        // Strongest sample first, then steadily weaker ones with distinct directions.
        for i in 0..GUST_INTERVAL {
            tracker.observe(20.0 - i as f64 * 0.5, i as f64 * 10.0);
        }
        let last = GUST_INTERVAL - 1;
        assert_eq!(
            tracker.current(),
            Gust {
                speed: 20.0 - last as f64 * 0.5,
                direction: last as f64 * 10.0
            }
        );
        assert_eq!(tracker.count(), 0);
    }

    #[test]
    fn new_interval_tracks_maximum_again() {
        let mut tracker = GustTracker::new();
        for _ in 0..GUST_INTERVAL {
            tracker.observe(1.0, 0.0);
        }
        tracker.observe(0.5, 90.0);
        assert_eq!(tracker.current().speed, 1.0);
        tracker.observe(4.0, 180.0);
        assert_eq!(
            tracker.current(),
            Gust {
                speed: 4.0,
                direction: 180.0
            }
        );
    }

    #[test]
    fn held_samples_do_not_advance_the_interval() {
        let mut tracker = GustTracker::new();
        tracker.observe(20.0, 90.0);
        for _ in 0..GUST_INTERVAL * 2 {
            tracker.hold(2.0, 180.0);
        }
        assert_eq!(tracker.count(), 1);
        assert_eq!(tracker.current().speed, 20.0);

        tracker.hold(25.0, 200.0);
        assert_eq!(
            tracker.current(),
            Gust {
                speed: 25.0,
                direction: 200.0
            }
        );
    }
}
