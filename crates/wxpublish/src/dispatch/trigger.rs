//! Decides when a complete set of readings is ready to publish.

use crate::packet::PacketKind;

const PRIMARY: u8 = 0b01;
const SUMMARY: u8 = 0b10;
const READY: u8 = PRIMARY | SUMMARY;

/// Readiness signal for a publish cycle.
///
/// One bit per packet kind a complete snapshot needs. The trigger fires
/// on the packet that completes the set and starts the next cycle empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchTrigger {
    seen: u8,
}

impl DispatchTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a packet of `kind` was applied. Returns `true` when the
    /// trigger fires.
    pub fn mark(&mut self, kind: PacketKind) -> bool {
        self.seen |= match kind {
            PacketKind::PrimaryEnvironment => PRIMARY,
            PacketKind::WindRainSummary => SUMMARY,
            _ => 0,
        };

        if self.seen == READY {
            self.seen = 0;
            true
        } else {
            false
        }
    }

    /// True when at least one required kind has been seen this cycle.
    pub fn is_pending(&self) -> bool {
        self.seen != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_both_kinds_are_seen() {
        let mut trigger = DispatchTrigger::new();
        assert!(!trigger.mark(PacketKind::PrimaryEnvironment));
        assert!(trigger.is_pending());
        assert!(trigger.mark(PacketKind::WindRainSummary));
        assert!(!trigger.is_pending());
    }

    #[test]
    fn order_does_not_matter() {
        let mut trigger = DispatchTrigger::new();
        assert!(!trigger.mark(PacketKind::WindRainSummary));
        assert!(trigger.mark(PacketKind::PrimaryEnvironment));
    }

    #[test]
    fn repeats_of_one_kind_do_not_fire() {
        let mut trigger = DispatchTrigger::new();
        for _ in 0..5 {
            assert!(!trigger.mark(PacketKind::PrimaryEnvironment));
        }
        assert!(trigger.mark(PacketKind::WindRainSummary));
        // Next cycle starts empty.
        assert!(!trigger.mark(PacketKind::WindRainSummary));
    }

    #[test]
    fn other_kinds_are_ignored() {
        let mut trigger = DispatchTrigger::new();
        for kind in [
            PacketKind::InstantWind,
            PacketKind::LightningStrike,
            PacketKind::RainStart,
            PacketKind::DeviceStatus,
            PacketKind::HubStatus,
            PacketKind::Auxiliary,
            PacketKind::Unknown,
        ] {
            assert!(!trigger.mark(kind));
        }
        assert!(!trigger.is_pending());
    }
}
