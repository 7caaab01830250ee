//! Per-minute needs decay and drive selection.
//!
//! Each need decays at its own Φ-scaled rate every tick. Safety decays
//! fastest -- security is the first thing the world erodes -- and belonging
//! slowest. The drive for the minute is the worst need below the priority
//! threshold, or the default work drive when nothing is urgent.

use telluria_types::{Need, NeedsState, AGNOSIS, MATTER, PSYCHE};

/// A need is only prioritized once it falls below this value.
pub const PRIORITY_THRESHOLD: f64 = 0.3;

/// Per-tick decay of survival.
pub const SURVIVAL_DECAY: f64 = PSYCHE * 0.000_5;

/// Per-tick decay of safety -- the fastest.
pub const SAFETY_DECAY: f64 = MATTER * 0.000_5;

/// Per-tick decay of belonging -- the slowest.
pub const BELONGING_DECAY: f64 = AGNOSIS * 0.000_2;

/// Per-tick decay of esteem.
pub const ESTEEM_DECAY: f64 = PSYCHE * 0.000_3;

/// Per-tick decay of purpose.
pub const PURPOSE_DECAY: f64 = AGNOSIS * 0.000_4;

/// What an agent is moved to do this minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drive {
    /// A need fell below the priority threshold.
    Need(Need),
    /// Nothing urgent; the default drive is work.
    Work,
}

/// Apply one tick of needs decay.
pub fn decay_needs(needs: &mut NeedsState) {
    needs.adjust(Need::Survival, -SURVIVAL_DECAY);
    needs.adjust(Need::Safety, -SAFETY_DECAY);
    needs.adjust(Need::Belonging, -BELONGING_DECAY);
    needs.adjust(Need::Esteem, -ESTEEM_DECAY);
    needs.adjust(Need::Purpose, -PURPOSE_DECAY);
}

/// The dominant drive for this minute.
///
/// An optional archetype bias vector shifts each need's effective value
/// before comparison (a negative bias makes the need feel more urgent).
#[must_use]
pub fn dominant_drive(needs: &NeedsState, bias: Option<&[f64; Need::COUNT]>) -> Drive {
    let mut worst: Option<(Need, f64)> = None;
    for need in Need::ALL {
        let mut value = needs.get(need);
        if let Some(bias) = bias {
            value += bias[need.index()];
        }
        if value < PRIORITY_THRESHOLD
            && worst.is_none_or(|(_, current)| value < current)
        {
            worst = Some((need, value));
        }
    }
    worst.map_or(Drive::Work, |(need, _)| Drive::Need(need))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn safety_decays_fastest_belonging_slowest() {
        assert!(SAFETY_DECAY > SURVIVAL_DECAY);
        assert!(SAFETY_DECAY > ESTEEM_DECAY);
        assert!(BELONGING_DECAY < PURPOSE_DECAY);
        assert!(BELONGING_DECAY < ESTEEM_DECAY);
    }

    #[test]
    fn decay_moves_all_needs_down() {
        let mut needs = NeedsState::default();
        let before = needs;
        decay_needs(&mut needs);
        for need in Need::ALL {
            assert!(needs.get(need) < before.get(need), "{need:?} did not decay");
        }
    }

    #[test]
    fn contented_agent_defaults_to_work() {
        let needs = NeedsState {
            survival: 0.9,
            safety: 0.9,
            belonging: 0.9,
            esteem: 0.9,
            purpose: 0.9,
        };
        assert_eq!(dominant_drive(&needs, None), Drive::Work);
    }

    #[test]
    fn worst_need_wins() {
        let needs = NeedsState {
            survival: 0.2,
            safety: 0.1,
            belonging: 0.9,
            esteem: 0.9,
            purpose: 0.9,
        };
        assert_eq!(dominant_drive(&needs, None), Drive::Need(Need::Safety));
    }

    #[test]
    fn bias_can_reprioritize() {
        let needs = NeedsState {
            survival: 0.9,
            safety: 0.9,
            belonging: 0.35,
            esteem: 0.9,
            purpose: 0.9,
        };
        // Unbiased, belonging sits above the threshold.
        assert_eq!(dominant_drive(&needs, None), Drive::Work);
        // A belonging-hungry archetype feels it as urgent.
        let bias = [0.0, 0.0, -0.1, 0.0, 0.0];
        assert_eq!(dominant_drive(&needs, Some(&bias)), Drive::Need(Need::Belonging));
    }
}
