//! The dual wellbeing register and the soul's state of being.
//!
//! Wellbeing has two components. `satisfaction` is a needs-weighted scalar --
//! survival carries the heaviest weight -- mapped onto `[-1, 1]`. `alignment`
//! is a function of coherence alone, in three phases: a shallow embodied
//! slope at low coherence, a "dark night" valley through the middle band,
//! and a steep surge at high coherence. The blend weight grows with the
//! square of coherence, so material satisfaction dominates ordinary lives
//! and alignment dominates the few who approach liberation.
//!
//! Migration and birth logic that concerns material survival reads
//! `satisfaction`; existential decisions read `effective_mood`.

use telluria_types::{
    clamp_signed, Agent, NeedsState, SoulState, BEING, MATTER, PSYCHE, TOTALITY,
};

/// Satisfaction weights over (survival, safety, belonging, esteem, purpose).
const SATISFACTION_WEIGHTS: [f64; 5] = [BEING, 1.0, MATTER, PSYCHE, PSYCHE];

/// Coherence at which the dark-night valley begins.
const VALLEY_START: f64 = PSYCHE;

/// Coherence at which the surge begins.
const SURGE_START: f64 = MATTER;

/// Alignment where the embodied slope ends (-Psyche²).
const EMBODIED_END: f64 = -(PSYCHE * PSYCHE);

/// Alignment at the bottom of the valley (-(Psyche + Psyche²)).
const VALLEY_FLOOR: f64 = -(PSYCHE + PSYCHE * PSYCHE);

/// Coherence threshold for the Liberated state of being.
pub const LIBERATION_THRESHOLD: f64 = MATTER + PSYCHE * MATTER;

/// Needs-weighted satisfaction in `[-1, 1]`.
#[must_use]
pub fn satisfaction(needs: &NeedsState) -> f64 {
    let total_weight: f64 = SATISFACTION_WEIGHTS.iter().sum();
    let weighted = needs.survival * SATISFACTION_WEIGHTS[0]
        + needs.safety * SATISFACTION_WEIGHTS[1]
        + needs.belonging * SATISFACTION_WEIGHTS[2]
        + needs.esteem * SATISFACTION_WEIGHTS[3]
        + needs.purpose * SATISFACTION_WEIGHTS[4];
    clamp_signed(2.0 * (weighted / total_weight) - 1.0)
}

/// Alignment as a function of coherence: embodied slope, dark-night valley,
/// surge.
#[must_use]
pub fn alignment_from_coherence(coherence: f64) -> f64 {
    let c = coherence.clamp(0.0, 1.0);
    if c < VALLEY_START {
        // Gentle rise from -Psyche toward -Psyche².
        c * MATTER - PSYCHE
    } else if c < SURGE_START {
        // The dark night: deeper the further one goes.
        EMBODIED_END - (c - VALLEY_START) * BEING
    } else {
        // Surge out of the valley toward +1.
        clamp_signed(VALLEY_FLOOR + (c - SURGE_START) * TOTALITY)
    }
}

/// The coherence-dependent blend weight `w = c² · Matter`.
#[must_use]
pub fn mood_weight(coherence: f64) -> f64 {
    coherence.clamp(0.0, 1.0).powi(2) * MATTER
}

/// Blend satisfaction and alignment into the effective mood.
#[must_use]
pub fn effective_mood(satisfaction: f64, alignment: f64, coherence: f64) -> f64 {
    let w = mood_weight(coherence);
    clamp_signed((1.0 - w) * satisfaction + w * alignment)
}

/// The state of being implied by a coherence value.
#[must_use]
pub fn soul_state_for(coherence: f64) -> SoulState {
    if coherence >= LIBERATION_THRESHOLD {
        SoulState::Liberated
    } else if coherence >= MATTER {
        SoulState::Centered
    } else {
        SoulState::Embodied
    }
}

/// Recompute an agent's wellbeing register and soul state from needs and
/// coherence, clamping everything.
pub fn update_wellbeing(agent: &mut Agent) {
    agent.needs.clamp();
    agent.soul.coherence = agent.soul.coherence.clamp(0.0, 1.0);

    agent.wellbeing.satisfaction = satisfaction(&agent.needs);
    agent.wellbeing.alignment = alignment_from_coherence(agent.soul.coherence);
    agent.wellbeing.effective_mood = effective_mood(
        agent.wellbeing.satisfaction,
        agent.wellbeing.alignment,
        agent.soul.coherence,
    );
    agent.soul.state = soul_state_for(agent.soul.coherence);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::NeedsState;

    use super::*;

    #[test]
    fn satisfaction_spans_the_signed_interval() {
        let starving = NeedsState {
            survival: 0.0,
            safety: 0.0,
            belonging: 0.0,
            esteem: 0.0,
            purpose: 0.0,
        };
        let flourishing = NeedsState {
            survival: 1.0,
            safety: 1.0,
            belonging: 1.0,
            esteem: 1.0,
            purpose: 1.0,
        };
        assert!((satisfaction(&starving) + 1.0).abs() < 1e-12);
        assert!((satisfaction(&flourishing) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn survival_carries_the_heaviest_weight() {
        let hungry = NeedsState {
            survival: 0.0,
            safety: 1.0,
            belonging: 1.0,
            esteem: 1.0,
            purpose: 1.0,
        };
        let lonely = NeedsState {
            survival: 1.0,
            safety: 1.0,
            belonging: 0.0,
            esteem: 1.0,
            purpose: 1.0,
        };
        assert!(satisfaction(&hungry) < satisfaction(&lonely));
    }

    #[test]
    fn alignment_has_a_dark_night_valley() {
        let low = alignment_from_coherence(0.2);
        let valley = alignment_from_coherence(0.55);
        let high = alignment_from_coherence(0.95);
        assert!(valley < low, "valley {valley} not below embodied {low}");
        assert!(high > 0.5, "surge {high} too weak");
    }

    #[test]
    fn alignment_phases_join_without_jumps() {
        let eps = 1e-9;
        let at_valley = alignment_from_coherence(VALLEY_START);
        let before_valley = alignment_from_coherence(VALLEY_START - eps);
        assert!((at_valley - before_valley).abs() < 1e-6);

        let at_surge = alignment_from_coherence(SURGE_START);
        let before_surge = alignment_from_coherence(SURGE_START - eps);
        assert!((at_surge - before_surge).abs() < 1e-6);
    }

    #[test]
    fn low_coherence_mood_tracks_satisfaction() {
        let mood = effective_mood(0.8, -0.5, 0.05);
        assert!((mood - 0.8).abs() < 0.01);
    }

    #[test]
    fn high_coherence_mood_tracks_alignment() {
        let w = mood_weight(1.0);
        assert!((w - MATTER).abs() < 1e-12);
        let mood = effective_mood(-0.5, 1.0, 1.0);
        assert!(mood > 0.0, "alignment should dominate: {mood}");
    }

    #[test]
    fn soul_state_thresholds() {
        assert_eq!(soul_state_for(0.1), SoulState::Embodied);
        assert_eq!(soul_state_for(MATTER), SoulState::Centered);
        assert_eq!(soul_state_for(0.99), SoulState::Liberated);
    }
}
