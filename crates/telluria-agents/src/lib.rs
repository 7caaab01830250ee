//! Agent behavior for the Telluria simulation.
//!
//! The minute-level rule kernel (needs decay, priority, action choice), the
//! dual wellbeing register, production against the hex commons, the daily
//! crime pass, and the social passes (pair-ups, families, mentorship,
//! recruitment). Everything here is deterministic: the only randomness is
//! stable hashing of `(id, day)` tuples.
//!
//! Per the engine's propagation policy, nothing in this crate returns an
//! error -- a kernel always produces a valid action or a no-op.

pub mod actions;
pub mod archetype;
pub mod crime;
pub mod decision;
pub mod needs;
pub mod social;
pub mod wellbeing;
pub mod work;

pub use actions::{daily_food_spoilage, eat, forage, socialize_pair, travel_tick};
pub use archetype::{builtin_templates, template_for, ArchetypeTemplate};
pub use crime::{run_daily_crime, CrimeStats};
pub use decision::{decide, AgentAction, DecisionContext};
pub use needs::{decay_needs, dominant_drive, Drive, PRIORITY_THRESHOLD};
pub use social::{run_daily_pairups, run_weekly_social};
pub use wellbeing::{
    alignment_from_coherence, effective_mood, satisfaction, update_wellbeing,
};
pub use work::{perform_work, required_resource, WorkOutcome};
