//! Tier-1 archetype templates.
//!
//! A template perturbs the rule kernel: a bias vector shifts how urgent each
//! need feels, and an optional favored action replaces the default work
//! drive. Templates refresh weekly from an external oracle; the built-in set
//! is the deterministic fallback. A Tier-1 agent's template for the week is
//! a stable hash of `(agent, week)`.

use serde::{Deserialize, Serialize};
use telluria_types::{stable_hash, ActionKind, AgentId, Need, AGNOSIS, PSYCHE};

/// A weekly behavioral template for Tier-1 agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeTemplate {
    /// Template name, for observers and logs.
    pub name: String,
    /// Additive bias over (survival, safety, belonging, esteem, purpose);
    /// negative values make a need feel more urgent.
    pub need_bias: [f64; Need::COUNT],
    /// Action taken instead of the default work drive, if set.
    pub favored: Option<ActionKind>,
}

/// The built-in template set used when no oracle refresh has arrived.
#[must_use]
pub fn builtin_templates() -> Vec<ArchetypeTemplate> {
    vec![
        ArchetypeTemplate {
            name: String::from("Striver"),
            need_bias: [0.0, 0.0, 0.0, -PSYCHE * 0.2, 0.0],
            favored: None,
        },
        ArchetypeTemplate {
            name: String::from("Hearthkeeper"),
            need_bias: [0.0, 0.0, -PSYCHE * 0.3, 0.0, 0.0],
            favored: Some(ActionKind::Socialize),
        },
        ArchetypeTemplate {
            name: String::from("Hoarder"),
            need_bias: [-AGNOSIS * 0.3, -AGNOSIS * 0.3, 0.0, 0.0, 0.0],
            favored: None,
        },
        ArchetypeTemplate {
            name: String::from("Ascetic"),
            need_bias: [0.0, 0.0, 0.0, AGNOSIS, -PSYCHE * 0.3],
            favored: Some(ActionKind::Work),
        },
        ArchetypeTemplate {
            name: String::from("Wanderer"),
            need_bias: [0.0, AGNOSIS, 0.0, 0.0, -AGNOSIS * 0.5],
            favored: Some(ActionKind::Forage),
        },
    ]
}

/// Pick an agent's template for the week.
///
/// Returns `None` only when the template set is empty.
#[must_use]
pub fn template_for(
    agent: AgentId,
    week: u64,
    templates: &[ArchetypeTemplate],
) -> Option<&ArchetypeTemplate> {
    if templates.is_empty() {
        return None;
    }
    let idx = stable_hash(&[agent.raw(), week, 0xA2C4]) as usize % templates.len();
    templates.get(idx)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn assignment_is_stable_within_a_week() {
        let templates = builtin_templates();
        let a = template_for(AgentId::new(9), 4, &templates).unwrap();
        let b = template_for(AgentId::new(9), 4, &templates).unwrap();
        assert_eq!(a.name, b.name);
    }

    #[test]
    fn assignment_rotates_across_weeks() {
        let templates = builtin_templates();
        let names: std::collections::BTreeSet<&str> = (0..20)
            .filter_map(|week| template_for(AgentId::new(9), week, &templates))
            .map(|t| t.name.as_str())
            .collect();
        assert!(names.len() > 1, "template never rotated");
    }

    #[test]
    fn empty_set_yields_none() {
        assert!(template_for(AgentId::new(1), 0, &[]).is_none());
    }
}
