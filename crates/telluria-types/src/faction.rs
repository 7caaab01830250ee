//! Factions: treasuries, preferences, influence, and inter-faction relations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{FactionId, SettlementId};

/// What a faction pushes for when it holds influence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactionPreferences {
    /// Preferred settlement tax rate in `[0, 0.3]`.
    pub tax: f64,
    /// Weight on trade and markets in `[0, 1]`.
    pub trade: f64,
    /// Weight on soldiery and walls in `[0, 1]`.
    pub military: f64,
}

/// A faction spanning settlements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Faction {
    /// Stable identifier.
    pub id: FactionId,
    /// Faction name.
    pub name: String,
    /// Treasury in crowns, fed by weekly dues and revolution seizures.
    pub treasury: u64,
    /// Policy preferences.
    pub preferences: FactionPreferences,
    /// Influence per settlement, 0–100.
    pub influence: BTreeMap<SettlementId, f64>,
    /// Relations with other factions, -100…+100.
    pub relations: BTreeMap<FactionId, f64>,
}

impl Faction {
    /// Create a faction with empty influence and relations maps.
    #[must_use]
    pub const fn new(id: FactionId, name: String, preferences: FactionPreferences) -> Self {
        Self {
            id,
            name,
            treasury: 0,
            preferences,
            influence: BTreeMap::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Influence held in a settlement (0 when untracked).
    #[must_use]
    pub fn influence_in(&self, settlement: SettlementId) -> f64 {
        self.influence.get(&settlement).copied().unwrap_or(0.0)
    }

    /// Set influence in a settlement, clamped to 0–100.
    pub fn set_influence(&mut self, settlement: SettlementId, value: f64) {
        self.influence.insert(settlement, value.clamp(0.0, 100.0));
    }

    /// Adjust relations with another faction, clamped to -100…+100.
    pub fn adjust_relation(&mut self, other: FactionId, delta: f64) {
        let entry = self.relations.entry(other).or_insert(0.0);
        *entry = (*entry + delta).clamp(-100.0, 100.0);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_faction() -> Faction {
        Faction::new(
            FactionId::new(1),
            String::from("The Ledger Court"),
            FactionPreferences {
                tax: 0.1,
                trade: 0.9,
                military: 0.2,
            },
        )
    }

    #[test]
    fn influence_clamps_to_hundred() {
        let mut faction = test_faction();
        faction.set_influence(SettlementId::new(3), 250.0);
        assert!((faction.influence_in(SettlementId::new(3)) - 100.0).abs() < f64::EPSILON);
        assert!(faction.influence_in(SettlementId::new(4)).abs() < f64::EPSILON);
    }

    #[test]
    fn relations_clamp_symmetrically() {
        let mut faction = test_faction();
        faction.adjust_relation(FactionId::new(2), -500.0);
        assert!((faction.relations[&FactionId::new(2)] + 100.0).abs() < f64::EPSILON);
    }
}
