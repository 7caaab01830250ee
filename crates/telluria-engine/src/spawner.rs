//! World bootstrap: the one-time creation of settlements, factions, and
//! the seed population.
//!
//! Bootstrap is the only place crowns enter the world -- the initial
//! endowment is the money supply, and everything after it is transfers.
//! All derived choices come from stable hashes of the world seed, so the
//! same configuration always bootstraps the same world.

use telluria_core::config::EngineConfig;
use telluria_core::state::AgentSeed;
use telluria_core::WorldState;
use telluria_types::{
    stable_hash, AxialCoord, CognitionTier, Faction, FactionId, FactionPreferences, Governance,
    Occupation, Settlement, Sex,
};
use telluria_world::{generate_world, habitable, names};
use tracing::info;

/// Minimum hex distance between seeded settlements.
const SETTLEMENT_SPACING: u32 = 4;

/// Occupation mix for the seed population, weighted toward food producers.
const OCCUPATION_MIX: [Occupation; 16] = [
    Occupation::Farmer,
    Occupation::Farmer,
    Occupation::Farmer,
    Occupation::Fisher,
    Occupation::Fisher,
    Occupation::Hunter,
    Occupation::Miner,
    Occupation::Miner,
    Occupation::Laborer,
    Occupation::Laborer,
    Occupation::Alchemist,
    Occupation::Crafter,
    Occupation::Crafter,
    Occupation::Merchant,
    Occupation::Soldier,
    Occupation::Scholar,
];

/// Create a fresh world from configuration.
#[must_use]
pub fn bootstrap_world(config: &EngineConfig) -> WorldState {
    let seed = config.world.seed;
    let mut world = WorldState::new(seed, generate_world(seed, config.world.radius));

    seed_factions(&mut world);
    let settlement_ids = seed_settlements(&mut world, config.spawn.settlements);
    seed_population(&mut world, config, &settlement_ids);

    world.rebuild_member_index();
    info!(
        seed,
        settlements = settlement_ids.len(),
        population = world.live_population(),
        "world bootstrapped"
    );
    world
}

/// The three founding factions.
fn seed_factions(world: &mut WorldState) {
    let factions = [
        (
            "The Ledger Court",
            FactionPreferences {
                tax: 0.08,
                trade: 0.85,
                military: 0.2,
            },
        ),
        (
            "The Iron Watch",
            FactionPreferences {
                tax: 0.2,
                trade: 0.3,
                military: 0.9,
            },
        ),
        (
            "The Quiet Hand",
            FactionPreferences {
                tax: 0.05,
                trade: 0.4,
                military: 0.1,
            },
        ),
    ];
    for (index, (name, preferences)) in factions.into_iter().enumerate() {
        let id = FactionId::new(index as u64 + 1);
        world
            .factions
            .insert(id, Faction::new(id, name.to_owned(), preferences));
    }
}

/// Place settlements on spaced habitable hexes.
fn seed_settlements(world: &mut WorldState, count: u32) -> Vec<telluria_types::SettlementId> {
    let candidates: Vec<AxialCoord> = world
        .map
        .iter()
        .filter(|hex| habitable(hex))
        .map(|hex| hex.coord)
        .collect();

    let mut chosen: Vec<AxialCoord> = Vec::new();
    for site in candidates {
        if chosen.len() as u32 >= count {
            break;
        }
        if chosen
            .iter()
            .all(|existing| existing.distance(site) >= SETTLEMENT_SPACING)
        {
            chosen.push(site);
        }
    }

    let mut ids = Vec::with_capacity(chosen.len());
    for position in chosen {
        let id = world.allocate_settlement_id();
        let name = names::settlement_name(stable_hash(&[world.seed, id.raw(), 0x5E71]));
        world.settlements.insert(
            id,
            Settlement::found(id, name, position, Governance::Council, 0),
        );
        if let Some(hex) = world.map.get_mut(position) {
            hex.settlement = Some(id);
        }
        ids.push(id);
    }
    ids
}

/// Spawn the seed population across the settlements.
fn seed_population(
    world: &mut WorldState,
    config: &EngineConfig,
    settlement_ids: &[telluria_types::SettlementId],
) {
    if settlement_ids.is_empty() {
        return;
    }
    let named_total = config.spawn.named_agents;
    let mut named_spawned = 0u32;
    let mut spawn_index = 0u64;

    for sid in settlement_ids {
        let position = world.settlements.get(sid).map_or_else(AxialCoord::default, |s| s.position);
        for _ in 0..config.spawn.agents_per_settlement {
            let hash = stable_hash(&[world.seed, spawn_index, 0x5EED]);
            spawn_index += 1;

            let sex = if hash & 1 == 0 { Sex::Female } else { Sex::Male };
            let occupation = OCCUPATION_MIX[(hash >> 4) as usize % OCCUPATION_MIX.len()];

            // ~30 named agents across the world, ~4% archetype-templated,
            // the rest on the rule kernel.
            let tier = if named_spawned < named_total && hash % 29 == 0 {
                named_spawned += 1;
                CognitionTier::Tier2
            } else if hash % 25 == 1 {
                CognitionTier::Tier1
            } else {
                CognitionTier::Tier0
            };

            let id = world.create_agent(AgentSeed {
                name: names::agent_name(hash, sex),
                sex,
                age: 18 + ((hash >> 16) % 35) as u32,
                position,
                home: Some(*sid),
                occupation,
                tier,
                born_tick: 0,
            });
            // The founding endowment: the world's entire money supply.
            if let Some(agent) = world.agents.get_mut(&id) {
                agent.wealth = config.spawn.initial_wealth;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.world.seed = 99;
        config.world.radius = 8;
        config.spawn.settlements = 3;
        config.spawn.agents_per_settlement = 40;
        config.spawn.named_agents = 5;
        config.spawn.initial_wealth = 25;
        config
    }

    #[test]
    fn bootstrap_is_deterministic() {
        let config = test_config();
        let a = bootstrap_world(&config);
        let b = bootstrap_world(&config);
        assert_eq!(
            serde_json::to_vec(&a.snapshot()).unwrap(),
            serde_json::to_vec(&b.snapshot()).unwrap()
        );
    }

    #[test]
    fn bootstrap_seeds_the_configured_shape() {
        let config = test_config();
        let world = bootstrap_world(&config);

        assert_eq!(world.settlements.len(), 3);
        assert_eq!(world.live_population(), 120);
        assert_eq!(world.factions.len(), 3);

        // Every settlement hex points back at its settlement.
        for settlement in world.settlements.values() {
            assert_eq!(
                world.map.get(settlement.position).unwrap().settlement,
                Some(settlement.id)
            );
            assert_eq!(settlement.population, 40);
        }

        // The endowment is the money supply.
        let total: u64 = world.agents.values().map(|a| a.wealth).sum();
        assert_eq!(total, 120 * 25);
    }

    #[test]
    fn tiers_are_distributed() {
        let config = test_config();
        let world = bootstrap_world(&config);
        let tier2 = world
            .agents
            .values()
            .filter(|a| a.tier == CognitionTier::Tier2)
            .count() as u32;
        assert!(tier2 <= config.spawn.named_agents);
        let tier0 = world
            .agents
            .values()
            .filter(|a| a.tier == CognitionTier::Tier0)
            .count();
        assert!(tier0 > 100, "rule-kernel agents should dominate");
    }
}
