//! End-to-end invariants over the whole engine.
//!
//! These tests drive real worlds through thousands of ticks and hold the
//! quantified invariants: determinism, crown conservation, price bands,
//! resource and health bounds, settlement/index consistency, dead-agent
//! immutability, and the snapshot fixpoint under live activity.

#![allow(clippy::unwrap_used)]

use telluria_core::state::AgentSeed;
use telluria_core::stats::world_crowns;
use telluria_core::tick::{run_tick, TickInputs};
use telluria_core::WorldState;
use telluria_types::{
    AxialCoord, CognitionTier, Faction, FactionId, FactionPreferences, Governance, Occupation,
    Settlement, SettlementId, Sex, AGNOSIS, TICKS_PER_DAY, TOTALITY,
};
use telluria_world::{generate_world, habitable, DeterministicWeather};

/// Build a deterministic three-settlement world with a mixed population.
fn build_world(seed: u64) -> WorldState {
    let mut world = WorldState::new(seed, generate_world(seed, 8));

    // Three settlements on habitable hexes, spread apart.
    let sites: Vec<AxialCoord> = world
        .map
        .iter()
        .filter(|hex| habitable(hex))
        .map(|hex| hex.coord)
        .collect();
    let mut chosen: Vec<AxialCoord> = Vec::new();
    for site in sites {
        if chosen.iter().all(|c| c.distance(site) >= 4) {
            chosen.push(site);
        }
        if chosen.len() == 3 {
            break;
        }
    }
    assert!(chosen.len() >= 2, "seed {seed} produced too little land");

    let occupations = [
        Occupation::Farmer,
        Occupation::Farmer,
        Occupation::Fisher,
        Occupation::Hunter,
        Occupation::Miner,
        Occupation::Laborer,
        Occupation::Alchemist,
        Occupation::Crafter,
        Occupation::Merchant,
        Occupation::Soldier,
        Occupation::Scholar,
    ];

    let mut settlement_ids = Vec::new();
    for position in &chosen {
        let sid = world.allocate_settlement_id();
        world.settlements.insert(
            sid,
            Settlement::found(sid, format!("Town {sid}"), *position, Governance::Council, 0),
        );
        if let Some(hex) = world.map.get_mut(*position) {
            hex.settlement = Some(sid);
        }
        settlement_ids.push(sid);
    }

    for (s_index, sid) in settlement_ids.iter().enumerate() {
        let position = world.settlements[sid].position;
        for i in 0..40u32 {
            let occupation = occupations[(i as usize) % occupations.len()];
            let tier = if s_index == 0 && i < 3 {
                CognitionTier::Tier2
            } else if i % 20 == 5 {
                CognitionTier::Tier1
            } else {
                CognitionTier::Tier0
            };
            let id = world.create_agent(AgentSeed {
                name: format!("Seed {s_index}-{i}"),
                sex: if i % 2 == 0 { Sex::Female } else { Sex::Male },
                age: 18 + (i % 35),
                position,
                home: Some(*sid),
                occupation,
                tier,
                born_tick: 0,
            });
            // The world's money supply is endowed once, here.
            world.agents.get_mut(&id).unwrap().wealth = 25;
        }
    }

    let fid = FactionId::new(1);
    world.factions.insert(
        fid,
        Faction::new(
            fid,
            String::from("The Ledger Court"),
            FactionPreferences {
                tax: 0.08,
                trade: 0.85,
                military: 0.2,
            },
        ),
    );
    let fid = FactionId::new(2);
    world.factions.insert(
        fid,
        Faction::new(
            fid,
            String::from("The Iron Watch"),
            FactionPreferences {
                tax: 0.2,
                trade: 0.3,
                military: 0.9,
            },
        ),
    );

    world.rebuild_member_index();
    world
}

/// Drive a world `count` ticks with the deterministic weather fallback.
fn run_ticks(world: &mut WorldState, count: u64) {
    let mut weather = DeterministicWeather::new(world.seed);
    for _ in 0..count {
        let mut inputs = TickInputs {
            weather: &mut weather,
            oracle_decisions: &[],
        };
        run_tick(world, &mut inputs).unwrap();
    }
}

#[test]
fn two_runs_from_the_same_seed_are_byte_identical() {
    let mut a = build_world(1_618);
    let mut b = build_world(1_618);

    run_ticks(&mut a, TICKS_PER_DAY * 2 + 17);
    run_ticks(&mut b, TICKS_PER_DAY * 2 + 17);

    let bytes_a = serde_json::to_vec(&a.snapshot()).unwrap();
    let bytes_b = serde_json::to_vec(&b.snapshot()).unwrap();
    assert_eq!(bytes_a, bytes_b, "replicas diverged");
}

#[test]
fn crowns_are_conserved_across_mixed_activity() {
    let mut world = build_world(271);
    let before = world_crowns(&world);

    // Two full days: markets, merchants, fiscal loops, crime, population,
    // governance. Births add zero-wealth agents and inheritance is a
    // transfer, so the aggregate must not move.
    run_ticks(&mut world, TICKS_PER_DAY * 2 + 30);

    assert_eq!(world_crowns(&world), before, "the economy leaked crowns");
}

#[test]
fn prices_resources_and_health_stay_bounded() {
    let mut world = build_world(314);
    run_ticks(&mut world, TICKS_PER_DAY * 3);

    for settlement in world.settlements.values() {
        for (_, entry) in settlement.market.iter() {
            assert!(
                entry.price >= entry.base_price * AGNOSIS - 1e-9,
                "price under the floor"
            );
            assert!(
                entry.price <= entry.base_price * TOTALITY + 1e-9,
                "price over the ceiling"
            );
        }
    }
    for hex in world.map.iter() {
        assert!((0.0..=1.0).contains(&hex.health));
        for kind in telluria_types::ResourceKind::ALL {
            let amount = hex.resources.get(kind);
            let cap = telluria_world::resource_cap(hex.terrain, kind);
            assert!(amount >= 0.0 && amount <= cap + 1e-9);
        }
    }
}

#[test]
fn settlement_population_matches_live_members() {
    let mut world = build_world(577);
    run_ticks(&mut world, TICKS_PER_DAY * 2);

    for settlement in world.settlements.values() {
        let live = world
            .agents
            .values()
            .filter(|a| a.alive && a.home == Some(settlement.id))
            .count() as u32;
        assert_eq!(
            settlement.population, live,
            "settlement {} population cache drifted",
            settlement.id
        );
    }
}

#[test]
fn dead_agents_never_change_again() {
    let mut world = build_world(847);
    // Doom one agent and let the daily pass take them.
    let victim = *world.agents.keys().next().unwrap();
    {
        let agent = world.agents.get_mut(&victim).unwrap();
        agent.age = 150;
        agent.health = 0.01;
    }

    let mut died_at = None;
    for day in 0..90u64 {
        run_ticks(&mut world, TICKS_PER_DAY);
        if !world.agents[&victim].alive {
            died_at = Some(day);
            break;
        }
    }
    let died_at = died_at.expect("a 150-year-old at death's door outlived the test");

    let frozen = world.agents[&victim].clone();
    assert_eq!(frozen.wealth, 0, "death did not zero wealth");
    assert!(frozen.inventory.is_empty(), "death did not drain inventory");

    run_ticks(&mut world, TICKS_PER_DAY * 3);
    let later = &world.agents[&victim];
    assert_eq!(later.wealth, frozen.wealth);
    assert_eq!(later.inventory, frozen.inventory);
    assert_eq!(later.needs, frozen.needs);
    let _ = died_at;
}

#[test]
fn snapshot_restore_is_a_fixpoint_under_activity() {
    let mut original = build_world(901);
    run_ticks(&mut original, TICKS_PER_DAY + 321);

    let snapshot = original.snapshot();
    let mut restored = WorldState::restore(snapshot.clone(), 0).unwrap();

    // save → load → save is byte-identical.
    let bytes_one = serde_json::to_vec(&snapshot).unwrap();
    let bytes_two = serde_json::to_vec(&restored.snapshot()).unwrap();
    assert_eq!(bytes_one, bytes_two);

    // And the restored replica continues in lockstep with the original.
    run_ticks(&mut original, TICKS_PER_DAY / 2);
    run_ticks(&mut restored, TICKS_PER_DAY / 2);
    assert_eq!(
        serde_json::to_vec(&original.snapshot()).unwrap(),
        serde_json::to_vec(&restored.snapshot()).unwrap(),
        "restored world diverged from the original"
    );
}

#[test]
fn stats_history_grows_one_row_per_day() {
    let mut world = build_world(112);
    run_ticks(&mut world, TICKS_PER_DAY * 3 + 5);
    assert_eq!(world.stats_history.len(), 3);
    let days: Vec<u64> = world.stats_history.iter().map(|row| row.day).collect();
    assert_eq!(days, vec![1, 2, 3]);
}

#[test]
fn producers_work_the_land_and_the_land_shows_it() {
    let mut world = build_world(733);
    let pristine_before = world
        .map
        .iter()
        .filter(|hex| (hex.health - 1.0).abs() < f64::EPSILON)
        .count();

    run_ticks(&mut world, TICKS_PER_DAY);

    let pristine_after = world
        .map
        .iter()
        .filter(|hex| (hex.health - 1.0).abs() < f64::EPSILON)
        .count();
    assert!(
        pristine_after < pristine_before,
        "a day of work left every hex pristine"
    );

    let worked = world
        .agents
        .values()
        .filter(|a| a.alive && a.is_producer() && a.last_work_tick > 0)
        .count();
    assert!(worked > 0, "no producer worked");
}

#[test]
fn abandoned_settlement_resolves_after_two_weeks() {
    use telluria_types::TICKS_PER_WEEK;

    let mut world = build_world(188);
    // Empty the smallest settlement by hand.
    let victim = *world.settlements.keys().next().unwrap();
    let orphans: Vec<_> = world
        .agents
        .values()
        .filter(|a| a.home == Some(victim))
        .map(|a| a.id)
        .collect();
    let refuge = *world.settlements.keys().nth(1).unwrap();
    let refuge_position = world.settlements[&refuge].position;
    for id in orphans {
        let agent = world.agents.get_mut(&id).unwrap();
        agent.home = Some(refuge);
        agent.position = refuge_position;
    }
    world.settlements.get_mut(&victim).unwrap().treasury = 300;
    // Refugee spawning would refill it; mark it non-viable first, as the
    // viability pass eventually would.
    world.settlements.get_mut(&victim).unwrap().non_viable = true;
    world.rebuild_member_index();

    let before = world_crowns(&world);
    run_ticks(&mut world, TICKS_PER_WEEK * 2 + 10);

    let settlement = &world.settlements[&victim];
    assert!(settlement.abandoned, "empty settlement not abandoned");
    assert_eq!(settlement.treasury, 0);
    assert_eq!(
        world.map.get(settlement.position).unwrap().settlement,
        None,
        "hex still points at the dead settlement"
    );
    assert_eq!(world_crowns(&world), before, "abandonment leaked crowns");
}
