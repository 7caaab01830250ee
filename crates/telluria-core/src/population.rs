//! Daily population dynamics: aging, death, inheritance, births, and the
//! anti-collapse floor.
//!
//! Death is evaluated against a stable per-agent hash -- a smooth per-day
//! probability rather than the historical once-per-year cliff; aggregate
//! mortality matches, individual death days differ. Births gate each
//! eligible parent through a sigmoid on belonging (a hard threshold caused
//! ten-fold oscillations at population scale). Inheritance runs exactly
//! once per death and conserves every crown.

use telluria_types::{
    chance, stable_hash, Agent, AgentId, AxialCoord, Event, EventCategory, GoodKind, Sex,
    SettlementId, AGNOSIS, DAYS_PER_YEAR, MATTER, PHI, TICKS_PER_DAY,
};
use telluria_world::names;
use tracing::{debug, info};

use crate::state::{AgentSeed, WorldState};

/// Age at which old-age mortality begins to ramp.
pub const OLD_AGE_ONSET: u32 = 55;

/// Per-day mortality slope past the onset age.
pub const OLD_AGE_SLOPE: f64 = AGNOSIS * 0.001;

/// Health below which disease can take an agent.
pub const DISEASE_HEALTH_THRESHOLD: f64 = 0.15;

/// Per-day disease mortality below the health threshold.
pub const DISEASE_MORTALITY: f64 = MATTER * 0.05;

/// Parent eligibility window and gates.
pub const PARENT_MIN_AGE: u32 = 18;
/// Upper bound of the parenting window.
pub const PARENT_MAX_AGE: u32 = 45;
/// Minimum parent health.
pub const PARENT_MIN_HEALTH: f64 = 0.5;
/// Minimum parent survival need.
pub const PARENT_MIN_SURVIVAL: f64 = 0.3;

/// Center of the belonging sigmoid.
pub const BIRTH_SIGMOID_CENTER: f64 = 0.3;

/// Steepness of the belonging sigmoid (`10·Φ`).
pub const BIRTH_SIGMOID_STEEPNESS: f64 = 10.0 * PHI;

/// Hard cap on births per settlement per day.
pub const BIRTHS_PER_SETTLEMENT_CAP: u32 = 3;

/// Population floor below which refugees arrive (viable settlements only).
pub const REFUGEE_FLOOR: usize = 10;

/// Fraction of a settlement starving that triggers emergency food.
pub const STARVATION_ALARM_FRACTION: f64 = 0.2;

/// Grain granted per starving agent in an emergency injection.
pub const EMERGENCY_GRAIN: u32 = 5;

/// What the daily population pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulationReport {
    /// Deaths today.
    pub deaths: u32,
    /// Births today.
    pub births: u32,
    /// Refugees spawned today.
    pub refugees: u32,
}

/// The per-day birth probability for a parent's belonging value.
///
/// Strictly increasing in belonging -- the birth-sigmoid monotonicity
/// invariant.
#[must_use]
pub fn birth_sigmoid(belonging: f64) -> f64 {
    1.0 / (1.0 + (-BIRTH_SIGMOID_STEEPNESS * (belonging - BIRTH_SIGMOID_CENTER)).exp())
}

/// Whether one eligible parent passes today's sigmoid gate.
#[must_use]
pub fn birth_gate(parent: AgentId, day: u64, belonging: f64) -> bool {
    chance(
        stable_hash(&[parent.raw(), day, 0xB14A]),
        birth_sigmoid(belonging),
    )
}

/// Run the daily population pass.
pub fn run_daily_population(state: &mut WorldState) -> PopulationReport {
    let tick = state.clock.tick();
    let day = state.clock.sim_day();
    let mut report = PopulationReport::default();

    age_agents(state, day);
    report.deaths = process_deaths(state, tick, day);
    if report.deaths > 0 {
        state.rebuild_member_index();
    }
    report.births = process_births(state, tick, day);
    report.refugees = anti_collapse(state, tick);
    if report.births > 0 || report.refugees > 0 {
        state.rebuild_member_index();
    }

    debug!(day, ?report, "population day");
    report
}

/// Increment ages on each agent's yearly boundary.
fn age_agents(state: &mut WorldState, day: u64) {
    for agent in state.agents.values_mut() {
        if !agent.alive {
            continue;
        }
        let born_day = agent.born_tick / TICKS_PER_DAY;
        let lived = day.saturating_sub(born_day);
        if lived > 0 && lived % DAYS_PER_YEAR == 0 {
            agent.age = agent.age.saturating_add(1);
        }
    }
}

/// Hash-evaluated old-age and disease mortality.
fn process_deaths(state: &mut WorldState, tick: u64, day: u64) -> u32 {
    let doomed: Vec<AgentId> = state
        .agents
        .values()
        .filter(|agent| agent.alive)
        .filter(|agent| {
            let mut probability = 0.0;
            if agent.age > OLD_AGE_ONSET {
                probability += f64::from(agent.age - OLD_AGE_ONSET) * OLD_AGE_SLOPE;
            }
            if agent.health < DISEASE_HEALTH_THRESHOLD {
                probability += DISEASE_MORTALITY;
            }
            probability > 0.0
                && chance(stable_hash(&[agent.id.raw(), day, 0xDEAD]), probability)
        })
        .map(|agent| agent.id)
        .collect();

    for id in &doomed {
        process_death(state, *id, tick);
    }
    doomed.len() as u32
}

/// Mark one agent dead and run inheritance exactly once.
///
/// Wealth splits 50/50 between the home treasury and the first live
/// settlement-mate; inventory dumps into the settlement market's supply
/// signal. The dead agent stays in memory with `alive = false` so
/// relationships that reference them keep resolving.
pub fn process_death(state: &mut WorldState, id: AgentId, tick: u64) {
    let Some(agent) = state.agents.get_mut(&id) else {
        return;
    };
    if !agent.alive {
        return;
    }
    agent.alive = false;
    let wealth = std::mem::take(&mut agent.wealth);
    let goods = agent.inventory.drain();
    let home = agent.home;
    let name = agent.name.clone();
    let age = agent.age;

    state.counters.deaths += 1;

    // Resolve the estate.
    let home_id = home.or_else(|| nearest_active_settlement(state, id));
    if let Some(home_id) = home_id {
        let heir = state
            .members_of(home_id)
            .iter()
            .find(|member| {
                **member != id && state.agents.get(*member).is_some_and(|a| a.alive)
            })
            .copied();

        let heir_share = heir.map_or(0, |_| wealth / 2);
        let treasury_share = wealth - heir_share;

        if let Some(settlement) = state.settlements.get_mut(&home_id) {
            settlement.treasury = settlement.treasury.saturating_add(treasury_share);
            for (good, units) in &goods {
                settlement.market.entry_mut(*good).supply += f64::from(*units);
            }
        }
        if let Some(heir_id) = heir {
            if let Some(heir_agent) = state.agents.get_mut(&heir_id) {
                heir_agent.wealth = heir_agent.wealth.saturating_add(heir_share);
                heir_agent.remember(tick, format!("inherited from {name}"), 0.7);
            }
        }
    } else if wealth > 0 {
        // World-collapse boundary: nowhere left for the estate to go.
        tracing::warn!(agent = %id, wealth, "estate lapsed with no settlement to receive it");
    }

    info!(agent = %id, age, "an agent died");
    state.emit(
        Event::new(tick, EventCategory::Population, format!("{name} died"))
            .with("agent", id)
            .with("age", age),
    );
}

/// The nearest active settlement to an agent's position.
fn nearest_active_settlement(state: &WorldState, id: AgentId) -> Option<SettlementId> {
    let position = state.agents.get(&id)?.position;
    state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .min_by_key(|s| (position.distance(s.position), s.id))
        .map(|s| s.id)
}

/// Sigmoid-gated births per settlement.
fn process_births(state: &mut WorldState, tick: u64, day: u64) -> u32 {
    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();

    let mut total = 0u32;
    for settlement_id in settlement_ids {
        let members = state.members_of(settlement_id).to_vec();
        let eligible: Vec<&Agent> = members
            .iter()
            .filter_map(|id| state.agents.get(id))
            .filter(|a| {
                a.alive
                    && (PARENT_MIN_AGE..=PARENT_MAX_AGE).contains(&a.age)
                    && a.health > PARENT_MIN_HEALTH
                    && a.needs.survival > PARENT_MIN_SURVIVAL
            })
            .collect();
        if eligible.is_empty() {
            continue;
        }

        let wealth_sum: u64 = eligible.iter().map(|a| a.wealth).sum();
        let average_wealth = wealth_sum as f64 / eligible.len() as f64;
        let prosperity_bonus = (average_wealth / (PHI * 100.0)).clamp(0.0, 0.5);
        let target = ((eligible.len() as f64 / 30.0) * (0.5 + prosperity_bonus)).round() as u32;
        let target = target.min(BIRTHS_PER_SETTLEMENT_CAP);
        if target == 0 {
            continue;
        }

        let parents: Vec<(AgentId, u64)> = eligible
            .iter()
            .filter(|a| birth_gate(a.id, day, a.needs.belonging))
            .take(target as usize)
            .map(|a| (a.id, stable_hash(&[a.id.raw(), day, 0xBEB1])))
            .collect();

        let position = state
            .settlements
            .get(&settlement_id)
            .map_or_else(AxialCoord::default, |s| s.position);

        for (parent_id, seed_hash) in parents {
            let sex = if seed_hash & 1 == 0 { Sex::Female } else { Sex::Male };
            let occupation = state
                .agents
                .get(&parent_id)
                .map_or(telluria_types::Occupation::Farmer, |p| p.occupation);
            let name = names::agent_name(seed_hash, sex);

            let child = state.create_agent(AgentSeed {
                name: name.clone(),
                sex,
                age: 0,
                position,
                home: Some(settlement_id),
                occupation,
                tier: telluria_types::CognitionTier::Tier0,
                born_tick: tick,
            });
            state.counters.births += 1;
            total += 1;

            if let Some(parent) = state.agents.get_mut(&parent_id) {
                parent.note_relationship(child, 0.8, 0.8);
                parent.remember(tick, format!("welcomed {name}"), 0.9);
            }
            state.emit(
                Event::new(tick, EventCategory::Population, format!("{name} was born"))
                    .with("agent", child)
                    .with("parent", parent_id)
                    .with("settlement", settlement_id),
            );
        }
    }
    total
}

/// Refugee floor and emergency food.
fn anti_collapse(state: &mut WorldState, tick: u64) -> u32 {
    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_viable())
        .map(|s| s.id)
        .collect();

    let mut refugees = 0u32;
    for settlement_id in settlement_ids {
        let members = state.members_of(settlement_id).to_vec();
        let live_count = members
            .iter()
            .filter(|id| state.agents.get(*id).is_some_and(|a| a.alive))
            .count();

        // Refugee floor.
        if live_count < REFUGEE_FLOOR {
            let position = state
                .settlements
                .get(&settlement_id)
                .map_or_else(AxialCoord::default, |s| s.position);
            let shortfall = (REFUGEE_FLOOR - live_count) as u32;
            for k in 0..shortfall {
                let hash = stable_hash(&[state.seed, settlement_id.raw(), tick, u64::from(k)]);
                let sex = if hash & 1 == 0 { Sex::Female } else { Sex::Male };
                let occupation = telluria_types::Occupation::ALL
                    [(hash >> 8) as usize % telluria_types::Occupation::COUNT];
                let id = state.create_agent(AgentSeed {
                    name: names::agent_name(hash, sex),
                    sex,
                    age: 18 + ((hash >> 16) % 20) as u32,
                    position,
                    home: Some(settlement_id),
                    occupation,
                    tier: telluria_types::CognitionTier::Tier0,
                    born_tick: tick,
                });
                refugees += 1;
                state.emit(
                    Event::new(tick, EventCategory::Population, "a refugee arrived")
                        .with("agent", id)
                        .with("settlement", settlement_id),
                );
            }
        }

        // Emergency food injection: inventory grants, never crowns.
        let starving: Vec<AgentId> = members
            .iter()
            .filter(|id| {
                state
                    .agents
                    .get(*id)
                    .is_some_and(|a| a.alive && a.needs.survival < AGNOSIS)
            })
            .copied()
            .collect();
        if live_count > 0 && starving.len() as f64 / live_count as f64 >= STARVATION_ALARM_FRACTION
        {
            for id in &starving {
                if let Some(agent) = state.agents.get_mut(id) {
                    agent.inventory.add(GoodKind::Grain, EMERGENCY_GRAIN);
                }
            }
            state.emit(
                Event::new(tick, EventCategory::Population, "emergency granaries opened")
                    .with("settlement", settlement_id)
                    .with("fed", starving.len()),
            );
        }
    }
    refugees
}
