//! Weekly perpetuation: the anti-freeze, anti-collapse machinery.
//!
//! Markets get circuit breakers; the desperate migrate toward prosperity;
//! producers stranded on exhausted ground follow their resource; idle
//! crafters take up whatever the land nearby is rich in; the chronically
//! idle change careers. Every migration that changes a home id is followed
//! by a member-index rebuild.

use telluria_types::{
    Agent, AgentId, Event, EventCategory, Occupation, ResourceKind, SettlementId, TICKS_PER_DAY,
    TICKS_PER_WEEK,
};
use telluria_agents::work::required_resource;
use tracing::debug;

use crate::state::WorldState;

/// Mood and survival thresholds for desperation migration.
pub const DESPERATION_MOOD: f64 = -0.3;
/// Survival threshold paired with the mood threshold.
pub const DESPERATION_SURVIVAL: f64 = 0.3;

/// Settlements under this live count use the "tiny settlement" migration
/// rule (nearest viable target, satisfaction trigger).
pub const TINY_SETTLEMENT: usize = 25;

/// Range for the tiny-settlement migration search.
pub const TINY_MIGRATION_RANGE: u32 = 5;

/// Idle span after which a producer looks for their resource elsewhere.
pub const RESOURCE_SEEKING_IDLE: u64 = 2 * TICKS_PER_WEEK;

/// Range of the resource-seeking search.
pub const RESOURCE_SEEKING_RANGE: u32 = 10;

/// Cap on resource-seeking movers per settlement per week, as a fraction of
/// its producers.
pub const RESOURCE_SEEKING_CAP: f64 = 0.1;

/// Idle span after which a crafter may convert to a producer occupation.
pub const CRAFTER_RECOVERY_IDLE: u64 = TICKS_PER_WEEK;

/// Idle span that triggers a skill-adjacent career switch.
pub const CAREER_SWITCH_IDLE: u64 = 30 * TICKS_PER_DAY;

/// Idle span that triggers the terminal fallback to crafter.
pub const CRAFTER_FALLBACK_IDLE: u64 = 60 * TICKS_PER_DAY;

/// What the weekly perpetuation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PerpetuationReport {
    /// Circuit-breaker adjustments across all markets.
    pub breakers: u32,
    /// Desperation migrations.
    pub desperate_moves: u32,
    /// Resource-seeking migrations.
    pub resource_moves: u32,
    /// Crafter conversions to producer work.
    pub crafter_recoveries: u32,
    /// Skill-adjacent career switches.
    pub career_switches: u32,
}

/// Run the weekly perpetuation pass.
pub fn run_weekly_perpetuation(state: &mut WorldState) -> PerpetuationReport {
    let tick = state.clock.tick();
    let mut report = PerpetuationReport::default();
    let mut events: Vec<Event> = Vec::new();

    // Circuit breakers, settlement by settlement.
    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();
    for id in &settlement_ids {
        if let Some(settlement) = state.settlements.get_mut(id) {
            report.breakers +=
                telluria_economy::run_circuit_breakers(settlement, tick, &mut events);
        }
    }

    report.desperate_moves = desperation_migration(state, tick, &mut events);
    report.resource_moves = resource_seeking(state, tick, &mut events);
    report.crafter_recoveries = crafter_recovery(state, tick, &mut events);
    report.career_switches = career_transitions(state, tick, &mut events);

    // Any of the above may have changed home ids.
    state.rebuild_member_index();
    for event in events {
        state.emit(event);
    }

    debug!(tick, ?report, "weekly perpetuation");
    report
}

/// Prosperity score used to pick migration targets.
fn prosperity(state: &WorldState, settlement_id: SettlementId) -> f64 {
    let Some(settlement) = state.settlements.get(&settlement_id) else {
        return f64::MIN;
    };
    let members = state.members_of(settlement_id);
    let wealth_sum: u64 = members
        .iter()
        .filter_map(|id| state.agents.get(id))
        .filter(|a| a.alive)
        .map(|a| a.wealth)
        .sum();
    let population = members.len().max(1) as f64;
    settlement.treasury as f64 / (population + 1.0) + wealth_sum as f64 / population
}

/// Desperate agents move toward prosperity.
fn desperation_migration(state: &mut WorldState, tick: u64, events: &mut Vec<Event>) -> u32 {
    // The global best target, computed once.
    let global_best = state
        .settlements
        .values()
        .filter(|s| s.is_viable())
        .map(|s| s.id)
        .max_by(|a, b| {
            prosperity(state, *a)
                .total_cmp(&prosperity(state, *b))
                .then(b.cmp(a))
        });

    let movers: Vec<(AgentId, SettlementId)> = state
        .agents
        .values()
        .filter(|agent| agent.alive)
        .filter_map(|agent| {
            let home = agent.home?;
            let home_live = state.members_of(home).len();
            let tiny = home_live < TINY_SETTLEMENT;

            let desperate = (agent.wellbeing.effective_mood < DESPERATION_MOOD
                && agent.needs.survival < DESPERATION_SURVIVAL)
                || (tiny && agent.wellbeing.satisfaction < 0.0);
            if !desperate {
                return None;
            }

            let target = if tiny {
                let position = state.settlements.get(&home)?.position;
                state
                    .settlements
                    .values()
                    .filter(|s| s.is_viable() && s.id != home)
                    .filter(|s| position.distance(s.position) <= TINY_MIGRATION_RANGE)
                    .min_by_key(|s| (position.distance(s.position), s.id))
                    .map(|s| s.id)
            } else {
                global_best.filter(|best| *best != home)
            }?;
            Some((agent.id, target))
        })
        .collect();

    let count = movers.len() as u32;
    for (agent_id, target) in movers {
        move_home(state, agent_id, target, tick, "sought better fortune", events);
    }
    count
}

/// Producers whose neighborhood no longer holds their resource follow it,
/// keeping their occupation. Capped at a tenth of each settlement's
/// producers per week.
fn resource_seeking(state: &mut WorldState, tick: u64, events: &mut Vec<Event>) -> u32 {
    let tick_now = tick;
    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();

    let mut total = 0u32;
    for home_id in settlement_ids {
        let Some(home_position) = state.settlements.get(&home_id).map(|s| s.position) else {
            continue;
        };
        let members = state.members_of(home_id).to_vec();
        let producers: Vec<AgentId> = members
            .iter()
            .filter(|id| {
                state
                    .agents
                    .get(*id)
                    .is_some_and(|a| a.alive && a.is_producer())
            })
            .copied()
            .collect();
        if producers.is_empty() {
            continue;
        }
        let cap = ((producers.len() as f64 * RESOURCE_SEEKING_CAP).floor() as usize).max(1);

        let mut moved_here = 0usize;
        for id in producers {
            if moved_here >= cap {
                break;
            }
            let Some(agent) = state.agents.get(&id) else { continue };
            let Some(resource) = required_resource(agent.occupation) else {
                continue;
            };
            if tick_now.saturating_sub(agent.last_work_tick) <= RESOURCE_SEEKING_IDLE {
                continue;
            }
            if neighborhood_has(state, home_position, resource) {
                continue;
            }

            let target = state
                .settlements
                .values()
                .filter(|s| s.is_viable() && s.id != home_id)
                .filter(|s| home_position.distance(s.position) <= RESOURCE_SEEKING_RANGE)
                .filter(|s| neighborhood_has(state, s.position, resource))
                .min_by_key(|s| (home_position.distance(s.position), s.id))
                .map(|s| s.id);
            let Some(target) = target else { continue };

            move_home(state, id, target, tick, "followed the land", events);
            moved_here += 1;
            total += 1;
        }
    }
    total
}

/// Whether any hex of a settlement's working neighborhood holds at least
/// one unit of a resource.
fn neighborhood_has(state: &WorldState, center: telluria_types::AxialCoord, resource: ResourceKind) -> bool {
    state
        .map
        .neighborhood(center)
        .into_iter()
        .filter_map(|coord| state.map.get(coord))
        .any(|hex| hex.resources.get(resource) >= 1.0)
}

/// Idle crafters convert to the occupation of the richest nearby resource --
/// but only where producers already succeed, and never while more than half
/// of the settlement's producers are idle (that would make the shortage
/// worse, not better).
fn crafter_recovery(state: &mut WorldState, tick: u64, events: &mut Vec<Event>) -> u32 {
    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();

    let mut total = 0u32;
    for home_id in settlement_ids {
        let Some(home_position) = state.settlements.get(&home_id).map(|s| s.position) else {
            continue;
        };
        let members = state.members_of(home_id).to_vec();

        // Producer health check.
        let producers: Vec<&Agent> = members
            .iter()
            .filter_map(|id| state.agents.get(id))
            .filter(|a| a.alive && a.is_producer())
            .collect();
        if producers.is_empty() {
            continue;
        }
        let idle_producers = producers
            .iter()
            .filter(|a| tick.saturating_sub(a.last_work_tick) > TICKS_PER_WEEK)
            .count();
        let any_working = idle_producers < producers.len();
        if !any_working || idle_producers * 2 > producers.len() {
            continue;
        }

        // The richest nearby resource decides the new trade.
        let richest = ResourceKind::ALL
            .iter()
            .map(|resource| {
                let amount: f64 = state
                    .map
                    .neighborhood(home_position)
                    .into_iter()
                    .filter_map(|coord| state.map.get(coord))
                    .map(|hex| hex.resources.get(*resource))
                    .sum();
                (*resource, amount)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.index().cmp(&a.0.index())))
            .map(|(resource, _)| resource);
        let Some(richest) = richest else { continue };
        let Some(new_occupation) = occupation_for(richest) else {
            continue;
        };

        let idle_crafters: Vec<AgentId> = members
            .iter()
            .filter(|id| {
                state.agents.get(*id).is_some_and(|a| {
                    a.alive
                        && a.occupation == Occupation::Crafter
                        && tick.saturating_sub(a.last_work_tick) > CRAFTER_RECOVERY_IDLE
                })
            })
            .copied()
            .collect();
        if idle_crafters.is_empty() {
            continue;
        }
        let cap = ((idle_crafters.len() as f64 * RESOURCE_SEEKING_CAP).ceil() as usize).max(1);

        for id in idle_crafters.into_iter().take(cap) {
            if let Some(agent) = state.agents.get_mut(&id) {
                agent.occupation = new_occupation;
                agent.remember(tick, "took up a producer's trade", 0.6);
                events.push(
                    Event::new(tick, EventCategory::Population, "a crafter went to the land")
                        .with("agent", id)
                        .with("settlement", home_id),
                );
                total += 1;
            }
        }
    }
    total
}

/// The producer occupation that extracts a resource.
const fn occupation_for(resource: ResourceKind) -> Option<Occupation> {
    match resource {
        ResourceKind::Grain => Some(Occupation::Farmer),
        ResourceKind::Fish => Some(Occupation::Fisher),
        ResourceKind::Furs => Some(Occupation::Hunter),
        ResourceKind::IronOre | ResourceKind::Coal => Some(Occupation::Miner),
        ResourceKind::Stone => Some(Occupation::Laborer),
        ResourceKind::Herbs | ResourceKind::Exotics => Some(Occupation::Alchemist),
        ResourceKind::Gems | ResourceKind::Timber => None,
    }
}

/// Chronically idle producers switch to the skill-adjacent occupation; past
/// sixty idle days, they fall back to crafter.
fn career_transitions(state: &mut WorldState, tick: u64, events: &mut Vec<Event>) -> u32 {
    let candidates: Vec<(AgentId, Occupation, u64)> = state
        .agents
        .values()
        .filter(|a| a.alive && a.is_producer())
        .filter_map(|a| {
            let idle = tick.saturating_sub(a.last_work_tick);
            (idle > CAREER_SWITCH_IDLE).then_some((a.id, a.occupation, idle))
        })
        .collect();

    let mut switched = 0u32;
    for (id, occupation, idle) in candidates {
        // The switch fires only with no compatible settlement in reach.
        let compatible = {
            let Some(agent) = state.agents.get(&id) else { continue };
            let position = agent.position;
            required_resource(occupation).is_some_and(|resource| {
                state
                    .settlements
                    .values()
                    .filter(|s| s.is_viable())
                    .filter(|s| position.distance(s.position) <= RESOURCE_SEEKING_RANGE)
                    .any(|s| neighborhood_has(state, s.position, resource))
            })
        };
        if compatible {
            continue;
        }

        let new_occupation = if idle > CRAFTER_FALLBACK_IDLE {
            Occupation::Crafter
        } else {
            adjacent_occupation(occupation)
        };
        if let Some(agent) = state.agents.get_mut(&id) {
            agent.occupation = new_occupation;
            agent.remember(tick, "changed trades", 0.5);
            events.push(
                Event::new(tick, EventCategory::Population, "a worker changed trades")
                    .with("agent", id)
                    .with("to", format!("{new_occupation:?}")),
            );
            switched += 1;
        }
    }
    switched
}

/// The skill-adjacent pairing used by career transitions.
#[must_use]
pub const fn adjacent_occupation(occupation: Occupation) -> Occupation {
    match occupation {
        Occupation::Farmer => Occupation::Fisher,
        Occupation::Fisher => Occupation::Farmer,
        Occupation::Miner => Occupation::Laborer,
        Occupation::Laborer => Occupation::Miner,
        Occupation::Hunter => Occupation::Soldier,
        Occupation::Soldier => Occupation::Hunter,
        Occupation::Alchemist => Occupation::Scholar,
        Occupation::Scholar => Occupation::Alchemist,
        other => other,
    }
}

/// Move an agent's home, emitting a migration event.
fn move_home(
    state: &mut WorldState,
    agent_id: AgentId,
    target: SettlementId,
    tick: u64,
    reason: &str,
    events: &mut Vec<Event>,
) {
    let Some(position) = state.settlements.get(&target).map(|s| s.position) else {
        return;
    };
    if let Some(agent) = state.agents.get_mut(&agent_id) {
        agent.home = Some(target);
        agent.position = position;
        agent.remember(tick, reason.to_owned(), 0.6);
        events.push(
            Event::new(tick, EventCategory::Population, "a migrant took the road")
                .with("agent", agent_id)
                .with("to", target),
        );
    }
}
