//! The bounded intervention surface.
//!
//! A privileged external caller -- the gardener -- may nudge the world, never
//! rewrite it: goods into a market, a time-bounded production boost, a
//! consolidation of a dying settlement, a bounded wealth adjustment, a
//! handful of refugees, or a narrative event. At most one intervention per
//! settlement per sim-day; every application emits a `gardener` event; and
//! nothing here can mint a crown -- wealth adjustments are transfers against
//! the agent's home treasury, and goods injections are inventory.

use telluria_types::{
    stable_hash, AgentId, AxialCoord, Event, EventCategory, GoodKind, SettlementId, Sex, NOUS,
    TICKS_PER_DAY,
};
use telluria_world::names;
use tracing::info;

use crate::state::{AgentSeed, WorldState};

/// Maximum absolute wealth adjustment in crowns.
pub const WEALTH_DELTA_MAX: u64 = 1_000;

/// Maximum refugees per spawn intervention.
pub const SPAWN_MAX: u32 = 20;

/// Maximum units per provision intervention.
pub const PROVISION_MAX: u32 = 500;

/// Maximum cultivation window in sim-days.
pub const CULTIVATE_MAX_DAYS: u32 = 14;

/// Maximum cultivation multiplier (`Nous`).
pub const CULTIVATE_MAX_MULTIPLIER: f64 = NOUS;

/// Maximum members moved by a consolidation.
pub const CONSOLIDATE_MAX: u32 = 50;

/// Range within which a consolidation can find a target settlement.
pub const CONSOLIDATE_RANGE: u32 = 8;

/// A bounded external nudge.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub enum Intervention {
    /// Inject a narrative event.
    Event {
        /// Description for the event log.
        description: String,
        /// Settlement the event concerns, if any.
        settlement: Option<SettlementId>,
    },
    /// Bounded wealth adjustment, routed through the home treasury.
    Wealth {
        /// The agent whose wealth changes.
        agent: AgentId,
        /// Signed crown delta, clamped to the bound.
        delta: i64,
    },
    /// Spawn refugees into a settlement.
    Spawn {
        /// Target settlement.
        settlement: SettlementId,
        /// Refugee count, clamped to the cap.
        count: u32,
    },
    /// Inject goods into a settlement's market supply.
    Provision {
        /// Target settlement.
        settlement: SettlementId,
        /// The good injected.
        good: GoodKind,
        /// Units, clamped to the cap.
        units: u32,
    },
    /// Time-bounded production multiplier.
    Cultivate {
        /// Target settlement.
        settlement: SettlementId,
        /// Yield multiplier while active.
        multiplier: f64,
        /// Window in sim-days.
        days: u32,
    },
    /// Force-migrate members of a dying settlement to the nearest viable
    /// one.
    Consolidate {
        /// The settlement being emptied.
        settlement: SettlementId,
        /// Maximum members moved.
        max_members: u32,
    },
}

/// Why an intervention was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterventionError {
    /// The named settlement does not exist or is abandoned.
    #[error("unknown or abandoned settlement {0}")]
    UnknownSettlement(SettlementId),

    /// The named agent does not exist or is dead.
    #[error("unknown or dead agent {0}")]
    UnknownAgent(AgentId),

    /// The settlement already received an intervention this sim-day.
    #[error("settlement {0} already intervened on this cycle")]
    RateLimited(SettlementId),

    /// A parameter exceeded its hard bound.
    #[error("intervention parameter out of bounds: {0}")]
    BoundsExceeded(&'static str),

    /// Consolidation found no viable target in range.
    #[error("no viable consolidation target within range of {0}")]
    NoTarget(SettlementId),
}

/// Apply one intervention, enforcing bounds and the per-settlement rate
/// limit.
pub fn apply_intervention(
    state: &mut WorldState,
    intervention: Intervention,
) -> Result<(), InterventionError> {
    let tick = state.clock.tick();
    let day = state.clock.sim_day();

    match intervention {
        Intervention::Event {
            description,
            settlement,
        } => {
            if let Some(settlement) = settlement {
                claim_cycle(state, settlement, day)?;
            }
            let mut event = Event::new(tick, EventCategory::Gardener, description);
            if let Some(settlement) = settlement {
                event = event.with("settlement", settlement);
            }
            state.emit(event);
            Ok(())
        }

        Intervention::Wealth { agent, delta } => {
            if delta.unsigned_abs() > WEALTH_DELTA_MAX {
                return Err(InterventionError::BoundsExceeded("wealth delta"));
            }
            let home = state
                .agents
                .get(&agent)
                .filter(|a| a.alive)
                .ok_or(InterventionError::UnknownAgent(agent))?
                .home
                .ok_or(InterventionError::UnknownAgent(agent))?;
            claim_cycle(state, home, day)?;

            // A transfer, not a grant: the home treasury is the other side.
            let moved = {
                let Some(settlement) = state.settlements.get_mut(&home) else {
                    return Err(InterventionError::UnknownSettlement(home));
                };
                let Some(agent_record) = state.agents.get_mut(&agent) else {
                    return Err(InterventionError::UnknownAgent(agent));
                };
                if delta >= 0 {
                    telluria_economy::move_crowns(
                        &mut settlement.treasury,
                        &mut agent_record.wealth,
                        delta.unsigned_abs(),
                    )
                } else {
                    telluria_economy::move_crowns(
                        &mut agent_record.wealth,
                        &mut settlement.treasury,
                        delta.unsigned_abs(),
                    )
                }
            };
            state.emit(
                Event::new(tick, EventCategory::Gardener, "a quiet adjustment of fortunes")
                    .with("agent", agent)
                    .with("delta", delta)
                    .with("moved", moved),
            );
            Ok(())
        }

        Intervention::Spawn { settlement, count } => {
            if count > SPAWN_MAX {
                return Err(InterventionError::BoundsExceeded("spawn count"));
            }
            require_active(state, settlement)?;
            claim_cycle(state, settlement, day)?;

            let position = state
                .settlements
                .get(&settlement)
                .map_or_else(AxialCoord::default, |s| s.position);
            for k in 0..count {
                let hash = stable_hash(&[state.seed, settlement.raw(), tick, u64::from(k), 0x6A4D]);
                let sex = if hash & 1 == 0 { Sex::Female } else { Sex::Male };
                let occupation = telluria_types::Occupation::ALL
                    [(hash >> 8) as usize % telluria_types::Occupation::COUNT];
                state.create_agent(AgentSeed {
                    name: names::agent_name(hash, sex),
                    sex,
                    age: 18 + ((hash >> 16) % 20) as u32,
                    position,
                    home: Some(settlement),
                    occupation,
                    tier: telluria_types::CognitionTier::Tier0,
                    born_tick: tick,
                });
            }
            state.rebuild_member_index();
            state.emit(
                Event::new(tick, EventCategory::Gardener, "strangers arrived on the road")
                    .with("settlement", settlement)
                    .with("count", count),
            );
            Ok(())
        }

        Intervention::Provision {
            settlement,
            good,
            units,
        } => {
            if units > PROVISION_MAX {
                return Err(InterventionError::BoundsExceeded("provision units"));
            }
            require_active(state, settlement)?;
            claim_cycle(state, settlement, day)?;

            // The goods are real inventory, handed to the hungriest first.
            let mut recipients: Vec<AgentId> = state
                .members_of(settlement)
                .iter()
                .filter(|id| state.agents.get(*id).is_some_and(|a| a.alive))
                .copied()
                .collect();
            recipients.sort_by(|a, b| {
                let sa = state.agents.get(a).map_or(1.0, |x| x.needs.survival);
                let sb = state.agents.get(b).map_or(1.0, |x| x.needs.survival);
                sa.total_cmp(&sb).then(a.cmp(b))
            });

            if recipients.is_empty() {
                // No one to hold the goods; they land on the market signal
                // alone.
                if let Some(s) = state.settlements.get_mut(&settlement) {
                    s.market.entry_mut(good).supply += f64::from(units);
                }
            } else {
                for k in 0..units {
                    let recipient = recipients[(k as usize) % recipients.len()];
                    if let Some(agent) = state.agents.get_mut(&recipient) {
                        agent.inventory.add(good, 1);
                    }
                }
                if let Some(s) = state.settlements.get_mut(&settlement) {
                    s.market.entry_mut(good).supply += f64::from(units);
                }
            }
            state.emit(
                Event::new(tick, EventCategory::Gardener, "provisions appeared in the market")
                    .with("settlement", settlement)
                    .with("good", format!("{good:?}"))
                    .with("units", units),
            );
            Ok(())
        }

        Intervention::Cultivate {
            settlement,
            multiplier,
            days,
        } => {
            if days > CULTIVATE_MAX_DAYS {
                return Err(InterventionError::BoundsExceeded("cultivation days"));
            }
            if !(1.0..=CULTIVATE_MAX_MULTIPLIER).contains(&multiplier) {
                return Err(InterventionError::BoundsExceeded("cultivation multiplier"));
            }
            require_active(state, settlement)?;
            claim_cycle(state, settlement, day)?;

            if let Some(s) = state.settlements.get_mut(&settlement) {
                s.production_boost = Some(telluria_types::ProductionBoost {
                    multiplier,
                    expires_tick: tick + u64::from(days) * TICKS_PER_DAY,
                });
            }
            state.emit(
                Event::new(tick, EventCategory::Gardener, "the fields answered unseen tending")
                    .with("settlement", settlement)
                    .with("multiplier", format!("{multiplier:.2}"))
                    .with("days", days),
            );
            Ok(())
        }

        Intervention::Consolidate {
            settlement,
            max_members,
        } => {
            if max_members > CONSOLIDATE_MAX {
                return Err(InterventionError::BoundsExceeded("consolidation size"));
            }
            require_active(state, settlement)?;

            let position = state
                .settlements
                .get(&settlement)
                .map_or_else(AxialCoord::default, |s| s.position);
            let target = state
                .settlements
                .values()
                .filter(|s| s.is_viable() && s.id != settlement)
                .filter(|s| position.distance(s.position) <= CONSOLIDATE_RANGE)
                .min_by_key(|s| (position.distance(s.position), s.id))
                .map(|s| (s.id, s.position))
                .ok_or(InterventionError::NoTarget(settlement))?;
            claim_cycle(state, settlement, day)?;

            let movers: Vec<AgentId> = state
                .members_of(settlement)
                .iter()
                .filter(|id| state.agents.get(*id).is_some_and(|a| a.alive))
                .take(max_members as usize)
                .copied()
                .collect();
            for id in &movers {
                if let Some(agent) = state.agents.get_mut(id) {
                    agent.home = Some(target.0);
                    agent.position = target.1;
                    agent.remember(tick, "resettled by unseen hands", 0.7);
                }
            }
            state.rebuild_member_index();

            info!(settlement = %settlement, moved = movers.len(), "consolidation");
            state.emit(
                Event::new(tick, EventCategory::Gardener, "a settlement was gathered in")
                    .with("settlement", settlement)
                    .with("target", target.0)
                    .with("moved", movers.len()),
            );
            Ok(())
        }
    }
}

/// Reject abandoned or unknown settlements.
fn require_active(state: &WorldState, id: SettlementId) -> Result<(), InterventionError> {
    state
        .settlements
        .get(&id)
        .filter(|s| s.is_active())
        .map(|_| ())
        .ok_or(InterventionError::UnknownSettlement(id))
}

/// Enforce the one-intervention-per-settlement-per-day rule.
fn claim_cycle(
    state: &mut WorldState,
    id: SettlementId,
    day: u64,
) -> Result<(), InterventionError> {
    let Some(settlement) = state.settlements.get_mut(&id) else {
        return Err(InterventionError::UnknownSettlement(id));
    };
    if settlement.last_intervention_day == Some(day) {
        return Err(InterventionError::RateLimited(id));
    }
    settlement.last_intervention_day = Some(day);
    Ok(())
}
