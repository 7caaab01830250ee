//! The decision-oracle bridge for named (Tier-2) agents and the archetype
//! oracle for Tier-1 templates.
//!
//! The engine never calls an external service mid-tick. The runner builds
//! context snapshots between ticks, hands them to a [`DecisionOracle`]
//! (whose implementation owns its own transport, timeout, and fallback),
//! and passes whatever came back into the next tick, where the tokens are
//! applied through the same mutation primitives as the rule kernel. Unknown
//! tokens are ignored with a logged event; an absent or failed oracle
//! simply yields no decisions, and the named agent lives by the Tier-0
//! kernel that cycle.
//!
//! Roughly one-seventh of the named agents are due each sim-day, so the
//! whole roster turns over weekly.

use telluria_types::{
    AgentId, Event, EventCategory, GoodKind, Need, NeedsState, Occupation, OracleAction,
    SettlementId, AGNOSIS, BEING,
};
use telluria_agents::{socialize_pair, ArchetypeTemplate};
use tracing::{debug, warn};

use crate::perpetuation::adjacent_occupation;
use crate::state::WorldState;

/// Context snapshot handed to the decision oracle for one named agent.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct NamedAgentContext {
    /// The agent.
    pub agent: AgentId,
    /// Display name.
    pub name: String,
    /// Occupation.
    pub occupation: Occupation,
    /// Home settlement, if any.
    pub settlement: Option<SettlementId>,
    /// Home settlement name, empty when homeless.
    pub settlement_name: String,
    /// Liquid wealth.
    pub wealth: u64,
    /// The needs vector.
    pub needs: NeedsState,
    /// Effective mood.
    pub mood: f64,
    /// Citta coherence.
    pub coherence: f64,
    /// Strongest relationships as `(agent, sentiment)`.
    pub top_relationships: Vec<(AgentId, f64)>,
    /// Home market prices per good.
    pub market_prices: Vec<(GoodKind, f64)>,
    /// Recent event descriptions mentioning the home settlement.
    pub recent_events: Vec<String>,
}

/// One oracle reply: raw action tokens for one agent.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct OracleDecision {
    /// The agent the decision is for.
    pub agent: AgentId,
    /// Raw tokens; unknown ones are ignored at application time.
    pub tokens: Vec<String>,
}

/// Source of weekly decisions for named agents.
///
/// Implementations own their transport and must not block unboundedly; a
/// failed call should return an empty vector rather than an error -- the
/// engine treats absence as "fall back to the kernel".
pub trait DecisionOracle {
    /// Produce decisions for the given contexts.
    fn decide(&mut self, contexts: &[NamedAgentContext]) -> Vec<OracleDecision>;
}

/// Source of weekly archetype-template refreshes.
pub trait ArchetypeOracle {
    /// A replacement template set for the week, or `None` to keep the
    /// current set.
    fn refresh(&mut self, week: u64) -> Option<Vec<ArchetypeTemplate>>;
}

/// The no-oracle oracle: never decides anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOracle;

impl DecisionOracle for NullOracle {
    fn decide(&mut self, _contexts: &[NamedAgentContext]) -> Vec<OracleDecision> {
        Vec::new()
    }
}

/// The no-oracle archetype oracle: keeps the built-in template set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullArchetypeOracle;

impl ArchetypeOracle for NullArchetypeOracle {
    fn refresh(&mut self, _week: u64) -> Option<Vec<ArchetypeTemplate>> {
        None
    }
}

/// Whether a named agent's weekly slot falls on this sim-day.
#[must_use]
pub const fn due_today(agent: AgentId, day: u64) -> bool {
    agent.raw() % 7 == day % 7
}

/// Build context snapshots for the named agents due today.
#[must_use]
pub fn build_contexts(state: &WorldState, day: u64) -> Vec<NamedAgentContext> {
    state
        .agents
        .values()
        .filter(|a| a.alive && a.tier.rank() >= 2 && due_today(a.id, day))
        .map(|agent| {
            let settlement = agent.home.and_then(|id| state.settlements.get(&id));
            let settlement_name = settlement.map_or_else(String::new, |s| s.name.clone());

            let mut top_relationships: Vec<(AgentId, f64)> = agent
                .relationships
                .iter()
                .map(|rel| (rel.target, rel.sentiment))
                .collect();
            top_relationships
                .sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            top_relationships.truncate(5);

            let market_prices = settlement.map_or_else(Vec::new, |s| {
                s.market.iter().map(|(good, entry)| (good, entry.price)).collect()
            });

            let recent_events = settlement.map_or_else(Vec::new, |s| {
                let key = s.id.to_string();
                state
                    .events()
                    .rev()
                    .filter(|e| e.meta.get("settlement") == Some(&key))
                    .take(5)
                    .map(|e| e.description.clone())
                    .collect()
            });

            NamedAgentContext {
                agent: agent.id,
                name: agent.name.clone(),
                occupation: agent.occupation,
                settlement: agent.home,
                settlement_name,
                wealth: agent.wealth,
                needs: agent.needs,
                mood: agent.wellbeing.effective_mood,
                coherence: agent.soul.coherence,
                top_relationships,
                market_prices,
                recent_events,
            }
        })
        .collect()
}

/// Apply one oracle decision through the ordinary mutation primitives.
///
/// Each known token is applied in order; unknown tokens log an event and
/// are otherwise a no-op (the recoverable-domain rule). The decision itself
/// is recorded as a system event so a replay can reproduce it.
pub fn apply_decision(state: &mut WorldState, decision: &OracleDecision) {
    let tick = state.clock.tick();
    let Some(agent) = state.agents.get(&decision.agent) else {
        warn!(agent = %decision.agent, "oracle decision for unknown agent");
        return;
    };
    if !agent.alive {
        return;
    }

    state.emit(
        Event::new(tick, EventCategory::System, "oracle decision recorded")
            .with("agent", decision.agent)
            .with("tokens", decision.tokens.join(",")),
    );

    for token in &decision.tokens {
        match OracleAction::from_token(token) {
            Some(action) => apply_action(state, decision.agent, action),
            None => {
                debug!(agent = %decision.agent, token, "unknown oracle token ignored");
                state.emit(
                    Event::new(tick, EventCategory::System, "unknown oracle token")
                        .with("agent", decision.agent)
                        .with("token", token.clone()),
                );
            }
        }
    }
}

/// Apply one parsed oracle action.
#[allow(clippy::too_many_lines)]
fn apply_action(state: &mut WorldState, agent_id: AgentId, action: OracleAction) {
    let tick = state.clock.tick();
    let Some(agent) = state.agents.get(&agent_id) else {
        return;
    };
    let home = agent.home;
    let position = agent.position;

    match action {
        OracleAction::Work => {
            let boost = home
                .and_then(|id| state.settlements.get(&id))
                .map_or(1.0, |s| s.boost_at(tick));
            let workplace = home
                .and_then(|id| state.settlements.get(&id))
                .map_or(position, |s| s.position);
            if let Some(agent) = state.agents.get_mut(&agent_id) {
                let _ = telluria_agents::perform_work(agent, &mut state.map, workplace, tick, boost);
            }
        }
        OracleAction::Trade => {
            // A focused trading day: fill the larder if it is thin,
            // sharpen the craft either way.
            if let Some(home_id) = home {
                let members = state.members_of(home_id).to_vec();
                let hungry = state
                    .agents
                    .get(&agent_id)
                    .is_some_and(|a| a.inventory.food_units() == 0);
                if hungry {
                    if let Some(settlement) = state.settlements.get(&home_id) {
                        let _ = telluria_economy::buy_food(
                            &mut state.agents,
                            agent_id,
                            &members,
                            settlement,
                        );
                    }
                }
            }
            if let Some(agent) = state.agents.get_mut(&agent_id) {
                agent.skills.trade = (agent.skills.trade + AGNOSIS * 0.01).min(1.0);
                agent.needs.adjust(Need::Purpose, AGNOSIS * 0.05);
            }
        }
        OracleAction::Socialize => {
            let best = state.agents.get(&agent_id).and_then(|agent| {
                home.map(|home_id| {
                    state
                        .members_of(home_id)
                        .iter()
                        .filter(|id| **id != agent_id)
                        .max_by(|a, b| {
                            agent
                                .sentiment_toward(**a)
                                .total_cmp(&agent.sentiment_toward(**b))
                                .then(b.cmp(a))
                        })
                        .copied()
                })
            });
            if let Some(Some(partner)) = best {
                socialize_pair(&mut state.agents, agent_id, partner);
            }
        }
        OracleAction::Advocate => {
            let faction = state.agents.get(&agent_id).and_then(|a| a.faction);
            if let (Some(faction_id), Some(home_id)) = (faction, home) {
                if let Some(faction) = state.factions.get_mut(&faction_id) {
                    let current = faction.influence_in(home_id);
                    faction.set_influence(home_id, current + BEING);
                }
                if let Some(agent) = state.agents.get_mut(&agent_id) {
                    agent.needs.adjust(Need::Purpose, AGNOSIS * 0.05);
                }
            }
        }
        OracleAction::Invest => {
            if let Some(home_id) = home {
                let amount = state
                    .agents
                    .get(&agent_id)
                    .map_or(0, |a| (a.wealth / 3).min(100));
                if amount > 0 {
                    if let Some(agent) = state.agents.get_mut(&agent_id) {
                        agent.wealth -= amount;
                    }
                    if let Some(settlement) = state.settlements.get_mut(&home_id) {
                        settlement.treasury = settlement.treasury.saturating_add(amount);
                    }
                    if let Some(agent) = state.agents.get_mut(&agent_id) {
                        agent.needs.adjust(Need::Esteem, AGNOSIS * 0.1);
                        agent.remember(tick, "invested in the town", 0.6);
                    }
                }
            }
        }
        OracleAction::Recruit => {
            let faction = state.agents.get(&agent_id).and_then(|a| a.faction);
            let target = state.agents.get(&agent_id).and_then(|agent| {
                agent
                    .relationships
                    .iter()
                    .filter(|rel| rel.sentiment > 0.3)
                    .filter(|rel| {
                        state
                            .agents
                            .get(&rel.target)
                            .is_some_and(|t| t.alive && t.faction.is_none())
                    })
                    .max_by(|a, b| a.sentiment.total_cmp(&b.sentiment))
                    .map(|rel| rel.target)
            });
            if let (Some(faction_id), Some(target_id)) = (faction, target) {
                if let Some(recruit) = state.agents.get_mut(&target_id) {
                    recruit.faction = Some(faction_id);
                }
            }
        }
        OracleAction::ScoutRoute => {
            // Point the merchant at the best-margin destination in range.
            let preferred = home.and_then(|home_id| {
                let home_settlement = state.settlements.get(&home_id)?;
                state
                    .settlements
                    .values()
                    .filter(|s| s.is_active() && s.id != home_id)
                    .filter(|s| home_settlement.position.distance(s.position) <= 5)
                    .max_by(|a, b| {
                        let margin = |s: &telluria_types::Settlement| {
                            GoodKind::ALL
                                .iter()
                                .map(|g| {
                                    s.market.entry(*g).price
                                        - home_settlement.market.entry(*g).price
                                })
                                .fold(f64::MIN, f64::max)
                        };
                        margin(a).total_cmp(&margin(b)).then(b.id.cmp(&a.id))
                    })
                    .map(|s| s.id)
            });
            if let Some(agent) = state.agents.get_mut(&agent_id) {
                if let Some(trade) = agent.trade.as_mut() {
                    trade.preferred_destination = preferred;
                }
                agent.needs.adjust(Need::Purpose, AGNOSIS * 0.05);
            }
        }
        OracleAction::Speak => {
            let name = state
                .agents
                .get(&agent_id)
                .map_or_else(String::new, |a| a.name.clone());
            if let Some(home_id) = home {
                let members = state.members_of(home_id).to_vec();
                for member in members.iter().take(20) {
                    if let Some(listener) = state.agents.get_mut(member) {
                        if listener.alive && listener.id != agent_id {
                            listener.needs.adjust(Need::Belonging, AGNOSIS * 0.02);
                        }
                    }
                }
                state.emit(
                    Event::new(
                        tick,
                        EventCategory::Narrative,
                        format!("{name} spoke before the town"),
                    )
                    .with("agent", agent_id)
                    .with("settlement", home_id),
                );
            }
        }
        OracleAction::Relocate => {
            let target = state
                .settlements
                .values()
                .filter(|s| s.is_viable() && Some(s.id) != home)
                .max_by(|a, b| {
                    let score =
                        |s: &telluria_types::Settlement| s.treasury as f64 / f64::from(s.population.max(1));
                    score(a).total_cmp(&score(b)).then(b.id.cmp(&a.id))
                })
                .map(|s| (s.id, s.position));
            if let Some((target_id, target_position)) = target {
                if let Some(agent) = state.agents.get_mut(&agent_id) {
                    agent.home = Some(target_id);
                    agent.position = target_position;
                    agent.remember(tick, "moved on an oracle's counsel", 0.7);
                }
                state.rebuild_member_index();
            }
        }
        OracleAction::Retrain => {
            if let Some(agent) = state.agents.get_mut(&agent_id) {
                agent.occupation = adjacent_occupation(agent.occupation);
                agent.remember(tick, "retrained", 0.5);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{
        AxialCoord, CognitionTier, Governance, Settlement, Sex,
    };
    use telluria_world::HexMap;

    use super::*;
    use crate::state::{AgentSeed, WorldState};

    fn world_with_named_agent() -> (WorldState, SettlementId, AgentId) {
        let mut world = WorldState::new(21, HexMap::new(3));
        let sid = world.allocate_settlement_id();
        world.settlements.insert(
            sid,
            Settlement::found(
                sid,
                String::from("Harrowgate"),
                AxialCoord::new(0, 0),
                Governance::Council,
                0,
            ),
        );
        let id = world.create_agent(AgentSeed {
            name: String::from("Elwen Stonemere"),
            sex: Sex::Female,
            age: 40,
            position: AxialCoord::new(0, 0),
            home: Some(sid),
            occupation: Occupation::Scholar,
            tier: CognitionTier::Tier2,
            born_tick: 0,
        });
        world.rebuild_member_index();
        (world, sid, id)
    }

    #[test]
    fn weekly_batches_cover_the_roster_in_seven_days() {
        let ids: Vec<AgentId> = (1..=30).map(AgentId::new).collect();
        let mut covered = std::collections::BTreeSet::new();
        for day in 0..7u64 {
            for id in &ids {
                if due_today(*id, day) {
                    covered.insert(*id);
                }
            }
        }
        assert_eq!(covered.len(), 30, "roster not fully covered in a week");
    }

    #[test]
    fn contexts_are_built_only_for_due_named_agents() {
        let (mut world, _, id) = world_with_named_agent();
        // Find a day on which this agent is due.
        let due_day = (0..7u64).find(|day| due_today(id, *day)).unwrap();
        let contexts = build_contexts(&world, due_day);
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].agent, id);
        assert_eq!(contexts[0].settlement_name, "Harrowgate");
        assert!(!contexts[0].market_prices.is_empty());

        let off_day = due_day + 1;
        assert!(build_contexts(&world, off_day).is_empty());

        // Tier-0 agents never appear.
        world.agents.get_mut(&id).unwrap().tier = CognitionTier::Tier0;
        assert!(build_contexts(&world, due_day).is_empty());
    }

    #[test]
    fn unknown_tokens_are_ignored_with_an_event() {
        let (mut world, _, id) = world_with_named_agent();
        let wealth_before = world.agents[&id].wealth;

        apply_decision(
            &mut world,
            &OracleDecision {
                agent: id,
                tokens: vec![String::from("conquer_the_world")],
            },
        );

        assert_eq!(world.agents[&id].wealth, wealth_before);
        assert!(world
            .events()
            .any(|e| e.description.contains("unknown oracle token")));
    }

    #[test]
    fn invest_moves_wealth_into_the_treasury() {
        let (mut world, sid, id) = world_with_named_agent();
        world.agents.get_mut(&id).unwrap().wealth = 90;

        apply_decision(
            &mut world,
            &OracleDecision {
                agent: id,
                tokens: vec![String::from("invest")],
            },
        );

        assert_eq!(world.agents[&id].wealth, 60);
        assert_eq!(world.settlements[&sid].treasury, 30);
    }

    #[test]
    fn speak_lifts_the_town_and_leaves_prose() {
        let (mut world, sid, id) = world_with_named_agent();
        let listener = world.create_agent(AgentSeed {
            name: String::from("Listener"),
            sex: Sex::Male,
            age: 30,
            position: AxialCoord::new(0, 0),
            home: Some(sid),
            occupation: Occupation::Farmer,
            tier: CognitionTier::Tier0,
            born_tick: 0,
        });
        world.rebuild_member_index();
        let belonging_before = world.agents[&listener].needs.belonging;

        apply_decision(
            &mut world,
            &OracleDecision {
                agent: id,
                tokens: vec![String::from("speak")],
            },
        );

        assert!(world.agents[&listener].needs.belonging > belonging_before);
        assert!(world
            .events()
            .any(|e| e.category == EventCategory::Narrative));
    }

    #[test]
    fn retrain_switches_to_the_adjacent_trade() {
        let (mut world, _, id) = world_with_named_agent();
        apply_decision(
            &mut world,
            &OracleDecision {
                agent: id,
                tokens: vec![String::from("retrain")],
            },
        );
        assert_eq!(world.agents[&id].occupation, Occupation::Alchemist);
    }

    #[test]
    fn decisions_for_the_dead_are_dropped() {
        let (mut world, _, id) = world_with_named_agent();
        world.agents.get_mut(&id).unwrap().alive = false;
        let events_before = world.events_emitted();

        apply_decision(
            &mut world,
            &OracleDecision {
                agent: id,
                tokens: vec![String::from("work")],
            },
        );
        assert_eq!(world.events_emitted(), events_before);
    }

    #[test]
    fn null_oracle_decides_nothing() {
        let (world, _, id) = world_with_named_agent();
        let due_day = (0..7u64).find(|day| due_today(id, *day)).unwrap();
        let contexts = build_contexts(&world, due_day);
        assert!(NullOracle.decide(&contexts).is_empty());
        assert!(NullArchetypeOracle.refresh(0).is_none());
    }
}
