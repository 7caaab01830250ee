//! The layered tick cycle: minute → hour → day → week → season.
//!
//! One call to [`run_tick`] advances the clock once and fires every layer
//! whose period divides the new tick number, in dependency order. Within a
//! layer the ordering guarantees hold: markets resolve before merchant
//! routes; taxes before wealth decay before welfare; population before
//! relationships before crime; governance before Tier-2 decisions.
//!
//! All mutation happens here, sequentially, on the single writer's
//! exclusive borrow. Decision kernels never error; the only failure a tick
//! can surface is clock overflow.

use telluria_agents::{
    daily_food_spoilage, decide, eat, forage, perform_work, socialize_pair, template_for,
    travel_tick, update_wellbeing, AgentAction, DecisionContext,
};
use telluria_economy::{
    buy_food, resolve_market, run_daily_fiscal, run_merchant_pass,
};
use telluria_types::{
    AgentId, CognitionTier, Event, EventCategory, Season, SettlementId,
};
use telluria_world::{food_spoilage_factor, weekly_recovery, WeatherProvider};
use tracing::{debug, info};

use crate::clock::ClockError;
use crate::governance;
use crate::lifecycle;
use crate::oracle::{self, OracleDecision};
use crate::perpetuation;
use crate::population;
use crate::state::WorldState;
use crate::stats::collect_daily_stats;

/// Errors that can escape a tick.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The clock failed to advance.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },
}

/// External inputs consumed at layer boundaries.
pub struct TickInputs<'a> {
    /// Daily weather source (the deterministic fallback or a live adapter).
    pub weather: &'a mut dyn WeatherProvider,
    /// Oracle decisions collected by the runner between ticks; applied in
    /// the day layer, after governance.
    pub oracle_decisions: &'a [OracleDecision],
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    /// The tick that just ran.
    pub tick: u64,
    /// Season during the tick.
    pub season: Season,
    /// Units cleared across all markets this tick.
    pub trades: u64,
    /// Deaths this tick.
    pub deaths: u32,
    /// Births this tick.
    pub births: u32,
}

/// Execute one complete tick.
pub fn run_tick(state: &mut WorldState, inputs: &mut TickInputs<'_>) -> Result<TickSummary, TickError> {
    let tick = state.clock.advance()?;
    let season = state.clock.season();

    let mut summary = TickSummary {
        tick,
        season,
        trades: 0,
        deaths: 0,
        births: 0,
    };

    // --- Minute layer: every tick ---
    minute_layer(state);

    // --- Hour layer: markets, then merchant routes ---
    if state.clock.is_hour_boundary() {
        summary.trades = hour_layer(state, season);
    }

    // --- Day layer ---
    if state.clock.is_day_boundary() {
        let (deaths, births) = day_layer(state, inputs, season);
        summary.deaths = deaths;
        summary.births = births;
    }

    // --- Week layer ---
    if state.clock.is_week_boundary() {
        week_layer(state, season);
    }

    // --- Season layer ---
    if state.clock.is_season_boundary() {
        info!(tick, ?season, "season turned");
        state.emit(
            Event::new(tick, EventCategory::System, "the season turned")
                .with("season", format!("{season:?}")),
        );
    }

    debug!(tick, trades = summary.trades, "tick complete");
    Ok(summary)
}

/// The minute layer: every live agent's kernel, in id order.
fn minute_layer(state: &mut WorldState) {
    let tick = state.clock.tick();
    let week = state.clock.week();
    let agent_ids: Vec<AgentId> = state.agents.keys().copied().collect();

    for id in agent_ids {
        let Some(agent) = state.agents.get(&id) else { continue };
        if !agent.alive {
            continue;
        }

        // Traveling merchants walk the road instead of running the kernel.
        if agent.trade.as_ref().is_some_and(telluria_types::TradeState::is_traveling) {
            if let Some(agent) = state.agents.get_mut(&id) {
                travel_tick(agent);
                update_wellbeing(agent);
            }
            continue;
        }

        let home = agent.home;
        let tier = agent.tier;
        let position = agent.position;

        // Settlement-derived context.
        let (market_reachable, cheapest_food_price, workplace, boost) = home
            .and_then(|h| state.settlements.get(&h))
            .filter(|s| s.is_active())
            .map_or((false, None, position, 1.0), |s| {
                (
                    true,
                    Some(s.market.cheapest_food().1),
                    s.position,
                    s.boost_at(tick),
                )
            });

        let template = (tier == CognitionTier::Tier1)
            .then(|| template_for(id, week, &state.templates))
            .flatten()
            .cloned();

        // Decay needs, then decide.
        if let Some(agent) = state.agents.get_mut(&id) {
            telluria_agents::decay_needs(&mut agent.needs);
        }
        let action = {
            let Some(agent) = state.agents.get(&id) else { continue };
            let nearby = home.map_or(&[][..], |h| state.members_of(h));
            let context = DecisionContext {
                market_reachable,
                cheapest_food_price,
                nearby,
                template: template.as_ref(),
            };
            decide(agent, &context)
        };

        // Resolve.
        match action {
            AgentAction::Work => {
                if let Some(agent) = state.agents.get_mut(&id) {
                    let _ = perform_work(agent, &mut state.map, workplace, tick, boost);
                }
            }
            AgentAction::Eat => {
                if let Some(agent) = state.agents.get_mut(&id) {
                    let _ = eat(agent);
                }
            }
            AgentAction::BuyFood => {
                let mut bought = None;
                if let Some(h) = home {
                    let members = state.members_of(h).to_vec();
                    if let Some(settlement) = state.settlements.get(&h) {
                        bought = buy_food(&mut state.agents, id, &members, settlement);
                    }
                }
                if bought.is_none() {
                    if let Some(agent) = state.agents.get_mut(&id) {
                        let _ = forage(agent, &mut state.map, tick);
                    }
                }
            }
            AgentAction::Forage => {
                if let Some(agent) = state.agents.get_mut(&id) {
                    let _ = forage(agent, &mut state.map, tick);
                }
            }
            AgentAction::Socialize(partner) => {
                socialize_pair(&mut state.agents, id, partner);
            }
            AgentAction::Idle => {}
        }

        // Clamp and recompute the wellbeing register.
        if let Some(agent) = state.agents.get_mut(&id) {
            update_wellbeing(agent);
        }
    }
}

/// The hour layer: every settlement's market, then the merchant pass.
fn hour_layer(state: &mut WorldState, season: Season) -> u64 {
    let tick = state.clock.tick();
    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();

    let mut trades = 0u64;
    for sid in &settlement_ids {
        let members = state.members_of(*sid).to_vec();
        let Some(settlement) = state.settlements.get_mut(sid) else {
            continue;
        };
        let report = resolve_market(settlement, &mut state.agents, &members, season, tick);
        trades += report.trades;
        state.counters.trade_volume += report.trades;
    }

    // Merchant routes run strictly after markets.
    let member_index = state.member_index().clone();
    let mut events = Vec::new();
    run_merchant_pass(
        &mut state.agents,
        &mut state.settlements,
        &member_index,
        &state.map,
        tick,
        &mut events,
    );
    for event in events {
        state.emit(event);
    }
    trades
}

/// The day layer: weather and spoilage, fiscal, population, relationships,
/// crime, governance, Tier-2 decisions, stats.
fn day_layer(
    state: &mut WorldState,
    inputs: &mut TickInputs<'_>,
    season: Season,
) -> (u32, u32) {
    let tick = state.clock.tick();
    let day = state.clock.sim_day();

    // Weather is an external input; record it so replays can reproduce it.
    let weather = inputs.weather.daily_weather(day, season);
    state.emit(
        Event::new(tick, EventCategory::System, "the sky was read")
            .with("weather", format!("{weather:?}"))
            .with("day", day),
    );
    let spoilage = food_spoilage_factor(weather, season);
    for agent in state.agents.values_mut() {
        if agent.alive {
            let _ = daily_food_spoilage(agent, spoilage);
        }
    }

    // Fiscal loop: taxes, then decay, then welfare -- per settlement.
    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();
    let mut events = Vec::new();
    for sid in &settlement_ids {
        let members = state.members_of(*sid).to_vec();
        let Some(settlement) = state.settlements.get_mut(sid) else {
            continue;
        };
        let _ = run_daily_fiscal(settlement, &mut state.agents, &members, tick, &mut events);
    }

    // Population, then relationships, then crime.
    let report = population::run_daily_population(state);

    for sid in &settlement_ids {
        let members = state.members_of(*sid).to_vec();
        let _ = telluria_agents::run_daily_pairups(&mut state.agents, &members, *sid, tick);
    }

    for sid in &settlement_ids {
        let members = state.members_of(*sid).to_vec();
        let Some(settlement) = state.settlements.get_mut(sid) else {
            continue;
        };
        let _ = telluria_agents::run_daily_crime(
            &mut state.agents,
            &members,
            settlement,
            tick,
            &mut events,
        );
    }
    for event in events {
        state.emit(event);
    }

    // Governance before Tier-2 decisions.
    governance::run_daily_governance(state);
    for decision in inputs.oracle_decisions {
        oracle::apply_decision(state, decision);
    }

    // Close the day with a statistics row.
    let stats = collect_daily_stats(state);
    state.stats_history.push(stats);

    (report.deaths, report.births)
}

/// The week layer: lifecycle, perpetuation, factions, social fabric, and
/// the land's fallow recovery.
fn week_layer(state: &mut WorldState, season: Season) {
    let tick = state.clock.tick();

    let _ = lifecycle::run_weekly_lifecycle(state);
    let _ = perpetuation::run_weekly_perpetuation(state);
    governance::run_weekly_factions(state);

    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();
    let mut events = Vec::new();
    for sid in settlement_ids {
        let members = state.members_of(sid).to_vec();
        telluria_agents::run_weekly_social(&mut state.agents, &members, tick, &mut events);
    }
    for event in events {
        state.emit(event);
    }

    weekly_recovery(&mut state.map, tick, season);
    state.rebuild_member_index();
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{
        AxialCoord, Governance, Occupation, Settlement, Sex, TICKS_PER_DAY, TICKS_PER_HOUR,
    };
    use telluria_world::{generate_world, DeterministicWeather};

    use super::*;
    use crate::state::AgentSeed;
    use crate::stats::world_crowns;

    fn seeded_world() -> WorldState {
        let mut world = WorldState::new(404, generate_world(404, 6));
        let sid = world.allocate_settlement_id();
        // Put the settlement on a real interior hex.
        let position = world
            .map
            .iter()
            .find(|hex| telluria_world::habitable(hex))
            .map(|hex| hex.coord)
            .unwrap_or_else(|| AxialCoord::new(0, 0));
        world.settlements.insert(
            sid,
            Settlement::found(
                sid,
                String::from("Harrowgate"),
                position,
                Governance::Council,
                0,
            ),
        );
        if let Some(hex) = world.map.get_mut(position) {
            hex.settlement = Some(sid);
        }

        let occupations = [
            Occupation::Farmer,
            Occupation::Farmer,
            Occupation::Fisher,
            Occupation::Miner,
            Occupation::Laborer,
            Occupation::Crafter,
            Occupation::Merchant,
            Occupation::Soldier,
            Occupation::Scholar,
            Occupation::Alchemist,
        ];
        for (i, occupation) in occupations.iter().cycle().take(30).enumerate() {
            let id = world.create_agent(AgentSeed {
                name: format!("Seed {i}"),
                sex: if i % 2 == 0 { Sex::Female } else { Sex::Male },
                age: 20 + (i as u32 % 30),
                position,
                home: Some(sid),
                occupation: *occupation,
                tier: telluria_types::CognitionTier::Tier0,
                born_tick: 0,
            });
            world.agents.get_mut(&id).unwrap().wealth = 25;
        }
        world.rebuild_member_index();
        world
    }

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
    fn ticks_advance_the_clock() {
        let mut world = seeded_world();
        run_ticks(&mut world, 10);
        assert_eq!(world.clock.tick(), 10);
    }

    #[test]
    fn a_full_day_conserves_crowns() {
        let mut world = seeded_world();
        let before = world_crowns(&world);
        run_ticks(&mut world, TICKS_PER_DAY + 1);
        assert_eq!(world_crowns(&world), before, "a day of life leaked crowns");
    }

    #[test]
    fn hour_boundaries_resolve_markets() {
        let mut world = seeded_world();
        run_ticks(&mut world, TICKS_PER_HOUR * 3);
        // The market entries were rebuilt at least once (supply floors are
        // nonzero even with no surplus).
        let settlement = world.settlements.values().next().unwrap();
        let any_signal = settlement
            .market
            .iter()
            .any(|(_, entry)| entry.supply > 0.0 || entry.demand > 0.0);
        assert!(any_signal, "no market signals after three hours");
    }

    #[test]
    fn day_boundaries_append_stats() {
        let mut world = seeded_world();
        run_ticks(&mut world, TICKS_PER_DAY * 2);
        assert_eq!(world.stats_history.len(), 2);
        assert_eq!(world.stats_history[0].day, 1);
    }

    #[test]
    fn member_index_matches_forward_rebuild_after_ticks() {
        let mut world = seeded_world();
        run_ticks(&mut world, TICKS_PER_DAY);

        let snapshot: Vec<(telluria_types::SettlementId, Vec<AgentId>)> = world
            .member_index()
            .iter()
            .map(|(sid, members)| (*sid, members.clone()))
            .collect();
        world.rebuild_member_index();
        let rebuilt: Vec<(telluria_types::SettlementId, Vec<AgentId>)> = world
            .member_index()
            .iter()
            .map(|(sid, members)| (*sid, members.clone()))
            .collect();
        assert_eq!(snapshot, rebuilt, "index drifted from the forward rebuild");
    }

    #[test]
    fn hex_bounds_hold_under_simulation() {
        let mut world = seeded_world();
        run_ticks(&mut world, TICKS_PER_DAY);
        for hex in world.map.iter() {
            assert!((0.0..=1.0).contains(&hex.health), "health out of bounds");
            for kind in telluria_types::ResourceKind::ALL {
                let amount = hex.resources.get(kind);
                let cap = telluria_world::resource_cap(hex.terrain, kind);
                assert!(
                    amount >= 0.0 && amount <= cap + 1e-9,
                    "{:?} {kind:?} out of bounds: {amount}",
                    hex.coord
                );
            }
        }
    }

    #[test]
    fn price_bands_hold_under_simulation() {
        let mut world = seeded_world();
        run_ticks(&mut world, TICKS_PER_DAY);
        for settlement in world.settlements.values() {
            for (_, entry) in settlement.market.iter() {
                assert!(
                    entry.price >= entry.base_price * telluria_types::AGNOSIS - 1e-9
                        && entry.price <= entry.base_price * telluria_types::TOTALITY + 1e-9,
                    "price {} outside band",
                    entry.price
                );
            }
        }
    }
}
