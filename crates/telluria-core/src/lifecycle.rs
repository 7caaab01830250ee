//! The weekly settlement lifecycle: diaspora, founding, abandonment,
//! viability consolidation, and infrastructure.
//!
//! Overmass settlements shed roughly an `Agnosis` fraction of their young
//! along golden-angle scan directions; a habitable unsettled hex three to
//! five steps out becomes a new Council-governed settlement seeded with a
//! third of each emigrant's wealth. A settlement empty for two consecutive
//! weekly checks is abandoned and its treasury split among the three
//! nearest actives. A settlement under the viability floor for two weeks is
//! marked non-viable and its members consolidated into the nearest viable
//! neighbor.

use telluria_types::{
    stable_hash, AgentId, AxialCoord, Event, EventCategory, Governance, Occupation, Settlement,
    SettlementId, SocialRole, AGNOSIS, GOLDEN_ANGLE,
};
use telluria_world::{habitable, names};
use tracing::{debug, info};

use crate::state::WorldState;

/// Age below which an agent counts as "young" for the diaspora.
pub const DIASPORA_MAX_AGE: u32 = 35;

/// Scan distances for a founding site, in hexes.
pub const FOUNDING_SCAN_RANGE: std::ops::RangeInclusive<i32> = 3..=5;

/// Members below which a settlement is tracked toward non-viability.
pub const VIABILITY_FLOOR: usize = 25;

/// Consecutive empty weekly checks before abandonment.
pub const ABANDONMENT_WEEKS: u8 = 2;

/// Consecutive under-floor weekly checks before the non-viable mark.
pub const VIABILITY_WEEKS: u8 = 2;

/// Range within which a non-viable settlement's members consolidate.
pub const CONSOLIDATION_RANGE: u32 = 8;

/// Road upgrade gates.
pub const ROAD_MIN_POPULATION: u32 = 50;
/// Road upgrade cost per head.
pub const ROAD_COST_PER_HEAD: u64 = 20;
/// Wall upgrade gates.
pub const WALL_MIN_POPULATION: u32 = 100;
/// Wall upgrade cost per head.
pub const WALL_COST_PER_HEAD: u64 = 30;

/// What the weekly lifecycle pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    /// New settlements founded.
    pub founded: u32,
    /// Settlements abandoned.
    pub abandoned: u32,
    /// Settlements newly marked non-viable.
    pub marked_non_viable: u32,
    /// Infrastructure upgrades completed.
    pub upgrades: u32,
}

/// Run the weekly lifecycle pass.
pub fn run_weekly_lifecycle(state: &mut WorldState) -> LifecycleReport {
    let tick = state.clock.tick();
    let mut report = LifecycleReport::default();

    let settlement_ids: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active())
        .map(|s| s.id)
        .collect();

    for settlement_id in &settlement_ids {
        report.founded += u32::from(check_overmass(state, *settlement_id, tick));
    }
    state.rebuild_member_index();

    for settlement_id in &settlement_ids {
        report.abandoned += u32::from(check_abandonment(state, *settlement_id, tick));
        report.marked_non_viable += u32::from(check_viability(state, *settlement_id, tick));
    }
    state.rebuild_member_index();

    for settlement_id in &settlement_ids {
        report.upgrades += u32::from(upgrade_infrastructure(state, *settlement_id, tick));
    }

    debug!(tick, ?report, "weekly lifecycle");
    report
}

/// Overmass diaspora and founding. Returns whether a settlement was founded.
fn check_overmass(state: &mut WorldState, settlement_id: SettlementId, tick: u64) -> bool {
    let Some(settlement) = state.settlements.get(&settlement_id) else {
        return false;
    };
    let population = settlement.population;
    if f64::from(population) <= settlement.capacity() {
        return false;
    }
    let origin = settlement.position;
    let origin_name = settlement.name.clone();

    // Roughly an Agnosis fraction of the settlement, drawn from its young
    // non-leaders, in id order.
    let quota = (f64::from(population) * AGNOSIS).floor() as usize;
    let emigrants: Vec<AgentId> = state
        .members_of(settlement_id)
        .iter()
        .filter(|id| {
            state.agents.get(*id).is_some_and(|a| {
                a.alive && a.age < DIASPORA_MAX_AGE && a.role != SocialRole::Leader
            })
        })
        .take(quota)
        .copied()
        .collect();
    if emigrants.is_empty() {
        return false;
    }

    let Some(site) = scan_founding_site(state, origin) else {
        return false;
    };

    // Found the new settlement.
    let new_id = state.allocate_settlement_id();
    let name = names::settlement_name(stable_hash(&[settlement_id.raw(), tick, 0xF0D4]));
    let mut founded = Settlement::found(new_id, name.clone(), site, Governance::Council, tick);

    // Pool a third of each founder's wealth into the new treasury.
    let mut pooled = 0u64;
    for id in &emigrants {
        if let Some(agent) = state.agents.get_mut(id) {
            let contribution = agent.wealth / 3;
            agent.wealth -= contribution;
            pooled = pooled.saturating_add(contribution);
            agent.home = Some(new_id);
            agent.position = site;
            agent.remember(tick, format!("left {origin_name} to found {name}"), 0.9);
        }
    }
    founded.treasury = pooled;
    state.settlements.insert(new_id, founded);
    if let Some(hex) = state.map.get_mut(site) {
        hex.settlement = Some(new_id);
    }

    info!(
        settlement = %new_id,
        name,
        founders = emigrants.len(),
        treasury = pooled,
        "diaspora founded a settlement"
    );
    state.emit(
        Event::new(tick, EventCategory::Political, format!("{name} was founded"))
            .with("settlement", new_id)
            .with("origin", settlement_id)
            .with("founders", emigrants.len()),
    );
    true
}

/// Scan six golden-angle directions, three to five hexes out, for a
/// habitable unsettled hex.
fn scan_founding_site(state: &WorldState, origin: AxialCoord) -> Option<AxialCoord> {
    for k in 0..6u32 {
        let angle = f64::from(k) * GOLDEN_ANGLE;
        let direction = AxialCoord::direction_from_angle(angle);
        for distance in FOUNDING_SCAN_RANGE {
            let candidate = origin.offset(direction, distance);
            if let Some(hex) = state.map.get(candidate) {
                if habitable(hex) {
                    return Some(candidate);
                }
            }
        }
    }
    None
}

/// Two empty weekly checks abandon a settlement. Returns whether it
/// happened this week.
fn check_abandonment(state: &mut WorldState, settlement_id: SettlementId, tick: u64) -> bool {
    let live_members = state
        .members_of(settlement_id)
        .iter()
        .filter(|id| state.agents.get(*id).is_some_and(|a| a.alive))
        .count();

    let Some(settlement) = state.settlements.get_mut(&settlement_id) else {
        return false;
    };
    if live_members > 0 {
        settlement.empty_weeks = 0;
        return false;
    }
    settlement.empty_weeks = settlement.empty_weeks.saturating_add(1);
    if settlement.empty_weeks < ABANDONMENT_WEEKS {
        return false;
    }

    settlement.abandoned = true;
    let treasury = std::mem::take(&mut settlement.treasury);
    let position = settlement.position;
    let name = settlement.name.clone();
    state.counters.abandoned_settlements += 1;

    // Split the treasury among the three nearest active settlements.
    let mut heirs: Vec<SettlementId> = state
        .settlements
        .values()
        .filter(|s| s.is_active() && s.id != settlement_id)
        .map(|s| s.id)
        .collect();
    heirs.sort_by_key(|id| {
        let distance = state
            .settlements
            .get(id)
            .map_or(u32::MAX, |s| position.distance(s.position));
        (distance, *id)
    });
    heirs.truncate(3);

    if heirs.is_empty() {
        // Nothing left to inherit the coffers; put them back untouched so
        // no crowns vanish.
        if let Some(settlement) = state.settlements.get_mut(&settlement_id) {
            settlement.treasury = treasury;
        }
    } else {
        let shares = telluria_economy::transfer::split_three(treasury);
        for (heir, share) in heirs.iter().zip(shares) {
            if let Some(s) = state.settlements.get_mut(heir) {
                s.treasury = s.treasury.saturating_add(share);
            }
        }
        // With fewer than three heirs, the unassigned shares go to the
        // first.
        if heirs.len() < 3 {
            let unassigned: u64 = shares.iter().skip(heirs.len()).sum();
            if let Some(first) = heirs.first().and_then(|id| state.settlements.get_mut(id)) {
                first.treasury = first.treasury.saturating_add(unassigned);
            }
        }
    }

    if let Some(hex) = state.map.get_mut(position) {
        hex.settlement = None;
    }

    info!(settlement = %settlement_id, name, "settlement abandoned");
    state.emit(
        Event::new(tick, EventCategory::Political, format!("{name} fell silent"))
            .with("settlement", settlement_id)
            .with("treasury", treasury),
    );
    true
}

/// Two under-floor weekly checks mark non-viability and consolidate.
fn check_viability(state: &mut WorldState, settlement_id: SettlementId, tick: u64) -> bool {
    let live: Vec<AgentId> = state
        .members_of(settlement_id)
        .iter()
        .filter(|id| state.agents.get(*id).is_some_and(|a| a.alive))
        .copied()
        .collect();

    let Some(settlement) = state.settlements.get_mut(&settlement_id) else {
        return false;
    };
    if settlement.abandoned || settlement.non_viable {
        return false;
    }
    if live.is_empty() || live.len() >= VIABILITY_FLOOR {
        settlement.low_weeks = 0;
        return false;
    }
    settlement.low_weeks = settlement.low_weeks.saturating_add(1);
    if settlement.low_weeks < VIABILITY_WEEKS {
        return false;
    }

    settlement.non_viable = true;
    let position = settlement.position;
    let name = settlement.name.clone();
    state.counters.non_viable_marks += 1;

    // Force-migrate the remainder to the nearest viable settlement in
    // range.
    let target = state
        .settlements
        .values()
        .filter(|s| s.is_viable() && s.id != settlement_id)
        .filter(|s| position.distance(s.position) <= CONSOLIDATION_RANGE)
        .min_by_key(|s| (position.distance(s.position), s.id))
        .map(|s| (s.id, s.position));

    if let Some((target_id, target_position)) = target {
        for id in &live {
            if let Some(agent) = state.agents.get_mut(id) {
                agent.home = Some(target_id);
                agent.position = target_position;
                agent.remember(tick, format!("left dying {name}"), 0.8);
            }
        }
    }

    info!(settlement = %settlement_id, name, "settlement marked non-viable");
    state.emit(
        Event::new(tick, EventCategory::Political, format!("{name} is failing"))
            .with("settlement", settlement_id)
            .with("remaining", live.len()),
    );
    true
}

/// At most one infrastructure upgrade per settlement per week, its cost
/// paid out as wages to the settlement's builders.
fn upgrade_infrastructure(state: &mut WorldState, settlement_id: SettlementId, tick: u64) -> bool {
    let members = state.members_of(settlement_id).to_vec();
    let Some(settlement) = state.settlements.get_mut(&settlement_id) else {
        return false;
    };
    if settlement.abandoned {
        return false;
    }
    let population = settlement.population;

    let (kind, cost) = if population >= ROAD_MIN_POPULATION
        && settlement.road_level < 5
        && settlement.treasury >= ROAD_COST_PER_HEAD * u64::from(population)
    {
        settlement.road_level += 1;
        ("roads", ROAD_COST_PER_HEAD * u64::from(population))
    } else if population >= WALL_MIN_POPULATION
        && settlement.wall_level < 5
        && settlement.treasury >= WALL_COST_PER_HEAD * u64::from(population)
    {
        settlement.wall_level += 1;
        ("walls", WALL_COST_PER_HEAD * u64::from(population))
    } else {
        return false;
    };

    settlement.treasury -= cost;
    let name = settlement.name.clone();

    // Wages: the cost goes to the builders, keeping every crown accounted.
    let builders: Vec<AgentId> = {
        let by_trade: Vec<AgentId> = members
            .iter()
            .filter(|id| {
                state.agents.get(*id).is_some_and(|a| {
                    a.alive
                        && matches!(
                            a.occupation,
                            Occupation::Laborer | Occupation::Miner | Occupation::Crafter
                        )
                })
            })
            .copied()
            .collect();
        if by_trade.is_empty() { members.clone() } else { by_trade }
    };
    if builders.is_empty() {
        // No one to pay; the coffers keep the cost.
        if let Some(settlement) = state.settlements.get_mut(&settlement_id) {
            settlement.treasury += cost;
        }
        return false;
    }
    let share = cost / builders.len() as u64;
    let mut remainder = cost - share * builders.len() as u64;
    for id in &builders {
        if let Some(agent) = state.agents.get_mut(id) {
            let wage = share + std::mem::take(&mut remainder);
            agent.wealth = agent.wealth.saturating_add(wage);
        }
    }

    state.emit(
        Event::new(tick, EventCategory::Economic, format!("{name} raised its {kind}"))
            .with("settlement", settlement_id)
            .with("wages", cost),
    );
    true
}
