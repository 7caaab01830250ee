//! Merchant routes: the hourly pass.
//!
//! Merchants are ordinary agents with one extra privilege each hour. An idle
//! merchant with working capital scans for the best-margin good within range,
//! buys up to five units at home -- personal wealth first, settlement
//! treasury second as consignment debt -- provisions food for the road, and
//! departs on a greedy terrain-cost path. The minute layer walks the travel
//! timer; this pass handles departures and arrivals.
//!
//! On arrival the cargo sells unit-by-unit against the destination treasury,
//! consignment debt is repaid first, and any Tier-2 merchant resident in the
//! destination takes a commission (capped at `Agnosis` of revenue) out of
//! the seller's pocket. Every flow is a transfer.

use std::collections::BTreeMap;

use telluria_types::{
    Agent, AgentId, CognitionTier, Event, EventCategory, GoodKind, Occupation, Settlement,
    SettlementId, TradeState, AGNOSIS, BEING,
};
use telluria_world::HexMap;
use tracing::debug;

use crate::market::surplus_threshold;
use crate::transfer::move_crowns;

/// Working capital required before a merchant plans a route.
pub const MERCHANT_MIN_WEALTH: u64 = 20;

/// Maximum route distance in hexes.
pub const MERCHANT_MAX_RANGE: u32 = 5;

/// Maximum cargo units per route.
pub const MERCHANT_MAX_UNITS: u32 = 5;

/// Minimum per-unit price margin, in crowns, to make a route worth riding.
pub const MARGIN_FLOOR: f64 = BEING;

/// Commission cap as a fraction of arrival revenue.
pub const COMMISSION_CAP: f64 = AGNOSIS;

/// Run the hourly merchant pass over every live merchant.
///
/// Returns the number of departures plus arrivals this hour.
pub fn run_merchant_pass(
    agents: &mut BTreeMap<AgentId, Agent>,
    settlements: &mut BTreeMap<SettlementId, Settlement>,
    members: &BTreeMap<SettlementId, Vec<AgentId>>,
    map: &HexMap,
    tick: u64,
    events: &mut Vec<Event>,
) -> u32 {
    let merchant_ids: Vec<AgentId> = agents
        .values()
        .filter(|a| a.alive && a.occupation == Occupation::Merchant)
        .map(|a| a.id)
        .collect();

    let mut moves = 0u32;
    for id in merchant_ids {
        // Make sure the trade record exists before anything else.
        if let Some(agent) = agents.get_mut(&id) {
            if agent.trade.is_none() {
                agent.trade = Some(TradeState::default());
            }
        }

        let Some(agent) = agents.get(&id) else { continue };
        let Some(trade) = agent.trade.as_ref() else { continue };

        if trade.is_traveling() {
            continue;
        }
        if trade.destination.is_some() {
            if arrive(agents, settlements, members, id, tick, events) {
                moves += 1;
            }
        } else if trade.is_idle() && agent.wealth >= MERCHANT_MIN_WEALTH {
            if plan_route(agents, settlements, members, map, id, tick, events) {
                moves += 1;
            }
        }
    }
    moves
}

/// Sell cargo at the destination, repay consignment, pay commission.
fn arrive(
    agents: &mut BTreeMap<AgentId, Agent>,
    settlements: &mut BTreeMap<SettlementId, Settlement>,
    members: &BTreeMap<SettlementId, Vec<AgentId>>,
    id: AgentId,
    tick: u64,
    events: &mut Vec<Event>,
) -> bool {
    // Pull what we need from the merchant before touching other agents.
    let (dest_id, home_id, cargo) = {
        let Some(agent) = agents.get_mut(&id) else {
            return false;
        };
        let Some(trade) = agent.trade.as_mut() else {
            return false;
        };
        let Some(dest_id) = trade.destination.take() else {
            return false;
        };
        (dest_id, agent.home, trade.cargo.drain())
    };

    let Some(dest) = settlements.get_mut(&dest_id) else {
        // Destination vanished mid-route; keep the goods.
        if let Some(agent) = agents.get_mut(&id) {
            for (good, units) in cargo {
                agent.inventory.add(good, units);
            }
        }
        return false;
    };

    // Unit-by-unit sale against the destination treasury.
    let mut revenue = 0u64;
    let mut units_sold = 0u32;
    for (good, units) in cargo {
        let price = dest.market.entry(good).price;
        let cost = price.round().max(0.0) as u64;
        let mut sold = 0u32;
        for _ in 0..units {
            if dest.treasury < cost {
                break;
            }
            if let Some(agent) = agents.get_mut(&id) {
                revenue += move_crowns(&mut dest.treasury, &mut agent.wealth, cost);
            }
            sold += 1;
        }
        if sold > 0 {
            let entry = dest.market.entry_mut(good);
            entry.supply += f64::from(sold);
            entry.trade_count += u64::from(sold);
            units_sold += sold;
        }
        let unsold = units - sold;
        if unsold > 0 {
            if let Some(agent) = agents.get_mut(&id) {
                agent.inventory.add(good, unsold);
            }
        }
    }

    let dest_position = dest.position;

    // Consignment debt is repaid first; nobody takes a cut of proceeds the
    // home treasury is still owed.
    if let Some(agent) = agents.get_mut(&id) {
        agent.position = dest_position;
        let debt = agent.trade.as_ref().map_or(0, |t| t.consignment_debt);
        if debt > 0 {
            if let Some(home) = home_id.and_then(|h| settlements.get_mut(&h)) {
                let mut wealth = agent.wealth;
                let repaid = move_crowns(&mut wealth, &mut home.treasury, debt);
                agent.wealth = wealth;
                if let Some(trade) = agent.trade.as_mut() {
                    trade.consignment_debt -= repaid;
                }
            }
        }
        agent.remember(tick, "sold a caravan load", 0.5);
    }

    // Only then does a resident Tier-2 merchant take a commission, capped
    // at `Agnosis` of revenue, out of whatever the seller has left.
    let commission_cap = (revenue as f64 * COMMISSION_CAP).floor() as u64;
    if commission_cap > 0 {
        let broker = members
            .get(&dest_id)
            .into_iter()
            .flatten()
            .find(|member| {
                **member != id
                    && agents.get(*member).is_some_and(|a| {
                        a.alive
                            && a.occupation == Occupation::Merchant
                            && a.tier == CognitionTier::Tier2
                    })
            })
            .copied();
        if let Some(broker_id) = broker {
            let mut taken = 0u64;
            if let Some(agent) = agents.get_mut(&id) {
                let mut escrow = 0u64;
                taken = move_crowns(&mut agent.wealth, &mut escrow, commission_cap);
            }
            if let Some(broker_agent) = agents.get_mut(&broker_id) {
                broker_agent.wealth = broker_agent.wealth.saturating_add(taken);
            }
        }
    }

    events.push(
        Event::new(tick, EventCategory::Economic, "a caravan came in")
            .with("agent", id)
            .with("settlement", dest_id)
            .with("units", units_sold)
            .with("revenue", revenue),
    );
    true
}

/// Scan for the best-margin route and depart on it.
#[allow(clippy::too_many_lines)]
fn plan_route(
    agents: &mut BTreeMap<AgentId, Agent>,
    settlements: &mut BTreeMap<SettlementId, Settlement>,
    members: &BTreeMap<SettlementId, Vec<AgentId>>,
    map: &HexMap,
    id: AgentId,
    tick: u64,
    events: &mut Vec<Event>,
) -> bool {
    let (home_id, preferred) = {
        let Some(agent) = agents.get(&id) else {
            return false;
        };
        (
            agent.home,
            agent.trade.as_ref().and_then(|t| t.preferred_destination),
        )
    };
    let Some(home_id) = home_id else { return false };
    let Some(home) = settlements.get(&home_id) else {
        return false;
    };
    let home_position = home.position;

    // Best (margin, destination, good) within range; an oracle-scouted
    // preference wins ties by being examined first.
    let mut candidates: Vec<SettlementId> = settlements
        .values()
        .filter(|s| s.id != home_id && s.is_active())
        .filter(|s| home_position.distance(s.position) <= MERCHANT_MAX_RANGE)
        .map(|s| s.id)
        .collect();
    if let Some(pref) = preferred {
        candidates.sort_by_key(|sid| (*sid != pref, *sid));
    }

    let mut best: Option<(f64, SettlementId, GoodKind, u64)> = None;
    for dest_id in candidates {
        let Some(dest) = settlements.get(&dest_id) else { continue };
        let Some(travel) = map.travel_ticks(home_position, dest.position) else {
            continue;
        };
        for good in GoodKind::ALL {
            let margin = dest.market.entry(good).price - home.market.entry(good).price;
            if margin < MARGIN_FLOOR {
                continue;
            }
            if best.as_ref().is_none_or(|(m, ..)| margin > *m) {
                best = Some((margin, dest_id, good, travel));
            }
        }
    }
    let Some((_, dest_id, good, travel_ticks)) = best else {
        return false;
    };

    // Buy cargo at home: personal wealth first, treasury consignment second.
    let home_members: Vec<AgentId> = members.get(&home_id).cloned().unwrap_or_default();
    let unit_cost = {
        let Some(home) = settlements.get(&home_id) else {
            return false;
        };
        home.market.entry(good).price.round().max(0.0) as u64
    };

    let mut bought = 0u32;
    let threshold = surplus_threshold(good);
    for _ in 0..MERCHANT_MAX_UNITS {
        let seller_id = home_members
            .iter()
            .filter(|m| **m != id)
            .filter(|m| {
                agents
                    .get(*m)
                    .is_some_and(|a| a.alive && a.inventory.get(good) > threshold)
            })
            .max_by_key(|m| agents.get(*m).map_or(0, |a| a.inventory.get(good)))
            .copied();
        let Some(seller_id) = seller_id else { break };

        // Top up from the treasury as consignment if short.
        let wealth = agents.get(&id).map_or(0, |a| a.wealth);
        if wealth < unit_cost {
            let needed = unit_cost - wealth;
            let Some(home) = settlements.get_mut(&home_id) else {
                break;
            };
            if home.treasury < needed {
                break;
            }
            if let Some(agent) = agents.get_mut(&id) {
                let borrowed = move_crowns(&mut home.treasury, &mut agent.wealth, needed);
                if let Some(trade) = agent.trade.as_mut() {
                    trade.consignment_debt += borrowed;
                }
            }
        }

        // Pay the seller and load the unit.
        let mut seller_wealth = match agents.get(&seller_id) {
            Some(seller) => seller.wealth,
            None => break,
        };
        let Some(agent) = agents.get_mut(&id) else { break };
        if move_crowns(&mut agent.wealth, &mut seller_wealth, unit_cost) < unit_cost {
            break;
        }
        if let Some(trade) = agent.trade.as_mut() {
            trade.cargo.add(good, 1);
        }
        if let Some(seller) = agents.get_mut(&seller_id) {
            seller.wealth = seller_wealth;
            seller.inventory.take(good, 1);
        }
        bought += 1;
    }

    if bought == 0 {
        // Undo nothing: no cargo, no route. Any consignment drawn stays as
        // debt and is repaid by the ordinary arrival flow next route.
        return false;
    }

    // Provision for the road.
    let food_needed = (travel_ticks / 60 + 2) as u32;
    let held = agents.get(&id).map_or(0, |a| a.inventory.food_units());
    if held < food_needed {
        let shortfall = food_needed - held;
        let settlement_ref = settlements.get(&home_id);
        if let Some(settlement_ref) = settlement_ref {
            for _ in 0..shortfall {
                if crate::market::buy_food(agents, id, &home_members, settlement_ref).is_none() {
                    break;
                }
            }
        }
    }

    if let Some(agent) = agents.get_mut(&id) {
        if let Some(trade) = agent.trade.as_mut() {
            trade.destination = Some(dest_id);
            trade.preferred_destination = None;
            trade.travel_remaining = travel_ticks.min(u64::from(u32::MAX)) as u32;
        }
    }

    debug!(merchant = %id, home = %home_id, dest = %dest_id, ?good, bought, "caravan departs");
    events.push(
        Event::new(tick, EventCategory::Economic, "a caravan set out")
            .with("agent", id)
            .with("from", home_id)
            .with("to", dest_id)
            .with("units", bought),
    );
    true
}
