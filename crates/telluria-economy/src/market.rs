//! Hourly market resolution: aggregate, anchor, order, match, reprice.
//!
//! Every sim-hour each settlement rebuilds its supply and demand signals
//! from member inventories, computes a reference price per good, places one
//! ask per seller at `ref · Matter` and one bid per buyer at `ref · Being`,
//! and matches them.
//!
//! **The clearing price is the seller's ask.** A midpoint rule looks fairer
//! but biases every trade upward by `(Matter + Being) / 2 ≈ 1.118` -- a
//! ratchet that walks prices to the ceiling and stays there. The stored
//! price then blends toward the average clearing price and is clamped into
//! `[base·Agnosis, base·Totality]`; the clamp is mandatory because the blend
//! alone can escape the band.
//!
//! Crown cost of a unit is the rounded clearing price; zero is permitted --
//! that is barter in a low-price regime, not an error.

use std::collections::BTreeMap;

use telluria_agents::work::{closest_recipe, CRAFTER_RECIPES, SCHOLAR_RECIPE};
use telluria_types::{
    Agent, AgentId, GoodKind, Occupation, Season, Settlement, AGNOSIS, BEING, MATTER, NOUS,
    TOTALITY,
};
use tracing::trace;

use crate::transfer::move_crowns;

/// Price multiple of base above which a food good drops out of demand
/// (price-sensitive substitution between grain and fish).
pub const FOOD_SUBSTITUTION_LIMIT: f64 = 3.0;

/// Blend weight of the old price in the post-clear update.
const PRICE_SMOOTHING: f64 = 0.7;

/// Units of a good a household keeps back before selling the rest.
#[must_use]
pub const fn surplus_threshold(good: GoodKind) -> u32 {
    if good.is_food() {
        TOTALITY as u32 // 4 -- a few days' meals stay in the larder
    } else {
        NOUS as u32 // 2 -- spare materials beyond the workbench
    }
}

/// Seasonal modifier on the food reference price.
#[must_use]
pub fn seasonal_price_factor(season: Season, good: GoodKind) -> f64 {
    if !good.is_food() {
        return 1.0;
    }
    match season {
        Season::Winter => 1.0 + AGNOSIS,
        Season::Autumn => 1.0 - AGNOSIS * 0.5,
        Season::Spring | Season::Summer => 1.0,
    }
}

/// Outcome of one settlement's market hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketReport {
    /// Units cleared.
    pub trades: u64,
    /// Crowns that changed hands.
    pub volume_crowns: u64,
}

/// One side of the book for one good.
#[derive(Debug, Clone, Copy)]
struct Order {
    agent: AgentId,
    units: u32,
    price: f64,
}

/// Resolve one settlement's market for this hour.
pub fn resolve_market(
    settlement: &mut Settlement,
    agents: &mut BTreeMap<AgentId, Agent>,
    members: &[AgentId],
    season: Season,
    tick: u64,
) -> MarketReport {
    let mut report = MarketReport::default();
    let population = members
        .iter()
        .filter(|id| agents.get(*id).is_some_and(|a| a.alive))
        .count() as f64;

    for good in GoodKind::ALL {
        // --- Aggregate ---
        let mut supply = 0.0f64;
        let mut demand = 0.0f64;
        let mut sells: Vec<Order> = Vec::new();
        let mut buy_ids: Vec<AgentId> = Vec::new();

        let current_price = settlement.market.entry(good).price;
        let base_price = settlement.market.entry(good).base_price;

        for &id in members {
            let Some(agent) = agents.get(&id) else { continue };
            if !agent.alive {
                continue;
            }
            let held = agent.inventory.get(good);
            let threshold = surplus_threshold(good);
            if held > threshold {
                let surplus = held - threshold;
                supply += f64::from(surplus);
                sells.push(Order {
                    agent: id,
                    units: surplus,
                    price: 0.0, // set after the reference price is known
                });
            }
            if demands(agent, good, current_price, base_price) {
                demand += 1.0;
                buy_ids.push(id);
            }
        }

        // --- Floors ---
        supply = supply.max(population / 100.0).max(f64::EPSILON);
        demand = demand.max(1.0);

        // --- Reference price (anchors orders; never overwrites the stored
        // price directly) ---
        let ratio = (demand / supply).clamp(AGNOSIS, TOTALITY);
        let reference = settlement
            .market
            .entry(good)
            .clamp_price(base_price * ratio.sqrt() * seasonal_price_factor(season, good));

        let ask = reference * MATTER;
        let bid = reference * BEING;
        for sell in &mut sells {
            sell.price = ask;
        }
        let mut buys: Vec<Order> = buy_ids
            .into_iter()
            .map(|agent| Order {
                agent,
                units: 1,
                price: bid,
            })
            .collect();

        // --- Match: sells ascending, buys descending, clearing at the
        // seller's ask, one unit at a time ---
        sells.sort_by(|a, b| a.price.total_cmp(&b.price).then(a.agent.cmp(&b.agent)));
        buys.sort_by(|a, b| b.price.total_cmp(&a.price).then(a.agent.cmp(&b.agent)));

        let mut cleared_units = 0u64;
        let mut clearing_sum = 0.0f64;
        let mut si = 0usize;
        let mut bi = 0usize;

        while si < sells.len() && bi < buys.len() {
            let sell = sells[si];
            let buy = buys[bi];
            if sell.units == 0 {
                si += 1;
                continue;
            }
            if buy.units == 0 {
                bi += 1;
                continue;
            }
            if sell.price > buy.price {
                break;
            }

            let clearing = sell.price;
            let cost = clearing.round().max(0.0) as u64;

            // Affordability check at match time; a broke buyer steps aside.
            let buyer_can_pay = agents
                .get(&buy.agent)
                .is_some_and(|buyer| buyer.wealth >= cost);
            if !buyer_can_pay {
                bi += 1;
                continue;
            }

            // One unit seller → buyer, crowns buyer → seller.
            let seller_has_unit = agents
                .get_mut(&sell.agent)
                .map(|seller| seller.inventory.take(good, 1) == 1)
                .unwrap_or(false);
            if !seller_has_unit {
                si += 1;
                continue;
            }

            let mut paid = 0u64;
            if let Some(buyer) = agents.get_mut(&buy.agent) {
                buyer.inventory.add(good, 1);
                paid = cost.min(buyer.wealth);
                buyer.wealth -= paid;
            }
            if let Some(seller) = agents.get_mut(&sell.agent) {
                seller.wealth = seller.wealth.saturating_add(paid);
            }

            cleared_units += 1;
            clearing_sum += clearing;
            report.volume_crowns += paid;
            sells[si].units -= 1;
            buys[bi].units -= 1;
        }

        // --- Store signals and reprice ---
        let entry = settlement.market.entry_mut(good);
        entry.supply = supply;
        entry.demand = demand;
        if cleared_units > 0 {
            let average_clearing = clearing_sum / cleared_units as f64;
            let blended =
                PRICE_SMOOTHING * entry.price + (1.0 - PRICE_SMOOTHING) * average_clearing;
            entry.price = entry.clamp_price(blended);
            entry.trade_count += cleared_units;
            report.trades += cleared_units;
        }
    }

    trace!(
        settlement = %settlement.id,
        tick,
        trades = report.trades,
        volume = report.volume_crowns,
        "market resolved"
    );
    report
}

/// Whether an agent adds one unit of demand for a good this hour.
///
/// Food demand is dual (grain and fish) with price-sensitive substitution;
/// tools are wanted by any household without one; crafters and scholars
/// demand only the missing inputs of their closest recipe.
fn demands(agent: &Agent, good: GoodKind, price: f64, base_price: f64) -> bool {
    if good.is_food() {
        // A household already sitting on surplus food does not bid for more.
        return agent.inventory.get(good) <= surplus_threshold(good)
            && price <= base_price * FOOD_SUBSTITUTION_LIMIT;
    }
    if good == GoodKind::Tools {
        return agent.inventory.get(GoodKind::Tools) == 0;
    }
    match agent.occupation {
        Occupation::Crafter => closest_recipe(&CRAFTER_RECIPES, &agent.inventory)
            .map(|(_, missing)| missing.iter().any(|(g, _)| *g == good))
            .unwrap_or(false),
        Occupation::Scholar => {
            closest_recipe(core::slice::from_ref(&SCHOLAR_RECIPE), &agent.inventory)
                .map(|(_, missing)| missing.iter().any(|(g, _)| *g == good))
                .unwrap_or(false)
        }
        _ => false,
    }
}

/// Minute-level food purchase: one unit from the settlement-mate holding the
/// largest surplus, at the current market price.
///
/// Keeps both crowns and goods conserved outside the hourly batch. Returns
/// the good bought, or `None` when no one has surplus food to sell.
pub fn buy_food(
    agents: &mut BTreeMap<AgentId, Agent>,
    buyer_id: AgentId,
    members: &[AgentId],
    settlement: &Settlement,
) -> Option<GoodKind> {
    let (good, price) = settlement.market.cheapest_food();
    let cost = price.round().max(0.0) as u64;

    let buyer_wealth = agents.get(&buyer_id).map_or(0, |b| b.wealth);
    if buyer_wealth < cost {
        return None;
    }

    let threshold = surplus_threshold(good);
    let seller_id = members
        .iter()
        .filter(|id| **id != buyer_id)
        .filter(|id| {
            agents
                .get(*id)
                .is_some_and(|a| a.alive && a.inventory.get(good) > threshold)
        })
        .max_by_key(|id| {
            agents
                .get(*id)
                .map_or(0, |a| a.inventory.get(good))
        })
        .copied()?;

    let seller = agents.get_mut(&seller_id)?;
    if seller.inventory.take(good, 1) != 1 {
        return None;
    }
    let mut seller_wealth = seller.wealth;

    let buyer = agents.get_mut(&buyer_id)?;
    buyer.inventory.add(good, 1);
    let paid = move_crowns(&mut buyer.wealth, &mut seller_wealth, cost);
    debug_assert_eq!(paid, cost);

    if let Some(seller) = agents.get_mut(&seller_id) {
        seller.wealth = seller_wealth;
    }
    Some(good)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use telluria_types::{
        AxialCoord, CognitionTier, Governance, Inventory, NeedsState, SettlementId, Sex, Skills,
        SocialRole, Soul, SoulClass, WellbeingState,
    };

    use super::*;

    fn test_agent(id: u64, wealth: u64) -> Agent {
        Agent {
            id: AgentId::new(id),
            name: String::from("Test"),
            sex: Sex::Male,
            age: 30,
            health: 1.0,
            position: AxialCoord::new(0, 0),
            home: Some(SettlementId::new(1)),
            occupation: Occupation::Farmer,
            tier: CognitionTier::Tier0,
            role: SocialRole::Commoner,
            wealth,
            inventory: Inventory::empty(),
            needs: NeedsState::default(),
            wellbeing: WellbeingState::default(),
            soul: Soul::new(SoulClass::Artisan, 0.2),
            skills: Skills::default(),
            memories: Vec::new(),
            relationships: Vec::new(),
            faction: None,
            last_work_tick: 0,
            trade: None,
            alive: true,
            born_tick: 0,
        }
    }

    fn test_settlement() -> Settlement {
        Settlement::found(
            SettlementId::new(1),
            String::from("Harrowgate"),
            AxialCoord::new(0, 0),
            Governance::Council,
            0,
        )
    }

    /// The one-buyer-one-seller scenario: the trade clears at the seller's
    /// ask and crowns conserve.
    #[test]
    fn one_buyer_one_seller_clears_at_the_ask() {
        let mut agents = BTreeMap::new();
        let mut seller = test_agent(1, 0);
        // Surplus of 5 above the food threshold.
        seller.inventory.add(GoodKind::Grain, surplus_threshold(GoodKind::Grain) + 5);
        agents.insert(AgentId::new(1), seller);
        let buyer = test_agent(2, 10);
        agents.insert(AgentId::new(2), buyer);

        let mut settlement = test_settlement();
        let members = [AgentId::new(1), AgentId::new(2)];
        let before: u64 = agents.values().map(|a| a.wealth).sum();

        let report = resolve_market(&mut settlement, &mut agents, &members, Season::Summer, 60);

        assert!(report.trades >= 1, "no trade cleared");
        let after: u64 = agents.values().map(|a| a.wealth).sum();
        assert_eq!(before, after, "crowns not conserved");
        assert!(agents[&AgentId::new(2)].inventory.get(GoodKind::Grain) >= 1);
        assert!(agents[&AgentId::new(1)].wealth > 0, "seller was not paid");
    }

    #[test]
    fn price_stays_inside_the_band() {
        let mut agents = BTreeMap::new();
        // Many hungry buyers, one seller: pressure toward the ceiling.
        let mut seller = test_agent(1, 0);
        seller.inventory.add(GoodKind::Grain, 50);
        agents.insert(AgentId::new(1), seller);
        let mut members = vec![AgentId::new(1)];
        for id in 2..=20u64 {
            agents.insert(AgentId::new(id), test_agent(id, 100));
            members.push(AgentId::new(id));
        }

        let mut settlement = test_settlement();
        for hour in 1..=50u64 {
            resolve_market(&mut settlement, &mut agents, &members, Season::Summer, hour * 60);
            // Keep the seller stocked so trades keep clearing.
            agents
                .get_mut(&AgentId::new(1))
                .unwrap()
                .inventory
                .add(GoodKind::Grain, 20);
            let entry = settlement.market.entry(GoodKind::Grain);
            assert!(
                entry.price >= entry.base_price * AGNOSIS - 1e-9
                    && entry.price <= entry.base_price * TOTALITY + 1e-9,
                "hour {hour}: price {} escaped the band",
                entry.price
            );
        }
    }

    /// The ratchet regression: midpoint clearing drifts monotonically
    /// upward; seller's-ask clearing does not.
    #[test]
    fn sellers_ask_clearing_avoids_the_midpoint_ratchet() {
        // Simulate ten resolutions of the price-update rule under both
        // clearing conventions with a constant reference price.
        let entry_base = GoodKind::Grain.base_price();
        let reference = entry_base;
        let ask = reference * MATTER;
        let midpoint = reference * (MATTER + BEING) / 2.0;

        let mut price_ask = entry_base;
        let mut price_mid = entry_base;
        let mut mid_prices = Vec::new();
        for _ in 0..10 {
            price_ask = PRICE_SMOOTHING * price_ask + (1.0 - PRICE_SMOOTHING) * ask;
            price_mid = PRICE_SMOOTHING * price_mid + (1.0 - PRICE_SMOOTHING) * midpoint;
            mid_prices.push(price_mid);
        }

        // Midpoint clearing never comes back down.
        assert!(mid_prices.windows(2).all(|w| w[1] >= w[0] - 1e-12));
        assert!(price_mid > entry_base, "midpoint did not ratchet");
        // Seller's-ask clearing settles below the anchor instead.
        assert!(price_ask < entry_base);
    }

    #[test]
    fn broke_buyers_step_aside() {
        let mut agents = BTreeMap::new();
        let mut seller = test_agent(1, 0);
        seller.inventory.add(GoodKind::Grain, 20);
        agents.insert(AgentId::new(1), seller);
        agents.insert(AgentId::new(2), test_agent(2, 0)); // broke
        let members = [AgentId::new(1), AgentId::new(2)];

        let mut settlement = test_settlement();
        // Push the price well above zero so cost rounds to ≥ 1.
        settlement.market.entry_mut(GoodKind::Grain).price = 6.0;

        let before: u64 = agents.values().map(|a| a.wealth).sum();
        resolve_market(&mut settlement, &mut agents, &members, Season::Summer, 60);
        let after: u64 = agents.values().map(|a| a.wealth).sum();
        assert_eq!(before, after);
    }

    #[test]
    fn crafters_demand_only_missing_recipe_inputs() {
        let mut crafter = test_agent(1, 10);
        crafter.occupation = Occupation::Crafter;
        crafter.inventory.add(GoodKind::IronOre, 1);

        // Closest recipe is Tools (missing only Timber): no demand for gems.
        assert!(demands(&crafter, GoodKind::Timber, 3.0, 3.0));
        assert!(!demands(&crafter, GoodKind::Gems, 20.0, 20.0));
        assert!(!demands(&crafter, GoodKind::Furs, 4.0, 4.0));
    }

    #[test]
    fn food_substitution_drops_dear_food_from_demand() {
        let agent = test_agent(1, 10);
        let base = GoodKind::Grain.base_price();
        assert!(demands(&agent, GoodKind::Grain, base, base));
        assert!(!demands(
            &agent,
            GoodKind::Grain,
            base * (FOOD_SUBSTITUTION_LIMIT + 0.1),
            base
        ));
    }

    #[test]
    fn buy_food_trades_directly_with_the_stocked_neighbor() {
        let mut agents = BTreeMap::new();
        agents.insert(AgentId::new(1), test_agent(1, 10));
        let mut stocked = test_agent(2, 0);
        stocked.inventory.add(GoodKind::Grain, 10);
        agents.insert(AgentId::new(2), stocked);
        let members = [AgentId::new(1), AgentId::new(2)];
        let settlement = test_settlement();

        let before: u64 = agents.values().map(|a| a.wealth).sum();
        let bought = buy_food(&mut agents, AgentId::new(1), &members, &settlement);
        assert_eq!(bought, Some(GoodKind::Grain));
        assert_eq!(agents[&AgentId::new(1)].inventory.get(GoodKind::Grain), 1);
        assert_eq!(agents[&AgentId::new(2)].inventory.get(GoodKind::Grain), 9);
        let after: u64 = agents.values().map(|a| a.wealth).sum();
        assert_eq!(before, after);
    }

    #[test]
    fn buy_food_fails_when_no_one_has_surplus() {
        let mut agents = BTreeMap::new();
        agents.insert(AgentId::new(1), test_agent(1, 10));
        agents.insert(AgentId::new(2), test_agent(2, 0));
        let members = [AgentId::new(1), AgentId::new(2)];
        let settlement = test_settlement();
        assert_eq!(
            buy_food(&mut agents, AgentId::new(1), &members, &settlement),
            None
        );
    }
}
