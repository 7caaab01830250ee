//! The settlement record and its market.
//!
//! Settlements reference agents only by id; the member list is a derived
//! index owned by the world state. `population` is a cache of that index's
//! length, refreshed whenever the index is rebuilt.

use serde::{Deserialize, Serialize};

use crate::constants::{AGNOSIS, TOTALITY};
use crate::enums::{GoodKind, Governance};
use crate::hex::AxialCoord;
use crate::ids::{AgentId, SettlementId};

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// Per-good market entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketEntry {
    /// Anchor price in crowns; the price band is
    /// `[base_price·Agnosis, base_price·Totality]`.
    pub base_price: f64,
    /// Current price, always inside the band.
    pub price: f64,
    /// Aggregated supply signal, rebuilt every market hour.
    pub supply: f64,
    /// Aggregated demand signal, rebuilt every market hour.
    pub demand: f64,
    /// Cumulative units cleared on this entry.
    pub trade_count: u64,
}

impl MarketEntry {
    /// A fresh entry for a good, priced at its anchor.
    #[must_use]
    pub const fn new(good: GoodKind) -> Self {
        Self {
            base_price: good.base_price(),
            price: good.base_price(),
            supply: 0.0,
            demand: 0.0,
            trade_count: 0,
        }
    }

    /// Clamp a candidate price into this entry's band.
    #[must_use]
    pub fn clamp_price(&self, candidate: f64) -> f64 {
        candidate.clamp(self.base_price * AGNOSIS, self.base_price * TOTALITY)
    }
}

/// A settlement's market: one entry per good kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    entries: [MarketEntry; GoodKind::COUNT],
}

impl Market {
    /// A market with every entry at its anchor price.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: core::array::from_fn(|idx| MarketEntry::new(GoodKind::ALL[idx])),
        }
    }

    /// The entry for a good.
    #[must_use]
    pub fn entry(&self, good: GoodKind) -> &MarketEntry {
        &self.entries[good.index()]
    }

    /// Mutable entry for a good.
    pub fn entry_mut(&mut self, good: GoodKind) -> &mut MarketEntry {
        &mut self.entries[good.index()]
    }

    /// Iterate `(good, entry)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (GoodKind, &MarketEntry)> {
        GoodKind::ALL.iter().map(|good| (*good, self.entry(*good)))
    }

    /// The cheapest currently-priced food good.
    #[must_use]
    pub fn cheapest_food(&self) -> (GoodKind, f64) {
        let grain = self.entry(GoodKind::Grain).price;
        let fish = self.entry(GoodKind::Fish).price;
        if fish < grain {
            (GoodKind::Fish, fish)
        } else {
            (GoodKind::Grain, grain)
        }
    }
}

impl Default for Market {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Time-bounded production multiplier applied by a gardener cultivation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductionBoost {
    /// Yield multiplier while active.
    pub multiplier: f64,
    /// Tick at which the boost lapses.
    pub expires_tick: u64,
}

/// Cultural disposition fields, fixed at founding from the founding hash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CulturalTraits {
    /// Welcome extended to outsiders and new ways.
    pub openness: f64,
    /// Weight given to coherence and contemplation.
    pub piety: f64,
    /// Weight given to soldiery and walls.
    pub martial: f64,
}

impl Default for CulturalTraits {
    fn default() -> Self {
        Self {
            openness: 0.5,
            piety: 0.5,
            martial: 0.5,
        }
    }
}

/// A settlement: one hex, a market, a treasury, and a membership of agents
/// tracked by id elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Stable identifier.
    pub id: SettlementId,
    /// Generated name.
    pub name: String,
    /// The hex this settlement stands on.
    pub position: AxialCoord,
    /// Cached count of live members; equals the derived index length.
    pub population: u32,
    /// Form of government.
    pub governance: Governance,
    /// Governance legitimacy in `[0, 1]`.
    pub governance_score: f64,
    /// Tax rate in `[0, 0.3]`.
    pub tax_rate: f64,
    /// Treasury in crowns.
    pub treasury: u64,
    /// Road infrastructure level, 0–5.
    pub road_level: u8,
    /// Wall infrastructure level, 0–5.
    pub wall_level: u8,
    /// Market infrastructure level, 0–5.
    pub market_level: u8,
    /// Cultural disposition.
    pub culture: CulturalTraits,
    /// Current leader, if one has been seated.
    pub leader: Option<AgentId>,
    /// The settlement's market.
    pub market: Market,
    /// Tick of founding.
    pub founded_tick: u64,
    /// Consecutive weekly checks with zero live members.
    pub empty_weeks: u8,
    /// Consecutive weekly checks below the viability floor.
    pub low_weeks: u8,
    /// Marked non-viable: refugee spawning disabled, members consolidating.
    pub non_viable: bool,
    /// Abandoned settlements are kept for history but take no part in play.
    pub abandoned: bool,
    /// Active cultivation boost, if any.
    pub production_boost: Option<ProductionBoost>,
    /// Sim-day of the last accepted gardener intervention.
    pub last_intervention_day: Option<u64>,
}

impl Settlement {
    /// A newly founded settlement with defaults per the founding rules.
    #[must_use]
    pub fn found(
        id: SettlementId,
        name: String,
        position: AxialCoord,
        governance: Governance,
        founded_tick: u64,
    ) -> Self {
        Self {
            id,
            name,
            position,
            population: 0,
            governance,
            governance_score: 0.5,
            tax_rate: 0.1,
            treasury: 0,
            road_level: 0,
            wall_level: 0,
            market_level: 0,
            culture: CulturalTraits::default(),
            leader: None,
            market: Market::new(),
            founded_tick,
            empty_weeks: 0,
            low_weeks: 0,
            non_viable: false,
            abandoned: false,
            production_boost: None,
            last_intervention_day: None,
        }
    }

    /// Whether this settlement takes part in play and can absorb migrants.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.abandoned
    }

    /// Whether migrants and refugees may be routed here.
    #[must_use]
    pub const fn is_viable(&self) -> bool {
        !self.abandoned && !self.non_viable
    }

    /// The production multiplier in force at `tick` (1.0 when no boost).
    #[must_use]
    pub fn boost_at(&self, tick: u64) -> f64 {
        self.production_boost
            .filter(|boost| boost.expires_tick > tick)
            .map_or(1.0, |boost| boost.multiplier)
    }

    /// Population capacity before overmass, scaled by governance.
    #[must_use]
    pub fn capacity(&self) -> f64 {
        let base = 100.0
            + 50.0 * f64::from(self.market_level)
            + 25.0 * f64::from(self.road_level)
            + 25.0 * f64::from(self.wall_level);
        base * governance_capacity_factor(self.governance)
    }
}

/// Capacity scaling per governance form.
#[must_use]
const fn governance_capacity_factor(governance: Governance) -> f64 {
    match governance {
        Governance::Monarchy | Governance::Commune => 1.0,
        Governance::Council => 1.0 + AGNOSIS * 0.5,
        Governance::MerchantRepublic => 1.0 + AGNOSIS,
    }
}
