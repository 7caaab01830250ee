//! Closed enumerations for the Telluria simulation.
//!
//! Terrain, resources, goods, occupations, governance, cognition tiers, and
//! the rest of the tagged unions the engine branches on. These are closed by
//! design -- the decision kernel, the market, and the persistence contract all
//! rely on exhaustive matches rather than subtype polymorphism.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Terrain
// ---------------------------------------------------------------------------

/// The terrain of a hex, fixed at world generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Terrain {
    /// Open grassland; prime farmland.
    Plains,
    /// Dense woodland; timber, furs, and herbs.
    Forest,
    /// High ground; ores, stone, and gems.
    Mountain,
    /// Shoreline; fishing grounds.
    Coast,
    /// Freshwater corridor; fish and fertile banks.
    River,
    /// Arid waste; little grows here.
    Desert,
    /// Wetland; herbs in abundance, hard going.
    Swamp,
    /// Frozen steppe; furs and little else.
    Tundra,
    /// Open water. Impassable and non-extractable.
    Ocean,
}

impl Terrain {
    /// Movement cost in hex-steps for overland travel, or `None` when the
    /// terrain cannot be crossed.
    #[must_use]
    pub const fn movement_cost(self) -> Option<u32> {
        match self {
            Self::Plains | Self::Coast => Some(1),
            Self::Forest | Self::River | Self::Desert | Self::Tundra => Some(2),
            Self::Mountain | Self::Swamp => Some(3),
            Self::Ocean => None,
        }
    }

    /// Whether agents can stand on or cross this terrain.
    #[must_use]
    pub const fn is_passable(self) -> bool {
        self.movement_cost().is_some()
    }
}

// ---------------------------------------------------------------------------
// Resources and goods
// ---------------------------------------------------------------------------

/// A raw resource held in a hex's extraction pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Staple crop grown on plains and riverbanks.
    Grain,
    /// Catch from coasts and rivers.
    Fish,
    /// Pelts from forests and tundra.
    Furs,
    /// Ore veins in mountains.
    IronOre,
    /// Quarry stone.
    Stone,
    /// Coal seams, a mining by-product.
    Coal,
    /// Rare gemstones.
    Gems,
    /// Standing timber.
    Timber,
    /// Medicinal and alchemical plants.
    Herbs,
    /// Rare curiosities that surface in wild places.
    Exotics,
}

impl ResourceKind {
    /// Number of resource kinds.
    pub const COUNT: usize = 10;

    /// All resource kinds, in stock-index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Grain,
        Self::Fish,
        Self::Furs,
        Self::IronOre,
        Self::Stone,
        Self::Coal,
        Self::Gems,
        Self::Timber,
        Self::Herbs,
        Self::Exotics,
    ];

    /// Position of this kind within a hex resource stock.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Grain => 0,
            Self::Fish => 1,
            Self::Furs => 2,
            Self::IronOre => 3,
            Self::Stone => 4,
            Self::Coal => 5,
            Self::Gems => 6,
            Self::Timber => 7,
            Self::Herbs => 8,
            Self::Exotics => 9,
        }
    }

    /// The tradeable good this resource becomes when extracted.
    #[must_use]
    pub const fn good(self) -> GoodKind {
        match self {
            Self::Grain => GoodKind::Grain,
            Self::Fish => GoodKind::Fish,
            Self::Furs => GoodKind::Furs,
            Self::IronOre => GoodKind::IronOre,
            Self::Stone => GoodKind::Stone,
            Self::Coal => GoodKind::Coal,
            Self::Gems => GoodKind::Gems,
            Self::Timber => GoodKind::Timber,
            Self::Herbs => GoodKind::Herbs,
            Self::Exotics => GoodKind::Exotics,
        }
    }
}

/// A tradeable good: every extracted resource plus the crafted goods.
///
/// The set is closed (15 kinds); agent inventories are fixed-size arrays
/// indexed by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GoodKind {
    /// Staple food.
    Grain,
    /// Staple food, the coastal substitute for grain.
    Fish,
    /// Raw pelts.
    Furs,
    /// Unsmelted ore.
    IronOre,
    /// Quarry stone.
    Stone,
    /// Fuel.
    Coal,
    /// Uncut gemstones.
    Gems,
    /// Felled timber.
    Timber,
    /// Raw herbs.
    Herbs,
    /// Rare curiosities.
    Exotics,
    /// Crafted implements every working household wants.
    Tools,
    /// Woven goods from furs.
    Cloth,
    /// Worked gems and metal.
    Jewelry,
    /// Alchemical preparations.
    Potions,
    /// Written works produced by scholars.
    Manuscripts,
}

impl GoodKind {
    /// Number of good kinds.
    pub const COUNT: usize = 15;

    /// All goods, in inventory-index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Grain,
        Self::Fish,
        Self::Furs,
        Self::IronOre,
        Self::Stone,
        Self::Coal,
        Self::Gems,
        Self::Timber,
        Self::Herbs,
        Self::Exotics,
        Self::Tools,
        Self::Cloth,
        Self::Jewelry,
        Self::Potions,
        Self::Manuscripts,
    ];

    /// Position of this good within an inventory or market array.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Grain => 0,
            Self::Fish => 1,
            Self::Furs => 2,
            Self::IronOre => 3,
            Self::Stone => 4,
            Self::Coal => 5,
            Self::Gems => 6,
            Self::Timber => 7,
            Self::Herbs => 8,
            Self::Exotics => 9,
            Self::Tools => 10,
            Self::Cloth => 11,
            Self::Jewelry => 12,
            Self::Potions => 13,
            Self::Manuscripts => 14,
        }
    }

    /// Whether this good satisfies the survival need when eaten.
    #[must_use]
    pub const fn is_food(self) -> bool {
        matches!(self, Self::Grain | Self::Fish)
    }

    /// Anchor price in crowns used to band market prices.
    #[must_use]
    pub const fn base_price(self) -> f64 {
        match self {
            Self::Grain | Self::Fish => 2.0,
            Self::Stone | Self::Timber => 3.0,
            Self::Furs | Self::Coal | Self::Herbs => 4.0,
            Self::IronOre => 5.0,
            Self::Cloth => 6.0,
            Self::Tools => 8.0,
            Self::Potions => 10.0,
            Self::Manuscripts => 12.0,
            Self::Exotics => 15.0,
            Self::Gems => 20.0,
            Self::Jewelry => 25.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Needs
// ---------------------------------------------------------------------------

/// One of the five needs every agent carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Need {
    /// Food and bodily upkeep. Decays toward starvation.
    Survival,
    /// Security of person and property. The fastest-decaying need.
    Safety,
    /// Connection to other agents. The slowest-decaying need.
    Belonging,
    /// Standing among peers.
    Esteem,
    /// Meaningful work.
    Purpose,
}

impl Need {
    /// Number of needs.
    pub const COUNT: usize = 5;

    /// All needs, in state-index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Survival,
        Self::Safety,
        Self::Belonging,
        Self::Esteem,
        Self::Purpose,
    ];

    /// Position of this need within a needs-state vector.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Survival => 0,
            Self::Safety => 1,
            Self::Belonging => 2,
            Self::Esteem => 3,
            Self::Purpose => 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Occupations and social standing
// ---------------------------------------------------------------------------

/// An agent's occupation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Occupation {
    /// Works grain from plains and riverbanks.
    Farmer,
    /// Works fish from coasts and rivers.
    Fisher,
    /// Works furs from forest and tundra.
    Hunter,
    /// Works iron ore, with a coal by-product.
    Miner,
    /// Quarries stone and tends the land while doing it.
    Laborer,
    /// Gathers herbs, with an exotics by-product.
    Alchemist,
    /// Turns raw goods into tools, cloth, and jewelry.
    Crafter,
    /// Runs goods between settlement markets.
    Merchant,
    /// Keeps order; deters theft.
    Soldier,
    /// Produces manuscripts from gathered materials.
    Scholar,
}

impl Occupation {
    /// Number of occupations.
    pub const COUNT: usize = 10;

    /// All occupations.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Farmer,
        Self::Fisher,
        Self::Hunter,
        Self::Miner,
        Self::Laborer,
        Self::Alchemist,
        Self::Crafter,
        Self::Merchant,
        Self::Soldier,
        Self::Scholar,
    ];
}

/// Social standing within a settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SocialRole {
    /// Ordinary member.
    Commoner,
    /// Wealthy or influential member.
    Noble,
    /// Current settlement leader.
    Leader,
    /// Caught criminal, outside the settlement's protection.
    Outlaw,
}

/// Decision-making tier.
///
/// Tier 0 runs the rule kernel; Tier 1 perturbs it with archetype templates
/// refreshed weekly; Tier 2 agents are individually driven by an external
/// decision oracle, one-seventh of them per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CognitionTier {
    /// Rule-kernel agent (the vast majority).
    Tier0,
    /// Archetype-templated agent.
    Tier1,
    /// Named, oracle-driven agent.
    Tier2,
}

impl CognitionTier {
    /// Numeric rank for threshold comparisons (`Tier0` = 0 … `Tier2` = 2).
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Tier0 => 0,
            Self::Tier1 => 1,
            Self::Tier2 => 2,
        }
    }
}

/// Biological sex, used for naming and lineage seeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Sex {
    /// Female.
    Female,
    /// Male.
    Male,
}

// ---------------------------------------------------------------------------
// Soul
// ---------------------------------------------------------------------------

/// State of being, derived from coherence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoulState {
    /// Coherence below `Matter`; absorbed in material concerns.
    Embodied,
    /// Coherence at or above `Matter`; steadied.
    Centered,
    /// Coherence near the ceiling; beyond the dark-night valley.
    Liberated,
}

/// Inborn soul class, assigned at creation from the agent's stable hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SoulClass {
    /// Restless; coherence grows through change.
    Seeker,
    /// Grounded; coherence grows through craft.
    Artisan,
    /// Steadfast; coherence grows through service.
    Guardian,
    /// Inward; coherence grows through contemplation.
    Mystic,
}

impl SoulClass {
    /// All soul classes.
    pub const ALL: [Self; 4] = [Self::Seeker, Self::Artisan, Self::Guardian, Self::Mystic];
}

// ---------------------------------------------------------------------------
// Governance
// ---------------------------------------------------------------------------

/// A settlement's form of government.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Governance {
    /// Rule by the wealthiest named family.
    Monarchy,
    /// Rule by the most coherent.
    Council,
    /// Rule by the wealthiest, whoever they are.
    MerchantRepublic,
    /// Rotating stewardship.
    Commune,
}

// ---------------------------------------------------------------------------
// Seasons and weather
// ---------------------------------------------------------------------------

/// A season in the annual cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Season {
    /// Regeneration peak.
    Spring,
    /// Baseline rates.
    Summer,
    /// Harvest premium, regeneration ebbs.
    Autumn,
    /// Scarcity; food prices firm and spoilage doubles.
    Winter,
}

impl Season {
    /// All seasons, in annual order.
    pub const ALL: [Self; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    /// Season for a zero-based season counter.
    #[must_use]
    pub const fn from_index(index: u64) -> Self {
        match index % 4 {
            0 => Self::Spring,
            1 => Self::Summer,
            2 => Self::Autumn,
            _ => Self::Winter,
        }
    }
}

/// Daily weather, supplied by a provider or the deterministic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weather {
    /// No modifiers.
    Clear,
    /// Damp stores spoil a little faster.
    Rain,
    /// Hard weather; spoilage up.
    Storm,
    /// Dry stores keep well.
    Drought,
    /// Deep cold; spoilage of fish slows, grain stores strain.
    Snow,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Category attached to every emitted event, used by observers to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// Trades, prices, welfare, wealth movement.
    Economic,
    /// Founding, abandonment, governance, revolutions.
    Political,
    /// Relationships, families, crime.
    Social,
    /// Births, deaths, migration.
    Population,
    /// External bounded interventions.
    Gardener,
    /// Oracle-authored prose and speeches.
    Narrative,
    /// Engine lifecycle and recorded external inputs.
    System,
}

impl EventCategory {
    /// Stable lowercase name used in filters and persisted rows.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Economic => "economic",
            Self::Political => "political",
            Self::Social => "social",
            Self::Population => "population",
            Self::Gardener => "gardener",
            Self::Narrative => "narrative",
            Self::System => "system",
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// An action the Tier-0 kernel can select for one minute tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Produce at the workplace (hex extraction or recipe work).
    Work,
    /// Consume one unit of food from inventory.
    Eat,
    /// Buy one unit of food from a settlement-mate at the market price.
    BuyFood,
    /// Scavenge food directly from the land.
    Forage,
    /// Spend the minute with the closest bond nearby.
    Socialize,
    /// Do nothing this minute.
    Idle,
}

/// An action token a Tier-2 decision oracle may return.
///
/// Unknown tokens are ignored; known tokens are applied through the same
/// mutation primitives as the rule kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OracleAction {
    /// Work the agent's occupation.
    Work,
    /// Seek out the best trade this week.
    Trade,
    /// Strengthen the agent's closest bonds.
    Socialize,
    /// Push the agent's faction's influence in their settlement.
    Advocate,
    /// Move personal wealth into the settlement treasury.
    Invest,
    /// Recruit a well-disposed neighbor into the faction.
    Recruit,
    /// Survey profitable merchant destinations.
    ScoutRoute,
    /// Address the settlement; lifts belonging nearby.
    Speak,
    /// Move to the most prosperous settlement.
    Relocate,
    /// Switch to a skill-adjacent occupation.
    Retrain,
}

impl OracleAction {
    /// Parse a raw oracle token. Returns `None` for unknown tokens.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "work" => Some(Self::Work),
            "trade" => Some(Self::Trade),
            "socialize" => Some(Self::Socialize),
            "advocate" => Some(Self::Advocate),
            "invest" => Some(Self::Invest),
            "recruit" => Some(Self::Recruit),
            "scout_route" => Some(Self::ScoutRoute),
            "speak" => Some(Self::Speak),
            "relocate" => Some(Self::Relocate),
            "retrain" => Some(Self::Retrain),
            _ => None,
        }
    }
}
