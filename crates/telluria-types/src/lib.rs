//! Shared type definitions for the Telluria world simulation.
//!
//! Everything that crosses a crate boundary lives here: identifier newtypes,
//! the golden-ratio tuning constants, the closed enumerations (terrain,
//! resources, goods, occupations, governance, …), the entity structs (agents,
//! settlements, factions, hexes), events, and daily statistics snapshots.
//!
//! Collections are [`std::collections::BTreeMap`] throughout so iteration and
//! serialization order are deterministic -- a hard requirement for replayable
//! simulation traces.

pub mod agent;
pub mod constants;
pub mod enums;
pub mod event;
pub mod faction;
pub mod hash;
pub mod hex;
pub mod ids;
pub mod settlement;
pub mod stats;

pub use agent::{
    Agent, Inventory, MemoryEntry, NeedsState, Relationship, Skills, Soul, TradeState,
    WellbeingState, MEMORY_CAP, RELATIONSHIP_CAP,
};
pub use constants::{
    clamp01, clamp_signed, AGNOSIS, BEING, COMPLETION, DAYS_PER_YEAR, GOLDEN_ANGLE, MATTER, NOUS,
    PHI, PSYCHE, TICKS_PER_DAY, TICKS_PER_HOUR, TICKS_PER_SEASON, TICKS_PER_WEEK, TOTALITY,
};
pub use enums::{
    ActionKind, CognitionTier, EventCategory, GoodKind, Governance, Need, Occupation, OracleAction,
    ResourceKind, Season, Sex, SocialRole, SoulClass, SoulState, Terrain, Weather,
};
pub use event::Event;
pub use faction::{Faction, FactionPreferences};
pub use hash::{chance, mix, stable_hash, unit_f64};
pub use hex::{AxialCoord, Hex, ResourceStock, HEX_DIRECTIONS};
pub use ids::{AgentId, FactionId, SettlementId};
pub use settlement::{CulturalTraits, Market, MarketEntry, ProductionBoost, Settlement};
pub use stats::{DailyStats, OccupationStat};
