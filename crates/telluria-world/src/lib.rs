//! Geography, resources, and environment for the Telluria simulation.
//!
//! This crate owns the hex map: terrain caps, world generation, weekly
//! fallow recovery with the land-health feedback loop, the deterministic
//! weather fallback, and the name generator used for settlements and agents.

pub mod error;
pub mod generation;
pub mod grid;
pub mod names;
pub mod regen;
pub mod terrain;
pub mod weather;

pub use error::WorldError;
pub use generation::{generate_world, habitable};
pub use grid::{HexMap, TICKS_PER_STEP};
pub use names::{agent_name, settlement_name};
pub use regen::{
    seasonal_regen_factor, weekly_recovery, EXTRACTION_HEALTH_LOSS, FALLOW_HEALTH_GAIN,
    LABORER_HEALTH_GAIN,
};
pub use terrain::{resource_cap, supports};
pub use weather::{food_spoilage_factor, DeterministicWeather, WeatherProvider};
