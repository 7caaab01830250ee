//! Weather: provider trait and the deterministic fallback.
//!
//! Weather is an external concern -- a live provider may be plugged in by the
//! host process -- but the engine must keep running (and stay deterministic)
//! without one. [`DeterministicWeather`] draws from season-weighted tables
//! keyed by a stable hash of `(seed, day)`, so replays reproduce the exact
//! weather sequence.
//!
//! Weather's one mechanical effect inside the core is the daily food
//! spoilage factor; everything else about weather is observational color.

use telluria_types::{stable_hash, unit_f64, Season, Weather, AGNOSIS, BEING, MATTER};

/// Source of daily weather.
///
/// Implementations must be total: the engine never handles a weather error.
/// External adapters are expected to time out and fall back to a
/// deterministic default internally.
pub trait WeatherProvider {
    /// The weather for a sim-day.
    fn daily_weather(&mut self, day: u64, season: Season) -> Weather;
}

/// Season-weighted deterministic weather.
#[derive(Debug, Clone, Copy)]
pub struct DeterministicWeather {
    seed: u64,
}

impl DeterministicWeather {
    /// Create a provider bound to a world seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }
}

/// Weighted weather table for a season. Weights are integer parts per 100.
const fn season_weights(season: Season) -> [(Weather, u64); 5] {
    match season {
        Season::Spring => [
            (Weather::Clear, 35),
            (Weather::Rain, 40),
            (Weather::Storm, 15),
            (Weather::Drought, 5),
            (Weather::Snow, 5),
        ],
        Season::Summer => [
            (Weather::Clear, 50),
            (Weather::Rain, 20),
            (Weather::Storm, 10),
            (Weather::Drought, 20),
            (Weather::Snow, 0),
        ],
        Season::Autumn => [
            (Weather::Clear, 40),
            (Weather::Rain, 30),
            (Weather::Storm, 15),
            (Weather::Drought, 5),
            (Weather::Snow, 10),
        ],
        Season::Winter => [
            (Weather::Clear, 25),
            (Weather::Rain, 10),
            (Weather::Storm, 15),
            (Weather::Drought, 0),
            (Weather::Snow, 50),
        ],
    }
}

impl WeatherProvider for DeterministicWeather {
    fn daily_weather(&mut self, day: u64, season: Season) -> Weather {
        let weights = season_weights(season);
        let total: u64 = weights.iter().map(|(_, w)| w).sum();
        let roll = (unit_f64(stable_hash(&[self.seed, day, 0x57EA])) * total as f64) as u64;

        let mut cursor = 0u64;
        for (weather, weight) in weights {
            cursor += weight;
            if roll < cursor {
                return weather;
            }
        }
        Weather::Clear
    }
}

/// Multiplier on the per-day spoilage of each food good.
///
/// Applied to the base daily decay rate; winter doubles the result -- cold
/// stores are strained, not helped, in this world's larders.
#[must_use]
pub fn food_spoilage_factor(weather: Weather, season: Season) -> f64 {
    let weather_factor = match weather {
        Weather::Clear => 1.0,
        Weather::Rain => 1.0 + AGNOSIS,
        Weather::Storm => 1.0 + MATTER,
        Weather::Drought => MATTER,
        Weather::Snow => 1.0 + AGNOSIS * 0.5,
    };
    if season == Season::Winter {
        weather_factor * BEING
    } else {
        weather_factor
    }
}
