//! The simulation clock.
//!
//! One tick is one sim-minute. The tick counter is the single source of
//! truth for all temporal state -- day, week, and season are derived, never
//! stored -- and it never resets, even across restarts: a restored world
//! resumes from its persisted tick number.

use telluria_types::{Season, TICKS_PER_DAY, TICKS_PER_HOUR, TICKS_PER_SEASON, TICKS_PER_WEEK};

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Monotonic simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SimClock {
    tick: u64,
}

impl SimClock {
    /// A clock at tick zero (a brand-new world).
    #[must_use]
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    /// A clock restored to a persisted tick number.
    #[must_use]
    pub const fn from_tick(tick: u64) -> Self {
        Self { tick }
    }

    /// Advance one tick. Returns the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the counter would wrap.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Current tick number.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Current sim-day index.
    #[must_use]
    pub const fn sim_day(&self) -> u64 {
        self.tick / TICKS_PER_DAY
    }

    /// Current sim-week index.
    #[must_use]
    pub const fn week(&self) -> u64 {
        self.tick / TICKS_PER_WEEK
    }

    /// Current season, derived from the tick counter.
    #[must_use]
    pub const fn season(&self) -> Season {
        Season::from_index(self.tick / TICKS_PER_SEASON)
    }

    /// Whether this tick closes a sim-hour.
    #[must_use]
    pub const fn is_hour_boundary(&self) -> bool {
        self.tick % TICKS_PER_HOUR == 0
    }

    /// Whether this tick closes a sim-day.
    #[must_use]
    pub const fn is_day_boundary(&self) -> bool {
        self.tick % TICKS_PER_DAY == 0
    }

    /// Whether this tick closes a sim-week.
    #[must_use]
    pub const fn is_week_boundary(&self) -> bool {
        self.tick % TICKS_PER_WEEK == 0
    }

    /// Whether this tick closes a season.
    #[must_use]
    pub const fn is_season_boundary(&self) -> bool {
        self.tick % TICKS_PER_SEASON == 0
    }
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}
