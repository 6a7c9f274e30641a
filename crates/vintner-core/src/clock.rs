//! Game clock and calendar rollover for the Vintner simulation.
//!
//! The clock holds a `{week, season, year}` triple and advances it by
//! exactly one week per tick. Season and year rollovers are evaluated in
//! the same step, so a single advance can change all three fields at most
//! once each.
//!
//! # Design Principles
//!
//! - All arithmetic is checked or saturating (no silent overflow).
//! - The absolute week is derived from the triple on demand and never
//!   stored. It exists only for interval comparisons.

use vintner_types::{GameDate, Season};

use crate::config::CalendarConfig;

/// Number of seasons in one game year.
const SEASONS_PER_YEAR: u64 = 4;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// The year counter would overflow.
    #[error("year counter overflow: cannot advance beyond year {year}")]
    YearOverflow {
        /// The year that could not be incremented.
        year: u32,
    },

    /// Invalid calendar configuration or restored date.
    #[error("invalid calendar: {reason}")]
    InvalidCalendar {
        /// Explanation of what is wrong.
        reason: String,
    },
}

/// What changed when the clock advanced by one week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollover {
    /// Date before the advance.
    pub previous: GameDate,
    /// Date after the advance.
    pub date: GameDate,
    /// Whether the week counter wrapped into a new season.
    pub season_changed: bool,
    /// Whether the season wrapped into a new year.
    pub year_changed: bool,
}

impl Rollover {
    /// Whether the new date is the first week of a season.
    pub const fn is_season_start(&self) -> bool {
        self.date.week == 1
    }
}

/// The game calendar.
///
/// Restored from persisted state at the start of every tick, advanced once,
/// and committed back to the store by the tick sequencer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameClock {
    /// Current calendar position.
    date: GameDate,

    /// Number of weeks per season (from configuration).
    weeks_per_season: u32,
}

impl GameClock {
    /// Create a clock at the configured start date.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidCalendar`] if the configuration is invalid.
    pub fn new(config: &CalendarConfig) -> Result<Self, ClockError> {
        Self::from_parts(config.start_date(), config.weeks_per_season)
    }

    /// Create a clock from an explicit date (state restoration, tests).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidCalendar`] if `weeks_per_season` is 0
    /// or the week is outside `1..=weeks_per_season`.
    pub fn from_parts(date: GameDate, weeks_per_season: u32) -> Result<Self, ClockError> {
        if weeks_per_season == 0 {
            return Err(ClockError::InvalidCalendar {
                reason: "weeks_per_season must be at least 1".to_owned(),
            });
        }
        if date.week == 0 || date.week > weeks_per_season {
            return Err(ClockError::InvalidCalendar {
                reason: format!(
                    "week {} outside 1..={weeks_per_season}",
                    date.week
                ),
            });
        }
        Ok(Self {
            date,
            weeks_per_season,
        })
    }

    /// Restore a clock from a persisted date, pulling an out-of-range week
    /// back into `1..=weeks_per_season`.
    ///
    /// Persisted state written under a different season length can carry a
    /// week the current calendar does not have. Returns the clock and
    /// whether the week had to be adjusted.
    pub fn restore(date: GameDate, weeks_per_season: u32) -> (Self, bool) {
        let weeks_per_season = weeks_per_season.max(1);
        let week = date.week.clamp(1, weeks_per_season);
        let adjusted = week != date.week;
        (
            Self {
                date: GameDate { week, ..date },
                weeks_per_season,
            },
            adjusted,
        )
    }

    /// Advance the clock by one week.
    ///
    /// 1. `week += 1`
    /// 2. past the last week: `week = 1`, next season
    /// 3. season wrapped to the first: `year += 1`
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::YearOverflow`] if the year would exceed
    /// `u32::MAX`. The clock is left unchanged in that case.
    pub fn advance(&mut self) -> Result<Rollover, ClockError> {
        let previous = self.date;
        let mut next = previous;
        let mut season_changed = false;
        let mut year_changed = false;

        next.week = previous.week.saturating_add(1);
        if next.week > self.weeks_per_season {
            next.week = 1;
            next.season = previous.season.next();
            season_changed = true;

            if next.season == Season::FIRST {
                next.year = previous
                    .year
                    .checked_add(1)
                    .ok_or(ClockError::YearOverflow {
                        year: previous.year,
                    })?;
                year_changed = true;
            }
        }

        self.date = next;
        Ok(Rollover {
            previous,
            date: next,
            season_changed,
            year_changed,
        })
    }

    /// Return the current date.
    pub const fn date(&self) -> GameDate {
        self.date
    }

    /// Return the configured number of weeks per season.
    pub const fn weeks_per_season(&self) -> u32 {
        self.weeks_per_season
    }

    /// Monotonic week count derived from the current date.
    ///
    /// See [`absolute_week`].
    pub const fn absolute_week(&self) -> u64 {
        absolute_week(self.date, self.weeks_per_season)
    }
}

/// Monotonic week count for a date: weeks elapsed since week 1 of Spring,
/// year 0.
///
/// Strictly increases by one with every [`GameClock::advance`]. Saturates
/// at `u64::MAX` for absurd years instead of wrapping.
pub const fn absolute_week(date: GameDate, weeks_per_season: u32) -> u64 {
    let wps = weeks_per_season as u64;
    let seasons = (date.year as u64)
        .saturating_mul(SEASONS_PER_YEAR)
        .saturating_add(date.season.ordinal() as u64);
    seasons
        .saturating_mul(wps)
        .saturating_add((date.week as u64).saturating_sub(1))
}
