//! Core state structs for the Vintner simulation.
//!
//! Covers the calendar value [`GameDate`], the persisted [`GameState`]
//! and its partial update [`StatePatch`], and player-facing
//! [`Notification`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EconomyPhase, NotificationCategory, Season};
use crate::ids::NotificationId;

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// A point on the game calendar.
///
/// `week` is 1-based and never exceeds the configured weeks per season.
/// Rollover arithmetic lives in the core crate's clock; this is the plain
/// persisted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameDate {
    /// Week within the season, starting at 1.
    pub week: u32,
    /// Current season.
    pub season: Season,
    /// Calendar year.
    pub year: u32,
}

impl GameDate {
    /// Construct a date from its parts without range checks.
    pub const fn new(week: u32, season: Season, year: u32) -> Self {
        Self { week, season, year }
    }
}

impl core::fmt::Display for GameDate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Week {}, {} {}", self.week, self.season, self.year)
    }
}

// ---------------------------------------------------------------------------
// Persisted state
// ---------------------------------------------------------------------------

/// The slice of game state the tick orchestrator reads and writes.
///
/// Everything else (inventory, staff, vineyards, finances) belongs to
/// collaborator subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GameState {
    /// Current calendar position.
    pub date: GameDate,
    /// Current macro-economic phase.
    pub economy_phase: EconomyPhase,
}

impl GameState {
    /// Apply a partial update in place. Absent fields are left untouched.
    pub const fn apply(&mut self, patch: &StatePatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(phase) = patch.economy_phase {
            self.economy_phase = phase;
        }
    }
}

/// A partial update to [`GameState`], written atomically by a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatePatch {
    /// New calendar position, if it changed.
    pub date: Option<GameDate>,
    /// New economy phase, if it changed.
    pub economy_phase: Option<EconomyPhase>,
}

impl StatePatch {
    /// A patch that only moves the calendar.
    pub const fn date(date: GameDate) -> Self {
        Self {
            date: Some(date),
            economy_phase: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// A human-readable message shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Message body.
    pub text: String,
    /// Tag naming the subsystem that produced the message.
    pub source: String,
    /// Short heading.
    pub title: String,
    /// UI grouping.
    pub category: NotificationCategory,
    /// Real-world timestamp when the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a notification stamped with a fresh ID and the current time.
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        title: impl Into<String>,
        category: NotificationCategory,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            text: text.into(),
            source: source.into(),
            title: title.into(),
            category,
            created_at: Utc::now(),
        }
    }
}
