//! Enumeration types for the Vintner simulation.
//!
//! Seasons drive the calendar, economy phases drive systemic rates, and
//! notification categories group player-facing messages in the UI.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Seasons
// ---------------------------------------------------------------------------

/// A season in the game's annual cycle.
///
/// The declaration order is the cycle order. A year ends when the calendar
/// wraps from [`Season::Winter`] back to [`Season::Spring`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum Season {
    /// Bud break and flowering. First season of the year.
    Spring,
    /// Veraison and ripening.
    Summer,
    /// Harvest and crush.
    Autumn,
    /// Dormancy and pruning. Last season of the year.
    Winter,
}

impl Season {
    /// All seasons in cycle order.
    pub const ALL: [Self; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    /// The season that opens every year.
    pub const FIRST: Self = Self::Spring;

    /// The season that closes every year.
    pub const LAST: Self = Self::Winter;

    /// Zero-based position in the cycle (Spring = 0).
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::Spring => 0,
            Self::Summer => 1,
            Self::Autumn => 2,
            Self::Winter => 3,
        }
    }

    /// The season that follows this one, wrapping Winter to Spring.
    pub const fn next(self) -> Self {
        match self {
            Self::Spring => Self::Summer,
            Self::Summer => Self::Autumn,
            Self::Autumn => Self::Winter,
            Self::Winter => Self::Spring,
        }
    }

    /// Human-readable season name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Autumn => "Autumn",
            Self::Winter => "Winter",
        }
    }
}

impl core::fmt::Display for Season {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Economy phases
// ---------------------------------------------------------------------------

/// Macro-economic state affecting demand and prices.
///
/// Phases are totally ordered from [`EconomyPhase::Crash`] (index 0) to
/// [`EconomyPhase::Boom`] (index 4). Step helpers saturate at the edges,
/// so an index outside `0..=4` cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum EconomyPhase {
    /// Demand collapses, prices fall sharply.
    Crash,
    /// Demand contracts.
    Recession,
    /// Baseline demand.
    Stable,
    /// Demand grows.
    Expansion,
    /// Demand and prices peak.
    Boom,
}

impl EconomyPhase {
    /// All phases from lowest to highest.
    pub const ALL: [Self; 5] = [
        Self::Crash,
        Self::Recession,
        Self::Stable,
        Self::Expansion,
        Self::Boom,
    ];

    /// Position on the crash-to-boom scale (0..=4).
    pub const fn index(self) -> u8 {
        match self {
            Self::Crash => 0,
            Self::Recession => 1,
            Self::Stable => 2,
            Self::Expansion => 3,
            Self::Boom => 4,
        }
    }

    /// Whether this is one of the two extreme phases.
    pub const fn is_edge(self) -> bool {
        matches!(self, Self::Crash | Self::Boom)
    }

    /// One step toward [`EconomyPhase::Crash`], saturating.
    pub const fn toward_crash(self) -> Self {
        match self {
            Self::Crash | Self::Recession => Self::Crash,
            Self::Stable => Self::Recession,
            Self::Expansion => Self::Stable,
            Self::Boom => Self::Expansion,
        }
    }

    /// One step toward [`EconomyPhase::Boom`], saturating.
    pub const fn toward_boom(self) -> Self {
        match self {
            Self::Crash => Self::Recession,
            Self::Recession => Self::Stable,
            Self::Stable => Self::Expansion,
            Self::Expansion | Self::Boom => Self::Boom,
        }
    }

    /// One step toward the middle of the scale. Only meaningful for edges.
    pub const fn toward_interior(self) -> Self {
        match self {
            Self::Crash => Self::Recession,
            Self::Boom => Self::Expansion,
            other => other,
        }
    }

    /// Human-readable phase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crash => "Crash",
            Self::Recession => "Recession",
            Self::Stable => "Stable",
            Self::Expansion => "Expansion",
            Self::Boom => "Boom",
        }
    }
}

impl core::fmt::Display for EconomyPhase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Notification categories
// ---------------------------------------------------------------------------

/// Grouping used by the UI to filter and style notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum NotificationCategory {
    /// Calendar events: new week, season, or year.
    Time,
    /// Economy phase shifts.
    Economy,
    /// Wages, loans, and cash flow.
    Finance,
    /// Orders and contracts.
    Sales,
    /// Fermentation, aging, and wine features.
    Winery,
    /// Unlocked achievements.
    Achievement,
    /// Anything else.
    System,
}
