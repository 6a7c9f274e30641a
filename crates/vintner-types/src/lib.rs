//! Shared type definitions for the Vintner wine-business simulation.
//!
//! This crate is the single source of truth for the types exchanged between
//! the tick orchestrator, its collaborator subsystems, and the browser UI.
//! Types flow to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers
//! - [`enums`] -- Seasons, economy phases, notification categories
//! - [`structs`] -- Calendar date, persisted state, notifications

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EconomyPhase, NotificationCategory, Season};
pub use ids::{NotificationId, TickId};
pub use structs::{GameDate, GameState, Notification, StatePatch};
