//! Game clock, economy automaton, and weekly tick orchestration for the
//! Vintner simulation.
//!
//! One tick advances game time by one week. The orchestrator moves the
//! calendar, steps the economy on season boundaries, and drives every
//! simulation subsystem through the interfaces in [`collaborators`]. It
//! never computes game formulas itself.
//!
//! # Modules
//!
//! - [`clock`] -- Week/season/year calendar with rollover detection.
//! - [`config`] -- Configuration loading from `vintner-config.yaml` into
//!   strongly-typed structs.
//! - [`collaborators`] -- Traits for storage, UI, and simulation
//!   subsystems.
//! - [`economy`] -- Five-phase economy random walk.
//! - [`effects`] -- Concurrent, failure-isolated effect execution.
//! - [`digest`] -- Per-tick notification accumulator.
//! - [`throttle`] -- Cadence gate for the achievement sweep.
//! - [`tick`] -- The phase pipeline of one tick.
//! - [`scheduler`] -- [`TickScheduler`], the reentrancy-guarded entry
//!   point.
//! - [`store`] -- In-memory store, change signal, notification bus, and
//!   prompt queue.
//!
//! [`TickScheduler`]: scheduler::TickScheduler

pub mod clock;
pub mod collaborators;
pub mod config;
pub mod digest;
pub mod economy;
pub mod effects;
pub mod scheduler;
pub mod store;
pub mod throttle;
pub mod tick;
