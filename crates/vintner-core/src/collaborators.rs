//! Interfaces of the subsystems the tick orchestrator drives.
//!
//! Each trait covers one external subsystem (storage, vineyards, winery,
//! sales, finance, ...). The orchestrator only sees these abstractions and
//! never the concrete formulas behind them. Every asynchronous method
//! returns a [`CollabFuture`] so implementations can be held as
//! `Arc<dyn Trait>` and injected when the scheduler is built.
//!
//! All traits are `Send + Sync` because the achievement sweep is spawned
//! onto the runtime.

use std::sync::Arc;

use futures::future::BoxFuture;
use vintner_types::{EconomyPhase, GameDate, GameState, Notification, StatePatch, TickId};

/// Boxed future returned by every collaborator call.
pub type CollabFuture<'a, T = ()> = BoxFuture<'a, Result<T, CollaboratorError>>;

/// Errors a collaborator can report.
///
/// None of these abort a tick. The orchestrator logs them and records a
/// failed outcome for the affected effect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The backing store could not be read or written.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
    },

    /// A subsystem is temporarily unable to serve the call.
    #[error("{subsystem} unavailable: {message}")]
    Unavailable {
        /// Name of the subsystem.
        subsystem: &'static str,
        /// Description of the outage.
        message: String,
    },

    /// The call ran and failed.
    #[error("{message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

impl CollaboratorError {
    /// Shorthand for [`CollaboratorError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Shorthand for [`CollaboratorError::Storage`].
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

/// Everything a collaborator needs to know about the tick in progress.
///
/// Built once the new clock has been committed, so every phase sees the
/// same post-advance date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickContext {
    /// Correlation ID for log lines of this tick.
    pub tick_id: TickId,
    /// Date before the advance.
    pub previous: GameDate,
    /// Date after the advance.
    pub date: GameDate,
    /// Economy phase after any season-boundary transition.
    pub economy_phase: EconomyPhase,
    /// Whether this tick entered a new season.
    pub season_changed: bool,
    /// Whether this tick entered a new year.
    pub year_changed: bool,
    /// Monotonic week count of `date`.
    pub absolute_week: u64,
}

// ---------------------------------------------------------------------------
// Storage and UI surfaces
// ---------------------------------------------------------------------------

/// Persisted game state.
pub trait StateStore: Send + Sync {
    /// Read the current state.
    fn read(&self) -> CollabFuture<'_, GameState>;

    /// Apply a partial update atomically: either every present field is
    /// written or none is.
    fn write(&self, patch: StatePatch) -> CollabFuture<'_>;
}

/// Modal UI state that must be acknowledged before time may pass.
pub trait BlockingPrompts: Send + Sync {
    /// Whether the player has unresolved blocking prompts.
    fn has_blocking(&self) -> CollabFuture<'_, bool>;

    /// Resolve the pending prompts (for example by surfacing them again).
    fn resolve_blocking(&self) -> CollabFuture<'_>;
}

/// Player-facing notification delivery.
pub trait NotificationBus: Send + Sync {
    /// Deliver one notification.
    fn publish(&self, notification: Notification) -> CollabFuture<'_>;
}

/// Signal to reactive UI subscribers that state changed.
pub trait ChangeBroadcast: Send + Sync {
    /// Notify subscribers. Never fails; no subscribers is fine.
    fn signal(&self);
}

// ---------------------------------------------------------------------------
// Simulation subsystems
// ---------------------------------------------------------------------------

/// Vineyard lifecycle hooks tied to calendar boundaries.
pub trait VineyardLifecycle: Send + Sync {
    /// Year boundary: age every vineyard by one year.
    fn age_vineyards(&self, ctx: TickContext) -> CollabFuture<'_>;

    /// Year boundary: recompute expected yields after aging.
    fn recalculate_yields(&self, ctx: TickContext) -> CollabFuture<'_>;

    /// Season boundary: move vineyards into the new season's state.
    fn on_season_start(&self, ctx: TickContext) -> CollabFuture<'_>;
}

/// In-progress work items (planting, harvesting, crushing, ...).
pub trait ActivityProgression: Send + Sync {
    /// Apply one week of staff labor to every active work item.
    fn progress_activities(&self, ctx: TickContext) -> CollabFuture<'_>;
}

/// Wine batch simulation. Each step is idempotent per tick.
pub trait WineSimulation: Send + Sync {
    /// Advance fermenting batches by one week.
    fn progress_fermentation(&self, ctx: TickContext) -> CollabFuture<'_>;

    /// Roll for new wine features (faults and positives).
    fn roll_feature_risks(&self, ctx: TickContext) -> CollabFuture<'_>;

    /// Apply the weekly effect of features already present.
    fn apply_feature_effects(&self, ctx: TickContext) -> CollabFuture<'_>;

    /// Age bottled wine by one week.
    fn age_bottled_wine(&self, ctx: TickContext) -> CollabFuture<'_>;
}

/// Customer demand.
pub trait SalesDemand: Send + Sync {
    /// Generate new customer orders.
    fn generate_orders(&self, ctx: TickContext) -> CollabFuture<'_>;

    /// Generate new contract offers.
    fn generate_contracts(&self, ctx: TickContext) -> CollabFuture<'_>;

    /// Expire orders and contracts past their deadline.
    fn expire_stale(&self, ctx: TickContext) -> CollabFuture<'_>;
}

/// Recurring payments, charged at the start of each season.
///
/// Insufficient funds is not an error: the ledger returns a message
/// describing the shortfall instead.
pub trait FinanceLedger: Send + Sync {
    /// Pay staff wages. Returns a summary for the player, if any.
    fn pay_wages(&self, ctx: TickContext) -> CollabFuture<'_, Option<String>>;

    /// Pay loan installments. Returns a summary for the player, if any.
    fn pay_loans(&self, ctx: TickContext) -> CollabFuture<'_, Option<String>>;
}

/// Company prestige.
pub trait PrestigeEngine: Send + Sync {
    /// Incrementally recompute prestige.
    fn recalculate(&self, ctx: TickContext) -> CollabFuture<'_>;
}

/// Company share price.
pub trait SharePriceEngine: Send + Sync {
    /// Apply this week's incremental share price adjustment.
    fn adjust(&self, ctx: TickContext) -> CollabFuture<'_>;
}

/// Board of directors satisfaction tracking.
pub trait BoardSatisfaction: Send + Sync {
    /// Whether the company has outside shareholders, and therefore a board.
    fn has_outside_shareholders(&self) -> bool;

    /// Record this week's satisfaction snapshot.
    fn record_snapshot(&self, ctx: TickContext) -> CollabFuture<'_>;
}

/// Achievement evaluation.
pub trait AchievementEngine: Send + Sync {
    /// Scan the game state and unlock every satisfied achievement.
    /// Returns the names of newly unlocked achievements.
    fn sweep(&self, ctx: TickContext) -> CollabFuture<'_, Vec<String>>;
}

/// Every collaborator the orchestrator depends on, injected up front.
#[derive(Clone)]
pub struct Collaborators {
    /// Persisted game state.
    pub store: Arc<dyn StateStore>,
    /// Blocking UI prompts.
    pub prompts: Arc<dyn BlockingPrompts>,
    /// Notification delivery.
    pub notifications: Arc<dyn NotificationBus>,
    /// UI change signal.
    pub broadcast: Arc<dyn ChangeBroadcast>,
    /// Vineyard lifecycle hooks.
    pub vineyards: Arc<dyn VineyardLifecycle>,
    /// Work item progression.
    pub activities: Arc<dyn ActivityProgression>,
    /// Wine batch simulation.
    pub wine: Arc<dyn WineSimulation>,
    /// Customer demand.
    pub sales: Arc<dyn SalesDemand>,
    /// Wages and loans.
    pub finance: Arc<dyn FinanceLedger>,
    /// Prestige.
    pub prestige: Arc<dyn PrestigeEngine>,
    /// Share price.
    pub share_price: Arc<dyn SharePriceEngine>,
    /// Board satisfaction.
    pub board: Arc<dyn BoardSatisfaction>,
    /// Achievements.
    pub achievements: Arc<dyn AchievementEngine>,
}

impl Collaborators {
    /// Use one object for every collaborator role.
    ///
    /// Convenient for in-memory games and test doubles that implement all
    /// traits on a single type.
    pub fn uniform<T>(world: &Arc<T>) -> Self
    where
        T: StateStore
            + BlockingPrompts
            + NotificationBus
            + ChangeBroadcast
            + VineyardLifecycle
            + ActivityProgression
            + WineSimulation
            + SalesDemand
            + FinanceLedger
            + PrestigeEngine
            + SharePriceEngine
            + BoardSatisfaction
            + AchievementEngine
            + 'static,
    {
        Self {
            store: Arc::clone(world) as Arc<dyn StateStore>,
            prompts: Arc::clone(world) as Arc<dyn BlockingPrompts>,
            notifications: Arc::clone(world) as Arc<dyn NotificationBus>,
            broadcast: Arc::clone(world) as Arc<dyn ChangeBroadcast>,
            vineyards: Arc::clone(world) as Arc<dyn VineyardLifecycle>,
            activities: Arc::clone(world) as Arc<dyn ActivityProgression>,
            wine: Arc::clone(world) as Arc<dyn WineSimulation>,
            sales: Arc::clone(world) as Arc<dyn SalesDemand>,
            finance: Arc::clone(world) as Arc<dyn FinanceLedger>,
            prestige: Arc::clone(world) as Arc<dyn PrestigeEngine>,
            share_price: Arc::clone(world) as Arc<dyn SharePriceEngine>,
            board: Arc::clone(world) as Arc<dyn BoardSatisfaction>,
            achievements: Arc::clone(world) as Arc<dyn AchievementEngine>,
        }
    }
}
