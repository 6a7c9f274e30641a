//! Entry point for advancing time.
//!
//! [`TickScheduler::advance_tick`] is the only way game time moves. It is
//! safe to call from several tasks at once: a second call while a tick is
//! running returns [`TickOutcome::Rejected`] immediately instead of
//! queueing. Unresolved blocking prompts stop the tick before any state is
//! read.
//!
//! The in-progress flag is released by an RAII guard, so it is cleared on
//! every exit path, including an unwinding panic inside the sequencer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tracing::{error, info, warn};

use crate::collaborators::{BlockingPrompts, Collaborators};
use crate::config::VintnerConfig;
use crate::tick::{TickReport, TickSequencer};

/// What a call to [`TickScheduler::advance_tick`] did.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// Time moved forward one week.
    Advanced(Box<TickReport>),
    /// Another tick was already in progress; nothing happened.
    Rejected,
    /// Blocking prompts were pending; they were surfaced and time did not
    /// move.
    Blocked,
    /// The tick could not start (state unreadable or calendar overflow).
    Failed,
}

impl TickOutcome {
    /// The tick report, if time moved.
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            Self::Advanced(report) => Some(report),
            Self::Rejected | Self::Blocked | Self::Failed => None,
        }
    }

    /// Whether time moved.
    pub const fn is_advanced(&self) -> bool {
        matches!(self, Self::Advanced(_))
    }
}

/// Clears the in-progress flag when dropped.
struct TickGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> TickGuard<'a> {
    /// Claim the flag, or `None` if a tick already holds it.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Serializes ticks and gates them on blocking prompts.
pub struct TickScheduler {
    /// Whether a tick is currently executing.
    in_progress: AtomicBool,
    /// Prompts that must be resolved before time passes.
    prompts: Arc<dyn BlockingPrompts>,
    /// The phase pipeline.
    sequencer: TickSequencer,
    /// Ticks that advanced the clock.
    advanced: AtomicU64,
    /// Calls dropped because a tick was running.
    rejected: AtomicU64,
}

impl TickScheduler {
    /// Build a scheduler over the given collaborators.
    pub fn new(config: &VintnerConfig, collaborators: Collaborators) -> Self {
        Self {
            in_progress: AtomicBool::new(false),
            prompts: Arc::clone(&collaborators.prompts),
            sequencer: TickSequencer::new(config, collaborators),
            advanced: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Whether a tick is currently executing.
    pub fn is_ticking(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Number of ticks that advanced the clock.
    pub fn ticks_advanced(&self) -> u64 {
        self.advanced.load(Ordering::Acquire)
    }

    /// Number of calls rejected because a tick was running.
    pub fn ticks_rejected(&self) -> u64 {
        self.rejected.load(Ordering::Acquire)
    }

    /// Advance game time by one week.
    ///
    /// Never returns an error; every failure mode is reported through
    /// [`TickOutcome`] and the log.
    pub async fn advance_tick(&self) -> TickOutcome {
        let Some(_guard) = TickGuard::acquire(&self.in_progress) else {
            self.rejected.fetch_add(1, Ordering::AcqRel);
            warn!("Tick already in progress, request dropped");
            return TickOutcome::Rejected;
        };

        match self.prompts.has_blocking().await {
            Ok(true) => {
                info!("Blocking prompts pending, time does not advance");
                if let Err(err) = self.prompts.resolve_blocking().await {
                    warn!(error = %err, "Could not resolve blocking prompts");
                }
                return TickOutcome::Blocked;
            }
            Ok(false) => {}
            Err(err) => {
                warn!(error = %err, "Blocking prompt check failed, advancing anyway");
            }
        }

        match self.sequencer.run().await {
            Ok(report) => {
                self.advanced.fetch_add(1, Ordering::AcqRel);
                TickOutcome::Advanced(Box::new(report))
            }
            Err(err) => {
                error!(error = %err, "Tick aborted before commit");
                TickOutcome::Failed
            }
        }
    }
}
