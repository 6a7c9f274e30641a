//! Fan-out/join execution of independent weekly effects.
//!
//! [`run_effects`] drives a set of named effect futures concurrently on the
//! current task and waits for all of them to settle. Each effect is
//! isolated: an `Err` result or a panic is caught at the effect boundary,
//! logged with the effect name, and recorded as a failed
//! [`EffectOutcome`]. The join itself never fails and no sibling is
//! cancelled.
//!
//! There is no timeout. An effect slower than the configured threshold
//! gets one warning and is then awaited to completion.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt as _;
use futures::future::{BoxFuture, join_all};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::collaborators::CollaboratorError;

/// Result type every effect resolves to.
pub type EffectResult = Result<(), CollaboratorError>;

/// A named unit of work inside a tick.
pub struct Effect<'a> {
    name: &'static str,
    future: BoxFuture<'a, EffectResult>,
}

impl<'a> Effect<'a> {
    /// Wrap an effect.
    ///
    /// `start` is invoked lazily, on the first poll, inside the isolation
    /// boundary, so a collaborator that panics before handing back its
    /// future is caught like any other failure.
    pub fn new<F, Fut>(name: &'static str, start: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = EffectResult> + Send + 'a,
    {
        Self {
            name,
            future: async move { start().await }.boxed(),
        }
    }

    /// Name used in logs and outcomes.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl core::fmt::Debug for Effect<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Effect").field("name", &self.name).finish_non_exhaustive()
    }
}

/// How one effect settled. Used for logging and reporting only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectOutcome {
    /// Effect name.
    pub name: &'static str,
    /// Whether the effect completed without error or panic.
    pub succeeded: bool,
    /// Error or panic message for failed effects.
    pub error: Option<String>,
    /// Wall time from first poll to settlement.
    pub elapsed: Duration,
}

/// Run one effect to settlement with failure isolation.
pub async fn run_effect(effect: Effect<'_>, slow_after: Option<Duration>) -> EffectOutcome {
    let Effect { name, future } = effect;
    let started = Instant::now();
    let guarded = AssertUnwindSafe(future).catch_unwind();

    let settled = match slow_after {
        None => guarded.await,
        Some(limit) => {
            tokio::pin!(guarded);
            tokio::select! {
                biased;
                res = &mut guarded => res,
                () = tokio::time::sleep(limit) => {
                    warn!(
                        effect = name,
                        threshold_ms = millis(limit),
                        "Effect is running long, still waiting"
                    );
                    guarded.await
                }
            }
        }
    };

    let elapsed = started.elapsed();
    let error = match settled {
        Ok(Ok(())) => None,
        Ok(Err(err)) => Some(err.to_string()),
        Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
    };

    match &error {
        None => debug!(effect = name, elapsed_ms = millis(elapsed), "Effect completed"),
        Some(message) => warn!(effect = name, error = %message, "Effect failed"),
    }

    EffectOutcome {
        name,
        succeeded: error.is_none(),
        error,
        elapsed,
    }
}

/// Run every effect concurrently and wait for all to settle.
///
/// Outcomes are returned in the order the effects were given, regardless
/// of completion order.
pub async fn run_effects(effects: Vec<Effect<'_>>, slow_after: Option<Duration>) -> Vec<EffectOutcome> {
    join_all(
        effects
            .into_iter()
            .map(|effect| run_effect(effect, slow_after)),
    )
    .await
}

/// Whole milliseconds of `d`, saturating.
fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Extract a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
