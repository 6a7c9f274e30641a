//! In-process implementations of the storage and UI collaborators.
//!
//! - [`InMemoryStore`] -- a [`StateStore`] over a lock-protected
//!   [`GameState`], with write-failure injection for degraded-mode runs.
//! - [`BroadcastSignal`] -- a [`ChangeBroadcast`] over a tokio broadcast
//!   channel.
//! - [`LogNotificationBus`] -- a [`NotificationBus`] that logs each
//!   notification and keeps a bounded history.
//! - [`PromptQueue`] -- [`BlockingPrompts`] backed by a queue of pending
//!   prompt texts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::FutureExt as _;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info};
use vintner_types::{GameState, Notification, StatePatch};

use crate::collaborators::{
    BlockingPrompts, ChangeBroadcast, CollabFuture, CollaboratorError, NotificationBus, StateStore,
};
use crate::config::VintnerConfig;

/// Capacity of the change-signal channel.
const SIGNAL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// State store
// ---------------------------------------------------------------------------

/// Game state held in memory.
#[derive(Debug)]
pub struct InMemoryStore {
    state: RwLock<GameState>,
    fail_writes: AtomicBool,
    writes: AtomicU64,
}

impl InMemoryStore {
    /// A store holding `state`.
    pub fn new(state: GameState) -> Self {
        Self {
            state: RwLock::new(state),
            fail_writes: AtomicBool::new(false),
            writes: AtomicU64::new(0),
        }
    }

    /// A store holding a new game's starting state.
    pub fn from_config(config: &VintnerConfig) -> Self {
        Self::new(GameState {
            date: config.calendar.start_date(),
            economy_phase: config.economy.starting_phase,
        })
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of writes applied so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current state.
    pub async fn snapshot(&self) -> GameState {
        *self.state.read().await
    }
}

impl StateStore for InMemoryStore {
    fn read(&self) -> CollabFuture<'_, GameState> {
        async move { Ok(*self.state.read().await) }.boxed()
    }

    fn write(&self, patch: StatePatch) -> CollabFuture<'_> {
        async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CollaboratorError::storage("store is not accepting writes"));
            }
            self.state.write().await.apply(&patch);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Change signal
// ---------------------------------------------------------------------------

/// UI change signal over a broadcast channel.
///
/// Subscribers receive a monotonically increasing signal counter. Lagging
/// subscribers miss intermediate values, which is fine: any value means
/// "re-read the state".
#[derive(Debug)]
pub struct BroadcastSignal {
    sender: broadcast::Sender<u64>,
    sent: AtomicU64,
}

impl BroadcastSignal {
    /// A signal with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            sender,
            sent: AtomicU64::new(0),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> broadcast::Receiver<u64> {
        self.sender.subscribe()
    }

    /// Number of signals emitted so far.
    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeBroadcast for BroadcastSignal {
    fn signal(&self) {
        let seq = self.sent.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let receivers = self.sender.send(seq).unwrap_or(0);
        debug!(seq, receivers, "Change signal sent");
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Notification bus that logs every notification and keeps the latest ones.
#[derive(Debug)]
pub struct LogNotificationBus {
    history: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

impl LogNotificationBus {
    /// A bus that remembers the last `capacity` notifications.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Remembered notifications, oldest first.
    pub async fn history(&self) -> Vec<Notification> {
        self.history.lock().await.iter().cloned().collect()
    }
}

impl NotificationBus for LogNotificationBus {
    fn publish(&self, notification: Notification) -> CollabFuture<'_> {
        async move {
            info!(
                source = %notification.source,
                category = ?notification.category,
                title = %notification.title,
                text = %notification.text,
                "Notification"
            );
            let mut history = self.history.lock().await;
            if history.len() >= self.capacity {
                history.pop_front();
            }
            if self.capacity > 0 {
                history.push_back(notification);
            }
            Ok(())
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Blocking prompts
// ---------------------------------------------------------------------------

/// Pending prompts the player must acknowledge before time passes.
#[derive(Debug, Default)]
pub struct PromptQueue {
    pending: Mutex<VecDeque<String>>,
}

impl PromptQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a prompt.
    pub async fn push(&self, text: impl Into<String>) {
        self.pending.lock().await.push_back(text.into());
    }

    /// Number of unresolved prompts.
    pub async fn len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Whether nothing is pending.
    pub async fn is_empty(&self) -> bool {
        self.pending.lock().await.is_empty()
    }
}

impl BlockingPrompts for PromptQueue {
    fn has_blocking(&self) -> CollabFuture<'_, bool> {
        async move { Ok(!self.pending.lock().await.is_empty()) }.boxed()
    }

    /// Surfaces the oldest prompt and treats it as acknowledged.
    fn resolve_blocking(&self) -> CollabFuture<'_> {
        async move {
            if let Some(text) = self.pending.lock().await.pop_front() {
                info!(prompt = %text, "Blocking prompt surfaced");
            }
            Ok(())
        }
        .boxed()
    }
}
