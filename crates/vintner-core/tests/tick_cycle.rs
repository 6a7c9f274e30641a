//! Integration tests for the weekly tick cycle.
//!
//! A single recording fake plays every collaborator. It logs each call by
//! name, applies store patches for real, and can be told to fail or panic
//! inside a named hook. Every store call yields once so concurrent
//! requests interleave the way they would against a real backend.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt as _;
use tokio::sync::mpsc;
use vintner_core::collaborators::{
    AchievementEngine, ActivityProgression, BlockingPrompts, BoardSatisfaction, ChangeBroadcast,
    CollabFuture, CollaboratorError, Collaborators, FinanceLedger, NotificationBus,
    PrestigeEngine, SalesDemand, SharePriceEngine, StateStore, TickContext, VineyardLifecycle,
    WineSimulation,
};
use vintner_core::config::VintnerConfig;
use vintner_core::scheduler::{TickOutcome, TickScheduler};
use vintner_core::tick::TickReport;
use vintner_types::{EconomyPhase, GameDate, GameState, Notification, Season, StatePatch};

// ---------------------------------------------------------------------------
// Recording fake
// ---------------------------------------------------------------------------

struct RecordingWorld {
    state: Mutex<GameState>,
    calls: Mutex<Vec<&'static str>>,
    notes: Mutex<Vec<Notification>>,
    seen_dates: Mutex<Vec<GameDate>>,
    signals: AtomicUsize,
    pending_prompts: AtomicUsize,
    resolved_prompts: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    outside_shareholders: AtomicBool,
    hung_sweep: AtomicBool,
    failing_hook: Mutex<Option<&'static str>>,
    panicking_hook: Mutex<Option<&'static str>>,
    sweeps: mpsc::UnboundedSender<u64>,
}

impl RecordingWorld {
    fn new(date: GameDate) -> (Arc<Self>, mpsc::UnboundedReceiver<u64>) {
        let (sweeps, rx) = mpsc::unbounded_channel();
        let world = Self {
            state: Mutex::new(GameState {
                date,
                economy_phase: EconomyPhase::Stable,
            }),
            calls: Mutex::new(Vec::new()),
            notes: Mutex::new(Vec::new()),
            seen_dates: Mutex::new(Vec::new()),
            signals: AtomicUsize::new(0),
            pending_prompts: AtomicUsize::new(0),
            resolved_prompts: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            outside_shareholders: AtomicBool::new(false),
            hung_sweep: AtomicBool::new(false),
            failing_hook: Mutex::new(None),
            panicking_hook: Mutex::new(None),
            sweeps,
        };
        (Arc::new(world), rx)
    }

    fn record(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| **c == name).count()
    }

    fn position(&self, name: &str) -> usize {
        self.calls().iter().position(|c| *c == name).unwrap()
    }

    fn notes(&self) -> Vec<Notification> {
        self.notes.lock().unwrap().clone()
    }

    fn stored(&self) -> GameState {
        *self.state.lock().unwrap()
    }

    /// Generic simulation hook: records the call, then fails or panics if
    /// configured to.
    fn hook(&self, name: &'static str) -> CollabFuture<'_> {
        if *self.panicking_hook.lock().unwrap() == Some(name) {
            panic!("{name} exploded");
        }
        self.record(name);
        let fail = *self.failing_hook.lock().unwrap() == Some(name);
        async move {
            tokio::task::yield_now().await;
            if fail {
                Err(CollaboratorError::failed(format!("{name} failed")))
            } else {
                Ok(())
            }
        }
        .boxed()
    }
}

impl StateStore for RecordingWorld {
    fn read(&self) -> CollabFuture<'_, GameState> {
        async move {
            tokio::task::yield_now().await;
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(CollaboratorError::storage("read refused"));
            }
            Ok(*self.state.lock().unwrap())
        }
        .boxed()
    }

    fn write(&self, patch: StatePatch) -> CollabFuture<'_> {
        async move {
            tokio::task::yield_now().await;
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CollaboratorError::storage("write refused"));
            }
            self.state.lock().unwrap().apply(&patch);
            Ok(())
        }
        .boxed()
    }
}

impl BlockingPrompts for RecordingWorld {
    fn has_blocking(&self) -> CollabFuture<'_, bool> {
        let pending = self.pending_prompts.load(Ordering::SeqCst) > 0;
        async move { Ok(pending) }.boxed()
    }

    fn resolve_blocking(&self) -> CollabFuture<'_> {
        self.pending_prompts.store(0, Ordering::SeqCst);
        self.resolved_prompts.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }.boxed()
    }
}

impl NotificationBus for RecordingWorld {
    fn publish(&self, notification: Notification) -> CollabFuture<'_> {
        self.record("publish");
        self.notes.lock().unwrap().push(notification);
        async { Ok(()) }.boxed()
    }
}

impl ChangeBroadcast for RecordingWorld {
    fn signal(&self) {
        self.signals.fetch_add(1, Ordering::SeqCst);
    }
}

impl VineyardLifecycle for RecordingWorld {
    fn age_vineyards(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("age_vineyards")
    }

    fn recalculate_yields(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("recalculate_yields")
    }

    fn on_season_start(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("on_season_start")
    }
}

impl ActivityProgression for RecordingWorld {
    fn progress_activities(&self, _ctx: TickContext) -> CollabFuture<'_> {
        let stored = self.stored().date;
        self.seen_dates.lock().unwrap().push(stored);
        self.hook("progress_activities")
    }
}

impl WineSimulation for RecordingWorld {
    fn progress_fermentation(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("progress_fermentation")
    }

    fn roll_feature_risks(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("roll_feature_risks")
    }

    fn apply_feature_effects(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("apply_feature_effects")
    }

    fn age_bottled_wine(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("age_bottled_wine")
    }
}

impl SalesDemand for RecordingWorld {
    fn generate_orders(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("generate_orders")
    }

    fn generate_contracts(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("generate_contracts")
    }

    fn expire_stale(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("expire_stale")
    }
}

impl FinanceLedger for RecordingWorld {
    fn pay_wages(&self, _ctx: TickContext) -> CollabFuture<'_, Option<String>> {
        self.record("pay_wages");
        async { Ok(Some("Wages paid: 4,200.".to_owned())) }.boxed()
    }

    fn pay_loans(&self, _ctx: TickContext) -> CollabFuture<'_, Option<String>> {
        self.record("pay_loans");
        async { Ok(Some("Loan installment paid: 1,000.".to_owned())) }.boxed()
    }
}

impl PrestigeEngine for RecordingWorld {
    fn recalculate(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("recalculate_prestige")
    }
}

impl SharePriceEngine for RecordingWorld {
    fn adjust(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("adjust_share_price")
    }
}

impl BoardSatisfaction for RecordingWorld {
    fn has_outside_shareholders(&self) -> bool {
        self.outside_shareholders.load(Ordering::SeqCst)
    }

    fn record_snapshot(&self, _ctx: TickContext) -> CollabFuture<'_> {
        self.hook("record_board_snapshot")
    }
}

impl AchievementEngine for RecordingWorld {
    fn sweep(&self, ctx: TickContext) -> CollabFuture<'_, Vec<String>> {
        self.record("achievement_sweep");
        let _ = self.sweeps.send(ctx.absolute_week);
        if self.hung_sweep.load(Ordering::SeqCst) {
            return futures::future::pending().boxed();
        }
        async { Ok(vec!["First Harvest".to_owned()]) }.boxed()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn config(aggregate: bool) -> VintnerConfig {
    let mut config = VintnerConfig::default();
    config.economy.seed = Some(7);
    config.ticks.aggregate_notifications = aggregate;
    config
}

fn scheduler(world: &Arc<RecordingWorld>, aggregate: bool) -> TickScheduler {
    TickScheduler::new(&config(aggregate), Collaborators::uniform(world))
}

fn advanced(outcome: TickOutcome) -> TickReport {
    match outcome {
        TickOutcome::Advanced(report) => *report,
        other => panic!("expected an advanced tick, got {other:?}"),
    }
}

/// Let spawned tasks run until `done` holds.
async fn settle(done: impl Fn() -> bool) {
    for _ in 0..100 {
        if done() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("background work never settled");
}

// ---------------------------------------------------------------------------
// Reentrancy and gating
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_requests_advance_once() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(3, Season::Spring, 2024));
    let scheduler = scheduler(&world, true);

    let (first, second) = tokio::join!(scheduler.advance_tick(), scheduler.advance_tick());

    assert!(first.is_advanced());
    assert!(matches!(second, TickOutcome::Rejected));
    assert_eq!(world.stored().date, GameDate::new(4, Season::Spring, 2024));
    assert_eq!(world.count("progress_activities"), 1);
    assert_eq!(scheduler.ticks_advanced(), 1);
    assert_eq!(scheduler.ticks_rejected(), 1);
    assert!(!scheduler.is_ticking());
}

#[tokio::test]
async fn blocking_prompt_is_resolved_and_time_stands_still() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(3, Season::Spring, 2024));
    world.pending_prompts.store(2, Ordering::SeqCst);
    let scheduler = scheduler(&world, true);

    assert!(matches!(scheduler.advance_tick().await, TickOutcome::Blocked));
    assert_eq!(world.resolved_prompts.load(Ordering::SeqCst), 1);
    assert_eq!(world.stored().date, GameDate::new(3, Season::Spring, 2024));
    assert!(world.calls().is_empty());

    let report = advanced(scheduler.advance_tick().await);
    assert_eq!(report.date, GameDate::new(4, Season::Spring, 2024));
}

#[tokio::test]
async fn unreadable_state_fails_without_wedging_the_guard() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(3, Season::Spring, 2024));
    world.fail_reads.store(true, Ordering::SeqCst);
    let scheduler = scheduler(&world, true);

    assert!(matches!(scheduler.advance_tick().await, TickOutcome::Failed));
    assert!(world.calls().is_empty());
    assert!(!scheduler.is_ticking());

    world.fail_reads.store(false, Ordering::SeqCst);
    assert!(scheduler.advance_tick().await.is_advanced());
}

// ---------------------------------------------------------------------------
// Calendar scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spring_rolls_into_summer() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(12, Season::Spring, 2024));
    let scheduler = scheduler(&world, true);

    let report = advanced(scheduler.advance_tick().await);

    assert_eq!(report.date, GameDate::new(1, Season::Summer, 2024));
    assert!(report.season_changed);
    assert!(!report.year_changed);
    let shift = report.economy.unwrap();
    assert_eq!(shift.from, EconomyPhase::Stable);
    assert_eq!(world.stored().date, report.date);
    assert_eq!(world.stored().economy_phase, shift.to);
    assert_eq!(world.count("age_vineyards"), 0);
    assert_eq!(world.count("recalculate_yields"), 0);
    assert_eq!(world.count("on_season_start"), 1);
}

#[tokio::test]
async fn winter_rolls_into_a_new_year() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(12, Season::Winter, 2024));
    let scheduler = scheduler(&world, true);

    let report = advanced(scheduler.advance_tick().await);

    assert_eq!(report.date, GameDate::new(1, Season::Spring, 2025));
    assert!(report.season_changed);
    assert!(report.year_changed);
    assert!(report.economy.is_some());
    assert_eq!(world.count("age_vineyards"), 1);
    assert_eq!(world.count("recalculate_yields"), 1);
    assert!(world.position("age_vineyards") < world.position("recalculate_yields"));
    assert!(world.position("recalculate_yields") < world.position("on_season_start"));
    assert!(world.position("on_season_start") < world.position("progress_activities"));
}

#[tokio::test]
async fn mid_season_tick_leaves_economy_alone() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(5, Season::Autumn, 2024));
    let scheduler = scheduler(&world, true);

    let report = advanced(scheduler.advance_tick().await);

    assert_eq!(report.date, GameDate::new(6, Season::Autumn, 2024));
    assert!(report.economy.is_none());
    assert_eq!(world.count("on_season_start"), 0);
    assert_eq!(world.stored().economy_phase, EconomyPhase::Stable);
}

#[tokio::test]
async fn effects_see_the_committed_clock() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(12, Season::Summer, 2024));
    let scheduler = scheduler(&world, true);

    let report = advanced(scheduler.advance_tick().await);

    assert_eq!(*world.seen_dates.lock().unwrap(), vec![report.date]);
    assert!(world.signals.load(Ordering::SeqCst) >= 1);
}

// ---------------------------------------------------------------------------
// Weekly batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failures_and_panics_are_isolated() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(3, Season::Spring, 2024));
    *world.panicking_hook.lock().unwrap() = Some("generate_orders");
    *world.failing_hook.lock().unwrap() = Some("progress_fermentation");
    let scheduler = scheduler(&world, true);

    let report = advanced(scheduler.advance_tick().await);

    assert_eq!(world.stored().date, GameDate::new(4, Season::Spring, 2024));
    assert!(report.state_synced);

    let orders = report.effect("order_generation").unwrap();
    assert!(!orders.succeeded);
    assert!(orders.error.as_deref().unwrap().contains("generate_orders exploded"));
    let fermentation = report.effect("fermentation").unwrap();
    assert_eq!(fermentation.error.as_deref(), Some("progress_fermentation failed"));
    assert_eq!(report.failed_effects().count(), 2);

    for sibling in [
        "generate_contracts",
        "expire_stale",
        "roll_feature_risks",
        "apply_feature_effects",
        "age_bottled_wine",
        "recalculate_prestige",
        "adjust_share_price",
    ] {
        assert_eq!(world.count(sibling), 1, "{sibling} did not run");
    }
}

#[tokio::test]
async fn payments_only_on_first_week_of_season() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(12, Season::Spring, 2024));
    let scheduler = scheduler(&world, true);

    let rollover = advanced(scheduler.advance_tick().await);
    assert!(rollover.effect("wage_payment").unwrap().succeeded);
    assert!(rollover.effect("loan_payment").unwrap().succeeded);

    let next = advanced(scheduler.advance_tick().await);
    assert!(next.effect("wage_payment").is_none());
    assert!(next.effect("loan_payment").is_none());
    assert_eq!(world.count("pay_wages"), 1);
    assert_eq!(world.count("pay_loans"), 1);
}

#[tokio::test]
async fn board_snapshot_needs_outside_shareholders() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(3, Season::Spring, 2024));
    let scheduler = scheduler(&world, true);

    let private = advanced(scheduler.advance_tick().await);
    assert!(private.effect("board_satisfaction").is_none());

    world.outside_shareholders.store(true, Ordering::SeqCst);
    let public = advanced(scheduler.advance_tick().await);
    assert!(public.effect("board_satisfaction").unwrap().succeeded);
    assert_eq!(world.count("record_board_snapshot"), 1);
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rollover_messages_fold_into_one_notification() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(12, Season::Spring, 2024));
    let scheduler = scheduler(&world, true);

    let report = advanced(scheduler.advance_tick().await);

    let notes = world.notes();
    let folded: Vec<&Notification> = notes
        .iter()
        .filter(|n| n.title == "Summer has arrived")
        .collect();
    assert_eq!(folded.len(), 1);
    let text = &folded.first().unwrap().text;
    assert!(text.contains("Summer has begun"));
    assert!(text.contains("Wages paid: 4,200."));
    assert!(!notes.iter().any(|n| n.title == "Wages Paid"));
    assert!(notes.iter().any(|n| n.title == "Loan Payment"));
    assert_eq!(report.notifications, 1);
}

#[tokio::test]
async fn split_mode_delivers_each_message() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(12, Season::Spring, 2024));
    let scheduler = scheduler(&world, false);

    let report = advanced(scheduler.advance_tick().await);

    let notes = world.notes();
    assert!(notes.iter().any(|n| n.title == "New Season"));
    assert!(notes.iter().any(|n| n.title == "Wages Paid"));
    assert!(notes.iter().any(|n| n.title == "Loan Payment"));
    assert!(!notes.iter().any(|n| n.title == "Summer has arrived"));
    let expected = if report.economy.unwrap().changed() { 2 } else { 1 };
    assert_eq!(report.notifications, expected);
}

#[tokio::test]
async fn split_mode_announces_the_season_before_the_weekly_batch() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(12, Season::Spring, 2024));
    let scheduler = scheduler(&world, false);

    advanced(scheduler.advance_tick().await);

    assert_eq!(world.notes().first().unwrap().title, "New Season");
    assert!(world.position("publish") < world.position("progress_activities"));
    assert!(world.position("publish") < world.position("generate_orders"));
}

#[tokio::test]
async fn quiet_week_publishes_nothing() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(3, Season::Spring, 2024));
    let scheduler = scheduler(&world, true);

    let report = advanced(scheduler.advance_tick().await);
    settle(|| world.count("achievement_sweep") == 1).await;
    settle(|| world.notes().len() == 1).await;

    assert_eq!(report.notifications, 0);
    let only = world.notes();
    assert_eq!(only.first().unwrap().title, "Achievement Unlocked");
}

// ---------------------------------------------------------------------------
// Achievements
// ---------------------------------------------------------------------------

#[tokio::test]
async fn achievement_sweep_is_throttled_and_detached() {
    let (world, mut rx) = RecordingWorld::new(GameDate::new(1, Season::Spring, 2024));
    let scheduler = scheduler(&world, true);

    let mut admitted = Vec::new();
    for _ in 0..5 {
        admitted.push(advanced(scheduler.advance_tick().await).achievement_sweep);
    }
    assert_eq!(admitted, vec![true, false, false, false, true]);

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(second.saturating_sub(first), 4);

    settle(|| {
        world
            .notes()
            .iter()
            .filter(|n| n.title == "Achievement Unlocked")
            .count()
            == 2
    })
    .await;
}

#[tokio::test]
async fn hung_achievement_sweep_does_not_hold_the_tick() {
    let (world, mut rx) = RecordingWorld::new(GameDate::new(1, Season::Spring, 2024));
    world.hung_sweep.store(true, Ordering::SeqCst);
    let scheduler = scheduler(&world, true);

    let outcome = tokio::time::timeout(Duration::from_secs(5), scheduler.advance_tick())
        .await
        .unwrap();
    let report = advanced(outcome);
    assert!(report.achievement_sweep);
    assert!(!scheduler.is_ticking());

    // The sweep started and is still pending in the background.
    assert!(rx.recv().await.is_some());
    assert_eq!(world.count("achievement_sweep"), 1);

    let next = tokio::time::timeout(Duration::from_secs(5), scheduler.advance_tick())
        .await
        .unwrap();
    assert_eq!(advanced(next).date, GameDate::new(3, Season::Spring, 2024));
    assert!(world.notes().iter().all(|n| n.title != "Achievement Unlocked"));
}

// ---------------------------------------------------------------------------
// Persistence degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_commit_continues_on_local_state() {
    let (world, _rx) = RecordingWorld::new(GameDate::new(11, Season::Spring, 2024));
    world.fail_writes.store(true, Ordering::SeqCst);
    let scheduler = scheduler(&world, true);

    let first = advanced(scheduler.advance_tick().await);
    assert!(!first.state_synced);
    assert_eq!(first.date, GameDate::new(12, Season::Spring, 2024));
    assert_eq!(world.stored().date, GameDate::new(11, Season::Spring, 2024));
    assert_eq!(world.count("progress_activities"), 1);

    // Still failing: the next tick continues from the local state.
    let second = advanced(scheduler.advance_tick().await);
    assert!(!second.state_synced);
    assert_eq!(second.date, GameDate::new(1, Season::Summer, 2024));
    let phase = second.economy.unwrap().to;

    // The store recovers and catches up on every field it missed.
    world.fail_writes.store(false, Ordering::SeqCst);
    let third = advanced(scheduler.advance_tick().await);
    assert!(third.state_synced);
    assert_eq!(world.stored().date, GameDate::new(2, Season::Summer, 2024));
    assert_eq!(world.stored().economy_phase, phase);
}
