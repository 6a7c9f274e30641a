//! Tick sequencer: the ordered phase pipeline behind one weekly tick.
//!
//! Each tick runs through these phases:
//!
//! 1. **Load** -- read [`GameState`] from the store, or continue from the
//!    local copy if the previous commit did not reach the store.
//!
//! 2. **Advance** -- roll the [`GameClock`] forward one week. On a season
//!    rollover, step the [`EconomyAutomaton`].
//!
//! 3. **Commit** -- write the new date (and economy phase, if it moved) as
//!    one atomic patch, then signal the UI. Nothing below runs before this.
//!
//! 4. **Year boundary** -- vineyard aging, then yield recalculation.
//!
//! 5. **Season boundary** -- vineyard season hook; season and economy
//!    messages go to the [`TickDigest`]. With aggregation off they are
//!    published right away.
//!
//! 6. **Activities** -- one week of labor on in-progress work items.
//!
//! 7. **Weekly batch** -- independent effects run concurrently through
//!    [`run_effects`]. Wage and loan payments join on the first week of a
//!    season; wages are awaited on their own when their text is folded into
//!    the digest.
//!
//! 8. **Achievements** -- the [`ThrottleGate`] decides whether to spawn a
//!    full sweep. The tick never waits for it.
//!
//! 9. **Flush** -- deliver what is left in the digest and signal the UI
//!    again.
//!
//! Effect failures are logged and reported, never propagated. The only
//! errors that end a tick early are an unreadable state with no local copy
//! and a calendar overflow.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use vintner_types::{
    EconomyPhase, GameDate, GameState, Notification, NotificationCategory, Season, StatePatch,
    TickId,
};

use crate::clock::{ClockError, GameClock, Rollover};
use crate::collaborators::{CollaboratorError, Collaborators, TickContext};
use crate::config::VintnerConfig;
use crate::digest::TickDigest;
use crate::economy::{EconomyAutomaton, EconomyShift};
use crate::effects::{Effect, EffectOutcome, EffectResult, run_effect, run_effects};
use crate::throttle::ThrottleGate;

/// Errors that end a tick before the clock is committed.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The calendar could not be advanced.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The store could not be read and no local state exists yet.
    #[error("game state unavailable: {source}")]
    StateUnavailable {
        /// The underlying store error.
        source: CollaboratorError,
    },
}

/// Summary of a single tick's execution.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Correlation ID of this tick.
    pub tick_id: TickId,
    /// Date before the tick.
    pub previous: GameDate,
    /// Date after the tick.
    pub date: GameDate,
    /// Whether a new season began.
    pub season_changed: bool,
    /// Whether a new year began.
    pub year_changed: bool,
    /// The economy automaton step, present exactly when a season began.
    pub economy: Option<EconomyShift>,
    /// Outcome of every effect that ran, in phase order.
    pub effects: Vec<EffectOutcome>,
    /// Whether an achievement sweep was spawned.
    pub achievement_sweep: bool,
    /// Whether the new state reached the store.
    pub state_synced: bool,
    /// Number of notifications delivered by the flush phase.
    pub notifications: usize,
}

impl TickReport {
    /// Outcomes of effects that failed.
    pub fn failed_effects(&self) -> impl Iterator<Item = &EffectOutcome> {
        self.effects.iter().filter(|o| !o.succeeded)
    }

    /// Outcome of the named effect, if it ran.
    pub fn effect(&self, name: &str) -> Option<&EffectOutcome> {
        self.effects.iter().find(|o| o.name == name)
    }
}

/// Tick-level settings extracted from [`VintnerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TickSettings {
    weeks_per_season: u32,
    aggregate_notifications: bool,
    slow_effect_warning: Option<Duration>,
}

/// The last state this process computed, and whether the store has it.
#[derive(Debug, Default)]
struct LocalState {
    state: Option<GameState>,
    unsynced: bool,
}

/// Which recurring payment to settle.
#[derive(Debug, Clone, Copy)]
enum Payment {
    Wages,
    Loans,
}

impl Payment {
    const fn title(self) -> &'static str {
        match self {
            Self::Wages => "Wages Paid",
            Self::Loans => "Loan Payment",
        }
    }
}

/// Runs the phases of one tick in order.
///
/// Holds the state that lives across ticks: the economy RNG, the
/// achievement throttle, and the local copy of the last committed state.
/// Callers serialize ticks through [`crate::scheduler::TickScheduler`].
pub struct TickSequencer {
    collaborators: Collaborators,
    settings: TickSettings,
    automaton: EconomyAutomaton,
    rng: Mutex<StdRng>,
    throttle: Mutex<ThrottleGate>,
    local: Mutex<LocalState>,
}

impl TickSequencer {
    /// Build a sequencer from validated configuration.
    ///
    /// The economy RNG is seeded from `economy.seed` when set, otherwise
    /// from OS entropy.
    pub fn new(config: &VintnerConfig, collaborators: Collaborators) -> Self {
        let rng = config
            .economy
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            collaborators,
            settings: TickSettings {
                weeks_per_season: config.calendar.weeks_per_season,
                aggregate_notifications: config.ticks.aggregate_notifications,
                slow_effect_warning: config.ticks.slow_effect_warning(),
            },
            automaton: EconomyAutomaton::from_config(&config.economy),
            rng: Mutex::new(rng),
            throttle: Mutex::new(ThrottleGate::new(config.ticks.achievement_interval_weeks)),
            local: Mutex::new(LocalState::default()),
        }
    }

    /// Execute one complete tick.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] when no state can be loaded or the calendar
    /// cannot be advanced. In both cases nothing was committed and no
    /// effect ran.
    #[allow(clippy::too_many_lines)]
    pub async fn run(&self) -> Result<TickReport, TickError> {
        let tick_id = TickId::new();

        // --- Phase 1: Load ---
        let state = self.load_state().await?;

        // --- Phase 2: Advance ---
        let (mut clock, adjusted) = GameClock::restore(state.date, self.settings.weeks_per_season);
        if adjusted {
            warn!(
                %tick_id,
                stored_week = state.date.week,
                weeks_per_season = self.settings.weeks_per_season,
                "Stored week outside the calendar, clamped"
            );
        }
        let rollover = clock.advance()?;
        let economy = if rollover.season_changed {
            Some(self.roll_economy(state.economy_phase).await)
        } else {
            None
        };
        let next = GameState {
            date: rollover.date,
            economy_phase: economy.map_or(state.economy_phase, |shift| shift.to),
        };

        // --- Phase 3: Commit ---
        let state_synced = self.commit(state, next).await;
        self.collaborators.broadcast.signal();

        let ctx = TickContext {
            tick_id,
            previous: rollover.previous,
            date: rollover.date,
            economy_phase: next.economy_phase,
            season_changed: rollover.season_changed,
            year_changed: rollover.year_changed,
            absolute_week: clock.absolute_week(),
        };
        info!(
            %tick_id,
            date = %ctx.date,
            season_changed = ctx.season_changed,
            year_changed = ctx.year_changed,
            economy = %ctx.economy_phase,
            state_synced,
            "Tick started"
        );

        let mut digest = TickDigest::new();
        let mut effects = Vec::new();
        let mut notifications = 0_usize;

        // --- Phase 4: Year boundary ---
        if rollover.year_changed {
            effects.extend(self.year_boundary(ctx).await);
        }

        // --- Phase 5: Season boundary ---
        if rollover.season_changed {
            effects.push(self.season_boundary(ctx, economy, &mut digest).await);
            if !self.settings.aggregate_notifications {
                let notes = std::mem::take(&mut digest).split();
                notifications = notifications.saturating_add(self.deliver(notes).await);
            }
        }

        // --- Phase 6: Activities ---
        let activities = &self.collaborators.activities;
        effects.push(
            run_effect(
                Effect::new("activity_progression", move || {
                    activities.progress_activities(ctx)
                }),
                self.settings.slow_effect_warning,
            )
            .await,
        );

        // --- Phase 7: Weekly batch ---
        effects.extend(self.weekly_effects(ctx, &rollover, &mut digest).await);

        // --- Phase 8: Achievements ---
        let achievement_sweep = self.spawn_achievement_sweep(ctx).await;

        // --- Phase 9: Flush ---
        notifications = notifications.saturating_add(self.flush(digest, &rollover).await);
        self.collaborators.broadcast.signal();

        let report = TickReport {
            tick_id,
            previous: rollover.previous,
            date: rollover.date,
            season_changed: rollover.season_changed,
            year_changed: rollover.year_changed,
            economy,
            effects,
            achievement_sweep,
            state_synced,
            notifications,
        };
        info!(
            %tick_id,
            date = %report.date,
            effects = report.effects.len(),
            failed = report.failed_effects().count(),
            achievement_sweep,
            notifications,
            "Tick completed"
        );
        Ok(report)
    }

    /// Phase 1: pick the state this tick starts from.
    async fn load_state(&self) -> Result<GameState, TickError> {
        let (cached, unsynced) = {
            let local = self.local.lock().await;
            (local.state, local.unsynced)
        };

        if let Some(state) = cached.filter(|_| unsynced) {
            warn!(date = %state.date, "Store is behind, continuing from local state");
            return Ok(state);
        }

        match self.collaborators.store.read().await {
            Ok(state) => Ok(state),
            Err(source) => match cached {
                Some(state) => {
                    warn!(error = %source, "State read failed, continuing from local state");
                    Ok(state)
                }
                None => Err(TickError::StateUnavailable { source }),
            },
        }
    }

    /// Phase 2: one step of the economy walk.
    async fn roll_economy(&self, current: EconomyPhase) -> EconomyShift {
        let shift = {
            let mut rng = self.rng.lock().await;
            self.automaton.step(current, &mut *rng)
        };
        debug!(from = %shift.from, to = %shift.to, "Economy automaton stepped");
        shift
    }

    /// Phase 3: write the new state. Returns whether the store accepted it.
    ///
    /// The local copy is updated first, so a failed write degrades to
    /// running on local state; the next commit carries every field the
    /// store may be missing.
    async fn commit(&self, before: GameState, after: GameState) -> bool {
        let mut local = self.local.lock().await;
        let phase_moved = after.economy_phase != before.economy_phase;
        let patch = StatePatch {
            date: Some(after.date),
            economy_phase: (phase_moved || local.unsynced).then_some(after.economy_phase),
        };
        local.state = Some(after);

        match self.collaborators.store.write(patch).await {
            Ok(()) => {
                local.unsynced = false;
                true
            }
            Err(err) => {
                error!(
                    error = %err,
                    date = %after.date,
                    "State commit failed, continuing on local state"
                );
                local.unsynced = true;
                false
            }
        }
    }

    /// Phase 4: year-boundary hooks, strictly in order.
    async fn year_boundary(&self, ctx: TickContext) -> Vec<EffectOutcome> {
        let vineyards = &self.collaborators.vineyards;
        let aging = run_effect(
            Effect::new("vineyard_aging", move || vineyards.age_vineyards(ctx)),
            self.settings.slow_effect_warning,
        )
        .await;
        let yields = run_effect(
            Effect::new("yield_recalculation", move || vineyards.recalculate_yields(ctx)),
            self.settings.slow_effect_warning,
        )
        .await;
        vec![aging, yields]
    }

    /// Phase 5: season hook plus the season and economy digest fragments.
    async fn season_boundary(
        &self,
        ctx: TickContext,
        economy: Option<EconomyShift>,
        digest: &mut TickDigest,
    ) -> EffectOutcome {
        let vineyards = &self.collaborators.vineyards;
        let outcome = run_effect(
            Effect::new("vineyard_season_start", move || vineyards.on_season_start(ctx)),
            self.settings.slow_effect_warning,
        )
        .await;

        digest.push(
            "calendar",
            NotificationCategory::Time,
            "New Season",
            season_message(ctx.date, self.settings.weeks_per_season),
        );
        if let Some(text) = economy.and_then(|shift| shift.message()) {
            digest.push("economy", NotificationCategory::Economy, "Economy Update", text);
        }
        outcome
    }

    /// Phase 7: build and run this week's batch.
    async fn weekly_effects(
        &self,
        ctx: TickContext,
        rollover: &Rollover,
        digest: &mut TickDigest,
    ) -> Vec<EffectOutcome> {
        let c = &self.collaborators;
        let slow = self.settings.slow_effect_warning;

        let mut batch = vec![
            Effect::new("order_generation", move || c.sales.generate_orders(ctx)),
            Effect::new("contract_generation", move || c.sales.generate_contracts(ctx)),
            Effect::new("order_expiration", move || c.sales.expire_stale(ctx)),
            Effect::new("fermentation", move || c.wine.progress_fermentation(ctx)),
            Effect::new("feature_risks", move || c.wine.roll_feature_risks(ctx)),
            Effect::new("feature_effects", move || c.wine.apply_feature_effects(ctx)),
            Effect::new("bottle_aging", move || c.wine.age_bottled_wine(ctx)),
            Effect::new("prestige", move || c.prestige.recalculate(ctx)),
            Effect::new("share_price", move || c.share_price.adjust(ctx)),
        ];
        if c.board.has_outside_shareholders() {
            batch.push(Effect::new("board_satisfaction", move || {
                c.board.record_snapshot(ctx)
            }));
        }

        let mut outcomes = Vec::new();
        if rollover.is_season_start() {
            batch.push(Effect::new("loan_payment", move || {
                self.settle_payment(Payment::Loans, ctx)
            }));

            if self.settings.aggregate_notifications {
                let mut wage_text = None;
                let slot = &mut wage_text;
                let wages = run_effect(
                    Effect::new("wage_payment", move || async move {
                        *slot = c.finance.pay_wages(ctx).await?;
                        Ok::<(), CollaboratorError>(())
                    }),
                    slow,
                )
                .await;
                outcomes.push(wages);
                if let Some(text) = wage_text {
                    digest.push("finance", NotificationCategory::Finance, Payment::Wages.title(), text);
                }
            } else {
                batch.push(Effect::new("wage_payment", move || {
                    self.settle_payment(Payment::Wages, ctx)
                }));
            }
        }

        let names: Vec<&str> = batch.iter().map(Effect::name).collect();
        debug!(tick_id = %ctx.tick_id, effects = ?names, "Running weekly batch");
        outcomes.extend(run_effects(batch, slow).await);
        outcomes
    }

    /// Pay wages or loans and publish the ledger's summary on its own.
    async fn settle_payment(&self, payment: Payment, ctx: TickContext) -> EffectResult {
        let finance = &self.collaborators.finance;
        let text = match payment {
            Payment::Wages => finance.pay_wages(ctx).await?,
            Payment::Loans => finance.pay_loans(ctx).await?,
        };
        if let Some(text) = text {
            self.collaborators
                .notifications
                .publish(Notification::new(
                    text,
                    "finance",
                    payment.title(),
                    NotificationCategory::Finance,
                ))
                .await?;
        }
        Ok(())
    }

    /// Phase 8: spawn the achievement sweep if the throttle admits it.
    async fn spawn_achievement_sweep(&self, ctx: TickContext) -> bool {
        let admitted = self.throttle.lock().await.should_run(ctx.absolute_week);
        if !admitted {
            return false;
        }

        let achievements = Arc::clone(&self.collaborators.achievements);
        let notifications = Arc::clone(&self.collaborators.notifications);
        let slow = self.settings.slow_effect_warning;
        debug!(tick_id = %ctx.tick_id, absolute_week = ctx.absolute_week, "Spawning achievement sweep");

        tokio::spawn(async move {
            let sweep = Effect::new("achievement_sweep", move || async move {
                let unlocked = achievements.sweep(ctx).await?;
                for name in unlocked {
                    info!(tick_id = %ctx.tick_id, achievement = %name, "Achievement unlocked");
                    notifications
                        .publish(Notification::new(
                            format!("You unlocked \"{name}\"."),
                            "achievements",
                            "Achievement Unlocked",
                            NotificationCategory::Achievement,
                        ))
                        .await?;
                }
                Ok::<(), CollaboratorError>(())
            });
            run_effect(sweep, slow).await;
        });
        true
    }

    /// Phase 9: deliver the digest. Returns how many notifications went out.
    async fn flush(&self, digest: TickDigest, rollover: &Rollover) -> usize {
        if digest.is_empty() {
            return 0;
        }
        let notes: Vec<Notification> = if self.settings.aggregate_notifications && rollover.season_changed {
            digest
                .fold(rollover.date, rollover.year_changed)
                .into_iter()
                .collect()
        } else {
            digest.split()
        };
        self.deliver(notes).await
    }

    /// Publish each note, logging failures. Returns how many went out.
    async fn deliver(&self, notes: Vec<Notification>) -> usize {
        let mut delivered = 0_usize;
        for note in notes {
            let title = note.title.clone();
            match self.collaborators.notifications.publish(note).await {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(err) => warn!(error = %err, %title, "Notification delivery failed"),
            }
        }
        delivered
    }
}

/// Player-facing announcement of a new season.
fn season_message(date: GameDate, weeks_per_season: u32) -> String {
    if date.season == Season::FIRST {
        format!(
            "A new year begins: {} {}. The season lasts {weeks_per_season} weeks.",
            date.season, date.year
        )
    } else {
        format!(
            "{} has begun. The season lasts {weeks_per_season} weeks.",
            date.season
        )
    }
}
