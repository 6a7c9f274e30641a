//! A small in-memory winery that plays every simulation subsystem.
//!
//! The numbers are deliberately simple. The point is to give the tick
//! scheduler real work to drive from the console: cash moves on wages
//! and loans, orders arrive and expire, wine ferments and ages, and a few
//! achievements unlock along the way.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::FutureExt as _;
use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};
use tokio::sync::Mutex;
use tracing::debug;
use vintner_core::collaborators::{
    AchievementEngine, ActivityProgression, BlockingPrompts, BoardSatisfaction, ChangeBroadcast,
    CollabFuture, CollaboratorError, Collaborators, FinanceLedger, NotificationBus,
    PrestigeEngine, SalesDemand, SharePriceEngine, StateStore, TickContext, VineyardLifecycle,
    WineSimulation,
};
use vintner_types::{EconomyPhase, Season};

/// Cash on hand at the start of a game.
const STARTING_CASH: i64 = 60_000;
/// Wages charged on the first week of each season.
const SEASONAL_WAGES: i64 = 9_500;
/// Loan installment charged on the first week of each season.
const LOAN_INSTALLMENT: i64 = 4_000;
/// Outstanding loan principal at the start of a game.
const STARTING_LOAN: i64 = 40_000;
/// Weeks a batch spends fermenting before it is bottled.
const FERMENTATION_WEEKS: u32 = 3;
/// Bottles produced per finished batch.
const BOTTLES_PER_BATCH: u64 = 300;
/// Weeks an open order stays before it expires.
const ORDER_LIFETIME_WEEKS: u64 = 6;
/// Cellar weeks after which aged bottles add a point of prestige.
const CELLAR_PRESTIGE_WEEKS: u64 = 52;

/// Mutable winery state behind one lock.
#[derive(Debug)]
struct Winery {
    cash: i64,
    loan_remaining: i64,
    vine_age_years: u32,
    expected_yield_kg: u64,
    labor_weeks: u64,
    fermenting: Vec<u32>,
    bottles: u64,
    bottle_weeks: u64,
    orders: Vec<u64>,
    contracts: u32,
    prestige: u64,
    share_price_cents: u64,
    board_snapshots: u32,
    unlocked: BTreeSet<&'static str>,
}

impl Winery {
    const fn new() -> Self {
        Self {
            cash: STARTING_CASH,
            loan_remaining: STARTING_LOAN,
            vine_age_years: 3,
            expected_yield_kg: 4_000,
            labor_weeks: 0,
            fermenting: Vec::new(),
            bottles: 0,
            bottle_weeks: 0,
            orders: Vec::new(),
            contracts: 0,
            prestige: 10,
            share_price_cents: 1_000,
            board_snapshots: 0,
            unlocked: BTreeSet::new(),
        }
    }
}

/// Snapshot of the demo winery for the `status` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinerySummary {
    /// Cash on hand.
    pub cash: i64,
    /// Outstanding loan principal.
    pub loan_remaining: i64,
    /// Age of the vines in years.
    pub vine_age_years: u32,
    /// Bottles in the cellar.
    pub bottles: u64,
    /// Open customer orders.
    pub open_orders: usize,
    /// Company prestige.
    pub prestige: u64,
    /// Share price in cents.
    pub share_price_cents: u64,
    /// Active contracts.
    pub contracts: u32,
    /// Staff weeks spent on work items.
    pub labor_weeks: u64,
    /// Board satisfaction snapshots recorded.
    pub board_snapshots: u32,
    /// Achievements unlocked so far.
    pub achievements: usize,
}

/// Demo implementation of every simulation subsystem.
#[derive(Debug)]
pub struct DemoWinery {
    state: Mutex<Winery>,
    rng: Mutex<StdRng>,
    outside_shareholders: bool,
}

impl DemoWinery {
    /// A fresh winery. `seed` makes order generation reproducible.
    pub fn new(seed: Option<u64>, outside_shareholders: bool) -> Self {
        Self {
            state: Mutex::new(Winery::new()),
            rng: Mutex::new(seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)),
            outside_shareholders,
        }
    }

    /// Current figures.
    pub async fn summary(&self) -> WinerySummary {
        let w = self.state.lock().await;
        WinerySummary {
            cash: w.cash,
            loan_remaining: w.loan_remaining,
            vine_age_years: w.vine_age_years,
            bottles: w.bottles,
            open_orders: w.orders.len(),
            prestige: w.prestige,
            share_price_cents: w.share_price_cents,
            contracts: w.contracts,
            labor_weeks: w.labor_weeks,
            board_snapshots: w.board_snapshots,
            achievements: w.unlocked.len(),
        }
    }

    /// Wire this winery together with the storage and UI collaborators.
    pub fn collaborators(
        self: &Arc<Self>,
        store: Arc<dyn StateStore>,
        prompts: Arc<dyn BlockingPrompts>,
        notifications: Arc<dyn NotificationBus>,
        broadcast: Arc<dyn ChangeBroadcast>,
    ) -> Collaborators {
        Collaborators {
            store,
            prompts,
            notifications,
            broadcast,
            vineyards: Arc::clone(self) as Arc<dyn VineyardLifecycle>,
            activities: Arc::clone(self) as Arc<dyn ActivityProgression>,
            wine: Arc::clone(self) as Arc<dyn WineSimulation>,
            sales: Arc::clone(self) as Arc<dyn SalesDemand>,
            finance: Arc::clone(self) as Arc<dyn FinanceLedger>,
            prestige: Arc::clone(self) as Arc<dyn PrestigeEngine>,
            share_price: Arc::clone(self) as Arc<dyn SharePriceEngine>,
            board: Arc::clone(self) as Arc<dyn BoardSatisfaction>,
            achievements: Arc::clone(self) as Arc<dyn AchievementEngine>,
        }
    }

    /// Roll a demand count for one week, scaled by the economy.
    async fn roll_demand(&self, phase: EconomyPhase) -> u64 {
        let ceiling: u64 = match phase {
            EconomyPhase::Crash => 1,
            EconomyPhase::Recession => 2,
            EconomyPhase::Stable => 3,
            EconomyPhase::Expansion => 4,
            EconomyPhase::Boom => 5,
        };
        self.rng.lock().await.random_range(0..=ceiling)
    }
}

impl VineyardLifecycle for DemoWinery {
    fn age_vineyards(&self, ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            w.vine_age_years = w.vine_age_years.saturating_add(1);
            debug!(tick_id = %ctx.tick_id, age = w.vine_age_years, "Vineyards aged");
            Ok(())
        }
        .boxed()
    }

    fn recalculate_yields(&self, ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            // Yield climbs with vine age until the vines mature at 10 years.
            let maturity = u64::from(w.vine_age_years.min(10));
            w.expected_yield_kg = maturity.saturating_mul(1_000).max(1_000);
            debug!(tick_id = %ctx.tick_id, yield_kg = w.expected_yield_kg, "Yields recalculated");
            Ok(())
        }
        .boxed()
    }

    fn on_season_start(&self, ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            if ctx.date.season == Season::Autumn {
                // Harvest: one batch per ton of expected yield.
                let batches = w.expected_yield_kg.checked_div(1_000).unwrap_or(0);
                for _ in 0..batches {
                    w.fermenting.push(0);
                }
                debug!(tick_id = %ctx.tick_id, batches, "Harvest crushed into fermenters");
            }
            Ok(())
        }
        .boxed()
    }
}

impl ActivityProgression for DemoWinery {
    fn progress_activities(&self, _ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            w.labor_weeks = w.labor_weeks.saturating_add(1);
            Ok(())
        }
        .boxed()
    }
}

impl WineSimulation for DemoWinery {
    fn progress_fermentation(&self, _ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            for weeks in &mut w.fermenting {
                *weeks = weeks.saturating_add(1);
            }
            let before = w.fermenting.len();
            w.fermenting.retain(|weeks| *weeks < FERMENTATION_WEEKS);
            let finished = u64::try_from(before.saturating_sub(w.fermenting.len())).unwrap_or(0);
            w.bottles = w
                .bottles
                .saturating_add(finished.saturating_mul(BOTTLES_PER_BATCH));
            Ok(())
        }
        .boxed()
    }

    fn roll_feature_risks(&self, _ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let spoiled = {
                let w = self.state.lock().await;
                !w.fermenting.is_empty() && self.rng.lock().await.random_ratio(1, 50)
            };
            if spoiled {
                let mut w = self.state.lock().await;
                w.fermenting.pop();
                w.prestige = w.prestige.saturating_sub(1);
                debug!("A fermenting batch spoiled");
            }
            Ok(())
        }
        .boxed()
    }

    fn apply_feature_effects(&self, _ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            let matured = w.bottles > 0
                && w.bottle_weeks > 0
                && w.bottle_weeks.checked_rem(CELLAR_PRESTIGE_WEEKS) == Some(0);
            if matured {
                w.prestige = w.prestige.saturating_add(1);
                debug!(bottle_weeks = w.bottle_weeks, "Cellar-aged wine gained prestige");
            }
            Ok(())
        }
        .boxed()
    }

    fn age_bottled_wine(&self, _ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            if w.bottles > 0 {
                w.bottle_weeks = w.bottle_weeks.saturating_add(1);
            }
            Ok(())
        }
        .boxed()
    }
}

impl SalesDemand for DemoWinery {
    fn generate_orders(&self, ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let new_orders = self.roll_demand(ctx.economy_phase).await;
            let mut w = self.state.lock().await;
            for _ in 0..new_orders {
                w.orders.push(ctx.absolute_week);
            }
            // Fill what the cellar allows, six bottles per order.
            while w.bottles >= 6 && !w.orders.is_empty() {
                w.orders.remove(0);
                w.bottles = w.bottles.saturating_sub(6);
                w.cash = w.cash.saturating_add(180);
            }
            Ok(())
        }
        .boxed()
    }

    fn generate_contracts(&self, ctx: TickContext) -> CollabFuture<'_> {
        async move {
            if ctx.season_changed && ctx.economy_phase.index() >= EconomyPhase::Stable.index() {
                let mut w = self.state.lock().await;
                w.contracts = w.contracts.saturating_add(1);
            }
            Ok(())
        }
        .boxed()
    }

    fn expire_stale(&self, ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            let before = w.orders.len();
            w.orders
                .retain(|placed| ctx.absolute_week.saturating_sub(*placed) < ORDER_LIFETIME_WEEKS);
            let expired = before.saturating_sub(w.orders.len());
            if expired > 0 {
                debug!(tick_id = %ctx.tick_id, expired, "Orders expired");
            }
            Ok(())
        }
        .boxed()
    }
}

impl FinanceLedger for DemoWinery {
    fn pay_wages(&self, _ctx: TickContext) -> CollabFuture<'_, Option<String>> {
        async move {
            let mut w = self.state.lock().await;
            if w.cash < SEASONAL_WAGES {
                return Ok(Some(format!(
                    "Could not pay {SEASONAL_WAGES} in wages: only {} on hand.",
                    w.cash
                )));
            }
            w.cash = w.cash.saturating_sub(SEASONAL_WAGES);
            Ok(Some(format!(
                "Paid {SEASONAL_WAGES} in seasonal wages. Cash on hand: {}.",
                w.cash
            )))
        }
        .boxed()
    }

    fn pay_loans(&self, _ctx: TickContext) -> CollabFuture<'_, Option<String>> {
        async move {
            let mut w = self.state.lock().await;
            if w.loan_remaining <= 0 {
                return Ok(None);
            }
            let installment = LOAN_INSTALLMENT.min(w.loan_remaining);
            if w.cash < installment {
                return Err(CollaboratorError::failed(format!(
                    "loan installment of {installment} bounced"
                )));
            }
            w.cash = w.cash.saturating_sub(installment);
            w.loan_remaining = w.loan_remaining.saturating_sub(installment);
            Ok(Some(format!(
                "Paid a {installment} loan installment. {} still owed.",
                w.loan_remaining
            )))
        }
        .boxed()
    }
}

impl PrestigeEngine for DemoWinery {
    fn recalculate(&self, _ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            let aged_stock = w.bottle_weeks.checked_div(12).unwrap_or(0);
            w.prestige = 10_u64
                .saturating_add(aged_stock)
                .saturating_add(u64::from(w.contracts));
            Ok(())
        }
        .boxed()
    }
}

impl SharePriceEngine for DemoWinery {
    fn adjust(&self, ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            let price = w.share_price_cents;
            w.share_price_cents = match ctx.economy_phase {
                EconomyPhase::Crash => price.saturating_sub(20),
                EconomyPhase::Recession => price.saturating_sub(5),
                EconomyPhase::Stable => price,
                EconomyPhase::Expansion => price.saturating_add(5),
                EconomyPhase::Boom => price.saturating_add(20),
            }
            .max(100);
            Ok(())
        }
        .boxed()
    }
}

impl BoardSatisfaction for DemoWinery {
    fn has_outside_shareholders(&self) -> bool {
        self.outside_shareholders
    }

    fn record_snapshot(&self, _ctx: TickContext) -> CollabFuture<'_> {
        async move {
            let mut w = self.state.lock().await;
            w.board_snapshots = w.board_snapshots.saturating_add(1);
            Ok(())
        }
        .boxed()
    }
}

impl AchievementEngine for DemoWinery {
    fn sweep(&self, _ctx: TickContext) -> CollabFuture<'_, Vec<String>> {
        async move {
            let mut w = self.state.lock().await;
            let earned = [
                ("First Bottling", w.bottles > 0 || w.bottle_weeks > 0),
                ("Old Vines", w.vine_age_years >= 5),
                ("Debt Free", w.loan_remaining <= 0),
                ("Well Capitalized", w.cash >= 100_000),
            ];
            let mut unlocked = Vec::new();
            for (name, met) in earned {
                if met && w.unlocked.insert(name) {
                    unlocked.push(name.to_owned());
                }
            }
            Ok(unlocked)
        }
        .boxed()
    }
}
