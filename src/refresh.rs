//! The refresh cycle and the countdown that drives it.
//!
//! A cycle reloads offsets, fetches spot prices, derives the board numbers and
//! writes them out. Nothing inside a cycle can fail past its boundary: every
//! problem is turned into a [`CycleEvent`] for the observer and the board keeps
//! whatever it showed before.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::display::{DisplayField, DisplaySurface};
use crate::pricing::{
    compute, format_with_currency, AdjustmentLoader, AdjustmentSet, AdjustmentSource, DisplayValues,
    LoadOutcome, MarketSource,
};

/// Seconds between refreshes.
pub const DEFAULT_REFRESH_SECS: u32 = 15;

/// Everything worth knowing about a cycle, delivered to a [`CycleObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum CycleEvent {
    AdjustmentsLoaded(AdjustmentSet),
    AdjustmentsNoMatch,
    AdjustmentsUnavailable(String),
    MarketUnavailable(String),
    /// Feed answered with `isSuccess: false` or without a result list.
    MarketRejected,
    Rendered(DisplayValues),
    /// Countdown hit zero while the previous cycle was still running.
    TriggerSkipped,
}

/// Hook for cycle outcomes. Implementations must not block.
pub trait CycleObserver: Send + Sync {
    fn on_event(&self, event: &CycleEvent);
}

/// Default observer: structured logs plus counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CycleObserver for TracingObserver {
    fn on_event(&self, event: &CycleEvent) {
        match event {
            CycleEvent::AdjustmentsLoaded(set) => info!(?set, "loaded price adjustments"),
            CycleEvent::AdjustmentsNoMatch => {
                warn!("no live adjustment document, keeping previous offsets")
            }
            CycleEvent::AdjustmentsUnavailable(reason) => {
                counter!("bullion_cycle_failures_total", "stage" => "adjustments").increment(1);
                error!(%reason, "adjustment fetch failed, keeping previous offsets");
            }
            CycleEvent::MarketUnavailable(reason) => {
                counter!("bullion_cycle_failures_total", "stage" => "market").increment(1);
                error!(%reason, "price fetch failed");
            }
            CycleEvent::MarketRejected => warn!("price feed reported failure, board left unchanged"),
            CycleEvent::Rendered(values) => {
                counter!("bullion_cycles_total").increment(1);
                if let Some(gold) = values.gold {
                    gauge!("bullion_price_gold24").set(gold.gold24);
                    info!(
                        gold24 = gold.gold24,
                        gold22 = gold.gold22,
                        gold21 = gold.gold21,
                        gold18 = gold.gold18,
                        bulk = gold.bulk,
                        "rendered gold prices"
                    );
                }
                if let Some(silver) = values.silver {
                    info!(per_gram = silver.per_gram, per_kg = silver.per_kg, "rendered silver price");
                }
            }
            CycleEvent::TriggerSkipped => {
                counter!("bullion_cycles_skipped_total").increment(1);
                warn!("previous refresh still in flight, skipping this one");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    Rendered(DisplayValues),
    Rejected,
    Unavailable,
}

/// Owns the offsets between cycles and runs one cycle at a time.
pub struct PriceRenderer<A, M> {
    loader: AdjustmentLoader<A>,
    market: M,
    adjustments: AdjustmentSet,
    currency: String,
}

impl<A: AdjustmentSource, M: MarketSource> PriceRenderer<A, M> {
    pub fn new(adjustments: A, market: M, currency: impl Into<String>) -> Self {
        Self {
            loader: AdjustmentLoader::new(adjustments),
            market,
            adjustments: AdjustmentSet::default(),
            currency: currency.into(),
        }
    }

    pub fn adjustments(&self) -> &AdjustmentSet {
        &self.adjustments
    }

    pub async fn run_cycle(&mut self, surface: &dyn DisplaySurface, observer: &dyn CycleObserver) -> CycleOutcome {
        let event = match self.loader.load(&mut self.adjustments).await {
            LoadOutcome::Loaded(set) => CycleEvent::AdjustmentsLoaded(set),
            LoadOutcome::NoMatch => CycleEvent::AdjustmentsNoMatch,
            LoadOutcome::Unavailable(reason) => CycleEvent::AdjustmentsUnavailable(reason),
        };
        observer.on_event(&event);

        let response = match self.market.fetch().await {
            Ok(response) => response,
            Err(e) => {
                observer.on_event(&CycleEvent::MarketUnavailable(e.to_string()));
                return CycleOutcome::Unavailable;
            }
        };

        let Some(spot) = response.spot() else {
            observer.on_event(&CycleEvent::MarketRejected);
            return CycleOutcome::Rejected;
        };

        let values = compute(&spot, &self.adjustments);
        render(&values, surface, &self.currency);
        observer.on_event(&CycleEvent::Rendered(values));
        CycleOutcome::Rendered(values)
    }
}

/// Write the present halves of `values` to the board.
pub fn render(values: &DisplayValues, surface: &dyn DisplaySurface, currency: &str) {
    if let Some(gold) = values.gold {
        surface.write(DisplayField::Gold24, format_with_currency(gold.gold24, currency));
        surface.write(DisplayField::Gold22, format_with_currency(gold.gold22, currency));
        surface.write(DisplayField::Gold21, format_with_currency(gold.gold21, currency));
        surface.write(DisplayField::Gold18, format_with_currency(gold.gold18, currency));
        surface.write(DisplayField::Bulk, format_with_currency(gold.bulk, currency));
    }
    if let Some(silver) = values.silver {
        surface.write(DisplayField::Silver, format_with_currency(silver.per_kg, currency));
    }
}

/// Seconds-until-refresh counter. Shows `period`, `period - 1`, ... `1`, and
/// fires on the tick that would take it to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    period: u32,
    remaining: u32,
}

impl Countdown {
    pub fn new(period: u32) -> Self {
        let period = period.max(1);
        Self { period, remaining: period }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Advance one second. Returns `true` when a refresh is due.
    pub fn tick(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.remaining = self.period;
            true
        } else {
            false
        }
    }
}

/// Drives a [`PriceRenderer`] from a one-second countdown. Cycles run on
/// their own tasks; a trigger that finds the renderer busy is skipped.
pub struct RefreshTimer<A, M> {
    renderer: Arc<Mutex<PriceRenderer<A, M>>>,
    surface: Arc<dyn DisplaySurface>,
    observer: Arc<dyn CycleObserver>,
    countdown: Countdown,
    tick: Duration,
}

impl<A, M> RefreshTimer<A, M>
where
    A: AdjustmentSource + 'static,
    M: MarketSource + 'static,
{
    pub fn new(
        renderer: PriceRenderer<A, M>,
        surface: Arc<dyn DisplaySurface>,
        observer: Arc<dyn CycleObserver>,
        period: u32,
    ) -> Self {
        Self {
            renderer: Arc::new(Mutex::new(renderer)),
            surface,
            observer,
            countdown: Countdown::new(period),
            tick: Duration::from_secs(1),
        }
    }

    /// Start a cycle unless one is already running.
    pub fn trigger(&self) -> Option<JoinHandle<CycleOutcome>> {
        match Arc::clone(&self.renderer).try_lock_owned() {
            Ok(mut renderer) => {
                let surface = Arc::clone(&self.surface);
                let observer = Arc::clone(&self.observer);
                Some(tokio::spawn(async move {
                    renderer.run_cycle(surface.as_ref(), observer.as_ref()).await
                }))
            }
            Err(_) => {
                self.observer.on_event(&CycleEvent::TriggerSkipped);
                None
            }
        }
    }

    /// Runs forever: one cycle up front, then one every `period` ticks.
    pub async fn run(mut self) {
        if let Some(first) = self.trigger() {
            if let Err(e) = first.await {
                error!(error = %e, "initial refresh task failed");
            }
        }

        self.surface.write(DisplayField::Countdown, self.countdown.remaining().to_string());

        let mut ticker = interval_at(Instant::now() + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if self.countdown.tick() {
                // Detached on purpose: the countdown keeps ticking while it runs.
                let _ = self.trigger();
            }
            self.surface.write(DisplayField::Countdown, self.countdown.remaining().to_string());
        }
    }
}
