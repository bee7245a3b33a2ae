//! Snipe scheduler.
//!
//! Owns one attempt from identifier to submitted bid:
//! `Resolving → Waiting → Bidding → Done`, or `Resolving → Abandoned`
//! when the item cannot be resolved. The attempt runs on its own tokio
//! task; the caller gets a `SnipeHandle` to await or cancel it.
//!
//! Nothing is retried here. Retries live in the executor; a failed bid
//! is a normal terminal outcome.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::resolver::Resolver;
use crate::marketplace::ebay::EbayClient;
use crate::types::{
    clamp_lead_secs, AuctionItem, BidOutcome, SnipeReport, SnipeRequest, SnipeState,
};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of wall-clock time for computing the wait.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// The moment to submit: `end_time − clamp(lead, 1, 3600)` seconds.
pub fn fire_instant(end_time: DateTime<Utc>, lead_time_secs: i64) -> DateTime<Utc> {
    end_time - ChronoDuration::seconds(clamp_lead_secs(lead_time_secs))
}

/// How long to sleep before firing. Never negative; zero once passed.
pub fn wait_duration(fire_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (fire_at - now).to_std().unwrap_or(Duration::ZERO)
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct SnipeScheduler {
    client: Arc<EbayClient>,
    clock: Arc<dyn Clock>,
}

/// Handle to a launched snipe.
pub struct SnipeHandle {
    task: JoinHandle<SnipeReport>,
    cancel: Option<oneshot::Sender<()>>,
}

impl SnipeHandle {
    /// Ask the attempt to stop. Only effective before bidding starts.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the attempt to reach a terminal state.
    ///
    /// Cancel-safe; must not be called again once it has returned.
    pub async fn wait(&mut self) -> anyhow::Result<SnipeReport> {
        Ok((&mut self.task).await?)
    }
}

impl SnipeScheduler {
    pub fn new(client: Arc<EbayClient>) -> Self {
        Self::with_clock(client, Arc::new(SystemClock))
    }

    pub fn with_clock(client: Arc<EbayClient>, clock: Arc<dyn Clock>) -> Self {
        Self { client, clock }
    }

    /// Start the attempt on a dedicated background task.
    pub fn launch(self, request: SnipeRequest) -> SnipeHandle {
        let (tx, rx) = oneshot::channel();
        let span = info_span!("snipe", attempt = %uuid::Uuid::new_v4());
        let task = tokio::spawn(async move { self.run(request, rx).await }.instrument(span));
        SnipeHandle {
            task,
            cancel: Some(tx),
        }
    }

    /// Drive one attempt to a terminal state on the current task.
    ///
    /// Dropping the sender side of `cancel` does not cancel.
    pub async fn run(&self, request: SnipeRequest, mut cancel: oneshot::Receiver<()>) -> SnipeReport {
        let mut report = SnipeReport {
            item: None,
            fire_instant: None,
            final_state: SnipeState::Resolving,
        };

        debug!(state = %report.final_state, identifier = %request.identifier, "Snipe started");

        // -- Resolving ---------------------------------------------------
        let item = match Resolver::new(&self.client)
            .resolve(&request.identifier, request.fallback.as_deref())
            .await
        {
            Ok(item) => item,
            Err(e) => {
                error!(identifier = %request.identifier, error = %e, "Item not found, abandoning snipe");
                report.final_state = SnipeState::Abandoned(e.to_string());
                return report;
            }
        };

        // -- Waiting -----------------------------------------------------
        let lead = request.clamped_lead_secs();
        if lead != request.lead_time_secs {
            debug!(requested = request.lead_time_secs, used = lead, "Lead time clamped");
        }
        let fire_at = fire_instant(item.end_time, lead);
        let now = self.clock.now();
        let wait = wait_duration(fire_at, now);

        report.fire_instant = Some(fire_at);
        report.final_state = SnipeState::Waiting;
        info!(
            item = %item,
            fire_at = %fire_at,
            wait_secs = wait.as_secs_f64(),
            lead_secs = lead,
            closes_in_secs = item.time_remaining(now).num_seconds(),
            "Waiting to place bid"
        );

        if !wait.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                Ok(()) = &mut cancel => {
                    warn!(item_id = %item.item_id, "Snipe cancelled before bidding");
                    report.item = Some(item);
                    report.final_state = SnipeState::Cancelled;
                    return report;
                }
            }
        } else {
            warn!(item_id = %item.item_id, "Bid instant already passed, bidding immediately");
        }

        // A cancel sent while resolving is still pending here.
        if let Ok(()) = cancel.try_recv() {
            warn!(item_id = %item.item_id, "Snipe cancelled before bidding");
            report.item = Some(item);
            report.final_state = SnipeState::Cancelled;
            return report;
        }

        // -- Bidding -----------------------------------------------------
        report.final_state = SnipeState::Bidding;
        debug!(state = %report.final_state, item_id = %item.item_id, "Placing bid");
        let outcome = self.place_bid(&item, &request).await;

        match &outcome {
            BidOutcome::Success(payload) => {
                info!(item_id = %item.item_id, response = %payload, "Bid placed successfully");
            }
            BidOutcome::Failure(reason) => {
                error!(item_id = %item.item_id, reason = %reason, "Failed to place bid");
            }
        }

        report.item = Some(item);
        report.final_state = SnipeState::Done(outcome);
        report
    }

    async fn place_bid(&self, item: &AuctionItem, request: &SnipeRequest) -> BidOutcome {
        match self
            .client
            .place_proxy_bid(&item.item_id, request.max_bid_amount, &request.currency)
            .await
        {
            Ok(Some(payload)) => BidOutcome::Success(payload),
            Ok(None) => BidOutcome::Failure(format!(
                "no response after {} attempts",
                self.client.executor().policy().max_retries
            )),
            Err(e) => BidOutcome::Failure(e.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
