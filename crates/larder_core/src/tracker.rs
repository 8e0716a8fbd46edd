//! Refresh controller tying sources, reconciliation and dispatch together.
//!
//! # Responsibility
//! - Own the last good item list and the collaborators of one dashboard.
//! - Run one refresh cycle: fetch, reconcile, persist markers, dispatch.
//!
//! # Invariants
//! - A failed fetch keeps the previous item list and skips reconciliation.
//! - The flag store stays locked from marker load to marker save, so a
//!   midnight reset cannot interleave with a cycle.
//! - Markers are persisted before dispatch and never rolled back.
//! - [`run_refresh_loop`] runs each cycle on the blocking pool; source and
//!   sender I/O never blocks a runtime worker.

use crate::expiry::classify::{date_key, ExpiryPolicy};
use crate::model::item::FoodItem;
use crate::notify::reconcile::reconcile;
use crate::notify::sender::NotificationSender;
use crate::source::ItemSource;
use crate::store::flag_store::SharedFlagStore;
use crate::view::dashboard::{build_view, ItemRow, ViewQuery};
use chrono::NaiveDate;
use log::{error, info, warn};
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What happened to the reminder of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchStatus {
    /// No items were due.
    NothingDue,
    /// Items were due but no recipient is configured.
    NoRecipient,
    Sent,
    /// Dispatch failed; markers still record the items as notified.
    Failed(String),
}

/// Summary of one refresh cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// `false` when the source failed and the cycle was skipped.
    pub fetched: bool,
    pub item_count: usize,
    pub invalid_items: usize,
    pub due_items: Vec<FoodItem>,
    pub dispatch: DispatchStatus,
}

/// Dashboard controller.
pub struct ExpiryTracker<S: ItemSource, N: NotificationSender> {
    source: S,
    sender: N,
    flags: SharedFlagStore,
    recipient: Option<String>,
    policy: ExpiryPolicy,
    items: Vec<FoodItem>,
}

impl<S: ItemSource, N: NotificationSender> ExpiryTracker<S, N> {
    pub fn new(source: S, sender: N, flags: SharedFlagStore) -> Self {
        Self {
            source,
            sender,
            flags,
            recipient: None,
            policy: ExpiryPolicy::default(),
            items: Vec::new(),
        }
    }

    /// Sets the reminder recipient. Blank values disable dispatch.
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        let recipient = recipient.into();
        self.recipient = Some(recipient.trim().to_string()).filter(|value| !value.is_empty());
        self
    }

    pub fn with_policy(mut self, policy: ExpiryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Items from the last successful fetch.
    pub fn items(&self) -> &[FoodItem] {
        &self.items
    }

    /// Shared handle to the marker store, for the day-boundary scheduler.
    pub fn flag_store(&self) -> SharedFlagStore {
        Arc::clone(&self.flags)
    }

    /// Dashboard rows for the current item list.
    pub fn view(&self, query: &ViewQuery, today: NaiveDate) -> Vec<ItemRow> {
        build_view(&self.items, query, today, &self.policy)
    }

    /// Runs one refresh cycle as of `today`.
    pub fn refresh(&mut self, today: NaiveDate) -> RefreshReport {
        match self.source.fetch_items() {
            Ok(items) => self.items = items,
            Err(err) => {
                warn!(
                    "event=tracker_refresh module=tracker status=skipped error_code=source_unavailable kept_items={} error={err}",
                    self.items.len()
                );
                return RefreshReport {
                    fetched: false,
                    item_count: self.items.len(),
                    invalid_items: count_invalid(&self.items),
                    due_items: Vec::new(),
                    dispatch: DispatchStatus::NothingDue,
                };
            }
        }

        let invalid_items = count_invalid(&self.items);
        if invalid_items > 0 {
            warn!(
                "event=tracker_refresh module=tracker status=invalid_item_data invalid_items={invalid_items}"
            );
        }

        let due_items = {
            let store = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
            let markers = store.load_current(today);
            let reconciliation = reconcile(&self.items, today, markers);
            if let Err(err) = store.save(&reconciliation.markers) {
                error!(
                    "event=markers_save module=tracker status=error slot={} error={err}",
                    store.slot_name()
                );
            }
            reconciliation.due_items
        };

        let dispatch = self.dispatch(&due_items);
        info!(
            "event=tracker_refresh module=tracker status=ok today={} items={} due={}",
            date_key(today),
            self.items.len(),
            due_items.len()
        );

        RefreshReport {
            fetched: true,
            item_count: self.items.len(),
            invalid_items,
            due_items,
            dispatch,
        }
    }

    fn dispatch(&self, due_items: &[FoodItem]) -> DispatchStatus {
        if due_items.is_empty() {
            return DispatchStatus::NothingDue;
        }
        let Some(recipient) = self.recipient.as_deref() else {
            info!(
                "event=notify_send module=tracker status=skipped error_code=no_recipient due={}",
                due_items.len()
            );
            return DispatchStatus::NoRecipient;
        };

        match self.sender.send(recipient, due_items) {
            Ok(()) => DispatchStatus::Sent,
            Err(err) => {
                warn!("event=notify_send module=tracker status=error error={err}");
                DispatchStatus::Failed(err.to_string())
            }
        }
    }
}

/// Refreshes `tracker` every `period` until `cancel` fires.
///
/// `today` is read on the async side before each cycle. A cycle still in
/// flight at cancellation finishes on its blocking thread and is discarded.
/// Returns the number of completed cycles.
pub async fn run_refresh_loop<S, N>(
    tracker: ExpiryTracker<S, N>,
    period: Duration,
    cancel: CancellationToken,
    today: impl Fn() -> NaiveDate,
    mut on_report: impl FnMut(&RefreshReport),
) -> u64
where
    S: ItemSource + Send + 'static,
    N: NotificationSender + Send + 'static,
{
    let mut tracker = tracker;
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut completed = 0_u64;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let day = today();
        let cycle = tokio::task::spawn_blocking(move || {
            let report = tracker.refresh(day);
            (tracker, report)
        });
        let joined = tokio::select! {
            _ = cancel.cancelled() => {
                info!("event=refresh_loop_stop module=tracker status=ok in_flight=true cycles={completed}");
                return completed;
            }
            joined = cycle => joined,
        };

        match joined {
            Ok((returned, report)) => {
                tracker = returned;
                completed += 1;
                on_report(&report);
            }
            Err(err) => {
                error!("event=refresh_loop_stop module=tracker status=error cycles={completed} error={err}");
                return completed;
            }
        }
    }

    info!("event=refresh_loop_stop module=tracker status=ok in_flight=false cycles={completed}");
    completed
}

fn count_invalid(items: &[FoodItem]) -> usize {
    items.iter().filter(|item| !item.has_valid_expiry()).count()
}
