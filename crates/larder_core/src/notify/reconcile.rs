//! Due-item reconciliation against persisted markers.
//!
//! # Invariants
//! - An item is due only when its expiry key equals today's key and its
//!   marker is not already today's key.
//! - Every due item is marked before returning, so a repeated call on the
//!   same day with the returned markers yields no due items.
//! - Items without a valid expiry date are never due.

use crate::expiry::classify::date_key;
use crate::model::item::FoodItem;
use crate::store::flag_store::NotifiedMarkers;
use chrono::NaiveDate;
use log::debug;
use serde_json::Value;

/// Output of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Items to notify, in input order.
    pub due_items: Vec<FoodItem>,
    /// Input markers plus today's entries for every due item.
    pub markers: NotifiedMarkers,
}

/// Computes which items need a notification today.
///
/// Pure apart from debug logging; persisting `markers` is up to the caller.
pub fn reconcile(items: &[FoodItem], today: NaiveDate, markers: NotifiedMarkers) -> Reconciliation {
    let today_key = date_key(today);
    let mut markers = markers;
    let mut due_items = Vec::new();
    let mut skipped_invalid = 0_usize;

    for item in items {
        let Some(expiry) = item.expiry_date else {
            skipped_invalid += 1;
            continue;
        };
        if date_key(expiry) != today_key || markers.is_marked_on(item.id, &today_key) {
            continue;
        }
        markers.mark(item.id, today_key.as_str());
        due_items.push(item.clone());
    }

    debug!(
        "event=reconcile module=notify status=ok today={today_key} items={} due={} skipped_invalid={skipped_invalid}",
        items.len(),
        due_items.len()
    );

    Reconciliation { due_items, markers }
}

/// Reconciles against marker state of unknown shape.
///
/// Anything that is not a JSON object of string dates is treated as empty,
/// so corrupted state errs toward notifying.
pub fn reconcile_untrusted(items: &[FoodItem], today: NaiveDate, raw: &Value) -> Reconciliation {
    reconcile(items, today, NotifiedMarkers::from_value(raw))
}

#[cfg(test)]
mod tests {
    use super::{reconcile, reconcile_untrusted};
    use crate::model::item::FoodItem;
    use crate::store::flag_store::NotifiedMarkers;
    use chrono::{Duration, NaiveDate};
    use serde_json::json;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    #[test]
    fn item_expiring_today_is_due_once() {
        let item = FoodItem::new("Milk", 1, today());
        let first = reconcile(std::slice::from_ref(&item), today(), NotifiedMarkers::new());
        assert_eq!(first.due_items, vec![item.clone()]);
        assert_eq!(first.markers.get(item.id), Some("2024-06-15"));
        assert_eq!(first.markers.len(), 1);

        let second = reconcile(std::slice::from_ref(&item), today(), first.markers.clone());
        assert!(second.due_items.is_empty());
        assert_eq!(second.markers, first.markers);
    }

    #[test]
    fn other_days_are_never_due() {
        let items = vec![
            FoodItem::new("Tomorrow", 1, today() + Duration::days(1)),
            FoodItem::new("Yesterday", 1, today() - Duration::days(1)),
            FoodItem::with_id(Uuid::new_v4(), "Unknown", 1, None),
        ];
        let mut markers = NotifiedMarkers::new();
        markers.mark(items[0].id, "2024-06-14");
        let result = reconcile(&items, today(), markers.clone());
        assert!(result.due_items.is_empty());
        assert_eq!(result.markers, markers);
    }

    #[test]
    fn yesterdays_marker_does_not_suppress_today() {
        let item = FoodItem::new("Cheese", 2, today());
        let mut markers = NotifiedMarkers::new();
        markers.mark(item.id, "2024-06-14");
        let result = reconcile(std::slice::from_ref(&item), today(), markers);
        assert_eq!(result.due_items.len(), 1);
        assert_eq!(result.markers.get(item.id), Some("2024-06-15"));
    }

    #[test]
    fn duplicate_ids_in_one_batch_are_notified_once() {
        let item = FoodItem::new("Ham", 1, today());
        let result = reconcile(&[item.clone(), item.clone()], today(), NotifiedMarkers::new());
        assert_eq!(result.due_items.len(), 1);
    }

    #[test]
    fn malformed_marker_state_is_treated_as_empty() {
        let item = FoodItem::new("Bread", 1, today());
        for raw in [json!("corrupted"), json!([item.id.to_string()]), json!(null)] {
            let result = reconcile_untrusted(std::slice::from_ref(&item), today(), &raw);
            assert_eq!(result.due_items, vec![item.clone()]);
        }
    }
}
