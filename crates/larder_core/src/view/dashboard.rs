//! Dashboard row building.

use crate::expiry::classify::{classify_with_policy, ExpiryPolicy, LifecycleTag};
use crate::model::item::FoodItem;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Sort order selectable on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Keep source order.
    #[default]
    Stored,
    /// Soonest expiry first; items without a valid date last.
    Expiry,
    /// Largest quantity first.
    Quantity,
}

/// Unknown sort selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortOrder(pub String);

impl Display for UnknownSortOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown sort order `{}`; expected stored|expiry|quantity",
            self.0
        )
    }
}

impl std::error::Error for UnknownSortOrder {}

impl FromStr for SortOrder {
    type Err = UnknownSortOrder;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "stored" | "none" => Ok(Self::Stored),
            "expiry" => Ok(Self::Expiry),
            "quantity" => Ok(Self::Quantity),
            other => Err(UnknownSortOrder(other.to_string())),
        }
    }
}

/// Dashboard filter and sort state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewQuery {
    /// Case-insensitive name substring. Blank shows everything.
    pub search: String,
    pub sort: SortOrder,
    /// Show items the stale filter would normally hide.
    pub include_stale: bool,
}

/// One renderable dashboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    pub item: FoodItem,
    /// `None` for items without a valid expiry date.
    pub tag: Option<LifecycleTag>,
    pub expired: bool,
    /// Expired rows are read-only.
    pub editable: bool,
}

/// Builds dashboard rows for `items` as of `today`.
///
/// Stale items are dropped unless `query.include_stale` is set. Items with
/// invalid dates are always listed.
pub fn build_view(
    items: &[FoodItem],
    query: &ViewQuery,
    today: NaiveDate,
    policy: &ExpiryPolicy,
) -> Vec<ItemRow> {
    let needle = query.search.trim().to_lowercase();

    let mut selected = items
        .iter()
        .filter(|item| needle.is_empty() || item.name.to_lowercase().contains(&needle))
        .collect::<Vec<_>>();

    match query.sort {
        SortOrder::Stored => {}
        SortOrder::Expiry => selected.sort_by(|a, b| compare_expiry(a, b)),
        SortOrder::Quantity => selected.sort_by(|a, b| b.quantity.cmp(&a.quantity)),
    }

    selected
        .into_iter()
        .filter_map(|item| {
            let tag = classify_with_policy(item, today, policy);
            if tag == Some(LifecycleTag::ExpiredStale) && !query.include_stale {
                return None;
            }
            let expired = tag.is_some_and(LifecycleTag::is_expired);
            Some(ItemRow {
                item: item.clone(),
                tag,
                expired,
                editable: !expired,
            })
        })
        .collect()
}

fn compare_expiry(a: &FoodItem, b: &FoodItem) -> Ordering {
    match (a.expiry_date, b.expiry_date) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_view, SortOrder, ViewQuery};
    use crate::expiry::classify::{ExpiryPolicy, LifecycleTag};
    use crate::model::item::FoodItem;
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn pantry() -> Vec<FoodItem> {
        vec![
            FoodItem::new("Greek Yogurt", 2, today() + Duration::days(3)),
            FoodItem::new("Milk", 5, today() - Duration::days(2)),
            FoodItem::new("Old yogurt", 1, today() - Duration::days(10)),
            FoodItem::with_id(Uuid::new_v4(), "Jam", 3, None),
            FoodItem::new("Eggs", 12, today()),
        ]
    }

    fn names(rows: &[super::ItemRow]) -> Vec<&str> {
        rows.iter().map(|row| row.item.name.as_str()).collect()
    }

    #[test]
    fn default_view_hides_stale_and_keeps_order() {
        let rows = build_view(&pantry(), &ViewQuery::default(), today(), &ExpiryPolicy::default());
        assert_eq!(names(&rows), vec!["Greek Yogurt", "Milk", "Jam", "Eggs"]);
    }

    #[test]
    fn expired_rows_are_read_only() {
        let rows = build_view(&pantry(), &ViewQuery::default(), today(), &ExpiryPolicy::default());
        let milk = rows.iter().find(|row| row.item.name == "Milk").unwrap();
        assert_eq!(milk.tag, Some(LifecycleTag::ExpiredRecent));
        assert!(milk.expired);
        assert!(!milk.editable);

        let jam = rows.iter().find(|row| row.item.name == "Jam").unwrap();
        assert_eq!(jam.tag, None);
        assert!(jam.editable);
    }

    #[test]
    fn search_is_case_insensitive_and_trimmed() {
        let query = ViewQuery {
            search: "  YOGURT ".to_string(),
            include_stale: true,
            ..ViewQuery::default()
        };
        let rows = build_view(&pantry(), &query, today(), &ExpiryPolicy::default());
        assert_eq!(names(&rows), vec!["Greek Yogurt", "Old yogurt"]);
    }

    #[test]
    fn expiry_sort_puts_invalid_dates_last() {
        let query = ViewQuery {
            sort: SortOrder::Expiry,
            ..ViewQuery::default()
        };
        let rows = build_view(&pantry(), &query, today(), &ExpiryPolicy::default());
        assert_eq!(names(&rows), vec!["Milk", "Eggs", "Greek Yogurt", "Jam"]);
    }

    #[test]
    fn quantity_sort_is_descending() {
        let query = ViewQuery {
            sort: SortOrder::Quantity,
            ..ViewQuery::default()
        };
        let rows = build_view(&pantry(), &query, today(), &ExpiryPolicy::default());
        assert_eq!(names(&rows), vec!["Eggs", "Milk", "Jam", "Greek Yogurt"]);
    }

    #[test]
    fn sort_order_parses_selector_values() {
        assert_eq!("expiry".parse::<SortOrder>().unwrap(), SortOrder::Expiry);
        assert_eq!(" Quantity ".parse::<SortOrder>().unwrap(), SortOrder::Quantity);
        assert_eq!("".parse::<SortOrder>().unwrap(), SortOrder::Stored);
        assert!("price".parse::<SortOrder>().is_err());
    }
}
