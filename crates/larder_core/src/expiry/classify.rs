//! Pure expiry classification.

use crate::model::item::{FoodItem, EXPIRY_DATE_FORMAT};
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Days past expiry after which an item counts as stale.
pub const DEFAULT_STALE_AFTER_DAYS: u32 = 7;

/// Tunables for lifecycle classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryPolicy {
    /// Items expired for more than this many days are `ExpiredStale`.
    pub stale_after_days: u32,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
        }
    }
}

/// Lifecycle state of an item relative to one calendar day.
///
/// Ordered by progression: a fixed expiry date only ever moves forward
/// through these variants as days pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleTag {
    /// Expires today or later.
    Active,
    /// Expired within the stale window.
    ExpiredRecent,
    /// Expired longer ago than the stale window; hidden by default.
    ExpiredStale,
}

impl LifecycleTag {
    pub fn is_expired(self) -> bool {
        !matches!(self, Self::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ExpiredRecent => "expired_recent",
            Self::ExpiredStale => "expired_stale",
        }
    }
}

/// Classifies an expiry date against `today`.
pub fn classify_date(expiry: NaiveDate, today: NaiveDate, policy: &ExpiryPolicy) -> LifecycleTag {
    if expiry >= today {
        return LifecycleTag::Active;
    }
    let days_past = today.signed_duration_since(expiry).num_days();
    if days_past <= i64::from(policy.stale_after_days) {
        LifecycleTag::ExpiredRecent
    } else {
        LifecycleTag::ExpiredStale
    }
}

/// Classifies an item with the default seven-day stale window.
///
/// Returns `None` for items without a parseable expiry date.
pub fn classify(item: &FoodItem, today: NaiveDate) -> Option<LifecycleTag> {
    classify_with_policy(item, today, &ExpiryPolicy::default())
}

pub fn classify_with_policy(
    item: &FoodItem,
    today: NaiveDate,
    policy: &ExpiryPolicy,
) -> Option<LifecycleTag> {
    item.expiry_date
        .map(|expiry| classify_date(expiry, today, policy))
}

/// Canonical `YYYY-MM-DD` key for a calendar date.
pub fn date_key(date: NaiveDate) -> String {
    date.format(EXPIRY_DATE_FORMAT).to_string()
}

/// Calendar date of `now` in its own timezone.
pub fn calendar_date<Tz: TimeZone>(now: &DateTime<Tz>) -> NaiveDate {
    now.date_naive()
}

/// Today's date in the local timezone.
pub fn local_today() -> NaiveDate {
    calendar_date(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::{calendar_date, classify, classify_date, date_key, ExpiryPolicy, LifecycleTag};
    use crate::model::item::FoodItem;
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone};
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn boundaries_follow_seven_day_window() {
        let today = day(2024, 6, 15);
        let policy = ExpiryPolicy::default();
        assert_eq!(classify_date(day(2024, 6, 16), today, &policy), LifecycleTag::Active);
        assert_eq!(classify_date(today, today, &policy), LifecycleTag::Active);
        assert_eq!(
            classify_date(day(2024, 6, 14), today, &policy),
            LifecycleTag::ExpiredRecent
        );
        assert_eq!(
            classify_date(day(2024, 6, 8), today, &policy),
            LifecycleTag::ExpiredRecent
        );
        assert_eq!(
            classify_date(day(2024, 6, 7), today, &policy),
            LifecycleTag::ExpiredStale
        );
    }

    #[test]
    fn ten_days_ago_is_stale() {
        let today = day(2024, 6, 15);
        let item = FoodItem::new("Yogurt", 1, today - Duration::days(10));
        assert_eq!(classify(&item, today), Some(LifecycleTag::ExpiredStale));
    }

    #[test]
    fn missing_expiry_has_no_tag() {
        let item = FoodItem::with_id(Uuid::new_v4(), "Mystery jar", 1, None);
        assert_eq!(classify(&item, day(2024, 6, 15)), None);
    }

    #[test]
    fn tag_never_regresses_as_days_advance() {
        let expiry = day(2024, 2, 27);
        let policy = ExpiryPolicy::default();
        let mut previous = LifecycleTag::Active;
        let mut seen = Vec::new();
        for offset in -5..20 {
            let today = expiry + Duration::days(offset);
            let tag = classify_date(expiry, today, &policy);
            assert!(tag >= previous, "tag regressed at offset {offset}");
            if seen.last() != Some(&tag) {
                seen.push(tag);
            }
            previous = tag;
        }
        assert_eq!(
            seen,
            vec![
                LifecycleTag::Active,
                LifecycleTag::ExpiredRecent,
                LifecycleTag::ExpiredStale
            ]
        );
    }

    #[test]
    fn custom_window_moves_stale_threshold() {
        let policy = ExpiryPolicy {
            stale_after_days: 2,
        };
        let today = day(2024, 6, 15);
        assert_eq!(
            classify_date(day(2024, 6, 13), today, &policy),
            LifecycleTag::ExpiredRecent
        );
        assert_eq!(
            classify_date(day(2024, 6, 12), today, &policy),
            LifecycleTag::ExpiredStale
        );
    }

    #[test]
    fn time_of_day_does_not_change_the_calendar_date() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let early = offset.with_ymd_and_hms(2024, 6, 15, 0, 0, 1).unwrap();
        let late = offset.with_ymd_and_hms(2024, 6, 15, 23, 59, 59).unwrap();
        assert_eq!(calendar_date(&early), calendar_date(&late));
        assert_eq!(date_key(calendar_date(&late)), "2024-06-15");
    }
}
