//! Food item domain model.
//!
//! # Responsibility
//! - Define the item record shared by storage, sources and the reconciler.
//! - Parse user-facing expiry text into calendar dates.
//!
//! # Invariants
//! - `id` is stable and never reused for another item.
//! - `quantity` is at least 1 for every valid item.
//! - `expiry_date == None` marks invalid item data: the item is listable but
//!   never classified or notified.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one tracked item.
pub type ItemId = Uuid;

/// Storage and wire format for expiry dates.
pub const EXPIRY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Validation errors for item records and drafts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    NilId,
    EmptyName,
    InvalidQuantity(i64),
    MissingExpiryDate,
    InvalidExpiryDate(String),
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId => write!(f, "item id cannot be nil"),
            Self::EmptyName => write!(f, "item name cannot be empty"),
            Self::InvalidQuantity(value) => {
                write!(f, "item quantity must be at least 1, got {value}")
            }
            Self::MissingExpiryDate => write!(f, "item expiry date is required"),
            Self::InvalidExpiryDate(value) => {
                write!(f, "invalid expiry date `{value}`; expected YYYY-MM-DD")
            }
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical food item record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: ItemId,
    /// Display name as entered by the user.
    pub name: String,
    pub quantity: u32,
    /// Calendar expiry date. `None` when the source supplied no parseable date.
    pub expiry_date: Option<NaiveDate>,
}

impl FoodItem {
    /// Creates a new item with a generated stable ID.
    pub fn new(name: impl Into<String>, quantity: u32, expiry_date: NaiveDate) -> Self {
        Self::with_id(Uuid::new_v4(), name, quantity, Some(expiry_date))
    }

    /// Creates an item with a caller-provided ID.
    ///
    /// Used by storage and remote sources where identity already exists.
    pub fn with_id(
        id: ItemId,
        name: impl Into<String>,
        quantity: u32,
        expiry_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            quantity,
            expiry_date,
        }
    }

    /// Checks record-level invariants.
    ///
    /// A missing expiry date is allowed here; write paths that require one
    /// check it separately.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.id.is_nil() {
            return Err(ItemValidationError::NilId);
        }
        if self.name.trim().is_empty() {
            return Err(ItemValidationError::EmptyName);
        }
        if self.quantity == 0 {
            return Err(ItemValidationError::InvalidQuantity(0));
        }
        Ok(())
    }

    /// Returns whether the expiry date was parseable.
    pub fn has_valid_expiry(&self) -> bool {
        self.expiry_date.is_some()
    }
}

/// Add/edit form input before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub name: String,
    /// Raw expiry text, `YYYY-MM-DD` or an ISO timestamp.
    pub expiry_date: String,
    /// Signed so zero and negative input can be rejected explicitly.
    pub quantity: i64,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, expiry_date: impl Into<String>, quantity: i64) -> Self {
        Self {
            name: name.into(),
            expiry_date: expiry_date.into(),
            quantity,
        }
    }

    /// Validates the draft and builds an item carrying `id`.
    ///
    /// # Errors
    /// - `EmptyName` when the trimmed name is empty.
    /// - `MissingExpiryDate` / `InvalidExpiryDate` for blank or bad dates.
    /// - `InvalidQuantity` when quantity is below 1 or above `u32::MAX`.
    pub fn to_item(&self, id: ItemId) -> Result<FoodItem, ItemValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ItemValidationError::EmptyName);
        }

        let raw_expiry = self.expiry_date.trim();
        if raw_expiry.is_empty() {
            return Err(ItemValidationError::MissingExpiryDate);
        }
        let expiry_date = parse_expiry_date(raw_expiry)
            .ok_or_else(|| ItemValidationError::InvalidExpiryDate(raw_expiry.to_string()))?;

        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|value| *value >= 1)
            .ok_or(ItemValidationError::InvalidQuantity(self.quantity))?;

        let item = FoodItem::with_id(id, name, quantity, Some(expiry_date));
        item.validate()?;
        Ok(item)
    }
}

/// Parses expiry text into a calendar date.
///
/// Accepts `YYYY-MM-DD` and timestamps such as `2024-05-01T00:00:00.000Z`,
/// where only the date part before `T` is used. Returns `None` for blank or
/// unparseable input.
pub fn parse_expiry_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);
    if date_part.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(date_part, EXPIRY_DATE_FORMAT).ok()
}
