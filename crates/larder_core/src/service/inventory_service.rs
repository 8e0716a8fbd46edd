//! Inventory use-case service.
//!
//! # Responsibility
//! - Provide add/edit/delete/get/list entry points for food items.
//! - Turn raw form drafts into validated items before persistence.
//!
//! # Invariants
//! - Items already past their expiry date are read-only: edit and delete are
//!   refused until the stale filter hides them.
//! - Items with an unparseable expiry stay editable so the date can be fixed.

use crate::model::item::{FoodItem, ItemDraft, ItemId, ItemValidationError};
use crate::repo::item_repo::{ItemListQuery, ItemRepository, RepoError, RepoResult};
use chrono::NaiveDate;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Service error for inventory use-cases.
#[derive(Debug)]
pub enum InventoryError {
    /// Draft or record failed validation.
    Validation(ItemValidationError),
    /// Target item does not exist.
    NotFound(ItemId),
    /// Target item expired before `today` and is read-only.
    ItemExpired(ItemId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for InventoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::ItemExpired(id) => write!(f, "item {id} has expired and can no longer change"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for InventoryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for InventoryError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for InventoryError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Inventory facade over repository implementations.
pub struct InventoryService<R: ItemRepository> {
    repo: R,
}

impl<R: ItemRepository> InventoryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the wrapped repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validates `draft` and stores it as a new item.
    pub fn add_item(&self, draft: &ItemDraft) -> Result<FoodItem, InventoryError> {
        let item = draft.to_item(Uuid::new_v4())?;
        self.repo.create_item(&item)?;
        info!(
            "event=item_add module=service status=ok item_id={} quantity={}",
            item.id, item.quantity
        );
        Ok(item)
    }

    /// Replaces name, quantity and expiry of an existing item.
    ///
    /// # Errors
    /// - `NotFound` for unknown ids.
    /// - `ItemExpired` when the stored item expired before `today`.
    /// - `Validation` for a bad draft.
    pub fn update_item(
        &self,
        id: ItemId,
        draft: &ItemDraft,
        today: NaiveDate,
    ) -> Result<FoodItem, InventoryError> {
        self.require_mutable(id, today)?;
        let item = draft.to_item(id)?;
        self.repo.update_item(&item)?;
        info!("event=item_update module=service status=ok item_id={id}");
        Ok(item)
    }

    /// Deletes an item that has not expired yet.
    pub fn delete_item(&self, id: ItemId, today: NaiveDate) -> Result<(), InventoryError> {
        self.require_mutable(id, today)?;
        self.repo.delete_item(id)?;
        info!("event=item_delete module=service status=ok item_id={id}");
        Ok(())
    }

    pub fn get_item(&self, id: ItemId) -> RepoResult<Option<FoodItem>> {
        self.repo.get_item(id)
    }

    pub fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<FoodItem>> {
        self.repo.list_items(query)
    }

    fn require_mutable(&self, id: ItemId, today: NaiveDate) -> Result<FoodItem, InventoryError> {
        let existing = self
            .repo
            .get_item(id)?
            .ok_or(InventoryError::NotFound(id))?;
        if existing.expiry_date.is_some_and(|expiry| expiry < today) {
            return Err(InventoryError::ItemExpired(id));
        }
        Ok(existing)
    }
}
