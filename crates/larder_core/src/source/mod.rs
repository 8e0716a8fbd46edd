//! Item sources feeding the tracker.
//!
//! # Responsibility
//! - Define the fetch contract the tracker refreshes from.
//! - Adapt local SQLite storage and the remote HTTP API to that contract.
//!
//! # Invariants
//! - A failed fetch returns an error and no partial list.
//! - Items with an unparseable expiry are still returned, with `expiry_date: None`.

use crate::model::item::FoodItem;
use crate::repo::item_repo::{ItemListQuery, ItemRepository, RepoError, SqliteItemRepository};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod remote;

/// Item fetch failure. Always transient from the tracker's point of view.
#[derive(Debug)]
pub enum SourceError {
    Repo(RepoError),
    Transport(String),
    Status { status: u16 },
    Decode(String),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Transport(message) => write!(f, "item source unreachable: {message}"),
            Self::Status { status } => write!(f, "item source answered with status {status}"),
            Self::Decode(message) => write!(f, "cannot decode item list: {message}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for SourceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Supplies the current item list.
pub trait ItemSource {
    fn fetch_items(&self) -> Result<Vec<FoodItem>, SourceError>;
}

impl<T: ItemSource + ?Sized> ItemSource for Box<T> {
    fn fetch_items(&self) -> Result<Vec<FoodItem>, SourceError> {
        (**self).fetch_items()
    }
}

impl ItemSource for SqliteItemRepository<'_> {
    fn fetch_items(&self) -> Result<Vec<FoodItem>, SourceError> {
        Ok(self.list_items(&ItemListQuery::default())?)
    }
}

/// Local item source owning its connection.
///
/// Unlike a borrowed [`SqliteItemRepository`], it can move into a blocking
/// worker thread together with the tracker.
pub struct LocalItemSource {
    conn: Connection,
}

impl LocalItemSource {
    /// Wraps a migrated connection.
    pub fn try_new(conn: Connection) -> Result<Self, RepoError> {
        SqliteItemRepository::try_new(&conn)?;
        Ok(Self { conn })
    }
}

impl ItemSource for LocalItemSource {
    fn fetch_items(&self) -> Result<Vec<FoodItem>, SourceError> {
        SqliteItemRepository::try_new(&self.conn)?.fetch_items()
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemSource, LocalItemSource};
    use crate::db::open_db_in_memory;
    use crate::model::item::FoodItem;
    use crate::repo::item_repo::{ItemRepository, SqliteItemRepository};
    use chrono::NaiveDate;

    #[test]
    fn local_source_lists_stored_items() {
        let conn = open_db_in_memory().unwrap();
        let milk = FoodItem::new("Milk", 1, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        SqliteItemRepository::try_new(&conn)
            .unwrap()
            .create_item(&milk)
            .unwrap();

        let source = LocalItemSource::try_new(conn).unwrap();
        assert_eq!(source.fetch_items().unwrap(), vec![milk]);
    }
}
