//! Food item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `food_items` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate the item and require an expiry date.
//! - Read paths reject structurally invalid rows, but surface an unparseable
//!   stored expiry as `expiry_date: None` so the row still lists.

use crate::db::migrations::current_user_version;
use crate::db::migrations::latest_version;
use crate::db::{table_exists, DbError};
use crate::model::item::{
    parse_expiry_date, FoodItem, ItemId, ItemValidationError, EXPIRY_DATE_FORMAT,
};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    name,
    quantity,
    expiry_date
FROM food_items";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for item persistence and queries.
#[derive(Debug)]
pub enum RepoError {
    Validation(ItemValidationError),
    Db(DbError),
    NotFound(ItemId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "item not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted item data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemValidationError> for RepoError {
    fn from(value: ItemValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result ordering for item lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemOrder {
    /// Soonest expiry first.
    #[default]
    ExpiryAsc,
    /// Largest quantity first, ties by soonest expiry.
    QuantityDesc,
    /// Most recently changed first.
    UpdatedDesc,
}

/// Query options for listing items.
#[derive(Debug, Clone, Default)]
pub struct ItemListQuery {
    /// Case-insensitive name substring filter. Blank means no filter.
    pub name_contains: Option<String>,
    pub order: ItemOrder,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for item CRUD operations.
pub trait ItemRepository {
    fn create_item(&self, item: &FoodItem) -> RepoResult<ItemId>;
    fn update_item(&self, item: &FoodItem) -> RepoResult<()>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<FoodItem>>;
    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<FoodItem>>;
    /// Removes the row; items are not tombstoned.
    fn delete_item(&self, id: ItemId) -> RepoResult<()>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `InvalidData` when the `food_items` table is missing.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version = current_user_version(conn)?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        if !table_exists(conn, "food_items")? {
            return Err(RepoError::InvalidData(
                "required table `food_items` is missing".to_string(),
            ));
        }
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &FoodItem) -> RepoResult<ItemId> {
        let expiry = writable_expiry(item)?;

        self.conn.execute(
            "INSERT INTO food_items (uuid, name, quantity, expiry_date)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                item.id.to_string(),
                item.name.as_str(),
                i64::from(item.quantity),
                expiry,
            ],
        )?;

        Ok(item.id)
    }

    fn update_item(&self, item: &FoodItem) -> RepoResult<()> {
        let expiry = writable_expiry(item)?;

        let changed = self.conn.execute(
            "UPDATE food_items
             SET
                name = ?1,
                quantity = ?2,
                expiry_date = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?4;",
            params![
                item.name.as_str(),
                i64::from(item.quantity),
                expiry,
                item.id.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(item.id));
        }
        Ok(())
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<FoodItem>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<FoodItem>> {
        let mut sql = format!("{ITEM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(needle) = query
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
        {
            sql.push_str(" AND name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!("%{}%", escape_like(needle))));
        }

        sql.push_str(match query.order {
            ItemOrder::ExpiryAsc => " ORDER BY expiry_date ASC, created_at ASC, uuid ASC",
            ItemOrder::QuantityDesc => " ORDER BY quantity DESC, expiry_date ASC, uuid ASC",
            ItemOrder::UpdatedDesc => " ORDER BY updated_at DESC, uuid ASC",
        });

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn delete_item(&self, id: ItemId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM food_items WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

fn writable_expiry(item: &FoodItem) -> RepoResult<String> {
    item.validate()?;
    let expiry = item
        .expiry_date
        .ok_or(ItemValidationError::MissingExpiryDate)?;
    Ok(expiry.format(EXPIRY_DATE_FORMAT).to_string())
}

fn parse_item_row(row: &Row<'_>) -> RepoResult<FoodItem> {
    let uuid_text: String = row.get("uuid")?;
    let id = Uuid::parse_str(&uuid_text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{uuid_text}` in food_items.uuid"))
    })?;

    let raw_quantity: i64 = row.get("quantity")?;
    let quantity = u32::try_from(raw_quantity)
        .ok()
        .filter(|value| *value >= 1)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid quantity `{raw_quantity}` in food_items.quantity"
            ))
        })?;

    let expiry_text: String = row.get("expiry_date")?;
    let expiry_date = parse_expiry_date(&expiry_text);
    if expiry_date.is_none() {
        warn!(
            "event=item_read module=repo status=invalid_item_data item_id={id} error_code=unparseable_expiry"
        );
    }

    let item = FoodItem::with_id(id, row.get::<_, String>("name")?, quantity, expiry_date);
    item.validate()?;
    Ok(item)
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
