//! HTTP item source for the hosted food API.

use super::{ItemSource, SourceError};
use crate::model::item::{parse_expiry_date, FoodItem};
use log::{info, warn};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

/// Default HTTP timeout for item fetches.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

const FOOD_PATH: &str = "/api/food";

/// One record as served by the food API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFoodRecord {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub expiry_date: Option<String>,
}

impl RemoteFoodRecord {
    /// Reads one `{ _id, name, quantity, expiryDate }` element.
    ///
    /// Returns `None` when `_id`, `name` or `quantity` is missing or of the
    /// wrong type. Numeric ids and integer strings for `quantity` are
    /// accepted. A non-string `expiryDate` reads as absent.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = match value.get("_id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return None,
        };
        let name = value.get("name")?.as_str()?.to_string();
        let quantity = match value.get("quantity")? {
            Value::Number(quantity) => quantity.as_i64()?,
            Value::String(quantity) => quantity.trim().parse().ok()?,
            _ => return None,
        };
        let expiry_date = value
            .get("expiryDate")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            id,
            name,
            quantity,
            expiry_date,
        })
    }

    /// Converts the record into an item.
    ///
    /// Returns `None` when the record cannot be listed at all (blank id, blank
    /// name or non-positive quantity). An unparseable expiry keeps the record with
    /// `expiry_date: None`.
    pub fn into_item(self) -> Option<FoodItem> {
        if self.id.trim().is_empty() {
            warn!("event=items_fetch module=source status=invalid_item_data error_code=missing_id");
            return None;
        }
        let id = stable_item_id(&self.id);
        let quantity = u32::try_from(self.quantity).ok().filter(|value| *value >= 1);
        let name = self.name.trim();
        let (Some(quantity), false) = (quantity, name.is_empty()) else {
            warn!(
                "event=items_fetch module=source status=invalid_item_data item_id={id} error_code=unlistable_record"
            );
            return None;
        };

        let expiry_date = self.expiry_date.as_deref().and_then(parse_expiry_date);
        if expiry_date.is_none() {
            warn!(
                "event=items_fetch module=source status=invalid_item_data item_id={id} error_code=unparseable_expiry"
            );
        }
        Some(FoodItem::with_id(id, name, quantity, expiry_date))
    }
}

/// Maps a remote record id onto a stable item id.
///
/// UUID ids are kept as-is; any other id (document-store object ids) maps to
/// a name-based UUID so it stays identical across refreshes.
pub fn stable_item_id(raw: &str) -> Uuid {
    let trimmed = raw.trim();
    Uuid::parse_str(trimmed).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, trimmed.as_bytes()))
}

/// Item source backed by `GET <api_base>/api/food`.
pub struct RemoteItemSource {
    agent: ureq::Agent,
    api_base: String,
    bearer_token: Option<String>,
}

impl RemoteItemSource {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(DEFAULT_FETCH_TIMEOUT)
                .build(),
            api_base: api_base.into(),
            bearer_token: None,
        }
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::AgentBuilder::new().timeout(timeout).build();
        self
    }

    fn items_url(&self) -> String {
        format!("{}{FOOD_PATH}", self.api_base.trim_end_matches('/'))
    }
}

impl ItemSource for RemoteItemSource {
    fn fetch_items(&self) -> Result<Vec<FoodItem>, SourceError> {
        let mut request = self.agent.get(&self.items_url());
        if let Some(token) = self.bearer_token.as_deref() {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        let response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, _)) => return Err(SourceError::Status { status }),
            Err(ureq::Error::Transport(err)) => {
                return Err(SourceError::Transport(err.to_string()))
            }
        };

        let body = response
            .into_string()
            .map_err(|err| SourceError::Decode(err.to_string()))?;
        let records: Vec<Value> =
            serde_json::from_str(&body).map_err(|err| SourceError::Decode(err.to_string()))?;

        let total = records.len();
        let items = records
            .iter()
            .filter_map(|value| {
                let record = RemoteFoodRecord::from_value(value);
                if record.is_none() {
                    warn!(
                        "event=items_fetch module=source status=invalid_item_data error_code=malformed_record"
                    );
                }
                record
            })
            .filter_map(RemoteFoodRecord::into_item)
            .collect::<Vec<_>>();
        info!(
            "event=items_fetch module=source status=ok transport=http records={total} items={}",
            items.len()
        );
        Ok(items)
    }
}
