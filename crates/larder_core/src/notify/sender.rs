//! Notification dispatch for items expiring today.
//!
//! # Responsibility
//! - Define the sender contract used by the tracker.
//! - Provide a log-only sender and an HTTP sender for the email backend.
//!
//! # Invariants
//! - Senders never touch marker state; a failed send is reported, not retried.

use crate::model::item::{FoodItem, EXPIRY_DATE_FORMAT};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Default HTTP timeout for notification requests.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(15);

const MAX_ERROR_BODY_CHARS: usize = 200;

/// Dispatch failure.
#[derive(Debug)]
pub enum NotifyError {
    EmptyRecipient,
    /// Request never produced an HTTP response.
    Transport(String),
    /// Endpoint answered with a non-success status.
    Rejected {
        status: u16,
        body: String,
    },
    Encode(serde_json::Error),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRecipient => write!(f, "notification recipient is empty"),
            Self::Transport(message) => write!(f, "notification transport failed: {message}"),
            Self::Rejected { status, body } => {
                write!(f, "notification rejected with status {status}: {body}")
            }
            Self::Encode(err) => write!(f, "cannot encode notification payload: {err}"),
        }
    }
}

impl Error for NotifyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) => Some(err),
            _ => None,
        }
    }
}

/// Dispatches one notification covering a batch of items.
pub trait NotificationSender {
    fn send(&self, recipient: &str, items: &[FoodItem]) -> Result<(), NotifyError>;
}

impl<T: NotificationSender + ?Sized> NotificationSender for Box<T> {
    fn send(&self, recipient: &str, items: &[FoodItem]) -> Result<(), NotifyError> {
        (**self).send(recipient, items)
    }
}

/// Wire payload for the expiry reminder endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryReminder {
    pub email: String,
    pub items: Vec<ExpiryReminderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryReminderItem {
    pub name: String,
    pub quantity: u32,
    #[serde(rename = "expiryDate")]
    pub expiry_date: Option<String>,
}

impl ExpiryReminder {
    pub fn new(recipient: &str, items: &[FoodItem]) -> Self {
        Self {
            email: recipient.to_string(),
            items: items
                .iter()
                .map(|item| ExpiryReminderItem {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    expiry_date: item
                        .expiry_date
                        .map(|date| date.format(EXPIRY_DATE_FORMAT).to_string()),
                })
                .collect(),
        }
    }
}

/// Sender that only records the dispatch in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

impl NotificationSender for LogNotificationSender {
    fn send(&self, recipient: &str, items: &[FoodItem]) -> Result<(), NotifyError> {
        if recipient.trim().is_empty() {
            return Err(NotifyError::EmptyRecipient);
        }
        info!(
            "event=notify_send module=notify status=ok transport=log item_count={}",
            items.len()
        );
        Ok(())
    }
}

/// Sender posting [`ExpiryReminder`] JSON to an HTTP endpoint.
pub struct HttpNotificationSender {
    agent: ureq::Agent,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpNotificationSender {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(DEFAULT_NOTIFY_TIMEOUT)
                .build(),
            endpoint: endpoint.into(),
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
}

impl NotificationSender for HttpNotificationSender {
    fn send(&self, recipient: &str, items: &[FoodItem]) -> Result<(), NotifyError> {
        if recipient.trim().is_empty() {
            return Err(NotifyError::EmptyRecipient);
        }
        let body = serde_json::to_string(&ExpiryReminder::new(recipient, items))
            .map_err(NotifyError::Encode)?;

        let mut request = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json");
        if let Some(token) = self.bearer_token.as_deref() {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        match request.send_string(&body) {
            Ok(response) => {
                info!(
                    "event=notify_send module=notify status=ok transport=http http_status={} item_count={}",
                    response.status(),
                    items.len()
                );
                Ok(())
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response
                    .into_string()
                    .unwrap_or_default()
                    .chars()
                    .take(MAX_ERROR_BODY_CHARS)
                    .collect::<String>();
                warn!(
                    "event=notify_send module=notify status=error transport=http http_status={status}"
                );
                Err(NotifyError::Rejected { status, body })
            }
            Err(ureq::Error::Transport(err)) => {
                warn!(
                    "event=notify_send module=notify status=error transport=http error_code=transport"
                );
                Err(NotifyError::Transport(err.to_string()))
            }
        }
    }
}
