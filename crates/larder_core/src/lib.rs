//! Core logic for the Larder food-expiry tracker.
//! Owns item storage, expiry classification and the once-a-day reminder rules.

pub mod config;
pub mod db;
pub mod expiry;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod source;
pub mod store;
pub mod tracker;
pub mod view;

pub use config::{ConfigError, LarderConfig};
pub use expiry::classify::{
    classify, classify_date, classify_with_policy, date_key, local_today, ExpiryPolicy,
    LifecycleTag,
};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::item::{parse_expiry_date, FoodItem, ItemDraft, ItemId, ItemValidationError};
pub use notify::reconcile::{reconcile, reconcile_untrusted, Reconciliation};
pub use notify::sender::{
    HttpNotificationSender, LogNotificationSender, NotificationSender, NotifyError,
};
pub use repo::item_repo::{
    ItemListQuery, ItemOrder, ItemRepository, RepoError, RepoResult, SqliteItemRepository,
};
pub use schedule::day_boundary::{
    next_midnight, Clock, DayBoundaryHandle, DayBoundaryScheduler, SystemClock,
};
pub use service::inventory_service::{InventoryError, InventoryService};
pub use source::remote::RemoteItemSource;
pub use source::{ItemSource, LocalItemSource, SourceError};
pub use store::flag_store::{NotifiedMarkers, PersistentFlagStore, SharedFlagStore};
pub use store::slot::{KeyValueSlot, MemorySlotStore, SlotError, SqliteSlotStore};
pub use tracker::{run_refresh_loop, DispatchStatus, ExpiryTracker, RefreshReport};
pub use view::dashboard::{build_view, ItemRow, SortOrder, ViewQuery};
