//! `larder` command-line front end.
//!
//! # Responsibility
//! - Drive item CRUD, dashboard listing and reminder checks from a shell.
//! - Host the long-running watch loop with its midnight marker reset.

use clap::{Parser, Subcommand};
use larder_core::db::open_db;
use larder_core::{
    build_view, date_key, init_logging_from_config, local_today, run_refresh_loop,
    DayBoundaryScheduler, DispatchStatus, ExpiryTracker, HttpNotificationSender,
    InventoryService, ItemDraft, ItemSource, LarderConfig, LifecycleTag, LocalItemSource,
    LogNotificationSender, NotificationSender, PersistentFlagStore, RefreshReport,
    RemoteItemSource, SortOrder, SqliteItemRepository, SqliteSlotStore, ViewQuery,
};
use log::info;
use rusqlite::Connection;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Larder: food inventory with once-a-day expiry reminders.
#[derive(Parser)]
#[command(name = "larder", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file if none exists.
    InitConfig,

    /// Add an item.
    Add {
        name: String,
        /// Expiry date, `YYYY-MM-DD`.
        #[arg(short, long)]
        expires: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },

    /// Replace an item's fields. Expired items cannot be edited.
    Edit {
        id: Uuid,
        name: String,
        #[arg(short, long)]
        expires: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },

    /// Delete an item. Expired items cannot be deleted.
    Delete { id: Uuid },

    /// Show the dashboard.
    List {
        /// Case-insensitive name filter.
        #[arg(short, long, default_value = "")]
        search: String,
        /// stored | expiry | quantity
        #[arg(long, default_value = "stored")]
        sort: SortOrder,
        /// Include items that expired long ago.
        #[arg(long)]
        all: bool,
    },

    /// Run one reminder cycle.
    Check,

    /// Refresh periodically and reset reminders at local midnight until Ctrl+C.
    Watch,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(LarderConfig::default_path);
    let config = LarderConfig::load_or_default(&config_path)?;

    if let Err(err) = init_logging_from_config(&config.logging, &config.resolved_log_dir()) {
        eprintln!("warning: file logging disabled: {err}");
    }

    match cli.command {
        Command::InitConfig => init_config(&config_path),
        Command::Add {
            name,
            expires,
            quantity,
        } => {
            let conn = open_database(&config)?;
            let service = InventoryService::new(SqliteItemRepository::try_new(&conn)?);
            let item = service.add_item(&ItemDraft::new(name, expires, quantity))?;
            println!("{}", item.id);
            Ok(())
        }
        Command::Edit {
            id,
            name,
            expires,
            quantity,
        } => {
            let conn = open_database(&config)?;
            let service = InventoryService::new(SqliteItemRepository::try_new(&conn)?);
            service.update_item(id, &ItemDraft::new(name, expires, quantity), local_today())?;
            Ok(())
        }
        Command::Delete { id } => {
            let conn = open_database(&config)?;
            let service = InventoryService::new(SqliteItemRepository::try_new(&conn)?);
            service.delete_item(id, local_today())?;
            Ok(())
        }
        Command::List { search, sort, all } => {
            let query = ViewQuery {
                search,
                sort,
                include_stale: all,
            };
            list_items(&config, &query)
        }
        Command::Check => {
            let mut tracker = build_tracker(&config)?;
            print_report(&tracker.refresh(local_today()));
            Ok(())
        }
        Command::Watch => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(watch(&config))
        }
    }
}

fn open_database(config: &LarderConfig) -> anyhow::Result<Connection> {
    let path = config.resolved_database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(open_db(path)?)
}

fn init_config(path: &std::path::Path) -> anyhow::Result<()> {
    if path.exists() {
        println!("config already exists at {}", path.display());
        return Ok(());
    }
    LarderConfig::default().save_to_file(path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn list_items(config: &LarderConfig, query: &ViewQuery) -> anyhow::Result<()> {
    let items = item_source(config)?.fetch_items()?;

    for row in build_view(&items, query, local_today(), &config.expiry) {
        let expiry = row
            .item
            .expiry_date
            .map_or_else(|| "invalid".to_string(), date_key);
        let tag = row.tag.map_or("invalid_date", LifecycleTag::as_str);
        let lock = if row.editable { "" } else { " (read-only)" };
        println!(
            "{}  {:<24} x{:<4} {expiry}  {tag}{lock}",
            row.item.id, row.item.name, row.item.quantity
        );
    }
    Ok(())
}

async fn watch(config: &LarderConfig) -> anyhow::Result<()> {
    let tracker = build_tracker(config)?;

    let cancel = CancellationToken::new();
    let day_boundary = DayBoundaryScheduler::new(tracker.flag_store()).arm(cancel.clone());
    let refresh_loop = run_refresh_loop(
        tracker,
        config.watch.refresh_interval(),
        cancel.clone(),
        local_today,
        print_report,
    );
    tokio::pin!(refresh_loop);

    println!("watching; press Ctrl+C to stop");
    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => true,
        _ = &mut refresh_loop => false,
    };
    if interrupted {
        info!("event=watch_stop module=cli status=ok reason=ctrl_c");
        cancel.cancel();
        refresh_loop.await;
    }

    day_boundary.shutdown().await;
    Ok(())
}

type CliTracker =
    ExpiryTracker<Box<dyn ItemSource + Send>, Box<dyn NotificationSender + Send>>;

fn build_tracker(config: &LarderConfig) -> anyhow::Result<CliTracker> {
    let slots = SqliteSlotStore::try_new(open_database(config)?)?;
    let flags = PersistentFlagStore::new(slots)
        .with_slot_name(config.notify.marker_slot.as_str())
        .into_shared();

    let mut tracker = ExpiryTracker::new(item_source(config)?, notification_sender(config), flags)
        .with_policy(config.expiry);
    if let Some(recipient) = config.notify.recipient.as_deref() {
        tracker = tracker.with_recipient(recipient);
    }
    Ok(tracker)
}

fn item_source(config: &LarderConfig) -> anyhow::Result<Box<dyn ItemSource + Send>> {
    let Some(api_base) = config.source.api_base.as_deref() else {
        return Ok(Box::new(LocalItemSource::try_new(open_database(config)?)?));
    };
    let mut source = RemoteItemSource::new(api_base).with_timeout(config.source.timeout());
    if let Some(token) = config.source.bearer_token.as_deref() {
        source = source.with_bearer_token(token);
    }
    Ok(Box::new(source))
}

fn notification_sender(config: &LarderConfig) -> Box<dyn NotificationSender + Send> {
    let Some(endpoint) = config.notify.endpoint.as_deref() else {
        return Box::new(LogNotificationSender);
    };
    let mut sender = HttpNotificationSender::new(endpoint).with_timeout(config.notify.timeout());
    if let Some(token) = config.notify.bearer_token.as_deref() {
        sender = sender.with_bearer_token(token);
    }
    Box::new(sender)
}

fn print_report(report: &RefreshReport) {
    if !report.fetched {
        println!("item source unavailable; kept {} items", report.item_count);
        return;
    }
    if report.invalid_items > 0 {
        println!("{} item(s) have an invalid expiry date", report.invalid_items);
    }
    for item in &report.due_items {
        println!("expires today: {} x{}", item.name, item.quantity);
    }
    match &report.dispatch {
        DispatchStatus::NothingDue => println!("nothing new expires today"),
        DispatchStatus::NoRecipient => println!("no recipient configured; reminder not sent"),
        DispatchStatus::Sent => println!("reminder sent"),
        DispatchStatus::Failed(err) => println!("reminder failed: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::error::ErrorKind;
    use clap::Parser;

    #[test]
    fn version_flag_replaces_linkage_subcommand() {
        let err = Cli::try_parse_from(["larder", "--version"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);

        let err = Cli::try_parse_from(["larder", "ping"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn watch_and_check_parse_without_arguments() {
        assert!(Cli::try_parse_from(["larder", "watch"]).is_ok());
        assert!(Cli::try_parse_from(["larder", "--config", "/tmp/larder.toml", "check"]).is_ok());
    }
}
