//! waypoint - command line access to the booking backend's cached stores.
//!
//! Every command goes through the same `ResourceStore` the site and admin
//! console use, so listing, mutating and watching exercise the cache, fetch
//! dedup and mutation reconciliation end to end.

mod format;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use waypoint_core::config::{API_TOKEN_ENV, Config};
use waypoint_core::{ApiClient, ApiEvent, ResourceStore, StoreFailure, Stores};

use format::{format_dashboard, format_list, Summary};

/// Environment variable naming a directory for daily log files
const LOG_DIR_ENV: &str = "WAYPOINT_LOG_DIR";

/// Default polling interval for `watch`, in seconds
const DEFAULT_WATCH_INTERVAL_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(about = "Browse and edit travel-booking resources through the cached stores")]
#[command(version)]
struct Args {
    /// Path to config file (default: $XDG_CONFIG_HOME/waypoint/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a collection
    List {
        resource: ResourceKind,
        /// Bypass a fresh cache
        #[arg(long)]
        refresh: bool,
    },
    /// Show one item as JSON
    Show { resource: ResourceKind, id: String },
    /// Create an item from a JSON body
    Create { resource: ResourceKind, json: String },
    /// Update an item from a JSON patch
    Update {
        resource: ResourceKind,
        id: String,
        json: String,
    },
    /// Delete an item
    Delete { resource: ResourceKind, id: String },
    /// Poll a collection and print every new snapshot
    Watch {
        resource: ResourceKind,
        /// Seconds between polls
        #[arg(long, default_value_t = DEFAULT_WATCH_INTERVAL_SECS)]
        interval: u64,
        /// Stop after this many snapshots
        #[arg(long)]
        count: Option<u64>,
    },
    /// Show the admin dashboard figures
    Dashboard,
}

impl Command {
    fn resource(&self) -> Option<ResourceKind> {
        match self {
            Command::List { resource, .. }
            | Command::Show { resource, .. }
            | Command::Create { resource, .. }
            | Command::Update { resource, .. }
            | Command::Delete { resource, .. }
            | Command::Watch { resource, .. } => Some(*resource),
            Command::Dashboard => None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ResourceKind {
    Tours,
    Transfers,
    TourCategories,
    TransferCategories,
    Blogs,
    Users,
    Bookings,
    Consultations,
    Settings,
}

/// Initialize the tracing subscriber for logging
///
/// Logs are filtered by RUST_LOG (default "warn") and go to stderr, or to a
/// daily rolling file when WAYPOINT_LOG_DIR is set. The returned guard must
/// be held until exit so buffered lines are flushed.
fn init_tracing() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "waypoint.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    let _log_guard = init_tracing();
    info!("waypoint starting");

    let config = Config::load(args.config.as_deref())?;
    let (client, stores) = build_stores(&config)?;

    let Some(resource) = args.command.resource() else {
        let stats = client.dashboard_stats().await?;
        print!("{}", format_dashboard(&stats));
        return Ok(());
    };

    match resource {
        ResourceKind::Tours => run(&stores.tours, &args.command).await,
        ResourceKind::Transfers => run(&stores.transfers, &args.command).await,
        ResourceKind::TourCategories => run(&stores.tour_categories, &args.command).await,
        ResourceKind::TransferCategories => {
            run(&stores.transfer_categories, &args.command).await
        }
        ResourceKind::Blogs => run(&stores.blog_posts, &args.command).await,
        ResourceKind::Users => run(&stores.users, &args.command).await,
        ResourceKind::Bookings => run(&stores.bookings, &args.command).await,
        ResourceKind::Consultations => run(&stores.consultations, &args.command).await,
        ResourceKind::Settings => run(&stores.settings, &args.command).await,
    }
}

/// Build the client and every store. A rejected token resets all stores so
/// nothing cached under the old credentials is shown again.
fn build_stores(config: &Config) -> Result<(Arc<ApiClient>, Stores<ApiClient>)> {
    let mut client = ApiClient::new(config.api_base_url.as_str(), config.request_timeout())
        .context("Failed to build HTTP client")?;
    match std::env::var(API_TOKEN_ENV) {
        Ok(token) if !token.is_empty() => client.set_token(token),
        _ => debug!("No API token set, sending anonymous requests"),
    }

    let events = client.events();
    let client = Arc::new(client);
    let stores = Stores::new(Arc::clone(&client), &config.cache);
    tokio::spawn(handle_api_events(events, stores.clone()));
    Ok((client, stores))
}

async fn handle_api_events(mut events: broadcast::Receiver<ApiEvent>, stores: Stores<ApiClient>) {
    loop {
        match events.recv().await {
            Ok(ApiEvent::Unauthorized) => {
                warn!("API token rejected, clearing cached data");
                eprintln!("The API rejected the token; set {} and retry.", API_TOKEN_ENV);
                stores.reset_all();
            }
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "API events lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn report_failures(mut failures: broadcast::Receiver<StoreFailure>) {
    loop {
        match failures.recv().await {
            Ok(failure) => eprintln!("error: {}", failure),
            Err(RecvError::Lagged(skipped)) => {
                eprintln!("error: {} further failures not shown", skipped)
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn parse_body<B: DeserializeOwned>(json: &str, what: &str) -> Result<B> {
    serde_json::from_str(json).with_context(|| format!("Invalid {} JSON", what))
}

fn print_json<R: serde::Serialize>(item: &R) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(item)?);
    Ok(())
}

async fn run<R>(store: &ResourceStore<R, ApiClient>, command: &Command) -> Result<()>
where
    R: Summary,
    R::Create: DeserializeOwned,
    R::Patch: DeserializeOwned,
{
    match command {
        Command::List { refresh, .. } => {
            let items = store.fetch(*refresh).await?;
            print!("{}", format_list(&items, &store.age_display()));
        }
        Command::Show { id, .. } => {
            store.fetch(false).await?;
            let item = match store.get_by_id(id) {
                Some(item) => item,
                None => store.refresh_item(id).await?,
            };
            print_json(&item)?;
        }
        Command::Create { json, .. } => {
            let input: R::Create = parse_body(json, "create")?;
            let created = store.create(&input).await?;
            print_json(&created)?;
        }
        Command::Update { id, json, .. } => {
            let patch: R::Patch = parse_body(json, "update")?;
            let updated = store.update(id, &patch).await?;
            print_json(&updated)?;
        }
        Command::Delete { id, .. } => {
            store.delete(id).await?;
            println!("Deleted {} {}", R::NAME, id);
        }
        Command::Watch {
            interval, count, ..
        } => watch(store, Duration::from_secs((*interval).max(1)), *count).await,
        Command::Dashboard => {}
    }
    Ok(())
}

/// Poll `fetch(false)` on a timer and print each snapshot the store
/// publishes. Failures are reported by a background task and polling
/// continues.
async fn watch<R: Summary>(
    store: &ResourceStore<R, ApiClient>,
    interval: Duration,
    count: Option<u64>,
) {
    tokio::spawn(report_failures(store.failures()));

    let mut snapshots = store.subscribe();
    let mut ticker = tokio::time::interval(interval);
    let mut printed = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if store.fetch(false).await.is_err() {
                    debug!(resource = R::NAME, "Poll failed, retrying next tick");
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let items = snapshots.borrow_and_update().clone();
                print!("{}", format_list(&items, &store.age_display()));
                printed += 1;
                if count.is_some_and(|limit| printed >= limit) {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_watch_with_options() {
        let args = Args::try_parse_from([
            "waypoint",
            "watch",
            "tour-categories",
            "--interval",
            "5",
            "--count",
            "2",
        ])
        .unwrap();
        match args.command {
            Command::Watch {
                resource,
                interval,
                count,
            } => {
                assert_eq!(resource, ResourceKind::TourCategories);
                assert_eq!(interval, 5);
                assert_eq!(count, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_update_with_global_config() {
        let args = Args::try_parse_from([
            "waypoint",
            "update",
            "bookings",
            "b1",
            r#"{"status":"confirmed"}"#,
            "--config",
            "/tmp/waypoint.json",
        ])
        .unwrap();
        assert_eq!(args.command.resource(), Some(ResourceKind::Bookings));
        assert_eq!(args.config, Some(PathBuf::from("/tmp/waypoint.json")));
    }

    #[test]
    fn test_dashboard_has_no_resource() {
        let args = Args::try_parse_from(["waypoint", "dashboard"]).unwrap();
        assert_eq!(args.command.resource(), None);
    }

    #[test]
    fn test_parse_body_reports_invalid_json() {
        let err = parse_body::<serde_json::Value>("{", "create").unwrap_err();
        assert!(err.to_string().contains("Invalid create JSON"));
    }
}
