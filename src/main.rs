//! # pickup-point
//!
//! Command-line front end for the pickup point. Each subcommand runs one
//! orchestrator operation and prints the result as JSON:
//!
//! ```bash
//! pickup-point accept --id 10 --recipient 1 --storage-until 31.12.2026 --package box --weight 5 --cost 100
//! pickup-point issue --ids 10,11
//! pickup-point list --recipient 1 --limit 5
//! pickup-point cleanup
//! pickup-point demo
//! ```
//!
//! Every successful command is also reported as an audit event, to the log or
//! to stdout depending on the `output` config key.
//!
//! With `database.url` (or `DATABASE_URL`) set and the `postgres` feature enabled,
//! commands run against PostgreSQL; otherwise against a fresh in-memory store,
//! which is only useful for `demo`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Duration;
use clap::{Parser, Subcommand};
use pickup_point::clock::{Clock, ManualClock, SystemClock};
use pickup_point::command::{self, OrderCommand};
use pickup_point::config::AppConfig;
use pickup_point::lifecycle::{setup_tracing, PickupSystem};
use pickup_point::model::{AcceptOrder, OrderId, RecipientId, ReturnRequest};
use pickup_point::store::{MemoryStore, OrderStore};
use serde::Serialize;
use tracing::{error, info, warn, Instrument};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(name = "pickup-point", version, about = "Parcel pickup point order management")]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Order(OrderCommand),
    /// Run a scripted scenario against an in-memory store.
    Demo,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), BoxError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = AppConfig::load(cli.config.as_deref())?;
    info!(name = %config.name, "Configuration loaded");

    let command = match cli.command {
        Command::Demo => return demo(&config).await,
        Command::Order(command) => command,
    };

    #[cfg(feature = "postgres")]
    if let Some(url) = &config.database.url {
        let store = pickup_point::store::PgStore::connect(url, config.database.max_connections).await?;
        store.migrate().await?;
        return execute(command, &config, Arc::new(store)).await;
    }

    #[cfg(not(feature = "postgres"))]
    if config.database.url.is_some() {
        warn!("database.url is set but this build has no postgres support; using an in-memory store");
    }

    execute(command, &config, Arc::new(MemoryStore::new())).await
}

async fn execute<S>(command: OrderCommand, config: &AppConfig, store: Arc<S>) -> Result<(), BoxError>
where
    S: OrderStore + 'static,
{
    let system = PickupSystem::new(config.cache_config(), store)?;
    let events = config.output.sink();
    let result = command::execute(&system.orders, &*events, &SystemClock, command).await;
    system.shutdown().await?;
    print_json(&result?)
}

/// Walks one parcel through every state on a manual clock.
async fn demo(config: &AppConfig) -> Result<(), BoxError> {
    let clock = Arc::new(ManualClock::default());
    let system = PickupSystem::with_clock(config.cache_config(), Arc::new(MemoryStore::new()), clock.clone())?;
    let orders = &system.orders;
    let start = clock.now();

    async {
        for (id, storage_hours) in [(10, 1), (11, 72), (12, 96)] {
            orders
                .accept_order_courier(AcceptOrder {
                    order_id: OrderId(id),
                    recipient_id: RecipientId(1),
                    storage_until: start + Duration::hours(storage_hours),
                    package_type: "box".into(),
                    weight: 5.0,
                    cost: 100.0,
                })
                .await?;
        }
        Ok::<_, BoxError>(())
    }
    .instrument(tracing::info_span!("courier_drop_off"))
    .await?;

    if let Err(e) = orders.return_order_courier(OrderId(10)).await {
        info!(error = %e, kind = ?e.kind(), "Early return to courier refused as expected");
    }

    clock.advance(Duration::hours(2));
    orders.return_order_courier(OrderId(10)).await?;

    async {
        orders.issue_order_client(&[OrderId(11), OrderId(12)]).await?;
        clock.advance(Duration::hours(47));
        orders
            .accept_return_client(ReturnRequest {
                order_id: OrderId(11),
                recipient_id: RecipientId(1),
            })
            .await?;
        Ok::<_, BoxError>(())
    }
    .instrument(tracing::info_span!("client_visit"))
    .await?;

    print_json(&orders.list_return_orders(1, 10).await?)?;

    clock.advance(Duration::days(3));
    let deleted = orders.delete_issued_orders().await?;
    info!(deleted, "Retention sweep done");

    match orders.list_orders(RecipientId(1), None).await {
        Ok(waiting) => print_json(&waiting)?,
        Err(e) => info!(error = %e, "Nothing left waiting"),
    }

    system.shutdown().await?;
    Ok(())
}
