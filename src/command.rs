//! Order commands as the CLI exposes them, and their dispatch.
//!
//! [`execute`] runs one command against the orchestrator and returns its result
//! as JSON. Each command that succeeds is reported to the event sink; a
//! rejected command is not.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::audit::{AuditEvent, EventSink};
use crate::clock::Clock;
use crate::model::{AcceptOrder, OrderId, RecipientId, ReturnRequest};
use crate::service::{OrderError, OrderService};

#[derive(Debug, Clone, Subcommand, Serialize)]
#[serde(untagged)]
pub enum OrderCommand {
    /// Accept an order from a courier.
    Accept {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        recipient: i64,
        /// RFC 3339 timestamp or DD.MM.YYYY.
        #[arg(long, value_parser = parse_date)]
        storage_until: DateTime<Utc>,
        /// package, box, film or "without package".
        #[arg(long, default_value = "")]
        package: String,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        cost: f64,
    },
    /// Return an unclaimed order to the courier.
    Return {
        #[arg(long)]
        id: i64,
    },
    /// Issue orders to their recipient.
    Issue {
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<i64>,
    },
    /// Accept a return from a client.
    AcceptReturn {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        recipient: i64,
    },
    /// List a recipient's orders that are still waiting.
    List {
        #[arg(long)]
        recipient: i64,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List returned orders, one page at a time.
    ListReturns {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Delete returned orders older than the retention window.
    Cleanup,
}

impl OrderCommand {
    /// The name the command is audited under.
    pub fn method(&self) -> &'static str {
        match self {
            OrderCommand::Accept { .. } => "accept",
            OrderCommand::Return { .. } => "return",
            OrderCommand::Issue { .. } => "issue",
            OrderCommand::AcceptReturn { .. } => "accept-return",
            OrderCommand::List { .. } => "list",
            OrderCommand::ListReturns { .. } => "list-returns",
            OrderCommand::Cleanup => "cleanup",
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error("failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%d.%m.%Y")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("expected RFC 3339 or DD.MM.YYYY, got {raw:?}"))
}

/// Runs `command` and reports it to `events` once it has succeeded.
///
/// A sink failure is logged and does not fail the command: the change is
/// already committed by then.
pub async fn execute(
    orders: &OrderService,
    events: &dyn EventSink,
    clock: &dyn Clock,
    command: OrderCommand,
) -> Result<serde_json::Value, CommandError> {
    let method = command.method();
    let arguments = serde_json::to_value(&command)?;

    let output = dispatch(orders, command).await?;

    let event = AuditEvent::new(method, arguments, clock.now());
    if let Err(e) = events.send(&event) {
        warn!(event_id = %event.event_id, method, error = %e, "Audit event lost");
    }
    Ok(output)
}

async fn dispatch(orders: &OrderService, command: OrderCommand) -> Result<serde_json::Value, CommandError> {
    let output = match command {
        OrderCommand::Accept {
            id,
            recipient,
            storage_until,
            package,
            weight,
            cost,
        } => {
            let order = orders
                .accept_order_courier(AcceptOrder {
                    order_id: OrderId(id),
                    recipient_id: RecipientId(recipient),
                    storage_until,
                    package_type: package,
                    weight,
                    cost,
                })
                .await?;
            serde_json::to_value(order)?
        }
        OrderCommand::Return { id } => {
            orders.return_order_courier(OrderId(id)).await?;
            serde_json::json!({ "returned": id })
        }
        OrderCommand::Issue { ids } => {
            let ids: Vec<OrderId> = ids.into_iter().map(OrderId).collect();
            serde_json::to_value(orders.issue_order_client(&ids).await?)?
        }
        OrderCommand::AcceptReturn { id, recipient } => {
            let order = orders
                .accept_return_client(ReturnRequest {
                    order_id: OrderId(id),
                    recipient_id: RecipientId(recipient),
                })
                .await?;
            serde_json::to_value(order)?
        }
        OrderCommand::List { recipient, limit } => {
            serde_json::to_value(orders.list_orders(RecipientId(recipient), limit).await?)?
        }
        OrderCommand::ListReturns { page, limit } => {
            serde_json::to_value(orders.list_return_orders(page, limit).await?)?
        }
        OrderCommand::Cleanup => {
            let deleted = orders.delete_issued_orders().await?;
            serde_json::json!({ "deleted": deleted })
        }
    };
    Ok(output)
}
