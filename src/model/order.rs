//! Orders held at the pickup point.
//!
//! The store owns the durable copy. The cache and callers work on clones and
//! hand changes back through the orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

use crate::model::{validate_cost, PackageError, PackageType};

/// Type-safe identifier for Orders, assigned by the courier system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// Type-safe identifier for the client an order is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(pub i64);

impl From<i64> for RecipientId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Display for RecipientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "recipient_{}", self.0)
    }
}

/// Where an order is in its lifecycle, derived from its timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Stored,
    Issued,
    Returned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub recipient_id: RecipientId,
    pub weight: f64,
    pub cost: f64,
    pub package_cost: f64,
    pub package_type: PackageType,
    pub storage_until: DateTime<Utc>,
    pub issued_at: Option<DateTime<Utc>>,
    pub returned_at: Option<DateTime<Utc>>,
    pub hash: String,
}

/// Payload a courier submits when dropping off an order.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptOrder {
    pub order_id: OrderId,
    pub recipient_id: RecipientId,
    pub storage_until: DateTime<Utc>,
    /// Raw package name as entered, e.g. `"box"` or `"without package"`.
    pub package_type: String,
    pub weight: f64,
    pub cost: f64,
}

/// Payload a client submits when bringing an order back.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ReturnRequest {
    pub order_id: OrderId,
    pub recipient_id: RecipientId,
}

impl Order {
    /// Builds a freshly stored order from a courier's payload.
    ///
    /// Resolves the package type, checks the weight against it and the cost on
    /// its own, then stamps a new identity hash. The storage deadline is checked by the caller, which owns
    /// the clock.
    pub fn accept(params: AcceptOrder) -> Result<Self, PackageError> {
        let package_type: PackageType = params.package_type.parse()?;
        package_type.validate_weight(params.weight)?;
        validate_cost(params.cost)?;

        Ok(Self {
            id: params.order_id,
            recipient_id: params.recipient_id,
            weight: params.weight,
            cost: params.cost,
            package_cost: package_type.cost(),
            package_type,
            storage_until: params.storage_until,
            issued_at: None,
            returned_at: None,
            hash: Uuid::new_v4().to_string(),
        })
    }

    pub fn status(&self) -> OrderStatus {
        match (self.issued_at, self.returned_at) {
            (Some(_), _) => OrderStatus::Issued,
            (None, Some(_)) => OrderStatus::Returned,
            (None, None) => OrderStatus::Stored,
        }
    }

    pub fn is_issued(&self) -> bool {
        self.issued_at.is_some()
    }

    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    /// Order cost plus packaging surcharge.
    pub fn total_cost(&self) -> f64 {
        self.cost + self.package_cost
    }

    pub fn issue(&mut self, now: DateTime<Utc>) {
        self.returned_at = None;
        self.issued_at = Some(now);
    }

    pub fn accept_return(&mut self, now: DateTime<Utc>) {
        self.issued_at = None;
        self.returned_at = Some(now);
    }
}
