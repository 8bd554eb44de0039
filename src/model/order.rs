//! Orders and the accrual results reported for them.
//!
//! An [`OrderRecord`] is created in status [`OrderStatus::New`] by the upload flow
//! and handed to the pipeline, which only ever changes its `status` and `accrual`
//! until the order reaches a terminal status.

use crate::model::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for orders.
///
/// The number is supplied by the user and is opaque to the pipeline. It must
/// pass the Luhn check (see [`crate::validation`]) before an order is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn new(number: impl Into<String>) -> Self {
        Self(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for OrderNumber {
    fn from(number: String) -> Self {
        Self(number)
    }
}

impl From<&str> for OrderNumber {
    fn from(number: &str) -> Self {
        Self(number.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of an order as persisted in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    /// `Invalid` and `Processed` need no further polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Invalid => "INVALID",
            OrderStatus::Processed => "PROCESSED",
        };
        f.write_str(s)
    }
}

/// Status vocabulary of the external accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccrualStatus {
    Registered,
    Invalid,
    Processing,
    Processed,
}

impl From<AccrualStatus> for OrderStatus {
    fn from(status: AccrualStatus) -> Self {
        match status {
            AccrualStatus::Registered => OrderStatus::New,
            AccrualStatus::Processing => OrderStatus::Processing,
            AccrualStatus::Invalid => OrderStatus::Invalid,
            AccrualStatus::Processed => OrderStatus::Processed,
        }
    }
}

/// A stored order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub number: OrderNumber,
    pub user_id: UserId,
    pub uploaded_at: DateTime<Utc>,
    pub status: OrderStatus,
    /// Meaningful only once `status` is [`OrderStatus::Processed`].
    pub accrual: f64,
}

impl OrderRecord {
    /// Creates a freshly uploaded order in status `NEW`.
    pub fn new(number: OrderNumber, user_id: UserId, uploaded_at: DateTime<Utc>) -> Self {
        Self {
            number,
            user_id,
            uploaded_at,
            status: OrderStatus::New,
            accrual: 0.0,
        }
    }
}

/// One poll result from the accrual service, already mapped onto [`OrderStatus`].
///
/// Not persisted directly; workers translate it into repository updates.
#[derive(Debug, Clone, PartialEq)]
pub struct AccrualResult {
    pub order: OrderNumber,
    pub status: OrderStatus,
    pub accrual: f64,
}

impl AccrualResult {
    pub fn new(order: impl Into<OrderNumber>, status: OrderStatus, accrual: f64) -> Self {
        Self {
            order: order.into(),
            status,
            accrual,
        }
    }

    /// A `PROCESSED` result that moves points onto the owner's balance.
    pub fn credits_balance(&self) -> bool {
        self.status == OrderStatus::Processed && self.accrual > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Invalid.is_terminal());
        assert!(OrderStatus::Processed.is_terminal());
    }

    #[test]
    fn accrual_status_maps_onto_order_status() {
        assert_eq!(OrderStatus::from(AccrualStatus::Registered), OrderStatus::New);
        assert_eq!(
            OrderStatus::from(AccrualStatus::Processing),
            OrderStatus::Processing
        );
        assert_eq!(OrderStatus::from(AccrualStatus::Invalid), OrderStatus::Invalid);
        assert_eq!(
            OrderStatus::from(AccrualStatus::Processed),
            OrderStatus::Processed
        );
    }

    #[test]
    fn status_uses_service_vocabulary_on_the_wire() {
        let status: AccrualStatus = serde_json::from_str("\"PROCESSED\"").unwrap();
        assert_eq!(status, AccrualStatus::Processed);
        assert_eq!(
            serde_json::to_string(&OrderStatus::Processing).unwrap(),
            "\"PROCESSING\""
        );
        assert_eq!(OrderStatus::Invalid.to_string(), "INVALID");
    }

    #[test]
    fn only_positive_processed_results_credit() {
        assert!(AccrualResult::new("79927398713", OrderStatus::Processed, 100.0).credits_balance());
        assert!(!AccrualResult::new("79927398713", OrderStatus::Processed, 0.0).credits_balance());
        assert!(!AccrualResult::new("79927398713", OrderStatus::Invalid, 5.0).credits_balance());
    }
}
