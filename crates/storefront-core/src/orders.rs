//! Order item fulfilment status.
//!
//! There is no enforced transition graph: an admin may move an item from any
//! status to any other. The only behavior attached to a status is the arrival
//! notice sent when an item becomes `ARRIVED`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemStatus {
    Normal,
    Allocated,
    InTransit,
    Arrived,
    Shipped,
    Received,
    DeliveryFailed,
    OutOfStock,
    PartialOos,
}

impl OrderItemStatus {
    pub const ALL: [OrderItemStatus; 9] = [
        OrderItemStatus::Normal,
        OrderItemStatus::Allocated,
        OrderItemStatus::InTransit,
        OrderItemStatus::Arrived,
        OrderItemStatus::Shipped,
        OrderItemStatus::Received,
        OrderItemStatus::DeliveryFailed,
        OrderItemStatus::OutOfStock,
        OrderItemStatus::PartialOos,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderItemStatus::Normal => "NORMAL",
            OrderItemStatus::Allocated => "ALLOCATED",
            OrderItemStatus::InTransit => "IN_TRANSIT",
            OrderItemStatus::Arrived => "ARRIVED",
            OrderItemStatus::Shipped => "SHIPPED",
            OrderItemStatus::Received => "RECEIVED",
            OrderItemStatus::DeliveryFailed => "DELIVERY_FAILED",
            OrderItemStatus::OutOfStock => "OUT_OF_STOCK",
            OrderItemStatus::PartialOos => "PARTIAL_OOS",
        }
    }

    /// Whether moving an item from `previous` to `self` should notify the buyer.
    #[must_use]
    pub fn sends_arrival_notice(self, previous: Option<OrderItemStatus>) -> bool {
        self == OrderItemStatus::Arrived && previous != Some(OrderItemStatus::Arrived)
    }
}

impl std::fmt::Display for OrderItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderItemStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseEnumError::new("order item status", s))
    }
}
