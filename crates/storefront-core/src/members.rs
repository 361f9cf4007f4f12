//! Member tiers, roles and the wholesale upgrade workflow.
//!
//! The database stores these as text columns; the enums here are the single
//! place where their values and allowed transitions are defined.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Guest,
    Retail,
    Wholesale,
}

impl Tier {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Guest => "guest",
            Tier::Retail => "retail",
            Tier::Wholesale => "wholesale",
        }
    }

    /// Wholesale prices and wholesale-only products are shown to wholesale members only.
    #[must_use]
    pub fn sees_wholesale_catalog(self) -> bool {
        matches!(self, Tier::Wholesale)
    }

    #[must_use]
    pub fn can_order(self) -> bool {
        !matches!(self, Tier::Guest)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Tier::Guest),
            "retail" => Ok(Tier::Retail),
            "wholesale" => Ok(Tier::Wholesale),
            _ => Err(ParseEnumError::new("tier", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpgradeStatus {
    Pending,
    Approved,
    Rejected,
}

impl UpgradeStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UpgradeStatus::Pending => "PENDING",
            UpgradeStatus::Approved => "APPROVED",
            UpgradeStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for UpgradeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpgradeStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(UpgradeStatus::Pending),
            "APPROVED" => Ok(UpgradeStatus::Approved),
            "REJECTED" => Ok(UpgradeStatus::Rejected),
            _ => Err(ParseEnumError::new("upgrade status", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// Why a requested member state change is not allowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("only retail members can request a wholesale upgrade")]
    NotRetail,
    #[error("member is already wholesale")]
    AlreadyWholesale,
    #[error("an upgrade request is already pending")]
    AlreadyPending,
    #[error("no pending upgrade request")]
    NotPending,
}

impl TransitionError {
    /// `true` when the caller is not permitted at all, as opposed to the
    /// request conflicting with the current state.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, TransitionError::NotRetail)
    }
}

/// Checks whether a member may submit a wholesale upgrade request.
///
/// Allowed from `retail` with no request on file or a previously rejected one.
///
/// # Errors
///
/// Returns the [`TransitionError`] describing why the request is refused.
pub fn check_upgrade_request(
    tier: Tier,
    status: Option<UpgradeStatus>,
) -> Result<(), TransitionError> {
    match (tier, status) {
        (_, Some(UpgradeStatus::Pending)) => Err(TransitionError::AlreadyPending),
        (Tier::Wholesale, _) => Err(TransitionError::AlreadyWholesale),
        (Tier::Guest, _) => Err(TransitionError::NotRetail),
        // An APPROVED status on a retail profile means an admin demoted the
        // member afterwards; a fresh request is allowed.
        (Tier::Retail, None | Some(UpgradeStatus::Rejected | UpgradeStatus::Approved)) => Ok(()),
    }
}

/// Checks whether an admin may approve or reject the member's request.
///
/// # Errors
///
/// Returns [`TransitionError::NotPending`] unless the request is `PENDING`.
pub fn check_upgrade_decision(status: Option<UpgradeStatus>) -> Result<(), TransitionError> {
    match status {
        Some(UpgradeStatus::Pending) => Ok(()),
        _ => Err(TransitionError::NotPending),
    }
}

/// The unit price a caller of the given tier pays.
#[must_use]
pub fn visible_price(tier: Tier, retail: Decimal, wholesale: Option<Decimal>) -> Decimal {
    if tier.sees_wholesale_catalog() {
        wholesale.unwrap_or(retail)
    } else {
        retail
    }
}
