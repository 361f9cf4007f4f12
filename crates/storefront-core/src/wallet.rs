//! Wallet top-up request status.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TopupStatus {
    Pending,
    Approved,
    Rejected,
}

impl TopupStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TopupStatus::Pending => "PENDING",
            TopupStatus::Approved => "APPROVED",
            TopupStatus::Rejected => "REJECTED",
        }
    }
}

impl std::fmt::Display for TopupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopupStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TopupStatus::Pending),
            "APPROVED" => Ok(TopupStatus::Approved),
            "REJECTED" => Ok(TopupStatus::Rejected),
            _ => Err(ParseEnumError::new("top-up status", s)),
        }
    }
}
