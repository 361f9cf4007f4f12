pub mod app_config;
pub mod catalog;
pub mod config;
pub mod members;
pub mod orders;
pub mod template;
pub mod wallet;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{slug_from_name, visible_by_l1, CategoryMembership, ProductStatus};
pub use config::{load_app_config, load_app_config_from_env};
pub use members::{
    check_upgrade_decision, check_upgrade_request, visible_price, Role, Tier, TransitionError,
    UpgradeStatus,
};
pub use orders::OrderItemStatus;
pub use template::{load_templates, render, TemplateConfig, TemplatesFile};
pub use wallet::TopupStatus;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read templates file {path}: {source}")]
    TemplatesFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse templates file: {0}")]
    TemplatesFileParse(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
