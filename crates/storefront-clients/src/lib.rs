//! HTTP clients for the hosted services the storefront depends on: the auth
//! provider that verifies bearer tokens, and the transactional email API.

pub mod auth;
pub mod error;
pub mod mail;

pub use auth::{AuthClient, AuthUser};
pub use error::ClientError;
pub use mail::MailClient;
