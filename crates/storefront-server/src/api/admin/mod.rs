//! Admin-only handlers. Every handler takes the [`Admin`](super::extract::Admin)
//! extractor, so a caller without the admin role never reaches the database.

pub(super) mod blog;
pub(super) mod catalog;
pub(super) mod content;
pub(super) mod members;

use serde::Serialize;

/// Body returned by delete endpoints.
#[derive(Debug, Serialize)]
pub(super) struct Deleted {
    pub id: i64,
    pub deleted: bool,
}
