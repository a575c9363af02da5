//! Row model for the `users` registry table.

use serde::Serialize;
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub username: Option<String>,
    pub first_seen: i64,
    pub last_seen: i64,
}
