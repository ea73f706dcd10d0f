//! Stakeholder directory queries
//!
//! Stakeholders receive a notification whenever a recording effect succeeds.
//! The directory is provisioned directly in the database and is read-only to
//! the service.

use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// One entry of the stakeholder directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Stakeholder {
    pub id: i64,
    pub name: Option<String>,
    pub phone_number: String,
}

/// Fetch the full stakeholder directory
pub async fn list_stakeholders(pool: &SqlitePool) -> Result<Vec<Stakeholder>> {
    let stakeholders = sqlx::query_as::<_, Stakeholder>(
        "SELECT id, name, phone_number FROM stakeholders ORDER BY id ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(stakeholders)
}
