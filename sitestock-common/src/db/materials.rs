//! Material catalog queries and stock effects
//!
//! Stock quantities only change through `record_receipt` and `record_usage`.
//! Both are single UPDATE statements: the read-modify-write happens inside
//! SQLite, so concurrent recordings for the same material serialize there
//! instead of racing in the handlers.

use crate::Result;
use serde::Serialize;
use sqlx::SqlitePool;

/// One row of the material catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub quantity: i64,
}

/// Fetch all materials, ordered case-insensitively by name.
///
/// The ordering is stable so menu numbering and the stock context string are
/// reproducible for an unchanged catalog.
pub async fn list_materials(pool: &SqlitePool) -> Result<Vec<Material>> {
    let materials = sqlx::query_as::<_, Material>(
        "SELECT id, name, unit, quantity FROM materials ORDER BY name COLLATE NOCASE ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(materials)
}

/// Fetch a single material by id
pub async fn get_material(pool: &SqlitePool, id: i64) -> Result<Option<Material>> {
    let material = sqlx::query_as::<_, Material>(
        "SELECT id, name, unit, quantity FROM materials WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(material)
}

/// Apply a receipt: increment the stored quantity by `quantity`.
///
/// Returns false when the material id does not exist. `quantity` must be
/// positive; the session state machine validates this before calling.
pub async fn record_receipt(pool: &SqlitePool, id: i64, quantity: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE materials SET quantity = quantity + ? WHERE id = ?")
        .bind(quantity)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Apply a usage: decrement the stored quantity by `quantity`.
///
/// The `quantity >= ?` guard keeps the invariant "stock is never negative"
/// atomic even under concurrent usage recordings. Returns the remaining
/// quantity on success, or None when the material is missing or the decrement
/// would overdraw the stock (no mutation in either case).
pub async fn record_usage(pool: &SqlitePool, id: i64, quantity: i64) -> Result<Option<i64>> {
    let result = sqlx::query(
        "UPDATE materials SET quantity = quantity - ? WHERE id = ? AND quantity >= ?",
    )
    .bind(quantity)
    .bind(id)
    .bind(quantity)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    let remaining =
        sqlx::query_scalar::<_, i64>("SELECT quantity FROM materials WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await?;

    Ok(Some(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_pool() -> (SqlitePool, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init_database(&dir.path().join("test.db"))
            .await
            .unwrap();
        // Start from a known catalog
        sqlx::query("DELETE FROM materials").execute(&pool).await.unwrap();
        (pool, dir)
    }

    async fn insert_material(pool: &SqlitePool, name: &str, unit: &str, quantity: i64) -> i64 {
        sqlx::query("INSERT INTO materials (name, unit, quantity) VALUES (?, ?, ?)")
            .bind(name)
            .bind(unit)
            .bind(quantity)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    #[tokio::test]
    async fn receipt_is_additive() {
        let (pool, _dir) = test_pool().await;
        let id = insert_material(&pool, "Cement", "bags", 10).await;

        assert!(record_receipt(&pool, id, 50).await.unwrap());

        let material = get_material(&pool, id).await.unwrap().unwrap();
        assert_eq!(material.quantity, 60);
    }

    #[tokio::test]
    async fn receipt_unknown_material_reports_missing() {
        let (pool, _dir) = test_pool().await;
        assert!(!record_receipt(&pool, 999, 5).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_receipts_lose_no_updates() {
        let (pool, _dir) = test_pool().await;
        let id = insert_material(&pool, "Cement", "bags", 0).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                record_receipt(&pool, id, 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let material = get_material(&pool, id).await.unwrap().unwrap();
        assert_eq!(material.quantity, 20);
    }

    #[tokio::test]
    async fn usage_decrements_and_reports_remaining() {
        let (pool, _dir) = test_pool().await;
        let id = insert_material(&pool, "Sand", "tonnes", 10).await;

        let remaining = record_usage(&pool, id, 4).await.unwrap();
        assert_eq!(remaining, Some(6));
    }

    #[tokio::test]
    async fn usage_never_drives_quantity_negative() {
        let (pool, _dir) = test_pool().await;
        let id = insert_material(&pool, "Sand", "tonnes", 10).await;

        let refused = record_usage(&pool, id, 15).await.unwrap();
        assert_eq!(refused, None);

        let material = get_material(&pool, id).await.unwrap().unwrap();
        assert_eq!(material.quantity, 10);
    }

    #[tokio::test]
    async fn listing_orders_by_name_case_insensitively() {
        let (pool, _dir) = test_pool().await;
        insert_material(&pool, "gravel", "tonnes", 0).await;
        insert_material(&pool, "Cement", "bags", 0).await;
        insert_material(&pool, "Sand", "tonnes", 0).await;

        let names: Vec<String> = list_materials(&pool)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["Cement", "gravel", "Sand"]);
    }
}
