//! SQLite durable fact store implementation.
//!
//! Implements `DurableFactStore` from `kindred-core` using sqlx with split
//! read/write pools. One row per (person, fact kind); writes are upserts
//! that preserve the original `created_at`.

use chrono::Utc;
use kindred_core::fact::store::DurableFactStore;
use kindred_types::engagement::PersonId;
use kindred_types::error::FactStoreError;
use kindred_types::fact::FactKind;
use sqlx::Row;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `DurableFactStore`.
pub struct SqliteFactStore {
    pool: DatabasePool,
}

impl SqliteFactStore {
    /// Create a new fact store backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl DurableFactStore for SqliteFactStore {
    async fn get(
        &self,
        person: &PersonId,
        kind: &FactKind,
    ) -> Result<Option<String>, FactStoreError> {
        let row = sqlx::query("SELECT value FROM person_facts WHERE person_id = ? AND fact_kind = ?")
            .bind(person.as_str())
            .bind(kind.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| FactStoreError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let value: String = row
                    .try_get("value")
                    .map_err(|e| FactStoreError::Query(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        person: &PersonId,
        kind: &FactKind,
        value: &str,
    ) -> Result<(), FactStoreError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO person_facts (person_id, fact_kind, value, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (person_id, fact_kind)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(person.as_str())
        .bind(kind.as_str())
        .bind(value)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| FactStoreError::Query(e.to_string()))?;

        Ok(())
    }
}
