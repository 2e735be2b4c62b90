//! Postgres backend (sqlx)

use super::{ReferenceStore, StoreResult};
use crate::error::StoreError;
use acervo_common::types::CleanRecord;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

const COLUMNS: &str = "termo, tipo, significado, exemplo_uso, regiao, contexto_flerte";

pub struct PgReferenceStore {
    pool: PgPool,
    table: String,
}

impl PgReferenceStore {
    /// Connect a pool; failure to reach the server is reported as [`StoreError::Unreachable`]
    ///
    /// `table` must already be validated as a plain identifier.
    pub async fn connect(url: &str, max_connections: u32, table: &str) -> StoreResult<Self> {
        info!("Connecting to Postgres (max {} connections)", max_connections);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;

        Ok(Self::from_pool(pool, table))
    }

    pub fn from_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
        }
    }

    /// Apply the bundled SQL migrations
    pub async fn migrate(&self) -> StoreResult<()> {
        info!("Running database migrations...");
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Migrations completed");
        Ok(())
    }
}

fn insert_prefix(table: &str) -> String {
    format!("INSERT INTO {} ({}) ", table, COLUMNS)
}

#[async_trait]
impl ReferenceStore for PgReferenceStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn table_exists(&self) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = current_schema() AND table_name = $1
            )
            "#,
        )
        .bind(&self.table)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn select_keys(&self) -> StoreResult<HashSet<String>> {
        let terms = sqlx::query_scalar::<_, String>(&format!("SELECT termo FROM {}", self.table))
            .fetch_all(&self.pool)
            .await?;

        Ok(terms.into_iter().collect())
    }

    async fn insert_many(&self, records: &[CleanRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix(&self.table));
        query_builder.push_values(records, |mut b, record| {
            b.push_bind(&record.term)
                .push_bind(record.kind.as_str())
                .push_bind(&record.meaning)
                .push_bind(&record.usage_example)
                .push_bind(record.region.as_str())
                .push_bind(&record.flirt_context);
        });

        query_builder.build().execute(&mut *tx).await?;
        tx.commit().await?;

        debug!("Inserted batch of {} rows into {}", records.len(), self.table);
        Ok(())
    }

    async fn insert_one(&self, record: &CleanRecord) -> StoreResult<()> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(insert_prefix(&self.table));
        query_builder.push_values(std::iter::once(record), |mut b, record| {
            b.push_bind(&record.term)
                .push_bind(record.kind.as_str())
                .push_bind(&record.meaning)
                .push_bind(&record.usage_example)
                .push_bind(record.region.as_str())
                .push_bind(&record.flirt_context);
        });

        query_builder.build().execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_prefix_lists_store_columns() {
        assert_eq!(
            insert_prefix("cultural_references"),
            "INSERT INTO cultural_references (termo, tipo, significado, exemplo_uso, regiao, contexto_flerte) "
        );
    }
}
