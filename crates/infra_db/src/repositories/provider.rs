//! Provider repository

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::ProviderId;
use domain_billing::Provider;

use crate::error::DatabaseError;

/// Database row of the `providers` table
#[derive(Debug, Clone, FromRow)]
pub struct ProviderRow {
    pub provider_id: Uuid,
    pub name: String,
    pub address: String,
    pub tax_id: String,
}

impl From<ProviderRow> for Provider {
    fn from(row: ProviderRow) -> Self {
        Provider {
            id: ProviderId::from(row.provider_id),
            name: row.name,
            address: row.address,
            tax_id: row.tax_id,
        }
    }
}

/// Repository for providers
#[derive(Debug, Clone)]
pub struct ProviderRepository {
    pool: PgPool,
}

impl ProviderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, provider: &Provider) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO providers (provider_id, name, address, tax_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(*provider.id.as_uuid())
        .bind(&provider.name)
        .bind(&provider.address)
        .bind(&provider.tax_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn update(&self, provider: &Provider) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE providers
            SET name = $2, address = $3, tax_id = $4
            WHERE provider_id = $1
            "#,
        )
        .bind(*provider.id.as_uuid())
        .bind(&provider.name)
        .bind(&provider.address)
        .bind(&provider.tax_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Provider", provider.id));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ProviderRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT provider_id, name, address, tax_id
            FROM providers
            WHERE provider_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list(&self) -> Result<Vec<ProviderRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT provider_id, name, address, tax_id
            FROM providers
            ORDER BY provider_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deletes the provider; its barrels cascade
    ///
    /// Invoices and invoice lines restrict the delete, which surfaces as
    /// `DatabaseError::ForeignKeyViolation`.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM providers WHERE provider_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
