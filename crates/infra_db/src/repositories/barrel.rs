//! Barrel repository
//!
//! Besides plain CRUD this holds the two queries the invoice line factory
//! runs inside its transaction: the `FOR UPDATE` barrel lock and the billed
//! liters sum.

use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use core_kernel::{BarrelId, ProviderId};
use domain_billing::{Barrel, BarrelBillingState, OilType};

use crate::error::DatabaseError;

/// Database row of the `barrels` table
#[derive(Debug, Clone, FromRow)]
pub struct BarrelRow {
    pub barrel_id: Uuid,
    pub provider_id: Uuid,
    pub number: String,
    pub oil_type: String,
    pub liters: i64,
}

impl TryFrom<BarrelRow> for Barrel {
    type Error = DatabaseError;

    fn try_from(row: BarrelRow) -> Result<Self, Self::Error> {
        let oil_type: OilType = row
            .oil_type
            .parse()
            .map_err(|_| DatabaseError::InvalidRow(format!("unknown oil type '{}'", row.oil_type)))?;

        Ok(Barrel {
            id: BarrelId::from(row.barrel_id),
            provider_id: ProviderId::from(row.provider_id),
            number: row.number,
            oil_type,
            liters: row.liters,
        })
    }
}

/// Capacity and billed liters of one barrel
#[derive(Debug, Clone, Copy, FromRow)]
pub struct BarrelStateRow {
    pub barrel_id: Uuid,
    pub provider_id: Uuid,
    pub capacity: i64,
    pub billed_liters: i64,
}

impl From<BarrelStateRow> for BarrelBillingState {
    fn from(row: BarrelStateRow) -> Self {
        BarrelBillingState {
            barrel_id: BarrelId::from(row.barrel_id),
            provider_id: ProviderId::from(row.provider_id),
            capacity: row.capacity,
            billed_liters: row.billed_liters,
        }
    }
}

/// Repository for barrels
#[derive(Debug, Clone)]
pub struct BarrelRepository {
    pool: PgPool,
}

impl BarrelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, barrel: &Barrel) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO barrels (barrel_id, provider_id, number, oil_type, liters)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*barrel.id.as_uuid())
        .bind(*barrel.provider_id.as_uuid())
        .bind(&barrel.number)
        .bind(barrel.oil_type.code())
        .bind(barrel.liters)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates number and oil type; capacity and provider never change
    pub async fn update(&self, barrel: &Barrel) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE barrels
            SET number = $2, oil_type = $3
            WHERE barrel_id = $1
            "#,
        )
        .bind(*barrel.id.as_uuid())
        .bind(&barrel.number)
        .bind(barrel.oil_type.code())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Barrel", barrel.id));
        }
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<BarrelRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BarrelRow>(
            r#"
            SELECT barrel_id, provider_id, number, oil_type, liters
            FROM barrels
            WHERE barrel_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn list(&self) -> Result<Vec<BarrelRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BarrelRow>(
            r#"
            SELECT barrel_id, provider_id, number, oil_type, liters
            FROM barrels
            ORDER BY barrel_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deletes the barrel; existing invoice lines restrict the delete
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM barrels WHERE barrel_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Billing state of every barrel, optionally of one provider only
    pub async fn states(&self, provider_id: Option<Uuid>) -> Result<Vec<BarrelStateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BarrelStateRow>(
            r#"
            SELECT b.barrel_id,
                   b.provider_id,
                   b.liters AS capacity,
                   COALESCE(SUM(l.liters), 0)::BIGINT AS billed_liters
            FROM barrels b
            LEFT JOIN invoice_lines l ON l.barrel_id = b.barrel_id
            WHERE $1::UUID IS NULL OR b.provider_id = $1
            GROUP BY b.barrel_id, b.provider_id, b.liters
            ORDER BY b.barrel_id
            "#,
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Locks the barrel row until the surrounding transaction ends
    pub async fn lock(conn: &mut PgConnection, id: Uuid) -> Result<Option<BarrelRow>, DatabaseError> {
        let row = sqlx::query_as::<_, BarrelRow>(
            r#"
            SELECT barrel_id, provider_id, number, oil_type, liters
            FROM barrels
            WHERE barrel_id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    /// Sum of the liters on the barrel's invoice lines
    pub async fn billed_liters(conn: &mut PgConnection, id: Uuid) -> Result<i64, DatabaseError> {
        let billed = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(liters), 0)::BIGINT
            FROM invoice_lines
            WHERE barrel_id = $1
            "#,
        )
        .bind(id)
        .fetch_one(conn)
        .await?;

        Ok(billed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_unknown_oil_type() {
        let row = BarrelRow {
            barrel_id: Uuid::now_v7(),
            provider_id: Uuid::now_v7(),
            number: "1".to_string(),
            oil_type: "XX".to_string(),
            liters: 10,
        };
        assert!(matches!(Barrel::try_from(row), Err(DatabaseError::InvalidRow(_))));
    }

    #[test]
    fn test_row_to_barrel() {
        let row = BarrelRow {
            barrel_id: Uuid::now_v7(),
            provider_id: Uuid::now_v7(),
            number: "12".to_string(),
            oil_type: "ROO".to_string(),
            liters: 220,
        };
        let barrel = Barrel::try_from(row.clone()).unwrap();
        assert_eq!(*barrel.id.as_uuid(), row.barrel_id);
        assert_eq!(barrel.oil_type, OilType::Refined);
        assert_eq!(barrel.liters, 220);
    }
}
