//! Invoice repository
//!
//! Invoices and their lines. Line inserts only happen inside the invoice
//! line factory's transaction, so they take a connection instead of the pool.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use core_kernel::{BarrelId, InvoiceId, InvoiceLineId, ProviderId, UnitPrice};
use domain_billing::{Invoice, InvoiceLine, InvoiceQuery};

use crate::error::DatabaseError;

/// Database row of the `invoices` table
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub invoice_no: String,
    pub provider_id: Uuid,
    pub issued_on: NaiveDate,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: InvoiceId::from(row.invoice_id),
            invoice_no: row.invoice_no,
            provider_id: ProviderId::from(row.provider_id),
            issued_on: row.issued_on,
        }
    }
}

/// Database row of the `invoice_lines` table
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceLineRow {
    pub line_id: Uuid,
    pub invoice_id: Uuid,
    pub barrel_id: Uuid,
    pub liters: i64,
    pub description: String,
    pub unit_price: Decimal,
}

impl TryFrom<InvoiceLineRow> for InvoiceLine {
    type Error = DatabaseError;

    fn try_from(row: InvoiceLineRow) -> Result<Self, Self::Error> {
        let unit_price = UnitPrice::new(row.unit_price)
            .map_err(|e| DatabaseError::InvalidRow(format!("line {}: {}", row.line_id, e)))?;

        Ok(InvoiceLine {
            id: InvoiceLineId::from(row.line_id),
            invoice_id: InvoiceId::from(row.invoice_id),
            barrel_id: BarrelId::from(row.barrel_id),
            liters: row.liters,
            description: row.description,
            unit_price,
        })
    }
}

/// Escapes LIKE wildcards so the fragment matches literally
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Repository for invoices and invoice lines
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, invoice: &Invoice) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (invoice_id, invoice_no, provider_id, issued_on)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(*invoice.id.as_uuid())
        .bind(&invoice.invoice_no)
        .bind(*invoice.provider_id.as_uuid())
        .bind(invoice.issued_on)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<InvoiceRow>, DatabaseError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT invoice_id, invoice_no, provider_id, issued_on
            FROM invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Reads one invoice and holds a key-share lock on it until the transaction ends
    ///
    /// Deleting the invoice waits for that transaction, so a line inserted
    /// under the lock always finds its invoice.
    pub async fn fetch_for_key_share(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<InvoiceRow>, DatabaseError> {
        let row = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT invoice_id, invoice_no, provider_id, issued_on
            FROM invoices
            WHERE invoice_id = $1
            FOR KEY SHARE
            "#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(row)
    }

    /// Invoices matching every set filter, newest first
    pub async fn find(&self, query: &InvoiceQuery) -> Result<Vec<InvoiceRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT invoice_id, invoice_no, provider_id, issued_on
            FROM invoices
            WHERE ($1::TEXT IS NULL OR invoice_no ILIKE $1)
              AND ($2::DATE IS NULL OR issued_on >= $2)
              AND ($3::DATE IS NULL OR issued_on <= $3)
              AND ($4::UUID IS NULL OR provider_id = $4)
            ORDER BY issued_on DESC, invoice_id DESC
            "#,
        )
        .bind(query.invoice_no.as_deref().map(like_pattern))
        .bind(query.issued_on_after)
        .bind(query.issued_on_before)
        .bind(query.provider_id.map(Uuid::from))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deletes the invoice; its lines cascade
    pub async fn delete(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn lines(&self, invoice_id: Uuid) -> Result<Vec<InvoiceLineRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvoiceLineRow>(
            r#"
            SELECT line_id, invoice_id, barrel_id, liters, description, unit_price
            FROM invoice_lines
            WHERE invoice_id = $1
            ORDER BY line_id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Inserts a line; a second line for the same barrel violates `idx_invoice_lines_barrel`
    pub async fn insert_line(conn: &mut PgConnection, line: &InvoiceLine) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (line_id, invoice_id, barrel_id, liters, description, unit_price)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*line.id.as_uuid())
        .bind(*line.invoice_id.as_uuid())
        .bind(*line.barrel_id.as_uuid())
        .bind(line.liters)
        .bind(&line.description)
        .bind(line.unit_price.amount())
        .execute(conn)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("2024"), "%2024%");
        assert_eq!(like_pattern("50%_a"), "%50\\%\\_a%");
    }

    #[test]
    fn test_line_row_with_invalid_price() {
        let row = InvoiceLineRow {
            line_id: Uuid::now_v7(),
            invoice_id: Uuid::now_v7(),
            barrel_id: Uuid::now_v7(),
            liters: 10,
            description: "x".to_string(),
            unit_price: dec!(0),
        };
        assert!(matches!(InvoiceLine::try_from(row), Err(DatabaseError::InvalidRow(_))));
    }
}
