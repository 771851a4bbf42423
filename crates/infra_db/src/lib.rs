//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the olive oil ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern: repositories own the SQL and
//! row types, and [`adapters::PostgresLedgerStore`] implements the billing
//! domain's `LedgerStore` port on top of them.
//!
//! # Concurrency
//!
//! Invoice lines are created inside a transaction that first takes a
//! `SELECT ... FOR UPDATE` lock on the barrel row. A unique index on
//! `invoice_lines(barrel_id)` rejects any second line for the same barrel
//! even if a writer bypasses the lock.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, run_migrations, PostgresLedgerStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/olive_ledger")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLedgerStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, create_pool_from_url, run_migrations};
pub use error::DatabaseError;
pub use adapters::{PostgresLedgerStore, PgLedgerTransaction};
