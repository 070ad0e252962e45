//! # caja-db: Database Layer for Caja POS
//!
//! SQLite storage for tills, sales and stock, with sqlx for async access.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (POST /tills/{id}/sales)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────────────────────────────┐  │
//! │  │                     caja-db (THIS CRATE)                          │  │
//! │  │                                                                   │  │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐     │  │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │     │  │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │     │  │
//! │  │   │               │    │ TillLedger     │    │              │     │  │
//! │  │   │ SqlitePool    │◄───│ SaleRepository │    │ 001_init.sql │     │  │
//! │  │   │ WriteTx       │    │ ProductRepo    │    │              │     │  │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘     │  │
//! │  │                                                                   │  │
//! │  └───────────────────────────────────────────────────────────────────┘  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`tx`] - The `BEGIN IMMEDIATE` write transaction guard
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("caja.db")).await?;
//!
//! let till = db.tills().open(&cashier_id, &branch_id, 50_000).await?;
//! let sale = db.sales().record_sale(&till.id, &cashier_id, &cart, &payment).await?;
//! let summary = db.tills().close(&till.id, &cashier_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod tx;

#[cfg(test)]
pub(crate) mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use tx::WriteTx;

// Repository re-exports for convenience
pub use repository::{
    BranchRepository, CashierRepository, NewProduct, ProductRepository, ReportRepository,
    SaleRepository, TillLedger,
};
