//! # Repository Module
//!
//! Database repository implementations for Caja POS.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caja-server handler                                                    │
//! │       │   db.tills().open(cashier, branch, float)                       │
//! │       │   db.sales().record_sale(till, operator, cart, payment)         │
//! │       ▼                                                                 │
//! │  TillLedger / SaleRepository ── WriteTx (BEGIN IMMEDIATE) ──┐           │
//! │       │                                                     │           │
//! │       │  product::{load_locked, decrement_stock}  ◄─────────┘           │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! │                                                                         │
//! │  ReportRepository reads committed rows only, without the writer lock.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`BranchRepository`] - Branches
//! - [`CashierRepository`] - Cashiers and branch authorisations
//! - [`ProductRepository`] - Products and stock (Inventory Store)
//! - [`TillLedger`] - Till open/close/resolve and reconciliation
//! - [`SaleRepository`] - Sale Transaction Engine
//! - [`ReportRepository`] - Analytics read model

pub mod branch;
pub mod cashier;
pub mod product;
pub mod report;
pub mod sale;
pub mod till;

pub use branch::BranchRepository;
pub use cashier::CashierRepository;
pub use product::{NewProduct, ProductRepository};
pub use report::ReportRepository;
pub use sale::SaleRepository;
pub use till::TillLedger;
