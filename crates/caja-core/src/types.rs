//! # Domain Types
//!
//! Core domain types used throughout Caja.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐                 │
//! │  │   Branch     │◄──│    Till      │◄──│    Sale      │                 │
//! │  │  (sucursal)  │   │   (caja)     │   │   (venta)    │                 │
//! │  └──────┬───────┘   │  open/closed │   │  immutable   │                 │
//! │         │           └──────────────┘   └──────┬───────┘                 │
//! │         │                                     │ 1..N                    │
//! │  ┌──────┴───────┐   ┌──────────────┐   ┌──────┴───────┐                 │
//! │  │ BranchStock  │──►│   Product    │◄──│  SaleLine    │                 │
//! │  │ (product,    │   │  legacy_stock│   │  (detalle)   │                 │
//! │  │  branch)→qty │   │  branch_id?  │   │  price frozen│                 │
//! │  └──────────────┘   └──────────────┘   └──────────────┘                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity uses a UUID v4 string as its identity. Sales additionally
//! carry a human-readable receipt number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// VAT Rate
// =============================================================================

/// VAT rate in basis points (1900 bps = 19%).
///
/// Sale prices are VAT-inclusive; the rate is only used to split revenue
/// and cost into net and VAT portions for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VatRate(u32);

impl VatRate {
    /// The fixed rate the business operates under.
    pub const STANDARD: VatRate = VatRate(1900);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        VatRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for VatRate {
    fn default() -> Self {
        VatRate::STANDARD
    }
}

// =============================================================================
// Branch & Cashier
// =============================================================================

/// A physical sales location with its own stock pool.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// The authenticated operator of a till.
///
/// Supplied by the authentication collaborator; the core never manages
/// credentials, only `is_admin` and the optional assigned branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Cashier {
    pub id: String,
    pub username: String,
    /// Administrators may operate every branch and every open till.
    pub is_admin: bool,
    /// Branch the cashier is assigned to, if any.
    pub branch_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product & Stock
// =============================================================================

/// A catalog entry.
///
/// ## Dual Stock Representation
/// ```text
/// branch_id = Some(b)  →  authoritative stock lives in BranchStock(product, b)
/// branch_id = None     →  legacy_stock is used ("virtual" products)
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: String,

    /// Business code printed on labels.
    pub sku: String,

    pub name: String,

    /// Purchase price in cents (VAT-inclusive), used for cost of goods sold.
    pub purchase_price_cents: i64,

    /// Sale price in cents (VAT-inclusive).
    pub sale_price_cents: i64,

    /// Home branch; `None` for branch-less products.
    pub branch_id: Option<String>,

    /// Sell even when stock is insufficient.
    pub allow_sale_without_stock: bool,

    /// Flat stock figure, meaningful only when `branch_id` is `None`.
    pub legacy_stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Whether stock for this product lives in per-branch records.
    #[inline]
    pub fn is_branch_scoped(&self) -> bool {
        self.branch_id.is_some()
    }

    /// Whether a till in `branch_id` may sell this product.
    ///
    /// Branch-scoped products sell only at their home branch; branch-less
    /// products sell anywhere, but only when flagged sellable without stock.
    pub fn sellable_at(&self, branch_id: &str) -> bool {
        match &self.branch_id {
            Some(home) => home == branch_id,
            None => self.allow_sale_without_stock,
        }
    }
}

/// Stock of one product at one branch. Created lazily on first adjustment.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BranchStock {
    pub product_id: String,
    pub branch_id: String,
    /// Never negative.
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Till
// =============================================================================

/// Lifecycle state of a till. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TillState {
    Open,
    Closed,
}

impl TillState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TillState::Open => "open",
            TillState::Closed => "closed",
        }
    }
}

/// One cash-register session, scoped to a branch and its opening cashier.
///
/// Running totals are maintained by every recorded sale; `close` recomputes
/// them from the till's sales, sets `closing_cash_cents` and freezes the row.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Till {
    pub id: String,
    pub cashier_id: String,
    pub branch_id: String,
    pub opening_float_cents: i64,
    pub state: TillState,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub total_sales_cents: i64,
    pub cash_sales_cents: i64,
    pub debit_sales_cents: i64,
    pub credit_sales_cents: i64,
    pub transfer_sales_cents: i64,
    pub change_given_cents: i64,
    /// `None` while the till is open.
    pub closing_cash_cents: Option<i64>,
}

impl Till {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == TillState::Open
    }

    #[inline]
    pub fn opening_float(&self) -> Money {
        Money::from_cents(self.opening_float_cents)
    }

    /// Whether `cashier` may operate this till (sell on it, close it).
    pub fn operable_by(&self, cashier: &Cashier) -> bool {
        cashier.is_admin || self.cashier_id == cashier.id
    }
}

// =============================================================================
// Payment
// =============================================================================

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Debit,
    Credit,
    Transfer,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Debit,
        PaymentMethod::Credit,
        PaymentMethod::Transfer,
    ];

    /// Card and transfer payments carry a transaction reference.
    pub fn requires_reference(&self) -> bool {
        !matches!(self, PaymentMethod::Cash)
    }

    pub fn requires_bank(&self) -> bool {
        matches!(self, PaymentMethod::Transfer)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

/// Fiscal document issued for the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleType {
    /// Consumer receipt ("boleta").
    Receipt,
    /// Business invoice ("factura").
    Invoice,
}

impl Default for SaleType {
    fn default() -> Self {
        SaleType::Receipt
    }
}

/// Payment data submitted with a cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    #[serde(default)]
    pub sale_type: SaleType,
    /// Cash handed over by the customer. Ignored for non-cash payments.
    #[serde(default)]
    pub tendered_cents: Option<i64>,
    /// Card authorisation or transfer number.
    #[serde(default)]
    pub reference_number: Option<String>,
    /// Originating bank, transfers only.
    #[serde(default)]
    pub bank_name: Option<String>,
}

impl PaymentDetails {
    pub fn cash(tendered: Money) -> Self {
        PaymentDetails {
            method: PaymentMethod::Cash,
            sale_type: SaleType::Receipt,
            tendered_cents: Some(tendered.cents()),
            reference_number: None,
            bank_name: None,
        }
    }

    pub fn card(method: PaymentMethod, reference: impl Into<String>) -> Self {
        PaymentDetails {
            method,
            sale_type: SaleType::Receipt,
            tendered_cents: None,
            reference_number: Some(reference.into()),
            bank_name: None,
        }
    }

    pub fn transfer(reference: impl Into<String>, bank: impl Into<String>) -> Self {
        PaymentDetails {
            method: PaymentMethod::Transfer,
            sale_type: SaleType::Receipt,
            tendered_cents: None,
            reference_number: Some(reference.into()),
            bank_name: Some(bank.into()),
        }
    }

    /// Tendered amount, zero when absent.
    pub fn tendered(&self) -> Money {
        Money::from_cents(self.tendered_cents.unwrap_or(0))
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the cart snapshot handed over by the cart holder.
///
/// Duplicate product ids are kept as independent lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub product_id: String,
    pub quantity: i64,
}

impl CartLine {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        CartLine {
            product_id: product_id.into(),
            quantity,
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An immutable record of one completed transaction.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Per-branch, per-day sequence: `YYYYMMDD-NNNN`.
    pub receipt_number: String,
    pub operator_id: String,
    pub branch_id: String,
    pub till_id: String,
    pub payment_method: PaymentMethod,
    pub sale_type: SaleType,
    pub total_cents: i64,
    /// Cash only; zero otherwise.
    pub tendered_cents: i64,
    /// Cash only; zero otherwise.
    pub change_cents: i64,
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

/// One product line of a sale. The unit price is frozen at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// `unit_price_cents × quantity`.
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
