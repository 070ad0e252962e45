//! # Till Reconciliation
//!
//! Close-time arithmetic for a till. Pure: callers fetch the till's sales
//! and hand them in.
//!
//! ## The Closing Cash Rule
//! ```text
//! closing_cash = opening_float + Σ sale.total  (payment_method = cash)
//!
//!   Change is NOT subtracted: a cash sale's total is already what stays in
//!   the drawer (tendered − change = total).
//!
//!   Example: float 5000, one cash sale of 7000 paid with 9500
//!            change 2500 → closing_cash = 5000 + 7000 = 12000
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PaymentMethod, Sale, Till, TillState};

// =============================================================================
// Till Totals
// =============================================================================

/// Aggregated sale figures for one till.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TillTotals {
    pub total_sales: Money,
    pub cash_sales: Money,
    pub debit_sales: Money,
    pub credit_sales: Money,
    pub transfer_sales: Money,
    pub change_given: Money,
    pub sale_count: i64,
}

impl TillTotals {
    /// Folds one sale into the totals.
    ///
    /// Saturates instead of overflowing; stored amounts are bounded by
    /// `MAX_AMOUNT_CENTS`, so this only matters for corrupt rows.
    pub fn record(&mut self, method: PaymentMethod, total: Money, change: Money) {
        self.total_sales = self.total_sales.saturating_add(total);
        self.change_given = self.change_given.saturating_add(change);
        self.sale_count += 1;
        let bucket = match method {
            PaymentMethod::Cash => &mut self.cash_sales,
            PaymentMethod::Debit => &mut self.debit_sales,
            PaymentMethod::Credit => &mut self.credit_sales,
            PaymentMethod::Transfer => &mut self.transfer_sales,
        };
        *bucket = bucket.saturating_add(total);
    }

    /// Recomputes totals from a till's sales.
    pub fn from_sales<'a>(sales: impl IntoIterator<Item = &'a Sale>) -> Self {
        let mut totals = TillTotals::default();
        for sale in sales {
            totals.record(sale.payment_method, sale.total(), sale.change());
        }
        totals
    }

    /// Sum for one payment method.
    pub fn for_method(&self, method: PaymentMethod) -> Money {
        match method {
            PaymentMethod::Cash => self.cash_sales,
            PaymentMethod::Debit => self.debit_sales,
            PaymentMethod::Credit => self.credit_sales,
            PaymentMethod::Transfer => self.transfer_sales,
        }
    }

    /// Cash expected in the drawer given the opening float.
    pub fn closing_cash(&self, opening_float: Money) -> Money {
        opening_float.saturating_add(self.cash_sales)
    }
}

// =============================================================================
// Reconciliation Summary
// =============================================================================

/// Reconciliation of one till, returned by close and by the detail view.
///
/// For an open till `closing_cash` is the figure the drawer should hold if
/// the till were closed now.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationSummary {
    pub till_id: String,
    pub branch_id: String,
    pub cashier_id: String,
    pub state: TillState,
    pub opening_float: Money,
    pub totals: TillTotals,
    pub closing_cash: Money,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl ReconciliationSummary {
    pub fn new(till: &Till, totals: TillTotals) -> Self {
        ReconciliationSummary {
            till_id: till.id.clone(),
            branch_id: till.branch_id.clone(),
            cashier_id: till.cashier_id.clone(),
            state: till.state,
            opening_float: till.opening_float(),
            totals,
            closing_cash: totals.closing_cash(till.opening_float()),
            opened_at: till.opened_at,
            closed_at: till.closed_at,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
