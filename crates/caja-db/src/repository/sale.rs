//! # Sale Repository (Sale Transaction Engine)
//!
//! Records a sale against an open till as one atomic unit.
//!
//! ## record_sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  prepare_checkout(cart, payment)        ← no lock: cart shape, payment  │
//! │       │                                   fields (steps 1-2)            │
//! │       ▼                                                                 │
//! │  WriteTx::begin ── BEGIN IMMEDIATE ──── busy > lock_timeout ─► LockTimeout
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  till open? operator may use it?                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  load products + stock in sorted id order                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_sale  (exists, branch, stock, total, payment: steps 3-6)          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT sale (total 0) → INSERT lines → decrement stock per line        │
//! │       → UPDATE sale total/change → UPDATE till running totals           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT (all of it) │ ROLLBACK on any error (none of it)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::cashier::require_cashier;
use crate::repository::product::{decrement_legacy_stock, decrement_stock, load_locked};
use crate::repository::till::find_till;
use crate::tx::WriteTx;
use caja_core::checkout::{lock_order, plan_sale, prepare_checkout, PreparedPayment};
use caja_core::{CartLine, CoreError, PaymentDetails, PaymentMethod, Sale, SaleLine};

const SALE_COLUMNS: &str = "id, receipt_number, operator_id, branch_id, till_id, payment_method, \
     sale_type, total_cents, tendered_cents, change_cents, reference_number, bank_name, created_at";

const LINE_COLUMNS: &str =
    "id, sale_id, product_id, name_snapshot, quantity, unit_price_cents, line_total_cents, created_at";

/// Repository for recording and reading sales.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale of `cart` on `till_id`, operated by `operator_id`.
    ///
    /// Either the sale, its lines, the stock decrements and the till's
    /// running totals all commit, or nothing does.
    ///
    /// ## Errors
    /// - `EmptyCart`, `MissingReferenceNumber`, `MissingBankName`,
    ///   `Validation` before any lock is taken
    /// - `TillNotFound`, `TillAlreadyClosed`, `Forbidden`
    /// - `ProductNotFound`, `WrongBranch`, `InsufficientStock`,
    ///   `InsufficientPayment` under the lock
    /// - `LockTimeout` (retryable) if the writer lock was not acquired in time
    pub async fn record_sale(
        &self,
        till_id: &str,
        operator_id: &str,
        cart: &[CartLine],
        payment: &PaymentDetails,
    ) -> DbResult<Sale> {
        let prepared = match prepare_checkout(cart, payment) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!(till_id, operator_id, error = %err, "Sale rejected");
                return Err(err.into());
            }
        };

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = record_in(tx.conn(), till_id, operator_id, cart, prepared).await;
        let result = tx.finish(result).await;

        match &result {
            Ok(sale) => info!(
                sale_id = %sale.id,
                receipt = %sale.receipt_number,
                till_id,
                method = sale.payment_method.as_str(),
                total_cents = sale.total_cents,
                "Sale recorded"
            ),
            Err(DbError::Core(err)) => warn!(till_id, operator_id, error = %err, "Sale rejected"),
            Err(err) if err.is_retryable() => warn!(till_id, "Sale hit lock timeout"),
            Err(_) => {}
        }
        result
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// Lines of a sale in the order they were rung up.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM sale_lines WHERE sale_id = ?1 ORDER BY rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    /// Sales of a till, oldest first.
    pub async fn list_by_till(&self, till_id: &str) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        sales_for_till(&mut conn, till_id).await
    }
}

// =============================================================================
// Atomic unit
// =============================================================================

async fn record_in(
    conn: &mut SqliteConnection,
    till_id: &str,
    operator_id: &str,
    cart: &[CartLine],
    payment: PreparedPayment,
) -> DbResult<Sale> {
    let till = find_till(conn, till_id)
        .await?
        .ok_or_else(|| CoreError::TillNotFound(till_id.to_string()))?;
    if !till.is_open() {
        return Err(CoreError::TillAlreadyClosed {
            till_id: till_id.to_string(),
        }
        .into());
    }

    let operator = require_cashier(conn, operator_id).await?;
    if !till.operable_by(&operator) {
        return Err(CoreError::forbidden(format!(
            "cashier {} may not sell on till {till_id}",
            operator.username
        ))
        .into());
    }

    let ids = lock_order(cart);
    let (products, available) = load_locked(conn, &ids, &till.branch_id).await?;
    let plan = plan_sale(&till.branch_id, cart, &products, &available, payment)?;

    let now = Utc::now();
    let receipt_number = next_receipt_number(conn, &till.branch_id, now).await?;
    let mut sale = Sale {
        id: Uuid::new_v4().to_string(),
        receipt_number,
        operator_id: operator.id.clone(),
        branch_id: till.branch_id.clone(),
        till_id: till.id.clone(),
        payment_method: plan.payment.method,
        sale_type: plan.payment.sale_type,
        total_cents: 0,
        tendered_cents: plan.payment.tendered.cents(),
        change_cents: 0,
        reference_number: plan.payment.reference_number.clone(),
        bank_name: plan.payment.bank_name.clone(),
        created_at: now,
    };
    debug!(sale_id = %sale.id, lines = plan.lines.len(), units = plan.units(), "Persisting sale");

    sqlx::query(
        "INSERT INTO sales (
            id, receipt_number, operator_id, branch_id, till_id, payment_method, sale_type,
            total_cents, tendered_cents, change_cents, reference_number, bank_name, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
    )
    .bind(&sale.id)
    .bind(&sale.receipt_number)
    .bind(&sale.operator_id)
    .bind(&sale.branch_id)
    .bind(&sale.till_id)
    .bind(sale.payment_method)
    .bind(sale.sale_type)
    .bind(sale.total_cents)
    .bind(sale.tendered_cents)
    .bind(sale.change_cents)
    .bind(&sale.reference_number)
    .bind(&sale.bank_name)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for line in &plan.lines {
        sqlx::query(
            "INSERT INTO sale_lines (
                id, sale_id, product_id, name_snapshot, quantity,
                unit_price_cents, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&sale.id)
        .bind(&line.product_id)
        .bind(&line.name)
        .bind(line.quantity)
        .bind(line.unit_price.cents())
        .bind(line.line_total.cents())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if line.branch_scoped {
            decrement_stock(conn, &line.product_id, &till.branch_id, line.quantity).await?;
        } else {
            decrement_legacy_stock(conn, &line.product_id, line.quantity).await?;
        }
    }

    sale.total_cents = plan.total.cents();
    sale.change_cents = plan.change.cents();
    sqlx::query("UPDATE sales SET total_cents = ?2, change_cents = ?3 WHERE id = ?1")
        .bind(&sale.id)
        .bind(sale.total_cents)
        .bind(sale.change_cents)
        .execute(&mut *conn)
        .await?;

    let method_column = match sale.payment_method {
        PaymentMethod::Cash => "cash_sales_cents",
        PaymentMethod::Debit => "debit_sales_cents",
        PaymentMethod::Credit => "credit_sales_cents",
        PaymentMethod::Transfer => "transfer_sales_cents",
    };
    sqlx::query(&format!(
        "UPDATE tills SET
            total_sales_cents = total_sales_cents + ?2,
            {method_column} = {method_column} + ?2,
            change_given_cents = change_given_cents + ?3
         WHERE id = ?1"
    ))
    .bind(&till.id)
    .bind(sale.total_cents)
    .bind(sale.change_cents)
    .execute(conn)
    .await?;

    Ok(sale)
}

/// Next `YYYYMMDD-NNNN` for the branch. Only valid under the writer lock.
async fn next_receipt_number(conn: &mut SqliteConnection, branch_id: &str, at: DateTime<Utc>) -> DbResult<String> {
    let day = at.format("%Y%m%d").to_string();
    let issued: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sales WHERE branch_id = ?1 AND receipt_number LIKE ?2",
    )
    .bind(branch_id)
    .bind(format!("{day}-%"))
    .fetch_one(conn)
    .await?;
    Ok(format!("{day}-{:04}", issued + 1))
}

/// Sales recorded on a till, oldest first.
pub(crate) async fn sales_for_till(conn: &mut SqliteConnection, till_id: &str) -> DbResult<Vec<Sale>> {
    let sales = sqlx::query_as::<_, Sale>(&format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE till_id = ?1 ORDER BY created_at, rowid"
    ))
    .bind(till_id)
    .fetch_all(conn)
    .await?;
    Ok(sales)
}

// =============================================================================
// Unit Tests
// =============================================================================
