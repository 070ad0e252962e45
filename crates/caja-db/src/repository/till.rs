//! # Till Ledger
//!
//! Opening, closing and resolving cash-register sessions.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   open(cashier, branch, float)          close(till, caller)             │
//! │          │                                     │                        │
//! │          ▼                                     ▼                        │
//! │      ┌────────┐      record_sale × N      ┌────────┐                    │
//! │      │  OPEN  │ ────────────────────────► │ CLOSED │  (terminal)        │
//! │      └────────┘   running totals updated  └────────┘                    │
//! │                                           totals recomputed + frozen    │
//! │                                                                         │
//! │   Invariants                                                            │
//! │   • one open till per branch   ← WriteTx check + partial unique index   │
//! │   • one open till per non-admin cashier                                 │
//! │   • close runs under the writer lock, so no sale can commit between     │
//! │     the aggregation and the state change                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::branch::require_branch;
use crate::repository::cashier::{is_authorized_for, require_cashier};
use crate::repository::sale::sales_for_till;
use crate::tx::WriteTx;
use caja_core::validation::validate_opening_float;
use caja_core::{Cashier, CoreError, ReconciliationSummary, Till, TillState, TillTotals};

pub(crate) const TILL_COLUMNS: &str = "id, cashier_id, branch_id, opening_float_cents, state, \
     opened_at, closed_at, total_sales_cents, cash_sales_cents, debit_sales_cents, \
     credit_sales_cents, transfer_sales_cents, change_given_cents, closing_cash_cents";

/// Default page size for till history.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;

/// The Till Ledger.
#[derive(Debug, Clone)]
pub struct TillLedger {
    pool: SqlitePool,
}

impl TillLedger {
    pub fn new(pool: SqlitePool) -> Self {
        TillLedger { pool }
    }

    /// Opens a till for `cashier_id` in `branch_id`.
    ///
    /// ## Errors
    /// - `Validation` for a negative float
    /// - `CashierNotFound` / `BranchNotFound`
    /// - `Forbidden` when a non-admin is not authorised for the branch
    /// - `TillAlreadyOpen` with the existing till's id
    /// - `CashierAlreadyHasOpenTill` for a non-admin with another open till
    pub async fn open(&self, cashier_id: &str, branch_id: &str, opening_float_cents: i64) -> DbResult<Till> {
        validate_opening_float(opening_float_cents)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = open_in(tx.conn(), cashier_id, branch_id, opening_float_cents).await;
        let result = tx.finish(result).await;

        match &result {
            Ok(till) => info!(
                till_id = %till.id,
                cashier_id,
                branch_id,
                opening_float_cents,
                "Till opened"
            ),
            Err(DbError::Core(err)) => warn!(cashier_id, branch_id, error = %err, "Till open rejected"),
            Err(_) => {}
        }
        result
    }

    /// Closes a till and returns its frozen reconciliation.
    ///
    /// Totals are recomputed from the till's sales inside the same unit
    /// that flips the state, so a concurrent sale either lands before the
    /// aggregation or is rejected with `TillAlreadyClosed`.
    pub async fn close(&self, till_id: &str, caller_id: &str) -> DbResult<ReconciliationSummary> {
        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = close_in(tx.conn(), till_id, caller_id).await;
        let result = tx.finish(result).await;

        match &result {
            Ok(summary) => info!(
                till_id,
                caller_id,
                sales = summary.totals.sale_count,
                total_sales_cents = summary.totals.total_sales.cents(),
                closing_cash_cents = summary.closing_cash.cents(),
                "Till closed"
            ),
            Err(DbError::Core(err)) => warn!(till_id, caller_id, error = %err, "Till close rejected"),
            Err(_) => {}
        }
        result
    }

    /// Finds the till a cashier is working on.
    ///
    /// ## Resolution Order
    /// 1. `requested_till_id`, if it names an open till
    /// 2. otherwise the cashier's own open till
    ///
    /// The chosen till is then authorised: admins may resolve to any open
    /// till, non-admins only to their own and only when their assigned
    /// branch (if any) is the till's branch. An open till named by the hint
    /// that fails this check resolves to `None`, never to a different till.
    /// `None` means the caller has to open a till first.
    pub async fn resolve_current(&self, cashier_id: &str, requested_till_id: Option<&str>) -> DbResult<Option<Till>> {
        let mut conn = self.pool.acquire().await?;
        let cashier = require_cashier(&mut conn, cashier_id).await?;

        let requested = match requested_till_id {
            Some(id) => find_till(&mut conn, id).await?.filter(Till::is_open),
            None => None,
        };

        let candidate = match requested {
            Some(till) => Some(till),
            None => find_open_for_cashier(&mut conn, cashier_id).await?,
        };

        Ok(candidate.filter(|till| {
            let allowed = may_resume(&cashier, till);
            if !allowed {
                debug!(cashier_id, till_id = %till.id, "Till not resumable by this cashier");
            }
            allowed
        }))
    }

    pub async fn get(&self, till_id: &str) -> DbResult<Option<Till>> {
        let mut conn = self.pool.acquire().await?;
        find_till(&mut conn, till_id).await
    }

    /// The open till of a branch, if any.
    pub async fn open_in_branch(&self, branch_id: &str) -> DbResult<Option<Till>> {
        let mut conn = self.pool.acquire().await?;
        find_open_in_branch(&mut conn, branch_id).await
    }

    /// Reconciliation recomputed from the till's sales, open or closed.
    pub async fn summary(&self, till_id: &str) -> DbResult<ReconciliationSummary> {
        let mut conn = self.pool.acquire().await?;
        let till = find_till(&mut conn, till_id)
            .await?
            .ok_or_else(|| CoreError::TillNotFound(till_id.to_string()))?;
        let sales = sales_for_till(&mut conn, till_id).await?;
        Ok(ReconciliationSummary::new(&till, TillTotals::from_sales(&sales)))
    }

    /// Tills newest first, optionally for one branch.
    pub async fn history(&self, branch_id: Option<&str>, limit: i64) -> DbResult<Vec<Till>> {
        let tills = match branch_id {
            Some(branch_id) => {
                sqlx::query_as::<_, Till>(&format!(
                    "SELECT {TILL_COLUMNS} FROM tills WHERE branch_id = ?1
                     ORDER BY opened_at DESC LIMIT ?2"
                ))
                .bind(branch_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Till>(&format!(
                    "SELECT {TILL_COLUMNS} FROM tills ORDER BY opened_at DESC LIMIT ?1"
                ))
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(tills)
    }
}

/// Non-admins resume only their own till, in their assigned branch.
fn may_resume(cashier: &Cashier, till: &Till) -> bool {
    if cashier.is_admin {
        return true;
    }
    till.cashier_id == cashier.id
        && cashier
            .branch_id
            .as_deref()
            .map_or(true, |branch| branch == till.branch_id)
}

// =============================================================================
// Atomic units
// =============================================================================

async fn open_in(
    conn: &mut SqliteConnection,
    cashier_id: &str,
    branch_id: &str,
    opening_float_cents: i64,
) -> DbResult<Till> {
    let cashier = require_cashier(conn, cashier_id).await?;
    require_branch(conn, branch_id).await?;

    if !is_authorized_for(conn, &cashier, branch_id).await? {
        return Err(CoreError::forbidden(format!(
            "cashier {} may not open a till in branch {branch_id}",
            cashier.username
        ))
        .into());
    }

    if let Some(existing) = find_open_in_branch(conn, branch_id).await? {
        return Err(CoreError::TillAlreadyOpen {
            branch_id: branch_id.to_string(),
            till_id: existing.id,
        }
        .into());
    }

    if !cashier.is_admin {
        if let Some(own) = find_open_for_cashier(conn, cashier_id).await? {
            return Err(CoreError::CashierAlreadyHasOpenTill {
                cashier_id: cashier_id.to_string(),
                till_id: own.id,
            }
            .into());
        }
    }

    let till = Till {
        id: Uuid::new_v4().to_string(),
        cashier_id: cashier_id.to_string(),
        branch_id: branch_id.to_string(),
        opening_float_cents,
        state: TillState::Open,
        opened_at: Utc::now(),
        closed_at: None,
        total_sales_cents: 0,
        cash_sales_cents: 0,
        debit_sales_cents: 0,
        credit_sales_cents: 0,
        transfer_sales_cents: 0,
        change_given_cents: 0,
        closing_cash_cents: None,
    };

    let inserted = sqlx::query(
        "INSERT INTO tills (id, cashier_id, branch_id, opening_float_cents, state, opened_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&till.id)
    .bind(&till.cashier_id)
    .bind(&till.branch_id)
    .bind(till.opening_float_cents)
    .bind(till.state)
    .bind(till.opened_at)
    .execute(&mut *conn)
    .await;

    match inserted.map_err(DbError::from) {
        Ok(_) => Ok(till),
        // partial unique index on open tills
        Err(DbError::UniqueViolation { field, .. }) if field.contains("tills.branch_id") => {
            let existing = find_open_in_branch(conn, branch_id).await?;
            Err(CoreError::TillAlreadyOpen {
                branch_id: branch_id.to_string(),
                till_id: existing.map(|t| t.id).unwrap_or_default(),
            }
            .into())
        }
        Err(err) => Err(err),
    }
}

async fn close_in(conn: &mut SqliteConnection, till_id: &str, caller_id: &str) -> DbResult<ReconciliationSummary> {
    let caller = require_cashier(conn, caller_id).await?;
    let mut till = find_till(conn, till_id)
        .await?
        .ok_or_else(|| CoreError::TillNotFound(till_id.to_string()))?;

    if !till.operable_by(&caller) {
        return Err(CoreError::forbidden(format!(
            "cashier {} may not close till {till_id}",
            caller.username
        ))
        .into());
    }
    if !till.is_open() {
        return Err(CoreError::TillAlreadyClosed {
            till_id: till_id.to_string(),
        }
        .into());
    }

    let sales = sales_for_till(conn, till_id).await?;
    let totals = TillTotals::from_sales(&sales);
    let closing_cash = totals.closing_cash(till.opening_float());
    let closed_at = Utc::now();

    sqlx::query(
        "UPDATE tills SET
            state = ?2,
            closed_at = ?3,
            total_sales_cents = ?4,
            cash_sales_cents = ?5,
            debit_sales_cents = ?6,
            credit_sales_cents = ?7,
            transfer_sales_cents = ?8,
            change_given_cents = ?9,
            closing_cash_cents = ?10
         WHERE id = ?1 AND state = 'open'",
    )
    .bind(till_id)
    .bind(TillState::Closed)
    .bind(closed_at)
    .bind(totals.total_sales.cents())
    .bind(totals.cash_sales.cents())
    .bind(totals.debit_sales.cents())
    .bind(totals.credit_sales.cents())
    .bind(totals.transfer_sales.cents())
    .bind(totals.change_given.cents())
    .bind(closing_cash.cents())
    .execute(conn)
    .await?;

    till.state = TillState::Closed;
    till.closed_at = Some(closed_at);
    till.total_sales_cents = totals.total_sales.cents();
    till.cash_sales_cents = totals.cash_sales.cents();
    till.debit_sales_cents = totals.debit_sales.cents();
    till.credit_sales_cents = totals.credit_sales.cents();
    till.transfer_sales_cents = totals.transfer_sales.cents();
    till.change_given_cents = totals.change_given.cents();
    till.closing_cash_cents = Some(closing_cash.cents());

    Ok(ReconciliationSummary::new(&till, totals))
}

// =============================================================================
// Lookups
// =============================================================================

pub(crate) async fn find_till(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Till>> {
    let till = sqlx::query_as::<_, Till>(&format!("SELECT {TILL_COLUMNS} FROM tills WHERE id = ?1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(till)
}

async fn find_open_in_branch(conn: &mut SqliteConnection, branch_id: &str) -> DbResult<Option<Till>> {
    let till = sqlx::query_as::<_, Till>(&format!(
        "SELECT {TILL_COLUMNS} FROM tills WHERE branch_id = ?1 AND state = 'open'"
    ))
    .bind(branch_id)
    .fetch_optional(conn)
    .await?;
    Ok(till)
}

/// Most recently opened open till of a cashier.
async fn find_open_for_cashier(conn: &mut SqliteConnection, cashier_id: &str) -> DbResult<Option<Till>> {
    let till = sqlx::query_as::<_, Till>(&format!(
        "SELECT {TILL_COLUMNS} FROM tills WHERE cashier_id = ?1 AND state = 'open'
         ORDER BY opened_at DESC LIMIT 1"
    ))
    .bind(cashier_id)
    .fetch_optional(conn)
    .await?;
    Ok(till)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{file_db, memory_db, Shop};
    use caja_core::ErrorKind;

    #[tokio::test]
    async fn test_open_and_resolve_own_till() {
        let shop = Shop::new(memory_db().await).await;
        let till = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 500_000).await.unwrap();

        assert!(till.is_open());
        assert_eq!(till.closing_cash_cents, None);

        let current = shop.db.tills().resolve_current(&shop.cashier.id, None).await.unwrap().unwrap();
        assert_eq!(current.id, till.id);
        let in_branch = shop.db.tills().open_in_branch(&shop.branch.id).await.unwrap().unwrap();
        assert_eq!(in_branch.id, till.id);
    }

    #[tokio::test]
    async fn test_second_open_in_branch_is_rejected() {
        let shop = Shop::new(memory_db().await).await;
        let first = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 500_000).await.unwrap();

        let err = shop.db.tills().open(&shop.admin.id, &shop.branch.id, 0).await.unwrap_err();
        match err {
            DbError::Core(CoreError::TillAlreadyOpen { till_id, .. }) => assert_eq!(till_id, first.id),
            other => panic!("expected TillAlreadyOpen, got {other:?}"),
        }

        let unchanged = shop.db.tills().get(&first.id).await.unwrap().unwrap();
        assert!(unchanged.is_open());
        assert_eq!(unchanged.opening_float_cents, 500_000);
    }

    #[tokio::test]
    async fn test_cashier_limited_to_one_open_till() {
        let shop = Shop::new(memory_db().await).await;
        let norte = shop.db.branches().create("Norte").await.unwrap();
        shop.db.cashiers().authorize_branch(&shop.cashier.id, &norte.id).await.unwrap();

        let first = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();
        let err = shop.db.tills().open(&shop.cashier.id, &norte.id, 0).await.unwrap_err();
        match err {
            DbError::Core(CoreError::CashierAlreadyHasOpenTill { till_id, .. }) => assert_eq!(till_id, first.id),
            other => panic!("expected CashierAlreadyHasOpenTill, got {other:?}"),
        }

        // admins may run several branches at once
        let sur = shop.db.branches().create("Sur").await.unwrap();
        shop.db.tills().open(&shop.admin.id, &norte.id, 0).await.unwrap();
        shop.db.tills().open(&shop.admin.id, &sur.id, 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_requires_authorization_and_valid_float() {
        let shop = Shop::new(memory_db().await).await;
        let norte = shop.db.branches().create("Norte").await.unwrap();

        let err = shop.db.tills().open(&shop.cashier.id, &norte.id, 0).await.unwrap_err();
        assert_eq!(err.as_core().map(CoreError::kind), Some(ErrorKind::Forbidden));

        let err = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, -1).await.unwrap_err();
        assert_eq!(err.as_core().map(CoreError::kind), Some(ErrorKind::Validation));

        let err = shop.db.tills().open(&shop.admin.id, "nowhere", 0).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::BranchNotFound(_))));

        assert!(shop.db.tills().open_in_branch(&shop.branch.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_is_one_way() {
        let shop = Shop::new(memory_db().await).await;
        let till = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 500_000).await.unwrap();

        let summary = shop.db.tills().close(&till.id, &shop.cashier.id).await.unwrap();
        assert_eq!(summary.state, TillState::Closed);
        assert_eq!(summary.closing_cash.cents(), 500_000);
        assert_eq!(summary.totals.sale_count, 0);

        let closed = shop.db.tills().get(&till.id).await.unwrap().unwrap();
        let err = shop.db.tills().close(&till.id, &shop.cashier.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::TillAlreadyClosed { .. })));

        let again = shop.db.tills().get(&till.id).await.unwrap().unwrap();
        assert_eq!(again.closed_at, closed.closed_at);
        assert_eq!(again.closing_cash_cents, Some(500_000));
        assert_eq!(again.total_sales_cents, closed.total_sales_cents);

        // the branch is free again
        shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_close_requires_owner_or_admin() {
        let shop = Shop::new(memory_db().await).await;
        let other = shop
            .db
            .cashiers()
            .create("beto", false, Some(&shop.branch.id))
            .await
            .unwrap();
        let till = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();

        let err = shop.db.tills().close(&till.id, &other.id).await.unwrap_err();
        assert_eq!(err.as_core().map(CoreError::kind), Some(ErrorKind::Forbidden));

        shop.db.tills().close(&till.id, &shop.admin.id).await.unwrap();

        let err = shop.db.tills().close("missing", &shop.admin.id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::TillNotFound(_))));
    }

    #[tokio::test]
    async fn test_resolve_current_rules() {
        let shop = Shop::new(memory_db().await).await;
        let norte = shop.db.branches().create("Norte").await.unwrap();
        let other = shop.db.cashiers().create("beto", false, Some(&norte.id)).await.unwrap();

        let mine = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();
        let theirs = shop.db.tills().open(&other.id, &norte.id, 0).await.unwrap();

        // a non-admin naming someone else's open till gets nothing, not their own
        assert!(shop
            .db
            .tills()
            .resolve_current(&shop.cashier.id, Some(&theirs.id))
            .await
            .unwrap()
            .is_none());

        // a missing or unknown hint falls back to the cashier's own till
        let resolved = shop.db.tills().resolve_current(&shop.cashier.id, None).await.unwrap().unwrap();
        assert_eq!(resolved.id, mine.id);
        let resolved = shop
            .db
            .tills()
            .resolve_current(&shop.cashier.id, Some("unknown"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, mine.id);

        // admin may resume any open till
        let resolved = shop
            .db
            .tills()
            .resolve_current(&shop.admin.id, Some(&theirs.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, theirs.id);

        // admin without a till of their own and no hint
        assert!(shop.db.tills().resolve_current(&shop.admin.id, None).await.unwrap().is_none());

        // closed tills never resolve
        shop.db.tills().close(&mine.id, &shop.cashier.id).await.unwrap();
        assert!(shop
            .db
            .tills()
            .resolve_current(&shop.cashier.id, Some(&mine.id))
            .await
            .unwrap()
            .is_none());

        // a closed hint falls back to the cashier's new open till
        let fresh = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();
        let resolved = shop
            .db
            .tills()
            .resolve_current(&shop.cashier.id, Some(&mine.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.id, fresh.id);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let shop = Shop::new(memory_db().await).await;
        let first = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();
        shop.db.tills().close(&first.id, &shop.cashier.id).await.unwrap();
        let second = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();

        let ids: Vec<String> = shop
            .db
            .tills()
            .history(Some(&shop.branch.id), DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

        assert_eq!(shop.db.tills().history(None, 1).await.unwrap()[0].id, second.id);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_opens_admit_exactly_one() {
        let dir = tempfile::tempdir().unwrap();
        let shop = Shop::new(file_db(&dir).await).await;

        let mut cashiers = Vec::new();
        for i in 0..8 {
            let cashier = shop
                .db
                .cashiers()
                .create(&format!("cajero{i}"), false, Some(&shop.branch.id))
                .await
                .unwrap();
            cashiers.push(cashier);
        }

        let mut handles = Vec::new();
        for cashier in cashiers {
            let db = shop.db.clone();
            let branch_id = shop.branch.id.clone();
            handles.push(tokio::spawn(async move {
                db.tills().open(&cashier.id, &branch_id, 10_000).await
            }));
        }

        let mut opened = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => opened += 1,
                Err(DbError::Core(CoreError::TillAlreadyOpen { .. })) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(opened, 1);
        assert_eq!(rejected, 7);

        let open: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tills WHERE state = 'open'")
            .fetch_one(shop.db.pool())
            .await
            .unwrap();
        assert_eq!(open, 1);
    }
}
