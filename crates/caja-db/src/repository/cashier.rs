//! # Cashier Repository
//!
//! Operators of tills and the branches they are authorised for.
//!
//! Credentials live with the authentication collaborator; this table only
//! records identity, `is_admin`, the assigned branch and the authorisations
//! checked when opening a till.
//!
//! ```text
//! Admin        → may open in any branch, operate any open till
//! Non-admin    → may open only in branches listed in cashier_branches,
//!                operate only their own open till
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::branch::require_branch;
use caja_core::validation::validate_username;
use caja_core::{Cashier, CoreError};

const CASHIER_COLUMNS: &str = "id, username, is_admin, branch_id, created_at";

/// Repository for cashier database operations.
#[derive(Debug, Clone)]
pub struct CashierRepository {
    pool: SqlitePool,
}

impl CashierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashierRepository { pool }
    }

    /// Registers a cashier.
    ///
    /// A non-admin with an assigned branch is also authorised for it.
    pub async fn create(
        &self,
        username: &str,
        is_admin: bool,
        branch_id: Option<&str>,
    ) -> DbResult<Cashier> {
        validate_username(username)?;

        let mut conn = self.pool.acquire().await?;
        if let Some(branch_id) = branch_id {
            require_branch(&mut conn, branch_id).await?;
        }

        let cashier = Cashier {
            id: Uuid::new_v4().to_string(),
            username: username.trim().to_string(),
            is_admin,
            branch_id: branch_id.map(str::to_string),
            created_at: Utc::now(),
        };
        debug!(id = %cashier.id, username = %cashier.username, is_admin, "Creating cashier");

        sqlx::query(
            "INSERT INTO cashiers (id, username, is_admin, branch_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&cashier.id)
        .bind(&cashier.username)
        .bind(cashier.is_admin)
        .bind(&cashier.branch_id)
        .bind(cashier.created_at)
        .execute(&mut *conn)
        .await?;

        if let (false, Some(branch_id)) = (is_admin, branch_id) {
            insert_authorization(&mut conn, &cashier.id, branch_id).await?;
        }

        Ok(cashier)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Cashier>> {
        let mut conn = self.pool.acquire().await?;
        find_cashier(&mut conn, id).await
    }

    /// Loads a cashier or fails with `CashierNotFound`.
    pub async fn require(&self, id: &str) -> DbResult<Cashier> {
        let mut conn = self.pool.acquire().await?;
        require_cashier(&mut conn, id).await
    }

    /// Authorises a cashier to open tills in `branch_id`. Idempotent.
    pub async fn authorize_branch(&self, cashier_id: &str, branch_id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        require_cashier(&mut conn, cashier_id).await?;
        require_branch(&mut conn, branch_id).await?;
        debug!(cashier_id, branch_id, "Authorizing cashier for branch");
        insert_authorization(&mut conn, cashier_id, branch_id).await
    }

    /// Branch ids a non-admin cashier may open a till in.
    pub async fn authorized_branches(&self, cashier_id: &str) -> DbResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT branch_id FROM cashier_branches WHERE cashier_id = ?1 ORDER BY branch_id",
        )
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }
}

async fn insert_authorization(conn: &mut SqliteConnection, cashier_id: &str, branch_id: &str) -> DbResult<()> {
    sqlx::query("INSERT OR IGNORE INTO cashier_branches (cashier_id, branch_id) VALUES (?1, ?2)")
        .bind(cashier_id)
        .bind(branch_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn find_cashier(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Cashier>> {
    let cashier = sqlx::query_as::<_, Cashier>(&format!(
        "SELECT {CASHIER_COLUMNS} FROM cashiers WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(cashier)
}

pub(crate) async fn require_cashier(conn: &mut SqliteConnection, id: &str) -> DbResult<Cashier> {
    find_cashier(conn, id)
        .await?
        .ok_or_else(|| CoreError::CashierNotFound(id.to_string()).into())
}

/// Whether `cashier` may open a till in `branch_id`. Admins always may.
pub(crate) async fn is_authorized_for(
    conn: &mut SqliteConnection,
    cashier: &Cashier,
    branch_id: &str,
) -> DbResult<bool> {
    if cashier.is_admin {
        return Ok(true);
    }
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM cashier_branches WHERE cashier_id = ?1 AND branch_id = ?2",
    )
    .bind(&cashier.id)
    .bind(branch_id)
    .fetch_optional(conn)
    .await?;
    Ok(found.is_some())
}
