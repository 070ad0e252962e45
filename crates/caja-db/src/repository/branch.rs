//! # Branch Repository
//!
//! Branches ("sucursales") are plain reference data: each owns a stock pool
//! and hosts at most one open till.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use caja_core::validation::validate_branch_name;
use caja_core::{Branch, CoreError};

const BRANCH_COLUMNS: &str = "id, name, created_at";

/// Repository for branch database operations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    /// Creates a branch with a fresh id.
    pub async fn create(&self, name: &str) -> DbResult<Branch> {
        validate_branch_name(name)?;

        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };
        debug!(id = %branch.id, name = %branch.name, "Creating branch");

        sqlx::query("INSERT INTO branches (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&branch.id)
            .bind(&branch.name)
            .bind(branch.created_at)
            .execute(&self.pool)
            .await?;

        Ok(branch)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Branch>> {
        let mut conn = self.pool.acquire().await?;
        find_branch(&mut conn, id).await
    }

    /// All branches, by name.
    pub async fn list(&self) -> DbResult<Vec<Branch>> {
        let branches = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(branches)
    }
}

pub(crate) async fn find_branch(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Branch>> {
    let branch = sqlx::query_as::<_, Branch>(&format!(
        "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(branch)
}

/// Loads a branch or fails with `BranchNotFound`.
pub(crate) async fn require_branch(conn: &mut SqliteConnection, id: &str) -> DbResult<Branch> {
    find_branch(conn, id)
        .await?
        .ok_or_else(|| CoreError::BranchNotFound(id.to_string()).into())
}
