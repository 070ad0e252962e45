//! # Write Transactions
//!
//! The atomic unit every mutating Till Ledger and Sale Engine operation runs in.
//!
//! ## Locking Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WriteTx::begin(pool)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN IMMEDIATE ── another writer active? ──► wait ≤ busy_timeout      │
//! │       │                                              │                  │
//! │       │ writer lock acquired                         └─► LockTimeout    │
//! │       ▼                                                  (retryable,    │
//! │  reads + validation + writes (all on this connection)     nothing done) │
//! │       │                                                                 │
//! │       ├──► commit()   → COMMIT                                          │
//! │       └──► dropped    → connection closed, SQLite rolls back            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock is taken *before* any availability read, so a read inside the
//! unit can never be stale by the time the unit writes.

use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::DbResult;

/// An open `BEGIN IMMEDIATE` transaction on a pooled connection.
pub struct WriteTx {
    conn: PoolConnection<Sqlite>,
    finished: bool,
}

impl WriteTx {
    /// Acquires a connection and the database writer lock.
    pub async fn begin(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        debug!("Write transaction started");
        Ok(WriteTx {
            conn,
            finished: false,
        })
    }

    /// The connection the unit's statements must run on.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn commit(mut self) -> DbResult<()> {
        sqlx::query("COMMIT").execute(&mut *self.conn).await?;
        self.finished = true;
        debug!("Write transaction committed");
        Ok(())
    }

    pub async fn rollback(mut self) -> DbResult<()> {
        sqlx::query("ROLLBACK").execute(&mut *self.conn).await?;
        self.finished = true;
        debug!("Write transaction rolled back");
        Ok(())
    }

    /// Commits on `Ok`, rolls back on `Err` and hands the result back.
    ///
    /// A failed rollback is logged; the original error wins and the
    /// connection is discarded on drop.
    pub async fn finish<T>(self, result: DbResult<T>) -> DbResult<T> {
        match result {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Write transaction dropped without commit; discarding connection");
            self.conn.close_on_drop();
        }
    }
}
