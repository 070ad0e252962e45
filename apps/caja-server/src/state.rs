//! # Application State
//!
//! Shared by every handler. `Database` wraps a `SqlitePool`, so cloning the
//! state per request is cheap and handlers run fully concurrently; all
//! coordination between them happens inside SQLite.

use caja_db::Database;

#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
