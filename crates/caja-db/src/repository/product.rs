//! # Product Repository (Inventory Store)
//!
//! Catalog entries and the stock primitives the Sale Engine builds on.
//!
//! ## Stock Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.branch_id = 'b1'   →  branch_stock(product, 'b1').quantity    │
//! │                                  (row created lazily, missing = 0)      │
//! │  products.branch_id IS NULL  →  products.legacy_stock                   │
//! │                                                                         │
//! │  Both are clamped at zero on decrement:                                 │
//! │    quantity = MAX(quantity - n, 0)                                      │
//! │  and guarded by CHECK (quantity >= 0).                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `decrement_stock` and `load_locked` are primitives for use inside a
//! [`WriteTx`](crate::tx::WriteTx); they never open a transaction themselves.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::branch::require_branch;
use crate::tx::WriteTx;
use caja_core::checkout::available_stock;
use caja_core::validation::{
    validate_price_cents, validate_product_name, validate_restock_quantity, validate_sku,
    validate_stock_level,
};
use caja_core::{BranchStock, CoreError, Product, ValidationError};

const PRODUCT_COLUMNS: &str = "id, sku, name, purchase_price_cents, sale_price_cents, branch_id, \
     allow_sale_without_stock, legacy_stock, created_at, updated_at";

/// Catalog data for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    pub branch_id: Option<String>,
    #[serde(default)]
    pub allow_sale_without_stock: bool,
    #[serde(default)]
    pub legacy_stock: i64,
}

/// Repository for product and stock operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product.
    pub async fn insert(&self, new: NewProduct) -> DbResult<Product> {
        validate_sku(&new.sku)?;
        validate_product_name(&new.name)?;
        validate_price_cents(new.purchase_price_cents)?;
        validate_price_cents(new.sale_price_cents)?;
        validate_stock_level(new.legacy_stock)?;

        let mut conn = self.pool.acquire().await?;
        if let Some(branch_id) = &new.branch_id {
            require_branch(&mut conn, branch_id).await?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            sku: new.sku.trim().to_string(),
            name: new.name.trim().to_string(),
            purchase_price_cents: new.purchase_price_cents,
            sale_price_cents: new.sale_price_cents,
            branch_id: new.branch_id,
            allow_sale_without_stock: new.allow_sale_without_stock,
            legacy_stock: new.legacy_stock,
            created_at: now,
            updated_at: now,
        };
        debug!(id = %product.id, sku = %product.sku, "Inserting product");

        sqlx::query(
            "INSERT INTO products (
                id, sku, name, purchase_price_cents, sale_price_cents, branch_id,
                allow_sale_without_stock, legacy_stock, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.purchase_price_cents)
        .bind(product.sale_price_cents)
        .bind(&product.branch_id)
        .bind(product.allow_sale_without_stock)
        .bind(product.legacy_stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(product)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Products whose stock lives at `branch_id`, by name.
    pub async fn list_for_branch(&self, branch_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE branch_id = ?1 ORDER BY name"
        ))
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    /// Stock available for sale of `product_id` at `branch_id`.
    ///
    /// Per-branch quantity for branch-assigned products, the legacy field
    /// otherwise. A snapshot: only a read inside a write transaction is
    /// guaranteed to still hold when the transaction writes.
    pub async fn available_stock(&self, product_id: &str, branch_id: &str) -> DbResult<i64> {
        let product = self
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound {
                ids: vec![product_id.to_string()],
            })?;
        let mut conn = self.pool.acquire().await?;
        let row = branch_quantity(&mut conn, product_id, branch_id).await?;
        Ok(available_stock(&product, row))
    }

    /// The per-branch stock row, if it has been created.
    pub async fn branch_stock(&self, product_id: &str, branch_id: &str) -> DbResult<Option<BranchStock>> {
        let row = sqlx::query_as::<_, BranchStock>(
            "SELECT product_id, branch_id, quantity, updated_at
             FROM branch_stock WHERE product_id = ?1 AND branch_id = ?2",
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Adds `quantity` units of stock and returns the new level.
    ///
    /// Branch-assigned products are restocked at their home branch, creating
    /// the row on first use; any other `branch_id` is `WrongBranch`.
    /// Branch-less products add to the legacy field.
    /// Serialised against sales by the writer lock.
    pub async fn restock(&self, product_id: &str, branch_id: &str, quantity: i64) -> DbResult<i64> {
        validate_restock_quantity(quantity)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = restock_in(tx.conn(), product_id, branch_id, quantity).await;
        let level = tx.finish(result).await?;

        info!(product_id, branch_id, quantity, level, "Stock replenished");
        Ok(level)
    }

    /// Overwrites the legacy stock figure of a branch-less product.
    pub async fn set_legacy_stock(&self, product_id: &str, quantity: i64) -> DbResult<()> {
        validate_stock_level(quantity)?;

        let mut tx = WriteTx::begin(&self.pool).await?;
        let result = set_legacy_in(tx.conn(), product_id, quantity).await;
        tx.finish(result).await
    }
}

async fn set_legacy_in(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> DbResult<()> {
    let product = require_product(conn, product_id).await?;
    if product.is_branch_scoped() {
        return Err(ValidationError::InvalidFormat {
            field: "product".to_string(),
            reason: "stock of branch-assigned products is kept per branch".to_string(),
        }
        .into());
    }
    sqlx::query("UPDATE products SET legacy_stock = ?2, updated_at = ?3 WHERE id = ?1")
        .bind(product_id)
        .bind(quantity)
        .bind(Utc::now())
        .execute(conn)
        .await?;
    Ok(())
}

async fn restock_in(conn: &mut SqliteConnection, product_id: &str, branch_id: &str, quantity: i64) -> DbResult<i64> {
    let product = require_product(conn, product_id).await?;
    let now = Utc::now();

    if !product.is_branch_scoped() {
        let level: i64 = sqlx::query_scalar(
            "UPDATE products SET legacy_stock = legacy_stock + ?2, updated_at = ?3
             WHERE id = ?1 RETURNING legacy_stock",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(now)
        .fetch_one(conn)
        .await?;
        return Ok(level);
    }

    if !product.sellable_at(branch_id) {
        return Err(CoreError::WrongBranch {
            product_id: product.id,
            product_name: product.name,
            branch_id: branch_id.to_string(),
        }
        .into());
    }

    require_branch(conn, branch_id).await?;
    let level: i64 = sqlx::query_scalar(
        "INSERT INTO branch_stock (product_id, branch_id, quantity, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (product_id, branch_id)
         DO UPDATE SET quantity = branch_stock.quantity + excluded.quantity,
                       updated_at = excluded.updated_at
         RETURNING quantity",
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(quantity)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(level)
}

// =============================================================================
// Primitives for use inside a WriteTx
// =============================================================================

async fn require_product(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| {
        CoreError::ProductNotFound {
            ids: vec![id.to_string()],
        }
        .into()
    })
}

async fn branch_quantity(conn: &mut SqliteConnection, product_id: &str, branch_id: &str) -> DbResult<Option<i64>> {
    let quantity = sqlx::query_scalar::<_, i64>(
        "SELECT quantity FROM branch_stock WHERE product_id = ?1 AND branch_id = ?2",
    )
    .bind(product_id)
    .bind(branch_id)
    .fetch_optional(conn)
    .await?;
    Ok(quantity)
}

/// Loads products and their available stock at `branch_id`.
///
/// `ids` must be sorted and distinct (see `checkout::lock_order`); the
/// caller must hold the writer lock. Missing ids are simply absent from
/// the returned maps.
pub(crate) async fn load_locked(
    conn: &mut SqliteConnection,
    ids: &[String],
    branch_id: &str,
) -> DbResult<(HashMap<String, Product>, HashMap<String, i64>)> {
    if ids.is_empty() {
        return Ok((HashMap::new(), HashMap::new()));
    }

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY id");
    let products: Vec<Product> = query.build_query_as().fetch_all(&mut *conn).await?;

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT product_id, quantity FROM branch_stock WHERE branch_id = ");
    query.push_bind(branch_id);
    query.push(" AND product_id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");
    let rows: Vec<(String, i64)> = query.build_query_as().fetch_all(&mut *conn).await?;
    let rows: HashMap<String, i64> = rows.into_iter().collect();

    let available = products
        .iter()
        .map(|p| (p.id.clone(), available_stock(p, rows.get(&p.id).copied())))
        .collect();
    let products = products.into_iter().map(|p| (p.id.clone(), p)).collect();
    Ok((products, available))
}

/// Removes `quantity` units of a branch-assigned product at `branch_id`.
///
/// Must run inside a [`WriteTx`]. Clamped at zero; creates the row (at
/// zero) if it did not exist yet. Returns the new quantity.
pub async fn decrement_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    quantity: i64,
) -> DbResult<i64> {
    let level: i64 = sqlx::query_scalar(
        "INSERT INTO branch_stock (product_id, branch_id, quantity, updated_at)
         VALUES (?1, ?2, 0, ?4)
         ON CONFLICT (product_id, branch_id)
         DO UPDATE SET quantity = MAX(branch_stock.quantity - ?3, 0),
                       updated_at = excluded.updated_at
         RETURNING quantity",
    )
    .bind(product_id)
    .bind(branch_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!(product_id, branch_id, quantity, level, "Branch stock decremented");
    Ok(level)
}

/// Legacy-field counterpart of [`decrement_stock`] for branch-less products.
pub async fn decrement_legacy_stock(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> DbResult<i64> {
    let level: i64 = sqlx::query_scalar(
        "UPDATE products SET legacy_stock = MAX(legacy_stock - ?2, 0), updated_at = ?3
         WHERE id = ?1 RETURNING legacy_stock",
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!(product_id, quantity, level, "Legacy stock decremented");
    Ok(level)
}
