//! Fixtures shared by the repository tests.

use tempfile::TempDir;

use crate::repository::NewProduct;
use crate::{Database, DbConfig};
use caja_core::{Branch, Cashier, Product};

pub(crate) async fn memory_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// A file database with enough connections for contention tests.
pub(crate) async fn file_db(dir: &TempDir) -> Database {
    Database::new(DbConfig::new(dir.path().join("caja.db")).max_connections(10))
        .await
        .unwrap()
}

/// One branch with a cashier ("ana") assigned to it and an admin ("root").
pub(crate) struct Shop {
    pub db: Database,
    pub branch: Branch,
    pub cashier: Cashier,
    pub admin: Cashier,
}

impl Shop {
    pub async fn new(db: Database) -> Self {
        let branch = db.branches().create("Centro").await.unwrap();
        let cashier = db.cashiers().create("ana", false, Some(&branch.id)).await.unwrap();
        let admin = db.cashiers().create("root", true, None).await.unwrap();
        Shop {
            db,
            branch,
            cashier,
            admin,
        }
    }

    /// A product of this shop's branch with `stock` units on hand.
    pub async fn product(&self, sku: &str, price_cents: i64, stock: i64) -> Product {
        self.product_in(&self.branch.id, sku, price_cents, stock).await
    }

    pub async fn product_in(&self, branch_id: &str, sku: &str, price_cents: i64, stock: i64) -> Product {
        self.insert(sku, price_cents, price_cents / 2, Some(branch_id), stock, false)
            .await
    }

    pub async fn product_priced(&self, sku: &str, price_cents: i64, cost_cents: i64, stock: i64) -> Product {
        let branch_id = self.branch.id.clone();
        self.insert(sku, price_cents, cost_cents, Some(&branch_id), stock, false)
            .await
    }

    /// A branch-less product tracked in the legacy stock field.
    pub async fn legacy_product(&self, sku: &str, price_cents: i64, stock: i64, allow_without_stock: bool) -> Product {
        self.insert(sku, price_cents, price_cents / 2, None, stock, allow_without_stock)
            .await
    }

    async fn insert(
        &self,
        sku: &str,
        price_cents: i64,
        cost_cents: i64,
        branch_id: Option<&str>,
        stock: i64,
        allow_sale_without_stock: bool,
    ) -> Product {
        let product = self
            .db
            .products()
            .insert(NewProduct {
                sku: sku.to_string(),
                name: format!("Producto {sku}"),
                purchase_price_cents: cost_cents,
                sale_price_cents: price_cents,
                branch_id: branch_id.map(str::to_string),
                allow_sale_without_stock,
                legacy_stock: if branch_id.is_none() { stock } else { 0 },
            })
            .await
            .unwrap();
        if let (Some(branch_id), true) = (branch_id, stock > 0) {
            self.db.products().restock(&product.id, branch_id, stock).await.unwrap();
        }
        product
    }
}
