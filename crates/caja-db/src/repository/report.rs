//! # Report Repository
//!
//! Read-only analytics over committed sales. Fetches denormalised facts for
//! a period and hands them to the pure computations in
//! `caja_core::analytics`; never takes the writer lock.
//!
//! ```text
//! ReportFilter ──► facts(current)  ─┐
//!      │                            ├──► build_report ──► SalesReport
//!      └─► previous_period ──► facts(previous) ─┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use caja_core::analytics::{build_report, LineFact, ReportFacts, ReportFilter, SaleFact, SalesReport};
use caja_core::VatRate;

const SALE_FACTS: &str = "SELECT s.id AS sale_id, s.branch_id, b.name AS branch_name,
            s.operator_id AS cashier_id, c.username AS cashier_name,
            s.payment_method, s.total_cents, s.created_at
     FROM sales s
     JOIN branches b ON b.id = s.branch_id
     JOIN cashiers c ON c.id = s.operator_id
     WHERE s.created_at >= ?1 AND s.created_at < ?2
       AND (?3 IS NULL OR s.branch_id = ?3)
       AND (?4 IS NULL OR s.operator_id = ?4)
     ORDER BY s.created_at, s.rowid";

const LINE_FACTS: &str = "SELECT l.sale_id, l.product_id, p.name AS product_name, l.quantity,
            l.unit_price_cents, l.line_total_cents, p.purchase_price_cents, s.created_at
     FROM sale_lines l
     JOIN sales s ON s.id = l.sale_id
     JOIN products p ON p.id = l.product_id
     WHERE s.created_at >= ?1 AND s.created_at < ?2
       AND (?3 IS NULL OR s.branch_id = ?3)
       AND (?4 IS NULL OR s.operator_id = ?4)
     ORDER BY s.created_at, l.rowid";

/// Repository for the analytics read model.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
    vat: VatRate,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool, vat: VatRate) -> Self {
        ReportRepository { pool, vat }
    }

    /// Sales and lines matching `filter`.
    pub async fn facts(&self, filter: &ReportFilter) -> DbResult<ReportFacts> {
        let sales = sqlx::query_as::<_, SaleFact>(SALE_FACTS)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.branch_id)
            .bind(&filter.cashier_id)
            .fetch_all(&self.pool)
            .await?;

        let lines = sqlx::query_as::<_, LineFact>(LINE_FACTS)
            .bind(filter.from)
            .bind(filter.to)
            .bind(&filter.branch_id)
            .bind(&filter.cashier_id)
            .fetch_all(&self.pool)
            .await?;

        debug!(sales = sales.len(), lines = lines.len(), "Report facts loaded");
        Ok(ReportFacts { sales, lines })
    }

    /// Full report for `filter`, compared against the preceding period.
    pub async fn sales_report(&self, filter: &ReportFilter, top_products: usize) -> DbResult<SalesReport> {
        filter.validate()?;

        let current = self.facts(filter).await?;
        let previous = self.facts(&filter.previous_period()).await?;

        Ok(build_report(filter, self.vat, &current, &previous, top_products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::testing::{memory_db, Shop};
    use caja_core::analytics::DEFAULT_TOP_PRODUCTS;
    use caja_core::{CartLine, CoreError, Money, PaymentDetails, PaymentMethod};
    use chrono::{Duration, Utc};

    async fn shop_with_sales() -> Shop {
        let shop = Shop::new(memory_db().await).await;
        let cafe = shop.product_priced("CAFE", 119_000, 50_000, 20).await;
        let pan = shop.product_priced("PAN", 11_900, 5_000, 20).await;
        let till = shop.db.tills().open(&shop.cashier.id, &shop.branch.id, 0).await.unwrap();

        shop.db
            .sales()
            .record_sale(
                &till.id,
                &shop.cashier.id,
                &[CartLine::new(&cafe.id, 1), CartLine::new(&pan.id, 2)],
                &PaymentDetails::cash(Money::from_cents(200_000)),
            )
            .await
            .unwrap();
        shop.db
            .sales()
            .record_sale(
                &till.id,
                &shop.cashier.id,
                &[CartLine::new(&pan.id, 3)],
                &PaymentDetails::card(PaymentMethod::Debit, "OP-1"),
            )
            .await
            .unwrap();
        shop
    }

    fn around_now() -> ReportFilter {
        let now = Utc::now();
        ReportFilter::new(now - Duration::hours(1), now + Duration::hours(1))
    }

    #[tokio::test]
    async fn test_report_over_committed_sales() {
        let shop = shop_with_sales().await;
        let report = shop
            .db
            .reports()
            .sales_report(&around_now(), DEFAULT_TOP_PRODUCTS)
            .await
            .unwrap();

        assert_eq!(report.kpis.transactions, 2);
        assert_eq!(report.kpis.units_sold, 6);
        assert_eq!(report.kpis.revenue.cents(), 119_000 + 5 * 11_900);
        assert_eq!(report.kpis.cost.cents(), 50_000 + 5 * 5_000);
        assert_eq!(report.kpis.best_seller.as_ref().map(|b| b.units), Some(5));
        assert_eq!(report.branches.len(), 1);
        assert_eq!(report.cashiers[0].username, "ana");
        assert_eq!(report.heatmap.len(), 7);
        assert_eq!(report.hourly.len(), 24);

        // nothing happened in the previous period
        assert_eq!(report.comparison.transactions.previous, 0);
        assert_eq!(report.comparison.revenue.change_bps, 10_000);
    }

    #[tokio::test]
    async fn test_filters_narrow_the_facts() {
        let shop = shop_with_sales().await;
        let reports = shop.db.reports();

        let mut filter = around_now();
        filter.cashier_id = Some(shop.admin.id.clone());
        assert!(reports.facts(&filter).await.unwrap().sales.is_empty());

        let mut filter = around_now();
        filter.branch_id = Some(shop.branch.id.clone());
        let facts = reports.facts(&filter).await.unwrap();
        assert_eq!(facts.sales.len(), 2);
        assert_eq!(facts.lines.len(), 3);

        let now = Utc::now();
        let past = ReportFilter::new(now - Duration::days(2), now - Duration::days(1));
        assert!(reports.facts(&past).await.unwrap().sales.is_empty());
    }

    #[tokio::test]
    async fn test_inverted_range_is_rejected() {
        let shop = Shop::new(memory_db().await).await;
        let now = Utc::now();
        let err = shop
            .db
            .reports()
            .sales_report(&ReportFilter::new(now, now - Duration::hours(1)), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }
}
