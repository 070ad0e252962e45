//! # Analytics
//!
//! Sales and profitability reports computed from committed sales.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caja-db ReportRepository                                               │
//! │     SELECT sales  WHERE created_at ∈ [from, to) (+ branch / cashier)    │
//! │     SELECT lines  JOIN products (current purchase price)                │
//! │           │                                                             │
//! │           ▼  ReportFacts { sales: Vec<SaleFact>, lines: Vec<LineFact> } │
//! │                                                                         │
//! │  build_report() ← THIS MODULE (pure)                                    │
//! │     KPIs, payment split, daily series, branches, hourly, heatmap,       │
//! │     product profitability, cashier ranking, previous-period deltas      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Revenue is VAT-inclusive. "Net" figures strip VAT at the configured
//! rate; cost of goods uses each product's *current* purchase price.
//! Percentages are expressed in basis points (12.34% = 1234).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::{div_round_half_up, Money};
use crate::types::{PaymentMethod, VatRate};

/// Default number of rows in the product profitability table.
pub const DEFAULT_TOP_PRODUCTS: usize = 50;

const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

// =============================================================================
// Filter
// =============================================================================

/// Selects the sales a report covers: `from <= created_at < to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReportFilter {
    #[ts(as = "String")]
    pub from: DateTime<Utc>,
    #[ts(as = "String")]
    pub to: DateTime<Utc>,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub cashier_id: Option<String>,
    /// Offset of the store's wall clock from UTC, used for day, hour and
    /// weekday bucketing.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl ReportFilter {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        ReportFilter {
            from,
            to,
            branch_id: None,
            cashier_id: None,
            utc_offset_minutes: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from >= self.to {
            return Err(ValidationError::InvalidFormat {
                field: "to".to_string(),
                reason: "must be after from".to_string(),
            });
        }
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ValidationError::OutOfRange {
                field: "utc_offset_minutes".to_string(),
                min: -(MAX_UTC_OFFSET_MINUTES as i64),
                max: MAX_UTC_OFFSET_MINUTES as i64,
            });
        }
        Ok(())
    }

    /// The period of equal length immediately before this one, same filters.
    pub fn previous_period(&self) -> ReportFilter {
        let span: Duration = self.to - self.from;
        ReportFilter {
            from: self.from - span,
            to: self.from,
            ..self.clone()
        }
    }

    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or(Utc.fix())
    }
}

// =============================================================================
// Facts
// =============================================================================

/// One committed sale, denormalised for reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleFact {
    pub sale_id: String,
    pub branch_id: String,
    pub branch_name: String,
    pub cashier_id: String,
    pub cashier_name: String,
    pub payment_method: PaymentMethod,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// One sale line with the product's current purchase price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LineFact {
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub purchase_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl LineFact {
    fn cost(&self) -> Money {
        Money::from_cents(self.purchase_price_cents).multiply_quantity(self.quantity)
    }
}

/// Everything fetched for one period.
#[derive(Debug, Clone, Default)]
pub struct ReportFacts {
    pub sales: Vec<SaleFact>,
    pub lines: Vec<LineFact>,
}

// =============================================================================
// KPIs
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BestSeller {
    pub product_id: String,
    pub name: String,
    pub units: i64,
}

/// Headline figures for a period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Kpis {
    pub revenue: Money,
    pub net_revenue: Money,
    pub vat: Money,
    /// Cost of goods sold, VAT-inclusive.
    pub cost: Money,
    pub net_cost: Money,
    /// `revenue - cost`.
    pub gross_profit: Money,
    /// `net_revenue - net_cost`.
    pub net_profit: Money,
    /// Net profit over net revenue.
    pub margin_bps: i64,
    pub transactions: i64,
    pub average_ticket: Money,
    pub units_sold: i64,
    pub average_units: f64,
    pub best_seller: Option<BestSeller>,
}

pub fn compute_kpis(facts: &ReportFacts, vat: VatRate) -> Kpis {
    let revenue: Money = facts.sales.iter().map(|s| Money::from_cents(s.total_cents)).sum();
    let cost: Money = facts.lines.iter().map(LineFact::cost).sum();
    let transactions = facts.sales.len() as i64;
    let units_sold: i64 = facts.lines.iter().map(|l| l.quantity).sum();

    let net_revenue = revenue.net_of_vat(vat);
    let net_cost = cost.net_of_vat(vat);
    let net_profit = net_revenue - net_cost;

    let average_units = if transactions > 0 {
        units_sold as f64 / transactions as f64
    } else {
        0.0
    };

    Kpis {
        revenue,
        net_revenue,
        vat: revenue - net_revenue,
        cost,
        net_cost,
        gross_profit: revenue - cost,
        net_profit,
        margin_bps: net_profit.ratio_bps(net_revenue),
        transactions,
        average_ticket: revenue.average_over(transactions),
        units_sold,
        average_units,
        best_seller: best_seller(&facts.lines),
    }
}

fn best_seller(lines: &[LineFact]) -> Option<BestSeller> {
    let mut units: HashMap<&str, (&str, i64)> = HashMap::new();
    for line in lines {
        let entry = units
            .entry(line.product_id.as_str())
            .or_insert((line.product_name.as_str(), 0));
        entry.1 += line.quantity;
    }
    units
        .into_iter()
        .max_by(|(a_id, (a_name, a)), (b_id, (b_name, b))| {
            a.cmp(b)
                .then_with(|| b_name.cmp(a_name))
                .then_with(|| b_id.cmp(a_id))
        })
        .map(|(id, (name, units))| BestSeller {
            product_id: id.to_string(),
            name: name.to_string(),
            units,
        })
}

// =============================================================================
// Breakdowns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentBreakdown {
    pub method: PaymentMethod,
    pub total: Money,
    pub transactions: i64,
}

/// Totals per payment method, methods without sales omitted.
pub fn by_payment_method(sales: &[SaleFact]) -> Vec<PaymentBreakdown> {
    let mut map: BTreeMap<PaymentMethod, (Money, i64)> = BTreeMap::new();
    for sale in sales {
        let entry = map.entry(sale.payment_method).or_default();
        entry.0 += Money::from_cents(sale.total_cents);
        entry.1 += 1;
    }
    map.into_iter()
        .map(|(method, (total, transactions))| PaymentBreakdown {
            method,
            total,
            transactions,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DailyPoint {
    #[ts(as = "String")]
    pub day: NaiveDate,
    pub revenue: Money,
    pub net_profit: Money,
    pub transactions: i64,
}

/// Revenue and net profit per local calendar day, ascending.
pub fn daily_series(facts: &ReportFacts, vat: VatRate, offset: FixedOffset) -> Vec<DailyPoint> {
    let mut days: BTreeMap<NaiveDate, (Money, Money, i64)> = BTreeMap::new();
    for sale in &facts.sales {
        let day = sale.created_at.with_timezone(&offset).date_naive();
        let entry = days.entry(day).or_default();
        entry.0 += Money::from_cents(sale.total_cents);
        entry.2 += 1;
    }
    for line in &facts.lines {
        let day = line.created_at.with_timezone(&offset).date_naive();
        days.entry(day).or_default().1 += line.cost();
    }
    days.into_iter()
        .map(|(day, (revenue, cost, transactions))| DailyPoint {
            day,
            revenue,
            net_profit: revenue.net_of_vat(vat) - cost.net_of_vat(vat),
            transactions,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BranchComparison {
    pub branch_id: String,
    pub branch_name: String,
    pub revenue: Money,
    pub net_profit: Money,
    pub transactions: i64,
}

/// One row per branch with sales, highest revenue first.
pub fn branch_comparison(facts: &ReportFacts, vat: VatRate) -> Vec<BranchComparison> {
    let branch_of: HashMap<&str, &str> = facts
        .sales
        .iter()
        .map(|s| (s.sale_id.as_str(), s.branch_id.as_str()))
        .collect();

    let mut rows: BTreeMap<&str, (&str, Money, Money, i64)> = BTreeMap::new();
    for sale in &facts.sales {
        let entry = rows
            .entry(sale.branch_id.as_str())
            .or_insert((sale.branch_name.as_str(), Money::zero(), Money::zero(), 0));
        entry.1 += Money::from_cents(sale.total_cents);
        entry.3 += 1;
    }
    for line in &facts.lines {
        if let Some(entry) = branch_of
            .get(line.sale_id.as_str())
            .and_then(|branch| rows.get_mut(branch))
        {
            entry.2 += line.cost();
        }
    }

    let mut out: Vec<BranchComparison> = rows
        .into_iter()
        .map(|(id, (name, revenue, cost, transactions))| BranchComparison {
            branch_id: id.to_string(),
            branch_name: name.to_string(),
            revenue,
            net_profit: revenue.net_of_vat(vat) - cost.net_of_vat(vat),
            transactions,
        })
        .collect();
    out.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    out
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TimeBucket {
    pub transactions: i64,
    pub revenue: Money,
}

/// Sales per local hour of day, always 24 buckets.
pub fn hourly_distribution(sales: &[SaleFact], offset: FixedOffset) -> Vec<TimeBucket> {
    let mut buckets = vec![TimeBucket::default(); 24];
    for sale in sales {
        let hour = sale.created_at.with_timezone(&offset).hour() as usize;
        buckets[hour].transactions += 1;
        buckets[hour].revenue += Money::from_cents(sale.total_cents);
    }
    buckets
}

/// Weekday × hour grid, Monday first: `heatmap[weekday][hour]`.
pub fn weekday_hour_heatmap(sales: &[SaleFact], offset: FixedOffset) -> Vec<Vec<TimeBucket>> {
    let mut grid = vec![vec![TimeBucket::default(); 24]; 7];
    for sale in sales {
        let local = sale.created_at.with_timezone(&offset);
        let cell = &mut grid[local.weekday().num_days_from_monday() as usize][local.hour() as usize];
        cell.transactions += 1;
        cell.revenue += Money::from_cents(sale.total_cents);
    }
    grid
}

// =============================================================================
// Rankings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductProfit {
    pub product_id: String,
    pub name: String,
    pub units: i64,
    pub net_revenue: Money,
    pub net_cost: Money,
    pub net_profit: Money,
    pub margin_bps: i64,
}

/// Per-product profitability, best net profit first, at most `limit` rows.
///
/// Net figures are computed per unit (sale price frozen on the line,
/// current purchase price) and multiplied by the quantity.
pub fn product_profitability(lines: &[LineFact], vat: VatRate, limit: usize) -> Vec<ProductProfit> {
    let mut map: HashMap<&str, ProductProfit> = HashMap::new();
    for line in lines {
        let unit_net = Money::from_cents(line.unit_price_cents).net_of_vat(vat);
        let unit_cost_net = Money::from_cents(line.purchase_price_cents).net_of_vat(vat);
        let entry = map.entry(line.product_id.as_str()).or_insert_with(|| ProductProfit {
            product_id: line.product_id.clone(),
            name: line.product_name.clone(),
            units: 0,
            net_revenue: Money::zero(),
            net_cost: Money::zero(),
            net_profit: Money::zero(),
            margin_bps: 0,
        });
        entry.units += line.quantity;
        entry.net_revenue += unit_net * line.quantity;
        entry.net_cost += unit_cost_net * line.quantity;
    }

    let mut rows: Vec<ProductProfit> = map
        .into_values()
        .map(|mut row| {
            row.net_profit = row.net_revenue - row.net_cost;
            row.margin_bps = row.net_profit.ratio_bps(row.net_revenue);
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        b.net_profit
            .cmp(&a.net_profit)
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.truncate(limit);
    rows
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashierRanking {
    pub cashier_id: String,
    pub username: String,
    pub transactions: i64,
    pub revenue: Money,
    pub average_ticket: Money,
}

/// Cashiers by revenue, highest first.
pub fn cashier_ranking(sales: &[SaleFact]) -> Vec<CashierRanking> {
    let mut map: HashMap<&str, CashierRanking> = HashMap::new();
    for sale in sales {
        let entry = map.entry(sale.cashier_id.as_str()).or_insert_with(|| CashierRanking {
            cashier_id: sale.cashier_id.clone(),
            username: sale.cashier_name.clone(),
            transactions: 0,
            revenue: Money::zero(),
            average_ticket: Money::zero(),
        });
        entry.transactions += 1;
        entry.revenue += Money::from_cents(sale.total_cents);
    }
    let mut rows: Vec<CashierRanking> = map
        .into_values()
        .map(|mut row| {
            row.average_ticket = row.revenue.average_over(row.transactions);
            row
        })
        .collect();
    rows.sort_by(|a, b| {
        b.revenue
            .cmp(&a.revenue)
            .then_with(|| a.username.cmp(&b.username))
    });
    rows
}

// =============================================================================
// Period Comparison
// =============================================================================

/// Change of one figure against the previous period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Delta {
    pub current: i64,
    pub previous: i64,
    pub delta: i64,
    /// Relative change; 10000 (100%) when `previous` is zero and `current`
    /// is positive, 0 when both are zero.
    pub change_bps: i64,
}

impl Delta {
    pub fn between(current: i64, previous: i64) -> Self {
        let delta = current - previous;
        let change_bps = if previous == 0 {
            if current > 0 {
                10_000
            } else {
                0
            }
        } else {
            div_round_half_up(delta as i128 * 10_000, previous as i128) as i64
        };
        Delta {
            current,
            previous,
            delta,
            change_bps,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PeriodComparison {
    #[ts(as = "String")]
    pub previous_from: DateTime<Utc>,
    #[ts(as = "String")]
    pub previous_to: DateTime<Utc>,
    /// Revenue, in cents.
    pub revenue: Delta,
    /// Net profit, in cents.
    pub net_profit: Delta,
    pub transactions: Delta,
    /// Margin, in basis points.
    pub margin: Delta,
}

pub fn compare_periods(previous_filter: &ReportFilter, current: &Kpis, previous: &Kpis) -> PeriodComparison {
    PeriodComparison {
        previous_from: previous_filter.from,
        previous_to: previous_filter.to,
        revenue: Delta::between(current.revenue.cents(), previous.revenue.cents()),
        net_profit: Delta::between(current.net_profit.cents(), previous.net_profit.cents()),
        transactions: Delta::between(current.transactions, previous.transactions),
        margin: Delta::between(current.margin_bps, previous.margin_bps),
    }
}

// =============================================================================
// Full Report
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesReport {
    pub filter: ReportFilter,
    pub vat_bps: u32,
    pub kpis: Kpis,
    pub by_payment_method: Vec<PaymentBreakdown>,
    pub daily: Vec<DailyPoint>,
    pub branches: Vec<BranchComparison>,
    pub hourly: Vec<TimeBucket>,
    pub heatmap: Vec<Vec<TimeBucket>>,
    pub top_products: Vec<ProductProfit>,
    pub cashiers: Vec<CashierRanking>,
    pub comparison: PeriodComparison,
}

/// Builds the full report for `filter` from the current and previous
/// period's facts.
pub fn build_report(
    filter: &ReportFilter,
    vat: VatRate,
    current: &ReportFacts,
    previous: &ReportFacts,
    top_products: usize,
) -> SalesReport {
    let offset = filter.offset();
    let kpis = compute_kpis(current, vat);
    let previous_kpis = compute_kpis(previous, vat);

    SalesReport {
        filter: filter.clone(),
        vat_bps: vat.bps(),
        by_payment_method: by_payment_method(&current.sales),
        daily: daily_series(current, vat, offset),
        branches: branch_comparison(current, vat),
        hourly: hourly_distribution(&current.sales, offset),
        heatmap: weekday_hour_heatmap(&current.sales, offset),
        top_products: product_profitability(&current.lines, vat, top_products),
        cashiers: cashier_ranking(&current.sales),
        comparison: compare_periods(&filter.previous_period(), &kpis, &previous_kpis),
        kpis,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        // 2026-03-02 is a Monday
        Utc.with_ymd_and_hms(2026, 3, day, hour, 15, 0).unwrap()
    }

    fn sale(id: &str, branch: &str, cashier: &str, method: PaymentMethod, total: i64, when: DateTime<Utc>) -> SaleFact {
        SaleFact {
            sale_id: id.to_string(),
            branch_id: branch.to_string(),
            branch_name: format!("Sucursal {branch}"),
            cashier_id: cashier.to_string(),
            cashier_name: format!("user-{cashier}"),
            payment_method: method,
            total_cents: total,
            created_at: when,
        }
    }

    fn line(sale_id: &str, product: &str, qty: i64, unit: i64, cost: i64, when: DateTime<Utc>) -> LineFact {
        LineFact {
            sale_id: sale_id.to_string(),
            product_id: product.to_string(),
            product_name: format!("Producto {product}"),
            quantity: qty,
            unit_price_cents: unit,
            line_total_cents: unit * qty,
            purchase_price_cents: cost,
            created_at: when,
        }
    }

    fn facts() -> ReportFacts {
        ReportFacts {
            sales: vec![
                sale("s1", "b1", "c1", PaymentMethod::Cash, 11_900, at(2, 10)),
                sale("s2", "b1", "c2", PaymentMethod::Debit, 23_800, at(2, 10)),
                sale("s3", "b2", "c1", PaymentMethod::Cash, 11_900, at(3, 18)),
            ],
            lines: vec![
                line("s1", "p1", 1, 11_900, 5_950, at(2, 10)),
                line("s2", "p1", 2, 11_900, 5_950, at(2, 10)),
                line("s3", "p2", 1, 11_900, 11_900, at(3, 18)),
            ],
        }
    }

    #[test]
    fn test_kpis() {
        let kpis = compute_kpis(&facts(), VatRate::STANDARD);

        assert_eq!(kpis.revenue.cents(), 47_600);
        assert_eq!(kpis.net_revenue.cents(), 40_000);
        assert_eq!(kpis.vat.cents(), 7_600);
        assert_eq!(kpis.cost.cents(), 29_750);
        assert_eq!(kpis.net_cost.cents(), 25_000);
        assert_eq!(kpis.gross_profit.cents(), 17_850);
        assert_eq!(kpis.net_profit.cents(), 15_000);
        assert_eq!(kpis.margin_bps, 3_750);
        assert_eq!(kpis.transactions, 3);
        assert_eq!(kpis.units_sold, 4);
        assert!((kpis.average_units - 4.0 / 3.0).abs() < 1e-9);

        let best = kpis.best_seller.unwrap();
        assert_eq!(best.product_id, "p1");
        assert_eq!(best.units, 3);
    }

    #[test]
    fn test_empty_period() {
        let kpis = compute_kpis(&ReportFacts::default(), VatRate::STANDARD);
        assert_eq!(kpis.transactions, 0);
        assert_eq!(kpis.average_ticket, Money::zero());
        assert_eq!(kpis.margin_bps, 0);
        assert!(kpis.best_seller.is_none());
    }

    #[test]
    fn test_payment_split_and_series() {
        let facts = facts();
        let split = by_payment_method(&facts.sales);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].method, PaymentMethod::Cash);
        assert_eq!(split[0].total.cents(), 23_800);
        assert_eq!(split[0].transactions, 2);

        let utc = FixedOffset::east_opt(0).unwrap();
        let daily = daily_series(&facts, VatRate::STANDARD, utc);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].revenue.cents(), 35_700);
        assert_eq!(daily[1].net_profit, Money::zero());
    }

    #[test]
    fn test_time_buckets_honour_offset() {
        let facts = facts();
        let utc = FixedOffset::east_opt(0).unwrap();
        let hourly = hourly_distribution(&facts.sales, utc);
        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly[10].transactions, 2);
        assert_eq!(hourly[18].transactions, 1);

        let heatmap = weekday_hour_heatmap(&facts.sales, utc);
        assert_eq!(heatmap.len(), 7);
        assert_eq!(heatmap[0][10].transactions, 2);
        assert_eq!(heatmap[1][18].revenue.cents(), 11_900);

        let minus_three = FixedOffset::west_opt(3 * 3600).unwrap();
        let shifted = hourly_distribution(&facts.sales, minus_three);
        assert_eq!(shifted[7].transactions, 2);
    }

    #[test]
    fn test_branch_and_cashier_rankings() {
        let facts = facts();
        let branches = branch_comparison(&facts, VatRate::STANDARD);
        assert_eq!(branches[0].branch_id, "b1");
        assert_eq!(branches[0].transactions, 2);
        assert_eq!(branches[1].net_profit, Money::zero());

        let cashiers = cashier_ranking(&facts.sales);
        assert_eq!(cashiers.len(), 2);
        assert_eq!(cashiers[0].revenue.cents(), 23_800);
        assert_eq!(cashiers[0].average_ticket.cents(), 11_900);
    }

    #[test]
    fn test_product_profitability_top_n() {
        let rows = product_profitability(&facts().lines, VatRate::STANDARD, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].product_id, "p1");
        assert_eq!(rows[0].units, 3);
        assert_eq!(rows[0].net_profit.cents(), 15_000);
        assert_eq!(rows[0].margin_bps, 5_000);
    }

    #[test]
    fn test_delta_rules() {
        assert_eq!(Delta::between(500, 0).change_bps, 10_000);
        assert_eq!(Delta::between(0, 0).change_bps, 0);
        assert_eq!(Delta::between(150, 100).change_bps, 5_000);
        assert_eq!(Delta::between(50, 100).change_bps, -5_000);
        assert_eq!(Delta::between(50, 100).delta, -50);
    }

    #[test]
    fn test_previous_period_has_equal_length() {
        let mut filter = ReportFilter::new(at(2, 0), at(9, 0));
        filter.branch_id = Some("b1".to_string());
        let previous = filter.previous_period();
        assert_eq!(previous.to, filter.from);
        assert_eq!(previous.to - previous.from, filter.to - filter.from);
        assert_eq!(previous.branch_id.as_deref(), Some("b1"));
    }

    #[test]
    fn test_filter_validation() {
        assert!(ReportFilter::new(at(2, 0), at(2, 0)).validate().is_err());
        let mut filter = ReportFilter::new(at(2, 0), at(3, 0));
        assert!(filter.validate().is_ok());
        filter.utc_offset_minutes = 15 * 60;
        assert!(filter.validate().is_err());
    }

    #[test]
    fn test_build_report() {
        let filter = ReportFilter::new(at(2, 0), at(9, 0));
        let report = build_report(&filter, VatRate::STANDARD, &facts(), &ReportFacts::default(), 10);
        assert_eq!(report.kpis.transactions, 3);
        assert_eq!(report.comparison.revenue.change_bps, 10_000);
        assert_eq!(report.comparison.transactions.previous, 0);
        assert_eq!(report.heatmap.len(), 7);
        assert_eq!(report.top_products.len(), 2);
    }
}
