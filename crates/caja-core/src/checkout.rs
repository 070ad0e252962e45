//! # Checkout Module
//!
//! Pure evaluation of a cart snapshot against the products and stock read
//! inside the sale's atomic unit.
//!
//! ## Where This Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       record_sale (caja-db)                             │
//! │                                                                         │
//! │  prepare_checkout()           ← steps 1-2, before any lock              │
//! │     │  empty cart, quantities, reference / bank                        │
//! │     ▼                                                                   │
//! │  BEGIN IMMEDIATE              ← writer lock held from here              │
//! │     │                                                                   │
//! │  load products (sorted ids) + stock rows                                │
//! │     │                                                                   │
//! │  plan_sale()                  ← steps 3-6, THIS MODULE                  │
//! │     │  not found, wrong branch, stock, total, payment                   │
//! │     ▼                                                                   │
//! │  insert sale + lines, decrement stock, update till, COMMIT              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every check is fail-fast and in order; the first violated rule wins.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CartLine, PaymentDetails, PaymentMethod, Product, SaleType};
use crate::validation::{normalize_optional_text, validate_amount_cents, validate_cart_size, validate_quantity};
use crate::MAX_AMOUNT_CENTS;

/// Longest reference number or bank name we accept.
const MAX_PAYMENT_TEXT_LEN: usize = 100;

// =============================================================================
// Prepared Payment
// =============================================================================

/// Payment data after steps 1-2, normalised for persistence.
///
/// Fields that do not apply to the method are cleared: tendered amount only
/// for cash, reference only for card/transfer, bank only for transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPayment {
    pub method: PaymentMethod,
    pub sale_type: SaleType,
    pub tendered: Money,
    pub reference_number: Option<String>,
    pub bank_name: Option<String>,
}

/// Runs the lock-free part of checkout: cart shape and payment fields.
///
/// ## Order
/// 1. Cart non-empty (then size cap and per-line quantity bounds)
/// 2. Reference number for card/transfer, bank name for transfer
pub fn prepare_checkout(cart: &[CartLine], details: &PaymentDetails) -> CoreResult<PreparedPayment> {
    if cart.is_empty() {
        return Err(CoreError::EmptyCart);
    }
    validate_cart_size(cart.len())?;
    for line in cart {
        validate_quantity(line.quantity)?;
    }

    let method = details.method;
    let reference = normalize_optional_text(
        "reference_number",
        details.reference_number.as_deref(),
        MAX_PAYMENT_TEXT_LEN,
    )?;
    let bank = normalize_optional_text(
        "bank_name",
        details.bank_name.as_deref(),
        MAX_PAYMENT_TEXT_LEN,
    )?;

    if method.requires_reference() && reference.is_none() {
        return Err(CoreError::MissingReferenceNumber { method });
    }
    if method.requires_bank() && bank.is_none() {
        return Err(CoreError::MissingBankName);
    }

    let tendered = if method == PaymentMethod::Cash {
        let tendered = details.tendered().max(Money::zero());
        validate_amount_cents("tendered", tendered.cents())?;
        tendered
    } else {
        Money::zero()
    };

    Ok(PreparedPayment {
        method,
        sale_type: details.sale_type,
        tendered,
        reference_number: if method.requires_reference() { reference } else { None },
        bank_name: if method.requires_bank() { bank } else { None },
    })
}

/// Distinct product ids of the cart in ascending order.
///
/// This is the order stock rows are read in, so that two carts touching the
/// same products always acquire them in the same sequence.
pub fn lock_order(cart: &[CartLine]) -> Vec<String> {
    cart.iter()
        .map(|line| line.product_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

// =============================================================================
// Stock Availability
// =============================================================================

/// Available stock of `product` given its branch stock row (if any).
///
/// Branch-scoped products read the per-branch quantity (a missing row means
/// zero); branch-less products read the legacy field. Never negative.
pub fn available_stock(product: &Product, branch_quantity: Option<i64>) -> i64 {
    let raw = if product.is_branch_scoped() {
        branch_quantity.unwrap_or(0)
    } else {
        product.legacy_stock
    };
    raw.max(0)
}

// =============================================================================
// Sale Plan
// =============================================================================

/// One cart line priced at the product's current sale price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
    /// Decrement per-branch stock (`true`) or the legacy field (`false`).
    pub branch_scoped: bool,
}

/// Everything the storage layer needs to persist a validated sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePlan {
    /// In cart order; duplicate products stay independent lines.
    pub lines: Vec<PricedLine>,
    pub total: Money,
    pub payment: PreparedPayment,
    /// `max(0, tendered - total)` for cash, zero otherwise.
    pub change: Money,
}

impl SalePlan {
    pub fn units(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Evaluates steps 3-6 of checkout against locked state.
///
/// * `products` - every product found for the cart's ids
/// * `available` - available stock per product id (see [`available_stock`])
///
/// Stock is checked cumulatively: when a product appears on several lines,
/// each line is checked against what earlier lines left over.
pub fn plan_sale(
    branch_id: &str,
    cart: &[CartLine],
    products: &HashMap<String, Product>,
    available: &HashMap<String, i64>,
    payment: PreparedPayment,
) -> CoreResult<SalePlan> {
    // 3. existence, naming every missing id once
    let mut missing = Vec::new();
    for line in cart {
        if !products.contains_key(&line.product_id) && !missing.contains(&line.product_id) {
            missing.push(line.product_id.clone());
        }
    }
    if !missing.is_empty() {
        return Err(CoreError::ProductNotFound { ids: missing });
    }

    let resolved: Vec<(&CartLine, &Product)> = cart
        .iter()
        .filter_map(|line| products.get(&line.product_id).map(|p| (line, p)))
        .collect();

    // 4. branch membership
    for (_, product) in &resolved {
        if !product.sellable_at(branch_id) {
            return Err(CoreError::WrongBranch {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                branch_id: branch_id.to_string(),
            });
        }
    }

    // 5. stock, cumulative per product
    let mut remaining: BTreeMap<&str, i64> = BTreeMap::new();
    for (line, product) in &resolved {
        let left = remaining
            .entry(product.id.as_str())
            .or_insert_with(|| available.get(&product.id).copied().unwrap_or(0).max(0));
        if !product.allow_sale_without_stock && *left < line.quantity {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                available: *left,
                requested: line.quantity,
            });
        }
        *left = (*left - line.quantity).max(0);
    }

    // 6. total and payment
    let mut lines = Vec::with_capacity(resolved.len());
    let mut total = Money::zero();
    for (line, product) in &resolved {
        let unit_price = product.sale_price();
        let line_total = unit_price
            .checked_multiply_quantity(line.quantity)
            .ok_or_else(total_out_of_range)?;
        total = total.checked_add(line_total).ok_or_else(total_out_of_range)?;
        lines.push(PricedLine {
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price,
            line_total,
            branch_scoped: product.is_branch_scoped(),
        });
    }
    validate_amount_cents("total", total.cents())?;

    let change = if payment.method == PaymentMethod::Cash {
        if payment.tendered < total {
            return Err(CoreError::InsufficientPayment {
                total,
                tendered: payment.tendered,
                shortfall: total - payment.tendered,
            });
        }
        payment.tendered.saturating_sub_to_zero(total)
    } else {
        Money::zero()
    };

    Ok(SalePlan {
        lines,
        total,
        payment,
        change,
    })
}

fn total_out_of_range() -> CoreError {
    ValidationError::OutOfRange {
        field: "total".to_string(),
        min: 0,
        max: MAX_AMOUNT_CENTS,
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, price_units: i64, branch: Option<&str>, allow: bool) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            sku: id.to_uppercase(),
            name: format!("Producto {id}"),
            purchase_price_cents: 0,
            sale_price_cents: Money::from_units(price_units).cents(),
            branch_id: branch.map(str::to_string),
            allow_sale_without_stock: allow,
            legacy_stock: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(items: Vec<Product>) -> HashMap<String, Product> {
        items.into_iter().map(|p| (p.id.clone(), p)).collect()
    }

    fn stock(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn cash(units: i64) -> PreparedPayment {
        prepare_checkout(
            &[CartLine::new("x", 1)],
            &PaymentDetails::cash(Money::from_units(units)),
        )
        .unwrap()
    }

    #[test]
    fn test_scenario_cash_sale_with_change() {
        let products = catalog(vec![
            product("a", 2500, Some("b1"), false),
            product("b", 2000, Some("b1"), false),
        ]);
        let cart = vec![CartLine::new("a", 2), CartLine::new("b", 1)];
        let plan = plan_sale("b1", &cart, &products, &stock(&[("a", 5), ("b", 5)]), cash(9500)).unwrap();

        assert_eq!(plan.total, Money::from_units(7000));
        assert_eq!(plan.change, Money::from_units(2500));
        assert_eq!(plan.lines[0].line_total, Money::from_units(5000));
        assert_eq!(plan.units(), 3);
    }

    #[test]
    fn test_empty_cart_is_checked_first() {
        let details = PaymentDetails {
            reference_number: None,
            ..PaymentDetails::card(PaymentMethod::Debit, "")
        };
        assert!(matches!(prepare_checkout(&[], &details), Err(CoreError::EmptyCart)));
    }

    #[test]
    fn test_card_without_reference_is_rejected() {
        let cart = vec![CartLine::new("a", 1)];
        let details = PaymentDetails::card(PaymentMethod::Credit, "   ");
        assert!(matches!(
            prepare_checkout(&cart, &details),
            Err(CoreError::MissingReferenceNumber {
                method: PaymentMethod::Credit
            })
        ));
    }

    #[test]
    fn test_transfer_requires_bank() {
        let cart = vec![CartLine::new("a", 1)];
        let mut details = PaymentDetails::transfer("TX-1", "");
        assert!(matches!(prepare_checkout(&cart, &details), Err(CoreError::MissingBankName)));

        details.bank_name = Some("Banco Estado".to_string());
        details.tendered_cents = Some(1_000);
        let prepared = prepare_checkout(&cart, &details).unwrap();
        assert_eq!(prepared.tendered, Money::zero());
        assert_eq!(prepared.bank_name.as_deref(), Some("Banco Estado"));
    }

    #[test]
    fn test_cash_clears_card_fields() {
        let cart = vec![CartLine::new("a", 1)];
        let mut details = PaymentDetails::cash(Money::from_units(10));
        details.reference_number = Some("stray".to_string());
        let prepared = prepare_checkout(&cart, &details).unwrap();
        assert!(prepared.reference_number.is_none());
    }

    #[test]
    fn test_quantity_bounds() {
        let details = PaymentDetails::cash(Money::zero());
        assert!(matches!(
            prepare_checkout(&[CartLine::new("a", 0)], &details),
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            prepare_checkout(&[CartLine::new("a", 1000)], &details),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_missing_products_are_all_named() {
        let products = catalog(vec![product("a", 10, Some("b1"), false)]);
        let cart = vec![
            CartLine::new("zz", 1),
            CartLine::new("a", 1),
            CartLine::new("yy", 1),
            CartLine::new("zz", 2),
        ];
        let err = plan_sale("b1", &cart, &products, &stock(&[("a", 9)]), cash(100)).unwrap_err();
        match err {
            CoreError::ProductNotFound { ids } => assert_eq!(ids, vec!["zz", "yy"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wrong_branch() {
        let products = catalog(vec![
            product("a", 10, Some("b2"), false),
            product("v", 10, None, false),
        ]);
        let err = plan_sale("b1", &[CartLine::new("a", 1)], &products, &stock(&[("a", 5)]), cash(100))
            .unwrap_err();
        assert!(matches!(err, CoreError::WrongBranch { .. }));

        // branch-less but not flagged sellable without stock
        let err = plan_sale("b1", &[CartLine::new("v", 1)], &products, &stock(&[]), cash(100))
            .unwrap_err();
        assert!(matches!(err, CoreError::WrongBranch { .. }));
    }

    #[test]
    fn test_branchless_flagged_product_sells_anywhere() {
        let products = catalog(vec![product("v", 10, None, true)]);
        let plan = plan_sale("b9", &[CartLine::new("v", 3)], &products, &stock(&[("v", 0)]), cash(30))
            .unwrap();
        assert!(!plan.lines[0].branch_scoped);
        assert_eq!(plan.change, Money::zero());
    }

    #[test]
    fn test_duplicate_lines_checked_cumulatively() {
        let products = catalog(vec![product("a", 10, Some("b1"), false)]);
        let cart = vec![CartLine::new("a", 2), CartLine::new("a", 2)];
        let err = plan_sale("b1", &cart, &products, &stock(&[("a", 3)]), cash(100)).unwrap_err();
        match err {
            CoreError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected {other:?}"),
        }

        let plan = plan_sale("b1", &cart, &products, &stock(&[("a", 4)]), cash(100)).unwrap();
        assert_eq!(plan.lines.len(), 2);
    }

    #[test]
    fn test_allow_without_stock_skips_stock_check() {
        let products = catalog(vec![product("a", 10, Some("b1"), true)]);
        let plan = plan_sale("b1", &[CartLine::new("a", 5)], &products, &stock(&[("a", 1)]), cash(50))
            .unwrap();
        assert!(plan.lines[0].branch_scoped);
    }

    #[test]
    fn test_insufficient_payment_reports_shortfall() {
        let products = catalog(vec![product("a", 2500, Some("b1"), false)]);
        let err = plan_sale("b1", &[CartLine::new("a", 2)], &products, &stock(&[("a", 5)]), cash(4000))
            .unwrap_err();
        match err {
            CoreError::InsufficientPayment { shortfall, .. } => {
                assert_eq!(shortfall, Money::from_units(1000))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_card_sale_has_no_change() {
        let products = catalog(vec![product("a", 2500, Some("b1"), false)]);
        let payment =
            prepare_checkout(&[CartLine::new("a", 1)], &PaymentDetails::card(PaymentMethod::Debit, "A1"))
                .unwrap();
        let plan = plan_sale("b1", &[CartLine::new("a", 1)], &products, &stock(&[("a", 1)]), payment)
            .unwrap();
        assert_eq!(plan.change, Money::zero());
        assert_eq!(plan.total, Money::from_units(2500));
    }

    #[test]
    fn test_oversized_totals_are_rejected_not_wrapped() {
        let mut huge = product("h", 0, Some("b1"), true);
        huge.sale_price_cents = i64::MAX / 2;
        let err = plan_sale(
            "b1",
            &[CartLine::new("h", 3)],
            &catalog(vec![huge]),
            &stock(&[]),
            cash(1),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(ValidationError::OutOfRange { .. })));

        let mut big = product("g", 0, Some("b1"), true);
        big.sale_price_cents = MAX_AMOUNT_CENTS;
        let err = plan_sale("b1", &[CartLine::new("g", 2)], &catalog(vec![big]), &stock(&[]), cash(1)).unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn test_tendered_cash_is_bounded() {
        let cart = [CartLine::new("x", 1)];
        let err = prepare_checkout(&cart, &PaymentDetails::cash(Money::from_cents(i64::MAX))).unwrap_err();
        assert!(matches!(err, CoreError::Validation(ref e) if e.field() == "tendered"));

        let ok = prepare_checkout(&cart, &PaymentDetails::cash(Money::from_cents(MAX_AMOUNT_CENTS))).unwrap();
        assert_eq!(ok.tendered.cents(), MAX_AMOUNT_CENTS);

        // card payments ignore whatever was tendered
        let mut card = PaymentDetails::card(PaymentMethod::Debit, "OP-1");
        card.tendered_cents = Some(i64::MAX);
        assert_eq!(prepare_checkout(&cart, &card).unwrap().tendered, Money::zero());
    }

    #[test]
    fn test_lock_order_is_sorted_and_distinct() {
        let cart = vec![CartLine::new("c", 1), CartLine::new("a", 1), CartLine::new("c", 2)];
        assert_eq!(lock_order(&cart), vec!["a", "c"]);
    }

    #[test]
    fn test_available_stock_sources() {
        let mut scoped = product("a", 1, Some("b1"), false);
        assert_eq!(available_stock(&scoped, None), 0);
        assert_eq!(available_stock(&scoped, Some(7)), 7);
        scoped.branch_id = None;
        scoped.legacy_stock = 4;
        assert_eq!(available_stock(&scoped, Some(7)), 4);
        scoped.legacy_stock = -2;
        assert_eq!(available_stock(&scoped, None), 0);
    }
}
