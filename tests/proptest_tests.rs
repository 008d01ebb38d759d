//! Property-based tests for the monetary computation.
//!
//! Run with: `cargo test --test proptest_tests`

use chrono::{TimeZone, Utc};
use fiskal::core::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ── Proptest Strategies ─────────────────────────────────────────────────────

/// Unit price with up to four decimals (0.0001 to 9999.9999), so products
/// regularly land on the half-cent boundary.
fn arb_price() -> impl Strategy<Value = i64> {
    1i64..100_000_000i64
}

/// Quantity 1 to 100.
fn arb_quantity() -> impl Strategy<Value = i64> {
    1i64..=100i64
}

fn arb_tax() -> impl Strategy<Value = Tax> {
    prop_oneof![
        Just(dec!(0.25)),
        Just(dec!(0.13)),
        Just(dec!(0.05)),
        Just(dec!(0)),
    ]
    .prop_map(|rate| Tax::new(TaxType::ValueAdded, TaxCategory::Standard, rate).unwrap())
}

fn arb_surcharge() -> impl Strategy<Value = Option<Surcharge>> {
    prop::option::of(
        (prop_oneof![Just("Povratna naknada"), Just("Ambalaža")], 0i64..500i64)
            .prop_map(|(name, cents)| Surcharge::new(name, Decimal::new(cents, 2)).unwrap()),
    )
}

fn arb_line() -> impl Strategy<Value = LineItem> {
    (
        arb_quantity(),
        arb_price(),
        arb_tax(),
        prop::option::of(0u32..=100u32),
        arb_surcharge(),
    )
        .prop_map(|(qty, price, tax, discount_pct, surcharge)| {
            let mut builder =
                LineItemBuilder::new(Decimal::from(qty), Decimal::new(price, 4)).tax(tax);
            if let Some(pct) = discount_pct {
                builder = builder.discount_rate(Decimal::new(i64::from(pct), 2));
            }
            if let Some(surcharge) = surcharge {
                builder = builder.surcharge(surcharge);
            }
            builder.build().unwrap()
        })
}

fn build(lines: Vec<LineItem>) -> Invoice {
    let mut builder = InvoiceBuilder::new(
        "1",
        "POSL1",
        "1",
        Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap(),
    )
    .seller(Party::new("69416340824"))
    .operator(Party::new("12345678903"));
    for line in lines {
        builder = builder.add_line(line);
    }
    builder.build().unwrap()
}

/// Reference rounding on integers: ten-thousandths to hundredths, half away
/// from zero.
fn round_ten_thousandths(value: i64) -> Decimal {
    let cents = if value >= 0 {
        (value + 50) / 100
    } else {
        (value - 50) / 100
    };
    Decimal::new(cents, 2)
}

// ── Property Tests ──────────────────────────────────────────────────────────

proptest! {
    /// gross() is the product rounded half away from zero to two decimals.
    #[test]
    fn gross_rounds_half_away_from_zero(qty in arb_quantity(), price in arb_price()) {
        let line = LineItem::new(Decimal::from(qty), Decimal::new(price, 4)).unwrap();
        prop_assert_eq!(line.gross(), round_ten_thousandths(qty * price));

        let mut reversed = line.clone();
        reversed.reverse();
        prop_assert_eq!(reversed.gross(), round_ten_thousandths(-qty * price));
    }

    /// total = subtotal + tax + surcharge for every line and the invoice.
    #[test]
    fn totals_are_consistent(lines in prop::collection::vec(arb_line(), 1..=8)) {
        for line in &lines {
            prop_assert_eq!(line.total(), line.subtotal() + line.tax() + line.surcharge());
            prop_assert_eq!(line.subtotal(), line.gross() - line.discount());
        }
        let invoice = build(lines);
        prop_assert_eq!(
            invoice.total(),
            invoice.subtotal() + invoice.tax() + invoice.surcharge()
        );
        for figure in [invoice.subtotal(), invoice.tax(), invoice.surcharge(), invoice.total()] {
            prop_assert!(figure.scale() <= 2, "{} has more than two decimals", figure);
        }
    }

    /// Reversal flips every quantity-derived figure but not surcharges.
    #[test]
    fn reversal_negates_all_but_surcharges(line in arb_line()) {
        let mut reversed = line.clone();
        reversed.reverse();
        prop_assert_eq!(reversed.gross(), -line.gross());
        prop_assert_eq!(reversed.discount(), -line.discount());
        prop_assert_eq!(reversed.subtotal(), -line.subtotal());
        prop_assert_eq!(reversed.tax(), -line.tax());
        prop_assert_eq!(reversed.surcharge(), line.surcharge());
    }

    /// Merged surcharges sum exactly to the per-line surcharges.
    #[test]
    fn merged_surcharges_sum_exactly(lines in prop::collection::vec(arb_line(), 1..=8)) {
        let expected: Decimal = lines.iter().map(LineItem::surcharge).sum();
        let invoice = build(lines);
        let merged = invoice.surcharges();
        let merged_total: Decimal = merged.iter().map(Surcharge::amount).sum();
        prop_assert_eq!(merged_total, expected);
        prop_assert_eq!(invoice.surcharge(), expected);

        let mut names: Vec<&str> = merged.iter().map(Surcharge::name).collect();
        let count = names.len();
        names.dedup();
        prop_assert_eq!(names.len(), count);
        if merged.is_empty() {
            prop_assert_eq!(format2(invoice.surcharge()), "0.00");
        }
    }

    /// The breakdown accounts for every cent of tax.
    #[test]
    fn breakdown_matches_tax(lines in prop::collection::vec(arb_line(), 1..=8)) {
        let invoice = build(lines);
        let breakdown = invoice.tax_breakdown();
        let declared: Decimal = breakdown.value_added.iter().map(|s| s.amount).sum();
        prop_assert_eq!(declared, invoice.tax());
    }
}

// ── Boundary Cases ──────────────────────────────────────────────────────────

#[test]
fn half_cent_boundary() {
    let line = LineItem::new(dec!(1), dec!(1.125)).unwrap();
    assert_eq!(line.subtotal(), dec!(1.13));
    let line = LineItem::new(dec!(1), dec!(1.115)).unwrap();
    assert_eq!(line.subtotal(), dec!(1.12));
    let line = LineItem::new(dec!(-1), dec!(1.125)).unwrap();
    assert_eq!(line.subtotal(), dec!(-1.13));
}

#[test]
fn rounding_is_applied_per_figure() {
    // 3 × 0.3333 = 0.9999 → gross 1.00; 1.00 × 0.25 = 0.25
    let line = LineItemBuilder::new(dec!(3), dec!(0.3333))
        .tax(Tax::new(TaxType::ValueAdded, TaxCategory::Standard, dec!(0.25)).unwrap())
        .build()
        .unwrap();
    assert_eq!(line.gross(), dec!(1.00));
    assert_eq!(line.tax(), dec!(0.25));
    assert_eq!(line.total(), dec!(1.25));
}

proptest! {
    /// Any line that passes the setters can be totalled without overflow.
    #[test]
    fn accepted_lines_never_overflow(
        qty in any::<i64>(),
        qty_scale in 0u32..=6,
        price in 0i64..=i64::MAX,
        price_scale in 0u32..=6,
    ) {
        let quantity = Decimal::new(qty, qty_scale);
        let unit_price = Decimal::new(price, price_scale);
        let accepted = quantity.abs() <= MAX_MAGNITUDE && unit_price <= MAX_MAGNITUDE;
        match LineItemBuilder::new(quantity, unit_price)
            .tax(Tax::new(TaxType::ValueAdded, TaxCategory::Standard, dec!(0.25)).unwrap())
            .build()
        {
            Ok(line) => {
                prop_assert!(accepted);
                prop_assert_eq!(line.total(), round2(line.subtotal() + line.tax()));
            }
            Err(FiscalError::Validation(_)) => prop_assert!(!accepted),
            Err(other) => prop_assert!(false, "unexpected error: {}", other),
        }
    }
}
