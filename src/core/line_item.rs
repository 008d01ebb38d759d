use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::FiscalError;
use super::money::{check_magnitude, mul2, parse_decimal, round2, sum2};
use super::tax::{Surcharge, Tax, TaxCategory, TaxType};

/// One billable row of an invoice.
///
/// All derived figures are recomputed on every call; setters validate
/// their input immediately and leave the line untouched on error.
/// Deserialized lines pass through the same setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LineItemRecord")]
pub struct LineItem {
    quantity: Decimal,
    unit_price: Decimal,
    discount: Option<Decimal>,
    discount_rate: Option<Decimal>,
    margin: Option<Decimal>,
    taxes: Vec<Tax>,
    surcharges: Vec<Surcharge>,
}

/// Tax computed for one line and one tax type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxEntry {
    pub rate: Decimal,
    /// Amount the rate was applied to (subtotal, or margin when set).
    pub base: Decimal,
    pub amount: Decimal,
    /// `false` when the category is exempt.
    pub taxable: bool,
    pub name: Option<String>,
    pub tax_type: TaxType,
    pub category: TaxCategory,
}

impl LineItem {
    /// Line with quantity and unit price, no discount, taxes or surcharges.
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Result<Self, FiscalError> {
        let mut line = Self {
            quantity: check_magnitude("line.quantity", quantity)?,
            unit_price: Decimal::ZERO,
            discount: None,
            discount_rate: None,
            margin: None,
            taxes: Vec::new(),
            surcharges: Vec::new(),
        };
        line.set_unit_price(unit_price)?;
        Ok(line)
    }

    /// Set the quantity. Negative quantities are allowed (returns);
    /// magnitudes above [`MAX_MAGNITUDE`](super::money::MAX_MAGNITUDE) are not.
    pub fn set_quantity(&mut self, quantity: Decimal) -> Result<(), FiscalError> {
        self.quantity = check_magnitude("line.quantity", quantity)?;
        Ok(())
    }

    /// Set the quantity from text; non-numeric input is rejected.
    pub fn set_quantity_str(&mut self, quantity: &str) -> Result<(), FiscalError> {
        self.set_quantity(parse_decimal("line.quantity", quantity)?)
    }

    pub fn set_unit_price(&mut self, unit_price: Decimal) -> Result<(), FiscalError> {
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(FiscalError::invalid(
                "line.unit_price",
                format!("unit price {unit_price} must not be negative"),
            ));
        }
        self.unit_price = check_magnitude("line.unit_price", unit_price)?;
        Ok(())
    }

    /// Fixed discount amount. Takes priority over a discount rate.
    pub fn set_discount(&mut self, discount: Decimal) -> Result<(), FiscalError> {
        if discount.is_sign_negative() && !discount.is_zero() {
            return Err(FiscalError::invalid(
                "line.discount",
                format!("discount {discount} must not be negative"),
            ));
        }
        self.discount = Some(round2(check_magnitude("line.discount", discount)?));
        Ok(())
    }

    /// Discount as a fraction of the gross amount, in `[0, 1]`.
    pub fn set_discount_rate(&mut self, rate: Decimal) -> Result<(), FiscalError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(FiscalError::invalid(
                "line.discount_rate",
                format!("discount rate {rate} must be between 0 and 1"),
            ));
        }
        self.discount_rate = Some(rate);
        Ok(())
    }

    /// Margin amount; when set, taxes are computed on it instead of the subtotal.
    pub fn set_margin(&mut self, margin: Decimal) -> Result<(), FiscalError> {
        self.margin = Some(round2(check_magnitude("line.margin", margin)?));
        Ok(())
    }

    /// Add a tax, replacing any existing tax of the same type.
    pub fn add_tax(&mut self, tax: Tax) {
        match self
            .taxes
            .iter_mut()
            .find(|t| t.tax_type() == tax.tax_type())
        {
            Some(existing) => *existing = tax,
            None => self.taxes.push(tax),
        }
    }

    /// Add a surcharge, replacing any existing surcharge with the same name.
    pub fn add_surcharge(&mut self, surcharge: Surcharge) {
        match self
            .surcharges
            .iter_mut()
            .find(|s| s.name() == surcharge.name())
        {
            Some(existing) => *existing = surcharge,
            None => self.surcharges.push(surcharge),
        }
    }

    /// Turn the line into its reversal (storno): the quantity is negated,
    /// together with a fixed discount and margin, so every derived figure
    /// flips sign. Surcharges keep their configured sign.
    pub fn reverse(&mut self) {
        self.quantity = -self.quantity;
        self.discount = self.discount.map(|d| round2(-d));
        self.margin = self.margin.map(|m| round2(-m));
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    pub fn margin(&self) -> Option<Decimal> {
        self.margin
    }

    pub fn taxes(&self) -> &[Tax] {
        &self.taxes
    }

    pub fn surcharges(&self) -> &[Surcharge] {
        &self.surcharges
    }

    /// The line's tax of the given type, if any.
    pub fn tax_of(&self, tax_type: TaxType) -> Option<&Tax> {
        self.taxes.iter().find(|t| t.tax_type() == tax_type)
    }

    pub fn gross(&self) -> Decimal {
        mul2(self.quantity, self.unit_price)
    }

    pub fn discount(&self) -> Decimal {
        if let Some(discount) = self.discount {
            discount
        } else if let Some(rate) = self.discount_rate {
            mul2(self.gross(), rate)
        } else {
            round2(Decimal::ZERO)
        }
    }

    pub fn subtotal(&self) -> Decimal {
        round2(self.gross() - self.discount())
    }

    pub fn taxable_base(&self) -> Decimal {
        self.margin.unwrap_or_else(|| self.subtotal())
    }

    pub fn tax_breakdown(&self) -> Vec<TaxEntry> {
        let base = self.taxable_base();
        self.taxes
            .iter()
            .map(|tax| TaxEntry {
                rate: tax.rate(),
                base,
                amount: mul2(base, tax.rate()),
                taxable: tax.category() != TaxCategory::Exempt,
                name: tax.name().map(str::to_string),
                tax_type: tax.tax_type(),
                category: tax.category(),
            })
            .collect()
    }

    pub fn tax(&self) -> Decimal {
        sum2(self.tax_breakdown().into_iter().map(|e| e.amount))
    }

    pub fn surcharge(&self) -> Decimal {
        sum2(self.surcharges.iter().map(Surcharge::amount))
    }

    pub fn total(&self) -> Decimal {
        round2(self.subtotal() + self.tax() + self.surcharge())
    }
}

/// Serialized shape of a [`LineItem`], validated on the way in.
#[derive(Deserialize)]
struct LineItemRecord {
    quantity: Decimal,
    unit_price: Decimal,
    #[serde(default)]
    discount: Option<Decimal>,
    #[serde(default)]
    discount_rate: Option<Decimal>,
    #[serde(default)]
    margin: Option<Decimal>,
    #[serde(default)]
    taxes: Vec<Tax>,
    #[serde(default)]
    surcharges: Vec<Surcharge>,
}

impl TryFrom<LineItemRecord> for LineItem {
    type Error = FiscalError;

    fn try_from(record: LineItemRecord) -> Result<Self, Self::Error> {
        // A negative fixed discount only occurs on a reversed line; rebuild
        // the original and reverse it again.
        let reversed = record
            .discount
            .is_some_and(|d| d.is_sign_negative() && !d.is_zero());
        let sign = |value: Decimal| if reversed { -value } else { value };

        let mut line = LineItem::new(sign(record.quantity), record.unit_price)?;
        if let Some(discount) = record.discount {
            line.set_discount(sign(discount))?;
        }
        if let Some(rate) = record.discount_rate {
            line.set_discount_rate(rate)?;
        }
        if let Some(margin) = record.margin {
            line.set_margin(sign(margin))?;
        }
        for tax in record.taxes {
            line.add_tax(tax);
        }
        for surcharge in record.surcharges {
            line.add_surcharge(surcharge);
        }
        if reversed {
            line.reverse();
        }
        Ok(line)
    }
}

/// Builder for a line item.
///
/// ```
/// use fiskal::core::*;
/// use rust_decimal_macros::dec;
///
/// let line = LineItemBuilder::new(dec!(2), dec!(10.00))
///     .tax(Tax::new(TaxType::ValueAdded, TaxCategory::Standard, dec!(0.25)).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(line.total(), dec!(25.00));
/// ```
pub struct LineItemBuilder {
    quantity: Decimal,
    quantity_text: Option<String>,
    unit_price: Decimal,
    discount: Option<Decimal>,
    discount_rate: Option<Decimal>,
    margin: Option<Decimal>,
    taxes: Vec<Tax>,
    surcharges: Vec<Surcharge>,
}

impl LineItemBuilder {
    pub fn new(quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            quantity,
            quantity_text: None,
            unit_price,
            discount: None,
            discount_rate: None,
            margin: None,
            taxes: Vec::new(),
            surcharges: Vec::new(),
        }
    }

    /// Quantity given as text, parsed on `build()`.
    pub fn quantity_str(mut self, quantity: impl Into<String>) -> Self {
        self.quantity_text = Some(quantity.into());
        self
    }

    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn discount_rate(mut self, rate: Decimal) -> Self {
        self.discount_rate = Some(rate);
        self
    }

    pub fn margin(mut self, margin: Decimal) -> Self {
        self.margin = Some(margin);
        self
    }

    pub fn tax(mut self, tax: Tax) -> Self {
        self.taxes.push(tax);
        self
    }

    pub fn surcharge(mut self, surcharge: Surcharge) -> Self {
        self.surcharges.push(surcharge);
        self
    }

    pub fn build(self) -> Result<LineItem, FiscalError> {
        let mut line = LineItem::new(self.quantity, self.unit_price)?;
        if let Some(text) = &self.quantity_text {
            line.set_quantity_str(text)?;
        }
        if let Some(discount) = self.discount {
            line.set_discount(discount)?;
        }
        if let Some(rate) = self.discount_rate {
            line.set_discount_rate(rate)?;
        }
        if let Some(margin) = self.margin {
            line.set_margin(margin)?;
        }
        for tax in self.taxes {
            line.add_tax(tax);
        }
        for surcharge in self.surcharges {
            line.add_surcharge(surcharge);
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::money::MAX_MAGNITUDE;
    use rust_decimal_macros::dec;

    fn vat(rate: Decimal) -> Tax {
        Tax::new(TaxType::ValueAdded, TaxCategory::Standard, rate).unwrap()
    }

    #[test]
    fn basic_figures() {
        let line = LineItemBuilder::new(dec!(2), dec!(10.0))
            .tax(vat(dec!(0.25)))
            .build()
            .unwrap();
        assert_eq!(line.gross(), dec!(20.00));
        assert_eq!(line.discount(), dec!(0));
        assert_eq!(line.subtotal(), dec!(20.00));
        assert_eq!(line.tax(), dec!(5.00));
        assert_eq!(line.surcharge(), dec!(0));
        assert_eq!(line.total(), dec!(25.00));
    }

    #[test]
    fn half_cent_boundary_rounds_up() {
        let line = LineItem::new(dec!(1), dec!(1.125)).unwrap();
        assert_eq!(line.subtotal(), dec!(1.13));
    }

    #[test]
    fn fixed_discount_wins_over_rate() {
        let line = LineItemBuilder::new(dec!(3), dec!(9.99))
            .discount(dec!(1.50))
            .discount_rate(dec!(0.5))
            .build()
            .unwrap();
        assert_eq!(line.gross(), dec!(29.97));
        assert_eq!(line.discount(), dec!(1.50));
        assert_eq!(line.subtotal(), dec!(28.47));
    }

    #[test]
    fn discount_rate_is_rounded() {
        let line = LineItemBuilder::new(dec!(1), dec!(10.05))
            .discount_rate(dec!(0.15))
            .build()
            .unwrap();
        // 10.05 * 0.15 = 1.5075 → 1.51
        assert_eq!(line.discount(), dec!(1.51));
        assert_eq!(line.subtotal(), dec!(8.54));
    }

    #[test]
    fn margin_is_the_taxable_base() {
        let line = LineItemBuilder::new(dec!(1), dec!(100))
            .margin(dec!(8.00))
            .tax(vat(dec!(0.25)))
            .build()
            .unwrap();
        assert_eq!(line.taxable_base(), dec!(8.00));
        assert_eq!(line.tax(), dec!(2.00));
        assert_eq!(line.total(), dec!(102.00));
    }

    #[test]
    fn exempt_entries_are_not_taxable() {
        let line = LineItemBuilder::new(dec!(1), dec!(50))
            .tax(Tax::new(TaxType::ValueAdded, TaxCategory::Exempt, dec!(0)).unwrap())
            .build()
            .unwrap();
        let breakdown = line.tax_breakdown();
        assert_eq!(breakdown.len(), 1);
        assert!(!breakdown[0].taxable);
        assert_eq!(breakdown[0].amount, dec!(0));
    }

    #[test]
    fn same_type_tax_is_replaced() {
        let mut line = LineItem::new(dec!(1), dec!(10)).unwrap();
        line.add_tax(vat(dec!(0.25)));
        line.add_tax(vat(dec!(0.13)));
        assert_eq!(line.taxes().len(), 1);
        assert_eq!(line.tax(), dec!(1.30));
    }

    #[test]
    fn setters_fail_fast() {
        let mut line = LineItem::new(dec!(1), dec!(10)).unwrap();
        assert!(line.set_unit_price(dec!(-1)).is_err());
        assert_eq!(line.unit_price(), dec!(10));
        assert!(line.set_discount_rate(dec!(1.5)).is_err());
        assert!(line.set_discount_rate(dec!(-0.1)).is_err());
        assert!(line.set_quantity_str("a lot").is_err());
        assert_eq!(line.quantity(), dec!(1));
        assert!(LineItem::new(dec!(1), dec!(-0.01)).is_err());
    }

    #[test]
    fn oversized_values_are_rejected() {
        let mut line = LineItem::new(dec!(1), dec!(10)).unwrap();
        assert!(matches!(
            line.set_quantity_str("79228162514264337593543950335"),
            Err(FiscalError::Validation(e)) if e.field == "line.quantity"
        ));
        assert_eq!(line.quantity(), dec!(1));
        assert!(line.set_quantity(-Decimal::MAX).is_err());
        assert!(line.set_unit_price(dec!(1000000000000.01)).is_err());
        assert!(line.set_discount(dec!(10000000000000)).is_err());
        assert!(line.set_margin(dec!(-10000000000000)).is_err());
        assert!(LineItem::new(Decimal::MAX, dec!(1)).is_err());
        assert_eq!(line.gross(), dec!(10.00));

        line.set_quantity(MAX_MAGNITUDE).unwrap();
        line.set_unit_price(MAX_MAGNITUDE).unwrap();
        assert_eq!(line.gross(), dec!(1000000000000000000000000));
    }

    #[test]
    fn deserializing_runs_the_setters() {
        let err = serde_json::from_str::<LineItem>(
            r#"{"quantity":"2","unit_price":"-50","discount_rate":"3"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("line.unit_price"), "{err}");

        let err = serde_json::from_str::<LineItem>(
            r#"{"quantity":"2","unit_price":"50","discount_rate":"3"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("line.discount_rate"), "{err}");

        assert!(
            serde_json::from_str::<LineItem>(
                r#"{"quantity":"79228162514264337593543950335","unit_price":"1"}"#
            )
            .is_err()
        );
    }

    #[test]
    fn serialized_lines_read_back() {
        let mut line = LineItemBuilder::new(dec!(2), dec!(10))
            .discount(dec!(2))
            .margin(dec!(5))
            .tax(vat(dec!(0.25)))
            .surcharge(Surcharge::new("Povratna naknada", dec!(0.50)).unwrap())
            .build()
            .unwrap();
        let json = serde_json::to_string(&line).unwrap();
        assert_eq!(serde_json::from_str::<LineItem>(&json).unwrap(), line);

        line.reverse();
        let json = serde_json::to_string(&line).unwrap();
        let back: LineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, line);
        assert_eq!(back.total(), line.total());

        // A returned item (negative quantity) that is then reversed.
        let mut line = LineItemBuilder::new(dec!(-1), dec!(10))
            .discount(dec!(1))
            .build()
            .unwrap();
        line.reverse();
        assert_eq!(line.discount(), dec!(-1.00));
        let json = serde_json::to_string(&line).unwrap();
        assert_eq!(serde_json::from_str::<LineItem>(&json).unwrap(), line);
    }

    #[test]
    fn reverse_flips_everything_but_surcharges() {
        let mut line = LineItemBuilder::new(dec!(2), dec!(10))
            .discount(dec!(2))
            .tax(vat(dec!(0.25)))
            .surcharge(Surcharge::new("Povratna naknada", dec!(0.50)).unwrap())
            .build()
            .unwrap();
        line.reverse();
        assert_eq!(line.quantity(), dec!(-2));
        assert_eq!(line.gross(), dec!(-20.00));
        assert_eq!(line.discount(), dec!(-2.00));
        assert_eq!(line.subtotal(), dec!(-18.00));
        assert_eq!(line.tax(), dec!(-4.50));
        assert_eq!(line.surcharge(), dec!(0.50));
        assert_eq!(line.total(), dec!(-22.00));
    }
}
