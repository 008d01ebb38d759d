use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::error::FiscalError;
use super::money::{check_magnitude, round2};

/// Maximum length of a tax or surcharge display name.
pub const MAX_NAME_LEN: usize = 100;

/// Kind of tax charged on a line. Each kind is declared in its own block
/// of the fiscal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxType {
    /// `PDV`: value-added tax.
    ValueAdded,
    /// `PNP`: consumption tax.
    Consumption,
    /// Any other named tax.
    Other,
}

impl TaxType {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValueAdded => "vat",
            Self::Consumption => "consumption",
            Self::Other => "other",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "vat" => Some(Self::ValueAdded),
            "consumption" => Some(Self::Consumption),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Tax category of a line's tax entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxCategory {
    Standard,
    Lower,
    /// Exempt from tax; the line subtotal is declared as an exempt amount.
    Exempt,
    /// Taxed at 0%.
    Zero,
    /// Not subject to tax; the line subtotal is declared separately.
    OutsideScope,
    ReverseCharge,
}

impl TaxCategory {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Lower => "lower",
            Self::Exempt => "exempt",
            Self::Zero => "zero",
            Self::OutsideScope => "outside_scope",
            Self::ReverseCharge => "reverse_charge",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "standard" => Some(Self::Standard),
            "lower" => Some(Self::Lower),
            "exempt" => Some(Self::Exempt),
            "zero" => Some(Self::Zero),
            "outside_scope" => Some(Self::OutsideScope),
            "reverse_charge" => Some(Self::ReverseCharge),
            _ => None,
        }
    }

    /// Whether entries of this category are summed into the tax blocks
    /// (exempt and outside-scope amounts are declared on their own).
    pub fn is_declared_in_breakdown(&self) -> bool {
        !matches!(self, Self::Exempt | Self::OutsideScope)
    }
}

/// Default rates per tax type and category.
///
/// Passed explicitly wherever a rate is resolved; the crate holds no
/// process-wide rate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxRates {
    pub vat_standard: Decimal,
    pub vat_lower: Decimal,
    pub consumption_standard: Decimal,
    pub consumption_lower: Option<Decimal>,
}

impl Default for TaxRates {
    fn default() -> Self {
        Self {
            vat_standard: dec!(0.25),
            vat_lower: dec!(0.13),
            consumption_standard: dec!(0.03),
            consumption_lower: None,
        }
    }
}

impl TaxRates {
    /// Rate for a type×category pair, or `None` when the pair has no default.
    pub fn default_rate(&self, tax_type: TaxType, category: TaxCategory) -> Option<Decimal> {
        match (tax_type, category) {
            (
                _,
                TaxCategory::Exempt
                | TaxCategory::Zero
                | TaxCategory::OutsideScope
                | TaxCategory::ReverseCharge,
            ) => Some(Decimal::ZERO),
            (TaxType::ValueAdded, TaxCategory::Standard) => Some(self.vat_standard),
            (TaxType::ValueAdded, TaxCategory::Lower) => Some(self.vat_lower),
            (TaxType::Consumption, TaxCategory::Standard) => Some(self.consumption_standard),
            (TaxType::Consumption, TaxCategory::Lower) => self.consumption_lower,
            (TaxType::Other, _) => None,
        }
    }
}

/// One tax charge on a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TaxRecord")]
pub struct Tax {
    tax_type: TaxType,
    category: TaxCategory,
    rate: Decimal,
    name: Option<String>,
}

impl Tax {
    /// Tax with an explicit rate in `[0, 1]`.
    ///
    /// `TaxType::Other` needs a display name; use [`Tax::named`] for it.
    pub fn new(tax_type: TaxType, category: TaxCategory, rate: Decimal) -> Result<Self, FiscalError> {
        if tax_type == TaxType::Other {
            return Err(FiscalError::invalid(
                "tax.name",
                "taxes of type 'other' require a name",
            ));
        }
        Self::build(tax_type, category, rate, None)
    }

    /// Tax whose rate comes from the default table.
    pub fn with_default_rate(
        tax_type: TaxType,
        category: TaxCategory,
        rates: &TaxRates,
    ) -> Result<Self, FiscalError> {
        let rate = rates.default_rate(tax_type, category).ok_or_else(|| {
            FiscalError::invalid(
                "tax.rate",
                format!(
                    "no default rate for {} tax in category {}",
                    tax_type.code(),
                    category.code()
                ),
            )
        })?;
        Self::new(tax_type, category, rate)
    }

    /// Named tax. Required for `TaxType::Other`, optional display name otherwise.
    pub fn named(
        tax_type: TaxType,
        category: TaxCategory,
        rate: Decimal,
        name: impl Into<String>,
    ) -> Result<Self, FiscalError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(FiscalError::invalid("tax.name", "name must not be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(FiscalError::invalid(
                "tax.name",
                format!("name cannot exceed {MAX_NAME_LEN} characters"),
            ));
        }
        Self::build(tax_type, category, rate, Some(name))
    }

    fn build(
        tax_type: TaxType,
        category: TaxCategory,
        rate: Decimal,
        name: Option<String>,
    ) -> Result<Self, FiscalError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(FiscalError::invalid(
                "tax.rate",
                format!("rate {rate} must be between 0 and 1"),
            ));
        }
        if !category.is_declared_in_breakdown() && !rate.is_zero() {
            return Err(FiscalError::invalid(
                "tax.rate",
                format!("{} entries cannot carry a rate ({rate})", category.code()),
            ));
        }
        Ok(Self {
            tax_type,
            category,
            rate,
            name,
        })
    }

    pub fn tax_type(&self) -> TaxType {
        self.tax_type
    }

    pub fn category(&self) -> TaxCategory {
        self.category
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Deserialize)]
struct TaxRecord {
    tax_type: TaxType,
    category: TaxCategory,
    rate: Decimal,
    #[serde(default)]
    name: Option<String>,
}

impl TryFrom<TaxRecord> for Tax {
    type Error = FiscalError;

    fn try_from(record: TaxRecord) -> Result<Self, Self::Error> {
        match record.name {
            Some(name) => Self::named(record.tax_type, record.category, record.rate, name),
            None => Self::new(record.tax_type, record.category, record.rate),
        }
    }
}

/// A named additive fee on a line (naknada), e.g. a bottle deposit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SurchargeRecord")]
pub struct Surcharge {
    name: String,
    amount: Decimal,
}

impl Surcharge {
    pub fn new(name: impl Into<String>, amount: Decimal) -> Result<Self, FiscalError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(FiscalError::invalid("surcharge.name", "name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(FiscalError::invalid(
                "surcharge.name",
                format!("name cannot exceed {MAX_NAME_LEN} characters"),
            ));
        }
        Ok(Self {
            name,
            amount: round2(check_magnitude("surcharge.amount", amount)?),
        })
    }

    /// Surcharge with an already validated name.
    pub(crate) fn merged(name: String, amount: Decimal) -> Self {
        Self {
            name,
            amount: round2(amount),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

#[derive(Deserialize)]
struct SurchargeRecord {
    name: String,
    amount: Decimal,
}

impl TryFrom<SurchargeRecord> for Surcharge {
    type Error = FiscalError;

    fn try_from(record: SurchargeRecord) -> Result<Self, Self::Error> {
        Self::new(record.name, record.amount)
    }
}
