use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::builder::InvoiceBuilder;
use super::error::FiscalError;
use super::line_item::LineItem;
use super::money::sum2;
use super::tax::{Surcharge, TaxCategory, TaxType};
use super::validation::{validate_alphanumeric_id, validate_numeric_id};

/// The whole fiscal invoice. Constructed through [`InvoiceBuilder`](super::InvoiceBuilder).
///
/// Monetary figures are not stored: every accessor recomputes them from
/// the lines. Deserialization goes through the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "InvoiceRecord")]
pub struct Invoice {
    pub(crate) number: InvoiceNumber,
    pub(crate) seller: Party,
    pub(crate) operator: Party,
    pub(crate) buyer: Option<Party>,
    pub(crate) lines: Vec<LineItem>,
    pub(crate) payment_method: PaymentMethod,
    pub(crate) sequence_mode: SequenceMode,
    pub(crate) issued_at: DateTime<Utc>,
    pub(crate) subsequent_delivery: bool,
    pub(crate) paragon_number: Option<String>,
    pub(crate) special_purpose: Option<String>,
}

#[derive(Deserialize)]
struct InvoiceRecord {
    number: InvoiceNumber,
    seller: Party,
    operator: Party,
    #[serde(default)]
    buyer: Option<Party>,
    lines: Vec<LineItem>,
    payment_method: PaymentMethod,
    sequence_mode: SequenceMode,
    issued_at: DateTime<Utc>,
    #[serde(default)]
    subsequent_delivery: bool,
    #[serde(default)]
    paragon_number: Option<String>,
    #[serde(default)]
    special_purpose: Option<String>,
}

impl TryFrom<InvoiceRecord> for Invoice {
    type Error = FiscalError;

    fn try_from(record: InvoiceRecord) -> Result<Self, Self::Error> {
        let InvoiceNumber {
            sequential,
            business_location,
            register,
        } = record.number;
        let mut builder =
            InvoiceBuilder::new(sequential, business_location, register, record.issued_at)
                .seller(record.seller)
                .operator(record.operator)
                .payment_method(record.payment_method)
                .sequence_mode(record.sequence_mode)
                .subsequent_delivery(record.subsequent_delivery);
        if let Some(buyer) = record.buyer {
            builder = builder.buyer(buyer);
        }
        if let Some(paragon) = record.paragon_number {
            builder = builder.paragon_number(paragon);
        }
        if let Some(text) = record.special_purpose {
            builder = builder.special_purpose(text);
        }
        for line in record.lines {
            builder = builder.add_line(line);
        }
        builder.build()
    }
}

/// Three-part invoice number: `sequential/business_location/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceNumber {
    /// `BrOznRac`: sequential number, 1–20 digits.
    pub sequential: String,
    /// `OznPosPr`: business location id, 1–20 letters or digits.
    pub business_location: String,
    /// `OznNapUr`: register (device) id, 1–20 digits.
    pub register: String,
}

impl std::fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.sequential, self.business_location, self.register
        )
    }
}

/// Validate the three number parts against their patterns.
pub fn validate_invoice_number(number: &InvoiceNumber) -> Result<(), FiscalError> {
    validate_numeric_id("number.sequential", &number.sequential)?;
    validate_alphanumeric_id("number.business_location", &number.business_location)?;
    validate_numeric_id("number.register", &number.register)
}

/// A party identified by its OIB.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub oib: String,
    pub name: Option<String>,
    /// Whether the party is registered in the VAT system (USustPdv).
    pub vat_liable: bool,
}

impl Party {
    pub fn new(oib: impl Into<String>) -> Self {
        Self {
            oib: oib.into(),
            name: None,
            vat_liable: true,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn vat_liable(mut self, liable: bool) -> Self {
        self.vat_liable = liable;
        self
    }
}

/// Payment method (NacinPlac).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// `G`: banknotes and coins.
    Cash,
    /// `K`: cards.
    Card,
    /// `C`: cheque.
    Check,
    /// `T`: bank transfer.
    Transfer,
    /// `O`: other.
    Other,
}

impl PaymentMethod {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cash => "G",
            Self::Card => "K",
            Self::Check => "C",
            Self::Transfer => "T",
            Self::Other => "O",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "G" => Some(Self::Cash),
            "K" => Some(Self::Card),
            "C" => Some(Self::Check),
            "T" => Some(Self::Transfer),
            "O" => Some(Self::Other),
            _ => None,
        }
    }
}

/// How sequential numbers are allocated (OznSlijed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceMode {
    /// `P`: one sequence per business location.
    BusinessLocation,
    /// `N`: one sequence per register device.
    Register,
}

impl SequenceMode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::BusinessLocation => "P",
            Self::Register => "N",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "P" => Some(Self::BusinessLocation),
            "N" => Some(Self::Register),
            _ => None,
        }
    }
}

/// Tax summed across lines for one distinct rate (and name, for other taxes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub rate: Decimal,
    pub name: Option<String>,
    pub base: Decimal,
    pub amount: Decimal,
}

/// Declared taxes grouped into the three tax blocks of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub value_added: Vec<TaxSummary>,
    pub consumption: Vec<TaxSummary>,
    pub other: Vec<TaxSummary>,
}

impl TaxBreakdown {
    fn bucket_mut(&mut self, tax_type: TaxType) -> &mut Vec<TaxSummary> {
        match tax_type {
            TaxType::ValueAdded => &mut self.value_added,
            TaxType::Consumption => &mut self.consumption,
            TaxType::Other => &mut self.other,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value_added.is_empty() && self.consumption.is_empty() && self.other.is_empty()
    }
}

impl Invoice {
    pub fn number(&self) -> &InvoiceNumber {
        &self.number
    }

    pub fn seller(&self) -> &Party {
        &self.seller
    }

    pub fn operator(&self) -> &Party {
        &self.operator
    }

    pub fn buyer(&self) -> Option<&Party> {
        self.buyer.as_ref()
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn sequence_mode(&self) -> SequenceMode {
        self.sequence_mode
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn subsequent_delivery(&self) -> bool {
        self.subsequent_delivery
    }

    pub fn paragon_number(&self) -> Option<&str> {
        self.paragon_number.as_deref()
    }

    pub fn special_purpose(&self) -> Option<&str> {
        self.special_purpose.as_deref()
    }

    pub fn subtotal(&self) -> Decimal {
        sum2(self.lines.iter().map(LineItem::subtotal))
    }

    pub fn tax(&self) -> Decimal {
        sum2(self.lines.iter().map(LineItem::tax))
    }

    pub fn surcharge(&self) -> Decimal {
        sum2(self.lines.iter().map(LineItem::surcharge))
    }

    pub fn margin(&self) -> Decimal {
        sum2(self.lines.iter().filter_map(LineItem::margin))
    }

    pub fn total(&self) -> Decimal {
        sum2(self.lines.iter().map(LineItem::total))
    }

    /// Group the per-line tax entries by tax type, then by rate.
    ///
    /// Exempt and outside-scope entries are left out; they are declared
    /// through [`Invoice::vat_exempt_amount`] and
    /// [`Invoice::amount_outside_vat_scope`].
    pub fn tax_breakdown(&self) -> TaxBreakdown {
        let mut breakdown = TaxBreakdown::default();
        for entry in self.lines.iter().flat_map(LineItem::tax_breakdown) {
            if !entry.category.is_declared_in_breakdown() {
                continue;
            }
            let name = match entry.tax_type {
                TaxType::Other => entry.name.clone(),
                _ => None,
            };
            let bucket = breakdown.bucket_mut(entry.tax_type);
            match bucket
                .iter_mut()
                .find(|s| s.rate == entry.rate && s.name == name)
            {
                Some(summary) => {
                    summary.base = sum2([summary.base, entry.base]);
                    summary.amount = sum2([summary.amount, entry.amount]);
                }
                None => bucket.push(TaxSummary {
                    rate: entry.rate,
                    name,
                    base: entry.base,
                    amount: entry.amount,
                }),
            }
        }
        breakdown
    }

    /// Surcharges of all lines, merged by name in first-seen order.
    pub fn surcharges(&self) -> Vec<Surcharge> {
        let mut merged: Vec<(String, Decimal)> = Vec::new();
        for surcharge in self.lines.iter().flat_map(LineItem::surcharges) {
            match merged.iter_mut().find(|(name, _)| name == surcharge.name()) {
                Some((_, amount)) => *amount += surcharge.amount(),
                None => merged.push((surcharge.name().to_string(), surcharge.amount())),
            }
        }
        merged
            .into_iter()
            .map(|(name, amount)| Surcharge::merged(name, amount))
            .collect()
    }

    /// Sum of subtotals of lines whose VAT entry is exempt.
    pub fn vat_exempt_amount(&self) -> Decimal {
        self.subtotal_where_vat(TaxCategory::Exempt)
    }

    /// Sum of subtotals of lines whose VAT entry is outside the VAT scope.
    pub fn amount_outside_vat_scope(&self) -> Decimal {
        self.subtotal_where_vat(TaxCategory::OutsideScope)
    }

    fn subtotal_where_vat(&self, category: TaxCategory) -> Decimal {
        sum2(
            self.lines
                .iter()
                .filter(|l| {
                    l.tax_of(TaxType::ValueAdded)
                        .is_some_and(|t| t.category() == category)
                })
                .map(LineItem::subtotal),
        )
    }

    /// A storno copy of this invoice under a new number: every line
    /// reversed, all other fields unchanged.
    pub fn reversed(&self, number: InvoiceNumber) -> Result<Invoice, FiscalError> {
        validate_invoice_number(&number)?;
        let mut copy = self.clone();
        copy.number = number;
        for line in &mut copy.lines {
            line.reverse();
        }
        Ok(copy)
    }
}
