use chrono::{DateTime, Utc};

use super::error::FiscalError;
use super::invoice::*;
use super::line_item::LineItem;
use super::validation::validate_text_len;

/// Maximum length of a paragon (pre-printed receipt) number.
pub const MAX_PARAGON_LEN: usize = 100;

/// Maximum length of the special-purpose free text.
pub const MAX_SPECIAL_PURPOSE_LEN: usize = 1000;

/// Upper bound on lines per invoice.
pub const MAX_LINES: usize = 10_000;

/// Builder for constructing valid invoices.
///
/// ```
/// use fiskal::core::*;
/// use rust_decimal_macros::dec;
/// use chrono::{TimeZone, Utc};
///
/// let invoice = InvoiceBuilder::new("1", "POSL1", "1", Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap())
///     .seller(Party::new("69416340824"))
///     .operator(Party::new("12345678903"))
///     .payment_method(PaymentMethod::Card)
///     .add_line(LineItemBuilder::new(dec!(2), dec!(10.00))
///         .tax(Tax::new(TaxType::ValueAdded, TaxCategory::Standard, dec!(0.25)).unwrap())
///         .build()
///         .unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(invoice.total(), dec!(25.00));
/// ```
pub struct InvoiceBuilder {
    number: InvoiceNumber,
    issued_at: DateTime<Utc>,
    seller: Option<Party>,
    operator: Option<Party>,
    buyer: Option<Party>,
    lines: Vec<LineItem>,
    payment_method: PaymentMethod,
    sequence_mode: SequenceMode,
    subsequent_delivery: bool,
    paragon_number: Option<String>,
    special_purpose: Option<String>,
}

impl InvoiceBuilder {
    pub fn new(
        sequential: impl Into<String>,
        business_location: impl Into<String>,
        register: impl Into<String>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            number: InvoiceNumber {
                sequential: sequential.into(),
                business_location: business_location.into(),
                register: register.into(),
            },
            issued_at,
            seller: None,
            operator: None,
            buyer: None,
            lines: Vec::new(),
            payment_method: PaymentMethod::Cash,
            sequence_mode: SequenceMode::BusinessLocation,
            subsequent_delivery: false,
            paragon_number: None,
            special_purpose: None,
        }
    }

    pub fn seller(mut self, party: Party) -> Self {
        self.seller = Some(party);
        self
    }

    /// The operator (cashier) issuing the invoice.
    pub fn operator(mut self, party: Party) -> Self {
        self.operator = Some(party);
        self
    }

    pub fn buyer(mut self, party: Party) -> Self {
        self.buyer = Some(party);
        self
    }

    pub fn add_line(mut self, line: LineItem) -> Self {
        self.lines.push(line);
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn sequence_mode(mut self, mode: SequenceMode) -> Self {
        self.sequence_mode = mode;
        self
    }

    /// Mark the invoice as delivered after the fact (NakDost), e.g. after
    /// the service was unreachable when it was issued.
    pub fn subsequent_delivery(mut self, subsequent: bool) -> Self {
        self.subsequent_delivery = subsequent;
        self
    }

    pub fn paragon_number(mut self, number: impl Into<String>) -> Self {
        self.paragon_number = Some(number.into());
        self
    }

    pub fn special_purpose(mut self, text: impl Into<String>) -> Self {
        self.special_purpose = Some(text.into());
        self
    }

    /// Build the invoice. Fails on the first invalid field.
    pub fn build(self) -> Result<Invoice, FiscalError> {
        validate_invoice_number(&self.number)?;

        let seller = self
            .seller
            .ok_or_else(|| FiscalError::Builder("seller is required".into()))?;
        let operator = self
            .operator
            .ok_or_else(|| FiscalError::Builder("operator is required".into()))?;
        if seller.oib.trim().is_empty() {
            return Err(FiscalError::invalid("seller.oib", "OIB must not be empty"));
        }
        if operator.oib.trim().is_empty() {
            return Err(FiscalError::invalid("operator.oib", "OIB must not be empty"));
        }

        if self.lines.is_empty() {
            return Err(FiscalError::Builder(
                "at least one line item is required".into(),
            ));
        }
        if self.lines.len() > MAX_LINES {
            return Err(FiscalError::Builder(format!(
                "invoice cannot have more than {MAX_LINES} line items"
            )));
        }

        if let Some(paragon) = &self.paragon_number {
            validate_text_len("paragon_number", paragon, MAX_PARAGON_LEN)?;
        }
        if let Some(text) = &self.special_purpose {
            validate_text_len("special_purpose", text, MAX_SPECIAL_PURPOSE_LEN)?;
        }

        let invoice = Invoice {
            number: self.number,
            seller,
            operator,
            buyer: self.buyer,
            lines: self.lines,
            payment_method: self.payment_method,
            sequence_mode: self.sequence_mode,
            issued_at: self.issued_at,
            subsequent_delivery: self.subsequent_delivery,
            paragon_number: self.paragon_number,
            special_purpose: self.special_purpose,
        };

        tracing::debug!(
            number = %invoice.number,
            lines = invoice.lines.len(),
            subtotal = %invoice.subtotal(),
            tax = %invoice.tax(),
            total = %invoice.total(),
            "built invoice"
        );

        Ok(invoice)
    }
}
