use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal_macros::dec;

use super::credential::Credential;
use super::xml::Element;
use super::zki::protection_code;
use super::{FISCAL_NS, FISCAL_PREFIX, document_timestamp};
use crate::core::*;

/// Per-request settings shared by all envelope kinds.
#[derive(Debug, Clone, Copy)]
pub struct RequestOptions<'a> {
    /// Send timestamp written into the header.
    pub sent_at: DateTime<Utc>,
    /// Local timezone of the taxpayer; all timestamps are written in it.
    pub timezone: Tz,
    /// Credential used to compute the protection code.
    pub credential: &'a Credential,
}

impl<'a> RequestOptions<'a> {
    pub fn new(credential: &'a Credential, sent_at: DateTime<Utc>, timezone: Tz) -> Self {
        Self {
            sent_at,
            timezone,
            credential,
        }
    }
}

/// Reference from a supporting-document invoice to the document it
/// accompanies: either the document's JIR or its protection code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupportingDocumentRef {
    /// `JirPD`: unique identifier assigned by the tax authority.
    Jir(String),
    /// `ZastKodPD`: protection code of the supporting document.
    ProtectionCode(String),
}

impl SupportingDocumentRef {
    /// Exactly one of `jir` and `protection_code` must be supplied.
    pub fn new(jir: Option<&str>, protection_code: Option<&str>) -> Result<Self, FiscalError> {
        match (jir, protection_code) {
            (Some(jir), None) => {
                validate_uuid("supporting_document.jir", jir)?;
                Ok(Self::Jir(jir.to_string()))
            }
            (None, Some(code)) => {
                validate_protection_code("supporting_document.protection_code", code)?;
                Ok(Self::ProtectionCode(code.to_string()))
            }
            (Some(_), Some(_)) => Err(FiscalError::invalid(
                "supporting_document",
                "supply either a JIR or a protection code, not both",
            )),
            (None, None) => Err(FiscalError::invalid(
                "supporting_document",
                "a JIR or a protection code is required",
            )),
        }
    }
}

/// The request shapes of the fiscalization protocol that carry an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// `RacunZahtjev`: fiscalize an invoice.
    Invoice,
    /// `RacunPDZahtjev`: fiscalize an invoice issued for a supporting document.
    SupportingDocument(SupportingDocumentRef),
    /// `PromijeniNacPlacZahtjev`: change the payment method of a fiscalized invoice.
    PaymentMethodChange(PaymentMethod),
    /// `ProvjeraZahtjev`: ask the service to check an invoice without recording it.
    Verification,
}

impl Envelope {
    /// Local name of the root element.
    pub fn root_name(&self) -> &'static str {
        match self {
            Self::Invoice => "RacunZahtjev",
            Self::SupportingDocument(_) => "RacunPDZahtjev",
            Self::PaymentMethodChange(_) => "PromijeniNacPlacZahtjev",
            Self::Verification => "ProvjeraZahtjev",
        }
    }

    /// Build the request document. The root carries `Id = message_id`,
    /// ready for [`sign`](super::sign).
    pub fn build(
        &self,
        invoice: &Invoice,
        message_id: &str,
        options: &RequestOptions<'_>,
    ) -> Result<Element, FiscalError> {
        validate_message_id(message_id)?;

        let mut racun = invoice_body(invoice, options)?;
        match self {
            Self::SupportingDocument(reference) => {
                let mut block = tns("PrateciDokument");
                match reference {
                    SupportingDocumentRef::Jir(jir) => block.push_text_child("JirPD", jir.as_str()),
                    SupportingDocumentRef::ProtectionCode(code) => {
                        block.push_text_child("ZastKodPD", code.as_str())
                    }
                }
                racun.push(block);
            }
            Self::PaymentMethodChange(method) => {
                racun.push_text_child("PromijenjeniNacinPlac", method.code());
            }
            Self::Invoice | Self::Verification => {}
        }

        let mut root = tns(self.root_name()).with_attr("Id", message_id);
        root.push(header(message_id, options));
        root.push(racun);

        tracing::debug!(
            kind = self.root_name(),
            message_id,
            number = %invoice.number(),
            "built request"
        );
        Ok(root)
    }
}

/// Generate a fresh message id (UUID v4).
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `tns:RacunZahtjev` for `invoice`.
pub fn invoice_request(
    invoice: &Invoice,
    message_id: &str,
    options: &RequestOptions<'_>,
) -> Result<Element, FiscalError> {
    Envelope::Invoice.build(invoice, message_id, options)
}

/// `tns:RacunPDZahtjev` for an invoice accompanying a supporting document.
pub fn supporting_document_request(
    invoice: &Invoice,
    message_id: &str,
    options: &RequestOptions<'_>,
    reference: SupportingDocumentRef,
) -> Result<Element, FiscalError> {
    Envelope::SupportingDocument(reference).build(invoice, message_id, options)
}

/// `tns:PromijeniNacPlacZahtjev` switching a fiscalized invoice to `new_method`.
pub fn payment_method_change_request(
    invoice: &Invoice,
    message_id: &str,
    options: &RequestOptions<'_>,
    new_method: PaymentMethod,
) -> Result<Element, FiscalError> {
    Envelope::PaymentMethodChange(new_method).build(invoice, message_id, options)
}

/// `tns:ProvjeraZahtjev` for `invoice`.
pub fn verification_request(
    invoice: &Invoice,
    message_id: &str,
    options: &RequestOptions<'_>,
) -> Result<Element, FiscalError> {
    Envelope::Verification.build(invoice, message_id, options)
}

/// `tns:EchoRequest` carrying `text`. Echo requests have no `Id` and are
/// sent unsigned.
pub fn echo_request(text: &str) -> Element {
    tns("EchoRequest").with_text(text)
}

fn tns(name: &str) -> Element {
    Element::in_namespace(Some(FISCAL_PREFIX), FISCAL_NS, name)
}

fn bool_text(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn header(message_id: &str, options: &RequestOptions<'_>) -> Element {
    let mut header = tns("Zaglavlje");
    header.push_text_child("IdPoruke", message_id);
    header.push_text_child(
        "DatumVrijeme",
        document_timestamp(options.sent_at, options.timezone),
    );
    header
}

fn tax_block(name: &str, summaries: &[TaxSummary]) -> Option<Element> {
    if summaries.is_empty() {
        return None;
    }
    let mut block = tns(name);
    for summary in summaries {
        let mut tax = tns("Porez");
        if let Some(tax_name) = &summary.name {
            tax.push_text_child("Naziv", tax_name.as_str());
        }
        tax.push_text_child("Stopa", format2(summary.rate * dec!(100)));
        tax.push_text_child("Osnovica", format2(summary.base));
        tax.push_text_child("Iznos", format2(summary.amount));
        block.push(tax);
    }
    Some(block)
}

/// The `tns:Racun` block shared by every invoice-carrying envelope.
fn invoice_body(invoice: &Invoice, options: &RequestOptions<'_>) -> Result<Element, FiscalError> {
    let zki = protection_code(invoice, options.credential, options.timezone)?;
    let seller = invoice.seller();
    let number = invoice.number();

    let mut racun = tns("Racun");
    racun.push_text_child("Oib", seller.oib.as_str());
    racun.push_text_child("USustPdv", bool_text(seller.vat_liable));
    racun.push_text_child(
        "DatVrijeme",
        document_timestamp(invoice.issued_at(), options.timezone),
    );
    racun.push_text_child("OznSlijed", invoice.sequence_mode().code());

    let mut br_rac = tns("BrRac");
    br_rac.push_text_child("BrOznRac", number.sequential.as_str());
    br_rac.push_text_child("OznPosPr", number.business_location.as_str());
    br_rac.push_text_child("OznNapUr", number.register.as_str());
    racun.push(br_rac);

    let taxes = invoice.tax_breakdown();
    for block in [
        tax_block("Pdv", &taxes.value_added),
        tax_block("Pnp", &taxes.consumption),
        tax_block("OstaliPor", &taxes.other),
    ]
    .into_iter()
    .flatten()
    {
        racun.push(block);
    }

    for (name, amount) in [
        ("IznosOslobPdv", invoice.vat_exempt_amount()),
        ("IznosMarza", invoice.margin()),
        ("IznosNePodlOpor", invoice.amount_outside_vat_scope()),
    ] {
        if !amount.is_zero() {
            racun.push_text_child(name, format2(amount));
        }
    }

    let surcharges = invoice.surcharges();
    if !surcharges.is_empty() {
        let mut naknade = tns("Naknade");
        for surcharge in &surcharges {
            let mut naknada = tns("Naknada");
            naknada.push_text_child("NazivN", surcharge.name());
            naknada.push_text_child("IznosN", format2(surcharge.amount()));
            naknade.push(naknada);
        }
        racun.push(naknade);
    }

    racun.push_text_child("IznosUkupno", format2(invoice.total()));
    racun.push_text_child("NacinPlac", invoice.payment_method().code());
    racun.push_text_child("OibOper", invoice.operator().oib.as_str());
    racun.push_text_child("ZastKod", zki);
    racun.push_text_child("NakDost", bool_text(invoice.subsequent_delivery()));
    if let Some(paragon) = invoice.paragon_number() {
        racun.push_text_child("ParagonBrRac", paragon);
    }
    if let Some(purpose) = invoice.special_purpose() {
        racun.push_text_child("SpecNamj", purpose);
    }
    Ok(racun)
}
