//! Build, sign and wrap a fiscal invoice request.
//!
//! ```sh
//! RUST_LOG=fiskal=debug cargo run --example fiscalize
//! ```

use chrono::Utc;
use fiskal::config::FiscalConfig;
use fiskal::core::*;
use fiskal::fiscal::*;
use rust_decimal_macros::dec;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), FiscalError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = FiscalConfig::default();
    let timezone = config.timezone()?;
    let rates = &config.tax_rates;

    // ── 1. Invoice ─────────────────────────────────────────────────────
    let invoice = InvoiceBuilder::new("1", "POSL1", "1", Utc::now())
        .seller(Party::new("69416340824").name("Fiskal Test d.o.o."))
        .operator(Party::new("12345678903"))
        .payment_method(PaymentMethod::Card)
        .add_line(
            LineItemBuilder::new(dec!(2), dec!(3.50))
                .tax(Tax::with_default_rate(TaxType::ValueAdded, TaxCategory::Standard, rates)?)
                .tax(Tax::with_default_rate(TaxType::Consumption, TaxCategory::Standard, rates)?)
                .surcharge(Surcharge::new("Povratna naknada", dec!(0.10))?)
                .build()?,
        )
        .add_line(
            LineItemBuilder::new(dec!(1), dec!(12.90))
                .tax(Tax::with_default_rate(TaxType::ValueAdded, TaxCategory::Lower, rates)?)
                .build()?,
        )
        .build()?;

    println!("=== Invoice {} ===", invoice.number());
    println!("  Subtotal:  {}", format2(invoice.subtotal()));
    println!("  Tax:       {}", format2(invoice.tax()));
    println!("  Surcharge: {}", format2(invoice.surcharge()));
    println!("  Total:     {}", format2(invoice.total()));

    // ── 2. Request ─────────────────────────────────────────────────────
    let credential = Credential::from_pem(
        include_bytes!("../tests/fixtures/test_key.pem"),
        include_bytes!("../tests/fixtures/test_cert.pem"),
        None,
    )?;
    let options = RequestOptions::new(&credential, Utc::now(), timezone);
    let mut request = invoice_request(&invoice, &new_message_id(), &options)?;
    println!(
        "\n  ZKI: {}",
        request.find("ZastKod").map(Element::text).unwrap_or_default()
    );

    // ── 3. Signature and envelope ──────────────────────────────────────
    sign(&mut request, &credential)?;
    println!("  Signature verifies: {}", verify(&request, credential.certificate())?);

    let body = soap_envelope(&request)?;
    println!(
        "\n=== POST {}:{}{} ({} bytes) ===",
        config.endpoint.host,
        config.endpoint.port,
        config.endpoint.path,
        body.len()
    );
    println!("{}", String::from_utf8_lossy(&body));

    Ok(())
}
