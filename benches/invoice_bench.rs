use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Europe::Zagreb;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use fiskal::core::*;
use fiskal::fiscal::*;

const MESSAGE_ID: &str = "f81d4fae-7dec-11d0-a765-00a0c91e6bf6";

fn issued() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap()
}

fn credential() -> Credential {
    Credential::from_pem(
        include_bytes!("../tests/fixtures/test_key.pem"),
        include_bytes!("../tests/fixtures/test_cert.pem"),
        None,
    )
    .unwrap()
}

fn build_invoice(lines: usize) -> Invoice {
    let mut builder = InvoiceBuilder::new("1", "POSL1", "1", issued())
        .seller(Party::new("69416340824"))
        .operator(Party::new("12345678903"));

    for i in 1..=lines {
        let rate = if i % 3 == 0 { dec!(0.13) } else { dec!(0.25) };
        let mut line = LineItemBuilder::new(Decimal::from(i % 7 + 1), dec!(9.99))
            .tax(Tax::new(TaxType::ValueAdded, TaxCategory::Standard, rate).unwrap());
        if i % 5 == 0 {
            line = line.surcharge(Surcharge::new("Povratna naknada", dec!(0.10)).unwrap());
        }
        builder = builder.add_line(line.build().unwrap());
    }

    builder.build().unwrap()
}

fn bench_aggregate(c: &mut Criterion) {
    let invoice = build_invoice(1000);
    c.bench_function("aggregate_1000_lines", |b| {
        b.iter(|| {
            let invoice = black_box(&invoice);
            black_box((invoice.total(), invoice.tax_breakdown(), invoice.surcharges()))
        });
    });
}

fn bench_protection_code(c: &mut Criterion) {
    let invoice = build_invoice(10);
    let credential = credential();
    c.bench_function("protection_code", |b| {
        b.iter(|| black_box(protection_code(black_box(&invoice), &credential, Zagreb)));
    });
}

fn bench_build_and_sign(c: &mut Criterion) {
    let invoice = build_invoice(10);
    let credential = credential();
    let options = RequestOptions::new(&credential, issued(), Zagreb);
    c.bench_function("build_sign_wrap_10_lines", |b| {
        b.iter(|| {
            let mut doc = invoice_request(black_box(&invoice), MESSAGE_ID, &options).unwrap();
            sign(&mut doc, &credential).unwrap();
            black_box(soap_envelope(&doc).unwrap())
        });
    });
}

fn bench_canonicalize(c: &mut Criterion) {
    let invoice = build_invoice(10);
    let credential = credential();
    let options = RequestOptions::new(&credential, issued(), Zagreb);
    let mut doc = invoice_request(&invoice, MESSAGE_ID, &options).unwrap();
    sign(&mut doc, &credential).unwrap();
    c.bench_function("canonicalize_signed", |b| {
        b.iter(|| black_box(canonicalize(black_box(&doc))));
    });
}

criterion_group!(
    benches,
    bench_aggregate,
    bench_protection_code,
    bench_build_and_sign,
    bench_canonicalize,
);
criterion_main!(benches);
