//! # fiskal
//!
//! Croatian fiscalization (Fiskalizacija) for point-of-sale invoices:
//! exact invoice arithmetic, CIS request envelopes, ZKI protection codes
//! and enveloped XML digital signatures.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Every named figure is rounded to two decimals, half away from zero, at
//! the moment it is computed.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use fiskal::core::*;
//! use rust_decimal_macros::dec;
//!
//! let rates = TaxRates::default();
//! let line = LineItemBuilder::new(dec!(2), dec!(10.00))
//!     .tax(Tax::with_default_rate(TaxType::ValueAdded, TaxCategory::Standard, &rates).unwrap())
//!     .build()
//!     .unwrap();
//!
//! let invoice = InvoiceBuilder::new("1", "POSL1", "1", Utc.with_ymd_and_hms(2024, 3, 15, 9, 30, 0).unwrap())
//!     .seller(Party::new("69416340824"))
//!     .operator(Party::new("12345678903"))
//!     .add_line(line)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(invoice.tax(), dec!(5.00));
//! assert_eq!(invoice.total(), dec!(25.00));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Money, taxes, line items, invoice aggregate, identifier validation |
//! | `fiscal` (default) | Request envelopes, ZKI, credentials, C14N, XML-DSig, SOAP, responses |
//! | `config` | Load [`config::FiscalConfig`] from TOML and `FISKAL__*` environment variables |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "core")]
pub mod config;

#[cfg(feature = "fiscal")]
pub mod fiscal;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
