//! Fiscal request documents, protection codes and XML signatures.
//!
//! # Example
//!
//! ```no_run
//! use fiskal::core::*;
//! use fiskal::fiscal::*;
//!
//! let invoice: Invoice = todo!(); // build via InvoiceBuilder
//! let credential = Credential::from_pkcs12_file("fina.p12", "secret").unwrap();
//! let options = RequestOptions::new(&credential, chrono::Utc::now(), chrono_tz::Europe::Zagreb);
//!
//! let mut request = invoice_request(&invoice, &new_message_id(), &options).unwrap();
//! sign(&mut request, &credential).unwrap();
//! let body = soap_envelope(&request).unwrap();
//! ```

mod c14n;
mod credential;
mod document;
mod dsig;
mod response;
mod soap;
mod transport;
pub mod xml;
mod zki;

pub use c14n::{EXC_C14N, canonicalize};
pub use credential::{Credential, rfc2253};
pub use document::*;
pub use dsig::*;
pub use response::*;
pub use soap::*;
pub use transport::*;
pub use xml::{Element, Node};
pub use zki::*;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Namespace of the fiscalization request and response types.
pub const FISCAL_NS: &str = "http://www.apis-it.hr/fin/2012/types/f73";

/// Prefix used for [`FISCAL_NS`] in built documents.
pub const FISCAL_PREFIX: &str = "tns";

/// XML digital signature namespace.
pub const DSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// SOAP 1.1 envelope namespace.
pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Timestamp as written in request documents: `DD.MM.YYYYTHH:MM:SS`.
pub fn document_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%d.%m.%YT%H:%M:%S").to_string()
}

/// Timestamp as fed into the protection code: `DD.MM.YYYY HH:MM:SS`.
pub fn protection_code_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%d.%m.%Y %H:%M:%S").to_string()
}
