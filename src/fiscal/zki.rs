use chrono_tz::Tz;
use openssl::hash::{MessageDigest, hash};

use super::credential::{Credential, crypto_err};
use super::protection_code_timestamp;
use crate::core::{FiscalError, Invoice, format2};

/// Fields the protection code (ZKI) is computed over, already formatted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionCodeInput {
    /// OIB of the taxpayer issuing the invoice.
    pub oib: String,
    /// `DD.MM.YYYY HH:MM:SS` in the taxpayer's local time.
    pub issued_at: String,
    pub sequential: String,
    pub business_location: String,
    pub register: String,
    /// Invoice total with exactly two decimals.
    pub total: String,
}

impl ProtectionCodeInput {
    pub fn from_invoice(invoice: &Invoice, tz: Tz) -> Self {
        let number = invoice.number();
        Self {
            oib: invoice.seller().oib.clone(),
            issued_at: protection_code_timestamp(invoice.issued_at(), tz),
            sequential: number.sequential.clone(),
            business_location: number.business_location.clone(),
            register: number.register.clone(),
            total: format2(invoice.total()),
        }
    }

    /// The concatenated fields, in protocol order, without separators.
    pub fn buffer(&self) -> String {
        [
            self.oib.as_str(),
            &self.issued_at,
            &self.sequential,
            &self.business_location,
            &self.register,
            &self.total,
        ]
        .concat()
    }

    /// Sign the buffer (RSA over SHA-1), then MD5 the signature and
    /// hex-encode it.
    ///
    /// The SHA-1 signature and the MD5 over it are fixed by the
    /// fiscalization protocol; the tax authority recomputes the code the
    /// same way, so neither algorithm may be substituted.
    pub fn code(&self, credential: &Credential) -> Result<String, FiscalError> {
        let signature = credential.sign_sha1(self.buffer().as_bytes())?;
        let digest =
            hash(MessageDigest::md5(), &signature).map_err(crypto_err("MD5 digest failed"))?;
        let code = hex::encode(&*digest);
        tracing::debug!(
            sequential = %self.sequential,
            business_location = %self.business_location,
            register = %self.register,
            total = %self.total,
            "computed protection code"
        );
        Ok(code)
    }
}

/// Protection code (ZKI) of an invoice: 32 lowercase hex characters.
pub fn protection_code(invoice: &Invoice, credential: &Credential, tz: Tz) -> Result<String, FiscalError> {
    ProtectionCodeInput::from_invoice(invoice, tz).code(credential)
}
