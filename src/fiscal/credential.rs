use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose;
use openssl::hash::{MessageDigest, hash};
use openssl::nid::Nid;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{PKey, Private};
use openssl::sign::Signer;
use openssl::x509::{X509, X509NameRef};

use crate::core::FiscalError;

/// Line width of the base64 certificate embedded in `X509Certificate`.
const CERT_LINE_WIDTH: usize = 64;

/// The issuer's private key and certificate, plus any CA chain that came
/// with them.
///
/// Load errors surface immediately as [`FiscalError::Credential`], so a
/// bad key is reported when the application starts rather than on the
/// first invoice.
pub struct Credential {
    key: PKey<Private>,
    certificate: X509,
    chain: Vec<X509>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("subject", &rfc2253(self.certificate.subject_name()))
            .field("serial", &self.serial_number().ok())
            .field("chain", &self.chain.len())
            .finish_non_exhaustive()
    }
}

fn credential_err(context: &str) -> impl FnOnce(openssl::error::ErrorStack) -> FiscalError + '_ {
    move |e| FiscalError::Credential(format!("{context}: {e}"))
}

pub(crate) fn crypto_err(context: &str) -> impl FnOnce(openssl::error::ErrorStack) -> FiscalError + '_ {
    move |e| FiscalError::Crypto(format!("{context}: {e}"))
}

impl Credential {
    /// Load from a DER-encoded PKCS#12 bundle.
    pub fn from_pkcs12(der: &[u8], password: &str) -> Result<Self, FiscalError> {
        let parsed = Pkcs12::from_der(der)
            .map_err(credential_err("unreadable PKCS#12 bundle"))?
            .parse2(password)
            .map_err(credential_err("cannot decrypt PKCS#12 bundle"))?;
        let key = parsed
            .pkey
            .ok_or_else(|| FiscalError::Credential("PKCS#12 bundle has no private key".into()))?;
        let certificate = parsed
            .cert
            .ok_or_else(|| FiscalError::Credential("PKCS#12 bundle has no certificate".into()))?;
        let chain = parsed
            .ca
            .map(|stack| stack.into_iter().collect())
            .unwrap_or_default();
        Self::new(key, certificate, chain)
    }

    /// Load a PKCS#12 bundle from a file.
    pub fn from_pkcs12_file(path: impl AsRef<Path>, password: &str) -> Result<Self, FiscalError> {
        let path = path.as_ref();
        let der = std::fs::read(path).map_err(|e| {
            FiscalError::Credential(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_pkcs12(&der, password)
    }

    /// Load from a PEM private key, a PEM certificate and an optional PEM
    /// bundle of CA certificates.
    pub fn from_pem(key_pem: &[u8], cert_pem: &[u8], ca_pem: Option<&[u8]>) -> Result<Self, FiscalError> {
        let key = PKey::private_key_from_pem(key_pem).map_err(credential_err("invalid private key"))?;
        let certificate = X509::from_pem(cert_pem).map_err(credential_err("invalid certificate"))?;
        let chain = match ca_pem {
            Some(pem) => X509::stack_from_pem(pem).map_err(credential_err("invalid CA chain"))?,
            None => Vec::new(),
        };
        Self::new(key, certificate, chain)
    }

    fn new(key: PKey<Private>, certificate: X509, chain: Vec<X509>) -> Result<Self, FiscalError> {
        let public = certificate
            .public_key()
            .map_err(credential_err("certificate has no usable public key"))?;
        if !public.public_eq(&key) {
            return Err(FiscalError::Credential(
                "private key does not match the certificate".into(),
            ));
        }
        if key.rsa().is_err() {
            return Err(FiscalError::Credential("private key is not an RSA key".into()));
        }
        let credential = Self {
            key,
            certificate,
            chain,
        };
        tracing::debug!(
            issuer = %credential.issuer_name(),
            chain = credential.chain.len(),
            "loaded credential"
        );
        Ok(credential)
    }

    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    pub fn chain(&self) -> &[X509] {
        &self.chain
    }

    /// RSA PKCS#1 v1.5 signature over the SHA-1 digest of `data`.
    pub fn sign_sha1(&self, data: &[u8]) -> Result<Vec<u8>, FiscalError> {
        let mut signer =
            Signer::new(MessageDigest::sha1(), &self.key).map_err(crypto_err("signer setup failed"))?;
        signer.update(data).map_err(crypto_err("signing failed"))?;
        signer.sign_to_vec().map_err(crypto_err("signing failed"))
    }

    /// Certificate issuer as an RFC 2253 string (most specific RDN first).
    pub fn issuer_name(&self) -> String {
        rfc2253(self.certificate.issuer_name())
    }

    /// Certificate serial number in decimal.
    pub fn serial_number(&self) -> Result<String, FiscalError> {
        let serial = self
            .certificate
            .serial_number()
            .to_bn()
            .map_err(crypto_err("invalid serial number"))?;
        let decimal = serial
            .to_dec_str()
            .map_err(crypto_err("invalid serial number"))?;
        Ok(decimal.to_string())
    }

    /// DER certificate in base64, wrapped at 64 characters per line.
    pub fn certificate_base64(&self) -> Result<String, FiscalError> {
        let der = self
            .certificate
            .to_der()
            .map_err(crypto_err("cannot encode certificate"))?;
        let encoded = general_purpose::STANDARD.encode(der);
        let lines: Vec<&str> = encoded
            .as_bytes()
            .chunks(CERT_LINE_WIDTH)
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect();
        Ok(lines.join("\n"))
    }

    /// SHA-1 fingerprint of the DER certificate, lowercase hex. Identifies
    /// the credential in transport connection pools.
    pub fn fingerprint(&self) -> Result<String, FiscalError> {
        let der = self
            .certificate
            .to_der()
            .map_err(crypto_err("cannot encode certificate"))?;
        let digest = hash(MessageDigest::sha1(), &der).map_err(crypto_err("hash failed"))?;
        Ok(hex::encode(&*digest))
    }
}

/// Render a distinguished name per RFC 2253: RDNs in reverse order,
/// comma separated, the values of a multi-valued RDN joined with `+`,
/// with special characters escaped.
pub fn rfc2253(name: &X509NameRef) -> String {
    let attributes: Vec<String> = name
        .entries()
        .map(|entry| {
            let nid = entry.object().nid();
            let key = match nid {
                Nid::COMMONNAME => "CN".to_string(),
                Nid::LOCALITYNAME => "L".to_string(),
                Nid::STATEORPROVINCENAME => "ST".to_string(),
                Nid::ORGANIZATIONNAME => "O".to_string(),
                Nid::ORGANIZATIONALUNITNAME => "OU".to_string(),
                Nid::COUNTRYNAME => "C".to_string(),
                Nid::STREETADDRESS => "STREET".to_string(),
                Nid::DOMAINCOMPONENT => "DC".to_string(),
                Nid::USERID => "UID".to_string(),
                _ => entry.object().to_string(),
            };
            let value = entry
                .data()
                .as_utf8()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(entry.data().as_slice()).into_owned());
            format!("{key}={}", escape_dn_value(&value))
        })
        .collect();

    // The safe API does not expose RDN membership, so it is read from the DER.
    let sizes = name
        .to_der()
        .ok()
        .and_then(|der| rdn_sizes(&der))
        .filter(|sizes| sizes.iter().sum::<usize>() == attributes.len())
        .unwrap_or_else(|| vec![1; attributes.len()]);

    let mut attributes = attributes.into_iter();
    let mut rdns: Vec<String> = sizes
        .into_iter()
        .map(|size| attributes.by_ref().take(size).collect::<Vec<_>>().join("+"))
        .collect();
    rdns.reverse();
    rdns.join(",")
}

/// Tag, header length and content length of the DER element at the start
/// of `der`.
fn der_header(der: &[u8]) -> Option<(u8, usize, usize)> {
    let tag = *der.first()?;
    let first = usize::from(*der.get(1)?);
    if first < 0x80 {
        return Some((tag, 2, first));
    }
    let count = first & 0x7f;
    if count == 0 || count > std::mem::size_of::<usize>() {
        return None;
    }
    let mut length = 0usize;
    for byte in der.get(2..2 + count)? {
        length = (length << 8) | usize::from(*byte);
    }
    Some((tag, 2 + count, length))
}

/// Number of attributes in each RDN of a DER-encoded `Name`, in order.
fn rdn_sizes(der: &[u8]) -> Option<Vec<usize>> {
    const SEQUENCE: u8 = 0x30;
    const SET: u8 = 0x31;

    let (tag, header, length) = der_header(der)?;
    if tag != SEQUENCE {
        return None;
    }
    let mut rest = der.get(header..header.checked_add(length)?)?;
    let mut sizes = Vec::new();
    while !rest.is_empty() {
        let (tag, header, length) = der_header(rest)?;
        if tag != SET {
            return None;
        }
        let end = header.checked_add(length)?;
        let mut members = rest.get(header..end)?;
        let mut count = 0;
        while !members.is_empty() {
            let (_, header, length) = der_header(members)?;
            members = members.get(header.checked_add(length)?..)?;
            count += 1;
        }
        sizes.push(count);
        rest = rest.get(end..)?;
    }
    Some(sizes)
}

fn escape_dn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';')
            || (i == 0 && (c == '#' || c == ' '))
            || (i == last && c == ' ');
        if needs_escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
