//! Enveloped XML-DSig over a request document.
//!
//! The signature references the root by its `Id`, uses exclusive
//! canonicalization and RSA-SHA1, and carries the signing certificate
//! together with its issuer name and serial number.

use base64::Engine as _;
use base64::engine::general_purpose;
use openssl::hash::{MessageDigest, hash};
use openssl::sign::Verifier;
use openssl::x509::X509Ref;

use super::DSIG_NS;
use super::c14n::{EXC_C14N, canonicalize};
use super::credential::{Credential, crypto_err};
use super::xml::{Element, Node};
use crate::core::FiscalError;

pub const RSA_SHA1: &str = "http://www.w3.org/2000/09/xmldsig#rsa-sha1";
pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";

fn ds(name: &str) -> Element {
    Element::in_namespace(None, DSIG_NS, name)
}

fn algorithm(name: &str, uri: &str) -> Element {
    ds(name).with_attr("Algorithm", uri)
}

fn sha1_base64(data: &[u8]) -> Result<String, FiscalError> {
    let digest = hash(MessageDigest::sha1(), data).map_err(crypto_err("SHA-1 digest failed"))?;
    Ok(general_purpose::STANDARD.encode(&*digest))
}

fn root_id(document: &Element) -> Result<String, FiscalError> {
    match document.attr("Id") {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(FiscalError::Signature(format!(
            "<{}> has no Id attribute to reference",
            document.qualified_name()
        ))),
    }
}

fn signed_info(id: &str, digest: &str) -> Element {
    let transforms = ds("Transforms")
        .with_child(algorithm("Transform", EXC_C14N))
        .with_child(algorithm("Transform", ENVELOPED_SIGNATURE));
    let reference = ds("Reference")
        .with_attr("URI", format!("#{id}"))
        .with_child(transforms)
        .with_child(algorithm("DigestMethod", SHA1))
        .with_child(ds("DigestValue").with_text(digest));
    ds("SignedInfo")
        .with_child(algorithm("CanonicalizationMethod", EXC_C14N))
        .with_child(algorithm("SignatureMethod", RSA_SHA1))
        .with_child(reference)
}

fn key_info(credential: &Credential) -> Result<Element, FiscalError> {
    let issuer_serial = ds("X509IssuerSerial")
        .with_child(ds("X509IssuerName").with_text(credential.issuer_name()))
        .with_child(ds("X509SerialNumber").with_text(credential.serial_number()?));
    let data = ds("X509Data")
        .with_child(ds("X509Certificate").with_text(credential.certificate_base64()?))
        .with_child(issuer_serial);
    Ok(ds("KeyInfo").with_child(data))
}

/// Sign `document` in place, appending a `Signature` element as its last
/// child.
///
/// Fails with [`FiscalError::Signature`] when the root carries no `Id`,
/// before anything is digested.
pub fn sign(document: &mut Element, credential: &Credential) -> Result<(), FiscalError> {
    let id = root_id(document)?;

    let digest = sha1_base64(&canonicalize(document)?)?;
    let signed_info = signed_info(&id, &digest);
    let signature = credential.sign_sha1(&canonicalize(&signed_info)?)?;
    let signature_value = general_purpose::STANDARD.encode(signature);

    let signature = ds("Signature")
        .with_child(signed_info)
        .with_child(ds("SignatureValue").with_text(signature_value))
        .with_child(key_info(credential)?);
    document.push(signature);

    tracing::debug!(id = %id, digest = %digest, "signed document");
    Ok(())
}

/// Check an enveloped signature produced by [`sign`] against `certificate`.
///
/// Returns `Ok(false)` when the digest or the signature value does not
/// match; structural problems are errors.
pub fn verify(document: &Element, certificate: &X509Ref) -> Result<bool, FiscalError> {
    let id = root_id(document)?;

    let mut unsigned = document.clone();
    let position = unsigned
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(e) if is_signature(e)))
        .ok_or_else(|| FiscalError::Signature("document is not signed".into()))?;
    let Node::Element(signature) = unsigned.children.remove(position) else {
        return Err(FiscalError::Signature("document is not signed".into()));
    };

    let signed_info = signature
        .child("SignedInfo")
        .ok_or_else(|| FiscalError::Signature("Signature has no SignedInfo".into()))?;
    let reference = signed_info
        .child("Reference")
        .ok_or_else(|| FiscalError::Signature("SignedInfo has no Reference".into()))?;
    if reference.attr("URI") != Some(format!("#{id}").as_str()) {
        return Err(FiscalError::Signature(format!(
            "Reference does not point at #{id}"
        )));
    }
    let expected_digest = reference
        .child_text("DigestValue")
        .ok_or_else(|| FiscalError::Signature("Reference has no DigestValue".into()))?;
    if sha1_base64(&canonicalize(&unsigned)?)? != expected_digest.trim() {
        tracing::debug!(id = %id, "digest mismatch");
        return Ok(false);
    }

    let signature_value = signature
        .child_text("SignatureValue")
        .ok_or_else(|| FiscalError::Signature("Signature has no SignatureValue".into()))?;
    let compact: String = signature_value.split_whitespace().collect();
    let signature_bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| FiscalError::Signature(format!("invalid SignatureValue: {e}")))?;

    let public = certificate
        .public_key()
        .map_err(crypto_err("certificate has no usable public key"))?;
    let mut verifier =
        Verifier::new(MessageDigest::sha1(), &public).map_err(crypto_err("verifier setup failed"))?;
    verifier
        .update(&canonicalize(signed_info)?)
        .map_err(crypto_err("verification failed"))?;
    verifier
        .verify(&signature_bytes)
        .map_err(crypto_err("verification failed"))
}

fn is_signature(element: &Element) -> bool {
    element.name == "Signature" && element.namespace.as_deref() == Some(DSIG_NS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_info_layout() {
        let info = signed_info("abc", "ZGlnZXN0");
        let names: Vec<&str> = info.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["CanonicalizationMethod", "SignatureMethod", "Reference"]);
        let reference = info.child("Reference").unwrap();
        assert_eq!(reference.attr("URI"), Some("#abc"));
        let transforms: Vec<&str> = reference
            .child("Transforms")
            .unwrap()
            .elements()
            .filter_map(|t| t.attr("Algorithm"))
            .collect();
        assert_eq!(transforms, [EXC_C14N, ENVELOPED_SIGNATURE]);
        assert_eq!(reference.child_text("DigestValue").as_deref(), Some("ZGlnZXN0"));
    }

    #[test]
    fn missing_id_is_reported() {
        assert!(matches!(
            root_id(&Element::new("Root")),
            Err(FiscalError::Signature(_))
        ));
        assert!(root_id(&Element::new("Root").with_attr("Id", "")).is_err());
        assert_eq!(root_id(&Element::new("Root").with_attr("Id", "x")).unwrap(), "x");
    }
}
