use super::SOAP_NS;
use super::c14n::canonicalize;
use super::xml::Element;
use crate::core::FiscalError;

const XML_DECLARATION: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Wrap a (usually signed) document in a SOAP 1.1 `Envelope`/`Body` pair,
/// preceded by an XML declaration.
///
/// The document is written in canonical form, so a signature over it
/// still verifies once the receiver extracts it from the body.
pub fn soap_envelope(document: &Element) -> Result<Vec<u8>, FiscalError> {
    let body = Element::in_namespace(Some("soapenv"), SOAP_NS, "Body").with_child(document.clone());
    let envelope = Element::in_namespace(Some("soapenv"), SOAP_NS, "Envelope").with_child(body);

    let mut out = XML_DECLARATION.to_vec();
    out.extend_from_slice(&canonicalize(&envelope)?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::echo_request;

    #[test]
    fn wraps_echo() {
        let bytes = soap_envelope(&echo_request("ping")).unwrap();
        insta::assert_snapshot!(String::from_utf8(bytes).unwrap(), @r#"
        <?xml version="1.0" encoding="UTF-8"?>
        <soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/"><soapenv:Body><tns:EchoRequest xmlns:tns="http://www.apis-it.hr/fin/2012/types/f73">ping</tns:EchoRequest></soapenv:Body></soapenv:Envelope>
        "#);
    }
}
