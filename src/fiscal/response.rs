use super::xml::parse;
use crate::core::FiscalError;

/// One error reported by the service, either a `tns:Greska` entry or a
/// SOAP fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    pub code: String,
    pub message: String,
}

/// The parts of a service answer a caller acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiscalResponse {
    /// `IdPoruke` echoed back from the request.
    pub message_id: Option<String>,
    /// `DatumVrijeme` of the answer, as written by the service.
    pub timestamp: Option<String>,
    /// Unique invoice identifier assigned on successful fiscalization.
    pub jir: Option<String>,
    /// Text of an `EchoResponse`.
    pub echo: Option<String>,
    pub errors: Vec<ResponseError>,
}

impl FiscalResponse {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse the body of a service answer: `RacunOdgovor`, `ProvjeraOdgovor`,
/// `PromijeniNacPlacOdgovor`, `EchoResponse` or a SOAP fault, with or
/// without the SOAP envelope around it.
pub fn parse_response(bytes: &[u8]) -> Result<FiscalResponse, FiscalError> {
    let document = parse(bytes)?;
    let answer = match document.child("Body") {
        Some(body) => body
            .elements()
            .next()
            .ok_or_else(|| FiscalError::Xml("empty SOAP body".into()))?,
        None => &document,
    };

    let mut response = FiscalResponse::default();

    if answer.name == "Fault" {
        response.errors.push(ResponseError {
            code: answer.child_text("faultcode").unwrap_or_default(),
            message: answer.child_text("faultstring").unwrap_or_default(),
        });
        tracing::warn!(code = %response.errors[0].code, "service returned a SOAP fault");
        return Ok(response);
    }

    if answer.name == "EchoResponse" {
        response.echo = Some(answer.text());
        return Ok(response);
    }

    if let Some(header) = answer.child("Zaglavlje") {
        response.message_id = header.child_text("IdPoruke");
        response.timestamp = header.child_text("DatumVrijeme");
    }
    response.jir = answer.child_text("Jir");

    if let Some(errors) = answer.child("Greske") {
        response.errors = errors
            .elements()
            .filter(|e| e.name == "Greska")
            .map(|e| ResponseError {
                code: e.child_text("SifraGreske").unwrap_or_default(),
                message: e.child_text("PorukaGreske").unwrap_or_default(),
            })
            .collect();
    }
    if !response.errors.is_empty() {
        tracing::warn!(
            message_id = ?response.message_id,
            errors = response.errors.len(),
            "service rejected the request"
        );
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_invoice() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <tns:RacunOdgovor xmlns:tns="http://www.apis-it.hr/fin/2012/types/f73" Id="resp">
      <tns:Zaglavlje>
        <tns:IdPoruke>f81d4fae-7dec-11d0-a765-00a0c91e6bf6</tns:IdPoruke>
        <tns:DatumVrijeme>15.03.2024T10:30:01</tns:DatumVrijeme>
      </tns:Zaglavlje>
      <tns:Jir>a1b2c3d4-e5f6-4a5b-8c7d-0123456789ab</tns:Jir>
    </tns:RacunOdgovor>
  </soap:Body>
</soap:Envelope>"#;
        let response = parse_response(xml).unwrap();
        assert!(response.is_success());
        assert_eq!(
            response.message_id.as_deref(),
            Some("f81d4fae-7dec-11d0-a765-00a0c91e6bf6")
        );
        assert_eq!(response.timestamp.as_deref(), Some("15.03.2024T10:30:01"));
        assert_eq!(
            response.jir.as_deref(),
            Some("a1b2c3d4-e5f6-4a5b-8c7d-0123456789ab")
        );
    }

    #[test]
    fn rejected_invoice() {
        let xml = br#"<tns:RacunOdgovor xmlns:tns="http://www.apis-it.hr/fin/2012/types/f73">
  <tns:Greske>
    <tns:Greska><tns:SifraGreske>s004</tns:SifraGreske><tns:PorukaGreske>Neispravan digitalni potpis.</tns:PorukaGreske></tns:Greska>
    <tns:Greska><tns:SifraGreske>s005</tns:SifraGreske><tns:PorukaGreske>OIB nije ispravan.</tns:PorukaGreske></tns:Greska>
  </tns:Greske>
</tns:RacunOdgovor>"#;
        let response = parse_response(xml).unwrap();
        assert!(!response.is_success());
        assert_eq!(response.jir, None);
        assert_eq!(
            response.errors,
            vec![
                ResponseError {
                    code: "s004".into(),
                    message: "Neispravan digitalni potpis.".into()
                },
                ResponseError {
                    code: "s005".into(),
                    message: "OIB nije ispravan.".into()
                },
            ]
        );
    }

    #[test]
    fn echo_and_fault() {
        let echo = parse_response(
            br#"<tns:EchoResponse xmlns:tns="http://www.apis-it.hr/fin/2012/types/f73">ping</tns:EchoResponse>"#,
        )
        .unwrap();
        assert_eq!(echo.echo.as_deref(), Some("ping"));

        let fault = parse_response(
            br#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client</faultcode><faultstring>Bad request</faultstring></s:Fault></s:Body></s:Envelope>"#,
        )
        .unwrap();
        assert_eq!(
            fault.errors,
            vec![ResponseError {
                code: "s:Client".into(),
                message: "Bad request".into()
            }]
        );
    }

    #[test]
    fn empty_body_is_an_error() {
        assert!(
            parse_response(
                br#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body/></s:Envelope>"#
            )
            .is_err()
        );
    }
}
