use super::error::FiscalError;

/// Maximum length of each invoice number part.
pub const MAX_NUMBER_PART_LEN: usize = 20;

/// Length of a request message id (a hyphenated UUID).
pub const MESSAGE_ID_LEN: usize = 36;

/// Validate a purely numeric identifier of 1–20 digits
/// (sequential invoice number, register id).
pub fn validate_numeric_id(field: &str, value: &str) -> Result<(), FiscalError> {
    validate_id(field, value, |c| c.is_ascii_digit(), "digits")
}

/// Validate an alphanumeric identifier of 1–20 characters (business location id).
pub fn validate_alphanumeric_id(field: &str, value: &str) -> Result<(), FiscalError> {
    validate_id(field, value, |c| c.is_ascii_alphanumeric(), "letters and digits")
}

fn validate_id(
    field: &str,
    value: &str,
    allowed: impl Fn(char) -> bool,
    what: &str,
) -> Result<(), FiscalError> {
    if value.is_empty() || value.len() > MAX_NUMBER_PART_LEN {
        return Err(FiscalError::invalid(
            field,
            format!("must be 1 to {MAX_NUMBER_PART_LEN} characters, got {}", value.len()),
        ));
    }
    if !value.chars().all(allowed) {
        return Err(FiscalError::invalid(
            field,
            format!("'{value}' may only contain {what}"),
        ));
    }
    Ok(())
}

/// Reject text longer than `max` characters.
pub fn validate_text_len(field: &str, text: &str, max: usize) -> Result<(), FiscalError> {
    let len = text.chars().count();
    if len > max {
        return Err(FiscalError::invalid(
            field,
            format!("cannot exceed {max} characters, got {len}"),
        ));
    }
    Ok(())
}

/// Validate a request message id: 36 characters in the 8-4-4-4-12 UUID layout.
pub fn validate_message_id(message_id: &str) -> Result<(), FiscalError> {
    validate_uuid("message_id", message_id)
}

/// Validate a UUID-shaped identifier (message ids, JIRs).
pub fn validate_uuid(field: &str, value: &str) -> Result<(), FiscalError> {
    if value.len() != MESSAGE_ID_LEN {
        return Err(FiscalError::invalid(
            field,
            format!(
                "must be exactly {MESSAGE_ID_LEN} characters, got {}",
                value.len()
            ),
        ));
    }
    let uuid_shaped = value.char_indices().all(|(i, c)| match i {
        8 | 13 | 18 | 23 => c == '-',
        _ => c.is_ascii_hexdigit(),
    });
    if !uuid_shaped {
        return Err(FiscalError::invalid(field, format!("'{value}' is not a UUID")));
    }
    Ok(())
}

/// Validate a protection code: 32 lowercase hex characters.
pub fn validate_protection_code(field: &str, code: &str) -> Result<(), FiscalError> {
    let well_formed = code.len() == 32
        && code
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if !well_formed {
        return Err(FiscalError::invalid(
            field,
            format!("'{code}' is not a 32-character lowercase hex code"),
        ));
    }
    Ok(())
}

/// Check a Croatian personal identification number (OIB):
/// 11 digits, the last being an ISO 7064 MOD 11,10 check digit.
pub fn is_valid_oib(oib: &str) -> bool {
    if oib.len() != 11 || !oib.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = oib.bytes().map(|b| u32::from(b - b'0')).collect();
    let mut acc = 10;
    for d in &digits[..10] {
        acc = (acc + d) % 10;
        if acc == 0 {
            acc = 10;
        }
        acc = (acc * 2) % 11;
    }
    let check = (11 - acc) % 10;
    check == digits[10]
}
