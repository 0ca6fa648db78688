//! Field validators for input validation
//!
//! Reusable checks for the fields a contact query carries. Each validator
//! returns `Err(message)` with the user-facing text for that field.

use lazy_static::lazy_static;
use regex::Regex;

pub const INVALID_EMAIL_MESSAGE: &str = "Please enter a valid email address.";
pub const MESSAGE_REQUIRED_MESSAGE: &str = "Message is required.";

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_PART_LEN: usize = 64;
const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

lazy_static! {
    /// Dot-atom text allowed in an unquoted local part (dots handled separately).
    /// Non-ASCII letters are accepted, as in RFC 6531 internationalised mail.
    static ref LOCAL_ATOM_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~\x{00A1}-\x{D7FF}\x{F900}-\x{FDCF}\x{FDF0}-\x{FFEF}-]+$"
    )
    .unwrap();

    /// A single DNS label: alphanumeric, inner hyphens allowed
    static ref DOMAIN_LABEL_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$").unwrap();

    /// Top-level label: alphabetic, or an IDNA punycode label
    static ref TLD_REGEX: Regex =
        Regex::new(r"^(?:[A-Za-z]{2,}|[Xx][Nn]--[A-Za-z0-9-]{2,})$").unwrap();
}

/// Validate that a value is present. Emptiness is an exact check: whitespace
/// counts as content.
pub fn validate_required(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(MESSAGE_REQUIRED_MESSAGE.to_string());
    }
    Ok(())
}

/// Validate that a string is a syntactically valid email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(INVALID_EMAIL_MESSAGE.to_string())
    }
}

fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }

    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    is_valid_local_part(local) && is_valid_domain(domain)
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > MAX_LOCAL_PART_LEN {
        return false;
    }

    // Splitting on '.' rejects leading, trailing and doubled dots via empty atoms.
    local
        .split('.')
        .all(|atom| !atom.is_empty() && LOCAL_ATOM_REGEX.is_match(atom))
}

fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels
        .iter()
        .all(|label| label.len() <= MAX_LABEL_LEN && DOMAIN_LABEL_REGEX.is_match(label));

    labels_ok && labels.last().is_some_and(|tld| TLD_REGEX.is_match(tld))
}
