//! Masking of patient identifiers before they reach the logs.
//!
//! SIP URIs carry the dialed phone number in their user part, and event
//! payloads from the media platform may echo it back. Anything logged from a
//! session goes through these helpers first.

use serde_json::Value;

/// Replacement for a value whose field name marks it as patient data.
pub const REDACTED: &str = "[REDACTED]";

/// Digit count at which a run of phone-like characters is masked.
const MIN_PHONE_DIGITS: usize = 7;

/// Field names (lowercase substrings) whose values are never logged.
const PHI_FIELDS: &[&str] = &[
    "phone",
    "telephone",
    "mobile",
    "sipuri",
    "sip_uri",
    "email",
    "firstname",
    "lastname",
    "address",
    "birth",
    "dob",
    "ssn",
    "mrn",
];

/// Masks the user part of a SIP URI, keeping scheme and host.
///
/// `sip:+15551234567@sip.example.com` becomes `sip:***@sip.example.com`.
/// Input that is not a SIP URI is replaced entirely.
pub fn redact_sip_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once(':') else {
        return REDACTED.to_string();
    };
    if !scheme.eq_ignore_ascii_case("sip") && !scheme.eq_ignore_ascii_case("sips") {
        return REDACTED.to_string();
    }
    match rest.split_once('@') {
        Some((_, host)) => format!("{}:***@{}", scheme, host),
        None => format!("{}:***", scheme),
    }
}

/// Masks the digits of every phone-number-like run in `text`.
///
/// `call +1 (555) 123-4567 now` becomes `call +X (XXX) XXX-XXXX now`.
pub fn redact_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | '(' | ')' | ' ') {
            run.push(c);
        } else {
            flush_run(&mut out, &mut run);
            out.push(c);
        }
    }
    flush_run(&mut out, &mut run);
    out
}

fn flush_run(out: &mut String, run: &mut String) {
    let digits = run.chars().filter(|c| c.is_ascii_digit()).count();
    if digits >= MIN_PHONE_DIGITS {
        out.extend(run.chars().map(|c| if c.is_ascii_digit() { 'X' } else { c }));
    } else {
        out.push_str(run);
    }
    run.clear();
}

fn is_phi_field(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    PHI_FIELDS.iter().any(|field| name.contains(field))
}

/// Returns a copy of `payload` that is safe to log.
///
/// Values under patient-data field names are replaced with [`REDACTED`];
/// every other string has its phone-number-like runs masked.
pub fn redact_payload(payload: &Value) -> Value {
    match payload {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    let value = if is_phi_field(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_payload(value)
                    };
                    (key.clone(), value)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_payload).collect()),
        Value::String(text) => Value::String(redact_text(text)),
        other => other.clone(),
    }
}
