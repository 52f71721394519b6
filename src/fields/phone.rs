// src/fields/phone.rs

fn digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// "+<cc><number>". Ten-digit numbers get the country code; numbers already
/// carrying it (or a leading '+') keep theirs. Anything else is `None`.
pub fn phone_e164(raw: &str, country_code: &str) -> Option<String> {
    let raw = raw.trim();
    let d = digits(raw);
    if d.is_empty() {
        return None;
    }
    if raw.starts_with('+') && d.len() >= 8 {
        return Some(join!("+", &d));
    }
    match d.len() {
        10 => Some(join!("+", country_code, &d)),
        n if n == 10 + country_code.len() && d.starts_with(country_code) => Some(join!("+", &d)),
        _ => {
            tracing::warn!(phone = raw, "phone number not convertible to E.164");
            None
        }
    }
}

/// "617-555-0100" for North American numbers; other input is trimmed and kept.
pub fn phone_display(raw: &str) -> String {
    let d = digits(raw);
    let d = match d.len() {
        11 if d.starts_with('1') => &d[1..],
        _ => d.as_str(),
    };
    if d.len() == 10 {
        format!("{}-{}-{}", &d[..3], &d[3..6], &d[6..])
    } else {
        s!(raw.trim())
    }
}
