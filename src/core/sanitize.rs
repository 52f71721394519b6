// src/core/sanitize.rs

/// Single spaces between words, no leading or trailing whitespace.
pub fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// True if the value has leading or trailing whitespace.
pub fn has_untrimmed_ends(s: &str) -> bool {
    s.trim() != s
}

/// Entity name as a file stem: ASCII alphanumerics, `-` and `_` survive,
/// whitespace runs become one `_`, anything else is dropped.
pub fn sanitize_file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        let mapped = match ch {
            c if c.is_ascii_alphanumeric() || c == '-' => c,
            c if c == '_' || c.is_whitespace() => '_',
            _ => continue,
        };
        if !(mapped == '_' && out.ends_with('_')) {
            out.push(mapped);
        }
    }
    let stem = out.trim_matches('_');
    if stem.is_empty() { s!("unnamed") } else { s!(stem) }
}
