// src/fields/code.rs
//
// Companion code derivation: every character moves one step within its
// class. Not a secret in any cryptographic sense.

/// `z→a`, `Z→A`, `9→0`, `-→~`; other printable ASCII moves to the next
/// code point, anything else is kept.
pub fn incr_char(c: char) -> char {
    match c {
        'z' => 'a',
        'Z' => 'A',
        '9' => '0',
        '-' => '~',
        '!'..='}' => char::from(c as u8 + 1),
        other => other,
    }
}

pub fn incr_string(s: &str) -> String {
    s.chars().map(incr_char).collect()
}
