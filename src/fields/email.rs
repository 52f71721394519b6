// src/fields/email.rs
use crate::config::profile::Profile;

use super::names::{format_first_name, format_last_name};

fn local_part(first: &str, last: &str, profile: &Profile) -> String {
    join!(&format_first_name(first), ".", &format_last_name(last, &profile.name_rules))
}

/// `First.Last` plus the student domain when `with_domain` is set.
pub fn student_email(first: &str, last: &str, profile: &Profile, with_domain: bool) -> String {
    let local = local_part(first, last, profile);
    if with_domain { join!(&local, &profile.student_domain) } else { local }
}

/// Staff address. An existing address in the staff domain wins over a
/// synthesized one.
pub fn staff_email(first: &str, last: &str, existing: &str, profile: &Profile, with_domain: bool) -> String {
    let existing = existing.trim();
    let domain = profile.staff_domain.as_str();
    if !domain.is_empty() && existing.to_lowercase().ends_with(&domain.to_lowercase()) {
        return if with_domain {
            s!(existing)
        } else {
            s!(existing.get(..existing.len() - domain.len()).unwrap_or(existing))
        };
    }
    let local = local_part(first, last, profile);
    if with_domain { join!(&local, domain) } else { local }
}

/// True when the address ends with `domain` (case-insensitive).
pub fn in_domain(email: &str, domain: &str) -> bool {
    email.trim().to_lowercase().ends_with(&domain.to_lowercase())
}
