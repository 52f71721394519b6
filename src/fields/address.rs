// src/fields/address.rs
use std::collections::BTreeMap;

use super::names::camel_case;

/// Street lines, camel-cased, joined with ", ". Identical lines appear once.
pub fn street_address(address: &str, address2: &str) -> String {
    let first = camel_case(address.trim());
    let second = camel_case(address2.trim());
    if first == second {
        return first;
    }
    [first, second]
        .into_iter()
        .filter(|a| !a.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Postal abbreviation for a state name; unknown names are upper-cased.
pub fn state_abbrev(state: &str, table: &BTreeMap<String, String>) -> String {
    let lower = state.trim().to_lowercase();
    table
        .iter()
        .find(|(name, _)| lower.contains(name.as_str()))
        .map(|(_, abbrev)| abbrev.clone())
        .unwrap_or_else(|| state.trim().to_uppercase())
}

/// "City, ST 12345" with the ZIP cut to five characters.
pub fn city_state_zip(city: &str, state: &str, zip: &str, states: &BTreeMap<String, String>) -> String {
    let city = camel_case(city.trim());
    let state = state_abbrev(state, states);
    let zip: String = zip.trim().chars().take(5).collect();

    let tail = [state.as_str(), zip.trim()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    match (city.is_empty(), tail.is_empty()) {
        (true, _) => tail,
        (_, true) => city,
        _ => join!(&city, ", ", &tail),
    }
}
