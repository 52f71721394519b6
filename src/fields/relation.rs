// src/fields/relation.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Closed set of roles a family contact can play.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum RoleCategory {
    Parent,
    Relative,
    Aide,
    Other,
}

impl RoleCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleCategory::Parent => "Parent",
            RoleCategory::Relative => "Relative",
            RoleCategory::Aide => "Aide",
            RoleCategory::Other => "Other",
        }
    }
}

impl fmt::Display for RoleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role for a raw relationship value.
///
/// Non-string values default to `Parent` silently. Strings missing from the
/// table also default to `Parent`, with a warning.
pub fn classify_relationship(raw: &Value, table: &BTreeMap<String, RoleCategory>) -> RoleCategory {
    let Value::String(label) = raw else {
        return RoleCategory::Parent;
    };
    match table.get(label.trim()) {
        Some(role) => *role,
        None => {
            tracing::warn!(relationship = %label, "unrecognized relationship; treating as Parent");
            RoleCategory::Parent
        }
    }
}

/* ---------------- Contact ranking ---------------- */

pub const PRIMARY_RANK: usize = 0;
pub const UNRANKED: usize = usize::MAX;

/// Sort key for a family contact: primary parents first, then the profile's
/// relationship order. Unlisted relationships are `UNRANKED`.
pub fn contact_rank(relation: Option<&str>, primary_parent: bool, order: &[String]) -> usize {
    if primary_parent {
        return PRIMARY_RANK;
    }
    relation
        .and_then(|r| order.iter().position(|o| o == r.trim()))
        .map(|i| i + 1)
        .unwrap_or(UNRANKED)
}

/// Up to `max` trimmed email addresses from ranked contacts, best rank first.
/// Unranked contacts and values without an `@` are ignored.
pub fn select_emails(ranked: &[(usize, &str)], max: usize) -> Vec<String> {
    let mut candidates: Vec<(usize, &str)> = ranked
        .iter()
        .map(|&(rank, email)| (rank, email.trim()))
        .filter(|&(rank, email)| rank != UNRANKED && email.contains('@'))
        .collect();
    candidates.sort_by_key(|&(rank, _)| rank);
    candidates.into_iter().take(max).map(|(_, e)| s!(e)).collect()
}

/* ---------------- Staff ---------------- */

/// Roster role for a staff position. Unknown positions are exported as
/// "teacher" with a warning.
pub fn position_role(position: &str, table: &BTreeMap<String, String>) -> String {
    match table.get(position.trim()) {
        Some(role) => role.clone(),
        None => {
            tracing::warn!(position, "unmapped staff position; treating as teacher");
            s!("teacher")
        }
    }
}
