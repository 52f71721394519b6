// src/config/profile.rs
//
// Per-deployment derivation tables.
//
// Everything an institution would want to change without touching code lives
// here: email domains, the last-name particle rules, the grade and relationship
// lookup tables, term rules, class-name shortening and a few fixed output
// literals. `Profile::default()` is a neutral baseline; a real deployment
// loads its own TOML file (see `profiles/example.toml`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::config::consts::{STAFF_DOMAIN, STUDENT_DOMAIN};
use crate::error::{Error, Result};
use crate::fields::names::{ClassNameRule, MatchAt, NameAction, NameRule};
use crate::fields::relation::RoleCategory;
use crate::fields::term::{TermAnchor, TermRule};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub student_domain: String,
    pub staff_domain: String,

    /// Last-name particle rules, first match wins.
    pub name_rules: Vec<NameRule>,

    /// Source grade label → canonical grade code.
    pub grades: BTreeMap<String, String>,

    /// Relationship label → role category.
    pub relationships: BTreeMap<String, RoleCategory>,
    /// Ranking used to order family contacts; earlier is better.
    pub relationship_order: Vec<String>,

    pub terms: Vec<TermRule>,

    /// Lowercase state name fragment → postal abbreviation.
    pub states: BTreeMap<String, String>,

    pub class_names: Vec<ClassNameRule>,

    /// Staff position → roster role ("teacher", "aide", ...).
    pub positions: BTreeMap<String, String>,
    /// Positions exported as teaching staff.
    pub teaching_positions: Vec<String>,

    /// Name fragments that legitimise a space in a last name (validation).
    pub name_particles: Vec<String>,
    /// Fragments never allowed in a person's name (validation).
    pub disallowed_name_fragments: Vec<String>,

    pub phone_country_code: String,
    pub course_subject: String,
    pub section_subject: String,
    pub low_grade: String,
    pub high_grade: String,
    /// Initial password written for teacher accounts. Empty leaves the column blank.
    pub teacher_password: String,
}

impl Profile {
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let profile = Self::parse(&text).map_err(|source| Error::Profile {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded profile");
        Ok(profile)
    }

    pub fn is_teaching_position(&self, position: &str) -> bool {
        self.teaching_positions.iter().any(|p| p == position)
    }
}

fn map<V: Clone>(pairs: &[(&str, V)]) -> BTreeMap<String, V> {
    pairs.iter().map(|(k, v)| (s!(*k), v.clone())).collect()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|v| s!(*v)).collect()
}

fn default_name_rules() -> Vec<NameRule> {
    use MatchAt::*;
    use NameAction::*;
    let rule = |pattern: &str, at, action, replacement: &str| NameRule {
        pattern: s!(pattern),
        at,
        action,
        replacement: s!(replacement),
    };
    vec![
        rule("van ", Prefix, Collapse, ""),
        rule("Van ", Prefix, Collapse, ""),
        rule("von ", Prefix, Collapse, ""),
        rule("Von ", Prefix, Collapse, ""),
        rule("Freiin von ", Prefix, Replace, "Von"),
        rule(" zu ", Contains, Collapse, ""),
        rule(" Zu ", Contains, Collapse, ""),
        rule("de ", Prefix, Collapse, ""),
        rule("De ", Prefix, Collapse, ""),
        rule(" Nguyen", Contains, Collapse, ""),
        rule(" nguyen", Contains, Collapse, ""),
    ]
}

fn default_grades() -> BTreeMap<String, String> {
    let mut grades = map(&[
        ("PK", s!("PK")),
        ("Pre-K", s!("PK")),
        ("Prekindergarten", s!("PK")),
        ("K", s!("K")),
        ("Kindergarten", s!("K")),
    ]);
    for n in 1..=12u8 {
        let suffix = match n {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        };
        grades.insert(format!("{n}{suffix}"), n.to_string());
        grades.insert(n.to_string(), n.to_string());
    }
    grades
}

fn default_relationships() -> BTreeMap<String, RoleCategory> {
    use RoleCategory::*;
    map(&[
        ("Parents", Parent),
        ("Mother", Parent),
        ("Father", Parent),
        ("Stepmother", Parent),
        ("Stepfather", Parent),
        ("Guardian", Parent),
        ("Grandmother", Relative),
        ("Grandfather", Relative),
        ("Grandparent", Relative),
        ("Aunt", Relative),
        ("Uncle", Relative),
        ("Sibling", Relative),
        ("Brother", Relative),
        ("Sister", Relative),
        ("Relative", Relative),
        ("Nanny", Aide),
        ("Au Pair", Aide),
        ("Babysitter", Aide),
        ("Friend", Other),
        ("Neighbor", Other),
        ("Other", Other),
    ])
}

fn default_terms() -> Vec<TermRule> {
    vec![
        TermRule {
            label: s!("First"),
            code: s!("S1"),
            start: TermAnchor::Q1Start,
            start_offset_days: 0,
            end: TermAnchor::Q3Start,
            end_offset_days: -7,
        },
        TermRule {
            label: s!("Second"),
            code: s!("S2"),
            start: TermAnchor::Q3Start,
            start_offset_days: 0,
            end: TermAnchor::YearEnd,
            end_offset_days: 0,
        },
        TermRule {
            label: s!("Full Year"),
            code: s!("FY"),
            start: TermAnchor::Q1Start,
            start_offset_days: 0,
            end: TermAnchor::YearEnd,
            end_offset_days: 0,
        },
    ]
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            student_domain: s!(STUDENT_DOMAIN),
            staff_domain: s!(STAFF_DOMAIN),
            name_rules: default_name_rules(),
            grades: default_grades(),
            relationships: default_relationships(),
            relationship_order: strings(&[
                "Parents", "Mother", "Father", "Grandmother", "Grandfather",
                "Stepmother", "Stepfather", "Aunt", "Uncle", "Relative",
            ]),
            terms: default_terms(),
            states: map(&[
                ("massachusetts", s!("MA")),
                ("new hampshire", s!("NH")),
                ("rhode island", s!("RI")),
                ("connecticut", s!("CT")),
                ("vermont", s!("VT")),
                ("maine", s!("ME")),
                ("new york", s!("NY")),
            ]),
            class_names: Vec::new(),
            positions: map(&[
                ("Teacher", s!("teacher")),
                ("Substitute", s!("aide")),
                ("Aide", s!("aide")),
                ("Administrator", s!("administrator")),
            ]),
            teaching_positions: strings(&["Teacher", "Substitute"]),
            name_particles: strings(&["zu ", "von ", "van ", "de "]),
            disallowed_name_fragments: strings(&["(", ")", " - ", ",", "/"]),
            phone_country_code: s!("1"),
            course_subject: s!("World Language"),
            section_subject: s!("Language"),
            low_grade: s!("Prekindergarten"),
            high_grade: s!("12"),
            teacher_password: s!(),
        }
    }
}
