// src/fields/names.rs
use serde::Deserialize;

/* ---------------- Last-name particle rules ---------------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchAt {
    #[default]
    Prefix,
    Contains,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameAction {
    /// Remove every space.
    Collapse,
    /// Spaces become hyphens.
    Hyphenate,
    /// Swap the pattern for `replacement`, then hyphenate what is left.
    Replace,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct NameRule {
    pub pattern: String,
    #[serde(default)]
    pub at: MatchAt,
    pub action: NameAction,
    #[serde(default)]
    pub replacement: String,
}

impl NameRule {
    fn matches(&self, name: &str) -> bool {
        match self.at {
            MatchAt::Prefix => name.starts_with(&self.pattern),
            MatchAt::Contains => name.contains(&self.pattern),
        }
    }

    fn apply(&self, name: &str) -> String {
        match self.action {
            NameAction::Collapse => name.replace(' ', ""),
            NameAction::Hyphenate => name.replace(' ', "-"),
            NameAction::Replace => name.replacen(&self.pattern, &self.replacement, 1).replace(' ', "-"),
        }
    }
}

/// Email-ready first name: trimmed, no spaces, no apostrophes.
pub fn format_first_name(name: &str) -> String {
    name.trim().replace([' ', '\''], "")
}

/// Email-ready last name. The first matching rule wins; with no match,
/// spaces become hyphens.
pub fn format_last_name(name: &str, rules: &[NameRule]) -> String {
    let name = name.trim().replace('\'', "");
    match rules.iter().find(|r| r.matches(&name)) {
        Some(rule) => rule.apply(&name),
        None => name.replace(' ', "-"),
    }
}

/* ---------------- Display names ---------------- */

/// "Last, First"
pub fn display_name(first: &str, last: &str) -> String {
    let (first, last) = (first.trim(), last.trim());
    match (first.is_empty(), last.is_empty()) {
        (true, _) => s!(last),
        (_, true) => s!(first),
        _ => join!(last, ", ", first),
    }
}

/// Split "First Rest Of Name" on the first whitespace.
pub fn split_full_name(full: &str) -> (String, String) {
    let mut tokens = full.split_whitespace();
    let first = tokens.next().map(String::from).unwrap_or_default();
    let rest: Vec<&str> = tokens.collect();
    (first, rest.join(" "))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => s!(),
    }
}

/// Capitalize each word. Anything other than letters, digits and `&#.-`
/// separates words; separators collapse to a single space.
pub fn camel_case(s: &str) -> String {
    s.split(|c: char| !(c.is_ascii_alphanumeric() || "&#.-".contains(c)))
        .filter(|w| !w.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/* ---------------- Classes ---------------- */

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// Replace every occurrence of the target.
    #[default]
    Inline,
    /// Replace from the target to the end of the name.
    ToEnd,
}

/// Class-name shortening rule, applied when the name contains `pattern`.
/// `replacement` may use `{initials}` and `{teacher_last}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ClassNameRule {
    pub pattern: String,
    pub replacement: String,
    /// Text that gets rewritten. Defaults to `pattern`.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub mode: RewriteMode,
    /// `ToEnd` only: `{initials}` expands to nothing unless the text after
    /// the target is the teacher's last name.
    #[serde(default)]
    pub suffix_is_teacher: bool,
}

impl ClassNameRule {
    fn apply(&self, name: &str, teacher_first: &str, teacher_last: &str) -> String {
        let target = self.target.as_deref().unwrap_or(&self.pattern);
        let Some(at) = name.find(target).filter(|_| !target.is_empty()) else {
            return s!(name);
        };
        let teacher_last = teacher_last.trim();

        let show_initials = match self.mode {
            RewriteMode::Inline => true,
            RewriteMode::ToEnd => !self.suffix_is_teacher || name[at + target.len()..].trim() == teacher_last,
        };
        let letters = if show_initials { initials(teacher_first, teacher_last) } else { s!() };
        let replacement = self
            .replacement
            .replace("{initials}", &letters)
            .replace("{teacher_last}", teacher_last);

        let rewritten = match self.mode {
            RewriteMode::Inline => name.replace(target, &replacement),
            RewriteMode::ToEnd => join!(&name[..at], &replacement),
        };
        rewritten.trim().to_string()
    }
}

/// Upper-case initials, "Anna Maria" "Schmidt" → "AMS".
pub fn initials(first: &str, last: &str) -> String {
    first
        .split_whitespace()
        .chain(last.split_whitespace())
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn class_name(name: &str, teacher_first: &str, teacher_last: &str, rules: &[ClassNameRule]) -> String {
    let name = name.trim();
    match rules.iter().find(|r| !r.pattern.is_empty() && name.contains(&r.pattern)) {
        Some(rule) => rule.apply(name, teacher_first, teacher_last),
        None => s!(name),
    }
}

/// "Name - Section", or just the name when there is no section.
pub fn section_name(name: &str, section: &str) -> String {
    let (name, section) = (name.trim(), section.trim());
    if section.is_empty() || name.ends_with(section) {
        s!(name)
    } else {
        join!(name, " - ", section)
    }
}

/// Period number from a class name: "P3" or "Period 3" → "3".
pub fn period(class_name: &str) -> String {
    let tokens: Vec<&str> = class_name.split(|c: char| c.is_whitespace() || c == '-' || c == '(' || c == ')')
        .filter(|t| !t.is_empty())
        .collect();
    for (i, token) in tokens.iter().enumerate() {
        if let Some(n) = token.strip_prefix('P').or_else(|| token.strip_prefix('p')) {
            if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) {
                return s!(n);
            }
        }
        if token.eq_ignore_ascii_case("period") {
            if let Some(next) = tokens.get(i + 1).filter(|n| n.chars().all(|c| c.is_ascii_digit())) {
                return s!(*next);
            }
        }
    }
    s!()
}

/// Staff id as exported; the API uses 0 for "no teacher".
pub fn teacher_id(primary_staff_id: &str) -> String {
    let id = primary_staff_id.trim();
    if id.is_empty() || id == "0" { s!() } else { s!(id) }
}
