// src/reports/validation.rs
//
// Data-quality checks over the source records. Every violation becomes one
// row; nothing here fails the run.

use std::collections::HashSet;

use crate::config::profile::Profile;
use crate::core::sanitize::{has_untrimmed_ends, normalize_ws};
use crate::data::DataSet;
use crate::error::Result;
use crate::fields::email::in_domain;

use super::{Report, ReportContext};

pub struct Validation;

pub const UNTRIMMED: &str = "NoLeadingOrTrailingSpace";
pub const DOUBLE_SPACE: &str = "OnlyOneSpaceBetweenPartsOfName";
pub const DISALLOWED: &str = "NoDisallowedCharactersInName";
pub const SPACE_IN_LAST_NAME: &str = "DoubleNamesSeparatedByHyphen";
pub const STAFF_EMAIL_DOMAIN: &str = "StaffEmailInInstitutionDomain";
pub const FAMILY_WITHOUT_STUDENTS: &str = "FamiliesHaveStudents";
pub const CLASS_WITHOUT_STUDENTS: &str = "ClassesHaveStudents";

struct Violations(DataSet);

impl Violations {
    fn add(&mut self, rule: &str, entity: &str, key: &str, field: &str, value: &str) {
        self.0.push(vec![s!(rule), s!(entity), s!(key), s!(field), s!(value)]);
    }

    /// Name checks shared by students, staff and contacts.
    fn check_name(&mut self, profile: &Profile, entity: &str, key: &str, first: &str, last: &str) {
        for (field, value) in [("FirstName", first), ("LastName", last)] {
            if has_untrimmed_ends(value) {
                self.add(UNTRIMMED, entity, key, field, value);
            }
            if let Some(bad) = profile.disallowed_name_fragments.iter().find(|f| value.contains(f.as_str())) {
                tracing::debug!(entity, key, fragment = %bad, "disallowed name fragment");
                self.add(DISALLOWED, entity, key, field, value);
            }
        }
        if normalize_ws(first) != first.trim() {
            self.add(DOUBLE_SPACE, entity, key, "FirstName", first);
        }
        let last_trimmed = last.trim();
        if last_trimmed.contains(' ') {
            let lower = last_trimmed.to_lowercase();
            let has_particle = profile
                .name_particles
                .iter()
                .any(|p| lower.contains(&p.to_lowercase()));
            if !has_particle {
                self.add(SPACE_IN_LAST_NAME, entity, key, "LastName", last);
            }
        }
    }
}

impl Report for Validation {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn generate(&self, ctx: &ReportContext<'_>) -> Result<Vec<DataSet>> {
        let data = ctx.data;
        let profile = ctx.profile;
        let mut v = Violations(DataSet::new("violations", headers!["Rule", "Entity", "Key", "Field", "Value"]));

        for student in data.students.iter() {
            let s = &student.value;
            v.check_name(profile, data.students.entity(), &student.key, &s.first_name, &s.last_name);
        }

        for employee in data.employees.iter().filter(|e| e.value.active) {
            let e = &employee.value;
            v.check_name(profile, data.employees.entity(), &employee.key, &e.first_name, &e.last_name);
            if has_untrimmed_ends(&e.email) {
                v.add(UNTRIMMED, data.employees.entity(), &employee.key, "Email1", &e.email);
            }
            if e.current && !e.email.trim().is_empty() && !in_domain(&e.email, &profile.staff_domain) {
                v.add(STAFF_EMAIL_DOMAIN, data.employees.entity(), &employee.key, "Email1", &e.email);
            }
        }

        for contact in data.family_contacts.iter() {
            let c = &contact.value;
            v.check_name(profile, data.family_contacts.entity(), &contact.key, &c.first_name, &c.last_name);
            if has_untrimmed_ends(&c.email) {
                v.add(UNTRIMMED, data.family_contacts.entity(), &contact.key, "Email", &c.email);
            }
        }

        for family in data.families.iter() {
            if !data.family_students.has_children(&family.key) {
                v.add(FAMILY_WITHOUT_STUDENTS, data.families.entity(), &family.key, "Name", &family.value.name);
            }
        }

        let enrolled: HashSet<&str> = data.student_classes.iter().map(|e| e.value.id.trim()).collect();
        for class in data.classes.iter() {
            if !enrolled.contains(class.key.as_str()) {
                v.add(CLASS_WITHOUT_STUDENTS, data.classes.entity(), &class.key, "Name", &class.value.name);
            }
        }

        let out = v.0;
        if !out.is_empty() {
            tracing::warn!(violations = out.len(), "data-quality violations found");
        }
        Ok(vec![out])
    }
}
