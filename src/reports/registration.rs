// src/reports/registration.rs
//
// Registration roster: one row per (student, class) enrollment with the
// student's family, parents and teacher alongside. Families with more than two
// primary parents get their extra contacts listed in `parent_overflow`.

use std::collections::HashMap;

use crate::data::DataSet;
use crate::error::Result;
use crate::fields::names::{class_name, split_full_name, teacher_id};
use crate::fields::{city_state_zip, display_name, incr_string, street_address, student_email};

use super::{PrimaryParents, Report, ReportContext};

pub struct Registration;

pub const REGISTRATIONS: &str = "registrations";
pub const PARENT_OVERFLOW: &str = "parent_overflow";

impl Report for Registration {
    fn name(&self) -> &'static str {
        "registration"
    }

    fn generate(&self, ctx: &ReportContext<'_>) -> Result<Vec<DataSet>> {
        let data = ctx.data;
        let profile = ctx.profile;

        let parents: HashMap<&str, PrimaryParents<'_>> = data
            .families
            .iter()
            .map(|f| (f.key.as_str(), ctx.primary_parents(&f.key)))
            .collect();

        let mut out = DataSet::new(
            REGISTRATIONS,
            headers![
                "StudentLastName", "StudentFirstName", "StudentName",
                "Class", "Room",
                "TeacherLastName", "TeacherFirstName", "TeacherName",
                "StudentEmail", "FamilyID", "StudentCode", "CompanionCode",
                "Parent1LastName", "Parent1FirstName", "Parent2LastName", "Parent2FirstName",
                "ParentNames", "StudentLastNameIfDifferent",
                "PrimaryParentEmail", "SecondaryParentEmail", "TertiaryParentEmail",
                "StreetAddress", "CityStateZip",
            ],
        );

        for student in data.students.iter() {
            let s = &student.value;
            if !data.student_classes.has_children(&student.key) {
                ctx.skip(&student.key, "student has no classes");
                continue;
            }
            let Some(family) = ctx.join(&data.families, &s.family_id, &student.key)? else {
                continue;
            };

            let (p1, p2) = match parents.get(s.family_id.as_str()) {
                Some(p) => (p.kept.first().copied(), p.kept.get(1).copied()),
                None => (None, None),
            };
            let parent1_last = p1.map(|c| c.last_name.trim()).unwrap_or_default();
            let last_if_different = if parent1_last == s.last_name.trim() { "" } else { s.last_name.trim() };

            let mut emails = ctx.family_emails(&s.family_id).into_iter();
            let (email1, email2, email3) = (
                emails.next().unwrap_or_default(),
                emails.next().unwrap_or_default(),
                emails.next().unwrap_or_default(),
            );

            for enrollment in data.student_classes.children(&student.key) {
                let row = join!(&student.key, "/", &enrollment.value.id);
                let Some(class) = ctx.join(&data.classes, &enrollment.value.id, &row)? else {
                    continue;
                };
                let teacher = match teacher_id(&class.primary_staff_id) {
                    id if id.is_empty() => None,
                    id => match ctx.join(&data.employees, &id, &row)? {
                        Some(t) => Some(t),
                        None => continue,
                    },
                };
                // unstaffed classes may still carry the teacher's name as text
                let (tf, tl) = match teacher {
                    Some(t) => (s!(t.first_name.trim()), s!(t.last_name.trim())),
                    None => split_full_name(&class.primary_teacher),
                };
                let room = data
                    .class_details
                    .get(&class.id)
                    .and_then(|d| d.room())
                    .unwrap_or_default();

                out.push(vec![
                    s!(s.last_name.trim()),
                    s!(s.first_name.trim()),
                    display_name(&s.first_name, &s.last_name),
                    class_name(&enrollment.value.name, &tf, &tl, &profile.class_names),
                    s!(room),
                    tl.clone(),
                    tf.clone(),
                    display_name(&tf, &tl),
                    student_email(&s.first_name, &s.last_name, profile, true),
                    s!(family.code.trim()),
                    s!(s.code.trim()),
                    incr_string(s.code.trim()),
                    s!(parent1_last),
                    p1.map(|c| s!(c.first_name.trim())).unwrap_or_default(),
                    p2.map(|c| s!(c.last_name.trim())).unwrap_or_default(),
                    p2.map(|c| s!(c.first_name.trim())).unwrap_or_default(),
                    s!(family.name.trim()),
                    s!(last_if_different),
                    email1.clone(),
                    email2.clone(),
                    email3.clone(),
                    street_address(&family.address, &family.address2),
                    city_state_zip(&family.city, &family.state, &family.zip, &profile.states),
                ]);
            }
        }

        let mut overflow = DataSet::new(
            PARENT_OVERFLOW,
            headers!["FamilyID", "ParentNames", "ContactID", "FirstName", "LastName", "Email", "Relation"],
        );
        for family in data.families.iter() {
            let Some(p) = parents.get(family.key.as_str()) else { continue };
            for contact in &p.overflow {
                overflow.push(vec![
                    s!(family.value.code.trim()),
                    s!(family.value.name.trim()),
                    s!(contact.id.trim()),
                    s!(contact.first_name.trim()),
                    s!(contact.last_name.trim()),
                    s!(contact.email.trim()),
                    s!(contact.relation_label().unwrap_or_default()),
                ]);
            }
        }

        tracing::info!(rows = out.len(), overflow = overflow.len(), "registration roster built");
        Ok(vec![out, overflow])
    }
}
