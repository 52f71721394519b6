// src/reports/oneroster.rs
//
// OneRoster-style interchange (orgs / users / roles / classes / enrollments /
// academicSessions / courses / relationships).

use chrono::Datelike;

use crate::config::consts::ISO_DATE_FORMAT;
use crate::data::DataSet;
use crate::error::Result;
use crate::fields::date::format_date;
use crate::fields::names::{section_name, teacher_id};
use crate::fields::{
    classify_relationship, parse_date, phone_e164, position_role, staff_email, student_email, translate_grade,
};
use crate::records::FamilyContact;

use super::{is_valid_contact, CurrentYear, Report, ReportContext};

pub struct OneRoster;

impl Report for OneRoster {
    fn name(&self) -> &'static str {
        "oneroster"
    }

    fn generate(&self, ctx: &ReportContext<'_>) -> Result<Vec<DataSet>> {
        let year = ctx.current_year()?;
        Ok(vec![
            orgs(ctx)?,
            users(ctx)?,
            roles(ctx, &year)?,
            classes(ctx, &year),
            enrollments(ctx)?,
            academic_sessions(&year),
            courses(ctx, &year),
            relationships(ctx),
        ])
    }
}

fn orgs(ctx: &ReportContext<'_>) -> Result<DataSet> {
    let school = ctx.school()?;
    let mut out = DataSet::new("orgs", headers!["sourcedId", "name", "type", "parentSourcedId"]);
    out.push(vec![s!(ctx.school_id), s!(school.name.trim()), s!("school"), s!()]);
    Ok(out)
}

/// Cell, then work, then home phone.
fn contact_phone(contact: &FamilyContact, country_code: &str) -> String {
    [&contact.cell_phone, &contact.work_phone, &contact.home_phone]
        .into_iter()
        .filter(|p| !p.trim().is_empty())
        .find_map(|p| phone_e164(p, country_code))
        .unwrap_or_default()
}

fn users(ctx: &ReportContext<'_>) -> Result<DataSet> {
    let data = ctx.data;
    let profile = ctx.profile;
    let mut out = DataSet::new(
        "users",
        headers![
            "sourcedId", "username", "familyName", "givenName", "activeDirectoryMatchId",
            "email", "phone", "sms", "userNumber",
        ],
    );

    for contact in data.family_contacts.iter().map(|k| &k.value) {
        if !is_valid_contact(contact) {
            continue;
        }
        let email = contact.email.trim();
        out.push(vec![
            s!(contact.id.trim()),
            s!(email),
            s!(contact.last_name.trim()),
            s!(contact.first_name.trim()),
            s!(),
            s!(email),
            contact_phone(contact, &profile.phone_country_code),
        ]);
    }

    for student in data.students.iter() {
        let Some(details) = ctx.join(&data.student_details, &student.key, &student.key)? else {
            continue;
        };
        if details.grade.is_none() {
            ctx.skip(&student.key, "student has no grade");
            continue;
        }
        let email = student_email(&details.first_name, &details.last_name, profile, true);
        out.push(vec![
            student.key.clone(),
            email.clone(),
            s!(details.last_name.trim()),
            s!(details.first_name.trim()),
            email.clone(),
            email,
            s!(),
            s!(),
            student.key.clone(),
        ]);
    }

    for teacher in ctx.teaching_staff() {
        let t = &teacher.value;
        let email = staff_email(&t.first_name, &t.last_name, &t.email, profile, true);
        out.push(vec![
            teacher.key.clone(),
            email.clone(),
            s!(t.last_name.trim()),
            s!(t.first_name.trim()),
            email.clone(),
            email,
            s!(),
            s!(),
            teacher.key.clone(),
        ]);
    }

    out.dedup();
    Ok(out)
}

fn roles(ctx: &ReportContext<'_>, year: &CurrentYear<'_>) -> Result<DataSet> {
    let data = ctx.data;
    let mut out = DataSet::new(
        "roles",
        headers![
            "userSourcedId", "orgSourcedId", "role", "sessionSourcedIds",
            "grade", "isPrimary", "roleStartDate", "roleEndDate",
        ],
    );

    for student in data.students.iter() {
        let Some(details) = ctx.join(&data.student_details, &student.key, &student.key)? else {
            continue;
        };
        if details.grade.is_none() {
            continue;
        }
        out.push(vec![
            student.key.clone(),
            s!(ctx.school_id),
            s!("student"),
            s!(year.name),
            translate_grade(details.grade.as_deref(), &ctx.profile.grades),
            s!("true"),
        ]);
    }

    for teacher in ctx.teaching_staff() {
        out.push(vec![
            teacher.key.clone(),
            s!(ctx.school_id),
            position_role(&teacher.value.position, &ctx.profile.positions),
            s!(year.name),
            s!(),
            s!("true"),
        ]);
    }

    out.dedup();
    Ok(out)
}

fn classes(ctx: &ReportContext<'_>, year: &CurrentYear<'_>) -> DataSet {
    let mut out = DataSet::new(
        "classes",
        headers!["sourcedId", "orgSourcedId", "title", "sessionSourcedIds", "courseSourcedId", "code"],
    );
    for class in ctx.data.classes.iter() {
        let c = &class.value;
        out.push(vec![
            class.key.clone(),
            s!(ctx.school_id),
            section_name(&c.name, &c.section),
            s!(year.name),
            class.key.clone(),
            class.key.clone(),
        ]);
    }
    out
}

fn enrollments(ctx: &ReportContext<'_>) -> Result<DataSet> {
    let data = ctx.data;
    let mut out = DataSet::new("enrollments", headers!["classSourcedId", "userSourcedId", "role"]);

    for class in data.classes.iter() {
        let staff = teacher_id(&class.value.primary_staff_id);
        if staff.is_empty() {
            continue;
        }
        if ctx.join(&data.employees, &staff, &class.key)?.is_some() {
            out.push(vec![class.key.clone(), staff, s!("teacher")]);
        }
    }

    for student in data.students.iter().filter(|s| ctx.is_rostered(&s.key)) {
        for enrollment in data.student_classes.children(&student.key) {
            out.push(vec![s!(enrollment.value.id.trim()), student.key.clone(), s!("student")]);
        }
    }

    out.dedup();
    Ok(out)
}

fn academic_sessions(year: &CurrentYear<'_>) -> DataSet {
    let mut out = DataSet::new(
        "academicSessions",
        headers!["sourcedId", "title", "type", "schoolYear", "startDate", "endDate"],
    );
    let start = parse_date(year.details.q1_start());
    let end = parse_date(&year.details.end_date);
    out.push(vec![
        s!(year.name),
        s!(year.name),
        s!("schoolYear"),
        start.map(|d| d.year().to_string()).unwrap_or_default(),
        format_date(start, ISO_DATE_FORMAT),
        format_date(end, ISO_DATE_FORMAT),
    ]);
    out
}

fn courses(ctx: &ReportContext<'_>, year: &CurrentYear<'_>) -> DataSet {
    let mut out = DataSet::new(
        "courses",
        headers!["sourcedId", "orgSourcedId", "title", "code", "schoolYearSourcedId", "subject", "grade"],
    );
    for class in ctx.data.classes.iter() {
        out.push(vec![
            class.key.clone(),
            s!(ctx.school_id),
            s!(class.value.name.trim()),
            class.key.clone(),
            s!(year.name),
            ctx.profile.course_subject.clone(),
            s!(),
        ]);
    }
    out
}

/// One row per (student, valid contact) in the same family.
fn relationships(ctx: &ReportContext<'_>) -> DataSet {
    let data = ctx.data;
    let mut out = DataSet::new(
        "relationships",
        headers!["userSourcedId", "relationshipUserSourcedId", "relationshipRole"],
    );
    for family in data.families.iter() {
        for contact in ctx.contacts_of(&family.key).filter(|c| is_valid_contact(c)) {
            let role = classify_relationship(&contact.relation, &ctx.profile.relationships);
            for student in data.family_students.children(&family.key) {
                out.push(vec![
                    s!(student.value.id.trim()),
                    s!(contact.id.trim()),
                    role.as_str().to_lowercase(),
                ]);
            }
        }
    }
    out.dedup();
    out
}
