// src/reports/clever.rs
//
// Clever-style interchange: schools, students, sections, teachers,
// enrollments, plus the guardian `user` / `guardianrelationship` pair.

use crate::config::consts::US_DATE_FORMAT;
use crate::data::DataSet;
use crate::error::Result;
use crate::fields::date::format_date;
use crate::fields::names::{period, section_name, teacher_id};
use crate::fields::{
    classify_relationship, derive_term, parse_date, phone_display, staff_email, student_email, translate_grade,
};

use super::{CurrentYear, Report, ReportContext};

pub struct Clever;

impl Report for Clever {
    fn name(&self) -> &'static str {
        "clever"
    }

    fn generate(&self, ctx: &ReportContext<'_>) -> Result<Vec<DataSet>> {
        let year = ctx.current_year()?;
        Ok(vec![
            schools(ctx)?,
            students(ctx)?,
            sections(ctx, &year),
            teachers(ctx),
            enrollments(ctx),
            guardian_users(ctx),
            guardian_relationships(ctx),
        ])
    }
}

fn schools(ctx: &ReportContext<'_>) -> Result<DataSet> {
    let school = ctx.school()?;
    let principal = ctx.principal()?;
    let mut out = DataSet::new(
        "schools",
        headers![
            "School_id", "School_name", "School_number", "Low_grade", "High_grade",
            "Principal", "Principal_email",
        ],
    );
    out.push(vec![
        s!(ctx.school_id),
        s!(school.name.trim()),
        s!(ctx.school_id),
        ctx.profile.low_grade.clone(),
        ctx.profile.high_grade.clone(),
        join!(principal.first_name.trim(), " ", principal.last_name.trim()),
        s!(principal.email.trim()),
    ]);
    Ok(out)
}

fn students(ctx: &ReportContext<'_>) -> Result<DataSet> {
    let data = ctx.data;
    let profile = ctx.profile;
    let mut out = DataSet::new(
        "students",
        headers![
            "Student_id", "School_id", "Username", "Student_number", "Dob", "Grade", "State_id",
            "Secondary_email", "First_name", "Last_name", "Middle_name", "Status", "Password",
        ],
    );

    for student in data.students.iter() {
        let Some(d) = ctx.join(&data.student_details, &student.key, &student.key)? else {
            continue;
        };
        if d.grade.is_none() {
            ctx.skip(&student.key, "student has no grade");
            continue;
        }
        out.push(vec![
            student.key.clone(),
            s!(ctx.school_id),
            student_email(&d.first_name, &d.last_name, profile, false),
            s!(d.ext_id.trim()),
            format_date(parse_date(&d.dob), US_DATE_FORMAT),
            translate_grade(d.grade.as_deref(), &profile.grades),
            s!(d.state_id.trim()),
            s!(d.email.trim()),
            s!(d.first_name.trim()),
            s!(d.last_name.trim()),
            s!(),
            s!(),
            s!(d.code.trim()),
        ]);
    }
    Ok(out)
}

fn sections(ctx: &ReportContext<'_>, year: &CurrentYear<'_>) -> DataSet {
    let mut out = DataSet::new(
        "sections",
        headers![
            "Section_id", "School_id", "Teacher_id", "Name", "Term_name", "Term_start", "Term_end",
            "Course_name", "Subject", "Period", "Status",
        ],
    );
    for class in ctx.data.classes.iter() {
        let c = &class.value;
        let term = derive_term(&c.term_length, year.bounds.as_ref(), &ctx.profile.terms);
        out.push(vec![
            class.key.clone(),
            s!(ctx.school_id),
            teacher_id(&c.primary_staff_id),
            section_name(&c.name, &c.section),
            term.code,
            format_date(term.start, US_DATE_FORMAT),
            format_date(term.end, US_DATE_FORMAT),
            s!(c.name.trim()),
            ctx.profile.section_subject.clone(),
            period(&c.name),
            s!("Active"),
        ]);
    }
    out
}

fn teachers(ctx: &ReportContext<'_>) -> DataSet {
    let profile = ctx.profile;
    let mut out = DataSet::new(
        "teachers",
        headers![
            "Teacher_id", "School_id", "Teacher_email", "Username", "Title",
            "Last_name", "First_name", "Password",
        ],
    );
    for teacher in ctx.teaching_staff() {
        let t = &teacher.value;
        out.push(vec![
            teacher.key.clone(),
            s!(ctx.school_id),
            staff_email(&t.first_name, &t.last_name, &t.email, profile, true),
            staff_email(&t.first_name, &t.last_name, &t.email, profile, false),
            s!(t.position.trim()),
            s!(t.last_name.trim()),
            s!(t.first_name.trim()),
            profile.teacher_password.clone(),
        ]);
    }
    out
}

fn enrollments(ctx: &ReportContext<'_>) -> DataSet {
    let data = ctx.data;
    let mut out = DataSet::new("enrollments", headers!["School_id", "Section_id", "Student_id"]);
    for student in data.students.iter().filter(|s| ctx.is_rostered(&s.key)) {
        for enrollment in data.student_classes.children(&student.key) {
            out.push(vec![s!(ctx.school_id), s!(enrollment.value.id.trim()), student.key.clone()]);
        }
    }
    out.dedup();
    out
}

/// One row per primary-parent phone number (work, home, cell).
fn guardian_users(ctx: &ReportContext<'_>) -> DataSet {
    let mut out = DataSet::new("user", headers!["Email", "First Name", "Last Name", "Phone", "SIS ID"]);
    for contact in ctx.data.family_contacts.iter().map(|k| &k.value) {
        if !contact.primary_parent || !super::is_valid_contact(contact) {
            continue;
        }
        for phone in [&contact.work_phone, &contact.home_phone, &contact.cell_phone] {
            if phone.trim().is_empty() {
                continue;
            }
            out.push(vec![
                s!(contact.email.trim()),
                s!(contact.first_name.trim()),
                s!(contact.last_name.trim()),
                phone_display(phone),
                s!(contact.id.trim()),
            ]);
        }
    }
    out.dedup();
    out
}

fn guardian_relationships(ctx: &ReportContext<'_>) -> DataSet {
    let data = ctx.data;
    let mut out = DataSet::new("guardianrelationship", headers!["SIS ID", "Email", "Role"]);
    for family in data.families.iter() {
        let guardians = ctx
            .contacts_of(&family.key)
            .filter(|c| c.primary_parent && !c.email.trim().is_empty());
        for contact in guardians {
            let role = classify_relationship(&contact.relation, &ctx.profile.relationships);
            for student in data.family_students.children(&family.key) {
                out.push(vec![s!(student.value.id.trim()), s!(contact.email.trim()), s!(role.as_str())]);
            }
        }
    }
    out.dedup();
    out
}
