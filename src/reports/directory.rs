// src/reports/directory.rs
//
// Student account list for identity provisioning.

use crate::data::DataSet;
use crate::error::Result;
use crate::fields::student_email;

use super::{Report, ReportContext};

pub struct Directory;

impl Report for Directory {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn generate(&self, ctx: &ReportContext<'_>) -> Result<Vec<DataSet>> {
        let data = ctx.data;
        let mut out = DataSet::new("students", headers!["EmailAddress", "SourceId", "LastName", "FirstName"]);

        for student in data.students.iter() {
            let Some(details) = ctx.join(&data.student_details, &student.key, &student.key)? else {
                continue;
            };
            if details.grade.is_none() {
                ctx.skip(&student.key, "student has no grade");
                continue;
            }
            out.push(vec![
                student_email(&details.first_name, &details.last_name, ctx.profile, true),
                s!(student.value.code.trim()),
                s!(details.last_name.trim()),
                s!(details.first_name.trim()),
            ]);
        }

        out.dedup();
        out.sort_by_columns(&["LastName", "FirstName"]);
        Ok(vec![out])
    }
}
