// tests/reports.rs
mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use tracing_test::traced_test;

use common::{school_api, FakeApi, SCHOOL_ID};
use sis_roster::cache::Cache;
use sis_roster::catalog::Catalog;
use sis_roster::config::options::JoinPolicy;
use sis_roster::config::profile::Profile;
use sis_roster::data::DataSet;
use sis_roster::error::Error;
use sis_roster::records::SchoolData;
use sis_roster::reports::clever::Clever;
use sis_roster::reports::directory::Directory;
use sis_roster::reports::oneroster::OneRoster;
use sis_roster::reports::registration::{Registration, PARENT_OVERFLOW, REGISTRATIONS};
use sis_roster::reports::validation::{self, Validation};
use sis_roster::reports::{Report, ReportContext};

fn load(api: &FakeApi) -> SchoolData {
    let mut cache = Cache::remote(Catalog::school_default().unwrap(), SCHOOL_ID, api.boxed());
    SchoolData::load(&mut cache).unwrap()
}

fn table<'a>(tables: &'a [DataSet], name: &str) -> &'a DataSet {
    tables.iter().find(|t| t.name == name).unwrap()
}

fn cell<'a>(t: &'a DataSet, row: usize, column: &str) -> &'a str {
    &t.rows[row][t.column(column).unwrap()]
}

fn generate(report: &dyn Report, data: &SchoolData, joins: JoinPolicy) -> (Vec<DataSet>, usize) {
    let profile = Profile::default();
    let ctx = ReportContext::new(data, &profile, SCHOOL_ID, joins);
    let tables = report.generate(&ctx).unwrap();
    (tables, ctx.skipped())
}

/* ---------------- Registration ---------------- */

#[test]
#[traced_test]
fn registration_row_for_each_enrollment() {
    let data = load(&school_api());
    let (tables, skipped) = generate(&Registration, &data, JoinPolicy::SkipRow);

    let reg = table(&tables, REGISTRATIONS);
    assert_eq!(reg.len(), 1, "ST2 references a missing family");
    assert_eq!(skipped, 1);
    assert!(logs_contain("join target missing"));

    assert_eq!(cell(reg, 0, "StudentName"), "Smith, Carl");
    assert_eq!(cell(reg, 0, "Class"), "French 1 P3");
    assert_eq!(cell(reg, 0, "Room"), "Room 101");
    assert_eq!(cell(reg, 0, "TeacherName"), "Curie, Marie");
    assert_eq!(cell(reg, 0, "StudentEmail"), "Carl.Smith@student.example.org");
    assert_eq!(cell(reg, 0, "FamilyID"), "100");
    assert_eq!(cell(reg, 0, "StudentCode"), "Az9-");
    assert_eq!(cell(reg, 0, "CompanionCode"), "Ba0~");
    assert_eq!(cell(reg, 0, "Parent1FirstName"), "Ann");
    assert_eq!(cell(reg, 0, "Parent2FirstName"), "Bob");
    assert_eq!(cell(reg, 0, "StudentLastNameIfDifferent"), "");
    assert_eq!(cell(reg, 0, "PrimaryParentEmail"), "ann@example.com");
    assert_eq!(cell(reg, 0, "SecondaryParentEmail"), "bob@example.com");
    assert_eq!(cell(reg, 0, "TertiaryParentEmail"), "gran@example.com");
    assert_eq!(cell(reg, 0, "StreetAddress"), "12 Main St, Apt 4");
    assert_eq!(cell(reg, 0, "CityStateZip"), "Boston, MA 02110");

    assert!(table(&tables, PARENT_OVERFLOW).is_empty());
}

#[test]
fn unstaffed_class_uses_teacher_name_text() {
    let api = school_api();
    api.json(
        "/School/S1/Classes?quarter=0",
        json!({ "Period": [
            { "ID": "CL1", "Name": "French 1 P3", "Section": "A", "PrimaryStaffID": 0,
              "PrimaryTeacher": "Ada King Lovelace", "TermLength": "First" }
        ]}),
    );
    let data = load(&api);
    let (tables, _) = generate(&Registration, &data, JoinPolicy::SkipRow);

    let reg = table(&tables, REGISTRATIONS);
    assert_eq!(cell(reg, 0, "TeacherFirstName"), "Ada");
    assert_eq!(cell(reg, 0, "TeacherLastName"), "King Lovelace");
    assert_eq!(cell(reg, 0, "TeacherName"), "King Lovelace, Ada");
}

#[test]
fn strict_joins_abort_on_missing_family() {
    let data = load(&school_api());
    let profile = Profile::default();
    let ctx = ReportContext::new(&data, &profile, SCHOOL_ID, JoinPolicy::Abort);

    match Registration.generate(&ctx) {
        Err(Error::IncompleteJoin { table, key }) => {
            assert_eq!(table, "families");
            assert_eq!(key, "F9");
        }
        other => panic!("expected IncompleteJoin, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
#[traced_test]
fn third_primary_parent_goes_to_overflow() {
    let api = school_api();
    api.json(
        "/Family/F1/Contacts",
        json!([
            { "ID": "C1", "FirstName": "Ann", "LastName": "Smith", "Email": "ann@example.com",
              "Relation": "Mother", "PrimaryParent": 1 },
            { "ID": "C2", "FirstName": "Bob", "LastName": "Smith", "Email": "bob@example.com",
              "Relation": "Father", "PrimaryParent": 1 },
            { "ID": "C4", "FirstName": "Eve", "LastName": "Jones", "Email": "eve@example.com",
              "Relation": "Stepmother", "PrimaryParent": 1 }
        ]),
    );
    let data = load(&api);
    let (tables, _) = generate(&Registration, &data, JoinPolicy::SkipRow);

    let reg = table(&tables, REGISTRATIONS);
    assert_eq!(cell(reg, 0, "Parent1FirstName"), "Ann");
    assert_eq!(cell(reg, 0, "Parent2FirstName"), "Bob");

    let overflow = table(&tables, PARENT_OVERFLOW);
    assert_eq!(overflow.len(), 1);
    assert_eq!(cell(overflow, 0, "ContactID"), "C4");
    assert_eq!(cell(overflow, 0, "FamilyID"), "100");
    assert_eq!(cell(overflow, 0, "Relation"), "Stepmother");
    assert!(logs_contain("more than two primary parents"));
}

/* ---------------- OneRoster ---------------- */

#[test]
fn oneroster_tables() {
    let data = load(&school_api());
    let (tables, skipped) = generate(&OneRoster, &data, JoinPolicy::SkipRow);

    let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        ["orgs", "users", "roles", "classes", "enrollments", "academicSessions", "courses", "relationships"]
    );
    assert_eq!(skipped, 1, "ST2 has no grade");

    let users = table(&tables, "users");
    assert_eq!(users.values("sourcedId"), ["C1", "C2", "C3", "ST1", "E1"]);
    assert_eq!(&users.values("phone")[..3], ["+16175550100", "+16175550111", ""]);
    assert_eq!(cell(users, 3, "username"), "Carl.Smith@student.example.org");
    assert_eq!(cell(users, 4, "email"), "mcurie@example.org");

    let roles = table(&tables, "roles");
    assert_eq!(roles.values("role"), ["student", "teacher"]);
    assert_eq!(roles.values("grade")[0], "3");
    assert_eq!(roles.values("sessionSourcedIds"), ["2023-2024", "2023-2024"]);

    let classes = table(&tables, "classes");
    assert_eq!(classes.values("title"), ["French 1 P3 - A", "Art"]);

    let enrollments = table(&tables, "enrollments");
    assert_eq!(enrollments.rows, vec![
        vec!["CL1".to_string(), "E1".to_string(), "teacher".to_string()],
        vec!["CL1".to_string(), "ST1".to_string(), "student".to_string()],
    ]);

    let sessions = table(&tables, "academicSessions");
    assert_eq!(cell(sessions, 0, "schoolYear"), "2023");
    assert_eq!(cell(sessions, 0, "startDate"), "2023-09-01");
    assert_eq!(cell(sessions, 0, "endDate"), "2024-06-15");

    let relationships = table(&tables, "relationships");
    assert_eq!(relationships.values("relationshipUserSourcedId"), ["C1", "C2", "C3"]);
    assert_eq!(relationships.values("relationshipRole"), ["parent", "parent", "relative"]);
    assert_eq!(relationships.values("userSourcedId"), ["ST1", "ST1", "ST1"]);
}

#[test]
fn two_current_years_is_ambiguous() {
    let api = school_api();
    api.json(
        "/School/S1/Years",
        json!([
            { "ID": "Y1", "Name": "2023-2024", "Current": "1" },
            { "ID": "Y0", "Name": "2022-2023", "Current": 1 }
        ]),
    );
    let data = load(&api);
    let profile = Profile::default();
    let ctx = ReportContext::new(&data, &profile, SCHOOL_ID, JoinPolicy::SkipRow);

    match OneRoster.generate(&ctx) {
        Err(Error::AmbiguousRequiredRecord { what, found }) => {
            assert_eq!(what, "current year");
            assert_eq!(found, 2);
        }
        other => panic!("expected AmbiguousRequiredRecord, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn missing_principal_is_an_error() {
    let api = school_api();
    api.json(
        "/School/S1/Employees",
        json!([{ "ID": "E1", "FirstName": "Marie", "LastName": "Curie", "Position": "Teacher",
                 "Active": 1, "Current": 1, "ManagerID": "E9" }]),
    );
    let data = load(&api);
    let profile = Profile::default();
    let ctx = ReportContext::new(&data, &profile, SCHOOL_ID, JoinPolicy::SkipRow);

    assert!(matches!(
        ctx.principal(),
        Err(Error::AmbiguousRequiredRecord { found: 0, .. })
    ));
}

/* ---------------- Clever ---------------- */

#[test]
fn clever_tables() {
    let data = load(&school_api());
    let (tables, _) = generate(&Clever, &data, JoinPolicy::SkipRow);

    let schools = table(&tables, "schools");
    assert_eq!(cell(schools, 0, "School_name"), "Test Academy");
    assert_eq!(cell(schools, 0, "Principal"), "Paul Head");
    assert_eq!(cell(schools, 0, "Principal_email"), "phead@example.org");

    let students = table(&tables, "students");
    assert_eq!(students.len(), 1);
    assert_eq!(cell(students, 0, "Username"), "Carl.Smith");
    assert_eq!(cell(students, 0, "Dob"), "04/02/2015");
    assert_eq!(cell(students, 0, "Grade"), "3");
    assert_eq!(cell(students, 0, "Password"), "Az9-");

    let sections = table(&tables, "sections");
    assert_eq!(sections.values("Term_name"), ["S1", "FY"]);
    assert_eq!(cell(sections, 0, "Term_start"), "09/01/2023");
    assert_eq!(cell(sections, 0, "Term_end"), "01/08/2024");
    assert_eq!(cell(sections, 0, "Period"), "3");
    assert_eq!(sections.values("Teacher_id"), ["E1", ""]);

    let teachers = table(&tables, "teachers");
    assert_eq!(teachers.values("Teacher_id"), ["E1"]);
    assert_eq!(cell(teachers, 0, "Username"), "mcurie");

    let enrollments = table(&tables, "enrollments");
    assert_eq!(enrollments.values("Student_id"), ["ST1"]);

    let guardians = table(&tables, "user");
    assert_eq!(guardians.values("Phone"), ["617-555-0199", "617-555-0100", "617-555-0111"]);
    assert_eq!(guardians.values("SIS ID"), ["C1", "C1", "C2"]);

    let links = table(&tables, "guardianrelationship");
    assert_eq!(links.values("Email"), ["ann@example.com", "bob@example.com"]);
    assert_eq!(links.values("Role"), ["Parent", "Parent"]);
}

/* ---------------- Directory / validation ---------------- */

#[test]
fn directory_lists_graded_students() {
    let data = load(&school_api());
    let (tables, skipped) = generate(&Directory, &data, JoinPolicy::SkipRow);

    let students = table(&tables, "students");
    assert_eq!(students.rows, vec![vec![
        "Carl.Smith@student.example.org".to_string(),
        "Az9-".to_string(),
        "Smith".to_string(),
        "Carl".to_string(),
    ]]);
    assert_eq!(skipped, 1);
}

#[test]
fn validation_flags_orphans_only() {
    let data = load(&school_api());
    let (tables, skipped) = generate(&Validation, &data, JoinPolicy::SkipRow);

    let v = table(&tables, "violations");
    assert_eq!(v.values("Rule"), [validation::FAMILY_WITHOUT_STUDENTS, validation::CLASS_WITHOUT_STUDENTS]);
    assert_eq!(v.values("Key"), ["F2", "CL2"]);
    assert_eq!(skipped, 0);
}

#[test]
fn validation_flags_bad_names_and_staff_domain() {
    let api = school_api();
    api.json(
        "/School/S1/Employees",
        json!([
            { "ID": "E1", "FirstName": "Marie ", "LastName": "Curie Sklodowska", "Email1": "marie@gmail.com",
              "Position": "Teacher", "Active": 1, "Current": 1, "ManagerID": "E9" },
            { "ID": "E9", "FirstName": "Paul", "LastName": "Head (Acting)", "Email1": "phead@example.org",
              "Position": "Administrator", "Active": 1, "Current": 1, "ManagerID": "E9" },
            { "ID": "E5", "FirstName": " Old", "LastName": "Staff Member", "Email1": "old@gmail.com",
              "Position": "Teacher", "Active": 0, "Current": 1, "ManagerID": "E9" },
            { "ID": "E6", "FirstName": "New", "LastName": "Hire", "Email1": "",
              "Position": "Aide", "Active": 1, "Current": 1, "ManagerID": "E9" }
        ]),
    );
    let data = load(&api);
    let (tables, _) = generate(&Validation, &data, JoinPolicy::SkipRow);

    let v = table(&tables, "violations");
    let employee_rules: Vec<(&str, &str)> = v
        .rows
        .iter()
        .filter(|r| r[1] == "employees")
        .map(|r| (r[0].as_str(), r[2].as_str()))
        .collect();
    assert_eq!(
        employee_rules,
        [
            (validation::UNTRIMMED, "E1"),
            (validation::SPACE_IN_LAST_NAME, "E1"),
            (validation::STAFF_EMAIL_DOMAIN, "E1"),
            (validation::DISALLOWED, "E9"),
            (validation::SPACE_IN_LAST_NAME, "E9"),
        ]
    );
}
