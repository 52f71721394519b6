// tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use sis_roster::core::net::{Payload, RemoteClient, UrlTemplate};
use sis_roster::error::{Error, Result};

pub const SCHOOL_ID: &str = "S1";

/// Canned answer for one URL.
#[derive(Clone, Debug)]
pub enum Reply {
    Json(Value),
    NoContent,
    Status(u16),
}

/// In-memory stand-in for the SIS API. Clones share state, so a test can keep
/// a handle while the cache owns a boxed copy.
#[derive(Clone, Default)]
pub struct FakeApi {
    replies: Arc<Mutex<HashMap<String, Vec<Reply>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer `url` with `reply`.
    pub fn on(&self, url: &str, reply: Reply) -> &Self {
        self.replies.lock().unwrap().insert(url.to_string(), vec![reply]);
        self
    }

    /// Answer `url` with each reply in turn; the last one sticks.
    pub fn on_seq(&self, url: &str, replies: Vec<Reply>) -> &Self {
        self.replies.lock().unwrap().insert(url.to_string(), replies);
        self
    }

    pub fn json(&self, url: &str, value: Value) -> &Self {
        self.on(url, Reply::Json(value))
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }

    pub fn boxed(&self) -> Box<dyn RemoteClient> {
        Box::new(self.clone())
    }
}

impl RemoteClient for FakeApi {
    fn fetch(&self, template: &UrlTemplate, scope_id: &str, entity_id: Option<&str>) -> Result<Payload> {
        let url = template.render(scope_id, entity_id);
        self.calls.lock().unwrap().push(url.clone());

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            match replies.get_mut(&url) {
                Some(queue) if queue.len() > 1 => Some(queue.remove(0)),
                Some(queue) => queue.first().cloned(),
                None => None,
            }
        };
        match reply {
            Some(Reply::Json(v)) => Payload::from_json(v, &url),
            Some(Reply::NoContent) => Ok(Payload::NoContent),
            Some(Reply::Status(status)) => Err(Error::RemoteRequestFailed { status, url }),
            None => Err(Error::RemoteRequestFailed { status: 404, url }),
        }
    }
}

/// A small but complete school behind the default catalog.
///
/// - F1 has three contacts (two primary parents) and one student, ST1.
/// - F2 has no contacts and no students.
/// - ST2 points at a family that does not exist and has no grade.
/// - CL1 is taught by E1; CL2 has no teacher and no students.
/// - E9 is their own manager (the principal).
pub fn school_api() -> FakeApi {
    let api = FakeApi::new();
    api.json("/School/S1", json!({ "Name": "Test Academy" }))
        .json(
            "/School/S1/Families",
            json!([
                { "ID": "F1", "Code": "100", "Name": "Ann & Bob Smith", "Address": "12 main st",
                  "Address2": "apt 4", "City": "boston", "State": "Massachusetts", "ZIP": "02110-1234" },
                { "ID": "F2", "Code": "200", "Name": "Lee Family", "Address": "1 elm rd",
                  "Address2": "", "City": "salem", "State": "NH", "ZIP": "03079" }
            ]),
        )
        .json(
            "/Family/F1/Contacts",
            json!([
                { "ID": "C1", "FirstName": "Ann", "LastName": "Smith", "Email": "ann@example.com",
                  "Relation": "Mother", "PrimaryParent": 1, "CellPhone": "617-555-0100",
                  "WorkPhone": "", "HomePhone": "617 555 0199" },
                { "ID": "C2", "FirstName": "Bob", "LastName": "Smith", "Email": "bob@example.com",
                  "Relation": "Father", "PrimaryParent": "1", "CellPhone": "",
                  "WorkPhone": "(617) 555-0111", "HomePhone": "" },
                { "ID": "C3", "FirstName": "Gran", "LastName": "Smith", "Email": "gran@example.com",
                  "Relation": "Grandmother", "PrimaryParent": 0, "CellPhone": "",
                  "WorkPhone": "", "HomePhone": "" }
            ]),
        )
        .on("/Family/F2/Contacts", Reply::NoContent)
        .json("/Family/F1", json!({ "ID": "F1" }))
        .json("/Family/F2", json!({ "ID": "F2" }))
        .json("/Family/F1/Students", json!([{ "ID": "ST1", "FirstName": "Carl", "LastName": "Smith" }]))
        .on("/Family/F2/Students", Reply::NoContent)
        .json(
            "/School/S1/Students",
            json!([
                { "ID": "ST1", "FamilyID": "F1", "StudentCode": "Az9-", "FirstName": "Carl",
                  "LastName": "Smith", "ExternalID": "E-1" },
                { "ID": "ST2", "FamilyID": "F9", "StudentCode": "Qq1", "FirstName": "Dana",
                  "LastName": "von Neumann", "ExternalID": "E-2" }
            ]),
        )
        .json(
            "/Student/ST1/Classes?quarter=0&format=1",
            json!([{ "ID": "CL1", "Name": "French 1 P3" }]),
        )
        .json(
            "/Student/ST2/Classes?quarter=0&format=1",
            json!([{ "ID": "CL1", "Name": "French 1 P3" }]),
        )
        .json(
            "/Student/ST1",
            json!({ "FirstName": "Carl", "LastName": "Smith", "Grade": "3rd", "ExtID": "E-1",
                    "DOB": "2015-04-02", "StateID": "SID1", "Email": "carl@home.example", "Code": "Az9-" }),
        )
        .json(
            "/Student/ST2",
            json!({ "FirstName": "Dana", "LastName": "von Neumann", "Grade": null, "ExtID": "E-2",
                    "DOB": "", "StateID": "", "Email": "", "Code": "Qq1" }),
        )
        .json("/School/S1/Contacts", json!([]))
        .json(
            "/School/S1/Classes?quarter=0",
            json!({ "Period": [
                { "ID": "CL1", "Name": "French 1 P3", "Section": "A", "PrimaryStaffID": "E1",
                  "PrimaryTeacher": "Marie Curie", "TermLength": "First" },
                { "ID": "CL2", "Name": "Art", "Section": "", "PrimaryStaffID": 0,
                  "PrimaryTeacher": "", "TermLength": "Full Year" }
            ]}),
        )
        .json("/School/S1/Classes/CL1", json!({ "Facility": { "Name": "Room 101" } }))
        .json("/School/S1/Classes/CL2", json!({ "Facility": null }))
        .json(
            "/School/S1/Employees",
            json!([
                { "ID": "E1", "FirstName": "Marie", "LastName": "Curie", "Email1": "mcurie@example.org",
                  "Position": "Teacher", "Active": 1, "Current": 1, "ManagerID": "E9" },
                { "ID": "E9", "FirstName": "Paul", "LastName": "Head", "Email1": "phead@example.org",
                  "Position": "Administrator", "Active": 1, "Current": 1, "ManagerID": "E9" }
            ]),
        )
        .json(
            "/School/S1/Years",
            json!([
                { "ID": "Y1", "Name": "2023-2024", "Current": "1" },
                { "ID": "Y0", "Name": "2022-2023", "Current": "0" }
            ]),
        )
        .json(
            "/School/S1/Years/Y1",
            json!({ "Name": "2023-2024", "Q1": { "StartDate": "2023-09-01" },
                    "Q3": { "StartDate": "2024-01-15" }, "EndDate": "2024-06-15T00:00:00" }),
        )
        .json(
            "/School/S1/Years/Y0",
            json!({ "Name": "2022-2023", "Q1": null, "Q3": null, "EndDate": "" }),
        );
    api
}
