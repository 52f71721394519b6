// src/records.rs
//
// Typed views over cached entity tables.
//
// The remote API is loose about scalar types (ids arrive as numbers or
// strings, flags as 1, "1" or true), so every field goes through the lenient
// decoders in `flex`. A row that still fails to decode is skipped with a
// warning; it never aborts a report.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::cache::Cache;
use crate::catalog::names;
use crate::error::Result;
use crate::table::EntityTable;

mod flex {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// Any scalar as text; null becomes "".
    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(crate::table::value_text(&Value::deserialize(d)?))
    }

    /// Null and "" become `None`.
    pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let s = string(d)?;
        Ok(if s.is_empty() { None } else { Some(s) })
    }

    /// 1, "1", true and "true" are set; everything else is not.
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_i64() == Some(1),
            Value::String(s) => matches!(s.trim(), "1" | "true" | "True"),
            _ => false,
        })
    }
}

/* ---------------- Entity schemas ---------------- */

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct School {
    #[serde(rename = "Name", deserialize_with = "flex::string")]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Family {
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "Code", deserialize_with = "flex::string")]
    pub code: String,
    #[serde(rename = "Name", deserialize_with = "flex::string")]
    pub name: String,
    #[serde(rename = "Address", deserialize_with = "flex::string")]
    pub address: String,
    #[serde(rename = "Address2", deserialize_with = "flex::string")]
    pub address2: String,
    #[serde(rename = "City", deserialize_with = "flex::string")]
    pub city: String,
    #[serde(rename = "State", deserialize_with = "flex::string")]
    pub state: String,
    #[serde(rename = "ZIP", deserialize_with = "flex::string")]
    pub zip: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FamilyContact {
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "FirstName", deserialize_with = "flex::string")]
    pub first_name: String,
    #[serde(rename = "LastName", deserialize_with = "flex::string")]
    pub last_name: String,
    #[serde(rename = "Email", deserialize_with = "flex::string")]
    pub email: String,
    /// Raw: usually a string, occasionally a number or null.
    #[serde(rename = "Relation")]
    pub relation: Value,
    #[serde(rename = "PrimaryParent", deserialize_with = "flex::flag")]
    pub primary_parent: bool,
    #[serde(rename = "CellPhone", deserialize_with = "flex::string")]
    pub cell_phone: String,
    #[serde(rename = "WorkPhone", deserialize_with = "flex::string")]
    pub work_phone: String,
    #[serde(rename = "HomePhone", deserialize_with = "flex::string")]
    pub home_phone: String,
}

impl FamilyContact {
    pub fn relation_label(&self) -> Option<&str> {
        self.relation.as_str()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FamilyStudent {
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "FirstName", deserialize_with = "flex::string")]
    pub first_name: String,
    #[serde(rename = "LastName", deserialize_with = "flex::string")]
    pub last_name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Student {
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "FamilyID", deserialize_with = "flex::string")]
    pub family_id: String,
    #[serde(rename = "StudentCode", deserialize_with = "flex::string")]
    pub code: String,
    #[serde(rename = "FirstName", deserialize_with = "flex::string")]
    pub first_name: String,
    #[serde(rename = "LastName", deserialize_with = "flex::string")]
    pub last_name: String,
    #[serde(rename = "ExternalID", deserialize_with = "flex::string")]
    pub external_id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StudentDetails {
    #[serde(rename = "FirstName", deserialize_with = "flex::string")]
    pub first_name: String,
    #[serde(rename = "LastName", deserialize_with = "flex::string")]
    pub last_name: String,
    #[serde(rename = "Grade", deserialize_with = "flex::opt_string")]
    pub grade: Option<String>,
    #[serde(rename = "ExtID", deserialize_with = "flex::string")]
    pub ext_id: String,
    #[serde(rename = "DOB", deserialize_with = "flex::string")]
    pub dob: String,
    #[serde(rename = "StateID", deserialize_with = "flex::string")]
    pub state_id: String,
    #[serde(rename = "Email", deserialize_with = "flex::string")]
    pub email: String,
    #[serde(rename = "Code", deserialize_with = "flex::string")]
    pub code: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct StudentClass {
    /// Class id.
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "Name", deserialize_with = "flex::string")]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Class {
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "Name", deserialize_with = "flex::string")]
    pub name: String,
    #[serde(rename = "Section", deserialize_with = "flex::string")]
    pub section: String,
    #[serde(rename = "PrimaryStaffID", deserialize_with = "flex::string")]
    pub primary_staff_id: String,
    #[serde(rename = "PrimaryTeacher", deserialize_with = "flex::string")]
    pub primary_teacher: String,
    #[serde(rename = "TermLength", deserialize_with = "flex::string")]
    pub term_length: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Named {
    #[serde(rename = "Name", deserialize_with = "flex::string")]
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ClassDetails {
    #[serde(rename = "Facility")]
    pub facility: Option<Named>,
}

impl ClassDetails {
    pub fn room(&self) -> Option<&str> {
        self.facility
            .as_ref()
            .map(|f| f.name.trim())
            .filter(|n| !n.is_empty())
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Employee {
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "FirstName", deserialize_with = "flex::string")]
    pub first_name: String,
    #[serde(rename = "LastName", deserialize_with = "flex::string")]
    pub last_name: String,
    #[serde(rename = "Email1", deserialize_with = "flex::string")]
    pub email: String,
    #[serde(rename = "Position", deserialize_with = "flex::string")]
    pub position: String,
    #[serde(rename = "Active", deserialize_with = "flex::flag")]
    pub active: bool,
    #[serde(rename = "Current", deserialize_with = "flex::flag")]
    pub current: bool,
    #[serde(rename = "ManagerID", deserialize_with = "flex::string")]
    pub manager_id: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Year {
    #[serde(rename = "ID", deserialize_with = "flex::string")]
    pub id: String,
    #[serde(rename = "Name", deserialize_with = "flex::string")]
    pub name: String,
    #[serde(rename = "Current", deserialize_with = "flex::flag")]
    pub current: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuarterStart {
    #[serde(rename = "StartDate", deserialize_with = "flex::string")]
    pub start_date: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct YearDetails {
    #[serde(rename = "Name", deserialize_with = "flex::string")]
    pub name: String,
    #[serde(rename = "Q1")]
    pub q1: Option<QuarterStart>,
    #[serde(rename = "Q3")]
    pub q3: Option<QuarterStart>,
    #[serde(rename = "EndDate", deserialize_with = "flex::string")]
    pub end_date: String,
}

impl YearDetails {
    pub fn q1_start(&self) -> &str {
        self.q1.as_ref().map(|q| q.start_date.as_str()).unwrap_or_default()
    }

    pub fn q3_start(&self) -> &str {
        self.q3.as_ref().map(|q| q.start_date.as_str()).unwrap_or_default()
    }
}

/* ---------------- Typed tables ---------------- */

#[derive(Clone, Debug)]
pub struct Keyed<T> {
    pub key: String,
    /// Parent row key for child entities.
    pub parent: Option<String>,
    pub value: T,
}

/// Decoded rows of one entity, indexed by row key and by parent key.
#[derive(Clone, Debug)]
pub struct Typed<T> {
    entity: String,
    rows: Vec<Keyed<T>>,
    by_key: HashMap<String, usize>,
    by_parent: HashMap<String, Vec<usize>>,
}

impl<T: DeserializeOwned> Typed<T> {
    pub fn from_table(table: &EntityTable) -> Self {
        let mut typed = Self {
            entity: s!(table.entity()),
            rows: Vec::with_capacity(table.len()),
            by_key: HashMap::with_capacity(table.len()),
            by_parent: HashMap::new(),
        };
        let parent_column = table.parent_column();

        for row in table.rows() {
            let value = match serde_json::from_value::<T>(Value::Object(row.fields.clone())) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(entity = table.entity(), key = %row.key, error = %e, "skipping undecodable row");
                    continue;
                }
            };
            let parent = parent_column.map(|c| row.text(c)).filter(|p| !p.is_empty());
            let ix = typed.rows.len();
            typed.by_key.insert(row.key.clone(), ix);
            if let Some(p) = &parent {
                typed.by_parent.entry(p.clone()).or_default().push(ix);
            }
            typed.rows.push(Keyed { key: row.key.clone(), parent, value });
        }
        typed
    }
}

impl<T> Typed<T> {
    pub fn entity(&self) -> &str { &self.entity }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.by_key.get(key).map(|&i| &self.rows[i].value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyed<T>> {
        self.rows.iter()
    }

    /// Rows produced by one parent row, fetch order.
    pub fn children<'a>(&'a self, parent_key: &str) -> impl Iterator<Item = &'a Keyed<T>> + use<'a, T> {
        self.by_parent
            .get(parent_key)
            .into_iter()
            .flatten()
            .map(move |&i| &self.rows[i])
    }

    pub fn has_children(&self, parent_key: &str) -> bool {
        self.by_parent.get(parent_key).is_some_and(|v| !v.is_empty())
    }
}

/* ---------------- Everything a report reads ---------------- */

/// Typed tables built once per run from the cache.
pub struct SchoolData {
    pub school: Typed<School>,
    pub families: Typed<Family>,
    pub family_contacts: Typed<FamilyContact>,
    pub family_students: Typed<FamilyStudent>,
    pub students: Typed<Student>,
    pub student_details: Typed<StudentDetails>,
    pub student_classes: Typed<StudentClass>,
    pub classes: Typed<Class>,
    pub class_details: Typed<ClassDetails>,
    pub employees: Typed<Employee>,
    pub years: Typed<Year>,
    pub years_details: Typed<YearDetails>,
}

impl SchoolData {
    pub fn load(cache: &mut Cache) -> Result<Self> {
        Ok(Self {
            school: Typed::from_table(cache.get(names::SCHOOL)?),
            families: Typed::from_table(cache.get(names::FAMILIES)?),
            family_contacts: Typed::from_table(cache.get(names::FAMILY_CONTACTS)?),
            family_students: Typed::from_table(cache.get(names::FAMILY_STUDENTS)?),
            students: Typed::from_table(cache.get(names::STUDENTS)?),
            student_details: Typed::from_table(cache.get(names::STUDENT_DETAILS)?),
            student_classes: Typed::from_table(cache.get(names::STUDENT_CLASSES)?),
            classes: Typed::from_table(cache.get(names::CLASSES)?),
            class_details: Typed::from_table(cache.get(names::CLASS_DETAILS)?),
            employees: Typed::from_table(cache.get(names::EMPLOYEES)?),
            years: Typed::from_table(cache.get(names::YEARS)?),
            years_details: Typed::from_table(cache.get(names::YEARS_DETAILS)?),
        })
    }
}
