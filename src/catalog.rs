// src/catalog.rs
//
// Entity Catalog: a static, validated list of the remote entities the cache
// knows how to resolve.
//
// An entity is either a *root* (one fetch per run, URL built from the scope id)
// or a *child* that iterates over a parent entity (one fetch per parent row,
// the parent row key substituted as `{entity_id}`). Parent links must form a
// forest; `Catalog::new` rejects unknown parents and cycles up front so the
// cache never has to discover them by recursing.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;

use crate::core::net::UrlTemplate;
use crate::core::sanitize::sanitize_file_stem;
use crate::error::{Error, Result};

/// Names of the entities in the default school catalog.
pub mod names {
    pub const SCHOOL: &str = "school";
    pub const FAMILIES: &str = "families";
    pub const FAMILY_CONTACTS: &str = "family_contacts";
    pub const FAMILY_DETAILS: &str = "family_details";
    pub const FAMILY_STUDENTS: &str = "family_students";
    pub const STUDENTS: &str = "students";
    pub const STUDENT_CLASSES: &str = "student_classes";
    pub const STUDENT_DETAILS: &str = "student_details";
    pub const CONTACTS: &str = "contacts";
    pub const CLASSES: &str = "classes";
    pub const CLASS_DETAILS: &str = "class_details";
    pub const EMPLOYEES: &str = "employees";
    pub const YEARS: &str = "years";
    pub const YEARS_DETAILS: &str = "years_details";
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDefinition {
    pub name: String,
    /// Column whose value becomes the row key. `None` means synthetic keys.
    pub index_column: Option<String>,
    pub url: UrlTemplate,
    /// Parent entity whose rows drive one fetch each.
    pub iterate_over: Option<String>,
    /// Dotted key path to unwrap before reading rows.
    pub data_location: Option<String>,
}

impl EntityDefinition {
    pub fn new(name: &str, index_column: Option<&str>, url: &str) -> Result<Self> {
        Ok(Self {
            name: s!(name),
            index_column: index_column.map(String::from),
            url: UrlTemplate::parse(url)?,
            iterate_over: None,
            data_location: None,
        })
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.iterate_over = Some(s!(parent));
        self
    }

    pub fn with_location(mut self, location: &str) -> Self {
        self.data_location = Some(s!(location));
        self
    }

    pub fn is_root(&self) -> bool {
        self.iterate_over.is_none()
    }

    /// Column tagged onto child rows: `<parent>_id`.
    pub fn parent_column(&self) -> Option<String> {
        self.iterate_over.as_deref().map(parent_column)
    }
}

pub fn parent_column(parent: &str) -> String {
    join!(parent, "_id")
}

/* ---------------- TOML form ---------------- */

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "entity", default)]
    entities: Vec<EntitySpec>,
}

#[derive(Debug, Deserialize)]
struct EntitySpec {
    name: String,
    index_column: Option<String>,
    url: String,
    iterate_over: Option<String>,
    data_location: Option<String>,
}

impl TryFrom<EntitySpec> for EntityDefinition {
    type Error = Error;

    fn try_from(spec: EntitySpec) -> Result<Self> {
        Ok(Self {
            url: UrlTemplate::parse(&spec.url)?,
            name: spec.name,
            index_column: spec.index_column,
            iterate_over: spec.iterate_over,
            data_location: spec.data_location,
        })
    }
}

/* ---------------- Catalog ---------------- */

#[derive(Clone, Debug)]
pub struct Catalog {
    entities: Vec<EntityDefinition>,
    /// Indices into `entities`, parents before children.
    order: Vec<usize>,
}

impl Catalog {
    pub fn new(entities: Vec<EntityDefinition>) -> Result<Self> {
        let mut seen = HashSet::new();
        // store file stem → entity; case-folded for case-insensitive filesystems
        let mut stems: HashMap<String, &str> = HashMap::new();
        for def in &entities {
            if def.name.trim().is_empty() {
                return Err(Error::InvalidCatalog(s!("entity with empty name")));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(Error::InvalidCatalog(format!("duplicate entity '{}'", def.name)));
            }
            let stem = sanitize_file_stem(&def.name).to_ascii_lowercase();
            if let Some(other) = stems.insert(stem, &def.name) {
                return Err(Error::InvalidCatalog(format!(
                    "entities '{other}' and '{}' share a cache file name",
                    def.name
                )));
            }
        }

        for def in &entities {
            match &def.iterate_over {
                Some(parent) => {
                    if !seen.contains(parent.as_str()) {
                        return Err(Error::InvalidCatalog(format!(
                            "'{}' iterates over unknown entity '{parent}'",
                            def.name
                        )));
                    }
                    if !def.url.uses_entity_id() {
                        return Err(Error::InvalidCatalog(format!(
                            "'{}' iterates over '{parent}' but its URL has no {{entity_id}}",
                            def.name
                        )));
                    }
                }
                None if def.url.uses_entity_id() => {
                    return Err(Error::InvalidCatalog(format!(
                        "root entity '{}' cannot use {{entity_id}}",
                        def.name
                    )));
                }
                None => {}
            }
        }

        let order = resolution_order(&entities)?;
        Ok(Self { entities, order })
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let file: CatalogFile =
            toml::from_str(text).map_err(|e| Error::InvalidCatalog(e.to_string()))?;
        let defs = file
            .entities
            .into_iter()
            .map(EntityDefinition::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::new(defs)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// The school-scoped entity set used by every report.
    pub fn school_default() -> Result<Self> {
        use names::*;
        let def = EntityDefinition::new;
        Self::new(vec![
            def(SCHOOL, None, "/School/{scope_id}")?,
            def(FAMILIES, Some("ID"), "/School/{scope_id}/Families")?,
            def(FAMILY_CONTACTS, Some("ID"), "/Family/{entity_id}/Contacts")?.with_parent(FAMILIES),
            def(FAMILY_DETAILS, None, "/Family/{entity_id}")?.with_parent(FAMILIES),
            def(FAMILY_STUDENTS, Some("ID"), "/Family/{entity_id}/Students")?.with_parent(FAMILIES),
            def(STUDENTS, Some("ID"), "/School/{scope_id}/Students")?,
            def(STUDENT_CLASSES, Some("ID"), "/Student/{entity_id}/Classes?quarter=0&format=1")?
                .with_parent(STUDENTS),
            def(STUDENT_DETAILS, None, "/Student/{entity_id}")?.with_parent(STUDENTS),
            def(CONTACTS, Some("ID"), "/School/{scope_id}/Contacts")?,
            def(CLASSES, Some("ID"), "/School/{scope_id}/Classes?quarter=0")?.with_location("Period"),
            def(CLASS_DETAILS, None, "/School/{scope_id}/Classes/{entity_id}")?.with_parent(CLASSES),
            def(EMPLOYEES, Some("ID"), "/School/{scope_id}/Employees")?,
            def(YEARS, Some("ID"), "/School/{scope_id}/Years")?,
            def(YEARS_DETAILS, None, "/School/{scope_id}/Years/{entity_id}")?.with_parent(YEARS),
        ])
    }

    pub fn get(&self, name: &str) -> Result<&EntityDefinition> {
        self.entities
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::UnknownEntity(s!(name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.iter().any(|d| d.name == name)
    }

    /// Declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.entities.iter()
    }

    /// Parents before children; ties keep declaration order.
    pub fn resolution_order(&self) -> impl Iterator<Item = &EntityDefinition> {
        self.order.iter().map(|&i| &self.entities[i])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

fn resolution_order(entities: &[EntityDefinition]) -> Result<Vec<usize>> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut order = Vec::with_capacity(entities.len());

    while order.len() < entities.len() {
        let before = order.len();
        for (i, def) in entities.iter().enumerate() {
            if placed.contains(def.name.as_str()) {
                continue;
            }
            let ready = match &def.iterate_over {
                None => true,
                Some(parent) => placed.contains(parent.as_str()),
            };
            if ready {
                placed.insert(def.name.as_str());
                order.push(i);
            }
        }
        if order.len() == before {
            let stuck: Vec<&str> = entities
                .iter()
                .map(|d| d.name.as_str())
                .filter(|n| !placed.contains(n))
                .collect();
            return Err(Error::InvalidCatalog(format!(
                "iterate_over cycle among: {}",
                stuck.join(", ")
            )));
        }
    }
    Ok(order)
}
