// src/table.rs
//
// EntityTable: the resolved rows of one catalog entity, in fetch order,
// indexed by row key.
//
// Row keys:
//   root,  index column present   → the column value
//   root,  single record, no index → the scope id
//   root,  list, no index          → "<scope>:<n>"
//   child, single record, no index → the parent key
//   child, otherwise               → "<parent>:<id>" or "<parent>:<n>"
//
// Child rows carry `<parent>_id` = parent key, the join key back to the parent.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::EntityDefinition;
use crate::core::net::{Payload, Record};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub key: String,
    pub fields: Record,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Column as display text; null and missing become "".
    pub fn text(&self, column: &str) -> String {
        self.get(column).map(value_text).unwrap_or_default()
    }
}

/// Scalar JSON value as plain text (strings unquoted).
pub fn value_text(v: &Value) -> String {
    match v {
        Value::Null => s!(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntityTable {
    entity: String,
    index_column: Option<String>,
    parent_column: Option<String>,
    rows: Vec<Row>,
    index: HashMap<String, usize>,
}

impl EntityTable {
    pub fn empty(def: &EntityDefinition) -> Self {
        Self {
            entity: def.name.clone(),
            index_column: def.index_column.clone(),
            parent_column: def.parent_column(),
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Rebuild a table from stored parts, re-checking key uniqueness.
    pub fn from_parts(
        entity: String,
        index_column: Option<String>,
        parent_column: Option<String>,
        rows: Vec<Row>,
    ) -> Result<Self> {
        let mut table = Self {
            entity,
            index_column,
            parent_column,
            rows: Vec::with_capacity(rows.len()),
            index: HashMap::with_capacity(rows.len()),
        };
        for row in rows {
            table.push(row)?;
        }
        Ok(table)
    }

    /// Table for a root entity from its single fetch.
    pub fn from_root_payload(def: &EntityDefinition, scope_id: &str, payload: Payload) -> Result<Self> {
        let mut table = Self::empty(def);
        table.extend(payload, scope_id, None)?;
        Ok(table)
    }

    /// Append the rows fetched for one parent row. Returns the number added.
    pub fn append_child(&mut self, parent_key: &str, payload: Payload) -> Result<usize> {
        let before = self.rows.len();
        self.extend(payload, parent_key, Some(parent_key))?;
        Ok(self.rows.len() - before)
    }

    fn extend(&mut self, payload: Payload, prefix: &str, parent: Option<&str>) -> Result<()> {
        match payload {
            Payload::NoContent => Ok(()),
            Payload::Record(record) => {
                let key = match &self.index_column {
                    None => s!(prefix),
                    Some(_) => self.indexed_key(&record, prefix, parent.is_some(), 0)?,
                };
                self.push_tagged(key, record, parent)
            }
            Payload::Records(records) => {
                for (n, record) in records.into_iter().enumerate() {
                    let key = match &self.index_column {
                        None => format!("{prefix}:{n}"),
                        Some(_) => self.indexed_key(&record, prefix, parent.is_some(), n)?,
                    };
                    self.push_tagged(key, record, parent)?;
                }
                Ok(())
            }
        }
    }

    fn indexed_key(&self, record: &Record, prefix: &str, child: bool, n: usize) -> Result<String> {
        let column = self.index_column.as_deref().unwrap_or_default();
        let id = match record.get(column) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(num)) => num.to_string(),
            _ => {
                return Err(Error::UnexpectedPayload {
                    context: self.entity.clone(),
                    detail: format!("record {n} under '{prefix}' has no usable '{column}'"),
                });
            }
        };
        Ok(if child { format!("{prefix}:{id}") } else { id })
    }

    fn push_tagged(&mut self, key: String, mut fields: Record, parent: Option<&str>) -> Result<()> {
        if let (Some(column), Some(parent_key)) = (&self.parent_column, parent) {
            fields.insert(column.clone(), Value::String(s!(parent_key)));
        }
        self.push(Row { key, fields })
    }

    fn push(&mut self, row: Row) -> Result<()> {
        if self.index.contains_key(&row.key) {
            return Err(Error::DuplicateKey { entity: self.entity.clone(), key: row.key });
        }
        self.index.insert(row.key.clone(), self.rows.len());
        self.rows.push(row);
        Ok(())
    }

    /* ---------------- Accessors ---------------- */

    pub fn entity(&self) -> &str { &self.entity }
    pub fn index_column(&self) -> Option<&str> { self.index_column.as_deref() }
    pub fn parent_column(&self) -> Option<&str> { self.parent_column.as_deref() }
    pub fn rows(&self) -> &[Row] { &self.rows }
    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn get(&self, key: &str) -> Option<&Row> {
        self.index.get(key).map(|&i| &self.rows[i])
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.key.as_str())
    }

    /// Rows produced by one parent row (child tables only).
    pub fn rows_for_parent<'a>(&'a self, parent_key: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        let column = self.parent_column.as_deref();
        self.rows.iter().filter(move |r| match column {
            Some(c) => matches!(r.get(c), Some(Value::String(p)) if p == parent_key),
            None => false,
        })
    }

    /* ---------------- Diff ---------------- */

    /// Row-by-row, column-by-column differences. `self` is the left side.
    pub fn diff(&self, other: &EntityTable) -> Vec<Difference> {
        let mut out = Vec::new();
        let entity = &self.entity;

        for row in &self.rows {
            match other.get(&row.key) {
                None => out.push(Difference::new(entity, &row.key, DiffKind::OnlyLeft)),
                Some(theirs) => {
                    for (column, left) in &row.fields {
                        let right = theirs.fields.get(column);
                        if right != Some(left) {
                            out.push(Difference::new(entity, &row.key, DiffKind::Field {
                                column: column.clone(),
                                left: Some(left.clone()),
                                right: right.cloned(),
                            }));
                        }
                    }
                    for (column, right) in &theirs.fields {
                        if !row.fields.contains_key(column) {
                            out.push(Difference::new(entity, &row.key, DiffKind::Field {
                                column: column.clone(),
                                left: None,
                                right: Some(right.clone()),
                            }));
                        }
                    }
                }
            }
        }
        for row in &other.rows {
            if !self.contains_key(&row.key) {
                out.push(Difference::new(entity, &row.key, DiffKind::OnlyRight));
            }
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DiffKind {
    OnlyLeft,
    OnlyRight,
    Field {
        column: String,
        left: Option<Value>,
        right: Option<Value>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Difference {
    pub entity: String,
    pub key: String,
    pub kind: DiffKind,
}

impl Difference {
    fn new(entity: &str, key: &str, kind: DiffKind) -> Self {
        Self { entity: s!(entity), key: s!(key), kind }
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<Value>| v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| s!("<missing>"));
        match &self.kind {
            DiffKind::OnlyLeft => write!(f, "{}[{}]: only in left", self.entity, self.key),
            DiffKind::OnlyRight => write!(f, "{}[{}]: only in right", self.entity, self.key),
            DiffKind::Field { column, left, right } => write!(
                f,
                "{}[{}].{}: {} != {}",
                self.entity, self.key, column, show(left), show(right)
            ),
        }
    }
}
