// src/store.rs
//
// Local persistence for resolved entity tables: one JSON file per entity,
// `<dir>/<entity>.json`. Files are written to a temp name and renamed so a
// crashed save never leaves a half-written table behind.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::EntityDefinition;
use crate::config::consts::STORE_EXT;
use crate::core::sanitize::sanitize_file_stem;
use crate::error::{Error, Result};
use crate::file::ensure_directory;
use crate::table::{EntityTable, Row};

#[derive(Serialize, Deserialize)]
struct StoredTable {
    entity: String,
    scope_id: String,
    index_column: Option<String>,
    parent_column: Option<String>,
    rows: Vec<Row>,
}

pub fn entity_path(dir: &Path, entity: &str) -> PathBuf {
    dir.join(join!(&sanitize_file_stem(entity), ".", STORE_EXT))
}

pub fn save_table(dir: &Path, scope_id: &str, table: &EntityTable) -> Result<PathBuf> {
    ensure_directory(dir)?;
    let path = entity_path(dir, table.entity());
    let tmp = path.with_extension(join!(STORE_EXT, ".tmp"));

    let stored = StoredTable {
        entity: s!(table.entity()),
        scope_id: s!(scope_id),
        index_column: table.index_column().map(String::from),
        parent_column: table.parent_column().map(String::from),
        rows: table.rows().to_vec(),
    };

    {
        let mut out = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut out, &stored).map_err(std::io::Error::from)?;
        out.flush()?;
    }
    fs::rename(&tmp, &path)?;
    tracing::debug!(entity = table.entity(), rows = table.len(), path = %path.display(), "saved");
    Ok(path)
}

/// Read one entity back. A file saved for another scope is rejected.
pub fn load_table(dir: &Path, scope_id: &str, def: &EntityDefinition) -> Result<EntityTable> {
    let path = entity_path(dir, &def.name);
    if !path.is_file() {
        return Err(Error::MissingCacheFile { entity: def.name.clone(), path });
    }

    let corrupt = |path: &Path, source: serde_json::Error| Error::CorruptCacheFile {
        entity: def.name.clone(),
        path: path.to_path_buf(),
        source,
    };

    let reader = BufReader::new(File::open(&path)?);
    let stored: StoredTable = serde_json::from_reader(reader).map_err(|e| corrupt(&path, e))?;

    if stored.entity != def.name {
        let msg = format!("file holds entity '{}'", stored.entity);
        return Err(corrupt(&path, <serde_json::Error as serde::de::Error>::custom(msg)));
    }

    if stored.scope_id != scope_id {
        return Err(Error::CacheScopeMismatch {
            entity: def.name.clone(),
            path,
            expected: s!(scope_id),
            found: stored.scope_id,
        });
    }

    let table = EntityTable::from_parts(stored.entity, stored.index_column, stored.parent_column, stored.rows)?;
    tracing::debug!(entity = %def.name, rows = table.len(), "loaded from store");
    Ok(table)
}
