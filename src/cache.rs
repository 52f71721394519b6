// src/cache.rs
//
// Entity Cache.
//
// Resolves catalog entities on first access and memoizes them for the rest
// of the run. Roots are fetched once with the scope id; children are fetched
// once per parent row and tagged with `<parent>_id`. A "no content" response
// contributes zero rows; any other failure aborts the whole `get`.
//
// `get` takes `&mut self`, so resolution is serialized per instance. Share a
// cache across threads only behind a lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, EntityDefinition};
use crate::config::options::{CacheMode, CacheOptions, FetchPolicy};
use crate::core::net::{Payload, RemoteClient};
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::store;
use crate::table::{Difference, EntityTable};

enum Source {
    Remote(Box<dyn RemoteClient>),
    Storage,
}

pub struct Cache {
    catalog: Catalog,
    scope_id: String,
    source: Source,
    policy: FetchPolicy,
    tables: HashMap<String, EntityTable>,
    /// Entities currently being resolved, outermost first.
    resolving: Vec<String>,
}

impl Cache {
    /// Empty, remote-backed cache.
    pub fn remote(catalog: Catalog, scope_id: &str, client: Box<dyn RemoteClient>) -> Self {
        Self {
            catalog,
            scope_id: s!(scope_id),
            source: Source::Remote(client),
            policy: FetchPolicy::default(),
            tables: HashMap::new(),
            resolving: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Storage-only cache holding every catalog entity read from `dir`.
    /// Any missing or unreadable file fails the whole load.
    pub fn load_from_storage(catalog: Catalog, scope_id: &str, dir: &Path) -> Result<Self> {
        let mut tables = HashMap::with_capacity(catalog.len());
        for def in catalog.iter() {
            let table = store::load_table(dir, scope_id, def)?;
            tables.insert(def.name.clone(), table);
        }
        info!(dir = %dir.display(), entities = tables.len(), "cache loaded from storage");
        Ok(Self {
            catalog,
            scope_id: s!(scope_id),
            source: Source::Storage,
            policy: FetchPolicy::default(),
            tables,
            resolving: Vec::new(),
        })
    }

    /// Build a cache according to `options.mode`.
    ///
    /// `PreferStored` falls back to a remote reload only when the stored copy is
    /// missing or corrupt and a client is available. Every remote reload is
    /// saved, read back and compared; any difference fails the open.
    pub fn open(
        catalog: Catalog,
        scope_id: &str,
        client: Option<Box<dyn RemoteClient>>,
        options: &CacheOptions,
        progress: Option<&mut (dyn Progress + '_)>,
    ) -> Result<Self> {
        match options.mode {
            CacheMode::StoredOnly => Self::load_from_storage(catalog, scope_id, &options.dir),
            CacheMode::Reload => Self::reload(catalog, scope_id, client, options, progress),
            CacheMode::PreferStored => {
                match Self::load_from_storage(catalog.clone(), scope_id, &options.dir) {
                    Ok(cache) => Ok(cache),
                    Err(e) if e.is_storage_failure() && client.is_some() => {
                        warn!(error = %e, "stored cache unusable; reloading from remote");
                        Self::reload(catalog, scope_id, client, options, progress)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    fn reload(
        catalog: Catalog,
        scope_id: &str,
        client: Option<Box<dyn RemoteClient>>,
        options: &CacheOptions,
        progress: Option<&mut (dyn Progress + '_)>,
    ) -> Result<Self> {
        let client = client.ok_or(Error::MissingToken)?;
        let mut cache = Self::remote(catalog, scope_id, client).with_policy(options.fetch);
        cache.load_all(progress)?;
        cache.save_to_storage(&options.dir)?;

        let stored = Self::load_from_storage(cache.catalog.clone(), scope_id, &options.dir)?;
        let diffs = stored.compare(&cache);
        if !diffs.is_empty() {
            for d in &diffs {
                error!("{d}");
            }
            return Err(Error::CacheVerification { differences: diffs.len() });
        }
        info!("stored cache verified against remote data");
        Ok(cache)
    }

    /* ---------------- Resolution ---------------- */

    /// The table for `name`, resolving it (and its parents) on first access.
    pub fn get(&mut self, name: &str) -> Result<&EntityTable> {
        self.ensure(name)?;
        self.tables
            .get(name)
            .ok_or_else(|| Error::NotCached { entity: s!(name) })
    }

    /// Already-memoized table, without resolving.
    pub fn table(&self, name: &str) -> Option<&EntityTable> {
        self.tables.get(name)
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    /// Resolve every catalog entity, parents first.
    pub fn load_all(&mut self, mut progress: Option<&mut (dyn Progress + '_)>) -> Result<()> {
        let names: Vec<String> = self.catalog.resolution_order().map(|d| d.name.clone()).collect();
        if let Some(p) = progress.as_deref_mut() {
            p.begin(names.len());
        }
        let mut result = Ok(());
        for name in &names {
            match self.get(name) {
                Ok(table) => {
                    let rows = table.len();
                    if let Some(p) = progress.as_deref_mut() {
                        p.item_done(name, rows);
                    }
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        if let Some(p) = progress.as_deref_mut() {
            p.finish();
        }
        result
    }

    fn ensure(&mut self, name: &str) -> Result<()> {
        if self.tables.contains_key(name) {
            return Ok(());
        }
        let def = self.catalog.get(name)?.clone();
        if let Source::Storage = self.source {
            return Err(Error::NotCached { entity: def.name });
        }
        if self.resolving.iter().any(|n| n == name) {
            return Err(Error::InvalidCatalog(format!(
                "cycle while resolving: {} -> {name}",
                self.resolving.join(" -> ")
            )));
        }

        self.resolving.push(def.name.clone());
        let result = self.resolve(&def);
        self.resolving.pop();

        let table = result?;
        info!(entity = %def.name, rows = table.len(), "resolved");
        self.tables.insert(def.name, table);
        Ok(())
    }

    fn resolve(&mut self, def: &EntityDefinition) -> Result<EntityTable> {
        let Some(parent) = &def.iterate_over else {
            let client = self.client()?;
            let payload = fetch_with_policy(client, def, &self.scope_id, None, &self.policy)?;
            return EntityTable::from_root_payload(def, &self.scope_id, payload);
        };

        self.ensure(parent)?;
        let parent_keys: Vec<String> = match self.tables.get(parent) {
            Some(t) => t.keys().map(String::from).collect(),
            None => return Err(Error::NotCached { entity: parent.clone() }),
        };

        let client = self.client()?;
        let payloads = fetch_children(client, def, &self.scope_id, &parent_keys, &self.policy)?;

        let mut table = EntityTable::empty(def);
        let mut empty_parents = 0usize;
        for (key, payload) in parent_keys.iter().zip(payloads) {
            if table.append_child(key, payload)? == 0 {
                empty_parents += 1;
            }
        }
        debug!(entity = %def.name, parents = parent_keys.len(), empty_parents, "children fetched");
        Ok(table)
    }

    fn client(&self) -> Result<&dyn RemoteClient> {
        match &self.source {
            Source::Remote(c) => Ok(c.as_ref()),
            Source::Storage => Err(Error::NotCached { entity: self.resolving.last().cloned().unwrap_or_default() }),
        }
    }

    /* ---------------- Storage ---------------- */

    /// Persist every memoized table; unresolved entities are skipped.
    pub fn save_to_storage(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for def in self.catalog.iter() {
            if let Some(table) = self.tables.get(&def.name) {
                written.push(store::save_table(dir, &self.scope_id, table)?);
            }
        }
        info!(dir = %dir.display(), files = written.len(), "cache saved");
        Ok(written)
    }

    /// Differences for every catalog entity present in both caches.
    pub fn compare(&self, other: &Cache) -> Vec<Difference> {
        self.catalog
            .iter()
            .filter_map(|def| Some((self.tables.get(&def.name)?, other.tables.get(&def.name)?)))
            .flat_map(|(mine, theirs)| mine.diff(theirs))
            .collect()
    }
}

/* ---------------- Fetching ---------------- */

fn fetch_with_policy(
    client: &dyn RemoteClient,
    def: &EntityDefinition,
    scope_id: &str,
    entity_id: Option<&str>,
    policy: &FetchPolicy,
) -> Result<Payload> {
    let mut attempt = 0u32;
    loop {
        match client.fetch(&def.url, scope_id, entity_id) {
            Ok(payload) => {
                return match &def.data_location {
                    Some(location) => payload.unwrap_location(location, &def.name),
                    None => Ok(payload),
                };
            }
            Err(e) if attempt < policy.retries && e.is_retryable() => {
                attempt += 1;
                warn!(
                    entity = %def.name,
                    entity_id = entity_id.unwrap_or(scope_id),
                    attempt,
                    retries = policy.retries,
                    error = %e,
                    "fetch failed; retrying"
                );
                thread::sleep(policy.retry_delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// One fetch per parent key, results in parent order.
///
/// With more than one worker the fetches run on scoped threads pulling indices
/// from a shared counter. The first failure stops workers from taking new
/// parents; the error for the lowest parent index is returned.
fn fetch_children(
    client: &dyn RemoteClient,
    def: &EntityDefinition,
    scope_id: &str,
    keys: &[String],
    policy: &FetchPolicy,
) -> Result<Vec<Payload>> {
    let workers = policy.workers().min(keys.len()).max(1);
    if workers == 1 {
        return keys
            .iter()
            .map(|k| fetch_with_policy(client, def, scope_id, Some(k), policy))
            .collect();
    }

    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<(usize, Result<Payload>)>();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let (next, failed) = (&next, &failed);
            scope.spawn(move || {
                loop {
                    if failed.load(Ordering::Relaxed) {
                        break;
                    }
                    let i = next.fetch_add(1, Ordering::Relaxed);
                    if i >= keys.len() {
                        break;
                    }
                    let result = fetch_with_policy(client, def, scope_id, Some(&keys[i]), policy);
                    if result.is_err() {
                        failed.store(true, Ordering::Relaxed);
                    }
                    if tx.send((i, result)).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx); // workers are done; close the channel

    let mut slots: Vec<Option<Payload>> = vec![None; keys.len()];
    let mut first_err: Option<(usize, Error)> = None;
    for (i, result) in rx {
        match result {
            Ok(payload) => slots[i] = Some(payload),
            Err(e) => {
                if first_err.as_ref().is_none_or(|(j, _)| i < *j) {
                    first_err = Some((i, e));
                }
            }
        }
    }
    if let Some((i, e)) = first_err {
        error!(entity = %def.name, parent = %keys[i], error = %e, "child fetch failed");
        return Err(e);
    }

    slots
        .into_iter()
        .zip(keys)
        .map(|(slot, key)| {
            slot.ok_or_else(|| Error::UnexpectedPayload {
                context: def.name.clone(),
                detail: format!("no response recorded for parent '{key}'"),
            })
        })
        .collect()
}
