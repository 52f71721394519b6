// tests/cache.rs
mod common;

use std::collections::BTreeSet;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::{school_api, FakeApi, Reply, SCHOOL_ID};
use sis_roster::cache::Cache;
use sis_roster::catalog::{names, Catalog, EntityDefinition};
use sis_roster::config::options::{CacheMode, CacheOptions, FetchPolicy};
use sis_roster::error::Error;
use sis_roster::store;

fn family_catalog() -> Catalog {
    Catalog::new(vec![
        EntityDefinition::new("families", Some("ID"), "/School/{scope_id}/Families").unwrap(),
        EntityDefinition::new("family_contacts", Some("ID"), "/Family/{entity_id}/Contacts")
            .unwrap()
            .with_parent("families"),
    ])
    .unwrap()
}

fn family_api() -> FakeApi {
    let api = FakeApi::new();
    api.json("/School/S1/Families", json!([{ "ID": "F1" }, { "ID": "F2" }]))
        .json(
            "/Family/F1/Contacts",
            json!([{ "ID": "C1", "FirstName": "Ann" }, { "ID": "C2", "FirstName": "Bob" }]),
        )
        .on("/Family/F2/Contacts", Reply::NoContent);
    api
}

fn options(dir: &std::path::Path, mode: CacheMode) -> CacheOptions {
    CacheOptions { dir: dir.to_path_buf(), mode, fetch: FetchPolicy::default() }
}

#[test]
fn no_content_parent_contributes_no_rows() {
    let api = family_api();
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed());

    let contacts = cache.get("family_contacts").unwrap();
    assert_eq!(contacts.len(), 2);
    for row in contacts.rows() {
        assert_eq!(row.text("families_id"), "F1");
    }
}

#[test]
fn child_rows_are_tagged_with_responding_parents_only() {
    let api = family_api();
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed());

    let family_keys: BTreeSet<String> = cache.get("families").unwrap().keys().map(String::from).collect();
    let contacts = cache.get("family_contacts").unwrap();
    let tagged: BTreeSet<String> = contacts.rows().iter().map(|r| r.text("families_id")).collect();

    assert!(tagged.is_subset(&family_keys));
    assert_eq!(tagged, BTreeSet::from([String::from("F1")]));
    assert_eq!(contacts.rows_for_parent("F1").count(), 2);
    assert_eq!(contacts.rows_for_parent("F2").count(), 0);
}

#[test]
fn child_keys_are_scoped_by_parent() {
    let api = family_api();
    api.json("/Family/F2/Contacts", json!([{ "ID": "C1", "FirstName": "Shared" }]));
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed());

    let contacts = cache.get("family_contacts").unwrap();
    assert!(contacts.contains_key("F1:C1"));
    assert!(contacts.contains_key("F2:C1"));
}

#[test]
fn get_is_memoized() {
    let api = family_api();
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed());

    cache.get("family_contacts").unwrap();
    cache.get("family_contacts").unwrap();
    cache.get("families").unwrap();

    assert_eq!(api.calls_to("/School/S1/Families"), 1);
    assert_eq!(api.calls_to("/Family/F1/Contacts"), 1);
    assert_eq!(api.calls().len(), 3);
}

#[test]
fn failed_child_fetch_aborts_get() {
    let api = family_api();
    api.on("/Family/F2/Contacts", Reply::Status(500));
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed());

    let err = cache.get("family_contacts").unwrap_err();
    assert!(matches!(err, Error::RemoteRequestFailed { status: 500, .. }));
    assert!(!cache.is_resolved("family_contacts"));
    assert!(cache.is_resolved("families"));
}

#[test]
fn failures_are_not_retried_by_default() {
    let api = family_api();
    api.on_seq("/Family/F1/Contacts", vec![Reply::Status(503), Reply::Json(json!([]))]);
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed());

    assert!(cache.get("family_contacts").is_err());
    assert_eq!(api.calls_to("/Family/F1/Contacts"), 1);
}

#[test]
fn retry_policy_retries_server_errors() {
    let api = family_api();
    api.on_seq(
        "/Family/F1/Contacts",
        vec![Reply::Status(503), Reply::Json(json!([{ "ID": "C9" }]))],
    );
    let policy = FetchPolicy { retries: 2, retry_delay: Duration::ZERO, workers: 1 };
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed()).with_policy(policy);

    let contacts = cache.get("family_contacts").unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(api.calls_to("/Family/F1/Contacts"), 2);
}

#[test]
fn client_errors_are_never_retried() {
    let api = family_api();
    api.on("/Family/F1/Contacts", Reply::Status(403));
    let policy = FetchPolicy { retries: 3, retry_delay: Duration::ZERO, workers: 1 };
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed()).with_policy(policy);

    assert!(cache.get("family_contacts").is_err());
    assert_eq!(api.calls_to("/Family/F1/Contacts"), 1);
}

#[test]
fn worker_pool_keeps_parent_order() {
    let api = FakeApi::new();
    let families: Vec<_> = (0..20).map(|i| json!({ "ID": format!("F{i:02}") })).collect();
    api.json("/School/S1/Families", json!(families));
    for i in 0..20 {
        api.json(
            &format!("/Family/F{i:02}/Contacts"),
            json!([{ "ID": format!("C{i}") }]),
        );
    }
    let policy = FetchPolicy { retries: 0, retry_delay: Duration::ZERO, workers: 4 };
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed()).with_policy(policy);

    let parents: Vec<String> = cache
        .get("family_contacts")
        .unwrap()
        .rows()
        .iter()
        .map(|r| r.text("families_id"))
        .collect();
    let expected: Vec<String> = (0..20).map(|i| format!("F{i:02}")).collect();
    assert_eq!(parents, expected);
}

#[test]
fn worker_pool_still_fails_the_whole_get() {
    let api = FakeApi::new();
    let families: Vec<_> = (0..10).map(|i| json!({ "ID": format!("F{i}") })).collect();
    api.json("/School/S1/Families", json!(families));
    for i in 0..10 {
        api.json(&format!("/Family/F{i}/Contacts"), json!([]));
    }
    api.on("/Family/F6/Contacts", Reply::Status(502));
    let policy = FetchPolicy { retries: 0, retry_delay: Duration::ZERO, workers: 3 };
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, api.boxed()).with_policy(policy);

    let err = cache.get("family_contacts").unwrap_err();
    assert!(matches!(err, Error::RemoteRequestFailed { status: 502, .. }));
}

#[test]
fn data_location_unwraps_nested_list() {
    let api = school_api();
    let mut cache = Cache::remote(Catalog::school_default().unwrap(), SCHOOL_ID, api.boxed());

    let classes = cache.get(names::CLASSES).unwrap();
    let keys: Vec<&str> = classes.keys().collect();
    assert_eq!(keys, vec!["CL1", "CL2"]);
}

#[test]
fn singleton_root_is_keyed_by_scope() {
    let api = school_api();
    let mut cache = Cache::remote(Catalog::school_default().unwrap(), SCHOOL_ID, api.boxed());

    let school = cache.get(names::SCHOOL).unwrap();
    assert_eq!(school.len(), 1);
    assert_eq!(school.get(SCHOOL_ID).unwrap().text("Name"), "Test Academy");

    let details = cache.get(names::STUDENT_DETAILS).unwrap();
    assert!(details.contains_key("ST1"));
}

#[test]
fn unknown_entity_is_an_error() {
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, family_api().boxed());
    assert!(matches!(cache.get("teams"), Err(Error::UnknownEntity(_))));
}

/* ---------------- Storage ---------------- */

#[test]
fn save_load_compare_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let api = school_api();
    let mut cache = Cache::remote(Catalog::school_default().unwrap(), SCHOOL_ID, api.boxed());
    cache.load_all(None).unwrap();

    let written = cache.save_to_storage(dir.path()).unwrap();
    assert_eq!(written.len(), cache.catalog().len());

    let stored = Cache::load_from_storage(Catalog::school_default().unwrap(), SCHOOL_ID, dir.path()).unwrap();
    assert_eq!(stored.compare(&cache), vec![]);
    assert_eq!(cache.compare(&stored), vec![]);
}

#[test]
fn compare_reports_changed_fields() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, family_api().boxed());
    cache.load_all(None).unwrap();
    cache.save_to_storage(dir.path()).unwrap();

    let changed = family_api();
    changed.json("/Family/F1/Contacts", json!([{ "ID": "C1", "FirstName": "Anne" }, { "ID": "C2", "FirstName": "Bob" }]));
    let mut other = Cache::remote(family_catalog(), SCHOOL_ID, changed.boxed());
    other.load_all(None).unwrap();

    let stored = Cache::load_from_storage(family_catalog(), SCHOOL_ID, dir.path()).unwrap();
    let diffs = stored.compare(&other);
    assert_eq!(diffs.len(), 1);
    assert_eq!(diffs[0].key, "F1:C1");
}

#[test]
fn missing_cache_file_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let err = Cache::load_from_storage(family_catalog(), SCHOOL_ID, dir.path()).err().unwrap();
    assert!(matches!(err, Error::MissingCacheFile { ref entity, .. } if entity == "families"));
    assert!(err.is_storage_failure());
}

#[test]
fn corrupt_cache_file_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, family_api().boxed());
    cache.load_all(None).unwrap();
    cache.save_to_storage(dir.path()).unwrap();

    std::fs::write(store::entity_path(dir.path(), "family_contacts"), "{ not json").unwrap();
    let err = Cache::load_from_storage(family_catalog(), SCHOOL_ID, dir.path()).err().unwrap();
    assert!(matches!(err, Error::CorruptCacheFile { ref entity, .. } if entity == "family_contacts"));
}

#[test]
fn storage_cache_serves_loaded_tables() {
    let dir = tempfile::tempdir().unwrap();
    let small = Catalog::new(vec![
        EntityDefinition::new("families", Some("ID"), "/School/{scope_id}/Families").unwrap(),
    ])
    .unwrap();
    let mut cache = Cache::remote(small.clone(), SCHOOL_ID, family_api().boxed());
    cache.load_all(None).unwrap();
    cache.save_to_storage(dir.path()).unwrap();

    let mut stored = Cache::load_from_storage(small, SCHOOL_ID, dir.path()).unwrap();
    assert_eq!(stored.get("families").unwrap().len(), 2);
}

#[test]
fn stored_cache_for_another_school_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = Cache::remote(family_catalog(), SCHOOL_ID, family_api().boxed());
    cache.load_all(None).unwrap();
    cache.save_to_storage(dir.path()).unwrap();

    let err = Cache::load_from_storage(family_catalog(), "S2", dir.path()).err().unwrap();
    assert!(matches!(
        err,
        Error::CacheScopeMismatch { ref entity, ref expected, ref found, .. }
            if entity == "families" && expected == "S2" && found == SCHOOL_ID
    ));
    assert!(err.is_storage_failure());
}

/* ---------------- Open modes ---------------- */

#[test]
fn reload_saves_and_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let api = family_api();
    let cache = Cache::open(
        family_catalog(),
        SCHOOL_ID,
        Some(api.boxed()),
        &options(dir.path(), CacheMode::Reload),
        None,
    )
    .unwrap();

    assert!(cache.is_resolved("family_contacts"));
    assert!(store::entity_path(dir.path(), "families").is_file());
    assert!(store::entity_path(dir.path(), "family_contacts").is_file());
}

#[test]
fn prefer_stored_uses_storage_without_network() {
    let dir = tempfile::tempdir().unwrap();
    Cache::open(family_catalog(), SCHOOL_ID, Some(family_api().boxed()), &options(dir.path(), CacheMode::Reload), None)
        .unwrap();

    let api = family_api();
    let cache = Cache::open(
        family_catalog(),
        SCHOOL_ID,
        Some(api.boxed()),
        &options(dir.path(), CacheMode::PreferStored),
        None,
    )
    .unwrap();
    assert!(cache.is_resolved("families"));
    assert!(api.calls().is_empty());
}

#[test]
fn prefer_stored_falls_back_to_remote() {
    let dir = tempfile::tempdir().unwrap();
    let api = family_api();
    let cache = Cache::open(
        family_catalog(),
        SCHOOL_ID,
        Some(api.boxed()),
        &options(dir.path(), CacheMode::PreferStored),
        None,
    )
    .unwrap();
    assert!(cache.is_resolved("family_contacts"));
    assert_eq!(api.calls_to("/School/S1/Families"), 1);
}

#[test]
fn prefer_stored_reloads_another_schools_cache() {
    let dir = tempfile::tempdir().unwrap();
    Cache::open(family_catalog(), SCHOOL_ID, Some(family_api().boxed()), &options(dir.path(), CacheMode::Reload), None)
        .unwrap();

    let other = FakeApi::new();
    other.json("/School/S2/Families", json!([{ "ID": "F7" }])).on("/Family/F7/Contacts", Reply::NoContent);
    let mut cache = Cache::open(
        family_catalog(),
        "S2",
        Some(other.boxed()),
        &options(dir.path(), CacheMode::PreferStored),
        None,
    )
    .unwrap();

    assert_eq!(other.calls_to("/School/S2/Families"), 1);
    let families = cache.get("families").unwrap();
    assert!(families.contains_key("F7"));
    assert!(!families.contains_key("F1"));

    let err = Cache::open(family_catalog(), SCHOOL_ID, None, &options(dir.path(), CacheMode::StoredOnly), None)
        .err()
        .unwrap();
    assert!(matches!(err, Error::CacheScopeMismatch { ref found, .. } if found == "S2"));
}

#[test]
fn stored_only_never_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let api = family_api();
    let err = Cache::open(
        family_catalog(),
        SCHOOL_ID,
        Some(api.boxed()),
        &options(dir.path(), CacheMode::StoredOnly),
        None,
    )
    .err()
    .unwrap();
    assert!(matches!(err, Error::MissingCacheFile { .. }));
    assert!(api.calls().is_empty());
}

#[test]
fn reload_without_client_needs_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let err = Cache::open(family_catalog(), SCHOOL_ID, None, &options(dir.path(), CacheMode::Reload), None)
        .err()
        .unwrap();
    assert!(matches!(err, Error::MissingToken));
}
