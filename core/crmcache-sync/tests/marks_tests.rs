mod common;

use chrono::{TimeZone, Utc};
use common::*;
use crmcache_storage::{CacheStore, RecordFilter, RecordFlags, SqliteCacheStore};
use crmcache_sync::{SyncEngine, SyncError};
use crmcache_types::CachedRecord;
use pretty_assertions::assert_eq;

fn seeded_engine() -> SyncEngine<MockRemote, SqliteCacheStore> {
    let engine = engine(MockRemote::new());
    let store = engine.store();
    for (uid, day) in [(1, 1), (2, 10), (3, 20)] {
        store
            .upsert(&CachedRecord::new(
                "Lead",
                id(uid),
                lead(uid, "Lead", "2024-01-01 00:00:00"),
                at(2024, 3, day),
                at(2024, 3, day),
            ))
            .unwrap();
    }
    store
        .upsert(&CachedRecord::new(
            "Project",
            id(1),
            project(1, "2024-01-01 00:00:00"),
            at(2024, 1, 5),
            at(2024, 1, 5),
        ))
        .unwrap();
    store
        .upsert(&CachedRecord::new(
            "OpportunityLinks",
            id(100),
            link(100, "Acme"),
            at(2024, 3, 1),
            at(2024, 3, 1),
        ))
        .unwrap();
    engine
}

fn flagged(engine: &SyncEngine<MockRemote, SqliteCacheStore>, type_name: &str) -> Vec<i64> {
    engine
        .store()
        .query(type_name, RecordFilter::RescanPending)
        .unwrap()
        .into_iter()
        .map(|r| {
            assert!(r.dirty);
            r.uid.get()
        })
        .collect()
}

// ── rescan ──────────────────────────────────────────────────────

#[test]
fn rescan_all_flags_every_eligible_type() {
    let engine = seeded_engine();

    let report = engine.rescan("").unwrap();

    assert_eq!(report.get("Lead"), Some(3));
    assert_eq!(report.get("Project"), Some(1));
    assert_eq!(report.get("OpportunityLinks"), None);
    assert_eq!(report.total(), 4);
    assert_eq!(flagged(&engine, "Lead"), vec![1, 2, 3]);
    assert!(flagged(&engine, "OpportunityLinks").is_empty());
}

#[test]
fn rescan_single_type() {
    let engine = seeded_engine();

    let report = engine.rescan("leads").unwrap();

    assert_eq!(report.types, vec![("Lead".to_string(), 3)]);
    assert!(flagged(&engine, "Project").is_empty());
}

#[test]
fn rescan_target_resolution_is_case_insensitive() {
    let engine = seeded_engine();

    assert_eq!(engine.rescan("LEADS").unwrap().get("Lead"), Some(3));
    assert_eq!(engine.rescan("Project").unwrap().get("Project"), Some(1));
    assert_eq!(engine.rescan(" lead_statuses ").unwrap().get("LeadStatus"), Some(0));
}

#[test]
fn rescan_unknown_type_changes_nothing() {
    let engine = seeded_engine();

    let err = engine.rescan("invoices").unwrap_err();

    assert!(matches!(err, SyncError::UnknownEntityType(ref name) if name == "invoices"));
    assert!(flagged(&engine, "Lead").is_empty());
}

#[test]
fn rescan_ineligible_type_marks_nothing() {
    let engine = seeded_engine();

    let report = engine.rescan("opportunity links").unwrap();

    assert_eq!(report.total(), 0);
    assert!(flagged(&engine, "OpportunityLinks").is_empty());
}

#[test]
fn rescan_last_month_only_flags_recent_records() {
    let engine = seeded_engine();
    let now = Utc.with_ymd_and_hms(2024, 4, 5, 0, 0, 0).unwrap();

    let report = engine.rescan_last_month_at("", now).unwrap();

    assert_eq!(report.get("Lead"), Some(2));
    assert_eq!(report.get("Project"), Some(0));
    assert_eq!(flagged(&engine, "Lead"), vec![2, 3]);
}

#[test]
fn rescan_last_month_respects_target() {
    let engine = seeded_engine();
    let now = Utc.with_ymd_and_hms(2024, 4, 5, 0, 0, 0).unwrap();

    let report = engine.rescan_last_month_at("projects", now).unwrap();

    assert_eq!(report.types, vec![("Project".to_string(), 0)]);
    assert!(flagged(&engine, "Lead").is_empty());
}

// ── unmark ──────────────────────────────────────────────────────

#[test]
fn unmark_clears_every_type() {
    let engine = seeded_engine();
    engine.rescan("").unwrap();
    engine
        .store()
        .set_flags("OpportunityLinks", RecordFilter::All, RecordFlags::MISSING)
        .unwrap();

    let report = engine.unmark().unwrap();

    assert_eq!(report.types.len(), 7);
    assert_eq!(report.total(), 5);
    for type_name in ["Lead", "Project", "OpportunityLinks"] {
        let counts = engine.store().flag_counts(type_name).unwrap();
        assert_eq!(counts.rescan, 0, "{type_name}");
        assert_eq!(counts.dirty, 0, "{type_name}");
    }
}
