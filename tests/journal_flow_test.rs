//! End-to-end journaling workflow: capture a week of work, connect it,
//! consolidate tags, search it, and pull analytics.

mod helpers;

use helpers::{add_typed_entry, test_db};
use quill::journal::analytics::{get_statistics, rank_by_importance};
use quill::journal::entries::{self, NewEntry};
use quill::journal::relations::{graph_neighborhood, link_entries, relationships_for};
use quill::journal::search::{search_entries, SearchFilters};
use quill::journal::tags::{list_tags, merge_tags};
use quill::journal::types::{GroupBy, RelationType};

#[test]
fn capture_connect_and_analyze_a_sprint() {
    let mut conn = test_db();

    // Day one: a bug report comes in.
    let bug = entries::create_entry(
        &mut conn,
        NewEntry {
            content: "Users report intermittent 502s from the gateway under load".into(),
            entry_type: Some("bug_fix".into()),
            tags: vec!["gateway".into(), "prod-incident".into()],
            ..Default::default()
        },
    )
    .unwrap();

    // Investigation notes reference the bug.
    let investigation = entries::create_entry(
        &mut conn,
        NewEntry {
            content: "Traced the 502s to connection pool exhaustion during keepalive churn".into(),
            entry_type: Some("technical_achievement".into()),
            tags: vec!["gateway".into(), "networking".into()],
            ..Default::default()
        },
    )
    .unwrap();
    link_entries(
        &conn,
        investigation.id,
        bug.id,
        RelationType::References,
        Some("root cause analysis"),
    )
    .unwrap();

    // The fix resolves the bug and gets marked significant.
    let fix = add_typed_entry(
        &mut conn,
        "Capped keepalive pool and added circuit breaker; 502s gone in canary",
        "decision",
        Some("milestone"),
    );
    link_entries(&conn, fix, bug.id, RelationType::Resolved, None).unwrap();
    link_entries(&conn, fix, investigation.id, RelationType::Implements, None).unwrap();

    // The graph around the bug reaches both other entries.
    let graph = graph_neighborhood(&conn, bug.id, 2).unwrap();
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len(), 3);

    // Tag cleanup: "prod-incident" folds into "incident".
    let merge = merge_tags(&mut conn, "prod-incident", "incident").unwrap();
    assert_eq!(merge.entries_updated, 1);
    assert!(merge.source_deleted);
    let tags = list_tags(&conn).unwrap();
    assert!(tags.iter().any(|t| t.name == "incident" && t.usage_count == 1));
    assert!(!tags.iter().any(|t| t.name == "prod-incident"));

    // Keyword search narrows by type.
    let hits = search_entries(
        &conn,
        "502s",
        10,
        &SearchFilters {
            entry_type: Some("bug_fix".into()),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, bug.id);

    // The fix outranks everything: significant, connected, causal, fresh.
    let ranked = rank_by_importance(&conn, 3).unwrap();
    assert_eq!(ranked[0].entry_id, fix);

    // Statistics see three live entries and one causal link.
    let stats = get_statistics(&conn, GroupBy::Day).unwrap();
    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.total_relationships, 3);
    assert_eq!(stats.causal_counts["resolved"], 1);
    assert_eq!(stats.by_type["decision"], 1);

    // All three relationships touch the bug entry.
    assert_eq!(relationships_for(&conn, bug.id).unwrap().len(), 2);
}

#[test]
fn soft_delete_hides_everywhere_and_restore_brings_back() {
    let mut conn = test_db();
    let keeper = add_typed_entry(&mut conn, "keep this note", "personal_reflection", None);
    let doomed = add_typed_entry(&mut conn, "remove this note", "personal_reflection", None);

    assert!(entries::delete_entry(&mut conn, doomed, false).unwrap());

    // Gone from point reads, listings, and search.
    assert!(entries::get_entry(&conn, doomed).unwrap().is_none());
    let listed = entries::list_recent(&conn, 10, None).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, keeper);
    let found = search_entries(&conn, "note", 10, &SearchFilters::default()).unwrap();
    assert_eq!(found.len(), 1);

    // But visible in the deleted listing, and restorable.
    let deleted = entries::list_deleted(&conn).unwrap();
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id, doomed);

    let restored = entries::restore_entry(&conn, doomed).unwrap().unwrap();
    assert!(restored.deleted_at.is_none());
    assert!(entries::get_entry(&conn, doomed).unwrap().is_some());
}

#[test]
fn updating_tags_replaces_the_set_and_reconciles_counts() {
    let mut conn = test_db();
    let id = entries::create_entry(
        &mut conn,
        NewEntry {
            content: "tagged entry".into(),
            tags: vec!["old".into(), "shared".into()],
            ..Default::default()
        },
    )
    .unwrap()
    .id;

    let updated = entries::update_entry(
        &mut conn,
        id,
        entries::UpdateEntry {
            tags: Some(vec!["shared".into(), "new".into()]),
            ..Default::default()
        },
    )
    .unwrap()
    .unwrap();
    assert_eq!(updated.tags, vec!["new".to_string(), "shared".to_string()]);

    let tags = list_tags(&conn).unwrap();
    let count_of = |name: &str| {
        tags.iter()
            .find(|t| t.name == name)
            .map(|t| t.usage_count)
            .unwrap_or(0)
    };
    assert_eq!(count_of("old"), 0);
    assert_eq!(count_of("shared"), 1);
    assert_eq!(count_of("new"), 1);
}
