//! Lexical search over entry content.
//!
//! Substring LIKE matching with optional, AND-combined structured filters.
//! Every user value is parameter-bound; filter strings additionally pass
//! through the injection-pattern screen in [`super::security`].

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::Connection;

use super::entries::{attach_tags, entry_from_row, ENTRY_COLUMNS};
use super::error::JournalError;
use super::security;
use super::types::Entry;

/// Optional filters for [`search_entries`]. Absent filters impose no
/// constraint.
#[derive(Debug, Default)]
pub struct SearchFilters {
    pub personal: Option<bool>,
    pub entry_type: Option<String>,
    /// Inclusive `YYYY-MM-DD` bounds.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub issue_number: Option<i64>,
    pub pr_number: Option<i64>,
}

/// Optional filters for [`search_by_date_range`].
#[derive(Debug, Default)]
pub struct DateRangeFilters {
    pub entry_type: Option<String>,
    /// Entry must carry *at least one* of these tags, not all.
    pub tags: Vec<String>,
    pub personal: Option<bool>,
    /// Convenience inverse of `personal`.
    pub project: Option<bool>,
}

/// Substring search over live entries, timestamp descending.
///
/// An empty query returns an empty result set, not an error.
pub fn search_entries(
    conn: &Connection,
    query: &str,
    limit: usize,
    filters: &SearchFilters,
) -> Result<Vec<Entry>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(ref t) = filters.entry_type {
        security::check_filter_value("entry_type filter", t)?;
    }
    // Same validation as search_by_date_range; a malformed bound would
    // otherwise pass through date() as NULL and silently match nothing.
    if let Some(ref from) = filters.date_from {
        parse_date(from)?;
    }
    if let Some(ref to) = filters.date_to {
        parse_date(to)?;
    }

    let mut sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM entries \
         WHERE deleted_at IS NULL AND content LIKE '%' || ? || '%'"
    );
    let mut params: Vec<Value> = vec![Value::from(query.to_string())];

    if let Some(personal) = filters.personal {
        sql.push_str(" AND is_personal = ?");
        params.push(Value::from(personal));
    }
    if let Some(ref entry_type) = filters.entry_type {
        sql.push_str(" AND entry_type = ?");
        params.push(Value::from(entry_type.clone()));
    }
    if let Some(ref from) = filters.date_from {
        sql.push_str(" AND date(timestamp) >= date(?)");
        params.push(Value::from(from.clone()));
    }
    if let Some(ref to) = filters.date_to {
        // Inclusive through end-of-day
        sql.push_str(" AND date(timestamp) <= date(?)");
        params.push(Value::from(to.clone()));
    }
    if let Some(issue) = filters.issue_number {
        sql.push_str(" AND issue_number = ?");
        params.push(Value::from(issue));
    }
    if let Some(pr) = filters.pr_number {
        sql.push_str(" AND pr_number = ?");
        params.push(Value::from(pr));
    }

    sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");
    params.push(Value::from(limit as i64));

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<Entry> = stmt
        .query_map(rusqlite::params_from_iter(params), entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    attach_tags(conn, rows)
}

/// Live entries within an inclusive date range, newest first.
///
/// The end bound extends through end-of-day. An inverted range returns an
/// empty result set; a malformed date is a validation failure.
pub fn search_by_date_range(
    conn: &Connection,
    start: &str,
    end: &str,
    filters: &DateRangeFilters,
) -> Result<Vec<Entry>> {
    let start_date = parse_date(start)?;
    let end_date = parse_date(end)?;
    if start_date > end_date {
        return Ok(Vec::new());
    }
    if let Some(ref t) = filters.entry_type {
        security::check_filter_value("entry_type filter", t)?;
    }
    for tag in &filters.tags {
        security::check_filter_value("tag filter", tag)?;
    }

    let mut sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM entries \
         WHERE deleted_at IS NULL AND date(timestamp) >= date(?) AND date(timestamp) <= date(?)"
    );
    let mut params: Vec<Value> = vec![
        Value::from(start.to_string()),
        Value::from(end.to_string()),
    ];

    if let Some(ref entry_type) = filters.entry_type {
        sql.push_str(" AND entry_type = ?");
        params.push(Value::from(entry_type.clone()));
    }
    if let Some(personal) = filters.personal {
        sql.push_str(" AND is_personal = ?");
        params.push(Value::from(personal));
    }
    if let Some(project) = filters.project {
        sql.push_str(" AND is_personal = ?");
        params.push(Value::from(!project));
    }
    if !filters.tags.is_empty() {
        // Any-of semantics: one matching tag is enough
        let placeholders = vec!["?"; filters.tags.len()].join(", ");
        sql.push_str(&format!(
            " AND id IN (SELECT et.entry_id FROM entry_tags et \
             JOIN tags t ON t.id = et.tag_id WHERE t.name IN ({placeholders}))"
        ));
        for tag in &filters.tags {
            params.push(Value::from(tag.clone()));
        }
    }

    sql.push_str(" ORDER BY timestamp DESC, id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let rows: Vec<Entry> = stmt
        .query_map(rusqlite::params_from_iter(params), entry_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    attach_tags(conn, rows)
}

fn parse_date(s: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| JournalError::validation(format!("invalid date: {s} (expected YYYY-MM-DD)")).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::journal::entries::{create_entry, delete_entry, NewEntry};
    use crate::journal::types::GithubLink;

    fn test_db() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn insert(conn: &mut Connection, content: &str, new: NewEntry) -> i64 {
        create_entry(
            conn,
            NewEntry {
                content: content.into(),
                ..new
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn substring_match_orders_newest_first() {
        let mut conn = test_db();
        let a = insert(&mut conn, "first retry fix", NewEntry::default());
        let b = insert(&mut conn, "second retry improvement", NewEntry::default());
        insert(&mut conn, "unrelated note", NewEntry::default());

        let results = search_entries(&conn, "retry", 10, &SearchFilters::default()).unwrap();
        let ids: Vec<i64> = results.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![b, a]);
    }

    #[test]
    fn empty_query_is_empty_result() {
        let mut conn = test_db();
        insert(&mut conn, "something", NewEntry::default());
        assert!(search_entries(&conn, "", 10, &SearchFilters::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn soft_deleted_entries_never_match() {
        let mut conn = test_db();
        let id = insert(&mut conn, "findable until deleted", NewEntry::default());
        delete_entry(&mut conn, id, false).unwrap();
        assert!(search_entries(&conn, "findable", 10, &SearchFilters::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn filters_combine_with_and() {
        let mut conn = test_db();
        insert(
            &mut conn,
            "personal milestone note",
            NewEntry {
                is_personal: true,
                entry_type: Some("milestone".into()),
                ..Default::default()
            },
        );
        insert(
            &mut conn,
            "project milestone note",
            NewEntry {
                entry_type: Some("milestone".into()),
                ..Default::default()
            },
        );

        let filters = SearchFilters {
            personal: Some(true),
            entry_type: Some("milestone".into()),
            ..Default::default()
        };
        let results = search_entries(&conn, "milestone", 10, &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_personal);
    }

    #[test]
    fn github_linkage_filters() {
        let mut conn = test_db();
        let linked = insert(
            &mut conn,
            "fix shipped in the issue",
            NewEntry {
                github: Some(GithubLink {
                    issue_number: Some(42),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        insert(&mut conn, "fix without an issue", NewEntry::default());

        let filters = SearchFilters {
            issue_number: Some(42),
            ..Default::default()
        };
        let results = search_entries(&conn, "fix", 10, &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, linked);
    }

    #[test]
    fn injection_pattern_in_type_filter_is_security_class() {
        let conn = test_db();
        let filters = SearchFilters {
            entry_type: Some("x'; DROP TABLE entries; --".into()),
            ..Default::default()
        };
        let err = search_entries(&conn, "q", 10, &filters).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JournalError>(),
            Some(JournalError::Security(_))
        ));
    }

    #[test]
    fn malformed_date_filter_is_validation_failure() {
        let mut conn = test_db();
        insert(&mut conn, "match me", NewEntry::default());

        let filters = SearchFilters {
            date_from: Some("not-a-date".into()),
            ..Default::default()
        };
        let err = search_entries(&conn, "match", 10, &filters).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JournalError>(),
            Some(JournalError::Validation(_))
        ));
    }

    #[test]
    fn date_range_is_end_inclusive() {
        let mut conn = test_db();
        let id = insert(&mut conn, "late in the day", NewEntry::default());
        // Pin the timestamp to late evening on a known date
        conn.execute(
            "UPDATE entries SET timestamp = '2026-03-10T23:55:00+00:00' WHERE id = ?1",
            rusqlite::params![id],
        )
        .unwrap();

        let hits =
            search_by_date_range(&conn, "2026-03-01", "2026-03-10", &DateRangeFilters::default())
                .unwrap();
        assert_eq!(hits.len(), 1);

        let misses =
            search_by_date_range(&conn, "2026-03-01", "2026-03-09", &DateRangeFilters::default())
                .unwrap();
        assert!(misses.is_empty());
    }

    #[test]
    fn inverted_range_is_empty_not_error() {
        let conn = test_db();
        let hits =
            search_by_date_range(&conn, "2026-03-10", "2026-03-01", &DateRangeFilters::default())
                .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn malformed_date_is_validation_failure() {
        let conn = test_db();
        let err = search_by_date_range(&conn, "march 1st", "2026-03-10", &DateRangeFilters::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JournalError>(),
            Some(JournalError::Validation(_))
        ));
    }

    #[test]
    fn tag_filter_is_any_of() {
        let mut conn = test_db();
        insert(
            &mut conn,
            "tagged perf only",
            NewEntry {
                tags: vec!["perf".into()],
                ..Default::default()
            },
        );
        insert(
            &mut conn,
            "tagged retry only",
            NewEntry {
                tags: vec!["retry".into()],
                ..Default::default()
            },
        );
        insert(&mut conn, "untagged", NewEntry::default());

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let filters = DateRangeFilters {
            tags: vec!["perf".into(), "retry".into()],
            ..Default::default()
        };
        let hits = search_by_date_range(&conn, &today, &today, &filters).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn project_filter_is_inverse_of_personal() {
        let mut conn = test_db();
        insert(
            &mut conn,
            "mine",
            NewEntry {
                is_personal: true,
                ..Default::default()
            },
        );
        insert(&mut conn, "ours", NewEntry::default());

        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let filters = DateRangeFilters {
            project: Some(true),
            ..Default::default()
        };
        let hits = search_by_date_range(&conn, &today, &today, &filters).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(!hits[0].is_personal);
    }
}
