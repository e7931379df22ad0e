//! Typed, directed relationship edges between entries.
//!
//! Edges are directional for semantic meaning (and arrow styling in the
//! graph view) but undirected for retrieval: "relationships touching entry
//! X" matches either endpoint. Both endpoints are existence-checked before
//! insert; creation fails fast rather than producing an orphaned edge.

use anyhow::Result;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

use super::error::JournalError;
use super::types::{RelationType, Relationship};
use super::{entry_is_live, now_rfc3339};

fn relationship_from_row(row: &Row<'_>) -> rusqlite::Result<Relationship> {
    let type_str: String = row.get(3)?;
    Ok(Relationship {
        id: row.get(0)?,
        from_entry_id: row.get(1)?,
        to_entry_id: row.get(2)?,
        relation_type: type_str
            .parse()
            .map_err(|_| rusqlite::Error::InvalidQuery)?,
        description: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Create a directed edge between two live entries.
///
/// Throws a precondition failure naming the missing endpoint; no row is
/// written in that case.
pub fn link_entries(
    conn: &Connection,
    from: i64,
    to: i64,
    relation_type: RelationType,
    description: Option<&str>,
) -> Result<Relationship> {
    if !entry_is_live(conn, from)? {
        return Err(JournalError::precondition(format!("entry {from} not found")).into());
    }
    if !entry_is_live(conn, to)? {
        return Err(JournalError::precondition(format!("entry {to} not found")).into());
    }

    let now = now_rfc3339();
    conn.execute(
        "INSERT INTO relationships (from_entry_id, to_entry_id, type, description, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![from, to, relation_type.as_str(), description, now],
    )?;
    let id = conn.last_insert_rowid();

    tracing::info!(id, from, to, relation_type = %relation_type, "entries linked");

    Ok(Relationship {
        id,
        from_entry_id: from,
        to_entry_id: to,
        relation_type,
        description: description.map(str::to_string),
        created_at: now,
    })
}

/// All edges where the entry is either source or target.
pub fn relationships_for(conn: &Connection, entry_id: i64) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(
        "SELECT id, from_entry_id, to_entry_id, type, description, created_at \
         FROM relationships WHERE from_entry_id = ?1 OR to_entry_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![entry_id], relationship_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A node in the derived graph view.
#[derive(Debug, Serialize)]
pub struct GraphNode {
    pub id: i64,
    pub entry_type: String,
    pub preview: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<String>,
    /// Hops from the seed entry.
    pub depth: usize,
}

/// The breadth-first neighborhood of a seed entry. Recomputed from the
/// relationship rows on every request, never stored.
#[derive(Debug, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Relationship>,
}

/// Breadth-first traversal from `seed` up to `max_depth` hops, following
/// edges in both directions. The seed must be a live entry.
pub fn graph_neighborhood(conn: &Connection, seed: i64, max_depth: usize) -> Result<GraphView> {
    if !entry_is_live(conn, seed)? {
        return Err(JournalError::precondition(format!("entry {seed} not found")).into());
    }

    let mut visited: HashSet<i64> = HashSet::new();
    let mut edge_ids: HashSet<i64> = HashSet::new();
    let mut nodes: Vec<GraphNode> = Vec::new();
    let mut edges: Vec<Relationship> = Vec::new();
    let mut queue: VecDeque<(i64, usize)> = VecDeque::new();

    visited.insert(seed);
    queue.push_back((seed, 0));

    while let Some((id, depth)) = queue.pop_front() {
        if let Some(node) = graph_node(conn, id, depth)? {
            nodes.push(node);
        } else {
            // Soft-deleted neighbor: keep it out of the view entirely
            continue;
        }
        if depth == max_depth {
            continue;
        }
        for rel in relationships_for(conn, id)? {
            let neighbor = if rel.from_entry_id == id {
                rel.to_entry_id
            } else {
                rel.from_entry_id
            };
            if edge_ids.insert(rel.id) {
                edges.push(rel);
            }
            if visited.insert(neighbor) {
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    // Edges found during traversal can point at soft-deleted neighbors,
    // which never become nodes. Keep only edges between rendered nodes.
    let node_ids: HashSet<i64> = nodes.iter().map(|n| n.id).collect();
    edges.retain(|e| node_ids.contains(&e.from_entry_id) && node_ids.contains(&e.to_entry_id));

    Ok(GraphView { nodes, edges })
}

fn graph_node(conn: &Connection, id: i64, depth: usize) -> Result<Option<GraphNode>> {
    use rusqlite::OptionalExtension;
    let node = conn
        .query_row(
            "SELECT entry_type, content, significance FROM entries \
             WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            |row| {
                let content: String = row.get(1)?;
                Ok(GraphNode {
                    id,
                    entry_type: row.get(0)?,
                    preview: truncate_preview(&content, 100),
                    significance: row.get(2)?,
                    depth,
                })
            },
        )
        .optional()?;
    Ok(node)
}

/// Truncate content to max_chars, appending "..." if truncated.
pub(crate) fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        content.to_string()
    } else {
        let end = content
            .char_indices()
            .take_while(|(i, _)| *i < max_chars)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(max_chars);
        format!("{}...", &content[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::journal::entries::{create_entry, delete_entry, NewEntry};

    fn test_db() -> Connection {
        db::open_memory_database().unwrap()
    }

    fn entry(conn: &mut Connection, content: &str) -> i64 {
        create_entry(
            conn,
            NewEntry {
                content: content.into(),
                ..Default::default()
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn link_and_query_both_directions() {
        let mut conn = test_db();
        let a = entry(&mut conn, "fixed the race");
        let b = entry(&mut conn, "the deadlock report");

        let rel = link_entries(&conn, a, b, RelationType::Resolved, Some("root cause")).unwrap();
        assert_eq!(rel.from_entry_id, a);
        assert_eq!(rel.to_entry_id, b);

        // Both endpoints see the edge
        assert_eq!(relationships_for(&conn, a).unwrap().len(), 1);
        assert_eq!(relationships_for(&conn, b).unwrap().len(), 1);
    }

    #[test]
    fn missing_endpoint_fails_before_any_write() {
        let mut conn = test_db();
        let real = entry(&mut conn, "real entry");

        let err = link_entries(&conn, 999, real, RelationType::References, None).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JournalError>(),
            Some(JournalError::Precondition(_))
        ));
        assert!(err.to_string().contains("entry 999 not found"));

        // No edge was written
        assert!(relationships_for(&conn, real).unwrap().is_empty());
    }

    #[test]
    fn soft_deleted_endpoint_counts_as_missing() {
        let mut conn = test_db();
        let a = entry(&mut conn, "live");
        let b = entry(&mut conn, "dead");
        delete_entry(&mut conn, b, false).unwrap();

        let err = link_entries(&conn, a, b, RelationType::References, None).unwrap_err();
        assert!(err.to_string().contains(&format!("entry {b} not found")));
    }

    #[test]
    fn hard_delete_cascades_edges() {
        let mut conn = test_db();
        let a = entry(&mut conn, "a");
        let b = entry(&mut conn, "b");
        link_entries(&conn, a, b, RelationType::Caused, None).unwrap();

        delete_entry(&mut conn, a, true).unwrap();
        assert!(relationships_for(&conn, b).unwrap().is_empty());
    }

    #[test]
    fn neighborhood_respects_depth_bound() {
        let mut conn = test_db();
        let a = entry(&mut conn, "seed");
        let b = entry(&mut conn, "one hop");
        let c = entry(&mut conn, "two hops");
        link_entries(&conn, a, b, RelationType::References, None).unwrap();
        link_entries(&conn, b, c, RelationType::References, None).unwrap();

        let view = graph_neighborhood(&conn, a, 1).unwrap();
        let node_ids: Vec<i64> = view.nodes.iter().map(|n| n.id).collect();
        assert!(node_ids.contains(&a));
        assert!(node_ids.contains(&b));
        assert!(!node_ids.contains(&c));

        let deep = graph_neighborhood(&conn, a, 2).unwrap();
        assert_eq!(deep.nodes.len(), 3);
        assert_eq!(deep.edges.len(), 2);
    }

    #[test]
    fn neighborhood_handles_cycles() {
        let mut conn = test_db();
        let a = entry(&mut conn, "a");
        let b = entry(&mut conn, "b");
        link_entries(&conn, a, b, RelationType::References, None).unwrap();
        link_entries(&conn, b, a, RelationType::Clarifies, None).unwrap();

        let view = graph_neighborhood(&conn, a, 3).unwrap();
        assert_eq!(view.nodes.len(), 2);
        assert_eq!(view.edges.len(), 2);
    }

    #[test]
    fn neighborhood_drops_edges_to_soft_deleted_neighbors() {
        let mut conn = test_db();
        let a = entry(&mut conn, "seed");
        let b = entry(&mut conn, "kept neighbor");
        let c = entry(&mut conn, "deleted neighbor");
        link_entries(&conn, a, b, RelationType::References, None).unwrap();
        link_entries(&conn, a, c, RelationType::References, None).unwrap();
        delete_entry(&mut conn, c, false).unwrap();

        let view = graph_neighborhood(&conn, a, 2).unwrap();
        let node_ids: Vec<i64> = view.nodes.iter().map(|n| n.id).collect();
        assert!(!node_ids.contains(&c));
        // Every edge connects two rendered nodes
        assert_eq!(view.edges.len(), 1);
        for edge in &view.edges {
            assert!(node_ids.contains(&edge.from_entry_id));
            assert!(node_ids.contains(&edge.to_entry_id));
        }
    }

    #[test]
    fn neighborhood_seed_must_exist() {
        let conn = test_db();
        let err = graph_neighborhood(&conn, 1, 2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JournalError>(),
            Some(JournalError::Precondition(_))
        ));
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(truncate_preview("short", 80), "short");
        assert!(truncate_preview(&"é".repeat(100), 80).ends_with("..."));
    }
}
