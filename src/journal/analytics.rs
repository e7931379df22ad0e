//! Aggregate statistics and importance scoring, derived read-only from the
//! entry store and relationship graph.
//!
//! The importance formula is load-bearing: it ranks the "significant"
//! entries surfaced to users, so the weights, division bounds, and the
//! linear 90-day recency decay are fixed contract, not tuning knobs.

use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashMap;

use super::relations::relationships_for;
use super::types::{GroupBy, RelationType};

/// Weight of the significance component.
const WEIGHT_SIGNIFICANCE: f64 = 0.30;
/// Weight of the relationship-density component (saturates at 5 edges).
const WEIGHT_RELATIONSHIPS: f64 = 0.35;
/// Weight of the causal-density component (saturates at 3 causal edges).
const WEIGHT_CAUSAL: f64 = 0.20;
/// Weight of the recency component (linear decay to zero over 90 days).
const WEIGHT_RECENCY: f64 = 0.15;

const RELATIONSHIP_SATURATION: f64 = 5.0;
const CAUSAL_SATURATION: f64 = 3.0;
const RECENCY_WINDOW_DAYS: f64 = 90.0;

/// Importance score for a single entry, with the normalized components that
/// produced it.
#[derive(Debug, Serialize)]
pub struct ImportanceScore {
    pub entry_id: i64,
    /// Weighted sum in `[0.0, 1.0]`, rounded to 2 decimals.
    pub score: f64,
    pub significance_component: f64,
    pub relationship_component: f64,
    pub causal_component: f64,
    pub recency_component: f64,
}

/// Compute the importance score for a live entry. `None` for deleted or
/// nonexistent ids.
pub fn importance_score(conn: &Connection, entry_id: i64) -> Result<Option<ImportanceScore>> {
    use rusqlite::OptionalExtension;
    let row: Option<(Option<String>, String)> = conn
        .query_row(
            "SELECT significance, timestamp FROM entries WHERE id = ?1 AND deleted_at IS NULL",
            params![entry_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((significance, timestamp)) = row else {
        return Ok(None);
    };

    let relationships = relationships_for(conn, entry_id)?;
    let total = relationships.len() as f64;
    // Causal edges are counted undirected, matching the retrieval API.
    let causal = relationships
        .iter()
        .filter(|r| r.relation_type.is_causal())
        .count() as f64;

    let significance_component = if significance.is_some() { 1.0 } else { 0.0 };
    let relationship_component = (total / RELATIONSHIP_SATURATION).min(1.0);
    let causal_component = (causal / CAUSAL_SATURATION).min(1.0);
    let recency_component = (1.0 - days_since(&timestamp) / RECENCY_WINDOW_DAYS).max(0.0);

    let score = WEIGHT_SIGNIFICANCE * significance_component
        + WEIGHT_RELATIONSHIPS * relationship_component
        + WEIGHT_CAUSAL * causal_component
        + WEIGHT_RECENCY * recency_component;

    Ok(Some(ImportanceScore {
        entry_id,
        score: round2(score),
        significance_component,
        relationship_component,
        causal_component,
        recency_component,
    }))
}

/// The most important live entries, highest score first.
pub fn rank_by_importance(conn: &Connection, limit: usize) -> Result<Vec<ImportanceScore>> {
    let mut stmt =
        conn.prepare("SELECT id FROM entries WHERE deleted_at IS NULL ORDER BY id")?;
    let ids: Vec<i64> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut scores = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(score) = importance_score(conn, id)? {
            scores.push(score);
        }
    }
    scores.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scores.truncate(limit);
    Ok(scores)
}

fn days_since(timestamp: &str) -> f64 {
    match chrono::DateTime::parse_from_rfc3339(timestamp) {
        Ok(created) => {
            let elapsed = chrono::Utc::now().signed_duration_since(created);
            elapsed.num_seconds() as f64 / 86_400.0
        }
        // Unparseable timestamp scores as ancient rather than failing the read
        Err(_) => RECENCY_WINDOW_DAYS,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// One period bucket in a grouped count.
#[derive(Debug, Serialize)]
pub struct PeriodCount {
    /// `YYYY-MM-DD`, `YYYY-Wnn`, or `YYYY-MM` depending on the grouping.
    pub period: String,
    pub count: u64,
}

/// Aggregate statistics for the journal.
#[derive(Debug, Serialize)]
pub struct Statistics {
    pub group_by: GroupBy,
    pub total_entries: u64,
    pub by_type: HashMap<String, u64>,
    /// Newest first, capped to the 52 most recent buckets.
    pub by_period: Vec<PeriodCount>,
    /// Significant-entry counts per period ("decision density").
    pub decision_density: Vec<PeriodCount>,
    pub total_relationships: u64,
    pub avg_relationships_per_entry: f64,
    /// Percentage growth comparing the two most recent buckets. `None` when
    /// the prior bucket is empty.
    pub period_growth_pct: Option<f64>,
    pub causal_counts: HashMap<String, u64>,
}

/// Compute aggregate statistics, grouped by the whitelisted period.
///
/// The strftime format is the one interpolated query fragment in this crate.
/// It comes exclusively from the [`GroupBy`] enum, never from caller input.
pub fn get_statistics(conn: &Connection, group_by: GroupBy) -> Result<Statistics> {
    let format = group_by.strftime_format();

    let total_entries: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE deleted_at IS NULL",
        [],
        |r| r.get(0),
    )?;

    let mut by_type = HashMap::new();
    let mut stmt = conn.prepare(
        "SELECT entry_type, COUNT(*) FROM entries WHERE deleted_at IS NULL GROUP BY entry_type",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (t, count) = row?;
        by_type.insert(t, count as u64);
    }
    drop(stmt);

    let by_period = period_counts(conn, format, false)?;
    let decision_density = period_counts(conn, format, true)?;

    let total_relationships: i64 =
        conn.query_row("SELECT COUNT(*) FROM relationships", [], |r| r.get(0))?;
    let avg_relationships_per_entry = if total_entries > 0 {
        total_relationships as f64 / total_entries as f64
    } else {
        0.0
    };

    let period_growth_pct = match (by_period.first(), by_period.get(1)) {
        (Some(current), Some(previous)) if previous.count > 0 => {
            let cur = current.count as f64;
            let prev = previous.count as f64;
            Some(round2((cur - prev) / prev * 100.0))
        }
        _ => None,
    };

    let mut causal_counts: HashMap<String, u64> = RelationType::CAUSAL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();
    let mut stmt = conn.prepare(
        "SELECT type, COUNT(*) FROM relationships \
         WHERE type IN ('blocked_by','resolved','caused') GROUP BY type",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?;
    for row in rows {
        let (t, count) = row?;
        causal_counts.insert(t, count as u64);
    }
    drop(stmt);

    Ok(Statistics {
        group_by,
        total_entries: total_entries as u64,
        by_type,
        by_period,
        decision_density,
        total_relationships: total_relationships as u64,
        avg_relationships_per_entry,
        period_growth_pct,
        causal_counts,
    })
}

/// Per-period live-entry counts, newest first, capped at 52 buckets.
///
/// `format` is always one of the three [`GroupBy::strftime_format`] values,
/// never caller input.
fn period_counts(conn: &Connection, format: &str, significant_only: bool) -> Result<Vec<PeriodCount>> {
    let filter = if significant_only {
        " AND significance IS NOT NULL"
    } else {
        ""
    };
    let sql = format!(
        "SELECT strftime('{format}', timestamp) AS period, COUNT(*) \
         FROM entries WHERE deleted_at IS NULL{filter} \
         GROUP BY period ORDER BY period DESC LIMIT 52"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(PeriodCount {
                period: row.get(0)?,
                count: row.get::<_, i64>(1)? as u64,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
