//! Core journal type definitions.
//!
//! Defines [`Entry`] (a full record and the aggregate root), [`Tag`],
//! [`Relationship`] with its closed [`RelationType`] set, the optional
//! [`GithubLink`], and the [`GroupBy`] whitelist for statistics.
//!
//! Entry types and significance classifications are open string vocabularies
//! (`personal_reflection`, `technical_achievement`, `milestone`, `bug_fix`,
//! ...), so they stay plain strings here rather than enums.

use serde::{Deserialize, Serialize};

/// Maximum allowed content length for an entry, in characters.
pub const MAX_CONTENT_LEN: usize = 50_000;

/// Default entry type applied when the caller supplies none.
pub const DEFAULT_ENTRY_TYPE: &str = "personal_reflection";

/// A journal entry, matching the `entries` table schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Monotonic integer primary key, assigned on insert and never reused.
    pub id: i64,
    /// Open string vocabulary (e.g. `personal_reflection`, `bug_fix`).
    pub entry_type: String,
    /// Free-text content, never empty, at most [`MAX_CONTENT_LEN`] chars.
    pub content: String,
    /// ISO 8601 creation timestamp, assigned at insert, immutable.
    pub timestamp: String,
    /// Personal (true) vs project (false) entry.
    pub is_personal: bool,
    /// Optional significance classification (open vocabulary, e.g.
    /// `technical_breakthrough`). Separate from the tag vocabulary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<String>,
    /// Soft-delete timestamp. `None` for live entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    /// Optional linkage to an external issue/PR/workflow run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubLink>,
    /// Free-form auto-captured context blob.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Tags currently applied to this entry.
    pub tags: Vec<String>,
}

/// Structured linkage from an entry to GitHub metadata. Populated by the
/// caller at creation time; quill never calls out to GitHub itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GithubLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pr_number: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_run_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl GithubLink {
    /// `None`-equivalent links collapse to a null column set.
    pub fn is_empty(&self) -> bool {
        self.issue_number.is_none()
            && self.pr_number.is_none()
            && self.workflow_run_id.is_none()
            && self.url.is_none()
            && self.status.is_none()
    }
}

/// A named label with a denormalized usage counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    /// Unique, case-sensitive name.
    pub name: String,
    /// Number of entry-tag links referencing this tag. Maintained
    /// incrementally: +1 on genuinely new link, -1 on link removal.
    pub usage_count: i64,
}

/// The closed set of relationship types between entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    References,
    Implements,
    Clarifies,
    /// Causal: the source entry was blocked by the target.
    BlockedBy,
    /// Causal: the source entry resolved the target.
    Resolved,
    /// Causal: the source entry caused the target.
    Caused,
}

impl RelationType {
    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::References => "references",
            Self::Implements => "implements",
            Self::Clarifies => "clarifies",
            Self::BlockedBy => "blocked_by",
            Self::Resolved => "resolved",
            Self::Caused => "caused",
        }
    }

    /// Causal subtypes get distinct treatment in analytics and visualization.
    pub fn is_causal(&self) -> bool {
        matches!(self, Self::BlockedBy | Self::Resolved | Self::Caused)
    }

    /// The causal subset, in the order analytics reports them.
    pub const CAUSAL: [RelationType; 3] = [Self::BlockedBy, Self::Resolved, Self::Caused];
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "references" => Ok(Self::References),
            "implements" => Ok(Self::Implements),
            "clarifies" => Ok(Self::Clarifies),
            "blocked_by" => Ok(Self::BlockedBy),
            "resolved" => Ok(Self::Resolved),
            "caused" => Ok(Self::Caused),
            _ => Err(format!("unknown relationship type: {s}")),
        }
    }
}

/// A directed, typed edge between two entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub from_entry_id: i64,
    pub to_entry_id: i64,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
}

/// Grouping period for statistics. A fixed three-value whitelist; the
/// strftime format it maps to is the one query fragment assembled by
/// interpolation rather than parameter binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Day,
    Week,
    Month,
}

impl GroupBy {
    /// The strftime format producing the period bucket string.
    /// Shapes: `YYYY-MM-DD`, `YYYY-Wnn`, `YYYY-MM`.
    pub fn strftime_format(&self) -> &'static str {
        match self {
            Self::Day => "%Y-%m-%d",
            Self::Week => "%Y-W%W",
            Self::Month => "%Y-%m",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }
}

impl std::str::FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            _ => Err(format!("invalid grouping period: {s} (expected day, week, or month)")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_type_round_trips() {
        for s in ["references", "implements", "clarifies", "blocked_by", "resolved", "caused"] {
            let rt: RelationType = s.parse().unwrap();
            assert_eq!(rt.as_str(), s);
        }
        assert!("follows".parse::<RelationType>().is_err());
    }

    #[test]
    fn causal_subset() {
        assert!(RelationType::BlockedBy.is_causal());
        assert!(RelationType::Resolved.is_causal());
        assert!(RelationType::Caused.is_causal());
        assert!(!RelationType::References.is_causal());
        assert!(!RelationType::Implements.is_causal());
        assert!(!RelationType::Clarifies.is_causal());
    }

    #[test]
    fn group_by_is_a_whitelist() {
        assert_eq!("day".parse::<GroupBy>().unwrap(), GroupBy::Day);
        assert_eq!("week".parse::<GroupBy>().unwrap(), GroupBy::Week);
        assert_eq!("month".parse::<GroupBy>().unwrap(), GroupBy::Month);
        assert!("year".parse::<GroupBy>().is_err());
        assert!("%Y".parse::<GroupBy>().is_err());
    }

    #[test]
    fn empty_github_link_collapses() {
        assert!(GithubLink::default().is_empty());
        let link = GithubLink {
            issue_number: Some(7),
            ..Default::default()
        };
        assert!(!link.is_empty());
    }
}
