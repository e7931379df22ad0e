use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::journal::types::Entry;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Substring to match against entry content")]
    pub query: String,

    #[schemars(description = "Maximum results. Defaults to the configured limit.")]
    pub limit: Option<usize>,

    #[schemars(description = "true: personal entries only; false: project entries only")]
    pub personal: Option<bool>,

    #[schemars(description = "Restrict to one entry type")]
    pub entry_type: Option<String>,

    #[schemars(description = "Earliest date to include, YYYY-MM-DD")]
    pub date_from: Option<String>,

    #[schemars(description = "Latest date to include, YYYY-MM-DD (inclusive)")]
    pub date_to: Option<String>,

    #[schemars(description = "Restrict to entries linked to this GitHub issue")]
    pub issue_number: Option<i64>,

    #[schemars(description = "Restrict to entries linked to this GitHub PR")]
    pub pr_number: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DateRangeParams {
    #[schemars(description = "Range start, YYYY-MM-DD")]
    pub start_date: String,

    #[schemars(description = "Range end, YYYY-MM-DD, inclusive through end of day")]
    pub end_date: String,

    #[schemars(description = "Restrict to one entry type")]
    pub entry_type: Option<String>,

    #[schemars(description = "Match entries carrying any of these tags")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "true: personal entries only")]
    pub personal: Option<bool>,

    #[schemars(description = "true: project (non-personal) entries only")]
    pub project: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SemanticSearchParams {
    #[schemars(description = "Natural-language query to match by meaning")]
    pub query: String,

    #[schemars(description = "Maximum results. Defaults to the configured limit.")]
    pub limit: Option<usize>,
}

/// A semantic hit hydrated against the journal.
#[derive(Debug, Serialize)]
pub struct SemanticResult {
    pub similarity: f64,
    pub entry: Entry,
}
