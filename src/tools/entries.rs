use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateEntryParams {
    #[schemars(description = "The journal entry text. Stored verbatim.")]
    pub content: String,

    #[schemars(
        description = "Entry type, e.g. 'technical_achievement', 'bug_fix', 'decision', 'personal_reflection'. Defaults to 'personal_reflection'."
    )]
    pub entry_type: Option<String>,

    #[schemars(description = "Tag names to attach. New tags are created automatically.")]
    pub tags: Option<Vec<String>>,

    #[schemars(description = "Mark as a personal (non-project) entry. Defaults to false.")]
    pub is_personal: Option<bool>,

    #[schemars(
        description = "Optional significance classification, e.g. 'milestone', 'technical_breakthrough'."
    )]
    pub significance: Option<String>,

    #[schemars(description = "GitHub issue number this entry relates to")]
    pub issue_number: Option<i64>,

    #[schemars(description = "GitHub pull request number this entry relates to")]
    pub pr_number: Option<i64>,

    #[schemars(description = "GitHub Actions workflow run id this entry relates to")]
    pub workflow_run_id: Option<i64>,

    #[schemars(description = "GitHub URL for the linked issue/PR/run")]
    pub github_url: Option<String>,

    #[schemars(description = "Status of the linked GitHub item, e.g. 'open', 'merged'")]
    pub github_status: Option<String>,

    #[schemars(description = "Free-form context: repo, branch, working directory")]
    pub context: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GetEntryParams {
    #[schemars(description = "Entry id")]
    pub id: i64,

    #[schemars(description = "Also return the entry if it is soft-deleted. Defaults to false.")]
    pub include_deleted: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListEntriesParams {
    #[schemars(description = "Maximum entries to return. Defaults to the configured limit.")]
    pub limit: Option<usize>,

    #[schemars(description = "true: personal entries only; false: project entries only")]
    pub personal: Option<bool>,

    #[schemars(description = "List soft-deleted entries instead of live ones. Defaults to false.")]
    pub deleted: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UpdateEntryParams {
    #[schemars(description = "Entry id")]
    pub id: i64,

    #[schemars(description = "Replacement content")]
    pub content: Option<String>,

    #[schemars(description = "Replacement entry type")]
    pub entry_type: Option<String>,

    #[schemars(description = "Replacement personal flag")]
    pub is_personal: Option<bool>,

    #[schemars(description = "Replacement tag set. Omit to leave tags unchanged.")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct DeleteEntryParams {
    #[schemars(description = "Entry id")]
    pub id: i64,

    #[schemars(
        description = "Permanently remove the entry, its tag links, and its relationships. Defaults to false (soft delete)."
    )]
    pub permanent: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RestoreEntryParams {
    #[schemars(description = "Id of a soft-deleted entry to bring back")]
    pub id: i64,
}
