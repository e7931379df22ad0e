use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatisticsParams {
    #[schemars(description = "Period grouping: 'day', 'week', or 'month'. Defaults to 'week'.")]
    pub group_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct EntryImportanceParams {
    #[schemars(description = "Entry to score")]
    pub entry_id: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ImportantEntriesParams {
    #[schemars(description = "How many top-scored entries to return. Defaults to 10.")]
    pub limit: Option<usize>,
}
