use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListTagsParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MergeTagsParams {
    #[schemars(description = "Tag to merge away. Deleted afterwards.")]
    pub source: String,

    #[schemars(description = "Tag that absorbs the source's entries. Created if missing.")]
    pub target: String,
}
