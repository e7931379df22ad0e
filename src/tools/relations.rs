use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LinkEntriesParams {
    #[schemars(description = "Source entry id")]
    pub from_id: i64,

    #[schemars(description = "Target entry id")]
    pub to_id: i64,

    #[schemars(
        description = "Relationship type: 'references', 'implements', 'clarifies', or the causal types 'blocked_by', 'resolved', 'caused'"
    )]
    pub relation_type: String,

    #[schemars(description = "Optional note explaining the link")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RelationshipsParams {
    #[schemars(description = "Entry whose inbound and outbound links to list")]
    pub entry_id: i64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct GraphParams {
    #[schemars(description = "Entry at the center of the neighborhood")]
    pub entry_id: i64,

    #[schemars(description = "How many hops to traverse. Defaults to 2.")]
    pub depth: Option<usize>,
}
