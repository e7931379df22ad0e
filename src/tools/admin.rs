use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReindexParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct HealthParams {}
