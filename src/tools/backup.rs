use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExportBackupParams {
    #[schemars(description = "Optional label folded into the snapshot filename")]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListBackupsParams {}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct RestoreBackupParams {
    #[schemars(
        description = "Snapshot filename from list_backups. A bare filename; paths are rejected."
    )]
    pub filename: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PruneBackupsParams {
    #[schemars(description = "How many newest snapshots to keep. Defaults to the configured retention.")]
    pub keep: Option<usize>,
}
