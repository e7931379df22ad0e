//! MCP tool surface. Each tool validates its params, hands the real work to
//! the `journal`, `vector`, and `backup` modules inside `spawn_blocking`,
//! and returns a JSON payload.

pub mod admin;
pub mod analytics;
pub mod backup;
pub mod entries;
pub mod relations;
pub mod search;
pub mod tags;

use std::sync::{Arc, Mutex};

use rmcp::handler::server::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router, ServerHandler};
use rusqlite::Connection;
use serde::Serialize;

use admin::{HealthParams, ReindexParams};
use analytics::{EntryImportanceParams, ImportantEntriesParams, StatisticsParams};
use backup::{ExportBackupParams, ListBackupsParams, PruneBackupsParams, RestoreBackupParams};
use entries::{
    CreateEntryParams, DeleteEntryParams, GetEntryParams, ListEntriesParams, RestoreEntryParams,
    UpdateEntryParams,
};
use relations::{GraphParams, LinkEntriesParams, RelationshipsParams};
use search::{DateRangeParams, SearchParams, SemanticResult, SemanticSearchParams};
use tags::{ListTagsParams, MergeTagsParams};

use crate::config::QuillConfig;
use crate::journal;
use crate::journal::types::{GithubLink, GroupBy, RelationType};
use crate::vector::VectorManager;

/// The MCP tool handler: shared journal connection, semantic index, config.
#[derive(Clone)]
pub struct QuillTools {
    tool_router: ToolRouter<Self>,
    db: Arc<Mutex<Connection>>,
    vectors: Arc<VectorManager>,
    config: Arc<QuillConfig>,
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialization failed: {e}"))
}

#[tool_router]
impl QuillTools {
    pub fn new(
        db: Arc<Mutex<Connection>>,
        vectors: Arc<VectorManager>,
        config: Arc<QuillConfig>,
    ) -> Self {
        Self {
            tool_router: Self::tool_router(),
            db,
            vectors,
            config,
        }
    }

    /// Run a closure against the shared connection on a blocking thread.
    async fn with_db<T, F>(&self, f: F) -> Result<T, String>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| format!("db task failed: {e}"))?
        .map_err(|e| format!("{e:#}"))
    }

    /// Re-embed one entry off the request path. Failures are logged inside
    /// the manager and repaired by the next reindex.
    fn index_in_background(&self, entry_id: i64) {
        let db = Arc::clone(&self.db);
        let vectors = Arc::clone(&self.vectors);
        tokio::spawn(async move {
            let _ = tokio::task::spawn_blocking(move || {
                let text = {
                    let conn = db.lock().ok()?;
                    let entry = journal::entries::get_entry(&conn, entry_id).ok()??;
                    crate::vector::document_text(&conn, entry_id, &entry.content).ok()?
                };
                vectors.index_entry(entry_id, &text);
                Some(())
            })
            .await;
        });
    }

    fn remove_from_index(&self, entry_id: i64) {
        let vectors = Arc::clone(&self.vectors);
        tokio::spawn(async move {
            let _ = tokio::task::spawn_blocking(move || vectors.remove_entry(entry_id)).await;
        });
    }

    fn default_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.config.search.default_limit)
    }


    #[tool(description = "Create a journal entry. Tags are created on the fly; GitHub fields link the entry to an issue, PR, or workflow run.")]
    async fn create_entry(
        &self,
        Parameters(params): Parameters<CreateEntryParams>,
    ) -> Result<String, String> {
        let github = GithubLink {
            issue_number: params.issue_number,
            pr_number: params.pr_number,
            workflow_run_id: params.workflow_run_id,
            url: params.github_url,
            status: params.github_status,
        };
        let new = journal::entries::NewEntry {
            content: params.content,
            entry_type: params.entry_type,
            tags: params.tags.unwrap_or_default(),
            is_personal: params.is_personal.unwrap_or(false),
            significance: params.significance,
            github: if github.is_empty() { None } else { Some(github) },
            context: params.context,
        };

        let entry = self
            .with_db(move |conn| journal::entries::create_entry(conn, new))
            .await?;
        tracing::info!(id = entry.id, "entry created");
        self.index_in_background(entry.id);
        to_json(&entry)
    }

    #[tool(description = "Fetch one entry by id. Returns null for missing or soft-deleted entries unless include_deleted is set.")]
    async fn get_entry(
        &self,
        Parameters(params): Parameters<GetEntryParams>,
    ) -> Result<String, String> {
        let include_deleted = params.include_deleted.unwrap_or(false);
        let id = params.id;
        let entry = self
            .with_db(move |conn| {
                if include_deleted {
                    journal::entries::get_entry_any(conn, id)
                } else {
                    journal::entries::get_entry(conn, id)
                }
            })
            .await?;
        to_json(&entry)
    }

    #[tool(description = "List recent entries, newest first. Set deleted=true to list the soft-deleted ones instead.")]
    async fn list_entries(
        &self,
        Parameters(params): Parameters<ListEntriesParams>,
    ) -> Result<String, String> {
        let limit = self.default_limit(params.limit);
        let personal = params.personal;
        let deleted = params.deleted.unwrap_or(false);
        let entries = self
            .with_db(move |conn| {
                if deleted {
                    journal::entries::list_deleted(conn)
                } else {
                    journal::entries::list_recent(conn, limit, personal)
                }
            })
            .await?;
        to_json(&entries)
    }

    #[tool(description = "Update an entry's content, type, personal flag, or tag set. Omitted fields are left unchanged; a provided tag set replaces the old one.")]
    async fn update_entry(
        &self,
        Parameters(params): Parameters<UpdateEntryParams>,
    ) -> Result<String, String> {
        let id = params.id;
        let patch = journal::entries::UpdateEntry {
            content: params.content,
            entry_type: params.entry_type,
            is_personal: params.is_personal,
            tags: params.tags,
        };
        let entry = self
            .with_db(move |conn| journal::entries::update_entry(conn, id, patch))
            .await?;
        if entry.is_some() {
            self.index_in_background(id);
        }
        to_json(&entry)
    }

    #[tool(description = "Delete an entry. Soft by default (recoverable via restore_entry); permanent=true removes it for good along with its tag links and relationships.")]
    async fn delete_entry(
        &self,
        Parameters(params): Parameters<DeleteEntryParams>,
    ) -> Result<String, String> {
        let id = params.id;
        let permanent = params.permanent.unwrap_or(false);
        let deleted = self
            .with_db(move |conn| journal::entries::delete_entry(conn, id, permanent))
            .await?;
        if deleted {
            tracing::info!(id, permanent, "entry deleted");
            self.remove_from_index(id);
        }
        to_json(&serde_json::json!({ "deleted": deleted, "permanent": permanent }))
    }

    #[tool(description = "Bring back a soft-deleted entry. Returns null if the entry does not exist or is not deleted.")]
    async fn restore_entry(
        &self,
        Parameters(params): Parameters<RestoreEntryParams>,
    ) -> Result<String, String> {
        let id = params.id;
        let entry = self
            .with_db(move |conn| journal::entries::restore_entry(conn, id))
            .await?;
        if entry.is_some() {
            self.index_in_background(id);
        }
        to_json(&entry)
    }


    #[tool(description = "Keyword search over entry content with optional type, date, personal, and GitHub filters. Newest matches first.")]
    async fn search_entries(
        &self,
        Parameters(params): Parameters<SearchParams>,
    ) -> Result<String, String> {
        let limit = self.default_limit(params.limit);
        let query = params.query;
        let filters = journal::search::SearchFilters {
            personal: params.personal,
            entry_type: params.entry_type,
            date_from: params.date_from,
            date_to: params.date_to,
            issue_number: params.issue_number,
            pr_number: params.pr_number,
        };
        let results = self
            .with_db(move |conn| journal::search::search_entries(conn, &query, limit, &filters))
            .await?;
        to_json(&results)
    }

    #[tool(description = "List entries in an inclusive date range (YYYY-MM-DD), optionally filtered by type, tags, or personal/project.")]
    async fn search_by_date(
        &self,
        Parameters(params): Parameters<DateRangeParams>,
    ) -> Result<String, String> {
        let start = params.start_date;
        let end = params.end_date;
        let filters = journal::search::DateRangeFilters {
            entry_type: params.entry_type,
            tags: params.tags.unwrap_or_default(),
            personal: params.personal,
            project: params.project,
        };
        let results = self
            .with_db(move |conn| {
                journal::search::search_by_date_range(conn, &start, &end, &filters)
            })
            .await?;
        to_json(&results)
    }

    #[tool(description = "Search entries by meaning rather than keywords. Returns matches with similarity scores; empty when the semantic index is unavailable.")]
    async fn semantic_search(
        &self,
        Parameters(params): Parameters<SemanticSearchParams>,
    ) -> Result<String, String> {
        let limit = self.default_limit(params.limit);
        let query = params.query;
        let vectors = Arc::clone(&self.vectors);
        let db = Arc::clone(&self.db);

        let results = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<SemanticResult>> {
            let hits = vectors.search(&query, limit)?;
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            let mut results = Vec::with_capacity(hits.len());
            for hit in hits {
                // Entries deleted since indexing just drop out of the result.
                if let Some(entry) = journal::entries::get_entry(&conn, hit.entry_id)? {
                    results.push(SemanticResult {
                        similarity: hit.similarity,
                        entry,
                    });
                }
            }
            Ok(results)
        })
        .await
        .map_err(|e| format!("search task failed: {e}"))?
        .map_err(|e| format!("{e:#}"))?;

        to_json(&results)
    }


    #[tool(description = "Create a typed, directed link between two entries. Causal types (blocked_by, resolved, caused) feed importance scoring.")]
    async fn link_entries(
        &self,
        Parameters(params): Parameters<LinkEntriesParams>,
    ) -> Result<String, String> {
        let relation_type: RelationType = params.relation_type.parse()?;
        let from = params.from_id;
        let to = params.to_id;
        let description = params.description;
        let relationship = self
            .with_db(move |conn| {
                journal::relations::link_entries(conn, from, to, relation_type, description.as_deref())
            })
            .await?;
        to_json(&relationship)
    }

    #[tool(description = "List every relationship touching an entry, inbound and outbound.")]
    async fn get_relationships(
        &self,
        Parameters(params): Parameters<RelationshipsParams>,
    ) -> Result<String, String> {
        let entry_id = params.entry_id;
        let relationships = self
            .with_db(move |conn| journal::relations::relationships_for(conn, entry_id))
            .await?;
        to_json(&relationships)
    }

    #[tool(description = "Walk the relationship graph around an entry up to a depth, returning nodes with previews plus the connecting edges.")]
    async fn entry_graph(
        &self,
        Parameters(params): Parameters<GraphParams>,
    ) -> Result<String, String> {
        let entry_id = params.entry_id;
        let depth = params.depth.unwrap_or(2);
        let graph = self
            .with_db(move |conn| journal::relations::graph_neighborhood(conn, entry_id, depth))
            .await?;
        to_json(&graph)
    }


    #[tool(description = "List the tag vocabulary with usage counts, most used first.")]
    async fn list_tags(
        &self,
        Parameters(_params): Parameters<ListTagsParams>,
    ) -> Result<String, String> {
        let tags = self.with_db(|conn| journal::tags::list_tags(conn)).await?;
        to_json(&tags)
    }

    #[tool(description = "Merge one tag into another: the target absorbs the source's entries and the source is deleted. Useful for consolidating near-duplicates.")]
    async fn merge_tags(
        &self,
        Parameters(params): Parameters<MergeTagsParams>,
    ) -> Result<String, String> {
        let source = params.source;
        let target = params.target;
        let result = self
            .with_db(move |conn| journal::tags::merge_tags(conn, &source, &target))
            .await?;
        to_json(&result)
    }


    #[tool(description = "Journal statistics: totals by type, activity per day/week/month, decision density, relationship counts, growth.")]
    async fn journal_stats(
        &self,
        Parameters(params): Parameters<StatisticsParams>,
    ) -> Result<String, String> {
        let group_by: GroupBy = params.group_by.as_deref().unwrap_or("week").parse()?;
        let stats = self
            .with_db(move |conn| journal::analytics::get_statistics(conn, group_by))
            .await?;
        to_json(&stats)
    }

    #[tool(description = "Importance score for one entry, with the component breakdown. Null for missing or deleted entries.")]
    async fn entry_importance(
        &self,
        Parameters(params): Parameters<EntryImportanceParams>,
    ) -> Result<String, String> {
        let entry_id = params.entry_id;
        let score = self
            .with_db(move |conn| journal::analytics::importance_score(conn, entry_id))
            .await?;
        to_json(&score)
    }

    #[tool(description = "The most important entries by composite score: significance, connectivity, causal links, recency.")]
    async fn important_entries(
        &self,
        Parameters(params): Parameters<ImportantEntriesParams>,
    ) -> Result<String, String> {
        let limit = self.default_limit(params.limit);
        let ranked = self
            .with_db(move |conn| journal::analytics::rank_by_importance(conn, limit))
            .await?;
        to_json(&ranked)
    }


    #[tool(description = "Write a consistent snapshot of the journal to the backup directory.")]
    async fn export_backup(
        &self,
        Parameters(params): Parameters<ExportBackupParams>,
    ) -> Result<String, String> {
        let dir = self.config.resolved_backup_dir();
        let name = params.name;
        let info = self
            .with_db(move |conn| crate::backup::export_snapshot(conn, &dir, name.as_deref()))
            .await?;
        to_json(&info)
    }

    #[tool(description = "List available backup snapshots, newest first.")]
    async fn list_backups(
        &self,
        Parameters(_params): Parameters<ListBackupsParams>,
    ) -> Result<String, String> {
        let dir = self.config.resolved_backup_dir();
        let snapshots = tokio::task::spawn_blocking(move || crate::backup::list_snapshots(&dir))
            .await
            .map_err(|e| format!("backup task failed: {e}"))?
            .map_err(|e| format!("{e:#}"))?;
        to_json(&snapshots)
    }

    #[tool(description = "Replace the journal with a named snapshot. Takes a safety snapshot of the current state first. Run reindex_vectors afterwards.")]
    async fn restore_backup(
        &self,
        Parameters(params): Parameters<RestoreBackupParams>,
    ) -> Result<String, String> {
        let dir = self.config.resolved_backup_dir();
        let filename = params.filename;
        let report = self
            .with_db(move |conn| crate::backup::restore_snapshot(conn, &dir, &filename))
            .await?;
        tracing::info!(from = %report.restored_from, "restore complete");
        to_json(&report)
    }

    #[tool(description = "Delete old snapshots, keeping the newest N.")]
    async fn prune_backups(
        &self,
        Parameters(params): Parameters<PruneBackupsParams>,
    ) -> Result<String, String> {
        let dir = self.config.resolved_backup_dir();
        let keep = params.keep.unwrap_or(self.config.backup.retain);
        let removed = tokio::task::spawn_blocking(move || crate::backup::prune_snapshots(&dir, keep))
            .await
            .map_err(|e| format!("backup task failed: {e}"))?
            .map_err(|e| format!("{e:#}"))?;
        to_json(&serde_json::json!({ "removed": removed, "kept": keep }))
    }


    #[tool(description = "Rebuild the semantic index from the journal. Needed after a restore or an embedding model change.")]
    async fn reindex_vectors(
        &self,
        Parameters(_params): Parameters<ReindexParams>,
    ) -> Result<String, String> {
        let db = Arc::clone(&self.db);
        let vectors = Arc::clone(&self.vectors);
        let indexed = tokio::task::spawn_blocking(move || -> anyhow::Result<usize> {
            let conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            vectors.rebuild(&conn)
        })
        .await
        .map_err(|e| format!("reindex task failed: {e}"))?
        .map_err(|e| format!("{e:#}"))?;
        to_json(&serde_json::json!({ "indexed": indexed }))
    }

    #[tool(description = "Health report: integrity check, schema version, row counts, file size, semantic index status.")]
    async fn journal_health(
        &self,
        Parameters(_params): Parameters<HealthParams>,
    ) -> Result<String, String> {
        let db_path = self.config.resolved_db_path();
        let report = self
            .with_db(move |conn| crate::db::check_database_health(conn, Some(&db_path)))
            .await?;
        let vector_stats = self.vectors.stats();
        to_json(&serde_json::json!({
            "journal": report,
            "vector_index": vector_stats,
        }))
    }
}

#[tool_handler]
impl ServerHandler for QuillTools {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo {
            instructions: Some(
                "Quill is a development journal. Use create_entry to record work, \
                 search_entries / semantic_search to find past entries, link_entries \
                 to connect related work, and journal_stats for an overview."
                    .into(),
            ),
            capabilities: rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
            ..Default::default()
        }
    }
}
