//! Local-first development journal with lexical and semantic search.
//!
//! Quill is an [MCP](https://modelcontextprotocol.io/) server that stores
//! journal entries (reflections, technical achievements, milestones, bug
//! fixes) in a single SQLite file, with an auto-managed tag vocabulary, a
//! typed relationship graph between entries, and an optional vector index
//! for semantic search.
//!
//! # Architecture
//!
//! - **Storage**: one SQLite file owning entries, tags, entry-tag links, and
//!   relationships; WAL mode, foreign keys on, single-writer
//! - **Semantic search**: [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   index in a separate file beside the journal, populated fire-and-forget
//!   so journaling never blocks on embedding availability
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Transport**: MCP over stdio (primary) or Streamable HTTP/SSE
//!
//! # Modules
//!
//! - [`config`] - Configuration loading from TOML files and environment variables
//! - [`db`] - SQLite initialization, schema, migrations, and health checks
//! - [`journal`] - Core engine: entries, tags, relationships, search, analytics
//! - [`vector`] - Lazily-initialized semantic index with graceful degradation
//! - [`backup`] - Snapshot export, retention pruning, and transactional restore
//! - [`embedding`] - Text-to-vector pipeline via ONNX Runtime
//! - [`tools`] - MCP tool surface
//! - [`server`] - Transport setup (stdio and streamable HTTP)

pub mod backup;
pub mod cli;
pub mod config;
pub mod db;
pub mod embedding;
pub mod journal;
pub mod server;
pub mod tools;
pub mod vector;
