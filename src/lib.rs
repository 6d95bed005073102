//! # Workflow Index
//!
//! A local-first catalog for large corpora of workflow-definition
//! documents. Each document is analyzed into a metadata record (trigger
//! type, complexity, integrations), stored in SQLite with an FTS5 shadow,
//! and served through filtered search, analytics and similarity ranking.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────────┐
//! │  Corpus  │──▶│ Analyzer │──▶│ Pipeline │──▶│    SQLite    │
//! │  *.json  │   │  (pure)  │   │ (digest) │   │ records+FTS5 │
//! └──────────┘   └──────────┘   └──────────┘   └──────┬───────┘
//!                                                     │
//!                        ┌────────────────┬───────────┤
//!                        ▼                ▼           ▼
//!                   ┌─────────┐    ┌───────────┐ ┌──────────┐
//!                   │  Query  │    │ Analytics │ │ Similar  │
//!                   └─────────┘    └───────────┘ └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! wfx init                          # create database
//! wfx reindex                       # index changed documents
//! wfx search "telegram webhook" --trigger Webhook
//! wfx similar 0001_telegram_bot.json --threshold 0.6
//! wfx stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`analyze`] | Document analysis |
//! | [`store`] | Index store trait and SQLite backend |
//! | [`ingest`] | Incremental indexing pipeline |
//! | [`search`] | Query engine |
//! | [`stats`] | Analytics with a memoized snapshot |
//! | [`similar`] | Similarity ranking |
//! | [`catalog`] | Request/response facade over all of the above |
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |

pub mod analyze;
pub mod cache;
pub mod catalog;
pub mod categories;
pub mod config;
pub mod corpus;
pub mod db;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod search;
pub mod similar;
pub mod stats;
pub mod store;

pub use catalog::Catalog;
pub use error::{IndexError, Result};
