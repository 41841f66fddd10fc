//! Storage abstraction for the explorer.
//!
//! The [`DatasetStore`] trait covers every read the HTTP surface performs
//! against the relational store, enabling pluggable backends (MySQL in
//! production, in-memory for tests).
//!
//! Implementations must be `Send + Sync` to be shared across request
//! handlers. No method retries: a failure is reported to the one request
//! that triggered it.

pub mod memory;
pub mod mysql;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DecisionCount, EditDayCount, LeaderboardEntry};
use crate::query::SearchQuery;

/// One result row of a dynamic (`SELECT *`) query, keyed by column name.
pub type Row = serde_json::Value;

/// Read-only view over the epoch-versioned dataset store.
///
/// Schema convention: one schema per dataset, tables `{dataset}_{epoch}`
/// and `{dataset}_{epoch}_logging`, a per-schema `updatecount_stats`
/// table, and a metadata schema holding `datasetname` plus one
/// `{dataset}epoch` table per dataset.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`dataset_names`](DatasetStore::dataset_names) | Names of all known datasets |
/// | [`epoch_list`](DatasetStore::epoch_list) | Epochs of one dataset, newest first |
/// | [`dump_rows`](DatasetStore::dump_rows) | Full row dump of one dataset epoch |
/// | [`latest_stats`](DatasetStore::latest_stats) | Most recent stats row for one epoch |
/// | [`edits_by_day`](DatasetStore::edits_by_day) | Edit counts grouped by calendar day |
/// | [`decision_counts`](DatasetStore::decision_counts) | Event counts grouped by decision |
/// | [`leaderboard`](DatasetStore::leaderboard) | Event counts grouped by user, descending |
/// | [`search_rows`](DatasetStore::search_rows) | Filtered scan built by the query module |
#[async_trait]
pub trait DatasetStore: Send + Sync {
    /// Names of all datasets listed in the metadata schema.
    async fn dataset_names(&self) -> Result<Vec<String>>;

    /// Epoch identifiers for `dataset`, ordered descending (newest first).
    async fn epoch_list(&self, dataset: &str) -> Result<Vec<String>>;

    /// Every row of the `{dataset}_{epoch}` table.
    async fn dump_rows(&self, dataset: &str, epoch: &str) -> Result<Vec<Row>>;

    /// The most recently added stats row for `epoch`, if any
    /// (at most one element).
    async fn latest_stats(&self, dataset: &str, epoch: &str) -> Result<Vec<Row>>;

    /// Per-day edit counts from the `{dataset}_{epoch}_logging` table,
    /// ordered by day ascending.
    async fn edits_by_day(&self, dataset: &str, epoch: &str) -> Result<Vec<EditDayCount>>;

    /// Logged-event counts grouped by editor decision.
    async fn decision_counts(&self, dataset: &str, epoch: &str) -> Result<Vec<DecisionCount>>;

    /// Logged-event counts grouped by user, most active first.
    async fn leaderboard(&self, dataset: &str, epoch: &str) -> Result<Vec<LeaderboardEntry>>;

    /// Rows of `{dataset}_{epoch}` matching the built search query.
    async fn search_rows(&self, query: &SearchQuery) -> Result<Vec<Row>>;
}
