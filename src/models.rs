//! Core data models used throughout the explorer.
//!
//! Serialized field names (`date`, `num`, `accumulate_edits`, `decision`,
//! `user`) are the wire contract with the visualization front-end and must
//! not be renamed.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Number of edits recorded on one calendar day for a logging table.
///
/// Days with zero edits are simply absent; nothing zero-fills the gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditDayCount {
    pub date: NaiveDate,
    pub num: i64,
}

/// Running total of edits up to and including `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativeEditPoint {
    pub date: NaiveDate,
    pub accumulate_edits: i64,
}

/// Number of logged events carrying one editor decision value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCount {
    pub decision: String,
    pub num: i64,
}

/// Number of logged events attributed to one user, for the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user: String,
    pub num: i64,
}

/// Request body of `POST /advancedsearch`.
///
/// `items` is the raw comma-separated entity-id text exactly as typed in
/// the search box; parsing and validation happen in [`crate::query`].
#[derive(Debug, Clone, Deserialize)]
pub struct SearchFilter {
    pub dsname: String,
    pub epoch: String,
    #[serde(default)]
    pub items: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// One row of a `{dataset}_{epoch}_logging` table.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub changetime: NaiveDateTime,
    pub decision: String,
    pub user: String,
}
