//! In-memory [`DatasetStore`] implementation for tests.
//!
//! Backs every trait method with `HashMap`s behind `std::sync::RwLock`
//! and computes the grouping/ordering in Rust, mirroring the SQL each
//! method stands in for. Lookups against unseeded datasets or epochs
//! error the same way a missing table does on the real store.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::{DecisionCount, EditDayCount, LeaderboardEntry, LogEvent};
use crate::query::SearchQuery;

use super::{DatasetStore, Row};

/// In-memory dataset store, seeded through the `add_*` helpers.
#[derive(Default)]
pub struct MemoryStore {
    datasets: RwLock<Vec<String>>,
    epochs: RwLock<HashMap<String, Vec<String>>>,
    rows: RwLock<HashMap<(String, String), Vec<Row>>>,
    stats: RwLock<HashMap<String, Vec<Row>>>,
    log_events: RwLock<HashMap<(String, String), Vec<LogEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dataset with its epoch list, newest first.
    pub fn add_dataset(&self, name: &str, epochs: &[&str]) {
        self.datasets.write().unwrap().push(name.to_string());
        self.epochs
            .write()
            .unwrap()
            .insert(name.to_string(), epochs.iter().map(|e| e.to_string()).collect());
    }

    /// Seeds the `{dataset}_{epoch}` table.
    pub fn add_rows(&self, dataset: &str, epoch: &str, rows: Vec<Row>) {
        self.rows
            .write()
            .unwrap()
            .entry((dataset.to_string(), epoch.to_string()))
            .or_default()
            .extend(rows);
    }

    /// Seeds one row of the dataset's `updatecount_stats` table. The row
    /// should carry `epoch` and `addedtime` fields like the real table.
    pub fn add_stats_row(&self, dataset: &str, row: Row) {
        self.stats
            .write()
            .unwrap()
            .entry(dataset.to_string())
            .or_default()
            .push(row);
    }

    /// Seeds one event of the `{dataset}_{epoch}_logging` table.
    pub fn add_log_event(&self, dataset: &str, epoch: &str, event: LogEvent) {
        self.log_events
            .write()
            .unwrap()
            .entry((dataset.to_string(), epoch.to_string()))
            .or_default()
            .push(event);
    }

    fn events_for(&self, dataset: &str, epoch: &str) -> Result<Vec<LogEvent>> {
        let events = self.log_events.read().unwrap();
        match events.get(&(dataset.to_string(), epoch.to_string())) {
            Some(events) => Ok(events.clone()),
            None => bail!("table '{}_{}_logging' doesn't exist", dataset, epoch),
        }
    }
}

#[async_trait]
impl DatasetStore for MemoryStore {
    async fn dataset_names(&self) -> Result<Vec<String>> {
        Ok(self.datasets.read().unwrap().clone())
    }

    async fn epoch_list(&self, dataset: &str) -> Result<Vec<String>> {
        let epochs = self.epochs.read().unwrap();
        match epochs.get(dataset) {
            Some(epochs) => Ok(epochs.clone()),
            None => bail!("table '{}epoch' doesn't exist", dataset),
        }
    }

    async fn dump_rows(&self, dataset: &str, epoch: &str) -> Result<Vec<Row>> {
        let rows = self.rows.read().unwrap();
        match rows.get(&(dataset.to_string(), epoch.to_string())) {
            Some(rows) => Ok(rows.clone()),
            None => bail!("table '{}_{}' doesn't exist", dataset, epoch),
        }
    }

    async fn latest_stats(&self, dataset: &str, epoch: &str) -> Result<Vec<Row>> {
        let stats = self.stats.read().unwrap();
        let Some(rows) = stats.get(dataset) else {
            bail!("table '{}.updatecount_stats' doesn't exist", dataset);
        };

        let mut matching: Vec<Row> = rows
            .iter()
            .filter(|row| row.get("epoch").and_then(|e| e.as_str()) == Some(epoch))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            let added = |row: &Row| {
                row.get("addedtime")
                    .and_then(|t| t.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            added(b).cmp(&added(a))
        });
        matching.truncate(1);
        Ok(matching)
    }

    async fn edits_by_day(&self, dataset: &str, epoch: &str) -> Result<Vec<EditDayCount>> {
        let mut by_day: BTreeMap<chrono::NaiveDate, i64> = BTreeMap::new();
        for event in self.events_for(dataset, epoch)? {
            *by_day.entry(event.changetime.date()).or_insert(0) += 1;
        }
        Ok(by_day
            .into_iter()
            .map(|(date, num)| EditDayCount { date, num })
            .collect())
    }

    async fn decision_counts(&self, dataset: &str, epoch: &str) -> Result<Vec<DecisionCount>> {
        let mut by_decision: BTreeMap<String, i64> = BTreeMap::new();
        for event in self.events_for(dataset, epoch)? {
            *by_decision.entry(event.decision).or_insert(0) += 1;
        }
        Ok(by_decision
            .into_iter()
            .map(|(decision, num)| DecisionCount { decision, num })
            .collect())
    }

    async fn leaderboard(&self, dataset: &str, epoch: &str) -> Result<Vec<LeaderboardEntry>> {
        let mut by_user: BTreeMap<String, i64> = BTreeMap::new();
        for event in self.events_for(dataset, epoch)? {
            *by_user.entry(event.user).or_insert(0) += 1;
        }
        let mut entries: Vec<LeaderboardEntry> = by_user
            .into_iter()
            .map(|(user, num)| LeaderboardEntry { user, num })
            .collect();
        entries.sort_by(|a, b| b.num.cmp(&a.num).then(a.user.cmp(&b.user)));
        Ok(entries)
    }

    async fn search_rows(&self, query: &SearchQuery) -> Result<Vec<Row>> {
        let rows = self.dump_rows(&query.dataset, &query.epoch).await?;

        Ok(rows
            .into_iter()
            .filter(|row| {
                if !query.items.is_empty() {
                    let q_number = row.get("qNumber").and_then(|q| q.as_str());
                    if !q_number.is_some_and(|q| query.items.iter().any(|item| item == q)) {
                        return false;
                    }
                }
                if !query.languages.is_empty() {
                    let languages = row
                        .get("languages")
                        .and_then(|l| l.as_str())
                        .unwrap_or_default();
                    if !query.languages.iter().any(|lang| languages.contains(lang.as_str())) {
                        return false;
                    }
                }
                true
            })
            .collect())
    }
}
