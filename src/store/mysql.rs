//! MySQL-backed [`DatasetStore`] implementation.
//!
//! Maps each store operation onto one schema-qualified statement. Table
//! references are composed only through the identifier allow-list in
//! [`crate::query`]; everything value-positioned (epoch filters, entity
//! ids, language patterns) is a bound parameter.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::mysql::MySqlRow;
use sqlx::{Column, MySqlPool, Row as SqlxRow, TypeInfo, ValueRef};

use crate::models::{DecisionCount, EditDayCount, LeaderboardEntry};
use crate::query::{schema_table_ref, table_ref, SearchQuery};

use super::{DatasetStore, Row};

/// MySQL implementation of [`DatasetStore`].
///
/// Wraps a [`MySqlPool`] plus the name of the metadata schema (the
/// `datasetname` and `{dataset}epoch` tables live there; everything else
/// is looked up in the per-dataset schemas).
pub struct MySqlStore {
    pool: MySqlPool,
    metadata_schema: String,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, metadata_schema: impl Into<String>) -> Self {
        Self {
            pool,
            metadata_schema: metadata_schema.into(),
        }
    }
}

#[async_trait]
impl DatasetStore for MySqlStore {
    async fn dataset_names(&self) -> Result<Vec<String>> {
        let table = schema_table_ref(&self.metadata_schema, "datasetname")?;
        let rows = sqlx::query(&format!("SELECT `name` FROM {}", table))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("name")).collect())
    }

    async fn epoch_list(&self, dataset: &str) -> Result<Vec<String>> {
        let table = schema_table_ref(&self.metadata_schema, &format!("{}epoch", dataset))?;
        let rows = sqlx::query(&format!(
            "SELECT `epoch` FROM {} ORDER BY `epoch` DESC",
            table
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(|row| row.get("epoch")).collect())
    }

    async fn dump_rows(&self, dataset: &str, epoch: &str) -> Result<Vec<Row>> {
        let table = table_ref(dataset, epoch, None)?;
        let rows = sqlx::query(&format!("SELECT * FROM {}", table))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn latest_stats(&self, dataset: &str, epoch: &str) -> Result<Vec<Row>> {
        let table = schema_table_ref(dataset, "updatecount_stats")?;
        let rows = sqlx::query(&format!(
            "SELECT * FROM {} WHERE `epoch` = ? ORDER BY `addedtime` DESC LIMIT 1",
            table
        ))
        .bind(epoch)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn edits_by_day(&self, dataset: &str, epoch: &str) -> Result<Vec<EditDayCount>> {
        let table = table_ref(dataset, epoch, Some("logging"))?;
        let rows = sqlx::query(&format!(
            "SELECT DATE(`changetime`) AS day, COUNT(*) AS num FROM {} GROUP BY day ORDER BY day ASC",
            table
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| EditDayCount {
                date: row.get("day"),
                num: row.get("num"),
            })
            .collect())
    }

    async fn decision_counts(&self, dataset: &str, epoch: &str) -> Result<Vec<DecisionCount>> {
        let table = table_ref(dataset, epoch, Some("logging"))?;
        let rows = sqlx::query(&format!(
            "SELECT `decision`, COUNT(*) AS num FROM {} GROUP BY `decision`",
            table
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DecisionCount {
                decision: row.get("decision"),
                num: row.get("num"),
            })
            .collect())
    }

    async fn leaderboard(&self, dataset: &str, epoch: &str) -> Result<Vec<LeaderboardEntry>> {
        let table = table_ref(dataset, epoch, Some("logging"))?;
        let rows = sqlx::query(&format!(
            "SELECT `user`, COUNT(*) AS num FROM {} GROUP BY `user` ORDER BY num DESC",
            table
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| LeaderboardEntry {
                user: row.get("user"),
                num: row.get("num"),
            })
            .collect())
    }

    async fn search_rows(&self, query: &SearchQuery) -> Result<Vec<Row>> {
        let table = table_ref(&query.dataset, &query.epoch, None)?;

        let mut clauses: Vec<String> = Vec::new();
        if !query.items.is_empty() {
            let placeholders = vec!["?"; query.items.len()].join(", ");
            clauses.push(format!("`qNumber` IN ({})", placeholders));
        }
        if !query.languages.is_empty() {
            let likes = vec!["`languages` LIKE ?"; query.languages.len()].join(" OR ");
            clauses.push(format!("({})", likes));
        }

        let mut sql = format!("SELECT * FROM {}", table);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut stmt = sqlx::query(&sql);
        for item in &query.items {
            stmt = stmt.bind(item);
        }
        for lang in &query.languages {
            stmt = stmt.bind(format!("%{}%", lang));
        }

        let rows = stmt.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }
}

/// Converts a dynamic (`SELECT *`) result row into a JSON object keyed by
/// column name. Columns whose type has no JSON mapping decode to null
/// rather than failing the whole dump.
fn row_to_json(row: &MySqlRow) -> Row {
    let mut object = serde_json::Map::new();
    for column in row.columns() {
        let idx = column.ordinal();
        let value = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => Value::Null,
            Ok(raw) => {
                let type_name = raw.type_info().name().to_string();
                decode_column(row, idx, &type_name)
            }
            Err(_) => Value::Null,
        };
        object.insert(column.name().to_string(), value);
    }
    Value::Object(object)
}

fn decode_column(row: &MySqlRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOLEAN" => row
            .try_get::<bool, _>(idx)
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => row
            .try_get::<i64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<u64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "FLOAT" | "DOUBLE" => row
            .try_get::<f64, _>(idx)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<NaiveDate, _>(idx)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(Value::Null),
        "TIME" => row
            .try_get::<NaiveTime, _>(idx)
            .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(idx)
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(idx)
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null),
        // VARCHAR, CHAR, TEXT, ENUM and friends.
        _ => row
            .try_get::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
