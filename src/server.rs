//! HTTP API for the dataset explorer.
//!
//! Exposes the read-only dataset endpoints consumed by the visualization
//! front-end. All responses are JSON; errors carry a human-readable
//! `message` field and nothing else, which is what the front-end keys off.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `GET`  | `/dslist` | List dataset names |
//! | `GET`  | `/ds/{dsname}` | Row dump of the newest epoch |
//! | `GET`  | `/ds/{dsname}/{epoch}` | Row dump of one epoch |
//! | `GET`  | `/dsepoch/{dsname}` | Epoch list, newest first |
//! | `GET`  | `/dsstats/{dsname}?epoch=` | Latest stats row for an epoch |
//! | `GET`  | `/gamelogs/accumulateedits/{dsname}/{epoch}` | Cumulative edits per day |
//! | `GET`  | `/gamelogs/decisions/{dsname}/{epoch}` | Edit counts per decision |
//! | `GET`  | `/dsleaderboard/{dsname}?epoch=` | Edit counts per user, descending |
//! | `POST` | `/advancedsearch` | Filtered search over a missing-value dataset |
//!
//! # Error Contract
//!
//! ```json
//! { "message": "No record for this dataset!" }
//! ```
//!
//! Statuses: `404` (unknown dataset, invalid epoch), `400` (invalid search
//! items), `501` (recognized but unimplemented search route), `503` (store
//! unreachable). Store failures are terminal for the request; nothing is
//! retried.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted — the API is read-only
//! and consumed straight from browsers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregate::accumulate_edits;
use crate::config::Config;
use crate::db;
use crate::epochs::EpochResolver;
use crate::models::{CumulativeEditPoint, DecisionCount, LeaderboardEntry, SearchFilter};
use crate::query::SearchQuery;
use crate::store::mysql::MySqlStore;
use crate::store::{DatasetStore, Row};

const NO_RECORD: &str = "No record for this dataset!";
const INVALID_EPOCH: &str = "Invalid epoch!";
const DB_UNREACHABLE: &str = "Database unreachable. Please try again later.";

/// Shared application state passed to all route handlers via Axum's
/// `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DatasetStore>,
    pub epochs: Arc<EpochResolver>,
}

/// Starts the HTTP server.
///
/// Connects the MySQL pool, builds the epoch cache from the registered
/// dataset list, and serves on `[server].bind` until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let state = AppState {
        store: Arc::new(MySqlStore::new(pool, config.store.metadata_schema.clone())),
        epochs: Arc::new(EpochResolver::new(&config.datasets.registered)),
    };

    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "dataset explorer listening");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Builds the router over any [`DatasetStore`]; separated from
/// [`run_server`] so tests can drive it in-process.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/dslist", get(handle_dataset_list))
        .route("/ds/{dsname}", get(handle_dump))
        .route("/ds/{dsname}/{epoch}", get(handle_dump_with_epoch))
        .route("/dsepoch/{dsname}", get(handle_epoch_list))
        .route("/dsstats/{dsname}", get(handle_stats))
        .route(
            "/gamelogs/accumulateedits/{dsname}/{epoch}",
            get(handle_accumulate_edits),
        )
        .route("/gamelogs/decisions/{dsname}/{epoch}", get(handle_decisions))
        .route("/dsleaderboard/{dsname}", get(handle_leaderboard))
        .route("/advancedsearch", post(handle_advanced_search))
        .layer(cors)
        .with_state(state)
}

// ============ Error response ============

/// JSON error body; `message` is the whole contract.
#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        message: message.into(),
    }
}

fn not_implemented(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_IMPLEMENTED,
        message: message.into(),
    }
}

/// Maps a store failure to the 503 contract, logging the cause. The
/// message deliberately says nothing about the query that failed.
fn store_unreachable(error: anyhow::Error) -> AppError {
    tracing::error!(%error, "store query failed");
    AppError {
        status: StatusCode::SERVICE_UNAVAILABLE,
        message: DB_UNREACHABLE.to_string(),
    }
}

// ============ Epoch selection ============

/// Resolves the epoch list for a dataset; an empty resolution (unknown
/// dataset, no epochs yet, or store outage) is the 404 "no record" case.
async fn resolved_epochs(state: &AppState, dsname: &str) -> Result<Vec<String>, AppError> {
    let epochs = state.epochs.resolve(state.store.as_ref(), dsname).await;
    if epochs.is_empty() {
        return Err(not_found(NO_RECORD));
    }
    Ok(epochs)
}

/// Picks the requested epoch after membership validation, or defaults to
/// the newest one. `invalid_message` differs per route (the front-end
/// shows it verbatim).
fn pick_epoch(
    epochs: &[String],
    requested: Option<&str>,
    invalid_message: &str,
) -> Result<String, AppError> {
    match requested {
        Some(epoch) => {
            if epochs.iter().any(|e| e == epoch) {
                Ok(epoch.to_string())
            } else {
                Err(not_found(invalid_message))
            }
        }
        None => Ok(epochs[0].clone()),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /dslist ============

async fn handle_dataset_list(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let names = state
        .store
        .dataset_names()
        .await
        .map_err(store_unreachable)?;
    Ok(Json(names))
}

// ============ GET /ds/{dsname}[/{epoch}] ============

async fn handle_dump(
    State(state): State<AppState>,
    Path(dsname): Path<String>,
) -> Result<Json<Vec<Row>>, AppError> {
    dump_rows(&state, &dsname, None).await
}

async fn handle_dump_with_epoch(
    State(state): State<AppState>,
    Path((dsname, epoch)): Path<(String, String)>,
) -> Result<Json<Vec<Row>>, AppError> {
    dump_rows(&state, &dsname, Some(epoch)).await
}

async fn dump_rows(
    state: &AppState,
    dsname: &str,
    epoch: Option<String>,
) -> Result<Json<Vec<Row>>, AppError> {
    let epochs = resolved_epochs(state, dsname).await?;
    // An explicitly requested epoch that is not in the resolved list reads
    // as a dataset that does not exist, same as the empty resolution.
    let epoch = pick_epoch(&epochs, epoch.as_deref(), NO_RECORD)?;

    let rows = state
        .store
        .dump_rows(dsname, &epoch)
        .await
        .map_err(store_unreachable)?;
    Ok(Json(rows))
}

// ============ GET /dsepoch/{dsname} ============

async fn handle_epoch_list(
    State(state): State<AppState>,
    Path(dsname): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let epochs = resolved_epochs(&state, &dsname).await?;
    Ok(Json(epochs))
}

// ============ GET /dsstats/{dsname}?epoch= ============

#[derive(Deserialize)]
struct EpochParam {
    epoch: Option<String>,
}

async fn handle_stats(
    State(state): State<AppState>,
    Path(dsname): Path<String>,
    Query(params): Query<EpochParam>,
) -> Result<Json<Vec<Row>>, AppError> {
    let epochs = resolved_epochs(&state, &dsname).await?;
    let epoch = pick_epoch(&epochs, params.epoch.as_deref(), INVALID_EPOCH)?;

    let rows = state
        .store
        .latest_stats(&dsname, &epoch)
        .await
        .map_err(store_unreachable)?;
    Ok(Json(rows))
}

// ============ GET /gamelogs/accumulateedits/{dsname}/{epoch} ============

async fn handle_accumulate_edits(
    State(state): State<AppState>,
    Path((dsname, epoch)): Path<(String, String)>,
) -> Result<Json<Vec<CumulativeEditPoint>>, AppError> {
    let epochs = resolved_epochs(&state, &dsname).await?;
    let epoch = pick_epoch(&epochs, Some(&epoch), INVALID_EPOCH)?;

    let day_counts = state
        .store
        .edits_by_day(&dsname, &epoch)
        .await
        .map_err(store_unreachable)?;
    Ok(Json(accumulate_edits(day_counts)))
}

// ============ GET /gamelogs/decisions/{dsname}/{epoch} ============

async fn handle_decisions(
    State(state): State<AppState>,
    Path((dsname, epoch)): Path<(String, String)>,
) -> Result<Json<Vec<DecisionCount>>, AppError> {
    let epochs = resolved_epochs(&state, &dsname).await?;
    let epoch = pick_epoch(&epochs, Some(&epoch), INVALID_EPOCH)?;

    let counts = state
        .store
        .decision_counts(&dsname, &epoch)
        .await
        .map_err(store_unreachable)?;
    Ok(Json(counts))
}

// ============ GET /dsleaderboard/{dsname}?epoch= ============

async fn handle_leaderboard(
    State(state): State<AppState>,
    Path(dsname): Path<String>,
    Query(params): Query<EpochParam>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let epochs = resolved_epochs(&state, &dsname).await?;
    let epoch = pick_epoch(&epochs, params.epoch.as_deref(), INVALID_EPOCH)?;

    let entries = state
        .store
        .leaderboard(&dsname, &epoch)
        .await
        .map_err(store_unreachable)?;
    Ok(Json(entries))
}

// ============ POST /advancedsearch ============

/// Routes the search by dataset family: `missing*` datasets get the
/// filtered query; `catfacts` is recognized but has no search yet.
async fn handle_advanced_search(
    State(state): State<AppState>,
    Json(filter): Json<SearchFilter>,
) -> Result<Json<Vec<Row>>, AppError> {
    if filter.dsname.contains("missing") {
        let epochs = state.epochs.resolve(state.store.as_ref(), &filter.dsname).await;
        if !epochs.iter().any(|e| e == &filter.epoch) {
            return Err(not_found(NO_RECORD));
        }

        let query = SearchQuery::build(&filter).map_err(|error| bad_request(error.to_string()))?;
        let rows = state
            .store
            .search_rows(&query)
            .await
            .map_err(store_unreachable)?;
        Ok(Json(rows))
    } else if filter.dsname.contains("catfacts") {
        Err(not_implemented(
            "Advanced search is not implemented for this dataset.",
        ))
    } else {
        Err(not_found(NO_RECORD))
    }
}
