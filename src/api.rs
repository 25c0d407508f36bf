//! # HTTP API
//! Thin axum surface over the ranking engine, consumed by the map front-end.
//!
//! Error mapping: `InvalidComparison` -> 400, `UnknownListing` -> 404,
//! `Persistence` -> 502 (retryable). An empty candidate set is a 200 with a
//! JSON `null` body, never an error status.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::engine::RankingEngine;
use crate::error::RankingError;
use crate::ledger::{ComparisonRecord, Winner};
use crate::listing::Listing;
use crate::rank::RankingEntry;
use crate::sampler::PairRequest;

/// Rows returned by the heatmap metrics endpoint are capped to keep the
/// payload map-friendly.
const METRICS_ROW_CAP: usize = 2000;

const DEFAULT_BIN_COUNT: usize = 10;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RankingEngine>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/comparisons", post(submit_comparison))
        .route("/api/comparisons/pair", get(next_pair))
        .route("/api/comparisons/recent", get(recent_comparisons))
        .route("/api/rankings/distribution", get(distribution))
        .route("/api/rankings/insights", get(insights))
        .route("/api/rankings/top", get(top_rankings))
        .route("/api/listings/metrics", get(listing_metrics))
        .route("/api/admin/listings", post(seed_listings))
        .route("/api/admin/reset", post(reset))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// `RankingError` as an HTTP response with a JSON error body.
struct ApiError(RankingError);

impl From<RankingError> for ApiError {
    fn from(e: RankingError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RankingError::InvalidComparison(_) => StatusCode::BAD_REQUEST,
            RankingError::UnknownListing(_) => StatusCode::NOT_FOUND,
            RankingError::Persistence(_) => StatusCode::BAD_GATEWAY,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Deserialize)]
struct SubmitReq {
    listing_a_id: u64,
    listing_b_id: u64,
    winner: Winner,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Serialize)]
struct SubmitResp {
    record_id: u64,
    snapshot_version: u64,
}

async fn submit_comparison(
    State(state): State<AppState>,
    Json(body): Json<SubmitReq>,
) -> Result<impl IntoResponse, ApiError> {
    let user = body.user_id.as_deref().unwrap_or("anonymous");
    let receipt = state.engine.submit_comparison(
        body.listing_a_id,
        body.listing_b_id,
        body.winner,
        user,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(SubmitResp {
            record_id: receipt.record.id,
            snapshot_version: receipt.snapshot_version,
        }),
    ))
}

#[derive(Deserialize)]
struct PairQuery {
    #[serde(default)]
    anchor: Option<u64>,
    #[serde(default)]
    max_distance: Option<f64>,
    #[serde(default)]
    max_price_ratio: Option<f64>,
}

#[derive(Serialize)]
struct PairResp {
    a: Listing,
    b: Listing,
}

async fn next_pair(
    State(state): State<AppState>,
    Query(q): Query<PairQuery>,
) -> Result<Json<Option<PairResp>>, ApiError> {
    let request = PairRequest {
        anchor_listing_id: q.anchor,
        max_distance: q.max_distance,
        max_price_ratio: q.max_price_ratio,
    };
    let pair = state.engine.next_pair(&request)?;
    Ok(Json(pair.map(|(a, b)| PairResp { a, b })))
}

#[derive(Deserialize)]
struct LimitQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    20
}

async fn recent_comparisons(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<ComparisonRecord>> {
    Json(state.engine.recent_comparisons(q.limit))
}

#[derive(Deserialize)]
struct BinsQuery {
    #[serde(default = "default_bins")]
    bins: usize,
}

fn default_bins() -> usize {
    DEFAULT_BIN_COUNT
}

/// Shape consumed by the ranking dashboard histogram: parallel arrays of
/// bin lower bounds and counts.
#[derive(Serialize)]
struct DistributionResp {
    bins: Vec<f64>,
    counts: Vec<u64>,
}

async fn distribution(
    State(state): State<AppState>,
    Query(q): Query<BinsQuery>,
) -> Json<DistributionResp> {
    let hist = state.engine.distribution(q.bins);
    Json(DistributionResp {
        bins: hist.iter().map(|b| b.lower_bound).collect(),
        counts: hist.iter().map(|b| b.count).collect(),
    })
}

async fn insights(State(state): State<AppState>) -> Json<crate::insights::Insights> {
    Json(state.engine.insights())
}

async fn top_rankings(
    State(state): State<AppState>,
    Query(q): Query<LimitQuery>,
) -> Json<Vec<RankingEntry>> {
    Json(state.engine.top(q.limit))
}

#[derive(Serialize)]
struct MetricsRow {
    latitude: Option<f64>,
    longitude: Option<f64>,
    list_price: Option<f64>,
    sqft: Option<f64>,
}

/// Aggregated rows for the front-end heatmap layer.
async fn listing_metrics(State(state): State<AppState>) -> Json<Vec<MetricsRow>> {
    let rows = state
        .engine
        .listings()
        .into_iter()
        .take(METRICS_ROW_CAP)
        .map(|l| MetricsRow {
            latitude: l.latitude,
            longitude: l.longitude,
            list_price: l.list_price,
            sqft: l.sqft,
        })
        .collect();
    Json(rows)
}

#[derive(Serialize)]
struct SeedResp {
    loaded: usize,
    population: usize,
}

async fn seed_listings(
    State(state): State<AppState>,
    Json(listings): Json<Vec<Listing>>,
) -> impl IntoResponse {
    let loaded = state.engine.seed_listings(listings);
    Json(SeedResp {
        loaded,
        population: state.engine.population(),
    })
}

async fn reset(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state.engine.reset()?;
    Ok("reset")
}
