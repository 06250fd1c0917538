// GET handlers: averages over all history, averages over a window, version

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::models::HostAverages;
use crate::query::TimeWindow;
use crate::version::{NAME, VERSION};

#[derive(Debug, Deserialize)]
pub(super) struct AveragesParams {
    /// Optional comma-separated host filter, e.g. `?hosts=web1,db1`.
    hosts: Option<String>,
}

impl AveragesParams {
    fn host_filter(&self) -> Option<Vec<String>> {
        let hosts: Vec<String> = self
            .hosts
            .as_deref()?
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(String::from)
            .collect();
        if hosts.is_empty() { None } else { Some(hosts) }
    }
}

/// GET / — average metrics per host over all history.
pub(super) async fn all_time_averages(
    State(state): State<AppState>,
    Query(params): Query<AveragesParams>,
) -> Result<Json<BTreeMap<String, HostAverages>>, ApiError> {
    let hosts = params.host_filter();
    let stats = state.engine.averages(None, hosts.as_deref()).await?;
    Ok(Json(stats))
}

/// GET /limit/{token} — average metrics per host over the window the token
/// describes; 422 on a malformed token.
pub(super) async fn windowed_averages(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(params): Query<AveragesParams>,
) -> Result<Json<BTreeMap<String, HostAverages>>, ApiError> {
    let window: TimeWindow = token.parse()?;
    let hosts = params.host_filter();
    let stats = state.engine.averages(Some(window), hosts.as_deref()).await?;
    Ok(Json(stats))
}

/// GET /version — service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}
