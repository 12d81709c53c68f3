//! `GET /diagnostics/:provider` - live check of the image host.

use crate::{
    images::{DiagnosticsReport, ProviderKind},
    web::{AppState, error::ApiError},
};
use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Report for the active provider.
#[derive(Debug, Serialize)]
pub struct ActiveProvider {
    /// Always true
    pub active: bool,
    /// Round-trip result
    #[serde(flatten)]
    pub report: DiagnosticsReport,
}

/// Answer for a known provider that is not the one wired in.
#[derive(Debug, Serialize)]
pub struct InactiveProvider {
    /// Requested provider
    pub provider: ProviderKind,
    /// Always false
    pub active: bool,
    /// Provider actually in use
    pub active_provider: ProviderKind,
    /// Explanation
    pub message: String,
}

pub(crate) async fn diagnostics(
    State(state): State<AppState>,
    Path(provider): Path<String>,
) -> Result<Response, ApiError> {
    let requested: ProviderKind = provider
        .parse()
        .map_err(|_| ApiError::UnknownProvider(provider.clone()))?;
    let active = state.gateway.kind();

    if requested != active {
        return Ok(Json(InactiveProvider {
            provider: requested,
            active: false,
            active_provider: active,
            message: format!("{requested} is not the configured image provider; {active} is"),
        })
        .into_response());
    }

    let report = state.gateway.diagnose().await;
    Ok(Json(ActiveProvider {
        active: true,
        report,
    })
    .into_response())
}
