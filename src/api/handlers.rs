use crate::api::AppState;
use crate::error::Result;
use crate::search::{AccessControl, FieldCatalog, ResponseData, SearchRequest};
use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use validator::Validate;

/// Gateway-forwarded federal access attribute; `No` denies
pub const FEDERAL_ACCESS_HEADER: &str = "x-federal-access";
/// Gateway-forwarded sensitivity check flag; `true` enables
pub const SENSITIVITY_CHECK_HEADER: &str = "x-sensitivity-check";
/// Gateway-forwarded allowed sensitivity levels
pub const SENSITIVITY_LEVELS_HEADER: &str = "x-sensitivity-levels";

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        backend: state.executor.backend_name().to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub backend: String,
}

/// Run a global search
///
/// Backend failures still answer 200 with `error` set; unknown or
/// mistyped filter fields answer 400.
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut request): Json<SearchRequest>,
) -> Result<Json<ResponseData>> {
    request.validate()?;
    request.access = access_from_headers(&headers);

    let response = state.executor.search(&request).await?;
    Ok(Json(response))
}

/// Describe the field catalog
pub async fn get_catalog(State(state): State<AppState>) -> Result<Json<FieldCatalog>> {
    Ok(Json(state.executor.catalog().clone()))
}

/// Access attributes of the caller, as forwarded by the gateway
pub fn access_from_headers(headers: &HeaderMap) -> AccessControl {
    let value = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    AccessControl::from_header_values(
        value(FEDERAL_ACCESS_HEADER),
        value(SENSITIVITY_CHECK_HEADER),
        value(SENSITIVITY_LEVELS_HEADER),
    )
}
