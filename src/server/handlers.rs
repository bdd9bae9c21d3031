use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::location::{
    zone_for_province, Coordinates, MatchKind, ResolutionFailure, ResolutionSession, ResolveError,
    ResolvedLocation,
};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
}

pub(super) struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.1,
            code: self.0.as_u16(),
        };
        (self.0, Json(body)).into_response()
    }
}

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    ApiError(status, msg.into())
}

// ─── GET /api/resolve ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResolveQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

#[derive(Serialize, Debug)]
pub struct ResolveResponse {
    pub province: String,
    pub city: String,
    pub province_match: MatchKind,
    pub city_match: MatchKind,
    pub degraded: bool,
    pub timezone: String,
    pub timezone_label: String,
}

#[derive(Serialize, Debug)]
pub struct FailureResponse {
    pub reason: ResolutionFailure,
    pub message: String,
    /// The location the client should fall back to.
    pub default: ResolvedLocation,
}

pub async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveQuery>,
) -> Result<Json<ResolveResponse>, Response> {
    let start = Instant::now();

    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(api_error(StatusCode::BAD_REQUEST, "Provide 'lat' and 'lon' parameters").into_response());
    };
    let at = Coordinates::checked(lat, lon).ok_or_else(|| {
        api_error(StatusCode::BAD_REQUEST, "Invalid coordinates. Lat: -90..90, Lon: -180..180")
            .into_response()
    })?;

    let mut session = ResolutionSession::new();
    let resolution = match state.resolver.resolve_at(&mut session, at).await {
        Ok(r) => r,
        Err(ResolveError::Failed(reason)) => {
            info!(%at, %reason, elapsed_ms = start.elapsed().as_millis() as u64, "GET /api/resolve failed");
            let body = FailureResponse {
                reason,
                message: reason.localized().to_string(),
                default: state.default_location.clone(),
            };
            return Err((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response());
        }
        Err(ResolveError::Superseded) => {
            return Err(api_error(StatusCode::CONFLICT, "Resolution superseded").into_response());
        }
    };

    info!(
        %at,
        city = %resolution.location.city,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "GET /api/resolve"
    );

    let zone = zone_for_province(&resolution.location.province);
    Ok(Json(ResolveResponse {
        degraded: resolution.is_degraded(),
        province_match: resolution.province_match,
        city_match: resolution.city_match,
        timezone: zone.tz().name().to_string(),
        timezone_label: zone.abbreviation().to_string(),
        province: resolution.location.province,
        city: resolution.location.city,
    }))
}

// ─── GET /api/provinces ──────────────────────────────────────────

pub async fn province_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, ApiError> {
    state
        .resolver
        .directory()
        .list_provinces()
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))
}

// ─── GET /api/cities ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CitiesQuery {
    pub province: Option<String>,
}

pub async fn city_list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CitiesQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let province = params.province.as_deref().unwrap_or("").trim();
    if province.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Missing 'province' parameter"));
    }
    state
        .resolver
        .directory()
        .list_cities(province)
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::BAD_GATEWAY, e.to_string()))
}
