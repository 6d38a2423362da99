//! Locale endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::Result;
use crate::server::AppState;
use crate::template::{CreateLocaleRequest, Locale, UpdateLocaleRequest};

/// POST /api/v1/locales
#[tracing::instrument(name = "http.create_locale", skip(state, request), fields(locale = %request.id))]
pub async fn create_locale(
    State(state): State<AppState>,
    Json(request): Json<CreateLocaleRequest>,
) -> Result<(StatusCode, Json<Locale>)> {
    let created = state.store().create_locale(request.into())?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/locales
#[tracing::instrument(name = "http.list_locales", skip(state))]
pub async fn list_locales(State(state): State<AppState>) -> Json<Vec<Locale>> {
    Json(state.store().list_locales())
}

/// GET /api/v1/locales/{id}
#[tracing::instrument(name = "http.get_locale", skip(state))]
pub async fn get_locale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Locale>> {
    Ok(Json(state.store().get_locale(&id)?))
}

/// PUT /api/v1/locales/{id} - Rename a locale
#[tracing::instrument(name = "http.update_locale", skip(state, request))]
pub async fn update_locale(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateLocaleRequest>,
) -> Result<Json<Locale>> {
    Ok(Json(state.store().update_locale(&id, request.name)?))
}

/// POST /api/v1/locales/{id}/archive
#[tracing::instrument(name = "http.archive_locale", skip(state))]
pub async fn archive_locale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Locale>> {
    Ok(Json(state.store().archive_locale(&id)?))
}

/// DELETE /api/v1/locales/{id}
#[tracing::instrument(name = "http.delete_locale", skip(state))]
pub async fn delete_locale(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.store().delete_locale(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
