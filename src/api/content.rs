//! Email and sms content endpoints.
//!
//! Writes go through [`TemplateService`](crate::template::TemplateService) so
//! content is validated against its template before it is stored.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::template::{
    Content, CreateEmailRequest, CreateSmsRequest, EmailContent, SmsContent, UpdateEmailRequest,
    UpdateSmsRequest,
};

/// GET /api/v1/templates/{id}/contents - All content of a template
#[tracing::instrument(name = "http.list_contents", skip(state))]
pub async fn list_contents(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Content>>> {
    Ok(Json(state.store().template_contents(&id)?))
}

/// POST /api/v1/templates/{id}/email
#[tracing::instrument(
    name = "http.create_email",
    skip(state, request),
    fields(locale = %request.locale)
)]
pub async fn create_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CreateEmailRequest>,
) -> Result<(StatusCode, Json<EmailContent>)> {
    let created = state.template_service.create_email(&id, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/email/{id}
#[tracing::instrument(name = "http.get_email", skip(state))]
pub async fn get_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EmailContent>> {
    match state.store().get_content(&id)? {
        Content::Email(email) => Ok(Json(email)),
        Content::Sms(_) => Err(AppError::NotFound(format!("email content {}", id))),
    }
}

/// PUT /api/v1/email/{id} - Update the supplied fields
#[tracing::instrument(name = "http.update_email", skip(state, request))]
pub async fn update_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateEmailRequest>,
) -> Result<Json<EmailContent>> {
    Ok(Json(state.template_service.update_email(&id, request)?))
}

/// DELETE /api/v1/email/{id}
#[tracing::instrument(name = "http.delete_email", skip(state))]
pub async fn delete_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.template_service.delete_email(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{id}/sms
#[tracing::instrument(
    name = "http.create_sms",
    skip(state, request),
    fields(locale = %request.locale)
)]
pub async fn create_sms(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CreateSmsRequest>,
) -> Result<(StatusCode, Json<SmsContent>)> {
    let created = state.template_service.create_sms(&id, request)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/sms/{id}
#[tracing::instrument(name = "http.get_sms", skip(state))]
pub async fn get_sms(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SmsContent>> {
    match state.store().get_content(&id)? {
        Content::Sms(sms) => Ok(Json(sms)),
        Content::Email(_) => Err(AppError::NotFound(format!("sms content {}", id))),
    }
}

/// PUT /api/v1/sms/{id}
#[tracing::instrument(name = "http.update_sms", skip(state, request))]
pub async fn update_sms(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateSmsRequest>,
) -> Result<Json<SmsContent>> {
    Ok(Json(state.template_service.update_sms(&id, request.content)?))
}

/// DELETE /api/v1/sms/{id}
#[tracing::instrument(name = "http.delete_sms", skip(state))]
pub async fn delete_sms(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.template_service.delete_sms(&id)?;
    Ok(StatusCode::NO_CONTENT)
}
