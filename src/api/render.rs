//! Render and preview endpoints.
//!
//! Broken references never fail a render. They come back as inline markers in
//! the output, and as structured entries in `diagnostics`.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::Result;
use crate::server::AppState;
use crate::template::{
    EmailBody, GenerateEmailRequest, GenerateSmsRequest, RenderOutcome, RenderRequest,
};

/// POST /api/v1/render/email - Render stored email content by template id or name
#[tracing::instrument(
    name = "http.render_email",
    skip(state, request),
    fields(id = ?request.id, template = ?request.template, locale = %request.locale)
)]
pub async fn render_email(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderOutcome<EmailBody>>> {
    let template = request.template_ref()?;
    let outcome =
        state
            .template_service
            .render_email(template, &request.locale, &request.variables)?;
    Ok(Json(outcome))
}

/// POST /api/v1/render/sms - Render stored sms content by template id or name
#[tracing::instrument(
    name = "http.render_sms",
    skip(state, request),
    fields(id = ?request.id, template = ?request.template, locale = %request.locale)
)]
pub async fn render_sms(
    State(state): State<AppState>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderOutcome<String>>> {
    let template = request.template_ref()?;
    let outcome =
        state
            .template_service
            .render_sms(template, &request.locale, &request.variables)?;
    Ok(Json(outcome))
}

/// POST /api/v1/templates/{id}/email/generate - Preview unsaved email content
#[tracing::instrument(
    name = "http.generate_email",
    skip(state, request),
    fields(locale = %request.locale)
)]
pub async fn generate_email(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<GenerateEmailRequest>,
) -> Result<Json<RenderOutcome<EmailBody>>> {
    Ok(Json(state.template_service.generate_email(&id, &request)?))
}

/// POST /api/v1/templates/{id}/sms/generate - Preview unsaved sms content
#[tracing::instrument(
    name = "http.generate_sms",
    skip(state, request),
    fields(locale = %request.locale)
)]
pub async fn generate_sms(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<GenerateSmsRequest>,
) -> Result<Json<RenderOutcome<String>>> {
    Ok(Json(state.template_service.generate_sms(&id, &request)?))
}
