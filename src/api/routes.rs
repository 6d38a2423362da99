use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::{
    archive_locale, create_email, create_locale, create_sms, create_template, delete_email,
    delete_locale, delete_sms, delete_template, generate_email, generate_sms, get_email,
    get_locale, get_sms, get_template, health, list_contents, list_locales, list_templates,
    prometheus_metrics, render_email, render_sms, update_email, update_locale, update_sms,
    update_template,
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Locales
                .route("/locales", get(list_locales).post(create_locale))
                .route(
                    "/locales/{id}",
                    get(get_locale).put(update_locale).delete(delete_locale),
                )
                .route("/locales/{id}/archive", post(archive_locale))
                // Templates
                .route("/templates", get(list_templates).post(create_template))
                .route(
                    "/templates/{id}",
                    get(get_template).put(update_template).delete(delete_template),
                )
                .route("/templates/{id}/contents", get(list_contents))
                // Content
                .route("/templates/{id}/email", post(create_email))
                .route("/templates/{id}/sms", post(create_sms))
                .route("/templates/{id}/email/generate", post(generate_email))
                .route("/templates/{id}/sms/generate", post(generate_sms))
                .route(
                    "/email/{id}",
                    get(get_email).put(update_email).delete(delete_email),
                )
                .route("/sms/{id}", get(get_sms).put(update_sms).delete(delete_sms))
                // Rendering
                .route("/render/email", post(render_email))
                .route("/render/sms", post(render_sms)),
        )
}

