//! API layer - HTTP endpoint handlers organized by domain.

mod content;
mod health;
mod locale;
mod metrics;
mod render;
mod routes;
mod template;

// Re-export all handlers for use in routes.rs
pub use content::{
    create_email, create_sms, delete_email, delete_sms, get_email, get_sms, list_contents,
    update_email, update_sms,
};
pub use health::{health, HealthResponse};
pub use locale::{archive_locale, create_locale, delete_locale, get_locale, list_locales, update_locale};
pub use metrics::prometheus_metrics;
pub use render::{generate_email, generate_sms, render_email, render_sms};
pub use routes::api_routes;
pub use template::{create_template, delete_template, get_template, list_templates, update_template};
