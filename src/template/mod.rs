//! Notification template system.
//!
//! This module provides:
//! - Templates with declared variables, and per-locale email and sms content
//! - In-memory storage of locales, templates and content with CRUD operations
//! - `{variable}` substitution, `[if ...]` conditionals and `#template#` embeds
//! - Recursive rendering with per-render caching and cycle/depth guards
//! - Static validation of content before it is stored
//!
//! # Example
//!
//! ```ignore
//! let store = TemplateStore::new();
//! store.create_locale(Locale::from(CreateLocaleRequest {
//!     id: "en-US".to_string(),
//!     name: "English (US)".to_string(),
//! }))?;
//!
//! let service = TemplateService::new(Arc::new(store), DEFAULT_MAX_DEPTH);
//! let template = service.create_template(CreateTemplateRequest {
//!     name: "order_shipped".to_string(),
//!     variables: [("order".to_string(), VariableType::String)].into(),
//! })?;
//!
//! service.create_sms(&template.id, CreateSmsRequest {
//!     locale: "en-US".to_string(),
//!     content: "Order {order} is on its way".to_string(),
//! })?;
//!
//! let rendered = service.render_sms(TemplateRef::Name("order_shipped"), "en-US", &bindings)?;
//! ```

mod conditional;
mod diagnostic;
mod lexer;
mod resolver;
mod service;
mod store;
mod substitution;
mod types;
mod validator;

pub use conditional::{evaluate, is_truthy, parse_bool};
pub use diagnostic::Diagnostic;
pub use lexer::Operator;
pub use resolver::{
    Channel, Email, Field, RenderOutcome, Renderer, Sms, DEFAULT_MAX_DEPTH,
};
pub use service::TemplateService;
pub use store::{create_template_store, TemplateSource, TemplateStore};
pub use substitution::{substitute, value_to_string};
pub use types::{
    Bindings, Content, ContentKind, CreateEmailRequest, CreateLocaleRequest, CreateSmsRequest,
    CreateTemplateRequest, EmailBody, EmailContent, GenerateEmailRequest, GenerateSmsRequest,
    Locale, RenderRequest, SmsContent, Template, TemplateError, TemplateListResponse,
    TemplateRef, TemplateResult, UpdateEmailRequest, UpdateLocaleRequest, UpdateSmsRequest,
    UpdateTemplateRequest, VariableType,
};
pub use validator::{validate, Violation, ViolationKind};
