//! Template, locale and content types and error definitions

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::validator::Violation;

/// Template-specific error type
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid template name: {0}")]
    InvalidName(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid locale: {0}")]
    InvalidLocale(String),

    #[error("Locale is archived: {0}")]
    LocaleArchived(String),

    #[error("Locale is still referenced by content: {0}")]
    LocaleInUse(String),

    #[error("Content references unknown names: {}", format_violations(.0))]
    ContentInvalid(Vec<Violation>),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}:{}", v.kind, v.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type for template operations
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Variable bindings supplied at render time
pub type Bindings = serde_json::Map<String, serde_json::Value>;

/// Declared type of a template variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    /// No declared type, conditionals coerce by the bound value's runtime type
    #[default]
    Any,
    String,
    Number,
    Boolean,
}

/// Content channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Email,
    Sms,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Email => "email",
            ContentKind::Sms => "sms",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true if `name` is a valid template or variable name (`[A-Za-z_]+`)
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_')
}

/// Returns true if `id` looks like a locale code: `xx` or `xx-XX`
pub fn is_valid_locale_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    match bytes.len() {
        2 => bytes.iter().all(u8::is_ascii_lowercase),
        5 => {
            bytes[..2].iter().all(u8::is_ascii_lowercase)
                && bytes[2] == b'-'
                && bytes[3..].iter().all(u8::is_ascii_uppercase)
        }
        _ => false,
    }
}

/// A locale content can be written for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locale {
    /// Short code, e.g. `en-US`
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Archived locales can no longer be updated
    #[serde(default)]
    pub archived: bool,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Locale {
    pub fn validate(&self) -> TemplateResult<()> {
        if !is_valid_locale_id(&self.id) {
            return Err(TemplateError::InvalidLocale(format!(
                "'{}' is not a locale code like 'en' or 'en-US'",
                self.id
            )));
        }

        if self.name.is_empty() || self.name.len() > 64 {
            return Err(TemplateError::InvalidLocale(
                "Name must be 1-64 characters".to_string(),
            ));
        }

        Ok(())
    }
}

/// Request to create a locale
#[derive(Debug, Deserialize)]
pub struct CreateLocaleRequest {
    pub id: String,
    pub name: String,
}

impl From<CreateLocaleRequest> for Locale {
    fn from(req: CreateLocaleRequest) -> Self {
        Locale {
            id: req.id,
            name: req.name,
            archived: false,
            created_at: Utc::now(),
        }
    }
}

/// Request to rename a locale
#[derive(Debug, Deserialize)]
pub struct UpdateLocaleRequest {
    pub name: String,
}

/// A named notification template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Unique template identifier
    pub id: String,

    /// Unique name used by `#name#` references
    pub name: String,

    /// Declared variables and their types
    #[serde(default)]
    pub variables: BTreeMap<String, VariableType>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Template {
    /// Validate the template
    pub fn validate(&self) -> TemplateResult<()> {
        if self.name.len() > 64 || !is_valid_name(&self.name) {
            return Err(TemplateError::InvalidName(format!(
                "'{}' must be 1-64 letters or underscores",
                self.name
            )));
        }

        if let Some(bad) = self.variables.keys().find(|v| !is_valid_name(v)) {
            return Err(TemplateError::InvalidTemplate(format!(
                "Variable '{}' must contain only letters or underscores",
                bad
            )));
        }

        Ok(())
    }

    /// Declared type of a variable, `Any` when undeclared
    pub fn variable_type(&self, name: &str) -> VariableType {
        self.variables.get(name).copied().unwrap_or_default()
    }
}

/// Request to create a new template
#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub name: String,

    #[serde(default)]
    pub variables: BTreeMap<String, VariableType>,
}

impl From<CreateTemplateRequest> for Template {
    fn from(req: CreateTemplateRequest) -> Self {
        let now = Utc::now();
        Template {
            id: uuid::Uuid::new_v4().to_string(),
            name: req.name,
            variables: req.variables,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Request to update an existing template
#[derive(Debug, Default, Deserialize)]
pub struct UpdateTemplateRequest {
    /// New name (optional)
    pub name: Option<String>,

    /// Replacement variable declarations (optional)
    pub variables: Option<BTreeMap<String, VariableType>>,
}

/// Response for listing templates
#[derive(Debug, Serialize)]
pub struct TemplateListResponse {
    pub templates: Vec<Template>,
    pub total: usize,
}

/// Email content of a template in one locale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailContent {
    pub id: String,
    pub template: String,
    pub locale: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl EmailContent {
    pub fn body(&self) -> EmailBody {
        EmailBody {
            subject: self.subject.clone(),
            text: self.text.clone(),
            html: self.html.clone(),
        }
    }
}

/// SMS content of a template in one locale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsContent {
    pub id: String,
    pub template: String,
    pub locale: String,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Either content variant
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Email(EmailContent),
    Sms(SmsContent),
}

impl Content {
    pub fn id(&self) -> &str {
        match self {
            Content::Email(email) => &email.id,
            Content::Sms(sms) => &sms.id,
        }
    }

    pub fn kind(&self) -> ContentKind {
        match self {
            Content::Email(_) => ContentKind::Email,
            Content::Sms(_) => ContentKind::Sms,
        }
    }

    pub fn locale(&self) -> &str {
        match self {
            Content::Email(c) => &c.locale,
            Content::Sms(c) => &c.locale,
        }
    }

    pub fn template(&self) -> &str {
        match self {
            Content::Email(c) => &c.template,
            Content::Sms(c) => &c.template,
        }
    }
}

/// The three fields of an email, raw or rendered
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailBody {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Request to create email content for a template
#[derive(Debug, Deserialize)]
pub struct CreateEmailRequest {
    pub locale: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Request to update email content, only supplied fields change
#[derive(Debug, Default, Deserialize)]
pub struct UpdateEmailRequest {
    pub subject: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
}

/// Request to create sms content for a template
#[derive(Debug, Deserialize)]
pub struct CreateSmsRequest {
    pub locale: String,
    pub content: String,
}

/// Request to update sms content
#[derive(Debug, Deserialize)]
pub struct UpdateSmsRequest {
    pub content: String,
}

/// How a render names the template whose stored content it uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateRef<'a> {
    Id(&'a str),
    Name(&'a str),
}

/// Request to render stored content of a template by id or name
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub id: Option<String>,
    /// Template name
    #[serde(default)]
    pub template: Option<String>,
    pub locale: String,
    #[serde(default)]
    pub variables: Bindings,
}

impl RenderRequest {
    /// The template to render, the id wins when both are given
    pub fn template_ref(&self) -> TemplateResult<TemplateRef<'_>> {
        match (&self.id, &self.template) {
            (Some(id), _) => Ok(TemplateRef::Id(id)),
            (None, Some(name)) => Ok(TemplateRef::Name(name)),
            (None, None) => Err(TemplateError::InvalidTemplate(
                "a template id or name is required".to_string(),
            )),
        }
    }
}

/// Request to preview unsaved email content
#[derive(Debug, Deserialize)]
pub struct GenerateEmailRequest {
    pub locale: String,
    #[serde(flatten)]
    pub body: EmailBody,
    #[serde(default)]
    pub variables: Bindings,
}

/// Request to preview unsaved sms content
#[derive(Debug, Deserialize)]
pub struct GenerateSmsRequest {
    pub locale: String,
    pub content: String,
    #[serde(default)]
    pub variables: Bindings,
}
