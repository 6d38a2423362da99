//! Content writes with validation, and rendering by template id or name

use std::collections::BTreeMap;
use std::sync::Arc;

use super::resolver::{Channel, Email, Field, RenderOutcome, Renderer, Sms};
use super::store::{TemplateSource, TemplateStore};
use super::types::{
    Bindings, Content, ContentKind, CreateEmailRequest, CreateSmsRequest, EmailBody, EmailContent,
    GenerateEmailRequest, GenerateSmsRequest, SmsContent, Template, TemplateError, TemplateRef,
    TemplateResult, UpdateEmailRequest,
};
use super::validator::validate;
use crate::metrics::ValidationMetrics;

/// Template operations shared by the HTTP handlers
pub struct TemplateService {
    store: Arc<TemplateStore>,
    max_depth: usize,
}

impl TemplateService {
    pub fn new(store: Arc<TemplateStore>, max_depth: usize) -> Self {
        Self {
            store,
            max_depth: max_depth.max(1),
        }
    }

    /// Underlying store for locale and template CRUD
    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn renderer(&self) -> Renderer<'_, TemplateStore> {
        Renderer::new(self.store.as_ref()).with_max_depth(self.max_depth)
    }

    /// Reject content whose references do not resolve
    fn check<C: Channel>(
        &self,
        template: &Template,
        fields: &BTreeMap<String, String>,
    ) -> TemplateResult<()> {
        let names: Vec<&str> = C::FIELDS.iter().map(Field::as_str).collect();
        let violations = validate(self.store.as_ref(), fields, &names, &template.variables);

        if violations.is_empty() {
            return Ok(());
        }

        ValidationMetrics::record_rejected();
        tracing::info!(
            template = %template.name,
            kind = C::KIND.as_str(),
            violations = violations.len(),
            "Content rejected"
        );
        Err(TemplateError::ContentInvalid(violations))
    }

    // ------------------------------------------------------------------
    // Email
    // ------------------------------------------------------------------

    /// Validate and store email content for a template
    pub fn create_email(
        &self,
        template_id: &str,
        request: CreateEmailRequest,
    ) -> TemplateResult<EmailContent> {
        let template = self.store.get_template(template_id)?;
        self.check::<Email>(&template, &email_fields(&request))?;
        self.store.create_email(&template, request)
    }

    /// Validate the supplied fields, then apply them
    pub fn update_email(
        &self,
        id: &str,
        updates: UpdateEmailRequest,
    ) -> TemplateResult<EmailContent> {
        let current = match self.store.get_content(id)? {
            Content::Email(email) => email,
            Content::Sms(_) => return Err(TemplateError::NotFound(format!("email content {}", id))),
        };
        let template = self.store.get_template(&current.template)?;

        let supplied = [
            (Field::Subject, &updates.subject),
            (Field::Text, &updates.text),
            (Field::Html, &updates.html),
        ];
        let fields: BTreeMap<String, String> = supplied
            .into_iter()
            .filter_map(|(field, value)| {
                value
                    .as_ref()
                    .map(|value| (field.as_str().to_string(), value.clone()))
            })
            .collect();

        self.check::<Email>(&template, &fields)?;
        self.store.update_email(id, updates)
    }

    pub fn delete_email(&self, id: &str) -> TemplateResult<()> {
        self.store.delete_content(id, ContentKind::Email)
    }

    /// Render the stored email content of a template
    pub fn render_email(
        &self,
        template: TemplateRef<'_>,
        locale: &str,
        bindings: &Bindings,
    ) -> TemplateResult<RenderOutcome<EmailBody>> {
        let template = self.find_template(template)?;
        let body = self.stored_body::<Email>(&template, locale)?;
        Ok(self.renderer().render_email(&template, &body, locale, bindings))
    }

    /// Render unsaved email content as if it belonged to the template
    pub fn generate_email(
        &self,
        template_id: &str,
        request: &GenerateEmailRequest,
    ) -> TemplateResult<RenderOutcome<EmailBody>> {
        let template = self.store.get_template(template_id)?;
        self.store.get_locale(&request.locale)?;
        Ok(self.renderer().render_email(
            &template,
            &request.body,
            &request.locale,
            &request.variables,
        ))
    }

    // ------------------------------------------------------------------
    // SMS
    // ------------------------------------------------------------------

    /// Validate and store sms content for a template
    pub fn create_sms(
        &self,
        template_id: &str,
        request: CreateSmsRequest,
    ) -> TemplateResult<SmsContent> {
        let template = self.store.get_template(template_id)?;
        self.check::<Sms>(&template, &sms_fields(&request.content))?;
        self.store.create_sms(&template, request)
    }

    /// Validate and replace the text of sms content
    pub fn update_sms(&self, id: &str, content: String) -> TemplateResult<SmsContent> {
        let current = match self.store.get_content(id)? {
            Content::Sms(sms) => sms,
            Content::Email(_) => return Err(TemplateError::NotFound(format!("sms content {}", id))),
        };
        let template = self.store.get_template(&current.template)?;

        self.check::<Sms>(&template, &sms_fields(&content))?;
        self.store.update_sms(id, content)
    }

    pub fn delete_sms(&self, id: &str) -> TemplateResult<()> {
        self.store.delete_content(id, ContentKind::Sms)
    }

    /// Render the stored sms content of a template
    pub fn render_sms(
        &self,
        template: TemplateRef<'_>,
        locale: &str,
        bindings: &Bindings,
    ) -> TemplateResult<RenderOutcome<String>> {
        let template = self.find_template(template)?;
        let content = self.stored_body::<Sms>(&template, locale)?;
        Ok(self.renderer().render_sms(&template, &content, locale, bindings))
    }

    /// Render unsaved sms content as if it belonged to the template
    pub fn generate_sms(
        &self,
        template_id: &str,
        request: &GenerateSmsRequest,
    ) -> TemplateResult<RenderOutcome<String>> {
        let template = self.store.get_template(template_id)?;
        self.store.get_locale(&request.locale)?;
        Ok(self.renderer().render_sms(
            &template,
            &request.content,
            &request.locale,
            &request.variables,
        ))
    }

    fn find_template(&self, template: TemplateRef<'_>) -> TemplateResult<Template> {
        match template {
            TemplateRef::Id(id) => self.store.get_template(id),
            TemplateRef::Name(name) => self.store.get_template_by_name(name),
        }
    }

    fn stored_body<C: Channel>(&self, template: &Template, locale: &str) -> TemplateResult<C::Body> {
        self.store
            .content(&template.id, locale, C::KIND)
            .and_then(C::body)
            .ok_or_else(|| {
                TemplateError::NotFound(format!(
                    "{} content for {} in {}",
                    C::KIND,
                    template.name,
                    locale
                ))
            })
    }
}

fn email_fields(request: &CreateEmailRequest) -> BTreeMap<String, String> {
    BTreeMap::from([
        (Field::Subject.as_str().to_string(), request.subject.clone()),
        (Field::Text.as_str().to_string(), request.text.clone()),
        (Field::Html.as_str().to_string(), request.html.clone()),
    ])
}

fn sms_fields(content: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(Field::Content.as_str().to_string(), content.to_string())])
}
