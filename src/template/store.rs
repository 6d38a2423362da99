//! Template, locale and content storage with CRUD operations

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::types::{
    Content, ContentKind, CreateEmailRequest, CreateSmsRequest, EmailContent, Locale, SmsContent,
    Template, TemplateError, TemplateResult, UpdateEmailRequest, UpdateTemplateRequest,
};

/// Read-only lookups the renderer and validator need from storage
pub trait TemplateSource: Send + Sync {
    /// Find a template by its unique name
    fn template_by_name(&self, name: &str) -> Option<Template>;

    /// Find the content of one variant for a template in a locale
    fn content(&self, template_id: &str, locale: &str, kind: ContentKind) -> Option<Content>;

    /// Which of `names` belong to existing templates
    fn existing_names(&self, names: &[&str]) -> HashSet<String>;
}

/// (template id, locale, kind)
type ContentKey = (String, String, ContentKind);

/// In-memory storage for templates, locales and their content
///
/// Guards that are held together are always taken in the order
/// templates, locales, contents, content_ids.
pub struct TemplateStore {
    locales: DashMap<String, Locale>,
    templates: DashMap<String, Template>,
    /// Template name -> id
    names: DashMap<String, String>,
    contents: DashMap<ContentKey, Content>,
    /// Content id -> key
    content_ids: DashMap<String, ContentKey>,
}

impl Default for TemplateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateStore {
    /// Create a new template store
    pub fn new() -> Self {
        Self {
            locales: DashMap::new(),
            templates: DashMap::new(),
            names: DashMap::new(),
            contents: DashMap::new(),
            content_ids: DashMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Locales
    // ------------------------------------------------------------------

    /// Create a new locale
    pub fn create_locale(&self, locale: Locale) -> TemplateResult<Locale> {
        locale.validate()?;

        match self.locales.entry(locale.id.clone()) {
            Entry::Occupied(_) => Err(TemplateError::AlreadyExists(format!(
                "locale {}",
                locale.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(locale.clone());
                tracing::info!(locale = %locale.id, "Locale created");
                Ok(locale)
            }
        }
    }

    /// Get a locale by ID
    pub fn get_locale(&self, id: &str) -> TemplateResult<Locale> {
        self.locales
            .get(id)
            .map(|l| l.clone())
            .ok_or_else(|| TemplateError::NotFound(format!("locale {}", id)))
    }

    /// Check if a locale exists
    pub fn locale_exists(&self, id: &str) -> bool {
        self.locales.contains_key(id)
    }

    /// List all locales ordered by name
    pub fn list_locales(&self) -> Vec<Locale> {
        let mut locales: Vec<Locale> = self
            .locales
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        locales.sort_by(|a, b| a.name.cmp(&b.name));
        locales
    }

    /// Rename a locale, archived locales are read-only
    pub fn update_locale(&self, id: &str, name: String) -> TemplateResult<Locale> {
        let mut entry = self
            .locales
            .get_mut(id)
            .ok_or_else(|| TemplateError::NotFound(format!("locale {}", id)))?;

        if entry.archived {
            return Err(TemplateError::LocaleArchived(id.to_string()));
        }

        let mut updated = entry.clone();
        updated.name = name;
        updated.validate()?;
        *entry = updated.clone();

        Ok(updated)
    }

    /// Mark a locale as archived
    pub fn archive_locale(&self, id: &str) -> TemplateResult<Locale> {
        let mut entry = self
            .locales
            .get_mut(id)
            .ok_or_else(|| TemplateError::NotFound(format!("locale {}", id)))?;
        entry.archived = true;
        tracing::info!(locale = %id, "Locale archived");
        Ok(entry.clone())
    }

    /// Delete a locale that no content references
    pub fn delete_locale(&self, id: &str) -> TemplateResult<()> {
        // the entry stays locked until removal so no content can be added meanwhile
        match self.locales.entry(id.to_string()) {
            Entry::Vacant(_) => Err(TemplateError::NotFound(format!("locale {}", id))),
            Entry::Occupied(entry) => {
                if self.contents.iter().any(|content| content.key().1 == id) {
                    return Err(TemplateError::LocaleInUse(id.to_string()));
                }

                entry.remove();
                tracing::info!(locale = %id, "Locale deleted");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Create a new template, names are unique
    pub fn create_template(&self, template: Template) -> TemplateResult<Template> {
        template.validate()?;

        match self.names.entry(template.name.clone()) {
            Entry::Occupied(_) => Err(TemplateError::AlreadyExists(format!(
                "template {}",
                template.name
            ))),
            Entry::Vacant(slot) => {
                slot.insert(template.id.clone());
                self.templates.insert(template.id.clone(), template.clone());
                tracing::info!(template = %template.name, id = %template.id, "Template created");
                Ok(template)
            }
        }
    }

    /// Get a template by ID
    pub fn get_template(&self, id: &str) -> TemplateResult<Template> {
        self.templates
            .get(id)
            .map(|t| t.clone())
            .ok_or_else(|| TemplateError::NotFound(format!("template {}", id)))
    }

    /// Get a template by name
    pub fn get_template_by_name(&self, name: &str) -> TemplateResult<Template> {
        let id = self
            .names
            .get(name)
            .map(|id| id.clone())
            .ok_or_else(|| TemplateError::NotFound(format!("template {}", name)))?;
        self.get_template(&id)
    }

    /// List all templates ordered by name
    pub fn list_templates(&self) -> Vec<Template> {
        let mut templates: Vec<Template> = self
            .templates
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        templates
    }

    /// Update an existing template
    pub fn update_template(
        &self,
        id: &str,
        updates: UpdateTemplateRequest,
    ) -> TemplateResult<Template> {
        let mut template = self.get_template(id)?;
        let old_name = template.name.clone();

        if let Some(name) = updates.name {
            template.name = name;
        }

        if let Some(variables) = updates.variables {
            template.variables = variables;
        }

        template.updated_at = Utc::now();
        template.validate()?;

        if template.name != old_name {
            match self.names.entry(template.name.clone()) {
                Entry::Occupied(_) => {
                    return Err(TemplateError::AlreadyExists(format!(
                        "template {}",
                        template.name
                    )))
                }
                Entry::Vacant(slot) => {
                    slot.insert(id.to_string());
                }
            }
            self.names.remove(&old_name);
        }

        self.templates.insert(id.to_string(), template.clone());

        Ok(template)
    }

    /// Delete a template and all of its content
    pub fn delete_template(&self, id: &str) -> TemplateResult<()> {
        let (_, template) = self
            .templates
            .remove(id)
            .ok_or_else(|| TemplateError::NotFound(format!("template {}", id)))?;
        self.names.remove(&template.name);

        let keys: Vec<ContentKey> = self
            .contents
            .iter()
            .filter(|entry| entry.key().0 == id)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            if let Some((_, content)) = self.contents.remove(&key) {
                self.content_ids.remove(content.id());
            }
        }

        tracing::info!(template = %template.name, "Template deleted");
        Ok(())
    }

    /// Check if a template with this name exists
    pub fn exists(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Get the number of templates
    pub fn count(&self) -> usize {
        self.templates.len()
    }

    /// Get the number of locales
    pub fn locale_count(&self) -> usize {
        self.locales.len()
    }

    // ------------------------------------------------------------------
    // Content
    // ------------------------------------------------------------------

    /// Insert new content while holding its template and locale, so neither
    /// can be deleted until the content is visible
    fn insert_content(&self, content: Content) -> TemplateResult<Content> {
        let template = self
            .templates
            .get(content.template())
            .ok_or_else(|| TemplateError::NotFound(format!("template {}", content.template())))?;

        let locale = self
            .locales
            .get(content.locale())
            .ok_or_else(|| TemplateError::NotFound(format!("locale {}", content.locale())))?;
        if locale.archived {
            return Err(TemplateError::LocaleArchived(locale.id.clone()));
        }

        let key = (
            content.template().to_string(),
            content.locale().to_string(),
            content.kind(),
        );

        match self.contents.entry(key.clone()) {
            Entry::Occupied(_) => Err(TemplateError::AlreadyExists(format!(
                "{} content for {} in {}",
                key.2, template.name, key.1
            ))),
            Entry::Vacant(slot) => {
                slot.insert(content.clone());
                self.content_ids
                    .insert(content.id().to_string(), key.clone());
                tracing::debug!(template = %template.name, locale = %key.1, kind = %key.2, "Content created");
                Ok(content)
            }
        }
    }

    /// Add email content to a template
    pub fn create_email(
        &self,
        template: &Template,
        request: CreateEmailRequest,
    ) -> TemplateResult<EmailContent> {
        let now = Utc::now();
        let email = EmailContent {
            id: Uuid::new_v4().to_string(),
            template: template.id.clone(),
            locale: request.locale,
            subject: request.subject,
            text: request.text,
            html: request.html,
            created_at: now,
            updated_at: now,
        };

        self.insert_content(Content::Email(email.clone()))?;
        Ok(email)
    }

    /// Add sms content to a template
    pub fn create_sms(
        &self,
        template: &Template,
        request: CreateSmsRequest,
    ) -> TemplateResult<SmsContent> {
        let now = Utc::now();
        let sms = SmsContent {
            id: Uuid::new_v4().to_string(),
            template: template.id.clone(),
            locale: request.locale,
            content: request.content,
            created_at: now,
            updated_at: now,
        };

        self.insert_content(Content::Sms(sms.clone()))?;
        Ok(sms)
    }

    /// Get content by its ID
    pub fn get_content(&self, id: &str) -> TemplateResult<Content> {
        let key = self
            .content_ids
            .get(id)
            .map(|key| key.clone())
            .ok_or_else(|| TemplateError::NotFound(format!("content {}", id)))?;

        self.contents
            .get(&key)
            .map(|c| c.clone())
            .ok_or_else(|| TemplateError::NotFound(format!("content {}", id)))
    }

    /// Apply `change` to stored content, failing if it is not of `kind`
    fn modify_content<F>(&self, id: &str, kind: ContentKind, change: F) -> TemplateResult<Content>
    where
        F: FnOnce(&mut Content),
    {
        let key = self
            .content_ids
            .get(id)
            .map(|key| key.clone())
            .ok_or_else(|| TemplateError::NotFound(format!("content {}", id)))?;

        let mut entry = self
            .contents
            .get_mut(&key)
            .filter(|entry| entry.kind() == kind)
            .ok_or_else(|| TemplateError::NotFound(format!("{} content {}", kind, id)))?;

        change(entry.value_mut());
        Ok(entry.clone())
    }

    /// Update the supplied fields of email content
    pub fn update_email(
        &self,
        id: &str,
        updates: UpdateEmailRequest,
    ) -> TemplateResult<EmailContent> {
        let content = self.modify_content(id, ContentKind::Email, |content| {
            if let Content::Email(email) = content {
                if let Some(subject) = updates.subject {
                    email.subject = subject;
                }
                if let Some(text) = updates.text {
                    email.text = text;
                }
                if let Some(html) = updates.html {
                    email.html = html;
                }
                email.updated_at = Utc::now();
            }
        })?;

        match content {
            Content::Email(email) => Ok(email),
            Content::Sms(_) => Err(TemplateError::NotFound(format!("email content {}", id))),
        }
    }

    /// Replace the text of sms content
    pub fn update_sms(&self, id: &str, text: String) -> TemplateResult<SmsContent> {
        let content = self.modify_content(id, ContentKind::Sms, |content| {
            if let Content::Sms(sms) = content {
                sms.content = text;
                sms.updated_at = Utc::now();
            }
        })?;

        match content {
            Content::Sms(sms) => Ok(sms),
            Content::Email(_) => Err(TemplateError::NotFound(format!("sms content {}", id))),
        }
    }

    /// Delete content of the given kind by ID
    pub fn delete_content(&self, id: &str, kind: ContentKind) -> TemplateResult<()> {
        let key = self
            .content_ids
            .get(id)
            .map(|key| key.clone())
            .filter(|key| key.2 == kind)
            .ok_or_else(|| TemplateError::NotFound(format!("{} content {}", kind, id)))?;

        self.contents.remove(&key);
        self.content_ids.remove(id);
        Ok(())
    }

    /// All content of a template ordered by locale then kind
    pub fn template_contents(&self, template_id: &str) -> TemplateResult<Vec<Content>> {
        if !self.templates.contains_key(template_id) {
            return Err(TemplateError::NotFound(format!("template {}", template_id)));
        }

        let mut contents: Vec<Content> = self
            .contents
            .iter()
            .filter(|entry| entry.key().0 == template_id)
            .map(|entry| entry.value().clone())
            .collect();
        contents.sort_by(|a, b| (a.locale(), a.kind()).cmp(&(b.locale(), b.kind())));

        Ok(contents)
    }
}

impl TemplateSource for TemplateStore {
    fn template_by_name(&self, name: &str) -> Option<Template> {
        self.get_template_by_name(name).ok()
    }

    fn content(&self, template_id: &str, locale: &str, kind: ContentKind) -> Option<Content> {
        self.contents
            .get(&(template_id.to_string(), locale.to_string(), kind))
            .map(|c| c.clone())
    }

    fn existing_names(&self, names: &[&str]) -> HashSet<String> {
        names
            .iter()
            .filter(|name| self.names.contains_key(**name))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Create an Arc-wrapped template store
pub fn create_template_store() -> Arc<TemplateStore> {
    Arc::new(TemplateStore::new())
}
