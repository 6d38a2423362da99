//! Recursive rendering of template content.
//!
//! A render walks the tokenized content of each field. Variables are replaced
//! by their bound values, conditional blocks by the selected branch, and
//! `#name#` references by the same field of the named template's content in
//! the requested locale, itself rendered recursively.
//!
//! Each top-level render owns a [`ResolutionContext`]: a cache of templates
//! already resolved during this call, the stack of templates currently being
//! resolved (for cycle detection), and the diagnostics emitted so far. The
//! context is created on entry and dropped on return, so concurrent renders
//! never share state.

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;

use super::conditional::select;
use super::diagnostic::Diagnostic;
use super::lexer::{tokenize, Node};
use super::store::TemplateSource;
use super::substitution::resolve_variable;
use super::types::{Bindings, Content, ContentKind, EmailBody, Template};
use crate::metrics::RenderMetrics;

/// Default cap on the number of templates on the resolution stack
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// A named text field of some content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Subject,
    Text,
    Html,
    Content,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Subject => "subject",
            Field::Text => "text",
            Field::Html => "html",
            Field::Content => "content",
        }
    }
}

/// A content variant the renderer can produce
pub trait Channel {
    /// Raw and rendered form of the content's fields
    type Body: Clone;

    const KIND: ContentKind;
    const FIELDS: &'static [Field];

    /// Extract the body from stored content of this channel
    fn body(content: Content) -> Option<Self::Body>;

    fn field(body: &Self::Body, field: Field) -> &str;

    fn field_mut(body: &mut Self::Body, field: Field) -> &mut String;

    /// A body whose every field is `text`
    fn filled(text: String) -> Self::Body;
}

/// Email: subject, text and html rendered independently
pub struct Email;

impl Channel for Email {
    type Body = EmailBody;

    const KIND: ContentKind = ContentKind::Email;
    const FIELDS: &'static [Field] = &[Field::Subject, Field::Text, Field::Html];

    fn body(content: Content) -> Option<EmailBody> {
        match content {
            Content::Email(email) => Some(email.body()),
            Content::Sms(_) => None,
        }
    }

    fn field(body: &EmailBody, field: Field) -> &str {
        match field {
            Field::Subject => &body.subject,
            Field::Html => &body.html,
            Field::Text | Field::Content => &body.text,
        }
    }

    fn field_mut(body: &mut EmailBody, field: Field) -> &mut String {
        match field {
            Field::Subject => &mut body.subject,
            Field::Html => &mut body.html,
            Field::Text | Field::Content => &mut body.text,
        }
    }

    fn filled(text: String) -> EmailBody {
        EmailBody {
            subject: text.clone(),
            text: text.clone(),
            html: text,
        }
    }
}

/// SMS: a single plain string
pub struct Sms;

impl Channel for Sms {
    type Body = String;

    const KIND: ContentKind = ContentKind::Sms;
    const FIELDS: &'static [Field] = &[Field::Content];

    fn body(content: Content) -> Option<String> {
        match content {
            Content::Sms(sms) => Some(sms.content),
            Content::Email(_) => None,
        }
    }

    fn field(body: &String, _field: Field) -> &str {
        body
    }

    fn field_mut(body: &mut String, _field: Field) -> &mut String {
        body
    }

    fn filled(text: String) -> String {
        text
    }
}

/// Rendered output plus the diagnostics behind any markers in it
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome<T> {
    pub output: T,
    pub diagnostics: Vec<Diagnostic>,
}

impl<T> RenderOutcome<T> {
    /// True if nothing was replaced by a marker
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// State of one top-level render call
pub struct ResolutionContext<'r, B> {
    locale: &'r str,
    bindings: &'r Bindings,
    /// Rendered bodies by template name
    resolved: HashMap<String, B>,
    /// Templates currently being resolved, outermost first
    stack: Vec<String>,
    /// Set when the body being resolved holds a stack-dependent marker
    tainted: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'r, B: Clone> ResolutionContext<'r, B> {
    fn new(locale: &'r str, bindings: &'r Bindings) -> Self {
        Self {
            locale,
            bindings,
            resolved: HashMap::new(),
            stack: Vec::new(),
            tainted: false,
            diagnostics: Vec::new(),
        }
    }

    /// Record a diagnostic and return its marker
    fn report(&mut self, diagnostic: Diagnostic) -> String {
        let marker = diagnostic.marker();
        tracing::warn!(
            kind = diagnostic.kind(),
            template = self.stack.last().map(String::as_str).unwrap_or_default(),
            locale = self.locale,
            marker = %marker,
            "Render marker emitted"
        );
        RenderMetrics::record_marker(diagnostic.kind());
        if matches!(
            diagnostic,
            Diagnostic::CircularReference { .. } | Diagnostic::DepthExceeded { .. }
        ) {
            self.tainted = true;
        }
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
        marker
    }
}

/// Renders content against a [`TemplateSource`]
pub struct Renderer<'s, S: TemplateSource + ?Sized> {
    source: &'s S,
    max_depth: usize,
}

impl<'s, S: TemplateSource + ?Sized> Renderer<'s, S> {
    pub fn new(source: &'s S) -> Self {
        Self {
            source,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Cap the number of templates on the resolution stack, the root included
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Render email content owned by `template`
    pub fn render_email(
        &self,
        template: &Template,
        body: &EmailBody,
        locale: &str,
        bindings: &Bindings,
    ) -> RenderOutcome<EmailBody> {
        self.render::<Email>(template, body, locale, bindings)
    }

    /// Render sms content owned by `template`
    pub fn render_sms(
        &self,
        template: &Template,
        content: &str,
        locale: &str,
        bindings: &Bindings,
    ) -> RenderOutcome<String> {
        self.render::<Sms>(template, &content.to_string(), locale, bindings)
    }

    /// Top-level render with a fresh resolution context
    #[tracing::instrument(
        name = "template.render",
        skip_all,
        fields(template = %template.name, locale = %locale, channel = C::KIND.as_str())
    )]
    pub fn render<C: Channel>(
        &self,
        template: &Template,
        body: &C::Body,
        locale: &str,
        bindings: &Bindings,
    ) -> RenderOutcome<C::Body> {
        let started = Instant::now();
        let mut ctx = ResolutionContext::new(locale, bindings);

        ctx.stack.push(template.name.clone());
        let output = self.render_body::<C>(template, body, &mut ctx);
        ctx.stack.pop();

        RenderMetrics::record_render(C::KIND.as_str(), started.elapsed());
        RenderOutcome {
            output,
            diagnostics: ctx.diagnostics,
        }
    }

    fn render_body<C: Channel>(
        &self,
        template: &Template,
        body: &C::Body,
        ctx: &mut ResolutionContext<'_, C::Body>,
    ) -> C::Body {
        let mut rendered = body.clone();

        for &field in C::FIELDS {
            let text = C::field(body, field);
            let mut out = String::with_capacity(text.len());
            self.render_nodes::<C>(template, &tokenize(text), field, ctx, &mut out);
            *C::field_mut(&mut rendered, field) = out;
        }

        rendered
    }

    fn render_nodes<C: Channel>(
        &self,
        template: &Template,
        nodes: &[Node<'_>],
        field: Field,
        ctx: &mut ResolutionContext<'_, C::Body>,
        out: &mut String,
    ) {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Variable(name) => match resolve_variable(name, ctx.bindings) {
                    Ok(value) => out.push_str(&value),
                    Err(diagnostic) => out.push_str(&ctx.report(diagnostic)),
                },
                Node::Embed(name) => {
                    let embedded = self.resolve::<C>(name, ctx);
                    out.push_str(C::field(&embedded, field));
                }
                Node::Conditional(block) => {
                    let declared = template.variable_type(block.variable);
                    match select(block, ctx.bindings, declared) {
                        Ok(Some(branch)) => {
                            self.render_nodes::<C>(template, &branch.nodes, field, ctx, out)
                        }
                        Ok(None) => {}
                        Err(diagnostic) => out.push_str(&ctx.report(diagnostic)),
                    }
                }
            }
        }
    }

    /// Rendered body of the template called `name`, from cache when possible
    fn resolve<C: Channel>(
        &self,
        name: &str,
        ctx: &mut ResolutionContext<'_, C::Body>,
    ) -> C::Body {
        if let Some(body) = ctx.resolved.get(name) {
            return body.clone();
        }

        // Not cached: the result depends on the current stack
        if ctx.stack.iter().any(|active| active == name) {
            let marker = ctx.report(Diagnostic::CircularReference {
                template: name.to_string(),
            });
            return C::filled(marker);
        }

        if ctx.stack.len() >= self.max_depth {
            let marker = ctx.report(Diagnostic::DepthExceeded {
                template: name.to_string(),
                max_depth: self.max_depth,
            });
            return C::filled(marker);
        }

        let outer = std::mem::take(&mut ctx.tainted);
        let body = match self.source.template_by_name(name) {
            None => C::filled(ctx.report(Diagnostic::MissingTemplate {
                template: name.to_string(),
            })),
            Some(template) => match self
                .source
                .content(&template.id, ctx.locale, C::KIND)
                .and_then(C::body)
            {
                None => C::filled(ctx.report(Diagnostic::MissingContent {
                    template: name.to_string(),
                    locale: ctx.locale.to_string(),
                })),
                Some(raw) => {
                    tracing::trace!(template = %name, depth = ctx.stack.len(), "Resolving embedded template");
                    ctx.stack.push(name.to_string());
                    let rendered = self.render_body::<C>(&template, &raw, ctx);
                    ctx.stack.pop();
                    rendered
                }
            },
        };

        // a body holding a cycle or depth marker is rendered again where reused
        if !ctx.tainted {
            ctx.resolved.insert(name.to_string(), body.clone());
        }
        ctx.tainted |= outer;
        body
    }
}
