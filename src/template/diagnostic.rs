//! Inline render diagnostics.
//!
//! Rendering never fails on a broken reference. Each problem is replaced in the
//! output by a visible `!!!...!!!` marker naming the offender, and recorded as a
//! [`Diagnostic`] so callers can inspect what went wrong without parsing text.

use serde::Serialize;
use thiserror::Error;

/// A problem found while rendering, whose `Display` form is the inline marker
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("!!!{{{name}}} does not exist!!!")]
    MissingVariable { name: String },

    #[error("!!!#{template}# does not exist!!!")]
    MissingTemplate { template: String },

    #[error("!!!#{template}.{locale}# does not exist!!!")]
    MissingContent { template: String, locale: String },

    #[error("!!!INVALID VARIABLE ({name}) IN CONDITIONAL!!!")]
    InvalidConditionalVariable { name: String },

    #[error("!!!{name} HAS INVALID VALUE ({value}) IN CONDITIONAL!!!")]
    InvalidConditionalValue { name: String, value: String },

    #[error("!!!#{template}# circular reference!!!")]
    CircularReference { template: String },

    #[error("!!!#{template}# exceeds maximum embedding depth of {max_depth}!!!")]
    DepthExceeded { template: String, max_depth: usize },
}

impl Diagnostic {
    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::MissingVariable { .. } => "missing_variable",
            Diagnostic::MissingTemplate { .. } => "missing_template",
            Diagnostic::MissingContent { .. } => "missing_content",
            Diagnostic::InvalidConditionalVariable { .. } => "invalid_conditional_variable",
            Diagnostic::InvalidConditionalValue { .. } => "invalid_conditional_value",
            Diagnostic::CircularReference { .. } => "circular_reference",
            Diagnostic::DepthExceeded { .. } => "depth_exceeded",
        }
    }

    /// The marker text substituted into rendered output
    pub fn marker(&self) -> String {
        self.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markers_name_the_offender() {
        let missing = Diagnostic::MissingVariable {
            name: "first_name".to_string(),
        };
        assert_eq!(missing.marker(), "!!!{first_name} does not exist!!!");

        let content = Diagnostic::MissingContent {
            template: "footer".to_string(),
            locale: "fr-CA".to_string(),
        };
        assert_eq!(content.marker(), "!!!#footer.fr-CA# does not exist!!!");

        let depth = Diagnostic::DepthExceeded {
            template: "deep".to_string(),
            max_depth: 10,
        };
        assert!(depth.marker().contains("deep"));
        assert!(depth.marker().contains("10"));
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let value = serde_json::to_value(Diagnostic::CircularReference {
            template: "loop".to_string(),
        })
        .unwrap();
        assert_eq!(value["kind"], "circular_reference");
        assert_eq!(value["template"], "loop");
    }
}
