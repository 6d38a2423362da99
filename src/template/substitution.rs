//! Variable substitution engine for templates

use serde_json::Value;

use super::diagnostic::Diagnostic;
use super::lexer::{tokenize_variables, Node};
use super::types::Bindings;

/// Natural string form of a bound value
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        // For arrays and objects, use JSON representation
        _ => value.to_string(),
    }
}

/// Resolve a single `{name}` reference to its replacement text
pub fn resolve_variable(name: &str, bindings: &Bindings) -> Result<String, Diagnostic> {
    bindings
        .get(name)
        .map(value_to_string)
        .ok_or_else(|| Diagnostic::MissingVariable {
            name: name.to_string(),
        })
}

/// Replace every `{name}` in `text` with its bound value.
///
/// Unbound names are replaced with a visible marker instead, this never fails.
/// Substituted values are not scanned again.
pub fn substitute(text: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(text.len());

    for node in tokenize_variables(text) {
        match node {
            Node::Variable(name) => match resolve_variable(name, bindings) {
                Ok(value) => out.push_str(&value),
                Err(diagnostic) => out.push_str(&diagnostic.marker()),
            },
            Node::Text(s) => out.push_str(s),
            // Not produced by a variable scan
            Node::Embed(name) => {
                out.push('#');
                out.push_str(name);
                out.push('#');
            }
            Node::Conditional(block) => out.push_str(block.source),
        }
    }

    out
}
