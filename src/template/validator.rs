//! Static check of raw content before it is stored.
//!
//! Reports every `#name#` that does not name an existing template and every
//! variable (`{name}` or a conditional's tested name) the owning template does
//! not declare. Conditional literals compared against a declared `number`
//! variable must parse as numbers. The check reports, it never fails.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use super::conditional::coerce_literal;
use super::lexer::References;
use super::store::TemplateSource;
use super::types::VariableType;

/// What a violation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationKind {
    Template,
    Variable,
    Value,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViolationKind::Template => "template",
            ViolationKind::Variable => "variable",
            ViolationKind::Value => "value",
        })
    }
}

/// One unresolved reference in content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub name: String,
}

impl Violation {
    pub fn new(kind: ViolationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

/// Validate the fields named in `field_names` that are present in `content`.
///
/// Returns an empty list when every reference resolves.
pub fn validate<S: TemplateSource + ?Sized>(
    source: &S,
    content: &BTreeMap<String, String>,
    field_names: &[&str],
    declared: &BTreeMap<String, VariableType>,
) -> Vec<Violation> {
    let mut variables = BTreeSet::new();
    let mut templates = BTreeSet::new();
    let mut values = BTreeSet::new();

    for text in field_names.iter().filter_map(|field| content.get(*field)) {
        let refs = References::scan(text);
        variables.extend(refs.variables);
        templates.extend(refs.templates);

        for (name, test) in refs.conditions {
            variables.insert(name);
            let Some(test) = test else { continue };
            // values built from variables are only known at render time
            if declared.get(name) == Some(&VariableType::Number)
                && test.variables().next().is_none()
                && coerce_literal(test.value, VariableType::Number).is_none()
            {
                values.insert(name);
            }
        }
    }

    let mut violations: Vec<Violation> = variables
        .into_iter()
        .filter(|name| !declared.contains_key(*name))
        .map(|name| Violation::new(ViolationKind::Variable, name))
        .collect();

    violations.extend(
        values
            .into_iter()
            .map(|name| Violation::new(ViolationKind::Value, name)),
    );

    if !templates.is_empty() {
        let names: Vec<&str> = templates.iter().copied().collect();
        let existing = source.existing_names(&names);
        violations.extend(
            names
                .into_iter()
                .filter(|name| !existing.contains(*name))
                .map(|name| Violation::new(ViolationKind::Template, name)),
        );
    }

    violations
}
