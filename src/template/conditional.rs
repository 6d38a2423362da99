//! Conditional block evaluation.
//!
//! `[if name]` tests whether `name` is bound to a truthy value. With a test,
//! `[if name op value]` compares the bound value against `value` after coercing
//! the literal to the variable's type: the declared type when the owning
//! template declares one, otherwise the runtime type of the bound value.
//! `$EMPTY` and `$NULL` stand for the empty string and null and are never
//! coerced.

use std::borrow::Cow;
use std::cmp::Ordering;

use serde_json::Value;

use super::diagnostic::Diagnostic;
use super::lexer::{tokenize, tokenize_variables, Branch, Conditional, Node, Operator};
use super::substitution::resolve_variable;
use super::types::{Bindings, VariableType};

const EMPTY_LITERAL: &str = "$EMPTY";
const NULL_LITERAL: &str = "$NULL";

/// A value on either side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    /// Arrays and objects, only ever equal to themselves
    Json(Value),
}

impl Operand {
    fn natural(value: &Value) -> Self {
        match value {
            Value::Null => Operand::Null,
            Value::Bool(b) => Operand::Bool(*b),
            Value::Number(n) => n.as_f64().map(Operand::Number).unwrap_or(Operand::Null),
            Value::String(s) => Operand::Text(s.clone()),
            other => Operand::Json(other.clone()),
        }
    }

    /// The bound side, nudged toward the declared type where it converts cleanly
    fn bound(value: &Value, declared: VariableType) -> Self {
        match (declared, value) {
            (VariableType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Operand::Number)
                .unwrap_or_else(|| Operand::natural(value)),
            (VariableType::Boolean, Value::String(s)) => Operand::Bool(parse_bool(s)),
            (VariableType::Boolean, Value::Number(n)) => {
                Operand::Bool(n.as_f64().is_some_and(|f| f != 0.0))
            }
            (VariableType::String, Value::Number(n)) => Operand::Text(n.to_string()),
            (VariableType::String, Value::Bool(b)) => Operand::Text(b.to_string()),
            _ => Operand::natural(value),
        }
    }
}

/// Lenient boolean parsing: `true`, `t`, `yes`, `y`, `on`, `x` and `1` are true,
/// anything else is false
pub fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "on" | "x" | "1"
    )
}

/// Python-style truthiness of a bound value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Type a literal is coerced to when compared against `bound`
fn coercion_target(declared: VariableType, bound: &Value) -> VariableType {
    match declared {
        VariableType::Any => match bound {
            Value::Bool(_) => VariableType::Boolean,
            Value::Number(_) => VariableType::Number,
            _ => VariableType::String,
        },
        declared => declared,
    }
}

/// Coerce the literal text of a test value, `None` if it cannot be
pub fn coerce_literal(literal: &str, target: VariableType) -> Option<Operand> {
    match literal {
        EMPTY_LITERAL => return Some(Operand::Text(String::new())),
        NULL_LITERAL => return Some(Operand::Null),
        _ => {}
    }

    match target {
        VariableType::Boolean => Some(Operand::Bool(parse_bool(literal))),
        VariableType::Number => literal
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Operand::Number),
        VariableType::String | VariableType::Any => Some(Operand::Text(literal.to_string())),
    }
}

/// The test value with each `{name}` replaced by its bound value, trimmed
fn resolved_value<'v>(value: &'v str, bindings: &Bindings) -> Result<Cow<'v, str>, Diagnostic> {
    if !value.contains('{') {
        return Ok(Cow::Borrowed(value));
    }

    let mut out = String::with_capacity(value.len());
    for node in tokenize_variables(value) {
        match node {
            Node::Text(s) => out.push_str(s),
            Node::Variable(name) => out.push_str(&resolve_variable(name, bindings)?),
            // Not produced by a variable scan
            Node::Embed(_) | Node::Conditional(_) => {}
        }
    }

    Ok(Cow::Owned(out.trim().to_string()))
}

/// Apply `op` between two operands. Ordering operators only hold between two
/// numbers or two strings, any other pairing compares false.
pub fn compare(op: Operator, left: &Operand, right: &Operand) -> bool {
    let ordering = match (left, right) {
        (Operand::Number(a), Operand::Number(b)) => a.partial_cmp(b),
        (Operand::Text(a), Operand::Text(b)) => Some(a.cmp(b)),
        _ => None,
    };

    match op {
        Operator::Eq => left == right,
        Operator::Ne => left != right,
        Operator::Lt => ordering == Some(Ordering::Less),
        Operator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Operator::Gt => ordering == Some(Ordering::Greater),
        Operator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
    }
}

/// Pick the branch of `block` to output.
///
/// `{name}` references in the test value are substituted first. `Ok(None)`
/// means the test failed and there is no `[else]`. An unbound variable under an
/// operator test or inside its value, or a value that cannot be coerced, yields
/// the diagnostic whose marker replaces the whole block.
pub fn select<'b, 'a>(
    block: &'b Conditional<'a>,
    bindings: &Bindings,
    declared: VariableType,
) -> Result<Option<&'b Branch<'a>>, Diagnostic> {
    let bound = bindings.get(block.variable);

    let passed = match (&block.test, bound) {
        (None, bound) => bound.is_some_and(is_truthy),
        (Some(_), None) => {
            return Err(Diagnostic::InvalidConditionalVariable {
                name: block.variable.to_string(),
            })
        }
        (Some(test), Some(bound)) => {
            let target = coercion_target(declared, bound);
            let value = resolved_value(test.value, bindings)?;
            let literal = coerce_literal(&value, target).ok_or_else(|| {
                Diagnostic::InvalidConditionalValue {
                    name: block.variable.to_string(),
                    value: value.to_string(),
                }
            })?;
            compare(test.op, &Operand::bound(bound, declared), &literal)
        }
    };

    Ok(if passed {
        Some(&block.consequent)
    } else {
        block.alternate.as_ref()
    })
}

/// Evaluate every conditional block in `text`, leaving all other text as-is.
///
/// Meant to run after [`substitute`](super::substitution::substitute), so the
/// chosen branch is output verbatim.
pub fn evaluate(text: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(text.len());

    for node in tokenize(text) {
        match node {
            Node::Text(s) => out.push_str(s),
            Node::Variable(name) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            Node::Embed(name) => {
                out.push('#');
                out.push_str(name);
                out.push('#');
            }
            Node::Conditional(block) => match select(&block, bindings, VariableType::Any) {
                Ok(Some(branch)) => out.push_str(branch.source),
                Ok(None) => {}
                Err(diagnostic) => out.push_str(&diagnostic.marker()),
            },
        }
    }

    out
}
