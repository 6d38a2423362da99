//! Tokenizer for template content.
//!
//! Recognizes three token kinds inside otherwise literal text:
//! - variable references: `{name}`
//! - embedded template references: `#name#`
//! - conditional blocks: `[if name]...[else]...[fi]` or
//!   `[if name op value]...[else]...[fi]`, with the `[else]` part optional
//!
//! Names are `[A-Za-z_]+` and matching is case-sensitive. Conditional blocks do
//! not nest: the branches of a block are scanned for variables and embedded
//! templates only, so an inner `[if ...]` stays literal text.
//!
//! Tokenizing happens once over the raw text, which means a value substituted
//! for one token is never re-scanned for another.

use std::collections::BTreeSet;
use std::fmt;

/// A single piece of tokenized content, borrowing from the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'a> {
    /// Literal text, emitted as-is
    Text(&'a str),
    /// `{name}`
    Variable(&'a str),
    /// `#name#`
    Embed(&'a str),
    /// `[if ...]...[fi]`
    Conditional(Conditional<'a>),
}

/// Comparison operator of a conditional test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "eq" => Some(Operator::Eq),
            "ne" => Some(Operator::Ne),
            "lt" => Some(Operator::Lt),
            "le" => Some(Operator::Le),
            "gt" => Some(Operator::Gt),
            "ge" => Some(Operator::Ge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `op value` part of `[if name op value]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Test<'a> {
    pub op: Operator,
    /// Literal text of the value, trimmed
    pub value: &'a str,
}

impl<'a> Test<'a> {
    /// Names referenced as `{name}` inside the value
    pub fn variables(&self) -> impl Iterator<Item = &'a str> {
        tokenize_variables(self.value)
            .into_iter()
            .filter_map(|node| match node {
                Node::Variable(name) => Some(name),
                _ => None,
            })
    }
}

/// One branch of a conditional block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch<'a> {
    pub source: &'a str,
    pub nodes: Vec<Node<'a>>,
}

impl<'a> Branch<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            nodes: scan(source, Mode::Branch),
        }
    }
}

/// A conditional block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conditional<'a> {
    /// Variable under test
    pub variable: &'a str,
    pub test: Option<Test<'a>>,
    pub consequent: Branch<'a>,
    pub alternate: Option<Branch<'a>>,
    /// The whole block, from `[if` through `[fi]`
    pub source: &'a str,
}

const ELSE_TAG: &str = "[else]";
const FI_TAG: &str = "[fi]";

/// Which token kinds a scan recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Full,
    /// Inside a conditional branch, no nested blocks
    Branch,
    Variables,
}

/// Tokenize content into a flat sequence of nodes
pub fn tokenize(text: &str) -> Vec<Node<'_>> {
    scan(text, Mode::Full)
}

/// Tokenize recognizing only `{name}` references, everything else is text
pub fn tokenize_variables(text: &str) -> Vec<Node<'_>> {
    scan(text, Mode::Variables)
}

fn scan(text: &str, mode: Mode) -> Vec<Node<'_>> {
    let bytes = text.as_bytes();
    let mut nodes = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let matched = match bytes[i] {
            b'{' => delimited_name(bytes, i, b'}')
                .map(|end| (Node::Variable(&text[i + 1..end - 1]), end)),
            b'#' if mode != Mode::Variables => delimited_name(bytes, i, b'#')
                .map(|end| (Node::Embed(&text[i + 1..end - 1]), end)),
            b'[' if mode == Mode::Full => {
                conditional(text, i).map(|(block, end)| (Node::Conditional(block), end))
            }
            _ => None,
        };

        match matched {
            Some((node, end)) => {
                if literal_start < i {
                    nodes.push(Node::Text(&text[literal_start..i]));
                }
                nodes.push(node);
                i = end;
                literal_start = end;
            }
            None => i += 1,
        }
    }

    if literal_start < bytes.len() {
        nodes.push(Node::Text(&text[literal_start..]));
    }

    nodes
}

/// End of the `[A-Za-z_]*` run starting at `start`
fn name_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_alphabetic() || bytes[end] == b'_') {
        end += 1;
    }
    end
}

fn whitespace_end(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
        end += 1;
    }
    end
}

/// Matches `<open>name<close>` at `start`, returning the index past `close`
fn delimited_name(bytes: &[u8], start: usize, close: u8) -> Option<usize> {
    let end = name_end(bytes, start + 1);
    (end > start + 1 && bytes.get(end) == Some(&close)).then_some(end + 1)
}

/// Matches a full conditional block at `start`, returning it and the index past `[fi]`
fn conditional(text: &str, start: usize) -> Option<(Conditional<'_>, usize)> {
    let bytes = text.as_bytes();
    let rest = &text[start..];
    if !rest.starts_with("[if") {
        return None;
    }

    // [if <ws> name
    let after_if = start + 3;
    let name_start = whitespace_end(bytes, after_if);
    if name_start == after_if {
        return None;
    }
    let name_stop = name_end(bytes, name_start);
    if name_stop == name_start {
        return None;
    }
    let variable = &text[name_start..name_stop];

    // either ] or <ws> op <ws> value ]
    let after_name = whitespace_end(bytes, name_stop);
    let (test, tag_end) = if bytes.get(after_name) == Some(&b']') {
        (None, after_name + 1)
    } else {
        if after_name == name_stop {
            return None;
        }
        let op_stop = name_end(bytes, after_name);
        let op = Operator::parse(&text[after_name..op_stop])?;
        let value_start = whitespace_end(bytes, op_stop);
        if value_start == op_stop {
            return None;
        }
        let close = value_start + text[value_start..].find(']')?;
        let value = text[value_start..close].trim();
        if value.is_empty() {
            return None;
        }
        (Some(Test { op, value }), close + 1)
    };

    // consequent runs to the first [else] or [fi]
    let body = &text[tag_end..];
    let fi = body.find(FI_TAG)?;
    let (consequent, alternate, block_end) = match body.find(ELSE_TAG) {
        Some(else_at) if else_at < fi => {
            let alt_start = else_at + ELSE_TAG.len();
            let alt_fi = alt_start + body[alt_start..].find(FI_TAG)?;
            (
                &body[..else_at],
                Some(&body[alt_start..alt_fi]),
                tag_end + alt_fi + FI_TAG.len(),
            )
        }
        _ => (&body[..fi], None, tag_end + fi + FI_TAG.len()),
    };

    Some((
        Conditional {
            variable,
            test,
            consequent: Branch::new(consequent),
            alternate: alternate.map(Branch::new),
            source: &text[start..block_end],
        },
        block_end,
    ))
}

/// Every name referenced by a piece of content
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct References<'a> {
    /// Names used as `{name}`
    pub variables: BTreeSet<&'a str>,
    /// Names used as `#name#`
    pub templates: BTreeSet<&'a str>,
    /// Conditional blocks in order of appearance
    pub conditions: Vec<(&'a str, Option<Test<'a>>)>,
}

impl<'a> References<'a> {
    /// Collect references from raw content
    pub fn scan(text: &'a str) -> Self {
        let mut refs = Self::default();
        refs.collect(&tokenize(text));
        refs
    }

    fn collect(&mut self, nodes: &[Node<'a>]) {
        for node in nodes {
            match node {
                Node::Text(_) => {}
                Node::Variable(name) => {
                    self.variables.insert(*name);
                }
                Node::Embed(name) => {
                    self.templates.insert(*name);
                }
                Node::Conditional(block) => {
                    self.conditions.push((block.variable, block.test));
                    if let Some(test) = &block.test {
                        self.variables.extend(test.variables());
                    }
                    self.collect(&block.consequent.nodes);
                    if let Some(alternate) = &block.alternate {
                        self.collect(&alternate.nodes);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_single_node() {
        assert_eq!(tokenize("Hello there"), vec![Node::Text("Hello there")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_variables_and_embeds() {
        assert_eq!(
            tokenize("Hi {first_name}, #signoff#!"),
            vec![
                Node::Text("Hi "),
                Node::Variable("first_name"),
                Node::Text(", "),
                Node::Embed("signoff"),
                Node::Text("!"),
            ]
        );
    }

    #[test]
    fn test_invalid_names_stay_literal() {
        assert_eq!(tokenize("{1} {} #a b# {a-b}"), vec![Node::Text("{1} {} #a b# {a-b}")]);
    }

    #[test]
    fn test_hash_runs_do_not_overlap() {
        assert_eq!(
            tokenize("#a#b#"),
            vec![Node::Embed("a"), Node::Text("b#")]
        );
    }

    #[test]
    fn test_conditional_without_test() {
        let nodes = tokenize("[if flag]A[else]B[fi]");
        assert_eq!(nodes.len(), 1);
        let Node::Conditional(block) = &nodes[0] else {
            panic!("expected conditional");
        };
        assert_eq!(block.variable, "flag");
        assert!(block.test.is_none());
        assert_eq!(block.consequent.source, "A");
        assert_eq!(block.alternate.as_ref().map(|b| b.source), Some("B"));
        assert_eq!(block.source, "[if flag]A[else]B[fi]");
    }

    #[test]
    fn test_conditional_with_test_and_multiline_body() {
        let nodes = tokenize("x [if age ge 18]Adult\n{name}[fi] y");
        let Node::Conditional(block) = &nodes[1] else {
            panic!("expected conditional");
        };
        assert_eq!(
            block.test,
            Some(Test {
                op: Operator::Ge,
                value: "18"
            })
        );
        assert_eq!(
            block.consequent.nodes,
            vec![Node::Text("Adult\n"), Node::Variable("name")]
        );
        assert!(block.alternate.is_none());
        assert_eq!(nodes[2], Node::Text(" y"));
    }

    #[test]
    fn test_value_runs_to_closing_bracket() {
        let nodes = tokenize("[if city eq New York ]NY[fi]");
        let Node::Conditional(block) = &nodes[0] else {
            panic!("expected conditional");
        };
        assert_eq!(block.test.map(|t| t.value), Some("New York"));
    }

    #[test]
    fn test_unterminated_or_malformed_blocks_stay_literal() {
        for text in [
            "[if flag]never closed",
            "[if flag]A[else]B",
            "[if flag is 3]A[fi]",
            "[IF flag]A[fi]",
            "[ifflag]A[fi]",
            "[if 9]A[fi]",
        ] {
            assert!(
                tokenize(text)
                    .iter()
                    .all(|n| !matches!(n, Node::Conditional(_))),
                "{text} should not be a conditional"
            );
        }
    }

    #[test]
    fn test_conditionals_do_not_nest() {
        let nodes = tokenize("[if a]x[if b]y[fi]z[fi]");
        let Node::Conditional(block) = &nodes[0] else {
            panic!("expected conditional");
        };
        assert_eq!(block.consequent.source, "x[if b]y");
        assert_eq!(nodes[1], Node::Text("z[fi]"));
    }

    #[test]
    fn test_references_cover_branches() {
        let refs = References::scan("{a} #one# [if b eq 2]{c} #two#[else]{d}[fi] {a}");
        assert_eq!(refs.variables.into_iter().collect::<Vec<_>>(), vec!["a", "c", "d"]);
        assert_eq!(refs.templates.into_iter().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(refs.conditions.len(), 1);
        assert_eq!(refs.conditions[0].0, "b");
    }

    #[test]
    fn test_references_include_test_value_variables() {
        let refs = References::scan("[if plan eq {target}]same[fi]");
        assert_eq!(refs.variables.into_iter().collect::<Vec<_>>(), vec!["target"]);
        assert_eq!(refs.conditions[0].1.map(|t| t.value), Some("{target}"));
    }

    #[test]
    fn test_variables_only_scan() {
        assert_eq!(
            tokenize_variables("#a# [if b]{c}[fi]"),
            vec![
                Node::Text("#a# [if b]"),
                Node::Variable("c"),
                Node::Text("[fi]"),
            ]
        );
    }

    #[test]
    fn test_non_ascii_text_is_preserved() {
        assert_eq!(
            tokenize("Olá {nome} ✓"),
            vec![Node::Text("Olá "), Node::Variable("nome"), Node::Text(" ✓")]
        );
    }
}
