//! Abstract query specification and the flat predicate language.
//!
//! Filters are conjunctions of atomic comparisons (`age>100 AND country='ES'`).
//! Subclass discriminant predicates use the same grammar, so both the checker
//! and the translator share this parser. General predicate algebra is out of
//! scope.

use crate::error::Error;
use crate::loader::QueryDoc;

/// A select-project-join query phrased against the domain.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// Attribute or association-end role names to project.
    pub project: Vec<String>,
    /// Class and association names forming the join pattern.
    pub pattern: Vec<String>,
    /// Flat conjunctive filter; empty means `TRUE`.
    pub filter: Option<String>,
}

impl QuerySpec {
    /// Build a query spec from parts.
    pub fn new(
        project: impl IntoIterator<Item = impl Into<String>>,
        pattern: impl IntoIterator<Item = impl Into<String>>,
        filter: Option<&str>,
    ) -> Self {
        Self {
            project: project.into_iter().map(Into::into).collect(),
            pattern: pattern.into_iter().map(Into::into).collect(),
            filter: filter.map(str::to_string),
        }
    }
}

impl From<QueryDoc> for QuerySpec {
    fn from(doc: QueryDoc) -> Self {
        Self {
            project: doc.project,
            pattern: doc.pattern,
            filter: doc.filter,
        }
    }
}

/// Comparison operator of an atomic predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// SQL spelling of the operator.
    pub fn as_sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// One atomic comparison between an attribute and a literal.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Attribute name on the left side.
    pub attribute: String,
    /// Comparison operator.
    pub op: CompareOp,
    /// Literal on the right side, kept verbatim (quotes included).
    pub literal: String,
}

/// Parse a flat conjunction of atomic comparisons.
///
/// An empty or `TRUE` input yields no predicates.
pub fn parse_conjunction(input: &str) -> Result<Vec<Predicate>, Error> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("true") {
        return Ok(Vec::new());
    }
    split_conjuncts(trimmed)
        .into_iter()
        .map(parse_comparison)
        .collect()
}

/// Attribute names referenced by a flat conjunction.
pub fn predicate_attributes(input: &str) -> Result<Vec<String>, Error> {
    let mut names: Vec<String> = Vec::new();
    for predicate in parse_conjunction(input)? {
        if !names.contains(&predicate.attribute) {
            names.push(predicate.attribute);
        }
    }
    Ok(names)
}

/// Split on top-level `AND`, respecting single-quoted literals.
fn split_conjuncts(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let bytes = input.as_bytes();
    let mut start = 0;
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\'' => in_quote = !in_quote,
            b'A' | b'a' if !in_quote => {
                let boundary_before = i == 0 || bytes[i - 1].is_ascii_whitespace();
                let is_and = bytes.len() >= i + 4
                    && bytes[i..i + 3].eq_ignore_ascii_case(b"and")
                    && bytes[i + 3].is_ascii_whitespace();
                if boundary_before && is_and {
                    parts.push(input[start..i].trim());
                    start = i + 3;
                    i += 3;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(input[start..].trim());
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_comparison(atom: &str) -> Result<Predicate, Error> {
    // Two-character operators first so `<=` is not read as `<`.
    for op in [
        ("<=", CompareOp::Le),
        (">=", CompareOp::Ge),
        ("<>", CompareOp::Ne),
        ("=", CompareOp::Eq),
        ("<", CompareOp::Lt),
        (">", CompareOp::Gt),
    ] {
        if let Some(pos) = find_outside_quotes(atom, op.0) {
            let attribute = atom[..pos].trim();
            let literal = atom[pos + op.0.len()..].trim();
            if attribute.is_empty() || literal.is_empty() {
                return Err(Error::Parse(format!("malformed comparison '{atom}'")));
            }
            if !attribute
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_')
            {
                return Err(Error::Parse(format!(
                    "left side of '{atom}' is not an attribute name"
                )));
            }
            return Ok(Predicate {
                attribute: attribute.to_string(),
                op: op.1,
                literal: literal.to_string(),
            });
        }
    }
    Err(Error::Parse(format!("no comparison operator in '{atom}'")))
}

fn find_outside_quotes(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut in_quote = false;
    let mut i = 0;
    while i + needle.len() <= bytes.len() {
        if bytes[i] == b'\'' {
            in_quote = !in_quote;
        } else if !in_quote && &bytes[i..i + needle.len()] == needle.as_bytes() {
            return Some(i);
        }
        i += 1;
    }
    None
}
