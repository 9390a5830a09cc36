//! Schema generation: compiles the installed design into DDL statements.
//!
//! The generator is parameterized by a physical paradigm. Statements come out
//! in a fixed order (creation in referential dependency order, then keys,
//! then the schema annotation) and are meant to run as one transactional
//! batch on the sink.

mod flat;
mod json_nested;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::catalog::{Catalog, EdgeId};
use crate::diag::Diagnostic;
use crate::error::Error;

/// Physical realization style of a design.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paradigm {
    /// Flat relational: one column per attribute.
    Flat,
    /// One document column per table, nested objects inside.
    JsonNested,
}

impl FromStr for Paradigm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "FLAT" => Ok(Paradigm::Flat),
            "JSON_NESTED" => Ok(Paradigm::JsonNested),
            other => Err(Error::Parse(format!("unknown paradigm '{other}'"))),
        }
    }
}

impl fmt::Display for Paradigm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Paradigm::Flat => write!(f, "FLAT"),
            Paradigm::JsonNested => write!(f, "JSON_NESTED"),
        }
    }
}

/// An ordered batch of statements plus the warnings produced along the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementBatch {
    /// Statements, in execution order.
    pub statements: Vec<String>,
    /// Warnings accumulated during generation.
    pub warnings: Vec<Diagnostic>,
}

impl StatementBatch {
    /// Append a statement.
    pub fn push(&mut self, statement: impl Into<String>) {
        self.statements.push(statement.into());
    }

    /// All statements joined into one script.
    pub fn script(&self) -> String {
        self.statements.join("\n")
    }
}

/// First-level sets ordered so foreign-key targets precede their referrers.
/// Independent sets keep their name order, which keeps output stable.
pub(crate) fn dependency_order(catalog: &Catalog) -> Vec<EdgeId> {
    let sets = catalog.first_level_sets();
    // `referenced[s]` holds the sets whose anchor `s` points at.
    let mut referenced: HashMap<EdgeId, Vec<EdgeId>> = HashMap::new();
    for &set in &sets {
        let targets = referenced.entry(set).or_default();
        for struct_id in catalog.structs_in(set) {
            for column in catalog.struct_columns(struct_id) {
                for &other in &sets {
                    if other == set {
                        continue;
                    }
                    if flat::is_anchor_identifier(catalog, other, column.attribute) {
                        targets.push(other);
                    }
                }
            }
        }
    }
    let mut ordered = Vec::with_capacity(sets.len());
    let mut placed: HashSet<EdgeId> = HashSet::new();
    while ordered.len() < sets.len() {
        let mut progress = false;
        for &set in &sets {
            if placed.contains(&set) {
                continue;
            }
            let ready = referenced
                .get(&set)
                .map(|deps| deps.iter().all(|d| placed.contains(d)))
                .unwrap_or(true);
            if ready {
                ordered.push(set);
                placed.insert(set);
                progress = true;
            }
        }
        if !progress {
            // Mutual references; fall back to name order for the rest.
            for &set in &sets {
                if placed.insert(set) {
                    ordered.push(set);
                }
            }
        }
    }
    ordered
}

/// Compiles a catalog's design into a DDL batch for one paradigm.
#[derive(Debug, Clone)]
pub struct SchemaGenerator {
    paradigm: Paradigm,
}

impl SchemaGenerator {
    /// Create a generator for the given paradigm.
    pub fn new(paradigm: Paradigm) -> Self {
        Self { paradigm }
    }

    /// The paradigm this generator compiles for.
    pub fn paradigm(&self) -> Paradigm {
        self.paradigm
    }

    /// Generate the full DDL batch: table creation in dependency order, key
    /// declarations, and the schema annotation.
    pub fn generate(&self, catalog: &Catalog) -> Result<StatementBatch, Error> {
        tracing::info!(paradigm = %self.paradigm, "generating schema");
        let mut batch = StatementBatch::default();
        let sets = dependency_order(catalog);
        match self.paradigm {
            Paradigm::Flat => {
                for &set in &sets {
                    batch.push(flat::create_table(catalog, set)?);
                }
                for &set in &sets {
                    batch.push(flat::add_primary_key(catalog, set)?);
                }
                for &set in &sets {
                    for statement in flat::add_foreign_keys(catalog, set, &sets) {
                        batch.push(statement);
                    }
                }
            }
            Paradigm::JsonNested => {
                for &set in &sets {
                    batch.push(json_nested::create_table(catalog, set));
                }
                for &set in &sets {
                    for statement in json_nested::add_keys(catalog, set)? {
                        batch.push(statement);
                    }
                }
                batch.warnings.push(Diagnostic::warning(
                    "document-foreign-keys",
                    "foreign keys cannot be declared over document columns; skipped",
                ));
            }
        }
        batch.push(annotation_statement(catalog, true, catalog.meta().has_data)?);
        Ok(batch)
    }
}

/// The `COMMENT ON SCHEMA` statement persisting the catalog annotation.
pub fn annotation_statement(
    catalog: &Catalog,
    tables_created: bool,
    has_data: bool,
) -> Result<String, Error> {
    let mut meta = catalog.meta().clone();
    meta.tables_created = tables_created;
    meta.has_data = has_data;
    let schema = meta.design.clone().unwrap_or_else(|| meta.domain.clone());
    let json = serde_json::to_string(&meta).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(format!("COMMENT ON SCHEMA {schema} IS '{json}';"))
}
