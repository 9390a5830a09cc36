//! Input document shapes for domains, designs, and query batches.
//!
//! These mirror the on-disk JSON exactly; building a catalog out of them is
//! the loader's job and semantic validation is the checker's.

use serde::{Deserialize, Serialize};

/// A domain description: classes, associations, and generalizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainDocument {
    /// Domain name.
    pub name: String,
    /// Class declarations.
    pub classes: Vec<ClassDoc>,
    /// Association declarations.
    #[serde(default)]
    pub associations: Vec<AssociationDoc>,
    /// Generalization declarations.
    #[serde(default)]
    pub generalizations: Vec<GeneralizationDoc>,
}

/// One class with its instance count and attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDoc {
    /// Class name.
    pub name: String,
    /// Number of instances.
    pub count: u64,
    /// Attribute declarations.
    pub attributes: Vec<AttributeDoc>,
}

/// One attribute of a class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDoc {
    /// Attribute name.
    pub name: String,
    /// Data type name, e.g. `"String"` or `"Int64"`.
    pub data_type: String,
    /// Size, meaningful for strings.
    #[serde(default)]
    pub size: u32,
    /// Distinct value count.
    #[serde(default)]
    pub distinct_values: u64,
    /// Identifier flag.
    #[serde(default)]
    pub identifier: bool,
}

/// One binary association.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationDoc {
    /// Association name.
    pub name: String,
    /// The two ends.
    pub ends: Vec<EndDoc>,
}

/// One association end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndDoc {
    /// Referenced class name.
    pub class: String,
    /// Role name.
    pub role: String,
    /// Minimum multiplicity.
    #[serde(default)]
    pub min: u32,
    /// Maximum multiplicity; absent means unbounded.
    #[serde(default)]
    pub max: Option<u32>,
}

/// One generalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralizationDoc {
    /// Generalization name.
    pub name: String,
    /// Disjointness constraint.
    #[serde(default)]
    pub disjoint: bool,
    /// Completeness constraint.
    #[serde(default)]
    pub complete: bool,
    /// Superclass name.
    pub superclass: String,
    /// Subclasses with their discriminant predicates.
    pub subclasses: Vec<SubclassDoc>,
}

/// One subclass entry of a generalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubclassDoc {
    /// Subclass name.
    pub class: String,
    /// Discriminant predicate.
    pub constraint: String,
}

/// A design description: the hyperedges realizing a named domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    /// Design name.
    pub name: String,
    /// Name of the domain this design realizes.
    pub domain: String,
    /// Hyperedge declarations.
    pub hyperedges: Vec<HyperedgeDoc>,
}

/// One design hyperedge, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum HyperedgeDoc {
    /// A collection of structs (or a single class).
    Set {
        /// Set name.
        name: String,
        /// Member names (structs, or one class).
        contents: Vec<String>,
    },
    /// A typed record.
    Struct {
        /// Struct name.
        name: String,
        /// Anchor element names.
        anchor: Vec<String>,
        /// Remaining element names.
        elements: Vec<String>,
    },
}

impl HyperedgeDoc {
    /// Name of the declared hyperedge.
    pub fn name(&self) -> &str {
        match self {
            HyperedgeDoc::Set { name, .. } | HyperedgeDoc::Struct { name, .. } => name,
        }
    }

    /// Names this hyperedge refers to.
    pub fn references(&self) -> &[String] {
        match self {
            HyperedgeDoc::Set { contents, .. } => contents,
            HyperedgeDoc::Struct { elements, .. } => elements,
        }
    }
}

/// A batch of abstract queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDocument {
    /// Queries, run in order.
    pub queries: Vec<QueryDoc>,
}

/// One select-project-join query over the domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDoc {
    /// Attribute or role names to project.
    pub project: Vec<String>,
    /// Class and association names forming the join pattern.
    pub pattern: Vec<String>,
    /// Flat conjunctive filter, absent means `TRUE`.
    #[serde(default)]
    pub filter: Option<String>,
}
