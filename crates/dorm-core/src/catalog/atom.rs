//! Domain atoms: classes, attributes, associations with their ends, and
//! generalizations.
//!
//! Atoms are value nodes held in the catalog arena and addressed by
//! [`AtomId`]; walkers hold indices, never owning references, which keeps the
//! naturally cyclic domain graph free of ownership cycles.

use std::fmt;
use std::str::FromStr;

use rkyv::{Archive, Deserialize, Serialize};

use crate::error::Error;

/// Stable index of an atom inside a catalog arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Archive, Serialize, Deserialize,
)]
pub struct AtomId(pub(crate) u32);

impl AtomId {
    /// Position of the atom in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Scalar data types carried by attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Variable-length character string (sized).
    String,
    /// Calendar date.
    Date,
    /// Timestamp.
    Timestamp,
}

impl DataType {
    /// SQL column type for this data type; `size` applies to strings only.
    pub fn sql_type(&self, size: u32) -> String {
        match self {
            DataType::Bool => "Boolean".into(),
            DataType::Int32 => "Integer".into(),
            DataType::Int64 => "BigInt".into(),
            DataType::Float64 => "Double Precision".into(),
            DataType::String => format!("VarChar({size})"),
            DataType::Date => "Date".into(),
            DataType::Timestamp => "Timestamp".into(),
        }
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "Bool" | "Boolean" => Ok(DataType::Bool),
            "Int32" | "Integer" => Ok(DataType::Int32),
            "Int64" | "BigInt" => Ok(DataType::Int64),
            "Float64" | "Double" => Ok(DataType::Float64),
            "String" => Ok(DataType::String),
            "Date" => Ok(DataType::Date),
            "Timestamp" => Ok(DataType::Timestamp),
            other => Err(Error::Parse(format!("unknown data type '{other}'"))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Bool => "Bool",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float64 => "Float64",
            DataType::String => "String",
            DataType::Date => "Date",
            DataType::Timestamp => "Timestamp",
        };
        write!(f, "{name}")
    }
}

/// Multiplicity of an association end as a `(min, max)` pair.
///
/// `max == None` means unbounded ("many").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct Multiplicity {
    /// Minimum number of linked instances.
    pub min: u32,
    /// Maximum number of linked instances; `None` is unbounded.
    pub max: Option<u32>,
}

impl Multiplicity {
    /// Exactly one (`1..1`).
    pub fn one() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Zero or one (`0..1`).
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// One or more (`1..*`).
    pub fn some() -> Self {
        Self { min: 1, max: None }
    }

    /// Zero or more (`0..*`).
    pub fn many() -> Self {
        Self { min: 0, max: None }
    }

    /// True when at most one instance can be linked.
    pub fn at_most_one(&self) -> bool {
        matches!(self.max, Some(max) if max <= 1)
    }

    /// True when at least one instance must be linked.
    pub fn at_least_one(&self) -> bool {
        self.min >= 1
    }
}

/// A class: a named population of instances with owned attributes.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct ClassDef {
    /// Class name (globally unique).
    pub name: String,
    /// Number of instances (cardinality).
    pub count: u64,
    /// Owned attributes, in declaration order.
    pub attributes: Vec<AtomId>,
    /// Direct superclass, if the class is a subclass in some generalization.
    pub superclass: Option<AtomId>,
}

/// An attribute owned by exactly one class.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct AttributeDef {
    /// Attribute name (globally unique).
    pub name: String,
    /// Owning class.
    pub owner: AtomId,
    /// Data type.
    pub data_type: DataType,
    /// Size, meaningful for strings.
    pub size: u32,
    /// Number of distinct values across the owning class.
    pub distinct_values: u64,
    /// Whether this attribute identifies instances of the owning class.
    pub identifier: bool,
}

/// One end of a binary association.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct AssociationEndDef {
    /// Role name (globally unique; this is the end's atom name).
    pub role: String,
    /// Referenced class.
    pub class: AtomId,
    /// Multiplicity seen from the opposite end.
    pub multiplicity: Multiplicity,
}

/// A binary association between two classes.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct AssociationDef {
    /// Association name (globally unique).
    pub name: String,
    /// The two ends. Stored as a list so a malformed catalog can still be
    /// represented and reported by the checker.
    pub ends: Vec<AtomId>,
}

/// A subclass entry of a generalization.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SubclassBranch {
    /// The subclass.
    pub class: AtomId,
    /// Discriminant predicate selecting instances of this subclass.
    pub constraint: String,
}

/// A generalization: one superclass specialized into subclasses.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct GeneralizationDef {
    /// Generalization name (globally unique).
    pub name: String,
    /// The superclass.
    pub superclass: AtomId,
    /// Subclasses with their discriminant predicates.
    pub branches: Vec<SubclassBranch>,
    /// Whether subclasses are pairwise disjoint.
    pub disjoint: bool,
    /// Whether the subclasses cover the superclass population.
    pub complete: bool,
}

/// A domain atom. One closed sum; every algorithm dispatches by case.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum Atom {
    /// A class.
    Class(ClassDef),
    /// An attribute.
    Attribute(AttributeDef),
    /// An association end.
    AssociationEnd(AssociationEndDef),
    /// A binary association.
    Association(AssociationDef),
    /// A generalization.
    Generalization(GeneralizationDef),
}

impl Atom {
    /// The atom's globally unique name (the role name for ends).
    pub fn name(&self) -> &str {
        match self {
            Atom::Class(c) => &c.name,
            Atom::Attribute(a) => &a.name,
            Atom::AssociationEnd(e) => &e.role,
            Atom::Association(a) => &a.name,
            Atom::Generalization(g) => &g.name,
        }
    }

    /// Short kind label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Atom::Class(_) => "class",
            Atom::Attribute(_) => "attribute",
            Atom::AssociationEnd(_) => "association end",
            Atom::Association(_) => "association",
            Atom::Generalization(_) => "generalization",
        }
    }

    /// Downcast to a class definition.
    pub fn as_class(&self) -> Option<&ClassDef> {
        match self {
            Atom::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Downcast to an attribute definition.
    pub fn as_attribute(&self) -> Option<&AttributeDef> {
        match self {
            Atom::Attribute(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast to an association-end definition.
    pub fn as_end(&self) -> Option<&AssociationEndDef> {
        match self {
            Atom::AssociationEnd(e) => Some(e),
            _ => None,
        }
    }

    /// Downcast to an association definition.
    pub fn as_association(&self) -> Option<&AssociationDef> {
        match self {
            Atom::Association(a) => Some(a),
            _ => None,
        }
    }

    /// Downcast to a generalization definition.
    pub fn as_generalization(&self) -> Option<&GeneralizationDef> {
        match self {
            Atom::Generalization(g) => Some(g),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parse_and_sql() {
        assert_eq!("String".parse::<DataType>().unwrap(), DataType::String);
        assert_eq!("Integer".parse::<DataType>().unwrap(), DataType::Int32);
        assert!("Blob".parse::<DataType>().is_err());

        assert_eq!(DataType::String.sql_type(40), "VarChar(40)");
        assert_eq!(DataType::Int64.sql_type(0), "BigInt");
    }

    #[test]
    fn test_multiplicity_bounds() {
        assert!(Multiplicity::one().at_most_one());
        assert!(Multiplicity::one().at_least_one());
        assert!(Multiplicity::optional().at_most_one());
        assert!(!Multiplicity::optional().at_least_one());
        assert!(!Multiplicity::many().at_most_one());
        assert!(Multiplicity::some().at_least_one());
    }
}
