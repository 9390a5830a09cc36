//! Design hyperedges: structs (typed records) and sets (collections).

use rkyv::{Archive, Deserialize, Serialize};

use super::atom::AtomId;

/// Stable index of a hyperedge inside a catalog arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Archive, Serialize, Deserialize,
)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Position of the hyperedge in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A reference from a hyperedge to either an atom or another hyperedge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub enum ElementRef {
    /// A domain atom.
    Atom(AtomId),
    /// Another design hyperedge (a nested struct or set).
    Edge(EdgeId),
}

/// A typed record: elements grouped around a distinguished anchor.
///
/// Anchor and non-anchor elements are stored separately; the checker enforces
/// that they are disjoint and jointly connected.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct StructDef {
    /// Struct name (globally unique).
    pub name: String,
    /// The identity-defining elements, in declaration order.
    pub anchor: Vec<ElementRef>,
    /// The remaining elements, in declaration order.
    pub elements: Vec<ElementRef>,
}

impl StructDef {
    /// Anchor elements followed by the non-anchor elements.
    pub fn all_elements(&self) -> impl Iterator<Item = ElementRef> + '_ {
        self.anchor.iter().chain(self.elements.iter()).copied()
    }
}

/// A collection of structs (or, degenerately, a single class).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SetDef {
    /// Set name (globally unique).
    pub name: String,
    /// Members, in declaration order.
    pub contents: Vec<ElementRef>,
}

/// A design hyperedge. One closed sum; every algorithm dispatches by case.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub enum Hyperedge {
    /// A typed record.
    Struct(StructDef),
    /// A collection.
    Set(SetDef),
}

impl Hyperedge {
    /// The hyperedge's globally unique name.
    pub fn name(&self) -> &str {
        match self {
            Hyperedge::Struct(s) => &s.name,
            Hyperedge::Set(s) => &s.name,
        }
    }

    /// Short kind label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Hyperedge::Struct(_) => "struct",
            Hyperedge::Set(_) => "set",
        }
    }

    /// Downcast to a struct definition.
    pub fn as_struct(&self) -> Option<&StructDef> {
        match self {
            Hyperedge::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Downcast to a set definition.
    pub fn as_set(&self) -> Option<&SetDef> {
        match self {
            Hyperedge::Set(s) => Some(s),
            _ => None,
        }
    }

    /// Direct element references of this hyperedge.
    pub fn members(&self) -> Vec<ElementRef> {
        match self {
            Hyperedge::Struct(s) => s.all_elements().collect(),
            Hyperedge::Set(s) => s.contents.clone(),
        }
    }
}
