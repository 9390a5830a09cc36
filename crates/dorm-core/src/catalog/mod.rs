//! The typed hypergraph catalog for DORM.
//!
//! The catalog holds the domain atoms (classes, attributes, associations,
//! generalizations) and the design hyperedges (structs and sets) in one
//! arena, and exposes the traversal primitives shared by the schema
//! generator, the query translator, and the migration planner.

mod atom;
#[allow(clippy::module_inception)]
mod catalog;
mod edge;
mod traverse;

pub use atom::{
    AssociationDef, AssociationEndDef, Atom, AtomId, AttributeDef, ClassDef, DataType,
    GeneralizationDef, Multiplicity, SubclassBranch,
};
pub use catalog::{AttributeSpec, Catalog, CatalogMeta, EndSpec};
pub use edge::{EdgeId, ElementRef, Hyperedge, SetDef, StructDef};
pub use traverse::{ContainerHop, DomainPath, StructColumn};
