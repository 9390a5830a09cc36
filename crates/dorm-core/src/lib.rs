//! DORM Core - the catalog kernel for dynamic object-relational mapping.
//!
//! A conceptual domain model plus a chosen physical design compile into
//! schema DDL, rewritten select-project-join queries, and data-migration
//! plans, all derived from one typed hypergraph catalog.

pub mod catalog;
pub mod checker;
pub mod diag;
pub mod error;
pub mod loader;
pub mod migration;
pub mod query;
pub mod schema;
pub mod sink;

pub use catalog::{
    AssociationDef, AssociationEndDef, Atom, AtomId, AttributeDef, AttributeSpec, Catalog,
    CatalogMeta, ClassDef, DataType, DomainPath, EdgeId, ElementRef, EndSpec, GeneralizationDef,
    Hyperedge, Multiplicity, SetDef, StructDef,
};
pub use checker::Checker;
pub use diag::{CheckReport, Diagnostic, Severity};
pub use error::Error;
pub use loader::{DesignDocument, DomainDocument, QueryDocument};
pub use migration::MigrationPlanner;
pub use query::{QuerySpec, QueryTranslator, Translation};
pub use schema::{Paradigm, SchemaGenerator, StatementBatch};
pub use sink::{CancelToken, RecordingSink, Sink, SinkFailure};
