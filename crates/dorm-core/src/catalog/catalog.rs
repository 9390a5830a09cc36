//! The catalog arena: exclusive owner of all atoms and hyperedges.
//!
//! A catalog is built once (by the loader or by tests), checked read-only,
//! then consumed by the compilers. Compiler results hold weak, name-based
//! references; the catalog outlives every one of them. Persistence is by
//! value: a catalog serializes to a self-contained blob.

use std::collections::HashMap;

use rkyv::{Archive, Deserialize, Serialize};

use super::atom::{
    AssociationDef, AssociationEndDef, Atom, AtomId, AttributeDef, ClassDef, DataType,
    GeneralizationDef, Multiplicity, SubclassBranch,
};
use super::edge::{EdgeId, ElementRef, Hyperedge, SetDef, StructDef};
use crate::error::Error;

/// Annotation persisted alongside a schema so later invocations can tell
/// which domain and design produced it and whether it holds data.
#[derive(
    Debug, Clone, PartialEq, Archive, Serialize, Deserialize, serde::Serialize, serde::Deserialize,
)]
pub struct CatalogMeta {
    /// Name of the domain this catalog describes.
    pub domain: String,
    /// Name of the installed design, if any.
    pub design: Option<String>,
    /// Whether the schema has been created on the sink.
    pub tables_created: bool,
    /// Whether the schema holds data; migration refuses sources without it.
    pub has_data: bool,
}

impl CatalogMeta {
    /// Annotation for a freshly loaded domain.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            design: None,
            tables_created: false,
            has_data: false,
        }
    }
}

/// Specification of one attribute when adding a class.
#[derive(Debug, Clone)]
pub struct AttributeSpec {
    /// Attribute name.
    pub name: String,
    /// Data type.
    pub data_type: DataType,
    /// Size (strings).
    pub size: u32,
    /// Distinct value count.
    pub distinct_values: u64,
    /// Identifier flag.
    pub identifier: bool,
}

impl AttributeSpec {
    /// Create a plain attribute.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            size: 0,
            distinct_values: 0,
            identifier: false,
        }
    }

    /// Set the size.
    pub fn with_size(mut self, size: u32) -> Self {
        self.size = size;
        self
    }

    /// Set the distinct-values count.
    pub fn with_distinct(mut self, distinct_values: u64) -> Self {
        self.distinct_values = distinct_values;
        self
    }

    /// Mark as the identifier of its class.
    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }
}

/// Specification of one association end when adding an association.
#[derive(Debug, Clone)]
pub struct EndSpec {
    /// Referenced class name.
    pub class: String,
    /// Role name of the end.
    pub role: String,
    /// Multiplicity.
    pub multiplicity: Multiplicity,
}

impl EndSpec {
    /// Create an end.
    pub fn new(
        class: impl Into<String>,
        role: impl Into<String>,
        multiplicity: Multiplicity,
    ) -> Self {
        Self {
            class: class.into(),
            role: role.into(),
            multiplicity,
        }
    }
}

/// The typed hypergraph holding one domain and at most one design.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct Catalog {
    pub(crate) atoms: Vec<Atom>,
    pub(crate) edges: Vec<Hyperedge>,
    atom_names: HashMap<String, AtomId>,
    edge_names: HashMap<String, EdgeId>,
    meta: CatalogMeta,
}

impl Catalog {
    /// Create an empty catalog for the named domain.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            atoms: Vec::new(),
            edges: Vec::new(),
            atom_names: HashMap::new(),
            edge_names: HashMap::new(),
            meta: CatalogMeta::new(domain),
        }
    }

    /// The persisted annotation of this catalog.
    pub fn meta(&self) -> &CatalogMeta {
        &self.meta
    }

    /// Mutable access to the annotation.
    pub fn meta_mut(&mut self) -> &mut CatalogMeta {
        &mut self.meta
    }

    /// The atom behind an id.
    pub fn atom(&self, id: AtomId) -> &Atom {
        &self.atoms[id.index()]
    }

    /// The hyperedge behind an id.
    pub fn edge(&self, id: EdgeId) -> &Hyperedge {
        &self.edges[id.index()]
    }

    /// Resolve an atom name, failing with [`Error::UnknownName`].
    pub fn atom_named(&self, name: &str) -> Result<AtomId, Error> {
        self.lookup_atom(name)
            .ok_or_else(|| Error::UnknownName(name.to_string()))
    }

    /// Resolve a hyperedge name, failing with [`Error::UnknownName`].
    pub fn edge_named(&self, name: &str) -> Result<EdgeId, Error> {
        self.lookup_edge(name)
            .ok_or_else(|| Error::UnknownName(name.to_string()))
    }

    /// Resolve an atom name if present.
    pub fn lookup_atom(&self, name: &str) -> Option<AtomId> {
        self.atom_names.get(name).copied()
    }

    /// Resolve a hyperedge name if present.
    pub fn lookup_edge(&self, name: &str) -> Option<EdgeId> {
        self.edge_names.get(name).copied()
    }

    /// Resolve a name that may denote an atom or a hyperedge.
    pub fn element_named(&self, name: &str) -> Result<ElementRef, Error> {
        if let Some(id) = self.lookup_atom(name) {
            Ok(ElementRef::Atom(id))
        } else if let Some(id) = self.lookup_edge(name) {
            Ok(ElementRef::Edge(id))
        } else {
            Err(Error::UnknownName(name.to_string()))
        }
    }

    /// All atoms with their ids, in arena order.
    pub fn atoms(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms
            .iter()
            .enumerate()
            .map(|(i, a)| (AtomId(i as u32), a))
    }

    /// All hyperedges with their ids, in arena order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Hyperedge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeId(i as u32), e))
    }

    /// True when the catalog holds no atoms at all.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    fn name_in_use(&self, name: &str) -> bool {
        self.atom_names.contains_key(name) || self.edge_names.contains_key(name)
    }

    /// Insert an atom without structural validation. The name index keeps the
    /// first binding, so the checker can still see and report duplicates.
    pub(crate) fn push_atom(&mut self, atom: Atom) -> AtomId {
        let id = AtomId(self.atoms.len() as u32);
        self.atom_names.entry(atom.name().to_string()).or_insert(id);
        self.atoms.push(atom);
        id
    }

    /// Insert a hyperedge without structural validation.
    pub(crate) fn push_edge(&mut self, edge: Hyperedge) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.edge_names.entry(edge.name().to_string()).or_insert(id);
        self.edges.push(edge);
        id
    }

    /// Add a class together with its attributes.
    pub fn add_class(
        &mut self,
        name: impl Into<String>,
        count: u64,
        attributes: Vec<AttributeSpec>,
    ) -> Result<AtomId, Error> {
        let name = name.into();
        if self.name_in_use(&name) {
            return Err(Error::Parse(format!("an element called '{name}' already exists")));
        }
        for spec in &attributes {
            if self.name_in_use(&spec.name) {
                return Err(Error::Parse(format!(
                    "an element called '{}' already exists",
                    spec.name
                )));
            }
        }
        tracing::debug!(class = %name, "adding class");
        let class_id = self.push_atom(Atom::Class(ClassDef {
            name,
            count,
            attributes: Vec::new(),
            superclass: None,
        }));
        let mut attr_ids = Vec::with_capacity(attributes.len());
        for spec in attributes {
            attr_ids.push(self.push_atom(Atom::Attribute(AttributeDef {
                name: spec.name,
                owner: class_id,
                data_type: spec.data_type,
                size: spec.size,
                distinct_values: spec.distinct_values,
                identifier: spec.identifier,
            })));
        }
        if let Atom::Class(class) = &mut self.atoms[class_id.index()] {
            class.attributes = attr_ids;
        }
        Ok(class_id)
    }

    /// Add a binary association between two existing classes.
    pub fn add_association(
        &mut self,
        name: impl Into<String>,
        ends: Vec<EndSpec>,
    ) -> Result<AtomId, Error> {
        let name = name.into();
        if self.name_in_use(&name) {
            return Err(Error::Parse(format!("an element called '{name}' already exists")));
        }
        if ends.len() != 2 {
            return Err(Error::Parse(format!(
                "association '{name}' must have exactly two ends, got {}",
                ends.len()
            )));
        }
        tracing::debug!(association = %name, "adding association");
        let mut end_ids = Vec::with_capacity(2);
        for spec in ends {
            let class = self.atom_named(&spec.class)?;
            if self.atom(class).as_class().is_none() {
                return Err(Error::Parse(format!(
                    "association '{name}' end '{}' references '{}', which is not a class",
                    spec.role, spec.class
                )));
            }
            if self.name_in_use(&spec.role) {
                return Err(Error::Parse(format!(
                    "an element called '{}' already exists",
                    spec.role
                )));
            }
            end_ids.push(self.push_atom(Atom::AssociationEnd(AssociationEndDef {
                role: spec.role,
                class,
                multiplicity: spec.multiplicity,
            })));
        }
        Ok(self.push_atom(Atom::Association(AssociationDef { name, ends: end_ids })))
    }

    /// Add a generalization; records the superclass link on every subclass.
    pub fn add_generalization(
        &mut self,
        name: impl Into<String>,
        disjoint: bool,
        complete: bool,
        superclass: &str,
        branches: Vec<(String, String)>,
    ) -> Result<AtomId, Error> {
        let name = name.into();
        if self.name_in_use(&name) {
            return Err(Error::Parse(format!("an element called '{name}' already exists")));
        }
        if branches.is_empty() {
            return Err(Error::Parse(format!(
                "generalization '{name}' must have at least one subclass"
            )));
        }
        tracing::debug!(generalization = %name, "adding generalization");
        let super_id = self.atom_named(superclass)?;
        let mut resolved = Vec::with_capacity(branches.len());
        for (class, constraint) in branches {
            if class == superclass {
                return Err(Error::Parse(format!(
                    "class '{class}' cannot play both roles in generalization '{name}'"
                )));
            }
            let class_id = self.atom_named(&class)?;
            resolved.push(SubclassBranch {
                class: class_id,
                constraint,
            });
        }
        let gen_id = self.push_atom(Atom::Generalization(GeneralizationDef {
            name,
            superclass: super_id,
            branches: resolved.clone(),
            disjoint,
            complete,
        }));
        for branch in &resolved {
            if let Atom::Class(class) = &mut self.atoms[branch.class.index()] {
                class.superclass = Some(super_id);
            }
        }
        Ok(gen_id)
    }

    /// Add a struct hyperedge with its anchor and remaining elements.
    pub fn add_struct(
        &mut self,
        name: impl Into<String>,
        anchor: &[String],
        elements: &[String],
    ) -> Result<EdgeId, Error> {
        let name = name.into();
        if self.name_in_use(&name) {
            return Err(Error::Parse(format!("an element called '{name}' already exists")));
        }
        tracing::debug!(struct_name = %name, "adding struct");
        let anchor = anchor
            .iter()
            .map(|n| self.element_named(n))
            .collect::<Result<Vec<_>, _>>()?;
        let elements = elements
            .iter()
            .map(|n| self.element_named(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.push_edge(Hyperedge::Struct(StructDef {
            name,
            anchor,
            elements,
        })))
    }

    /// Add a set hyperedge.
    pub fn add_set(
        &mut self,
        name: impl Into<String>,
        contents: &[String],
    ) -> Result<EdgeId, Error> {
        let name = name.into();
        if self.name_in_use(&name) {
            return Err(Error::Parse(format!("an element called '{name}' already exists")));
        }
        if contents.is_empty() {
            return Err(Error::Parse(format!("set '{name}' must have some contents")));
        }
        tracing::debug!(set = %name, "adding set");
        let contents = contents
            .iter()
            .map(|n| self.element_named(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.push_edge(Hyperedge::Set(SetDef { name, contents })))
    }

    /// Serialize to a self-contained blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from a blob produced by [`Catalog::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_catalog() -> Catalog {
        let mut cat = Catalog::new("library");
        cat.add_class(
            "Book",
            1_000,
            vec![
                AttributeSpec::new("isbn", DataType::String)
                    .with_size(13)
                    .with_distinct(1_000)
                    .identifier(),
                AttributeSpec::new("title", DataType::String)
                    .with_size(120)
                    .with_distinct(950),
            ],
        )
        .unwrap();
        cat.add_class(
            "Author",
            400,
            vec![
                AttributeSpec::new("author_id", DataType::Int64)
                    .with_distinct(400)
                    .identifier(),
                AttributeSpec::new("author_name", DataType::String)
                    .with_size(80)
                    .with_distinct(390),
            ],
        )
        .unwrap();
        cat.add_association(
            "writes",
            vec![
                EndSpec::new("Book", "written", Multiplicity::many()),
                EndSpec::new("Author", "writer", Multiplicity::some()),
            ],
        )
        .unwrap();
        cat
    }

    #[test]
    fn test_name_resolution() {
        let cat = library_catalog();
        assert!(cat.atom_named("Book").is_ok());
        assert!(cat.atom_named("writes").is_ok());
        assert!(cat.atom_named("writer").is_ok());
        assert!(matches!(
            cat.atom_named("Publisher"),
            Err(Error::UnknownName(_))
        ));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut cat = library_catalog();
        let err = cat.add_class("Book", 10, vec![]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        let err = cat
            .add_association(
                "title",
                vec![
                    EndSpec::new("Book", "x", Multiplicity::one()),
                    EndSpec::new("Author", "y", Multiplicity::one()),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_association_must_be_binary() {
        let mut cat = library_catalog();
        let err = cat
            .add_association("odd", vec![EndSpec::new("Book", "only", Multiplicity::one())])
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_generalization_sets_superclass() {
        let mut cat = Catalog::new("people");
        cat.add_class(
            "Person",
            100,
            vec![AttributeSpec::new("pid", DataType::Int64)
                .with_distinct(100)
                .identifier()],
        )
        .unwrap();
        cat.add_class(
            "Student",
            60,
            vec![AttributeSpec::new("degree", DataType::String).with_size(30)],
        )
        .unwrap();
        cat.add_generalization(
            "person_kinds",
            false,
            false,
            "Person",
            vec![("Student".into(), "degree<>''".into())],
        )
        .unwrap();

        let student = cat.atom_named("Student").unwrap();
        let person = cat.atom_named("Person").unwrap();
        assert_eq!(
            cat.atom(student).as_class().unwrap().superclass,
            Some(person)
        );
    }

    #[test]
    fn test_struct_and_set_resolution() {
        let mut cat = library_catalog();
        cat.add_struct(
            "S_Book",
            &["Book".into()],
            &["title".into(), "writes".into()],
        )
        .unwrap();
        cat.add_set("T_Book", &["S_Book".into()]).unwrap();

        let set = cat.edge_named("T_Book").unwrap();
        assert_eq!(cat.edge(set).kind(), "set");
        let err = cat.add_set("T_Bad", &["Nowhere".into()]).unwrap_err();
        assert!(matches!(err, Error::UnknownName(_)));
    }

    #[test]
    fn test_blob_round_trip() {
        let mut cat = library_catalog();
        cat.add_struct(
            "S_Book",
            &["Book".into()],
            &["title".into(), "writes".into()],
        )
        .unwrap();
        cat.add_set("T_Book", &["S_Book".into()]).unwrap();
        cat.meta_mut().design = Some("book_design".into());
        cat.meta_mut().has_data = true;

        let bytes = cat.to_bytes().unwrap();
        let restored = Catalog::from_bytes(&bytes).unwrap();
        assert_eq!(cat, restored);
    }
}
