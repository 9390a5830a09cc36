//! Traversal primitives over the catalog hypergraph.
//!
//! Everything the compilers need to walk the domain and the design lives
//! here: generalization closures, minimal domain paths, struct-local paths to
//! the anchor, loose-end discovery, and the column views of structs that both
//! the schema generator and the query translator consume.
//!
//! Multi-path tie-break: paths of equal length are ordered by the
//! lexicographically smaller name of their first link, so every compiler
//! output stays stable across runs.

use std::collections::{BTreeSet, HashSet};

use super::atom::{AssociationEndDef, Atom, AtomId, AttributeDef};
use super::edge::{EdgeId, ElementRef, Hyperedge};
use super::Catalog;
use crate::error::Error;

/// A path through the domain graph: atoms alternating between node-like
/// (class, attribute) and link-like (association, generalization) positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPath {
    /// Atoms along the path, endpoints included.
    pub atoms: Vec<AtomId>,
}

impl DomainPath {
    /// Number of hops (edges traversed).
    pub fn hops(&self) -> usize {
        self.atoms.len().saturating_sub(1)
    }

    /// Name of the first link atom on the path, if any.
    pub fn first_link_name<'a>(&self, catalog: &'a Catalog) -> Option<&'a str> {
        self.atoms.get(1).map(|id| catalog.atom(*id).name())
    }

    /// Link atoms (associations and generalizations) along the path.
    pub fn links<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = AtomId> + 'a {
        self.atoms
            .iter()
            .copied()
            .filter(|id| {
                matches!(
                    catalog.atom(*id),
                    Atom::Association(_) | Atom::Generalization(_)
                )
            })
    }
}

/// A column contributed by a struct: a stable name bound to the attribute it
/// carries. Classes contribute their identifier, associations their loose
/// ends, attributes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructColumn {
    /// Column name as it appears in the physical schema.
    pub name: String,
    /// The attribute that provides the value.
    pub attribute: AtomId,
}

/// One hop of the container chain from a top-level set down to an atom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHop {
    /// Name of the nested struct or set.
    pub name: String,
    /// True when the container is a set (a collection in the document).
    pub is_collection: bool,
}

impl Catalog {
    // ------------------------------------------------------------------ atoms

    /// All class atoms, in arena order.
    pub fn classes(&self) -> Vec<AtomId> {
        self.atoms()
            .filter(|(_, a)| matches!(a, Atom::Class(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// All attribute atoms, in arena order.
    pub fn attributes(&self) -> Vec<AtomId> {
        self.atoms()
            .filter(|(_, a)| matches!(a, Atom::Attribute(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// All association atoms, in arena order.
    pub fn associations(&self) -> Vec<AtomId> {
        self.atoms()
            .filter(|(_, a)| matches!(a, Atom::Association(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// All generalization atoms, in arena order.
    pub fn generalizations(&self) -> Vec<AtomId> {
        self.atoms()
            .filter(|(_, a)| matches!(a, Atom::Generalization(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// All struct hyperedges, in arena order.
    pub fn structs(&self) -> Vec<EdgeId> {
        self.edges()
            .filter(|(_, e)| matches!(e, Hyperedge::Struct(_)))
            .map(|(id, _)| id)
            .collect()
    }

    /// All set hyperedges, in arena order.
    pub fn sets(&self) -> Vec<EdgeId> {
        self.edges()
            .filter(|(_, e)| matches!(e, Hyperedge::Set(_)))
            .map(|(id, _)| id)
            .collect()
    }

    // -------------------------------------------------------- generalizations

    /// Direct superclass of a class, if any.
    pub fn superclass_of(&self, class: AtomId) -> Option<AtomId> {
        self.atom(class).as_class().and_then(|c| c.superclass)
    }

    /// The class itself followed by its ancestors, bottom to top.
    pub fn generalization_closure(&self, class: AtomId) -> Vec<AtomId> {
        let mut closure = vec![class];
        let mut seen: HashSet<AtomId> = closure.iter().copied().collect();
        let mut current = class;
        while let Some(superclass) = self.superclass_of(current) {
            if !seen.insert(superclass) {
                break; // cyclic hierarchy; the checker reports it
            }
            closure.push(superclass);
            current = superclass;
        }
        closure
    }

    /// The topmost ancestor of a class (the class itself when standalone).
    pub fn hierarchy_root(&self, class: AtomId) -> AtomId {
        *self
            .generalization_closure(class)
            .last()
            .unwrap_or(&class)
    }

    /// The generalization in which `class` appears as a subclass, if any.
    pub fn generalization_of_subclass(&self, class: AtomId) -> Option<AtomId> {
        self.generalizations().into_iter().find(|g| {
            self.atom(*g)
                .as_generalization()
                .map(|def| def.branches.iter().any(|b| b.class == class))
                .unwrap_or(false)
        })
    }

    /// Discriminant predicate of a subclass, if it is one.
    pub fn constraint_of(&self, class: AtomId) -> Option<&str> {
        let generalization = self.generalization_of_subclass(class)?;
        self.atom(generalization)
            .as_generalization()?
            .branches
            .iter()
            .find(|b| b.class == class)
            .map(|b| b.constraint.as_str())
    }

    /// Direct subclasses of a class, ordered by name.
    pub fn direct_subclasses(&self, class: AtomId) -> Vec<AtomId> {
        let mut subclasses: Vec<AtomId> = self
            .generalizations()
            .into_iter()
            .filter_map(|g| self.atom(g).as_generalization())
            .filter(|def| def.superclass == class)
            .flat_map(|def| def.branches.iter().map(|b| b.class))
            .collect();
        subclasses.sort_by_key(|id| self.atom(*id).name().to_string());
        subclasses
    }

    /// Leaf subclasses of a class; the class itself when it has none.
    pub fn leaf_subclasses(&self, class: AtomId) -> Vec<AtomId> {
        let mut leaves = Vec::new();
        let mut seen: HashSet<AtomId> = HashSet::from([class]);
        let mut frontier = vec![class];
        while let Some(current) = frontier.pop() {
            let direct: Vec<AtomId> = self
                .direct_subclasses(current)
                .into_iter()
                .filter(|c| !seen.contains(c))
                .collect();
            if direct.is_empty() {
                leaves.push(current);
                continue;
            }
            for sub in direct.into_iter().rev() {
                seen.insert(sub);
                frontier.push(sub);
            }
        }
        leaves.sort_by_key(|id| self.atom(*id).name().to_string());
        leaves
    }

    /// Classes sharing a generalization with `class` (same superclass),
    /// excluding the class itself. Ordered by name.
    pub fn siblings(&self, class: AtomId) -> Vec<AtomId> {
        match self.superclass_of(class) {
            Some(superclass) => self
                .direct_subclasses(superclass)
                .into_iter()
                .filter(|c| *c != class)
                .collect(),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------ attributes

    /// Identifier attribute of a class, resolved at the top of its hierarchy.
    pub fn identifier_of(&self, class: AtomId) -> Option<AtomId> {
        let root = self.hierarchy_root(class);
        let def = self.atom(root).as_class()?;
        def.attributes
            .iter()
            .copied()
            .find(|a| self.atom(*a).as_attribute().map(|d| d.identifier).unwrap_or(false))
    }

    /// Attributes a class sees: its own plus the inherited ones, bottom up.
    pub fn visible_attributes(&self, class: AtomId) -> Vec<AtomId> {
        let mut attrs = Vec::new();
        for c in self.generalization_closure(class) {
            if let Some(def) = self.atom(c).as_class() {
                attrs.extend(def.attributes.iter().copied());
            }
        }
        attrs
    }

    /// Attribute definition behind an id, when the atom is an attribute.
    pub fn attribute_def(&self, id: AtomId) -> Option<&AttributeDef> {
        self.atom(id).as_attribute()
    }

    // ---------------------------------------------------------- associations

    /// End definitions of an association, in declaration order.
    pub fn ends_of(&self, association: AtomId) -> Vec<(AtomId, &AssociationEndDef)> {
        self.atom(association)
            .as_association()
            .map(|def| {
                def.ends
                    .iter()
                    .filter_map(|id| self.atom(*id).as_end().map(|e| (*id, e)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The association owning an end atom.
    pub fn association_of_end(&self, end: AtomId) -> Option<AtomId> {
        self.associations()
            .into_iter()
            .find(|a| {
                self.atom(*a)
                    .as_association()
                    .map(|def| def.ends.contains(&end))
                    .unwrap_or(false)
            })
    }

    /// Resolve a role name to its end atom.
    pub fn end_named(&self, role: &str) -> Option<AtomId> {
        self.lookup_atom(role)
            .filter(|id| self.atom(*id).as_end().is_some())
    }

    // ---------------------------------------------------------- domain paths

    /// Neighbors of an atom in the domain graph. Generalization links are
    /// traversable only when `allow_generalizations` is set.
    fn domain_neighbors(&self, atom: AtomId, allow_generalizations: bool) -> Vec<AtomId> {
        let mut neighbors = Vec::new();
        match self.atom(atom) {
            Atom::Class(def) => {
                neighbors.extend(def.attributes.iter().copied());
                for assoc in self.associations() {
                    for (_, end) in self.ends_of(assoc) {
                        if end.class == atom {
                            neighbors.push(assoc);
                        }
                    }
                }
                if allow_generalizations {
                    for g in self.generalizations() {
                        if let Some(def) = self.atom(g).as_generalization() {
                            if def.superclass == atom
                                || def.branches.iter().any(|b| b.class == atom)
                            {
                                neighbors.push(g);
                            }
                        }
                    }
                }
            }
            Atom::Attribute(def) => neighbors.push(def.owner),
            Atom::Association(def) => {
                for end in &def.ends {
                    if let Some(e) = self.atom(*end).as_end() {
                        neighbors.push(e.class);
                    }
                }
            }
            Atom::Generalization(def) => {
                if allow_generalizations {
                    neighbors.push(def.superclass);
                    neighbors.extend(def.branches.iter().map(|b| b.class));
                }
            }
            Atom::AssociationEnd(_) => {}
        }
        neighbors.sort();
        neighbors.dedup();
        neighbors
    }

    /// Connectivity view of the domain graph, generalization links included.
    pub(crate) fn neighbors_for_connectivity(&self, atom: AtomId) -> Vec<AtomId> {
        self.domain_neighbors(atom, true)
    }

    /// Every simple path between two atoms, ordered by length ascending and,
    /// on equal length, by the lexicographically smaller first link name.
    pub fn domain_paths(
        &self,
        from: AtomId,
        to: AtomId,
        allow_generalizations: bool,
    ) -> Vec<DomainPath> {
        let mut paths = Vec::new();
        let mut stack = vec![from];
        let mut visited: HashSet<AtomId> = HashSet::from([from]);
        self.collect_paths(
            from,
            to,
            allow_generalizations,
            None,
            &mut stack,
            &mut visited,
            &mut paths,
        );
        paths.sort_by(|a, b| {
            a.hops().cmp(&b.hops()).then_with(|| {
                let a_names: Vec<&str> = a.atoms.iter().map(|id| self.atom(*id).name()).collect();
                let b_names: Vec<&str> = b.atoms.iter().map(|id| self.atom(*id).name()).collect();
                a_names.cmp(&b_names)
            })
        });
        paths
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_paths(
        &self,
        current: AtomId,
        to: AtomId,
        allow_generalizations: bool,
        restrict: Option<&BTreeSet<AtomId>>,
        stack: &mut Vec<AtomId>,
        visited: &mut HashSet<AtomId>,
        out: &mut Vec<DomainPath>,
    ) {
        if current == to {
            out.push(DomainPath { atoms: stack.clone() });
            return;
        }
        for next in self.domain_neighbors(current, allow_generalizations) {
            if visited.contains(&next) {
                continue;
            }
            if let Some(allowed) = restrict {
                if !allowed.contains(&next) && next != to {
                    continue;
                }
            }
            visited.insert(next);
            stack.push(next);
            self.collect_paths(next, to, allow_generalizations, restrict, stack, visited, out);
            stack.pop();
            visited.remove(&next);
        }
    }

    /// True when every hop of the path is traversable with minimum
    /// multiplicity one (generalization hops qualify only upward).
    pub fn path_min_to_one(&self, path: &DomainPath) -> bool {
        self.check_path_multiplicities(path).0
    }

    /// True when every hop of the path leads to at most one instance.
    pub fn path_max_to_one(&self, path: &DomainPath) -> bool {
        self.check_path_multiplicities(path).1
    }

    fn check_path_multiplicities(&self, path: &DomainPath) -> (bool, bool) {
        let mut min_one = true;
        let mut max_one = true;
        for (i, atom) in path.atoms.iter().enumerate() {
            match self.atom(*atom) {
                Atom::Association(def) => {
                    let prev = path.atoms.get(i.wrapping_sub(1));
                    let ahead = def.ends.iter().find_map(|end| {
                        let e = self.atom(*end).as_end()?;
                        (Some(&e.class) != prev).then_some(e)
                    });
                    if let Some(end) = ahead {
                        min_one &= end.multiplicity.at_least_one();
                        max_one &= end.multiplicity.at_most_one();
                    }
                }
                Atom::Generalization(_) => {
                    // Max is to-one in both directions; min is to-one only
                    // when climbing toward the superclass.
                    let upward = match (path.atoms.get(i.wrapping_sub(1)), path.atoms.get(i + 1)) {
                        (Some(prev), Some(next)) => {
                            self.generalization_closure(*prev).contains(next)
                        }
                        _ => false,
                    };
                    min_one &= upward;
                }
                _ => {}
            }
        }
        (min_one, max_one)
    }

    // ------------------------------------------------------------ design view

    /// Sets not contained in any other hyperedge, ordered by name.
    pub fn first_level_sets(&self) -> Vec<EdgeId> {
        let mut nested: HashSet<EdgeId> = HashSet::new();
        for (_, edge) in self.edges() {
            for member in edge.members() {
                if let ElementRef::Edge(e) = member {
                    nested.insert(e);
                }
            }
        }
        let mut sets: Vec<EdgeId> = self
            .sets()
            .into_iter()
            .filter(|s| !nested.contains(s))
            .collect();
        sets.sort_by_key(|id| self.edge(*id).name().to_string());
        sets
    }

    /// Structs directly contained in a hyperedge, in declaration order.
    pub fn structs_in(&self, edge: EdgeId) -> Vec<EdgeId> {
        self.edge(edge)
            .members()
            .into_iter()
            .filter_map(|m| match m {
                ElementRef::Edge(e) if matches!(self.edge(e), Hyperedge::Struct(_)) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// The set a struct directly belongs to, if any.
    pub fn set_of_struct(&self, target: EdgeId) -> Option<EdgeId> {
        self.sets().into_iter().find(|s| {
            self.edge(*s).members().iter().any(|m| matches!(m, ElementRef::Edge(e) if *e == target))
        })
    }

    /// Classes directly referenced by a hyperedge, nested edges included.
    pub fn classes_in(&self, edge: EdgeId) -> Vec<AtomId> {
        let mut classes = Vec::new();
        self.walk_members(edge, &mut |elem, catalog| {
            if let ElementRef::Atom(id) = elem {
                if catalog.atom(id).as_class().is_some() {
                    classes.push(id);
                }
            }
        });
        classes
    }

    /// Associations directly referenced by a hyperedge, nested edges included.
    pub fn associations_in(&self, edge: EdgeId) -> Vec<AtomId> {
        let mut associations = Vec::new();
        self.walk_members(edge, &mut |elem, catalog| {
            if let ElementRef::Atom(id) = elem {
                if catalog.atom(id).as_association().is_some() {
                    associations.push(id);
                }
            }
        });
        associations
    }

    /// Attributes directly referenced by a hyperedge, nested edges included.
    pub fn attributes_in(&self, edge: EdgeId) -> Vec<AtomId> {
        let mut attributes = Vec::new();
        self.walk_members(edge, &mut |elem, catalog| {
            if let ElementRef::Atom(id) = elem {
                if catalog.atom(id).as_attribute().is_some() {
                    attributes.push(id);
                }
            }
        });
        attributes
    }

    fn walk_members(&self, edge: EdgeId, visit: &mut impl FnMut(ElementRef, &Catalog)) {
        let mut seen = HashSet::new();
        self.walk_members_inner(edge, visit, &mut seen);
    }

    fn walk_members_inner(
        &self,
        edge: EdgeId,
        visit: &mut impl FnMut(ElementRef, &Catalog),
        seen: &mut HashSet<EdgeId>,
    ) {
        if !seen.insert(edge) {
            return;
        }
        for member in self.edge(edge).members() {
            visit(member, self);
            if let ElementRef::Edge(nested) = member {
                self.walk_members_inner(nested, visit, seen);
            }
        }
    }

    /// Every atom transitively carried by a hyperedge: referenced attributes,
    /// classes (with their identifiers and ancestors), and associations.
    pub fn atoms_in(&self, edge: EdgeId) -> BTreeSet<AtomId> {
        let mut atoms = BTreeSet::new();
        self.walk_members(edge, &mut |elem, catalog| {
            if let ElementRef::Atom(id) = elem {
                match catalog.atom(id) {
                    Atom::Class(_) => {
                        for c in catalog.generalization_closure(id) {
                            atoms.insert(c);
                            if let Some(g) = catalog.generalization_of_subclass(c) {
                                atoms.insert(g);
                            }
                        }
                        if let Some(identifier) = catalog.identifier_of(id) {
                            atoms.insert(identifier);
                        }
                    }
                    Atom::Association(def) => {
                        atoms.insert(id);
                        for end in &def.ends {
                            atoms.insert(*end);
                        }
                    }
                    _ => {
                        atoms.insert(id);
                    }
                }
                atoms.insert(id);
            }
        });
        atoms
    }

    /// First-level sets transitively containing an atom, ordered by name.
    pub fn sets_containing(&self, atom: AtomId) -> Vec<EdgeId> {
        self.first_level_sets()
            .into_iter()
            .filter(|set| self.atoms_in(*set).contains(&atom))
            .collect()
    }

    // ------------------------------------------------------------ struct view

    /// Loose association ends of a struct: ends whose class does not appear
    /// inside the struct (not even through a generalization).
    pub fn loose_ends(&self, target: EdgeId) -> Vec<AtomId> {
        let inside: HashSet<AtomId> = self
            .classes_in(target)
            .into_iter()
            .flat_map(|c| self.generalization_closure(c))
            .collect();
        let mut loose = Vec::new();
        for assoc in self.associations_in(target) {
            for (end_id, end) in self.ends_of(assoc) {
                if !inside.contains(&end.class) {
                    loose.push(end_id);
                }
            }
        }
        loose
    }

    /// Columns contributed by the direct atom elements of a hyperedge:
    /// attributes as themselves, classes as their identifier, associations as
    /// their loose ends. Anchor elements come first.
    fn own_columns(&self, target: EdgeId) -> Vec<StructColumn> {
        let loose: HashSet<AtomId> = self.loose_ends(target).into_iter().collect();
        let mut columns: Vec<StructColumn> = Vec::new();
        let mut push = |name: String, attribute: AtomId, columns: &mut Vec<StructColumn>| {
            if !columns.iter().any(|c| c.name == name) {
                columns.push(StructColumn { name, attribute });
            }
        };
        for elem in self.edge(target).members() {
            if let ElementRef::Atom(id) = elem {
                match self.atom(id) {
                    Atom::Attribute(def) => push(def.name.clone(), id, &mut columns),
                    Atom::Class(_) => {
                        if let Some(identifier) = self.identifier_of(id) {
                            let name = self.atom(identifier).name().to_string();
                            push(name, identifier, &mut columns);
                        }
                    }
                    Atom::Association(def) => {
                        for end in &def.ends {
                            if loose.contains(end) {
                                if let Some(e) = self.atom(*end).as_end() {
                                    if let Some(identifier) = self.identifier_of(e.class) {
                                        push(e.role.clone(), identifier, &mut columns);
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        columns
    }

    /// Columns a struct contributes to its table, nested containers included.
    /// Anchor elements come first; duplicates keep the first occurrence.
    pub fn struct_columns(&self, target: EdgeId) -> Vec<StructColumn> {
        let mut columns = self.own_columns(target);
        for elem in self.edge(target).members() {
            if let ElementRef::Edge(nested) = elem {
                for column in self.struct_columns(nested) {
                    if !columns.iter().any(|c| c.name == column.name) {
                        columns.push(column);
                    }
                }
            }
        }
        columns
    }

    /// The key columns of a struct: identifiers of anchor classes plus loose
    /// ends of anchor associations, in anchor declaration order. A degenerate
    /// set holding a single class is keyed by that class's identifier.
    pub fn anchor_key_columns(&self, target: EdgeId) -> Vec<StructColumn> {
        let loose: HashSet<AtomId> = self.loose_ends(target).into_iter().collect();
        let mut columns = Vec::new();
        let anchor = match self.edge(target) {
            Hyperedge::Struct(def) => def.anchor.clone(),
            Hyperedge::Set(def) => def.contents.clone(),
        };
        for elem in anchor {
            if let ElementRef::Atom(id) = elem {
                match self.atom(id) {
                    Atom::Class(_) => {
                        if let Some(identifier) = self.identifier_of(id) {
                            columns.push(StructColumn {
                                name: self.atom(identifier).name().to_string(),
                                attribute: identifier,
                            });
                        }
                    }
                    Atom::Association(def) => {
                        for end in &def.ends {
                            if loose.contains(end) {
                                if let Some(e) = self.atom(*end).as_end() {
                                    if let Some(identifier) = self.identifier_of(e.class) {
                                        columns.push(StructColumn {
                                            name: e.role.clone(),
                                            attribute: identifier,
                                        });
                                    }
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        columns
    }

    /// Anchor points of a struct: its anchor classes plus the classes behind
    /// loose anchor ends.
    pub fn anchor_points(&self, target: EdgeId) -> Vec<AtomId> {
        let loose: HashSet<AtomId> = self.loose_ends(target).into_iter().collect();
        let mut points = Vec::new();
        let anchor = match self.edge(target) {
            Hyperedge::Struct(def) => def.anchor.clone(),
            Hyperedge::Set(def) => def.contents.clone(),
        };
        for elem in anchor {
            if let ElementRef::Atom(id) = elem {
                match self.atom(id) {
                    Atom::Class(_) => points.push(id),
                    Atom::Association(def) => {
                        for end in &def.ends {
                            if loose.contains(end) {
                                if let Some(e) = self.atom(*end).as_end() {
                                    points.push(e.class);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        points.sort();
        points.dedup();
        points
    }

    /// Associations referenced by the anchor of a struct.
    pub fn anchor_associations(&self, target: EdgeId) -> Vec<AtomId> {
        match self.edge(target) {
            Hyperedge::Struct(def) => def
                .anchor
                .iter()
                .filter_map(|e| match e {
                    ElementRef::Atom(id) if self.atom(*id).as_association().is_some() => Some(*id),
                    _ => None,
                })
                .collect(),
            Hyperedge::Set(_) => Vec::new(),
        }
    }

    /// Every simple path inside a struct from an element to an anchor point,
    /// excluding hops over anchor associations. The checker demands exactly
    /// one; [`Catalog::struct_path`] enforces that.
    pub fn struct_paths(&self, target: EdgeId, from: AtomId) -> Vec<DomainPath> {
        let allowed = self.atoms_in(target);
        let anchor_assocs: HashSet<AtomId> = self.anchor_associations(target).into_iter().collect();
        let mut paths = Vec::new();
        for anchor in self.anchor_points(target) {
            if anchor == from {
                paths.push(DomainPath { atoms: vec![from] });
                continue;
            }
            let mut stack = vec![from];
            let mut visited: HashSet<AtomId> = anchor_assocs.clone();
            visited.insert(from);
            self.collect_paths(
                from,
                anchor,
                true,
                Some(&allowed),
                &mut stack,
                &mut visited,
                &mut paths,
            );
        }
        paths.sort_by_key(|p| p.hops());
        paths
    }

    /// The unique path from an element of a struct to the struct's anchor.
    pub fn struct_path(&self, target: EdgeId, from: AtomId) -> Result<DomainPath, Error> {
        let mut paths = self.struct_paths(target, from);
        match paths.len() {
            0 => Err(Error::Disconnected(format!(
                "'{}' does not reach the anchor of '{}'",
                self.atom(from).name(),
                self.edge(target).name()
            ))),
            1 => Ok(paths.remove(0)),
            _ => Err(Error::AmbiguousPath {
                from: self.atom(from).name().to_string(),
                to: self.edge(target).name().to_string(),
            }),
        }
    }

    /// Chain of nested containers from a first-level set down to the struct
    /// holding `atom`. Empty when the atom sits in a top-level struct.
    pub fn container_path(&self, set: EdgeId, atom: AtomId) -> Option<Vec<ContainerHop>> {
        for member in self.edge(set).members() {
            if let ElementRef::Edge(nested) = member {
                if let Some(path) = self.container_path_from(nested, atom, true) {
                    return Some(path);
                }
            }
        }
        None
    }

    fn container_path_from(
        &self,
        edge: EdgeId,
        atom: AtomId,
        top_level: bool,
    ) -> Option<Vec<ContainerHop>> {
        let hop = ContainerHop {
            name: self.edge(edge).name().to_string(),
            is_collection: matches!(self.edge(edge), Hyperedge::Set(_)),
        };
        // Provided at this level, either as a declared element or through an
        // implicit column (class identifier, loose end)?
        let direct = self
            .edge(edge)
            .members()
            .iter()
            .any(|m| matches!(m, ElementRef::Atom(id) if *id == atom))
            || self.own_columns(edge).iter().any(|c| c.attribute == atom);
        if direct {
            return Some(if top_level { Vec::new() } else { vec![hop] });
        }
        for member in self.edge(edge).members() {
            if let ElementRef::Edge(nested) = member {
                if let Some(mut path) = self.container_path_from(nested, atom, false) {
                    if !top_level {
                        path.insert(0, hop);
                    }
                    return Some(path);
                }
            }
        }
        None
    }
}
