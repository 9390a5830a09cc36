//! Consistency rules over the design hyperedges.

use std::collections::HashSet;

use crate::catalog::{Atom, AtomId, Catalog, EdgeId, ElementRef, Hyperedge};
use crate::diag::Diagnostic;
use crate::error::Error;
use crate::query::predicate_attributes;

/// Atoms a hyperedge actually stores: its declared classes and associations
/// plus the attributes behind its columns. Ancestors pulled in through a
/// subclass's closure do not count; a Student record holds no Person-only
/// instance.
fn stored_atoms(catalog: &Catalog, edge: EdgeId) -> HashSet<AtomId> {
    let mut atoms: HashSet<AtomId> = HashSet::new();
    atoms.extend(catalog.classes_in(edge));
    atoms.extend(catalog.associations_in(edge));
    atoms.extend(catalog.struct_columns(edge).into_iter().map(|c| c.attribute));
    atoms
}

/// Every class, attribute, and association appears inside some set and some
/// struct. Superclasses of complete (covered) generalizations are exempt:
/// only then can their whole population live in subclass records.
pub(super) fn atom_coverage(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut in_sets: HashSet<AtomId> = HashSet::new();
    for set in catalog.first_level_sets() {
        in_sets.extend(stored_atoms(catalog, set));
    }
    let mut in_structs: HashSet<AtomId> = HashSet::new();
    for s in catalog.structs() {
        in_structs.extend(stored_atoms(catalog, s));
    }
    let covered_superclasses: HashSet<AtomId> = catalog
        .generalizations()
        .into_iter()
        .filter_map(|g| catalog.atom(g).as_generalization())
        .filter(|def| def.complete)
        .map(|def| def.superclass)
        .collect();

    let mut diagnostics = Vec::new();
    for (id, atom) in catalog.atoms() {
        let relevant = match atom {
            Atom::Class(_) => !covered_superclasses.contains(&id),
            Atom::Attribute(_) | Atom::Association(_) => true,
            _ => false,
        };
        if !relevant {
            continue;
        }
        if !in_sets.contains(&id) || !in_structs.contains(&id) {
            diagnostics.push(
                Diagnostic::error(
                    "atom-coverage",
                    format!(
                        "{} '{}' does not appear in any set and struct of the design",
                        atom.kind(),
                        atom.name()
                    ),
                )
                .with_offending([atom.name()]),
            );
        }
    }
    diagnostics
}

/// A set contains only structs, or a single class; never another set
/// directly, and never plain attributes.
pub(super) fn set_contents(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for set_id in catalog.sets() {
        let Some(def) = catalog.edge(set_id).as_set() else {
            continue;
        };
        let mut classes = 0usize;
        let mut structs = 0usize;
        for member in &def.contents {
            match member {
                ElementRef::Edge(e) => match catalog.edge(*e) {
                    Hyperedge::Struct(_) => structs += 1,
                    Hyperedge::Set(_) => diagnostics.push(
                        Diagnostic::error(
                            "set-contents",
                            format!(
                                "set '{}' directly contains set '{}'",
                                def.name,
                                catalog.edge(*e).name()
                            ),
                        )
                        .with_offending([def.name.as_str(), catalog.edge(*e).name()]),
                    ),
                },
                ElementRef::Atom(a) => match catalog.atom(*a) {
                    Atom::Class(_) => classes += 1,
                    other => diagnostics.push(
                        Diagnostic::error(
                            "set-contents",
                            format!(
                                "set '{}' contains {} '{}', which is neither a struct nor a class",
                                def.name,
                                other.kind(),
                                other.name()
                            ),
                        )
                        .with_offending([def.name.as_str(), other.name()]),
                    ),
                },
            }
        }
        if classes > 1 || (classes == 1 && structs > 0) {
            diagnostics.push(
                Diagnostic::error(
                    "set-contents",
                    format!("set '{}' may contain a class only on its own", def.name),
                )
                .with_offending([def.name.as_str()]),
            );
        }
    }
    diagnostics
}

/// Sets nest through structs at most one level below a first-level set.
pub(super) fn set_nesting_depth(catalog: &Catalog) -> Vec<Diagnostic> {
    fn deepest_chain(catalog: &Catalog, edge: EdgeId, seen: &mut HashSet<EdgeId>) -> usize {
        if !seen.insert(edge) {
            return 0;
        }
        let own = usize::from(matches!(catalog.edge(edge), Hyperedge::Set(_)));
        let nested = catalog
            .edge(edge)
            .members()
            .into_iter()
            .filter_map(|m| match m {
                ElementRef::Edge(e) => Some(deepest_chain(catalog, e, seen)),
                ElementRef::Atom(_) => None,
            })
            .max()
            .unwrap_or(0);
        seen.remove(&edge);
        own + nested
    }

    let mut diagnostics = Vec::new();
    for set in catalog.first_level_sets() {
        let mut seen = HashSet::new();
        let depth = deepest_chain(catalog, set, &mut seen);
        if depth > 2 {
            diagnostics.push(
                Diagnostic::error(
                    "set-nesting-depth",
                    format!(
                        "set '{}' nests collections {} levels deep; at most one nested level is supported",
                        catalog.edge(set).name(),
                        depth
                    ),
                )
                .with_offending([catalog.edge(set).name()]),
            );
        }
    }
    diagnostics
}

/// All structs sharing a set expose identical anchor key columns.
pub(super) fn shared_anchor(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for set in catalog.first_level_sets() {
        let structs = catalog.structs_in(set);
        let Some((first, rest)) = structs.split_first() else {
            continue;
        };
        let reference: Vec<String> = catalog
            .anchor_key_columns(*first)
            .into_iter()
            .map(|c| c.name)
            .collect();
        for other in rest {
            let key: Vec<String> = catalog
                .anchor_key_columns(*other)
                .into_iter()
                .map(|c| c.name)
                .collect();
            if key != reference {
                diagnostics.push(
                    Diagnostic::error(
                        "shared-anchor",
                        format!(
                            "structs '{}' and '{}' share set '{}' but disagree on anchor columns",
                            catalog.edge(*first).name(),
                            catalog.edge(*other).name(),
                            catalog.edge(set).name()
                        ),
                    )
                    .with_offending([
                        catalog.edge(set).name(),
                        catalog.edge(*first).name(),
                        catalog.edge(*other).name(),
                    ]),
                );
            }
        }
    }
    diagnostics
}

/// Structs sharing a set must differ by at least one pair of classes related
/// through a generalization.
pub(super) fn set_siblings_distinct(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for set in catalog.first_level_sets() {
        let structs = catalog.structs_in(set);
        for (i, left) in structs.iter().enumerate() {
            for right in &structs[i + 1..] {
                let left_classes = catalog.classes_in(*left);
                let right_classes = catalog.classes_in(*right);
                let related = left_classes.iter().any(|a| {
                    right_classes.iter().any(|b| {
                        a != b && catalog.hierarchy_root(*a) == catalog.hierarchy_root(*b)
                    })
                });
                if !related {
                    diagnostics.push(
                        Diagnostic::error(
                            "set-siblings-distinct",
                            format!(
                                "structs '{}' and '{}' share set '{}' without differing by generalization siblings",
                                catalog.edge(*left).name(),
                                catalog.edge(*right).name(),
                                catalog.edge(set).name()
                            ),
                        )
                        .with_offending([
                            catalog.edge(set).name(),
                            catalog.edge(*left).name(),
                            catalog.edge(*right).name(),
                        ]),
                    );
                }
            }
        }
    }
    diagnostics
}

/// Discriminant attributes are mandatory whenever a struct carries a class
/// with subclasses, or a class with generalization siblings elsewhere in the
/// same set.
pub(super) fn sibling_discriminator(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let columns: HashSet<String> = catalog
            .struct_columns(struct_id)
            .into_iter()
            .map(|c| c.name)
            .collect();
        let set = catalog.set_of_struct(struct_id);
        let set_classes: Vec<AtomId> = set
            .map(|s| {
                catalog
                    .structs_in(s)
                    .into_iter()
                    .filter(|other| *other != struct_id)
                    .flat_map(|other| catalog.classes_in(other))
                    .collect()
            })
            .unwrap_or_default();

        for class in catalog.classes_in(struct_id) {
            // Discriminants needed for the subclasses of a stored superclass.
            let mut required: Vec<AtomId> = catalog.direct_subclasses(class);
            // And for the class itself when a sibling shares the set.
            let has_set_sibling = set_classes.iter().any(|other| {
                *other != class && catalog.hierarchy_root(*other) == catalog.hierarchy_root(class)
            });
            if has_set_sibling {
                required.push(class);
            }
            for subclass in required {
                let Some(constraint) = catalog.constraint_of(subclass) else {
                    continue;
                };
                let Ok(attributes) = predicate_attributes(constraint) else {
                    continue; // unparseable constraints are reported elsewhere
                };
                for attribute in attributes {
                    if !columns.contains(&attribute) {
                        diagnostics.push(
                            Diagnostic::error(
                                "sibling-discriminator",
                                format!(
                                    "struct '{}' needs discriminant attribute '{}' to tell '{}' apart",
                                    catalog.edge(struct_id).name(),
                                    attribute,
                                    catalog.atom(subclass).name()
                                ),
                            )
                            .with_offending([
                                catalog.edge(struct_id).name(),
                                attribute.as_str(),
                                catalog.atom(subclass).name(),
                            ]),
                        );
                    }
                }
            }
        }
    }
    diagnostics
}

/// Every struct has a non-empty anchor.
pub(super) fn anchor_nonempty(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let Some(def) = catalog.edge(struct_id).as_struct() else {
            continue;
        };
        if def.anchor.is_empty() {
            diagnostics.push(
                Diagnostic::error(
                    "anchor-nonempty",
                    format!("struct '{}' has an empty anchor", def.name),
                )
                .with_offending([def.name.as_str()]),
            );
        }
    }
    diagnostics
}

/// Anchor and non-anchor elements of a struct are disjoint.
pub(super) fn anchor_disjoint(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let Some(def) = catalog.edge(struct_id).as_struct() else {
            continue;
        };
        for anchor_elem in &def.anchor {
            if def.elements.contains(anchor_elem) {
                let name = match anchor_elem {
                    ElementRef::Atom(a) => catalog.atom(*a).name(),
                    ElementRef::Edge(e) => catalog.edge(*e).name(),
                };
                diagnostics.push(
                    Diagnostic::error(
                        "anchor-disjoint",
                        format!(
                            "'{}' appears both in the anchor and the elements of struct '{}'",
                            name, def.name
                        ),
                    )
                    .with_offending([def.name.as_str(), name]),
                );
            }
        }
    }
    diagnostics
}

/// The atoms of a struct form a connected subgraph of the domain.
pub(super) fn struct_connected(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let atoms = catalog.atoms_in(struct_id);
        let nodes: Vec<AtomId> = atoms
            .iter()
            .copied()
            .filter(|id| !matches!(catalog.atom(*id), Atom::AssociationEnd(_)))
            .collect();
        let Some(&start) = nodes.first() else {
            continue;
        };
        let mut reached: HashSet<AtomId> = HashSet::from([start]);
        let mut frontier = vec![start];
        while let Some(current) = frontier.pop() {
            for next in catalog.neighbors_for_connectivity(current) {
                if atoms.contains(&next) && reached.insert(next) {
                    frontier.push(next);
                }
            }
        }
        let unreachable: Vec<&str> = nodes
            .iter()
            .filter(|id| !reached.contains(id))
            .map(|id| catalog.atom(*id).name())
            .collect();
        if !unreachable.is_empty() {
            diagnostics.push(
                Diagnostic::error(
                    "struct-connected",
                    format!("struct '{}' is not connected", catalog.edge(struct_id).name()),
                )
                .with_offending(
                    std::iter::once(catalog.edge(struct_id).name()).chain(unreachable),
                ),
            );
        }
    }
    diagnostics
}

/// The anchor alone forms a connected subgraph.
pub(super) fn anchor_connected(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let Some(def) = catalog.edge(struct_id).as_struct() else {
            continue;
        };
        let mut anchor_atoms: Vec<AtomId> = Vec::new();
        for elem in &def.anchor {
            if let ElementRef::Atom(id) = elem {
                match catalog.atom(*id) {
                    Atom::Class(_) | Atom::Association(_) => anchor_atoms.push(*id),
                    _ => {}
                }
            }
        }
        if anchor_atoms.len() <= 1 {
            continue;
        }
        let allowed: HashSet<AtomId> = anchor_atoms
            .iter()
            .flat_map(|id| match catalog.atom(*id) {
                Atom::Association(_) => catalog
                    .ends_of(*id)
                    .into_iter()
                    .map(|(_, e)| e.class)
                    .chain(std::iter::once(*id))
                    .collect::<Vec<_>>(),
                _ => vec![*id],
            })
            .collect();
        let start = anchor_atoms[0];
        let mut reached: HashSet<AtomId> = HashSet::from([start]);
        let mut frontier = vec![start];
        while let Some(current) = frontier.pop() {
            for next in catalog.neighbors_for_connectivity(current) {
                if allowed.contains(&next) && reached.insert(next) {
                    frontier.push(next);
                }
            }
        }
        if anchor_atoms.iter().any(|id| !reached.contains(id)) {
            diagnostics.push(
                Diagnostic::error(
                    "anchor-connected",
                    format!("the anchor of struct '{}' is not connected", def.name),
                )
                .with_offending([def.name.as_str()]),
            );
        }
    }
    diagnostics
}

/// No two classes of one struct lie on the same generalization chain.
pub(super) fn no_hierarchy_pair(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let classes = catalog.classes_in(struct_id);
        for (i, left) in classes.iter().enumerate() {
            for right in &classes[i + 1..] {
                let chained = catalog.generalization_closure(*left).contains(right)
                    || catalog.generalization_closure(*right).contains(left);
                if chained {
                    diagnostics.push(
                        Diagnostic::error(
                            "no-hierarchy-pair",
                            format!(
                                "classes '{}' and '{}' of struct '{}' lie on the same generalization chain",
                                catalog.atom(*left).name(),
                                catalog.atom(*right).name(),
                                catalog.edge(struct_id).name()
                            ),
                        )
                        .with_offending([
                            catalog.edge(struct_id).name(),
                            catalog.atom(*left).name(),
                            catalog.atom(*right).name(),
                        ]),
                    );
                }
            }
        }
    }
    diagnostics
}

/// Exactly one path connects every element of a struct to its anchor.
/// [`Catalog::struct_path`] is the enforcement primitive: it fails with
/// [`Error::AmbiguousPath`] on a second path. Disconnection is reported by
/// the struct-connected rule, not duplicated here.
pub(super) fn unique_anchor_path(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        for attribute in catalog.attributes_in(struct_id) {
            match catalog.struct_path(struct_id, attribute) {
                Ok(_) | Err(Error::Disconnected(_)) => {}
                Err(Error::AmbiguousPath { .. }) => diagnostics.push(
                    Diagnostic::error(
                        "unique-anchor-path",
                        format!(
                            "attribute '{}' reaches the anchor of struct '{}' along more than one path",
                            catalog.atom(attribute).name(),
                            catalog.edge(struct_id).name()
                        ),
                    )
                    .with_offending([
                        catalog.edge(struct_id).name(),
                        catalog.atom(attribute).name(),
                    ]),
                ),
                Err(other) => diagnostics.push(
                    Diagnostic::error(
                        "unique-anchor-path",
                        format!(
                            "anchor path of attribute '{}' in struct '{}' could not be resolved: {other}",
                            catalog.atom(attribute).name(),
                            catalog.edge(struct_id).name()
                        ),
                    )
                    .with_offending([
                        catalog.edge(struct_id).name(),
                        catalog.atom(attribute).name(),
                    ]),
                ),
            }
        }
    }
    diagnostics
}

/// Loose association ends in the anchor stay loose in the whole struct.
pub(super) fn loose_anchor_ends(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let Some(def) = catalog.edge(struct_id).as_struct() else {
            continue;
        };
        let anchor_classes: HashSet<AtomId> = def
            .anchor
            .iter()
            .filter_map(|e| match e {
                ElementRef::Atom(id) if catalog.atom(*id).as_class().is_some() => Some(*id),
                _ => None,
            })
            .collect();
        let struct_classes: HashSet<AtomId> = catalog
            .classes_in(struct_id)
            .into_iter()
            .flat_map(|c| catalog.generalization_closure(c))
            .collect();
        for association in catalog.anchor_associations(struct_id) {
            for (_, end) in catalog.ends_of(association) {
                let loose_in_anchor = !anchor_classes.contains(&end.class);
                let loose_in_struct = !struct_classes.contains(&end.class);
                if loose_in_anchor && !loose_in_struct {
                    diagnostics.push(
                        Diagnostic::error(
                            "loose-anchor-ends",
                            format!(
                                "end '{}' is loose in the anchor of struct '{}' but its class is among the elements",
                                end.role,
                                def.name
                            ),
                        )
                        .with_offending([def.name.as_str(), end.role.as_str()]),
                    );
                }
            }
        }
    }
    diagnostics
}

/// Every class of a struct reaches an anchor point over ends with minimum
/// multiplicity one.
pub(super) fn anchor_reachable(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let anchor_points: HashSet<AtomId> =
            catalog.anchor_points(struct_id).into_iter().collect();
        for class in catalog.classes_in(struct_id) {
            if anchor_points.contains(&class) {
                continue;
            }
            let paths = catalog.struct_paths(struct_id, class);
            if !paths.is_empty() && !paths.iter().any(|p| catalog.path_min_to_one(p)) {
                diagnostics.push(
                    Diagnostic::error(
                        "anchor-reachable",
                        format!(
                            "class '{}' is not linked to the anchor of struct '{}' through mandatory ends",
                            catalog.atom(class).name(),
                            catalog.edge(struct_id).name()
                        ),
                    )
                    .with_offending([
                        catalog.edge(struct_id).name(),
                        catalog.atom(class).name(),
                    ]),
                );
            }
        }
    }
    diagnostics
}

// ----------------------------------------------------------- paradigm: FLAT

/// Under the flat paradigm, every set sits at the first level.
pub(super) fn sets_top_level(catalog: &Catalog) -> Vec<Diagnostic> {
    let top: HashSet<EdgeId> = catalog.first_level_sets().into_iter().collect();
    catalog
        .sets()
        .into_iter()
        .filter(|s| !top.contains(s))
        .map(|s| {
            Diagnostic::error(
                "sets-top-level",
                format!(
                    "set '{}' is nested, which the flat paradigm does not allow",
                    catalog.edge(s).name()
                ),
            )
            .with_offending([catalog.edge(s).name()])
        })
        .collect()
}

/// Under the flat paradigm, structs sit directly inside first-level sets and
/// contain no nested hyperedges.
pub(super) fn structs_second_level(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut second_level: HashSet<EdgeId> = HashSet::new();
    for set in catalog.first_level_sets() {
        second_level.extend(catalog.structs_in(set));
    }
    for struct_id in catalog.structs() {
        let name = catalog.edge(struct_id).name();
        if !second_level.contains(&struct_id) {
            diagnostics.push(
                Diagnostic::error(
                    "structs-second-level",
                    format!("struct '{name}' is not directly inside a first-level set"),
                )
                .with_offending([name]),
            );
        }
        let nests = catalog
            .edge(struct_id)
            .members()
            .iter()
            .any(|m| matches!(m, ElementRef::Edge(_)));
        if nests {
            diagnostics.push(
                Diagnostic::error(
                    "structs-second-level",
                    format!("struct '{name}' nests other hyperedges, which the flat paradigm does not allow"),
                )
                .with_offending([name]),
            );
        }
    }
    diagnostics
}

/// Under the flat paradigm, every path from the anchor to a member leads to
/// at most one instance, otherwise one row cannot hold the member.
pub(super) fn to_one_anchor_paths(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for struct_id in catalog.structs() {
        let anchor_points: HashSet<AtomId> =
            catalog.anchor_points(struct_id).into_iter().collect();
        for class in catalog.classes_in(struct_id) {
            if anchor_points.contains(&class) {
                continue;
            }
            for path in catalog.struct_paths(struct_id, class) {
                // Paths run member-to-anchor; row capacity is about the
                // anchor-to-member direction.
                let mut outward = path.clone();
                outward.atoms.reverse();
                if !catalog.path_max_to_one(&outward) {
                    diagnostics.push(
                        Diagnostic::error(
                            "to-one-anchor-paths",
                            format!(
                                "struct '{}' reaches class '{}' over a to-many path, which a flat row cannot hold",
                                catalog.edge(struct_id).name(),
                                catalog.atom(class).name()
                            ),
                        )
                        .with_offending([
                            catalog.edge(struct_id).name(),
                            catalog.atom(class).name(),
                        ]),
                    );
                }
            }
        }
    }
    diagnostics
}
