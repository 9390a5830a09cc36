//! Consistency rules over the domain atoms.

use std::collections::{HashMap, HashSet};

use crate::catalog::{Atom, AtomId, Catalog};
use crate::diag::Diagnostic;

/// The catalog must hold at least one atom.
pub(super) fn non_empty(catalog: &Catalog) -> Vec<Diagnostic> {
    if catalog.is_empty() {
        vec![Diagnostic::error(
            "non-empty",
            "the catalog holds no atoms at all",
        )]
    } else {
        Vec::new()
    }
}

/// Atom and hyperedge names must be globally unique.
pub(super) fn names_unique(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (_, atom) in catalog.atoms() {
        *counts.entry(atom.name()).or_default() += 1;
    }
    for (_, edge) in catalog.edges() {
        *counts.entry(edge.name()).or_default() += 1;
    }
    let mut duplicated: Vec<&str> = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(name, _)| name)
        .collect();
    duplicated.sort_unstable();
    duplicated
        .into_iter()
        .map(|name| {
            Diagnostic::error("names-unique", format!("the name '{name}' is not unique"))
                .with_offending([name])
        })
        .collect()
}

/// The atom graph must be connected (associations and generalization links
/// count as edges).
pub(super) fn domain_connected(catalog: &Catalog) -> Vec<Diagnostic> {
    let nodes: Vec<AtomId> = catalog
        .atoms()
        .filter(|(_, a)| !matches!(a, Atom::AssociationEnd(_)))
        .map(|(id, _)| id)
        .collect();
    let Some(&start) = nodes.first() else {
        return Vec::new();
    };
    let mut reached: HashSet<AtomId> = HashSet::from([start]);
    let mut frontier = vec![start];
    while let Some(current) = frontier.pop() {
        for next in catalog.neighbors_for_connectivity(current) {
            if reached.insert(next) {
                frontier.push(next);
            }
        }
    }
    let unreachable: Vec<&str> = nodes
        .iter()
        .filter(|id| !reached.contains(id))
        .map(|id| catalog.atom(*id).name())
        .collect();
    if unreachable.is_empty() {
        Vec::new()
    } else {
        vec![Diagnostic::error(
            "domain-connected",
            "the domain graph is not connected",
        )
        .with_offending(unreachable)]
    }
}

/// Every attribute belongs to exactly one class, and that class lists it.
pub(super) fn attribute_owned_once(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (attr_id, atom) in catalog.atoms() {
        let Some(attr) = atom.as_attribute() else {
            continue;
        };
        let owners: Vec<&str> = catalog
            .classes()
            .into_iter()
            .filter(|c| {
                catalog
                    .atom(*c)
                    .as_class()
                    .map(|def| def.attributes.contains(&attr_id))
                    .unwrap_or(false)
            })
            .map(|c| catalog.atom(c).name())
            .collect();
        match owners.len() {
            0 => diagnostics.push(
                Diagnostic::error(
                    "attribute-owned-once",
                    format!("attribute '{}' belongs to no class", attr.name),
                )
                .with_offending([attr.name.as_str()]),
            ),
            1 => {}
            _ => diagnostics.push(
                Diagnostic::error(
                    "attribute-owned-once",
                    format!("attribute '{}' belongs to more than one class", attr.name),
                )
                .with_offending(
                    std::iter::once(attr.name.as_str()).chain(owners.iter().copied()),
                ),
            ),
        }
    }
    diagnostics
}

/// Hierarchy tops carry exactly one identifier; non-tops carry none.
pub(super) fn identifier_per_class(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for class_id in catalog.classes() {
        let Some(class) = catalog.atom(class_id).as_class() else {
            continue;
        };
        let own_identifiers = class
            .attributes
            .iter()
            .filter(|a| {
                catalog
                    .atom(**a)
                    .as_attribute()
                    .map(|d| d.identifier)
                    .unwrap_or(false)
            })
            .count();
        match (class.superclass, own_identifiers) {
            (None, 1) | (Some(_), 0) => {}
            (None, 0) => diagnostics.push(
                Diagnostic::error(
                    "identifier-per-class",
                    format!("class '{}' has no identifier attribute", class.name),
                )
                .with_offending([class.name.as_str()]),
            ),
            (None, _) => diagnostics.push(
                Diagnostic::error(
                    "identifier-per-class",
                    format!("class '{}' has more than one identifier attribute", class.name),
                )
                .with_offending([class.name.as_str()]),
            ),
            (Some(_), _) => diagnostics.push(
                Diagnostic::error(
                    "identifier-per-class",
                    format!(
                        "subclass '{}' carries an identifier, which belongs to the top of its hierarchy",
                        class.name
                    ),
                )
                .with_offending([class.name.as_str()]),
            ),
        }
    }
    diagnostics
}

/// Associations have exactly two ends, both referencing classes.
pub(super) fn association_binary(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for assoc_id in catalog.associations() {
        let Some(def) = catalog.atom(assoc_id).as_association() else {
            continue;
        };
        if def.ends.len() != 2 {
            diagnostics.push(
                Diagnostic::error(
                    "association-binary",
                    format!(
                        "association '{}' has {} ends instead of two",
                        def.name,
                        def.ends.len()
                    ),
                )
                .with_offending([def.name.as_str()]),
            );
            continue;
        }
        for end in &def.ends {
            let target_is_class = catalog
                .atom(*end)
                .as_end()
                .map(|e| catalog.atom(e.class).as_class().is_some())
                .unwrap_or(false);
            if !target_is_class {
                diagnostics.push(
                    Diagnostic::error(
                        "association-binary",
                        format!(
                            "association '{}' has an end that does not reference a class",
                            def.name
                        ),
                    )
                    .with_offending([def.name.as_str()]),
                );
            }
        }
    }
    diagnostics
}

/// The two ends of one association must carry distinct role names.
pub(super) fn role_names_distinct(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for assoc_id in catalog.associations() {
        let ends = catalog.ends_of(assoc_id);
        if ends.len() == 2 && ends[0].1.role == ends[1].1.role {
            let name = catalog.atom(assoc_id).name();
            diagnostics.push(
                Diagnostic::error(
                    "role-names-distinct",
                    format!("both ends of association '{name}' are named '{}'", ends[0].1.role),
                )
                .with_offending([name]),
            );
        }
    }
    diagnostics
}

/// Generalization hierarchies must be acyclic.
pub(super) fn generalization_acyclic(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for class_id in catalog.classes() {
        let mut visited: HashSet<AtomId> = HashSet::from([class_id]);
        let mut current = class_id;
        while let Some(superclass) = catalog.superclass_of(current) {
            if !visited.insert(superclass) {
                diagnostics.push(
                    Diagnostic::error(
                        "generalization-acyclic",
                        format!(
                            "class '{}' is its own ancestor through generalizations",
                            catalog.atom(class_id).name()
                        ),
                    )
                    .with_offending([catalog.atom(class_id).name()]),
                );
                break;
            }
            current = superclass;
        }
    }
    diagnostics
}

/// A class can be the subclass of at most one generalization.
pub(super) fn single_superclass(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut appearances: HashMap<AtomId, usize> = HashMap::new();
    for gen_id in catalog.generalizations() {
        if let Some(def) = catalog.atom(gen_id).as_generalization() {
            for branch in &def.branches {
                *appearances.entry(branch.class).or_default() += 1;
            }
        }
    }
    let mut offenders: Vec<&str> = appearances
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(class, _)| catalog.atom(class).name())
        .collect();
    offenders.sort_unstable();
    offenders
        .into_iter()
        .map(|name| {
            Diagnostic::error(
                "single-superclass",
                format!("class '{name}' has more than one direct superclass"),
            )
            .with_offending([name])
        })
        .collect()
}

/// Every subclass carries a discriminant predicate.
pub(super) fn subclass_constraint_present(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for gen_id in catalog.generalizations() {
        let Some(def) = catalog.atom(gen_id).as_generalization() else {
            continue;
        };
        for branch in &def.branches {
            if branch.constraint.trim().is_empty() {
                diagnostics.push(
                    Diagnostic::error(
                        "subclass-constraint-present",
                        format!(
                            "subclass '{}' of '{}' has no discriminant predicate",
                            catalog.atom(branch.class).name(),
                            def.name
                        ),
                    )
                    .with_offending([catalog.atom(branch.class).name(), def.name.as_str()]),
                );
            }
        }
    }
    diagnostics
}

/// Distinct-value counts are bounded by the owning class cardinality.
pub(super) fn distinct_values_bound(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for attr_id in catalog.attributes() {
        let Some(attr) = catalog.atom(attr_id).as_attribute() else {
            continue;
        };
        let Some(owner) = catalog.atom(attr.owner).as_class() else {
            continue;
        };
        if attr.distinct_values > owner.count {
            diagnostics.push(
                Diagnostic::error(
                    "distinct-values-bound",
                    format!(
                        "attribute '{}' has {} distinct values but class '{}' has {} instances",
                        attr.name, attr.distinct_values, owner.name, owner.count
                    ),
                )
                .with_offending([attr.name.as_str(), owner.name.as_str()]),
            );
        }
    }
    diagnostics
}

/// Identifier distinct-value counts equal the class cardinality.
pub(super) fn identifier_distinct_values(catalog: &Catalog) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for attr_id in catalog.attributes() {
        let Some(attr) = catalog.atom(attr_id).as_attribute() else {
            continue;
        };
        if !attr.identifier {
            continue;
        }
        let Some(owner) = catalog.atom(attr.owner).as_class() else {
            continue;
        };
        if attr.distinct_values != owner.count {
            diagnostics.push(
                Diagnostic::error(
                    "identifier-distinct-values",
                    format!(
                        "identifier '{}' has {} distinct values but class '{}' has {} instances",
                        attr.name, attr.distinct_values, owner.name, owner.count
                    ),
                )
                .with_offending([attr.name.as_str(), owner.name.as_str()]),
            );
        }
    }
    diagnostics
}
