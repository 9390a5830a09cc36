//! Generalization expansion of query patterns.
//!
//! Pattern classes with subclasses are replaced by the disjunction of their
//! leaf subclasses, yielding a finite set of concrete pattern instances. Each
//! branch is a value; the translator assembles a `UNION ALL` over them.

use crate::catalog::{Atom, AtomId, Catalog};

/// One concrete pattern instance: the original slots with every expandable
/// class bound to a leaf subclass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Branch {
    /// Concrete atom per pattern slot.
    pub slots: Vec<AtomId>,
}

impl Branch {
    /// Class atoms of this branch, in slot order.
    pub fn classes(&self, catalog: &Catalog) -> Vec<AtomId> {
        self.slots
            .iter()
            .copied()
            .filter(|id| matches!(catalog.atom(*id), Atom::Class(_)))
            .collect()
    }

    /// Association atoms of this branch, in slot order.
    pub fn associations(&self, catalog: &Catalog) -> Vec<AtomId> {
        self.slots
            .iter()
            .copied()
            .filter(|id| matches!(catalog.atom(*id), Atom::Association(_)))
            .collect()
    }
}

/// Expand every class slot into its leaf subclasses and build the cartesian
/// product of the alternatives. A pattern without generalizations yields a
/// single branch equal to the input.
pub(super) fn expand_pattern(catalog: &Catalog, pattern: &[AtomId]) -> Vec<Branch> {
    let alternatives: Vec<Vec<AtomId>> = pattern
        .iter()
        .map(|&slot| match catalog.atom(slot) {
            Atom::Class(_) => catalog.leaf_subclasses(slot),
            _ => vec![slot],
        })
        .collect();

    let mut branches = vec![Vec::new()];
    for slot_options in alternatives {
        let mut next = Vec::with_capacity(branches.len() * slot_options.len());
        for prefix in &branches {
            for &option in &slot_options {
                let mut extended: Vec<AtomId> = prefix.clone();
                extended.push(option);
                next.push(extended);
            }
        }
        branches = next;
    }
    branches.into_iter().map(|slots| Branch { slots }).collect()
}
