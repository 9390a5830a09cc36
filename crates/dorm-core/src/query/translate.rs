//! The query translator: compiles an abstract select-project-join query
//! against the installed design into one executable statement.
//!
//! Pipeline: resolve and validate the pattern, expand generalizations into
//! concrete branches, map every branch onto tables (bucket combinations,
//! smallest table count wins, lexicographic tie-break), synthesize joins from
//! loose ends and shared classes, translate filters and discriminants, then
//! assemble a `UNION ALL` over the deduplicated branches.

use std::collections::HashSet;

use crate::catalog::{Atom, AtomId, Catalog, DomainPath, EdgeId};
use crate::diag::Diagnostic;
use crate::error::Error;
use crate::schema::Paradigm;

use super::expand::{expand_pattern, Branch};
use super::spec::{parse_conjunction, Predicate, QuerySpec};
use super::stmt::{ColumnExpr, FilterPredicate, JoinPredicate, SelectStmt};

/// Result of translating one query.
#[derive(Debug, Clone)]
pub struct Translation {
    /// The executable statement (possibly a `UNION ALL` over branches).
    pub sql: String,
    /// Number of branches after deduplication.
    pub branches: usize,
    /// Whether any branch collapsed a duplicate FROM occurrence.
    pub from_dedup: bool,
    /// Warnings accumulated during translation.
    pub warnings: Vec<Diagnostic>,
}

/// What a projection entry resolved to.
#[derive(Debug, Clone, Copy)]
enum ProjectItem {
    Attribute(AtomId),
    End { end: AtomId, association: AtomId },
}

/// Compiles abstract queries for one paradigm. Stateless between queries.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    paradigm: Paradigm,
}

impl QueryTranslator {
    /// Create a translator for the given paradigm.
    pub fn new(paradigm: Paradigm) -> Self {
        Self { paradigm }
    }

    /// Translate one query against the catalog's installed design.
    pub fn translate(&self, catalog: &Catalog, spec: &QuerySpec) -> Result<Translation, Error> {
        tracing::info!(paradigm = %self.paradigm, "translating query");
        let pattern = resolve_pattern(catalog, spec)?;
        let predicates = parse_conjunction(spec.filter.as_deref().unwrap_or(""))?;
        validate_filter(catalog, &pattern, &predicates)?;
        let project = resolve_project(catalog, spec, &pattern)?;
        let paths = pattern_paths(catalog, &pattern)?;

        let mut warnings = Vec::new();
        let mut stmts: Vec<SelectStmt> = Vec::new();
        for branch in expand_pattern(catalog, &pattern) {
            match self.branch_stmt(catalog, &branch, spec, &project, &predicates, &paths, &mut warnings)? {
                Some(stmt) => {
                    if !stmts.contains(&stmt) {
                        stmts.push(stmt);
                    }
                }
                None => continue,
            }
        }
        if stmts.is_empty() {
            return Err(Error::EmptyExpansion(format!(
                "no branch of pattern [{}] is stored in the design",
                spec.pattern.join(", ")
            )));
        }

        let from_dedup = stmts.iter().any(|s| s.from_dedup);
        let sql = stmts
            .iter()
            .map(|s| s.render(self.paradigm))
            .collect::<Vec<_>>()
            .join("\nUNION ALL\n");
        Ok(Translation {
            sql,
            branches: stmts.len(),
            from_dedup,
            warnings,
        })
    }

    /// Build the statement of one concrete branch, or `None` when the branch
    /// is not realizable in the installed design.
    #[allow(clippy::too_many_arguments)]
    fn branch_stmt(
        &self,
        catalog: &Catalog,
        branch: &Branch,
        spec: &QuerySpec,
        project: &[ProjectItem],
        predicates: &[Predicate],
        paths: &[DomainPath],
        warnings: &mut Vec<Diagnostic>,
    ) -> Result<Option<SelectStmt>, Error> {
        let classes = branch.classes(catalog);
        let associations = branch.associations(catalog);

        // Attributes this branch must retrieve.
        let mut needed: Vec<AtomId> = Vec::new();
        for item in project {
            if let ProjectItem::Attribute(attr) = item {
                if !needed.contains(attr) {
                    needed.push(*attr);
                }
            }
        }
        for predicate in predicates {
            if let Some(attr) = catalog.lookup_atom(&predicate.attribute) {
                if !needed.contains(&attr) {
                    needed.push(attr);
                }
            }
        }

        // Every needed attribute must be visible from some branch class.
        for &attr in &needed {
            let Some(owner) = catalog.attribute_def(attr).map(|d| d.owner) else {
                continue;
            };
            let visible = classes
                .iter()
                .any(|&c| catalog.generalization_closure(c).contains(&owner));
            if !visible {
                warnings.push(Diagnostic::warning(
                    "branch-dropped",
                    format!(
                        "attribute '{}' is not visible from branch [{}]",
                        catalog.atom(attr).name(),
                        branch_label(catalog, branch)
                    ),
                ));
                return Ok(None);
            }
        }

        // Bucket construction: candidate tables per pattern slot.
        let mut buckets: Vec<Vec<EdgeId>> = Vec::new();
        for &assoc in &associations {
            let candidates = catalog.sets_containing(assoc);
            if candidates.is_empty() {
                warnings.push(Diagnostic::warning(
                    "branch-dropped",
                    format!(
                        "association '{}' is not stored in any set",
                        catalog.atom(assoc).name()
                    ),
                ));
                return Ok(None);
            }
            buckets.push(candidates);
        }
        for &class in &classes {
            let class_sets = tables_storing_class(catalog, class);
            if class_sets.is_empty() {
                warnings.push(Diagnostic::warning(
                    "branch-dropped",
                    format!(
                        "class '{}' is not stored in any set",
                        catalog.atom(class).name()
                    ),
                ));
                return Ok(None);
            }
            let closure = catalog.generalization_closure(class);
            let mut class_required: Vec<AtomId> = needed
                .iter()
                .copied()
                .filter(|&attr| {
                    catalog
                        .attribute_def(attr)
                        .map(|d| closure.contains(&d.owner))
                        .unwrap_or(false)
                })
                .collect();
            if let Some(identifier) = catalog.identifier_of(class) {
                if !class_required.contains(&identifier) {
                    class_required.push(identifier);
                }
            }
            let single = class_required.len() == 1;
            for attr in class_required {
                let is_identifier = catalog
                    .attribute_def(attr)
                    .map(|d| d.identifier)
                    .unwrap_or(false);
                if is_identifier && !single {
                    continue;
                }
                let candidates: Vec<EdgeId> = class_sets
                    .iter()
                    .copied()
                    .filter(|&set| catalog.atoms_in(set).contains(&attr))
                    .collect();
                if candidates.is_empty() {
                    warnings.push(Diagnostic::warning(
                        "branch-dropped",
                        format!(
                            "attribute '{}' of class '{}' is not stored with it",
                            catalog.atom(attr).name(),
                            catalog.atom(class).name()
                        ),
                    ));
                    return Ok(None);
                }
                if !buckets.contains(&candidates) {
                    buckets.push(candidates);
                }
            }
        }

        // Combine buckets and pick the combination with the fewest tables.
        let combinations = combine_buckets(catalog, &buckets);
        if combinations.len() > 1 {
            warnings.push(Diagnostic::warning(
                "ambiguous-tables",
                format!(
                    "branch [{}] admits {} table combinations; the smallest was chosen",
                    branch_label(catalog, branch),
                    combinations.len()
                ),
            ));
        }
        let Some(tables) = combinations.into_iter().next() else {
            return Ok(None);
        };

        let alias_of = |set: EdgeId| -> String {
            let position = tables.iter().position(|&t| t == set).unwrap_or(0);
            format!("t{}", position + 1)
        };
        let locate = |attr: AtomId| -> Result<ColumnExpr, Error> {
            for &set in &tables {
                if catalog.atoms_in(set).contains(&attr) {
                    return Ok(ColumnExpr {
                        alias: alias_of(set),
                        containers: catalog.container_path(set, attr).unwrap_or_default(),
                        column: catalog.atom(attr).name().to_string(),
                    });
                }
            }
            Err(Error::Disconnected(format!(
                "attribute '{}' is not covered by the chosen tables",
                catalog.atom(attr).name()
            )))
        };

        // Projections, in declaration order.
        let mut projections = Vec::with_capacity(project.len());
        for (label, item) in spec.project.iter().zip(project) {
            let expr = match item {
                ProjectItem::Attribute(attr) => locate(*attr)?,
                ProjectItem::End { end, association } => {
                    end_column(catalog, &tables, &alias_of, *end, *association, &classes)?
                }
            };
            projections.push((label.clone(), expr));
        }

        // Join synthesis: the hops are the associations along the chosen
        // domain paths, in path order; pattern associations off every path
        // (cycles) still contribute their predicates afterwards.
        let mut hops: Vec<AtomId> = Vec::new();
        for path in paths {
            for link in path.links(catalog) {
                if catalog.atom(link).as_association().is_some() && !hops.contains(&link) {
                    hops.push(link);
                }
            }
        }
        for &assoc in &associations {
            if !hops.contains(&assoc) {
                hops.push(assoc);
            }
        }

        // Each hop joins through its loose association ends.
        let mut joins: Vec<JoinPredicate> = Vec::new();
        let mut from_dedup = false;
        for &assoc in &hops {
            let Some(home) = tables
                .iter()
                .copied()
                .find(|&set| catalog.atoms_in(set).contains(&assoc))
            else {
                continue;
            };
            let Some(holder) = struct_holding(catalog, home, assoc) else {
                continue;
            };
            let loose: HashSet<AtomId> = catalog.loose_ends(holder).into_iter().collect();
            for (end_id, end) in catalog.ends_of(assoc) {
                if !loose.contains(&end_id) {
                    continue;
                }
                let effective = classes
                    .iter()
                    .copied()
                    .find(|&c| catalog.generalization_closure(c).contains(&end.class))
                    .unwrap_or(end.class);
                if !classes.contains(&effective) {
                    continue; // target class outside the pattern: no join
                }
                let Some(identifier) = catalog.identifier_of(effective) else {
                    continue;
                };
                let left = ColumnExpr {
                    alias: alias_of(home),
                    containers: catalog.container_path(home, assoc).unwrap_or_default(),
                    column: end.role.clone(),
                };
                let right = locate(identifier)?;
                if left.alias == right.alias {
                    from_dedup = true;
                    warnings.push(Diagnostic::warning(
                        "from-dedup",
                        format!(
                            "table '{}' would appear twice in FROM; one occurrence was kept with both join predicates",
                            catalog.edge(home).name()
                        ),
                    ));
                }
                joins.push(JoinPredicate { left, right });
            }
        }
        // Joins between tables sharing a class (vertical partitioning).
        for &class in &classes {
            let stored_in: Vec<EdgeId> = tables
                .iter()
                .copied()
                .filter(|&set| stores_class(catalog, set, class))
                .collect();
            let Some(identifier) = catalog.identifier_of(class) else {
                continue;
            };
            for window in stored_in.windows(2) {
                let column = catalog.atom(identifier).name().to_string();
                joins.push(JoinPredicate {
                    left: ColumnExpr {
                        alias: alias_of(window[0]),
                        containers: catalog
                            .container_path(window[0], identifier)
                            .unwrap_or_default(),
                        column: column.clone(),
                    },
                    right: ColumnExpr {
                        alias: alias_of(window[1]),
                        containers: catalog
                            .container_path(window[1], identifier)
                            .unwrap_or_default(),
                        column,
                    },
                });
            }
        }
        check_tables_joined(catalog, &tables, &joins, &alias_of)?;

        // Filters: the query's own, then the discriminants forced by the
        // branch classes sharing tables with their relatives.
        let mut filters: Vec<FilterPredicate> = Vec::new();
        for predicate in predicates {
            let attr = catalog.atom_named(&predicate.attribute)?;
            filters.push(FilterPredicate {
                column: locate(attr)?,
                op: predicate.op,
                literal: predicate.literal.clone(),
            });
        }
        for predicate in discriminants(catalog, &classes, &tables)? {
            let attr = catalog
                .lookup_atom(&predicate.attribute)
                .ok_or_else(|| Error::DanglingPredicate(predicate.attribute.clone()))?;
            let filter = FilterPredicate {
                column: locate(attr).map_err(|_| {
                    Error::DanglingPredicate(format!(
                        "discriminant attribute '{}' is not covered by the chosen tables",
                        predicate.attribute
                    ))
                })?,
                op: predicate.op,
                literal: predicate.literal.clone(),
            };
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }

        Ok(Some(SelectStmt {
            projections,
            tables: tables
                .iter()
                .map(|&set| (catalog.edge(set).name().to_string(), alias_of(set)))
                .collect(),
            joins,
            filters,
            from_dedup,
        }))
    }
}

/// An attribute is reachable from a pattern when its owner is an ancestor of
/// a pattern class (inherited) or a descendant (visible in some expansion
/// branch; branches that cannot see it are dropped later).
fn attribute_visible(catalog: &Catalog, pattern: &[AtomId], owner: AtomId) -> bool {
    pattern.iter().any(|&p| {
        matches!(catalog.atom(p), Atom::Class(_))
            && (catalog.generalization_closure(p).contains(&owner)
                || catalog.generalization_closure(owner).contains(&p))
    })
}

/// Resolve pattern names into class and association atoms.
fn resolve_pattern(catalog: &Catalog, spec: &QuerySpec) -> Result<Vec<AtomId>, Error> {
    if spec.pattern.is_empty() {
        return Err(Error::Parse("empty pattern is not allowed in a query".into()));
    }
    if spec.project.is_empty() {
        return Err(Error::Parse("empty projection is not allowed in a query".into()));
    }
    let mut pattern = Vec::with_capacity(spec.pattern.len());
    for name in &spec.pattern {
        let id = catalog.atom_named(name)?;
        match catalog.atom(id) {
            Atom::Class(_) | Atom::Association(_) => pattern.push(id),
            other => {
                return Err(Error::Parse(format!(
                    "pattern element '{}' is a {}, not a class or association",
                    name,
                    other.kind()
                )))
            }
        }
    }
    // No two pattern atoms on the same generalization chain.
    let classes: Vec<AtomId> = pattern
        .iter()
        .copied()
        .filter(|id| matches!(catalog.atom(*id), Atom::Class(_)))
        .collect();
    for (i, &left) in classes.iter().enumerate() {
        for &right in &classes[i + 1..] {
            if catalog.generalization_closure(left).contains(&right)
                || catalog.generalization_closure(right).contains(&left)
            {
                return Err(Error::Parse(format!(
                    "pattern classes '{}' and '{}' lie on the same generalization chain",
                    catalog.atom(left).name(),
                    catalog.atom(right).name()
                )));
            }
        }
    }
    Ok(pattern)
}

/// Every filter attribute must belong to a class visible from the pattern.
fn validate_filter(
    catalog: &Catalog,
    pattern: &[AtomId],
    predicates: &[Predicate],
) -> Result<(), Error> {
    for predicate in predicates {
        let attr = catalog.atom_named(&predicate.attribute)?;
        let Some(def) = catalog.attribute_def(attr) else {
            return Err(Error::DanglingPredicate(format!(
                "'{}' is not an attribute",
                predicate.attribute
            )));
        };
        if !attribute_visible(catalog, pattern, def.owner) {
            return Err(Error::DanglingPredicate(format!(
                "attribute '{}' belongs to '{}', which is absent from the pattern",
                predicate.attribute,
                catalog.atom(def.owner).name()
            )));
        }
    }
    Ok(())
}

/// Resolve projection entries into attributes or association-end roles.
fn resolve_project(
    catalog: &Catalog,
    spec: &QuerySpec,
    pattern: &[AtomId],
) -> Result<Vec<ProjectItem>, Error> {
    let mut items = Vec::with_capacity(spec.project.len());
    for name in &spec.project {
        let id = catalog.atom_named(name)?;
        match catalog.atom(id) {
            Atom::Attribute(def) => {
                if !attribute_visible(catalog, pattern, def.owner) {
                    return Err(Error::Disconnected(format!(
                        "projected attribute '{}' is not covered by the pattern",
                        name
                    )));
                }
                items.push(ProjectItem::Attribute(id));
            }
            Atom::AssociationEnd(_) => {
                let association = catalog
                    .association_of_end(id)
                    .ok_or_else(|| Error::UnknownName(name.clone()))?;
                if !pattern.contains(&association) {
                    return Err(Error::Disconnected(format!(
                        "projected role '{}' belongs to an association absent from the pattern",
                        name
                    )));
                }
                items.push(ProjectItem::End {
                    end: id,
                    association,
                });
            }
            other => {
                return Err(Error::Parse(format!(
                    "projected '{}' is a {}, not an attribute or role",
                    name,
                    other.kind()
                )))
            }
        }
    }
    Ok(items)
}

/// One minimal domain path from the first pattern atom to every other one,
/// generalization hops allowed. A path is admissible only when every
/// association it crosses belongs to the pattern (the pattern is the join
/// graph); among admissible paths of equal length the tie-break on the first
/// link name picks the winner. No admissible path means the pattern is not
/// connected, not even through generalizations.
fn pattern_paths(catalog: &Catalog, pattern: &[AtomId]) -> Result<Vec<DomainPath>, Error> {
    if pattern.len() <= 1 {
        return Ok(Vec::new());
    }
    let pattern_associations: HashSet<AtomId> = pattern
        .iter()
        .copied()
        .filter(|id| catalog.atom(*id).as_association().is_some())
        .collect();
    let mut chosen = Vec::with_capacity(pattern.len() - 1);
    for &atom in &pattern[1..] {
        let path = catalog
            .domain_paths(pattern[0], atom, true)
            .into_iter()
            .find(|p| {
                p.links(catalog).all(|link| {
                    catalog.atom(link).as_generalization().is_some()
                        || pattern_associations.contains(&link)
                })
            });
        match path {
            Some(p) => chosen.push(p),
            None => {
                return Err(Error::Disconnected(format!(
                    "pattern atoms '{}' and '{}' are not connected, not even through generalizations",
                    catalog.atom(pattern[0]).name(),
                    catalog.atom(atom).name()
                )))
            }
        }
    }
    Ok(chosen)
}

/// Sets storing a class: those whose declared classes meet the class's
/// generalization closure.
fn tables_storing_class(catalog: &Catalog, class: AtomId) -> Vec<EdgeId> {
    let closure = catalog.generalization_closure(class);
    catalog
        .first_level_sets()
        .into_iter()
        .filter(|&set| {
            catalog
                .classes_in(set)
                .iter()
                .any(|stored| closure.contains(stored))
        })
        .collect()
}

fn stores_class(catalog: &Catalog, set: EdgeId, class: AtomId) -> bool {
    let closure = catalog.generalization_closure(class);
    catalog
        .classes_in(set)
        .iter()
        .any(|stored| closure.contains(stored))
}

/// The struct of a set that carries the association.
fn struct_holding(catalog: &Catalog, set: EdgeId, association: AtomId) -> Option<EdgeId> {
    catalog
        .structs_in(set)
        .into_iter()
        .find(|&s| catalog.associations_in(s).contains(&association))
}

/// Cartesian combinations of the buckets, deduplicated, smallest and
/// lexicographically first combination leading.
fn combine_buckets(catalog: &Catalog, buckets: &[Vec<EdgeId>]) -> Vec<Vec<EdgeId>> {
    let mut combinations: Vec<Vec<EdgeId>> = vec![Vec::new()];
    for bucket in buckets {
        let mut next = Vec::new();
        for combination in &combinations {
            for &candidate in bucket {
                let mut extended = combination.clone();
                if !extended.contains(&candidate) {
                    extended.push(candidate);
                }
                extended.sort_by_key(|&set| catalog.edge(set).name().to_string());
                if !next.contains(&extended) {
                    next.push(extended);
                }
            }
        }
        combinations = next;
    }
    combinations.sort_by(|a, b| {
        a.len().cmp(&b.len()).then_with(|| {
            let a_names: Vec<&str> = a.iter().map(|&s| catalog.edge(s).name()).collect();
            let b_names: Vec<&str> = b.iter().map(|&s| catalog.edge(s).name()).collect();
            a_names.cmp(&b_names)
        })
    });
    combinations.dedup();
    combinations
}

/// Resolve the column of an association end: the loose-end field of the
/// association's table, or the identifier of the class when it sits inside.
fn end_column(
    catalog: &Catalog,
    tables: &[EdgeId],
    alias_of: &dyn Fn(EdgeId) -> String,
    end: AtomId,
    association: AtomId,
    classes: &[AtomId],
) -> Result<ColumnExpr, Error> {
    let home = tables
        .iter()
        .copied()
        .find(|&set| catalog.atoms_in(set).contains(&association))
        .ok_or_else(|| {
            Error::Disconnected(format!(
                "association '{}' is not covered by the chosen tables",
                catalog.atom(association).name()
            ))
        })?;
    let end_def = catalog
        .atom(end)
        .as_end()
        .ok_or_else(|| Error::Internal(format!("'{}' is not an end", catalog.atom(end).name())))?;
    let loose = struct_holding(catalog, home, association)
        .map(|s| catalog.loose_ends(s).contains(&end))
        .unwrap_or(true);
    if loose {
        Ok(ColumnExpr {
            alias: alias_of(home),
            containers: catalog.container_path(home, association).unwrap_or_default(),
            column: end_def.role.clone(),
        })
    } else {
        let effective = classes
            .iter()
            .copied()
            .find(|&c| catalog.generalization_closure(c).contains(&end_def.class))
            .unwrap_or(end_def.class);
        let identifier = catalog.identifier_of(effective).ok_or_else(|| {
            Error::Internal(format!(
                "class '{}' has no identifier",
                catalog.atom(effective).name()
            ))
        })?;
        Ok(ColumnExpr {
            alias: alias_of(home),
            containers: catalog.container_path(home, identifier).unwrap_or_default(),
            column: catalog.atom(identifier).name().to_string(),
        })
    }
}

/// Every chosen table must be reachable through join predicates.
fn check_tables_joined(
    catalog: &Catalog,
    tables: &[EdgeId],
    joins: &[JoinPredicate],
    alias_of: &dyn Fn(EdgeId) -> String,
) -> Result<(), Error> {
    if tables.len() <= 1 {
        return Ok(());
    }
    let aliases: Vec<String> = tables.iter().map(|&set| alias_of(set)).collect();
    let mut component: Vec<usize> = (0..aliases.len()).collect();
    fn root(component: &mut Vec<usize>, mut i: usize) -> usize {
        while component[i] != i {
            component[i] = component[component[i]];
            i = component[i];
        }
        i
    }
    for join in joins {
        let left = aliases.iter().position(|a| *a == join.left.alias);
        let right = aliases.iter().position(|a| *a == join.right.alias);
        if let (Some(l), Some(r)) = (left, right) {
            let (rl, rr) = (root(&mut component, l), root(&mut component, r));
            component[rl] = rr;
        }
    }
    let first = root(&mut component, 0);
    for i in 1..aliases.len() {
        if root(&mut component, i) != first {
            return Err(Error::Disconnected(format!(
                "table '{}' cannot be joined with the rest of the query",
                catalog.edge(tables[i]).name()
            )));
        }
    }
    Ok(())
}

/// Discriminant predicates required because a branch class shares a table
/// with a superclass or a generalization sibling.
fn discriminants(
    catalog: &Catalog,
    classes: &[AtomId],
    tables: &[EdgeId],
) -> Result<Vec<Predicate>, Error> {
    let mut predicates: Vec<Predicate> = Vec::new();
    for &class in classes {
        let closure = catalog.generalization_closure(class);
        if closure.len() == 1 {
            continue; // standalone classes need no discriminant
        }
        let needed = tables.iter().any(|&set| {
            catalog.classes_in(set).iter().any(|&stored| {
                stored != class
                    && catalog
                        .generalization_closure(stored)
                        .iter()
                        .any(|c| closure.contains(c))
            })
        });
        if !needed {
            continue;
        }
        let Some(constraint) = catalog.constraint_of(class) else {
            continue;
        };
        for predicate in parse_conjunction(constraint)? {
            if !predicates.contains(&predicate) {
                predicates.push(predicate);
            }
        }
    }
    Ok(predicates)
}

fn branch_label(catalog: &Catalog, branch: &Branch) -> String {
    branch
        .slots
        .iter()
        .map(|&id| catalog.atom(id).name())
        .collect::<Vec<_>>()
        .join(", ")
}
