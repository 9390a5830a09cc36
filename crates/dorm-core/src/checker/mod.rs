//! The consistency checker.
//!
//! The checker is a fold over a table of named rules, each a pure predicate
//! over the catalog producing zero or more diagnostics. Every rule runs on
//! every pass; nothing short-circuits, so the operator sees all violations at
//! once. The checker never mutates the catalog.

mod design;
mod domain;

use crate::catalog::Catalog;
use crate::diag::{CheckReport, Diagnostic};
use crate::schema::Paradigm;

type Rule = (&'static str, fn(&Catalog) -> Vec<Diagnostic>);

const DOMAIN_RULES: &[Rule] = &[
    ("non-empty", domain::non_empty),
    ("names-unique", domain::names_unique),
    ("domain-connected", domain::domain_connected),
    ("attribute-owned-once", domain::attribute_owned_once),
    ("identifier-per-class", domain::identifier_per_class),
    ("association-binary", domain::association_binary),
    ("role-names-distinct", domain::role_names_distinct),
    ("generalization-acyclic", domain::generalization_acyclic),
    ("single-superclass", domain::single_superclass),
    ("subclass-constraint-present", domain::subclass_constraint_present),
    ("distinct-values-bound", domain::distinct_values_bound),
    ("identifier-distinct-values", domain::identifier_distinct_values),
];

const DESIGN_RULES: &[Rule] = &[
    ("atom-coverage", design::atom_coverage),
    ("set-contents", design::set_contents),
    ("set-nesting-depth", design::set_nesting_depth),
    ("shared-anchor", design::shared_anchor),
    ("set-siblings-distinct", design::set_siblings_distinct),
    ("sibling-discriminator", design::sibling_discriminator),
    ("anchor-nonempty", design::anchor_nonempty),
    ("anchor-disjoint", design::anchor_disjoint),
    ("struct-connected", design::struct_connected),
    ("anchor-connected", design::anchor_connected),
    ("no-hierarchy-pair", design::no_hierarchy_pair),
    ("unique-anchor-path", design::unique_anchor_path),
    ("loose-anchor-ends", design::loose_anchor_ends),
    ("anchor-reachable", design::anchor_reachable),
];

const FLAT_RULES: &[Rule] = &[
    ("sets-top-level", design::sets_top_level),
    ("structs-second-level", design::structs_second_level),
    ("to-one-anchor-paths", design::to_one_anchor_paths),
];

/// Runs the rule tables applicable to a catalog.
#[derive(Debug, Clone, Default)]
pub struct Checker {
    with_design: bool,
    paradigm: Option<Paradigm>,
}

impl Checker {
    /// A checker for a catalog holding only domain atoms.
    pub fn for_domain() -> Self {
        Self {
            with_design: false,
            paradigm: None,
        }
    }

    /// A checker for a catalog holding a design on top of its domain.
    pub fn for_design() -> Self {
        Self {
            with_design: true,
            paradigm: None,
        }
    }

    /// Also run the rules specific to a physical paradigm.
    pub fn with_paradigm(mut self, paradigm: Paradigm) -> Self {
        self.paradigm = Some(paradigm);
        self
    }

    /// Evaluate every applicable rule and collect all diagnostics.
    pub fn check(&self, catalog: &Catalog) -> CheckReport {
        let mut report = CheckReport::new();
        self.run_rules(DOMAIN_RULES, catalog, &mut report);
        if self.with_design {
            self.run_rules(DESIGN_RULES, catalog, &mut report);
            match self.paradigm {
                Some(Paradigm::Flat) => self.run_rules(FLAT_RULES, catalog, &mut report),
                // The nested paradigm adds nothing beyond the depth bound,
                // which is part of the base design rules.
                Some(Paradigm::JsonNested) | None => {}
            }
        }
        if report.is_ok() {
            tracing::info!("catalog check passed");
        } else {
            tracing::warn!(errors = report.errors().count(), "catalog check failed");
        }
        report
    }

    fn run_rules(&self, rules: &[Rule], catalog: &Catalog, report: &mut CheckReport) {
        for (name, rule) in rules {
            tracing::debug!(rule = name, "checking");
            report.extend(rule(catalog));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        AssociationDef, Atom, AttributeDef, AttributeSpec, ClassDef, DataType, EndSpec,
        Multiplicity,
    };

    fn people_domain() -> Catalog {
        let mut cat = Catalog::new("people");
        cat.add_class(
            "Person",
            100,
            vec![
                AttributeSpec::new("pid", DataType::Int64).with_distinct(100).identifier(),
                AttributeSpec::new("full_name", DataType::String).with_size(80).with_distinct(95),
            ],
        )
        .unwrap();
        cat.add_class(
            "Student",
            60,
            vec![AttributeSpec::new("degree", DataType::String).with_size(30).with_distinct(12)],
        )
        .unwrap();
        cat.add_class(
            "Worker",
            50,
            vec![AttributeSpec::new("salary", DataType::Int64).with_distinct(40)],
        )
        .unwrap();
        cat.add_generalization(
            "person_kinds",
            false,
            true,
            "Person",
            vec![
                ("Student".into(), "degree<>''".into()),
                ("Worker".into(), "salary>0".into()),
            ],
        )
        .unwrap();
        cat
    }

    #[test]
    fn test_valid_domain_passes() {
        let report = Checker::for_domain().check(&people_domain());
        assert!(report.is_ok(), "unexpected: {:?}", report.diagnostics());
    }

    #[test]
    fn test_non_empty_fires_alone() {
        let report = Checker::for_domain().check(&Catalog::new("void"));
        assert!(report.fired("non-empty"));
    }

    #[test]
    fn test_names_unique_fires() {
        let mut cat = people_domain();
        cat.push_atom(Atom::Class(ClassDef {
            name: "Person".into(),
            count: 1,
            attributes: vec![],
            superclass: None,
        }));
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("names-unique"));
    }

    #[test]
    fn test_domain_connected_fires() {
        let mut cat = people_domain();
        cat.add_class(
            "Island",
            5,
            vec![AttributeSpec::new("iid", DataType::Int64).with_distinct(5).identifier()],
        )
        .unwrap();
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("domain-connected"));
    }

    #[test]
    fn test_attribute_owned_once_fires() {
        let mut cat = people_domain();
        let person = cat.atom_named("Person").unwrap();
        cat.push_atom(Atom::Attribute(AttributeDef {
            name: "orphan".into(),
            owner: person,
            data_type: DataType::Int32,
            size: 0,
            distinct_values: 1,
            identifier: false,
        }));
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("attribute-owned-once"));
    }

    #[test]
    fn test_identifier_per_class_fires_for_missing_and_extra() {
        let mut cat = people_domain();
        // A standalone class without identifier.
        cat.add_class(
            "Tag",
            3,
            vec![AttributeSpec::new("label", DataType::String).with_size(10).with_distinct(3)],
        )
        .unwrap();
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("identifier-per-class"));

        // A subclass carrying its own identifier.
        let mut cat = people_domain();
        cat.add_class(
            "Retiree",
            10,
            vec![AttributeSpec::new("rid", DataType::Int64).with_distinct(10).identifier()],
        )
        .unwrap();
        cat.add_generalization(
            "more_kinds",
            false,
            false,
            "Person",
            vec![("Retiree".into(), "salary=0".into())],
        )
        .unwrap();
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("identifier-per-class"));
    }

    #[test]
    fn test_association_binary_fires() {
        let mut cat = people_domain();
        cat.push_atom(Atom::Association(AssociationDef {
            name: "unary".into(),
            ends: vec![],
        }));
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("association-binary"));
    }

    #[test]
    fn test_role_names_distinct_fires() {
        let mut cat = people_domain();
        cat.add_class(
            "Club",
            4,
            vec![AttributeSpec::new("club_id", DataType::Int64).with_distinct(4).identifier()],
        )
        .unwrap();
        // Bypass the builder, which refuses duplicate role names upfront.
        let person = cat.atom_named("Person").unwrap();
        let club = cat.atom_named("Club").unwrap();
        let e1 = cat.push_atom(Atom::AssociationEnd(crate::catalog::AssociationEndDef {
            role: "member".into(),
            class: person,
            multiplicity: Multiplicity::many(),
        }));
        let e2 = cat.push_atom(Atom::AssociationEnd(crate::catalog::AssociationEndDef {
            role: "member".into(),
            class: club,
            multiplicity: Multiplicity::many(),
        }));
        cat.push_atom(Atom::Association(AssociationDef {
            name: "joins".into(),
            ends: vec![e1, e2],
        }));
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("role-names-distinct"));
    }

    #[test]
    fn test_generalization_acyclic_fires() {
        let mut cat = people_domain();
        // Close the loop Person -> Student -> Person by hand.
        let student = cat.atom_named("Student").unwrap();
        let person = cat.atom_named("Person").unwrap();
        if let Atom::Class(def) = &mut cat.atoms[person.index()] {
            def.superclass = Some(student);
        }
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("generalization-acyclic"));
    }

    #[test]
    fn test_single_superclass_fires() {
        let mut cat = people_domain();
        cat.add_class(
            "Entity",
            200,
            vec![AttributeSpec::new("eid", DataType::Int64).with_distinct(200).identifier()],
        )
        .unwrap();
        cat.add_generalization(
            "entity_kinds",
            false,
            false,
            "Entity",
            vec![("Student".into(), "degree<>''".into())],
        )
        .unwrap();
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("single-superclass"));
    }

    #[test]
    fn test_subclass_constraint_present_fires() {
        let mut cat = people_domain();
        cat.add_class("Retiree", 10, vec![]).unwrap();
        cat.add_generalization(
            "more_kinds",
            false,
            false,
            "Person",
            vec![("Retiree".into(), "".into())],
        )
        .unwrap();
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("subclass-constraint-present"));
    }

    #[test]
    fn test_distinct_values_rules_fire() {
        let mut cat = people_domain();
        cat.add_class(
            "City",
            10,
            vec![
                AttributeSpec::new("city_id", DataType::Int64).with_distinct(9).identifier(),
                AttributeSpec::new("city_name", DataType::String).with_size(40).with_distinct(25),
            ],
        )
        .unwrap();
        let report = Checker::for_domain().check(&cat);
        assert!(report.fired("distinct-values-bound"));
        assert!(report.fired("identifier-distinct-values"));
    }

    // ------------------------------------------------------------ design side

    fn employment_domain() -> Catalog {
        let mut cat = people_domain();
        cat.add_class(
            "Company",
            20,
            vec![
                AttributeSpec::new("cid", DataType::Int64).with_distinct(20).identifier(),
                AttributeSpec::new("company_name", DataType::String).with_size(60).with_distinct(20),
            ],
        )
        .unwrap();
        cat.add_association(
            "employs",
            vec![
                EndSpec::new("Company", "employer", Multiplicity { min: 1, max: Some(1) }),
                EndSpec::new("Worker", "staff", Multiplicity::some()),
            ],
        )
        .unwrap();
        cat
    }

    fn one_table_per_subclass(cat: &mut Catalog) {
        cat.add_struct(
            "S_Student",
            &["Student".into()],
            &["full_name".into(), "degree".into()],
        )
        .unwrap();
        cat.add_struct(
            "S_Worker",
            &["Worker".into()],
            &["full_name".into(), "salary".into(), "employs".into()],
        )
        .unwrap();
        cat.add_struct(
            "S_Company",
            &["Company".into()],
            &["company_name".into()],
        )
        .unwrap();
        cat.add_set("T_Student", &["S_Student".into()]).unwrap();
        cat.add_set("T_Worker", &["S_Worker".into()]).unwrap();
        cat.add_set("T_Company", &["S_Company".into()]).unwrap();
    }

    #[test]
    fn test_valid_design_passes_flat() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        let report = Checker::for_design().with_paradigm(Paradigm::Flat).check(&cat);
        assert!(report.is_ok(), "unexpected: {:?}", report.diagnostics());
    }

    #[test]
    fn test_atom_coverage_fires() {
        let mut cat = employment_domain();
        cat.add_struct("S_Student", &["Student".into()], &["full_name".into(), "degree".into(), "salary".into()])
            .unwrap();
        cat.add_set("T_Student", &["S_Student".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("atom-coverage"));
    }

    #[test]
    fn test_atom_coverage_exempts_only_covered_superclasses() {
        // One table per subclass; whether the bare superclass must be stored
        // somewhere depends on the generalization's completeness.
        let subclass_only_design = |complete: bool| {
            let mut cat = Catalog::new("people");
            cat.add_class(
                "Person",
                100,
                vec![
                    AttributeSpec::new("pid", DataType::Int64).with_distinct(100).identifier(),
                    AttributeSpec::new("full_name", DataType::String)
                        .with_size(80)
                        .with_distinct(95),
                ],
            )
            .unwrap();
            cat.add_class(
                "Student",
                60,
                vec![AttributeSpec::new("degree", DataType::String).with_size(30).with_distinct(12)],
            )
            .unwrap();
            cat.add_generalization(
                "person_kinds",
                false,
                complete,
                "Person",
                vec![("Student".into(), "degree<>''".into())],
            )
            .unwrap();
            cat.add_struct(
                "S_Student",
                &["Student".into()],
                &["full_name".into(), "degree".into()],
            )
            .unwrap();
            cat.add_set("T_Student", &["S_Student".into()]).unwrap();
            cat
        };

        // Incomplete: Person-only instances exist but have nowhere to live.
        let report = Checker::for_design().check(&subclass_only_design(false));
        assert!(report.fired("atom-coverage"));
        assert!(report
            .diagnostics()
            .iter()
            .any(|d| d.code == "atom-coverage" && d.offending.contains(&"Person".to_string())));

        // Complete: every instance is in some subclass, Person is exempt.
        let report = Checker::for_design().check(&subclass_only_design(true));
        assert!(!report.fired("atom-coverage"));
    }

    #[test]
    fn test_set_contents_fires() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        cat.add_set("T_Odd", &["full_name".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("set-contents"));
    }

    #[test]
    fn test_set_nesting_depth_fires() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        // A set inside a struct inside a set inside a struct inside a set:
        // three collection levels.
        cat.add_struct("S_Inner", &["Company".into()], &["company_name".into()])
            .unwrap();
        cat.add_set("N_Inner", &["S_Inner".into()]).unwrap();
        cat.add_struct("S_Mid", &["Worker".into()], &["N_Inner".into()]).unwrap();
        cat.add_set("N_Mid", &["S_Mid".into()]).unwrap();
        cat.add_struct("S_Outer", &["Student".into()], &["N_Mid".into()]).unwrap();
        cat.add_set("T_Outer", &["S_Outer".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("set-nesting-depth"));
    }

    #[test]
    fn test_shared_anchor_fires() {
        let mut cat = employment_domain();
        cat.add_struct("S_Student", &["Student".into()], &["degree".into(), "full_name".into()])
            .unwrap();
        cat.add_struct("S_Company", &["Company".into()], &["company_name".into()])
            .unwrap();
        cat.add_set("T_Mixed", &["S_Student".into(), "S_Company".into()])
            .unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("shared-anchor"));
        // Unrelated classes in one set also miss the sibling requirement.
        assert!(report.fired("set-siblings-distinct"));
    }

    #[test]
    fn test_sibling_discriminator_fires_without_discriminant() {
        let mut cat = employment_domain();
        // Students and Workers share one set, but neither struct carries the
        // discriminant attributes (degree, salary).
        cat.add_struct("S_Student", &["Student".into()], &["full_name".into()])
            .unwrap();
        cat.add_struct("S_Worker", &["Worker".into()], &["full_name".into()])
            .unwrap();
        cat.add_set("T_Person", &["S_Student".into(), "S_Worker".into()])
            .unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("sibling-discriminator"));
    }

    #[test]
    fn test_anchor_nonempty_fires() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        cat.add_struct("S_Loose", &[], &["company_name".into()]).unwrap();
        cat.add_set("T_Loose", &["S_Loose".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("anchor-nonempty"));
    }

    #[test]
    fn test_anchor_disjoint_fires() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        cat.add_struct("S_Dup", &["Company".into()], &["Company".into()]).unwrap();
        cat.add_set("T_Dup", &["S_Dup".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("anchor-disjoint"));
    }

    #[test]
    fn test_struct_connected_fires() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        // Company and Student are unrelated; no association joins them.
        cat.add_struct("S_Split", &["Company".into()], &["degree".into()]).unwrap();
        cat.add_set("T_Split", &["S_Split".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("struct-connected"));
    }

    #[test]
    fn test_no_hierarchy_pair_fires() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        cat.add_struct("S_Chain", &["Person".into()], &["Student".into(), "degree".into()])
            .unwrap();
        cat.add_set("T_Chain", &["S_Chain".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("no-hierarchy-pair"));
    }

    #[test]
    fn test_anchor_reachable_fires() {
        let mut cat = people_domain();
        cat.add_class(
            "Company",
            20,
            vec![
                AttributeSpec::new("cid", DataType::Int64).with_distinct(20).identifier(),
                AttributeSpec::new("company_name", DataType::String).with_size(60).with_distinct(20),
            ],
        )
        .unwrap();
        // Optional employer: a worker may have none, so the company cannot
        // anchor every worker row.
        cat.add_association(
            "employs",
            vec![
                EndSpec::new("Company", "employer", Multiplicity::optional()),
                EndSpec::new("Worker", "staff", Multiplicity::many()),
            ],
        )
        .unwrap();
        cat.add_struct(
            "S_Company",
            &["Company".into()],
            &["company_name".into(), "employs".into(), "Worker".into(), "salary".into()],
        )
        .unwrap();
        cat.add_set("T_Company", &["S_Company".into()]).unwrap();
        let report = Checker::for_design().check(&cat);
        assert!(report.fired("anchor-reachable"));
    }

    #[test]
    fn test_flat_rules_fire_on_nesting() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        cat.add_struct("S_Nested", &["Company".into()], &["company_name".into()])
            .unwrap();
        cat.add_set("N_Companies", &["S_Nested".into()]).unwrap();
        cat.add_struct("S_Host", &["Worker".into()], &["N_Companies".into()]).unwrap();
        cat.add_set("T_Host", &["S_Host".into()]).unwrap();
        let report = Checker::for_design().with_paradigm(Paradigm::Flat).check(&cat);
        assert!(report.fired("sets-top-level"));
        assert!(report.fired("structs-second-level"));
    }

    #[test]
    fn test_to_one_anchor_paths_fires() {
        let mut cat = employment_domain();
        one_table_per_subclass(&mut cat);
        // Anchoring on Company drags in many workers per row.
        cat.add_struct(
            "S_Payroll",
            &["Company".into()],
            &["company_name".into(), "employs".into(), "Worker".into(), "salary".into()],
        )
        .unwrap();
        cat.add_set("T_Payroll", &["S_Payroll".into()]).unwrap();
        let report = Checker::for_design().with_paradigm(Paradigm::Flat).check(&cat);
        assert!(report.fired("to-one-anchor-paths"));
    }
}
