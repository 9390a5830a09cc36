//! Query translation: from domain-level select-project-join queries to
//! executable statements over the installed design.

mod expand;
mod spec;
mod stmt;
mod translate;

pub use spec::{parse_conjunction, predicate_attributes, CompareOp, Predicate, QuerySpec};
pub use stmt::{ColumnExpr, FilterPredicate, JoinPredicate, SelectStmt};
pub use translate::{QueryTranslator, Translation};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AttributeSpec, Catalog, DataType, EndSpec, Multiplicity};
    use crate::error::Error;
    use crate::schema::Paradigm;

    /// Books and authors in one flat table anchored on the book.
    fn single_table_catalog() -> Catalog {
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
                AttributeSpec::new("age", DataType::Int32).with_distinct(90),
            ],
        )
        .unwrap();
        cat.add_association(
            "writes",
            vec![
                EndSpec::new("Book", "written", Multiplicity::some()),
                EndSpec::new("Author", "writer", Multiplicity::one()),
            ],
        )
        .unwrap();
        cat.add_struct(
            "S_BookAuthor",
            &["Book".into()],
            &[
                "title".into(),
                "writes".into(),
                "Author".into(),
                "author_name".into(),
                "age".into(),
            ],
        )
        .unwrap();
        cat.add_set("T_BookAuthor", &["S_BookAuthor".into()]).unwrap();
        cat.meta_mut().design = Some("one_table".into());
        cat
    }

    /// Books and authors in two tables linked by the loose `writer` end.
    fn two_table_catalog() -> Catalog {
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
                AttributeSpec::new("age", DataType::Int32).with_distinct(90),
            ],
        )
        .unwrap();
        cat.add_association(
            "writes",
            vec![
                EndSpec::new("Book", "written", Multiplicity::some()),
                EndSpec::new("Author", "writer", Multiplicity::one()),
            ],
        )
        .unwrap();
        cat.add_struct(
            "S_Book",
            &["Book".into()],
            &["title".into(), "writes".into()],
        )
        .unwrap();
        cat.add_struct(
            "S_Author",
            &["Author".into()],
            &["author_name".into(), "age".into()],
        )
        .unwrap();
        cat.add_set("T_Book", &["S_Book".into()]).unwrap();
        cat.add_set("T_Author", &["S_Author".into()]).unwrap();
        cat.meta_mut().design = Some("two_tables".into());
        cat
    }

    /// Persons specialized into students and workers, one table each.
    fn subclass_tables_catalog() -> Catalog {
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
        cat.add_struct(
            "S_Student",
            &["Student".into()],
            &["full_name".into(), "degree".into()],
        )
        .unwrap();
        cat.add_struct(
            "S_Worker",
            &["Worker".into()],
            &["full_name".into(), "salary".into()],
        )
        .unwrap();
        cat.add_set("T_Student", &["S_Student".into()]).unwrap();
        cat.add_set("T_Worker", &["S_Worker".into()]).unwrap();
        cat.meta_mut().design = Some("per_subclass".into());
        cat
    }

    #[test]
    fn test_single_table_select() {
        let cat = single_table_catalog();
        let spec = QuerySpec::new(
            ["title", "author_name"],
            ["Book", "writes", "Author"],
            Some("age>100"),
        );
        let translation = QueryTranslator::new(Paradigm::Flat)
            .translate(&cat, &spec)
            .unwrap();
        assert_eq!(
            translation.sql,
            "SELECT title, author_name\nFROM T_BookAuthor\nWHERE age>100"
        );
        assert_eq!(translation.branches, 1);
        assert!(!translation.from_dedup);
    }

    #[test]
    fn test_two_table_join() {
        let cat = two_table_catalog();
        let spec = QuerySpec::new(
            ["title", "author_name"],
            ["Book", "writes", "Author"],
            Some("age>100"),
        );
        let translation = QueryTranslator::new(Paradigm::Flat)
            .translate(&cat, &spec)
            .unwrap();
        assert_eq!(
            translation.sql,
            "SELECT t2.title, t1.author_name\nFROM T_Author t1\n  JOIN T_Book t2 ON t2.writer=t1.author_id\nWHERE t1.age>100"
        );
    }

    #[test]
    fn test_loose_end_projection_without_target_class() {
        let cat = two_table_catalog();
        let spec = QuerySpec::new(["title", "writer"], ["Book", "writes"], None);
        let translation = QueryTranslator::new(Paradigm::Flat)
            .translate(&cat, &spec)
            .unwrap();
        assert_eq!(translation.sql, "SELECT title, writer\nFROM T_Book");
    }

    #[test]
    fn test_generalization_union() {
        let cat = subclass_tables_catalog();
        let spec = QuerySpec::new(["full_name"], ["Person"], None);
        let translation = QueryTranslator::new(Paradigm::Flat)
            .translate(&cat, &spec)
            .unwrap();
        assert_eq!(
            translation.sql,
            "SELECT full_name\nFROM T_Student\nUNION ALL\nSELECT full_name\nFROM T_Worker"
        );
        assert_eq!(translation.branches, 2);
    }

    #[test]
    fn test_subclass_branch_keeps_subclass_attribute() {
        let cat = subclass_tables_catalog();
        let spec = QuerySpec::new(["full_name"], ["Person"], Some("salary>1000"));
        let translation = QueryTranslator::new(Paradigm::Flat)
            .translate(&cat, &spec)
            .unwrap();
        // The student branch cannot see `salary` and is dropped.
        assert_eq!(
            translation.sql,
            "SELECT full_name\nFROM T_Worker\nWHERE salary>1000"
        );
        assert!(translation
            .warnings
            .iter()
            .any(|w| w.code == "branch-dropped"));
    }

    #[test]
    fn test_json_paradigm_paths() {
        let cat = single_table_catalog();
        let spec = QuerySpec::new(
            ["title", "author_name"],
            ["Book", "writes", "Author"],
            Some("age>100"),
        );
        let translation = QueryTranslator::new(Paradigm::JsonNested)
            .translate(&cat, &spec)
            .unwrap();
        assert_eq!(
            translation.sql,
            "SELECT value->>'title' AS title, value->>'author_name' AS author_name\nFROM T_BookAuthor\nWHERE value->>'age'>100"
        );
    }

    #[test]
    fn test_unknown_names_and_dangling_predicates() {
        let cat = single_table_catalog();
        let translator = QueryTranslator::new(Paradigm::Flat);

        let spec = QuerySpec::new(["title"], ["Pamphlet"], None);
        assert!(matches!(
            translator.translate(&cat, &spec),
            Err(Error::UnknownName(_))
        ));

        let spec = QuerySpec::new(["title"], ["Book"], Some("age>100"));
        assert!(matches!(
            translator.translate(&cat, &spec),
            Err(Error::DanglingPredicate(_))
        ));
    }

    #[test]
    fn test_disconnected_pattern() {
        let mut cat = two_table_catalog();
        cat.add_class(
            "Publisher",
            10,
            vec![AttributeSpec::new("publisher_id", DataType::Int64)
                .with_distinct(10)
                .identifier()],
        )
        .unwrap();
        cat.add_struct("S_Publisher", &["Publisher".into()], &[]).unwrap();
        cat.add_set("T_Publisher", &["S_Publisher".into()]).unwrap();
        let spec = QuerySpec::new(["title", "publisher_id"], ["Book", "Publisher"], None);
        assert!(matches!(
            QueryTranslator::new(Paradigm::Flat).translate(&cat, &spec),
            Err(Error::Disconnected(_))
        ));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let cat = subclass_tables_catalog();
        let spec = QuerySpec::new(["full_name"], ["Person"], None);
        let translator = QueryTranslator::new(Paradigm::Flat);
        let a = translator.translate(&cat, &spec).unwrap();
        let b = translator.translate(&cat, &spec).unwrap();
        assert_eq!(a.sql, b.sql);
    }
}
