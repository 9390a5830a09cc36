//! End-to-end scenarios: documents in, checked catalogs, statements out.

use dorm_core::loader::{self, DesignDocument, DomainDocument};
use dorm_core::{
    CancelToken, Catalog, Checker, Error, MigrationPlanner, Paradigm, QuerySpec, QueryTranslator,
    RecordingSink, SchemaGenerator,
};

fn library_domain() -> DomainDocument {
    loader::parse_domain(
        r#"{
            "name": "library",
            "classes": [
                {"name": "Book", "count": 1000, "attributes": [
                    {"name": "isbn", "data_type": "String", "size": 13, "distinct_values": 1000, "identifier": true},
                    {"name": "title", "data_type": "String", "size": 120, "distinct_values": 950},
                    {"name": "pub_year", "data_type": "Int32", "distinct_values": 80}
                ]},
                {"name": "Author", "count": 400, "attributes": [
                    {"name": "author_id", "data_type": "Int64", "distinct_values": 400, "identifier": true},
                    {"name": "author_name", "data_type": "String", "size": 80, "distinct_values": 390},
                    {"name": "age", "data_type": "Int32", "distinct_values": 90},
                    {"name": "gender", "data_type": "String", "size": 1, "distinct_values": 3},
                    {"name": "country", "data_type": "String", "size": 40, "distinct_values": 60}
                ]}
            ],
            "associations": [
                {"name": "writes", "ends": [
                    {"class": "Book", "role": "written", "min": 1},
                    {"class": "Author", "role": "writer", "min": 1, "max": 1}
                ]}
            ]
        }"#,
    )
    .unwrap()
}

fn one_table_design() -> DesignDocument {
    loader::parse_design(
        r#"{
            "name": "book_author_row",
            "domain": "library",
            "hyperedges": [
                {"kind": "Struct", "name": "S_BookAuthor", "anchor": ["Book"],
                 "elements": ["title", "pub_year", "writes", "Author",
                              "author_name", "age", "gender", "country"]},
                {"kind": "Set", "name": "T_BookAuthor", "contents": ["S_BookAuthor"]}
            ]
        }"#,
    )
    .unwrap()
}

fn people_domain() -> DomainDocument {
    loader::parse_domain(
        r#"{
            "name": "people",
            "classes": [
                {"name": "Person", "count": 100, "attributes": [
                    {"name": "pid", "data_type": "Int64", "distinct_values": 100, "identifier": true},
                    {"name": "full_name", "data_type": "String", "size": 80, "distinct_values": 95}
                ]},
                {"name": "Student", "count": 60, "attributes": [
                    {"name": "degree", "data_type": "String", "size": 30, "distinct_values": 12}
                ]},
                {"name": "Worker", "count": 50, "attributes": [
                    {"name": "salary", "data_type": "Int64", "distinct_values": 40}
                ]}
            ],
            "generalizations": [
                {"name": "person_kinds", "disjoint": false, "complete": true,
                 "superclass": "Person",
                 "subclasses": [
                    {"class": "Student", "constraint": "degree<>''"},
                    {"class": "Worker", "constraint": "salary>0"}
                 ]}
            ]
        }"#,
    )
    .unwrap()
}

fn book_query() -> QuerySpec {
    QuerySpec::new(
        ["title", "author_name"],
        ["Book", "writes", "Author"],
        Some("age>100"),
    )
}

#[test]
fn books_authors_flat_single_table() {
    let catalog = loader::build_design(&library_domain(), &one_table_design()).unwrap();
    let report = Checker::for_design().with_paradigm(Paradigm::Flat).check(&catalog);
    assert!(report.is_ok(), "unexpected: {:?}", report.diagnostics());

    let schema = SchemaGenerator::new(Paradigm::Flat).generate(&catalog).unwrap();
    assert!(schema.script().contains("CREATE TABLE T_BookAuthor"));
    assert!(schema.script().contains("ALTER TABLE T_BookAuthor ADD PRIMARY KEY (isbn);"));

    let translation = QueryTranslator::new(Paradigm::Flat)
        .translate(&catalog, &book_query())
        .unwrap();
    assert_eq!(
        translation.sql,
        "SELECT title, author_name\nFROM T_BookAuthor\nWHERE age>100"
    );
}

#[test]
fn books_authors_json_nested_same_shape() {
    let catalog = loader::build_design(&library_domain(), &one_table_design()).unwrap();
    let report = Checker::for_design()
        .with_paradigm(Paradigm::JsonNested)
        .check(&catalog);
    assert!(report.is_ok(), "unexpected: {:?}", report.diagnostics());

    let schema = SchemaGenerator::new(Paradigm::JsonNested)
        .generate(&catalog)
        .unwrap();
    assert!(schema
        .script()
        .contains("CREATE TABLE T_BookAuthor (\n  key SERIAL,\n  value JSONB\n  );"));

    let translation = QueryTranslator::new(Paradigm::JsonNested)
        .translate(&catalog, &book_query())
        .unwrap();
    assert_eq!(
        translation.sql,
        "SELECT value->>'title' AS title, value->>'author_name' AS author_name\nFROM T_BookAuthor\nWHERE value->>'age'>100"
    );
}

#[test]
fn person_query_unions_subclass_tables() {
    let design = loader::parse_design(
        r#"{
            "name": "per_subclass",
            "domain": "people",
            "hyperedges": [
                {"kind": "Struct", "name": "S_Student", "anchor": ["Student"],
                 "elements": ["full_name", "degree"]},
                {"kind": "Struct", "name": "S_Worker", "anchor": ["Worker"],
                 "elements": ["full_name", "salary"]},
                {"kind": "Set", "name": "T_Student", "contents": ["S_Student"]},
                {"kind": "Set", "name": "T_Worker", "contents": ["S_Worker"]}
            ]
        }"#,
    )
    .unwrap();
    let catalog = loader::build_design(&people_domain(), &design).unwrap();
    let report = Checker::for_design().with_paradigm(Paradigm::Flat).check(&catalog);
    assert!(report.is_ok(), "unexpected: {:?}", report.diagnostics());

    let translation = QueryTranslator::new(Paradigm::Flat)
        .translate(&catalog, &QuerySpec::new(["full_name"], ["Person"], None))
        .unwrap();
    assert_eq!(
        translation.sql,
        "SELECT full_name\nFROM T_Student\nUNION ALL\nSELECT full_name\nFROM T_Worker"
    );
}

#[test]
fn shared_set_without_discriminant_is_rejected() {
    let design = loader::parse_design(
        r#"{
            "name": "shared_no_discriminant",
            "domain": "people",
            "hyperedges": [
                {"kind": "Struct", "name": "S_Student", "anchor": ["Student"],
                 "elements": ["full_name"]},
                {"kind": "Struct", "name": "S_Worker", "anchor": ["Worker"],
                 "elements": ["full_name"]},
                {"kind": "Set", "name": "T_Person", "contents": ["S_Student", "S_Worker"]}
            ]
        }"#,
    )
    .unwrap();
    let catalog = loader::build_design(&people_domain(), &design).unwrap();
    let report = Checker::for_design().check(&catalog);
    assert!(!report.is_ok());
    assert!(report.fired("sibling-discriminator"));
}

#[test]
fn migration_plan_creates_fills_and_refreshes() {
    let mut source = loader::build_design(&library_domain(), &one_table_design()).unwrap();
    source.meta_mut().tables_created = true;
    source.meta_mut().has_data = true;

    let target_design = loader::parse_design(
        r#"{
            "name": "two_tables",
            "domain": "library",
            "hyperedges": [
                {"kind": "Struct", "name": "S_Book", "anchor": ["Book"],
                 "elements": ["title", "pub_year", "writes"]},
                {"kind": "Struct", "name": "S_Author", "anchor": ["Author"],
                 "elements": ["author_name", "age", "gender", "country"]},
                {"kind": "Set", "name": "T_Book", "contents": ["S_Book"]},
                {"kind": "Set", "name": "T_Author", "contents": ["S_Author"]}
            ]
        }"#,
    )
    .unwrap();
    let target = loader::build_design(&library_domain(), &target_design).unwrap();
    let report = Checker::for_design().with_paradigm(Paradigm::Flat).check(&target);
    assert!(report.is_ok(), "unexpected: {:?}", report.diagnostics());

    let plan = MigrationPlanner::new(Paradigm::Flat, Paradigm::Flat)
        .plan(&source, &target)
        .unwrap();
    let script = plan.script();

    // Creation precedes the loads, anchors precede referrers, statistics
    // refresh comes last.
    let create_book = script.find("CREATE TABLE T_Book").unwrap();
    let insert_author = script.find("INSERT INTO T_Author").unwrap();
    let insert_book = script.find("INSERT INTO T_Book(").unwrap();
    assert!(create_book < insert_author);
    assert!(insert_author < insert_book);
    assert!(script.ends_with("ANALYZE;"));
    assert!(script.contains("FROM T_BookAuthor"));

    // The plan drains through a sink in order.
    let mut sink = RecordingSink::new();
    dorm_core::sink::run_batch(&mut sink, &plan, &CancelToken::new()).unwrap();
    assert_eq!(sink.statements.len(), plan.statements.len());

    // Without the data annotation the planner refuses outright.
    let mut empty_source = loader::build_design(&library_domain(), &one_table_design()).unwrap();
    empty_source.meta_mut().tables_created = true;
    assert!(matches!(
        MigrationPlanner::new(Paradigm::Flat, Paradigm::Flat).plan(&empty_source, &target),
        Err(Error::SourceNotPopulated(_))
    ));
}

#[test]
fn triple_nested_sets_are_rejected() {
    let design = loader::parse_design(
        r#"{
            "name": "too_deep",
            "domain": "library",
            "hyperedges": [
                {"kind": "Struct", "name": "S_Author", "anchor": ["Author"],
                 "elements": ["author_name", "age", "gender", "country"]},
                {"kind": "Set", "name": "N_Authors", "contents": ["S_Author"]},
                {"kind": "Struct", "name": "S_Shelf", "anchor": ["Book"],
                 "elements": ["title", "pub_year", "writes", "N_Authors"]},
                {"kind": "Set", "name": "N_Shelves", "contents": ["S_Shelf"]},
                {"kind": "Struct", "name": "S_Room", "anchor": ["Book"],
                 "elements": ["N_Shelves"]},
                {"kind": "Set", "name": "T_Room", "contents": ["S_Room"]}
            ]
        }"#,
    )
    .unwrap();
    let catalog = loader::build_design(&library_domain(), &design).unwrap();
    let report = Checker::for_design()
        .with_paradigm(Paradigm::JsonNested)
        .check(&catalog);
    assert!(!report.is_ok());
    assert!(report.fired("set-nesting-depth"));
}

#[test]
fn serialized_catalog_produces_identical_output() {
    let catalog = loader::build_design(&library_domain(), &one_table_design()).unwrap();

    // Through a file, the way the CLI persists catalogs.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("library.catalog");
    std::fs::write(&path, catalog.to_bytes().unwrap()).unwrap();
    let restored = Catalog::from_bytes(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(catalog, restored);

    let generator = SchemaGenerator::new(Paradigm::Flat);
    assert_eq!(
        generator.generate(&catalog).unwrap().script(),
        generator.generate(&restored).unwrap().script()
    );
    let translator = QueryTranslator::new(Paradigm::Flat);
    assert_eq!(
        translator.translate(&catalog, &book_query()).unwrap().sql,
        translator.translate(&restored, &book_query()).unwrap().sql
    );
}

#[test]
fn projected_attributes_appear_once_per_branch() {
    let catalog = loader::build_design(&library_domain(), &one_table_design()).unwrap();
    let translation = QueryTranslator::new(Paradigm::Flat)
        .translate(&catalog, &book_query())
        .unwrap();
    for branch in translation.sql.split("UNION ALL") {
        let select_line = branch.lines().find(|l| l.starts_with("SELECT ")).unwrap();
        assert_eq!(select_line.matches("title").count(), 1);
        assert_eq!(select_line.matches("author_name").count(), 1);
    }
}
