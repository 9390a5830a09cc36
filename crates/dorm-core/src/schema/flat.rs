//! Flat relational DDL: one table per first-level set, one column per
//! attribute, keys derived from the anchors.

use std::collections::HashSet;

use crate::catalog::{AtomId, Catalog, EdgeId, StructColumn};
use crate::error::Error;

/// Columns of a table: the union of the columns of every struct in the set,
/// first struct first, duplicates dropped.
fn table_columns(catalog: &Catalog, set: EdgeId) -> Vec<StructColumn> {
    let mut columns: Vec<StructColumn> = Vec::new();
    for struct_id in catalog.structs_in(set) {
        for column in catalog.struct_columns(struct_id) {
            if !columns.iter().any(|c| c.name == column.name) {
                columns.push(column);
            }
        }
    }
    // A degenerate set holding a single class still yields that class's
    // columns.
    if columns.is_empty() {
        columns = catalog.struct_columns(set);
    }
    columns
}

/// The `CREATE TABLE` statement for one set.
pub(super) fn create_table(catalog: &Catalog, set: EdgeId) -> Result<String, Error> {
    let table = catalog.edge(set).name();
    tracing::debug!(table, "creating table");
    let mut lines = Vec::new();
    for column in table_columns(catalog, set) {
        let attr = catalog
            .attribute_def(column.attribute)
            .ok_or_else(|| Error::Internal(format!("column '{}' has no attribute", column.name)))?;
        lines.push(format!("  {} {}", column.name, attr.data_type.sql_type(attr.size)));
    }
    Ok(format!("CREATE TABLE {} (\n{}\n  );", table, lines.join(",\n")))
}

/// The `ALTER TABLE … ADD PRIMARY KEY` statement for one set. All structs in
/// a set share their anchor columns, so any struct provides the key.
pub(super) fn add_primary_key(catalog: &Catalog, set: EdgeId) -> Result<String, Error> {
    let table = catalog.edge(set).name();
    let struct_id = catalog
        .structs_in(set)
        .first()
        .copied()
        .unwrap_or(set);
    let key: Vec<String> = catalog
        .anchor_key_columns(struct_id)
        .into_iter()
        .map(|c| c.name)
        .collect();
    if key.is_empty() {
        return Err(Error::Internal(format!(
            "table '{table}' has no anchor columns for a primary key"
        )));
    }
    Ok(format!(
        "ALTER TABLE {} ADD PRIMARY KEY ({});",
        table,
        key.join(", ")
    ))
}

/// True when `attribute` is the identifier of the single anchor class of the
/// given set, making the set a foreign-key target for that column.
pub(super) fn is_anchor_identifier(catalog: &Catalog, set: EdgeId, attribute: AtomId) -> bool {
    let struct_id = catalog.structs_in(set).first().copied().unwrap_or(set);
    let points = catalog.anchor_points(struct_id);
    points.len() == 1 && catalog.identifier_of(points[0]) == Some(attribute)
}

/// The `ALTER TABLE … ADD FOREIGN KEY` statements for one set: every column
/// holding a class identifier that anchors another table points there.
pub(super) fn add_foreign_keys(catalog: &Catalog, set: EdgeId, all: &[EdgeId]) -> Vec<String> {
    let table = catalog.edge(set).name();
    let mut statements = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    for column in table_columns(catalog, set) {
        let Some(attr) = catalog.attribute_def(column.attribute) else {
            continue;
        };
        if !attr.identifier {
            continue;
        }
        for &referred in all {
            if !is_anchor_identifier(catalog, referred, column.attribute) {
                continue;
            }
            // A table's own anchor column is a primary key, not a reference.
            if referred == set && column.name == attr.name {
                continue;
            }
            let statement = format!(
                "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {}({});",
                table,
                column.name,
                catalog.edge(referred).name(),
                attr.name
            );
            if seen.insert(statement.clone()) {
                statements.push(statement);
            }
        }
    }
    statements
}
