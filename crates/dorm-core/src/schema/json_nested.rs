//! JSON-nested DDL: every table is a surrogate key plus one document column;
//! nested structs become objects, one level of nested sets becomes arrays.

use crate::catalog::{Catalog, EdgeId};
use crate::error::Error;

/// The `CREATE TABLE` statement for one set: identical for every set.
pub(super) fn create_table(catalog: &Catalog, set: EdgeId) -> String {
    let table = catalog.edge(set).name();
    tracing::debug!(table, "creating document table");
    format!("CREATE TABLE {table} (\n  key SERIAL,\n  value JSONB\n  );")
}

/// The surrogate primary key plus a unique index over the anchor fields
/// inside the document.
pub(super) fn add_keys(catalog: &Catalog, set: EdgeId) -> Result<Vec<String>, Error> {
    let table = catalog.edge(set).name();
    let struct_id = catalog.structs_in(set).first().copied().unwrap_or(set);
    let key: Vec<String> = catalog
        .anchor_key_columns(struct_id)
        .into_iter()
        .map(|c| format!("(value->>'{}')", c.name))
        .collect();
    if key.is_empty() {
        return Err(Error::Internal(format!(
            "table '{table}' has no anchor fields for a unique index"
        )));
    }
    Ok(vec![
        format!("ALTER TABLE {table} ADD PRIMARY KEY (key);"),
        format!(
            "CREATE UNIQUE INDEX pk_{table} ON {table} ({});",
            key.join(", ")
        ),
    ])
}
