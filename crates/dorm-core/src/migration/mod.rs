//! Migration planning: drain one installed design into another over the same
//! domain.
//!
//! The plan is a staged rebuild: create the target schema, then for every
//! target set synthesize a read query against the source design (reusing the
//! query translator with `project = all columns of the target set`), wrap it
//! in an insert, and finish with an annotation update and a statistics
//! refresh. Target sets are ordered anchors-before-referrers so foreign keys
//! hold while data flows in.

use crate::catalog::{Catalog, ContainerHop, EdgeId};
use crate::diag::Diagnostic;
use crate::error::Error;
use crate::query::{QuerySpec, QueryTranslator};
use crate::schema::{annotation_statement, dependency_order, Paradigm, SchemaGenerator, StatementBatch};

/// Plans the statement sequence that moves data between two designs.
#[derive(Debug, Clone)]
pub struct MigrationPlanner {
    source_paradigm: Paradigm,
    target_paradigm: Paradigm,
}

impl MigrationPlanner {
    /// Create a planner for the given source and target paradigms.
    pub fn new(source_paradigm: Paradigm, target_paradigm: Paradigm) -> Self {
        Self {
            source_paradigm,
            target_paradigm,
        }
    }

    /// Produce the ordered migration plan.
    ///
    /// Fails when the two catalogs describe different domains, or when the
    /// source is not annotated as containing data.
    pub fn plan(&self, source: &Catalog, target: &Catalog) -> Result<StatementBatch, Error> {
        if domain_signature(source) != domain_signature(target) {
            return Err(Error::DomainMismatch {
                source_domain: source.meta().domain.clone(),
                target: target.meta().domain.clone(),
            });
        }
        if !source.meta().has_data {
            return Err(Error::SourceNotPopulated(
                source
                    .meta()
                    .design
                    .clone()
                    .unwrap_or_else(|| source.meta().domain.clone()),
            ));
        }
        tracing::info!(
            source = %self.source_paradigm,
            target = %self.target_paradigm,
            "planning migration"
        );

        let mut batch = SchemaGenerator::new(self.target_paradigm).generate(target)?;
        if source.meta().design == target.meta().design {
            batch.warnings.push(Diagnostic::warning(
                "same-design",
                "source and target designs coincide; the migration copies data as-is",
            ));
        }

        let translator = QueryTranslator::new(self.source_paradigm);
        for set in dependency_order(target) {
            for struct_id in target.structs_in(set) {
                let statement =
                    self.insert_statement(source, target, &translator, set, struct_id, &mut batch)?;
                batch.push(statement);
            }
        }

        batch.push(annotation_statement(target, true, true)?);
        batch.push("ANALYZE;".to_string());
        Ok(batch)
    }

    /// One `INSERT INTO … SELECT …` moving a target struct's rows out of the
    /// source design.
    fn insert_statement(
        &self,
        source: &Catalog,
        target: &Catalog,
        translator: &QueryTranslator,
        set: EdgeId,
        struct_id: EdgeId,
        batch: &mut StatementBatch,
    ) -> Result<String, Error> {
        let table = target.edge(set).name();
        let columns = target.struct_columns(struct_id);
        let project: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
        let mut pattern: Vec<String> = Vec::new();
        for class in target.classes_in(struct_id) {
            pattern.push(target.atom(class).name().to_string());
        }
        for association in target.associations_in(struct_id) {
            pattern.push(target.atom(association).name().to_string());
        }

        let spec = QuerySpec::new(project.clone(), pattern, None);
        let translation = translator.translate(source, &spec)?;
        batch.warnings.extend(translation.warnings);

        match self.target_paradigm {
            Paradigm::Flat => Ok(format!(
                "INSERT INTO {}({})\n{};",
                table,
                project.join(", "),
                translation.sql
            )),
            Paradigm::JsonNested => {
                let paths: Vec<(String, Vec<ContainerHop>)> = columns
                    .iter()
                    .map(|c| {
                        (
                            c.name.clone(),
                            target.container_path(set, c.attribute).unwrap_or_default(),
                        )
                    })
                    .collect();
                let (object, grouping) = jsonb_object(&paths);
                let mut statement = format!(
                    "INSERT INTO {}(value)\n  SELECT {}\n  FROM (\n{}) AS src",
                    table, object, translation.sql
                );
                if !grouping.is_empty() {
                    statement.push_str("\nGROUP BY ");
                    statement.push_str(&grouping.join(", "));
                }
                statement.push(';');
                Ok(statement)
            }
        }
    }
}

/// Stable fingerprint of the domain atoms, independent of the design.
fn domain_signature(catalog: &Catalog) -> Vec<(String, String)> {
    let mut signature: Vec<(String, String)> = catalog
        .atoms()
        .map(|(_, atom)| (atom.kind().to_string(), atom.name().to_string()))
        .collect();
    signature.sort();
    signature
}

/// Build the document constructor for one target row: scalar fields at this
/// level, nested structs as objects, one level of nested sets as aggregated
/// arrays (which forces grouping by the scalar fields).
fn jsonb_object(columns: &[(String, Vec<ContainerHop>)]) -> (String, Vec<String>) {
    let mut pairs: Vec<String> = Vec::new();
    let mut scalars: Vec<String> = Vec::new();
    let mut nested: Vec<(ContainerHop, Vec<(String, Vec<ContainerHop>)>)> = Vec::new();
    for (name, path) in columns {
        match path.split_first() {
            None => {
                pairs.push(format!("('{name}', to_jsonb({name}))"));
                scalars.push(name.clone());
            }
            Some((hop, rest)) => {
                match nested.iter_mut().find(|(h, _)| h.name == hop.name) {
                    Some((_, inner)) => inner.push((name.clone(), rest.to_vec())),
                    None => nested.push((hop.clone(), vec![(name.clone(), rest.to_vec())])),
                }
            }
        }
    }
    let mut needs_grouping = false;
    for (hop, inner) in nested {
        let (object, _) = jsonb_object(&inner);
        if hop.is_collection {
            pairs.push(format!("('{}', jsonb_agg(DISTINCT {}))", hop.name, object));
            needs_grouping = true;
        } else {
            pairs.push(format!("('{}', to_jsonb({}))", hop.name, object));
        }
    }
    let grouping = if needs_grouping { scalars } else { Vec::new() };
    (
        format!(
            "(SELECT jsonb_object_agg(k,v) FROM (VALUES {}) AS kv(k,v))",
            pairs.join(", ")
        ),
        grouping,
    )
}
