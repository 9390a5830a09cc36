//! Loader: parses domain and design documents into a typed catalog.
//!
//! The loader performs no semantic checks; it only resolves names into arena
//! indices. Everything semantic is the checker's business, so a loadable but
//! inconsistent catalog round-trips into diagnostics instead of failing here.

mod document;

pub use document::{
    AssociationDoc, AttributeDoc, ClassDoc, DesignDocument, DomainDocument, EndDoc,
    GeneralizationDoc, HyperedgeDoc, QueryDoc, QueryDocument, SubclassDoc,
};

use crate::catalog::{AttributeSpec, Catalog, EndSpec, Multiplicity};
use crate::error::Error;

/// Parse a domain document from JSON.
pub fn parse_domain(json: &str) -> Result<DomainDocument, Error> {
    serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))
}

/// Parse a design document from JSON.
pub fn parse_design(json: &str) -> Result<DesignDocument, Error> {
    serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))
}

/// Parse a query batch from JSON.
pub fn parse_queries(json: &str) -> Result<QueryDocument, Error> {
    serde_json::from_str(json).map_err(|e| Error::Parse(e.to_string()))
}

/// Build a catalog holding only the domain atoms.
pub fn build_domain(domain: &DomainDocument) -> Result<Catalog, Error> {
    tracing::info!(domain = %domain.name, "loading domain");
    let mut catalog = Catalog::new(domain.name.clone());
    for class in &domain.classes {
        let attributes = class
            .attributes
            .iter()
            .map(|a| {
                Ok(AttributeSpec {
                    name: a.name.clone(),
                    data_type: a.data_type.parse()?,
                    size: a.size,
                    distinct_values: a.distinct_values,
                    identifier: a.identifier,
                })
            })
            .collect::<Result<Vec<_>, Error>>()?;
        catalog.add_class(class.name.clone(), class.count, attributes)?;
    }
    for association in &domain.associations {
        let ends = association
            .ends
            .iter()
            .map(|e| {
                EndSpec::new(
                    e.class.clone(),
                    e.role.clone(),
                    Multiplicity {
                        min: e.min,
                        max: e.max,
                    },
                )
            })
            .collect();
        catalog.add_association(association.name.clone(), ends)?;
    }
    for generalization in &domain.generalizations {
        let branches = generalization
            .subclasses
            .iter()
            .map(|s| (s.class.clone(), s.constraint.clone()))
            .collect();
        catalog.add_generalization(
            generalization.name.clone(),
            generalization.disjoint,
            generalization.complete,
            &generalization.superclass,
            branches,
        )?;
    }
    Ok(catalog)
}

/// Build a catalog holding the domain atoms plus the design hyperedges.
///
/// Hyperedges may reference each other in any declaration order; unresolved
/// references are retried until a pass makes no progress, at which point the
/// first missing name is reported.
pub fn build_design(domain: &DomainDocument, design: &DesignDocument) -> Result<Catalog, Error> {
    if design.domain != domain.name {
        return Err(Error::DomainMismatch {
            source_domain: domain.name.clone(),
            target: design.domain.clone(),
        });
    }
    let mut catalog = build_domain(domain)?;
    tracing::info!(design = %design.name, "loading design");

    let mut pending: Vec<&HyperedgeDoc> = design.hyperedges.iter().collect();
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        for doc in pending {
            let resolvable = doc.references().iter().all(|n| {
                catalog.lookup_atom(n).is_some()
                    || catalog.lookup_edge(n).is_some()
                    || design.hyperedges.iter().all(|h| h.name() != n.as_str())
            });
            if !resolvable {
                deferred.push(doc);
                continue;
            }
            match doc {
                HyperedgeDoc::Set { name, contents } => {
                    catalog.add_set(name.clone(), contents)?;
                }
                HyperedgeDoc::Struct {
                    name,
                    anchor,
                    elements,
                } => {
                    catalog.add_struct(name.clone(), anchor, elements)?;
                }
            }
        }
        if deferred.len() == before {
            let missing = deferred
                .first()
                .map(|d| d.name().to_string())
                .unwrap_or_default();
            return Err(Error::UnknownName(missing));
        }
        pending = deferred;
    }

    catalog.meta_mut().design = Some(design.name.clone());
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library_domain_json() -> &'static str {
        r#"{
            "name": "library",
            "classes": [
                {"name": "Book", "count": 1000, "attributes": [
                    {"name": "isbn", "data_type": "String", "size": 13, "distinct_values": 1000, "identifier": true},
                    {"name": "title", "data_type": "String", "size": 120, "distinct_values": 950}
                ]},
                {"name": "Author", "count": 400, "attributes": [
                    {"name": "author_id", "data_type": "Int64", "distinct_values": 400, "identifier": true},
                    {"name": "author_name", "data_type": "String", "size": 80, "distinct_values": 390}
                ]}
            ],
            "associations": [
                {"name": "writes", "ends": [
                    {"class": "Book", "role": "written", "min": 0},
                    {"class": "Author", "role": "writer", "min": 1}
                ]}
            ]
        }"#
    }

    fn library_design_json() -> &'static str {
        r#"{
            "name": "book_table",
            "domain": "library",
            "hyperedges": [
                {"kind": "Set", "name": "T_Book", "contents": ["S_Book"]},
                {"kind": "Struct", "name": "S_Book", "anchor": ["Book"],
                 "elements": ["title", "writes", "Author", "author_name"]}
            ]
        }"#
    }

    #[test]
    fn test_build_domain() {
        let doc = parse_domain(library_domain_json()).unwrap();
        let catalog = build_domain(&doc).unwrap();
        assert_eq!(catalog.meta().domain, "library");
        assert!(catalog.atom_named("Book").is_ok());
        assert!(catalog.atom_named("writer").is_ok());
        assert!(catalog.meta().design.is_none());
    }

    #[test]
    fn test_build_design_out_of_order_references() {
        // The set is declared before the struct it contains.
        let domain = parse_domain(library_domain_json()).unwrap();
        let design = parse_design(library_design_json()).unwrap();
        let catalog = build_design(&domain, &design).unwrap();
        assert_eq!(catalog.meta().design.as_deref(), Some("book_table"));
        assert!(catalog.edge_named("T_Book").is_ok());
        assert!(catalog.edge_named("S_Book").is_ok());
    }

    #[test]
    fn test_design_domain_mismatch() {
        let domain = parse_domain(library_domain_json()).unwrap();
        let mut design = parse_design(library_design_json()).unwrap();
        design.domain = "warehouse".into();
        assert!(matches!(
            build_design(&domain, &design),
            Err(Error::DomainMismatch { .. })
        ));
    }

    #[test]
    fn test_design_unknown_reference() {
        let domain = parse_domain(library_domain_json()).unwrap();
        let design = parse_design(
            r#"{
                "name": "broken",
                "domain": "library",
                "hyperedges": [
                    {"kind": "Set", "name": "T_Bad", "contents": ["S_Missing"]}
                ]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            build_design(&domain, &design),
            Err(Error::UnknownName(_))
        ));
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(matches!(parse_domain("not json"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_queries() {
        let doc = parse_queries(
            r#"{"queries": [
                {"project": ["title", "author_name"],
                 "pattern": ["Book", "writes", "Author"],
                 "filter": "title<>''"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.queries.len(), 1);
        assert_eq!(doc.queries[0].project.len(), 2);
    }
}
