//! Value trees for translated statements.
//!
//! Every query branch is assembled as a [`SelectStmt`] value first; rendering
//! to SQL happens last and is parameterized by the paradigm. Keeping branches
//! as values lets the translator deduplicate them by structural equality
//! before the `UNION ALL` assembly.

use crate::catalog::ContainerHop;
use crate::schema::Paradigm;

use super::spec::CompareOp;

/// A reference to one physical column, possibly nested inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnExpr {
    /// Alias of the table the column lives in.
    pub alias: String,
    /// Container chain inside the document (empty under FLAT).
    pub containers: Vec<ContainerHop>,
    /// Column or document field name.
    pub column: String,
}

impl ColumnExpr {
    /// Render the column access for a paradigm; `qualify` controls whether
    /// the table alias is spelled out (single-table statements omit it).
    pub fn render(&self, paradigm: Paradigm, qualify: bool) -> String {
        match paradigm {
            Paradigm::Flat => {
                if qualify {
                    format!("{}.{}", self.alias, self.column)
                } else {
                    self.column.clone()
                }
            }
            Paradigm::JsonNested => {
                let mut path = if qualify {
                    format!("{}.value", self.alias)
                } else {
                    "value".to_string()
                };
                for hop in &self.containers {
                    if hop.is_collection {
                        path = format!("jsonb_array_elements({path}->'{}')", hop.name);
                    } else {
                        path = format!("{path}->'{}'", hop.name);
                    }
                }
                format!("{path}->>'{}'", self.column)
            }
        }
    }
}

/// One join predicate between two physical columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinPredicate {
    /// Left column.
    pub left: ColumnExpr,
    /// Right column.
    pub right: ColumnExpr,
}

/// One filter predicate over a physical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterPredicate {
    /// Filtered column.
    pub column: ColumnExpr,
    /// Comparison operator.
    pub op: CompareOp,
    /// Literal right side, verbatim.
    pub literal: String,
}

/// One translated select-project-join branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectStmt {
    /// Output columns: label and source, in projection order.
    pub projections: Vec<(String, ColumnExpr)>,
    /// Tables with their aliases, in FROM order.
    pub tables: Vec<(String, String)>,
    /// Join predicates.
    pub joins: Vec<JoinPredicate>,
    /// Filter predicates.
    pub filters: Vec<FilterPredicate>,
    /// Whether a duplicate FROM occurrence was collapsed during synthesis.
    pub from_dedup: bool,
}

impl SelectStmt {
    /// Render the branch to SQL for one paradigm.
    pub fn render(&self, paradigm: Paradigm) -> String {
        let qualify = self.tables.len() > 1;
        let mut out = String::from("SELECT ");
        let rendered: Vec<String> = self
            .projections
            .iter()
            .map(|(label, expr)| {
                let access = expr.render(paradigm, qualify);
                match paradigm {
                    Paradigm::Flat => access,
                    Paradigm::JsonNested => format!("{access} AS {label}"),
                }
            })
            .collect();
        out.push_str(&rendered.join(", "));

        out.push_str("\nFROM ");
        let mut where_clauses: Vec<String> = Vec::new();
        if qualify {
            for (i, (table, alias)) in self.tables.iter().enumerate() {
                if i == 0 {
                    out.push_str(&format!("{table} {alias}"));
                    continue;
                }
                let on: Vec<String> = self
                    .joins
                    .iter()
                    .filter(|j| self.join_anchor(j) == Some(i))
                    .map(|j| {
                        format!(
                            "{}={}",
                            j.left.render(paradigm, true),
                            j.right.render(paradigm, true)
                        )
                    })
                    .collect();
                out.push_str(&format!("\n  JOIN {table} {alias} ON {}", on.join(" AND ")));
            }
        } else if let Some((table, _)) = self.tables.first() {
            out.push_str(table);
        }
        // Same-alias predicates (collapsed FROM occurrences) filter rows
        // instead of joining tables.
        for join in &self.joins {
            if join.left.alias == join.right.alias {
                where_clauses.push(format!(
                    "{}={}",
                    join.left.render(paradigm, qualify),
                    join.right.render(paradigm, qualify)
                ));
            }
        }

        for filter in &self.filters {
            where_clauses.push(format!(
                "{}{}{}",
                filter.column.render(paradigm, qualify),
                filter.op.as_sql(),
                filter.literal
            ));
        }
        if !where_clauses.is_empty() {
            out.push_str("\nWHERE ");
            out.push_str(&where_clauses.join(" AND "));
        }
        out
    }

    /// Index of the later table a cross-table join predicate attaches to.
    fn join_anchor(&self, join: &JoinPredicate) -> Option<usize> {
        if join.left.alias == join.right.alias {
            return None;
        }
        let position = |alias: &str| self.tables.iter().position(|(_, a)| a == alias);
        match (position(&join.left.alias), position(&join.right.alias)) {
            (Some(l), Some(r)) => Some(l.max(r)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(alias: &str, column: &str) -> ColumnExpr {
        ColumnExpr {
            alias: alias.into(),
            containers: Vec::new(),
            column: column.into(),
        }
    }

    #[test]
    fn test_render_single_table_flat() {
        let stmt = SelectStmt {
            projections: vec![("title".into(), col("t1", "title"))],
            tables: vec![("T_Book".into(), "t1".into())],
            joins: vec![],
            filters: vec![FilterPredicate {
                column: col("t1", "age"),
                op: CompareOp::Gt,
                literal: "100".into(),
            }],
            from_dedup: false,
        };
        assert_eq!(
            stmt.render(Paradigm::Flat),
            "SELECT title\nFROM T_Book\nWHERE age>100"
        );
    }

    #[test]
    fn test_render_join_flat() {
        let stmt = SelectStmt {
            projections: vec![
                ("title".into(), col("t2", "title")),
                ("author_name".into(), col("t1", "author_name")),
            ],
            tables: vec![
                ("T_Author".into(), "t1".into()),
                ("T_Book".into(), "t2".into()),
            ],
            joins: vec![JoinPredicate {
                left: col("t2", "writer"),
                right: col("t1", "author_id"),
            }],
            filters: vec![],
            from_dedup: false,
        };
        assert_eq!(
            stmt.render(Paradigm::Flat),
            "SELECT t2.title, t1.author_name\nFROM T_Author t1\n  JOIN T_Book t2 ON t2.writer=t1.author_id"
        );
    }

    #[test]
    fn test_render_json_paths() {
        let stmt = SelectStmt {
            projections: vec![(
                "title".into(),
                ColumnExpr {
                    alias: "t1".into(),
                    containers: vec![ContainerHop {
                        name: "S_Inner".into(),
                        is_collection: false,
                    }],
                    column: "title".into(),
                },
            )],
            tables: vec![("T_Book".into(), "t1".into())],
            joins: vec![],
            filters: vec![],
            from_dedup: false,
        };
        assert_eq!(
            stmt.render(Paradigm::JsonNested),
            "SELECT value->'S_Inner'->>'title' AS title\nFROM T_Book"
        );
    }

    #[test]
    fn test_collection_hop_renders_array_elements() {
        let expr = ColumnExpr {
            alias: "t1".into(),
            containers: vec![ContainerHop {
                name: "N_Authors".into(),
                is_collection: true,
            }],
            column: "author_name".into(),
        };
        assert_eq!(
            expr.render(Paradigm::JsonNested, true),
            "jsonb_array_elements(t1.value->'N_Authors')->>'author_name'"
        );
    }
}
