//! The schema-to-prompt compiler.
//!
//! Builds an immutable [`SchemaSnapshot`] from catalog rows once at process
//! start, then renders it as sentence-form text: the full catalog for the
//! initial page, or a caller-selected subset for each regeneration. Rendering
//! is a pure function of (snapshot, comment index, selection): identical
//! inputs produce byte-identical text.

use std::collections::{HashMap, HashSet};

use serde_json::{json, Map, Value};

use super::errors::CatalogError;
use super::reader::CatalogReader;

/// Fixed message rendered when the caller selects no tables. A valid state,
/// not an error.
pub const NO_TABLES_SELECTED: &str = "No tables selected.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    /// Table-level description from the catalog. Kept on the model but never
    /// rendered; only column comments surface in the text.
    pub comment: String,
    /// Catalog enumeration order, preserved as returned.
    pub columns: Vec<Column>,
}

/// Process-lifetime view of the catalog, captured once at startup.
/// Re-introspecting means restarting the process.
#[derive(Debug, Clone)]
pub struct SchemaSnapshot {
    pub database: String,
    pub tables: Vec<Table>,
}

/// Column descriptions keyed by the exact (database, table, column) triple.
/// Hashed for O(1) lookup per rendered column.
#[derive(Debug, Clone, Default)]
pub struct CommentIndex {
    entries: HashMap<String, HashMap<String, HashMap<String, String>>>,
}

impl CommentIndex {
    /// Empty-string descriptions are dropped: they render identically to a
    /// missing comment, so they never enter the index.
    pub fn insert(&mut self, database: String, table: String, column: String, comment: String) {
        if comment.is_empty() {
            return;
        }
        self.entries
            .entry(database)
            .or_default()
            .entry(table)
            .or_default()
            .insert(column, comment);
    }

    pub fn get(&self, database: &str, table: &str, column: &str) -> Option<&str> {
        self.entries
            .get(database)?
            .get(table)?
            .get(column)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries
            .values()
            .flat_map(|tables| tables.values())
            .map(|columns| columns.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SchemaSnapshot {
    /// Capture the catalog: list tables, then each table's columns, then one
    /// bulk comment pass. Propagates the first reader error with no partial
    /// snapshot; startup treats that as fatal.
    pub async fn build<R: CatalogReader + ?Sized>(
        reader: &R,
        database: &str,
    ) -> Result<(SchemaSnapshot, CommentIndex), CatalogError> {
        let table_names = reader.list_tables().await?;
        let table_comments: HashMap<String, String> =
            reader.list_table_comments().await?.into_iter().collect();

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let columns = reader
                .list_columns(&name)
                .await?
                .into_iter()
                .map(|c| Column {
                    name: c.name,
                    data_type: c.data_type,
                })
                .collect();
            let comment = table_comments.get(&name).cloned().unwrap_or_default();
            tables.push(Table {
                name,
                comment,
                columns,
            });
        }

        let mut index = CommentIndex::default();
        for row in reader.list_all_comments().await? {
            index.insert(row.database, row.table, row.column, row.comment);
        }

        Ok((
            SchemaSnapshot {
                database: database.to_string(),
                tables,
            },
            index,
        ))
    }
}

/// Render every table as sentence text, plus the structured schema that
/// drives the selection UI: table name mapped to ordered `{name, type,
/// comment, selected}` records, every column initially selected.
pub fn render_full(
    snapshot: &SchemaSnapshot,
    comments: &CommentIndex,
) -> (String, Map<String, Value>) {
    let mut text = String::with_capacity(snapshot.tables.len() * 120);
    let mut structured = Map::new();

    for table in &snapshot.tables {
        push_table_clause(&mut text, snapshot, table, comments);

        let columns: Vec<Value> = table
            .columns
            .iter()
            .map(|col| {
                let comment = comments
                    .get(&snapshot.database, &table.name, &col.name)
                    .unwrap_or("");
                json!({
                    "name": col.name,
                    "type": col.data_type,
                    "comment": comment,
                    "selected": true,
                })
            })
            .collect();
        structured.insert(table.name.clone(), Value::Array(columns));
    }

    (text, structured)
}

/// Render only the tables named in `selection`, in snapshot order. Names not
/// present in the snapshot are ignored; the selection is a filter, not a
/// validated reference. An empty selection yields [`NO_TABLES_SELECTED`].
pub fn render_subset(
    snapshot: &SchemaSnapshot,
    comments: &CommentIndex,
    selection: &HashSet<String>,
) -> String {
    if selection.is_empty() {
        return NO_TABLES_SELECTED.to_string();
    }

    let mut text = String::new();
    for table in snapshot
        .tables
        .iter()
        .filter(|t| selection.contains(&t.name))
    {
        push_table_clause(&mut text, snapshot, table, comments);
    }
    text
}

/// One table clause: a database-qualified header, `name (type)` or
/// `name (type - comment)` per column joined by `", "`, closed with `". "`.
fn push_table_clause(
    out: &mut String,
    snapshot: &SchemaSnapshot,
    table: &Table,
    comments: &CommentIndex,
) {
    out.push_str(&format!(
        "The \"{}.{}\" table has columns: ",
        snapshot.database, table.name
    ));

    let mut first = true;
    for col in &table.columns {
        if !first {
            out.push_str(", ");
        }
        first = false;

        match comments.get(&snapshot.database, &table.name, &col.name) {
            Some(comment) => {
                out.push_str(&format!("{} ({} - {})", col.name, col.data_type, comment))
            }
            None => out.push_str(&format!("{} ({})", col.name, col.data_type)),
        }
    }

    out.push_str(". ");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::reader::{ColumnDef, CommentRow, MockCatalogReader};

    fn make_table(name: &str, cols: &[(&str, &str)]) -> Table {
        Table {
            name: name.to_string(),
            comment: String::new(),
            columns: cols
                .iter()
                .map(|(n, t)| Column {
                    name: n.to_string(),
                    data_type: t.to_string(),
                })
                .collect(),
        }
    }

    fn orders_snapshot() -> SchemaSnapshot {
        SchemaSnapshot {
            database: "shop".to_string(),
            tables: vec![
                make_table("customers", &[("id", "UInt64"), ("email", "String")]),
                make_table("orders", &[("id", "int"), ("total", "numeric")]),
            ],
        }
    }

    fn selection(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_subset_without_comments() {
        let snapshot = orders_snapshot();
        let index = CommentIndex::default();

        let text = render_subset(&snapshot, &index, &selection(&["orders"]));
        assert_eq!(
            text,
            "The \"shop.orders\" table has columns: id (int), total (numeric). "
        );
    }

    #[test]
    fn test_subset_with_comment() {
        let snapshot = orders_snapshot();
        let mut index = CommentIndex::default();
        index.insert(
            "shop".to_string(),
            "orders".to_string(),
            "total".to_string(),
            "order total in cents".to_string(),
        );

        let text = render_subset(&snapshot, &index, &selection(&["orders"]));
        assert_eq!(
            text,
            "The \"shop.orders\" table has columns: id (int), total (numeric - order total in cents). "
        );
    }

    #[test]
    fn test_empty_selection_sentinel() {
        let snapshot = orders_snapshot();
        let index = CommentIndex::default();

        let text = render_subset(&snapshot, &index, &HashSet::new());
        assert_eq!(text, NO_TABLES_SELECTED);
        assert!(!text.is_empty());
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let snapshot = orders_snapshot();
        let mut index = CommentIndex::default();
        index.insert(
            "shop".to_string(),
            "customers".to_string(),
            "email".to_string(),
            "contact address".to_string(),
        );
        let sel = selection(&["customers", "orders"]);

        let first = render_subset(&snapshot, &index, &sel);
        let second = render_subset(&snapshot, &index, &sel);
        assert_eq!(first, second);

        let (full_a, _) = render_full(&snapshot, &index);
        let (full_b, _) = render_full(&snapshot, &index);
        assert_eq!(full_a, full_b);
    }

    #[test]
    fn test_selection_superset_law() {
        let snapshot = orders_snapshot();
        let index = CommentIndex::default();

        let narrow = render_subset(&snapshot, &index, &selection(&["orders"]));
        let wide = render_subset(&snapshot, &index, &selection(&["customers", "orders"]));
        assert!(wide.contains(&narrow));
    }

    #[test]
    fn test_unknown_table_ignored() {
        let snapshot = orders_snapshot();
        let index = CommentIndex::default();

        let with_ghost = render_subset(&snapshot, &index, &selection(&["orders", "no_such"]));
        let without = render_subset(&snapshot, &index, &selection(&["orders"]));
        assert_eq!(with_ghost, without);
    }

    #[test]
    fn test_empty_comment_treated_as_absent() {
        let snapshot = orders_snapshot();
        let mut index = CommentIndex::default();
        index.insert(
            "shop".to_string(),
            "orders".to_string(),
            "total".to_string(),
            String::new(),
        );

        assert!(index.is_empty());
        let text = render_subset(&snapshot, &index, &selection(&["orders"]));
        assert!(text.contains("total (numeric)"));
        assert!(!text.contains(" - "));
    }

    #[test]
    fn test_comment_requires_exact_triple() {
        let snapshot = orders_snapshot();
        let mut index = CommentIndex::default();
        // Same table and column names, different database.
        index.insert(
            "staging".to_string(),
            "orders".to_string(),
            "total".to_string(),
            "wrong database".to_string(),
        );

        let text = render_subset(&snapshot, &index, &selection(&["orders"]));
        assert!(!text.contains("wrong database"));
    }

    #[test]
    fn test_table_comment_never_rendered() {
        let mut snapshot = orders_snapshot();
        snapshot.tables[1].comment = "all customer orders".to_string();
        let index = CommentIndex::default();

        let (full, _) = render_full(&snapshot, &index);
        assert!(!full.contains("all customer orders"));
        let subset = render_subset(&snapshot, &index, &selection(&["orders"]));
        assert!(!subset.contains("all customer orders"));
    }

    #[test]
    fn test_full_render_covers_every_table_in_order() {
        let snapshot = orders_snapshot();
        let index = CommentIndex::default();

        let (text, structured) = render_full(&snapshot, &index);
        let customers_at = text.find("shop.customers").unwrap();
        let orders_at = text.find("shop.orders").unwrap();
        assert!(customers_at < orders_at);

        let keys: Vec<&String> = structured.keys().collect();
        assert_eq!(keys, vec!["customers", "orders"]);
    }

    #[test]
    fn test_structured_schema_records() {
        let snapshot = orders_snapshot();
        let mut index = CommentIndex::default();
        index.insert(
            "shop".to_string(),
            "orders".to_string(),
            "total".to_string(),
            "order total in cents".to_string(),
        );

        let (_, structured) = render_full(&snapshot, &index);
        let orders = structured["orders"].as_array().unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0]["name"], "id");
        assert_eq!(orders[0]["type"], "int");
        assert_eq!(orders[0]["comment"], "");
        assert_eq!(orders[0]["selected"], true);
        assert_eq!(orders[1]["comment"], "order total in cents");
        assert_eq!(orders[1]["selected"], true);
    }

    #[tokio::test]
    async fn test_build_assembles_snapshot_and_index() -> anyhow::Result<()> {
        let mut reader = MockCatalogReader::new();
        reader
            .expect_list_tables()
            .returning(|| Ok(vec!["orders".to_string()]));
        reader.expect_list_table_comments().returning(|| {
            Ok(vec![("orders".to_string(), "all orders".to_string())])
        });
        reader.expect_list_columns().returning(|_| {
            Ok(vec![
                ColumnDef {
                    name: "id".to_string(),
                    data_type: "int".to_string(),
                },
                ColumnDef {
                    name: "total".to_string(),
                    data_type: "numeric".to_string(),
                },
            ])
        });
        reader.expect_list_all_comments().returning(|| {
            Ok(vec![
                CommentRow {
                    database: "shop".to_string(),
                    table: "orders".to_string(),
                    column: "total".to_string(),
                    comment: "order total in cents".to_string(),
                },
                CommentRow {
                    database: "shop".to_string(),
                    table: "orders".to_string(),
                    column: "id".to_string(),
                    comment: String::new(),
                },
            ])
        });

        let (snapshot, index) = SchemaSnapshot::build(&reader, "shop").await?;
        assert_eq!(snapshot.database, "shop");
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.tables[0].comment, "all orders");
        assert_eq!(snapshot.tables[0].columns.len(), 2);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.get("shop", "orders", "total"),
            Some("order total in cents")
        );
        assert_eq!(index.get("shop", "orders", "id"), None);
        Ok(())
    }

    #[tokio::test]
    async fn test_build_fails_fast_on_reader_error() {
        use clickhouse::error::Error;

        let mut reader = MockCatalogReader::new();
        reader
            .expect_list_tables()
            .returning(|| Err(CatalogError::Query(Error::BadResponse("denied".to_string()))));

        let result = SchemaSnapshot::build(&reader, "shop").await;
        assert!(matches!(result, Err(CatalogError::Query(_))));
    }
}
