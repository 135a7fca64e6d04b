//! Read-only introspection queries against ClickHouse `system` tables.

use async_trait::async_trait;
use clickhouse::Client;
use serde::Deserialize;

use super::errors::CatalogError;

/// A column as enumerated by the catalog: identifier plus declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub data_type: String,
}

/// One row of the bulk column-comment query.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub database: String,
    pub table: String,
    pub column: String,
    /// Empty string means "no comment".
    pub comment: String,
}

/// Catalog access the schema compiler is built against.
///
/// Column and table enumeration order must be preserved as returned by the
/// database. All queries are read-only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn list_tables(&self) -> Result<Vec<String>, CatalogError>;

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDef>, CatalogError>;

    /// Bulk fetch of every column comment in the target database: a single
    /// query, not one per column.
    async fn list_all_comments(&self) -> Result<Vec<CommentRow>, CatalogError>;

    /// Bulk fetch of table-level comments as `(table, comment)` pairs.
    async fn list_table_comments(&self) -> Result<Vec<(String, String)>, CatalogError>;
}

/// `CatalogReader` over ClickHouse `system.tables` / `system.columns`.
///
/// Identifiers are passed through bound parameters, never interpolated into
/// the query text.
pub struct ClickHouseCatalog {
    client: Client,
    database: String,
}

impl ClickHouseCatalog {
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self {
            client,
            database: database.into(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

#[async_trait]
impl CatalogReader for ClickHouseCatalog {
    async fn list_tables(&self) -> Result<Vec<String>, CatalogError> {
        #[derive(Debug, clickhouse::Row, Deserialize)]
        struct TableName {
            name: String,
        }

        let rows: Vec<TableName> = self
            .client
            .query(
                "SELECT name FROM system.tables \
                 WHERE database = ? AND engine NOT IN ('View', 'MaterializedView') \
                 ORDER BY name",
            )
            .bind(self.database.as_str())
            .fetch_all()
            .await
            .map_err(CatalogError::classify)?;

        Ok(rows.into_iter().map(|t| t.name).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<ColumnDef>, CatalogError> {
        #[derive(Debug, clickhouse::Row, Deserialize)]
        struct ColumnRow {
            name: String,
            #[serde(rename = "type")]
            data_type: String,
        }

        let rows: Vec<ColumnRow> = self
            .client
            .query(
                "SELECT name, type FROM system.columns \
                 WHERE database = ? AND table = ? \
                 ORDER BY position",
            )
            .bind(self.database.as_str())
            .bind(table)
            .fetch_all()
            .await
            .map_err(CatalogError::classify)?;

        Ok(rows
            .into_iter()
            .map(|c| ColumnDef {
                name: c.name,
                data_type: c.data_type,
            })
            .collect())
    }

    async fn list_all_comments(&self) -> Result<Vec<CommentRow>, CatalogError> {
        #[derive(Debug, clickhouse::Row, Deserialize)]
        struct BulkCommentRow {
            database: String,
            table: String,
            name: String,
            comment: String,
        }

        let rows: Vec<BulkCommentRow> = self
            .client
            .query(
                "SELECT database, table, name, comment FROM system.columns \
                 WHERE database = ? \
                 ORDER BY table, position",
            )
            .bind(self.database.as_str())
            .fetch_all()
            .await
            .map_err(CatalogError::classify)?;

        Ok(rows
            .into_iter()
            .map(|r| CommentRow {
                database: r.database,
                table: r.table,
                column: r.name,
                comment: r.comment,
            })
            .collect())
    }

    async fn list_table_comments(&self) -> Result<Vec<(String, String)>, CatalogError> {
        #[derive(Debug, clickhouse::Row, Deserialize)]
        struct TableCommentRow {
            name: String,
            comment: String,
        }

        let rows: Vec<TableCommentRow> = self
            .client
            .query("SELECT name, comment FROM system.tables WHERE database = ?")
            .bind(self.database.as_str())
            .fetch_all()
            .await
            .map_err(CatalogError::classify)?;

        Ok(rows.into_iter().map(|r| (r.name, r.comment)).collect())
    }
}
