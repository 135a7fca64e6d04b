//! Executes user-authored SQL and shapes the result for the UI.
//!
//! The query text runs as-is: the whole point of the tool is to execute
//! arbitrary generated SQL, so there is no parameterization or validation
//! here. Point the service at a user with appropriately narrow grants.

use clickhouse::Client;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::io::AsyncBufReadExt;

#[derive(Debug, Error)]
pub enum QueryExecutionError {
    #[error("query failed: {0}")]
    Execute(#[from] clickhouse::error::Error),

    #[error("could not read result stream: {0}")]
    Read(#[from] std::io::Error),

    #[error("could not decode result row: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Run `sql` and return ordered column names plus rows as column-keyed
/// objects.
///
/// Results are fetched as `JSONCompactEachRowWithNames`: the first line
/// names the columns, so column order survives even a zero-row result. A
/// statement producing no output at all (DDL) yields empty columns and rows.
pub async fn execute(
    client: &Client,
    sql: &str,
) -> Result<(Vec<String>, Vec<Map<String, Value>>), QueryExecutionError> {
    log::debug!("Executing SQL:\n{}", sql);

    let mut lines = client
        .query(sql)
        .fetch_bytes("JSONCompactEachRowWithNames")?
        .lines();

    let columns: Vec<String> = match lines.next_line().await? {
        Some(header) => serde_json::from_str(&header)?,
        None => return Ok((Vec::new(), Vec::new())),
    };

    let mut results = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }
        let values: Vec<Value> = serde_json::from_str(&line)?;
        results.push(row_object(&columns, values));
    }

    Ok((columns, results))
}

fn row_object(columns: &[String], values: Vec<Value>) -> Map<String, Value> {
    columns.iter().cloned().zip(values).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_object_keeps_column_order() {
        let columns = vec!["id".to_string(), "total".to_string()];
        let row = row_object(&columns, vec![json!(1), json!("9.99")]);

        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, vec!["id", "total"]);
        assert_eq!(row["id"], json!(1));
        assert_eq!(row["total"], json!("9.99"));
    }

    #[test]
    fn test_header_line_parses_as_column_names() {
        let header = r#"["id","name"]"#;
        let columns: Vec<String> = serde_json::from_str(header).unwrap();
        assert_eq!(columns, vec!["id", "name"]);
    }
}
