use thiserror::Error;

/// Failures raised while introspecting the database catalog.
///
/// `Connection` means the database itself could not be reached; `Query`
/// means the server rejected the introspection query (insufficient
/// privilege, bad identifier, server-side failure). Both are fatal during
/// the startup snapshot build.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database unreachable: {0}")]
    Connection(#[source] clickhouse::error::Error),

    #[error("catalog query failed: {0}")]
    Query(#[source] clickhouse::error::Error),
}

impl CatalogError {
    /// Transport-level failures mean the database is unreachable; anything
    /// else is the query itself erroring.
    pub fn classify(err: clickhouse::error::Error) -> Self {
        use clickhouse::error::Error;
        if matches!(err, Error::Network(_) | Error::TimedOut) {
            CatalogError::Connection(err)
        } else {
            CatalogError::Query(err)
        }
    }
}
