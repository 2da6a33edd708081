//! Infrastructure and service error types.
//!
//! ## Error Mapping
//!
//! `sqlx::Error` is mapped to [`StoreError`] in one place
//! ([`map_sqlx_error`]):
//!
//! | SQLx Error | StoreError | Scenario |
//! |------------|------------|----------|
//! | PoolTimedOut / PoolClosed / Io / Tls | `Unavailable` | database unreachable or saturated |
//! | Database, SQLSTATE `08xxx`, `53300`, `57P01..57P03` | `Unavailable` | connection lost |
//! | Database (other) | `Query` | statement rejected (missing function, bad column, ...) |
//! | ColumnDecode / Decode / ColumnNotFound / TypeNotFound | `Decode` | unexpected row shape |
//! | Other | `Query` | anything else |

use thiserror::Error;

use indoormap_core::MapError;

use crate::schema::SchemaError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Database access error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("unexpected row shape: {0}")]
    Decode(String),
}

pub fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some(code) if is_unavailable_code(code) => StoreError::Unavailable(msg),
                _ => StoreError::Query(msg),
            }
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("timed out acquiring a connection in {}", operation))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::Io(e) => {
            StoreError::Unavailable(format!("i/o error in {}: {}", operation, e))
        }
        sqlx::Error::Tls(e) => {
            StoreError::Unavailable(format!("tls error in {}: {}", operation, e))
        }
        e @ (sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::TypeNotFound { .. }) => {
            StoreError::Decode(format!("{} in {}", e, operation))
        }
        e => StoreError::Query(format!("sqlx error in {}: {}", operation, e)),
    }
}

/// SQLSTATE codes that mean "the server cannot serve us right now".
fn is_unavailable_code(code: &str) -> bool {
    code.starts_with("08") || matches!(code, "53300" | "57P01" | "57P02" | "57P03")
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error returned by the layer and routing services.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A required database function (pgRouting, stored procedure) is missing.
    #[error("{0}")]
    RoutingUnavailable(String),

    #[error("schema mismatch: {0}")]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<MapError> for ServiceError {
    fn from(err: MapError) -> Self {
        match err {
            MapError::Validation(m) | MapError::InvalidId(m) => ServiceError::Validation(m),
            MapError::NotFound(m) => ServiceError::NotFound(m),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn decode_errors_are_decode() {
        let err = map_sqlx_error("fetch_layer", sqlx::Error::ColumnNotFound("geom".into()));
        assert!(matches!(err, StoreError::Decode(ref m) if m.contains("fetch_layer")));
    }

    #[test]
    fn row_not_found_is_a_query_error() {
        assert!(matches!(
            map_sqlx_error("op", sqlx::Error::RowNotFound),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn connection_sqlstates() {
        assert!(is_unavailable_code("08006"));
        assert!(is_unavailable_code("57P01"));
        assert!(!is_unavailable_code("42883"));
    }

    #[test]
    fn map_error_conversion() {
        assert_eq!(
            ServiceError::from(MapError::invalid_id("x")),
            ServiceError::Validation("x".into())
        );
        assert_eq!(
            ServiceError::from(MapError::not_found("gone")),
            ServiceError::NotFound("gone".into())
        );
    }
}
