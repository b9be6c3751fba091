//! Error types for sqlcraft

use thiserror::Error;

/// Result type alias for sqlcraft operations
pub type SqlResult<T> = Result<T, SqlError>;

/// Error types for SQL construction, compilation and execution
#[derive(Debug, Error)]
pub enum SqlError {
    /// A builder method recorded an invalid mutation (surfaced at replay)
    #[error("Construction error: {0}")]
    Construction(String),

    /// Condition input has an unsupported shape or type
    #[error("Translation error: {0}")]
    Translation(String),

    /// Placeholder/argument expansion failed
    #[error("Expansion error: {0}")]
    Expansion(String),

    /// Unknown clause layout or invalid statement
    #[error("Compile error: {0}")]
    Compile(String),

    /// A dialect layout could not be parsed
    #[error("Template error: {0}")]
    Template(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Opaque failure reported by an executor
    #[error("Execution error: {0}")]
    Execution(String),

    /// Query execution error
    #[cfg(feature = "postgres")]
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Result rows could not be mapped into the destination
    #[error("Scan error: {0}")]
    Scan(String),
}

impl SqlError {
    /// Create a construction error
    pub fn construction(message: impl Into<String>) -> Self {
        Self::Construction(message.into())
    }

    /// Create a translation error
    pub fn translation(message: impl Into<String>) -> Self {
        Self::Translation(message.into())
    }

    /// Create an expansion error
    pub fn expansion(message: impl Into<String>) -> Self {
        Self::Expansion(message.into())
    }

    /// Create a compile error
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this error was raised while building a query, before any
    /// executor was involved.
    pub fn is_build_error(&self) -> bool {
        matches!(
            self,
            Self::Construction(_)
                | Self::Translation(_)
                | Self::Expansion(_)
                | Self::Compile(_)
                | Self::Template(_)
        )
    }

    /// Parse a tokio_postgres error into a more specific SqlError
    #[cfg(feature = "postgres")]
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_errors_are_classified() {
        assert!(SqlError::construction("x").is_build_error());
        assert!(SqlError::compile("x").is_build_error());
        assert!(!SqlError::not_found("x").is_build_error());
        assert!(SqlError::not_found("no rows").is_not_found());
    }

    #[test]
    fn decode_error_mentions_column() {
        let err = SqlError::decode("age", "expected integer");
        assert_eq!(err.to_string(), "Decode error on column 'age': expected integer");
    }
}
