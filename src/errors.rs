use thiserror::Error;

/// Error type for nested-set tree operations.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("connection error: {0}")]
    ConnectionError(String),
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("query error: {0}")]
    QueryError(String),
    #[error("node not found: {0}")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    ConfigError(String),
    #[error("fault injected: {0}")]
    FaultInjected(String),
    #[error("transaction error: {0}")]
    TransactionError(String),
    #[error("validation error: {0}")]
    ValidationError(String),
}

impl TreeError {
    pub fn connection<T: Into<String>>(msg: T) -> Self {
        TreeError::ConnectionError(msg.into())
    }

    pub fn schema<T: Into<String>>(msg: T) -> Self {
        TreeError::SchemaError(msg.into())
    }

    pub fn query<T: Into<String>>(msg: T) -> Self {
        TreeError::QueryError(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        TreeError::NotFound(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        TreeError::ConfigError(msg.into())
    }

    pub fn fault_injection<T: Into<String>>(msg: T) -> Self {
        TreeError::FaultInjected(msg.into())
    }

    pub fn transaction<T: Into<String>>(msg: T) -> Self {
        TreeError::TransactionError(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        TreeError::ValidationError(msg.into())
    }

    /// The request was rejected before anything was written.
    pub fn is_validation(&self) -> bool {
        matches!(self, TreeError::ValidationError(_))
    }

    /// The backing store failed while reading or writing.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            TreeError::ConnectionError(_)
                | TreeError::SchemaError(_)
                | TreeError::QueryError(_)
                | TreeError::TransactionError(_)
                | TreeError::FaultInjected(_)
        )
    }
}
