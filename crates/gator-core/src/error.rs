//! Error types for Gator

use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid specification: {message}")]
    InvalidSpecification {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("invalid resource: {0}")]
    InvalidResource(String),

    #[error("git operation failed: {operation} - {message}")]
    GitOperation { operation: String, message: String },

    #[error("code host error: {0}")]
    CodeHost(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_specification(message: impl Into<String>) -> Self {
        Self::InvalidSpecification {
            message: message.into(),
            source: None,
        }
    }

    /// Specification error that keeps the underlying schema or syntax violation.
    pub fn invalid_specification_from(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::InvalidSpecification {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource(message.into())
    }

    pub fn git_operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::GitOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn is_specification_error(&self) -> bool {
        matches!(self, Self::InvalidSpecification { .. })
    }

    pub fn is_git_error(&self) -> bool {
        matches!(self, Self::GitOperation { .. })
    }

    /// Full message including the wrapped source chain, for logs and reports.
    pub fn display_chain(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}
