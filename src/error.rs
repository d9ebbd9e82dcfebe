use thiserror::Error;

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Errors raised by `PostRepository` operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Create payload is missing `title`/`content` or carries extra fields.
    #[error("Invalid blog-post data")]
    Validation,

    #[error("A post with the id {0} doesn't exist")]
    NotFound(u64),

    /// Unsupported value for the named query parameter.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),
}
