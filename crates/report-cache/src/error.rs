use thiserror::Error;

/// Errors from a cache backend.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// An error wrapped with the name of the cache operation.
    #[error("{op}: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: Box<CacheError>,
    },
}

impl CacheError {
    pub fn context(self, op: &'static str) -> Self {
        CacheError::Operation {
            op,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, CacheError>;
