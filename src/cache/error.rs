use thiserror::Error;

/// Failures raised by the cache engine itself.
///
/// Load functions surface their own error type; anything the engine
/// produces is converted into it through `From<CacheError>`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("remote cache is not configured: {0}")]
    Configuration(String),
    #[error("remote cache has no entry for the key")]
    RemoteMiss,
    #[error("remote cache request failed: {0}")]
    Remote(String),
    #[error("cached value could not be encoded or decoded: {0}")]
    Codec(String),
    #[error("in-flight value for `{key}` does not match the requested type")]
    TypeMismatch { key: String },
    #[error("success race started without branches")]
    NoBranches,
    #[error("load task for `{key}` did not complete: {message}")]
    LoadTask { key: String, message: String },
}

impl CacheError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote(message.into())
    }

    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec(message.into())
    }
}
