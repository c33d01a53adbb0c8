//! Error handling types

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the cache layer
///
/// A cache miss is never an error: lookups return `Ok(None)`.
#[derive(Error, Debug)]
pub enum Error {
    /// A cache tier could not be reached (transport failure or timeout)
    #[error("Backend unavailable ({backend}): {message}")]
    BackendUnavailable {
        /// Name of the backend that failed (e.g. "redis", "memory")
        backend: String,
        /// Description of the failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A value could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An invalidation request named no selector, or more than one
    #[error("Invalid invalidation request: {message}")]
    InvalidInvalidationRequest {
        /// Description of what was wrong with the request
        message: String,
    },

    /// A cache key is not valid for every tier
    #[error("Invalid cache key: {message}")]
    InvalidKey {
        /// Description of the key violation
        message: String,
    },

    /// Configuration-related error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

// Tier failure creation methods
impl Error {
    /// Create a backend-unavailable error
    pub fn backend_unavailable<B: Into<String>, S: Into<String>>(backend: B, message: S) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a backend-unavailable error with source
    pub fn backend_unavailable_with_source<
        B: Into<String>,
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        backend: B,
        message: S,
        source: E,
    ) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error means a tier could not be reached
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}

// Serialization error creation methods
impl Error {
    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Create a serialization error with source
    pub fn serialization_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Request validation error creation methods
impl Error {
    /// Create an invalid invalidation request error
    pub fn invalid_invalidation_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidInvalidationRequest {
            message: message.into(),
        }
    }

    /// Create an invalid key error
    pub fn invalid_key<S: Into<String>>(message: S) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }
}

// Configuration error creation methods
impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn configuration_with_source<
        S: Into<String>,
        E: std::error::Error + Send + Sync + 'static,
    >(
        message: S,
        source: E,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_with_source(err.to_string(), err)
    }
}
