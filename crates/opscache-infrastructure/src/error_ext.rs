//! Error context at the infrastructure boundary
//!
//! Foreign errors (serde, io, figment, redis) become domain errors here, with
//! a message saying what was being attempted.

use opscache_domain::error::{Error, Result};
use std::fmt::Display;

/// Attach context to a foreign `Result`, choosing the domain error kind
///
/// ```ignore
/// use opscache_infrastructure::error_ext::ErrorContext;
///
/// let raw = std::fs::read_to_string(&path).config_context("reading opscache.toml")?;
/// let payload = serde_json::to_vec(&entry).serialization_context("encoding entry")?;
/// ```
pub trait ErrorContext<T> {
    /// Unexpected failure: `Error::Internal`
    fn context<C: Display>(self, context: C) -> Result<T>;

    /// Like [`ErrorContext::context`], building the message only on failure
    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T>;

    /// Configuration failure: `Error::Configuration`
    fn config_context<C: Display>(self, context: C) -> Result<T>;

    /// Encoding or decoding failure: `Error::Serialization`
    fn serialization_context<C: Display>(self, context: C) -> Result<T>;

    /// Transport failure of a cache tier: `Error::BackendUnavailable`
    fn backend_context<C: Display>(self, backend: &str, context: C) -> Result<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|err| Error::internal(format!("{context}: {err}")))
    }

    fn with_context<C: Display, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|err| Error::internal(format!("{}: {err}", f())))
    }

    fn config_context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|err| Error::configuration_with_source(format!("{context}: {err}"), err))
    }

    fn serialization_context<C: Display>(self, context: C) -> Result<T> {
        self.map_err(|err| Error::serialization_with_source(format!("{context}: {err}"), err))
    }

    fn backend_context<C: Display>(self, backend: &str, context: C) -> Result<T> {
        self.map_err(|err| {
            Error::backend_unavailable_with_source(backend, format!("{context}: {err}"), err)
        })
    }
}
