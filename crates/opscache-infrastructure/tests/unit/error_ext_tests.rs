//! Tests for error context extensions

use opscache_domain::Error;
use opscache_infrastructure::error_ext::ErrorContext;
use std::io;

fn io_failure() -> Result<(), io::Error> {
    Err(io::Error::new(io::ErrorKind::NotFound, "missing"))
}

#[test]
fn test_context_maps_to_internal() {
    let err = io_failure().context("reading state").unwrap_err();
    assert!(matches!(err, Error::Internal { .. }));
    assert!(err.to_string().contains("reading state: missing"));
}

#[test]
fn test_with_context_is_lazy() {
    let ok: Result<u8, io::Error> = Ok(1);
    let value = ok
        .with_context(|| -> String { panic!("context built for a success") })
        .unwrap();
    assert_eq!(value, 1);
}

#[test]
fn test_config_and_serialization_contexts() {
    let err = io_failure().config_context("loading config").unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));

    let err = serde_json::from_str::<u32>("nope")
        .serialization_context("decoding entry")
        .unwrap_err();
    assert!(matches!(err, Error::Serialization { .. }));
}

#[test]
fn test_backend_context_marks_tier_unavailable() {
    let err = io_failure().backend_context("redis", "GET").unwrap_err();
    assert!(err.is_backend_unavailable());
    assert!(err.to_string().contains("redis"));
}
