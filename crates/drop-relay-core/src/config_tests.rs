//! Tests for relay limits configuration

use super::*;

#[test]
fn test_defaults() {
    let limits = RelayLimits::default();
    assert_eq!(limits.api_key, None);
    assert_eq!(limits.max_mb, 50);
    assert_eq!(limits.rate_limit_sec, 10);
    assert_eq!(limits.max_pending, 10);
    assert_eq!(limits.ttl_sec, 86_400);
    assert!(limits.validate().is_ok());
}

#[test]
fn test_max_mb_must_be_positive() {
    let limits = RelayLimits {
        max_mb: 0,
        ..RelayLimits::default()
    };
    assert!(limits.validate().is_err());

    let limits = RelayLimits {
        max_mb: -5,
        ..RelayLimits::default()
    };
    assert!(limits.validate().is_err());
}

#[test]
fn test_max_bytes() {
    let limits = RelayLimits {
        max_mb: 2,
        ..RelayLimits::default()
    };
    assert_eq!(limits.max_bytes(), 2 * 1024 * 1024);
}

#[test]
fn test_disabled_checks_are_valid() {
    let limits = RelayLimits {
        rate_limit_sec: 0,
        max_pending: 0,
        ttl_sec: -1,
        ..RelayLimits::default()
    };
    assert!(limits.validate().is_ok());
}
