use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

const REQUIRED: &[(&str, &str)] =
    &[("AUTH_PROVIDER_URL", "https://auth.example.test/"), ("AUTH_PROVIDER_ANON_KEY", "anon-key")];

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_true_variants() {
    for val in ["1", "true", "yes", "on", "TRUE", "On", "  yes  "] {
        assert_eq!(parse_bool(val), Some(true), "expected true for {val:?}");
    }
}

#[test]
fn parse_bool_false_variants() {
    for val in ["0", "false", "no", "off", "FALSE"] {
        assert_eq!(parse_bool(val), Some(false), "expected false for {val:?}");
    }
}

#[test]
fn parse_bool_invalid_returns_none() {
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

// =============================================================================
// from_lookup
// =============================================================================

#[test]
fn from_lookup_applies_defaults() {
    let cfg = GateConfig::from_lookup(lookup_from(REQUIRED)).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.public_url, "http://localhost:3000");
    assert!(!cfg.cookie_secure);
    assert_eq!(cfg.static_dir, PathBuf::from(DEFAULT_STATIC_DIR));
    assert_eq!(cfg.resolve_timeout, Duration::from_millis(DEFAULT_RESOLVE_TIMEOUT_MS));
    assert_eq!(cfg.provider.base_url, "https://auth.example.test");
    assert_eq!(cfg.provider.anon_key, "anon-key");
    assert_eq!(cfg.provider.profile_table, DEFAULT_PROFILE_TABLE);
    assert_eq!(cfg.provider.connect_timeout, Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS));
}

#[test]
fn from_lookup_parses_overrides() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend([
        ("PORT", "8080"),
        ("PUBLIC_URL", "https://portal.example.test/"),
        ("STATIC_DIR", "/srv/portal"),
        ("PROFILE_TABLE", "staff_profiles"),
        ("AUTH_RESOLVE_TIMEOUT_MS", "1500"),
        ("AUTH_CONNECT_TIMEOUT_SECS", "2"),
    ]);
    let cfg = GateConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.public_url, "https://portal.example.test");
    assert!(cfg.cookie_secure, "https public url should imply secure cookies");
    assert_eq!(cfg.static_dir, PathBuf::from("/srv/portal"));
    assert_eq!(cfg.provider.profile_table, "staff_profiles");
    assert_eq!(cfg.resolve_timeout, Duration::from_millis(1500));
    assert_eq!(cfg.provider.request_timeout, Duration::from_millis(1500));
    assert_eq!(cfg.provider.connect_timeout, Duration::from_secs(2));
}

#[test]
fn explicit_cookie_secure_wins_over_inference() {
    let mut pairs = REQUIRED.to_vec();
    pairs.extend([("PUBLIC_URL", "https://portal.example.test"), ("COOKIE_SECURE", "off")]);
    let cfg = GateConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert!(!cfg.cookie_secure);
}

#[test]
fn missing_provider_url_is_rejected() {
    let err = GateConfig::from_lookup(lookup_from(&[("AUTH_PROVIDER_ANON_KEY", "k")])).unwrap_err();
    assert_eq!(err, ConfigError::Missing("AUTH_PROVIDER_URL"));
}

#[test]
fn blank_anon_key_is_rejected() {
    let pairs = [("AUTH_PROVIDER_URL", "https://a.test"), ("AUTH_PROVIDER_ANON_KEY", "   ")];
    let err = GateConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert_eq!(err, ConfigError::Missing("AUTH_PROVIDER_ANON_KEY"));
}

#[test]
fn malformed_port_is_rejected() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("PORT", "eighty"));
    let err = GateConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
}

#[test]
fn zero_resolve_timeout_is_rejected() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("AUTH_RESOLVE_TIMEOUT_MS", "0"));
    let err = GateConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "AUTH_RESOLVE_TIMEOUT_MS", .. }));
}

#[test]
fn invalid_cookie_secure_is_rejected() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("COOKIE_SECURE", "sometimes"));
    let err = GateConfig::from_lookup(lookup_from(&pairs)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "COOKIE_SECURE", .. }));
}

#[test]
fn password_reset_redirect_uses_public_url() {
    let mut pairs = REQUIRED.to_vec();
    pairs.push(("PUBLIC_URL", "https://portal.example.test"));
    let cfg = GateConfig::from_lookup(lookup_from(&pairs)).unwrap();
    assert_eq!(cfg.password_reset_redirect(), "https://portal.example.test/reset-password");
}
