// crates/entity-gate-config/tests/override_resolution.rs
// =============================================================================
// Module: Override Resolution Tests
// Description: Tests for the pure environment-overlay resolution path.
// Purpose: Ensure overrides are applied, unknown keys fail, and the
//          function stays pure over a supplied key/value map.
// =============================================================================

//! Override resolution tests for entity-gate-config.

use std::collections::BTreeMap;

use entity_gate_config::ConfigError;
use entity_gate_config::EntityGateConfig;

type TestResult = Result<(), String>;

/// Builds an override map from string pairs.
fn overrides(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
}

#[test]
fn downstream_url_override_creates_the_section_with_defaults() -> TestResult {
    let mut config = EntityGateConfig::default();
    config
        .apply_overrides(&overrides(&[(
            "ENTITY_GATE_DOWNSTREAM_URL",
            "https://entities.example",
        )]))
        .map_err(|err| err.to_string())?;
    let downstream = config.downstream.ok_or("downstream missing")?;
    assert_eq!(downstream.base_url, "https://entities.example");
    assert_eq!(downstream.timeout_ms, 30_000);
    Ok(())
}

#[test]
fn downstream_url_override_preserves_tuned_fields() -> TestResult {
    let text = r#"
        [downstream]
        base_url = "https://old.example"
        timeout_ms = 2000
    "#;
    let mut config = EntityGateConfig::from_toml_str(text).map_err(|err| err.to_string())?;
    config
        .apply_overrides(&overrides(&[(
            "ENTITY_GATE_DOWNSTREAM_URL",
            "https://new.example",
        )]))
        .map_err(|err| err.to_string())?;
    let downstream = config.downstream.ok_or("downstream missing")?;
    assert_eq!(downstream.base_url, "https://new.example");
    assert_eq!(downstream.timeout_ms, 2_000);
    Ok(())
}

#[test]
fn ttl_and_bind_overrides_are_applied() -> TestResult {
    let mut config = EntityGateConfig::default();
    config
        .apply_overrides(&overrides(&[
            ("ENTITY_GATE_CACHE_TTL_SECONDS", "42"),
            ("ENTITY_GATE_BIND_ADDR", "127.0.0.1:9100"),
            ("ENTITY_GATE_USERINFO_URL", "https://idp.example/userinfo"),
        ]))
        .map_err(|err| err.to_string())?;
    assert_eq!(config.cache.ttl_seconds, 42);
    assert_eq!(config.server.bind_addr, "127.0.0.1:9100");
    assert_eq!(
        config.identity.ok_or("identity missing")?.userinfo_url,
        "https://idp.example/userinfo"
    );
    Ok(())
}

#[test]
fn non_numeric_ttl_override_is_rejected() {
    let mut config = EntityGateConfig::default();
    let result =
        config.apply_overrides(&overrides(&[("ENTITY_GATE_CACHE_TTL_SECONDS", "soon")]));
    assert!(matches!(
        result,
        Err(ConfigError::InvalidOverride { key, .. }) if key == "ENTITY_GATE_CACHE_TTL_SECONDS"
    ));
}

#[test]
fn unknown_prefixed_key_is_rejected() {
    let mut config = EntityGateConfig::default();
    let result = config.apply_overrides(&overrides(&[("ENTITY_GATE_SECRET_MODE", "on")]));
    assert!(matches!(
        result,
        Err(ConfigError::UnknownOverride(key)) if key == "ENTITY_GATE_SECRET_MODE"
    ));
}

#[test]
fn unprefixed_keys_are_ignored() -> TestResult {
    let mut config = EntityGateConfig::default();
    config
        .apply_overrides(&overrides(&[("PATH", "/usr/bin"), ("HOME", "/root")]))
        .map_err(|err| err.to_string())?;
    assert_eq!(config, EntityGateConfig::default());
    Ok(())
}
