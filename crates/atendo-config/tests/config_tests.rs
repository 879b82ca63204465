// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the configuration system: TOML parsing, strict
//! unknown-field rejection, layered overrides, and validation diagnostics.

use atendo_config::model::AtendoConfig;
use atendo_config::{load_and_validate_str, load_config_from_path, load_config_from_str};

/// A fully specified TOML file deserializes into every section.
#[test]
fn valid_toml_deserializes_into_atendo_config() {
    let toml = r#"
[hub]
name = "support-eu-1"
log_level = "debug"

[server]
host = "0.0.0.0"
port = 9000
session_list_cap = 100

[storage]
database_path = "/var/lib/atendo/atendo.db"
wal_mode = false

[prometheus]
enabled = true
"#;

    let config = load_config_from_str(toml).expect("valid config should parse");
    assert_eq!(config.hub.name, "support-eu-1");
    assert_eq!(config.hub.log_level, "debug");
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
    assert_eq!(config.server.session_list_cap, 100);
    assert_eq!(config.storage.database_path, "/var/lib/atendo/atendo.db");
    assert!(!config.storage.wal_mode);
    assert!(config.prometheus.enabled);
}

/// An empty TOML string yields the compiled defaults for every section.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty config should use defaults");
    assert_eq!(config.hub.name, "atendo");
    assert_eq!(config.hub.log_level, "info");
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8321);
    assert_eq!(config.server.session_list_cap, 500);
    assert!(config.storage.wal_mode);
    assert!(!config.prometheus.enabled);
}

/// Unknown key inside [hub] is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_hub_produces_error() {
    let result = load_config_from_str(
        r#"
[hub]
naem = "typo"
"#,
    );
    let err = result.expect_err("typo should be rejected").to_string();
    assert!(
        err.contains("unknown field") || err.contains("naem"),
        "error should point at the bad key, got: {err}"
    );
}

/// Unknown key inside [server] is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_server_produces_error() {
    let result = load_config_from_str(
        r#"
[server]
prot = 9000
"#,
    );
    assert!(result.is_err());
}

/// Unknown key inside [storage] is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_storage_produces_error() {
    let result = load_config_from_str(
        r#"
[storage]
database_pth = "atendo.db"
"#,
    );
    assert!(result.is_err());
}

/// An unexpected top-level section is rejected as well.
#[test]
fn unknown_top_level_section_produces_error() {
    let result = load_config_from_str(
        r#"
[telemetry]
enabled = true
"#,
    );
    assert!(result.is_err());
}

/// ATENDO_SERVER_PORT maps to server.port, overriding the TOML value.
///
/// Simulated via the Figment builder directly to control env vars in test.
#[test]
fn env_var_overrides_server_port() {
    use figment::providers::{Format, Serialized, Toml};
    use figment::Figment;

    let toml = r#"
[server]
port = 9000
"#;

    let config: AtendoConfig = Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(Toml::string(toml))
        .merge(("server.port", 9100))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.server.port, 9100);
}

/// ATENDO_STORAGE_DATABASE_PATH maps to storage.database_path
/// (NOT storage.database.path, despite the underscores in the key).
#[test]
fn env_var_overrides_storage_database_path() {
    use figment::providers::Serialized;
    use figment::Figment;

    let config: AtendoConfig = Figment::new()
        .merge(Serialized::defaults(AtendoConfig::default()))
        .merge(("storage.database_path", "/tmp/env.db"))
        .extract()
        .expect("should set database_path via dot notation");

    assert_eq!(config.storage.database_path, "/tmp/env.db");
}

/// Missing config files are silently skipped (Figment's Toml::file() behavior).
#[test]
fn missing_config_file_falls_back_to_defaults() {
    let config = load_config_from_path(std::path::Path::new("/nonexistent/path/atendo.toml"))
        .expect("missing file should be silently skipped");
    assert_eq!(config.hub.name, "atendo");
    assert_eq!(config.server.port, 8321);
}

/// A config file on disk is read and merged over the defaults.
#[test]
fn config_file_on_disk_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atendo.toml");
    std::fs::write(&path, "[hub]\nname = \"from-disk\"\n").unwrap();

    let config = load_config_from_path(&path).expect("file should load");
    assert_eq!(config.hub.name, "from-disk");
    // Untouched sections keep their defaults.
    assert_eq!(config.server.session_list_cap, 500);
}

/// load_and_validate_str surfaces semantic errors after a clean parse.
#[test]
fn semantic_validation_rejects_zero_port() {
    let errors = load_and_validate_str(
        r#"
[server]
port = 0
"#,
    )
    .expect_err("port 0 should fail validation");
    assert!(errors.iter().any(|e| e.to_string().contains("port")));
}

/// Validation collects every error instead of failing fast.
#[test]
fn semantic_validation_collects_all_errors() {
    let errors = load_and_validate_str(
        r#"
[hub]
log_level = "loud"

[server]
port = 0
"#,
    )
    .expect_err("two invalid values should fail validation");
    assert!(errors.len() >= 2, "expected both errors, got {errors:?}");
}
