// SPDX-FileCopyrightText: 2026 Atendo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atendo doctor` command implementation.
//!
//! Runs diagnostic checks against the configured environment: configuration
//! sanity, database accessibility, and store health.

use std::time::{Duration, Instant};

use atendo_config::model::AtendoConfig;
use atendo_core::types::HealthStatus;
use atendo_core::{AtendoError, SessionStore};
use atendo_storage::SqliteStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    message: String,
    duration: Duration,
}

/// Run the `atendo doctor` command.
pub async fn run_doctor(config: &AtendoConfig) -> Result<(), AtendoError> {
    let results = vec![check_config(config), check_database(config).await];

    println!();
    println!("  atendo doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    for result in &results {
        let symbol = match result.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => {
                fail_count += 1;
                "FAIL"
            }
        };
        println!(
            "  [{symbol:>4}] {:<20} {} ({}ms)",
            result.name,
            result.message,
            result.duration.as_millis()
        );
    }
    println!();

    if fail_count > 0 {
        return Err(AtendoError::Internal(format!(
            "{fail_count} doctor check(s) failed"
        )));
    }
    Ok(())
}

fn check_config(config: &AtendoConfig) -> CheckResult {
    let start = Instant::now();
    // Validation already ran at startup; report the effective settings.
    CheckResult {
        name: "config".to_string(),
        status: CheckStatus::Pass,
        message: format!(
            "listening on {}:{}, db at {}",
            config.server.host, config.server.port, config.storage.database_path
        ),
        duration: start.elapsed(),
    }
}

async fn check_database(config: &AtendoConfig) -> CheckResult {
    let start = Instant::now();
    let store = SqliteStore::new(config.storage.clone());
    let outcome = async {
        store.initialize().await?;
        let health = store.health_check().await?;
        store.close().await?;
        Ok::<_, AtendoError>(health)
    }
    .await;
    let (status, message) = match outcome {
        Ok(HealthStatus::Healthy) => (CheckStatus::Pass, "database reachable".to_string()),
        Ok(HealthStatus::Degraded(msg)) => (CheckStatus::Warn, format!("degraded: {msg}")),
        Ok(HealthStatus::Unhealthy(msg)) => (CheckStatus::Fail, format!("unhealthy: {msg}")),
        Err(e) => (CheckStatus::Fail, e.to_string()),
    };
    CheckResult {
        name: "database".to_string(),
        status,
        message,
        duration: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn doctor_passes_against_a_fresh_database() {
        let dir = tempdir().unwrap();
        let toml = format!(
            "[storage]\ndatabase_path = \"{}\"\n",
            dir.path().join("doctor.db").display()
        );
        let config = atendo_config::load_and_validate_str(&toml).unwrap();
        run_doctor(&config).await.unwrap();
    }

    #[tokio::test]
    async fn doctor_fails_when_the_database_cannot_be_created() {
        let toml = "[storage]\ndatabase_path = \"/proc/atendo/nope.db\"\n";
        let config = atendo_config::load_and_validate_str(toml).unwrap();
        assert!(run_doctor(&config).await.is_err());
    }
}
