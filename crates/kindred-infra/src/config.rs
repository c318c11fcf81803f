//! Configuration loader for Kindred.
//!
//! Reads `config.toml` from the data directory and deserializes it into
//! [`KindredConfig`]. Falls back to the built-in defaults when the file is
//! missing or malformed -- a bad config file must never keep the
//! companion from starting.

use std::path::Path;

use kindred_types::config::KindredConfig;

/// Load configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`KindredConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_config(data_dir: &Path) -> KindredConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return KindredConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return KindredConfig::default();
        }
    };

    match toml::from_str::<KindredConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            KindredConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).await;
        assert_eq!(config.engagement.engagement_threshold, 45);
        assert_eq!(config.cleanup.max_segment_age_days, 7);
    }

    #[tokio::test]
    async fn load_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[engagement]
engagement_threshold = 60
gap_tolerance = 8

[fact_cache]
extraction_ttl = 5
"#,
        )
        .await
        .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.engagement.engagement_threshold, 60);
        assert_eq!(config.engagement.gap_tolerance, 8);
        assert_eq!(config.fact_cache.extraction_ttl, 5);
        // Untouched sections keep their defaults.
        assert_eq!(config.cleanup.cleanup_interval_hours, 1);
    }

    #[tokio::test]
    async fn load_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config(tmp.path()).await;
        assert_eq!(config.engagement.engagement_threshold, 45);
    }
}
