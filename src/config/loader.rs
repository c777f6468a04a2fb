//! Load generator config from a JSON file or the environment.

use crate::config::{validate_config, GeneratorConfig};
use crate::error::ConfigError;
use std::path::Path;

/// Env var naming the JSON config file.
pub const CONFIG_PATH_ENV: &str = "APIGEN_CONFIG";

impl GeneratorConfig {
    /// Parse and validate config from a JSON string. Missing fields take defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: GeneratorConfig =
            serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))?;
        validate_config(&config)?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "loading generator config");
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    /// Config from `APIGEN_CONFIG` (defaults when unset), with `DATABASE_URL` taking precedence for the url.
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(path)?,
            _ => GeneratorConfig::default(),
        };
        if let Ok(url) = std::env::var("DATABASE_URL") {
            if !url.is_empty() {
                config.database.url = Some(url);
            }
        }
        validate_config(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectSelection, Operation};

    #[test]
    fn empty_object_takes_defaults() {
        let config = GeneratorConfig::from_json("{}").unwrap();
        assert_eq!(config.api_prefix, "api/v1");
        assert_eq!(config.cache.max_age_secs, 3600);
        assert_eq!(config.default_endpoints, Operation::ALL.to_vec());
        assert_eq!(config.pagination.per_page, 20);
        assert_eq!(config.pagination.max_per_page, 100);
        assert_eq!(config.database.dialect, DialectSelection::Auto);
    }

    #[test]
    fn parses_policy_sections() {
        let raw = r#"{
            "api_prefix": "/api/v2/",
            "enabled_endpoints": { "audit_log": ["index", "show"] },
            "validation_rules": { "users": { "email": "required|valid_email" } },
            "multi_tenant_columns": { "tenant_id": "abc", "region": null },
            "database": { "dialect": "mysql" }
        }"#;
        let config = GeneratorConfig::from_json(raw).unwrap();
        assert_eq!(config.normalized_prefix(), "api/v2");
        assert_eq!(
            config.endpoints_for("audit_log"),
            &[Operation::Index, Operation::Show]
        );
        assert_eq!(config.endpoints_for("users"), Operation::ALL.as_slice());
        assert_eq!(config.validation_rules["users"]["email"], "required|valid_email");
        assert_eq!(config.database.dialect, DialectSelection::Mysql);
        assert_eq!(
            config.tenant_bindings_for("users"),
            vec![("tenant_id".to_string(), "abc".to_string())]
        );
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let raw = r#"{ "default_endpoints": ["index", "purge"] }"#;
        assert!(matches!(
            GeneratorConfig::from_json(raw),
            Err(ConfigError::Load(_))
        ));
    }
}
