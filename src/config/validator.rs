//! Config validation: pagination bounds and table policy consistency.

use crate::config::GeneratorConfig;
use crate::error::ConfigError;

pub fn validate_config(config: &GeneratorConfig) -> Result<(), ConfigError> {
    let pagination = &config.pagination;
    if pagination.per_page == 0 {
        return Err(ConfigError::Validation("pagination.per_page must be at least 1".into()));
    }
    if pagination.max_per_page < pagination.per_page {
        return Err(ConfigError::Validation(format!(
            "pagination.max_per_page ({}) must be >= per_page ({})",
            pagination.max_per_page, pagination.per_page
        )));
    }

    let policy_tables = config
        .tables
        .iter()
        .chain(&config.exclude_tables)
        .chain(config.enabled_endpoints.keys())
        .chain(config.visible_columns.keys())
        .chain(config.validation_rules.keys())
        .chain(&config.multi_tenant_exclude_tables);
    for table in policy_tables {
        if table.trim().is_empty() {
            return Err(ConfigError::Validation("table names must not be empty".into()));
        }
    }

    for table in &config.tables {
        if config.exclude_tables.contains(table) {
            tracing::warn!(table = %table, "table is both included and excluded; exclusion wins");
        }
    }

    for column in config.multi_tenant_columns.keys() {
        if column.trim().is_empty() {
            return Err(ConfigError::Validation("multi-tenant column names must not be empty".into()));
        }
    }

    Ok(())
}
