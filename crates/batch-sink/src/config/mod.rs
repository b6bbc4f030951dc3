//! Connector configuration.
//!
//! A connector is configured once at construction and never changes
//! afterwards. Configuration arrives either as driver-style JSON parameters
//! (`from_params`) or as a TOML file (`from_toml_str`); both accept the
//! snake_case field names below and the legacy `BatchSize` / `Schema` /
//! `Table` / `AutoCreateTable` spellings.
//!
//! ```toml
//! batch_size = 500
//! auto_create_table = true
//! schema_override = "analytics"
//! dialect = "mysql"
//! failure_policy = "abort_remaining"
//! idle_timeout = "5s"
//! ```

pub mod duration;

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use sql_types::{IdentifierResolver, SqlDialect};

/// Batch size used when none (or zero) is configured.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Idle interval used when none is configured.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// What the committer does with the remaining table groups once one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing group; later groups are not attempted.
    #[default]
    AbortRemaining,
    /// Attempt every group; report only the first failure.
    ContinueOtherGroups,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AbortRemaining => write!(f, "abort_remaining"),
            Self::ContinueOtherGroups => write!(f, "continue_other_groups"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "abort_remaining" | "abort" => Ok(Self::AbortRemaining),
            "continue_other_groups" | "continue" => Ok(Self::ContinueOtherGroups),
            _ => Err(anyhow::anyhow!(
                "Invalid failure policy: '{s}'. Expected 'abort_remaining' or 'continue_other_groups'"
            )),
        }
    }
}

/// Configuration of one connector instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Buffer length that triggers a synchronous flush on enqueue.
    #[serde(alias = "BatchSize")]
    pub batch_size: usize,

    /// Enables raw-SQL handling and auto-creation of destination tables.
    #[serde(alias = "AutoCreateTable")]
    pub auto_create_table: bool,

    /// Destination schema forced for every event. Empty means no override.
    #[serde(alias = "Schema", alias = "CkSchema", skip_serializing_if = "Option::is_none")]
    pub schema_override: Option<String>,

    /// Destination table forced for every event. Empty means no override.
    #[serde(alias = "Table", skip_serializing_if = "Option::is_none")]
    pub table_override: Option<String>,

    pub dialect: SqlDialect,

    pub failure_policy: FailurePolicy,

    /// Idle interval before buffered events are committed. Zero disables the idle commit.
    #[serde(with = "duration")]
    pub idle_timeout: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            auto_create_table: false,
            schema_override: None,
            table_override: None,
            dialect: SqlDialect::default(),
            failure_policy: FailurePolicy::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

impl ConnectorConfig {
    /// Build from driver-style JSON parameters.
    pub fn from_params(params: serde_json::Value) -> anyhow::Result<Self> {
        let config: Self =
            serde_json::from_value(params).context("Failed to parse connector parameters")?;
        Ok(config.normalized())
    }

    /// Build from the contents of a TOML connector file.
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse connector TOML")?;
        Ok(config.normalized())
    }

    /// Apply the defaults that serde cannot express: a zero batch size means
    /// the default, and empty overrides mean no override.
    pub fn normalized(mut self) -> Self {
        if self.batch_size == 0 {
            self.batch_size = DEFAULT_BATCH_SIZE;
        }
        self.schema_override = self.schema_override.filter(|s| !s.is_empty());
        self.table_override = self.table_override.filter(|t| !t.is_empty());
        self
    }

    pub fn resolver(&self) -> IdentifierResolver {
        IdentifierResolver::new(self.schema_override.clone(), self.table_override.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_size_from_params() {
        let config = ConnectorConfig::from_params(json!({"BatchSize": 1000})).unwrap();
        assert_eq!(config.batch_size, 1000);
    }

    #[test]
    fn test_default_batch_size() {
        let config = ConnectorConfig::from_params(json!({})).unwrap();
        assert_eq!(config.batch_size, 500);

        let config = ConnectorConfig::from_params(json!({"batch_size": 0})).unwrap();
        assert_eq!(config.batch_size, 500);
    }

    #[test]
    fn test_legacy_field_names() {
        let config = ConnectorConfig::from_params(json!({
            "AutoCreateTable": true,
            "CkSchema": "xxtest",
            "Table": ""
        }))
        .unwrap();
        assert!(config.auto_create_table);
        assert_eq!(config.schema_override.as_deref(), Some("xxtest"));
        assert_eq!(config.table_override, None);
    }

    #[test]
    fn test_from_toml() {
        let config = ConnectorConfig::from_toml_str(
            r#"
            batch_size = 2
            auto_create_table = true
            schema_override = "analytics"
            dialect = "ansi"
            failure_policy = "continue_other_groups"
            idle_timeout = "250ms"
            "#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.dialect, SqlDialect::Ansi);
        assert_eq!(config.failure_policy, FailurePolicy::ContinueOtherGroups);
        assert_eq!(config.idle_timeout, Duration::from_millis(250));
        assert_eq!(
            config.resolver().resolve("t", "src"),
            sql_types::TableRef::new("analytics", "t")
        );
    }

    #[test]
    fn test_idle_timeout_as_number() {
        let config = ConnectorConfig::from_params(json!({"idle_timeout": 30})).unwrap();
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert!(ConnectorConfig::from_params(json!({"idle_timeout": "soon"})).is_err());
    }

    #[test]
    fn test_failure_policy_from_str() {
        assert_eq!(
            "abort_remaining".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::AbortRemaining
        );
        assert_eq!(
            "continue-other-groups".parse::<FailurePolicy>().unwrap(),
            FailurePolicy::ContinueOtherGroups
        );
        assert!("retry".parse::<FailurePolicy>().is_err());
    }
}
