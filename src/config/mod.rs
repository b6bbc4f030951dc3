//! Connector configuration assembly for the CLI.
//!
//! The optional TOML file is read first; every option given on the command
//! line then overrides the file.

use anyhow::Context;
use batch_sink::config::duration::parse_duration;
use batch_sink::ConnectorConfig;

use crate::ConnectorOpts;

impl ConnectorOpts {
    /// Build the effective connector configuration.
    pub fn load(&self) -> anyhow::Result<ConnectorConfig> {
        let base = match &self.connector_config {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read connector config {path:?}"))?;
                ConnectorConfig::from_toml_str(&content)
                    .with_context(|| format!("Invalid connector config {path:?}"))?
            }
            None => ConnectorConfig::default(),
        };
        self.apply(base)
    }

    /// Overlay the options set on the command line onto `config`.
    pub fn apply(&self, mut config: ConnectorConfig) -> anyhow::Result<ConnectorConfig> {
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if self.auto_create_table {
            config.auto_create_table = true;
        }
        if let Some(schema) = &self.schema_override {
            config.schema_override = Some(schema.clone());
        }
        if let Some(table) = &self.table_override {
            config.table_override = Some(table.clone());
        }
        if let Some(dialect) = self.dialect {
            config.dialect = dialect;
        }
        if let Some(policy) = self.failure_policy {
            config.failure_policy = policy;
        }
        if let Some(idle_timeout) = &self.idle_timeout {
            config.idle_timeout = parse_duration(idle_timeout)
                .with_context(|| format!("Invalid --idle-timeout '{idle_timeout}'"))?;
        }
        Ok(config.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use batch_sink::FailurePolicy;
    use sql_types::SqlDialect;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_defaults_without_file_or_flags() {
        let config = ConnectorOpts::default().load().unwrap();
        assert_eq!(config, ConnectorConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "batch_size = 10\nschema_override = \"from_file\"\ndialect = \"ansi\"\nidle_timeout = \"1m\""
        )
        .unwrap();

        let opts = ConnectorOpts {
            connector_config: Some(file.path().to_path_buf()),
            batch_size: Some(20),
            failure_policy: Some(FailurePolicy::ContinueOtherGroups),
            ..ConnectorOpts::default()
        };
        let config = opts.load().unwrap();

        assert_eq!(config.batch_size, 20);
        assert_eq!(config.schema_override.as_deref(), Some("from_file"));
        assert_eq!(config.dialect, SqlDialect::Ansi);
        assert_eq!(config.failure_policy, FailurePolicy::ContinueOtherGroups);
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_override_flag_means_none() {
        let opts = ConnectorOpts {
            table_override: Some(String::new()),
            batch_size: Some(0),
            ..ConnectorOpts::default()
        };
        let config = opts.load().unwrap();
        assert_eq!(config.table_override, None);
        assert_eq!(config.batch_size, 500);
    }

    #[test]
    fn test_bad_idle_timeout() {
        let opts = ConnectorOpts {
            idle_timeout: Some("soon".to_string()),
            ..ConnectorOpts::default()
        };
        assert!(opts.load().is_err());
    }

    #[test]
    fn test_missing_file() {
        let opts = ConnectorOpts {
            connector_config: Some("/nonexistent/connector.toml".into()),
            ..ConnectorOpts::default()
        };
        assert!(opts.load().is_err());
    }
}
