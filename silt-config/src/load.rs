use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "SILT";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
const ENV_SEPARATOR: &str = "__";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    /// The configuration file does not exist or is unreadable.
    #[error("configuration file `{0}` does not exist")]
    MissingConfigurationFile(PathBuf),

    /// Failed to initialize the configuration builder.
    #[error("failed to initialize configuration builder")]
    Builder(#[source] config::ConfigError),

    /// The configuration file was parsed but deserialization failed.
    #[error("failed to deserialize configuration")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads configuration from a TOML file plus `SILT_`-prefixed environment
/// variable overrides.
///
/// Nested keys use double underscores: `SILT_MYSQL__HOST` overrides
/// `[mysql] host`.
pub fn load_config_from_path<T>(path: &Path) -> Result<T, LoadConfigError>
where
    T: DeserializeOwned,
{
    if !path.is_file() {
        return Err(LoadConfigError::MissingConfigurationFile(
            path.to_path_buf(),
        ));
    }

    let file_source = config::File::from(path.to_path_buf()).format(config::FileFormat::Toml);
    let environment_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = config::Config::builder()
        .add_source(file_source)
        .add_source(environment_source)
        .build()
        .map_err(LoadConfigError::Builder)?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;
    use crate::shared::ReplicatorConfig;

    const SAMPLE: &str = r#"
data_dir = "/var/lib/silt"
read_timeout_ms = 500

[mysql]
host = "127.0.0.1"
username = "repl"
password = "secret"
server_id = 5001

[elasticsearch]
url = "http://127.0.0.1:9200"

[dump]
exec_path = "/usr/bin/mysqldump"

[bulk]
max_actions = 64
max_bytes = 1048576

[[source]]
schema = "test"
tables = ["test_river", "test_river_[0-9]{4}"]

[[rule]]
schema = "test"
table = "test_river"
index = "river"
type = "river"
parent = "pid"
[rule.field]
title = "es_title"
mylist = "es_mylist,list"
"#;

    #[test]
    fn loads_full_toml_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("silt.toml");
        fs::write(&path, SAMPLE).unwrap();

        let config: ReplicatorConfig = load_config_from_path(&path).unwrap();
        config.validate().unwrap();

        assert_eq!(config.mysql.host, "127.0.0.1");
        assert_eq!(config.mysql.server_id, 5001);
        assert_eq!(
            config.mysql.password.as_ref().unwrap().expose_secret(),
            "secret"
        );
        assert_eq!(config.read_timeout_ms, 500);
        assert_eq!(config.bulk.max_actions, 64);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].tables.len(), 2);

        let rule = &config.rules[0];
        assert_eq!(rule.index, "river");
        assert_eq!(rule.doc_type, "river");
        assert_eq!(rule.parent.as_deref(), Some("pid"));
        assert_eq!(rule.field_mapping["mylist"], "es_mylist,list");
    }

    #[test]
    fn defaults_apply_when_sections_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("silt.toml");
        fs::write(
            &path,
            r#"
data_dir = "/tmp/silt"

[mysql]
host = "db"
username = "root"

[elasticsearch]
url = "http://es:9200"

[[source]]
schema = "test"
tables = ["t"]
"#,
        )
        .unwrap();

        let config: ReplicatorConfig = load_config_from_path(&path).unwrap();

        assert_eq!(config.mysql.port, 3306);
        assert_eq!(config.mysql.server_id, 1001);
        assert_eq!(config.bulk.max_actions, 128);
        assert_eq!(config.dump.exec_path, "mydumper");
        assert_eq!(config.read_timeout_ms, 1000);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result: Result<ReplicatorConfig, _> =
            load_config_from_path(Path::new("/definitely/not/here.toml"));
        assert!(matches!(
            result,
            Err(LoadConfigError::MissingConfigurationFile(_))
        ));
    }

    #[test]
    fn validation_rejects_zero_max_actions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("silt.toml");
        fs::write(
            &path,
            r#"
data_dir = "/tmp/silt"

[mysql]
host = "db"
username = "root"

[elasticsearch]
url = "http://es:9200"

[bulk]
max_actions = 0

[[source]]
schema = "test"
tables = ["t"]
"#,
        )
        .unwrap();

        let config: ReplicatorConfig = load_config_from_path(&path).unwrap();
        assert!(config.validate().is_err());
    }
}
