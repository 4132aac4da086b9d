use secrecy::SecretString;
use serde::Deserialize;

use crate::shared::ValidationError;

/// Connection settings for the source MySQL server.
///
/// This intentionally does not implement [`serde::Serialize`] to avoid
/// accidentally leaking the password into serialized forms.
#[derive(Debug, Clone, Deserialize)]
pub struct MySqlConnectionConfig {
    pub host: String,
    #[serde(default = "default_mysql_port")]
    pub port: u16,
    pub username: String,
    pub password: Option<SecretString>,
    /// Numeric identity this process registers with when it joins the source
    /// as a replication follower. Must be unique among the server's followers.
    #[serde(default = "default_server_id")]
    pub server_id: u32,
}

impl MySqlConnectionConfig {
    pub const DEFAULT_PORT: u16 = 3306;
    pub const DEFAULT_SERVER_ID: u32 = 1001;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.host.is_empty() {
            return Err(ValidationError::MissingField {
                field: "mysql.host".to_string(),
            });
        }
        if self.server_id == 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "mysql.server_id".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

fn default_mysql_port() -> u16 {
    MySqlConnectionConfig::DEFAULT_PORT
}

fn default_server_id() -> u32 {
    MySqlConnectionConfig::DEFAULT_SERVER_ID
}

/// Connection settings for the Elasticsearch sink.
#[derive(Debug, Clone, Deserialize)]
pub struct EsConnectionConfig {
    /// Base URL, e.g. `http://127.0.0.1:9200`.
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl EsConnectionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingField {
                field: "elasticsearch.url".to_string(),
            });
        }

        Ok(())
    }
}
