use crate::{FileSequence, HistoryError};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::value::Uncased;
use figment::Figment;
use history_xdr::{AccountId, Asset, PUBLIC_NETWORK_PASSPHRASE};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// Flat environment variables of the docker-compose deployment, mapped onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("ASSET_CODE", "asset.code"),
    ("ASSET_ISSUER", "asset.issuer"),
    ("NETWORK_PASSPHRASE", "network.passphrase"),
    ("MAX_RETRIES", "archive.max_retries"),
    ("BUCKET_NAME", "archive.bucket"),
    ("CORE_DIRECTORY", "archive.core_directory"),
    ("PYTHON_PASSWORD", "database.password"),
    ("POSTGRES_HOST", "database.host"),
    ("POSTGRES_PASSWORD", "database.admin_password"),
    ("FIRST_FILE", "collector.first_file"),
];

pub const DEFAULT_CONFIG_PATH: &str = "configs/default.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub archive: ArchiveConfig,
    pub asset: AssetConfig,
    pub network: NetworkConfig,
    pub logging: LoggingConfig,
    pub collector: CollectorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Full connection URL; takes precedence over the individual fields.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "string_like")]
    pub name: String,
    #[serde(deserialize_with = "string_like")]
    pub user: String,
    #[serde(deserialize_with = "string_like")]
    pub password: String,
    #[serde(deserialize_with = "string_like")]
    pub admin_user: String,
    #[serde(deserialize_with = "string_like")]
    pub admin_password: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ArchiveConfig {
    #[serde(deserialize_with = "string_like")]
    pub bucket: String,
    /// Prefix inside the bucket, e.g. `core_history/`.
    #[serde(deserialize_with = "string_like")]
    pub core_directory: String,
    pub endpoint: String,
    /// Read checkpoint files from a local mirror instead of S3.
    pub local_dir: Option<String>,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AssetConfig {
    #[serde(deserialize_with = "string_like")]
    pub code: String,
    pub issuer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CollectorConfig {
    /// Starting checkpoint when the database cursor is empty.
    pub first_file: Option<FileSequence>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 3000,
            },
            database: DatabaseConfig {
                url: None,
                host: "db".to_string(),
                port: 5432,
                name: "kin".to_string(),
                user: "python".to_string(),
                password: String::new(),
                admin_user: "postgres".to_string(),
                admin_password: String::new(),
                max_connections: 5,
            },
            archive: ArchiveConfig {
                bucket: String::new(),
                core_directory: String::new(),
                endpoint: "https://s3.amazonaws.com".to_string(),
                local_dir: None,
                max_retries: 5,
                retry_delay_secs: 180, // checkpoints are published every ~5 minutes
                request_timeout_secs: 60,
            },
            asset: AssetConfig {
                code: "KIN".to_string(),
                issuer: String::new(),
            },
            network: NetworkConfig {
                passphrase: PUBLIC_NETWORK_PASSPHRASE.to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
            collector: CollectorConfig { first_file: None },
        }
    }
}

impl Config {
    /// Layers defaults, the TOML file, `HISTORY_*` variables and the legacy variables.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        match path {
            Some(path) => figment = figment.merge(Toml::file(path)),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                figment = figment.merge(Toml::file(DEFAULT_CONFIG_PATH))
            }
            None => {}
        }
        figment
            .merge(Env::prefixed("HISTORY_").split("__"))
            .merge(legacy_env())
    }

    pub fn load(path: Option<&Path>) -> Result<Self, HistoryError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(HistoryError::ConfigError {
                    reason: format!("config file {} does not exist", path.display()),
                });
            }
        }
        Self::figment(path)
            .extract()
            .map_err(|e| HistoryError::ConfigError {
                reason: e.to_string(),
            })
    }

    /// Checks the settings the collector needs; the API alone only needs `server` and `database`.
    pub fn validate(&self) -> Result<(), HistoryError> {
        let fail = |reason: String| Err(HistoryError::ConfigError { reason });
        if self.server.port == 0 {
            return fail("server.port must be non-zero".to_string());
        }
        if self.archive.bucket.is_empty() && self.archive.local_dir.is_none() {
            return fail("archive.bucket or archive.local_dir must be set".to_string());
        }
        if self.network.passphrase.is_empty() {
            return fail("network.passphrase must be set".to_string());
        }
        if let Some(first) = self.collector.first_file {
            if !first.is_checkpoint() {
                return fail(format!("collector.first_file {} is not a checkpoint", first));
            }
        }
        self.asset.to_asset().map(|_| ())
    }

    /// Same config with secrets blanked, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        let hide = |s: &mut String| {
            if !s.is_empty() {
                *s = "********".to_string();
            }
        };
        hide(&mut copy.database.password);
        hide(&mut copy.database.admin_password);
        if copy.database.url.is_some() {
            copy.database.url = Some("********".to_string());
        }
        copy
    }
}

impl AssetConfig {
    /// The tracked asset; 4 or 12 character variant chosen by code length.
    pub fn to_asset(&self) -> Result<Asset, HistoryError> {
        let issuer = AccountId::from_strkey(&self.issuer).map_err(|e| HistoryError::ConfigError {
            reason: format!("asset.issuer: {}", e),
        })?;
        Asset::credit(&self.code, issuer).map_err(|e| HistoryError::ConfigError {
            reason: format!("asset.code: {}", e),
        })
    }
}

fn legacy_env() -> Env {
    let names: Vec<&str> = LEGACY_ENV.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, mapped)| Uncased::from(*mapped))
            .unwrap_or_else(|| Uncased::new(key.as_str().to_string()))
    })
}

/// Accepts numbers and booleans where a string is expected: environment values such as
/// `PYTHON_PASSWORD=1234` arrive typed.
fn string_like<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        UInt(u64),
        Float(f64),
        Bool(bool),
    }
    Ok(match Raw::deserialize(d)? {
        Raw::Str(s) => s,
        Raw::Int(i) => i.to_string(),
        Raw::UInt(u) => u.to_string(),
        Raw::Float(f) => f.to_string(),
        Raw::Bool(b) => b.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    const ISSUER: &str = "GAAACAQDAQCQMBYIBEFAWDANBYHRAEISCMKBKFQXDAMRUGY4DUPB7JZX";

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.archive.bucket = "stellar-history".to_string();
        config.asset.issuer = ISSUER.to_string();
        config
    }

    #[test]
    fn test_defaults_listen_on_port_3000() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.bind, "0.0.0.0");
    }

    #[test]
    fn test_validate() {
        assert!(valid_config().validate().is_ok());

        let mut no_archive = valid_config();
        no_archive.archive.bucket.clear();
        assert!(no_archive.validate().is_err());
        no_archive.archive.local_dir = Some("/tmp/mirror".to_string());
        assert!(no_archive.validate().is_ok());

        let mut bad_issuer = valid_config();
        bad_issuer.asset.issuer = "GBAD".to_string();
        assert!(matches!(
            bad_issuer.validate(),
            Err(HistoryError::ConfigError { .. })
        ));

        let mut bad_first = valid_config();
        bad_first.collector.first_file = Some(FileSequence::new(0x40));
        assert!(bad_first.validate().is_err());
    }

    #[test]
    fn test_asset_type_follows_code_length() {
        let mut asset = valid_config().asset;
        assert!(matches!(asset.to_asset().unwrap(), Asset::CreditAlphanum4 { .. }));
        asset.code = "KINCOIN".to_string();
        assert!(matches!(asset.to_asset().unwrap(), Asset::CreditAlphanum12 { .. }));
    }

    #[test]
    fn test_layers_toml_and_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "history.toml",
                r#"
                [server]
                port = 8080

                [archive]
                bucket = "from-file"
                max_retries = 2
                "#,
            )?;
            jail.set_env("HISTORY_ARCHIVE__MAX_RETRIES", "7");
            jail.set_env("ASSET_ISSUER", ISSUER);
            jail.set_env("PYTHON_PASSWORD", "1234");
            jail.set_env("FIRST_FILE", "0000003f");

            let config = Config::load(Some(Path::new("history.toml"))).map_err(|e| e.to_string())?;
            assert_eq!(config.server.port, 8080);
            assert_eq!(config.archive.bucket, "from-file");
            assert_eq!(config.archive.max_retries, 7);
            assert_eq!(config.asset.issuer, ISSUER);
            assert_eq!(config.database.password, "1234");
            assert_eq!(config.collector.first_file, Some(FileSequence::new(0x3f)));
            Ok(())
        });
    }

    #[test]
    fn test_rejects_unknown_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "[server]\nlisten = \"x\"\n")?;
            assert!(Config::load(Some(Path::new("bad.toml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Config::load(Some(Path::new("/nonexistent/history.toml"))).is_err());
    }

    #[test]
    fn test_redacted_hides_passwords() {
        let mut config = valid_config();
        config.database.password = "secret".to_string();
        let redacted = config.redacted();
        assert_eq!(redacted.database.password, "********");
        assert_eq!(redacted.database.admin_password, "");
    }
}
