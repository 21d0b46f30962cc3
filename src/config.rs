//! Configuration files.
//!
//! Two TOML files are read: the main configuration and the credentials.
//! Each can be overridden from the environment, `KEYWATCH__` for the main
//! file and `KEYWATCH_CREDENTIALS__` for the credentials, with `__`
//! separating nested keys:
//!
//! ```bash
//! KEYWATCH__GENERAL__APPLICATION_NAME="keys monitor" \
//! KEYWATCH_CREDENTIALS__TELEGRAM__TOKEN="123:abc" \
//! keywatch --config ./config/config.toml
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::de::DeserializeOwned;
use serde::Deserialize;

const CONFIG_ENV_PREFIX: &str = "KEYWATCH";
const CREDENTIALS_ENV_PREFIX: &str = "KEYWATCH_CREDENTIALS";
const ENV_SEPARATOR: &str = "__";

/// Main configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MainConfig {
    pub general: GeneralConfig,
    pub output_notifiers: OutputNotifiersConfig,
    pub bls_keys_monitoring: Vec<BlsKeysMonitorConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub application_name: String,
    pub system_self_check: SystemSelfCheckConfig,
    pub alarm_snooze: AlarmSnoozeConfig,
    pub logs: LogsConfig,
}

/// Log files written when `--log-save` is given.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogsConfig {
    /// How long one file is written before rolling over.
    pub log_file_life_span_in_sec: u64,
    /// Accepted for compatibility. Files roll over on time only.
    pub log_file_life_span_in_mb: u64,
}

/// Periodic report about the application itself.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SystemSelfCheckConfig {
    pub enabled: bool,
    /// `"every day"` or a weekday name.
    pub day_of_week: String,
    pub hour: u32,
    pub minute: u32,
    pub polling_interval_in_sec: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlarmSnoozeConfig {
    pub enabled: bool,
    pub num_notifications_for_each_faulty_key: u32,
    pub snooze_time_in_sec: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputNotifiersConfig {
    pub num_retries: u32,
    pub seconds_between_retries: u64,
    pub pushover: NotifierEndpointConfig,
    pub telegram: NotifierEndpointConfig,
    pub slack: NotifierEndpointConfig,
    pub smtp: SmtpNotifierConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NotifierEndpointConfig {
    pub enabled: bool,
    pub url: String,
}

/// E-mail channel. The sender account is in the credentials file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmtpNotifierConfig {
    pub enabled: bool,
    pub to: String,
    pub smtp_port: u16,
    pub smtp_host: String,
}

/// One monitored network.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BlsKeysMonitorConfig {
    pub name: String,
    /// Largest `rating - temp_rating` gap tolerated before alerting.
    pub alarm_delta_rating_drop: f64,
    pub api_url: String,
    pub explorer_url: String,
    pub polling_interval_in_seconds: u64,
    pub list_file: PathBuf,
}

/// Credentials file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub pushover: PushoverCredentials,
    pub telegram: TelegramCredentials,
    pub slack: SlackCredentials,
    pub smtp: SmtpCredentials,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenUserKey {
    pub token: String,
    pub user_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TokenChatId {
    pub token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackSecret {
    pub secret: String,
}

/// Pushover account plus any number of extra recipients.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PushoverCredentials {
    pub token: String,
    pub user_key: String,
    pub additional: Vec<TokenUserKey>,
}

impl PushoverCredentials {
    /// The primary entry followed by the additional ones.
    pub fn all(&self) -> Vec<TokenUserKey> {
        let primary = TokenUserKey {
            token: self.token.clone(),
            user_key: self.user_key.clone(),
        };
        std::iter::once(primary)
            .chain(self.additional.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
    pub additional: Vec<TokenChatId>,
}

impl TelegramCredentials {
    /// The primary entry followed by the additional ones.
    pub fn all(&self) -> Vec<TokenChatId> {
        let primary = TokenChatId {
            token: self.token.clone(),
            chat_id: self.chat_id.clone(),
        };
        std::iter::once(primary)
            .chain(self.additional.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SlackCredentials {
    pub secret: String,
    pub additional: Vec<SlackSecret>,
}

impl SlackCredentials {
    /// The primary entry followed by the additional ones.
    pub fn all(&self) -> Vec<SlackSecret> {
        let primary = SlackSecret {
            secret: self.secret.clone(),
        };
        std::iter::once(primary)
            .chain(self.additional.iter().cloned())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SmtpCredentials {
    pub email: String,
    pub password: String,
}

/// Everything the application is assembled from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllConfigs {
    pub config: MainConfig,
    pub credentials: CredentialsConfig,
}

impl AllConfigs {
    /// Read both files and apply the environment overrides.
    pub fn load(config_path: &Path, credentials_path: &Path) -> Result<Self> {
        Ok(Self {
            config: load_toml(config_path, CONFIG_ENV_PREFIX)?,
            credentials: load_toml(credentials_path, CREDENTIALS_ENV_PREFIX)?,
        })
    }
}

fn load_toml<T: DeserializeOwned>(path: &Path, env_prefix: &str) -> Result<T> {
    let config = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .add_source(Environment::with_prefix(env_prefix).separator(ENV_SEPARATOR))
        .build()
        .with_context(|| format!("reading {}", path.display()))?;

    config
        .try_deserialize()
        .with_context(|| format!("decoding {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_toml(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const MAIN: &str = r#"
[general]
application_name = "Keys monitoring app"

[general.system_self_check]
enabled = true
day_of_week = "every day"
hour = 12
minute = 1
polling_interval_in_sec = 30

[general.alarm_snooze]
enabled = true
num_notifications_for_each_faulty_key = 3
snooze_time_in_sec = 43200

[general.logs]
log_file_life_span_in_sec = 86400
log_file_life_span_in_mb = 1024

[output_notifiers]
num_retries = 3
seconds_between_retries = 10

[output_notifiers.pushover]
enabled = true
url = "https://api.pushover.net/1/messages.json"

[output_notifiers.smtp]
enabled = true
to = "alerts@example.com"
smtp_port = 587
smtp_host = "smtp.example.com"

[[bls_keys_monitoring]]
alarm_delta_rating_drop = 1.0
name = "test 1"
api_url = "test URL 1"
explorer_url = "explorer URL 1"
polling_interval_in_seconds = 300
list_file = "./config/network1.list"

[[bls_keys_monitoring]]
alarm_delta_rating_drop = 2.0
name = "test 2"
api_url = "test URL 2"
explorer_url = "explorer URL 2"
polling_interval_in_seconds = 301
list_file = "./config/network2.list"
"#;

    const CREDENTIALS: &str = r#"
[pushover]
token = "token1"
user_key = "userKey1"

[[pushover.additional]]
token = "token2"
user_key = "userKey2"

[telegram]
token = "bot-token"
chat_id = "42"

[smtp]
email = "monitor@example.com"
password = "app-password"
"#;

    #[test]
    fn loads_main_config() {
        let file = write_toml(MAIN);
        let config: MainConfig = load_toml(file.path(), "KEYWATCH_TEST_MAIN").unwrap();

        let expected = MainConfig {
            general: GeneralConfig {
                application_name: "Keys monitoring app".to_string(),
                system_self_check: SystemSelfCheckConfig {
                    enabled: true,
                    day_of_week: "every day".to_string(),
                    hour: 12,
                    minute: 1,
                    polling_interval_in_sec: 30,
                },
                alarm_snooze: AlarmSnoozeConfig {
                    enabled: true,
                    num_notifications_for_each_faulty_key: 3,
                    snooze_time_in_sec: 43200,
                },
                logs: LogsConfig {
                    log_file_life_span_in_sec: 86400,
                    log_file_life_span_in_mb: 1024,
                },
            },
            output_notifiers: OutputNotifiersConfig {
                num_retries: 3,
                seconds_between_retries: 10,
                pushover: NotifierEndpointConfig {
                    enabled: true,
                    url: "https://api.pushover.net/1/messages.json".to_string(),
                },
                smtp: SmtpNotifierConfig {
                    enabled: true,
                    to: "alerts@example.com".to_string(),
                    smtp_port: 587,
                    smtp_host: "smtp.example.com".to_string(),
                },
                ..Default::default()
            },
            bls_keys_monitoring: vec![
                BlsKeysMonitorConfig {
                    name: "test 1".to_string(),
                    alarm_delta_rating_drop: 1.0,
                    api_url: "test URL 1".to_string(),
                    explorer_url: "explorer URL 1".to_string(),
                    polling_interval_in_seconds: 300,
                    list_file: PathBuf::from("./config/network1.list"),
                },
                BlsKeysMonitorConfig {
                    name: "test 2".to_string(),
                    alarm_delta_rating_drop: 2.0,
                    api_url: "test URL 2".to_string(),
                    explorer_url: "explorer URL 2".to_string(),
                    polling_interval_in_seconds: 301,
                    list_file: PathBuf::from("./config/network2.list"),
                },
            ],
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn loads_credentials() {
        let file = write_toml(CREDENTIALS);
        let credentials: CredentialsConfig =
            load_toml(file.path(), "KEYWATCH_TEST_CREDENTIALS").unwrap();

        assert_eq!(
            credentials.pushover.all(),
            vec![
                TokenUserKey {
                    token: "token1".to_string(),
                    user_key: "userKey1".to_string(),
                },
                TokenUserKey {
                    token: "token2".to_string(),
                    user_key: "userKey2".to_string(),
                },
            ]
        );
        assert_eq!(credentials.telegram.all().len(), 1);
        assert_eq!(credentials.telegram.chat_id, "42");
        assert_eq!(credentials.slack, SlackCredentials::default());
        assert_eq!(
            credentials.smtp,
            SmtpCredentials {
                email: "monitor@example.com".to_string(),
                password: "app-password".to_string(),
            }
        );
    }

    #[test]
    fn logs_section_defaults_to_zero() {
        let file = write_toml("[general.logs]\nlog_file_life_span_in_sec = 3600\n");
        let config: MainConfig = load_toml(file.path(), "KEYWATCH_TEST_LOGS").unwrap();

        assert_eq!(
            config.general.logs,
            LogsConfig {
                log_file_life_span_in_sec: 3600,
                log_file_life_span_in_mb: 0,
            }
        );
        assert_eq!(config.output_notifiers.smtp, SmtpNotifierConfig::default());
    }

    #[test]
    fn load_reads_both_files() {
        let main = write_toml(MAIN);
        let credentials = write_toml(CREDENTIALS);

        let all = AllConfigs::load(main.path(), credentials.path()).unwrap();

        assert_eq!(all.config.bls_keys_monitoring.len(), 2);
        assert_eq!(all.credentials.pushover.token, "token1");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");

        let err = AllConfigs::load(&missing, &missing).unwrap_err();

        assert!(err.to_string().contains("missing.toml"));
    }

    #[test]
    fn malformed_value_is_an_error() {
        let file = write_toml("[general.system_self_check]\nhour = \"noon\"\n");
        assert!(load_toml::<MainConfig>(file.path(), "KEYWATCH_TEST_BAD").is_err());
    }
}
