use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const DEFAULT_VERIFY_TOKEN: &str = "deepseek-bot";

pub const ENV_WHATSAPP_TOKEN: &str = "WHATSAPP_TOKEN";
pub const ENV_WHATSAPP_PHONE_ID: &str = "WHATSAPP_PHONE_ID";
pub const ENV_DEEPSEEK_API_KEY: &str = "DEEPSEEK_API_KEY";
pub const ENV_VERIFY_TOKEN: &str = "VERIFY_TOKEN";

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub http: HTTPConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub completion: CompletionConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Always populated from the environment, never from the file.
    #[serde(skip)]
    pub credentials: Credentials,
}
impl AppConfig {
    /// Loads non-secret settings from the TOML file (an explicit path must exist,
    /// the default path is optional) and secrets from the process environment.
    pub fn load(config_filepath: Option<PathBuf>) -> Result<Self> {
        let mut config = match config_filepath {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.credentials = Credentials::from_env();
        Ok(config)
    }

    fn from_file(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {config_path:?}"))?;

        toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse TOML config file: {config_path:?}"))
    }

    /// Fails when any required credential is missing, naming every missing variable.
    pub fn check(&self) -> Result<()> {
        let missing = self.credentials.missing();
        if !missing.is_empty() {
            bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }
        Ok(())
    }
}

/// Secrets read once at startup. Empty values are treated as unset.
#[derive(Clone)]
pub struct Credentials {
    pub whatsapp_token: Option<String>,
    pub whatsapp_phone_id: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub verify_token: String,
}
impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(name).filter(|value| !value.is_empty());
        Self {
            whatsapp_token: read(ENV_WHATSAPP_TOKEN),
            whatsapp_phone_id: read(ENV_WHATSAPP_PHONE_ID),
            deepseek_api_key: read(ENV_DEEPSEEK_API_KEY),
            verify_token: read(ENV_VERIFY_TOKEN)
                .unwrap_or_else(|| DEFAULT_VERIFY_TOKEN.to_string()),
        }
    }

    pub fn missing(&self) -> Vec<&'static str> {
        [
            (ENV_WHATSAPP_TOKEN, self.whatsapp_token.is_none()),
            (ENV_WHATSAPP_PHONE_ID, self.whatsapp_phone_id.is_none()),
            (ENV_DEEPSEEK_API_KEY, self.deepseek_api_key.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, missing)| missing.then_some(name))
        .collect()
    }
}
impl Default for Credentials {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("whatsapp_token", &redact(&self.whatsapp_token))
            .field("whatsapp_phone_id", &self.whatsapp_phone_id)
            .field("deepseek_api_key", &redact(&self.deepseek_api_key))
            .field("verify_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HTTPConfig {
    #[serde(default = "default_http_address")]
    pub address: SocketAddr,

    #[serde(default)]
    pub tls: Option<TLSConfig>,
}
impl Default for HTTPConfig {
    fn default() -> Self {
        Self {
            address: default_http_address(),
            tls: None,
        }
    }
}

#[cfg_attr(
    not(any(feature = "tls-rustls", feature = "tls-native")),
    allow(dead_code)
)]
#[derive(Debug, Clone, Deserialize)]
pub struct TLSConfig {
    #[serde(deserialize_with = "deserialize_existing_file")]
    pub certificate_path: PathBuf,

    #[serde(deserialize_with = "deserialize_existing_file")]
    pub key_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_whatsapp_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_whatsapp_api_version")]
    pub api_version: String,
}
impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_whatsapp_api_base_url(),
            api_version: default_whatsapp_api_version(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_api_url")]
    pub api_url: String,
}
impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_url: default_completion_api_url(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpstreamConfig {
    /// Applies to both outbound APIs. Unset means requests may block indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}
impl UpstreamConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

fn default_http_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5000)
}
fn default_whatsapp_api_base_url() -> String {
    "https://graph.facebook.com".to_string()
}
fn default_whatsapp_api_version() -> String {
    "v20.0".to_string()
}
fn default_completion_api_url() -> String {
    "https://api.deepseek.com/v1/chat/completions".to_string()
}

fn deserialize_existing_file<'de, D>(deserializer: D) -> Result<PathBuf, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let path = PathBuf::deserialize(deserializer)?;
    if !path.is_file() {
        return Err(serde::de::Error::custom(format!(
            "File does not exist: {}",
            path.display()
        )));
    }
    Ok(path)
}
