//! Configuration for the WeChat Official Account API
//!
//! Loads credentials and endpoints from an optional YAML file, with
//! environment variables (and `.env`) taking precedence.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Official Account API root.
pub const DEFAULT_API_BASE: &str = "https://api.weixin.qq.com/cgi-bin";
/// Template with `first`, `time`, `ip_list`, `sec_type` and `remark` slots.
pub const DEFAULT_TEMPLATE_ID: &str = "u7WqGbcn5PBiFVFT6iba8ULsaRwYG2NKmulZ1NYvuEc";
/// Viewer page that renders a base64 payload from the URL fragment.
pub const DEFAULT_AUTO_URL_PREFIX: &str = "https://dn-gaiamagic.qbox.me/auto-url.html";

/// Config files probed when no explicit path is given.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["config.yml", "../config.yml"];

pub const ENV_APP_ID: &str = "WECHAT_APPID";
pub const ENV_SECRET: &str = "WECHAT_SECRET";
pub const ENV_API_BASE: &str = "WECHAT_API_BASE";
pub const ENV_TEMPLATE_ID: &str = "WECHAT_TEMPLATE_ID";
pub const ENV_AUTO_URL_PREFIX: &str = "WECHAT_AUTO_URL_PREFIX";

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    wechat: Option<WechatSection>,
    template: Option<TemplateSection>,
}

#[derive(Debug, Default, Deserialize)]
struct WechatSection {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    app_id: Option<String>,
    secret: Option<String>,
    api_base: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateSection {
    id: Option<String>,
    auto_url_prefix: Option<String>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Credentials and endpoints for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub app_id: String,
    pub secret: String,
    pub api_base: String,
    pub template_id: String,
    pub auto_url_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            secret: String::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            template_id: DEFAULT_TEMPLATE_ID.to_string(),
            auto_url_prefix: DEFAULT_AUTO_URL_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from the first default file that
    /// exists. A missing default file is not an error; a missing explicit
    /// one is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_dotenv();

        match path {
            Some(path) => Self::load_from_file(path),
            None => match Self::find_default_file() {
                Some(found) => Self::load_from_file(found),
                None => Ok(Self::from_yaml(YamlConfig::default())),
            },
        }
    }

    /// Load configuration from a specific YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text, applying environment overrides.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?
        };
        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let wechat = yaml.wechat.unwrap_or_default();
        let template = yaml.template.unwrap_or_default();
        let defaults = Self::default();

        Self {
            app_id: Self::resolve_env_string(wechat.app_id, ENV_APP_ID, defaults.app_id),
            secret: Self::resolve_env_string(wechat.secret, ENV_SECRET, defaults.secret),
            api_base: Self::resolve_env_string(wechat.api_base, ENV_API_BASE, defaults.api_base),
            template_id: Self::resolve_env_string(
                template.id,
                ENV_TEMPLATE_ID,
                defaults.template_id,
            ),
            auto_url_prefix: Self::resolve_env_string(
                template.auto_url_prefix,
                ENV_AUTO_URL_PREFIX,
                defaults.auto_url_prefix,
            ),
        }
    }

    /// Resolve a value: `${VAR}` in YAML reads VAR, then `env_key` wins over
    /// the literal, then the literal, then the default.
    fn resolve_env_string(value: Option<String>, env_key: &str, default: String) -> String {
        if let Some(ref v) = value {
            if let Some(var_name) = v.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.is_empty() {
                return env_val;
            }
        }
        match value {
            Some(v) if !v.starts_with("${") => v,
            _ => default,
        }
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    fn find_default_file() -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.is_file())
    }

    /// Fail unless the credentials needed for a token request are present.
    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() {
            return Err(Error::Config(format!(
                "app id is not set (config `wechat.app_id` or {})",
                ENV_APP_ID
            )));
        }
        if self.secret.trim().is_empty() {
            return Err(Error::Config(format!(
                "secret is not set (config `wechat.secret` or {})",
                ENV_SECRET
            )));
        }
        if self.api_base.trim().is_empty() {
            return Err(Error::Config("api base URL is empty".to_string()));
        }
        Ok(())
    }
}
