use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use url::Url;

pub const BACKEND_URL_ENV: &str = "SNAPWIN_BACKEND_URL";
pub const ANON_KEY_ENV: &str = "SNAPWIN_ANON_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub deliveries: DeliveriesConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub session: SessionConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    /// Public (anon) API key sent as the `apikey` header on every request.
    pub anon_key: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Name of the serverless function that fans out push notifications.
    pub function_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            function_name: "send-admin-notification".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveriesConfig {
    pub page_size: usize,
    pub customer_batch_size: usize,
}

impl Default for DeliveriesConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            customer_batch_size: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub debounce_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self { debounce_ms: 250 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub max_age_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "snapwin_admin".to_string(),
            max_age_seconds: 60 * 60 * 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                url: "https://your-project.supabase.co".to_string(),
                anon_key: "replace-with-anon-key".to_string(),
                timeout_seconds: default_timeout_seconds(),
            },
            dispatch: DispatchConfig::default(),
            deliveries: DeliveriesConfig::default(),
            realtime: RealtimeConfig::default(),
            session: SessionConfig::default(),
            logging: Some(LoggingConfig {
                level: "info".to_string(),
            }),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config: {path}"))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load `path` if it exists, otherwise fall back to defaults. Environment
    /// overrides are applied either way.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend.url = url;
        }
        if let Some(key) = lookup(ANON_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.backend.anon_key = key;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let url = Url::parse(&self.backend.url)
            .with_context(|| format!("Invalid backend url: {}", self.backend.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Backend url must use http or https: {}", self.backend.url);
        }
        if self.backend.anon_key.trim().is_empty() {
            bail!("backend.anon_key must not be empty");
        }
        if self.dispatch.function_name.trim().is_empty() {
            bail!("dispatch.function_name must not be empty");
        }
        if self.deliveries.page_size == 0 {
            bail!("deliveries.page_size must be greater than 0");
        }
        if self.deliveries.customer_batch_size == 0 {
            bail!("deliveries.customer_batch_size must be greater than 0");
        }
        Ok(())
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .as_ref()
            .and_then(|l| l.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.deliveries.page_size, 50);
        assert_eq!(config.deliveries.customer_batch_size, 500);
        assert_eq!(config.realtime.debounce_ms, 250);
    }

    #[test]
    fn test_minimal_yaml_fills_defaults() {
        let config = Config::from_yaml(
            "backend:\n  url: https://abc.supabase.co\n  anon_key: key\nlogging:\n  level: debug\n",
        )
        .unwrap();

        assert_eq!(config.backend.timeout_seconds, 30);
        assert_eq!(config.dispatch.function_name, "send-admin-notification");
        assert_eq!(config.deliveries.page_size, 50);
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.backend.url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.backend.anon_key = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.deliveries.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env_overrides(|key| match key {
            BACKEND_URL_ENV => Some("https://prod.example.co".to_string()),
            ANON_KEY_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.backend.url, "https://prod.example.co");
        assert_eq!(config.backend.anon_key, "replace-with-anon-key");
    }

    #[test]
    fn test_round_trip_through_file() {
        let path = std::env::temp_dir().join(format!("snapwin-admin-{}.yaml", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let mut config = Config::default();
        config.deliveries.page_size = 25;
        config.to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.deliveries.page_size, 25);
        assert_eq!(loaded.backend.url, config.backend.url);
    }
}
