use crate::application::persistence::DEFAULT_DEBOUNCE;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendSettings {
    pub url: String,
    pub anon_key: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Container width assumed before the first measurement; unset means
    /// the dashboard stays "not ready" until a viewport event arrives.
    #[serde(default)]
    pub initial_width: Option<u32>,
    /// Keep the dashboard in memory only.
    #[serde(default)]
    pub ephemeral: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            log_level: default_log_level(),
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            debounce_ms: default_debounce_ms(),
            initial_width: None,
            ephemeral: false,
        }
    }
}

impl DashboardSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_storage_dir() -> String {
    ".dashboard".to_string()
}

fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE.as_millis() as u64
}

/// Load `config/app.*` (optional) overlaid with `ADMIN_DASHBOARD__*` variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(config::Environment::with_prefix("ADMIN_DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
