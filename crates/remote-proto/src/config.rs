use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub panel: PanelConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub streams: StreamsConfig,
}

/// Settings for the control panel (RPC client side).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Base URL of the backend, e.g. `http://127.0.0.1:8990`.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Transport timeout applied by the HTTP gateway to each call.
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Volume at start-up (0-100).  Not persisted across restarts.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    #[serde(default = "default_autoconnect")]
    pub default_autoconnect: bool,
    #[serde(default = "default_watchdog_interval_secs")]
    pub watchdog_interval_secs: u64,
    #[serde(default = "default_metadata_interval_secs")]
    pub metadata_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamsConfig {
    #[serde(default = "default_channel1_url")]
    pub channel1_url: String,
    #[serde(default = "default_channel2_url")]
    pub channel2_url: String,
    /// NTS live endpoint returning now/next for both channels.
    #[serde(default = "default_live_api_url")]
    pub live_api_url: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            poll_interval_ms: default_poll_interval_ms(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            default_volume: default_volume(),
            default_autoconnect: default_autoconnect(),
            watchdog_interval_secs: default_watchdog_interval_secs(),
            metadata_interval_secs: default_metadata_interval_secs(),
        }
    }
}

impl Default for StreamsConfig {
    fn default() -> Self {
        Self {
            channel1_url: default_channel1_url(),
            channel2_url: default_channel2_url(),
            live_api_url: default_live_api_url(),
        }
    }
}

impl PanelConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }
}

impl DaemonConfig {
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs.max(1))
    }

    pub fn metadata_interval(&self) -> Duration {
        Duration::from_secs(self.metadata_interval_secs.max(1))
    }
}

fn default_endpoint() -> String {
    format!("http://{}:{}", default_bind_address(), default_port())
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_rpc_timeout_ms() -> u64 {
    5000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8990
}

fn default_volume() -> u8 {
    70
}

fn default_autoconnect() -> bool {
    true
}

fn default_watchdog_interval_secs() -> u64 {
    2
}

fn default_metadata_interval_secs() -> u64 {
    15
}

fn default_channel1_url() -> String {
    "https://stream-relay-geo.ntslive.net/stream?client=direct".to_string()
}

fn default_channel2_url() -> String {
    "https://stream-relay-geo.ntslive.net/stream2?client=direct".to_string()
}

fn default_live_api_url() -> String {
    "https://www.nts.live/api/v2/live".to_string()
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.panel.poll_interval(), Duration::from_millis(2000));
        assert_eq!(config.panel.endpoint, "http://127.0.0.1:8990");
        assert_eq!(config.daemon.listen_address(), "127.0.0.1:8990");
        assert_eq!(config.daemon.default_volume, 70);
        assert!(config.daemon.default_autoconnect);
        assert_eq!(config.daemon.watchdog_interval(), Duration::from_secs(2));
        assert_eq!(config.daemon.metadata_interval(), Duration::from_secs(15));
        assert!(config.streams.channel2_url.contains("stream2"));
        assert!(Config::config_path().ends_with("nts-remote/config.toml"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [panel]
            poll_interval_ms = 500

            [daemon]
            port = 9000
            "#,
        )
        .unwrap();
        assert_eq!(config.panel.poll_interval_ms, 500);
        assert_eq!(config.panel.rpc_timeout_ms, 5000);
        assert_eq!(config.daemon.port, 9000);
        assert_eq!(config.daemon.bind_address, "127.0.0.1");
        assert!(config.streams.live_api_url.starts_with("https://"));
    }

    #[test]
    fn test_zero_poll_interval_is_clamped() {
        let config: Config = toml::from_str("[panel]\npoll_interval_ms = 0\n").unwrap();
        assert_eq!(config.panel.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_save_and_load_roundtrip_on_disk() {
        let dir = std::env::temp_dir().join(format!("nts-remote-cfg-{}", std::process::id()));
        let path = dir.join("config.toml");
        let mut config = Config::default();
        config.panel.endpoint = "http://deck.local:8990".into();
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.panel.endpoint, "http://deck.local:8990");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
