//! Viewer configuration.

use client::{EngineConfig, LifecycleConfig, PlaybackConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

pub const CONFIG_PATH: &str = "chatter.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from `chatter.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            playback: self.playback,
            lifecycle: self.lifecycle,
        }
    }
}

/// Server endpoint and identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConnectionConfig {
    /// Websocket URL of the world server.
    #[serde(default = "default_url")]
    pub url: String,
    /// Five-character face sent as the handshake.
    #[serde(default = "default_face")]
    pub face: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            face: default_face(),
        }
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:8080/connect".to_string()
}
fn default_face() -> String {
    "o<w>o".to_string()
}

/// Frame loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RenderConfig {
    /// Frames per second.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// Upper bound on a frame's dt in seconds.
    #[serde(default = "default_max_frame_dt")]
    pub max_frame_dt: f64,
    /// A frame gap longer than this (ms) skips interpolation to the newest data.
    #[serde(default = "default_resync_after")]
    pub resync_after_ms: f64,
    /// Log a frame summary every this many frames (0 disables).
    #[serde(default = "default_report_every")]
    pub report_every: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            max_frame_dt: default_max_frame_dt(),
            resync_after_ms: default_resync_after(),
            report_every: default_report_every(),
        }
    }
}

fn default_fps() -> u32 {
    60
}
fn default_max_frame_dt() -> f64 {
    0.1
}
fn default_resync_after() -> f64 {
    1000.0
}
fn default_report_every() -> u64 {
    300
}

/// Logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [connection]
            face = "^_^_^"

            [playback]
            target_latency_ms = 50.0
            "#,
        )
        .unwrap();
        assert_eq!(config.connection.face, "^_^_^");
        assert_eq!(config.connection.url, default_url());
        assert_eq!(config.render.fps, 60);
        assert_eq!(config.engine().playback.target_latency_ms, 50.0);
        assert_eq!(config.engine().playback.slowdown_window_ms, 100.0);
        assert_eq!(config.engine().lifecycle.die_grace_ms, 1000.0);
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.log.filter, "info");
        assert_eq!(back.render.max_frame_dt, 0.1);
    }
}
