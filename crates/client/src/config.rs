//! Engine tunables.
//!
//! The engine never reads files; the viewer embeds `EngineConfig` in its own
//! TOML configuration.

use serde::{Deserialize, Serialize};

/// Root engine configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
}

/// Playback clock rate controller.
///
/// With one pending interval left, the advance is scaled by
/// `sin(pi * offset / slowdown_period_ms)` while `offset < slowdown_window_ms`.
/// With a backlog, it is scaled by
/// `1 + ((offset - target_latency_ms) / catchup_scale_ms)^2` once
/// `offset > target_latency_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Distance behind the newest arrival the clock tries to hold (ms).
    #[serde(default = "default_target_latency")]
    pub target_latency_ms: f64,
    /// Offset below which playback starts to decelerate (ms).
    #[serde(default = "default_slowdown_window")]
    pub slowdown_window_ms: f64,
    /// Half-period of the deceleration sine (ms).
    #[serde(default = "default_slowdown_period")]
    pub slowdown_period_ms: f64,
    /// Divisor of the quadratic catch-up term (ms).
    #[serde(default = "default_catchup_scale")]
    pub catchup_scale_ms: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            target_latency_ms: default_target_latency(),
            slowdown_window_ms: default_slowdown_window(),
            slowdown_period_ms: default_slowdown_period(),
            catchup_scale_ms: default_catchup_scale(),
        }
    }
}

fn default_target_latency() -> f64 {
    33.0
}
fn default_slowdown_window() -> f64 {
    100.0
}
fn default_slowdown_period() -> f64 {
    200.0
}
fn default_catchup_scale() -> f64 {
    1000.0
}

/// Entity lifecycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LifecycleConfig {
    /// Longest a vetoed removal may keep an entity around (ms).
    #[serde(default = "default_die_grace")]
    pub die_grace_ms: f64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            die_grace_ms: default_die_grace(),
        }
    }
}

fn default_die_grace() -> f64 {
    1000.0
}
