//! Engine configuration
//!
//! [`EngineConfig`] carries every tunable the engine reads at startup. Values
//! default to the editor's stock behavior and can be adjusted with the chained
//! `with_*` builders or from the environment via [`EngineConfig::from_env`].

use std::path::PathBuf;

/// Number of in-flight frames and back buffers
pub const FRAME_COUNT: usize = 2;

/// Startup configuration for [`Engine`](crate::engine::Engine) and the host loop
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    /// Present with vertical sync
    pub vsync: bool,
    /// Allow tearing when vsync is off and the backend supports it
    pub allow_tearing: bool,
    pub clear_color: [f64; 4],
    pub assets_dir: PathBuf,
    /// Seconds of update time between asset folder rescans
    pub asset_rescan_interval: f64,
    /// Camera translation speed in units per second
    pub move_speed: f32,
    /// Camera rotation in radians per pixel of mouse motion
    pub look_sensitivity: f32,
    /// Fixed update step in seconds
    pub fixed_timestep: f64,
    /// Upper bound on a single wall-clock frame delta fed to the accumulator
    pub max_frame_delta: f64,
    /// Per-slot constant buffer capacity; draws beyond it are dropped
    pub max_draws_per_frame: u32,
    pub frame_time_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "ggine".to_string(),
            vsync: true,
            allow_tearing: false,
            clear_color: [0.05, 0.05, 0.07, 1.0],
            assets_dir: PathBuf::from("assets"),
            asset_rescan_interval: 1.0,
            move_speed: 3.0,
            look_sensitivity: 0.005,
            fixed_timestep: 1.0 / 60.0,
            max_frame_delta: 0.25,
            max_draws_per_frame: 1024,
            frame_time_samples: 240,
        }
    }
}

impl EngineConfig {
    /// Default configuration with `GGINE_*` environment overrides applied
    ///
    /// Recognized variables:
    /// * `GGINE_ASSETS_DIR` - asset folder path
    /// * `GGINE_VSYNC` - `0`/`false`/`off` disables vsync
    /// * `GGINE_ALLOW_TEARING` - `1`/`true`/`on` allows tearing
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup("GGINE_ASSETS_DIR").filter(|d| !d.is_empty()) {
            self.assets_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup("GGINE_VSYNC").and_then(|v| parse_flag(&v)) {
            self.vsync = flag;
        }
        if let Some(flag) = lookup("GGINE_ALLOW_TEARING").and_then(|v| parse_flag(&v)) {
            self.allow_tearing = flag;
        }
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    pub fn with_tearing(mut self, allow_tearing: bool) -> Self {
        self.allow_tearing = allow_tearing;
        self
    }

    pub fn with_clear_color(mut self, clear_color: [f64; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = dir.into();
        self
    }

    pub fn with_camera_speeds(mut self, move_speed: f32, look_sensitivity: f32) -> Self {
        self.move_speed = move_speed;
        self.look_sensitivity = look_sensitivity;
        self
    }

    pub fn with_fixed_timestep(mut self, step: f64, max_frame_delta: f64) -> Self {
        self.fixed_timestep = step;
        self.max_frame_delta = max_frame_delta;
        self
    }

    pub fn with_max_draws_per_frame(mut self, max_draws: u32) -> Self {
        self.max_draws_per_frame = max_draws.max(1);
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_editor_behavior() {
        let config = EngineConfig::default();
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.vsync);
        assert!(!config.allow_tearing);
        assert_eq!(config.frame_time_samples, 240);
        assert!((config.fixed_timestep - 1.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_builders_chain() {
        let config = EngineConfig::default()
            .with_size(800, 600)
            .with_vsync(false)
            .with_tearing(true)
            .with_assets_dir("models")
            .with_max_draws_per_frame(0);

        assert_eq!((config.width, config.height), (800, 600));
        assert!(!config.vsync);
        assert!(config.allow_tearing);
        assert_eq!(config.assets_dir, PathBuf::from("models"));
        assert_eq!(config.max_draws_per_frame, 1);
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::default().with_env_overrides(|key| match key {
            "GGINE_ASSETS_DIR" => Some("/tmp/meshes".to_string()),
            "GGINE_VSYNC" => Some("off".to_string()),
            "GGINE_ALLOW_TEARING" => Some("maybe".to_string()),
            _ => None,
        });

        assert_eq!(config.assets_dir, PathBuf::from("/tmp/meshes"));
        assert!(!config.vsync);
        // Unrecognized values leave the default in place
        assert!(!config.allow_tearing);
    }
}
