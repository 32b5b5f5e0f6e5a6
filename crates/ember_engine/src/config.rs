//! Engine configuration
//!
//! Serde-backed configuration structs with sensible defaults. A config
//! file is optional; `EngineConfig::default()` runs the engine as-is.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`EngineConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Window creation parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Window title.
    pub title: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Ember Engine".to_string(),
        }
    }
}

/// Renderer parameters: shader and texture assets, clear color, and
/// the bound on every GPU wait the renderer performs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Vertex shader SPIR-V, relative to the resources root.
    pub vertex_shader: String,
    /// Fragment shader SPIR-V, relative to the resources root.
    pub fragment_shader: String,
    /// Texture file, relative to the resources root.
    pub texture: String,
    /// RGBA clear color applied at the start of each frame.
    pub clear_color: [f32; 4],
    /// Timeout in nanoseconds for image acquisition and fence waits.
    /// A GPU hang surfaces as a per-frame timeout error instead of
    /// stalling the process.
    pub gpu_timeout_ns: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            vertex_shader: "shaders/quad.vert.spv".to_string(),
            fragment_shader: "shaders/quad.frag.spv".to_string(),
            texture: "textures/ball.dds".to_string(),
            clear_color: [1.0, 1.0, 0.0, 1.0],
            gpu_timeout_ns: 1_000_000_000,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window parameters.
    pub window: WindowConfig,
    /// Renderer parameters.
    pub renderer: RendererConfig,
    /// Directory all asset paths are resolved against.
    pub resources_root: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            renderer: RendererConfig::default(),
            resources_root: "resources".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let config = EngineConfig::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.renderer.gpu_timeout_ns, 1_000_000_000);
        assert!(config.renderer.vertex_shader.ends_with(".spv"));
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            resources_root = "assets"

            [window]
            width = 640
            title = "demo"

            [renderer]
            clear_color = [0.0, 0.0, 0.0, 1.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.resources_root, "assets");
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720); // default
        assert_eq!(config.window.title, "demo");
        assert_eq!(config.renderer.clear_color, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.renderer.texture, "textures/ball.dds"); // default
    }

    #[test]
    fn empty_toml_is_valid() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.window.title, "Ember Engine");
    }
}
