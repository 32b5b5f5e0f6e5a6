//! Asset loading from the configured resources root
//!
//! Shader binaries and textures are read from paths relative to a
//! single resources directory (`shaders/<name>.spv`,
//! `textures/<name>.dds`).

use std::path::PathBuf;
use thiserror::Error;

pub mod image_loader;

pub use image_loader::ImageData;

/// Asset loading errors.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The file could not be opened or read.
    #[error("failed to open {path}: {source}")]
    Io {
        /// Resolved path of the asset.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file was read but its contents could not be decoded.
    #[error("failed to decode {path}: {reason}")]
    Decode {
        /// Resolved path of the asset.
        path: String,
        /// What made the contents invalid.
        reason: String,
    },

    /// SPIR-V blobs must have a 4-byte-aligned length.
    #[error("shader {path} has unaligned byte length {len}")]
    UnalignedShader {
        /// Resolved path of the shader.
        path: String,
        /// Actual byte length.
        len: usize,
    },
}

/// Reads assets relative to a resources root directory.
pub struct ResourceLoader {
    root: PathBuf,
}

impl ResourceLoader {
    /// Create a loader rooted at `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a relative asset path against the resources root.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Read the raw bytes of an asset. Failures are logged and
    /// returned; the caller decides whether they are fatal.
    pub fn read_bytes(&self, relative: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(relative);
        std::fs::read(&path).map_err(|source| {
            log::error!("failed to open file: {}", path.display());
            AssetError::Io {
                path: path.display().to_string(),
                source,
            }
        })
    }

    /// Read a SPIR-V shader binary, validating the 4-byte length
    /// alignment the shader-module API requires.
    pub fn read_shader(&self, relative: &str) -> Result<Vec<u8>, AssetError> {
        let bytes = self.read_bytes(relative)?;
        if bytes.len() % 4 != 0 {
            let path = self.resolve(relative).display().to_string();
            log::error!("shader {} is not 4-byte aligned ({} bytes)", path, bytes.len());
            return Err(AssetError::UnalignedShader {
                path,
                len: bytes.len(),
            });
        }
        Ok(bytes)
    }

    /// Load and decode an image asset into RGBA8 pixel data.
    pub fn load_image(&self, relative: &str) -> Result<ImageData, AssetError> {
        ImageData::from_file(self.resolve(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let dir = std::env::temp_dir().join("ember_engine_asset_tests");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[test]
    fn missing_file_is_an_error() {
        let loader = ResourceLoader::new("/nonexistent-resources-root");
        assert!(matches!(
            loader.read_bytes("shaders/missing.spv"),
            Err(AssetError::Io { .. })
        ));
    }

    #[test]
    fn shader_length_must_be_word_aligned() {
        temp_file("unaligned.spv", &[0u8; 7]);
        temp_file("aligned.spv", &[0u8; 8]);
        let loader =
            ResourceLoader::new(std::env::temp_dir().join("ember_engine_asset_tests"));

        assert!(matches!(
            loader.read_shader("unaligned.spv"),
            Err(AssetError::UnalignedShader { len: 7, .. })
        ));
        assert_eq!(loader.read_shader("aligned.spv").unwrap().len(), 8);
    }

    #[test]
    fn resolve_joins_against_root() {
        let loader = ResourceLoader::new("resources");
        assert_eq!(
            loader.resolve("textures/ball.dds"),
            Path::new("resources").join("textures/ball.dds")
        );
    }
}
