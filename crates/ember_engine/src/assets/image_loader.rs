//! Image decoding for texture upload
//!
//! Textures ship in a DDS container (fixed 128-byte header, RGBA8
//! payload); anything else goes through the `image` crate and is
//! normalized to RGBA8.

use crate::assets::AssetError;
use std::path::Path;

/// DDS container magic, first four bytes of the file.
const DDS_MAGIC: &[u8; 4] = b"DDS ";
/// Byte offset of the little-endian height field in the header.
const DDS_HEIGHT_OFFSET: usize = 12;
/// Byte offset of the little-endian width field in the header.
const DDS_WIDTH_OFFSET: usize = 16;
/// Pixel payload starts after the magic plus the 124-byte header.
const DDS_DATA_OFFSET: usize = 128;

const BYTES_PER_PIXEL: usize = 4;

/// Decoded RGBA8 pixel data ready for GPU upload.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data, `width * height * 4` bytes.
    pub data: Vec<u8>,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Number of color channels, always 4 here.
    pub channels: u8,
}

impl ImageData {
    /// Load an image from a file path, dispatching on the extension:
    /// `.dds` is parsed directly, everything else is handed to the
    /// `image` crate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let is_dds = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("dds"))
            .unwrap_or(false);

        if is_dds {
            let bytes = std::fs::read(path).map_err(|source| {
                log::error!("failed to open file: {}", path.display());
                AssetError::Io {
                    path: path.display().to_string(),
                    source,
                }
            })?;
            Self::from_dds_bytes(&path.display().to_string(), &bytes)
        } else {
            let img = image::open(path).map_err(|e| AssetError::Decode {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let rgba = img.to_rgba8();
            let (width, height) = rgba.dimensions();
            log::debug!("loaded image {}x{} from {}", width, height, path.display());
            Ok(Self {
                data: rgba.into_raw(),
                width,
                height,
                channels: BYTES_PER_PIXEL as u8,
            })
        }
    }

    /// Parse a DDS container: magic, header-declared dimensions, RGBA8
    /// payload at the fixed data offset.
    pub fn from_dds_bytes(path: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        if bytes.len() < DDS_DATA_OFFSET {
            return Err(AssetError::Decode {
                path: path.to_string(),
                reason: format!("file too short for DDS header ({} bytes)", bytes.len()),
            });
        }
        if &bytes[..4] != DDS_MAGIC {
            return Err(AssetError::Decode {
                path: path.to_string(),
                reason: "missing DDS magic".to_string(),
            });
        }

        let height = read_u32_le(bytes, DDS_HEIGHT_OFFSET);
        let width = read_u32_le(bytes, DDS_WIDTH_OFFSET);
        if width == 0 || height == 0 {
            return Err(AssetError::Decode {
                path: path.to_string(),
                reason: format!("degenerate dimensions {width}x{height}"),
            });
        }

        let expected = width as usize * height as usize * BYTES_PER_PIXEL;
        let payload = &bytes[DDS_DATA_OFFSET..];
        if payload.len() < expected {
            return Err(AssetError::Decode {
                path: path.to_string(),
                reason: format!(
                    "payload is {} bytes, {}x{} RGBA needs {}",
                    payload.len(),
                    width,
                    height,
                    expected
                ),
            });
        }

        log::debug!("loaded DDS texture {width}x{height} from {path}");
        Ok(Self {
            data: payload[..expected].to_vec(),
            width,
            height,
            channels: BYTES_PER_PIXEL as u8,
        })
    }

    /// Size of the pixel payload in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dds_fixture(width: u32, height: u32, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0u8; DDS_DATA_OFFSET];
        bytes[..4].copy_from_slice(DDS_MAGIC);
        bytes[DDS_HEIGHT_OFFSET..DDS_HEIGHT_OFFSET + 4].copy_from_slice(&height.to_le_bytes());
        bytes[DDS_WIDTH_OFFSET..DDS_WIDTH_OFFSET + 4].copy_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn parses_2x2_rgba() {
        let payload: Vec<u8> = (0..16).collect();
        let bytes = dds_fixture(2, 2, &payload);

        let image = ImageData::from_dds_bytes("ball.dds", &bytes).unwrap();
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 2);
        assert_eq!(image.channels, 4);
        assert_eq!(image.data, payload);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = dds_fixture(2, 2, &[0u8; 16]);
        bytes[0] = b'X';
        assert!(matches!(
            ImageData::from_dds_bytes("ball.dds", &bytes),
            Err(AssetError::Decode { .. })
        ));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(ImageData::from_dds_bytes("ball.dds", &[0u8; 64]).is_err());
    }

    #[test]
    fn rejects_short_payload() {
        // Header claims 4x4 but only one pixel follows.
        let bytes = dds_fixture(4, 4, &[0u8; 4]);
        assert!(matches!(
            ImageData::from_dds_bytes("ball.dds", &bytes),
            Err(AssetError::Decode { .. })
        ));
    }

    #[test]
    fn extra_trailing_bytes_are_ignored() {
        let payload: Vec<u8> = (0..32).collect();
        let bytes = dds_fixture(2, 2, &payload);

        let image = ImageData::from_dds_bytes("ball.dds", &bytes).unwrap();
        assert_eq!(image.byte_len(), 16);
    }
}
