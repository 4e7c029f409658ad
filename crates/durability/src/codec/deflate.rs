//! zlib codec for the `.ddb` variant.

use super::{CodecError, StorageCodec};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Default level: favour write latency over ratio.
pub const DEFAULT_LEVEL: u32 = 1;

/// zlib (RFC 1950) codec.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    level: u32,
}

impl DeflateCodec {
    /// Codec with an explicit compression level (0-9).
    pub fn with_level(level: u32) -> Self {
        DeflateCodec {
            level: level.min(9),
        }
    }

    /// Configured compression level.
    pub fn level(&self) -> u32 {
        self.level
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::with_level(DEFAULT_LEVEL)
    }
}

impl StorageCodec for DeflateCodec {
    fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(
            Vec::with_capacity(data.len() / 2 + 16),
            Compression::new(self.level),
        );
        // Writing into a Vec cannot fail.
        encoder
            .write_all(data)
            .and_then(|_| encoder.finish())
            .unwrap_or_default()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(data.len() * 4);
        ZlibDecoder::new(data)
            .read_to_end(&mut out)
            .map_err(|e| CodecError::decode(e.to_string(), self.codec_id(), data.len()))?;
        Ok(out)
    }

    fn codec_id(&self) -> &str {
        "zlib"
    }
}
