//! Storage codecs
//!
//! - [`IdentityCodec`]: bytes pass through unchanged (`.json` files)
//! - [`DeflateCodec`]: zlib stream at a fast level (`.ddb` files)

mod deflate;
mod traits;

pub use deflate::DeflateCodec;
pub use traits::{CodecError, StorageCodec};

/// Identity codec: no transformation.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityCodec;

impl StorageCodec for IdentityCodec {
    fn encode(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        Ok(data.to_vec())
    }

    fn codec_id(&self) -> &str {
        "identity"
    }
}

/// On-disk representation of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// Plain JSON text, `.json`
    Json,
    /// zlib-compressed compact JSON, `.ddb`
    Compressed,
}

impl Variant {
    /// Variant selected by the `use_compression` setting.
    pub fn for_compression(use_compression: bool) -> Self {
        if use_compression {
            Variant::Compressed
        } else {
            Variant::Json
        }
    }

    /// File extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Variant::Json => "json",
            Variant::Compressed => "ddb",
        }
    }

    /// Variant for a file extension, if it is one of ours.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "json" => Some(Variant::Json),
            "ddb" => Some(Variant::Compressed),
            _ => None,
        }
    }

    /// The other variant.
    pub fn other(self) -> Self {
        match self {
            Variant::Json => Variant::Compressed,
            Variant::Compressed => Variant::Json,
        }
    }

    /// Codec that reads and writes this variant.
    pub fn codec(self) -> Box<dyn StorageCodec> {
        match self {
            Variant::Json => Box::new(IdentityCodec),
            Variant::Compressed => Box::new(DeflateCodec::default()),
        }
    }
}
