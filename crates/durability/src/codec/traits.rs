//! Storage codec trait definitions.

/// Storage codec trait.
///
/// All document bytes pass through a codec on their way to and from disk.
/// Which codec applies is decided by the file variant on disk, never by the
/// current configuration alone.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync` so a single instance can serve every thread.
pub trait StorageCodec: Send + Sync {
    /// Encode bytes for storage.
    ///
    /// The returned bytes are what gets written to disk.
    fn encode(&self, data: &[u8]) -> Vec<u8>;

    /// Decode bytes from storage.
    ///
    /// Reverses the encode operation. Returns an error if the data cannot be
    /// decoded (e.g. a truncated or foreign compressed stream).
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError>;

    /// Unique codec identifier.
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Decoding failed.
    ///
    /// Carries the codec identity and data length so callers can
    /// distinguish a wrong-codec error from data corruption.
    #[error("Decode error (codec={codec_id}, data_len={data_len}): {detail}")]
    DecodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the decode
        codec_id: String,
        /// Length of the data that failed to decode
        data_len: usize,
    },
}

impl CodecError {
    /// Create a decode error with full diagnostic context.
    pub fn decode(detail: impl Into<String>, codec_id: impl Into<String>, data_len: usize) -> Self {
        CodecError::DecodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
            data_len,
        }
    }
}
