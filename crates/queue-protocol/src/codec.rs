//! Message content codecs converting payloads to and from wire-safe text.

use crate::error::EncodingError;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;

/// Pure transform between application content and wire-safe text.
///
/// A client is configured with exactly one codec at construction; there is no
/// per-call override. Implementations must be stateless: `decode` applied to
/// the output of `encode` yields the original bytes.
pub trait MessageCodec: Send + Sync {
    /// Encode application content into wire text
    fn encode(&self, content: &Bytes) -> Result<String, EncodingError>;

    /// Decode wire text back into application content
    fn decode(&self, text: &str) -> Result<Bytes, EncodingError>;
}

/// Passthrough codec for UTF-8 text payloads.
///
/// Non-text bytes cannot be represented and fail with
/// [`EncodingError::NotText`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl MessageCodec for TextCodec {
    fn encode(&self, content: &Bytes) -> Result<String, EncodingError> {
        std::str::from_utf8(content)
            .map(|s| s.to_string())
            .map_err(|_| EncodingError::NotText)
    }

    fn decode(&self, text: &str) -> Result<Bytes, EncodingError> {
        Ok(Bytes::copy_from_slice(text.as_bytes()))
    }
}

/// Base64 codec wrapping arbitrary bytes in XML-safe text
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Codec;

impl MessageCodec for Base64Codec {
    fn encode(&self, content: &Bytes) -> Result<String, EncodingError> {
        Ok(general_purpose::STANDARD.encode(content))
    }

    fn decode(&self, text: &str) -> Result<Bytes, EncodingError> {
        general_purpose::STANDARD
            .decode(text)
            .map(Bytes::from)
            .map_err(|e| EncodingError::InvalidBase64 {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
