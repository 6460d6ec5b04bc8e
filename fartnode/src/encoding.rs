//! Base64 encoding and decoding utilities.
//!
//! Serialized transactions cross every external boundary (wallet hand-off,
//! swap service responses, bundle relays) as standard-alphabet base64. This
//! module provides [`Base64Bytes`], the single codec used for all of them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use std::fmt::Display;

/// A wrapper for base64-encoded byte data.
///
/// Holds the ASCII bytes of a base64 string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Base64Bytes(pub Vec<u8>);

impl Base64Bytes {
    /// Decodes the base64 text to raw binary data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(&self.0)
    }

    /// Encodes raw binary data into base64 text.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        let encoded = b64.encode(input.as_ref());
        Self(encoded.into_bytes())
    }

    /// Consumes the wrapper and returns the base64 text.
    #[must_use]
    pub fn into_string(self) -> String {
        match String::from_utf8(self.0) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

impl AsRef<[u8]> for Base64Bytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for Base64Bytes {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl From<String> for Base64Bytes {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl Display for Base64Bytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_with_standard_alphabet_and_padding() {
        let encoded = Base64Bytes::encode([0xfb, 0xff]);
        assert_eq!(encoded.to_string(), "+/8=");
        assert_eq!(encoded.into_string(), "+/8=");
    }

    #[test]
    fn rejects_invalid_text() {
        let bytes = Base64Bytes::from("not base64!");
        assert!(bytes.decode().is_err());
    }
}
