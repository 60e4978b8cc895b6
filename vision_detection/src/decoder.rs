use crate::{config::PayloadConfig, error::DetectionError};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;

/// Decodes standard, padded base64. ASCII whitespace (line wrapping) is
/// skipped; any other character outside the alphabet is an error.
pub fn decode_to_stream(image_b64: &str) -> Result<Bytes, base64::DecodeError> {
    let decoded = if image_b64.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: Vec<u8> = image_b64
            .bytes()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        STANDARD.decode(compact)?
    } else {
        STANDARD.decode(image_b64)?
    };
    Ok(Bytes::from(decoded))
}

/// Turns request payloads into upload bodies. Payloads must be non-empty and
/// no larger than the backend accepts; the image format is left to the backend.
#[derive(Debug, Clone, Copy)]
pub struct ImageDecoder {
    max_image_bytes: usize,
}

impl ImageDecoder {
    pub fn new(payload_config: &PayloadConfig) -> Self {
        Self {
            max_image_bytes: payload_config.max_image_bytes,
        }
    }

    pub fn decode(&self, image_b64: &str) -> Result<Bytes, DetectionError> {
        let image = decode_to_stream(image_b64)?;

        if image.is_empty() {
            return Err(DetectionError::InvalidPayload("image is empty".to_string()));
        }
        if image.len() > self.max_image_bytes {
            return Err(DetectionError::InvalidPayload(format!(
                "image is {} bytes, limit is {} bytes",
                image.len(),
                self.max_image_bytes
            )));
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder(max_image_bytes: usize) -> ImageDecoder {
        ImageDecoder::new(&PayloadConfig { max_image_bytes })
    }

    #[test]
    fn test_decode_arbitrary_bytes() {
        let image = decode_to_stream("////").unwrap();

        assert_eq!(&image[..], &[0xff, 0xff, 0xff]);
    }

    #[test]
    fn test_decode_skips_line_wrapping() {
        let image = decode_to_stream("aGVsbG8g\nd29y\r\nbGQ=").unwrap();

        assert_eq!(&image[..], b"hello world");
    }

    #[test]
    fn test_invalid_characters_fail() {
        assert!(decode_to_stream("not-base64!").is_err());
    }

    #[test]
    fn test_malformed_padding_fails() {
        assert!(decode_to_stream("aGVsbG8").is_err());
        assert!(decode_to_stream("aGVsbG8==").is_err());
    }

    #[test]
    fn test_empty_payload_is_rejected() {
        let err = decoder(16).decode("").unwrap_err();

        assert!(matches!(err, DetectionError::InvalidPayload(_)));
    }

    #[test]
    fn test_oversized_payload_is_rejected() {
        let err = decoder(2).decode("////").unwrap_err();

        assert!(matches!(
            err,
            DetectionError::InvalidPayload(ref msg) if msg.contains("limit is 2")
        ));
    }

    #[test]
    fn test_payload_at_limit_is_accepted() {
        let image = decoder(3).decode("////").unwrap();

        assert_eq!(image.len(), 3);
    }

    #[test]
    fn test_decode_error_is_surfaced_unchanged() {
        let err = decoder(16).decode("not-base64!").unwrap_err();

        assert!(matches!(err, DetectionError::Decode(_)));
    }
}
