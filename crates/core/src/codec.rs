//! Image encoding helpers.
//!
//! Images travel through the try-on flow as self-describing data URLs
//! (`data:<mime>;base64,<payload>`). This module converts binary image
//! resources into that form, splits it back into media type and payload,
//! and fetches remote garment images on demand.
//!
//! # Example
//!
//! ```ignore
//! let encoded = ImageCodec::to_encoded(&bytes, None)?;
//! let (mime, payload) = ImageCodec::split_encoded(&encoded)?;
//! ```

use crate::error::{AppError, Result};
use crate::fetch::ResourceFetcher;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::ImageFormat;
use std::io::Cursor;
use std::path::Path;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

/// Stateless helpers for the data-URL image encoding.
pub struct ImageCodec;

impl ImageCodec {
    /// Encodes raw image bytes into a data URL.
    ///
    /// When `mime_type` is `None` or blank, the media type is sniffed from
    /// the image's magic bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Encoding`] if the bytes are empty or the media
    /// type cannot be determined.
    pub fn to_encoded(bytes: &[u8], mime_type: Option<&str>) -> Result<String> {
        if bytes.is_empty() {
            return Err(AppError::encoding("Image resource is empty"));
        }

        let mime = match mime_type.map(str::trim).filter(|m| !m.is_empty()) {
            Some(mime) => mime.to_string(),
            None => Self::sniff_mime(bytes)
                .ok_or_else(|| AppError::encoding("Unrecognised image data"))?,
        };

        Ok(format!("{DATA_PREFIX}{mime}{BASE64_MARKER},{}", BASE64.encode(bytes)))
    }

    /// Reads a file fully and encodes it.
    ///
    /// The media type comes from the file extension, falling back to the
    /// file's content.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Encoding`] if the file cannot be read.
    pub async fn encode_file(path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::encoding(format!("Failed to read {}: {}", path.display(), e)))?;

        let mime = ImageFormat::from_path(path)
            .ok()
            .map(|format| format.to_mime_type());

        Self::to_encoded(&bytes, mime)
    }

    /// Splits a data URL into `(mime_type, payload)`.
    ///
    /// The media type is whatever sits between the first `:` and the
    /// following `;` of the header.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MalformedEncoding`] if the header or payload is
    /// missing.
    pub fn split_encoded(encoded: &str) -> Result<(String, String)> {
        let (header, payload) = encoded
            .split_once(',')
            .ok_or_else(|| AppError::malformed("Missing payload separator"))?;

        let mime = header
            .split_once(':')
            .and_then(|(_, rest)| rest.split_once(';'))
            .map(|(mime, _)| mime)
            .filter(|mime| !mime.is_empty())
            .ok_or_else(|| AppError::malformed("No media type found in encoded image"))?;

        if payload.is_empty() {
            return Err(AppError::malformed("Encoded image has no payload"));
        }

        Ok((mime.to_string(), payload.to_string()))
    }

    /// Whether a string is in the self-describing encoded form.
    pub fn is_encoded(value: &str) -> bool {
        value.starts_with(DATA_PREFIX)
    }

    /// Decodes a base64 payload back into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MalformedEncoding`] if the payload is not valid base64.
    pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
        BASE64
            .decode(payload)
            .map_err(|e| AppError::malformed(format!("Invalid base64 payload: {}", e)))
    }

    /// Retrieves a resource and returns its `(payload, mime_type)`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Fetch`] if retrieval fails, or an encoding error
    /// if the bytes cannot be encoded.
    pub async fn fetch_and_encode<F: ResourceFetcher>(
        fetcher: &F,
        location: &str,
    ) -> Result<(String, String)> {
        let resource = fetcher.fetch(location).await?;
        let encoded = Self::to_encoded(&resource.bytes, resource.content_type.as_deref())?;
        let (mime, payload) = Self::split_encoded(&encoded)?;
        Ok((payload, mime))
    }

    /// Returns PNG bytes for an image, transcoding when needed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Encoding`] if the bytes cannot be decoded or
    /// re-encoded.
    pub fn to_png(bytes: &[u8]) -> Result<Vec<u8>> {
        if matches!(image::guess_format(bytes), Ok(ImageFormat::Png)) {
            return Ok(bytes.to_vec());
        }

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| AppError::encoding(format!("Failed to decode image: {}", e)))?;

        let mut buffer: Vec<u8> = Vec::new();
        decoded
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .map_err(|e| AppError::encoding(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    }

    fn sniff_mime(bytes: &[u8]) -> Option<String> {
        image::guess_format(bytes)
            .ok()
            .map(|format| format.to_mime_type().to_string())
    }
}
