//! Inline image payloads, stored in the report as `data:` URLs so that a record
//! can be written to and read back from JSON without any side files.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// An image encoded as a `data:<mime>;base64,<bytes>` URL. The empty payload means "no image".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePayload(String);

impl ImagePayload {
    /// The payload standing for the absence of an image.
    pub fn empty() -> Self {
        ImagePayload(String::new())
    }

    /// Wraps an already encoded data URL without validating it, validation happens when decoding.
    pub fn from_data_url<S: Into<String>>(data_url: S) -> Self {
        ImagePayload(data_url.into())
    }

    /// Encodes the raw bytes of an image file, the MIME type is guessed from its content.
    pub fn from_file_bytes(bytes: &[u8]) -> Result<Self, ContextError> {
        let format = image::guess_format(bytes)
            .map_err(|error| ContextError::with_error("Unable to recognize the image format", &error))?;

        Ok(ImagePayload(format!(
            "data:{};base64,{}",
            format.to_mime_type(),
            STANDARD.encode(bytes)
        )))
    }

    /// Encodes a raster as a PNG payload.
    pub fn from_png(raster: &RgbaImage) -> Result<Self, ContextError> {
        let mut png_bytes = Vec::new();
        raster
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .map_err(|error| ContextError::with_error("Unable to encode the raster as PNG", &error))?;

        Ok(ImagePayload(format!(
            "data:image/png;base64,{}",
            STANDARD.encode(&png_bytes)
        )))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extracts the raw bytes carried by the data URL.
    pub fn bytes(&self) -> Result<Vec<u8>, ContextError> {
        let (header, encoded) = self
            .0
            .split_once(',')
            .ok_or(ContextError::with_context("The image payload is not a data URL"))?;
        if !header.starts_with("data:") || !header.ends_with(";base64") {
            return Err(ContextError::with_context(format!(
                "Unsupported image payload header {:?}",
                header
            )));
        }

        STANDARD
            .decode(encoded)
            .map_err(|error| ContextError::with_error("Unable to decode the image payload", &error))
    }

    /// Decodes the payload into an image.
    pub fn decode(&self) -> Result<DynamicImage, ContextError> {
        let bytes = self.bytes()?;
        image::load_from_memory(&bytes)
            .map_err(|error| ContextError::with_error("Unable to decode the image", &error))
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn png_payload_decodes_back_to_the_same_pixels() {
        let mut raster = RgbaImage::new(4, 3);
        raster.put_pixel(1, 2, Rgba([0, 0, 0, 255]));

        let payload = ImagePayload::from_png(&raster).unwrap();
        assert!(payload.as_str().starts_with("data:image/png;base64,"));

        let decoded = payload.decode().unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.get_pixel(1, 2), &Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn file_bytes_keep_their_mime_type() {
        let mut png_bytes = Vec::new();
        RgbaImage::new(2, 2)
            .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
            .unwrap();

        let payload = ImagePayload::from_file_bytes(&png_bytes).unwrap();
        assert!(payload.as_str().starts_with("data:image/png;base64,"));
        assert_eq!(payload.bytes().unwrap(), png_bytes);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ImagePayload::from_file_bytes(b"definitely not an image").is_err());
        assert!(ImagePayload::from_data_url("hello").decode().is_err());
        assert!(ImagePayload::from_data_url("data:image/png;base64,@@@")
            .decode()
            .is_err());
        assert!(ImagePayload::empty().decode().is_err());
    }
}
