//! Upload decoding.
//!
//! JPEG and PNG are fully decoded to prove they are images. HEIF/HEIC has no
//! pixel decoder here; the ISO-BMFF `ftyp` brand is checked instead and the
//! bytes are passed to the model as-is.

use std::io::Cursor;
use std::sync::Arc;

use image::{GenericImageView, ImageFormat};
use thiserror::Error;
use uuid::Uuid;

use crate::extractor::{read_tags, ExifOutcome};

const HEIF_BRANDS: [&[u8; 4]; 8] = [
    b"heic", b"heix", b"hevc", b"hevx", b"heim", b"heis", b"mif1", b"msf1",
];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported image type: {0} (use JPEG, PNG or HEIC)")]
    Unsupported(String),

    #[error("The uploaded file is empty")]
    Empty,

    #[error("Could not decode {format} image: {reason}")]
    Corrupt {
        format: &'static str,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoFormat {
    Jpeg,
    Png,
    Heif,
}

impl PhotoFormat {
    /// Accepts the MIME types browsers send for `.jpg`, `.png` and `.heic`.
    pub fn from_mime(mime: &str) -> Result<Self, DecodeError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/heic" | "image/heif" | "image/heic-sequence" | "image/heif-sequence" => {
                Ok(Self::Heif)
            }
            _ => Err(DecodeError::Unsupported(essence)),
        }
    }

    /// Recognise a format from its leading bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            Some(Self::Png)
        } else if is_heif(bytes) {
            Some(Self::Heif)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Heif => "image/heic",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
            Self::Heif => "HEIF",
        }
    }
}

/// A decoded upload, ready to be shown and sent to the model.
#[derive(Debug, Clone)]
pub struct Photo {
    pub id: Uuid,
    pub format: PhotoFormat,
    pub data: Arc<[u8]>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub exif: ExifOutcome,
}

impl Photo {
    pub fn decode(bytes: &[u8], format: PhotoFormat) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let (width, height) = match format {
            PhotoFormat::Jpeg => decode_raster(bytes, ImageFormat::Jpeg, format)?,
            PhotoFormat::Png => decode_raster(bytes, ImageFormat::Png, format)?,
            PhotoFormat::Heif => {
                if !is_heif(bytes) {
                    return Err(DecodeError::Corrupt {
                        format: format.as_str(),
                        reason: "missing HEIF ftyp box".to_string(),
                    });
                }
                (None, None)
            }
        };

        Ok(Self {
            id: Uuid::new_v4(),
            format,
            data: Arc::from(bytes),
            width,
            height,
            exif: read_tags(bytes),
        })
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

fn decode_raster(
    bytes: &[u8],
    image_format: ImageFormat,
    format: PhotoFormat,
) -> Result<(Option<u32>, Option<u32>), DecodeError> {
    let mut reader = image::ImageReader::new(Cursor::new(bytes));
    reader.set_format(image_format);
    let img = reader.decode().map_err(|e| DecodeError::Corrupt {
        format: format.as_str(),
        reason: e.to_string(),
    })?;
    let (width, height) = img.dimensions();
    Ok((Some(width), Some(height)))
}

fn is_heif(bytes: &[u8]) -> bool {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return false;
    }
    let box_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let end = box_len.clamp(12, bytes.len());

    // Major brand, then compatible brands after the minor version.
    std::iter::once(&bytes[8..12])
        .chain(bytes[16.min(end)..end].chunks_exact(4))
        .any(|brand| HEIF_BRANDS.iter().any(|known| brand == &known[..]))
}
