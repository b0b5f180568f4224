//! EXIF tag reading and metadata extraction.
//!
//! Reading is split from formatting so each half can be tested alone:
//! [`read_tags`] turns raw upload bytes into an [`ExifOutcome`], and
//! [`extract_metadata`] maps a [`TagTable`] to display-ready
//! [`PhotoMetadata`]. Neither ever returns an error; a photo without usable
//! tags simply has no metadata.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};

use crate::models::{
    format_real, MetaValue, PhotoMetadata, APERTURE, DATE_TIME_ORIGINAL, FOCAL_LENGTH, ISO,
    LENS_MODEL, MAKE, MODEL, SHUTTER_SPEED,
};

/// Tag names used by the extractor, keyed by their EXIF tag.
///
/// ISO is reported under its EXIF 2.2 name; newer readers call the same tag
/// `PhotographicSensitivity`.
const NAMED_TAGS: [(Tag, &str); 9] = [
    (Tag::ExposureTime, "ExposureTime"),
    (Tag::ShutterSpeedValue, "ShutterSpeedValue"),
    (Tag::FNumber, "FNumber"),
    (Tag::PhotographicSensitivity, "ISOSpeedRatings"),
    (Tag::FocalLength, "FocalLength"),
    (Tag::Make, "Make"),
    (Tag::Model, "Model"),
    (Tag::LensModel, "LensModel"),
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
];

/// A decoded tag value, reduced to the shapes the extractor cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Rational { num: i64, den: i64 },
    Real(f64),
    Integer(i64),
    Text(String),
}

impl TagValue {
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Rational { den: 0, .. } => None,
            Self::Rational { num, den } => Some(*num as f64 / *den as f64),
            Self::Real(v) => Some(*v),
            Self::Integer(n) => Some(*n as f64),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    fn to_meta(&self) -> MetaValue {
        match self {
            Self::Integer(n) => MetaValue::Integer(*n),
            Self::Real(v) => MetaValue::Real(*v),
            Self::Text(s) => MetaValue::Text(s.clone()),
            Self::Rational { num, den } => MetaValue::Text(format!("{}/{}", num, den)),
        }
    }
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rational { num, den } => write!(f, "{}/{}", num, den),
            Self::Real(v) => f.write_str(&format_real(*v)),
            Self::Integer(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagEntry {
    pub name: String,
    pub value: TagValue,
}

/// The primary-image tags of one photo, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagTable {
    entries: Vec<TagEntry>,
}

impl TagTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: TagValue) {
        self.entries.push(TagEntry {
            name: name.into(),
            value,
        });
    }

    pub fn with(mut self, name: impl Into<String>, value: TagValue) -> Self {
        self.push(name, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &TagEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of looking for EXIF data in an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum ExifOutcome {
    /// The container holds no EXIF block.
    Absent,
    /// An EXIF block (or the container around it) could not be parsed.
    Malformed(String),
    Present(TagTable),
}

impl ExifOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Malformed(_) => "malformed",
            Self::Present(_) => "present",
        }
    }

    /// Display metadata; empty unless tags were read.
    pub fn metadata(&self) -> PhotoMetadata {
        match self {
            Self::Present(table) => extract_metadata(table),
            Self::Absent | Self::Malformed(_) => PhotoMetadata::new(),
        }
    }
}

/// Read the EXIF tag table embedded in JPEG, PNG or HEIF bytes.
pub fn read_tags(bytes: &[u8]) -> ExifOutcome {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(bytes)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(container)) => {
            tracing::debug!(container, "No EXIF block in upload");
            return ExifOutcome::Absent;
        }
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable EXIF block");
            return ExifOutcome::Malformed(e.to_string());
        }
    };

    let mut table = TagTable::new();
    for field in exif.fields().filter(|f| f.ifd_num == In::PRIMARY) {
        if let Some(value) = convert_value(&field.value) {
            table.push(tag_name(field.tag), value);
        }
    }
    ExifOutcome::Present(table)
}

fn tag_name(tag: Tag) -> String {
    NAMED_TAGS
        .iter()
        .find(|(known, _)| *known == tag)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| tag.to_string())
}

/// Multi-component values keep their first component only.
fn convert_value(value: &Value) -> Option<TagValue> {
    let converted = match value {
        Value::Ascii(parts) => {
            let raw = parts.first()?;
            let text = String::from_utf8_lossy(raw);
            TagValue::Text(text.trim_end_matches('\0').trim().to_string())
        }
        Value::Rational(v) => {
            let r = v.first()?;
            TagValue::Rational {
                num: r.num as i64,
                den: r.denom as i64,
            }
        }
        Value::SRational(v) => {
            let r = v.first()?;
            TagValue::Rational {
                num: r.num as i64,
                den: r.denom as i64,
            }
        }
        Value::Byte(v) => TagValue::Integer(*v.first()? as i64),
        Value::Short(v) => TagValue::Integer(*v.first()? as i64),
        Value::Long(v) => TagValue::Integer(*v.first()? as i64),
        Value::SByte(v) => TagValue::Integer(*v.first()? as i64),
        Value::SShort(v) => TagValue::Integer(*v.first()? as i64),
        Value::SLong(v) => TagValue::Integer(*v.first()? as i64),
        Value::Float(v) => TagValue::Real(*v.first()? as f64),
        Value::Double(v) => TagValue::Real(*v.first()?),
        _ => return None,
    };
    Some(converted)
}

/// Map a tag table to the attributes a photographer reads.
///
/// Tags outside the known set are dropped. Numeric tags that turn out not to
/// be numbers are skipped rather than failing the whole photo.
pub fn extract_metadata(table: &TagTable) -> PhotoMetadata {
    let mut metadata = PhotoMetadata::new();

    for entry in table.iter() {
        match entry.name.as_str() {
            "ExposureTime" | "ShutterSpeedValue" => {
                metadata.insert(SHUTTER_SPEED, format_shutter(&entry.value));
            }
            "FNumber" => match entry.value.as_real() {
                Some(v) => metadata.insert(APERTURE, format!("f/{}", format_real(v))),
                None => tracing::debug!(value = %entry.value, "Skipping non-numeric FNumber"),
            },
            "ISOSpeedRatings" => metadata.insert(ISO, entry.value.to_meta()),
            "FocalLength" => match entry.value.as_real() {
                Some(v) => metadata.insert(FOCAL_LENGTH, format!("{}mm", format_real(v))),
                None => tracing::debug!(value = %entry.value, "Skipping non-numeric FocalLength"),
            },
            name @ (MAKE | MODEL | LENS_MODEL | DATE_TIME_ORIGINAL) => {
                metadata.insert(name, entry.value.to_meta());
            }
            _ => {}
        }
    }

    metadata
}

fn format_shutter(value: &TagValue) -> String {
    match value {
        TagValue::Rational { num, den } => format!("{}/{}s", num, den),
        TagValue::Real(v) if *v > 0.0 && *v < 1.0 => {
            format!("1/{}s", (1.0 / v).round() as i64)
        }
        TagValue::Real(v) if *v >= 1.0 => format!("{}s", format_real(*v)),
        other => other.to_string(),
    }
}
