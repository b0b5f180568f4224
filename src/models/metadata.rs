use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Display key for the exposure time, whichever tag it came from.
pub const SHUTTER_SPEED: &str = "Shutter Speed";
pub const APERTURE: &str = "Aperture";
pub const ISO: &str = "ISO";
pub const FOCAL_LENGTH: &str = "Focal Length";
pub const MAKE: &str = "Make";
pub const MODEL: &str = "Model";
pub const LENS_MODEL: &str = "LensModel";
pub const DATE_TIME_ORIGINAL: &str = "DateTimeOriginal";

/// A single metadata value as shown to the photographer.
///
/// Most values are pre-formatted strings (`"1/125s"`, `"f/2.8"`); ISO keeps the
/// raw number from the tag table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Real(v) => f.write_str(&format_real(*v)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for MetaValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

/// Human-readable photographic attributes extracted from one upload.
///
/// Entries keep the order in which their tags appeared. Inserting a key that
/// already exists replaces the value but keeps the original position, so two
/// tags feeding `Shutter Speed` produce a single entry.
///
/// Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhotoMetadata {
    entries: Vec<(String, MetaValue)>,
}

impl PhotoMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<MetaValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetaValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The camera model, if the photo recorded one.
    pub fn device(&self) -> Option<String> {
        self.get(MODEL).map(ToString::to_string)
    }

    /// `key: value` lines for the metadata panel.
    pub fn panel_lines(&self) -> Vec<String> {
        self.iter().map(|(k, v)| format!("{}: {}", k, v)).collect()
    }
}

impl Serialize for PhotoMetadata {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PhotoMetadata {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MetadataVisitor;

        impl<'de> Visitor<'de> for MetadataVisitor {
            type Value = PhotoMetadata;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of metadata attributes")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut metadata = PhotoMetadata::new();
                while let Some((key, value)) = access.next_entry::<String, MetaValue>()? {
                    metadata.insert(key, value);
                }
                Ok(metadata)
            }
        }

        deserializer.deserialize_map(MetadataVisitor)
    }
}

/// Render a real number the way a photographer writes it: integral values
/// keep one decimal (`4.0`), everything else uses the shortest exact form.
pub fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
