use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path};

use serde::de::{Deserializer, Error as DeError, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{PairsyncError, Result};

/// One video → reference image association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub video: String,
    pub image: String,
}

/// Optional metadata block of a mapping document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// Usually a number, occasionally a zero-padded string
    #[serde(default)]
    pub batch_number: Option<JsonValue>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

/// Ordered video → image mapping for one batch.
///
/// Entry order is the document's key order and is the processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMapping {
    entries: Vec<MappingEntry>,
    batch_info: Option<BatchInfo>,
}

#[derive(Deserialize)]
struct MappingDocument {
    mapping: Option<OrderedMapping>,
    #[serde(default)]
    batch_info: Option<BatchInfo>,
}

struct OrderedMapping(Vec<MappingEntry>);

impl<'de> Deserialize<'de> for OrderedMapping {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = OrderedMapping;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping video names to image names")
            }

            fn visit_map<A>(self, mut access: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut seen = HashSet::new();
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((video, image)) = access.next_entry::<String, String>()? {
                    if !seen.insert(video.clone()) {
                        return Err(A::Error::custom(format!(
                            "duplicate mapping key: {}",
                            video
                        )));
                    }
                    entries.push(MappingEntry { video, image });
                }
                Ok(OrderedMapping(entries))
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}

impl BatchMapping {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self {
            entries,
            batch_info: None,
        }
    }

    /// Build from `(video, image)` pairs, e.g. in tests.
    pub fn from_pairs<I, V, M>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (V, M)>,
        V: Into<String>,
        M: Into<String>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(video, image)| MappingEntry {
                    video: video.into(),
                    image: image.into(),
                })
                .collect(),
        )
    }

    /// Parse a mapping document. Malformed JSON, a missing `mapping` object,
    /// duplicate keys and names that are not plain relative paths are
    /// configuration errors.
    pub fn from_json(raw: &str) -> Result<Self> {
        let document: MappingDocument = serde_json::from_str(raw)
            .map_err(|e| PairsyncError::config(format!("invalid batch file: {}", e)))?;

        let mapping = document
            .mapping
            .ok_or_else(|| PairsyncError::config("invalid batch file: missing 'mapping' key"))?;

        for entry in &mapping.0 {
            check_file_name(&entry.video)?;
            check_file_name(&entry.image)?;
        }

        Ok(Self {
            entries: mapping.0,
            batch_info: document.batch_info,
        })
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn batch_info(&self) -> Option<&BatchInfo> {
        self.batch_info.as_ref()
    }

    pub fn batch_number(&self) -> Option<&JsonValue> {
        self.batch_info.as_ref()?.batch_number.as_ref()
    }
}

/// Names are joined onto the item directory, so they must stay below it.
fn check_file_name(name: &str) -> Result<()> {
    let plain = !name.is_empty()
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(PairsyncError::config(format!(
            "invalid batch file: '{}' is not a relative file name",
            name
        )))
    }
}
