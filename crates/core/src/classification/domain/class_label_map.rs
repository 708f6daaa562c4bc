use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::shared::constants::UNKNOWN_CLASS;

#[derive(Error, Debug)]
pub enum LabelMapError {
    #[error("failed to read class dictionary {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid class dictionary JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("class name {0:?} appears more than once")]
    DuplicateName(String),
    #[error("class index {index} is assigned to both {first:?} and {second:?}")]
    DuplicateIndex {
        index: i64,
        first: String,
        second: String,
    },
    #[error("class {name:?} has negative index {index}")]
    NegativeIndex { name: String, index: i64 },
}

/// Bijection between class names and the model's class indices.
///
/// Entries keep the order of the source file so the dictionary echoed back
/// to clients reads the same way it was written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassLabelMap {
    entries: Vec<(String, i64)>,
    by_index: HashMap<i64, usize>,
}

impl ClassLabelMap {
    pub fn new(entries: Vec<(String, i64)>) -> Result<Self, LabelMapError> {
        let mut names = HashSet::with_capacity(entries.len());
        let mut by_index = HashMap::with_capacity(entries.len());
        for (pos, (name, index)) in entries.iter().enumerate() {
            if *index < 0 {
                return Err(LabelMapError::NegativeIndex {
                    name: name.clone(),
                    index: *index,
                });
            }
            if !names.insert(name.as_str()) {
                return Err(LabelMapError::DuplicateName(name.clone()));
            }
            if let Some(&earlier) = by_index.get(index) {
                let first: &(String, i64) = &entries[earlier];
                return Err(LabelMapError::DuplicateIndex {
                    index: *index,
                    first: first.0.clone(),
                    second: name.clone(),
                });
            }
            by_index.insert(*index, pos);
        }
        Ok(Self { entries, by_index })
    }

    pub fn from_json(text: &str) -> Result<Self, LabelMapError> {
        let OrderedEntries(entries) = serde_json::from_str(text)?;
        Self::new(entries)
    }

    pub fn from_file(path: &Path) -> Result<Self, LabelMapError> {
        let text = fs::read_to_string(path).map_err(|e| LabelMapError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&text)
    }

    pub fn name_of(&self, index: i64) -> Option<&str> {
        self.by_index
            .get(&index)
            .map(|&pos| self.entries[pos].0.as_str())
    }

    pub fn index_of(&self, name: &str) -> Option<i64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, index)| index)
    }

    /// Name for `index`, or the `Unknown` sentinel.
    pub fn label_for(&self, index: i64) -> &str {
        self.name_of(index).unwrap_or(UNKNOWN_CLASS)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(n, i)| (n.as_str(), *i))
    }
}

impl Serialize for ClassLabelMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, index) in &self.entries {
            map.serialize_entry(name, index)?;
        }
        map.end()
    }
}

/// JSON object entries in document order.
struct OrderedEntries(Vec<(String, i64)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping class names to integer indices")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, index)) = access.next_entry::<String, i64>()? {
                    entries.push((name, index));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
