//! The mod's `config.json` and its canonical on-disk form.

use camino::Utf8Path;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io;

use crate::error::Result;
use crate::fs::ModFs;

pub const CONFIG_FILE: &str = "config.json";

pub const NEW_DIR_INFOS: &str = "new-dir-infos";
pub const NEW_DIR_INFOS_BASE: &str = "new-dir-infos-base";
pub const SHARE_TO_VANILLA: &str = "share-to-vanilla";
pub const SHARE_TO_ADDED: &str = "share-to-added";
pub const NEW_DIR_FILES: &str = "new-dir-files";

/// Order in which the known sections are written.
pub const SECTION_ORDER: [&str; 5] = [
    NEW_DIR_INFOS,
    NEW_DIR_INFOS_BASE,
    SHARE_TO_VANILLA,
    SHARE_TO_ADDED,
    NEW_DIR_FILES,
];

/// In-memory `config.json`. Unknown sections are carried through untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModManifest {
    sections: Map<String, Value>,
}

impl ModManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(sections: Map<String, Value>) -> Self {
        Self { sections }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.sections
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.sections
    }

    pub fn section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Takes the object-valued section `name` out for editing, leaving
    /// `null` in its place until [`Self::set_section`] puts it back. A
    /// missing or non-object section yields an empty map.
    pub fn take_object_section(&mut self, name: &str) -> Map<String, Value> {
        match self.sections.get_mut(name).map(std::mem::take) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Like [`Self::take_object_section`], for list-valued sections.
    pub fn take_list_section(&mut self, name: &str) -> Vec<Value> {
        match self.sections.get_mut(name).map(std::mem::take) {
            Some(Value::Array(list)) => list,
            _ => Vec::new(),
        }
    }

    pub fn set_section(&mut self, name: &str, value: Value) {
        self.sections.insert(name.to_string(), value);
    }
}

/// Reads a manifest, treating a missing or unparseable file as empty.
pub fn read_manifest(fs: &dyn ModFs, path: &Utf8Path) -> ModManifest {
    if !fs.exists(path) {
        return ModManifest::new();
    }

    let raw = match fs.read_text(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("could not read {}, starting from an empty manifest: {}", path, e);
            return ModManifest::new();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(sections)) => ModManifest::from_map(sections),
        Ok(_) => {
            tracing::warn!("{} is not a JSON object, starting from an empty manifest", path);
            ModManifest::new()
        }
        Err(e) => {
            tracing::warn!("{} is malformed, starting from an empty manifest: {}", path, e);
            ModManifest::new()
        }
    }
}

/// Reorders `map`: keys listed in `key_order` first, the rest sorted.
pub fn order_object<S: AsRef<str>>(map: &Map<String, Value>, key_order: &[S]) -> Map<String, Value> {
    let mut ordered = Map::new();

    for key in key_order {
        let key = key.as_ref();
        if ordered.contains_key(key) {
            continue;
        }
        if let Some(value) = map.get(key) {
            ordered.insert(key.to_string(), value.clone());
        }
    }

    let mut rest: Vec<&String> = map.keys().filter(|k| !ordered.contains_key(*k)).collect();
    rest.sort();
    for key in rest {
        ordered.insert(key.clone(), map[key].clone());
    }

    ordered
}

/// Canonical form: known sections first in [`SECTION_ORDER`], empty entries
/// pruned, unknown sections appended as they are.
pub fn canonicalize(manifest: &ModManifest) -> Map<String, Value> {
    let mut ordered = Map::new();

    for name in SECTION_ORDER {
        let Some(section) = manifest.section(name) else {
            continue;
        };

        let pruned = match section {
            Value::Object(entries) => Value::Object(
                entries
                    .iter()
                    .filter(|(_, value)| keep_object_value(value))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().filter(|v| keep_list_item(v)).cloned().collect())
            }
            other => other.clone(),
        };
        ordered.insert(name.to_string(), pruned);
    }

    for (name, section) in manifest.as_map() {
        if !ordered.contains_key(name) {
            ordered.insert(name.clone(), section.clone());
        }
    }

    ordered
}

fn keep_object_value(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::String(_) => true,
        _ => false,
    }
}

fn keep_list_item(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => false,
    }
}

/// Serializes a manifest the way it is stored: canonical, 4-space indent.
pub fn to_canonical_json(manifest: &ModManifest) -> Result<String> {
    let ordered = Value::Object(canonicalize(manifest));

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    ordered.serialize(&mut serializer)?;

    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

pub fn write_ordered_config(fs: &dyn ModFs, path: &Utf8Path, manifest: &ModManifest) -> Result<()> {
    let json = to_canonical_json(manifest)?;
    fs.write_text(path, &json)?;
    tracing::debug!("wrote {}", path);
    Ok(())
}
