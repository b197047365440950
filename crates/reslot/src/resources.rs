//! Read-only datasets shipped with the application.

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::Value;

use crate::error::Result;
use crate::fs::ModFs;

pub const VANILLA_FILES: &str = "vanilla.json";
pub const NAMES_DATA: &str = "names.data";
pub const MESSAGES_DATA: &str = "messages.data";
pub const CHARA_DB_TEMPLATE: &str = "ui_chara_db.prcxml";

/// Location of the bundled datasets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundledResources {
    root: Utf8PathBuf,
}

impl BundledResources {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn vanilla_files_path(&self) -> Utf8PathBuf {
        self.root.join(VANILLA_FILES)
    }

    pub fn names_data_path(&self) -> Utf8PathBuf {
        self.root.join(NAMES_DATA)
    }

    pub fn messages_path(&self) -> Utf8PathBuf {
        self.root.join(MESSAGES_DATA)
    }

    pub fn chara_db_template_path(&self) -> Utf8PathBuf {
        self.root.join(CHARA_DB_TEMPLATE)
    }

    /// Every built-in game path listed in `vanilla.json`.
    ///
    /// Accepts `{"file_array": [...]}`, or any object whose array values are
    /// concatenated in document order.
    pub fn vanilla_files(&self, fs: &dyn ModFs) -> Result<Vec<String>> {
        let raw = fs.read_text(&self.vanilla_files_path())?;
        let json: Value = serde_json::from_str(&raw)?;
        Ok(flatten_vanilla_list(&json))
    }

    /// Index of `fighter` in `names.data`, matched case-insensitively on the
    /// first column. The index lives in the third column.
    pub fn fighter_index(&self, fs: &dyn ModFs, fighter: &str) -> Result<Option<u32>> {
        let raw = fs.read_text(&self.names_data_path())?;
        parse_fighter_index(&raw, fighter)
    }

    pub fn chara_db_template(&self, fs: &dyn ModFs) -> Result<String> {
        Ok(fs.read_text(&self.chara_db_template_path())?)
    }

    pub fn messages(&self, fs: &dyn ModFs) -> Result<String> {
        Ok(fs.read_text(&self.messages_path())?)
    }
}

fn flatten_vanilla_list(json: &Value) -> Vec<String> {
    let strings = |items: &Vec<Value>| {
        items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect::<Vec<_>>()
    };

    match json {
        Value::Object(map) => match map.get("file_array") {
            Some(Value::Array(items)) => strings(items),
            _ => map
                .values()
                .filter_map(Value::as_array)
                .flat_map(strings)
                .collect(),
        },
        Value::Array(items) => strings(items),
        _ => Vec::new(),
    }
}

fn parse_fighter_index(names_data: &str, fighter: &str) -> Result<Option<u32>> {
    let fighter = fighter.trim();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(names_data.as_bytes());

    for record in reader.records() {
        let record = record?;
        if record.len() < 3 {
            continue;
        }
        let Some(name) = record.get(0) else {
            continue;
        };
        if !name.eq_ignore_ascii_case(fighter) {
            continue;
        }
        if let Some(index) = record.get(2).and_then(|i| i.parse().ok()) {
            return Ok(Some(index));
        }
    }

    Ok(None)
}
