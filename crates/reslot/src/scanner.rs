use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::classifier::classify;
use crate::error::{ReslotError, Result};
use crate::fs::ModFs;
use crate::slot::SlotToken;

/// Fighter whose copy-ability mirrors every other fighter's assets.
pub const KIRBY: &str = "kirby";

const KIRBY_COPY_MARKERS: [&str; 2] = ["kirby/model/copy_", r"kirby\model\copy_"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    pub original: String,
    /// `original` with the slot digits replaced by `###`.
    pub normalized: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotPaths {
    /// Entries renamed directly when the slot moves. Contents of a slot
    /// folder are never listed here, they follow the folder.
    pub paths_to_be_modified: Vec<PathEntry>,
    /// Leaf files (entries containing a `.`) belonging to the slot.
    pub files_to_be_modified: Vec<PathEntry>,
}

/// fighter -> slot -> paths
pub type PathData = BTreeMap<String, BTreeMap<SlotToken, SlotPaths>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub path_data: PathData,
    /// Every slot found in the mod, in numeric order.
    pub current_slots: Vec<SlotToken>,
}

/// Scans a mod for fighter slots.
///
/// Nothing is modified; a listing failure aborts the scan.
pub fn scan_for_slots(fs: &dyn ModFs, mod_root: &Utf8Path) -> Result<ScanResult> {
    let paths = fs.list_all_paths(mod_root).map_err(|source| ReslotError::Scan {
        root: mod_root.to_path_buf(),
        source,
    })?;

    let result = index_paths(&paths);
    tracing::debug!(
        "scanned {} entries in {}, found slots {:?}",
        paths.len(),
        mod_root,
        result.current_slots
    );

    Ok(result)
}

/// Builds the slot index for an already listed mod.
pub fn index_paths<S: AsRef<str>>(paths: &[S]) -> ScanResult {
    let mut path_data = PathData::new();
    let mut slots = BTreeSet::new();

    for path in paths {
        let path = path.as_ref();
        let info = classify(path);

        let (Some(fighter), Some(slot), Some(normalized)) =
            (info.fighter_name.clone(), info.slot.clone(), info.normalized_path.clone())
        else {
            continue;
        };

        slots.insert(slot.clone());

        let bucket = path_data
            .entry(fighter)
            .or_default()
            .entry(slot)
            .or_default();

        let entry = PathEntry {
            original: path.to_string(),
            normalized,
        };

        if path.contains('.') && !bucket.files_to_be_modified.contains(&entry) {
            bucket.files_to_be_modified.push(entry.clone());
        }

        if info.is_inside_slot_folder() {
            continue;
        }

        if !bucket.paths_to_be_modified.contains(&entry) {
            bucket.paths_to_be_modified.push(entry);
        }
    }

    ScanResult {
        path_data,
        current_slots: slots.into_iter().collect(),
    }
}

/// The single fighter a mod targets, if there is exactly one.
///
/// Kirby is ignored when all of its entries are copy-ability assets of
/// another fighter.
pub fn internal_fighter_name(path_data: &PathData) -> Option<String> {
    let fighters: Vec<&String> = path_data
        .iter()
        .filter(|(fighter, slots)| {
            fighter.as_str() != KIRBY || slots.values().any(has_non_copy_entries)
        })
        .map(|(fighter, _)| fighter)
        .collect();

    match fighters.as_slice() {
        [single] => Some(single.to_string()),
        _ => None,
    }
}

fn has_non_copy_entries(paths: &SlotPaths) -> bool {
    paths
        .files_to_be_modified
        .iter()
        .chain(paths.paths_to_be_modified.iter())
        .any(|entry| {
            !KIRBY_COPY_MARKERS
                .iter()
                .any(|marker| entry.original.contains(marker))
        })
}
