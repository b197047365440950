use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::chara_db::{needs_chara_db_patch, update_chara_db, PatchApplier, PlaceholderPatch};
use crate::classifier::substitute_slot;
use crate::error::{RenamePhase, ReslotError, Result};
use crate::fs::ModFs;
use crate::names::{update_msg_name, CustomNames};
use crate::resources::BundledResources;
use crate::scanner::PathData;
use crate::sections::{apply_manifest_updates, SectionContext};
use crate::slot::SlotToken;

/// old slot -> new slot
pub type SlotChanges = BTreeMap<SlotToken, SlotToken>;

/// Every slot present in a scan, across fighters.
pub fn scanned_slots(path_data: &PathData) -> BTreeSet<SlotToken> {
    path_data
        .values()
        .flat_map(|slots| slots.keys().cloned())
        .collect()
}

/// Rejects slot-change maps that would lose content.
///
/// Every old slot must exist in `scanned`. No two old slots may share a
/// target, and a target may not be a scanned slot that stays in place (one
/// that is neither moved nor listed in `removed`).
pub fn validate_slot_changes(
    changes: &SlotChanges,
    scanned: &BTreeSet<SlotToken>,
    removed: &[SlotToken],
) -> Result<()> {
    let mut claimed: BTreeMap<&SlotToken, &SlotToken> = BTreeMap::new();

    for (old, new) in changes {
        if !scanned.contains(old) {
            return Err(ReslotError::UnknownSlot(old.clone()));
        }

        if let Some(first) = claimed.insert(new, old) {
            return Err(ReslotError::SlotCollision {
                target: new.clone(),
                first: first.clone(),
                second: old.clone(),
            });
        }

        let stays = scanned.contains(new) && !changes.contains_key(new) && !removed.contains(new);
        if stays {
            return Err(ReslotError::SlotCollision {
                target: new.clone(),
                first: new.clone(),
                second: old.clone(),
            });
        }
    }

    Ok(())
}

/// The slot set after removing `removed` and applying `changes`.
pub fn final_slots(
    current: &[SlotToken],
    changes: &SlotChanges,
    removed: &[SlotToken],
) -> Vec<SlotToken> {
    let slots: BTreeSet<SlotToken> = current
        .iter()
        .filter(|slot| !removed.contains(slot))
        .map(|slot| changes.get(slot).unwrap_or(slot).clone())
        .collect();
    slots.into_iter().collect()
}

/// Deletes every directly renamed entry of `slot`, across fighters.
/// Returns the number of deleted entries.
pub fn remove_slot(
    fs: &dyn ModFs,
    mod_root: &Utf8Path,
    slot: &SlotToken,
    path_data: &PathData,
) -> Result<usize> {
    let mut deleted = 0;

    for (fighter, slots) in path_data {
        let Some(paths) = slots.get(slot) else {
            continue;
        };
        for entry in &paths.paths_to_be_modified {
            fs.delete_path(mod_root, &entry.original)?;
            tracing::debug!("removed {} ({} {})", entry.original, fighter, slot);
            deleted += 1;
        }
    }

    tracing::info!("removed slot {}: {} entries deleted", slot, deleted);
    Ok(deleted)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameState {
    Pending,
    /// Moved to its temporary name.
    Staged,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameEntry {
    pub original: String,
    pub temp: String,
    pub target: String,
    pub from_slot: SlotToken,
    pub to_slot: SlotToken,
    state: RenameState,
}

impl RenameEntry {
    pub fn state(&self) -> RenameState {
        self.state
    }
}

/// One state change of one plan entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub entry: usize,
    pub from: RenameState,
    pub to: RenameState,
}

/// Renames for a slot change, executed in two passes through temporary
/// names so that swaps and overlapping ranges never clobber each other.
#[derive(Debug, Clone, Default)]
pub struct RenamePlan {
    entries: Vec<RenameEntry>,
    transitions: Vec<Transition>,
}

impl RenamePlan {
    pub fn build(path_data: &PathData, changes: &SlotChanges) -> Self {
        let mut entries = Vec::new();
        let mut planned: HashSet<String> = HashSet::new();

        for slots in path_data.values() {
            for (slot, paths) in slots {
                let Some(new_slot) = changes.get(slot) else {
                    continue;
                };

                for entry in &paths.paths_to_be_modified {
                    let original = entry.original.replace('\\', "/");
                    if !planned.insert(original.clone()) {
                        continue;
                    }

                    let target = substitute_slot(&entry.normalized, new_slot).replace('\\', "/");
                    if target.is_empty() {
                        tracing::warn!("no target path for {}, skipping", entry.original);
                        continue;
                    }

                    entries.push(RenameEntry {
                        original,
                        temp: temp_path(&entry.normalized, slot),
                        target,
                        from_slot: slot.clone(),
                        to_slot: new_slot.clone(),
                        state: RenameState::Pending,
                    });
                }
            }
        }

        Self {
            entries,
            transitions: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[RenameEntry] {
        &self.entries
    }

    /// Every state change so far, in execution order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn completed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.state == RenameState::Done)
            .count()
    }

    /// First pass: every pending original moves to its temporary name.
    pub fn stage(&mut self, fs: &dyn ModFs, mod_root: &Utf8Path) -> Result<()> {
        for index in 0..self.entries.len() {
            let entry = &self.entries[index];
            if entry.state != RenameState::Pending {
                continue;
            }

            fs.rename_path(mod_root, &entry.original, &entry.temp)
                .map_err(|source| ReslotError::Rename {
                    phase: RenamePhase::Stage,
                    path: entry.original.clone(),
                    source,
                })?;
            tracing::debug!("moved to temp: {} -> {}", entry.original, entry.temp);

            self.advance(index, RenameState::Staged);
        }
        Ok(())
    }

    /// Second pass: every staged entry moves to its final name. Returns the
    /// number of completed entries.
    pub fn commit(&mut self, fs: &dyn ModFs, mod_root: &Utf8Path) -> Result<usize> {
        for index in 0..self.entries.len() {
            let entry = &self.entries[index];
            if entry.state != RenameState::Staged {
                continue;
            }

            fs.rename_path(mod_root, &entry.temp, &entry.target)
                .map_err(|source| ReslotError::Rename {
                    phase: RenamePhase::Commit,
                    path: entry.temp.clone(),
                    source,
                })?;
            tracing::debug!("moved to final: {} -> {}", entry.temp, entry.target);

            self.advance(index, RenameState::Done);
        }
        Ok(self.completed())
    }

    fn advance(&mut self, index: usize, to: RenameState) {
        let entry = &mut self.entries[index];
        self.transitions.push(Transition {
            entry: index,
            from: entry.state,
            to,
        });
        entry.state = to;
    }
}

/// `.temp_<slot>_` prefixed onto the last segment of the template.
fn temp_path(normalized: &str, slot: &SlotToken) -> String {
    let mut parts: Vec<&str> = normalized.split(['/', '\\']).collect();
    let last = parts.pop().unwrap_or_default();
    let temp_name = format!(".temp_{}_{}", slot, last);
    parts.push(&temp_name);
    parts.join("/")
}

/// Everything a slot change needs.
#[derive(Debug, Clone, Default)]
pub struct ChangeSlotsRequest {
    pub mod_root: Utf8PathBuf,
    pub slot_changes: SlotChanges,
    /// The complete slot set after the change, across all fighters.
    pub final_slots: Vec<SlotToken>,
    pub path_data: PathData,
    /// Internal name of the fighter the mod targets. Resource updates are
    /// skipped without it.
    pub fighter_name: Option<String>,
    pub custom_names: CustomNames,
    pub default_names: CustomNames,
}

#[derive(Debug, Clone, Default)]
pub struct ChangeSlotsOutcome {
    /// Entries that reached their final name.
    pub changed: usize,
    pub plan: RenamePlan,
    pub chara_db_patched: bool,
    pub msg_name_written: bool,
    /// Manifest sections whose update failed.
    pub failed_sections: Vec<&'static str>,
}

/// Moves slots on disk, then brings the mod's resources in line.
///
/// There is no rollback. If a rename fails the error is returned right away
/// and every rename completed before it stays in place, which can leave the
/// mod partially renamed (originals already under `.temp_*` names).
///
/// After the renames, the chara-db patch runs when a final slot is above
/// `c07` or a custom announcer is set, `msg_name.xmsbt` is written for custom
/// display names, and the manifest sections are derived for slots above
/// `c07`. Each of these steps runs even when an earlier one failed. A
/// fighter missing from `names.data` is returned as
/// [`ReslotError::FighterNotFound`] once msg_name and the manifest are
/// written; any other failure in these steps is logged and does not fail the
/// call.
pub fn change_slots(
    fs: &dyn ModFs,
    resources: &BundledResources,
    request: &ChangeSlotsRequest,
) -> Result<ChangeSlotsOutcome> {
    change_slots_with_patch(fs, resources, request, &PlaceholderPatch)
}

pub fn change_slots_with_patch(
    fs: &dyn ModFs,
    resources: &BundledResources,
    request: &ChangeSlotsRequest,
    patch: &dyn PatchApplier,
) -> Result<ChangeSlotsOutcome> {
    let mod_root = request.mod_root.as_path();
    validate_slot_changes(&request.slot_changes, &scanned_slots(&request.path_data), &[])?;

    let mut plan = RenamePlan::build(&request.path_data, &request.slot_changes);
    tracing::info!("renaming {} entries in {}", plan.len(), mod_root);

    plan.stage(fs, mod_root)?;
    let changed = plan.commit(fs, mod_root)?;

    let mut outcome = ChangeSlotsOutcome {
        changed,
        ..Default::default()
    };

    let fighter = request.fighter_name.as_deref();
    let final_slots = request.final_slots.as_slice();
    let custom = &request.custom_names;

    let mut fighter_not_found = None;
    if needs_chara_db_patch(final_slots, custom) {
        match fighter {
            None => tracing::info!("fighter unknown, skipping chara db patch"),
            Some(fighter) => {
                match update_chara_db(fs, resources, mod_root, fighter, final_slots, custom, patch) {
                    Ok(()) => outcome.chara_db_patched = true,
                    Err(e @ ReslotError::FighterNotFound(_)) => {
                        tracing::error!("failed to patch chara db: {}", e);
                        fighter_not_found = Some(e);
                    }
                    Err(e) => tracing::error!("failed to patch chara db: {}", e),
                }
            }
        }
    }

    if let Some(fighter) = fighter.filter(|_| !custom.is_empty()) {
        match update_msg_name(fs, mod_root, fighter, final_slots, custom, &request.default_names) {
            Ok(written) => outcome.msg_name_written = written,
            Err(e) => tracing::error!("failed to write msg_name: {}", e),
        }
    }

    if let Some(fighter) = fighter {
        outcome.failed_sections = apply_manifest_updates(&SectionContext {
            fs,
            resources,
            mod_root,
            fighter,
            final_slots,
        });
    }

    if let Some(e) = fighter_not_found {
        return Err(e);
    }

    outcome.plan = plan;
    Ok(outcome)
}
