pub mod chara_db;
pub mod classifier;
pub mod error;
pub mod fs;
pub mod manifest;
pub mod names;
pub mod remapper;
pub mod resources;
pub mod scanner;
pub mod sections;
pub mod slot;

use camino::Utf8Path;

pub use error::{RenamePhase, ReslotError, Result};
pub use fs::{LocalFs, ModFs};
pub use names::{CustomNames, SlotNames};
pub use remapper::{ChangeSlotsOutcome, ChangeSlotsRequest, SlotChanges};
pub use resources::BundledResources;
pub use scanner::{PathData, ScanResult};
pub use slot::SlotToken;

use chara_db::{PatchApplier, PlaceholderPatch};

/// A filesystem and the bundled datasets, bundled for callers that work on
/// several mods in a row.
pub struct Reslotter<F: ModFs = LocalFs> {
    fs: F,
    resources: BundledResources,
    patch: Box<dyn PatchApplier>,
}

impl Reslotter<LocalFs> {
    pub fn new(resources: BundledResources) -> Self {
        Self::with_fs(LocalFs, resources)
    }
}

impl<F: ModFs> Reslotter<F> {
    pub fn with_fs(fs: F, resources: BundledResources) -> Self {
        Self {
            fs,
            resources,
            patch: Box::new(PlaceholderPatch),
        }
    }

    /// Swaps the chara-db patching strategy.
    pub fn with_patch(mut self, patch: impl PatchApplier + 'static) -> Self {
        self.patch = Box::new(patch);
        self
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub fn resources(&self) -> &BundledResources {
        &self.resources
    }

    pub fn scan(&self, mod_root: &Utf8Path) -> Result<ScanResult> {
        scanner::scan_for_slots(&self.fs, mod_root)
    }

    /// Deletes `slot` from the mod; see [`remapper::remove_slot`].
    pub fn remove_slot(
        &self,
        mod_root: &Utf8Path,
        slot: &SlotToken,
        path_data: &PathData,
    ) -> Result<usize> {
        remapper::remove_slot(&self.fs, mod_root, slot, path_data)
    }

    /// Moves slots on disk and updates the mod's resources; see
    /// [`remapper::change_slots`] for the failure behavior.
    pub fn change_slots(&self, request: &ChangeSlotsRequest) -> Result<ChangeSlotsOutcome> {
        remapper::change_slots_with_patch(&self.fs, &self.resources, request, self.patch.as_ref())
    }

    pub fn existing_names(
        &self,
        mod_root: &Utf8Path,
        fighter: &str,
        slots: &[SlotToken],
    ) -> CustomNames {
        names::read_existing_custom_names(&self.fs, mod_root, fighter, slots)
    }

    pub fn default_names(&self, fighter: &str, slots: &[SlotToken]) -> CustomNames {
        names::default_custom_names(&self.fs, &self.resources, fighter, slots)
    }
}

/// Scans a mod on the local disk.
pub fn scan_mod(mod_root: &Utf8Path) -> Result<ScanResult> {
    scanner::scan_for_slots(&LocalFs, mod_root)
}
