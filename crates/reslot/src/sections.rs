//! Derived `config.json` sections for slots beyond the vanilla range.
//!
//! Every updater re-reads the manifest from disk, merges its entries
//! additively and writes the canonical form back, so running one twice
//! leaves the file byte-identical.

use anyhow::Context;
use camino::Utf8Path;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use crate::error::Result;
use crate::fs::ModFs;
use crate::manifest::{
    order_object, read_manifest, write_ordered_config, ModManifest, CONFIG_FILE, NEW_DIR_FILES,
    NEW_DIR_INFOS, NEW_DIR_INFOS_BASE, SHARE_TO_ADDED, SHARE_TO_VANILLA,
};
use crate::resources::BundledResources;
use crate::scanner::KIRBY;
use crate::slot::SlotToken;

static HAS_EXTENSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.[a-z0-9]+$").unwrap());

static C00_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/c00(/|$)").unwrap());

/// Shared inputs of the section updaters.
#[derive(Clone, Copy)]
pub struct SectionContext<'a> {
    pub fs: &'a dyn ModFs,
    pub resources: &'a BundledResources,
    pub mod_root: &'a Utf8Path,
    pub fighter: &'a str,
    pub final_slots: &'a [SlotToken],
}

impl<'a> SectionContext<'a> {
    /// Final slots that need synthetic manifest entries.
    fn added_slots(&self) -> impl Iterator<Item = &'a SlotToken> + 'a {
        self.final_slots.iter().filter(|slot| !slot.is_vanilla())
    }

    fn is_kirby(&self) -> bool {
        self.fighter == KIRBY
    }

    fn load(&self) -> ModManifest {
        read_manifest(self.fs, &self.mod_root.join(CONFIG_FILE))
    }

    fn save(&self, manifest: &ModManifest) -> Result<()> {
        write_ordered_config(self.fs, &self.mod_root.join(CONFIG_FILE), manifest)
    }

    fn sound_bank_prefixes(&self) -> [String; 3] {
        let f = self.fighter;
        [
            format!("sound/bank/fighter/se_{f}_c00"),
            format!("sound/bank/fighter_voice/vc_{f}_c00"),
            format!("sound/bank/fighter_voice/vc_{f}_cheer_c00"),
        ]
    }
}

/// Directories a custom slot adds, in the order the loader expects them.
pub fn slot_directories(fighter: &str, slot: &SlotToken) -> Vec<String> {
    let mut dirs = vec![
        format!("fighter/{fighter}/{slot}"),
        format!("fighter/{fighter}/camera/{slot}"),
    ];
    if fighter != KIRBY {
        dirs.push(format!("fighter/{fighter}/kirbycopy/{slot}"));
    }
    dirs.push(format!("fighter/{fighter}/movie/{slot}"));
    dirs.push(format!("fighter/{fighter}/result/{slot}"));
    dirs
}

/// Maps each vanilla `c00` file of the fighter to its copies in the added slots.
pub fn update_share_to_vanilla(ctx: &SectionContext) -> Result<()> {
    if !ctx.fs.exists(&ctx.mod_root.join("fighter")) {
        tracing::debug!("no fighter folder in {}, skipping {}", ctx.mod_root, SHARE_TO_VANILLA);
        return Ok(());
    }

    let vanilla = ctx.resources.vanilla_files(ctx.fs)?;
    let mut manifest = ctx.load();

    let mut key_order: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut section = manifest.take_object_section(SHARE_TO_VANILLA);

    for slot in ctx.added_slots() {
        for vanilla_path in &vanilla {
            if !shares_with_vanilla(vanilla_path, ctx) || !HAS_EXTENSION.is_match(vanilla_path) {
                continue;
            }

            let custom_path = substitute_c00(vanilla_path, slot);
            if custom_path == *vanilla_path {
                continue;
            }

            if seen.insert(vanilla_path.as_str()) {
                key_order.push(vanilla_path);
            }
            push_unique(&mut section, vanilla_path, custom_path);
        }
    }

    let ordered = order_object(&section, &key_order);
    manifest.set_section(SHARE_TO_VANILLA, Value::Object(ordered));
    ctx.save(&manifest)
}

fn shares_with_vanilla(path: &str, ctx: &SectionContext) -> bool {
    let f = ctx.fighter;

    if let Some(rest) = path.strip_prefix(&format!("fighter/{f}/model/")) {
        return rest
            .split_once('/')
            .is_some_and(|(part, tail)| !part.is_empty() && tail.starts_with("c00/"));
    }

    let camera = format!("camera/fighter/{f}/c00");
    let kirby_copy = format!("fighter/kirby/model/copy_{f}_cap/c00");
    [camera, kirby_copy]
        .iter()
        .any(|root| path.starts_with(&format!("{root}/")) || path.starts_with(&format!("{root}.")))
        || ctx
            .sound_bank_prefixes()
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
}

fn substitute_c00(path: &str, slot: &SlotToken) -> String {
    let mut custom = path.replace("/c00/", &format!("/{slot}/"));
    if let Some(stem) = custom.strip_suffix("/c00") {
        custom = format!("{stem}/{slot}");
    }
    custom.replace("_c00", &format!("_{slot}"))
}

/// Declares the new virtual directories of every added slot.
pub fn update_new_dir_infos(ctx: &SectionContext) -> Result<()> {
    let mut manifest = ctx.load();
    let mut infos = manifest.take_list_section(NEW_DIR_INFOS);

    for slot in ctx.added_slots() {
        for dir in slot_directories(ctx.fighter, slot) {
            if !infos.iter().any(|v| v.as_str() == Some(dir.as_str())) {
                infos.push(Value::String(dir));
            }
        }
    }

    manifest.set_section(NEW_DIR_INFOS, Value::Array(infos));
    ctx.save(&manifest)
}

/// Lists the files each new directory holds, derived from the vanilla `c00` set.
pub fn update_new_dir_files(ctx: &SectionContext) -> Result<()> {
    let vanilla = ctx.resources.vanilla_files(ctx.fs)?;
    let mut manifest = ctx.load();
    let f = ctx.fighter;

    let model = format!("fighter/{f}/model/");
    let motion = format!("fighter/{f}/motion/");
    let camera = format!("camera/fighter/{f}/");
    let kirby_cap = format!("fighter/kirby/model/copy_{f}_cap/");
    let kirby_sword = format!("fighter/kirby/model/copy_{f}_sword/");
    let sound_banks = ctx.sound_bank_prefixes();

    let mut key_order = Vec::new();
    let mut section = manifest.take_object_section(NEW_DIR_FILES);

    for slot in ctx.added_slots() {
        let slot_dir = format!("/{slot}/");
        let mut slot_files = BTreeSet::new();
        let mut camera_files = BTreeSet::new();
        let mut kirby_files = BTreeSet::new();

        for path in &vanilla {
            let has_c00_dir = path.contains("/c00/");
            if (path.starts_with(&model) || path.starts_with(&motion)) && has_c00_dir {
                slot_files.insert(path.replacen("/c00/", &slot_dir, 1));
            }
            if sound_banks.iter().any(|prefix| path.starts_with(prefix.as_str())) {
                slot_files.insert(path.replace("_c00", &format!("_{slot}")));
            }
            if path.starts_with(&camera) && has_c00_dir {
                camera_files.insert(path.replacen("/c00/", &slot_dir, 1));
            }
            if (path.starts_with(&kirby_cap) || path.starts_with(&kirby_sword)) && has_c00_dir {
                kirby_files.insert(path.replacen("/c00/", &slot_dir, 1));
            }
        }

        let mut derived = vec![
            (format!("fighter/{f}/{slot}"), slot_files),
            (format!("fighter/{f}/camera/{slot}"), camera_files),
        ];
        if !ctx.is_kirby() {
            derived.push((format!("fighter/{f}/kirbycopy/{slot}"), kirby_files));
        }

        for (key, files) in derived {
            merge_sorted(&mut section, &key, files);
            key_order.push(key);
        }

        for key in [format!("fighter/{f}/movie/{slot}"), format!("fighter/{f}/result/{slot}")] {
            if !section.contains_key(&key) {
                section.insert(key.clone(), Value::Array(Vec::new()));
            }
            key_order.push(key);
        }
    }

    let ordered = order_object(&section, &key_order);
    manifest.set_section(NEW_DIR_FILES, Value::Object(ordered));
    ctx.save(&manifest)
}

fn merge_sorted(section: &mut Map<String, Value>, key: &str, files: BTreeSet<String>) {
    let mut merged: BTreeSet<String> = section
        .get(key)
        .and_then(Value::as_array)
        .map(|existing| {
            existing
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    merged.extend(files);

    section.insert(
        key.to_string(),
        Value::Array(merged.into_iter().map(Value::String).collect()),
    );
}

/// Points each new directory at the vanilla directory it inherits from.
/// Existing mappings are never replaced.
pub fn update_new_dir_infos_base(ctx: &SectionContext) -> Result<()> {
    let mut manifest = ctx.load();
    let f = ctx.fighter;

    let mut key_order = Vec::new();
    let mut section = manifest.take_object_section(NEW_DIR_INFOS_BASE);

    for slot in ctx.added_slots() {
        let mut mappings = vec![(
            format!("fighter/{f}/{slot}/camera"),
            format!("fighter/{f}/c00/camera"),
        )];
        if !ctx.is_kirby() {
            for part in ["bodymotion", "cmn", "sound"] {
                mappings.push((
                    format!("fighter/{f}/kirbycopy/{slot}/{part}"),
                    format!("fighter/{f}/kirbycopy/c00/{part}"),
                ));
            }
        }
        mappings.push((format!("fighter/{f}/{slot}/cmn"), format!("fighter/{f}/c00/cmn")));

        for (custom, vanilla) in mappings {
            let present = section
                .get(&custom)
                .is_some_and(|v| v.as_str().map_or(!v.is_null(), |s| !s.is_empty()));
            if !present {
                section.insert(custom.clone(), Value::String(vanilla));
            }
            key_order.push(custom);
        }
    }

    let ordered = order_object(&section, &key_order);
    manifest.set_section(NEW_DIR_INFOS_BASE, Value::Object(ordered));
    ctx.save(&manifest)
}

/// Maps vanilla camera, motion and sound paths to their added-slot twins.
pub fn update_share_to_added(ctx: &SectionContext) -> Result<()> {
    let vanilla = ctx.resources.vanilla_files(ctx.fs)?;
    let mut manifest = ctx.load();
    let f = ctx.fighter;

    let camera = format!("camera/fighter/{f}/");
    let motion = format!("fighter/{f}/motion/");
    let sound_banks = ctx.sound_bank_prefixes();
    let kirby_root = format!("fighter/kirby/model/copy_{f}_cap/c00");

    let mut section = manifest.take_object_section(SHARE_TO_ADDED);

    for slot in ctx.added_slots() {
        for path in &vanilla {
            let shared = path.starts_with(&camera)
                || path.starts_with(&motion)
                || sound_banks.iter().any(|prefix| path.starts_with(prefix.as_str()));
            if !shared || !C00_BOUNDARY.is_match(path) {
                continue;
            }

            let added = C00_BOUNDARY.replace_all(path, format!("/{slot}${{1}}").as_str());
            push_unique(&mut section, path, added.into_owned());
        }

        let kirby_slot_root = format!("fighter/kirby/model/copy_{f}_cap/{slot}");
        if vanilla.iter().any(|path| *path == kirby_slot_root) {
            push_unique(&mut section, &kirby_root, kirby_slot_root);
        } else {
            section.remove(&kirby_root);
        }
    }

    let ordered = order_object(&section, &[] as &[&str]);
    manifest.set_section(SHARE_TO_ADDED, Value::Object(ordered));
    ctx.save(&manifest)
}

fn push_unique(section: &mut Map<String, Value>, key: &str, value: String) {
    let entry = section
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entry.is_array() {
        *entry = Value::Array(Vec::new());
    }
    if let Value::Array(list) = entry {
        if !list.iter().any(|v| v.as_str() == Some(value.as_str())) {
            list.push(Value::String(value));
        }
    }
}

/// Runs every section updater. A failing updater is logged and does not stop
/// the others; the names of the failed sections are returned.
pub fn apply_manifest_updates(ctx: &SectionContext) -> Vec<&'static str> {
    if ctx.added_slots().next().is_none() {
        tracing::debug!("no slot above c07, leaving {} untouched", CONFIG_FILE);
        return Vec::new();
    }

    let updaters: [(&'static str, fn(&SectionContext) -> Result<()>); 5] = [
        (SHARE_TO_VANILLA, update_share_to_vanilla),
        (NEW_DIR_INFOS, update_new_dir_infos),
        (NEW_DIR_FILES, update_new_dir_files),
        (NEW_DIR_INFOS_BASE, update_new_dir_infos_base),
        (SHARE_TO_ADDED, update_share_to_added),
    ];

    let mut failed = Vec::new();
    for (section, update) in updaters {
        let result = update(ctx).with_context(|| format!("failed to update {section}"));
        match result {
            Ok(()) => tracing::debug!("updated {}", section),
            Err(e) => {
                tracing::error!("{:#}", e);
                failed.push(section);
            }
        }
    }

    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use camino::Utf8PathBuf;
    use serde_json::json;

    struct Fixture {
        _dir: tempfile::TempDir,
        mod_root: Utf8PathBuf,
        resources: BundledResources,
    }

    impl Fixture {
        fn new(vanilla: Value) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
            let mod_root = base.join("mod");
            let resources_root = base.join("resources");
            std::fs::create_dir_all(mod_root.join("fighter/mario")).unwrap();
            std::fs::create_dir_all(&resources_root).unwrap();
            std::fs::write(resources_root.join("vanilla.json"), vanilla.to_string()).unwrap();

            Self {
                _dir: dir,
                mod_root,
                resources: BundledResources::new(resources_root),
            }
        }

        fn ctx<'a>(&'a self, fighter: &'a str, slots: &'a [SlotToken]) -> SectionContext<'a> {
            SectionContext {
                fs: &LocalFs,
                resources: &self.resources,
                mod_root: &self.mod_root,
                fighter,
                final_slots: slots,
            }
        }

        fn config(&self) -> String {
            std::fs::read_to_string(self.mod_root.join(CONFIG_FILE)).unwrap_or_default()
        }

        fn json(&self) -> Value {
            serde_json::from_str(&self.config()).unwrap()
        }
    }

    fn vanilla() -> Value {
        json!({ "file_array": [
            "fighter/mario/model/body/c00/model.numdlb",
            "fighter/mario/model/body/c00",
            "fighter/mario/motion/body/c00/a00wait1.nuanmb",
            "camera/fighter/mario/c00/j02win1.nuanmb",
            "sound/bank/fighter_voice/vc_mario_c00.nus3audio",
            "fighter/kirby/model/copy_mario_cap/c00/model.numdlb",
            "fighter/kirby/model/copy_mario_cap/c08",
            "fighter/luigi/model/body/c00/model.numdlb",
        ]})
    }

    fn slots(names: &[&str]) -> Vec<SlotToken> {
        names.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_new_dir_infos_for_added_slots() {
        let fx = Fixture::new(vanilla());
        let slots = slots(&["c00", "c08"]);
        update_new_dir_infos(&fx.ctx("mario", &slots)).unwrap();

        assert_eq!(
            fx.json()[NEW_DIR_INFOS],
            json!([
                "fighter/mario/c08",
                "fighter/mario/camera/c08",
                "fighter/mario/kirbycopy/c08",
                "fighter/mario/movie/c08",
                "fighter/mario/result/c08",
            ])
        );
    }

    #[test]
    fn test_kirby_has_no_kirbycopy_dirs() {
        let dirs = slot_directories("kirby", &"c09".parse().unwrap());
        assert!(dirs.iter().all(|d| !d.contains("kirbycopy")));
        assert_eq!(dirs.len(), 4);
    }

    #[test]
    fn test_share_to_vanilla_maps_files_only() {
        let fx = Fixture::new(vanilla());
        let slots = slots(&["c08"]);
        update_share_to_vanilla(&fx.ctx("mario", &slots)).unwrap();

        assert_eq!(
            fx.json()[SHARE_TO_VANILLA],
            json!({
                "fighter/mario/model/body/c00/model.numdlb": ["fighter/mario/model/body/c08/model.numdlb"],
                "camera/fighter/mario/c00/j02win1.nuanmb": ["camera/fighter/mario/c08/j02win1.nuanmb"],
                "sound/bank/fighter_voice/vc_mario_c00.nus3audio": ["sound/bank/fighter_voice/vc_mario_c08.nus3audio"],
                "fighter/kirby/model/copy_mario_cap/c00/model.numdlb": ["fighter/kirby/model/copy_mario_cap/c08/model.numdlb"],
            })
        );
    }

    #[test]
    fn test_share_to_vanilla_needs_fighter_folder() {
        let fx = Fixture::new(vanilla());
        std::fs::remove_dir_all(fx.mod_root.join("fighter")).unwrap();
        let slots = slots(&["c08"]);
        update_share_to_vanilla(&fx.ctx("mario", &slots)).unwrap();
        assert_eq!(fx.config(), "");
    }

    #[test]
    fn test_new_dir_files_sorted_and_pruned() {
        let fx = Fixture::new(vanilla());
        let slots = slots(&["c08"]);
        update_new_dir_files(&fx.ctx("mario", &slots)).unwrap();

        let files = fx.json()[NEW_DIR_FILES].clone();
        let keys: Vec<&str> = files.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "fighter/mario/c08",
                "fighter/mario/camera/c08",
                "fighter/mario/kirbycopy/c08"
            ]
        );
        assert_eq!(
            files["fighter/mario/c08"],
            json!([
                "fighter/mario/model/body/c08/model.numdlb",
                "fighter/mario/motion/body/c08/a00wait1.nuanmb",
                "sound/bank/fighter_voice/vc_mario_c08.nus3audio",
            ])
        );
    }

    #[test]
    fn test_new_dir_infos_base_first_write_wins() {
        let fx = Fixture::new(vanilla());
        std::fs::write(
            fx.mod_root.join(CONFIG_FILE),
            json!({ "new-dir-infos-base": { "fighter/mario/c08/cmn": "fighter/mario/c01/cmn" } })
                .to_string(),
        )
        .unwrap();

        let slots = slots(&["c08"]);
        update_new_dir_infos_base(&fx.ctx("mario", &slots)).unwrap();

        let base = fx.json()[NEW_DIR_INFOS_BASE].clone();
        let keys: Vec<&str> = base.as_object().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "fighter/mario/c08/camera",
                "fighter/mario/kirbycopy/c08/bodymotion",
                "fighter/mario/kirbycopy/c08/cmn",
                "fighter/mario/kirbycopy/c08/sound",
                "fighter/mario/c08/cmn",
            ]
        );
        assert_eq!(base["fighter/mario/c08/cmn"], "fighter/mario/c01/cmn");
    }

    #[test]
    fn test_share_to_added_with_kirby_root() {
        let fx = Fixture::new(vanilla());
        let slots = slots(&["c08"]);
        update_share_to_added(&fx.ctx("mario", &slots)).unwrap();

        assert_eq!(
            fx.json()[SHARE_TO_ADDED],
            json!({
                "camera/fighter/mario/c00/j02win1.nuanmb": ["camera/fighter/mario/c08/j02win1.nuanmb"],
                "fighter/kirby/model/copy_mario_cap/c00": ["fighter/kirby/model/copy_mario_cap/c08"],
                "fighter/mario/motion/body/c00/a00wait1.nuanmb": ["fighter/mario/motion/body/c08/a00wait1.nuanmb"],
            })
        );
    }

    #[test]
    fn test_share_to_added_drops_stale_kirby_root() {
        let fx = Fixture::new(vanilla());
        std::fs::write(
            fx.mod_root.join(CONFIG_FILE),
            json!({ "share-to-added": {
                "fighter/kirby/model/copy_mario_cap/c00": ["fighter/kirby/model/copy_mario_cap/c09"]
            }})
            .to_string(),
        )
        .unwrap();

        let slots = slots(&["c09"]);
        update_share_to_added(&fx.ctx("mario", &slots)).unwrap();
        assert!(fx.json()[SHARE_TO_ADDED]
            .get("fighter/kirby/model/copy_mario_cap/c00")
            .is_none());
    }

    #[test]
    fn test_updaters_are_idempotent() {
        let fx = Fixture::new(vanilla());
        let slots = slots(&["c00", "c08", "c10"]);
        let ctx = fx.ctx("mario", &slots);

        assert!(apply_manifest_updates(&ctx).is_empty());
        let first = fx.config();
        assert!(apply_manifest_updates(&ctx).is_empty());
        assert_eq!(fx.config(), first);

        let sections: Vec<String> = fx.json().as_object().unwrap().keys().cloned().collect();
        assert_eq!(
            sections,
            [
                "new-dir-infos",
                "new-dir-infos-base",
                "share-to-vanilla",
                "share-to-added",
                "new-dir-files"
            ]
        );
    }

    #[test]
    fn test_vanilla_slots_write_nothing() {
        let fx = Fixture::new(vanilla());
        let slots = slots(&["c00", "c07"]);
        assert!(apply_manifest_updates(&fx.ctx("mario", &slots)).is_empty());
        assert!(!fx.mod_root.join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_missing_vanilla_list_is_reported() {
        let fx = Fixture::new(vanilla());
        std::fs::remove_file(fx.resources.vanilla_files_path()).unwrap();
        let slots = slots(&["c08"]);

        let failed = apply_manifest_updates(&fx.ctx("mario", &slots));
        assert_eq!(failed, [SHARE_TO_VANILLA, NEW_DIR_FILES, SHARE_TO_ADDED]);
        assert!(fx.json()[NEW_DIR_INFOS].is_array());
    }
}
