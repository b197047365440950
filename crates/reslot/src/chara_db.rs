//! The `ui_chara_db.prcxml` patch that registers extra costume slots.
//!
//! The bundled template holds one `<hash40 index="N">dummy</hash40>` line per
//! fighter. Patching swaps the fighter's line for a `<struct>` and leaves every
//! other byte of the template alone.

use camino::Utf8Path;

use crate::error::{ReslotError, Result};
use crate::fs::{join_relative, ModFs};
use crate::names::CustomNames;
use crate::resources::BundledResources;
use crate::slot::{SlotToken, MAX_VANILLA_SLOT};

pub const CHARA_DB_PATH: &str = "ui/param/database/ui_chara_db.prcxml";

/// Substitutes a fighter's entry in a chara-db document.
pub trait PatchApplier {
    fn apply(&self, document: &str, fighter_index: u32, replacement: &str) -> String;
}

/// Replaces the literal `dummy` placeholder of the fighter.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderPatch;

impl PlaceholderPatch {
    pub fn placeholder(fighter_index: u32) -> String {
        format!(r#"<hash40 index="{fighter_index}">dummy</hash40>"#)
    }
}

impl PatchApplier for PlaceholderPatch {
    fn apply(&self, document: &str, fighter_index: u32, replacement: &str) -> String {
        document.replace(&Self::placeholder(fighter_index), replacement)
    }
}

/// Whether the final layout needs a chara-db patch at all.
pub fn needs_chara_db_patch(final_slots: &[SlotToken], custom: &CustomNames) -> bool {
    final_slots.iter().any(|slot| !slot.is_vanilla())
        || custom.values().any(|names| names.has_announcer())
}

/// Parameters of the fighter's struct, in write order.
pub fn chara_params(final_slots: &[SlotToken], custom: &CustomNames) -> Vec<String> {
    let mut params = Vec::new();

    let max_slot = final_slots.iter().map(SlotToken::number).max();
    if let Some(max_slot) = max_slot.filter(|max| *max > MAX_VANILLA_SLOT) {
        params.push(format!(r#"<byte hash="color_num">{}</byte>"#, max_slot + 1));
    }

    for slot in final_slots {
        let announcer = custom
            .get(slot)
            .map(|names| names.announcer.as_str())
            .filter(|a| !a.is_empty());

        if slot.is_vanilla() && announcer.is_none() {
            continue;
        }

        let label_index = slot.label_index();
        params.push(format!(
            r#"<byte hash="n{:02}_index">{}</byte>"#,
            slot.number(),
            label_index
        ));
        if let Some(announcer) = announcer {
            params.push(format!(
                r#"<hash40 hash="characall_label_c{:02}">{}</hash40>"#,
                label_index, announcer
            ));
        }
    }

    params
}

/// `<struct index="{idx}">…</struct>`, or `None` when there is nothing to set.
pub fn build_chara_struct(
    fighter_index: u32,
    final_slots: &[SlotToken],
    custom: &CustomNames,
) -> Option<String> {
    let params = chara_params(final_slots, custom);
    if params.is_empty() {
        return None;
    }
    Some(format!(
        r#"<struct index="{fighter_index}">{}</struct>"#,
        params.concat()
    ))
}

/// Writes the patched chara-db into the mod.
///
/// Fails with [`ReslotError::FighterNotFound`] when `names.data` has no entry
/// for `fighter`.
pub fn update_chara_db(
    fs: &dyn ModFs,
    resources: &BundledResources,
    mod_root: &Utf8Path,
    fighter: &str,
    final_slots: &[SlotToken],
    custom: &CustomNames,
    patch: &dyn PatchApplier,
) -> Result<()> {
    let fighter_index = resources
        .fighter_index(fs, fighter)?
        .ok_or_else(|| ReslotError::FighterNotFound(fighter.to_string()))?;

    let mut document = resources.chara_db_template(fs)?;
    if let Some(chara_struct) = build_chara_struct(fighter_index, final_slots, custom) {
        let patched = patch.apply(&document, fighter_index, &chara_struct);
        if patched == document {
            tracing::warn!(
                "chara db template has no placeholder for {} (index {})",
                fighter,
                fighter_index
            );
        }
        document = patched;
    }

    let path = join_relative(mod_root, CHARA_DB_PATH);
    if let Some(dir) = path.parent() {
        if !fs.exists(dir) {
            fs.create_dir_all(dir)?;
        }
    }
    fs.write_text(&path, &document)?;

    tracing::info!("patched {} for {} (index {})", CHARA_DB_PATH, fighter, fighter_index);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::LocalFs;
    use crate::names::SlotNames;
    use camino::Utf8PathBuf;

    fn slots(names: &[&str]) -> Vec<SlotToken> {
        names.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn announcer(slot: &str, call: &str) -> CustomNames {
        CustomNames::from([(
            slot.parse().unwrap(),
            SlotNames {
                announcer: call.to_string(),
                ..Default::default()
            },
        )])
    }

    #[test]
    fn test_vanilla_layout_needs_no_patch() {
        let final_slots = slots(&["c00", "c01", "c07"]);
        assert!(!needs_chara_db_patch(&final_slots, &CustomNames::new()));
        assert!(chara_params(&final_slots, &CustomNames::new()).is_empty());
    }

    #[test]
    fn test_single_added_slot() {
        let final_slots = slots(&["c00", "c08"]);
        assert!(needs_chara_db_patch(&final_slots, &CustomNames::new()));
        assert_eq!(
            build_chara_struct(41, &final_slots, &CustomNames::new()).unwrap(),
            r#"<struct index="41"><byte hash="color_num">9</byte><byte hash="n08_index">16</byte></struct>"#
        );
    }

    #[test]
    fn test_custom_announcer_on_vanilla_slot() {
        let final_slots = slots(&["c00", "c03"]);
        let custom = announcer("c03", "vc_narration_characall_shadow");
        assert!(needs_chara_db_patch(&final_slots, &custom));
        assert_eq!(
            chara_params(&final_slots, &custom),
            [
                r#"<byte hash="n03_index">11</byte>"#,
                r#"<hash40 hash="characall_label_c11">vc_narration_characall_shadow</hash40>"#,
            ]
        );
    }

    #[test]
    fn test_three_digit_slot() {
        let final_slots = slots(&["c100"]);
        assert_eq!(
            chara_params(&final_slots, &CustomNames::new()),
            [
                r#"<byte hash="color_num">101</byte>"#,
                r#"<byte hash="n100_index">108</byte>"#,
            ]
        );
    }

    #[test]
    fn test_placeholder_patch_preserves_other_bytes() {
        let document = "<list>\r\n  <hash40 index=\"1\">dummy</hash40>\r\n  <hash40 index=\"12\">dummy</hash40>\r\n</list>";
        let patched = PlaceholderPatch.apply(document, 1, "<struct index=\"1\"></struct>");
        assert_eq!(
            patched,
            "<list>\r\n  <struct index=\"1\"></struct>\r\n  <hash40 index=\"12\">dummy</hash40>\r\n</list>"
        );
    }

    #[test]
    fn test_update_chara_db_writes_into_mod() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let resources_root = base.join("resources");
        let mod_root = base.join("mod");
        std::fs::create_dir_all(&resources_root).unwrap();
        std::fs::create_dir_all(&mod_root).unwrap();
        std::fs::write(resources_root.join("names.data"), "mario,Mario,1\n").unwrap();
        std::fs::write(
            resources_root.join("ui_chara_db.prcxml"),
            "<list>\n<hash40 index=\"1\">dummy</hash40>\n</list>\n",
        )
        .unwrap();
        let resources = BundledResources::new(resources_root);

        update_chara_db(
            &LocalFs,
            &resources,
            &mod_root,
            "mario",
            &slots(&["c08"]),
            &CustomNames::new(),
            &PlaceholderPatch,
        )
        .unwrap();

        let written = std::fs::read_to_string(mod_root.join(CHARA_DB_PATH)).unwrap();
        assert_eq!(
            written,
            "<list>\n<struct index=\"1\"><byte hash=\"color_num\">9</byte><byte hash=\"n08_index\">16</byte></struct>\n</list>\n"
        );

        let err = update_chara_db(
            &LocalFs,
            &resources,
            &mod_root,
            "peach",
            &slots(&["c08"]),
            &CustomNames::new(),
            &PlaceholderPatch,
        )
        .unwrap_err();
        assert!(matches!(err, ReslotError::FighterNotFound(name) if name == "peach"));
    }
}
