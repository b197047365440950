use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use eyre::WrapErr;
use itertools::Itertools;
use reslot::remapper::{final_slots, scanned_slots, validate_slot_changes};
use reslot::scanner::internal_fighter_name;
use reslot::{
    BundledResources, ChangeSlotsRequest, CustomNames, Reslotter, SlotChanges, SlotToken,
};
use std::fs;

pub struct ChangeArgs {
    pub mod_root: String,
    pub changes: SlotChanges,
    pub remove: Vec<SlotToken>,
    pub fighter: Option<String>,
    pub names: Option<String>,
    pub resources_dir: Utf8PathBuf,
}

/// What one `change` run did to a mod.
#[derive(Debug, Default)]
pub struct ChangeReport {
    pub fighter: Option<String>,
    pub removed_entries: usize,
    pub renamed_entries: usize,
    pub final_slots: Vec<SlotToken>,
    pub chara_db_patched: bool,
    pub msg_name_written: bool,
    pub failed_sections: Vec<&'static str>,
}

pub fn change(args: ChangeArgs) -> eyre::Result<()> {
    let reslotter = Reslotter::new(BundledResources::new(args.resources_dir));
    let names = args.names.as_deref().map(load_names_file).transpose()?;

    let report = change_mod(
        &reslotter,
        Utf8Path::new(&args.mod_root),
        &args.changes,
        &args.remove,
        args.fighter,
        names,
    )?;

    print_report(&args.mod_root, &report);
    Ok(())
}

/// Removes the requested slots, then moves the rest.
///
/// Slot changes are checked against the scan taken before anything is
/// deleted, so a bad map leaves the mod untouched. Custom names already in
/// the mod follow their slot to its new number; `names` overrides them per
/// slot.
pub fn change_mod(
    reslotter: &Reslotter,
    mod_root: &Utf8Path,
    changes: &SlotChanges,
    remove: &[SlotToken],
    fighter: Option<String>,
    names: Option<CustomNames>,
) -> eyre::Result<ChangeReport> {
    let scan = reslotter
        .scan(mod_root)
        .wrap_err_with(|| format!("failed to scan {}", mod_root))?;

    if let Some(slot) = remove.iter().find(|slot| changes.contains_key(slot)) {
        eyre::bail!("{} is both removed and moved", slot);
    }
    let scanned = scanned_slots(&scan.path_data);
    validate_slot_changes(changes, &scanned, remove)?;

    let fighter = fighter.or_else(|| internal_fighter_name(&scan.path_data));
    if fighter.is_none() {
        tracing::warn!("could not tell which fighter {} targets; only renaming", mod_root);
    }

    let existing = match &fighter {
        Some(fighter) => reslotter.existing_names(mod_root, fighter, &scan.current_slots),
        None => CustomNames::new(),
    };

    let mut report = ChangeReport {
        fighter: fighter.clone(),
        ..Default::default()
    };

    for slot in remove {
        if !scanned.contains(slot) {
            tracing::warn!("{} has no {} to remove", mod_root, slot);
            continue;
        }
        report.removed_entries += reslotter.remove_slot(mod_root, slot, &scan.path_data)?;
    }

    let scan = if remove.is_empty() {
        scan
    } else {
        reslotter
            .scan(mod_root)
            .wrap_err_with(|| format!("failed to rescan {}", mod_root))?
    };

    let final_slots = final_slots(&scan.current_slots, changes, &[]);
    let custom_names = carry_names(existing, changes, remove, names);
    let default_names = match &fighter {
        Some(fighter) => reslotter.default_names(fighter, &final_slots),
        None => CustomNames::new(),
    };

    let outcome = reslotter.change_slots(&ChangeSlotsRequest {
        mod_root: mod_root.to_path_buf(),
        slot_changes: changes.clone(),
        final_slots: final_slots.clone(),
        path_data: scan.path_data,
        fighter_name: fighter,
        custom_names,
        default_names,
    })?;

    report.renamed_entries = outcome.changed;
    report.final_slots = final_slots;
    report.chara_db_patched = outcome.chara_db_patched;
    report.msg_name_written = outcome.msg_name_written;
    report.failed_sections = outcome.failed_sections;
    Ok(report)
}

/// Re-keys names read from the mod by the slot they move to, drops names of
/// removed slots and lays `overrides` on top.
fn carry_names(
    existing: CustomNames,
    changes: &SlotChanges,
    remove: &[SlotToken],
    overrides: Option<CustomNames>,
) -> CustomNames {
    let mut names: CustomNames = existing
        .into_iter()
        .filter(|(slot, _)| !remove.contains(slot))
        .map(|(slot, names)| (changes.get(&slot).cloned().unwrap_or(slot), names))
        .collect();
    names.extend(overrides.unwrap_or_default());
    names.retain(|_, slot_names| !slot_names.is_empty());
    names
}

/// Reads a `{ "c08": { "cspName": … } }` file.
pub fn load_names_file(path: &str) -> eyre::Result<CustomNames> {
    let contents =
        fs::read_to_string(path).wrap_err_with(|| format!("failed to read names file {}", path))?;
    serde_json::from_str(&contents).wrap_err_with(|| format!("invalid names file {}", path))
}

fn print_report(mod_root: &str, report: &ChangeReport) {
    println!("{}: {}", "Mod".bright_cyan().bold(), mod_root.bright_white());
    println!(
        "{}: {}",
        "Fighter".bright_cyan().bold(),
        report.fighter.as_deref().unwrap_or("<unknown>").bright_yellow()
    );
    println!(
        "{}: {} removed, {} renamed",
        "Entries".bright_cyan().bold(),
        report.removed_entries.to_string().bright_red(),
        report.renamed_entries.to_string().bright_green()
    );
    println!(
        "{}: {}",
        "Slots".bright_cyan().bold(),
        report.final_slots.iter().join(", ").bright_green()
    );
    if report.chara_db_patched {
        println!("{}", "ui_chara_db.prcxml patched".bright_green());
    }
    if report.msg_name_written {
        println!("{}", "msg_name.xmsbt written".bright_green());
    }
    if !report.failed_sections.is_empty() {
        println!(
            "{}: {}",
            "Failed config.json sections".bright_red().bold(),
            report.failed_sections.join(", ")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reslot::SlotNames;

    fn slot(s: &str) -> SlotToken {
        s.parse().unwrap()
    }

    fn named(csp: &str) -> SlotNames {
        SlotNames {
            csp_name: csp.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_existing_names_follow_their_slot() {
        let existing = CustomNames::from([
            (slot("c00"), named("Fire")),
            (slot("c01"), named("Ice")),
            (slot("c02"), named("Gone")),
        ]);
        let changes = SlotChanges::from([(slot("c00"), slot("c08"))]);

        let names = carry_names(existing, &changes, &[slot("c02")], None);
        assert_eq!(names.keys().cloned().collect::<Vec<_>>(), [slot("c01"), slot("c08")]);
        assert_eq!(names[&slot("c08")].csp_name, "Fire");
    }

    #[test]
    fn test_names_file_overrides_existing() {
        let existing = CustomNames::from([(slot("c08"), named("Old"))]);
        let overrides = CustomNames::from([
            (slot("c08"), named("New")),
            (slot("c09"), SlotNames::default()),
        ]);

        let names = carry_names(existing, &SlotChanges::new(), &[], Some(overrides));
        assert_eq!(names.len(), 1);
        assert_eq!(names[&slot("c08")].csp_name, "New");
    }

    #[test]
    fn test_load_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.json");
        fs::write(
            &path,
            r#"{ "c8": { "cspName": "Shadow Mario", "announcer": "vc_narration_characall_shadow" } }"#,
        )
        .unwrap();

        let names = load_names_file(path.to_str().unwrap()).unwrap();
        let c08 = &names[&slot("c08")];
        assert_eq!(c08.csp_name, "Shadow Mario");
        assert_eq!(c08.announcer, "vc_narration_characall_shadow");
        assert!(c08.vs_name.is_empty());
    }
}
