use camino::Utf8Path;
use colored::Colorize;
use fancy_regex::Regex;
use itertools::Itertools;
use reslot::scanner::{internal_fighter_name, SlotPaths};
use reslot::{scan_mod, PathData, SlotToken};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::utils::{create_filter_pattern, truncate_middle};

const MAX_TABLE_PATH_LEN: usize = 72;

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ScanOutputFormat {
    /// Default human-readable table format
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Simple flat list of paths only
    Flat,
}

pub struct ScanArgs {
    pub mod_root: String,
    pub pattern: Option<String>,
    pub format: ScanOutputFormat,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotSummary {
    fighter: String,
    slot: SlotToken,
    directories: usize,
    files: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanOutput {
    mod_root: String,
    fighter: Option<String>,
    current_slots: Vec<SlotToken>,
    slots: Vec<SlotSummary>,
    path_data: PathData,
}

pub fn scan(args: ScanArgs) -> eyre::Result<()> {
    let mod_root = Utf8Path::new(&args.mod_root);
    let result = scan_mod(mod_root)?;
    let filter_pattern = create_filter_pattern(args.pattern)?;

    let fighter = internal_fighter_name(&result.path_data);
    let path_data = match &filter_pattern {
        Some(regex) => filter_path_data(result.path_data, regex),
        None => result.path_data,
    };

    let slots = path_data
        .iter()
        .flat_map(|(fighter, slots)| {
            slots.iter().map(move |(slot, paths)| SlotSummary {
                fighter: fighter.clone(),
                slot: slot.clone(),
                directories: paths.paths_to_be_modified.len(),
                files: paths.files_to_be_modified.len(),
            })
        })
        .collect();

    let output = ScanOutput {
        mod_root: args.mod_root.clone(),
        fighter,
        current_slots: result.current_slots,
        slots,
        path_data,
    };

    match args.format {
        ScanOutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        ScanOutputFormat::Flat => print_flat(&output),
        ScanOutputFormat::Table => print_table(&output),
    }

    Ok(())
}

/// Keeps only the entries whose original path matches `regex`, dropping slots
/// left without any.
fn filter_path_data(path_data: PathData, regex: &Regex) -> PathData {
    let matches = |path: &str| regex.is_match(path).unwrap_or(false);

    path_data
        .into_iter()
        .filter_map(|(fighter, slots)| {
            let slots: BTreeMap<SlotToken, SlotPaths> = slots
                .into_iter()
                .filter_map(|(slot, mut paths)| {
                    paths.paths_to_be_modified.retain(|e| matches(&e.original));
                    paths.files_to_be_modified.retain(|e| matches(&e.original));
                    let empty = paths.paths_to_be_modified.is_empty()
                        && paths.files_to_be_modified.is_empty();
                    (!empty).then_some((slot, paths))
                })
                .collect();
            (!slots.is_empty()).then_some((fighter, slots))
        })
        .collect()
}

fn print_flat(output: &ScanOutput) {
    let paths = output
        .path_data
        .values()
        .flat_map(|slots| slots.values())
        .flat_map(|paths| {
            paths
                .paths_to_be_modified
                .iter()
                .chain(&paths.files_to_be_modified)
        })
        .map(|entry| entry.original.as_str())
        .sorted()
        .dedup();

    for path in paths {
        println!("{}", path);
    }
}

fn print_table(output: &ScanOutput) {
    println!("{}: {}", "Mod".bright_cyan().bold(), output.mod_root.bright_white());
    println!(
        "{}: {}",
        "Fighter".bright_cyan().bold(),
        output
            .fighter
            .as_deref()
            .unwrap_or("<unknown>")
            .bright_yellow()
    );
    println!(
        "{}: {}",
        "Slots".bright_cyan().bold(),
        output.current_slots.iter().join(", ").bright_green()
    );
    println!();

    println!(
        "{:16} {:>5} {:>6} {:>6}  {}",
        "FIGHTER".bright_blue().bold(),
        "SLOT".bright_blue().bold(),
        "DIRS".bright_blue().bold(),
        "FILES".bright_blue().bold(),
        "FIRST PATH".bright_blue().bold()
    );
    println!("{}", "─".repeat(80).bright_black());

    for summary in &output.slots {
        let first_path = output
            .path_data
            .get(&summary.fighter)
            .and_then(|slots| slots.get(&summary.slot))
            .and_then(|paths| {
                paths
                    .paths_to_be_modified
                    .first()
                    .or_else(|| paths.files_to_be_modified.first())
            })
            .map(|entry| truncate_middle(&entry.original, MAX_TABLE_PATH_LEN))
            .unwrap_or_default();

        let slot_str = format!("{:>5}", summary.slot.as_str());
        let slot_colored = if summary.slot.is_vanilla() {
            slot_str.bright_white()
        } else {
            slot_str.bright_magenta()
        };

        println!(
            "{:16} {} {:>6} {:>6}  {}",
            summary.fighter.bright_yellow(),
            slot_colored,
            summary.directories,
            summary.files,
            first_path.bright_black()
        );
    }

    println!("{}", "─".repeat(80).bright_black());
    println!(
        "{} slot entries listed",
        output.slots.len().to_string().bright_green().bold()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use reslot::scanner::index_paths;

    fn slot(s: &str) -> SlotToken {
        s.parse().unwrap()
    }

    #[test]
    fn test_filter_drops_unmatched_slots() {
        let result = index_paths(&[
            "fighter/mario/c00",
            "fighter/mario/c01",
            "sound/bank/fighter_voice/vc_mario_c01.nus3audio",
        ]);

        let regex = create_filter_pattern(Some("VOICE".to_string())).unwrap().unwrap();
        let filtered = filter_path_data(result.path_data, &regex);

        let mario = &filtered["mario"];
        assert!(!mario.contains_key(&slot("c00")));
        let c01 = &mario[&slot("c01")];
        assert_eq!(c01.paths_to_be_modified.len(), 1);
        assert!(c01.paths_to_be_modified[0].original.contains("fighter_voice"));
    }

    #[test]
    fn test_filter_drops_fighters_without_matches() {
        let result = index_paths(&["fighter/mario/c00", "fighter/luigi/c00"]);
        let regex = create_filter_pattern(Some("luigi".to_string())).unwrap().unwrap();
        let filtered = filter_path_data(result.path_data, &regex);
        assert_eq!(filtered.keys().collect::<Vec<_>>(), ["luigi"]);
    }
}
