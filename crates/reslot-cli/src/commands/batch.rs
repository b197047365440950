use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use indicatif::ProgressStyle;
use reslot::{BundledResources, Reslotter, SlotChanges, SlotToken};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use super::change::change_mod;
use crate::utils::truncate_middle;

const MAX_LOG_PATH_LEN: usize = 60;

pub struct BatchArgs {
    pub mods: Vec<String>,
    pub changes: SlotChanges,
    pub remove: Vec<SlotToken>,
    pub resources_dir: Utf8PathBuf,
}

fn progress_style() -> eyre::Result<ProgressStyle> {
    Ok(ProgressStyle::with_template(
        "{wide_bar:40.cyan/blue} {pos}/{len} \n {spinner} {msg}",
    )?)
}

/// Applies the same slot changes to every mod, one after another.
///
/// A failing mod is logged and skipped. The command only fails when no mod
/// could be processed.
pub fn batch(args: BatchArgs) -> eyre::Result<()> {
    let reslotter = Reslotter::new(BundledResources::new(args.resources_dir));

    let total = args.mods.len() as u64;
    let span = tracing::info_span!("batch", total = total);
    let _entered = span.enter();
    span.pb_set_style(&progress_style()?);
    span.pb_set_length(total);
    span.pb_set_message("Reslotting mods");
    span.pb_set_finish_message("Batch complete");

    let mut failed = Vec::new();
    let mut renamed = 0;
    for mod_root in &args.mods {
        span.pb_set_message(&truncate_middle(mod_root, MAX_LOG_PATH_LEN));

        match change_mod(
            &reslotter,
            Utf8Path::new(mod_root),
            &args.changes,
            &args.remove,
            None,
            None,
        ) {
            Ok(report) => {
                renamed += report.renamed_entries;
                tracing::info!(
                    "{}: {} renamed, {} removed",
                    mod_root,
                    report.renamed_entries,
                    report.removed_entries
                );
            }
            Err(e) => {
                tracing::error!("{}: {:#}", mod_root, e);
                failed.push(mod_root.as_str());
            }
        }

        span.pb_inc(1);
    }

    println!(
        "{} mods processed, {} entries renamed, {} failed",
        (args.mods.len() - failed.len()).to_string().bright_green().bold(),
        renamed.to_string().bright_green(),
        failed.len().to_string().bright_red().bold()
    );
    for mod_root in &failed {
        println!("  {} {}", "failed:".bright_red(), mod_root);
    }

    if !args.mods.is_empty() && failed.len() == args.mods.len() {
        eyre::bail!("every mod in the batch failed");
    }
    Ok(())
}
