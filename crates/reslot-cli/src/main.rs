use camino::Utf8Path;
use clap::builder::{styling::AnsiColor, Styles};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand, ValueEnum};
use reslot::SlotToken;
use tracing::Level;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{filter, fmt};
use utils::config::{default_config_path, load_or_create_config, resolve_and_persist_progress};
use utils::{
    collect_slot_changes, default_resources_dir, parse_slot, parse_slot_pair,
    resolve_resources_dir,
};

mod commands;
mod utils;

use commands::*;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum VerbosityLevel {
    /// Show errors and above
    Error,
    /// Show warnings and above
    Warning,
    /// Show info messages and above
    Info,
    /// Show debug messages and above
    Debug,
    /// Show all messages including trace
    Trace,
}

impl From<VerbosityLevel> for Level {
    fn from(level: VerbosityLevel) -> Self {
        match level {
            VerbosityLevel::Error => Level::ERROR,
            VerbosityLevel::Warning => Level::WARN,
            VerbosityLevel::Info => Level::INFO,
            VerbosityLevel::Debug => Level::DEBUG,
            VerbosityLevel::Trace => Level::TRACE,
        }
    }
}

impl VerbosityLevel {
    pub fn to_level_filter(&self) -> LevelFilter {
        LevelFilter::from_level((*self).into())
    }
}

#[derive(Parser, Debug)]
#[command(name = "reslot", version, about, long_about = None, styles = cli_styles())]
struct Args {
    /// Set the verbosity level
    #[arg(short = 'L', long, value_enum, default_value_t = VerbosityLevel::Info)]
    verbosity: VerbosityLevel,

    /// Optional path to a config file (TOML). Defaults to `reslot.toml` next to the executable
    #[arg(long)]
    config: Option<String>,

    /// Show or hide progress bars: true/false (overrides config). Example: --progress=false
    #[arg(long, value_name = "true|false")]
    progress: Option<bool>,

    /// Directory holding the bundled datasets (vanilla.json, names.data, messages.data,
    /// ui_chara_db.prcxml). Overrides the config value and the default directory
    #[arg(long, value_name = "DIR")]
    resources_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the costume slots a mod contains
    ///
    /// Lists every fighter and slot found in the mod together with the number
    /// of directories and files that a slot change would rename.
    #[command(visible_alias = "ls")]
    Scan {
        /// Path to the mod directory
        #[arg(short, long)]
        mod_root: String,

        /// Only show entries whose path matches this regex
        #[arg(
            short = 'x',
            long,
            value_name = "REGEX",
            help = "Only show entries whose path matches this regex (case-insensitive by default; use (?-i) to disable)"
        )]
        pattern: Option<String>,

        /// Output format
        #[arg(short = 'F', long, value_enum, default_value_t = ScanOutputFormat::Table)]
        format: ScanOutputFormat,
    },
    /// Move, swap or remove slots in a mod
    ///
    /// Removals run first, then every mapped slot is renamed through a
    /// temporary name so swaps don't clobber each other. Slots above c07 get
    /// their chara db, msg_name and config.json entries updated.
    #[command(visible_alias = "c")]
    Change {
        /// Path to the mod directory
        #[arg(short, long)]
        mod_root: String,

        /// Slot moves as OLD=NEW (e.g. c00=c08). You can pass multiple values at once.
        #[arg(long = "map", value_name = "OLD=NEW", value_parser = parse_slot_pair, num_args = 1..)]
        map: Vec<(SlotToken, SlotToken)>,

        /// Slots to delete before moving
        #[arg(long, value_name = "SLOT", value_parser = parse_slot, num_args = 1..)]
        remove: Vec<SlotToken>,

        /// Internal fighter name (e.g. mario). Detected from the mod when omitted
        #[arg(short, long)]
        fighter: Option<String>,

        /// JSON file with custom names per slot, as printed by `reslot names`
        #[arg(long, value_name = "FILE")]
        names: Option<String>,
    },
    /// Apply the same slot changes to several mods
    #[command(visible_alias = "b")]
    Batch {
        /// Paths to the mod directories
        #[arg(long, required = true, num_args = 1..)]
        mods: Vec<String>,

        /// Slot moves as OLD=NEW (e.g. c00=c08)
        #[arg(long = "map", value_name = "OLD=NEW", value_parser = parse_slot_pair, num_args = 1..)]
        map: Vec<(SlotToken, SlotToken)>,

        /// Slots to delete before moving
        #[arg(long, value_name = "SLOT", value_parser = parse_slot, num_args = 1..)]
        remove: Vec<SlotToken>,
    },
    /// Print the custom names stored in a mod as JSON
    #[command(visible_alias = "n")]
    Names {
        /// Path to the mod directory
        #[arg(short, long)]
        mod_root: String,

        /// Internal fighter name. Detected from the mod when omitted
        #[arg(short, long)]
        fighter: Option<String>,
    },
    /// Print the default resources directory
    #[command(visible_alias = "rd")]
    ResourcesDir,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let args = match Args::try_parse() {
        Ok(a) => a,
        Err(e) => {
            if matches!(
                e.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion | ErrorKind::MissingSubcommand
            ) {
                // Ensure a default config exists even when showing help/version or missing subcommand
                let _ = load_or_create_config(Some(default_config_path().as_path()));
                e.print()?;
                return Ok(());
            } else {
                e.exit();
            }
        }
    };

    let config_path = args
        .config
        .as_deref()
        .map(Utf8Path::new)
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);
    let (mut config, resolved_path) = load_or_create_config(Some(config_path.as_path()))?;
    let show_progress =
        resolve_and_persist_progress(&mut config, resolved_path.as_path(), args.progress)?;

    initialize_tracing(args.verbosity, show_progress)?;

    let resources_dir =
        || resolve_resources_dir(args.resources_dir.clone(), config.resources_dir.clone());

    match args.command {
        Commands::Scan {
            mod_root,
            pattern,
            format,
        } => scan(ScanArgs {
            mod_root,
            pattern,
            format,
        }),
        Commands::Change {
            mod_root,
            map,
            remove,
            fighter,
            names,
        } => change(ChangeArgs {
            mod_root,
            changes: collect_slot_changes(&map)?,
            remove,
            fighter,
            names,
            resources_dir: resources_dir()?,
        }),
        Commands::Batch { mods, map, remove } => batch(BatchArgs {
            mods,
            changes: collect_slot_changes(&map)?,
            remove,
            resources_dir: resources_dir()?,
        }),
        Commands::Names { mod_root, fighter } => names(NamesArgs { mod_root, fighter }),
        Commands::ResourcesDir => {
            if let Some(dir) = default_resources_dir() {
                println!("{}", dir);
            } else {
                println!("<no default resources directory>");
            }
            Ok(())
        }
    }
}

fn initialize_tracing(verbosity: VerbosityLevel, show_progress: bool) -> eyre::Result<()> {
    let indicatif_layer = IndicatifLayer::new();

    let common_format = fmt::format()
        .with_ansi(true)
        .with_level(true)
        .with_source_location(false)
        .with_line_number(false)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::time());

    // stdout carries INFO and below, as far as the verbosity allows
    let stdout_layer = fmt::layer()
        .with_writer(indicatif_layer.get_stdout_writer())
        .event_format(common_format.clone())
        .with_filter(filter::filter_fn(move |metadata| {
            let level = *metadata.level();
            match verbosity {
                VerbosityLevel::Error | VerbosityLevel::Warning => false,
                VerbosityLevel::Info => level == Level::INFO,
                VerbosityLevel::Debug => level == Level::INFO || level == Level::DEBUG,
                VerbosityLevel::Trace => level > Level::WARN,
            }
        }));

    // stderr carries WARN and ERROR
    let stderr_layer = fmt::layer()
        .with_writer(indicatif_layer.get_stderr_writer())
        .event_format(common_format)
        .with_filter(filter::filter_fn(move |metadata| {
            let level = *metadata.level();
            match verbosity {
                VerbosityLevel::Error => level == Level::ERROR,
                _ => level == Level::WARN || level == Level::ERROR,
            }
        }));

    let registry = tracing_subscriber::registry()
        .with(stdout_layer)
        .with(stderr_layer)
        .with(verbosity.to_level_filter());

    if show_progress {
        registry.with(indicatif_layer).init();
    } else {
        registry.init();
    }
    Ok(())
}

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Magenta.on_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_change_parses_maps_and_removals() {
        let args = Args::try_parse_from([
            "reslot", "change", "-m", "mods/mario", "--map", "c00=c08", "c01=c09", "--remove",
            "c02",
        ])
        .unwrap();

        let Commands::Change { map, remove, .. } = args.command else {
            panic!("expected change command");
        };
        assert_eq!(map.len(), 2);
        assert_eq!(map[1].1.as_str(), "c09");
        assert_eq!(remove[0].as_str(), "c02");
    }

    #[test]
    fn test_batch_requires_mods() {
        assert!(Args::try_parse_from(["reslot", "batch", "--map", "c00=c08"]).is_err());
    }
}
