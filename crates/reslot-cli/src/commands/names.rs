use camino::Utf8Path;
use eyre::WrapErr;
use reslot::scanner::internal_fighter_name;
use reslot::{scan_mod, LocalFs};

pub struct NamesArgs {
    pub mod_root: String,
    pub fighter: Option<String>,
}

/// Prints the custom names stored in a mod as JSON, in the format `change
/// --names` reads.
pub fn names(args: NamesArgs) -> eyre::Result<()> {
    let mod_root = Utf8Path::new(&args.mod_root);
    let scan = scan_mod(mod_root).wrap_err_with(|| format!("failed to scan {}", mod_root))?;

    let fighter = args
        .fighter
        .or_else(|| internal_fighter_name(&scan.path_data))
        .ok_or_else(|| {
            eyre::eyre!("could not tell which fighter {} targets; pass --fighter", mod_root)
        })?;

    let names = reslot::names::read_existing_custom_names(
        &LocalFs,
        mod_root,
        &fighter,
        &scan.current_slots,
    );
    tracing::debug!("{} slots with custom names for {}", names.len(), fighter);

    println!("{}", serde_json::to_string_pretty(&names)?);
    Ok(())
}
