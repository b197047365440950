use camino::{Utf8Path, Utf8PathBuf};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fs;

pub const CONFIG_FILE_NAME: &str = "reslot.toml";

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Whether to show progress bars
    pub show_progress: Option<bool>,
    /// Directory holding the bundled datasets (vanilla list, names, messages, chara db template)
    pub resources_dir: Option<String>,
}

impl Config {
    pub fn resolve_show_progress(&self, cli_progress: Option<bool>) -> bool {
        cli_progress.unwrap_or_else(|| self.show_progress.unwrap_or(true))
    }
}

/// `reslot.toml` next to the running executable, or in the working directory
/// when the executable path can't be resolved as UTF-8.
pub fn default_config_path() -> Utf8PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CONFIG_FILE_NAME)))
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(|| Utf8PathBuf::from(CONFIG_FILE_NAME))
}

pub fn load_config(path: &Utf8Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| eyre!("invalid config {}: {}", path, e))
}

pub fn save_config(path: &Utf8Path, cfg: &Config) -> Result<()> {
    let toml_str = toml::to_string_pretty(cfg)?;
    fs::write(path, toml_str)?;
    Ok(())
}

/// Loads config and ensures a file exists by writing defaults if missing.
/// Returns the loaded config and the path it was loaded from or saved to.
pub fn load_or_create_config(path: Option<&Utf8Path>) -> Result<(Config, Utf8PathBuf)> {
    let final_path = path.map(Utf8Path::to_path_buf).unwrap_or_else(default_config_path);

    let cfg = if final_path.exists() {
        load_config(&final_path)?
    } else {
        let cfg = Config::default();
        save_config(&final_path, &cfg)?;
        cfg
    };

    Ok((cfg, final_path))
}

/// Resolves progress (CLI overrides config). If CLI provided, persist updated value.
pub fn resolve_and_persist_progress(
    cfg: &mut Config,
    path: &Utf8Path,
    cli_progress: Option<bool>,
) -> Result<bool> {
    let show_progress = cfg.resolve_show_progress(cli_progress);
    if cli_progress.is_some() {
        cfg.show_progress = Some(show_progress);
        save_config(path, cfg)?;
    }
    Ok(show_progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join(CONFIG_FILE_NAME)).unwrap()
    }

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_config_path(&dir);

        let (cfg, resolved) = load_or_create_config(Some(&path)).unwrap();
        assert_eq!(resolved, path);
        assert!(path.exists());
        assert!(cfg.show_progress.is_none());
        assert!(cfg.resources_dir.is_none());
    }

    #[test]
    fn test_cli_progress_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_config_path(&dir);
        let (mut cfg, _) = load_or_create_config(Some(&path)).unwrap();

        assert!(resolve_and_persist_progress(&mut cfg, &path, None).unwrap());
        assert!(!resolve_and_persist_progress(&mut cfg, &path, Some(false)).unwrap());

        let reloaded = load_config(&path).unwrap();
        assert_eq!(reloaded.show_progress, Some(false));
        assert!(!reloaded.resolve_show_progress(None));
    }

    #[test]
    fn test_resources_dir_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_config_path(&dir);
        std::fs::write(&path, "resources_dir = \"/opt/reslot/resources\"\n").unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.resources_dir.as_deref(), Some("/opt/reslot/resources"));
    }
}
