pub mod config;

use camino::Utf8PathBuf;
use fancy_regex::Regex;
use reslot::{SlotChanges, SlotToken};

/// Creates a filter pattern from an optional regex string.
/// Defaults to case-insensitive matching unless the user explicitly sets (?i) or (?-i).
pub fn create_filter_pattern(pattern: Option<String>) -> eyre::Result<Option<Regex>> {
    let Some(mut p) = pattern else {
        return Ok(None);
    };
    if !(p.contains("(?i)") || p.contains("(?-i)")) {
        p = format!("(?i){p}");
    }
    Ok(Some(Regex::new(&p)?))
}

/// Parses a `cXX=cYY` pair for `--map`.
pub fn parse_slot_pair(s: &str) -> Result<(SlotToken, SlotToken), String> {
    let (old, new) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OLD=NEW, got '{s}'"))?;
    let old = old.trim().parse::<SlotToken>().map_err(|e| e.to_string())?;
    let new = new.trim().parse::<SlotToken>().map_err(|e| e.to_string())?;
    Ok((old, new))
}

pub fn parse_slot(s: &str) -> Result<SlotToken, String> {
    s.trim().parse::<SlotToken>().map_err(|e| e.to_string())
}

/// Collects `--map` pairs, rejecting a slot listed twice as a source.
pub fn collect_slot_changes(pairs: &[(SlotToken, SlotToken)]) -> eyre::Result<SlotChanges> {
    let mut changes = SlotChanges::new();
    for (old, new) in pairs {
        if let Some(previous) = changes.insert(old.clone(), new.clone()) {
            eyre::bail!("{} is mapped twice ({} and {})", old, previous, new);
        }
    }
    Ok(changes)
}

/// Truncates a string in the middle
pub fn truncate_middle(input: &str, max_len: usize) -> String {
    let len = input.chars().count();
    if len <= max_len {
        return input.to_string();
    }
    if max_len <= 3 {
        return "...".to_string();
    }
    let keep = max_len - 3;
    let left = keep / 2;
    let right = keep - left;
    let head: String = input.chars().take(left).collect();
    let tail: String = input.chars().skip(len - right).collect();
    format!("{head}...{tail}")
}

/// Returns the default directory for the bundled resources.
/// On Windows, prefers the user's Documents folder: Documents/reslot/resources
/// On other platforms, uses the platform data directory via directories_next.
pub fn default_resources_dir() -> Option<Utf8PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Some(mut doc_dir) = dirs_next::document_dir() {
            doc_dir.push("reslot");
            doc_dir.push("resources");
            return Utf8PathBuf::from_path_buf(doc_dir).ok();
        }
    }

    let proj = directories_next::ProjectDirs::from("io", "reslot", "reslot")?;
    Utf8PathBuf::from_path_buf(proj.data_dir().join("resources")).ok()
}

/// `--resources-dir`, then the config value, then the platform default.
pub fn resolve_resources_dir(
    cli: Option<String>,
    configured: Option<String>,
) -> eyre::Result<Utf8PathBuf> {
    cli.or(configured)
        .map(Utf8PathBuf::from)
        .or_else(default_resources_dir)
        .ok_or_else(|| eyre::eyre!("no resources directory; pass --resources-dir"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: &str) -> SlotToken {
        s.parse().unwrap()
    }

    #[test]
    fn test_filter_pattern_defaults_to_case_insensitive() {
        let regex = create_filter_pattern(Some("MARIO".to_string()))
            .unwrap()
            .unwrap();
        assert!(regex.is_match("fighter/mario/model").unwrap());

        let strict = create_filter_pattern(Some("(?-i)MARIO".to_string()))
            .unwrap()
            .unwrap();
        assert!(!strict.is_match("fighter/mario/model").unwrap());

        assert!(create_filter_pattern(None).unwrap().is_none());
    }

    #[test]
    fn test_parse_slot_pair() {
        assert_eq!(parse_slot_pair("c00=c08").unwrap(), (slot("c00"), slot("c08")));
        assert_eq!(parse_slot_pair(" c3 = c12 ").unwrap(), (slot("c03"), slot("c12")));
        assert!(parse_slot_pair("c00").is_err());
        assert!(parse_slot_pair("c00=mario").is_err());
    }

    #[test]
    fn test_duplicate_source_is_rejected() {
        let pairs = [(slot("c00"), slot("c08")), (slot("c00"), slot("c09"))];
        assert!(collect_slot_changes(&pairs).is_err());

        let pairs = [(slot("c01"), slot("c02")), (slot("c02"), slot("c01"))];
        assert_eq!(collect_slot_changes(&pairs).unwrap().len(), 2);
    }

    #[test]
    fn test_truncate_middle() {
        assert_eq!(truncate_middle("short", 10), "short");
        assert_eq!(truncate_middle("fighter/mario/model/body", 11), "figh...body");
        assert_eq!(truncate_middle("abcdef", 3), "...");
    }

    #[test]
    fn test_resources_dir_precedence() {
        assert_eq!(
            resolve_resources_dir(Some("cli".into()), Some("cfg".into())).unwrap(),
            Utf8PathBuf::from("cli")
        );
        assert_eq!(
            resolve_resources_dir(None, Some("cfg".into())).unwrap(),
            Utf8PathBuf::from("cfg")
        );
    }
}
