//! Path classification: which fighter and costume slot a mod path belongs to.

use fancy_regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::slot::SlotToken;

/// Marker substituted for slot digits in a normalized path.
pub const SLOT_PLACEHOLDER: &str = "###";

const FIGHTER_SEGMENT: &str = "fighter";

// `c` + 2-3 digits anywhere in the path, never the prefix of a longer number
static SLOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(c)(\d{2,3})(?!\d)").unwrap());

// `_<name>_[c]<digits>.<ext>` at the end of the file name
static SLOT_BEFORE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)_([^_/\\]+)_(c)?(\d{2,3})(\.[^./\\]+)$").unwrap()
});

// single-digit `c3` standing on its own
static SHORT_SLOT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?<![0-9a-z])(c)(\d)(?![0-9a-z])").unwrap());

static SLOT_FOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^c\d{2,3}$").unwrap());

/// Everything the classifier can tell about a single path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathInfo {
    pub slot: Option<SlotToken>,
    /// Advisory only: derived from the segment after `fighter/` or from a
    /// `_<name>_cXX.ext` file name.
    pub fighter_name: Option<String>,
    pub normalized_path: Option<String>,
    /// The path is itself a slot folder below `fighter/` (e.g. `fighter/mario/c00`).
    pub is_fighter_slot_folder: bool,
    /// The path is, or lies inside, a slot folder below `fighter/`.
    pub includes_fighter_slot_folder: bool,
}

impl PathInfo {
    /// True when the path only moves implicitly with its parent slot folder.
    pub fn is_inside_slot_folder(&self) -> bool {
        self.includes_fighter_slot_folder && !self.is_fighter_slot_folder
    }
}

pub fn is_slot_folder_name(segment: &str) -> bool {
    SLOT_FOLDER.is_match(segment).unwrap_or(false)
}

/// Classifies a path relative to a mod root.
pub fn classify(path: &str) -> PathInfo {
    let mut info = PathInfo::default();

    let parts: Vec<&str> = path.split(['/', '\\']).collect();
    if let Some(fighter_index) = parts.iter().position(|part| *part == FIGHTER_SEGMENT) {
        let slot_index = parts
            .iter()
            .enumerate()
            .skip(fighter_index + 1)
            .find(|(_, part)| is_slot_folder_name(part))
            .map(|(i, _)| i);

        if let Some(slot_index) = slot_index {
            info.includes_fighter_slot_folder = true;
            info.is_fighter_slot_folder = slot_index == parts.len() - 1;
            if fighter_index + 1 < slot_index {
                info.fighter_name = Some(parts[fighter_index + 1].to_string());
            }
        }
    }

    let file_name_match = first_captures(&SLOT_BEFORE_EXTENSION, path);
    if info.fighter_name.is_none() {
        info.fighter_name = file_name_match.as_ref().map(|caps| caps[1].to_string());
    }

    if let Some(caps) = first_captures(&SLOT_TOKEN, path) {
        info.slot = parse_slot(&caps[2]);
        info.normalized_path = Some(replace_first(&SLOT_TOKEN, path, |caps| {
            format!("{}{}", &caps[1], SLOT_PLACEHOLDER)
        }));
    } else if let Some(caps) = file_name_match {
        info.slot = parse_slot(&caps[3]);
        info.normalized_path = Some(replace_first(&SLOT_BEFORE_EXTENSION, path, |caps| {
            format!(
                "_{}_{}{}{}",
                &caps[1],
                caps.get(2).map_or("", |c| c.as_str()),
                SLOT_PLACEHOLDER,
                &caps[4]
            )
        }));
    } else if let Some(caps) = first_captures(&SHORT_SLOT_TOKEN, path) {
        info.slot = parse_slot(&caps[2]);
        info.normalized_path = Some(replace_first(&SHORT_SLOT_TOKEN, path, |caps| {
            format!("{}{}", &caps[1], SLOT_PLACEHOLDER)
        }));
    }

    if info.slot.is_none() {
        info.fighter_name = None;
        info.normalized_path = None;
    }

    info
}

/// Substitutes slot digits back into a normalized template.
pub fn substitute_slot(normalized: &str, slot: &SlotToken) -> String {
    normalized.replacen(SLOT_PLACEHOLDER, slot.digits(), 1)
}

fn parse_slot(digits: &str) -> Option<SlotToken> {
    format!("c{}", digits).parse().ok()
}

fn first_captures<'t>(regex: &Regex, text: &'t str) -> Option<Captures<'t>> {
    regex.captures(text).ok().flatten()
}

fn replace_first(regex: &Regex, text: &str, replacement: impl Fn(&Captures) -> String) -> String {
    let Some(caps) = first_captures(regex, text) else {
        return text.to_string();
    };
    let Some(whole) = caps.get(0) else {
        return text.to_string();
    };

    let mut out = String::with_capacity(text.len());
    out.push_str(&text[..whole.start()]);
    out.push_str(&replacement(&caps));
    out.push_str(&text[whole.end()..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(s: &str) -> Option<SlotToken> {
        Some(s.parse().unwrap())
    }

    #[test]
    fn test_fighter_slot_folder() {
        let info = classify("fighter/mario/c00");
        assert_eq!(info.slot, slot("c00"));
        assert_eq!(info.fighter_name.as_deref(), Some("mario"));
        assert_eq!(info.normalized_path.as_deref(), Some("fighter/mario/c###"));
        assert!(info.is_fighter_slot_folder);
        assert!(info.includes_fighter_slot_folder);
        assert!(!info.is_inside_slot_folder());
    }

    #[test]
    fn test_file_inside_slot_folder() {
        let info = classify("fighter/mario/c00/model.numdlb");
        assert_eq!(info.slot, slot("c00"));
        assert_eq!(info.fighter_name.as_deref(), Some("mario"));
        assert!(!info.is_fighter_slot_folder);
        assert!(info.is_inside_slot_folder());
    }

    #[test]
    fn test_nested_slot_folder() {
        let info = classify("fighter/mario/model/body/c05");
        assert_eq!(info.slot, slot("c05"));
        assert_eq!(info.fighter_name.as_deref(), Some("mario"));
        assert!(info.is_fighter_slot_folder);

        let info = classify("fighter/mario/model/body/c05/def_mario_001_col.nutexb");
        assert!(info.is_inside_slot_folder());
    }

    #[test]
    fn test_backslash_paths() {
        let info = classify(r"fighter\mario\c01\model.numdlb");
        assert_eq!(info.slot, slot("c01"));
        assert_eq!(info.fighter_name.as_deref(), Some("mario"));
        assert_eq!(
            info.normalized_path.as_deref(),
            Some(r"fighter\mario\c###\model.numdlb")
        );
    }

    #[test]
    fn test_uppercase_token_is_lowercased() {
        let info = classify("fighter/mario/C03");
        assert_eq!(info.slot, slot("c03"));
        assert_eq!(info.normalized_path.as_deref(), Some("fighter/mario/C###"));
    }

    #[test]
    fn test_three_digit_slot() {
        let info = classify("fighter/pikachu/c120/model.numdlb");
        assert_eq!(info.slot, slot("c120"));
        assert_eq!(
            info.normalized_path.as_deref(),
            Some("fighter/pikachu/c###/model.numdlb")
        );
    }

    #[test]
    fn test_slot_before_extension() {
        let info = classify("ui/replace/chara/chara_4/chara_4_mario_01.bntx");
        assert_eq!(info.slot, slot("c01"));
        assert_eq!(info.fighter_name.as_deref(), Some("mario"));
        assert_eq!(
            info.normalized_path.as_deref(),
            Some("ui/replace/chara/chara_4/chara_4_mario_###.bntx")
        );
    }

    #[test]
    fn test_file_name_supplies_fighter() {
        let info = classify("effect/fighter/mario/ef_mario_c05.eff");
        assert_eq!(info.slot, slot("c05"));
        assert_eq!(info.fighter_name.as_deref(), Some("mario"));
        assert!(!info.includes_fighter_slot_folder);
    }

    #[test]
    fn test_sound_bank_uses_token_and_file_name() {
        let info = classify("sound/bank/fighter_voice/vc_mario_c02.nus3audio");
        assert_eq!(info.slot, slot("c02"));
        assert_eq!(info.fighter_name.as_deref(), Some("mario"));
        assert_eq!(
            info.normalized_path.as_deref(),
            Some("sound/bank/fighter_voice/vc_mario_c###.nus3audio")
        );
    }

    #[test]
    fn test_single_digit_token_is_padded() {
        let info = classify("fighter/mario/model/c3.nutexb");
        assert_eq!(info.slot, slot("c03"));
        assert_eq!(
            info.normalized_path.as_deref(),
            Some("fighter/mario/model/c###.nutexb")
        );
    }

    #[test]
    fn test_longer_numbers_are_ignored() {
        let info = classify("stream/c1234/movie.webm");
        assert_eq!(info.slot, None);
        assert_eq!(info.normalized_path, None);
    }

    #[test]
    fn test_unrelated_path() {
        let info = classify("ui/param/database/ui_chara_db.prcxml");
        assert_eq!(info, PathInfo::default());
    }

    #[test]
    fn test_round_trip() {
        let paths = [
            "fighter/mario/c00",
            "fighter/mario/C07/model/body/c07/def.nutexb",
            "camera/fighter/mario/c120/j02win1.nuanmb",
            "effect/fighter/mario/ef_mario_c05.eff",
            "ui/replace/chara/chara_0/chara_0_mario_06.bntx",
        ];

        for path in paths {
            let info = classify(path);
            let slot = info.slot.expect("path carries a slot");
            let normalized = info.normalized_path.expect("path is normalized");
            assert_eq!(slot.as_str(), slot.as_str().to_lowercase());
            assert_eq!(substitute_slot(&normalized, &slot), path);
        }
    }

    #[test]
    fn test_substitute_new_slot() {
        let info = classify("fighter/mario/c00");
        let normalized = info.normalized_path.unwrap();
        assert_eq!(
            substitute_slot(&normalized, &SlotToken::from_number(8)),
            "fighter/mario/c08"
        );
    }
}
