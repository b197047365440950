//! Custom display names of costume slots.
//!
//! Names end up in `ui/message/msg_name.xmsbt`, keyed by the slot's label
//! index; the announcer call lives in the chara-db patch.

use camino::Utf8Path;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::chara_db::CHARA_DB_PATH;
use crate::error::Result;
use crate::fs::{join_relative, ModFs};
use crate::resources::BundledResources;
use crate::slot::SlotToken;

pub const MSG_NAME_PATH: &str = "ui/message/msg_name.xmsbt";

/// Announcer call used when a slot keeps the fighter's own voice line.
pub const DEFAULT_ANNOUNCER: &str = "vc_narration_characall";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlotNames {
    /// Character select screen name.
    pub csp_name: String,
    /// Versus screen name, upper-cased CSP name when empty.
    pub vs_name: String,
    pub boxing_ring: String,
    pub announcer: String,
}

impl SlotNames {
    pub fn has_display_name(&self) -> bool {
        !self.csp_name.is_empty() || !self.vs_name.is_empty() || !self.boxing_ring.is_empty()
    }

    pub fn has_announcer(&self) -> bool {
        !self.announcer.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        !self.has_display_name() && !self.has_announcer()
    }
}

pub type CustomNames = BTreeMap<SlotToken, SlotNames>;

/// Escapes text for an xmsbt entry. A literal `\n` becomes a line break.
pub fn escape_xml(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Renders `msg_name.xmsbt`, or `None` when no slot carries a display name.
pub fn render_msg_name(
    fighter: &str,
    final_slots: &[SlotToken],
    custom: &CustomNames,
    defaults: &CustomNames,
) -> Option<String> {
    let mut lines = Vec::new();

    for slot in final_slots {
        let Some(names) = custom.get(slot).filter(|n| n.has_display_name()) else {
            continue;
        };
        let fallback = defaults.get(slot);

        let csp_name = or_fallback(&names.csp_name, fallback.map(|d| d.csp_name.as_str()));
        let mut vs_name = or_fallback(&names.vs_name, fallback.map(|d| d.vs_name.as_str()));
        if vs_name.is_empty() {
            vs_name = csp_name.to_uppercase();
        }
        let boxing_ring =
            or_fallback(&names.boxing_ring, fallback.map(|d| d.boxing_ring.as_str()));

        let label = format!("{:02}", slot.label_index());
        for (prefix, text) in [
            ("nam_chr0", &csp_name),
            ("nam_chr1", &csp_name),
            ("nam_chr2", &vs_name),
            ("nam_stage_name", &boxing_ring),
        ] {
            lines.push(format!("\t<entry label=\"{prefix}_{label}_{fighter}\">"));
            lines.push(format!("\t\t<text>{}</text>", escape_xml(text)));
            lines.push("\t</entry>".to_string());
        }
    }

    if lines.is_empty() {
        return None;
    }

    let mut document = vec![XML_DECLARATION.to_string(), "<xmsbt>".to_string()];
    document.extend(lines);
    document.push("</xmsbt>".to_string());
    Some(document.join("\n"))
}

fn or_fallback(own: &str, fallback: Option<&str>) -> String {
    if own.is_empty() {
        fallback.unwrap_or_default().to_string()
    } else {
        own.to_string()
    }
}

/// Writes `msg_name.xmsbt` for every final slot with a custom display name.
/// Missing fields fall back to `defaults`. Returns whether a file was written.
pub fn update_msg_name(
    fs: &dyn ModFs,
    mod_root: &Utf8Path,
    fighter: &str,
    final_slots: &[SlotToken],
    custom: &CustomNames,
    defaults: &CustomNames,
) -> Result<bool> {
    let Some(content) = render_msg_name(fighter, final_slots, custom, defaults) else {
        tracing::debug!("no custom names to write for {}", fighter);
        return Ok(false);
    };

    let path = join_relative(mod_root, MSG_NAME_PATH);
    if let Some(dir) = path.parent() {
        if !fs.exists(dir) {
            fs.create_dir_all(dir)?;
        }
    }
    fs.write_text(&path, &content)?;

    tracing::info!("wrote {}", path);
    Ok(true)
}

/// Reads back the names a previous run stored in the mod.
///
/// Unreadable or malformed files yield whatever could be recovered, at worst
/// an empty map.
pub fn read_existing_custom_names(
    fs: &dyn ModFs,
    mod_root: &Utf8Path,
    fighter: &str,
    slots: &[SlotToken],
) -> CustomNames {
    match try_read_existing_custom_names(fs, mod_root, fighter, slots) {
        Ok(names) => names,
        Err(e) => {
            tracing::error!("failed to read existing custom names: {}", e);
            CustomNames::new()
        }
    }
}

fn try_read_existing_custom_names(
    fs: &dyn ModFs,
    mod_root: &Utf8Path,
    fighter: &str,
    slots: &[SlotToken],
) -> Result<CustomNames> {
    let mut names = CustomNames::new();

    let chara_db = read_if_exists(fs, &join_relative(mod_root, CHARA_DB_PATH))?;
    let (bytes, hashes) = match chara_db.as_deref().map(|xml| {
        Ok::<_, quick_xml::Error>((
            collect_labelled_text(xml, "byte", "hash", None)?,
            collect_labelled_text(xml, "hash40", "hash", None)?,
        ))
    }) {
        Some(Ok(parsed)) => parsed,
        Some(Err(e)) => {
            tracing::warn!("ignoring malformed {}: {}", CHARA_DB_PATH, e);
            Default::default()
        }
        None => Default::default(),
    };

    let label_index = |slot: &SlotToken| -> u32 {
        let number = slot.number();
        [format!("n{number}_index"), format!("n{number:02}_index")]
            .iter()
            .find_map(|key| bytes.get(key).and_then(|v| v.trim().parse().ok()))
            .unwrap_or_else(|| slot.label_index())
    };

    if let Some(xml) = read_if_exists(fs, &join_relative(mod_root, MSG_NAME_PATH))? {
        match collect_labelled_text(&xml, "entry", "label", Some("text")) {
            Ok(entries) => {
                for slot in slots {
                    let index = label_index(slot);
                    let lookup = |prefix: &str| {
                        [format!("{prefix}_{index:02}_{fighter}"), format!("{prefix}_{index}_{fighter}")]
                            .iter()
                            .find_map(|label| entries.get(label))
                            .map(|text| text.replace('\n', "\\n"))
                            .unwrap_or_default()
                    };

                    let slot_names = SlotNames {
                        csp_name: lookup("nam_chr1"),
                        vs_name: lookup("nam_chr2"),
                        boxing_ring: lookup("nam_stage_name"),
                        announcer: String::new(),
                    };
                    if slot_names.has_display_name() {
                        names.insert(slot.clone(), slot_names);
                    }
                }
            }
            Err(e) => tracing::warn!("ignoring malformed {}: {}", MSG_NAME_PATH, e),
        }
    }

    for slot in slots {
        let key = format!("characall_label_c{:02}", label_index(slot));
        if let Some(announcer) = hashes.get(&key).filter(|a| !a.is_empty()) {
            names.entry(slot.clone()).or_default().announcer = announcer.clone();
        }
    }

    Ok(names)
}

/// The game's own names for `fighter`, assigned to every slot in `slots`.
pub fn default_custom_names(
    fs: &dyn ModFs,
    resources: &BundledResources,
    fighter: &str,
    slots: &[SlotToken],
) -> CustomNames {
    let defaults = match load_default_names(fs, resources, fighter) {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("could not load default names for {}: {}", fighter, e);
            SlotNames::default()
        }
    };

    slots
        .iter()
        .map(|slot| (slot.clone(), defaults.clone()))
        .collect()
}

fn load_default_names(
    fs: &dyn ModFs,
    resources: &BundledResources,
    fighter: &str,
) -> Result<SlotNames> {
    let messages = resources.messages(fs)?;
    let entries = collect_labelled_text(&messages, "entry", "label", Some("text"))?;
    let text = |label: String| entries.get(&label).cloned().unwrap_or_default();

    Ok(SlotNames {
        csp_name: text(format!("nam_chr1_08_{fighter}")),
        vs_name: text(format!("nam_chr2_08_{fighter}")),
        boxing_ring: text(format!("nam_stage_name_08_{fighter}")).replace('\n', " "),
        announcer: DEFAULT_ANNOUNCER.to_string(),
    })
}

fn read_if_exists(fs: &dyn ModFs, path: &Utf8Path) -> Result<Option<String>> {
    if !fs.exists(path) {
        return Ok(None);
    }
    Ok(Some(fs.read_text(path)?))
}

/// Collects the text of every `<element attr="key">` as `key -> text`. With
/// `text_child` set, the text of that child element is taken instead. The
/// first occurrence of a key wins.
fn collect_labelled_text(
    xml: &str,
    element: &str,
    attr: &str,
    text_child: Option<&str>,
) -> std::result::Result<HashMap<String, String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut found = HashMap::new();
    let mut label: Option<String> = None;
    let mut capturing = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                if name.as_ref() == element.as_bytes() {
                    label = match e.try_get_attribute(attr)? {
                        Some(value) => Some(value.unescape_value()?.into_owned()),
                        None => None,
                    };
                    if text_child.is_none() && label.is_some() {
                        capturing = true;
                        text.clear();
                    }
                } else if label.is_some() && text_child.is_some_and(|c| name.as_ref() == c.as_bytes()) {
                    capturing = true;
                    text.clear();
                }
            }
            Event::Text(t) if capturing => text.push_str(&t.unescape()?),
            Event::CData(c) if capturing => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) => {
                let name = e.name();
                let closes_text = name.as_ref() == text_child.unwrap_or(element).as_bytes();
                if capturing && closes_text {
                    capturing = false;
                    if let Some(key) = &label {
                        found.entry(key.clone()).or_insert_with(|| text.clone());
                    }
                }
                if name.as_ref() == element.as_bytes() {
                    label = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(found)
}
