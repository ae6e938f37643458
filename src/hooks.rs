//! Pluggable normalization hooks, selected by name.
//!
//! The converter has three customization seams: the getkey hook that turns a
//! normalized term into its lookup key, the getdef hook that renders a raw
//! definition, and a supplementary character-substitution table merged over
//! the built-in ones. Implementations live in a static registry; an unknown
//! name is fatal before any input is read.

use crate::charmap;
use crate::error::ConvertError;
use crate::normalize;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub type KeyHook = fn(&str) -> String;

/// Returns `None` when the raw definition is missing a required delimiter.
pub type DefHook = fn(&str) -> Option<String>;

pub struct Hooks {
    pub getkey: KeyHook,
    pub getdef: DefHook,
}

impl Hooks {
    /// Resolve named hooks and install the mapping file, if any.
    ///
    /// Absent a name the hook defaults to identity; absent a mapping file
    /// the substitution table stays at the built-in defaults.
    pub fn resolve(
        getkey: Option<&str>,
        getdef: Option<&str>,
        mapping: Option<&Path>,
    ) -> Result<Hooks, ConvertError> {
        let getkey = lookup_getkey(getkey)?;
        let getdef = lookup_getdef(getdef)?;
        if let Some(path) = mapping {
            let table = load_mapping(path)?;
            charmap::install_mapping(table).map_err(|reason| ConvertError::Mapping {
                path: path.display().to_string(),
                reason: reason.to_string(),
            })?;
        }
        Ok(Hooks { getkey, getdef })
    }
}

fn identity_key(key: &str) -> String {
    key.to_string()
}

fn identity_def(def: &str) -> Option<String> {
    Some(def.to_string())
}

fn headword_key(key: &str) -> String {
    normalize::headword(key).unwrap_or_default()
}

lazy_static! {
    // first tab, with any whitespace hugging it
    static ref DELIMITER: Regex = Regex::new(r"\s*\t\s*").unwrap();
}

/// Render a `gloss<TAB>part-of-speech` definition.
///
/// A non-blank tag becomes a parenthesized prefix: `"(noun) gloss"`. A blank
/// tag leaves the gloss untouched. No delimiter at all is malformed.
fn pos_tag_def(raw: &str) -> Option<String> {
    let mut parts = DELIMITER.splitn(raw, 2);
    let gloss = parts.next()?;
    let tag = parts.next()?.trim();
    if tag.is_empty() {
        Some(gloss.to_string())
    } else {
        Some(format!("({}) {}", tag, gloss))
    }
}

fn lookup_getkey(name: Option<&str>) -> Result<KeyHook, ConvertError> {
    match name {
        None | Some("identity") => Ok(identity_key),
        Some("headword") => Ok(headword_key),
        Some(other) => Err(ConvertError::UnknownHook {
            slot: "getkey",
            name: other.to_string(),
        }),
    }
}

fn lookup_getdef(name: Option<&str>) -> Result<DefHook, ConvertError> {
    match name {
        None | Some("identity") => Ok(identity_def),
        Some("pos-tag") => Ok(pos_tag_def),
        Some(other) => Err(ConvertError::UnknownHook {
            slot: "getdef",
            name: other.to_string(),
        }),
    }
}

// === Mapping file ===

#[derive(Debug, Deserialize)]
struct MappingFile {
    mapping: HashMap<String, String>,
}

fn parse_mapping(text: &str) -> Result<HashMap<u32, String>, String> {
    let file: MappingFile =
        serde_yaml::from_str(text).map_err(|e| format!("invalid YAML: {}", e))?;

    let mut table = HashMap::new();
    for (from, to) in file.mapping {
        let mut chars = from.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => {
                table.insert(ch as u32, to);
            }
            _ => return Err(format!("key {:?} must be a single character", from)),
        }
    }
    Ok(table)
}

/// Load a YAML substitution table: a `mapping:` map of single-character
/// keys to replacement strings.
fn load_mapping(path: &Path) -> Result<HashMap<u32, String>, ConvertError> {
    let text = fs::read_to_string(path).map_err(|e| ConvertError::Mapping {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    parse_mapping(&text).map_err(|reason| ConvertError::Mapping {
        path: path.display().to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ─────────────────────────────────────────────────────────────
    // Definition rendering
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn pos_tag_prefixes_nonblank_tag() {
        assert_eq!(
            pos_tag_def("gloss\tnoun"),
            Some("(noun) gloss".to_string())
        );
    }

    #[test]
    fn pos_tag_blank_tag_leaves_gloss() {
        assert_eq!(pos_tag_def("gloss\t"), Some("gloss".to_string()));
    }

    #[test]
    fn pos_tag_missing_delimiter_is_malformed() {
        assert_eq!(pos_tag_def("gloss without tag"), None);
    }

    #[test]
    fn pos_tag_splits_on_first_tab_only() {
        assert_eq!(
            pos_tag_def("a\tb\tc"),
            Some("(b\tc) a".to_string())
        );
    }

    #[test]
    fn identity_def_never_fails() {
        assert_eq!(identity_def("anything"), Some("anything".to_string()));
    }

    // ─────────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn default_hooks_are_identity() {
        let hook = lookup_getkey(None).unwrap();
        assert_eq!(hook("in die schule"), "in die schule");
        let def = lookup_getdef(None).unwrap();
        assert_eq!(def("x\ty"), Some("x\ty".to_string()));
    }

    #[test]
    fn headword_hook_resolves() {
        let hook = lookup_getkey(Some("headword")).unwrap();
        assert_eq!(hook("in die schule"), "schule");
    }

    #[test]
    fn headword_hook_returns_empty_for_empty_input() {
        let hook = lookup_getkey(Some("headword")).unwrap();
        assert_eq!(hook(""), "");
    }

    #[test]
    fn unknown_hook_name_is_fatal() {
        let err = lookup_getkey(Some("nosuch")).unwrap_err();
        assert!(matches!(err, ConvertError::UnknownHook { slot: "getkey", .. }));
        let err = lookup_getdef(Some("nosuch")).unwrap_err();
        assert!(matches!(err, ConvertError::UnknownHook { slot: "getdef", .. }));
    }

    // ─────────────────────────────────────────────────────────────
    // Mapping file
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn mapping_file_parses() {
        let table = parse_mapping("mapping:\n  \"\u{00DF}\": \"ss\"\n  \"\u{20AC}\": EUR\n").unwrap();
        assert_eq!(table.get(&0xDF), Some(&"ss".to_string()));
        assert_eq!(table.get(&0x20AC), Some(&"EUR".to_string()));
    }

    #[test]
    fn mapping_rejects_multi_char_keys() {
        let err = parse_mapping("mapping:\n  ab: x\n").unwrap_err();
        assert!(err.contains("single character"));
    }

    #[test]
    fn mapping_rejects_invalid_yaml() {
        assert!(parse_mapping("mapping: [not, a, map]").is_err());
    }
}
