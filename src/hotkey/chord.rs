use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::common::collections::HashSet;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const ALT: Modifiers = Modifiers(0b0010);
    pub const CTRL: Modifiers = Modifiers(0b0001);
    pub const META: Modifiers = Modifiers(0b1000);
    pub const SHIFT: Modifiers = Modifiers(0b0100);

    pub fn empty() -> Self {
        Modifiers(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: Modifiers) -> bool {
        (self.0 & other.0) == other.0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn insert_from_token(&mut self, token: &str) -> bool {
        match token.to_lowercase().as_str() {
            "ctrl" | "control" => {
                self.insert(Modifiers::CTRL);
                true
            }
            "alt" | "option" => {
                self.insert(Modifiers::ALT);
                true
            }
            "shift" => {
                self.insert(Modifiers::SHIFT);
                true
            }
            "meta" | "cmd" | "command" => {
                self.insert(Modifiers::META);
                true
            }
            _ => false,
        }
    }

    /// Active modifier names in the canonical order: Ctrl, Alt, Shift, Meta.
    pub fn names(&self) -> Vec<&'static str> {
        let mut parts = Vec::new();
        if self.contains(Modifiers::CTRL) {
            parts.push("Ctrl");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::META) {
            parts.push("Meta");
        }
        parts
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join("+"))
    }
}

/// A raw keyboard chord as reported by an input event, pre-normalization.
/// `key` is the logical key value, `code` the physical key code.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Chord {
    pub key: Option<String>,
    pub code: Option<String>,
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Chord {
    pub fn key(key: &str) -> Self {
        Chord { key: Some(key.to_string()), ..Default::default() }
    }

    pub fn keyed(key: &str, code: &str) -> Self {
        Chord {
            key: Some(key.to_string()),
            code: Some(code.to_string()),
            ..Default::default()
        }
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn modifiers(&self) -> Modifiers {
        let mut mods = Modifiers::empty();
        if self.ctrl {
            mods.insert(Modifiers::CTRL);
        }
        if self.alt {
            mods.insert(Modifiers::ALT);
        }
        if self.shift {
            mods.insert(Modifiers::SHIFT);
        }
        if self.meta {
            mods.insert(Modifiers::META);
        }
        mods
    }
}

impl<'de> Deserialize<'de> for Chord {
    fn deserialize<D>(deserializer: D) -> Result<Chord, D::Error>
    where D: serde::Deserializer<'de> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ChordRepr {
            Str(String),
            Map {
                key: Option<String>,
                code: Option<String>,
                #[serde(default)]
                shift: bool,
                #[serde(default)]
                ctrl: bool,
                #[serde(default)]
                alt: bool,
                #[serde(default)]
                meta: bool,
            },
        }

        let repr = ChordRepr::deserialize(deserializer)?;
        match repr {
            ChordRepr::Str(s) => Chord::from_str(&s).map_err(serde::de::Error::custom),
            ChordRepr::Map { key, code, shift, ctrl, alt, meta } => {
                Ok(Chord { key, code, shift, ctrl, alt, meta })
            }
        }
    }
}

impl FromStr for Chord {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> =
            s.split('+').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();

        let mut mods = Modifiers::empty();
        let mut base: Option<&str> = None;
        for part in parts {
            if mods.insert_from_token(part) {
                continue;
            }
            base = Some(part);
        }
        let base = base.ok_or_else(|| anyhow!("no base key in chord: {}", s))?;
        Ok(build_chord(base, mods))
    }
}

/// Canonical string form of a chord: active modifiers in fixed order, then
/// the base key, joined by `+`. Used as the unique key of binding tables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct NormalizedHotkey(String);

impl NormalizedHotkey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn base_key(&self) -> &str {
        self.0.rsplit('+').next().unwrap_or("")
    }

    /// Human-friendly form: digits lose their `Digit` prefix (`Shift+Digit2`
    /// reads `Shift+2`).
    pub fn label(&self) -> String {
        let mut parts: Vec<&str> = self.0.split('+').filter(|p| !p.is_empty()).collect();
        let base = parts.pop().unwrap_or("");
        let base = base.strip_prefix("Digit").unwrap_or(base);
        parts.iter().chain(std::iter::once(&base)).copied().collect::<Vec<_>>().join("+")
    }

    /// Reconstructs a chord that normalizes back to this hotkey.
    pub fn to_chord(&self) -> Option<Chord> {
        let mut parts: Vec<&str> = self.0.split('+').filter(|p| !p.is_empty()).collect();
        let base = parts.pop()?;
        let mut mods = Modifiers::empty();
        for part in parts {
            mods.insert_from_token(part);
        }
        Some(build_chord(base, mods))
    }
}

impl fmt::Display for NormalizedHotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn build_chord(base: &str, mods: Modifiers) -> Chord {
    let is_letter = base.len() == 1 && base.chars().all(|c| c.is_ascii_alphabetic());
    let key = base.strip_prefix("Digit").unwrap_or(base).to_string();
    let code = if is_letter {
        format!("Key{}", base.to_ascii_uppercase())
    } else {
        base.to_string()
    };
    Chord {
        key: Some(key),
        code: Some(code),
        shift: mods.contains(Modifiers::SHIFT),
        ctrl: mods.contains(Modifiers::CTRL),
        alt: mods.contains(Modifiers::ALT),
        meta: mods.contains(Modifiers::META),
    }
}

/// Result of normalizing a raw chord. `normalized` is always populated with
/// whatever could be assembled, even when the chord is invalid, so UI can
/// echo it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalization {
    pub normalized: NormalizedHotkey,
    pub base_key: String,
    pub is_valid: bool,
}

const NON_CHARACTER_CODES: &[&str] = &["Space", "ArrowLeft", "ArrowRight", "ArrowUp", "ArrowDown"];
const MODIFIER_KEY_NAMES: &[&str] = &["Shift", "Control", "Alt", "Meta"];
const MODIFIER_CODE_PREFIXES: &[&str] = &["Shift", "Control", "Alt", "Meta"];

/// Base keys a sequencer binding may use. Reserved playback chords own the
/// punctuation and seek keys, so those never appear here; a sequencer author
/// cannot shadow them by construction.
static SEQUENCER_BASE_KEYS: Lazy<HashSet<String>> = Lazy::new(|| {
    let mut keys = HashSet::default();
    keys.insert("ArrowUp".to_string());
    keys.insert("ArrowDown".to_string());
    for digit in 0..=9 {
        keys.insert(format!("Digit{digit}"));
    }
    for letter in 'A'..='Z' {
        keys.insert(letter.to_string());
    }
    keys
});

pub fn is_sequencer_base_key(base_key: &str) -> bool {
    !base_key.is_empty() && SEQUENCER_BASE_KEYS.contains(base_key)
}

pub fn normalize(chord: &Chord) -> Normalization {
    let base_key = resolve_base_key(chord);
    let mods = chord.modifiers();

    let mut parts: Vec<&str> = mods.names();
    if !base_key.is_empty() {
        parts.push(&base_key);
    }
    let normalized = NormalizedHotkey(parts.join("+"));

    let is_valid =
        !base_key.is_empty() && !is_modifier_key(&base_key, chord.code.as_deref());
    Normalization { normalized, base_key, is_valid }
}

fn resolve_base_key(chord: &Chord) -> String {
    if let Some(code) = chord.code.as_deref()
        && (NON_CHARACTER_CODES.contains(&code)
            || code.starts_with("Digit")
            || code.starts_with("Numpad"))
    {
        return code.to_string();
    }
    if let Some(key) = chord.key.as_deref() {
        if key.len() == 1 && key.chars().all(|c| c.is_ascii_digit()) {
            return format!("Digit{key}");
        }
        if key.chars().count() == 1 {
            return key.to_uppercase();
        }
        return key.to_string();
    }
    chord.code.clone().unwrap_or_default()
}

fn is_modifier_key(base_key: &str, code: Option<&str>) -> bool {
    if MODIFIER_KEY_NAMES.contains(&base_key) {
        return true;
    }
    let Some(code) = code else {
        return false;
    };
    MODIFIER_CODE_PREFIXES.iter().any(|prefix| code.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_case_normalization() {
        let plain = normalize(&Chord::key("a"));
        assert!(plain.is_valid);
        assert_eq!(plain.normalized.as_str(), "A");

        let shifted = normalize(&Chord::key("A").with_shift());
        assert!(shifted.is_valid);
        assert_eq!(shifted.normalized.as_str(), "Shift+A");
    }

    #[test]
    fn test_modifier_order_is_fixed() {
        let chord = Chord::key("k").with_meta().with_shift().with_ctrl().with_alt();
        let norm = normalize(&chord);
        assert_eq!(norm.normalized.as_str(), "Ctrl+Alt+Shift+Meta+K");
    }

    #[test]
    fn test_digits_normalize_to_digit_codes() {
        let norm = normalize(&Chord::keyed("2", "Digit2"));
        assert_eq!(norm.normalized.as_str(), "Digit2");
        assert_eq!(norm.normalized.label(), "2");

        // Without a physical code the logical digit still maps to DigitN.
        let norm = normalize(&Chord::key("7"));
        assert_eq!(norm.normalized.as_str(), "Digit7");
    }

    #[test]
    fn test_non_character_codes_pass_verbatim() {
        let space = normalize(&Chord::keyed(" ", "Space"));
        assert!(space.is_valid);
        assert_eq!(space.normalized.as_str(), "Space");

        let left = normalize(&Chord::keyed("ArrowLeft", "ArrowLeft"));
        assert_eq!(left.normalized.as_str(), "ArrowLeft");

        let numpad = normalize(&Chord::keyed("4", "Numpad4"));
        assert_eq!(numpad.normalized.as_str(), "Numpad4");
    }

    #[test]
    fn test_bare_modifiers_are_invalid() {
        let shift = normalize(&Chord::keyed("Shift", "ShiftLeft").with_shift());
        assert!(!shift.is_valid);

        let empty = normalize(&Chord::default());
        assert!(!empty.is_valid);
        assert_eq!(empty.normalized.as_str(), "");
    }

    #[test]
    fn test_sequencer_allow_list() {
        assert!(is_sequencer_base_key("A"));
        assert!(is_sequencer_base_key("Digit0"));
        assert!(is_sequencer_base_key("ArrowUp"));
        assert!(is_sequencer_base_key("ArrowDown"));
        // Seek keys and punctuation belong to reserved bindings.
        assert!(!is_sequencer_base_key("ArrowLeft"));
        assert!(!is_sequencer_base_key("ArrowRight"));
        assert!(!is_sequencer_base_key("Space"));
        assert!(!is_sequencer_base_key(","));
        assert!(!is_sequencer_base_key(""));
    }

    #[test]
    fn test_normalized_round_trips_through_chord() {
        for raw in ["Shift+A", "Ctrl+Alt+Digit3", "ArrowUp", "Meta+Z"] {
            let chord: Chord = raw.parse().unwrap();
            let norm = normalize(&chord);
            assert!(norm.is_valid, "{raw} should be valid");
            assert_eq!(norm.normalized.as_str(), raw);

            let rebuilt = norm.normalized.to_chord().unwrap();
            assert_eq!(normalize(&rebuilt).normalized, norm.normalized);
        }
    }

    #[test]
    fn test_chord_from_str_rejects_modifier_only() {
        assert!("Ctrl+Shift".parse::<Chord>().is_err());
        assert!("".parse::<Chord>().is_err());
    }

    #[test]
    fn test_chord_deserializes_from_string_or_map() {
        let from_str: Chord = serde_json::from_str("\"Shift+2\"").unwrap();
        assert_eq!(normalize(&from_str).normalized.as_str(), "Shift+Digit2");

        let from_map: Chord =
            serde_json::from_str(r#"{"key": "a", "code": "KeyA", "ctrl": true}"#).unwrap();
        assert_eq!(normalize(&from_map).normalized.as_str(), "Ctrl+A");
    }
}
