use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use super::chord::{Chord, NormalizedHotkey, is_sequencer_base_key, normalize};
use crate::common::collections::HashMap;
use crate::media::TransportAction;

/// Who currently owns a normalized chord.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum HotkeyOwner {
    Reserved { label: String },
    Sequencer { action_id: String, label: Option<String> },
}

impl HotkeyOwner {
    pub fn label(&self) -> Option<&str> {
        match self {
            HotkeyOwner::Reserved { label } => Some(label),
            HotkeyOwner::Sequencer { label, .. } => label.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyRegisterError {
    #[error("chord {normalized} cannot be used as a sequencer hotkey")]
    InvalidChord { normalized: NormalizedHotkey },
    #[error("chord {normalized} is reserved")]
    ReservedHotkey { normalized: NormalizedHotkey, used_by: HotkeyOwner },
    #[error("chord {normalized} is already assigned")]
    AlreadyUsed { normalized: NormalizedHotkey, used_by: HotkeyOwner },
}

/// Side-effect-free availability check, for live conflict preview in a
/// hotkey-picker UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotkeyUsage {
    pub normalized: NormalizedHotkey,
    pub is_valid: bool,
    pub used_by: Option<HotkeyOwner>,
}

#[derive(Debug, Clone, PartialEq)]
struct ReservedBinding {
    action: TransportAction,
    label: String,
    allow_repeat: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SequencerBinding {
    action_id: String,
    label: Option<String>,
    allow_repeat: bool,
}

/// One keydown as seen by the dispatcher. `from_text_input` is true when the
/// event target (or the focused element) is a text-editing surface; such
/// events are ignored before any binding lookup.
#[derive(Debug, Clone, Default)]
pub struct KeyInput {
    pub chord: Chord,
    pub repeat: bool,
    pub from_text_input: bool,
}

impl KeyInput {
    pub fn chord(chord: Chord) -> Self {
        KeyInput { chord, ..Default::default() }
    }
}

/// What a dispatched keydown resolved to. The caller routes reserved actions
/// to the transport and sequencer actions to the runtime; receiving `Some`
/// also means the event's default handling must be suppressed.
#[derive(Debug, Clone, PartialEq)]
pub enum HotkeyInvocation {
    Reserved(TransportAction),
    Sequencer { action_id: String },
}

/// Chord-to-binding tables: fixed reserved bindings and user-assignable
/// sequencer bindings, the latter a bijection with action ids.
#[derive(Default)]
pub struct HotkeyManager {
    enabled: bool,
    reserved: HashMap<NormalizedHotkey, ReservedBinding>,
    sequencer: HashMap<NormalizedHotkey, SequencerBinding>,
    action_to_chord: HashMap<String, NormalizedHotkey>,
}

impl HotkeyManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Installs the fixed playback-control bindings. Replaces any previously
    /// installed reserved set.
    pub fn init_reserved_transport_hotkeys(&mut self) {
        self.reserved.clear();
        self.register_reserved(
            Chord::keyed(" ", "Space"),
            TransportAction::TogglePlayPause,
            "Play/Pause",
            false,
        );
        self.register_reserved(
            Chord::keyed("ArrowLeft", "ArrowLeft"),
            TransportAction::SeekBy { ms: -1000.0 },
            "Back 1s",
            true,
        );
        self.register_reserved(
            Chord::keyed("ArrowRight", "ArrowRight"),
            TransportAction::SeekBy { ms: 1000.0 },
            "Forward 1s",
            true,
        );
        self.register_reserved(
            Chord::keyed(",", "Comma"),
            TransportAction::StepFrames { frames: -1 },
            "Frame -1",
            true,
        );
        self.register_reserved(
            Chord::keyed(".", "Period"),
            TransportAction::StepFrames { frames: 1 },
            "Frame +1",
            true,
        );
        self.register_reserved(
            Chord::keyed("/", "Slash"),
            TransportAction::RateBy { delta: 0.25 },
            "Speed +",
            true,
        );
        self.register_reserved(
            Chord::keyed("-", "Minus"),
            TransportAction::RateBy { delta: -0.25 },
            "Speed -",
            true,
        );
    }

    fn register_reserved(
        &mut self,
        chord: Chord,
        action: TransportAction,
        label: &str,
        allow_repeat: bool,
    ) {
        let norm = normalize(&chord);
        if !norm.is_valid {
            debug!(target: "hotkeys", chord = ?chord, "skipping invalid reserved chord");
            return;
        }
        self.reserved.insert(
            norm.normalized,
            ReservedBinding { action, label: label.to_string(), allow_repeat },
        );
    }

    /// Binds a chord to a sequencer action. One chord per action: a previous
    /// binding owned by the same action is released first.
    pub fn register_sequencer_hotkey(
        &mut self,
        chord: &Chord,
        action_id: &str,
        label: Option<&str>,
        allow_repeat: bool,
    ) -> Result<NormalizedHotkey, HotkeyRegisterError> {
        let norm = normalize(chord);
        if !norm.is_valid || !is_sequencer_base_key(&norm.base_key) {
            return Err(HotkeyRegisterError::InvalidChord { normalized: norm.normalized });
        }

        if let Some(reserved) = self.reserved.get(&norm.normalized) {
            return Err(HotkeyRegisterError::ReservedHotkey {
                normalized: norm.normalized,
                used_by: HotkeyOwner::Reserved { label: reserved.label.clone() },
            });
        }

        if let Some(existing) = self.sequencer.get(&norm.normalized)
            && existing.action_id != action_id
        {
            return Err(HotkeyRegisterError::AlreadyUsed {
                normalized: norm.normalized,
                used_by: HotkeyOwner::Sequencer {
                    action_id: existing.action_id.clone(),
                    label: existing.label.clone(),
                },
            });
        }

        if let Some(previous) = self.action_to_chord.get(action_id)
            && *previous != norm.normalized
        {
            let previous = previous.clone();
            self.sequencer.remove(&previous);
            self.action_to_chord.remove(action_id);
        }

        debug!(target: "hotkeys", %action_id, hotkey = %norm.normalized, "sequencer hotkey registered");
        self.sequencer.insert(
            norm.normalized.clone(),
            SequencerBinding {
                action_id: action_id.to_string(),
                label: label.map(str::to_string),
                allow_repeat,
            },
        );
        self.action_to_chord.insert(action_id.to_string(), norm.normalized.clone());
        Ok(norm.normalized)
    }

    pub fn unassign_sequencer_hotkey(&mut self, chord: &Chord) -> bool {
        let norm = normalize(chord);
        if norm.normalized.as_str().is_empty() {
            return false;
        }
        let Some(binding) = self.sequencer.remove(&norm.normalized) else {
            return false;
        };
        self.action_to_chord.remove(&binding.action_id);
        true
    }

    pub fn unassign_sequencer_hotkey_by_action(&mut self, action_id: &str) -> bool {
        let Some(normalized) = self.action_to_chord.remove(action_id) else {
            return false;
        };
        self.sequencer.remove(&normalized);
        true
    }

    pub fn clear_sequencer_hotkeys(&mut self) {
        self.sequencer.clear();
        self.action_to_chord.clear();
    }

    pub fn sequencer_hotkey_for_action(&self, action_id: &str) -> Option<&NormalizedHotkey> {
        self.action_to_chord.get(action_id)
    }

    pub fn used_hotkeys(&self) -> Vec<(NormalizedHotkey, HotkeyOwner)> {
        let reserved = self.reserved.iter().map(|(normalized, binding)| {
            (normalized.clone(), HotkeyOwner::Reserved { label: binding.label.clone() })
        });
        let sequencer = self.sequencer.iter().map(|(normalized, binding)| {
            (
                normalized.clone(),
                HotkeyOwner::Sequencer {
                    action_id: binding.action_id.clone(),
                    label: binding.label.clone(),
                },
            )
        });
        reserved.chain(sequencer).collect()
    }

    /// Availability preview. `editing_action` suppresses the self-conflict: a
    /// chord already owned by the entity being edited reports as unused.
    pub fn is_hotkey_used(&self, chord: &Chord, editing_action: Option<&str>) -> HotkeyUsage {
        let norm = normalize(chord);
        let is_valid = norm.is_valid && is_sequencer_base_key(&norm.base_key);
        if norm.normalized.as_str().is_empty() || !is_valid {
            return HotkeyUsage { normalized: norm.normalized, is_valid, used_by: None };
        }

        if let Some(reserved) = self.reserved.get(&norm.normalized) {
            return HotkeyUsage {
                normalized: norm.normalized,
                is_valid,
                used_by: Some(HotkeyOwner::Reserved { label: reserved.label.clone() }),
            };
        }

        if let Some(binding) = self.sequencer.get(&norm.normalized) {
            if editing_action == Some(binding.action_id.as_str()) {
                return HotkeyUsage { normalized: norm.normalized, is_valid, used_by: None };
            }
            return HotkeyUsage {
                normalized: norm.normalized,
                is_valid,
                used_by: Some(HotkeyOwner::Sequencer {
                    action_id: binding.action_id.clone(),
                    label: binding.label.clone(),
                }),
            };
        }

        HotkeyUsage { normalized: norm.normalized, is_valid, used_by: None }
    }

    /// Resolves one keydown. Sequencer bindings are consulted only outside
    /// edit mode; reserved bindings always apply. `None` means the event
    /// should propagate normally.
    pub fn dispatch(&self, input: &KeyInput, edit_mode: bool) -> Option<HotkeyInvocation> {
        if !self.enabled || input.from_text_input {
            return None;
        }

        let norm = normalize(&input.chord);
        if !norm.is_valid {
            return None;
        }

        if !edit_mode
            && let Some(binding) = self.sequencer.get(&norm.normalized)
        {
            if input.repeat && !binding.allow_repeat {
                return None;
            }
            trace!(target: "hotkeys", hotkey = %norm.normalized, action_id = %binding.action_id, "sequencer hotkey dispatched");
            return Some(HotkeyInvocation::Sequencer { action_id: binding.action_id.clone() });
        }

        let binding = self.reserved.get(&norm.normalized)?;
        if input.repeat && !binding.allow_repeat {
            return None;
        }
        trace!(target: "hotkeys", hotkey = %norm.normalized, action = %binding.action, "reserved hotkey dispatched");
        Some(HotkeyInvocation::Reserved(binding.action))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn enabled_manager() -> HotkeyManager {
        let mut manager = HotkeyManager::new();
        manager.init_reserved_transport_hotkeys();
        manager.enable();
        manager
    }

    fn space() -> KeyInput {
        KeyInput::chord(Chord::keyed(" ", "Space"))
    }

    #[test]
    fn test_reserved_dispatch_without_focus() {
        let manager = enabled_manager();
        assert_eq!(
            manager.dispatch(&space(), false),
            Some(HotkeyInvocation::Reserved(TransportAction::TogglePlayPause))
        );
    }

    #[test]
    fn test_dispatch_ignored_while_typing() {
        let manager = enabled_manager();
        let input = KeyInput { from_text_input: true, ..space() };
        assert_eq!(manager.dispatch(&input, false), None);
    }

    #[test]
    fn test_dispatch_ignored_while_disabled() {
        let mut manager = enabled_manager();
        manager.disable();
        assert_eq!(manager.dispatch(&space(), false), None);
    }

    #[test]
    fn test_repeat_suppressed_unless_allowed() {
        let manager = enabled_manager();

        let repeated_space = KeyInput { repeat: true, ..space() };
        assert_eq!(manager.dispatch(&repeated_space, false), None);

        let repeated_seek = KeyInput {
            repeat: true,
            ..KeyInput::chord(Chord::keyed("ArrowLeft", "ArrowLeft"))
        };
        assert_eq!(
            manager.dispatch(&repeated_seek, false),
            Some(HotkeyInvocation::Reserved(TransportAction::SeekBy { ms: -1000.0 }))
        );
    }

    #[test]
    fn test_reserved_chords_refused_for_sequencer() {
        let mut manager = enabled_manager();
        let result =
            manager.register_sequencer_hotkey(&Chord::keyed(" ", "Space"), "seq:test", None, false);
        match result {
            Err(HotkeyRegisterError::InvalidChord { .. }) => {
                // Space is refused even earlier: it is not an allowed
                // sequencer base key.
            }
            other => panic!("expected InvalidChord, got {other:?}"),
        }

        // A chord that passes the allow-list but matches a reserved binding
        // still fails, regardless of registration order.
        manager.reserved.insert(
            normalize(&Chord::key("p")).normalized,
            ReservedBinding {
                action: TransportAction::TogglePlayPause,
                label: "Play/Pause".to_string(),
                allow_repeat: false,
            },
        );
        let result = manager.register_sequencer_hotkey(&Chord::key("p"), "seq:test", None, false);
        match result {
            Err(HotkeyRegisterError::ReservedHotkey { used_by, .. }) => {
                assert_eq!(used_by.label(), Some("Play/Pause"));
            }
            other => panic!("expected ReservedHotkey, got {other:?}"),
        }
    }

    #[test]
    fn test_hotkey_bijection() {
        let mut manager = enabled_manager();

        let first =
            manager.register_sequencer_hotkey(&Chord::key("a"), "seq:first", Some("First"), false);
        assert_eq!(first.unwrap().as_str(), "A");

        let second =
            manager.register_sequencer_hotkey(&Chord::key("a"), "seq:second", None, false);
        match second {
            Err(HotkeyRegisterError::AlreadyUsed { used_by, .. }) => {
                assert_eq!(
                    used_by,
                    HotkeyOwner::Sequencer {
                        action_id: "seq:first".to_string(),
                        label: Some("First".to_string()),
                    }
                );
            }
            other => panic!("expected AlreadyUsed, got {other:?}"),
        }

        assert!(manager.unassign_sequencer_hotkey_by_action("seq:first"));
        let retry = manager.register_sequencer_hotkey(&Chord::key("a"), "seq:second", None, false);
        assert!(retry.is_ok());
    }

    #[test]
    fn test_rebinding_action_releases_old_chord() {
        let mut manager = enabled_manager();
        manager.register_sequencer_hotkey(&Chord::key("a"), "seq:one", None, false).unwrap();
        manager.register_sequencer_hotkey(&Chord::key("b"), "seq:one", None, false).unwrap();

        // "A" is free again.
        assert!(manager.register_sequencer_hotkey(&Chord::key("a"), "seq:two", None, false).is_ok());
        assert_eq!(
            manager.sequencer_hotkey_for_action("seq:one").map(|h| h.as_str()),
            Some("B")
        );
    }

    #[test]
    fn test_unassign_by_chord_frees_for_reuse() {
        let mut manager = enabled_manager();
        manager.register_sequencer_hotkey(&Chord::key("b"), "seq:remove", None, false).unwrap();

        assert!(manager.unassign_sequencer_hotkey(&Chord::key("b")));
        assert!(!manager.unassign_sequencer_hotkey(&Chord::key("b")));

        assert!(
            manager.register_sequencer_hotkey(&Chord::key("b"), "seq:reuse", None, false).is_ok()
        );
    }

    #[test]
    fn test_distinct_chords_for_digit_and_shift_digit() {
        let mut manager = enabled_manager();
        let plain =
            manager.register_sequencer_hotkey(&Chord::keyed("2", "Digit2"), "seq:two", None, false);
        let shifted = manager.register_sequencer_hotkey(
            &Chord::keyed("2", "Digit2").with_shift(),
            "seq:shift-two",
            None,
            false,
        );
        assert_eq!(plain.unwrap().as_str(), "Digit2");
        assert_eq!(shifted.unwrap().as_str(), "Shift+Digit2");
    }

    #[test]
    fn test_edit_mode_suspends_sequencer_but_not_reserved() {
        let mut manager = enabled_manager();
        manager.register_sequencer_hotkey(&Chord::key("a"), "seq:a", None, false).unwrap();

        let input = KeyInput::chord(Chord::key("a"));
        assert_eq!(
            manager.dispatch(&input, false),
            Some(HotkeyInvocation::Sequencer { action_id: "seq:a".to_string() })
        );
        assert_eq!(manager.dispatch(&input, true), None);
        assert!(manager.dispatch(&space(), true).is_some());
    }

    #[test]
    fn test_is_hotkey_used_preview() {
        let mut manager = enabled_manager();
        manager
            .register_sequencer_hotkey(&Chord::key("c"), "seq:c", Some("Corner"), false)
            .unwrap();

        let usage = manager.is_hotkey_used(&Chord::key("c"), None);
        assert!(usage.is_valid);
        assert_eq!(
            usage.used_by,
            Some(HotkeyOwner::Sequencer {
                action_id: "seq:c".to_string(),
                label: Some("Corner".to_string()),
            })
        );

        // Self-conflict suppressed while editing the owning action.
        let usage = manager.is_hotkey_used(&Chord::key("c"), Some("seq:c"));
        assert_eq!(usage.used_by, None);

        // Disallowed base key previews as invalid, not as used.
        let usage = manager.is_hotkey_used(&Chord::keyed(" ", "Space"), None);
        assert!(!usage.is_valid);
        assert_eq!(usage.used_by, None);

        let free = manager.is_hotkey_used(&Chord::key("z"), None);
        assert!(free.is_valid);
        assert_eq!(free.used_by, None);
    }

    #[test]
    fn test_used_hotkeys_enumerates_both_tables() {
        let mut manager = enabled_manager();
        manager
            .register_sequencer_hotkey(&Chord::key("a"), "seq:a", Some("Mark A"), false)
            .unwrap();

        let used = manager.used_hotkeys();
        // The seven reserved transport bindings plus the one just added.
        assert_eq!(used.len(), 8);
        assert!(used.iter().any(|(hotkey, owner)| {
            hotkey.as_str() == "A"
                && *owner
                    == HotkeyOwner::Sequencer {
                        action_id: "seq:a".to_string(),
                        label: Some("Mark A".to_string()),
                    }
        }));
        assert!(used.iter().any(|(hotkey, owner)| {
            hotkey.as_str() == "Space" && owner.label() == Some("Play/Pause")
        }));
    }

    #[test]
    fn test_clear_sequencer_hotkeys_leaves_reserved_intact() {
        let mut manager = enabled_manager();
        manager.register_sequencer_hotkey(&Chord::key("a"), "seq:a", None, false).unwrap();
        manager.register_sequencer_hotkey(&Chord::key("b"), "seq:b", None, false).unwrap();

        manager.clear_sequencer_hotkeys();
        assert_eq!(manager.sequencer_hotkey_for_action("seq:a"), None);
        assert_eq!(manager.used_hotkeys().len(), 7);
        assert!(manager.dispatch(&space(), false).is_some());
        assert!(
            manager.register_sequencer_hotkey(&Chord::key("a"), "seq:other", None, false).is_ok()
        );
    }

    #[test]
    fn test_no_binding_is_a_noop() {
        let manager = enabled_manager();
        assert_eq!(manager.dispatch(&KeyInput::chord(Chord::key("q")), false), None);
    }
}
