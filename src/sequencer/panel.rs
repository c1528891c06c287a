use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::common::collections::HashSet;
use crate::hotkey::NormalizedHotkey;

const DEFAULT_PANEL_NAME: &str = "My Panel";

#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Limited,
    Indefinite,
}

#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LabelMode {
    Once,
    Indefinite,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventBtn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hotkey: Option<NormalizedHotkey>,
    #[serde(default)]
    pub deactivate_ids: Vec<String>,
    #[serde(default)]
    pub activate_ids: Vec<String>,
    pub kind: EventKind,
    #[serde(default)]
    pub pre_ms: u64,
    #[serde(default)]
    pub post_ms: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LabelBtn {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub hotkey: Option<NormalizedHotkey>,
    #[serde(default)]
    pub deactivate_ids: Vec<String>,
    #[serde(default)]
    pub activate_ids: Vec<String>,
    pub mode: LabelMode,
}

/// A sequencer button: a clip-marking event or an annotation label,
/// discriminated by a tag field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequencerBtn {
    Event(EventBtn),
    Label(LabelBtn),
}

impl SequencerBtn {
    pub fn id(&self) -> &str {
        match self {
            SequencerBtn::Event(btn) => &btn.id,
            SequencerBtn::Label(btn) => &btn.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SequencerBtn::Event(btn) => &btn.name,
            SequencerBtn::Label(btn) => &btn.name,
        }
    }

    pub fn hotkey(&self) -> Option<&NormalizedHotkey> {
        match self {
            SequencerBtn::Event(btn) => btn.hotkey.as_ref(),
            SequencerBtn::Label(btn) => btn.hotkey.as_ref(),
        }
    }

    pub fn deactivate_ids(&self) -> &[String] {
        match self {
            SequencerBtn::Event(btn) => &btn.deactivate_ids,
            SequencerBtn::Label(btn) => &btn.deactivate_ids,
        }
    }

    pub fn activate_ids(&self) -> &[String] {
        match self {
            SequencerBtn::Event(btn) => &btn.activate_ids,
            SequencerBtn::Label(btn) => &btn.activate_ids,
        }
    }

    /// True for buttons with persistent on/off state: indefinite events and
    /// indefinite labels. Limited events and once labels are one-shot.
    pub fn is_indefinite(&self) -> bool {
        match self {
            SequencerBtn::Event(btn) => btn.kind == EventKind::Indefinite,
            SequencerBtn::Label(btn) => btn.mode == LabelMode::Indefinite,
        }
    }

    pub fn set_hotkey(&mut self, hotkey: Option<NormalizedHotkey>) {
        match self {
            SequencerBtn::Event(btn) => btn.hotkey = hotkey,
            SequencerBtn::Label(btn) => btn.hotkey = hotkey,
        }
    }

    fn normalize_links(&mut self) {
        match self {
            SequencerBtn::Event(btn) => {
                btn.deactivate_ids = normalize_link_ids(&btn.deactivate_ids);
                btn.activate_ids = normalize_link_ids(&btn.activate_ids);
            }
            SequencerBtn::Label(btn) => {
                btn.deactivate_ids = normalize_link_ids(&btn.deactivate_ids);
                btn.activate_ids = normalize_link_ids(&btn.activate_ids);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("button id {0:?} is unavailable")]
    IdUnavailable(String),
}

/// Trimmed, de-duplicated link-id list; order preserved.
fn normalize_link_ids(ids: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::default();
    ids.iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

/// The set of sequencer buttons plus the panel-level flags the dispatch path
/// consults (edit mode suspends sequencer hotkeys and triggers).
pub struct SequencerPanel {
    panel_name: String,
    edit_mode: bool,
    buttons: Vec<SequencerBtn>,
}

impl Default for SequencerPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerPanel {
    pub fn new() -> Self {
        Self {
            panel_name: DEFAULT_PANEL_NAME.to_string(),
            edit_mode: false,
            buttons: Vec::new(),
        }
    }

    pub fn panel_name(&self) -> &str {
        &self.panel_name
    }

    pub fn set_panel_name(&mut self, name: &str) {
        let trimmed = name.trim();
        self.panel_name =
            if trimmed.is_empty() { DEFAULT_PANEL_NAME.to_string() } else { trimmed.to_string() };
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
    }

    pub fn toggle_edit_mode(&mut self) {
        self.edit_mode = !self.edit_mode;
    }

    pub fn buttons(&self) -> &[SequencerBtn] {
        &self.buttons
    }

    pub fn add_event(&mut self, btn: EventBtn) -> Result<(), PanelError> {
        self.add(SequencerBtn::Event(btn))
    }

    pub fn add_label(&mut self, btn: LabelBtn) -> Result<(), PanelError> {
        self.add(SequencerBtn::Label(btn))
    }

    fn add(&mut self, mut btn: SequencerBtn) -> Result<(), PanelError> {
        let id = btn.id().trim().to_string();
        if !self.is_id_available(&id) {
            return Err(PanelError::IdUnavailable(id));
        }
        match &mut btn {
            SequencerBtn::Event(event) => event.id = id,
            SequencerBtn::Label(label) => label.id = id,
        }
        btn.normalize_links();
        debug!(target: "sequencer", id = %btn.id(), name = %btn.name(), "button added");
        self.buttons.push(btn);
        Ok(())
    }

    /// Applies an edit to an existing button. The id is immutable: whatever
    /// the closure does to it is reverted. Link lists are re-normalized.
    pub fn update<F>(&mut self, id: &str, patch: F) -> bool
    where F: FnOnce(&mut SequencerBtn) {
        let id = id.trim();
        let Some(btn) = self.buttons.iter_mut().find(|btn| btn.id() == id) else {
            return false;
        };
        let original_id = btn.id().to_string();
        patch(btn);
        match btn {
            SequencerBtn::Event(event) => event.id = original_id,
            SequencerBtn::Label(label) => label.id = original_id,
        }
        btn.normalize_links();
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<SequencerBtn> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        let index = self.buttons.iter().position(|btn| btn.id() == id)?;
        Some(self.buttons.remove(index))
    }

    /// Case-insensitive uniqueness check; blank ids are never available.
    pub fn is_id_available(&self, id: &str) -> bool {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return false;
        }
        !self.buttons.iter().any(|btn| btn.id().eq_ignore_ascii_case(trimmed))
    }

    pub fn get(&self, id: &str) -> Option<&SequencerBtn> {
        self.buttons.iter().find(|btn| btn.id() == id)
    }

    pub fn set_hotkey(&mut self, id: &str, hotkey: Option<NormalizedHotkey>) -> bool {
        let Some(btn) = self.buttons.iter_mut().find(|btn| btn.id() == id) else {
            return false;
        };
        btn.set_hotkey(hotkey);
        true
    }

    pub fn all_ids(&self) -> Vec<&str> {
        self.buttons.iter().map(|btn| btn.id()).collect()
    }

    /// Name shown for a button id; falls back to the id itself for stale
    /// links.
    pub fn display_name(&self, id: &str) -> String {
        self.get(id).map(|btn| btn.name().to_string()).unwrap_or_else(|| id.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{event, label};
    use super::*;

    #[test]
    fn test_id_uniqueness_is_case_insensitive() {
        let mut panel = SequencerPanel::new();
        panel.add_event(event("Sprint", "Sprint", EventKind::Indefinite)).unwrap();

        let dup = panel.add_event(event("sprint", "Sprint 2", EventKind::Limited));
        assert_eq!(dup, Err(PanelError::IdUnavailable("sprint".to_string())));

        assert!(!panel.is_id_available("SPRINT"));
        assert!(panel.is_id_available("tackle"));
    }

    #[test]
    fn test_blank_ids_are_rejected() {
        let mut panel = SequencerPanel::new();
        let result = panel.add_label(label("   ", "blank", LabelMode::Once));
        assert!(result.is_err());
        assert!(!panel.is_id_available("  "));
    }

    #[test]
    fn test_add_trims_id_and_normalizes_links() {
        let mut panel = SequencerPanel::new();
        let mut btn = event(" evt-1 ", "one", EventKind::Indefinite);
        btn.deactivate_ids =
            vec![" a ".to_string(), "b".to_string(), "a".to_string(), "".to_string()];
        panel.add_event(btn).unwrap();

        let stored = panel.get("evt-1").unwrap();
        assert_eq!(stored.id(), "evt-1");
        assert_eq!(stored.deactivate_ids(), ["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_update_keeps_id_immutable() {
        let mut panel = SequencerPanel::new();
        panel.add_event(event("evt-1", "one", EventKind::Indefinite)).unwrap();

        let updated = panel.update("evt-1", |btn| {
            if let SequencerBtn::Event(event) = btn {
                event.id = "evt-hijacked".to_string();
                event.name = "renamed".to_string();
                event.activate_ids = vec![" x ".to_string(), "x".to_string()];
            }
        });
        assert!(updated);

        let stored = panel.get("evt-1").unwrap();
        assert_eq!(stored.name(), "renamed");
        assert_eq!(stored.activate_ids(), ["x".to_string()]);
        assert!(panel.get("evt-hijacked").is_none());
    }

    #[test]
    fn test_remove_returns_button() {
        let mut panel = SequencerPanel::new();
        panel.add_label(label("lbl-1", "good", LabelMode::Once)).unwrap();

        let removed = panel.remove("lbl-1").unwrap();
        assert_eq!(removed.id(), "lbl-1");
        assert!(panel.remove("lbl-1").is_none());
        assert!(panel.is_id_available("lbl-1"));
    }

    #[test]
    fn test_all_ids_in_declaration_order() {
        let mut panel = SequencerPanel::new();
        panel.add_event(event("evt-1", "one", EventKind::Limited)).unwrap();
        panel.add_label(label("lbl-1", "two", LabelMode::Once)).unwrap();
        panel.add_event(event("evt-2", "three", EventKind::Indefinite)).unwrap();

        assert_eq!(panel.all_ids(), ["evt-1", "lbl-1", "evt-2"]);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut panel = SequencerPanel::new();
        panel.add_event(event("evt-1", "Sprint", EventKind::Limited)).unwrap();
        assert_eq!(panel.display_name("evt-1"), "Sprint");
        assert_eq!(panel.display_name("gone"), "gone");
    }

    #[test]
    fn test_panel_name_trims_and_defaults() {
        let mut panel = SequencerPanel::new();
        assert_eq!(panel.panel_name(), "My Panel");

        panel.set_panel_name("  First Half  ");
        assert_eq!(panel.panel_name(), "First Half");

        panel.set_panel_name("   ");
        assert_eq!(panel.panel_name(), "My Panel");
    }

    #[test]
    fn test_edit_mode_toggle() {
        let mut panel = SequencerPanel::new();
        assert!(!panel.edit_mode());
        panel.toggle_edit_mode();
        assert!(panel.edit_mode());
        panel.set_edit_mode(false);
        assert!(!panel.edit_mode());
    }

    #[test]
    fn test_indefinite_classification() {
        let evt = SequencerBtn::Event(event("e", "e", EventKind::Indefinite));
        let lim = SequencerBtn::Event(event("l", "l", EventKind::Limited));
        let lbl = SequencerBtn::Label(label("a", "a", LabelMode::Indefinite));
        let once = SequencerBtn::Label(label("o", "o", LabelMode::Once));
        assert!(evt.is_indefinite());
        assert!(!lim.is_indefinite());
        assert!(lbl.is_indefinite());
        assert!(!once.is_indefinite());
    }
}
