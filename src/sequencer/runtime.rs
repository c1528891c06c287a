use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::panel::{EventKind, LabelMode, SequencerBtn, SequencerPanel};
use crate::common::collections::{HashMap, HashSet};
use crate::hotkey::NormalizedHotkey;

/// How long a trigger keeps the "last triggered" highlight alive. Each new
/// trigger replaces the previous deadline.
pub const LAST_TRIGGER_CLEAR: Duration = Duration::from_millis(200);
const RECENT_TRIGGER_CAP: usize = 10;

#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerSource {
    Hotkey,
    Click,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEntry {
    pub at: Instant,
    pub source: TriggerSource,
    pub btn_id: String,
    pub name: String,
    pub hotkey: Option<NormalizedHotkey>,
}

/// Trigger state machine for the sequencer buttons: active/inactive flags for
/// indefinite entities, once-label attachment, link cascades, telemetry, and
/// the ordered activity log the UI renders verbatim.
#[derive(Default)]
pub struct SequencerRuntime {
    trigger_counts: HashMap<String, u64>,
    recent_triggers: Vec<TriggerEntry>,
    last_triggered: Option<(String, Instant)>,
    active: HashSet<String>,
    applied_labels: HashMap<String, Vec<String>>,
    activity: Vec<String>,
}

impl SequencerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self, btn_id: &str) -> bool {
        self.active.contains(btn_id)
    }

    pub fn trigger_count(&self, btn_id: &str) -> u64 {
        self.trigger_counts.get(btn_id).copied().unwrap_or(0)
    }

    /// Recent triggers, newest first, capped at 10 entries.
    pub fn recent_triggers(&self) -> &[TriggerEntry] {
        &self.recent_triggers
    }

    /// Id of the most recently triggered button, until its highlight window
    /// has elapsed.
    pub fn last_triggered(&self, now: Instant) -> Option<&str> {
        match &self.last_triggered {
            Some((id, deadline)) if now < *deadline => Some(id),
            _ => None,
        }
    }

    /// Activity log lines in emission order.
    pub fn activity(&self) -> &[String] {
        &self.activity
    }

    pub fn take_activity(&mut self) -> Vec<String> {
        std::mem::take(&mut self.activity)
    }

    /// Fires one button: telemetry, the button's own effect, its link
    /// cascades (deactivate first, then activate; labels before events in
    /// each list), and a final summary line. No-op while the panel is in
    /// edit mode or for unknown ids.
    pub fn trigger(
        &mut self,
        btn_id: &str,
        source: TriggerSource,
        panel: &SequencerPanel,
        now: Instant,
    ) {
        if panel.edit_mode() {
            return;
        }
        let Some(btn) = panel.get(btn_id) else {
            return;
        };

        self.record_telemetry(btn, source, now);

        // Own effect. Labels remember which indefinite events were active at
        // this point; their summary line reports that snapshot even if the
        // cascades change it.
        let mut label_targets: Vec<String> = Vec::new();
        match btn {
            SequencerBtn::Event(event) => {
                if event.kind == EventKind::Indefinite {
                    let next = !self.active.contains(&event.id);
                    self.set_indefinite_state(&event.id, next, panel);
                }
            }
            SequencerBtn::Label(label) => {
                label_targets = self.active_event_names(panel);
                match label.mode {
                    LabelMode::Indefinite => {
                        let next = !self.active.contains(&label.id);
                        self.set_indefinite_state(&label.id, next, panel);
                    }
                    LabelMode::Once => {
                        self.log(format!(
                            "LABEL ONCE {} TRIGGERED | ApplyToEvents=[{}]",
                            label.name,
                            label_targets.join(", ")
                        ));
                        self.attach_once_label(&label.id, panel);
                    }
                }
            }
        }

        self.apply_links(btn.deactivate_ids(), false, panel);
        self.apply_links(btn.activate_ids(), true, panel);

        match btn {
            SequencerBtn::Event(event) => {
                let labels = self.active_label_names(panel);
                self.log(format!(
                    "EVENT {} TRIGGERED | LabelsActive=[{}]",
                    event.name,
                    labels.join(", ")
                ));
            }
            SequencerBtn::Label(label) => {
                self.log(format!(
                    "LABEL {} TRIGGERED | ApplyToEvents=[{}]",
                    label.name,
                    label_targets.join(", ")
                ));
            }
        }
    }

    fn record_telemetry(&mut self, btn: &SequencerBtn, source: TriggerSource, now: Instant) {
        *self.trigger_counts.entry(btn.id().to_string()).or_insert(0) += 1;

        self.recent_triggers.insert(
            0,
            TriggerEntry {
                at: now,
                source,
                btn_id: btn.id().to_string(),
                name: btn.name().to_string(),
                hotkey: btn.hotkey().cloned(),
            },
        );
        self.recent_triggers.truncate(RECENT_TRIGGER_CAP);

        self.last_triggered = Some((btn.id().to_string(), now + LAST_TRIGGER_CLEAR));
    }

    /// Applies one link list. Within the list, indefinite labels are
    /// processed before events so a label deactivation is visible to the
    /// event's own end-of-cycle line.
    fn apply_links(&mut self, ids: &[String], on: bool, panel: &SequencerPanel) {
        let labels = ids
            .iter()
            .filter(|id| matches!(panel.get(id), Some(SequencerBtn::Label(_))));
        let events = ids
            .iter()
            .filter(|id| matches!(panel.get(id), Some(SequencerBtn::Event(_))));
        for id in labels.chain(events) {
            self.set_indefinite_state(id, on, panel);
        }
    }

    /// Flips one indefinite button's active flag and logs the transition.
    /// Unknown ids, non-indefinite buttons, and requests matching the
    /// current state are silent no-ops.
    fn set_indefinite_state(&mut self, id: &str, on: bool, panel: &SequencerPanel) {
        let Some(btn) = panel.get(id) else {
            return;
        };
        if !btn.is_indefinite() || self.active.contains(id) == on {
            return;
        }

        if on {
            self.active.insert(id.to_string());
            match btn {
                SequencerBtn::Event(event) => {
                    self.log(format!("EVENT INDEFINITE {} START", event.name));
                }
                SequencerBtn::Label(label) => {
                    self.log(format!("LABEL INDEFINITE {} START", label.name));
                }
            }
        } else {
            self.active.remove(id);
            match btn {
                SequencerBtn::Event(event) => {
                    // The end line reports the once-labels applied during the
                    // event plus any indefinite labels still active, then the
                    // applied set is dropped.
                    let mut labels: Vec<String> = self
                        .applied_labels
                        .remove(id)
                        .unwrap_or_default()
                        .iter()
                        .map(|label_id| panel.display_name(label_id))
                        .collect();
                    labels.extend(self.active_label_names(panel));
                    self.log(format!(
                        "EVENT INDEFINITE {} ENDED | Labels=[{}]",
                        event.name,
                        labels.join(", ")
                    ));
                }
                SequencerBtn::Label(label) => {
                    self.log(format!("LABEL INDEFINITE {} ENDED", label.name));
                }
            }
        }
    }

    /// Permanently attaches a once-label to every indefinite event active
    /// right now; surfaced when those events end.
    fn attach_once_label(&mut self, label_id: &str, panel: &SequencerPanel) {
        let event_ids: Vec<String> = panel
            .buttons()
            .iter()
            .filter_map(|btn| match btn {
                SequencerBtn::Event(event)
                    if event.kind == EventKind::Indefinite && self.active.contains(&event.id) =>
                {
                    Some(event.id.clone())
                }
                _ => None,
            })
            .collect();
        for event_id in event_ids {
            let applied = self.applied_labels.entry(event_id).or_default();
            if !applied.iter().any(|id| id == label_id) {
                applied.push(label_id.to_string());
            }
        }
    }

    /// Names of active indefinite labels, in panel order.
    fn active_label_names(&self, panel: &SequencerPanel) -> Vec<String> {
        panel
            .buttons()
            .iter()
            .filter_map(|btn| match btn {
                SequencerBtn::Label(label)
                    if label.mode == LabelMode::Indefinite && self.active.contains(&label.id) =>
                {
                    Some(label.name.clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Names of active indefinite events, in panel order.
    fn active_event_names(&self, panel: &SequencerPanel) -> Vec<String> {
        panel
            .buttons()
            .iter()
            .filter_map(|btn| match btn {
                SequencerBtn::Event(event)
                    if event.kind == EventKind::Indefinite && self.active.contains(&event.id) =>
                {
                    Some(event.name.clone())
                }
                _ => None,
            })
            .collect()
    }

    fn log(&mut self, line: String) {
        info!(target: "sequencer", "{line}");
        self.activity.push(line);
    }
}
