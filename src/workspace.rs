use std::time::Instant;

use tracing::debug;

use crate::geometry::{Rect, Size};
use crate::hotkey::{
    Chord, HotkeyInvocation, HotkeyManager, HotkeyRegisterError, KeyInput, NormalizedHotkey,
};
use crate::layout::LayoutOrchestrator;
use crate::media::{MediaClock, Transport};
use crate::sequencer::{SequencerBtn, SequencerPanel, SequencerRuntime, TriggerSource};

/// One analysis workspace: the transport over a media clock, the hotkey
/// tables, the sequencer panel and its runtime, and the pane layout. Routes
/// keydown and click input to the right engine.
pub struct Workspace<C> {
    hotkeys: HotkeyManager,
    panel: SequencerPanel,
    runtime: SequencerRuntime,
    layout: LayoutOrchestrator,
    transport: Transport<C>,
}

impl<C: MediaClock> Workspace<C> {
    pub fn new(clock: C) -> Self {
        let mut hotkeys = HotkeyManager::new();
        hotkeys.init_reserved_transport_hotkeys();
        hotkeys.enable();
        Self {
            hotkeys,
            panel: SequencerPanel::new(),
            runtime: SequencerRuntime::new(),
            layout: LayoutOrchestrator::new(),
            transport: Transport::new(clock),
        }
    }

    pub fn hotkeys(&self) -> &HotkeyManager {
        &self.hotkeys
    }

    pub fn hotkeys_mut(&mut self) -> &mut HotkeyManager {
        &mut self.hotkeys
    }

    pub fn panel(&self) -> &SequencerPanel {
        &self.panel
    }

    pub fn panel_mut(&mut self) -> &mut SequencerPanel {
        &mut self.panel
    }

    pub fn runtime(&self) -> &SequencerRuntime {
        &self.runtime
    }

    pub fn layout(&self) -> &LayoutOrchestrator {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut LayoutOrchestrator {
        &mut self.layout
    }

    pub fn transport(&self) -> &Transport<C> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<C> {
        &mut self.transport
    }

    /// Routes one keydown. Reserved bindings drive the transport; sequencer
    /// bindings trigger their button. Returns whether the event was consumed
    /// and should have its default handling suppressed.
    pub fn handle_keydown(&mut self, input: &KeyInput, now: Instant) -> bool {
        match self.hotkeys.dispatch(input, self.panel.edit_mode()) {
            Some(HotkeyInvocation::Reserved(action)) => {
                debug!(target: "workspace", %action, "reserved hotkey");
                self.transport.apply(action);
                true
            }
            Some(HotkeyInvocation::Sequencer { action_id }) => {
                self.runtime
                    .trigger(&action_id, TriggerSource::Hotkey, &self.panel, now);
                true
            }
            None => false,
        }
    }

    /// Triggers a sequencer button from a UI click.
    pub fn click_button(&mut self, btn_id: &str, now: Instant) {
        self.runtime
            .trigger(btn_id, TriggerSource::Click, &self.panel, now);
    }

    /// Binds a chord to a sequencer button and records the normalized form
    /// on the button. The button's previous chord, if any, is released.
    pub fn assign_hotkey(
        &mut self,
        btn_id: &str,
        chord: &Chord,
    ) -> Result<NormalizedHotkey, HotkeyRegisterError> {
        let label = self.panel.display_name(btn_id);
        let normalized =
            self.hotkeys
                .register_sequencer_hotkey(chord, btn_id, Some(&label), false)?;
        self.panel.set_hotkey(btn_id, Some(normalized.clone()));
        Ok(normalized)
    }

    /// Releases a button's chord, if it has one.
    pub fn unassign_hotkey(&mut self, btn_id: &str) -> bool {
        let removed = self.hotkeys.unassign_sequencer_hotkey_by_action(btn_id);
        self.panel.set_hotkey(btn_id, None);
        removed
    }

    /// Removes a button and frees its chord for reuse. Links from other
    /// buttons pointing at the removed id go stale and are tolerated by the
    /// runtime.
    pub fn remove_button(&mut self, btn_id: &str) -> Option<SequencerBtn> {
        let removed = self.panel.remove(btn_id)?;
        self.hotkeys.unassign_sequencer_hotkey_by_action(btn_id);
        Some(removed)
    }

    /// Lays the stock panes out over the container.
    pub fn init_layout(&mut self, bounds: Size) {
        self.layout.default_layout(bounds);
    }

    /// Commits a gesture's final rect for one pane.
    pub fn commit_pane(&mut self, key: &str, rect: Rect, bounds: Size) -> bool {
        self.layout.commit(key, rect, bounds)
    }
}
