pub mod panel;
pub mod runtime;

pub use panel::{EventBtn, EventKind, LabelBtn, LabelMode, PanelError, SequencerBtn, SequencerPanel};
pub use runtime::{SequencerRuntime, TriggerEntry, TriggerSource, LAST_TRIGGER_CLEAR};
