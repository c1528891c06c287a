pub mod controller;
pub mod orchestrator;

pub use controller::{PaneController, PaneEvent, PaneOptions};
pub use orchestrator::{
    LayoutOrchestrator, PaneState, DEFAULT_OVERLAP_THRESHOLD, SEQUENCER_PANE, TIMELINE_PANE,
    VIDEO_PANE,
};
