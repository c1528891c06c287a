//! Interaction core for a video-analysis workspace: pane drag/resize
//! geometry, hotkey chord registration and dispatch, the sequencer trigger
//! state machine, and the layout orchestrator that ties them together.

pub mod common;
pub mod geometry;
pub mod hotkey;
pub mod layout;
pub mod media;
pub mod sequencer;
pub mod workspace;
