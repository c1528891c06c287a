pub mod chord;
pub mod registry;

pub use chord::{Chord, Modifiers, Normalization, NormalizedHotkey, is_sequencer_base_key, normalize};
pub use registry::{
    HotkeyInvocation, HotkeyManager, HotkeyOwner, HotkeyRegisterError, HotkeyUsage, KeyInput,
};
