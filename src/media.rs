//! media timing collaborator consumed by reserved hotkey bindings

use serde::{Deserialize, Serialize};
use tracing::trace;

pub const MIN_PLAYBACK_RATE: f64 = 0.25;
pub const MAX_PLAYBACK_RATE: f64 = 2.0;
pub const PLAYBACK_RATE_STEP: f64 = 0.25;
const FALLBACK_FPS: f64 = 30.0;

/// Timing surface the interaction core consumes. The embedding UI adapts its
/// media element (or a test fake) to this.
pub trait MediaClock {
    fn position_ms(&self) -> f64;
    fn duration_ms(&self) -> f64;
    fn is_playing(&self) -> bool;
    fn playback_rate(&self) -> f64;
    /// Measured frame rate, when one is known.
    fn fps(&self) -> Option<f64>;

    fn play(&mut self);
    fn pause(&mut self);
    fn seek_ms(&mut self, ms: f64);
    fn set_playback_rate(&mut self, rate: f64);
}

/// Command a reserved hotkey binding resolves to. Executed against the
/// clock by [`Transport::apply`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransportAction {
    TogglePlayPause,
    SeekBy { ms: f64 },
    StepFrames { frames: i64 },
    RateBy { delta: f64 },
}

/// Applies transport commands with the app's clamping rules: playback rate
/// stays in `[0.25, 2.0]`, seeks stay within the known duration, and frame
/// steps assume 30 fps until the clock reports a measured rate.
pub struct Transport<C> {
    clock: C,
}

impl<C: MediaClock> Transport<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn apply(&mut self, action: TransportAction) {
        trace!(target: "transport", %action, "applying transport action");
        match action {
            TransportAction::TogglePlayPause => self.toggle_play_pause(),
            TransportAction::SeekBy { ms } => {
                let target = self.clock.position_ms() + ms;
                self.seek_ms(target);
            }
            TransportAction::StepFrames { frames } => self.step_frames(frames),
            TransportAction::RateBy { delta } => {
                let target = self.clock.playback_rate() + delta;
                self.set_rate(target);
            }
        }
    }

    pub fn toggle_play_pause(&mut self) {
        if self.clock.is_playing() {
            self.clock.pause();
        } else {
            self.clock.play();
        }
    }

    pub fn seek_ms(&mut self, ms: f64) {
        let duration = self.clock.duration_ms();
        let upper = if duration > 0.0 { duration } else { f64::max(ms, 0.0) };
        self.clock.seek_ms(ms.clamp(0.0, upper));
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.clock.set_playback_rate(rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE));
    }

    pub fn step_frames(&mut self, frames: i64) {
        let fps = self.clock.fps().filter(|fps| *fps > 0.0).unwrap_or(FALLBACK_FPS);
        let step_ms = 1000.0 / fps;
        let target = self.clock.position_ms() + frames as f64 * step_ms;
        self.seek_ms(target);
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::MediaClock;

    /// In-memory clock for tests; records nothing but current state.
    #[derive(Debug, Default)]
    pub struct FakeClock {
        pub position_ms: f64,
        pub duration_ms: f64,
        pub playing: bool,
        pub rate: f64,
        pub fps: Option<f64>,
    }

    impl FakeClock {
        pub fn with_duration(duration_ms: f64) -> Self {
            FakeClock { duration_ms, rate: 1.0, ..Default::default() }
        }
    }

    impl MediaClock for FakeClock {
        fn position_ms(&self) -> f64 {
            self.position_ms
        }

        fn duration_ms(&self) -> f64 {
            self.duration_ms
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn playback_rate(&self) -> f64 {
            self.rate
        }

        fn fps(&self) -> Option<f64> {
            self.fps
        }

        fn play(&mut self) {
            self.playing = true;
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn seek_ms(&mut self, ms: f64) {
            self.position_ms = ms;
        }

        fn set_playback_rate(&mut self, rate: f64) {
            self.rate = rate;
        }
    }
}
