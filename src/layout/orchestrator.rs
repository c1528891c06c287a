use tracing::debug;

use crate::common::collections::HashMap;
use crate::geometry::{clamp_rect, GestureConstraints, Rect, Size};

pub const VIDEO_PANE: &str = "video";
pub const SEQUENCER_PANE: &str = "sequencer";
pub const TIMELINE_PANE: &str = "timeline";

/// Fraction of the smaller pane's area that may be covered before a commit
/// is rejected.
pub const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, PartialEq)]
pub struct PaneState {
    pub key: String,
    pub rect: Rect,
    pub z_index: i32,
}

/// Owns the committed pane map for one workspace. Gesture-level mutation
/// happens in the per-pane controllers; this layer only accepts or rejects
/// their final rects.
pub struct LayoutOrchestrator {
    panes: HashMap<String, PaneState>,
    overlap_threshold: f64,
    min_size: Size,
}

impl Default for LayoutOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutOrchestrator {
    pub fn new() -> Self {
        Self {
            panes: HashMap::default(),
            overlap_threshold: DEFAULT_OVERLAP_THRESHOLD,
            min_size: Size {
                width: 100.0,
                height: 100.0,
            },
        }
    }

    pub fn with_overlap_threshold(mut self, threshold: f64) -> Self {
        self.overlap_threshold = threshold;
        self
    }

    pub fn with_min_size(mut self, min_size: Size) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn pane(&self, key: &str) -> Option<&PaneState> {
        self.panes.get(key)
    }

    pub fn panes(&self) -> impl Iterator<Item = &PaneState> {
        self.panes.values()
    }

    pub fn insert_pane(&mut self, key: &str, rect: Rect, z_index: i32) {
        self.panes.insert(
            key.to_string(),
            PaneState {
                key: key.to_string(),
                rect,
                z_index,
            },
        );
    }

    pub fn remove_pane(&mut self, key: &str) -> Option<PaneState> {
        self.panes.remove(key)
    }

    /// Commits a gesture's final rect for one pane. The rect is clamped to
    /// the container first; the commit is rejected if it would cover too
    /// much of any other pane. Returns whether the pane map changed.
    pub fn commit(&mut self, key: &str, rect: Rect, bounds: Size) -> bool {
        if !self.panes.contains_key(key) {
            return false;
        }

        let constraints = GestureConstraints {
            bounds,
            min_size: self.min_size,
            aspect: None,
        };
        let candidate = clamp_rect(rect, &constraints);

        for other in self.panes.values() {
            if other.key == key {
                continue;
            }
            let overlap = candidate.overlap_of_smaller(&other.rect);
            if overlap >= self.overlap_threshold {
                debug!(
                    target: "layout",
                    pane = key,
                    against = other.key.as_str(),
                    overlap,
                    "commit rejected"
                );
                return false;
            }
        }

        if let Some(pane) = self.panes.get_mut(key) {
            pane.rect = candidate;
        }
        true
    }

    pub fn commit_z(&mut self, key: &str, z_index: i32) -> bool {
        match self.panes.get_mut(key) {
            Some(pane) => {
                pane.z_index = z_index;
                true
            }
            None => false,
        }
    }

    /// Replaces the pane map with the stock three-pane arrangement: video
    /// top-left, sequencer top-right, timeline along the bottom. A zero
    /// bounds yields zero-sized panes until real bounds arrive.
    pub fn default_layout(&mut self, bounds: Size) {
        let video_width = (bounds.width * 0.7).round();
        let top_height = (bounds.height * 0.6).round();

        self.panes.clear();
        self.insert_pane(
            VIDEO_PANE,
            Rect::new(0.0, 0.0, video_width, top_height),
            1,
        );
        self.insert_pane(
            SEQUENCER_PANE,
            Rect::new(video_width, 0.0, bounds.width - video_width, top_height),
            1,
        );
        self.insert_pane(
            TIMELINE_PANE,
            Rect::new(0.0, top_height, bounds.width, bounds.height - top_height),
            1,
        );
    }
}
