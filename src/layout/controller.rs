use tracing::debug;

use crate::geometry::{
    compute_rect, AspectLock, GestureConstraints, GestureMode, Point, Rect, Size,
};

/// First-move noise threshold in px. A pointer that never travels further
/// than this is a click, not a drag.
const MOVE_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub enum PaneEvent {
    DragMoved(Rect),
    DragEnded(Rect),
    ResizeMoved(Rect),
    ResizeEnded(Rect),
    ZChanged(i32),
}

#[derive(Debug, Clone)]
pub struct PaneOptions {
    pub rect: Rect,
    pub min_size: Size,
    pub aspect: AspectLock,
    pub z_index: i32,
    pub z_min: i32,
    pub z_max: i32,
}

impl Default for PaneOptions {
    fn default() -> Self {
        Self {
            rect: Rect::default(),
            min_size: Size {
                width: 100.0,
                height: 100.0,
            },
            aspect: AspectLock::Free,
            z_index: 1,
            z_min: 1,
            z_max: 100,
        }
    }
}

#[derive(Debug, Clone)]
struct Gesture {
    pointer_id: u64,
    mode: GestureMode,
    start_rect: Rect,
    start_pointer: Point,
    moved: bool,
}

/// Per-pane gesture state machine: Idle until a pointer goes down on a
/// handle, then Dragging or Resizing until the matching pointer lifts.
/// Exactly one pointer id is tracked at a time.
pub struct PaneController {
    rect: Rect,
    min_size: Size,
    aspect: AspectLock,
    resolved_aspect: Option<f64>,
    z_index: i32,
    z_min: i32,
    z_max: i32,
    gesture: Option<Gesture>,
}

impl PaneController {
    pub fn new(options: PaneOptions) -> Self {
        let resolved_aspect = options.aspect.resolve(None);
        Self {
            rect: options.rect,
            min_size: options.min_size,
            aspect: options.aspect,
            resolved_aspect,
            z_index: options.z_index.clamp(options.z_min, options.z_max),
            z_min: options.z_min,
            z_max: options.z_max,
            gesture: None,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Overwrites the pane's rect outside of a gesture, e.g. when the
    /// orchestrator lays panes out or restores a saved arrangement.
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = rect;
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn is_gesturing(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn aspect_ratio(&self) -> Option<f64> {
        self.resolved_aspect
    }

    /// Re-resolves the aspect lock from the tracked media's intrinsic size.
    /// Only `AspectLock::Auto` is affected.
    pub fn set_intrinsic_size(&mut self, intrinsic: Option<Size>) {
        self.resolved_aspect = self.aspect.resolve(intrinsic);
    }

    /// Starts a gesture. Returns false if another pointer already holds one;
    /// the new pointer is ignored entirely.
    pub fn pointer_down(&mut self, pointer_id: u64, at: Point, mode: GestureMode) -> bool {
        if self.gesture.is_some() {
            return false;
        }
        debug!(target: "layout", ?mode, pointer_id, "gesture start");
        self.gesture = Some(Gesture {
            pointer_id,
            mode,
            start_rect: self.rect,
            start_pointer: at,
            moved: false,
        });
        true
    }

    /// Advances the active gesture. Moves from other pointers are ignored,
    /// and the first move must exceed the noise threshold before the rect
    /// starts tracking the pointer.
    pub fn pointer_move(&mut self, pointer_id: u64, at: Point, bounds: Size) -> Option<PaneEvent> {
        let gesture = self.gesture.as_mut()?;
        if gesture.pointer_id != pointer_id {
            return None;
        }

        let delta = Point {
            x: at.x - gesture.start_pointer.x,
            y: at.y - gesture.start_pointer.y,
        };
        if !gesture.moved {
            if delta.x.abs() <= MOVE_THRESHOLD && delta.y.abs() <= MOVE_THRESHOLD {
                return None;
            }
            gesture.moved = true;
        }

        let constraints = GestureConstraints {
            bounds,
            min_size: self.min_size,
            aspect: self.resolved_aspect,
        };
        self.rect = compute_rect(gesture.start_rect, delta, gesture.mode, &constraints);
        match gesture.mode {
            GestureMode::Drag => Some(PaneEvent::DragMoved(self.rect)),
            GestureMode::Resize(_) => Some(PaneEvent::ResizeMoved(self.rect)),
        }
    }

    /// Ends the gesture held by `pointer_id` and emits the terminal event
    /// carrying the last computed rect. There is no rollback path.
    pub fn pointer_up(&mut self, pointer_id: u64) -> Option<PaneEvent> {
        match &self.gesture {
            Some(gesture) if gesture.pointer_id == pointer_id => {}
            _ => return None,
        }
        let gesture = self.gesture.take()?;
        debug!(target: "layout", mode = ?gesture.mode, pointer_id, "gesture end");
        match gesture.mode {
            GestureMode::Drag => Some(PaneEvent::DragEnded(self.rect)),
            GestureMode::Resize(_) => Some(PaneEvent::ResizeEnded(self.rect)),
        }
    }

    /// Pointer-cancel behaves like pointer-up: the last computed rect is
    /// committed.
    pub fn pointer_cancel(&mut self, pointer_id: u64) -> Option<PaneEvent> {
        self.pointer_up(pointer_id)
    }

    pub fn z_up(&mut self) -> Option<PaneEvent> {
        self.set_z(self.z_index + 1)
    }

    pub fn z_down(&mut self) -> Option<PaneEvent> {
        self.set_z(self.z_index - 1)
    }

    /// Out-of-range requests are clamped, never rejected.
    fn set_z(&mut self, requested: i32) -> Option<PaneEvent> {
        let next = requested.clamp(self.z_min, self.z_max);
        if next == self.z_index {
            return None;
        }
        self.z_index = next;
        Some(PaneEvent::ZChanged(next))
    }
}
