//! pure rect math for pane gestures: clamping, aspect lock, overlap tests

use std::str::FromStr;

use anyhow::{anyhow, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ASPECT_RATIO: f64 = 16.0 / 9.0;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Pane position and size relative to the container origin.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn round(&self) -> Self {
        Rect {
            x: self.x.round(),
            y: self.y.round(),
            width: self.width.round(),
            height: self.height.round(),
        }
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let min_x = f64::max(self.x, other.x);
        let max_x = f64::min(self.max_x(), other.max_x());
        let min_y = f64::max(self.y, other.y);
        let max_y = f64::min(self.max_y(), other.max_y());
        Rect::new(min_x, min_y, f64::max(max_x - min_x, 0.), f64::max(max_y - min_y, 0.))
    }

    pub fn is_within(&self, how_much: f64, other: Self) -> bool {
        (self.x - other.x).abs() < how_much
            && (self.y - other.y).abs() < how_much
            && (self.width - other.width).abs() < how_much
            && (self.height - other.height).abs() < how_much
    }

    pub fn same_as(&self, other: Self) -> bool {
        self.is_within(0.1, other)
    }

    /// Fraction of the smaller of the two rects covered by their
    /// intersection. Zero when either rect is degenerate.
    pub fn overlap_of_smaller(&self, other: &Self) -> f64 {
        let min_area = f64::min(self.area(), other.area());
        if min_area <= 0.0 {
            return 0.0;
        }
        self.intersection(other).area() / min_area
    }
}

/// Aspect-ratio lock for a resizable pane. `Auto` tracks a media element's
/// intrinsic size and falls back to 16/9 until one is known.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, Default, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AspectLock {
    #[default]
    Free,
    Auto,
    Ratio(f64),
}

impl AspectLock {
    pub fn resolve(&self, intrinsic: Option<Size>) -> Option<f64> {
        match self {
            AspectLock::Free => None,
            AspectLock::Ratio(ratio) if *ratio > 0.0 && ratio.is_finite() => Some(*ratio),
            AspectLock::Ratio(_) => None,
            AspectLock::Auto => match intrinsic {
                Some(size) if !size.is_empty() => Some(size.width / size.height),
                _ => Some(DEFAULT_ASPECT_RATIO),
            },
        }
    }
}

impl FromStr for AspectLock {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_lowercase().as_str() {
            "false" | "free" | "" => return Ok(AspectLock::Free),
            "auto" => return Ok(AspectLock::Auto),
            _ => {}
        }
        if let Some((w, h)) = s.split_once('/') {
            let w: f64 = w.trim().parse().map_err(|_| anyhow!("bad aspect ratio: {}", s))?;
            let h: f64 = h.trim().parse().map_err(|_| anyhow!("bad aspect ratio: {}", s))?;
            if !w.is_finite() || !h.is_finite() || w <= 0.0 || h <= 0.0 {
                bail!("bad aspect ratio: {}", s);
            }
            return Ok(AspectLock::Ratio(w / h));
        }
        let ratio: f64 = s.parse().map_err(|_| anyhow!("bad aspect ratio: {}", s))?;
        if !ratio.is_finite() || ratio <= 0.0 {
            bail!("bad aspect ratio: {}", s);
        }
        Ok(AspectLock::Ratio(ratio))
    }
}

#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResizeDirection {
    Top,
    Bottom,
    Left,
    Right,
    Corner,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureMode {
    Drag,
    Resize(ResizeDirection),
}

/// Bounds, minimum size, and optional aspect ratio a gesture must respect.
#[derive(Debug, Copy, Clone)]
pub struct GestureConstraints {
    pub bounds: Size,
    pub min_size: Size,
    pub aspect: Option<f64>,
}

/// Computes the pane rect for one pointer step of an active gesture.
///
/// Always produces a rect inside `bounds` and no smaller than `min_size`
/// (unless the bounds themselves are smaller), no matter how far out of
/// range the delta is. Rounds to whole pixels last.
pub fn compute_rect(
    start: Rect,
    delta: Point,
    mode: GestureMode,
    constraints: &GestureConstraints,
) -> Rect {
    let direction = match mode {
        GestureMode::Drag => {
            let moved = Rect::new(start.x + delta.x, start.y + delta.y, start.width, start.height);
            return clamp_rect(moved, constraints);
        }
        GestureMode::Resize(direction) => direction,
    };

    let mut rect = start;
    match direction {
        ResizeDirection::Top => {
            rect.y += delta.y;
            rect.height -= delta.y;
        }
        ResizeDirection::Bottom => {
            rect.height += delta.y;
        }
        ResizeDirection::Left => {
            rect.x += delta.x;
            rect.width -= delta.x;
        }
        ResizeDirection::Right => {
            rect.width += delta.x;
        }
        ResizeDirection::Corner => {
            rect.width += delta.x;
            rect.height += delta.y;
        }
    }

    let adjusted = apply_aspect(rect, direction, constraints.aspect);
    clamp_rect(adjusted, constraints)
}

/// Forces the locked ratio onto a raw resize result. Edge handles recompute
/// the opposite dimension; the corner handle keeps whichever dimension
/// deviates least from the unlocked value and recomputes the other.
fn apply_aspect(mut rect: Rect, direction: ResizeDirection, aspect: Option<f64>) -> Rect {
    let Some(ratio) = aspect else {
        return rect;
    };
    match direction {
        ResizeDirection::Top | ResizeDirection::Bottom => {
            rect.width = rect.height * ratio;
        }
        ResizeDirection::Left | ResizeDirection::Right => {
            rect.height = rect.width / ratio;
        }
        ResizeDirection::Corner => {
            let locked_width = rect.height * ratio;
            let locked_height = rect.width / ratio;
            if (locked_width - rect.width).abs() > (locked_height - rect.height).abs() {
                rect.width = locked_width;
            } else {
                rect.height = locked_height;
            }
        }
    }
    rect
}

/// Size is clamped before position so the position clamp sees the final
/// dimensions; the rect is rounded only after both.
pub fn clamp_rect(rect: Rect, constraints: &GestureConstraints) -> Rect {
    let bounds = constraints.bounds;
    let width = f64::min(bounds.width, f64::max(rect.width, constraints.min_size.width));
    let height = f64::min(bounds.height, f64::max(rect.height, constraints.min_size.height));
    let max_x = f64::max(0.0, bounds.width - width);
    let max_y = f64::max(0.0, bounds.height - height);
    let x = f64::min(f64::max(rect.x, 0.0), max_x);
    let y = f64::min(f64::max(rect.y, 0.0), max_y);
    Rect::new(x, y, width, height).round()
}
