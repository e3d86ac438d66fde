use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Bounding box coordinates for an element, a text run or a viewport
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A point in CSS pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Border plus padding thickness on each side of a box
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Insets {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

/// One link of a viewport chain.
///
/// `width`/`height` is the visible size of a frame's viewport; `x`/`y` is where
/// that viewport sits in its parent frame's coordinate space. The top frame's
/// viewport has `x == y == 0`.
pub type Viewport = BoundingBox;

/// Rects narrower or shorter than this count as zero-area.
pub const MIN_SIZE: f64 = 1.0;

impl BoundingBox {
    /// Create a new BoundingBox
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from its edges
    pub fn from_edges(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self::new(left, top, right - left, bottom - top)
    }

    /// Check if the bounding box is visible (has non-zero dimensions)
    pub fn is_visible(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Whether both sides are at least [`MIN_SIZE`]
    pub fn has_area(&self) -> bool {
        self.width >= MIN_SIZE && self.height >= MIN_SIZE
    }

    /// Calculate the area of the bounding box
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    /// Check if a point lies inside the box (edges inclusive on the top/left)
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Overlapping part of two boxes, if any area remains
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right - left > 0.0 && bottom - top > 0.0 {
            Some(Self::from_edges(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn translate(&self, dx: f64, dy: f64) -> BoundingBox {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Shrink the box by the given insets
    pub fn inset(&self, insets: &Insets) -> BoundingBox {
        Self::new(
            self.x + insets.left,
            self.y + insets.top,
            (self.width - insets.left - insets.right).max(0.0),
            (self.height - insets.top - insets.bottom).max(0.0),
        )
    }
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Clip a frame-local rect against a viewport chain and return the part that
/// is visible on screen, in top-frame coordinates.
///
/// Each viewport clips the area visible through it, so the chain is walked from
/// the innermost frame outwards, clipping and then shifting into the parent's
/// space at every level. Summing offsets up front would be wrong.
pub fn visible_box(rect: &BoundingBox, viewports: &[Viewport]) -> Option<BoundingBox> {
    let mut left = rect.x;
    let mut top = rect.y;
    let mut right = rect.right();
    let mut bottom = rect.bottom();

    for viewport in viewports.iter().rev() {
        left = left.max(0.0);
        top = top.max(0.0);
        right = right.min(viewport.width);
        bottom = bottom.min(viewport.height);

        if right - left < MIN_SIZE || bottom - top < MIN_SIZE {
            return None;
        }

        left += viewport.x;
        right += viewport.x;
        top += viewport.y;
        bottom += viewport.y;
    }

    Some(BoundingBox::from_edges(left, top, right, bottom))
}

/// Total offset of the innermost frame relative to the top frame
pub fn frame_offset(viewports: &[Viewport]) -> Point {
    viewports.iter().fold(Point::default(), |acc, viewport| {
        Point::new(acc.x + viewport.x, acc.y + viewport.y)
    })
}
