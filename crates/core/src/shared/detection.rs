/// An axis-aligned bounding box in source-frame pixel coordinates.
///
/// A tick yields a collection of these whose order carries no meaning;
/// compare them as sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Detection {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Detection {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Boxes with a non-positive side are never reported.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// True when `self` lies within `outer` grown by `(dx, dy)` on every side.
    pub fn lies_within(&self, outer: &Detection, dx: i32, dy: i32) -> bool {
        self.x >= outer.x - dx
            && self.y >= outer.y - dy
            && self.right() <= outer.right() + dx
            && self.bottom() <= outer.bottom() + dy
    }
}
