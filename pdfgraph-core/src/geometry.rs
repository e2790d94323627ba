//! Rectangles as stored in PDF dictionaries (`/Rect`, `/MediaBox`, ...)

use crate::objects::Object;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rectangle defined by two corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub lower_left: Point,
    pub upper_right: Point,
}

impl Rectangle {
    pub fn new(lower_left: Point, upper_right: Point) -> Self {
        Self {
            lower_left,
            upper_right,
        }
    }

    pub fn from_position_and_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(Point::new(x, y), Point::new(x + width, y + height))
    }

    /// Read a `[llx lly urx ury]` array. Corners given in any order are
    /// normalized, as readers are required to do.
    pub fn from_object(value: &Object) -> Option<Self> {
        let numbers: Vec<f64> = value
            .as_array()?
            .iter()
            .map(Object::as_real)
            .collect::<Option<_>>()?;
        let [x1, y1, x2, y2] = <[f64; 4]>::try_from(numbers).ok()?;
        Some(Self::new(
            Point::new(x1.min(x2), y1.min(y2)),
            Point::new(x1.max(x2), y1.max(y2)),
        ))
    }

    pub fn to_object(&self) -> Object {
        Object::Array(vec![
            Object::Real(self.lower_left.x),
            Object::Real(self.lower_left.y),
            Object::Real(self.upper_right.x),
            Object::Real(self.upper_right.y),
        ])
    }

    pub fn width(&self) -> f64 {
        self.upper_right.x - self.lower_left.x
    }

    pub fn height(&self) -> f64 {
        self.upper_right.y - self.lower_left.y
    }
}
