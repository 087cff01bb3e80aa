//! Bounding boxes in absolute pixel coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned box `(x_min, y_min, x_max, y_max)` in pixels.
///
/// Serialized as a four element array so snapshots and detector output
/// stay compact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl BoundingBox {
    /// Create a box from corner coordinates.
    pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    /// Convert a top-left + width/height box (COCO style).
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Parse a whitespace separated `"x1 y1 x2 y2"` string.
    pub fn parse_corners(s: &str) -> Option<Self> {
        let values: Vec<f64> = s
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        match values.as_slice() {
            [x1, y1, x2, y2] => Some(Self::new(*x1, *y1, *x2, *y2)),
            _ => None,
        }
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// True when both sides are at least `min_size` pixels.
    pub fn is_at_least(&self, min_size: f64) -> bool {
        self.width() >= min_size && self.height() >= min_size
    }

    /// Smallest box containing every input box (min of mins, max of maxes).
    pub fn union<'a, I>(boxes: I) -> Option<BoundingBox>
    where
        I: IntoIterator<Item = &'a BoundingBox>,
    {
        boxes.into_iter().fold(None, |acc, b| {
            Some(match acc {
                None => *b,
                Some(u) => BoundingBox::new(
                    u.x_min.min(b.x_min),
                    u.y_min.min(b.y_min),
                    u.x_max.max(b.x_max),
                    u.y_max.max(b.y_max),
                ),
            })
        })
    }

    /// Intersect with a `width` x `height` image and return the integer
    /// crop rectangle, or `None` when nothing usable remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<PixelRect> {
        let x0 = self.x_min.max(0.0).floor() as u32;
        let y0 = self.y_min.max(0.0).floor() as u32;
        let x1 = (self.x_max.max(0.0).floor() as u32).min(width);
        let y1 = (self.y_max.max(0.0).floor() as u32).min(height);

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(PixelRect {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x_min, b.y_min, b.x_max, b.y_max]
    }
}

/// Integer crop rectangle inside an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_xywh() {
        let b = BoundingBox::from_xywh(10.0, 20.0, 30.0, 40.0);
        assert_eq!(b, BoundingBox::new(10.0, 20.0, 40.0, 60.0));
        assert_eq!(b.width(), 30.0);
        assert_eq!(b.height(), 40.0);
    }

    #[test]
    fn test_union() {
        let boxes = [
            BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            BoundingBox::new(5.0, 5.0, 20.0, 20.0),
        ];
        assert_eq!(
            BoundingBox::union(&boxes),
            Some(BoundingBox::new(0.0, 0.0, 20.0, 20.0))
        );
        assert_eq!(BoundingBox::union(&Vec::<BoundingBox>::new()), None);
    }

    #[test]
    fn test_parse_corners() {
        assert_eq!(
            BoundingBox::parse_corners("1 2 3 4"),
            Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0))
        );
        assert_eq!(BoundingBox::parse_corners("1 2 3"), None);
        assert_eq!(BoundingBox::parse_corners("a b c d"), None);
    }

    #[test]
    fn test_clamp_to_image() {
        let b = BoundingBox::new(-5.0, 10.5, 120.0, 50.0);
        let rect = b.clamp_to(100, 100).unwrap();
        assert_eq!(
            rect,
            PixelRect {
                x: 0,
                y: 10,
                width: 100,
                height: 40
            }
        );

        // Entirely outside the frame
        assert!(BoundingBox::new(150.0, 150.0, 200.0, 200.0)
            .clamp_to(100, 100)
            .is_none());
        // Zero width
        assert!(BoundingBox::new(10.0, 10.0, 10.0, 50.0)
            .clamp_to(100, 100)
            .is_none());
    }

    #[test]
    fn test_serde_as_array() {
        let b = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: BoundingBox = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(back, b);
    }
}
