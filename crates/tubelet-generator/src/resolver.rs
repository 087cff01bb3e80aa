//! Crop box selection for a frame of a tubelet.

use std::collections::BTreeMap;
use std::ops::Range;

use tubelet_models::{BboxPolicy, BoundingBox};

/// Policy actually applied to a dataset.
///
/// A moving camera makes the union over a window meaningless, so such
/// datasets always crop per frame.
pub fn effective_policy(configured: BboxPolicy, camera_is_static: bool) -> BboxPolicy {
    if camera_is_static {
        configured
    } else {
        BboxPolicy::Original
    }
}

/// Box used to crop `frame` of the tubelet covering `window`.
///
/// `Original` returns the frame's own box. `Union` returns the union of
/// every box inside the window, whatever `frame` is. `None` means the frame
/// is skipped.
pub fn resolve(
    frame: u64,
    window: Range<u64>,
    boxes: &BTreeMap<u64, BoundingBox>,
    policy: BboxPolicy,
) -> Option<BoundingBox> {
    match policy {
        BboxPolicy::Original => boxes.get(&frame).copied(),
        BboxPolicy::Union => BoundingBox::union(boxes.range(window).map(|(_, b)| b)),
    }
}

/// Resolver bound to one tubelet window.
///
/// Computes the union once instead of per frame.
#[derive(Debug)]
pub struct WindowResolver<'a> {
    boxes: &'a BTreeMap<u64, BoundingBox>,
    policy: BboxPolicy,
    union: Option<BoundingBox>,
}

impl<'a> WindowResolver<'a> {
    pub fn new(window: Range<u64>, boxes: &'a BTreeMap<u64, BoundingBox>, policy: BboxPolicy) -> Self {
        let union = match policy {
            BboxPolicy::Union => BoundingBox::union(boxes.range(window).map(|(_, b)| b)),
            BboxPolicy::Original => None,
        };
        Self { boxes, policy, union }
    }

    pub fn box_for(&self, frame: u64) -> Option<BoundingBox> {
        match self.policy {
            BboxPolicy::Original => self.boxes.get(&frame).copied(),
            BboxPolicy::Union => self.union,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_boxes() -> BTreeMap<u64, BoundingBox> {
        BTreeMap::from([
            (1, BoundingBox::new(0.0, 0.0, 10.0, 10.0)),
            (2, BoundingBox::new(5.0, 5.0, 20.0, 20.0)),
            (9, BoundingBox::new(100.0, 100.0, 120.0, 120.0)),
        ])
    }

    #[test]
    fn test_union_covers_window() {
        let boxes = sample_boxes();
        let expected = BoundingBox::new(0.0, 0.0, 20.0, 20.0);
        // frame 0 has no box of its own but still gets the window union
        assert_eq!(resolve(0, 0..5, &boxes, BboxPolicy::Union), Some(expected));
        assert_eq!(resolve(3, 0..5, &boxes, BboxPolicy::Union), Some(expected));
        assert_eq!(resolve(5, 5..8, &boxes, BboxPolicy::Union), None);
    }

    #[test]
    fn test_original_uses_frame_box() {
        let boxes = sample_boxes();
        assert_eq!(resolve(2, 0..5, &boxes, BboxPolicy::Original), Some(boxes[&2]));
        assert_eq!(resolve(3, 0..5, &boxes, BboxPolicy::Original), None);
    }

    #[test]
    fn test_window_resolver_matches_resolve() {
        let boxes = sample_boxes();
        for policy in [BboxPolicy::Original, BboxPolicy::Union] {
            let resolver = WindowResolver::new(0..10, &boxes, policy);
            for frame in 0..10 {
                assert_eq!(resolver.box_for(frame), resolve(frame, 0..10, &boxes, policy));
            }
        }
    }

    #[test]
    fn test_effective_policy() {
        assert_eq!(effective_policy(BboxPolicy::Union, true), BboxPolicy::Union);
        assert_eq!(effective_policy(BboxPolicy::Union, false), BboxPolicy::Original);
        assert_eq!(effective_policy(BboxPolicy::Original, true), BboxPolicy::Original);
    }
}
