//! Screen edge detection.

use peripheral_share_types::{ScreenEdge, ScreenGeometry};

/// Decides when the pointer touches a screen edge.
///
/// A coordinate hits an edge when it is closer than `threshold` pixels to it
/// (or past it). Left and right are always checked; top and bottom only when
/// `vertical_edges` is set.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    screen: ScreenGeometry,
    threshold: u32,
    vertical_edges: bool,
}

impl EdgeDetector {
    pub fn new(screen: ScreenGeometry, threshold: u32, vertical_edges: bool) -> Self {
        Self {
            screen,
            threshold,
            vertical_edges,
        }
    }

    pub fn screen(&self) -> ScreenGeometry {
        self.screen
    }

    /// The edge the coordinate is touching, if any.
    pub fn check(&self, x: i32, y: i32) -> Option<ScreenEdge> {
        let horizontal = [ScreenEdge::Left, ScreenEdge::Right];
        let vertical = [ScreenEdge::Top, ScreenEdge::Bottom];
        let limit = i64::from(self.threshold.max(1));

        horizontal
            .into_iter()
            .chain(vertical.into_iter().filter(|_| self.vertical_edges))
            .find(|&edge| self.screen.distance_to_edge(x, y, edge) < limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(vertical: bool) -> EdgeDetector {
        EdgeDetector::new(ScreenGeometry::new(1920, 1080), 5, vertical)
    }

    #[test]
    fn left_and_right() {
        let d = detector(false);
        assert_eq!(d.check(3, 540), Some(ScreenEdge::Left));
        assert_eq!(d.check(0, 540), Some(ScreenEdge::Left));
        assert_eq!(d.check(-20, 540), Some(ScreenEdge::Left));
        assert_eq!(d.check(1916, 540), Some(ScreenEdge::Right));
        assert_eq!(d.check(1919, 0), Some(ScreenEdge::Right));
    }

    #[test]
    fn threshold_is_exclusive() {
        let d = detector(false);
        assert_eq!(d.check(5, 540), None);
        assert_eq!(d.check(4, 540), Some(ScreenEdge::Left));
        assert_eq!(d.check(1914, 540), None);
    }

    #[test]
    fn interior_is_none() {
        assert_eq!(detector(true).check(960, 540), None);
        assert_eq!(detector(false).check(100, 200), None);
    }

    #[test]
    fn vertical_edges_opt_in() {
        assert_eq!(detector(false).check(960, 1), None);
        assert_eq!(detector(true).check(960, 1), Some(ScreenEdge::Top));
        assert_eq!(detector(true).check(960, 1078), Some(ScreenEdge::Bottom));
    }

    #[test]
    fn offset_screen() {
        let screen = ScreenGeometry {
            width: 1280,
            height: 1024,
            x: 1920,
            y: 0,
        };
        let d = EdgeDetector::new(screen, 5, false);
        assert_eq!(d.check(1921, 500), Some(ScreenEdge::Left));
        assert_eq!(d.check(3197, 500), Some(ScreenEdge::Right));
        assert_eq!(d.check(2500, 500), None);
    }

    #[test]
    fn zero_threshold_still_catches_the_boundary() {
        let d = EdgeDetector::new(ScreenGeometry::new(800, 600), 0, false);
        assert_eq!(d.check(0, 300), Some(ScreenEdge::Left));
        assert_eq!(d.check(1, 300), None);
    }
}
