//! FILENAME: core/cell-selection-engine/src/autoscroll.rs
//! Auto-scroll while a selection is dragged near a viewport edge.
//!
//! The host calls `update` on every pointer move during a drag and `step` once
//! per animation frame; `step` yields the scroll delta to apply, if any.
//! Speed grows linearly from 0 at the sensitivity boundary to the maximum on
//! the edge itself (and beyond it, when the pointer leaves the viewport).

use crate::definition::{DEFAULT_AUTO_SCROLL_SENSITIVITY, DEFAULT_AUTO_SCROLL_SPEED};

/// Viewport size in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Pixels to scroll in one frame. Negative values scroll up or left.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollDelta {
    pub dx: f64,
    pub dy: f64,
}

impl ScrollDelta {
    pub fn is_zero(&self) -> bool {
        self.dx == 0.0 && self.dy == 0.0
    }
}

#[derive(Debug, Clone)]
pub struct AutoScrollController {
    sensitivity: f64,
    speed: f64,
    delta: Option<ScrollDelta>,
}

impl Default for AutoScrollController {
    fn default() -> Self {
        AutoScrollController::new(DEFAULT_AUTO_SCROLL_SENSITIVITY, DEFAULT_AUTO_SCROLL_SPEED)
    }
}

impl AutoScrollController {
    pub fn new(sensitivity: f64, speed: f64) -> Self {
        AutoScrollController {
            sensitivity: sensitivity.max(0.0),
            speed: speed.max(0.0),
            delta: None,
        }
    }

    /// Signed factor in [-1, 1] for one axis: negative near the start edge,
    /// positive near the end edge, zero in between.
    fn axis_factor(&self, position: f64, extent: f64) -> f64 {
        if self.sensitivity <= 0.0 {
            return 0.0;
        }
        if position <= self.sensitivity {
            -((self.sensitivity - position) / self.sensitivity).min(1.0)
        } else if position >= extent - self.sensitivity {
            ((position - (extent - self.sensitivity)) / self.sensitivity).min(1.0)
        } else {
            0.0
        }
    }

    /// Re-evaluates the pointer position (relative to the viewport's top-left).
    /// Returns whether auto-scroll is now active.
    pub fn update(&mut self, x: f64, y: f64, viewport: Viewport) -> bool {
        let delta = ScrollDelta {
            dx: self.axis_factor(x, viewport.width) * self.speed,
            dy: self.axis_factor(y, viewport.height) * self.speed,
        };

        let was_active = self.delta.is_some();
        self.delta = (!delta.is_zero()).then_some(delta);
        match (was_active, self.delta) {
            (false, Some(delta)) => {
                log::debug!(target: "AUTOSCROLL", "started: dx={:.1} dy={:.1}", delta.dx, delta.dy)
            }
            (true, None) => log::debug!(target: "AUTOSCROLL", "pointer left the edge zone"),
            _ => {}
        }
        self.delta.is_some()
    }

    /// The scroll for one animation frame, or `None` when inactive.
    pub fn step(&self) -> Option<ScrollDelta> {
        self.delta
    }

    pub fn is_active(&self) -> bool {
        self.delta.is_some()
    }

    pub fn stop(&mut self) {
        if self.delta.take().is_some() {
            log::debug!(target: "AUTOSCROLL", "stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport { width: 400.0, height: 300.0 };

    #[test]
    fn test_inactive_in_the_middle() {
        let mut scroll = AutoScrollController::default();
        assert!(!scroll.update(200.0, 150.0, VIEWPORT));
        assert_eq!(scroll.step(), None);
    }

    #[test]
    fn test_speed_scales_linearly() {
        let mut scroll = AutoScrollController::default();
        scroll.update(200.0, 25.0, VIEWPORT);
        assert_eq!(scroll.step(), Some(ScrollDelta { dx: 0.0, dy: -10.0 }));

        scroll.update(200.0, 300.0, VIEWPORT);
        assert_eq!(scroll.step(), Some(ScrollDelta { dx: 0.0, dy: 20.0 }));

        scroll.update(200.0, 250.0, VIEWPORT);
        assert_eq!(scroll.step(), None);
    }

    #[test]
    fn test_symmetric_edges_and_clamping() {
        let mut scroll = AutoScrollController::default();
        scroll.update(-80.0, 150.0, VIEWPORT);
        assert_eq!(scroll.step(), Some(ScrollDelta { dx: -20.0, dy: 0.0 }));

        scroll.update(390.0, 290.0, VIEWPORT);
        let delta = scroll.step().unwrap();
        assert!((delta.dx - 16.0).abs() < 1e-9);
        assert!((delta.dy - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_stop() {
        let mut scroll = AutoScrollController::default();
        scroll.update(0.0, 0.0, VIEWPORT);
        assert!(scroll.is_active());
        scroll.stop();
        assert!(!scroll.is_active());
    }
}
