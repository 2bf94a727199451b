// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pan and zoom of the canvas over world space.

use kurbo::{Affine, Point, Rect, Size, Vec2};

/// Uniform pan+zoom mapping world coordinates onto the canvas.
///
/// Culling asks [`ViewState::is_rect_visible`] whether a node's world box
/// overlaps the canvas grown by a padding.
///
/// ```rust
/// use kurbo::{Point, Rect, Size, Vec2};
/// use understory_mindmap::ViewState;
///
/// let mut view = ViewState::new(Size::new(800.0, 600.0));
/// view.pan_by_view(Vec2::new(100.0, 0.0));
/// assert_eq!(view.world_to_view_point(Point::ORIGIN), Point::new(100.0, 0.0));
///
/// let far = Rect::new(2000.0, 0.0, 2050.0, 30.0);
/// assert!(!view.is_rect_visible(far, 100.0));
/// ```
#[derive(Clone, Debug)]
pub struct ViewState {
    canvas: Size,
    zoom: f64,
    pan: Vec2,
    min_zoom: f64,
    max_zoom: f64,
    world_to_view: Affine,
    view_to_world: Affine,
}

impl ViewState {
    /// Creates a view over a canvas of `canvas` size at zoom `1.0` and no pan.
    #[must_use]
    pub fn new(canvas: Size) -> Self {
        let mut view = Self {
            canvas,
            zoom: 1.0,
            pan: Vec2::ZERO,
            min_zoom: 0.1,
            max_zoom: 20.0,
            world_to_view: Affine::IDENTITY,
            view_to_world: Affine::IDENTITY,
        };
        view.rebuild_transforms();
        view
    }

    /// Canvas size.
    #[must_use]
    pub fn canvas(&self) -> Size {
        self.canvas
    }

    /// Resizes the canvas.
    pub fn set_canvas(&mut self, canvas: Size) {
        self.canvas = canvas;
    }

    /// Current scale factor.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Current translation in view space.
    #[must_use]
    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// Sets the scale, clamped to the zoom limits.
    pub fn set_zoom(&mut self, zoom: f64) {
        let clamped = zoom.clamp(self.min_zoom, self.max_zoom);
        if (self.zoom - clamped).abs() < f64::EPSILON {
            return;
        }
        self.zoom = clamped;
        self.rebuild_transforms();
    }

    /// Sets the zoom limits; the current zoom is clamped into them.
    pub fn set_zoom_limits(&mut self, min_zoom: f64, max_zoom: f64) {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        self.set_zoom(self.zoom);
    }

    /// Pans by a delta in view space.
    pub fn pan_by_view(&mut self, delta: Vec2) {
        if delta == Vec2::ZERO {
            return;
        }
        self.pan += delta;
        self.rebuild_transforms();
    }

    /// Zooms by `factor` keeping `anchor_view` fixed on the canvas.
    pub fn zoom_about_view_point(&mut self, anchor_view: Point, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        let new_zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        let anchor_world = self.view_to_world_point(anchor_view);
        self.zoom = new_zoom;
        self.rebuild_transforms();
        let moved = self.world_to_view_point(anchor_world);
        self.pan_by_view(anchor_view - moved);
    }

    /// World to view transform.
    #[must_use]
    pub fn transform(&self) -> Affine {
        self.world_to_view
    }

    /// Maps a world point onto the canvas.
    #[must_use]
    pub fn world_to_view_point(&self, pt: Point) -> Point {
        self.world_to_view * pt
    }

    /// Maps a canvas point into world space.
    #[must_use]
    pub fn view_to_world_point(&self, pt: Point) -> Point {
        self.view_to_world * pt
    }

    /// Maps a world rectangle onto the canvas.
    #[must_use]
    pub fn world_to_view_rect(&self, rect: Rect) -> Rect {
        let p0 = self.world_to_view * rect.origin();
        let p1 = self.world_to_view * Point::new(rect.x1, rect.y1);
        Rect::from_points(p0, p1)
    }

    /// World rectangle covered by the canvas grown by `padding` pixels.
    #[must_use]
    pub fn visible_world_rect(&self, padding: f64) -> Rect {
        let view = Rect::from_origin_size(Point::ORIGIN, self.canvas).inflate(padding, padding);
        let p0 = self.view_to_world * view.origin();
        let p1 = self.view_to_world * Point::new(view.x1, view.y1);
        Rect::from_points(p0, p1)
    }

    /// Returns `true` if `world` overlaps the canvas grown by `padding` pixels.
    #[must_use]
    pub fn is_rect_visible(&self, world: Rect, padding: f64) -> bool {
        let r = self.world_to_view_rect(world);
        r.x1 > -padding
            && r.y1 > -padding
            && r.x0 < self.canvas.width + padding
            && r.y0 < self.canvas.height + padding
    }

    fn rebuild_transforms(&mut self) {
        self.world_to_view = Affine::translate(self.pan) * Affine::scale(self.zoom);
        self.view_to_world = self.world_to_view.inverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_about_point_keeps_anchor() {
        let mut view = ViewState::new(Size::new(800.0, 600.0));
        let anchor = Point::new(200.0, 100.0);
        let world = view.view_to_world_point(anchor);
        view.zoom_about_view_point(anchor, 2.0);
        assert_eq!(view.zoom(), 2.0);
        let back = view.world_to_view_point(world);
        assert!((back - anchor).hypot() < 1e-9);
    }

    #[test]
    fn visibility_honors_padding_and_scale() {
        let mut view = ViewState::new(Size::new(100.0, 100.0));
        let rect = Rect::new(150.0, 10.0, 160.0, 20.0);
        assert!(!view.is_rect_visible(rect, 0.0));
        assert!(view.is_rect_visible(rect, 60.0));
        view.set_zoom(0.5);
        assert!(view.is_rect_visible(rect, 0.0));
    }

    #[test]
    fn visible_world_rect_inverts_pan() {
        let mut view = ViewState::new(Size::new(100.0, 50.0));
        view.pan_by_view(Vec2::new(-100.0, 0.0));
        assert_eq!(view.visible_world_rect(0.0), Rect::new(100.0, 0.0, 200.0, 50.0));
        assert_eq!(view.visible_world_rect(10.0), Rect::new(90.0, -10.0, 210.0, 60.0));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut view = ViewState::new(Size::new(100.0, 100.0));
        view.set_zoom_limits(0.5, 2.0);
        view.set_zoom(10.0);
        assert_eq!(view.zoom(), 2.0);
        view.zoom_about_view_point(Point::ORIGIN, 0.01);
        assert_eq!(view.zoom(), 0.5);
    }
}
