// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node background shapes and the extra padding each one needs.

use kurbo::{BezPath, Ellipse, Point, Rect, RoundedRect, Shape, Size};

const DEFAULT_PADDING_X: f64 = 15.0;
const DEFAULT_PADDING_Y: f64 = 5.0;
const TOLERANCE: f64 = 0.1;

/// Background shape of a node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeShape {
    /// Plain (optionally rounded) rectangle.
    #[default]
    Rectangle,
    /// Diamond touching the midpoints of the box.
    Diamond,
    /// Right-leaning parallelogram.
    Parallelogram,
    /// Rectangle with fully rounded ends.
    RoundedRectangle,
    /// Rectangle with cut corners.
    OctagonalRectangle,
    /// Rectangle with pointed left and right ends.
    OuterTriangularRectangle,
    /// Rectangle with notched left and right ends.
    InnerTriangularRectangle,
    /// Ellipse inscribed in the box.
    Ellipse,
    /// Circle; the box is squared up by padding.
    Circle,
}

impl NodeShape {
    /// Parses a shape name; unknown names yield [`NodeShape::Rectangle`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "diamond" => Self::Diamond,
            "parallelogram" => Self::Parallelogram,
            "roundedRectangle" => Self::RoundedRectangle,
            "octagonalRectangle" => Self::OctagonalRectangle,
            "outerTriangularRectangle" => Self::OuterTriangularRectangle,
            "innerTriangularRectangle" => Self::InnerTriangularRectangle,
            "ellipse" => Self::Ellipse,
            "circle" => Self::Circle,
            _ => Self::Rectangle,
        }
    }

    /// The name [`NodeShape::parse`] accepts.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rectangle => "rectangle",
            Self::Diamond => "diamond",
            Self::Parallelogram => "parallelogram",
            Self::RoundedRectangle => "roundedRectangle",
            Self::OctagonalRectangle => "octagonalRectangle",
            Self::OuterTriangularRectangle => "outerTriangularRectangle",
            Self::InnerTriangularRectangle => "innerTriangularRectangle",
            Self::Ellipse => "ellipse",
            Self::Circle => "circle",
        }
    }
}

/// Extra padding added on each side by a shape.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ShapePadding {
    /// Added to the left and to the right.
    pub x: f64,
    /// Added to the top and to the bottom.
    pub y: f64,
}

/// Padding a shape needs around a `width` x `height` content box that already
/// carries `padding_x`/`padding_y`.
#[must_use]
pub fn shape_padding(
    shape: NodeShape,
    width: f64,
    height: f64,
    padding_x: f64,
    padding_y: f64,
) -> ShapePadding {
    let act_width = width + padding_x * 2.0;
    let act_height = height + padding_y * 2.0;
    let act_offset = (act_width - act_height).abs();
    match shape {
        NodeShape::Rectangle | NodeShape::OctagonalRectangle => ShapePadding::default(),
        NodeShape::RoundedRectangle => ShapePadding {
            x: if height > width { (height - width) / 2.0 } else { 0.0 },
            y: 0.0,
        },
        NodeShape::Diamond => ShapePadding {
            x: width / 2.0,
            y: height / 2.0,
        },
        NodeShape::Parallelogram
        | NodeShape::OuterTriangularRectangle
        | NodeShape::InnerTriangularRectangle => ShapePadding {
            x: if padding_x <= 0.0 { DEFAULT_PADDING_X } else { 0.0 },
            y: 0.0,
        },
        NodeShape::Ellipse => ShapePadding {
            x: if padding_x <= 0.0 { DEFAULT_PADDING_X } else { 0.0 },
            y: if padding_y <= 0.0 { DEFAULT_PADDING_Y } else { 0.0 },
        },
        NodeShape::Circle => ShapePadding {
            x: if act_height > act_width { act_offset / 2.0 } else { 0.0 },
            y: if act_height < act_width { act_offset / 2.0 } else { 0.0 },
        },
    }
}

fn polygon(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    if let Some((first, rest)) = points.split_first() {
        path.move_to(*first);
        for p in rest {
            path.line_to(*p);
        }
        path.close_path();
    }
    path
}

/// Outline of `shape` filling a box of `size` anchored at the origin.
#[must_use]
pub fn shape_path(shape: NodeShape, size: Size, radius: f64) -> BezPath {
    let (w, h) = (size.width, size.height);
    let rect = Rect::from_origin_size(Point::ORIGIN, size);
    match shape {
        NodeShape::Rectangle => RoundedRect::from_rect(rect, radius.max(0.0)).to_path(TOLERANCE),
        NodeShape::RoundedRectangle => {
            RoundedRect::from_rect(rect, w.min(h) / 2.0).to_path(TOLERANCE)
        }
        NodeShape::Diamond => polygon(&[
            Point::new(w / 2.0, 0.0),
            Point::new(w, h / 2.0),
            Point::new(w / 2.0, h),
            Point::new(0.0, h / 2.0),
        ]),
        NodeShape::Parallelogram => {
            let skew = DEFAULT_PADDING_X.min(w / 2.0);
            polygon(&[
                Point::new(skew, 0.0),
                Point::new(w, 0.0),
                Point::new(w - skew, h),
                Point::new(0.0, h),
            ])
        }
        NodeShape::OctagonalRectangle => {
            let cut = 5.0_f64.min(w / 2.0).min(h / 2.0);
            polygon(&[
                Point::new(cut, 0.0),
                Point::new(w - cut, 0.0),
                Point::new(w, cut),
                Point::new(w, h - cut),
                Point::new(w - cut, h),
                Point::new(cut, h),
                Point::new(0.0, h - cut),
                Point::new(0.0, cut),
            ])
        }
        NodeShape::OuterTriangularRectangle => {
            let tip = DEFAULT_PADDING_X.min(w / 2.0);
            polygon(&[
                Point::new(tip, 0.0),
                Point::new(w - tip, 0.0),
                Point::new(w, h / 2.0),
                Point::new(w - tip, h),
                Point::new(tip, h),
                Point::new(0.0, h / 2.0),
            ])
        }
        NodeShape::InnerTriangularRectangle => {
            let notch = DEFAULT_PADDING_X.min(w / 2.0);
            polygon(&[
                Point::new(0.0, 0.0),
                Point::new(w, 0.0),
                Point::new(w - notch, h / 2.0),
                Point::new(w, h),
                Point::new(0.0, h),
                Point::new(notch, h / 2.0),
            ])
        }
        NodeShape::Ellipse | NodeShape::Circle => Ellipse::from_rect(rect).to_path(TOLERANCE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_and_defaults() {
        for shape in [
            NodeShape::Diamond,
            NodeShape::Parallelogram,
            NodeShape::RoundedRectangle,
            NodeShape::OctagonalRectangle,
            NodeShape::OuterTriangularRectangle,
            NodeShape::InnerTriangularRectangle,
            NodeShape::Ellipse,
            NodeShape::Circle,
        ] {
            assert_eq!(NodeShape::parse(shape.as_str()), shape);
        }
        assert_eq!(NodeShape::parse("blob"), NodeShape::Rectangle);
    }

    #[test]
    fn rounded_rectangle_pads_tall_content() {
        let p = shape_padding(NodeShape::RoundedRectangle, 10.0, 30.0, 15.0, 5.0);
        assert_eq!(p, ShapePadding { x: 10.0, y: 0.0 });
        let p = shape_padding(NodeShape::RoundedRectangle, 30.0, 10.0, 15.0, 5.0);
        assert_eq!(p, ShapePadding::default());
    }

    #[test]
    fn diamond_doubles_the_box() {
        let p = shape_padding(NodeShape::Diamond, 40.0, 20.0, 15.0, 5.0);
        assert_eq!(p, ShapePadding { x: 20.0, y: 10.0 });
    }

    #[test]
    fn slanted_shapes_pad_only_without_padding() {
        for shape in [
            NodeShape::Parallelogram,
            NodeShape::OuterTriangularRectangle,
            NodeShape::InnerTriangularRectangle,
        ] {
            assert_eq!(shape_padding(shape, 10.0, 10.0, 0.0, 0.0).x, 15.0);
            assert_eq!(shape_padding(shape, 10.0, 10.0, 4.0, 0.0).x, 0.0);
        }
        let p = shape_padding(NodeShape::Ellipse, 10.0, 10.0, 0.0, 0.0);
        assert_eq!(p, ShapePadding { x: 15.0, y: 5.0 });
    }

    #[test]
    fn circle_squares_the_box() {
        // 40 + 2*5 = 50 wide, 10 + 2*5 = 20 tall: pad y by 15 on each side.
        let p = shape_padding(NodeShape::Circle, 40.0, 10.0, 5.0, 5.0);
        assert_eq!(p, ShapePadding { x: 0.0, y: 15.0 });
        let p = shape_padding(NodeShape::Circle, 10.0, 40.0, 5.0, 5.0);
        assert_eq!(p, ShapePadding { x: 15.0, y: 0.0 });
    }

    #[test]
    fn paths_stay_inside_their_box() {
        let size = Size::new(60.0, 24.0);
        for shape in [
            NodeShape::Rectangle,
            NodeShape::Diamond,
            NodeShape::Parallelogram,
            NodeShape::RoundedRectangle,
            NodeShape::OctagonalRectangle,
            NodeShape::OuterTriangularRectangle,
            NodeShape::InnerTriangularRectangle,
            NodeShape::Ellipse,
            NodeShape::Circle,
        ] {
            let bounds = shape_path(shape, size, 4.0).bounding_box();
            assert!(bounds.x0 >= -0.5 && bounds.y0 >= -0.5, "{shape:?}");
            assert!(bounds.x1 <= 60.5 && bounds.y1 <= 24.5, "{shape:?}");
        }
    }
}
