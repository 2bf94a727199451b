// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public scene types: handles, layers, element descriptions, and paint.

use alloc::string::String;
use core::fmt;

use kurbo::{BezPath, Size};
use peniko::Color;
use smallvec::SmallVec;

/// Identifier for a scene element.
///
/// This is a small, opaque handle that is stable for the lifetime of the
/// element. It becomes invalid once the element is destroyed.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// Fixed root containers of a scene, painted in declaration order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Connecting lines between nodes.
    Lines,
    /// Node groups.
    Nodes,
    /// Decorations drawn above everything else.
    Overlay,
}

impl Layer {
    /// All layers in paint order.
    pub const ALL: [Self; 3] = [Self::Lines, Self::Nodes, Self::Overlay];

    /// Position of this layer in [`Layer::ALL`].
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Self::Lines => 0,
            Self::Nodes => 1,
            Self::Overlay => 2,
        }
    }
}

/// Where an element is attached.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Parent {
    /// Directly under one of the root layers.
    Layer(Layer),
    /// Inside a group element.
    Element(ElementId),
}

/// Font weight for text elements.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum FontWeight {
    /// Regular weight.
    #[default]
    Normal,
    /// Bold weight.
    Bold,
}

/// Font description for text elements and measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDesc {
    /// Font family list, CSS style.
    pub family: String,
    /// Font size in scene units.
    pub size: f64,
    /// Font weight.
    pub weight: FontWeight,
    /// Italic style.
    pub italic: bool,
    /// Line height as a multiple of `size`.
    pub line_height: f64,
}

impl Default for FontDesc {
    fn default() -> Self {
        Self {
            family: String::from("sans-serif"),
            size: 14.0,
            weight: FontWeight::Normal,
            italic: false,
            line_height: 1.5,
        }
    }
}

/// Discriminant of an [`ElementDesc`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Container.
    Group,
    /// Axis-aligned (optionally rounded) rectangle.
    Rect,
    /// Circle centered on its radius.
    Circle,
    /// Text run.
    Text,
    /// Arbitrary path.
    Path,
    /// Raster image reference.
    Image,
}

/// Description of an element to create.
#[derive(Clone, Debug, PartialEq)]
pub enum ElementDesc {
    /// A container for other elements.
    Group,
    /// A rectangle anchored at the local origin.
    Rect {
        /// Rectangle size.
        size: Size,
        /// Uniform corner radius.
        radius: f64,
    },
    /// A circle whose bounding box is anchored at the local origin.
    Circle {
        /// Circle radius.
        radius: f64,
    },
    /// A text run anchored at the local origin (top-left of the first line).
    Text {
        /// Text content; `\n` separates lines.
        content: String,
        /// Font used to draw and measure the text.
        font: FontDesc,
    },
    /// A path in local coordinates.
    Path(BezPath),
    /// An image reference drawn into a box anchored at the local origin.
    Image {
        /// Image source.
        url: String,
        /// Drawn size.
        size: Size,
    },
}

impl ElementDesc {
    /// Returns the kind of element this describes.
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Group => ElementKind::Group,
            Self::Rect { .. } => ElementKind::Rect,
            Self::Circle { .. } => ElementKind::Circle,
            Self::Text { .. } => ElementKind::Text,
            Self::Path(_) => ElementKind::Path,
            Self::Image { .. } => ElementKind::Image,
        }
    }
}

/// Dash pattern for strokes; empty means solid.
pub type Dash = SmallVec<[f64; 4]>;

/// Stroke parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Stroke {
    /// Stroke color.
    pub color: Color,
    /// Stroke width in scene units.
    pub width: f64,
    /// Dash pattern.
    pub dash: Dash,
}

/// Fill and stroke of an element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paint {
    /// Fill color, if filled.
    pub fill: Option<Color>,
    /// Stroke, if stroked.
    pub stroke: Option<Stroke>,
}

/// Errors reported by fallible scene queries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SceneError {
    /// The element does not exist (never created or already destroyed).
    UnknownElement(ElementId),
    /// The element has no geometry to measure (for example an empty group).
    EmptyBounds(ElementId),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownElement(id) => write!(f, "unknown scene element {}", id.0),
            Self::EmptyBounds(id) => write!(f, "scene element {} has no bounds", id.0),
        }
    }
}

impl core::error::Error for SceneError {}
