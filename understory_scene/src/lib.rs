// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_scene --heading-base-level=0

//! Understory Scene: a retained-mode vector scene contract.
//!
//! This crate defines the surface that higher-level presentation crates (for
//! example `understory_mindmap`) draw onto. It is deliberately small: a scene
//! is a forest of elements hanging off three fixed [`Layer`]s, and every
//! element is one of a handful of primitives ([`ElementDesc`]).
//!
//! - **Elements** are addressed by opaque [`ElementId`] handles.
//! - **Structure** is mutated through [`SceneBackend::append`] and
//!   [`SceneBackend::detach`]. Detaching keeps the element (and its subtree)
//!   alive so it can be reattached later; [`SceneBackend::destroy`] frees it.
//! - **Presentation state** (visibility, translation, opacity, paint, CSS-like
//!   classes) is per element and survives detach/attach cycles.
//! - **Measurement** ([`SceneBackend::measure_text`], [`SceneBackend::bbox`])
//!   lets callers size content before it is attached anywhere.
//!
//! Concrete renderers (SVG, canvas, GPU) implement [`SceneBackend`] on top of
//! their own object model. [`RetainedScene`] is an in-memory implementation
//! that records every structural and presentation change; it is intended for
//! tests and headless use, not for producing pixels.
//!
//! ## Minimal example
//!
//! ```rust
//! use kurbo::{Size, Vec2};
//! use understory_scene::{ElementDesc, Layer, Parent, RetainedScene, SceneBackend};
//!
//! let mut scene = RetainedScene::new();
//! let group = scene.create(ElementDesc::Group);
//! let rect = scene.create(ElementDesc::Rect {
//!     size: Size::new(40.0, 20.0),
//!     radius: 4.0,
//! });
//! scene.append(Parent::Element(group), rect);
//! scene.append(Parent::Layer(Layer::Nodes), group);
//! scene.set_translation(group, Vec2::new(10.0, 10.0));
//!
//! assert!(scene.is_attached(group));
//! assert_eq!(scene.bbox(group).unwrap().width(), 40.0);
//!
//! // Detaching is reversible.
//! scene.detach(group);
//! assert!(!scene.is_attached(group));
//! scene.append(Parent::Layer(Layer::Nodes), group);
//! assert_eq!(scene.translation(group), Vec2::new(10.0, 10.0));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod retained;
mod types;

pub use retained::{ElementSnapshot, RetainedScene, SceneOp};
pub use types::{
    Dash, ElementDesc, ElementId, ElementKind, FontDesc, FontWeight, Layer, Paint, Parent,
    SceneError, Stroke,
};

use alloc::string::String;
use alloc::vec::Vec;
use kurbo::{BezPath, Rect, Size, Vec2};

/// A retained-mode vector surface.
///
/// Implementations own every element they create. Callers hold
/// [`ElementId`]s and must only change structure through [`append`](Self::append),
/// [`detach`](Self::detach), and [`destroy`](Self::destroy).
///
/// Operations on an unknown or destroyed element are no-ops (queries return
/// neutral values); this lets callers tear down scene state in any order.
pub trait SceneBackend {
    /// Create a detached element.
    fn create(&mut self, desc: ElementDesc) -> ElementId;

    /// Destroy an element and its whole subtree, detaching it first.
    fn destroy(&mut self, id: ElementId);

    /// Returns `true` if `id` refers to a live element.
    fn contains(&self, id: ElementId) -> bool;

    /// Append `child` as the last child of `parent`.
    ///
    /// If `child` already has a parent it is detached first. Appending an
    /// element to itself or to one of its descendants is ignored.
    fn append(&mut self, parent: Parent, child: ElementId);

    /// Detach an element from its parent, keeping it and its subtree alive.
    fn detach(&mut self, id: ElementId);

    /// Returns the current parent of `id`, if attached.
    fn parent(&self, id: ElementId) -> Option<Parent>;

    /// Returns the children of a group element, in paint order.
    fn children(&self, id: ElementId) -> Vec<ElementId>;

    /// Returns `true` if `id` currently has a parent.
    fn is_attached(&self, id: ElementId) -> bool {
        self.parent(id).is_some()
    }

    /// Show or hide an element. Hidden elements keep their place in the tree.
    fn set_visible(&mut self, id: ElementId, visible: bool);

    /// Returns whether `id` is visible. Unknown elements report `false`.
    fn is_visible(&self, id: ElementId) -> bool;

    /// Set the translation of an element relative to its parent.
    fn set_translation(&mut self, id: ElementId, offset: Vec2);

    /// Returns the translation of an element relative to its parent.
    fn translation(&self, id: ElementId) -> Vec2;

    /// Set element opacity in `[0, 1]`.
    fn set_opacity(&mut self, id: ElementId, opacity: f32);

    /// Returns element opacity. Unknown elements report `1.0`.
    fn opacity(&self, id: ElementId) -> f32;

    /// Replace the fill/stroke of an element.
    fn set_paint(&mut self, id: ElementId, paint: Paint);

    /// Replace the geometry of a path element. Other kinds ignore this.
    fn set_path(&mut self, id: ElementId, path: BezPath);

    /// Replace the content of a text element. Other kinds ignore this.
    fn set_text(&mut self, id: ElementId, content: String);

    /// Add a class name to an element.
    fn add_class(&mut self, id: ElementId, class: &str);

    /// Remove a class name from an element.
    fn remove_class(&mut self, id: ElementId, class: &str);

    /// Returns `true` if the element carries `class`.
    fn has_class(&self, id: ElementId, class: &str) -> bool;

    /// Measure a run of (possibly multi-line) text.
    fn measure_text(&self, content: &str, font: &FontDesc) -> Size;

    /// Local bounding box of an element, in its own coordinate space.
    ///
    /// Group bounds are the union of their children's bounds after applying
    /// each child's translation.
    fn bbox(&self, id: ElementId) -> Result<Rect, SceneError>;
}
