// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory reference implementation of [`SceneBackend`].

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use kurbo::{BezPath, Point, Rect, Shape, Size, Vec2};
use smallvec::SmallVec;

use crate::SceneBackend;
use crate::types::{ElementDesc, ElementId, ElementKind, FontDesc, FontWeight, Layer, Paint, Parent, SceneError};

/// Operation recorded by [`RetainedScene`].
#[derive(Clone, Debug, PartialEq)]
pub enum SceneOp {
    /// An element was created.
    Create(ElementId, ElementKind),
    /// An element (and its subtree) was destroyed.
    Destroy(ElementId),
    /// An element was attached under `parent`.
    Append {
        /// New parent.
        parent: Parent,
        /// Attached element.
        child: ElementId,
    },
    /// An element was detached from its parent.
    Detach(ElementId),
    /// Visibility changed.
    SetVisible(ElementId, bool),
    /// Translation changed.
    SetTranslation(ElementId, Vec2),
    /// Opacity changed.
    SetOpacity(ElementId, f32),
    /// Paint replaced.
    SetPaint(ElementId),
    /// Path geometry replaced.
    SetPath(ElementId),
    /// Text content replaced.
    SetText(ElementId),
    /// Class added.
    AddClass(ElementId, String),
    /// Class removed.
    RemoveClass(ElementId, String),
}

#[derive(Clone, Debug)]
struct Element {
    desc: ElementDesc,
    parent: Option<Parent>,
    children: Vec<ElementId>,
    visible: bool,
    translation: Vec2,
    opacity: f32,
    paint: Paint,
    classes: SmallVec<[String; 2]>,
}

impl Element {
    fn new(desc: ElementDesc) -> Self {
        Self {
            desc,
            parent: None,
            children: Vec::new(),
            visible: true,
            translation: Vec2::ZERO,
            opacity: 1.0,
            paint: Paint::default(),
            classes: SmallVec::new(),
        }
    }
}

/// Structural snapshot of an attached element and its subtree.
///
/// Snapshots compare equal when two scene subtrees are observably identical:
/// same element kinds, presentation state, classes, and child order.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementSnapshot {
    /// Element handle.
    pub id: ElementId,
    /// Element kind.
    pub kind: ElementKind,
    /// Visibility flag.
    pub visible: bool,
    /// Translation relative to the parent.
    pub translation: Vec2,
    /// Opacity.
    pub opacity: f32,
    /// Classes in insertion order.
    pub classes: Vec<String>,
    /// Children in paint order.
    pub children: Vec<ElementSnapshot>,
}

/// Simple in-memory scene.
///
/// This backend:
/// - Stores elements in a slot vector keyed by their IDs. Slots are never
///   reused, so a stale [`ElementId`] can never alias a newer element.
/// - Measures text deterministically from character counts, so sizing is
///   reproducible in tests.
/// - Records a [`SceneOp`] for every effective mutation.
#[derive(Debug, Default)]
pub struct RetainedScene {
    slots: Vec<Option<Element>>,
    layers: [Vec<ElementId>; 3],
    ops: Vec<SceneOp>,
}

impl RetainedScene {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the log of recorded operations.
    pub fn ops(&self) -> &[SceneOp] {
        &self.ops
    }

    /// Clears the operation log, keeping all elements.
    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }

    /// Returns the elements attached directly under `layer`.
    pub fn layer_children(&self, layer: Layer) -> &[ElementId] {
        &self.layers[layer.index()]
    }

    /// Number of live (created and not destroyed) elements.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Returns the description an element was created with (with later
    /// path/text replacements applied).
    pub fn desc(&self, id: ElementId) -> Option<&ElementDesc> {
        self.get(id).map(|e| &e.desc)
    }

    /// Returns the current paint of an element.
    pub fn paint(&self, id: ElementId) -> Option<&Paint> {
        self.get(id).map(|e| &e.paint)
    }

    /// Returns the text content of a text element.
    pub fn text_content(&self, id: ElementId) -> Option<&str> {
        match self.desc(id)? {
            ElementDesc::Text { content, .. } => Some(content.as_str()),
            _ => None,
        }
    }

    /// Returns `true` if `id` is attached, directly or through ancestors, to `layer`.
    pub fn is_in_layer(&self, id: ElementId, layer: Layer) -> bool {
        let mut current = id;
        loop {
            match self.get(current).and_then(|e| e.parent) {
                Some(Parent::Layer(l)) => return l == layer,
                Some(Parent::Element(p)) => current = p,
                None => return false,
            }
        }
    }

    /// Returns `true` if `id` and every ancestor up to its layer are visible.
    pub fn is_effectively_visible(&self, id: ElementId) -> bool {
        let mut current = id;
        loop {
            let Some(el) = self.get(current) else {
                return false;
            };
            if !el.visible {
                return false;
            }
            match el.parent {
                Some(Parent::Layer(_)) => return true,
                Some(Parent::Element(p)) => current = p,
                None => return false,
            }
        }
    }

    /// Snapshot of everything attached under `layer`.
    pub fn snapshot(&self, layer: Layer) -> Vec<ElementSnapshot> {
        self.layers[layer.index()]
            .iter()
            .filter_map(|&id| self.snapshot_element(id))
            .collect()
    }

    /// Snapshot of a single element subtree.
    pub fn snapshot_element(&self, id: ElementId) -> Option<ElementSnapshot> {
        let el = self.get(id)?;
        Some(ElementSnapshot {
            id,
            kind: el.desc.kind(),
            visible: el.visible,
            translation: el.translation,
            opacity: el.opacity,
            classes: el.classes.iter().cloned().collect(),
            children: el
                .children
                .iter()
                .filter_map(|&c| self.snapshot_element(c))
                .collect(),
        })
    }

    fn get(&self, id: ElementId) -> Option<&Element> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Returns `true` if `candidate` is `root` or lies inside `root`'s subtree.
    fn is_within(&self, candidate: ElementId, root: ElementId) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == root {
                return true;
            }
            current = match self.get(id).and_then(|e| e.parent) {
                Some(Parent::Element(p)) => Some(p),
                _ => None,
            };
        }
        false
    }

    fn container_mut(&mut self, parent: Parent) -> Option<&mut Vec<ElementId>> {
        match parent {
            Parent::Layer(layer) => Some(&mut self.layers[layer.index()]),
            Parent::Element(id) => self.get_mut(id).map(|e| &mut e.children),
        }
    }

    fn local_bounds(&self, id: ElementId) -> Result<Rect, SceneError> {
        let el = self.get(id).ok_or(SceneError::UnknownElement(id))?;
        match &el.desc {
            ElementDesc::Group => {
                let mut acc: Option<Rect> = None;
                for &child in &el.children {
                    let offset = self.translation(child);
                    match self.local_bounds(child) {
                        Ok(r) => {
                            let r = r + offset;
                            acc = Some(acc.map_or(r, |a| a.union(r)));
                        }
                        Err(SceneError::EmptyBounds(_)) => {}
                        Err(err) => return Err(err),
                    }
                }
                acc.ok_or(SceneError::EmptyBounds(id))
            }
            ElementDesc::Rect { size, .. } | ElementDesc::Image { size, .. } => {
                Ok(Rect::from_origin_size(Point::ORIGIN, *size))
            }
            ElementDesc::Circle { radius } => Ok(Rect::new(0.0, 0.0, radius * 2.0, radius * 2.0)),
            ElementDesc::Text { content, font } => Ok(Rect::from_origin_size(
                Point::ORIGIN,
                self.measure_text(content, font),
            )),
            ElementDesc::Path(path) => {
                if path.elements().is_empty() {
                    Err(SceneError::EmptyBounds(id))
                } else {
                    Ok(path.bounding_box())
                }
            }
        }
    }
}

impl SceneBackend for RetainedScene {
    fn create(&mut self, desc: ElementDesc) -> ElementId {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "ElementId uses 32-bit indices by design."
        )]
        let id = ElementId(self.slots.len() as u32);
        let kind = desc.kind();
        self.slots.push(Some(Element::new(desc)));
        self.ops.push(SceneOp::Create(id, kind));
        id
    }

    fn destroy(&mut self, id: ElementId) {
        if !self.contains(id) {
            return;
        }
        self.detach(id);
        let mut stack = alloc::vec![id];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.slots.get_mut(current.0 as usize) {
                if let Some(el) = slot.take() {
                    stack.extend(el.children);
                }
            }
        }
        self.ops.push(SceneOp::Destroy(id));
    }

    fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    fn append(&mut self, parent: Parent, child: ElementId) {
        if !self.contains(child) {
            return;
        }
        if let Parent::Element(p) = parent {
            if !self.contains(p) || self.is_within(p, child) {
                return;
            }
        }
        self.detach(child);
        if let Some(container) = self.container_mut(parent) {
            container.push(child);
        }
        if let Some(el) = self.get_mut(child) {
            el.parent = Some(parent);
        }
        self.ops.push(SceneOp::Append { parent, child });
    }

    fn detach(&mut self, id: ElementId) {
        let Some(parent) = self.get_mut(id).and_then(|e| e.parent.take()) else {
            return;
        };
        if let Some(container) = self.container_mut(parent) {
            container.retain(|&c| c != id);
        }
        self.ops.push(SceneOp::Detach(id));
    }

    fn parent(&self, id: ElementId) -> Option<Parent> {
        self.get(id).and_then(|e| e.parent)
    }

    fn children(&self, id: ElementId) -> Vec<ElementId> {
        self.get(id).map(|e| e.children.clone()).unwrap_or_default()
    }

    fn set_visible(&mut self, id: ElementId, visible: bool) {
        if let Some(el) = self.get_mut(id) {
            if el.visible != visible {
                el.visible = visible;
                self.ops.push(SceneOp::SetVisible(id, visible));
            }
        }
    }

    fn is_visible(&self, id: ElementId) -> bool {
        self.get(id).is_some_and(|e| e.visible)
    }

    fn set_translation(&mut self, id: ElementId, offset: Vec2) {
        if let Some(el) = self.get_mut(id) {
            el.translation = offset;
            self.ops.push(SceneOp::SetTranslation(id, offset));
        }
    }

    fn translation(&self, id: ElementId) -> Vec2 {
        self.get(id).map_or(Vec2::ZERO, |e| e.translation)
    }

    fn set_opacity(&mut self, id: ElementId, opacity: f32) {
        if let Some(el) = self.get_mut(id) {
            let opacity = opacity.clamp(0.0, 1.0);
            el.opacity = opacity;
            self.ops.push(SceneOp::SetOpacity(id, opacity));
        }
    }

    fn opacity(&self, id: ElementId) -> f32 {
        self.get(id).map_or(1.0, |e| e.opacity)
    }

    fn set_paint(&mut self, id: ElementId, paint: Paint) {
        if let Some(el) = self.get_mut(id) {
            el.paint = paint;
            self.ops.push(SceneOp::SetPaint(id));
        }
    }

    fn set_path(&mut self, id: ElementId, path: BezPath) {
        if let Some(el) = self.get_mut(id) {
            if let ElementDesc::Path(current) = &mut el.desc {
                *current = path;
                self.ops.push(SceneOp::SetPath(id));
            }
        }
    }

    fn set_text(&mut self, id: ElementId, content: String) {
        if let Some(el) = self.get_mut(id) {
            if let ElementDesc::Text { content: current, .. } = &mut el.desc {
                *current = content;
                self.ops.push(SceneOp::SetText(id));
            }
        }
    }

    fn add_class(&mut self, id: ElementId, class: &str) {
        if let Some(el) = self.get_mut(id) {
            if !el.classes.iter().any(|c| c == class) {
                el.classes.push(class.to_string());
                self.ops.push(SceneOp::AddClass(id, class.to_string()));
            }
        }
    }

    fn remove_class(&mut self, id: ElementId, class: &str) {
        if let Some(el) = self.get_mut(id) {
            let before = el.classes.len();
            el.classes.retain(|c| c != class);
            if el.classes.len() != before {
                self.ops.push(SceneOp::RemoveClass(id, class.to_string()));
            }
        }
    }

    fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.get(id).is_some_and(|e| e.classes.iter().any(|c| c == class))
    }

    fn measure_text(&self, content: &str, font: &FontDesc) -> Size {
        let mut lines = 0_usize;
        let mut widest = 0_usize;
        for line in content.split('\n') {
            lines += 1;
            widest = widest.max(line.chars().count());
        }
        let advance = match font.weight {
            FontWeight::Normal => 0.6,
            FontWeight::Bold => 0.65,
        };
        #[allow(
            clippy::cast_precision_loss,
            reason = "Character and line counts are far below f64 precision limits."
        )]
        let size = Size::new(
            widest as f64 * font.size * advance,
            lines as f64 * font.size * font.line_height,
        );
        size
    }

    fn bbox(&self, id: ElementId) -> Result<Rect, SceneError> {
        self.local_bounds(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(scene: &mut RetainedScene, w: f64, h: f64) -> ElementId {
        scene.create(ElementDesc::Rect {
            size: Size::new(w, h),
            radius: 0.0,
        })
    }

    #[test]
    fn append_and_detach_keep_element_alive() {
        let mut scene = RetainedScene::new();
        let g = scene.create(ElementDesc::Group);
        scene.append(Parent::Layer(Layer::Nodes), g);
        assert_eq!(scene.layer_children(Layer::Nodes), &[g]);

        scene.detach(g);
        assert!(scene.layer_children(Layer::Nodes).is_empty());
        assert!(scene.contains(g));
        assert!(!scene.is_attached(g));
    }

    #[test]
    fn reappend_moves_between_parents() {
        let mut scene = RetainedScene::new();
        let a = scene.create(ElementDesc::Group);
        let b = scene.create(ElementDesc::Group);
        let r = rect(&mut scene, 1.0, 1.0);
        scene.append(Parent::Element(a), r);
        scene.append(Parent::Element(b), r);
        assert!(scene.children(a).is_empty());
        assert_eq!(scene.children(b), alloc::vec![r]);
        assert_eq!(scene.parent(r), Some(Parent::Element(b)));
    }

    #[test]
    fn append_into_own_subtree_is_ignored() {
        let mut scene = RetainedScene::new();
        let outer = scene.create(ElementDesc::Group);
        let inner = scene.create(ElementDesc::Group);
        scene.append(Parent::Element(outer), inner);
        scene.append(Parent::Element(inner), outer);
        assert_eq!(scene.parent(outer), None);
        assert_eq!(scene.parent(inner), Some(Parent::Element(outer)));
    }

    #[test]
    fn destroy_frees_subtree() {
        let mut scene = RetainedScene::new();
        let g = scene.create(ElementDesc::Group);
        let r = rect(&mut scene, 1.0, 1.0);
        scene.append(Parent::Element(g), r);
        scene.append(Parent::Layer(Layer::Nodes), g);
        scene.destroy(g);
        assert!(!scene.contains(g));
        assert!(!scene.contains(r));
        assert!(scene.layer_children(Layer::Nodes).is_empty());
        assert_eq!(scene.live_count(), 0);
        // Operations on destroyed elements are inert.
        scene.set_visible(g, false);
        assert!(!scene.is_visible(g));
    }

    #[test]
    fn group_bbox_unions_translated_children() {
        let mut scene = RetainedScene::new();
        let g = scene.create(ElementDesc::Group);
        let a = rect(&mut scene, 10.0, 10.0);
        let b = rect(&mut scene, 10.0, 10.0);
        scene.append(Parent::Element(g), a);
        scene.append(Parent::Element(g), b);
        scene.set_translation(b, Vec2::new(20.0, 5.0));
        assert_eq!(scene.bbox(g), Ok(Rect::new(0.0, 0.0, 30.0, 15.0)));
    }

    #[test]
    fn empty_group_has_no_bounds() {
        let mut scene = RetainedScene::new();
        let g = scene.create(ElementDesc::Group);
        assert_eq!(scene.bbox(g), Err(SceneError::EmptyBounds(g)));
        assert_eq!(
            scene.bbox(ElementId(999)),
            Err(SceneError::UnknownElement(ElementId(999)))
        );
    }

    #[test]
    fn text_measurement_is_deterministic() {
        let scene = RetainedScene::new();
        let font = FontDesc {
            size: 10.0,
            line_height: 1.0,
            ..FontDesc::default()
        };
        let single = scene.measure_text("abcd", &font);
        assert_eq!(single, Size::new(24.0, 10.0));
        let multi = scene.measure_text("ab\nabcdef", &font);
        assert_eq!(multi, Size::new(36.0, 20.0));
        assert_eq!(scene.measure_text("", &font), Size::new(0.0, 10.0));
    }

    #[test]
    fn visibility_round_trip_restores_snapshot() {
        let mut scene = RetainedScene::new();
        let g = scene.create(ElementDesc::Group);
        let r = rect(&mut scene, 4.0, 4.0);
        scene.append(Parent::Element(g), r);
        scene.append(Parent::Layer(Layer::Nodes), g);
        scene.add_class(g, "node");
        let before = scene.snapshot(Layer::Nodes);
        scene.set_visible(g, false);
        assert!(!scene.is_effectively_visible(r));
        scene.set_visible(g, true);
        assert_eq!(scene.snapshot(Layer::Nodes), before);
    }

    #[test]
    fn classes_are_deduplicated() {
        let mut scene = RetainedScene::new();
        let g = scene.create(ElementDesc::Group);
        scene.add_class(g, "active");
        scene.add_class(g, "active");
        assert!(scene.has_class(g, "active"));
        scene.remove_class(g, "active");
        assert!(!scene.has_class(g, "active"));
        let adds = scene
            .ops()
            .iter()
            .filter(|op| matches!(op, SceneOp::AddClass(..)))
            .count();
        assert_eq!(adds, 1);
    }
}
