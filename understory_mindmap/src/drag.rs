// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pinned positions, node dragging, and the width-resize handle.
//!
//! ## Usage
//!
//! 1) [`MindMap::begin_node_drag`] with the pointer position on the canvas.
//! 2) [`MindMap::drag_node_to`] on every move; the node is pinned at its
//!    start position plus the pointer offset, converted to world units.
//! 3) [`MindMap::end_node_drag`] when the pointer is released.
//!
//! ```
//! use kurbo::Point;
//! use understory_mindmap::{MindMap, NodeRecord};
//! use understory_scene::RetainedScene;
//!
//! let mut map = MindMap::new(RetainedScene::new());
//! let root = map.load(NodeRecord::with_text("root").child(NodeRecord::with_text("a")));
//! map.render_tree();
//! let a = map.tree().children_of(root)[0];
//! let start = map.node(a).unwrap().position();
//!
//! assert!(map.begin_node_drag(a, Point::new(0.0, 0.0)));
//! map.drag_node_to(Point::new(30.0, 10.0));
//! map.end_node_drag();
//!
//! let pinned = map.node(a).unwrap().custom_position().unwrap();
//! assert_eq!(pinned, start + kurbo::Vec2::new(30.0, 10.0));
//! ```

use kurbo::{Point, Size, Vec2};
use peniko::Color;
use tracing::debug;
use understory_scene::{ElementDesc, Paint, Parent, SceneBackend};

use crate::content::ContentKind;
use crate::mindmap::MindMap;
use crate::tree::NodeId;

const DRAG_HANDLE_WIDTH: f64 = 4.0;

/// Tracks a pointer drag and the dragged node's position when it started.
#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct DragState {
    /// Pointer position when the drag started.
    pub start_pos: Option<Point>,
    /// Last recorded pointer position.
    pub last_pos: Option<Point>,
    /// Node position when the drag started.
    pub origin: Point,
}

impl DragState {
    /// Starts tracking from `pos` for a node sitting at `origin`.
    pub fn start(&mut self, pos: Point, origin: Point) {
        self.start_pos = Some(pos);
        self.last_pos = Some(pos);
        self.origin = origin;
    }

    /// Records a new pointer position, returning the movement since the last one.
    pub fn update(&mut self, pos: Point) -> Option<Vec2> {
        self.start_pos?;
        let last = self.last_pos.replace(pos)?;
        Some(pos - last)
    }

    /// Pointer offset from the start position.
    pub fn total_offset(&self, current_pos: Point) -> Option<Vec2> {
        self.start_pos.map(|start| current_pos - start)
    }

    /// Ends the drag and resets state.
    pub fn end(&mut self) {
        self.start_pos = None;
        self.last_pos = None;
    }

    /// Returns `true` while a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        self.start_pos.is_some()
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// Pins `id` at `position`, in the node and in its data.
    pub fn set_custom_position(&mut self, id: NodeId, position: Point) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.custom_left = Some(position.x);
        node.custom_top = Some(position.y);
        node.data.custom_left = Some(position.x);
        node.data.custom_top = Some(position.y);
        self.refresh_position(id);
    }

    /// Unpins `id`; it returns to its layout position.
    pub fn clear_custom_position(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.custom_left = None;
        node.custom_top = None;
        node.data.custom_left = None;
        node.data.custom_top = None;
        self.refresh_position(id);
    }

    /// Moves the group and redraws the lines touching the node.
    fn refresh_position(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if let Some(group) = node.group {
            self.scene
                .set_translation(group, Vec2::new(node.left(), node.top()));
        }
        if let Some(parent) = node.parent {
            self.render_line(parent, false);
        }
        self.render_line(id, false);
    }

    /// Moves `id` by `delta` world units and pins it there.
    pub fn drag_by(&mut self, id: NodeId, delta: Vec2) {
        if let Some(position) = self.tree.get(id).map(|n| n.position()) {
            self.set_custom_position(id, position + delta);
        }
    }

    /// Starts dragging `id` from the canvas position `pointer`.
    ///
    /// Returns `false` when the map is readonly or `id` is the root or gone.
    pub fn begin_node_drag(&mut self, id: NodeId, pointer: Point) -> bool {
        if self.options.readonly {
            return false;
        }
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        if node.is_root {
            return false;
        }
        let mut state = DragState::default();
        state.start(pointer, node.position());
        if let Some((previous, _)) = self.drag.replace((id, state)) {
            self.end_drag(previous);
        }
        self.start_drag(id);
        debug!(node = ?id, "drag started");
        true
    }

    /// Follows the pointer; returns the movement in world units.
    pub fn drag_node_to(&mut self, pointer: Point) -> Option<Vec2> {
        let (id, state) = self.drag.as_mut()?;
        let id = *id;
        let delta = state.update(pointer)?;
        let total = state.total_offset(pointer)?;
        let origin = state.origin;
        let zoom = self.view.zoom();
        self.set_custom_position(id, origin + total / zoom);
        Some(delta / zoom)
    }

    /// Ends the drag; returns the node that was dragged.
    pub fn end_node_drag(&mut self) -> Option<NodeId> {
        let (id, mut state) = self.drag.take()?;
        state.end();
        self.end_drag(id);
        debug!(node = ?id, "drag ended");
        Some(id)
    }

    /// Shows the width-resize handle on the right edge of active nodes with
    /// custom content, when resizing is enabled; removes it otherwise.
    pub fn update_drag_handle(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let wanted = self.text_width_editable() && node.data.is_active;
        let current = node.decorations.drag_handle;
        let (Some(group), true) = (node.group, wanted) else {
            if let Some((element, _)) = current {
                self.scene.destroy(element);
                if let Some(node) = self.tree.get_mut(id) {
                    node.decorations.drag_handle = None;
                }
            }
            return;
        };
        let height = node.height;
        let offset = Vec2::new(node.width - DRAG_HANDLE_WIDTH / 2.0, 0.0);
        let element = match current {
            Some((element, h)) if h == height => element,
            _ => {
                if let Some((element, _)) = current {
                    self.scene.destroy(element);
                }
                let element = self.scene.create(ElementDesc::Rect {
                    size: Size::new(DRAG_HANDLE_WIDTH, height),
                    radius: 0.0,
                });
                self.scene.set_paint(
                    element,
                    Paint {
                        fill: Some(Color::from_rgba8(0, 0, 0, 0)),
                        stroke: None,
                    },
                );
                self.scene.add_class(element, "smm-node-drag-handle");
                self.scene.append(Parent::Element(group), element);
                if let Some(node) = self.tree.get_mut(id) {
                    node.decorations.drag_handle = Some((element, height));
                }
                element
            }
        };
        self.scene.set_translation(element, offset);
    }

    /// Whether text width can be changed by hand: the option is on and a
    /// custom content builder is installed and in use.
    #[must_use]
    pub fn text_width_editable(&self) -> bool {
        self.options.enable_drag_modify_node_width
            && self.options.is_use_custom_node_content
            && self.content.custom.is_some()
    }

    /// Sets the text width of `id`, clamped to the configured bounds, and
    /// re-renders its text and custom content.
    ///
    /// Returns `false` when width modification is disabled or `id` is gone.
    pub fn modify_text_width(&mut self, id: NodeId, width: f64) -> bool {
        if !self.text_width_editable() {
            return false;
        }
        let width = self.options.clamp_text_width(width);
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        node.data.custom_text_width = Some(width);
        node.custom_text_width = Some(width);
        self.re_render(id, Some(&[ContentKind::Custom, ContentKind::Text]));
        debug!(node = ?id, width, "text width modified");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentCx, Fragment};
    use crate::data::NodeRecord;
    use crate::mindmap::MindMapBuilder;
    use crate::options::MindMapOptions;
    use understory_scene::RetainedScene;

    fn map(options: MindMapOptions) -> (MindMap<RetainedScene>, NodeId, NodeId) {
        let mut map = MindMapBuilder::new()
            .options(options)
            .custom_content(|cx: &mut ContentCx<'_>| {
                let element = cx.scene().create(ElementDesc::Rect {
                    size: Size::new(80.0, 30.0),
                    radius: 0.0,
                });
                Some(Fragment::new(element, Size::new(80.0, 30.0)))
            })
            .build(RetainedScene::new());
        let root = map.load(NodeRecord::with_text("root").child(NodeRecord::with_text("a")));
        map.render_tree();
        let a = map.tree().children_of(root)[0];
        (map, root, a)
    }

    #[test]
    fn drag_state_tracks_deltas_and_offset() {
        let mut drag = DragState::default();
        assert_eq!(drag.update(Point::new(1.0, 1.0)), None);
        drag.start(Point::new(10.0, 10.0), Point::new(100.0, 50.0));
        assert_eq!(drag.update(Point::new(15.0, 12.0)), Some(Vec2::new(5.0, 2.0)));
        assert_eq!(drag.update(Point::new(16.0, 16.0)), Some(Vec2::new(1.0, 4.0)));
        assert_eq!(drag.total_offset(Point::new(16.0, 16.0)), Some(Vec2::new(6.0, 6.0)));
        drag.end();
        assert!(!drag.is_dragging());
        assert_eq!(drag.total_offset(Point::ZERO), None);
    }

    #[test]
    fn drag_respects_zoom_and_moves_lines() {
        let (mut map, root, a) = map(MindMapOptions::default());
        map.view_mut().set_zoom(2.0);
        let start = map.node(a).unwrap().position();
        let line = map.node(root).unwrap().lines()[0];
        map.scene_mut().clear_ops();
        assert!(map.begin_node_drag(a, Point::new(0.0, 0.0)));
        assert_eq!(map.drag_node_to(Point::new(20.0, 10.0)), Some(Vec2::new(10.0, 5.0)));
        assert_eq!(map.end_node_drag(), Some(a));
        let node = map.node(a).unwrap();
        assert_eq!(node.position(), start + Vec2::new(10.0, 5.0));
        assert_eq!(node.data().custom_left, Some(start.x + 10.0));
        assert!(!node.is_dragging());
        assert!(
            map.scene()
                .ops()
                .iter()
                .any(|op| *op == understory_scene::SceneOp::SetPath(line))
        );
    }

    #[test]
    fn root_cannot_be_dragged() {
        let (mut map, root, _) = map(MindMapOptions::default());
        assert!(!map.begin_node_drag(root, Point::ZERO));
        assert_eq!(map.drag_node_to(Point::new(5.0, 5.0)), None);
    }

    #[test]
    fn clearing_returns_to_layout_position() {
        let (mut map, _, a) = map(MindMapOptions::default());
        let layout = map.node(a).unwrap().position();
        map.drag_by(a, Vec2::new(7.0, 0.0));
        assert!(map.node(a).unwrap().has_custom_position());
        map.clear_custom_position(a);
        assert_eq!(map.node(a).unwrap().position(), layout);
        assert_eq!(map.node(a).unwrap().data().custom_left, None);
    }

    #[test]
    fn handle_needs_custom_content_and_activation() {
        let custom = MindMapOptions {
            is_use_custom_node_content: true,
            ..MindMapOptions::default()
        };
        let (mut map, _, a) = map(custom);
        assert!(map.node(a).unwrap().decorations.drag_handle.is_none());
        map.active(a);
        let (element, height) = map.node(a).unwrap().decorations.drag_handle.unwrap();
        assert_eq!(height, map.node(a).unwrap().height());
        map.deactivate(a);
        assert!(map.node(a).unwrap().decorations.drag_handle.is_none());
        assert!(!map.scene().contains(element));

        let (mut plain, _, a) = self::map(MindMapOptions::default());
        plain.active(a);
        assert!(plain.node(a).unwrap().decorations.drag_handle.is_none());
    }

    #[test]
    fn text_width_is_clamped() {
        let (mut map, _, a) = map(MindMapOptions {
            min_node_text_modify_width: 50.0,
            max_node_text_modify_width: 300.0,
            is_use_custom_node_content: true,
            ..MindMapOptions::default()
        });
        assert!(map.modify_text_width(a, 10.0));
        assert_eq!(map.node(a).unwrap().custom_text_width(), Some(50.0));
        assert!(map.modify_text_width(a, 900.0));
        assert_eq!(map.node(a).unwrap().data().custom_text_width, Some(300.0));

        let (mut off, _, a) = self::map(MindMapOptions {
            enable_drag_modify_node_width: false,
            is_use_custom_node_content: true,
            ..MindMapOptions::default()
        });
        assert!(!off.modify_text_width(a, 120.0));
    }

    #[test]
    fn text_width_needs_custom_content_in_use() {
        let (mut map, _, a) = map(MindMapOptions::default());
        assert!(!map.text_width_editable());
        assert!(!map.modify_text_width(a, 120.0));
        assert_eq!(map.node(a).unwrap().custom_text_width(), None);

        let mut record = NodeRecord::with_text("a label wide enough to wrap");
        record.data.custom_text_width = Some(20.0);
        let root = map.load(record);
        map.render_tree();
        let text = map.node(root).unwrap().content().text().unwrap();
        assert!(text.width > 20.0);
    }
}
