// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render walk and per-node scene bookkeeping.
//!
//! Rendering is incremental. A node's group is created once and reused;
//! culling detaches it, rendering again reattaches it. Content is only
//! placed again when sizing rebuilt it.

use kurbo::{Point, Rect, Vec2};
use tracing::{trace, warn};
use understory_scene::{ElementDesc, Layer, Paint, Parent, SceneBackend, Stroke};

use crate::content::{ContentKind, NodeContent, node_box};
use crate::event::MindMapEvent;
use crate::mindmap::MindMap;
use crate::node::{Decorations, NodeFlags};
use crate::scheduler::{Continuation, Task};
use crate::shape::shape_path;
use crate::style::StyleResolver;
use crate::tree::NodeId;

const NODE_CLASS: &str = "smm-node";
const DRAGGING_CLASS: &str = "smm-node-dragging";
const HIGHLIGHT_CLASS: &str = "smm-node-highlight";

impl<S: SceneBackend> MindMap<S> {
    /// Renders `id` and, while expanded, its subtree.
    ///
    /// `then` runs once `id` and every child subtree reported completion.
    /// With `deferred`, children are queued on the task queue instead of
    /// rendered in place. A node that was destroyed or freed renders nothing
    /// but still completes.
    pub(crate) fn render(&mut self, id: NodeId, then: Continuation, force: bool, deferred: bool) {
        let Some(node) = self.tree.get(id) else {
            trace!(node = ?id, "render skipped for freed node");
            self.complete(then);
            return;
        };
        if node.is_destroyed() {
            trace!(node = ?id, "render skipped for destroyed node");
            self.complete(then);
            return;
        }
        let is_root = node.is_root;
        self.render_line(id, false);

        let perf = &self.options.performance_config;
        let (padding, always_render_root, detach_offscreen) = (
            perf.padding,
            perf.always_render_root,
            perf.remove_node_when_out_canvas,
        );
        let in_view = force
            || !self.options.open_performance
            || self.check_is_in_client(id, padding)
            || (is_root && always_render_root);
        if in_view {
            self.attach_group(id, force);
        } else if detach_offscreen {
            trace!(node = ?id, "culled, detaching");
            self.remove_self(id);
        } else {
            trace!(node = ?id, "culled");
        }

        let children: Vec<NodeId> = match self.tree.get(id) {
            Some(node) if node.is_expanded() => node.children.clone(),
            _ => Vec::new(),
        };
        if children.is_empty() {
            self.complete(then);
        } else {
            let slot = self.completions.open(children.len(), then);
            for child in children {
                if deferred {
                    self.tasks.push(Task::RenderChild {
                        node: child,
                        slot,
                        force,
                    });
                } else {
                    self.render(child, Continuation::Parent(slot), force, false);
                }
            }
        }

        let inserting = self.tree.get_mut(id).is_some_and(|node| {
            let was = node.data.inserting;
            node.data.inserting = false;
            was
        });
        if inserting {
            self.active(id);
            self.emit(MindMapEvent::NodeDblclick {
                node: id,
                input: None,
                inserting: true,
            });
        }
    }

    fn attach_group(&mut self, id: NodeId, force: bool) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        match node.group {
            None => {
                let group = self.scene.create(ElementDesc::Group);
                self.scene.add_class(group, NODE_CLASS);
                self.scene.append(Parent::Layer(Layer::Nodes), group);
                node.group = Some(group);
                trace!(node = ?id, "group created");
                self.layout_content(id);
                self.update_expand_btn_placeholder(id);
                self.update(id, force);
            }
            Some(group) => {
                if !self.scene.is_attached(group) {
                    self.scene.append(Parent::Layer(Layer::Nodes), group);
                    trace!(node = ?id, "group reattached");
                }
                if node.flags.contains(NodeFlags::NEEDS_LAYOUT) {
                    self.layout_content(id);
                }
                self.update_expand_btn_placeholder(id);
                self.update(id, force);
            }
        }
    }

    /// Rebuilds the background shape and places content fragments inside the group.
    pub(crate) fn layout_content(&mut self, id: NodeId) {
        let Some(arrangement) = self.arrangement(id) else {
            return;
        };
        let style = StyleResolver::new(&self.tree, &self.theme).resolved(id);
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.flags.remove(NodeFlags::NEEDS_LAYOUT);
        let Some(group) = node.group else {
            return;
        };
        if let Some(old) = node.shape_element.take() {
            self.scene.destroy(old);
        }
        let shape = self.scene.create(ElementDesc::Path(shape_path(
            style.shape,
            node.size(),
            style.border_radius,
        )));
        let stroke = style
            .border_color
            .filter(|_| style.border_width > 0.0)
            .map(|color| Stroke {
                color,
                width: style.border_width,
                dash: style.border_dash.clone(),
            });
        self.scene.set_paint(
            shape,
            Paint {
                fill: style.fill,
                stroke,
            },
        );
        self.scene.append(Parent::Element(group), shape);
        node.shape_element = Some(shape);

        let origin = node_box(arrangement.size, &style).content_origin;
        for element in node.content.elements() {
            if !arrangement.items.iter().any(|(e, _)| *e == element) {
                self.scene.detach(element);
            }
        }
        for (element, at) in arrangement.items {
            self.scene.append(Parent::Element(group), element);
            self.scene.set_translation(element, origin + at.to_vec2());
        }
    }

    /// Refreshes decorations, summary nodes, presence avatars, and position.
    pub fn update(&mut self, id: NodeId, force: bool) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if node.group.is_none() {
            return;
        }
        self.update_node_active_class(id);
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let children_len = node.children_len();
        let is_active = node.data.is_active;
        let expand = node.data.expand;
        let mouse_entered = node.flags.contains(NodeFlags::MOUSE_ENTERED);

        if !self.options.not_show_expand_btn {
            if children_len == 0 {
                self.remove_expand_btn(id);
            } else if self.options.always_show_expand_btn {
                self.render_expand_btn(id);
            } else if expand && !is_active && !mouse_entered {
                self.hide_expand_btn(id);
            } else {
                self.show_expand_btn(id);
            }
        }
        if self.options.is_show_create_child_btn_icon {
            if children_len > 0 {
                self.remove_quick_create_btn(id);
            } else if is_active {
                self.show_quick_create_btn(id);
            } else {
                self.hide_quick_create_btn(id);
            }
        }
        self.update_drag_handle(id);
        self.render_generalization(id, force);
        self.update_user_list_node(id);

        let readonly = self.options.readonly;
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.data_snapshot = if readonly {
            String::new()
        } else {
            serde_json::to_string(&node.data).unwrap_or_else(|err| {
                warn!(node = ?id, %err, "node data snapshot failed");
                String::new()
            })
        };
        if let Some(group) = node.group {
            let target = Vec2::new(node.left(), node.top());
            if self.scene.translation(group) != target {
                self.scene.set_translation(group, target);
            }
        }
        self.restore_card_note_state(id);
    }

    /// Rebuilds the given content kinds (all with `None`), places them, and
    /// updates the node. Returns whether the size changed.
    pub fn re_render(&mut self, id: NodeId, kinds: Option<&[ContentKind]>) -> bool {
        let changed = self.compute_size(id, kinds);
        self.layout_content(id);
        self.update(id, false);
        changed
    }

    /// Detaches the node's group and summary nodes; data and elements are kept.
    pub fn remove_self(&mut self, id: NodeId) {
        let Some(group) = self.tree.get(id).and_then(|n| n.group) else {
            return;
        };
        self.scene.detach(group);
        self.remove_generalization(id);
    }

    /// Detaches the node and its subtree, dropping their lines.
    ///
    /// Rendering again restores everything.
    pub fn remove(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        // Culled nodes have no group, but their descendants may.
        let group = node.group;
        let children = node.children.clone();
        if let Some(group) = group {
            self.scene.detach(group);
        }
        self.remove_generalization(id);
        self.remove_line(id);
        for child in children {
            self.remove(child);
        }
    }

    /// Releases every scene resource of the node for good.
    ///
    /// The parent's lines are dropped too; they are rebuilt on its next render.
    /// A destroyed node renders nothing.
    pub fn destroy(&mut self, id: NodeId) {
        self.remove_line(id);
        if let Some(parent) = self.tree.parent_of(id) {
            self.remove_line(parent);
        }
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if node.is_destroyed() {
            return;
        }
        if node.group.is_some() {
            self.empty_user(id);
        }
        self.destroy_generalization(id);
        self.hide_card_note_nodes(id);
        self.active.remove(id);
        if self.hovered_card.is_some_and(|h| h.node == id) {
            self.hovered_card = None;
        }
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.reset_when_delete();
        let elements: Vec<_> = node
            .content
            .elements()
            .chain(node.decorations.elements())
            .chain(node.shape_element)
            .chain(node.group)
            .collect();
        for element in elements {
            self.scene.destroy(element);
        }
        node.content = NodeContent::default();
        node.decorations = Decorations::default();
        node.shape_element = None;
        node.group = None;
        node.flags.insert(NodeFlags::DESTROYED);
        trace!(node = ?id, "destroyed");
    }

    /// Hides the node, its line from the parent, and its subtree.
    pub fn hide(&mut self, id: NodeId) {
        self.set_subtree_visible(id, false);
    }

    /// Shows what [`hide`](Self::hide) hid.
    pub fn show(&mut self, id: NodeId) {
        self.set_subtree_visible(id, true);
    }

    fn set_subtree_visible(&mut self, id: NodeId, visible: bool) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.flags.set(NodeFlags::HIDDEN, !visible);
        if let Some(group) = node.group {
            self.scene.set_visible(group, visible);
        }
        let children = node.children.clone();
        if visible {
            self.show_generalization(id);
        } else {
            self.hide_generalization(id);
        }
        if let Some(parent) = self.tree.parent_of(id)
            && let Some(index) = self.tree.index_in_brothers(id)
            && let Some(line) = self.tree.get(parent).and_then(|p| p.lines.get(index).copied())
        {
            self.scene.set_visible(line, visible);
        }
        self.set_lines_visible(id, visible);
        for child in children {
            self.set_subtree_visible(child, visible);
        }
    }

    fn set_lines_visible(&mut self, id: NodeId, visible: bool) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        for &line in &node.lines {
            self.scene.set_visible(line, visible);
        }
    }

    /// Hides the node's lines and its subtree, keeping the node itself.
    pub fn hide_children(&mut self, id: NodeId) {
        self.set_lines_visible(id, false);
        for child in self.tree.children_of(id).to_vec() {
            self.hide(child);
        }
    }

    /// Shows what [`hide_children`](Self::hide_children) hid.
    pub fn show_children(&mut self, id: NodeId) {
        self.set_lines_visible(id, true);
        for child in self.tree.children_of(id).to_vec() {
            self.show(child);
        }
    }

    /// Sets the opacity of the node, its lines, its subtree, and its summaries.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let group = node.group;
        let lines = node.lines.clone();
        let children = node.children.clone();
        if let Some(group) = group {
            self.scene.set_opacity(group, opacity);
        }
        for line in lines {
            self.scene.set_opacity(line, opacity);
        }
        for child in children {
            self.set_opacity(child, opacity);
        }
        self.set_generalization_opacity(id, opacity);
    }

    fn toggle_class(&mut self, id: NodeId, class: &str, on: bool) {
        if let Some(group) = self.tree.get(id).and_then(|n| n.group) {
            if on {
                self.scene.add_class(group, class);
            } else {
                self.scene.remove_class(group, class);
            }
        }
    }

    /// Marks the node highlighted.
    pub fn highlight(&mut self, id: NodeId) {
        self.toggle_class(id, HIGHLIGHT_CLASS, true);
    }

    /// Clears the highlight.
    pub fn close_highlight(&mut self, id: NodeId) {
        self.toggle_class(id, HIGHLIGHT_CLASS, false);
    }

    /// Marks the node as being dragged.
    pub fn start_drag(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get_mut(id) {
            node.flags.insert(NodeFlags::DRAGGING);
        }
        self.toggle_class(id, DRAGGING_CLASS, true);
    }

    /// Clears the dragging mark.
    pub fn end_drag(&mut self, id: NodeId) {
        if let Some(node) = self.tree.get_mut(id) {
            node.flags.remove(NodeFlags::DRAGGING);
        }
        self.toggle_class(id, DRAGGING_CLASS, false);
    }

    /// Returns `true` if the node's box overlaps the canvas grown by `padding`.
    #[must_use]
    pub fn check_is_in_client(&self, id: NodeId, padding: f64) -> bool {
        self.tree
            .get(id)
            .is_some_and(|n| self.view.is_rect_visible(n.rect(), padding))
    }

    /// Maps a world position onto the canvas.
    #[must_use]
    pub fn node_pos_in_client(&self, world: Point) -> Point {
        self.view.world_to_view_point(world)
    }

    /// The node's box in canvas coordinates, zoom applied.
    #[must_use]
    pub fn rect_in_svg(&self, id: NodeId) -> Option<Rect> {
        self.tree
            .get(id)
            .map(|n| self.view.world_to_view_rect(n.rect()))
    }
}
