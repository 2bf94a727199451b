// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Expand/collapse, the expand button, and the quick-create button.

use kurbo::{Size, Vec2};
use peniko::Color;
use tracing::debug;
use understory_scene::{
    Dash, ElementDesc, ElementId, FontDesc, Paint, Parent, SceneBackend, Stroke,
};

use crate::data::NodeRecord;
use crate::layout::expanded_nodes;
use crate::mindmap::MindMap;
use crate::node::{ExpandBtnState, NodeFlags};
use crate::scheduler::Continuation;
use crate::style::{StyleProp, StyleResolver, StyleScope, parse_css_color};
use crate::tree::NodeId;

const EXPAND_BTN_CLASS: &str = "smm-expand-btn";
const QUICK_CREATE_CLASS: &str = "smm-quick-create-node-btn";

impl<S: SceneBackend> MindMap<S> {
    /// Expands or collapses `id`.
    ///
    /// Collapsing detaches the subtree and drops the node's own lines; the
    /// subtree stays in memory. Expanding sizes descendants that were never
    /// sized and renders them at their last computed positions. Siblings and
    /// the parent are not touched; run a render pass to lay them out again.
    pub fn set_node_expand(&mut self, id: NodeId, expand: bool) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.data.expand = expand;
        let children = node.children.clone();
        if expand {
            for d in expanded_nodes(&self.tree, id) {
                if self.tree.get(d).is_some_and(|n| n.content.is_empty()) {
                    self.compute_size(d, None);
                }
            }
            self.render(id, Continuation::None, false, false);
        } else {
            for child in children {
                self.remove(child);
            }
            self.remove_line(id);
        }
        self.update(id, false);
        debug!(node = ?id, expand, "expand state changed");
    }

    /// Flips the expand state of `id`.
    pub fn toggle_node_expand(&mut self, id: NodeId) {
        if let Some(expand) = self.tree.get(id).map(|n| n.data.expand) {
            self.set_node_expand(id, !expand);
        }
    }

    fn decoration_color(&self, id: NodeId) -> Color {
        let resolver = StyleResolver::new(&self.tree, &self.theme);
        parse_css_color(&resolver.text(id, StyleProp::LineColor, StyleScope::Base))
            .unwrap_or(Color::from_rgba8(128, 128, 128, 255))
    }

    /// Builds a round button: a circle with a centered label.
    fn round_button(&mut self, class: &str, label: &str, color: Color) -> ElementId {
        let size = self.options.expand_btn_size;
        let button = self.scene.create(ElementDesc::Group);
        self.scene.add_class(button, class);
        let circle = self.scene.create(ElementDesc::Circle { radius: size / 2.0 });
        self.scene.set_paint(
            circle,
            Paint {
                fill: Some(Color::WHITE),
                stroke: Some(Stroke {
                    color,
                    width: 1.0,
                    dash: Dash::new(),
                }),
            },
        );
        self.scene.append(Parent::Element(button), circle);
        let font = FontDesc {
            size: (size * 0.6).max(1.0),
            ..FontDesc::default()
        };
        let measured = self.scene.measure_text(label, &font);
        let text = self.scene.create(ElementDesc::Text {
            content: label.to_owned(),
            font,
        });
        self.scene.set_paint(
            text,
            Paint {
                fill: Some(color),
                stroke: None,
            },
        );
        self.scene.set_translation(
            text,
            Vec2::new((size - measured.width) / 2.0, (size - measured.height) / 2.0),
        );
        self.scene.append(Parent::Element(button), text);
        button
    }

    /// Draws the expand button to the right of the node.
    ///
    /// An open node shows a minus sign, a closed one its descendant count.
    /// The button is only rebuilt when that label changes.
    pub(crate) fn render_expand_btn(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let Some(group) = node.group else {
            return;
        };
        if node.children.is_empty() {
            return;
        }
        let closed = !node.data.expand;
        let count = if closed {
            self.tree.descendants(id).len()
        } else {
            0
        };
        let offset = Vec2::new(
            node.width,
            node.height / 2.0 - self.options.expand_btn_size / 2.0,
        );
        let current = node.decorations.expand_btn;
        let element = match current {
            Some(state) if state.closed == closed && state.count == count => state.element,
            _ => {
                if let Some(old) = current {
                    self.scene.destroy(old.element);
                }
                let label = if closed {
                    count.to_string()
                } else {
                    "-".to_owned()
                };
                let color = self.decoration_color(id);
                let element = self.round_button(EXPAND_BTN_CLASS, &label, color);
                if let Some(node) = self.tree.get_mut(id) {
                    node.decorations.expand_btn = Some(ExpandBtnState {
                        element,
                        closed,
                        count,
                    });
                }
                element
            }
        };
        if !self.scene.is_attached(element) {
            self.scene.append(Parent::Element(group), element);
        }
        self.scene.set_translation(element, offset);
    }

    /// Shows the expand button.
    pub fn show_expand_btn(&mut self, id: NodeId) {
        if self.options.not_show_expand_btn {
            return;
        }
        self.render_expand_btn(id);
        if let Some(state) = self.tree.get(id).and_then(|n| n.decorations.expand_btn) {
            self.scene.set_visible(state.element, true);
        }
    }

    /// Hides the expand button of an open node that is neither active nor
    /// hovered. Closed nodes always keep theirs.
    pub fn hide_expand_btn(&mut self, id: NodeId) {
        if self.options.always_show_expand_btn {
            return;
        }
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if !node.data.expand
            || node.data.is_active
            || node.flags.contains(NodeFlags::MOUSE_ENTERED)
        {
            return;
        }
        if let Some(state) = node.decorations.expand_btn {
            self.scene.set_visible(state.element, false);
        }
    }

    /// Destroys the expand button.
    pub fn remove_expand_btn(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        if let Some(state) = node.decorations.expand_btn.take() {
            self.scene.destroy(state.element);
        }
    }

    /// Keeps an invisible hit area where the expand button sits, so hovering
    /// towards a hidden button does not leave the node.
    pub(crate) fn update_expand_btn_placeholder(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let Some(group) = node.group else {
            return;
        };
        let wanted = !self.options.not_show_expand_btn && !node.children.is_empty();
        let size = Size::new(self.options.expand_btn_size, node.height);
        let offset = Vec2::new(node.width, 0.0);
        let current = node.decorations.placeholder;
        match current {
            Some((element, old)) if wanted && old == size => {
                self.scene.set_translation(element, offset);
            }
            _ => {
                if let Some((element, _)) = current {
                    self.scene.destroy(element);
                }
                let placeholder = wanted.then(|| {
                    let element = self.scene.create(ElementDesc::Rect { size, radius: 0.0 });
                    self.scene.append(Parent::Element(group), element);
                    self.scene.set_translation(element, offset);
                    (element, size)
                });
                if let Some(node) = self.tree.get_mut(id) {
                    node.decorations.placeholder = placeholder;
                }
            }
        }
    }

    /// Shows the button that adds a first child.
    pub fn show_quick_create_btn(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let Some(group) = node.group else {
            return;
        };
        if !node.children.is_empty() {
            return;
        }
        let offset = Vec2::new(
            node.width,
            node.height / 2.0 - self.options.expand_btn_size / 2.0,
        );
        let element = match node.decorations.quick_create {
            Some(element) => element,
            None => {
                let color = self.decoration_color(id);
                let element = self.round_button(QUICK_CREATE_CLASS, "+", color);
                self.scene.append(Parent::Element(group), element);
                if let Some(node) = self.tree.get_mut(id) {
                    node.decorations.quick_create = Some(element);
                }
                element
            }
        };
        self.scene.set_translation(element, offset);
        self.scene.set_visible(element, true);
    }

    /// Hides the quick-create button.
    pub fn hide_quick_create_btn(&mut self, id: NodeId) {
        if let Some(element) = self.tree.get(id).and_then(|n| n.decorations.quick_create) {
            self.scene.set_visible(element, false);
        }
    }

    /// Destroys the quick-create button.
    pub fn remove_quick_create_btn(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        if let Some(element) = node.decorations.quick_create.take() {
            self.scene.destroy(element);
        }
    }

    /// Inserts `record` as the last child of `parent` and renders.
    ///
    /// The new node is activated and a
    /// [`NodeDblclick`](crate::MindMapEvent::NodeDblclick) with `inserting`
    /// set asks the host to start editing it. Returns `None` when `parent` is
    /// gone or is a summary node.
    pub fn insert_child_node(&mut self, parent: NodeId, mut record: NodeRecord) -> Option<NodeId> {
        if self.tree.get(parent)?.is_generalization {
            return None;
        }
        record.data.inserting = true;
        let child = self.tree.insert_record(record);
        if !self.tree.link(parent, child, None) {
            self.tree.free_subtree(child);
            return None;
        }
        if let Some(node) = self.tree.get_mut(parent) {
            node.data.expand = true;
        }
        debug!(parent = ?parent, child = ?child, "child inserted");
        self.render_tree();
        Some(child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mindmap::MindMapBuilder;
    use crate::options::MindMapOptions;
    use understory_scene::{Layer, RetainedScene};

    fn map(options: MindMapOptions) -> (MindMap<RetainedScene>, NodeId) {
        let mut map = MindMapBuilder::new().options(options).build(RetainedScene::new());
        let root = map.load(
            NodeRecord::with_text("root")
                .child(
                    NodeRecord::with_text("a")
                        .child(NodeRecord::with_text("a1"))
                        .child(NodeRecord::with_text("a2")),
                )
                .child(NodeRecord::with_text("b")),
        );
        map.render_tree();
        (map, root)
    }

    #[test]
    fn collapse_detaches_subtree_and_keeps_it() {
        let (mut map, root) = map(MindMapOptions::default());
        let a = map.tree().children_of(root)[0];
        let a1 = map.tree().children_of(a)[0];
        let a1_group = map.node(a1).unwrap().group().unwrap();
        map.set_node_expand(a, false);
        assert!(!map.scene().is_attached(a1_group));
        assert!(map.scene().contains(a1_group));
        assert!(map.node(a).unwrap().lines().is_empty());
        assert_eq!(map.node(root).unwrap().lines().len(), 2);

        map.set_node_expand(a, true);
        assert!(map.scene().is_attached(a1_group));
        assert_eq!(map.node(a1).unwrap().group(), Some(a1_group));
        assert_eq!(map.node(a).unwrap().lines().len(), 2);
    }

    #[test]
    fn closed_button_shows_descendant_count() {
        let (mut map, root) = map(MindMapOptions::default());
        let a = map.tree().children_of(root)[0];
        map.set_node_expand(a, false);
        let state = map.node(a).unwrap().decorations.expand_btn.unwrap();
        assert!(state.closed);
        assert_eq!(state.count, 2);
        assert!(map.scene().is_visible(state.element));
        let label = map.scene().children(state.element)[1];
        assert_eq!(map.scene().text_content(label), Some("2"));
    }

    #[test]
    fn open_button_hides_unless_active_or_hovered() {
        let (mut map, root) = map(MindMapOptions::default());
        let a = map.tree().children_of(root)[0];
        map.show_expand_btn(a);
        let element = map.node(a).unwrap().decorations.expand_btn.unwrap().element;
        map.hide_expand_btn(a);
        assert!(!map.scene().is_visible(element));
        map.active(a);
        assert!(map.scene().is_visible(element));
        map.hide_expand_btn(a);
        assert!(map.scene().is_visible(element));
    }

    #[test]
    fn leaves_get_no_button_or_placeholder() {
        let (map, root) = map(MindMapOptions::default());
        let b = map.tree().children_of(root)[1];
        let decorations = &map.node(b).unwrap().decorations;
        assert!(decorations.expand_btn.is_none());
        assert!(decorations.placeholder.is_none());
        let a = map.tree().children_of(root)[0];
        let (_, size) = map.node(a).unwrap().decorations.placeholder.unwrap();
        assert_eq!(size.height, map.node(a).unwrap().height());
    }

    #[test]
    fn quick_create_inserts_and_activates() {
        let (mut map, root) = map(MindMapOptions {
            is_show_create_child_btn_icon: true,
            ..MindMapOptions::default()
        });
        let b = map.tree().children_of(root)[1];
        map.active(b);
        let button = map.node(b).unwrap().decorations.quick_create.unwrap();
        assert!(map.scene().is_visible(button));
        let child = map.insert_child_node(b, NodeRecord::with_text("new")).unwrap();
        assert_eq!(map.tree().children_of(b), &[child]);
        assert!(map.node(child).unwrap().is_active());
        assert!(!map.node(b).unwrap().is_active());
        assert!(map.node(b).unwrap().decorations.quick_create.is_none());
        assert!(map.scene().layer_children(Layer::Nodes).len() >= 5);
    }
}
