// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The active-node registry and the activation paths that feed it.
//!
//! Nodes never keep a selected set of their own. They only ask the map to
//! add or remove them here, and the `isActive` flag in their data mirrors
//! membership.

use understory_scene::SceneBackend;

use crate::event::MindMapEvent;
use crate::mindmap::MindMap;
use crate::tree::NodeId;

/// Ordered set of active nodes with a change counter.
///
/// The last node added is the primary one. The revision only moves when
/// membership or the primary actually changes.
///
/// ```rust
/// use understory_mindmap::{MindMapBuilder, NodeRecord};
/// use understory_scene::RetainedScene;
///
/// let mut map = MindMapBuilder::new().build(RetainedScene::new());
/// let root = map.load(NodeRecord::with_text("root").child(NodeRecord::with_text("a")));
/// let a = map.tree().children_of(root)[0];
///
/// let before = map.active_nodes().revision();
/// map.add_node_to_active_list(a);
/// map.add_node_to_active_list(a);
/// assert_eq!(map.active_nodes().items(), &[a]);
/// assert_eq!(map.active_nodes().revision(), before + 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ActiveNodes {
    items: Vec<NodeId>,
    primary: Option<usize>,
    revision: u64,
}

impl ActiveNodes {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: Vec::new(),
            primary: None,
            revision: 0,
        }
    }

    /// Returns `true` if nothing is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of active nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Active nodes in activation order.
    #[must_use]
    pub fn items(&self) -> &[NodeId] {
        &self.items
    }

    /// Most recently added node.
    #[must_use]
    pub fn primary(&self) -> Option<NodeId> {
        self.primary.map(|idx| self.items[idx])
    }

    /// Change counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns `true` if `id` is active.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.items.contains(&id)
    }

    /// Adds `id`; returns `false` if it was already present.
    pub(crate) fn add(&mut self, id: NodeId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.items.push(id);
        self.primary = Some(self.items.len() - 1);
        self.bump_revision();
        true
    }

    /// Removes `id`; returns `false` if it was not present.
    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        let Some(idx) = self.items.iter().position(|n| *n == id) else {
            return false;
        };
        self.items.remove(idx);
        self.primary = match self.primary {
            Some(p) if p == idx => self.items.len().checked_sub(1),
            Some(p) if p > idx => Some(p - 1),
            other => other,
        };
        self.bump_revision();
        true
    }

    /// Empties the registry, returning the previous members.
    pub(crate) fn take(&mut self) -> Vec<NodeId> {
        if self.items.is_empty() {
            return Vec::new();
        }
        self.primary = None;
        self.bump_revision();
        core::mem::take(&mut self.items)
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// The active-node registry.
    #[must_use]
    pub fn active_nodes(&self) -> &ActiveNodes {
        &self.active
    }

    /// Makes `id` the only active node.
    ///
    /// Returns `false` when the input was not handled: the map is readonly or
    /// the node is gone. Activating an already active node is handled and
    /// changes nothing.
    pub fn active(&mut self, id: NodeId) -> bool {
        if self.options.readonly {
            return false;
        }
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        if node.data.is_active {
            return true;
        }
        self.emit(MindMapEvent::BeforeNodeActive {
            node: id,
            active: self.active.items().to_vec(),
        });
        self.clear_active_node_list();
        self.add_node_to_active_list(id);
        self.emit_node_active_event(Some(id));
        true
    }

    /// Removes `id` from the active set and notifies the host.
    pub fn deactivate(&mut self, id: NodeId) {
        self.remove_node_from_active_list(id);
        self.emit_node_active_event(None);
    }

    /// Adds `id` to the active set without clearing the others.
    pub fn add_node_to_active_list(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        if !self.active.add(id) {
            return;
        }
        node.data.is_active = true;
        self.update_node_by_active(id, true);
    }

    /// Removes `id` from the active set.
    pub fn remove_node_from_active_list(&mut self, id: NodeId) {
        if !self.active.remove(id) {
            return;
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.data.is_active = false;
        }
        self.update_node_by_active(id, false);
    }

    /// Deactivates every node.
    pub fn clear_active_node_list(&mut self) {
        for id in self.active.take() {
            if let Some(node) = self.tree.get_mut(id) {
                node.data.is_active = false;
            }
            self.update_node_by_active(id, false);
        }
    }

    /// Tells the host the active set changed.
    pub fn emit_node_active_event(&mut self, node: Option<NodeId>) {
        self.emit(MindMapEvent::NodeActive {
            node,
            active: self.active.items().to_vec(),
        });
    }

    /// Refreshes the decorations that depend on activation.
    pub fn update_node_by_active(&mut self, id: NodeId, active: bool) {
        if self.tree.get(id).and_then(|n| n.group).is_none() {
            return;
        }
        if active {
            self.show_expand_btn(id);
            if self.options.is_show_create_child_btn_icon {
                self.show_quick_create_btn(id);
            }
        } else {
            self.hide_expand_btn(id);
            if self.options.is_show_create_child_btn_icon {
                self.hide_quick_create_btn(id);
            }
        }
        self.update_node_active_class(id);
        self.update_drag_handle(id);
    }

    pub(crate) fn update_node_active_class(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let Some(group) = node.group else {
            return;
        };
        if node.data.is_active {
            self.scene.add_class(group, "active");
        } else {
            self.scene.remove_class(group, "active");
        }
    }
}
