// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node storage and structure: a generational arena with parent/child links.

use hashbrown::HashMap;

use crate::data::NodeRecord;
use crate::node::MindMapNode;
use crate::uid::create_uid;

/// Identifier for a node in a [`NodeTree`].
///
/// Generational: a freed slot can be reused, but stale IDs are rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Owner of every [`MindMapNode`] of a map.
///
/// All structural mutation goes through [`link`](Self::link),
/// [`unlink`](Self::unlink), and [`free_subtree`](Self::free_subtree), which
/// keep `parent` and `children` in agreement. Summary nodes live in the same
/// arena but are never linked; their owner is recorded in
/// [`MindMapNode::generalization_belong`].
///
/// ```rust
/// use understory_mindmap::{NodeRecord, NodeTree};
///
/// let record = NodeRecord::with_text("root")
///     .child(NodeRecord::with_text("a"))
///     .child(NodeRecord::with_text("b").child(NodeRecord::with_text("b1")));
/// let tree = NodeTree::from_record(record);
///
/// let root = tree.root().unwrap();
/// let b = tree.get(root).unwrap().children()[1];
/// let b1 = tree.get(b).unwrap().children()[0];
/// assert_eq!(tree.get(b1).unwrap().layer_index(), 2);
/// assert!(tree.is_ancestor(root, b1));
/// assert_eq!(tree.ancestor_nodes(b1), vec![root, b]);
/// ```
pub struct NodeTree {
    /// slots
    nodes: Vec<Option<MindMapNode>>,
    /// last generation per slot (persists across frees)
    generations: Vec<u32>,
    free_list: Vec<usize>,
    root: Option<NodeId>,
    uids: HashMap<String, NodeId>,
}

impl core::fmt::Debug for NodeTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeTree")
            .field("nodes_total", &self.nodes.len())
            .field("nodes_alive", &self.len())
            .field("free_list", &self.free_list.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            root: None,
            uids: HashMap::new(),
        }
    }

    /// Builds a tree from a hierarchical record; the top record becomes the root.
    #[must_use]
    pub fn from_record(record: NodeRecord) -> Self {
        let mut tree = Self::new();
        let root = tree.insert_record(record);
        tree.set_root(root);
        tree
    }

    /// Inserts a record and all of its descendants, returning the top node.
    ///
    /// The new subtree is detached; link it with [`link`](Self::link).
    pub fn insert_record(&mut self, record: NodeRecord) -> NodeId {
        let NodeRecord { data, children } = record;
        let id = self.insert(MindMapNode::from_data(data));
        for child in children {
            let child_id = self.insert_record(child);
            self.link(id, child_id, None);
        }
        id
    }

    /// Inserts a detached node.
    ///
    /// A node whose uid is already taken gets a fresh one, keeping uids unique.
    pub fn insert(&mut self, mut node: MindMapNode) -> NodeId {
        if node.uid.is_empty() || self.uids.contains_key(&node.uid) {
            node.uid = create_uid();
            node.data.uid = Some(node.uid.clone());
        }
        let uid = node.uid.clone();
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(node);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(node));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        let id = NodeId::new(idx, generation);
        self.uids.insert(uid, id);
        id
    }

    /// Returns `true` if `id` refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.generations.get(id.idx()).copied() == Some(id.1)
            && self.nodes.get(id.idx()).is_some_and(Option::is_some)
    }

    /// Returns the node, if live.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&MindMapNode> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes[id.idx()].as_ref()
    }

    /// Returns the node mutably, if live.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut MindMapNode> {
        if !self.is_alive(id) {
            return None;
        }
        self.nodes[id.idx()].as_mut()
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.root.filter(|id| self.is_alive(*id))
    }

    /// Makes `id` the single root, detaching it from any parent.
    pub fn set_root(&mut self, id: NodeId) {
        if !self.is_alive(id) {
            return;
        }
        self.unlink(id);
        if let Some(old) = self.root.take()
            && let Some(node) = self.get_mut(old)
        {
            node.is_root = false;
        }
        if let Some(node) = self.get_mut(id) {
            node.is_root = true;
        }
        self.set_layer(id, 0);
        self.root = Some(id);
    }

    /// Number of live nodes, summary nodes included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns `true` if no node is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over every live node.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &MindMapNode)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(idx, slot)| {
            let node = slot.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let id = NodeId::new(idx as u32, self.generations[idx]);
            Some((id, node))
        })
    }

    /// Looks a node up by uid.
    #[must_use]
    pub fn find_by_uid(&self, uid: &str) -> Option<NodeId> {
        self.uids.get(uid).copied().filter(|id| self.is_alive(*id))
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    /// Children of `id`; empty for unknown nodes.
    #[must_use]
    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Appends `child` under `parent`, or inserts it at `index`.
    ///
    /// The child is unlinked from its previous parent first. Returns `false`
    /// (and changes nothing) if either node is dead, if `child` is the root or
    /// a summary node, or if linking would create a cycle.
    pub fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) -> bool {
        if parent == child || !self.is_alive(parent) || !self.is_alive(child) {
            return false;
        }
        if self.root == Some(child) || self.is_ancestor(child, parent) {
            return false;
        }
        if self.get(child).is_some_and(MindMapNode::is_generalization) {
            return false;
        }
        self.unlink(child);
        let layer = match self.get_mut(parent) {
            Some(p) => {
                let at = index.unwrap_or(p.children.len()).min(p.children.len());
                p.children.insert(at, child);
                p.layer_index + 1
            }
            None => return false,
        };
        if let Some(c) = self.get_mut(child) {
            c.parent = Some(parent);
        }
        self.set_layer(child, layer);
        true
    }

    /// Detaches `child` from its parent. Returns the former parent.
    pub fn unlink(&mut self, child: NodeId) -> Option<NodeId> {
        let parent = self.get_mut(child)?.parent.take()?;
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        Some(parent)
    }

    /// Frees `id` and its descendants, returning the freed nodes in pre-order.
    ///
    /// Summary nodes owned by freed nodes are freed too.
    pub fn free_subtree(&mut self, id: NodeId) -> Vec<MindMapNode> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        self.unlink(id);
        let mut freed = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes[current.idx()].take() else {
                continue;
            };
            self.free_list.push(current.idx());
            if self.uids.get(&node.uid) == Some(&current) {
                self.uids.remove(&node.uid);
            }
            if self.root == Some(current) {
                self.root = None;
            }
            stack.extend(node.children.iter().rev().copied());
            stack.extend(node.generalizations.iter().map(|g| g.node));
            freed.push(node);
        }
        freed
    }

    fn set_layer(&mut self, id: NodeId, layer: usize) {
        let mut stack = vec![(id, layer)];
        while let Some((current, layer)) = stack.pop() {
            if let Some(node) = self.get_mut(current) {
                node.layer_index = layer;
                stack.extend(node.children.iter().map(|c| (*c, layer + 1)));
            }
        }
    }

    /// Returns `true` if `ancestor` is a strict ancestor of `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        if ancestor == node {
            return false;
        }
        let mut current = self.parent_of(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent_of(p);
        }
        false
    }

    /// Returns `true` if `parent` is the direct parent of `node`.
    #[must_use]
    pub fn is_parent(&self, parent: NodeId, node: NodeId) -> bool {
        parent != node && self.parent_of(node) == Some(parent)
    }

    /// Returns `true` if `a` and `b` are distinct children of the same parent.
    #[must_use]
    pub fn is_brother(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.parent_of(a).is_some() && self.parent_of(a) == self.parent_of(b)
    }

    /// Position of `id` among its siblings.
    #[must_use]
    pub fn index_in_brothers(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children_of(parent).iter().position(|c| *c == id)
    }

    /// Ancestors of `id`, root first, excluding `id`.
    #[must_use]
    pub fn ancestor_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut list = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(p) = current {
            list.push(p);
            current = self.parent_of(p);
        }
        list.reverse();
        list
    }

    /// Descendants of `id` in pre-order, excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children_of(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children_of(current).iter().rev().copied());
        }
        out
    }

    /// Returns `true` when `id` is pinned on both axes.
    #[must_use]
    pub fn has_custom_position(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(MindMapNode::has_custom_position)
    }

    /// Returns `true` when `id` or any ancestor is pinned.
    #[must_use]
    pub fn ancestor_has_custom_position(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.has_custom_position(node) {
                return true;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// Returns `true` when a strict ancestor of `id` owns summary data.
    #[must_use]
    pub fn ancestor_has_generalization(&self, id: NodeId) -> bool {
        let mut current = self.parent_of(id);
        while let Some(node) = current {
            if self.get(node).is_some_and(MindMapNode::check_has_generalization) {
                return true;
            }
            current = self.parent_of(node);
        }
        false
    }

    /// Plain record of `id` and its subtree.
    ///
    /// `remove_active` clears `isActive`; `remove_id` drops uids. Summary uids
    /// are dropped with the node uids.
    #[must_use]
    pub fn pure_data(
        &self,
        id: NodeId,
        remove_active: bool,
        remove_id: bool,
    ) -> Option<NodeRecord> {
        let node = self.get(id)?;
        let mut data = node.data.clone();
        if remove_active {
            data.is_active = false;
        }
        if remove_id {
            data.uid = None;
            for g in &mut data.generalization {
                g.uid = None;
            }
        }
        data.inserting = false;
        let children = node
            .children
            .iter()
            .filter_map(|c| self.pure_data(*c, remove_active, remove_id))
            .collect();
        Some(NodeRecord { data, children })
    }

    /// Detached copy of `id` with a fresh uid and otherwise identical state.
    ///
    /// The copy still refers to the original's children and scene elements,
    /// so it is only useful for measurement and previews; it is not inserted.
    #[must_use]
    pub fn fake_clone(&self, id: NodeId) -> Option<MindMapNode> {
        let mut node = self.get(id)?.clone();
        node.uid = create_uid();
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeData;

    fn sample() -> (NodeTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = NodeTree::new();
        let root = tree.insert(MindMapNode::from_data(NodeRecord::with_text("r").data));
        tree.set_root(root);
        let a = tree.insert(MindMapNode::from_data(NodeRecord::with_text("a").data));
        let b = tree.insert(MindMapNode::from_data(NodeRecord::with_text("b").data));
        let b1 = tree.insert(MindMapNode::from_data(NodeRecord::with_text("b1").data));
        assert!(tree.link(root, a, None));
        assert!(tree.link(root, b, None));
        assert!(tree.link(b, b1, None));
        (tree, root, a, b, b1)
    }

    #[test]
    fn links_keep_parent_and_children_in_sync() {
        let (tree, root, a, b, b1) = sample();
        assert_eq!(tree.children_of(root), &[a, b]);
        assert_eq!(tree.parent_of(b1), Some(b));
        assert!(tree.get(root).unwrap().is_root());
        assert_eq!(tree.get(b1).unwrap().layer_index(), 2);
        assert_eq!(tree.index_in_brothers(b), Some(1));
        assert_eq!(tree.index_in_brothers(root), None);
    }

    #[test]
    fn cycles_and_self_links_are_rejected() {
        let (mut tree, root, _, b, b1) = sample();
        assert!(!tree.link(b1, b, None));
        assert!(!tree.link(b, b, None));
        assert!(!tree.link(b1, root, None));
        assert_eq!(tree.parent_of(b), Some(root));
    }

    #[test]
    fn relinking_moves_and_updates_layers() {
        let (mut tree, root, a, b, b1) = sample();
        assert!(tree.link(a, b, Some(0)));
        assert_eq!(tree.children_of(root), &[a]);
        assert_eq!(tree.children_of(a), &[b]);
        assert_eq!(tree.get(b1).unwrap().layer_index(), 3);
    }

    #[test]
    fn insert_at_index_clamps() {
        let (mut tree, root, a, b, _) = sample();
        let c = tree.insert(MindMapNode::from_data(NodeData::default()));
        assert!(tree.link(root, c, Some(0)));
        assert_eq!(tree.children_of(root), &[c, a, b]);
        let d = tree.insert(MindMapNode::from_data(NodeData::default()));
        assert!(tree.link(root, d, Some(99)));
        assert_eq!(tree.children_of(root).last(), Some(&d));
    }

    #[test]
    fn relationship_queries() {
        let (tree, root, a, b, b1) = sample();
        assert!(tree.is_ancestor(root, b1));
        assert!(!tree.is_ancestor(b1, root));
        assert!(!tree.is_ancestor(a, a));
        assert!(tree.is_parent(b, b1));
        assert!(!tree.is_parent(root, b1));
        assert!(tree.is_brother(a, b));
        assert!(!tree.is_brother(a, a));
        assert!(!tree.is_brother(root, a));
        assert_eq!(tree.ancestor_nodes(b1), vec![root, b]);
        assert_eq!(tree.descendants(root), vec![a, b, b1]);
    }

    #[test]
    fn duplicate_uids_are_replaced() {
        let mut tree = NodeTree::new();
        let data = NodeData {
            uid: Some("same".into()),
            ..NodeData::default()
        };
        let first = tree.insert(MindMapNode::from_data(data.clone()));
        let second = tree.insert(MindMapNode::from_data(data));
        assert_eq!(tree.get(first).unwrap().uid(), "same");
        let uid = tree.get(second).unwrap().uid().to_owned();
        assert_ne!(uid, "same");
        assert_eq!(tree.get(second).unwrap().data().uid.as_deref(), Some(uid.as_str()));
        assert_eq!(tree.find_by_uid("same"), Some(first));
        assert_eq!(tree.find_by_uid(&uid), Some(second));
    }

    #[test]
    fn freed_ids_go_stale() {
        let (mut tree, root, _, b, b1) = sample();
        let uid = tree.get(b1).unwrap().uid().to_owned();
        let freed = tree.free_subtree(b);
        assert_eq!(freed.len(), 2);
        assert!(!tree.is_alive(b));
        assert!(!tree.is_alive(b1));
        assert_eq!(tree.find_by_uid(&uid), None);
        assert_eq!(tree.children_of(root).len(), 1);

        // The slot is reused with a new generation.
        let c = tree.insert(MindMapNode::from_data(NodeData::default()));
        assert!(tree.is_alive(c));
        assert!(!tree.is_alive(b1) && !tree.is_alive(b));
    }

    #[test]
    fn custom_position_checks_walk_ancestors() {
        let (mut tree, _, a, b, b1) = sample();
        let node = tree.get_mut(b).unwrap();
        node.custom_left = Some(10.0);
        assert!(!tree.has_custom_position(b));
        tree.get_mut(b).unwrap().custom_top = Some(0.0);
        assert!(tree.has_custom_position(b));
        assert!(tree.ancestor_has_custom_position(b));
        assert!(tree.ancestor_has_custom_position(b1));
        assert!(!tree.ancestor_has_custom_position(a));
    }

    #[test]
    fn pure_data_strips_state() {
        let (mut tree, root, _, b, _) = sample();
        tree.get_mut(b).unwrap().data.is_active = true;
        let record = tree.pure_data(root, true, true).unwrap();
        assert_eq!(record.children.len(), 2);
        assert!(!record.children[1].data.is_active);
        assert_eq!(record.children[1].data.uid, None);
        assert_eq!(record.children[1].children[0].data.text, "b1");

        let kept = tree.pure_data(b, false, false).unwrap();
        assert!(kept.data.is_active);
        assert!(kept.data.uid.is_some());
    }

    #[test]
    fn fake_clone_changes_only_the_uid() {
        let (tree, _, _, b, _) = sample();
        let clone = tree.fake_clone(b).unwrap();
        let original = tree.get(b).unwrap();
        assert_ne!(clone.uid(), original.uid());
        assert_eq!(clone.data(), original.data());
        assert_eq!(clone.children(), original.children());
        assert_eq!(clone.size(), original.size());
    }
}
