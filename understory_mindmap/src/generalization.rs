// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Summary ("generalization") nodes.
//!
//! A summary is a real node in the arena with no parent: it is owned by the
//! node whose data lists it and is never one of its children. Summaries are
//! sized during the layout pass, before positions exist, and placed by the
//! layout strategy while their owner is updated, after positions exist.

use kurbo::BezPath;
use tracing::{debug, trace};
use understory_scene::{Dash, ElementDesc, Layer, Paint, Parent, SceneBackend, Stroke};

use crate::data::{GeneralizationData, NodeData};
use crate::layout::GeneralizationRequest;
use crate::mindmap::MindMap;
use crate::node::{GeneralizationEntry, MindMapNode, NodeFlags};
use crate::scheduler::Continuation;
use crate::style::{StyleProp, StyleResolver, StyleScope, parse_css_color};
use crate::tree::NodeId;

fn summary_data(source: &GeneralizationData) -> NodeData {
    NodeData {
        text: source.text.clone(),
        uid: source.uid.clone(),
        extra: source.extra.clone(),
        ..NodeData::default()
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// Creates, reuses, or drops the summary nodes of `id` to match its data
    /// and sizes them.
    ///
    /// New summaries get their uid written back into the owner's data so the
    /// same node is found on later passes.
    pub fn update_generalization(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if node.is_generalization {
            return;
        }
        let sources = node.data.generalization.clone();
        let existing = node.generalizations.clone();
        if sources.is_empty() && existing.is_empty() {
            return;
        }
        let layer = node.layer_index + 1;

        let mut entries = Vec::with_capacity(sources.len());
        for (i, source) in sources.iter().enumerate() {
            let reused = existing.get(i).filter(|e| self.tree.is_alive(e.node));
            let entry = match reused {
                Some(entry) => {
                    let wanted = summary_data(source);
                    let stale = self.tree.get_mut(entry.node).is_some_and(|summary| {
                        let stale = summary.data.text != wanted.text
                            || summary.data.extra != wanted.extra;
                        if stale {
                            summary.data.text = wanted.text;
                            summary.data.extra = wanted.extra;
                        }
                        summary.layer_index = layer;
                        stale || summary.content.is_empty()
                    });
                    if stale {
                        self.compute_size(entry.node, None);
                    }
                    entry.clone()
                }
                None => {
                    let mut summary = MindMapNode::from_data(summary_data(source));
                    summary.is_generalization = true;
                    summary.generalization_belong = Some(id);
                    summary.layer_index = layer;
                    let summary_id = self.tree.insert(summary);
                    let uid = self.tree.get(summary_id).map(|s| s.uid.clone());
                    if let Some(owner) = self.tree.get_mut(id)
                        && let Some(data) = owner.data.generalization.get_mut(i)
                    {
                        data.uid = uid;
                    }
                    self.compute_size(summary_id, None);
                    trace!(owner = ?id, summary = ?summary_id, "summary created");
                    GeneralizationEntry {
                        node: summary_id,
                        line: None,
                    }
                }
            };
            entries.push(entry);
        }
        for stale in existing.iter().skip(sources.len()) {
            self.drop_summary(stale);
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.generalizations = entries;
        }
    }

    fn drop_summary(&mut self, entry: &GeneralizationEntry) {
        self.destroy(entry.node);
        if let Some(line) = entry.line {
            self.scene.destroy(line);
        }
        self.tree.free_subtree(entry.node);
        trace!(summary = ?entry.node, "summary dropped");
    }

    /// Places and renders the summary nodes of `id` and their brackets.
    ///
    /// A collapsed owner or one without summaries has them detached instead.
    pub fn render_generalization(&mut self, id: NodeId, force: bool) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if node.is_generalization {
            return;
        }
        if node.generalizations.is_empty() || !node.data.expand {
            self.remove_generalization(id);
            return;
        }
        let entries = node.generalizations.clone();
        let ranges: Vec<Option<[usize; 2]>> =
            node.data.generalization.iter().map(|g| g.range).collect();

        let resolver = StyleResolver::new(&self.tree, &self.theme);
        let line_margin =
            resolver.number(id, StyleProp::GeneralizationLineMargin, StyleScope::Base);
        let node_margin =
            resolver.number(id, StyleProp::GeneralizationNodeMargin, StyleScope::Base);
        let width = resolver.number(id, StyleProp::GeneralizationLineWidth, StyleScope::Base);
        let stroke = parse_css_color(&resolver.text(
            id,
            StyleProp::GeneralizationLineColor,
            StyleScope::Base,
        ))
        .map(|color| Stroke {
            color,
            width,
            dash: Dash::new(),
        });

        for (i, entry) in entries.iter().enumerate() {
            let Some(summary) = self.tree.get(entry.node) else {
                continue;
            };
            let request = GeneralizationRequest {
                owner: id,
                range: ranges.get(i).copied().flatten(),
                size: summary.size(),
                line_margin,
                node_margin,
            };
            let Some(placement) = self.layout.generalization_placement(&self.tree, &request) else {
                trace!(owner = ?id, summary = ?entry.node, "summary has nothing to cover");
                continue;
            };
            if let Some(summary) = self.tree.get_mut(entry.node) {
                summary.layout_left = placement.position.x;
                summary.layout_top = placement.position.y;
            }

            let line = match entry.line.filter(|l| self.scene.contains(*l)) {
                Some(line) => line,
                None => {
                    let line = self.scene.create(ElementDesc::Path(BezPath::new()));
                    if let Some(owner) = self.tree.get_mut(id)
                        && let Some(slot) = owner.generalizations.get_mut(i)
                    {
                        slot.line = Some(line);
                    }
                    line
                }
            };
            if !self.scene.is_attached(line) {
                self.scene.append(Parent::Layer(Layer::Lines), line);
            }
            self.scene.set_path(line, placement.bracket);
            self.scene.set_paint(
                line,
                Paint {
                    fill: None,
                    stroke: stroke.clone(),
                },
            );
            self.render(entry.node, Continuation::None, force, false);
        }
    }

    fn summaries(&self, id: NodeId) -> Vec<GeneralizationEntry> {
        self.tree
            .get(id)
            .map(|n| n.generalizations.clone())
            .unwrap_or_default()
    }

    /// Hides the summary nodes of `id` and their brackets.
    pub fn hide_generalization(&mut self, id: NodeId) {
        self.set_generalization_visible(id, false);
    }

    /// Shows what [`hide_generalization`](Self::hide_generalization) hid.
    pub fn show_generalization(&mut self, id: NodeId) {
        self.set_generalization_visible(id, true);
    }

    fn set_generalization_visible(&mut self, id: NodeId, visible: bool) {
        for entry in self.summaries(id) {
            if let Some(summary) = self.tree.get_mut(entry.node) {
                summary.flags.set(NodeFlags::HIDDEN, !visible);
                if let Some(group) = summary.group {
                    self.scene.set_visible(group, visible);
                }
            }
            if let Some(line) = entry.line {
                self.scene.set_visible(line, visible);
            }
        }
    }

    /// Detaches the summary nodes of `id` and their brackets; rendering the
    /// owner again brings them back.
    pub fn remove_generalization(&mut self, id: NodeId) {
        for entry in self.summaries(id) {
            self.remove_self(entry.node);
            if let Some(line) = entry.line {
                self.scene.detach(line);
            }
        }
    }

    /// Destroys and frees every summary node of `id`. The summary data stays.
    pub(crate) fn destroy_generalization(&mut self, id: NodeId) {
        let entries = match self.tree.get_mut(id) {
            Some(node) => core::mem::take(&mut node.generalizations),
            None => return,
        };
        for entry in &entries {
            self.drop_summary(entry);
        }
    }

    /// Applies `opacity` to the summary nodes of `id` and their brackets.
    pub fn set_generalization_opacity(&mut self, id: NodeId, opacity: f32) {
        for entry in self.summaries(id) {
            if let Some(group) = self.tree.get(entry.node).and_then(|n| n.group) {
                self.scene.set_opacity(group, opacity);
            }
            if let Some(line) = entry.line {
                self.scene.set_opacity(line, opacity);
            }
        }
    }

    /// Nodes a summary covers: the children in its range, or the owner.
    fn covered_by(&self, summary: NodeId) -> Vec<NodeId> {
        let Some(owner) = self.tree.get(summary).and_then(|n| n.generalization_belong) else {
            return Vec::new();
        };
        let Some(node) = self.tree.get(owner) else {
            return Vec::new();
        };
        let index = node.generalizations.iter().position(|e| e.node == summary);
        let range = index
            .and_then(|i| node.data.generalization.get(i))
            .and_then(|g| g.range);
        match range {
            Some([start, end]) => node
                .children
                .iter()
                .enumerate()
                .filter(|(i, _)| (start..=end).contains(i))
                .map(|(_, c)| *c)
                .collect(),
            None => vec![owner],
        }
    }

    pub(crate) fn handle_generalization_mouseenter(&mut self, summary: NodeId) {
        for id in self.covered_by(summary) {
            self.highlight(id);
        }
    }

    pub(crate) fn handle_generalization_mouseleave(&mut self, summary: NodeId) {
        for id in self.covered_by(summary) {
            self.close_highlight(id);
        }
    }

    /// Adds a summary to `id`.
    ///
    /// Returns `false` for the root, for summary nodes, and for nodes under an
    /// ancestor that already has a summary.
    pub fn add_generalization(&mut self, id: NodeId, data: GeneralizationData) -> bool {
        let Some(node) = self.tree.get(id) else {
            return false;
        };
        if node.is_root || node.is_generalization || self.tree.ancestor_has_generalization(id) {
            return false;
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.data.generalization.push(data);
        }
        debug!(node = ?id, "summary added");
        true
    }

    /// Removes every summary of `id`, releasing their nodes.
    pub fn remove_generalizations(&mut self, id: NodeId) -> bool {
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        if node.data.generalization.is_empty() {
            return false;
        }
        node.data.generalization.clear();
        self.destroy_generalization(id);
        debug!(node = ?id, "summaries removed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::NodeRecord;
    use understory_scene::RetainedScene;

    fn map() -> (MindMap<RetainedScene>, NodeId, NodeId) {
        let mut map = MindMap::new(RetainedScene::new());
        let mut a = NodeRecord::with_text("a")
            .child(NodeRecord::with_text("a1"))
            .child(NodeRecord::with_text("a2"))
            .child(NodeRecord::with_text("a3"));
        a.data.generalization.push(GeneralizationData {
            range: Some([0, 1]),
            ..GeneralizationData::new("first two")
        });
        let root = map.load(NodeRecord::with_text("root").child(a));
        map.render_tree();
        let a = map.tree().children_of(root)[0];
        (map, root, a)
    }

    #[test]
    fn summary_is_sized_placed_and_owned() {
        let (map, _, a) = map();
        let entries = map.node(a).unwrap().generalizations();
        assert_eq!(entries.len(), 1);
        let summary = map.node(entries[0].node).unwrap();
        assert!(summary.is_generalization());
        assert_eq!(summary.generalization_belong(), Some(a));
        assert_eq!(summary.layer_index(), 2);
        assert!(summary.width() > 0.0);
        assert!(!map.tree().children_of(a).contains(&entries[0].node));

        let a1 = map.node(map.tree().children_of(a)[0]).unwrap().rect();
        assert!(summary.left() > a1.x1);
        let uid = map.node(a).unwrap().data().generalization[0].uid.clone();
        assert_eq!(uid.as_deref(), Some(summary.uid()));
        assert!(map.scene().is_attached(entries[0].line.unwrap()));
    }

    #[test]
    fn summaries_are_reused_across_passes() {
        let (mut map, _, a) = map();
        let before = map.node(a).unwrap().generalizations().to_vec();
        map.render_tree();
        assert_eq!(map.node(a).unwrap().generalizations(), &before[..]);
    }

    #[test]
    fn collapse_detaches_summary() {
        let (mut map, _, a) = map();
        let entry = map.node(a).unwrap().generalizations()[0].clone();
        let group = map.node(entry.node).unwrap().group().unwrap();
        map.set_node_expand(a, false);
        assert!(!map.scene().is_attached(group));
        assert!(!map.scene().is_attached(entry.line.unwrap()));
        map.set_node_expand(a, true);
        assert!(map.scene().is_attached(group));
    }

    #[test]
    fn hover_highlights_covered_range() {
        let (mut map, _, a) = map();
        let summary = map.node(a).unwrap().generalizations()[0].node;
        let children = map.tree().children_of(a).to_vec();
        map.handle_generalization_mouseenter(summary);
        let lit: Vec<bool> = children
            .iter()
            .map(|c| {
                let group = map.node(*c).unwrap().group().unwrap();
                map.scene().has_class(group, "smm-node-highlight")
            })
            .collect();
        assert_eq!(lit, vec![true, true, false]);
        map.handle_generalization_mouseleave(summary);
        let group = map.node(children[0]).unwrap().group().unwrap();
        assert!(!map.scene().has_class(group, "smm-node-highlight"));
    }

    #[test]
    fn add_is_refused_under_a_summarized_ancestor() {
        let (mut map, root, a) = map();
        let a1 = map.tree().children_of(a)[0];
        assert!(!map.add_generalization(root, GeneralizationData::new("x")));
        assert!(!map.add_generalization(a1, GeneralizationData::new("x")));
    }

    #[test]
    fn removing_frees_summary_nodes() {
        let (mut map, _, a) = map();
        let entry = map.node(a).unwrap().generalizations()[0].clone();
        assert!(map.remove_generalizations(a));
        assert!(map.node(entry.node).is_none());
        assert!(!map.scene().contains(entry.line.unwrap()));
        assert!(map.node(a).unwrap().generalizations().is_empty());
        assert!(!map.remove_generalizations(a));
    }
}
