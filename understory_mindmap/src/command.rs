// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Editing commands.
//!
//! Each [`Command`] changes the data of the tree and then runs whatever
//! sizing, layout, and render work the change needs, so the scene mirrors the
//! tree when [`MindMap::execute_command`] returns (or, with deferred
//! rendering, once pending tasks are served).

use kurbo::Point;
use serde_json::{Map, Value};
use tracing::debug;
use understory_scene::SceneBackend;

use crate::content::ContentKind;
use crate::data::{GeneralizationData, NodeRecord};
use crate::error::MindMapError;
use crate::mindmap::MindMap;
use crate::shape::NodeShape;
use crate::style::{StyleProp, StyleValue};
use crate::tree::NodeId;

/// An edit applied through [`MindMap::execute_command`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Applies a shallow JSON patch to the node data; `null` deletes a key.
    SetNodeData {
        /// Target node.
        node: NodeId,
        /// Patch in the node data's JSON shape.
        patch: Map<String, Value>,
    },
    /// Replaces the node text.
    SetNodeText {
        /// Target node.
        node: NodeId,
        /// New text.
        text: String,
    },
    /// Sets or clears one style override.
    SetNodeStyle {
        /// Target node.
        node: NodeId,
        /// Property.
        prop: StyleProp,
        /// New value; `None` clears the override.
        value: Option<StyleValue>,
    },
    /// Sets the background shape.
    SetNodeShape {
        /// Target node.
        node: NodeId,
        /// New shape.
        shape: NodeShape,
    },
    /// Expands or collapses a node.
    SetNodeExpand {
        /// Target node.
        node: NodeId,
        /// New state.
        expand: bool,
    },
    /// Flips the expand state.
    ToggleNodeExpand(NodeId),
    /// Pins a node.
    SetCustomPosition {
        /// Target node.
        node: NodeId,
        /// World position of the top-left corner.
        position: Point,
    },
    /// Unpins a node.
    ClearCustomPosition(NodeId),
    /// Sets the wrapping width of the node text.
    SetTextWidth {
        /// Target node.
        node: NodeId,
        /// Requested width; clamped to the configured bounds.
        width: f64,
    },
    /// Makes a node the only active one.
    ActivateNode(NodeId),
    /// Removes a node from the active set.
    DeactivateNode(NodeId),
    /// Deactivates every node.
    ClearActiveNodes,
    /// Appends a child.
    InsertChildNode {
        /// Parent node.
        parent: NodeId,
        /// The child and its subtree.
        record: NodeRecord,
    },
    /// Deletes a node and its subtree.
    RemoveNode(NodeId),
    /// Shows or hides the card note badges.
    ToggleCardNotes(NodeId),
    /// Adds a summary.
    AddGeneralization {
        /// Owner.
        node: NodeId,
        /// Summary data.
        data: GeneralizationData,
    },
    /// Removes every summary of a node.
    RemoveGeneralization(NodeId),
    /// Lays out and renders the whole tree.
    Render,
}

impl Command {
    /// The node the command addresses, if any.
    #[must_use]
    pub fn target(&self) -> Option<NodeId> {
        match self {
            Self::SetNodeData { node, .. }
            | Self::SetNodeText { node, .. }
            | Self::SetNodeStyle { node, .. }
            | Self::SetNodeShape { node, .. }
            | Self::SetNodeExpand { node, .. }
            | Self::SetCustomPosition { node, .. }
            | Self::SetTextWidth { node, .. }
            | Self::AddGeneralization { node, .. }
            | Self::InsertChildNode { parent: node, .. } => Some(*node),
            Self::ToggleNodeExpand(node)
            | Self::ClearCustomPosition(node)
            | Self::ActivateNode(node)
            | Self::DeactivateNode(node)
            | Self::RemoveNode(node)
            | Self::ToggleCardNotes(node)
            | Self::RemoveGeneralization(node) => Some(*node),
            Self::ClearActiveNodes | Self::Render => None,
        }
    }

    /// Returns `true` for commands that change node data.
    #[must_use]
    pub fn is_edit(&self) -> bool {
        !matches!(
            self,
            Self::ActivateNode(_)
                | Self::DeactivateNode(_)
                | Self::ClearActiveNodes
                | Self::ToggleNodeExpand(_)
                | Self::SetNodeExpand { .. }
                | Self::ToggleCardNotes(_)
                | Self::Render
        )
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// Runs `command`. Returns the created node for
    /// [`Command::InsertChildNode`], `None` otherwise.
    ///
    /// # Errors
    ///
    /// - [`MindMapError::UnknownNode`] when the target is stale.
    /// - [`MindMapError::Readonly`] for edits on a readonly map.
    /// - [`MindMapError::InvalidParameter`] when the edit is not allowed for
    ///   the target (removing the root, children or summaries on summary
    ///   nodes, nested summaries, disabled width changes).
    /// - [`MindMapError::Serialization`] when a data patch does not fit the
    ///   node data.
    pub fn execute_command(&mut self, command: Command) -> Result<Option<NodeId>, MindMapError> {
        if let Some(node) = command.target()
            && !self.tree.is_alive(node)
        {
            return Err(MindMapError::UnknownNode(node));
        }
        if self.options.readonly && command.is_edit() {
            return Err(MindMapError::Readonly);
        }
        debug!(?command, "execute command");
        match command {
            Command::SetNodeData { node, patch } => {
                let mut expand_changed = None;
                if let Some(n) = self.tree.get_mut(node) {
                    let was = n.data.expand;
                    n.data.merge_patch(&patch)?;
                    if n.data.expand != was {
                        expand_changed = Some(n.data.expand);
                    }
                }
                self.compute_size(node, None);
                if let Some(expand) = expand_changed {
                    self.set_node_expand(node, expand);
                }
                self.render_tree();
            }
            Command::SetNodeText { node, text } => {
                if let Some(n) = self.tree.get_mut(node) {
                    n.data.text = text;
                }
                self.compute_size(node, Some(&[ContentKind::Text]));
                self.render_tree();
            }
            Command::SetNodeStyle { node, prop, value } => {
                if let Some(n) = self.tree.get_mut(node) {
                    n.data.set_style_override(prop, value);
                }
                self.compute_size(node, None);
                self.render_tree();
            }
            Command::SetNodeShape { node, shape } => {
                if let Some(n) = self.tree.get_mut(node) {
                    n.data
                        .set_style_override(StyleProp::Shape, Some(shape.as_str().into()));
                }
                self.compute_size(node, None);
                self.render_tree();
            }
            Command::SetNodeExpand { node, expand } => {
                self.set_node_expand(node, expand);
                self.render_tree();
            }
            Command::ToggleNodeExpand(node) => {
                self.toggle_node_expand(node);
                self.render_tree();
            }
            Command::SetCustomPosition { node, position } => {
                self.set_custom_position(node, position);
            }
            Command::ClearCustomPosition(node) => {
                self.clear_custom_position(node);
                self.render_tree();
            }
            Command::SetTextWidth { node, width } => {
                if !self.modify_text_width(node, width) {
                    return Err(MindMapError::InvalidParameter {
                        name: "width",
                        reason: "text width modification is disabled",
                    });
                }
                self.render_tree();
            }
            Command::ActivateNode(node) => {
                self.active(node);
            }
            Command::DeactivateNode(node) => {
                self.deactivate(node);
            }
            Command::ClearActiveNodes => {
                self.clear_active_node_list();
                self.emit_node_active_event(None);
            }
            Command::InsertChildNode { parent, record } => {
                let child = self.insert_child_node(parent, record).ok_or(
                    MindMapError::InvalidParameter {
                        name: "parent",
                        reason: "summary nodes cannot have children",
                    },
                )?;
                return Ok(Some(child));
            }
            Command::RemoveNode(node) => self.remove_node(node)?,
            Command::ToggleCardNotes(node) => {
                self.toggle_card_note_nodes(node);
            }
            Command::AddGeneralization { node, data } => {
                if !self.add_generalization(node, data) {
                    return Err(MindMapError::InvalidParameter {
                        name: "node",
                        reason: "summaries cannot go on the root, on summary nodes, or below a summary",
                    });
                }
                self.render_tree();
            }
            Command::RemoveGeneralization(node) => {
                if self.remove_generalizations(node) {
                    self.render_tree();
                }
            }
            Command::Render => self.render_tree(),
        }
        Ok(None)
    }

    fn remove_node(&mut self, id: NodeId) -> Result<(), MindMapError> {
        let Some(node) = self.tree.get(id) else {
            return Err(MindMapError::UnknownNode(id));
        };
        if node.is_root {
            return Err(MindMapError::InvalidParameter {
                name: "node",
                reason: "the root cannot be removed",
            });
        }
        if node.is_generalization {
            return Err(MindMapError::InvalidParameter {
                name: "node",
                reason: "summary nodes are removed through their owner",
            });
        }
        let subtree: Vec<NodeId> = core::iter::once(id)
            .chain(self.tree.descendants(id))
            .collect();
        let was_active = subtree.iter().any(|n| self.active.contains(*n));
        for &n in &subtree {
            self.destroy(n);
        }
        self.tree.free_subtree(id);
        if was_active {
            self.emit_node_active_event(None);
        }
        self.render_tree();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mindmap::MindMapBuilder;
    use crate::options::MindMapOptions;
    use serde_json::json;
    use understory_scene::{Layer, RetainedScene};

    fn map() -> (MindMap<RetainedScene>, NodeId, NodeId) {
        let mut map = MindMap::new(RetainedScene::new());
        let root = map.load(
            NodeRecord::with_text("root")
                .child(NodeRecord::with_text("a").child(NodeRecord::with_text("a1")))
                .child(NodeRecord::with_text("b")),
        );
        map.render_tree();
        let a = map.tree().children_of(root)[0];
        (map, root, a)
    }

    #[test]
    fn remove_node_frees_subtree_and_scene() {
        let (mut map, root, a) = map();
        let a1 = map.tree().children_of(a)[0];
        map.active(a1);
        map.execute_command(Command::RemoveNode(a)).unwrap();
        assert!(map.node(a).is_none());
        assert!(map.node(a1).is_none());
        assert!(map.active_nodes().is_empty());
        assert_eq!(map.node(root).unwrap().lines().len(), 1);
        assert_eq!(map.scene().layer_children(Layer::Nodes).len(), 2);
        assert!(matches!(
            map.execute_command(Command::ActivateNode(a)),
            Err(MindMapError::UnknownNode(_))
        ));
    }

    #[test]
    fn root_cannot_be_removed() {
        let (mut map, root, _) = map();
        assert!(matches!(
            map.execute_command(Command::RemoveNode(root)),
            Err(MindMapError::InvalidParameter { .. })
        ));
        assert!(map.node(root).is_some());
    }

    #[test]
    fn text_edit_resizes() {
        let (mut map, _, a) = map();
        let width = map.node(a).unwrap().width();
        map.execute_command(Command::SetNodeText {
            node: a,
            text: "a much longer label".into(),
        })
        .unwrap();
        assert!(map.node(a).unwrap().width() > width);
    }

    #[test]
    fn data_patch_is_applied() {
        let (mut map, _, a) = map();
        let patch = json!({ "text": "patched", "fillColor": "#ff0000" });
        let Value::Object(patch) = patch else {
            unreachable!()
        };
        map.execute_command(Command::SetNodeData { node: a, patch }).unwrap();
        let data = map.node(a).unwrap().data();
        assert_eq!(data.text, "patched");
        assert_eq!(data.style_override(StyleProp::FillColor), Some("#ff0000".into()));
    }

    #[test]
    fn data_patch_collapses_through_expand() {
        let (mut map, _, a) = map();
        let a1 = map.tree().children_of(a)[0];
        let a1_group = map.node(a1).unwrap().group().unwrap();
        let Value::Object(patch) = json!({ "expand": false }) else {
            unreachable!()
        };
        map.execute_command(Command::SetNodeData { node: a, patch }).unwrap();
        assert!(!map.node(a).unwrap().is_expanded());
        assert!(!map.scene().is_attached(a1_group));
        assert!(map.node(a).unwrap().lines().is_empty());

        let Value::Object(patch) = json!({ "expand": true }) else {
            unreachable!()
        };
        map.execute_command(Command::SetNodeData { node: a, patch }).unwrap();
        assert!(map.scene().is_attached(a1_group));
        assert_eq!(map.node(a).unwrap().lines().len(), 1);
    }

    #[test]
    fn readonly_refuses_edits_but_allows_expand() {
        let mut map = MindMapBuilder::new()
            .options(MindMapOptions {
                readonly: true,
                ..MindMapOptions::default()
            })
            .build(RetainedScene::new());
        let root = map.load(NodeRecord::with_text("root").child(NodeRecord::with_text("a")));
        map.render_tree();
        assert!(matches!(
            map.execute_command(Command::SetNodeText {
                node: root,
                text: "x".into()
            }),
            Err(MindMapError::Readonly)
        ));
        map.execute_command(Command::ToggleNodeExpand(root)).unwrap();
        assert!(!map.node(root).unwrap().is_expanded());
    }

    #[test]
    fn insert_returns_the_child() {
        let (mut map, _, a) = map();
        let child = map
            .execute_command(Command::InsertChildNode {
                parent: a,
                record: NodeRecord::with_text("new"),
            })
            .unwrap()
            .unwrap();
        assert_eq!(map.tree().parent_of(child), Some(a));
        assert_eq!(map.node(a).unwrap().lines().len(), 2);
    }

    #[test]
    fn nested_summary_is_rejected() {
        let (mut map, _, a) = map();
        let a1 = map.tree().children_of(a)[0];
        map.execute_command(Command::AddGeneralization {
            node: a,
            data: GeneralizationData::new("sum"),
        })
        .unwrap();
        assert_eq!(map.node(a).unwrap().generalizations().len(), 1);
        assert!(
            map.execute_command(Command::AddGeneralization {
                node: a1,
                data: GeneralizationData::new("inner"),
            })
            .is_err()
        );
    }
}
