// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The node entity: data, computed geometry, and owned scene handles.

use kurbo::{Point, Rect, Size};
use understory_scene::ElementId;

use crate::content::NodeContent;
use crate::cooperate::CooperateUser;
use crate::data::{CardNote, NodeData};
use crate::shape::ShapePadding;
use crate::tree::NodeId;
use crate::uid::create_uid;

bitflags::bitflags! {
    /// Transient per-node state.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u16 {
        /// Being dragged.
        const DRAGGING        = 0b0000_0001;
        /// Hidden via [`MindMap::hide`](crate::MindMap::hide).
        const HIDDEN          = 0b0000_0010;
        /// The last mousedown toggled multi-selection; the next click is swallowed.
        const MULTIPLE_CHOICE = 0b0000_0100;
        /// Content was rebuilt; in-group placement must be redone on next render.
        const NEEDS_LAYOUT    = 0b0000_1000;
        /// Pointer is over the node.
        const MOUSE_ENTERED   = 0b0001_0000;
        /// Scene resources were torn down; the node can no longer render.
        const DESTROYED       = 0b0010_0000;
        /// Presence avatars must be rebuilt.
        const USERS_DIRTY     = 0b0100_0000;
        /// Sizing is being redone for a queued re-render; further requests are dropped.
        const RE_RENDERING    = 0b1000_0000;
    }
}

/// A summary node owned by this node, plus its bracket line.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneralizationEntry {
    /// The summary node.
    pub node: NodeId,
    /// Bracket line in the lines layer, once rendered.
    pub line: Option<ElementId>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct ExpandBtnState {
    pub(crate) element: ElementId,
    pub(crate) closed: bool,
    pub(crate) count: usize,
}

/// Scene elements of optional node decorations.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Decorations {
    pub(crate) expand_btn: Option<ExpandBtnState>,
    pub(crate) placeholder: Option<(ElementId, Size)>,
    pub(crate) quick_create: Option<ElementId>,
    pub(crate) drag_handle: Option<(ElementId, f64)>,
    pub(crate) user_list: Option<ElementId>,
}

impl Decorations {
    pub(crate) fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.expand_btn
            .map(|b| b.element)
            .into_iter()
            .chain(self.placeholder.map(|(e, _)| e))
            .chain(self.quick_create)
            .chain(self.drag_handle.map(|(e, _)| e))
            .chain(self.user_list)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct CardNoteElement {
    pub(crate) group: ElementId,
    pub(crate) line: ElementId,
    pub(crate) width: f64,
    pub(crate) height: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct CardNoteState {
    pub(crate) visible: bool,
    pub(crate) elements: Vec<CardNoteElement>,
    /// Card data the current elements were built from.
    pub(crate) rendered: Vec<CardNote>,
}

/// One visual node of the tree.
///
/// Nodes are owned by a [`NodeTree`](crate::NodeTree) and addressed by
/// [`NodeId`]; every operation that touches the scene lives on
/// [`MindMap`](crate::MindMap).
#[derive(Clone, Debug)]
pub struct MindMapNode {
    pub(crate) uid: String,
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) is_root: bool,
    pub(crate) is_generalization: bool,
    pub(crate) generalization_belong: Option<NodeId>,
    pub(crate) layer_index: usize,
    pub(crate) width: f64,
    pub(crate) height: f64,
    pub(crate) layout_left: f64,
    pub(crate) layout_top: f64,
    pub(crate) custom_left: Option<f64>,
    pub(crate) custom_top: Option<f64>,
    pub(crate) custom_text_width: Option<f64>,
    pub(crate) shape_padding: ShapePadding,
    pub(crate) content: NodeContent,
    pub(crate) group: Option<ElementId>,
    pub(crate) shape_element: Option<ElementId>,
    pub(crate) lines: Vec<ElementId>,
    pub(crate) generalizations: Vec<GeneralizationEntry>,
    pub(crate) user_list: Vec<CooperateUser>,
    pub(crate) decorations: Decorations,
    pub(crate) card_notes: CardNoteState,
    pub(crate) flags: NodeFlags,
    pub(crate) data_snapshot: String,
}

impl MindMapNode {
    /// Creates a detached node, taking its uid from `data` or generating one.
    pub(crate) fn from_data(mut data: NodeData) -> Self {
        let uid = match data.uid.as_deref() {
            Some(uid) if !uid.is_empty() => uid.to_owned(),
            _ => create_uid(),
        };
        data.uid = Some(uid.clone());
        Self {
            uid,
            custom_left: data.custom_left,
            custom_top: data.custom_top,
            custom_text_width: data.custom_text_width,
            data,
            parent: None,
            children: Vec::new(),
            is_root: false,
            is_generalization: false,
            generalization_belong: None,
            layer_index: 0,
            width: 0.0,
            height: 0.0,
            layout_left: 0.0,
            layout_top: 0.0,
            shape_padding: ShapePadding::default(),
            content: NodeContent::default(),
            group: None,
            shape_element: None,
            lines: Vec::new(),
            generalizations: Vec::new(),
            user_list: Vec::new(),
            decorations: Decorations::default(),
            card_notes: CardNoteState::default(),
            flags: NodeFlags::empty(),
            data_snapshot: String::new(),
        }
    }

    /// Process-unique identifier.
    #[must_use]
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Content data.
    #[must_use]
    pub fn data(&self) -> &NodeData {
        &self.data
    }

    /// Parent handle; `None` for the root and for summary nodes.
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in order.
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Returns `true` for the root node.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.is_root
    }

    /// Returns `true` for summary nodes.
    #[must_use]
    pub fn is_generalization(&self) -> bool {
        self.is_generalization
    }

    /// Owner of a summary node.
    #[must_use]
    pub fn generalization_belong(&self) -> Option<NodeId> {
        self.generalization_belong
    }

    /// Depth; the root is layer 0.
    #[must_use]
    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    /// Width from the last sizing pass.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Height from the last sizing pass.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Size from the last sizing pass.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Effective left: the pinned value if set, else the layout value.
    #[must_use]
    pub fn left(&self) -> f64 {
        self.custom_left.unwrap_or(self.layout_left)
    }

    /// Effective top: the pinned value if set, else the layout value.
    #[must_use]
    pub fn top(&self) -> f64 {
        self.custom_top.unwrap_or(self.layout_top)
    }

    /// Effective top-left corner.
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.left(), self.top())
    }

    /// Effective bounding box in world space.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::from_origin_size(self.position(), self.size())
    }

    /// Pinned position, when both axes are pinned.
    #[must_use]
    pub fn custom_position(&self) -> Option<Point> {
        Some(Point::new(self.custom_left?, self.custom_top?))
    }

    /// Returns `true` when both axes are pinned.
    #[must_use]
    pub fn has_custom_position(&self) -> bool {
        self.custom_left.is_some() && self.custom_top.is_some()
    }

    /// Text width set by the resize handle.
    #[must_use]
    pub fn custom_text_width(&self) -> Option<f64> {
        self.custom_text_width
    }

    /// Extra padding contributed by the background shape.
    #[must_use]
    pub fn shape_padding(&self) -> ShapePadding {
        self.shape_padding
    }

    /// Built content fragments.
    #[must_use]
    pub fn content(&self) -> &NodeContent {
        &self.content
    }

    /// The node's scene group, once rendered.
    #[must_use]
    pub fn group(&self) -> Option<ElementId> {
        self.group
    }

    /// Connecting lines to the children, index-aligned with [`children`](Self::children).
    #[must_use]
    pub fn lines(&self) -> &[ElementId] {
        &self.lines
    }

    /// Summary nodes owned by this node.
    #[must_use]
    pub fn generalizations(&self) -> &[GeneralizationEntry] {
        &self.generalizations
    }

    /// Users currently on this node.
    #[must_use]
    pub fn user_list(&self) -> &[CooperateUser] {
        &self.user_list
    }

    /// Transient state flags.
    #[must_use]
    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    /// Returns `true` while the node's children are shown.
    #[must_use]
    pub fn is_expanded(&self) -> bool {
        self.data.expand
    }

    /// Returns `true` while the node is in the active set.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.data.is_active
    }

    /// Returns `true` between `start_drag` and `end_drag`.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.flags.contains(NodeFlags::DRAGGING)
    }

    /// Returns `true` while hidden.
    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.flags.contains(NodeFlags::HIDDEN)
    }

    /// Returns `true` once the node was destroyed.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.flags.contains(NodeFlags::DESTROYED)
    }

    /// Returns `true` while card note badges are shown.
    #[must_use]
    pub fn card_notes_visible(&self) -> bool {
        self.card_notes.visible
    }

    /// JSON snapshot of the data taken by the last update (empty when readonly).
    #[must_use]
    pub fn data_snapshot(&self) -> &str {
        &self.data_snapshot
    }

    /// Returns `true` if summary data is present.
    #[must_use]
    pub fn check_has_generalization(&self) -> bool {
        !self.data.generalization.is_empty()
    }

    /// Number of children recorded for this node.
    #[must_use]
    pub fn children_len(&self) -> usize {
        self.children.len()
    }

    /// Clears transient state a deleted node must not carry.
    pub(crate) fn reset_when_delete(&mut self) {
        self.flags.remove(NodeFlags::MOUSE_ENTERED);
    }
}
