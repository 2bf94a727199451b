// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Outbound notifications and inbound pointer input.
//!
//! The host forwards raw input on a node through
//! [`MindMap::handle_node_input`]; the map applies selection and hover rules
//! and tells the host, through the returned [`EventOutcome`], whether the
//! input should stop propagating to the canvas. Notifications go out through
//! an [`EventBus`] whose listeners run synchronously.

use core::fmt;

use kurbo::Point;
use tracing::trace;
use understory_scene::SceneBackend;

use crate::mindmap::MindMap;
use crate::node::NodeFlags;
use crate::tree::NodeId;

bitflags::bitflags! {
    /// Modifier keys held during an input.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift.
        const SHIFT = 0b0001;
        /// Control.
        const CTRL  = 0b0010;
        /// Alt / Option.
        const ALT   = 0b0100;
        /// Meta / Command.
        const META  = 0b1000;
    }
}

impl Modifiers {
    /// Ctrl or Meta: the multi-select chord.
    #[must_use]
    pub fn is_command(self) -> bool {
        self.intersects(Self::CTRL | Self::META)
    }
}

/// Pointer button of an input.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PointerButton {
    /// Primary button.
    #[default]
    Left,
    /// Wheel button.
    Middle,
    /// Secondary button.
    Right,
}

/// Raw pointer input on a node.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PointerInput {
    /// Button involved.
    pub button: PointerButton,
    /// Held modifiers.
    pub modifiers: Modifiers,
    /// Position in canvas coordinates.
    pub position: Point,
}

impl PointerInput {
    /// Left button input at `position` without modifiers.
    #[must_use]
    pub fn at(position: Point) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Same input with `modifiers` held.
    #[must_use]
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Same input with `button` pressed.
    #[must_use]
    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }
}

/// Input a host forwards for one node.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NodeInput {
    /// Click on the node.
    Click(PointerInput),
    /// Button pressed over the node.
    Mousedown(PointerInput),
    /// Button released over the node.
    Mouseup(PointerInput),
    /// Pointer entered the node.
    Mouseenter(PointerInput),
    /// Pointer left the node.
    Mouseleave(PointerInput),
    /// Double click on the node.
    Dblclick(PointerInput),
    /// Context menu request on the node.
    Contextmenu(PointerInput),
    /// Click on the expand button.
    ExpandButtonClick(PointerInput),
    /// Click on the quick "create child" button.
    QuickCreateClick(PointerInput),
    /// Double click on a card note badge.
    CardNoteDblclick(usize),
    /// Pointer entered a card note badge.
    CardNoteEnter(usize),
    /// Pointer left a card note badge.
    CardNoteLeave(usize),
}

/// What the host should do with the raw input after handling.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EventOutcome {
    /// Keep the input from reaching the canvas.
    pub stop_propagation: bool,
    /// Suppress the platform default action.
    pub prevent_default: bool,
}

impl EventOutcome {
    const STOP: Self = Self {
        stop_propagation: true,
        prevent_default: false,
    };
}

/// A notification emitted by a map.
#[derive(Clone, Debug, PartialEq)]
pub enum MindMapEvent {
    /// A node was clicked.
    NodeClick {
        /// Target.
        node: NodeId,
        /// Raw input.
        input: PointerInput,
    },
    /// A button went down over a node.
    NodeMousedown {
        /// Target.
        node: NodeId,
        /// Raw input.
        input: PointerInput,
    },
    /// A button went up over a node.
    NodeMouseup {
        /// Target.
        node: NodeId,
        /// Raw input.
        input: PointerInput,
    },
    /// The pointer entered a node.
    NodeMouseenter {
        /// Target.
        node: NodeId,
        /// Raw input.
        input: PointerInput,
    },
    /// The pointer left a node.
    NodeMouseleave {
        /// Target.
        node: NodeId,
        /// Raw input.
        input: PointerInput,
    },
    /// A node was double clicked, or a freshly inserted node wants editing.
    NodeDblclick {
        /// Target.
        node: NodeId,
        /// Raw input; `None` when synthesized.
        input: Option<PointerInput>,
        /// `true` when synthesized for a freshly inserted node.
        inserting: bool,
    },
    /// A context menu was requested on a node.
    NodeContextmenu {
        /// Target.
        node: NodeId,
        /// Raw input.
        input: PointerInput,
    },
    /// A node is about to become active.
    BeforeNodeActive {
        /// Node being activated.
        node: NodeId,
        /// Active set before the change.
        active: Vec<NodeId>,
    },
    /// The active set changed.
    NodeActive {
        /// Node that became active, if any.
        node: Option<NodeId>,
        /// Active set after the change.
        active: Vec<NodeId>,
    },
    /// An expand button was clicked.
    ExpandBtnClick {
        /// Owner of the button.
        node: NodeId,
    },
    /// A render pass finished.
    RenderComplete,
    /// A card note badge asks to open its document.
    OpenCardNote {
        /// Document path.
        path: String,
    },
    /// A card note badge asks for a hover preview.
    ShowCardNotePreview {
        /// Document path.
        path: String,
        /// Badge label.
        link_text: String,
    },
}

/// Discriminant of a [`MindMapEvent`], used to subscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs, reason = "Variants mirror MindMapEvent.")]
pub enum EventKind {
    NodeClick,
    NodeMousedown,
    NodeMouseup,
    NodeMouseenter,
    NodeMouseleave,
    NodeDblclick,
    NodeContextmenu,
    BeforeNodeActive,
    NodeActive,
    ExpandBtnClick,
    RenderComplete,
    OpenCardNote,
    ShowCardNotePreview,
}

impl EventKind {
    /// Wire name of the event.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::NodeClick => "node_click",
            Self::NodeMousedown => "node_mousedown",
            Self::NodeMouseup => "node_mouseup",
            Self::NodeMouseenter => "node_mouseenter",
            Self::NodeMouseleave => "node_mouseleave",
            Self::NodeDblclick => "node_dblclick",
            Self::NodeContextmenu => "node_contextmenu",
            Self::BeforeNodeActive => "before_node_active",
            Self::NodeActive => "node_active",
            Self::ExpandBtnClick => "expand_btn_click",
            Self::RenderComplete => "render_complete",
            Self::OpenCardNote => "open_card_note",
            Self::ShowCardNotePreview => "show_card_note_preview",
        }
    }
}

impl MindMapEvent {
    /// Kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::NodeClick { .. } => EventKind::NodeClick,
            Self::NodeMousedown { .. } => EventKind::NodeMousedown,
            Self::NodeMouseup { .. } => EventKind::NodeMouseup,
            Self::NodeMouseenter { .. } => EventKind::NodeMouseenter,
            Self::NodeMouseleave { .. } => EventKind::NodeMouseleave,
            Self::NodeDblclick { .. } => EventKind::NodeDblclick,
            Self::NodeContextmenu { .. } => EventKind::NodeContextmenu,
            Self::BeforeNodeActive { .. } => EventKind::BeforeNodeActive,
            Self::NodeActive { .. } => EventKind::NodeActive,
            Self::ExpandBtnClick { .. } => EventKind::ExpandBtnClick,
            Self::RenderComplete => EventKind::RenderComplete,
            Self::OpenCardNote { .. } => EventKind::OpenCardNote,
            Self::ShowCardNotePreview { .. } => EventKind::ShowCardNotePreview,
        }
    }
}

/// Handle returned by [`EventBus::on`], used to unsubscribe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&MindMapEvent)>;

/// Synchronous listener registry.
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use understory_mindmap::{EventBus, EventKind, MindMapEvent};
///
/// let mut bus = EventBus::new();
/// let seen = Rc::new(Cell::new(0));
/// let counter = seen.clone();
/// let id = bus.on(Some(EventKind::RenderComplete), move |_| counter.set(counter.get() + 1));
///
/// bus.emit(&MindMapEvent::RenderComplete);
/// assert!(bus.off(id));
/// bus.emit(&MindMapEvent::RenderComplete);
/// assert_eq!(seen.get(), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Option<EventKind>, Listener)>,
    next_id: u64,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

impl EventBus {
    /// Creates a bus without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to one kind of event, or to all with `None`.
    pub fn on(
        &mut self,
        kind: Option<EventKind>,
        listener: impl FnMut(&MindMapEvent) + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, kind, Box::new(listener)));
        id
    }

    /// Unsubscribes. Returns `false` if the listener was not registered.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _, _)| *lid != id);
        self.listeners.len() != before
    }

    /// Delivers `event` to matching listeners in subscription order.
    pub fn emit(&mut self, event: &MindMapEvent) {
        let kind = event.kind();
        trace!(event = kind.name(), "emit");
        for (_, filter, listener) in &mut self.listeners {
            if filter.is_none_or(|k| k == kind) {
                listener(event);
            }
        }
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// Emits an event to the host.
    pub(crate) fn emit(&mut self, event: MindMapEvent) {
        self.events.emit(&event);
    }

    /// Subscribes to events; see [`EventBus::on`].
    pub fn on(
        &mut self,
        kind: Option<EventKind>,
        listener: impl FnMut(&MindMapEvent) + 'static,
    ) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Unsubscribes; see [`EventBus::off`].
    pub fn off(&mut self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Tells the map whether a rubber-band selection just ended; context
    /// menus are suppressed while it is set.
    pub fn set_selection_range_active(&mut self, active: bool) {
        self.selection_range_active = active;
    }

    fn cooperate_blocks(&self, id: NodeId) -> bool {
        self.options.only_one_enable_active_node_on_cooperate
            && self.tree.get(id).is_some_and(|n| !n.user_list.is_empty())
    }

    /// Applies the interaction rules for one input on `id`.
    pub fn handle_node_input(&mut self, id: NodeId, input: NodeInput) -> EventOutcome {
        let Some(node) = self.tree.get(id) else {
            return EventOutcome::default();
        };
        let is_root = node.is_root;
        let readonly = self.options.readonly;
        match input {
            NodeInput::Click(e) => {
                self.emit(MindMapEvent::NodeClick { node: id, input: e });
                if let Some(node) = self.tree.get_mut(id)
                    && node.flags.contains(NodeFlags::MULTIPLE_CHOICE)
                {
                    node.flags.remove(NodeFlags::MULTIPLE_CHOICE);
                    return EventOutcome::STOP;
                }
                if self.cooperate_blocks(id) || !self.active(id) {
                    return EventOutcome::default();
                }
                EventOutcome::STOP
            }
            NodeInput::Mousedown(e) => {
                let mut outcome = EventOutcome {
                    prevent_default: self.options.mousedown_event_prevent_default,
                    ..EventOutcome::default()
                };
                if !readonly {
                    outcome.stop_propagation = if is_root {
                        e.button == PointerButton::Right
                            && !self.options.use_left_key_selection_right_key_drag
                    } else {
                        e.button != PointerButton::Middle
                    };
                }
                if !readonly
                    && e.modifiers.is_command()
                    && self.options.enable_ctrl_key_node_selection
                {
                    if let Some(node) = self.tree.get_mut(id) {
                        node.flags.insert(NodeFlags::MULTIPLE_CHOICE);
                    }
                    let was_active = self.tree.get(id).is_some_and(|n| n.data.is_active);
                    if was_active {
                        self.remove_node_from_active_list(id);
                        self.emit_node_active_event(None);
                    } else {
                        self.emit(MindMapEvent::BeforeNodeActive {
                            node: id,
                            active: self.active.items().to_vec(),
                        });
                        self.add_node_to_active_list(id);
                        self.emit_node_active_event(Some(id));
                    }
                }
                self.emit(MindMapEvent::NodeMousedown { node: id, input: e });
                outcome
            }
            NodeInput::Mouseup(e) => {
                let stop = !is_root && e.button != PointerButton::Middle && !readonly;
                self.emit(MindMapEvent::NodeMouseup { node: id, input: e });
                EventOutcome {
                    stop_propagation: stop,
                    prevent_default: false,
                }
            }
            NodeInput::Mouseenter(e) => {
                if node.is_dragging() {
                    return EventOutcome::default();
                }
                let is_generalization = node.is_generalization;
                if let Some(node) = self.tree.get_mut(id) {
                    node.flags.insert(NodeFlags::MOUSE_ENTERED);
                }
                self.show_expand_btn(id);
                if is_generalization {
                    self.handle_generalization_mouseenter(id);
                }
                self.emit(MindMapEvent::NodeMouseenter { node: id, input: e });
                EventOutcome::default()
            }
            NodeInput::Mouseleave(e) => {
                if !node.flags.contains(NodeFlags::MOUSE_ENTERED) {
                    return EventOutcome::default();
                }
                let is_generalization = node.is_generalization;
                if let Some(node) = self.tree.get_mut(id) {
                    node.flags.remove(NodeFlags::MOUSE_ENTERED);
                }
                self.hide_expand_btn(id);
                if is_generalization {
                    self.handle_generalization_mouseleave(id);
                }
                self.emit(MindMapEvent::NodeMouseleave { node: id, input: e });
                EventOutcome::default()
            }
            NodeInput::Dblclick(e) => {
                if readonly || e.modifiers.is_command() {
                    return EventOutcome::default();
                }
                if self.cooperate_blocks(id) {
                    return EventOutcome::STOP;
                }
                self.emit(MindMapEvent::NodeDblclick {
                    node: id,
                    input: Some(e),
                    inserting: false,
                });
                EventOutcome::STOP
            }
            NodeInput::Contextmenu(e) => {
                if readonly || e.modifiers.contains(Modifiers::CTRL) {
                    return EventOutcome::default();
                }
                let outcome = EventOutcome {
                    stop_propagation: true,
                    prevent_default: true,
                };
                if self.selection_range_active
                    && !self.options.use_left_key_selection_right_key_drag
                {
                    return outcome;
                }
                let sole_active = node.data.is_active && self.active.len() == 1;
                if !sole_active {
                    self.clear_active_node_list();
                    self.active(id);
                }
                self.emit(MindMapEvent::NodeContextmenu { node: id, input: e });
                outcome
            }
            NodeInput::ExpandButtonClick(_) => {
                self.toggle_node_expand(id);
                self.emit(MindMapEvent::ExpandBtnClick { node: id });
                EventOutcome::STOP
            }
            NodeInput::QuickCreateClick(_) => {
                if !readonly {
                    self.insert_child_node(id, crate::data::NodeRecord::default());
                }
                EventOutcome::STOP
            }
            NodeInput::CardNoteDblclick(index) => {
                if let Some(path) = node.data.card_notes.get(index).map(|c| c.path.clone()) {
                    self.emit(MindMapEvent::OpenCardNote { path });
                }
                EventOutcome {
                    stop_propagation: true,
                    prevent_default: true,
                }
            }
            NodeInput::CardNoteEnter(index) => {
                self.hovered_card = Some(HoveredCard {
                    node: id,
                    index,
                    preview_sent: false,
                });
                EventOutcome::default()
            }
            NodeInput::CardNoteLeave(_) => {
                self.hovered_card = None;
                EventOutcome::default()
            }
        }
    }

    /// Forwards a key press; ctrl/meta over a card note badge asks for a
    /// preview, once per hover.
    pub fn handle_key_down(&mut self, modifiers: Modifiers) {
        if !modifiers.is_command() {
            return;
        }
        let Some(hover) = self.hovered_card.as_mut() else {
            return;
        };
        if hover.preview_sent {
            return;
        }
        hover.preview_sent = true;
        let (node, index) = (hover.node, hover.index);
        let card = self
            .tree
            .get(node)
            .and_then(|n| n.data.card_notes.get(index))
            .cloned();
        if let Some(card) = card {
            self.emit(MindMapEvent::ShowCardNotePreview {
                path: card.path,
                link_text: card.basename,
            });
        }
    }
}

/// Card note badge under the pointer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) struct HoveredCard {
    pub(crate) node: NodeId,
    pub(crate) index: usize,
    pub(crate) preview_sent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn kind_filter_and_wildcard() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = seen.clone();
        bus.on(Some(EventKind::OpenCardNote), move |e| a.borrow_mut().push(("typed", e.kind())));
        let b = seen.clone();
        bus.on(None, move |e| b.borrow_mut().push(("any", e.kind())));
        bus.emit(&MindMapEvent::RenderComplete);
        bus.emit(&MindMapEvent::OpenCardNote { path: "x.md".into() });
        assert_eq!(
            *seen.borrow(),
            vec![
                ("any", EventKind::RenderComplete),
                ("typed", EventKind::OpenCardNote),
                ("any", EventKind::OpenCardNote),
            ]
        );
    }

    #[test]
    fn off_unknown_listener_is_false() {
        let mut bus = EventBus::new();
        let id = bus.on(None, |_| {});
        assert!(bus.off(id));
        assert!(!bus.off(id));
    }

    #[test]
    fn names_are_snake_case() {
        assert_eq!(EventKind::BeforeNodeActive.name(), "before_node_active");
        assert_eq!(EventKind::NodeDblclick.name(), "node_dblclick");
    }

    #[test]
    fn command_modifier_is_ctrl_or_meta() {
        assert!(Modifiers::CTRL.is_command());
        assert!(Modifiers::META.is_command());
        assert!(!(Modifiers::SHIFT | Modifiers::ALT).is_command());
    }
}
