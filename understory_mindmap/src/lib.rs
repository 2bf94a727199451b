// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_mindmap --heading-base-level=0

//! Understory Mindmap: a mind-map node tree rendered onto a retained scene.
//!
//! A [`MindMap`] owns a [`NodeTree`] of [`MindMapNode`]s and a scene
//! implementing [`understory_scene::SceneBackend`]. It keeps the two in sync:
//!
//! - **Sizing.** Each node's visible pieces (image, icons, text, tags, link,
//!   note and attachment badges, host-provided blocks) are built as scene
//!   fragments and [`arrange`]d into a box; the node's size follows from the
//!   arrangement and its [`NodeShape`] padding.
//! - **Layout.** A pluggable [`LayoutStrategy`] positions nodes and produces
//!   connector paths. [`LogicalStructure`] is the built-in tree layout.
//! - **Rendering.** [`MindMap::render_tree`] walks the tree, culls nodes
//!   outside the viewport when performance mode is on, and draws groups,
//!   connector lines, expand buttons, summaries, and card note badges.
//!   Children can be rendered through a deferred task queue
//!   ([`MindMap::run_pending`]); a completion counter fires each parent's
//!   continuation exactly once.
//! - **Interaction.** Pointer input is fed in through
//!   [`MindMap::handle_node_input`], which updates the active set and emits
//!   [`MindMapEvent`]s on the map's [`EventBus`].
//! - **Editing.** [`Command`]s change node data and re-render what changed.
//!
//! Styles resolve through a layered [`Theme`] with per-node overrides
//! ([`StyleResolver`]).
//!
//! ## Minimal example
//!
//! ```rust
//! use understory_mindmap::{Command, MindMap, NodeRecord};
//! use understory_scene::{Layer, RetainedScene};
//!
//! let mut map = MindMap::new(RetainedScene::new());
//! let root = map.load(
//!     NodeRecord::with_text("Plan")
//!         .child(NodeRecord::with_text("Research"))
//!         .child(NodeRecord::with_text("Build")),
//! );
//! map.render_tree();
//!
//! // One group per node, one connector per child.
//! assert_eq!(map.scene().layer_children(Layer::Nodes).len(), 3);
//! assert_eq!(map.node(root).unwrap().lines().len(), 2);
//!
//! // Collapsing removes the children from the scene but keeps them in the tree.
//! map.execute_command(Command::ToggleNodeExpand(root)).unwrap();
//! assert_eq!(map.scene().layer_children(Layer::Nodes).len(), 1);
//! assert_eq!(map.tree().children_of(root).len(), 2);
//! ```

mod active;
mod card_note;
mod command;
mod content;
mod cooperate;
mod data;
mod drag;
mod error;
mod event;
mod expand;
mod generalization;
mod layout;
mod line;
mod mindmap;
mod node;
mod options;
mod render;
mod scheduler;
mod shape;
mod style;
mod tree;
mod uid;
mod view;

pub use active::ActiveNodes;
pub use command::Command;
pub use content::{
    Arrangement, ContentBuilder, ContentCx, ContentExtension, ContentKind, Fragment, NodeContent,
    Placement, arrange,
};
pub use cooperate::CooperateUser;
pub use data::{
    CardNote, GeneralizationData, ImageSize, NodeData, NodeRecord, simple_deep_clone,
};
pub use drag::DragState;
pub use error::MindMapError;
pub use event::{
    EventBus, EventKind, EventOutcome, ListenerId, MindMapEvent, Modifiers, NodeInput,
    PointerButton, PointerInput,
};
pub use layout::{
    GeneralizationPlacement, GeneralizationRequest, LayoutCx, LayoutStrategy, LogicalStructure,
    subtree_bounds,
};
pub use line::RainbowLines;
pub use mindmap::{MindMap, MindMapBuilder};
pub use node::{GeneralizationEntry, MindMapNode, NodeFlags};
pub use options::{ImgPlacement, MindMapOptions, PerformanceConfig, TagPlacement};
pub use scheduler::{FrameTask, SlotId, Task, TaskQueue};
pub use shape::{NodeShape, ShapePadding, shape_padding, shape_path};
pub use style::{
    ResolvedStyle, StyleProp, StyleResolver, StyleScope, StyleValue, Theme, ThemeBuilder,
    ThemeSection, parse_css_color, parse_dash,
};
pub use tree::{NodeId, NodeTree};
pub use uid::{DEFAULT_CHARSET, DEFAULT_RANDOM_LENGTH, create_uid, generate_random_string};
pub use view::ViewState;
