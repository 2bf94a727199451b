// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The map: tree, scene, configuration, and collaborators in one owner.

use core::fmt;

use peniko::Color;
use tracing::debug;
use understory_scene::SceneBackend;

use crate::active::ActiveNodes;
use crate::content::{ContentBuilder, ContentExtension, ContentRegistry};
use crate::data::NodeRecord;
use crate::drag::DragState;
use crate::error::MindMapError;
use crate::event::{EventBus, HoveredCard};
use crate::layout::{LayoutStrategy, LogicalStructure};
use crate::line::RainbowLines;
use crate::node::MindMapNode;
use crate::options::MindMapOptions;
use crate::scheduler::{Completions, Continuation, FrameTask, Task, TaskQueue};
use crate::style::Theme;
use crate::tree::{NodeId, NodeTree};
use crate::view::ViewState;

/// A mind map rendered onto a scene backend.
///
/// The map owns the node tree and the scene. Every operation that touches
/// the scene goes through it, so the scene always mirrors the tree after a
/// render pass completes.
pub struct MindMap<S: SceneBackend> {
    pub(crate) options: MindMapOptions,
    pub(crate) theme: Theme,
    pub(crate) tree: NodeTree,
    pub(crate) scene: S,
    pub(crate) layout: Box<dyn LayoutStrategy>,
    pub(crate) content: ContentRegistry,
    pub(crate) rainbow: Option<RainbowLines>,
    pub(crate) active: ActiveNodes,
    pub(crate) events: EventBus,
    pub(crate) tasks: TaskQueue<Task>,
    pub(crate) frames: TaskQueue<FrameTask>,
    pub(crate) completions: Completions,
    pub(crate) view: ViewState,
    pub(crate) drag: Option<(NodeId, DragState)>,
    pub(crate) selection_range_active: bool,
    pub(crate) hovered_card: Option<HoveredCard>,
}

impl<S: SceneBackend> fmt::Debug for MindMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindMap")
            .field("options", &self.options)
            .field("tree", &self.tree)
            .field("content", &self.content)
            .field("active", &self.active)
            .field("tasks", &self.tasks.len())
            .field("frames", &self.frames.len())
            .field("view", &self.view)
            .finish_non_exhaustive()
    }
}

/// Configures the behavioral hooks of a [`MindMap`] once, before it exists.
#[derive(Default)]
pub struct MindMapBuilder {
    options: MindMapOptions,
    theme: Theme,
    layout: Option<Box<dyn LayoutStrategy>>,
    content: ContentRegistry,
    rainbow: Option<RainbowLines>,
}

impl fmt::Debug for MindMapBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MindMapBuilder")
            .field("options", &self.options)
            .field("content", &self.content)
            .field("custom_layout", &self.layout.is_some())
            .finish_non_exhaustive()
    }
}

impl MindMapBuilder {
    /// Starts from default options, theme, and layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the options.
    #[must_use]
    pub fn options(mut self, options: MindMapOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the theme.
    #[must_use]
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Replaces the default [`LogicalStructure`] layout.
    #[must_use]
    pub fn layout(mut self, strategy: impl LayoutStrategy + 'static) -> Self {
        self.layout = Some(Box::new(strategy));
        self
    }

    /// Installs the custom content builder; it is only consulted when
    /// [`MindMapOptions::is_use_custom_node_content`] is set.
    #[must_use]
    pub fn custom_content(mut self, builder: impl ContentBuilder + 'static) -> Self {
        self.content.custom = Some(Box::new(builder));
        self
    }

    /// Installs the builder of the fragment leading the content row.
    #[must_use]
    pub fn prefix_content(mut self, builder: impl ContentBuilder + 'static) -> Self {
        self.content.prefix = Some(Box::new(builder));
        self
    }

    /// Installs the builder of the fragment trailing the content row.
    #[must_use]
    pub fn postfix_content(mut self, builder: impl ContentBuilder + 'static) -> Self {
        self.content.postfix = Some(Box::new(builder));
        self
    }

    /// Registers an additional content kind.
    #[must_use]
    pub fn extension(mut self, extension: impl ContentExtension + 'static) -> Self {
        self.content.extensions.push(Box::new(extension));
        self
    }

    /// Colors each top-level branch's lines from `palette`.
    ///
    /// Overrides [`MindMapOptions::rainbow_lines`].
    #[must_use]
    pub fn rainbow_lines(mut self, palette: Vec<Color>) -> Self {
        self.rainbow = Some(RainbowLines::new(palette));
        self
    }

    /// Creates the map over `scene`.
    pub fn build<S: SceneBackend>(self, scene: S) -> MindMap<S> {
        let rainbow = self.rainbow.or_else(|| {
            self.options
                .rainbow_lines
                .as_deref()
                .map(RainbowLines::from_css)
        });
        let view = ViewState::new(kurbo::Size::new(self.options.width, self.options.height));
        MindMap {
            options: self.options,
            theme: self.theme,
            tree: NodeTree::new(),
            scene,
            layout: self.layout.unwrap_or_else(|| Box::new(LogicalStructure)),
            content: self.content,
            rainbow,
            active: ActiveNodes::new(),
            events: EventBus::new(),
            tasks: TaskQueue::new(),
            frames: TaskQueue::new(),
            completions: Completions::default(),
            view,
            drag: None,
            selection_range_active: false,
            hovered_card: None,
        }
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// Creates a map with default options and hooks.
    pub fn new(scene: S) -> Self {
        MindMapBuilder::default().build(scene)
    }

    /// Replaces the tree with one built from `record`; returns the root.
    ///
    /// Scene resources of the previous tree are released. Nodes whose data
    /// says they are active join the active set without notifications.
    pub fn load(&mut self, record: NodeRecord) -> NodeId {
        self.clear();
        let root = self.tree.insert_record(record);
        self.tree.set_root(root);
        let active: Vec<NodeId> = self
            .tree
            .iter()
            .filter(|(_, n)| n.data.is_active)
            .map(|(id, _)| id)
            .collect();
        for id in active {
            self.active.add(id);
        }
        debug!(nodes = self.tree.len(), "tree loaded");
        root
    }

    /// Parses a record tree from JSON and loads it.
    ///
    /// # Errors
    ///
    /// Returns [`MindMapError::Serialization`] for malformed input.
    pub fn load_json(&mut self, json: &str) -> Result<NodeId, MindMapError> {
        let record = NodeRecord::from_json(json)?;
        Ok(self.load(record))
    }

    /// Releases every scene resource and empties the tree.
    pub fn clear(&mut self) {
        if let Some(root) = self.tree.root() {
            self.destroy(root);
            for id in self.tree.descendants(root) {
                self.destroy(id);
            }
        }
        self.tree = NodeTree::new();
        self.active = ActiveNodes::new();
        self.tasks = TaskQueue::new();
        self.frames = TaskQueue::new();
        self.completions = Completions::default();
        self.drag = None;
        self.hovered_card = None;
    }

    /// Runs a layout pass, then renders from the root.
    ///
    /// With [`MindMapOptions::render_deferred`] children are queued; drive
    /// them with [`run_pending`](Self::run_pending). A
    /// [`RenderComplete`](crate::MindMapEvent::RenderComplete) event marks the
    /// end of the pass either way.
    pub fn render_tree(&mut self) {
        self.render_tree_inner(None);
    }

    /// Like [`render_tree`](Self::render_tree), then runs `on_complete` once
    /// the whole tree reported completion.
    pub fn render_tree_then(&mut self, on_complete: impl FnOnce() + 'static) {
        self.render_tree_inner(Some(Box::new(on_complete)));
    }

    fn render_tree_inner(&mut self, on_complete: Option<Box<dyn FnOnce()>>) {
        debug!("render pass start");
        self.layout_pass();
        let done = Continuation::RenderTreeDone(on_complete);
        match self.tree.root() {
            Some(root) => {
                let deferred = self.options.render_deferred;
                self.render(root, done, false, deferred);
            }
            None => self.complete(done),
        }
    }

    /// The node tree.
    #[must_use]
    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    /// Looks a node up.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&MindMapNode> {
        self.tree.get(id)
    }

    /// The scene backend.
    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// The scene backend, mutably. Changes made here bypass the map and are
    /// not tracked.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &MindMapOptions {
        &self.options
    }

    /// Theme in effect.
    #[must_use]
    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// The view over the canvas.
    #[must_use]
    pub fn view(&self) -> &ViewState {
        &self.view
    }

    /// The view, mutably. Re-render to apply culling for the new view.
    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    /// Consumes the map, returning the scene.
    pub fn into_scene(self) -> S {
        self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use understory_scene::{Layer, RetainedScene};

    use crate::event::{EventKind, MindMapEvent};

    fn record() -> NodeRecord {
        NodeRecord::with_text("root")
            .child(NodeRecord::with_text("a"))
            .child(NodeRecord::with_text("b"))
    }

    #[test]
    fn render_tree_creates_groups_and_lines() {
        let mut map = MindMap::new(RetainedScene::new());
        let root = map.load(record());
        map.render_tree();
        assert_eq!(map.scene().layer_children(Layer::Nodes).len(), 3);
        assert_eq!(map.node(root).unwrap().lines().len(), 2);
        assert_eq!(map.scene().layer_children(Layer::Lines).len(), 2);
    }

    #[test]
    fn completion_fires_once_per_pass() {
        let mut map = MindMap::new(RetainedScene::new());
        map.load(record());
        let fired = Rc::new(Cell::new(0));
        let seen = fired.clone();
        map.on(Some(EventKind::RenderComplete), move |e| {
            assert_eq!(*e, MindMapEvent::RenderComplete);
            seen.set(seen.get() + 1);
        });
        map.render_tree();
        map.render_tree();
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn load_replaces_previous_tree() {
        let mut map = MindMap::new(RetainedScene::new());
        map.load(record());
        map.render_tree();
        map.load(NodeRecord::with_text("only"));
        assert_eq!(map.tree().len(), 1);
        assert!(map.scene().layer_children(Layer::Nodes).is_empty());
        assert!(map.scene().layer_children(Layer::Lines).is_empty());
    }

    #[test]
    fn empty_map_still_completes() {
        let mut map = MindMap::new(RetainedScene::new());
        let done = Rc::new(Cell::new(false));
        let flag = done.clone();
        map.render_tree_then(move || flag.set(true));
        assert!(done.get());
    }
}
