// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-threaded cooperative scheduling: deferred render tasks, animation
//! frame tasks, and completion counters.
//!
//! Deferred rendering pushes one [`Task::RenderChild`] per child instead of
//! recursing. Each batch of children shares a completion slot that counts
//! finished subtrees; when the count reaches the number of children the
//! slot's continuation runs, exactly once.

use core::fmt;
use std::collections::VecDeque;

use tracing::debug;
use understory_scene::SceneBackend;

use crate::event::MindMapEvent;
use crate::mindmap::MindMap;
use crate::node::NodeFlags;
use crate::tree::NodeId;

/// FIFO of pending work.
#[derive(Clone, Debug)]
pub struct TaskQueue<T> {
    queue: VecDeque<T>,
}

impl<T> Default for TaskQueue<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<T> TaskQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a task.
    pub fn push(&mut self, task: T) {
        self.queue.push_back(task);
    }

    /// Dequeues the oldest task.
    pub fn pop(&mut self) -> Option<T> {
        self.queue.pop_front()
    }

    /// Removes and returns every queued task.
    pub fn drain(&mut self) -> Vec<T> {
        self.queue.drain(..).collect()
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if `task` is already queued.
    #[must_use]
    pub fn contains(&self, task: &T) -> bool
    where
        T: PartialEq,
    {
        self.queue.contains(task)
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Work served by [`MindMap::run_pending`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Task {
    /// Render a child subtree, then report to the completion slot.
    RenderChild {
        /// Subtree root.
        node: NodeId,
        /// Slot counting the parent's finished children.
        slot: SlotId,
        /// Skip culling.
        force: bool,
    },
    /// Re-render a node whose content builder asked for it during sizing.
    ReRender(NodeId),
}

/// Work served by [`MindMap::next_frame`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameTask {
    /// Position card note badges once the node's geometry has settled.
    LayoutCardNotes(NodeId),
}

/// Handle of a completion slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SlotId(usize);

/// What runs when a render (sub)tree completes.
pub(crate) enum Continuation {
    /// Nothing.
    None,
    /// Report one finished child to a parent slot.
    Parent(SlotId),
    /// Run a host callback.
    Callback(Box<dyn FnOnce()>),
    /// A whole-tree render finished: emit the completion event, then run the callback.
    RenderTreeDone(Option<Box<dyn FnOnce()>>),
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Parent(slot) => f.debug_tuple("Parent").field(slot).finish(),
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::RenderTreeDone(cb) => f
                .debug_tuple("RenderTreeDone")
                .field(&cb.is_some())
                .finish(),
        }
    }
}

#[derive(Debug)]
struct Slot {
    expected: usize,
    done: usize,
    then: Continuation,
}

/// Completion counters for in-flight render batches.
#[derive(Debug, Default)]
pub(crate) struct Completions {
    slots: Vec<Option<Slot>>,
    free_list: Vec<usize>,
}

impl Completions {
    /// Opens a slot expecting `expected` reports.
    pub(crate) fn open(&mut self, expected: usize, then: Continuation) -> SlotId {
        let slot = Slot {
            expected,
            done: 0,
            then,
        };
        if let Some(idx) = self.free_list.pop() {
            self.slots[idx] = Some(slot);
            SlotId(idx)
        } else {
            self.slots.push(Some(slot));
            SlotId(self.slots.len() - 1)
        }
    }

    /// Records one report. Returns the continuation once the slot is full.
    pub(crate) fn report(&mut self, id: SlotId) -> Option<Continuation> {
        let entry = self.slots.get_mut(id.0)?;
        let slot = entry.as_mut()?;
        slot.done += 1;
        if slot.done < slot.expected {
            return None;
        }
        let slot = entry.take()?;
        self.free_list.push(id.0);
        Some(slot.then)
    }

    /// Number of open slots.
    pub(crate) fn pending(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

impl<S: SceneBackend> MindMap<S> {
    /// Runs a continuation, walking up through parent slots as they fill.
    pub(crate) fn complete(&mut self, mut then: Continuation) {
        loop {
            match then {
                Continuation::None => return,
                Continuation::Parent(slot) => match self.completions.report(slot) {
                    Some(next) => then = next,
                    None => return,
                },
                Continuation::Callback(callback) => {
                    callback();
                    return;
                }
                Continuation::RenderTreeDone(callback) => {
                    debug!("render pass complete");
                    self.emit(MindMapEvent::RenderComplete);
                    if let Some(callback) = callback {
                        callback();
                    }
                    return;
                }
            }
        }
    }

    /// Serves queued tasks until the queue is empty. Returns how many ran.
    ///
    /// Tasks queued while serving are served in the same call.
    pub fn run_pending(&mut self) -> usize {
        let mut served = 0;
        while let Some(task) = self.tasks.pop() {
            served += 1;
            match task {
                Task::RenderChild { node, slot, force } => {
                    self.render(node, Continuation::Parent(slot), force, true);
                }
                Task::ReRender(node) => {
                    if let Some(n) = self.tree.get_mut(node) {
                        n.flags.insert(NodeFlags::RE_RENDERING);
                    }
                    self.re_render(node, None);
                    if let Some(n) = self.tree.get_mut(node) {
                        n.flags.remove(NodeFlags::RE_RENDERING);
                    }
                }
            }
        }
        served
    }

    /// Runs the tasks queued for the next animation frame.
    ///
    /// Tasks queued while running wait for the following frame.
    pub fn next_frame(&mut self) -> usize {
        let tasks = self.frames.drain();
        let count = tasks.len();
        for task in tasks {
            match task {
                FrameTask::LayoutCardNotes(node) => self.layout_card_note_elements(node),
            }
        }
        count
    }

    /// Number of queued tasks.
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Number of queued animation frame tasks.
    #[must_use]
    pub fn pending_frame_tasks(&self) -> usize {
        self.frames.len()
    }

    /// Number of render batches still waiting for children.
    #[must_use]
    pub fn pending_completions(&self) -> usize {
        self.completions.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_fifo() {
        let mut q = TaskQueue::new();
        q.push(1);
        q.push(2);
        q.push(3);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.len(), 2);
        assert_eq!(q.drain(), vec![2, 3]);
        assert!(q.is_empty());
    }

    #[test]
    fn slot_fires_once_when_full() {
        let mut c = Completions::default();
        let slot = c.open(2, Continuation::None);
        assert!(c.report(slot).is_none());
        assert!(matches!(c.report(slot), Some(Continuation::None)));
        assert!(c.report(slot).is_none());
        assert_eq!(c.pending(), 0);
    }

    #[test]
    fn slots_are_recycled() {
        let mut c = Completions::default();
        let a = c.open(1, Continuation::None);
        assert!(c.report(a).is_some());
        let b = c.open(3, Continuation::None);
        assert_eq!(a, b);
        assert_eq!(c.pending(), 1);
    }

    #[test]
    fn continuations_chain_to_parents() {
        let mut c = Completions::default();
        let outer = c.open(1, Continuation::None);
        let inner = c.open(2, Continuation::Parent(outer));
        assert!(c.report(inner).is_none());
        let Some(Continuation::Parent(next)) = c.report(inner) else {
            panic!("inner slot should hand off to its parent");
        };
        assert_eq!(next, outer);
        assert!(c.report(outer).is_some());
    }
}
