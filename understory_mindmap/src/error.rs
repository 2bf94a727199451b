// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use understory_scene::SceneError;

use crate::tree::NodeId;

/// Errors surfaced by fallible mind-map operations.
///
/// Rendering-path faults (a content builder producing nothing, a snapshot
/// that fails to serialize, an overlay that cannot be positioned) are
/// recovered locally and never show up here.
#[derive(Debug, thiserror::Error)]
pub enum MindMapError {
    /// A caller passed an argument that can never be valid.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A command that edits the map was issued while it is readonly.
    #[error("the map is readonly")]
    Readonly,
    /// The node handle is stale or the node was deleted.
    #[error("unknown or deleted node {0:?}")]
    UnknownNode(NodeId),
    /// Options or node records could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The scene backend rejected a query.
    #[error(transparent)]
    Scene(#[from] SceneError),
}
