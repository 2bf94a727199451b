// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Inbound node records and per-node content data.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::MindMapError;
use crate::style::{StyleProp, StyleValue};

fn default_true() -> bool {
    true
}

/// Hierarchical record a tree is constructed from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Content of this node.
    #[serde(default)]
    pub data: NodeData,
    /// Child records in order.
    #[serde(default)]
    pub children: Vec<NodeRecord>,
}

impl NodeRecord {
    /// Creates a childless record with the given text.
    #[must_use]
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            data: NodeData {
                text: text.into(),
                ..NodeData::default()
            },
            children: Vec::new(),
        }
    }

    /// Builder-style helper appending a child record.
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Parses a record tree from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`MindMapError::Serialization`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, MindMapError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Intrinsic image size stored alongside an image reference.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width.
    pub width: f64,
    /// Image height.
    pub height: f64,
    /// `true` when the user resized the image explicitly.
    #[serde(default)]
    pub custom: bool,
}

/// A linked card note shown as a badge next to its node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardNote {
    /// Display name, shown as `[[basename]]`.
    pub basename: String,
    /// Path of the linked document.
    pub path: String,
}

/// Data of one summary node attached to its owner.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralizationData {
    /// Summary text.
    pub text: String,
    /// Inclusive range of the owner's children being summarized.
    ///
    /// `None` summarizes every child (or the owner itself when it has none).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[usize; 2]>,
    /// Identifier of the summary node; assigned on first use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Style overrides and custom fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GeneralizationData {
    /// Creates summary data with the given text covering all children.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Content fields of a node.
///
/// Unknown keys (style overrides such as `fillColor`, plus any custom fields a
/// host stores) are preserved in [`NodeData::extra`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeData {
    /// Node text.
    pub text: String,
    /// Identifier; assigned when the node is constructed if absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Whether children are shown.
    #[serde(default = "default_true")]
    pub expand: bool,
    /// Whether the node is in the active set.
    pub is_active: bool,
    /// Pinned horizontal position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_left: Option<f64>,
    /// Pinned vertical position.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_top: Option<f64>,
    /// Text width set by dragging the resize handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_text_width: Option<f64>,
    /// Tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tag: Vec<String>,
    /// Note text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Attachment location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    /// Attachment display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
    /// Image location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Image title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_title: Option<String>,
    /// Intrinsic image size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<ImageSize>,
    /// Icon names.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub icon: Vec<String>,
    /// Hyperlink target.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink: Option<String>,
    /// Hyperlink title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hyperlink_title: Option<String>,
    /// Linked card notes.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub card_notes: Vec<CardNote>,
    /// Summary nodes owned by this node. A single object is accepted too.
    #[serde(
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub generalization: Vec<GeneralizationData>,
    /// Set on freshly inserted nodes; consumed by the first render.
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    pub inserting: bool,
    /// Style overrides and custom fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            text: String::new(),
            uid: None,
            expand: true,
            is_active: false,
            custom_left: None,
            custom_top: None,
            custom_text_width: None,
            tag: Vec::new(),
            note: None,
            attachment_url: None,
            attachment_name: None,
            image: None,
            image_title: None,
            image_size: None,
            icon: Vec::new(),
            hyperlink: None,
            hyperlink_title: None,
            card_notes: Vec::new(),
            generalization: Vec::new(),
            inserting: false,
            extra: Map::new(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<GeneralizationData>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(GeneralizationData),
        Many(Vec<GeneralizationData>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(one)) => vec![one],
        Some(OneOrMany::Many(many)) => many,
    })
}

impl NodeData {
    /// Returns the node-local override for `prop`, if set.
    ///
    /// Empty strings count as unset.
    #[must_use]
    pub fn style_override(&self, prop: StyleProp) -> Option<StyleValue> {
        self.extra.get(prop.key()).and_then(StyleValue::from_json)
    }

    /// Sets (or with `None`, clears) the node-local override for `prop`.
    pub fn set_style_override(&mut self, prop: StyleProp, value: Option<StyleValue>) {
        match value {
            Some(v) => {
                self.extra.insert(prop.key().to_owned(), v.to_json());
            }
            None => {
                self.extra.remove(prop.key());
            }
        }
    }

    /// Returns `true` if any style property is overridden locally.
    #[must_use]
    pub fn has_custom_style(&self) -> bool {
        StyleProp::ALL
            .iter()
            .any(|prop| self.style_override(*prop).is_some())
    }

    /// Applies a shallow JSON patch; `null` values delete keys.
    ///
    /// # Errors
    ///
    /// Returns [`MindMapError::Serialization`] if the patched object no longer
    /// describes valid node data (for example `expand: "yes"`). The data is
    /// left unchanged in that case.
    pub fn merge_patch(&mut self, patch: &Map<String, Value>) -> Result<(), MindMapError> {
        let mut value = serde_json::to_value(&*self)?;
        if let Value::Object(object) = &mut value {
            for (key, v) in patch {
                if v.is_null() {
                    object.remove(key);
                } else {
                    object.insert(key.clone(), v.clone());
                }
            }
        }
        *self = serde_json::from_value(value)?;
        Ok(())
    }
}

/// Deep clone through a JSON round trip.
///
/// Returns `None` if either direction fails.
pub fn simple_deep_clone<T>(value: &T) -> Option<T>
where
    T: Serialize + DeserializeOwned,
{
    serde_json::to_value(value)
        .ok()
        .and_then(|v| serde_json::from_value(v).ok())
}
