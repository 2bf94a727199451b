// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::MindMapError;

/// Viewport culling settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PerformanceConfig {
    /// Margin around the canvas inside which nodes still count as visible.
    pub padding: f64,
    /// Detach already-rendered nodes once they leave the visible area.
    pub remove_node_when_out_canvas: bool,
    /// Exempt the root node from culling.
    pub always_render_root: bool,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            padding: 100.0,
            remove_node_when_out_canvas: true,
            always_render_root: true,
        }
    }
}

/// Where tags sit relative to the text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagPlacement {
    /// In the text row, after the text.
    #[default]
    Right,
    /// In their own row below the text.
    Bottom,
}

/// Where the image sits relative to the text.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ImgPlacement {
    /// Above the text.
    #[default]
    Top,
    /// Left of the text.
    Left,
}

/// Options of a [`MindMap`](crate::MindMap).
///
/// Field names serialize in camelCase so host settings can be passed through
/// unchanged; every field is optional in JSON.
///
/// ```rust
/// use understory_mindmap::MindMapOptions;
///
/// let json = r#"{ "readonly": true, "openPerformance": true }"#;
/// let options = MindMapOptions::from_json(json).unwrap();
/// assert!(options.readonly);
/// assert!(options.open_performance);
/// assert_eq!(options.expand_btn_size, 20.0);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MindMapOptions {
    /// Disables every editing interaction.
    pub readonly: bool,
    /// Canvas width.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
    /// Enables viewport culling.
    pub open_performance: bool,
    /// Culling settings.
    pub performance_config: PerformanceConfig,
    /// Ctrl/meta + mousedown toggles nodes in and out of the active set.
    pub enable_ctrl_key_node_selection: bool,
    /// Left button selects, right button drags the canvas.
    pub use_left_key_selection_right_key_drag: bool,
    /// Prevent default handling of mousedown on nodes.
    pub mousedown_event_prevent_default: bool,
    /// Show expand buttons even when not hovering.
    pub always_show_expand_btn: bool,
    /// Never show expand buttons.
    pub not_show_expand_btn: bool,
    /// Expand button edge length.
    pub expand_btn_size: f64,
    /// Show a quick "create child" button on active leaf nodes.
    pub is_show_create_child_btn_icon: bool,
    /// Lines inherit line style overrides from ancestors.
    pub enable_inherit_ancestor_line_style: bool,
    /// Allow dragging a handle to change text width.
    pub enable_drag_modify_node_width: bool,
    /// Lower bound for dragged text width.
    pub min_node_text_modify_width: f64,
    /// Upper bound for dragged text width; negative means unbounded.
    pub max_node_text_modify_width: f64,
    /// Use the configured custom content builder.
    pub is_use_custom_node_content: bool,
    /// Nodes other users are on cannot be activated locally.
    pub only_one_enable_active_node_on_cooperate: bool,
    /// Gap between items of the text row.
    pub text_content_margin: f64,
    /// Gap between the image, text row, and tag row.
    pub block_content_margin: f64,
    /// Tag placement.
    pub tag_placement: TagPlacement,
    /// Image placement.
    pub img_placement: ImgPlacement,
    /// Largest image width before scaling down.
    pub max_img_width: f64,
    /// Largest image height before scaling down.
    pub max_img_height: f64,
    /// Overrides the theme icon size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<f64>,
    /// Per-branch line colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rainbow_lines: Option<Vec<String>>,
    /// Enables multi-user presence avatars.
    pub cooperate: bool,
    /// Render children through the task queue instead of recursing.
    pub render_deferred: bool,
}

impl Default for MindMapOptions {
    fn default() -> Self {
        Self {
            readonly: false,
            width: 1200.0,
            height: 800.0,
            open_performance: false,
            performance_config: PerformanceConfig::default(),
            enable_ctrl_key_node_selection: true,
            use_left_key_selection_right_key_drag: false,
            mousedown_event_prevent_default: false,
            always_show_expand_btn: false,
            not_show_expand_btn: false,
            expand_btn_size: 20.0,
            is_show_create_child_btn_icon: false,
            enable_inherit_ancestor_line_style: false,
            enable_drag_modify_node_width: true,
            min_node_text_modify_width: 20.0,
            max_node_text_modify_width: -1.0,
            is_use_custom_node_content: false,
            only_one_enable_active_node_on_cooperate: false,
            text_content_margin: 2.0,
            block_content_margin: 5.0,
            tag_placement: TagPlacement::Right,
            img_placement: ImgPlacement::Top,
            max_img_width: 200.0,
            max_img_height: 100.0,
            icon_size: None,
            rainbow_lines: None,
            cooperate: false,
            render_deferred: false,
        }
    }
}

impl MindMapOptions {
    /// Parses options from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`MindMapError::Serialization`] for malformed input.
    pub fn from_json(json: &str) -> Result<Self, MindMapError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Clamps a dragged text width into the configured bounds.
    #[must_use]
    pub fn clamp_text_width(&self, width: f64) -> f64 {
        let width = width.max(self.min_node_text_modify_width);
        if self.max_node_text_modify_width >= 0.0 {
            width.min(self.max_node_text_modify_width.max(self.min_node_text_modify_width))
        } else {
            width
        }
    }
}
