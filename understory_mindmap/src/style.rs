// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style resolution: node-local overrides, inherited line styles, and themes.
//!
//! A node's effective value for a [`StyleProp`] is found by checking, in order:
//! 1. the node's own override (a key in its data),
//! 2. for inheritable properties when asked, the nearest ancestor override,
//! 3. the theme section for the node's layer (`root`, `second`, `node`, or
//!    `generalization`), unless [`StyleScope::Base`] is requested,
//! 4. the theme's base section.

use std::rc::Rc;

use peniko::Color;
use peniko::color::{Srgb, parse_color};
use serde_json::Value;
use smallvec::SmallVec;
use understory_scene::{Dash, FontDesc, FontWeight};

use crate::shape::NodeShape;
use crate::tree::{NodeId, NodeTree};

/// A style property a node can override.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(missing_docs, reason = "Variants mirror their camelCase data keys.")]
pub enum StyleProp {
    PaddingX,
    PaddingY,
    IconSize,
    Shape,
    FillColor,
    Color,
    FontFamily,
    FontSize,
    FontWeight,
    FontStyle,
    LineHeight,
    BorderColor,
    BorderWidth,
    BorderDasharray,
    BorderRadius,
    MarginX,
    MarginY,
    LineWidth,
    LineColor,
    LineDasharray,
    LineStyle,
    GeneralizationLineWidth,
    GeneralizationLineColor,
    GeneralizationLineMargin,
    GeneralizationNodeMargin,
}

impl StyleProp {
    /// Every property, in declaration order.
    pub const ALL: [Self; 25] = [
        Self::PaddingX,
        Self::PaddingY,
        Self::IconSize,
        Self::Shape,
        Self::FillColor,
        Self::Color,
        Self::FontFamily,
        Self::FontSize,
        Self::FontWeight,
        Self::FontStyle,
        Self::LineHeight,
        Self::BorderColor,
        Self::BorderWidth,
        Self::BorderDasharray,
        Self::BorderRadius,
        Self::MarginX,
        Self::MarginY,
        Self::LineWidth,
        Self::LineColor,
        Self::LineDasharray,
        Self::LineStyle,
        Self::GeneralizationLineWidth,
        Self::GeneralizationLineColor,
        Self::GeneralizationLineMargin,
        Self::GeneralizationNodeMargin,
    ];

    /// Data key of this property.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::PaddingX => "paddingX",
            Self::PaddingY => "paddingY",
            Self::IconSize => "iconSize",
            Self::Shape => "shape",
            Self::FillColor => "fillColor",
            Self::Color => "color",
            Self::FontFamily => "fontFamily",
            Self::FontSize => "fontSize",
            Self::FontWeight => "fontWeight",
            Self::FontStyle => "fontStyle",
            Self::LineHeight => "lineHeight",
            Self::BorderColor => "borderColor",
            Self::BorderWidth => "borderWidth",
            Self::BorderDasharray => "borderDasharray",
            Self::BorderRadius => "borderRadius",
            Self::MarginX => "marginX",
            Self::MarginY => "marginY",
            Self::LineWidth => "lineWidth",
            Self::LineColor => "lineColor",
            Self::LineDasharray => "lineDasharray",
            Self::LineStyle => "lineStyle",
            Self::GeneralizationLineWidth => "generalizationLineWidth",
            Self::GeneralizationLineColor => "generalizationLineColor",
            Self::GeneralizationLineMargin => "generalizationLineMargin",
            Self::GeneralizationNodeMargin => "generalizationNodeMargin",
        }
    }

    /// Looks a property up by its data key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }

    /// Properties a node may inherit from the nearest ancestor override.
    #[must_use]
    pub const fn is_inheritable(self) -> bool {
        matches!(self, Self::LineWidth | Self::LineColor | Self::LineDasharray)
    }
}

/// A style value: numbers for sizes, text for everything else.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
    /// Numeric value.
    Number(f64),
    /// Textual value (colors, font names, keywords).
    Text(String),
}

impl StyleValue {
    /// Numeric view; numeric strings are parsed.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Textual view; numbers are formatted.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    pub(crate) fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::Text(s) => Value::String(s.clone()),
        }
    }
}

impl From<f64> for StyleValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

/// Sections of a [`Theme`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThemeSection {
    /// Fallback for everything.
    Base,
    /// The root node.
    Root,
    /// Direct children of the root.
    Second,
    /// Deeper nodes.
    Node,
    /// Summary nodes.
    Generalization,
}

/// Which theme sections a lookup may use.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StyleScope {
    /// The node's layer section, then base.
    Layered,
    /// Base only (used for lines and other tree-wide values).
    Base,
}

/// Sectioned style defaults.
///
/// Themes are immutable after creation and cheap to clone. Use
/// [`ThemeBuilder`] to construct them; [`Theme::default`] is the stock theme.
#[derive(Clone, Debug)]
pub struct Theme {
    inner: Rc<ThemeData>,
}

#[derive(Debug, Default)]
struct ThemeData {
    /// Sorted by key for binary search lookup.
    entries: Vec<((ThemeSection, StyleProp), StyleValue)>,
    node_use_line_style: bool,
}

impl Theme {
    /// Value set directly in `section`, without falling back.
    #[must_use]
    pub fn get(&self, section: ThemeSection, prop: StyleProp) -> Option<&StyleValue> {
        self.inner
            .entries
            .binary_search_by_key(&(section, prop), |(k, _)| *k)
            .ok()
            .map(|idx| &self.inner.entries[idx].1)
    }

    /// Value in `section`, falling back to the base section.
    #[must_use]
    pub fn lookup(&self, section: ThemeSection, prop: StyleProp) -> Option<&StyleValue> {
        self.get(section, prop)
            .or_else(|| self.get(ThemeSection::Base, prop))
    }

    /// When set, nodes are drawn as underlined text and shapes are ignored.
    #[must_use]
    pub fn node_use_line_style(&self) -> bool {
        self.inner.node_use_line_style
    }

    /// Number of entries across all sections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if the theme has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl Default for Theme {
    fn default() -> Self {
        use StyleProp as P;
        use ThemeSection as S;

        let mut b = ThemeBuilder::new()
            .set(S::Base, P::PaddingX, 15.0)
            .set(S::Base, P::PaddingY, 5.0)
            .set(S::Base, P::IconSize, 20.0)
            .set(S::Base, P::Shape, "rectangle")
            .set(S::Base, P::FontFamily, "Microsoft YaHei, sans-serif")
            .set(S::Base, P::FontWeight, "normal")
            .set(S::Base, P::FontStyle, "normal")
            .set(S::Base, P::LineHeight, 1.5)
            .set(S::Base, P::BorderRadius, 5.0)
            .set(S::Base, P::LineWidth, 1.0)
            .set(S::Base, P::LineColor, "#549688")
            .set(S::Base, P::LineStyle, "straight")
            .set(S::Base, P::GeneralizationLineWidth, 1.0)
            .set(S::Base, P::GeneralizationLineColor, "#549688")
            .set(S::Base, P::GeneralizationLineMargin, 0.0)
            .set(S::Base, P::GeneralizationNodeMargin, 20.0)
            .set(S::Root, P::FillColor, "#549688")
            .set(S::Root, P::Color, "#fff")
            .set(S::Root, P::FontSize, 16.0)
            .set(S::Root, P::FontWeight, "bold")
            .set(S::Root, P::BorderWidth, 0.0)
            .set(S::Root, P::BorderRadius, 5.0);
        for section in [S::Second, S::Generalization] {
            b = b
                .set(section, P::MarginX, 100.0)
                .set(section, P::MarginY, 40.0)
                .set(section, P::FillColor, "#fff")
                .set(section, P::Color, "#565656")
                .set(section, P::FontSize, 16.0)
                .set(section, P::BorderColor, "#549688")
                .set(section, P::BorderWidth, 1.0)
                .set(section, P::BorderRadius, 5.0);
        }
        b.set(S::Node, P::MarginX, 50.0)
            .set(S::Node, P::MarginY, 0.0)
            .set(S::Node, P::FillColor, "transparent")
            .set(S::Node, P::Color, "#6a6d6c")
            .set(S::Node, P::FontSize, 14.0)
            .set(S::Node, P::BorderColor, "transparent")
            .set(S::Node, P::BorderWidth, 0.0)
            .set(S::Node, P::BorderRadius, 5.0)
            .build()
    }
}

/// Builder for [`Theme`].
///
/// # Example
///
/// ```rust
/// use understory_mindmap::{StyleProp, StyleValue, ThemeBuilder, ThemeSection};
///
/// let theme = ThemeBuilder::new()
///     .set(ThemeSection::Base, StyleProp::LineColor, "#333")
///     .set(ThemeSection::Root, StyleProp::FontSize, 24.0)
///     .build();
///
/// assert_eq!(
///     theme.lookup(ThemeSection::Second, StyleProp::LineColor),
///     Some(&StyleValue::Text("#333".into()))
/// );
/// ```
#[derive(Debug, Default)]
pub struct ThemeBuilder {
    entries: Vec<((ThemeSection, StyleProp), StyleValue)>,
    node_use_line_style: bool,
}

impl ThemeBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing theme's entries.
    #[must_use]
    pub fn from_theme(theme: &Theme) -> Self {
        Self {
            entries: theme.inner.entries.clone(),
            node_use_line_style: theme.inner.node_use_line_style,
        }
    }

    /// Sets a value, replacing any previous one for the same section and property.
    #[must_use]
    pub fn set(
        mut self,
        section: ThemeSection,
        prop: StyleProp,
        value: impl Into<StyleValue>,
    ) -> Self {
        let key = (section, prop);
        let value = value.into();
        match self.entries.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (key, value)),
        }
        self
    }

    /// Sets the underlined-text node style flag.
    #[must_use]
    pub fn node_use_line_style(mut self, enabled: bool) -> Self {
        self.node_use_line_style = enabled;
        self
    }

    /// Builds the theme.
    #[must_use]
    pub fn build(self) -> Theme {
        Theme {
            inner: Rc::new(ThemeData {
                entries: self.entries,
                node_use_line_style: self.node_use_line_style,
            }),
        }
    }
}

/// Resolves style values for nodes of a tree against a theme.
#[derive(Copy, Clone, Debug)]
pub struct StyleResolver<'a> {
    tree: &'a NodeTree,
    theme: &'a Theme,
}

impl<'a> StyleResolver<'a> {
    /// Creates a resolver.
    #[must_use]
    pub fn new(tree: &'a NodeTree, theme: &'a Theme) -> Self {
        Self { tree, theme }
    }

    /// Theme section that applies to `id`.
    #[must_use]
    pub fn section(&self, id: NodeId) -> ThemeSection {
        match self.tree.get(id) {
            Some(node) if node.is_generalization() => ThemeSection::Generalization,
            Some(node) => match node.layer_index() {
                0 => ThemeSection::Root,
                1 => ThemeSection::Second,
                _ => ThemeSection::Node,
            },
            None => ThemeSection::Base,
        }
    }

    /// The node's own override for `prop`.
    #[must_use]
    pub fn self_style(&self, id: NodeId, prop: StyleProp) -> Option<StyleValue> {
        self.tree.get(id)?.data().style_override(prop)
    }

    /// The node's own override, else the nearest ancestor's.
    #[must_use]
    pub fn self_inherit_style(&self, id: NodeId, prop: StyleProp) -> Option<StyleValue> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(v) = self.self_style(node, prop) {
                return Some(v);
            }
            current = self.tree.parent_of(node);
        }
        None
    }

    /// Effective value of `prop` for `id`.
    #[must_use]
    pub fn resolve(&self, id: NodeId, prop: StyleProp, scope: StyleScope) -> Option<StyleValue> {
        if let Some(v) = self.self_style(id, prop) {
            return Some(v);
        }
        let section = match scope {
            StyleScope::Layered => self.section(id),
            StyleScope::Base => ThemeSection::Base,
        };
        self.theme.lookup(section, prop).cloned()
    }

    /// Numeric effective value, `0.0` when unset.
    #[must_use]
    pub fn number(&self, id: NodeId, prop: StyleProp, scope: StyleScope) -> f64 {
        self.resolve(id, prop, scope)
            .and_then(|v| v.as_number())
            .unwrap_or(0.0)
    }

    /// Textual effective value, empty when unset.
    #[must_use]
    pub fn text(&self, id: NodeId, prop: StyleProp, scope: StyleScope) -> String {
        self.resolve(id, prop, scope)
            .map(|v| v.as_text())
            .unwrap_or_default()
    }

    /// Returns `true` if the node overrides any style property.
    #[must_use]
    pub fn has_custom_style(&self, id: NodeId) -> bool {
        self.tree.get(id).is_some_and(|n| n.data().has_custom_style())
    }

    /// Shape of the node; forced to a rectangle by the line-style theme flag.
    #[must_use]
    pub fn shape(&self, id: NodeId) -> NodeShape {
        if self.theme.node_use_line_style() {
            NodeShape::Rectangle
        } else {
            NodeShape::parse(&self.text(id, StyleProp::Shape, StyleScope::Layered))
        }
    }

    /// Snapshot of every value sizing and drawing need.
    #[must_use]
    pub fn resolved(&self, id: NodeId) -> ResolvedStyle {
        use StyleProp as P;
        let layered = StyleScope::Layered;
        let weight = match self.text(id, P::FontWeight, layered).as_str() {
            "bold" | "bolder" | "600" | "700" | "800" | "900" => FontWeight::Bold,
            _ => FontWeight::Normal,
        };
        let font_size = self.number(id, P::FontSize, layered);
        let line_height = self.number(id, P::LineHeight, layered);
        ResolvedStyle {
            padding_x: self.number(id, P::PaddingX, layered),
            padding_y: self.number(id, P::PaddingY, layered),
            icon_size: self.number(id, P::IconSize, layered),
            font: FontDesc {
                family: self.text(id, P::FontFamily, layered),
                size: if font_size > 0.0 { font_size } else { 14.0 },
                weight,
                italic: self.text(id, P::FontStyle, layered) == "italic",
                line_height: if line_height > 0.0 { line_height } else { 1.5 },
            },
            color: parse_css_color(&self.text(id, P::Color, layered)),
            fill: parse_css_color(&self.text(id, P::FillColor, layered)),
            border_color: parse_css_color(&self.text(id, P::BorderColor, layered)),
            border_width: self.number(id, P::BorderWidth, layered),
            border_radius: self.number(id, P::BorderRadius, layered),
            border_dash: parse_dash(&self.text(id, P::BorderDasharray, layered)),
            shape: self.shape(id),
            margin_x: self.number(id, P::MarginX, layered),
            margin_y: self.number(id, P::MarginY, layered),
        }
    }
}

/// Effective style of one node, resolved once per sizing pass.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedStyle {
    /// Horizontal padding.
    pub padding_x: f64,
    /// Vertical padding.
    pub padding_y: f64,
    /// Icon edge length.
    pub icon_size: f64,
    /// Text font.
    pub font: FontDesc,
    /// Text color.
    pub color: Option<Color>,
    /// Background fill.
    pub fill: Option<Color>,
    /// Border color.
    pub border_color: Option<Color>,
    /// Border width.
    pub border_width: f64,
    /// Corner radius.
    pub border_radius: f64,
    /// Border dash pattern.
    pub border_dash: Dash,
    /// Background shape.
    pub shape: NodeShape,
    /// Horizontal gap to the parent.
    pub margin_x: f64,
    /// Vertical gap between siblings.
    pub margin_y: f64,
}

/// Parses a CSS color; empty, `none`, and `transparent` yield `None`.
#[must_use]
pub fn parse_css_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if value.is_empty()
        || value.eq_ignore_ascii_case("none")
        || value.eq_ignore_ascii_case("transparent")
    {
        return None;
    }
    parse_color(value)
        .ok()
        .map(|c| c.to_alpha_color::<Srgb>())
}

/// Parses an SVG dash array (`"5,5"` or `"5 5"`); anything unparsable is solid.
#[must_use]
pub fn parse_dash(value: &str) -> Dash {
    let dash: Option<Dash> = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect();
    match dash {
        Some(d) if d.iter().any(|v| *v > 0.0) => d,
        _ => SmallVec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{NodeData, NodeRecord};
    use crate::node::MindMapNode;

    fn tree_with_chain() -> (NodeTree, NodeId, NodeId, NodeId) {
        let mut tree = NodeTree::new();
        let root = tree.insert(MindMapNode::from_data(NodeData::default()));
        tree.set_root(root);
        let mut second_data = NodeData::default();
        second_data.set_style_override(StyleProp::LineColor, Some("#f00".into()));
        let second = tree.insert(MindMapNode::from_data(second_data));
        tree.link(root, second, None);
        let third = tree.insert(MindMapNode::from_data(NodeRecord::with_text("c").data));
        tree.link(second, third, None);
        (tree, root, second, third)
    }

    #[test]
    fn sections_follow_layer() {
        let (tree, root, second, third) = tree_with_chain();
        let theme = Theme::default();
        let r = StyleResolver::new(&tree, &theme);
        assert_eq!(r.section(root), ThemeSection::Root);
        assert_eq!(r.section(second), ThemeSection::Second);
        assert_eq!(r.section(third), ThemeSection::Node);
        assert_eq!(r.number(root, StyleProp::FontSize, StyleScope::Layered), 16.0);
        assert_eq!(r.number(third, StyleProp::FontSize, StyleScope::Layered), 14.0);
        // Base scope skips the layer section.
        assert_eq!(r.number(root, StyleProp::FontSize, StyleScope::Base), 0.0);
    }

    #[test]
    fn local_override_wins() {
        let (tree, _, second, _) = tree_with_chain();
        let theme = Theme::default();
        let r = StyleResolver::new(&tree, &theme);
        assert_eq!(
            r.resolve(second, StyleProp::LineColor, StyleScope::Base),
            Some(StyleValue::Text("#f00".into()))
        );
        assert!(r.has_custom_style(second));
    }

    #[test]
    fn inheritance_walks_ancestors() {
        let (tree, root, _, third) = tree_with_chain();
        let theme = Theme::default();
        let r = StyleResolver::new(&tree, &theme);
        assert_eq!(r.self_style(third, StyleProp::LineColor), None);
        assert_eq!(
            r.self_inherit_style(third, StyleProp::LineColor),
            Some(StyleValue::Text("#f00".into()))
        );
        assert_eq!(r.self_inherit_style(root, StyleProp::LineColor), None);
    }

    #[test]
    fn line_style_flag_forces_rectangle() {
        let mut tree = NodeTree::new();
        let mut data = NodeData::default();
        data.set_style_override(StyleProp::Shape, Some("diamond".into()));
        let root = tree.insert(MindMapNode::from_data(data));
        tree.set_root(root);

        let plain = Theme::default();
        assert_eq!(StyleResolver::new(&tree, &plain).shape(root), NodeShape::Diamond);
        let lined = ThemeBuilder::from_theme(&plain)
            .node_use_line_style(true)
            .build();
        assert_eq!(StyleResolver::new(&tree, &lined).shape(root), NodeShape::Rectangle);
    }

    #[test]
    fn builder_replaces_existing_entries() {
        let theme = ThemeBuilder::new()
            .set(ThemeSection::Base, StyleProp::LineWidth, 1.0)
            .set(ThemeSection::Base, StyleProp::LineWidth, 3.0)
            .build();
        assert_eq!(theme.len(), 1);
        assert_eq!(
            theme.get(ThemeSection::Base, StyleProp::LineWidth),
            Some(&StyleValue::Number(3.0))
        );
    }

    #[test]
    fn colors_and_dashes_parse() {
        assert_eq!(parse_css_color("transparent"), None);
        assert_eq!(parse_css_color(""), None);
        let c = parse_css_color("#549688").unwrap().to_rgba8();
        assert_eq!((c.r, c.g, c.b, c.a), (0x54, 0x96, 0x88, 255));
        assert_eq!(parse_dash("5,5").as_slice(), &[5.0, 5.0]);
        assert_eq!(parse_dash("4 2").as_slice(), &[4.0, 2.0]);
        assert!(parse_dash("none").is_empty());
        assert!(parse_dash("").is_empty());
    }

    #[test]
    fn prop_keys_round_trip() {
        for prop in StyleProp::ALL {
            assert_eq!(StyleProp::from_key(prop.key()), Some(prop));
        }
        assert!(StyleProp::LineColor.is_inheritable());
        assert!(!StyleProp::FillColor.is_inheritable());
    }
}
