// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node content: per-kind fragments, builders, and the arrangement that sizes
//! a node.
//!
//! Sizing a node rebuilds some or all of its [`ContentKind`]s into
//! [`Fragment`]s (a detached scene element plus its intrinsic size), then
//! [`arrange`] lays the fragments out into a content box. The same
//! arrangement is used later to place the fragments inside the node group.

use core::fmt;

use hashbrown::HashMap;
use kurbo::{Point, Size, Vec2};
use peniko::Color;
use tracing::trace;
use understory_scene::{ElementDesc, ElementId, FontDesc, FontWeight, Paint, Parent, SceneBackend};

use crate::data::ImageSize;
use crate::mindmap::MindMap;
use crate::node::{MindMapNode, NodeFlags};
use crate::options::{ImgPlacement, MindMapOptions, TagPlacement};
use crate::scheduler::Task;
use crate::shape::shape_padding;
use crate::style::{ResolvedStyle, StyleResolver};
use crate::tree::NodeId;

/// A kind of node content.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Output of the custom content builder; replaces every built-in kind.
    Custom,
    /// Image.
    Image,
    /// Icon list.
    Icon,
    /// Text.
    Text,
    /// Hyperlink glyph.
    Hyperlink,
    /// Tag list.
    Tag,
    /// Card note count badge.
    CardCount,
    /// Note glyph.
    Note,
    /// Attachment glyph.
    Attachment,
    /// Output of the prefix builder.
    Prefix,
    /// Output of the postfix builder.
    Postfix,
    /// Output of a registered [`ContentExtension`].
    Extension(String),
}

impl ContentKind {
    /// Every kind without a registration, in build order.
    pub const BUILT_IN: [Self; 11] = [
        Self::Custom,
        Self::Image,
        Self::Icon,
        Self::Text,
        Self::Hyperlink,
        Self::Tag,
        Self::CardCount,
        Self::Note,
        Self::Attachment,
        Self::Prefix,
        Self::Postfix,
    ];
}

/// A built piece of content: a detached scene element and its size.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fragment {
    /// Element owned by the node once returned to the core.
    pub element: ElementId,
    /// Intrinsic width.
    pub width: f64,
    /// Intrinsic height.
    pub height: f64,
}

impl Fragment {
    /// Creates a fragment.
    #[must_use]
    pub fn new(element: ElementId, size: Size) -> Self {
        Self {
            element,
            width: size.width,
            height: size.height,
        }
    }

    /// Intrinsic size.
    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Built fragments of one node, one slot per kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeContent {
    custom: Option<Fragment>,
    image: Option<Fragment>,
    icons: Vec<Fragment>,
    text: Option<Fragment>,
    hyperlink: Option<Fragment>,
    tags: Vec<Fragment>,
    card_count: Option<Fragment>,
    note: Option<Fragment>,
    attachment: Option<Fragment>,
    prefix: Option<Fragment>,
    postfix: Option<Fragment>,
    extensions: HashMap<String, Fragment>,
}

impl NodeContent {
    /// Custom content, when the custom builder produced some.
    #[must_use]
    pub fn custom(&self) -> Option<&Fragment> {
        self.custom.as_ref()
    }

    /// Image fragment.
    #[must_use]
    pub fn image(&self) -> Option<&Fragment> {
        self.image.as_ref()
    }

    /// Icon fragments in data order.
    #[must_use]
    pub fn icons(&self) -> &[Fragment] {
        &self.icons
    }

    /// Text fragment.
    #[must_use]
    pub fn text(&self) -> Option<&Fragment> {
        self.text.as_ref()
    }

    /// Hyperlink fragment.
    #[must_use]
    pub fn hyperlink(&self) -> Option<&Fragment> {
        self.hyperlink.as_ref()
    }

    /// Tag fragments in data order.
    #[must_use]
    pub fn tags(&self) -> &[Fragment] {
        &self.tags
    }

    /// Card note count badge.
    #[must_use]
    pub fn card_count(&self) -> Option<&Fragment> {
        self.card_count.as_ref()
    }

    /// Note fragment.
    #[must_use]
    pub fn note(&self) -> Option<&Fragment> {
        self.note.as_ref()
    }

    /// Attachment fragment.
    #[must_use]
    pub fn attachment(&self) -> Option<&Fragment> {
        self.attachment.as_ref()
    }

    /// Prefix fragment.
    #[must_use]
    pub fn prefix(&self) -> Option<&Fragment> {
        self.prefix.as_ref()
    }

    /// Postfix fragment.
    #[must_use]
    pub fn postfix(&self) -> Option<&Fragment> {
        self.postfix.as_ref()
    }

    /// Fragment of a registered extension.
    #[must_use]
    pub fn extension(&self, name: &str) -> Option<&Fragment> {
        self.extensions.get(name)
    }

    /// Every owned element.
    pub fn elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.custom
            .iter()
            .chain(&self.image)
            .chain(&self.icons)
            .chain(&self.text)
            .chain(&self.hyperlink)
            .chain(&self.tags)
            .chain(&self.card_count)
            .chain(&self.note)
            .chain(&self.attachment)
            .chain(&self.prefix)
            .chain(&self.postfix)
            .chain(self.extensions.values())
            .map(|f| f.element)
    }

    /// Returns `true` if nothing was built.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }

    pub(crate) fn take(&mut self, kind: &ContentKind) -> Vec<Fragment> {
        match kind {
            ContentKind::Custom => self.custom.take().into_iter().collect(),
            ContentKind::Image => self.image.take().into_iter().collect(),
            ContentKind::Icon => core::mem::take(&mut self.icons),
            ContentKind::Text => self.text.take().into_iter().collect(),
            ContentKind::Hyperlink => self.hyperlink.take().into_iter().collect(),
            ContentKind::Tag => core::mem::take(&mut self.tags),
            ContentKind::CardCount => self.card_count.take().into_iter().collect(),
            ContentKind::Note => self.note.take().into_iter().collect(),
            ContentKind::Attachment => self.attachment.take().into_iter().collect(),
            ContentKind::Prefix => self.prefix.take().into_iter().collect(),
            ContentKind::Postfix => self.postfix.take().into_iter().collect(),
            ContentKind::Extension(name) => self.extensions.remove(name).into_iter().collect(),
        }
    }

    pub(crate) fn put(&mut self, kind: &ContentKind, fragments: Vec<Fragment>) {
        let first = fragments.first().copied();
        match kind {
            ContentKind::Custom => self.custom = first,
            ContentKind::Image => self.image = first,
            ContentKind::Icon => self.icons = fragments,
            ContentKind::Text => self.text = first,
            ContentKind::Hyperlink => self.hyperlink = first,
            ContentKind::Tag => self.tags = fragments,
            ContentKind::CardCount => self.card_count = first,
            ContentKind::Note => self.note = first,
            ContentKind::Attachment => self.attachment = first,
            ContentKind::Prefix => self.prefix = first,
            ContentKind::Postfix => self.postfix = first,
            ContentKind::Extension(name) => {
                if let Some(f) = first {
                    self.extensions.insert(name.clone(), f);
                }
            }
        }
    }
}

/// What a content builder sees while a node is being sized.
pub struct ContentCx<'a> {
    scene: &'a mut dyn SceneBackend,
    node: &'a MindMapNode,
    id: NodeId,
    style: &'a ResolvedStyle,
    options: &'a MindMapOptions,
    width_editable: bool,
    render_requested: bool,
}

impl fmt::Debug for ContentCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentCx")
            .field("id", &self.id)
            .field("render_requested", &self.render_requested)
            .finish_non_exhaustive()
    }
}

impl<'a> ContentCx<'a> {
    pub(crate) fn new(
        scene: &'a mut dyn SceneBackend,
        node: &'a MindMapNode,
        id: NodeId,
        style: &'a ResolvedStyle,
        options: &'a MindMapOptions,
        width_editable: bool,
    ) -> Self {
        Self {
            scene,
            node,
            id,
            style,
            options,
            width_editable,
            render_requested: false,
        }
    }

    /// Scene to create fragment elements in. Leave them detached.
    pub fn scene(&mut self) -> &mut dyn SceneBackend {
        &mut *self.scene
    }

    /// The node being sized.
    #[must_use]
    pub fn node(&self) -> &MindMapNode {
        self.node
    }

    /// Handle of the node being sized.
    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.id
    }

    /// Resolved style of the node.
    #[must_use]
    pub fn style(&self) -> &ResolvedStyle {
        self.style
    }

    /// Map options.
    #[must_use]
    pub fn options(&self) -> &MindMapOptions {
        self.options
    }

    /// Asks for the node to be re-rendered once sizing has finished.
    ///
    /// The request is queued; it never re-enters the sizing pass. Requests
    /// made while a queued re-render sizes the node again are dropped, and
    /// a node is queued at most once.
    pub fn request_render(&mut self) {
        self.render_requested = true;
    }

    /// Creates a text element with `font` and `color` and measures it.
    pub fn text(&mut self, content: &str, font: &FontDesc, color: Option<Color>) -> Fragment {
        let size = self.scene.measure_text(content, font);
        let element = self.scene.create(ElementDesc::Text {
            content: content.to_owned(),
            font: font.clone(),
        });
        self.scene.set_paint(
            element,
            Paint {
                fill: color,
                stroke: None,
            },
        );
        Fragment::new(element, size)
    }

    /// Creates a square glyph element referencing a named icon.
    pub fn glyph(&mut self, name: &str, edge: f64) -> Fragment {
        let size = Size::new(edge, edge);
        let element = self.scene.create(ElementDesc::Image {
            url: format!("icon:{name}"),
            size,
        });
        Fragment::new(element, size)
    }
}

/// Builds a single fragment for a node (custom content, prefix, postfix).
///
/// Returning `None` means "nothing to show"; for the custom builder it means
/// the built-in content is used instead.
pub trait ContentBuilder {
    /// Builds the fragment.
    fn build(&self, cx: &mut ContentCx<'_>) -> Option<Fragment>;
}

impl<F> ContentBuilder for F
where
    F: Fn(&mut ContentCx<'_>) -> Option<Fragment>,
{
    fn build(&self, cx: &mut ContentCx<'_>) -> Option<Fragment> {
        self(cx)
    }
}

/// Side of the text row an extension's fragment goes on.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Before the built-in row content.
    Prefix,
    /// After the built-in row content.
    Postfix,
}

/// An additional content kind registered on a map.
pub trait ContentExtension {
    /// Unique name; the kind is addressed as [`ContentKind::Extension`].
    fn name(&self) -> &str;

    /// Where the fragment goes in the text row.
    fn placement(&self) -> Placement;

    /// Builds the fragment; `None` shows nothing.
    fn create_content(&self, cx: &mut ContentCx<'_>) -> Option<Fragment>;
}

/// Builders configured on a map.
#[derive(Default)]
pub(crate) struct ContentRegistry {
    pub(crate) custom: Option<Box<dyn ContentBuilder>>,
    pub(crate) prefix: Option<Box<dyn ContentBuilder>>,
    pub(crate) postfix: Option<Box<dyn ContentBuilder>>,
    pub(crate) extensions: Vec<Box<dyn ContentExtension>>,
}

impl fmt::Debug for ContentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.extensions.iter().map(|e| e.name()).collect();
        f.debug_struct("ContentRegistry")
            .field("custom", &self.custom.is_some())
            .field("prefix", &self.prefix.is_some())
            .field("postfix", &self.postfix.is_some())
            .field("extensions", &names)
            .finish()
    }
}

impl ContentRegistry {
    fn extension_names(&self, placement: Placement) -> Vec<String> {
        self.extensions
            .iter()
            .filter(|e| e.placement() == placement)
            .map(|e| e.name().to_owned())
            .collect()
    }

    fn all_kinds(&self) -> Vec<ContentKind> {
        ContentKind::BUILT_IN
            .into_iter()
            .chain(
                self.extensions
                    .iter()
                    .map(|e| ContentKind::Extension(e.name().to_owned())),
            )
            .collect()
    }
}

const TAG_FONT_SIZE: f64 = 12.0;
const TAG_PADDING: Vec2 = Vec2::new(8.0, 4.0);
const BADGE_FONT_SIZE: f64 = 10.0;

fn image_fragment(cx: &mut ContentCx<'_>) -> Option<Fragment> {
    let url = cx.node.data.image.clone()?;
    let size = fit_image(
        cx.node.data.image_size,
        cx.options.max_img_width,
        cx.options.max_img_height,
    );
    let element = cx.scene.create(ElementDesc::Image { url, size });
    Some(Fragment::new(element, size))
}

/// Scales an image down (never up) to fit the limits; user-sized images keep
/// their size.
fn fit_image(size: Option<ImageSize>, max_width: f64, max_height: f64) -> Size {
    let Some(size) = size else {
        return Size::new(max_width.min(max_height), max_width.min(max_height));
    };
    if size.custom || (size.width <= max_width && size.height <= max_height) {
        return Size::new(size.width, size.height);
    }
    if size.width <= 0.0 || size.height <= 0.0 {
        return Size::ZERO;
    }
    let scale = (max_width / size.width).min(max_height / size.height);
    Size::new(size.width * scale, size.height * scale)
}

fn icon_fragments(cx: &mut ContentCx<'_>) -> Vec<Fragment> {
    let edge = cx.options.icon_size.unwrap_or(cx.style.icon_size);
    let names = cx.node.data.icon.clone();
    names.iter().map(|name| cx.glyph(name, edge)).collect()
}

fn text_fragment(cx: &mut ContentCx<'_>) -> Fragment {
    let font = cx.style.font.clone();
    let color = cx.style.color;
    let content = cx.node.data.text.clone();
    let mut fragment = cx.text(&content, &font, color);
    let custom_width = cx
        .node
        .custom_text_width
        .filter(|w| cx.width_editable && *w > 0.0);
    if let Some(width) = custom_width {
        let lines = (fragment.width / width).ceil().max(1.0);
        fragment.height *= lines;
        fragment.width = width;
    }
    fragment
}

fn badge(
    cx: &mut ContentCx<'_>,
    label: &str,
    font_size: f64,
    padding: Vec2,
    fill: Color,
    text_color: Color,
) -> Fragment {
    let font = FontDesc {
        family: cx.style.font.family.clone(),
        size: font_size,
        weight: FontWeight::Normal,
        italic: false,
        line_height: 1.0,
    };
    let text = cx.text(label, &font, Some(text_color));
    let size = Size::new(text.width + padding.x * 2.0, text.height + padding.y * 2.0);
    let group = cx.scene.create(ElementDesc::Group);
    let rect = cx.scene.create(ElementDesc::Rect { size, radius: 3.0 });
    cx.scene.set_paint(
        rect,
        Paint {
            fill: Some(fill),
            stroke: None,
        },
    );
    cx.scene.append(Parent::Element(group), rect);
    cx.scene.append(Parent::Element(group), text.element);
    cx.scene.set_translation(text.element, padding);
    Fragment::new(group, size)
}

fn tag_fragments(cx: &mut ContentCx<'_>) -> Vec<Fragment> {
    let tags = cx.node.data.tag.clone();
    let fill = cx.style.border_color.unwrap_or(Color::from_rgba8(0x54, 0x96, 0x88, 0xff));
    tags.iter()
        .map(|tag| badge(cx, tag, TAG_FONT_SIZE, TAG_PADDING, fill, Color::WHITE))
        .collect()
}

fn card_count_fragment(cx: &mut ContentCx<'_>) -> Option<Fragment> {
    let count = cx.node.data.card_notes.len();
    if count == 0 {
        return None;
    }
    Some(badge(
        cx,
        &count.to_string(),
        BADGE_FONT_SIZE,
        Vec2::new(4.0, 2.0),
        Color::from_rgba8(138, 43, 226, 178),
        Color::from_rgba8(0xff, 0xff, 0xff, 0xff),
    ))
}

fn glyph_if(cx: &mut ContentCx<'_>, present: bool, name: &str) -> Option<Fragment> {
    if !present {
        return None;
    }
    let edge = cx.style.font.size;
    Some(cx.glyph(name, edge))
}

fn replace(
    content: &mut NodeContent,
    cx: &mut ContentCx<'_>,
    kind: &ContentKind,
    fragments: Vec<Fragment>,
) {
    for old in content.take(kind) {
        cx.scene.destroy(old.element);
    }
    content.put(kind, fragments);
}

/// Placement of every fragment inside a node's content box.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arrangement {
    /// Size of the content box.
    pub size: Size,
    /// Each placed element with its offset from the content box origin.
    pub items: Vec<(ElementId, Point)>,
}

struct Row {
    size: Size,
    items: Vec<(ElementId, Point)>,
}

impl Row {
    fn horizontal(fragments: &[Fragment], gap: f64) -> Self {
        let height = fragments.iter().map(|f| f.height).fold(0.0, f64::max);
        let mut x = 0.0;
        let mut items = Vec::with_capacity(fragments.len());
        for (i, f) in fragments.iter().enumerate() {
            if i > 0 {
                x += gap;
            }
            items.push((f.element, Point::new(x, (height - f.height) / 2.0)));
            x += f.width;
        }
        Self {
            size: Size::new(x, height),
            items,
        }
    }

    fn single(fragment: &Fragment) -> Self {
        Self::horizontal(core::slice::from_ref(fragment), 0.0)
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Lays fragments out into a content box.
///
/// Custom content stands alone. Otherwise the text row holds, left to right:
/// prefix, prefix extensions, icons, text, hyperlink, tags (when placed on
/// the right), card count, note, attachment, postfix extensions, postfix. The
/// image goes above the row or to its left, bottom-placed tags get their own
/// row below, and blocks are centered horizontally.
#[must_use]
pub fn arrange(
    content: &NodeContent,
    options: &MindMapOptions,
    prefix_extensions: &[String],
    postfix_extensions: &[String],
) -> Arrangement {
    if let Some(custom) = &content.custom {
        return Arrangement {
            size: custom.size(),
            items: vec![(custom.element, Point::ORIGIN)],
        };
    }

    let mut row: Vec<Fragment> = Vec::new();
    row.extend(content.prefix);
    row.extend(prefix_extensions.iter().filter_map(|n| content.extensions.get(n)));
    row.extend(content.icons.iter());
    row.extend(content.text);
    row.extend(content.hyperlink);
    if options.tag_placement == TagPlacement::Right {
        row.extend(content.tags.iter());
    }
    row.extend(content.card_count);
    row.extend(content.note);
    row.extend(content.attachment);
    row.extend(postfix_extensions.iter().filter_map(|n| content.extensions.get(n)));
    row.extend(content.postfix);
    let mut text_row = Row::horizontal(&row, options.text_content_margin);

    let gap = options.block_content_margin;
    if options.img_placement == ImgPlacement::Left
        && let Some(image) = &content.image
    {
        let height = image.height.max(text_row.size.height);
        let row_x = if text_row.is_empty() {
            image.width
        } else {
            image.width + gap
        };
        let row_offset = Vec2::new(row_x, (height - text_row.size.height) / 2.0);
        let mut items = vec![(image.element, Point::new(0.0, (height - image.height) / 2.0))];
        items.extend(text_row.items.iter().map(|(e, p)| (*e, *p + row_offset)));
        text_row = Row {
            size: Size::new(row_x + text_row.size.width, height),
            items,
        };
    }

    let mut blocks: Vec<Row> = Vec::new();
    if options.img_placement == ImgPlacement::Top
        && let Some(image) = &content.image
    {
        blocks.push(Row::single(image));
    }
    if !text_row.is_empty() {
        blocks.push(text_row);
    }
    if options.tag_placement == TagPlacement::Bottom && !content.tags.is_empty() {
        blocks.push(Row::horizontal(&content.tags, options.text_content_margin));
    }

    let width = blocks.iter().map(|b| b.size.width).fold(0.0, f64::max);
    let mut y = 0.0;
    let mut items = Vec::new();
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            y += gap;
        }
        let offset = Vec2::new((width - block.size.width) / 2.0, y);
        items.extend(block.items.iter().map(|(e, p)| (*e, *p + offset)));
        y += block.size.height;
    }
    Arrangement {
        size: Size::new(width, y),
        items,
    }
}

/// Geometry of a node derived from its content box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct NodeBox {
    pub(crate) size: Size,
    /// Offset of the content box inside the node.
    pub(crate) content_origin: Vec2,
    pub(crate) shape_padding: crate::shape::ShapePadding,
}

pub(crate) fn node_box(content: Size, style: &ResolvedStyle) -> NodeBox {
    let padding = shape_padding(
        style.shape,
        content.width,
        content.height,
        style.padding_x,
        style.padding_y,
    );
    let half_border = style.border_width / 2.0;
    let inset = Vec2::new(
        style.padding_x + half_border + padding.x,
        style.padding_y + half_border + padding.y,
    );
    NodeBox {
        size: Size::new(content.width + inset.x * 2.0, content.height + inset.y * 2.0),
        content_origin: inset,
        shape_padding: padding,
    }
}

impl<S: SceneBackend> MindMap<S> {
    pub(crate) fn arrangement(&self, id: NodeId) -> Option<Arrangement> {
        let node = self.tree.get(id)?;
        Some(arrange(
            &node.content,
            &self.options,
            &self.content.extension_names(Placement::Prefix),
            &self.content.extension_names(Placement::Postfix),
        ))
    }

    /// Rebuilds the requested content kinds (all when `None`) and recomputes
    /// the node's size.
    ///
    /// Kinds not requested keep their fragments. Returns `true` if width or
    /// height changed, which means a layout pass is needed.
    pub fn compute_size(&mut self, id: NodeId, kinds: Option<&[ContentKind]>) -> bool {
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        node.custom_text_width = node.data.custom_text_width;
        node.custom_left = node.data.custom_left;
        node.custom_top = node.data.custom_top;
        let mut content = core::mem::take(&mut node.content);

        let style = StyleResolver::new(&self.tree, &self.theme).resolved(id);
        let width_editable = self.text_width_editable();
        let rebuild: Vec<ContentKind> = match kinds {
            Some(kinds) => kinds.to_vec(),
            None => self.content.all_kinds(),
        };
        let wants = |kind: &ContentKind| rebuild.contains(kind);

        let render_requested = {
            let Some(node) = self.tree.get(id) else {
                return false;
            };
            let scene: &mut dyn SceneBackend = &mut self.scene;
            let mut cx = ContentCx::new(scene, node, id, &style, &self.options, width_editable);
            let registry = &self.content;

            if wants(&ContentKind::Custom) {
                let built = match (&registry.custom, self.options.is_use_custom_node_content) {
                    (Some(builder), true) => builder.build(&mut cx),
                    _ => None,
                };
                replace(&mut content, &mut cx, &ContentKind::Custom, built.into_iter().collect());
            }

            if content.custom.is_none() {
                if wants(&ContentKind::Image) {
                    let f = image_fragment(&mut cx);
                    replace(&mut content, &mut cx, &ContentKind::Image, f.into_iter().collect());
                }
                if wants(&ContentKind::Icon) {
                    let f = icon_fragments(&mut cx);
                    replace(&mut content, &mut cx, &ContentKind::Icon, f);
                }
                if wants(&ContentKind::Text) {
                    let f = text_fragment(&mut cx);
                    replace(&mut content, &mut cx, &ContentKind::Text, vec![f]);
                }
                if wants(&ContentKind::Hyperlink) {
                    let present = cx.node.data.hyperlink.as_deref().is_some_and(|s| !s.is_empty());
                    let f = glyph_if(&mut cx, present, "hyperlink");
                    let f = f.into_iter().collect();
                    replace(&mut content, &mut cx, &ContentKind::Hyperlink, f);
                }
                if wants(&ContentKind::Tag) {
                    let f = tag_fragments(&mut cx);
                    replace(&mut content, &mut cx, &ContentKind::Tag, f);
                }
                if wants(&ContentKind::CardCount) {
                    let f = card_count_fragment(&mut cx);
                    let f = f.into_iter().collect();
                    replace(&mut content, &mut cx, &ContentKind::CardCount, f);
                }
                if wants(&ContentKind::Note) {
                    let present = cx.node.data.note.as_deref().is_some_and(|s| !s.is_empty());
                    let f = glyph_if(&mut cx, present, "note");
                    replace(&mut content, &mut cx, &ContentKind::Note, f.into_iter().collect());
                }
                if wants(&ContentKind::Attachment) {
                    let present = cx
                        .node
                        .data
                        .attachment_url
                        .as_deref()
                        .is_some_and(|s| !s.is_empty());
                    let f = glyph_if(&mut cx, present, "attachment");
                    let f = f.into_iter().collect();
                    replace(&mut content, &mut cx, &ContentKind::Attachment, f);
                }
                for ext in &registry.extensions {
                    let kind = ContentKind::Extension(ext.name().to_owned());
                    if wants(&kind) {
                        let f = ext.create_content(&mut cx);
                        replace(&mut content, &mut cx, &kind, f.into_iter().collect());
                    }
                }
                for (kind, builder) in [
                    (ContentKind::Prefix, &registry.prefix),
                    (ContentKind::Postfix, &registry.postfix),
                ] {
                    if wants(&kind) {
                        let f = builder.as_ref().and_then(|b| b.build(&mut cx));
                        replace(&mut content, &mut cx, &kind, f.into_iter().collect());
                    }
                }
            }
            cx.render_requested
        };

        let arrangement = arrange(
            &content,
            &self.options,
            &self.content.extension_names(Placement::Prefix),
            &self.content.extension_names(Placement::Postfix),
        );
        let node_box = node_box(arrangement.size, &style);
        let Some(node) = self.tree.get_mut(id) else {
            return false;
        };
        node.content = content;
        node.shape_padding = node_box.shape_padding;
        let changed = node.width != node_box.size.width || node.height != node_box.size.height;
        node.width = node_box.size.width;
        node.height = node_box.size.height;
        node.flags.insert(NodeFlags::NEEDS_LAYOUT);
        let re_rendering = node.flags.contains(NodeFlags::RE_RENDERING);
        if render_requested && !re_rendering && !self.tasks.contains(&Task::ReRender(id)) {
            self.tasks.push(Task::ReRender(id));
        }
        trace!(
            node = ?id,
            width = node_box.size.width,
            height = node_box.size.height,
            changed,
            "computed node size"
        );
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_scene::{Dash, RetainedScene};

    fn frag(scene: &mut RetainedScene, w: f64, h: f64) -> Fragment {
        let size = Size::new(w, h);
        Fragment::new(scene.create(ElementDesc::Rect { size, radius: 0.0 }), size)
    }

    #[test]
    fn row_items_are_spaced_and_centered() {
        let mut scene = RetainedScene::new();
        let mut content = NodeContent::default();
        let icon = frag(&mut scene, 20.0, 20.0);
        let text = frag(&mut scene, 50.0, 10.0);
        content.put(&ContentKind::Icon, vec![icon]);
        content.put(&ContentKind::Text, vec![text]);
        let options = MindMapOptions::default();
        let a = arrange(&content, &options, &[], &[]);
        assert_eq!(a.size, Size::new(72.0, 20.0));
        assert_eq!(a.items[0], (icon.element, Point::new(0.0, 0.0)));
        assert_eq!(a.items[1], (text.element, Point::new(22.0, 5.0)));
    }

    #[test]
    fn image_on_top_is_a_centered_block() {
        let mut scene = RetainedScene::new();
        let mut content = NodeContent::default();
        let image = frag(&mut scene, 40.0, 30.0);
        let text = frag(&mut scene, 100.0, 20.0);
        content.put(&ContentKind::Image, vec![image]);
        content.put(&ContentKind::Text, vec![text]);
        let options = MindMapOptions::default();
        let a = arrange(&content, &options, &[], &[]);
        assert_eq!(a.size, Size::new(100.0, 55.0));
        assert_eq!(a.items[0], (image.element, Point::new(30.0, 0.0)));
        assert_eq!(a.items[1], (text.element, Point::new(0.0, 35.0)));
    }

    #[test]
    fn image_on_left_shares_the_row() {
        let mut scene = RetainedScene::new();
        let mut content = NodeContent::default();
        let image = frag(&mut scene, 40.0, 30.0);
        let text = frag(&mut scene, 100.0, 20.0);
        content.put(&ContentKind::Image, vec![image]);
        content.put(&ContentKind::Text, vec![text]);
        let options = MindMapOptions {
            img_placement: ImgPlacement::Left,
            ..MindMapOptions::default()
        };
        let a = arrange(&content, &options, &[], &[]);
        assert_eq!(a.size, Size::new(145.0, 30.0));
        assert_eq!(a.items[1], (text.element, Point::new(45.0, 5.0)));
    }

    #[test]
    fn bottom_tags_get_their_own_row() {
        let mut scene = RetainedScene::new();
        let mut content = NodeContent::default();
        let text = frag(&mut scene, 60.0, 20.0);
        let tag = frag(&mut scene, 30.0, 16.0);
        content.put(&ContentKind::Text, vec![text]);
        content.put(&ContentKind::Tag, vec![tag]);
        let right = arrange(&content, &MindMapOptions::default(), &[], &[]);
        assert_eq!(right.size, Size::new(92.0, 20.0));
        let options = MindMapOptions {
            tag_placement: TagPlacement::Bottom,
            ..MindMapOptions::default()
        };
        let bottom = arrange(&content, &options, &[], &[]);
        assert_eq!(bottom.size, Size::new(60.0, 41.0));
        assert_eq!(bottom.items[1], (tag.element, Point::new(15.0, 25.0)));
    }

    #[test]
    fn custom_content_replaces_everything() {
        let mut scene = RetainedScene::new();
        let mut content = NodeContent::default();
        let text = frag(&mut scene, 60.0, 20.0);
        let custom = frag(&mut scene, 10.0, 10.0);
        content.put(&ContentKind::Text, vec![text]);
        content.put(&ContentKind::Custom, vec![custom]);
        let a = arrange(&content, &MindMapOptions::default(), &[], &[]);
        assert_eq!(a.size, Size::new(10.0, 10.0));
        assert_eq!(a.items, vec![(custom.element, Point::ORIGIN)]);
    }

    #[test]
    fn extensions_sit_by_placement() {
        let mut scene = RetainedScene::new();
        let mut content = NodeContent::default();
        let text = frag(&mut scene, 10.0, 10.0);
        let before = frag(&mut scene, 5.0, 5.0);
        let after = frag(&mut scene, 5.0, 5.0);
        content.put(&ContentKind::Text, vec![text]);
        content.put(&ContentKind::Extension("b".into()), vec![before]);
        content.put(&ContentKind::Extension("a".into()), vec![after]);
        let a = arrange(&content, &MindMapOptions::default(), &["b".into()], &["a".into()]);
        let order: Vec<ElementId> = a.items.iter().map(|(e, _)| *e).collect();
        assert_eq!(order, vec![before.element, text.element, after.element]);
    }

    #[test]
    fn take_and_put_touch_one_kind() {
        let mut scene = RetainedScene::new();
        let mut content = NodeContent::default();
        let text = frag(&mut scene, 10.0, 10.0);
        let note = frag(&mut scene, 10.0, 10.0);
        content.put(&ContentKind::Text, vec![text]);
        content.put(&ContentKind::Note, vec![note]);
        assert_eq!(content.take(&ContentKind::Note), vec![note]);
        assert_eq!(content.text(), Some(&text));
        assert!(content.note().is_none());
        assert_eq!(content.elements().count(), 1);
    }

    #[test]
    fn images_scale_down_to_fit() {
        let fitted = fit_image(
            Some(ImageSize {
                width: 400.0,
                height: 100.0,
                custom: false,
            }),
            200.0,
            100.0,
        );
        assert_eq!(fitted, Size::new(200.0, 50.0));
        let custom = fit_image(
            Some(ImageSize {
                width: 400.0,
                height: 100.0,
                custom: true,
            }),
            200.0,
            100.0,
        );
        assert_eq!(custom, Size::new(400.0, 100.0));
    }

    #[test]
    fn node_box_adds_padding_border_and_shape() {
        let style = ResolvedStyle {
            padding_x: 15.0,
            padding_y: 5.0,
            icon_size: 20.0,
            font: FontDesc::default(),
            color: None,
            fill: None,
            border_color: None,
            border_width: 2.0,
            border_radius: 5.0,
            border_dash: Dash::new(),
            shape: crate::shape::NodeShape::Rectangle,
            margin_x: 0.0,
            margin_y: 0.0,
        };
        let b = node_box(Size::new(50.0, 20.0), &style);
        assert_eq!(b.size, Size::new(82.0, 32.0));
        assert_eq!(b.content_origin, Vec2::new(16.0, 6.0));
    }
}
