// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Card note badges: one labelled badge per linked note, drawn next to the
//! node and joined to it by a dashed connector.
//!
//! Badges are built inside the node group but positioned on the next
//! animation frame ([`MindMap::next_frame`]), once the node's content has
//! settled.

use kurbo::{BezPath, Point, Size, Vec2};
use peniko::Color;
use smallvec::smallvec;
use tracing::{trace, warn};
use understory_scene::{Dash, ElementDesc, FontDesc, Paint, Parent, SceneBackend, Stroke};

use crate::error::MindMapError;
use crate::mindmap::MindMap;
use crate::node::CardNoteElement;
use crate::scheduler::FrameTask;
use crate::tree::NodeId;

const CARD_CLASS: &str = "smm-card-note";
const FONT_SIZE: f64 = 10.0;
const PADDING: f64 = 2.0;
const MIN_WIDTH: f64 = 25.0;
const SPACING: f64 = 22.0;
const CONNECTOR_GAP: f64 = 40.0;
const FALLBACK_ANCHOR: Point = Point::new(100.0, 0.0);

impl<S: SceneBackend> MindMap<S> {
    /// Shows the card notes of `id` if hidden, hides them otherwise.
    pub fn toggle_card_note_nodes(&mut self, id: NodeId) {
        if self.tree.get(id).is_some_and(|n| n.card_notes.visible) {
            self.hide_card_note_nodes(id);
        } else {
            self.show_card_note_nodes(id);
        }
    }

    /// Builds a badge per card note and queues their layout.
    ///
    /// Nodes without card notes or without a group are left alone.
    pub fn show_card_note_nodes(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if node.data.card_notes.is_empty() || node.group.is_none() {
            return;
        }
        self.build_card_notes(id);
    }

    fn build_card_notes(&mut self, id: NodeId) {
        self.destroy_card_note_elements(id);
        let Some(node) = self.tree.get(id) else {
            return;
        };
        let Some(group) = node.group else {
            return;
        };
        let cards = node.data.card_notes.clone();
        let mut elements = Vec::with_capacity(cards.len());
        for card in &cards {
            let font = FontDesc {
                size: FONT_SIZE,
                line_height: 1.0,
                ..FontDesc::default()
            };
            let label = format!("[[{}]]", card.basename);
            let measured = self.scene.measure_text(&label, &font);
            let size = Size::new(
                (measured.width + PADDING * 2.0).max(MIN_WIDTH),
                measured.height + 2.0,
            );

            let badge = self.scene.create(ElementDesc::Group);
            self.scene.add_class(badge, CARD_CLASS);
            let rect = self.scene.create(ElementDesc::Rect { size, radius: 3.0 });
            self.scene.set_paint(
                rect,
                Paint {
                    fill: Some(Color::from_rgba8(138, 43, 226, 178)),
                    stroke: Some(Stroke {
                        color: Color::from_rgba8(138, 43, 226, 230),
                        width: 1.0,
                        dash: Dash::new(),
                    }),
                },
            );
            self.scene.append(Parent::Element(badge), rect);
            let text = self.scene.create(ElementDesc::Text {
                content: label,
                font,
            });
            self.scene.set_paint(
                text,
                Paint {
                    fill: Some(Color::WHITE),
                    stroke: None,
                },
            );
            self.scene.set_translation(
                text,
                Vec2::new((size.width - measured.width) / 2.0, 1.0),
            );
            self.scene.append(Parent::Element(badge), text);

            let line = self.scene.create(ElementDesc::Path(BezPath::new()));
            self.scene.set_paint(
                line,
                Paint {
                    fill: None,
                    stroke: Some(Stroke {
                        color: Color::from_rgba8(0x40, 0x9e, 0xff, 0xff),
                        width: 1.5,
                        dash: smallvec![4.0, 4.0],
                    }),
                },
            );
            self.scene.append(Parent::Element(group), line);
            self.scene.append(Parent::Element(group), badge);
            elements.push(CardNoteElement {
                group: badge,
                line,
                width: size.width,
                height: size.height,
            });
        }
        if let Some(node) = self.tree.get_mut(id) {
            node.card_notes.visible = true;
            node.card_notes.elements = elements;
            node.card_notes.rendered = cards;
        }
        self.frames.push(FrameTask::LayoutCardNotes(id));
        trace!(node = ?id, "card notes built");
    }

    fn destroy_card_note_elements(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        for element in node.card_notes.elements.drain(..) {
            self.scene.destroy(element.line);
            self.scene.destroy(element.group);
        }
        node.card_notes.rendered.clear();
    }

    /// Removes the badges of `id`.
    pub fn hide_card_note_nodes(&mut self, id: NodeId) {
        self.destroy_card_note_elements(id);
        if let Some(node) = self.tree.get_mut(id) {
            node.card_notes.visible = false;
        }
        if self.hovered_card.is_some_and(|h| h.node == id) {
            self.hovered_card = None;
        }
    }

    /// Rebuilds visible badges whose data or elements went stale.
    pub(crate) fn restore_card_note_state(&mut self, id: NodeId) {
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if !node.card_notes.visible {
            return;
        }
        if node.data.card_notes.is_empty() {
            self.hide_card_note_nodes(id);
            return;
        }
        let fresh = node.card_notes.rendered == node.data.card_notes
            && node
                .card_notes
                .elements
                .iter()
                .all(|e| self.scene.contains(e.group) && self.scene.contains(e.line));
        if !fresh {
            self.build_card_notes(id);
        }
    }

    /// Where badges hang off the node, in group coordinates: right of the
    /// card count badge, or the middle of the node's right edge.
    fn card_note_anchor(&self, id: NodeId) -> Result<Point, MindMapError> {
        let node = self.tree.get(id).ok_or(MindMapError::UnknownNode(id))?;
        if let Some(count) = node.content.card_count() {
            let bounds = self.scene.bbox(count.element)?;
            let at = self.scene.translation(count.element);
            return Ok(Point::new(bounds.x1 + at.x + 8.0, bounds.center().y + at.y));
        }
        let shape = node.shape_element.ok_or(MindMapError::UnknownNode(id))?;
        let bounds = self.scene.bbox(shape)?;
        Ok(Point::new(bounds.x1, bounds.center().y))
    }

    /// Positions the badges of `id` and draws their connectors.
    ///
    /// If the anchor cannot be measured a fixed offset is used.
    pub(crate) fn layout_card_note_elements(&mut self, id: NodeId) {
        let elements = match self.tree.get(id) {
            Some(node) if node.card_notes.visible => node.card_notes.elements.clone(),
            _ => return,
        };
        if elements.is_empty() {
            return;
        }
        let anchor = self.card_note_anchor(id).unwrap_or_else(|err| {
            warn!(node = ?id, %err, "card note anchor unavailable, using default offset");
            FALLBACK_ANCHOR
        });
        let first_center = anchor.y - (elements.len() - 1) as f64 * SPACING / 2.0;
        let x = anchor.x + CONNECTOR_GAP;
        for (i, element) in elements.iter().enumerate() {
            let center_y = first_center + i as f64 * SPACING;
            self.scene.set_translation(
                element.group,
                Vec2::new(x, center_y - element.height / 2.0),
            );
            let mut connector = BezPath::new();
            connector.move_to(anchor);
            connector.quad_to((anchor.x + CONNECTOR_GAP / 2.0, center_y), (x, center_y));
            self.scene.set_path(element.line, connector);
        }
        trace!(node = ?id, cards = elements.len(), "card notes laid out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CardNote, NodeRecord};
    use understory_scene::RetainedScene;

    fn card(name: &str) -> CardNote {
        CardNote {
            basename: name.into(),
            path: format!("notes/{name}.md"),
        }
    }

    fn map() -> (MindMap<RetainedScene>, NodeId) {
        let mut map = MindMap::new(RetainedScene::new());
        let mut record = NodeRecord::with_text("root");
        record.data.card_notes = vec![card("alpha"), card("beta")];
        let root = map.load(record);
        map.render_tree();
        (map, root)
    }

    #[test]
    fn badges_are_built_then_laid_out_next_frame() {
        let (mut map, root) = map();
        map.show_card_note_nodes(root);
        let elements = map.node(root).unwrap().card_notes.elements.clone();
        assert_eq!(elements.len(), 2);
        assert_eq!(map.pending_frame_tasks(), 1);
        let label = map.scene().children(elements[0].group)[1];
        assert_eq!(map.scene().text_content(label), Some("[[alpha]]"));
        assert_eq!(map.scene().translation(elements[0].group), Vec2::ZERO);

        assert_eq!(map.next_frame(), 1);
        let first = map.scene().translation(elements[0].group);
        let second = map.scene().translation(elements[1].group);
        assert!(first.x > 0.0);
        let gap = second.y + elements[1].height / 2.0 - (first.y + elements[0].height / 2.0);
        assert!((gap - SPACING).abs() < 1e-9);
    }

    #[test]
    fn unmeasurable_anchor_falls_back_to_fixed_offset() {
        let (mut map, root) = map();
        map.show_card_note_nodes(root);
        let count = map.node(root).unwrap().content().card_count().unwrap().element;
        map.scene_mut().destroy(count);
        map.next_frame();
        let first = map.node(root).unwrap().card_notes.elements[0];
        let at = map.scene().translation(first.group);
        assert_eq!(at.x, FALLBACK_ANCHOR.x + CONNECTOR_GAP);
    }

    #[test]
    fn update_keeps_unchanged_badges() {
        let (mut map, root) = map();
        map.show_card_note_nodes(root);
        let before = map.node(root).unwrap().card_notes.elements.clone();
        map.render_tree();
        assert_eq!(map.node(root).unwrap().card_notes.elements, before);

        map.tree.get_mut(root).unwrap().data.card_notes.push(card("gamma"));
        map.update(root, false);
        assert_eq!(map.node(root).unwrap().card_notes.elements.len(), 3);
        assert!(!map.scene().contains(before[0].group));
    }

    #[test]
    fn toggle_hides_and_forgets_hover() {
        let (mut map, root) = map();
        map.toggle_card_note_nodes(root);
        assert!(map.node(root).unwrap().card_notes_visible());
        map.handle_node_input(root, crate::event::NodeInput::CardNoteEnter(0));
        let group = map.node(root).unwrap().card_notes.elements[0].group;
        map.toggle_card_note_nodes(root);
        assert!(!map.node(root).unwrap().card_notes_visible());
        assert!(!map.scene().contains(group));
        assert!(map.hovered_card.is_none());
    }
}
