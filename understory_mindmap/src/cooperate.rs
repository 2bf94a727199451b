// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Presence of collaborators editing a node, drawn as a row of avatars
//! above it.

use kurbo::{Size, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use tracing::trace;
use understory_scene::{ElementDesc, ElementId, FontDesc, Paint, Parent, SceneBackend};

use crate::mindmap::MindMap;
use crate::node::NodeFlags;
use crate::style::parse_css_color;
use crate::tree::NodeId;

const AVATAR_SIZE: f64 = 22.0;
const AVATAR_GAP: f64 = 2.0;
const MAX_AVATARS: usize = 5;

/// A collaborator shown on a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooperateUser {
    /// Identity, unique per session.
    pub id: String,
    /// Display name; its first character labels avatars without a picture.
    pub name: String,
    /// Avatar picture.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    /// CSS color of the avatar background.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl<S: SceneBackend> MindMap<S> {
    /// Marks `user` as present on `id`. Adding the same user twice is a no-op.
    pub fn add_user(&mut self, id: NodeId, user: CooperateUser) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        if node.user_list.iter().any(|u| u.id == user.id) {
            return;
        }
        node.user_list.push(user);
        node.flags.insert(NodeFlags::USERS_DIRTY);
        self.update_user_list_node(id);
    }

    /// Removes the user with `user_id` from `id`.
    pub fn remove_user(&mut self, id: NodeId, user_id: &str) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        let before = node.user_list.len();
        node.user_list.retain(|u| u.id != user_id);
        if node.user_list.len() != before {
            node.flags.insert(NodeFlags::USERS_DIRTY);
            self.update_user_list_node(id);
        }
    }

    /// Removes every user from `id`, along with the avatar row.
    pub fn empty_user(&mut self, id: NodeId) {
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        node.user_list.clear();
        node.flags.remove(NodeFlags::USERS_DIRTY);
        if let Some(element) = node.decorations.user_list.take() {
            self.scene.destroy(element);
        }
    }

    /// Rebuilds the avatar row if the user list changed. Only runs when
    /// presence is enabled.
    pub(crate) fn update_user_list_node(&mut self, id: NodeId) {
        if !self.options.cooperate {
            return;
        }
        let Some(node) = self.tree.get_mut(id) else {
            return;
        };
        let Some(group) = node.group else {
            return;
        };
        if !node.flags.contains(NodeFlags::USERS_DIRTY) {
            return;
        }
        node.flags.remove(NodeFlags::USERS_DIRTY);
        if let Some(old) = node.decorations.user_list.take() {
            self.scene.destroy(old);
        }
        if node.user_list.is_empty() {
            return;
        }
        let users = node.user_list.clone();
        let row = self.scene.create(ElementDesc::Group);
        let mut x = 0.0;
        for user in users.iter().take(MAX_AVATARS) {
            let avatar = self.avatar(user);
            self.scene.append(Parent::Element(row), avatar);
            self.scene.set_translation(avatar, Vec2::new(x, 0.0));
            x += AVATAR_SIZE + AVATAR_GAP;
        }
        if users.len() > MAX_AVATARS {
            let more = format!("+{}", users.len() - MAX_AVATARS);
            let badge = self.labelled_circle(&more, Color::from_rgba8(0xcc, 0xcc, 0xcc, 0xff));
            self.scene.append(Parent::Element(row), badge);
            self.scene.set_translation(badge, Vec2::new(x, 0.0));
        }
        self.scene.append(Parent::Element(group), row);
        self.scene
            .set_translation(row, Vec2::new(0.0, -AVATAR_SIZE - 5.0));
        if let Some(node) = self.tree.get_mut(id) {
            node.decorations.user_list = Some(row);
        }
        trace!(node = ?id, users = users.len(), "avatar row rebuilt");
    }

    fn avatar(&mut self, user: &CooperateUser) -> ElementId {
        if let Some(url) = user.avatar.as_ref().filter(|u| !u.is_empty()) {
            return self.scene.create(ElementDesc::Image {
                url: url.clone(),
                size: Size::new(AVATAR_SIZE, AVATAR_SIZE),
            });
        }
        let fill = user
            .color
            .as_deref()
            .and_then(parse_css_color)
            .unwrap_or(Color::from_rgba8(0x40, 0x9e, 0xff, 0xff));
        let initial: String = user.name.chars().take(1).collect();
        self.labelled_circle(&initial, fill)
    }

    fn labelled_circle(&mut self, label: &str, fill: Color) -> ElementId {
        let avatar = self.scene.create(ElementDesc::Group);
        let circle = self.scene.create(ElementDesc::Circle {
            radius: AVATAR_SIZE / 2.0,
        });
        self.scene.set_paint(
            circle,
            Paint {
                fill: Some(fill),
                stroke: None,
            },
        );
        self.scene.append(Parent::Element(avatar), circle);
        let font = FontDesc {
            size: 12.0,
            line_height: 1.0,
            ..FontDesc::default()
        };
        let measured = self.scene.measure_text(label, &font);
        let text = self.scene.create(ElementDesc::Text {
            content: label.to_owned(),
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
            Vec2::new(
                (AVATAR_SIZE - measured.width) / 2.0,
                (AVATAR_SIZE - measured.height) / 2.0,
            ),
        );
        self.scene.append(Parent::Element(avatar), text);
        avatar
    }
}
