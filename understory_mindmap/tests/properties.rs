// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whole-map behavior checked through the public API: line bookkeeping,
//! visibility round trips, sizing determinism, selection, pinning, and
//! viewport culling.

use kurbo::{Point, Vec2};
use understory_mindmap::{
    Command, MindMap, MindMapBuilder, MindMapOptions, Modifiers, NodeId, NodeInput, NodeRecord,
    PerformanceConfig, PointerInput,
};
use understory_scene::{Layer, RetainedScene, SceneBackend};

/// Root with two children, each with two grandchildren.
fn three_levels() -> NodeRecord {
    let branch = |name: &str| {
        NodeRecord::with_text(name)
            .child(NodeRecord::with_text(format!("{name}.1")))
            .child(NodeRecord::with_text(format!("{name}.2")))
    };
    NodeRecord::with_text("root")
        .child(branch("left"))
        .child(branch("right"))
}

fn rendered(record: NodeRecord) -> (MindMap<RetainedScene>, NodeId) {
    let mut map = MindMap::new(RetainedScene::new());
    let root = map.load(record);
    map.render_tree();
    (map, root)
}

fn assert_lines_match_children(map: &MindMap<RetainedScene>) {
    for (id, node) in map.tree().iter() {
        if node.is_generalization() || node.group().is_none() {
            continue;
        }
        if node.is_expanded() {
            assert_eq!(
                node.lines().len(),
                map.tree().children_of(id).len(),
                "expanded node {:?} has a line per child",
                node.data().text
            );
        }
    }
}

#[test]
fn expanded_nodes_have_one_line_per_child() {
    let (mut map, root) = rendered(three_levels());
    assert_lines_match_children(&map);

    let left = map.tree().children_of(root)[0];
    map.execute_command(Command::InsertChildNode {
        parent: left,
        record: NodeRecord::with_text("left.3"),
    })
    .unwrap();
    assert_lines_match_children(&map);

    let removed = map.tree().children_of(left)[0];
    map.execute_command(Command::RemoveNode(removed)).unwrap();
    assert_lines_match_children(&map);
    assert_eq!(map.node(left).unwrap().lines().len(), 2);
}

#[test]
fn collapsing_a_child_keeps_the_root_lines() {
    let (mut map, root) = rendered(three_levels());
    let [left, right] = [map.tree().children_of(root)[0], map.tree().children_of(root)[1]];
    assert_eq!(map.node(root).unwrap().lines().len(), 2);
    assert_eq!(map.node(left).unwrap().lines().len(), 2);
    assert_eq!(map.node(right).unwrap().lines().len(), 2);
    assert_eq!(map.scene().layer_children(Layer::Nodes).len(), 7);

    map.execute_command(Command::SetNodeExpand {
        node: left,
        expand: false,
    })
    .unwrap();

    assert_eq!(map.node(root).unwrap().lines().len(), 2);
    assert!(map.node(left).unwrap().lines().is_empty());
    assert_eq!(map.node(right).unwrap().lines().len(), 2);
    for &grandchild in map.tree().children_of(left) {
        let group = map.node(grandchild).unwrap().group();
        assert!(group.is_none_or(|g| !map.scene().is_attached(g)));
    }
    assert_eq!(map.scene().layer_children(Layer::Nodes).len(), 5);
    assert_eq!(map.scene().layer_children(Layer::Lines).len(), 4);
}

#[test]
fn hide_then_show_restores_the_scene() {
    let (mut map, root) = rendered(three_levels());
    let left = map.tree().children_of(root)[0];
    let nodes = map.scene().snapshot(Layer::Nodes);
    let lines = map.scene().snapshot(Layer::Lines);

    map.hide(left);
    let hidden = map.node(left).unwrap().group().unwrap();
    assert!(!map.scene().is_visible(hidden));
    assert!(map.node(left).unwrap().is_hidden());

    map.show(left);
    assert_eq!(map.scene().snapshot(Layer::Nodes), nodes);
    assert_eq!(map.scene().snapshot(Layer::Lines), lines);
    assert!(!map.node(left).unwrap().is_hidden());
}

#[test]
fn identical_records_size_identically() {
    let record = || {
        let mut r = NodeRecord::with_text("Same label\nover two lines");
        r.data.tag = vec!["one".into(), "two".into()];
        r.data.note = Some("note".into());
        r.data.icon = vec!["priority_1".into()];
        r
    };
    let (a, a_root) = rendered(record());
    let (b, b_root) = rendered(record());
    let (a, b) = (a.node(a_root).unwrap(), b.node(b_root).unwrap());
    assert_ne!(a.uid(), b.uid());
    assert_eq!(a.width(), b.width());
    assert_eq!(a.height(), b.height());
    assert!(a.width() > 0.0 && a.height() > 0.0);
}

#[test]
fn fake_clone_differs_only_in_uid() {
    let (map, root) = rendered(three_levels());
    let left = map.tree().children_of(root)[0];
    let original = map.node(left).unwrap();
    let clone = map.tree().fake_clone(left).unwrap();
    assert_ne!(clone.uid(), original.uid());
    assert_eq!(clone.data().text, original.data().text);
    assert_eq!(clone.size(), original.size());
    assert_eq!(clone.position(), original.position());
}

#[test]
fn plain_clicks_keep_a_single_active_node() {
    let (mut map, root) = rendered(three_levels());
    let ids: Vec<NodeId> = core::iter::once(root)
        .chain(map.tree().descendants(root))
        .collect();
    for &id in &ids {
        map.handle_node_input(id, NodeInput::Click(PointerInput::at(Point::ZERO)));
        assert_eq!(map.active_nodes().len(), 1);
        assert_eq!(map.active_nodes().primary(), Some(id));
    }
    let active: Vec<NodeId> = ids
        .iter()
        .copied()
        .filter(|&id| map.node(id).unwrap().is_active())
        .collect();
    assert_eq!(active.len(), 1);
}

#[test]
fn command_modifier_extends_the_selection() {
    let (mut map, root) = rendered(three_levels());
    let [left, right] = [map.tree().children_of(root)[0], map.tree().children_of(root)[1]];
    map.handle_node_input(left, NodeInput::Click(PointerInput::at(Point::ZERO)));

    let chord = PointerInput::at(Point::ZERO).with_modifiers(Modifiers::CTRL);
    map.handle_node_input(right, NodeInput::Mousedown(chord));
    map.handle_node_input(right, NodeInput::Click(chord));
    assert_eq!(map.active_nodes().len(), 2);

    // Chording an active node drops it again.
    map.handle_node_input(left, NodeInput::Mousedown(chord));
    map.handle_node_input(left, NodeInput::Click(chord));
    assert_eq!(map.active_nodes().items(), &[right]);
}

#[test]
fn pinned_node_survives_sibling_insertion() {
    let (mut map, root) = rendered(three_levels());
    let left = map.tree().children_of(root)[0];
    map.execute_command(Command::SetCustomPosition {
        node: left,
        position: Point::new(50.0, 80.0),
    })
    .unwrap();
    map.render_tree();
    assert_eq!(map.node(left).unwrap().position(), Point::new(50.0, 80.0));

    for i in 0..3 {
        map.execute_command(Command::InsertChildNode {
            parent: root,
            record: NodeRecord::with_text(format!("late {i}")),
        })
        .unwrap();
        assert_eq!(map.node(left).unwrap().position(), Point::new(50.0, 80.0));
    }
    let group = map.node(left).unwrap().group().unwrap();
    assert_eq!(map.scene().translation(group), Vec2::new(50.0, 80.0));

    map.execute_command(Command::ClearCustomPosition(left))
        .unwrap();
    assert!(!map.node(left).unwrap().has_custom_position());
}

fn culling_map(detach: bool) -> (MindMap<RetainedScene>, NodeId, NodeId) {
    let mut map = MindMapBuilder::new()
        .options(MindMapOptions {
            open_performance: true,
            performance_config: PerformanceConfig {
                padding: 50.0,
                remove_node_when_out_canvas: detach,
                always_render_root: true,
            },
            ..MindMapOptions::default()
        })
        .build(RetainedScene::new());
    let mut far = NodeRecord::with_text("far away");
    far.data.custom_left = Some(5000.0);
    far.data.custom_top = Some(5000.0);
    let root = map.load(
        NodeRecord::with_text("root")
            .child(NodeRecord::with_text("near"))
            .child(far),
    );
    let far = map.tree().children_of(root)[1];
    (map, root, far)
}

#[test]
fn offscreen_nodes_are_not_created() {
    let (mut map, root, far) = culling_map(true);
    map.render_tree();
    assert!(map.node(far).unwrap().group().is_none());
    assert!(map.node(root).unwrap().group().is_some());
    // The connector still reaches the culled node.
    assert_eq!(map.node(root).unwrap().lines().len(), 2);

    map.view_mut().pan_by_view(Vec2::new(-4900.0, -4900.0));
    map.render_tree();
    let group = map.node(far).unwrap().group().unwrap();
    assert!(map.scene().is_attached(group));
}

#[test]
fn offscreen_nodes_detach_and_reattach_identically() {
    let (mut map, _, far) = culling_map(true);
    map.view_mut().pan_by_view(Vec2::new(-4900.0, -4900.0));
    map.render_tree();
    let group = map.node(far).unwrap().group().unwrap();
    let before = map.scene().snapshot_element(group);

    map.view_mut().pan_by_view(Vec2::new(4900.0, 4900.0));
    map.render_tree();
    assert!(!map.scene().is_attached(group));
    assert!(map.scene().contains(group));

    map.view_mut().pan_by_view(Vec2::new(-4900.0, -4900.0));
    map.render_tree();
    assert_eq!(map.node(far).unwrap().group(), Some(group));
    assert!(map.scene().is_attached(group));
    assert_eq!(map.scene().snapshot_element(group), before);
}

#[test]
fn offscreen_nodes_stay_attached_without_detaching() {
    let (mut map, _, far) = culling_map(false);
    map.view_mut().pan_by_view(Vec2::new(-4900.0, -4900.0));
    map.render_tree();
    let group = map.node(far).unwrap().group().unwrap();

    map.view_mut().pan_by_view(Vec2::new(4900.0, 4900.0));
    map.render_tree();
    assert!(map.scene().is_attached(group));
}

#[test]
fn collapsing_above_a_culled_node_hides_its_descendants() {
    let mut map = MindMapBuilder::new()
        .options(MindMapOptions {
            open_performance: true,
            ..MindMapOptions::default()
        })
        .build(RetainedScene::new());
    let mut mid = NodeRecord::with_text("mid");
    mid.data.custom_left = Some(5000.0);
    mid.data.custom_top = Some(5000.0);
    let mut grand = NodeRecord::with_text("grand");
    grand.data.custom_left = Some(10.0);
    grand.data.custom_top = Some(10.0);
    let root = map.load(
        NodeRecord::with_text("root").child(NodeRecord::with_text("top").child(mid.child(grand))),
    );
    map.render_tree();
    let top = map.tree().children_of(root)[0];
    let mid = map.tree().children_of(top)[0];
    let grand = map.tree().children_of(mid)[0];
    assert!(map.node(mid).unwrap().group().is_none());
    let grand_group = map.node(grand).unwrap().group().unwrap();
    assert!(map.scene().is_attached(grand_group));

    map.set_node_expand(top, false);
    map.render_tree();
    assert!(!map.scene().is_attached(grand_group));
    assert!(map.node(mid).unwrap().lines().is_empty());
    assert_eq!(map.scene().layer_children(Layer::Nodes).len(), 2);
}

#[test]
fn expand_patched_through_data_detaches_the_subtree() {
    let (mut map, root) = rendered(three_levels());
    let left = map.tree().children_of(root)[0];
    let grandchild = map.tree().children_of(left)[0];
    let group = map.node(grandchild).unwrap().group().unwrap();
    let serde_json::Value::Object(patch) = serde_json::json!({ "expand": false }) else {
        unreachable!()
    };
    map.execute_command(Command::SetNodeData { node: left, patch })
        .unwrap();
    assert!(!map.node(left).unwrap().is_expanded());
    assert!(!map.scene().is_attached(group));
    assert!(map.node(left).unwrap().lines().is_empty());
    assert_lines_match_children(&map);
}
