
use sqlitetree::{NestedSet, Node, NodeStore, Position};
use tree_common::{assert_consistent, bounds, build_fixture, memory_tree, refresh, sqlite_tree};

fn scenario<S: NodeStore>(tree: &NestedSet<S>) {
    let mut n1 = Node::new();
    tree.make_root(&mut n1, None).unwrap();
    assert_eq!((n1.left, n1.right, n1.level, n1.scope), (1, 2, 1, 1));
    assert_eq!(n1.parent_id, None);

    let mut n2 = Node::new();
    tree.insert_as_first_child(&mut n2, &n1).unwrap();
    assert_eq!((n2.left, n2.right, n2.level), (2, 3, 2));
    assert_eq!(n2.parent_id, n1.id);
    assert_eq!(bounds(tree, &n1), (1, 4, 1));

    let mut n3 = Node::new();
    tree.insert_as_next_sibling(&mut n3, &n2).unwrap();
    assert_eq!((n3.left, n3.right, n3.level), (4, 5, 2));
    assert_eq!(n3.parent_id, n1.id);
    assert_eq!(bounds(tree, &n1).1, 6);

    let removed = tree.delete(&mut n2).unwrap();
    assert_eq!(removed, 1);
    assert!(!n2.is_persisted());
    assert_eq!(bounds(tree, &n1), (1, 4, 1));
    assert_eq!(bounds(tree, &n3), (2, 3, 2));
    assert_consistent(tree);
}

#[test]
fn test_scenario_sqlite() {
    scenario(&sqlite_tree());
}

#[test]
fn test_scenario_memory() {
    scenario(&memory_tree());
}

#[test]
fn test_fixture_bounds() {
    let tree = sqlite_tree();
    let f = build_fixture(&tree);
    assert_eq!(bounds(&tree, &f.root), (1, 12, 1));
    assert_eq!(bounds(&tree, &f.a), (2, 9, 2));
    assert_eq!(bounds(&tree, &f.a1), (3, 4, 3));
    assert_eq!(bounds(&tree, &f.a2), (5, 8, 3));
    assert_eq!(bounds(&tree, &f.a2x), (6, 7, 4));
    assert_eq!(bounds(&tree, &f.b), (10, 11, 2));
    assert_eq!(f.a2x.parent_id, f.a2.id);
    assert_consistent(&tree);
}

#[test]
fn test_insert_positions() {
    let tree = memory_tree();
    let mut root = Node::new();
    tree.make_root(&mut root, None).unwrap();
    let mut c1 = Node::new();
    tree.insert_as_last_child(&mut c1, &root).unwrap();
    let mut c2 = Node::new();
    tree.insert_as_last_child(&mut c2, &root).unwrap();
    refresh(&tree, [&mut c1]);

    let mut first = Node::new();
    tree.insert_as_first_child(&mut first, &root).unwrap();
    refresh(&tree, [&mut c1, &mut c2]);
    assert!(first.right < c1.left);

    let mut between = Node::new();
    tree.insert_as_next_sibling(&mut between, &c1).unwrap();
    refresh(&tree, [&mut c1, &mut c2]);
    assert!(c1.right < between.left && between.right < c2.left);
    assert_eq!(between.parent_id, root.id);

    let mut before = Node::new();
    tree.insert_as_prev_sibling(&mut before, &first).unwrap();
    refresh(&tree, [&mut first]);
    assert_eq!(before.left, 2);
    assert!(before.right < first.left);

    let order: Vec<_> = tree
        .fulltree(Some(root.scope))
        .map(|nodes| nodes.iter().map(|n| n.id).collect::<Vec<_>>())
        .unwrap();
    assert_eq!(
        order,
        vec![root.id, before.id, first.id, c1.id, between.id, c2.id]
    );
    assert_consistent(&tree);
}

#[test]
fn test_insert_rejects_saved_node_and_missing_target() {
    let tree = sqlite_tree();
    let mut root = Node::new();
    tree.make_root(&mut root, None).unwrap();

    let mut saved = root;
    let err = tree.insert_as_last_child(&mut saved, &root).unwrap_err();
    assert!(err.is_validation());

    let mut orphan = Node::new();
    let err = tree.insert_as_last_child(&mut orphan, 999).unwrap_err();
    assert!(err.is_validation());
    assert!(!orphan.is_persisted());
    assert_eq!(bounds(&tree, &root), (1, 2, 1));
}

#[test]
fn test_sibling_of_root_rejected() {
    let tree = memory_tree();
    let mut root = Node::new();
    tree.make_root(&mut root, None).unwrap();
    let mut node = Node::new();
    assert!(
        tree.insert(&mut node, &root, Position::NextSibling)
            .unwrap_err()
            .is_validation()
    );
    assert!(
        tree.insert_as_prev_sibling(&mut node, &root)
            .unwrap_err()
            .is_validation()
    );
    assert_eq!(tree.store().len(), 1);
}

#[test]
fn test_insert_uses_stored_target_not_stale_copy() {
    let tree = sqlite_tree();
    let mut root = Node::new();
    tree.make_root(&mut root, None).unwrap();
    let stale = root;
    let mut a = Node::new();
    tree.insert_as_last_child(&mut a, &stale).unwrap();
    let mut b = Node::new();
    tree.insert_as_last_child(&mut b, &stale).unwrap();
    assert_eq!((b.left, b.right), (4, 5));
    assert_consistent(&tree);
}

#[test]
fn test_delete_subtree() {
    let tree = sqlite_tree();
    let mut f = build_fixture(&tree);
    let removed = tree.delete(&mut f.a).unwrap();
    assert_eq!(removed, 4);
    assert!(tree.find(f.a2x.id.unwrap()).unwrap().is_none());
    assert_eq!(bounds(&tree, &f.root), (1, 4, 1));
    assert_eq!(bounds(&tree, &f.b), (2, 3, 2));
    assert_consistent(&tree);
}

#[test]
fn test_delete_root_empties_scope() {
    let tree = memory_tree();
    let mut f = build_fixture(&tree);
    assert_eq!(tree.delete(&mut f.root).unwrap(), 6);
    assert!(tree.store().is_empty());
    assert!(tree.root(1).unwrap().is_none());
}

#[test]
fn test_delete_unsaved_rejected() {
    let tree = memory_tree();
    let mut node = Node::new();
    assert!(tree.delete(&mut node).unwrap_err().is_validation());
}

#[test]
fn test_make_root_scopes() {
    let tree = sqlite_tree();
    let mut first = Node::new();
    tree.make_root(&mut first, None).unwrap();
    let mut explicit = Node::new();
    tree.make_root(&mut explicit, Some(7)).unwrap();
    assert_eq!(explicit.scope, 7);
    let mut next = Node::new();
    tree.make_root(&mut next, None).unwrap();
    assert_eq!(next.scope, 8);

    let mut clash = Node::new();
    let err = tree.make_root(&mut clash, Some(7)).unwrap_err();
    assert!(err.is_validation());
    assert!(!clash.is_persisted());

    let before = first;
    tree.make_root(&mut first, None).unwrap();
    assert_eq!(first, before);
    assert_eq!(tree.metrics_snapshot().make_roots, 3);
}

#[test]
fn test_make_root_relocates_subtree() {
    let tree = sqlite_tree();
    let mut f = build_fixture(&tree);
    tree.make_root(&mut f.a2, None).unwrap();
    assert_eq!((f.a2.left, f.a2.right, f.a2.level), (1, 4, 1));
    assert_eq!(f.a2.scope, 2);
    assert_eq!(f.a2.parent_id, None);

    let x = tree.get(f.a2x.id.unwrap()).unwrap();
    assert_eq!((x.left, x.right, x.level, x.scope), (2, 3, 2, 2));
    assert_eq!(x.parent_id, f.a2.id);

    assert_eq!(bounds(&tree, &f.root), (1, 8, 1));
    assert_eq!(bounds(&tree, &f.a), (2, 5, 2));
    assert_consistent(&tree);
}

#[test]
fn test_metrics_count_mutations() {
    let tree = memory_tree();
    let mut f = build_fixture(&tree);
    tree.move_to_first_child(&mut f.b, &f.a).unwrap();
    tree.delete(&mut f.a1).unwrap();
    let metrics = tree.metrics_snapshot();
    assert_eq!(metrics.inserts, 5);
    assert_eq!(metrics.make_roots, 1);
    assert_eq!(metrics.moves, 1);
    assert_eq!(metrics.deletes, 1);
    assert_eq!(metrics.rollbacks, 0);
    tree.reset_metrics();
    assert_eq!(tree.metrics_snapshot().inserts, 0);
}
