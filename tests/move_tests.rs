
use sqlitetree::{NestedSet, Node, NodeStore, Position};
use tree_common::{assert_consistent, bounds, build_fixture, ids, memory_tree, sqlite_tree};

#[test]
fn test_move_to_first_child() {
    let tree = sqlite_tree();
    let mut f = build_fixture(&tree);
    tree.move_to_first_child(&mut f.b, &f.a).unwrap();
    assert_eq!((f.b.left, f.b.right, f.b.level), (3, 4, 3));
    assert_eq!(f.b.parent_id, f.a.id);
    assert_eq!(bounds(&tree, &f.a), (2, 11, 2));
    assert_eq!(bounds(&tree, &f.a1), (5, 6, 3));
    assert_eq!(bounds(&tree, &f.a2x), (8, 9, 4));
    assert_eq!(bounds(&tree, &f.root), (1, 12, 1));
    assert_consistent(&tree);
}

#[test]
fn test_move_subtree_to_next_sibling() {
    let tree = memory_tree();
    let mut f = build_fixture(&tree);
    tree.move_to_next_sibling(&mut f.a2, &f.b).unwrap();
    assert_eq!((f.a2.left, f.a2.right, f.a2.level), (8, 11, 2));
    assert_eq!(f.a2.parent_id, f.root.id);

    let x = tree.get(f.a2x.id.unwrap()).unwrap();
    assert_eq!((x.left, x.right, x.level), (9, 10, 3));
    assert_eq!(x.parent_id, f.a2.id);

    assert_eq!(bounds(&tree, &f.a), (2, 5, 2));
    assert_eq!(bounds(&tree, &f.b), (6, 7, 2));
    assert_consistent(&tree);
}

#[test]
fn test_move_to_prev_sibling_shifts_left() {
    let tree = sqlite_tree();
    let mut f = build_fixture(&tree);
    tree.move_to_prev_sibling(&mut f.b, &f.a).unwrap();
    assert_eq!((f.b.left, f.b.right, f.b.level), (2, 3, 2));
    assert_eq!(bounds(&tree, &f.a), (4, 11, 2));
    assert_eq!(bounds(&tree, &f.root), (1, 12, 1));
    assert_consistent(&tree);
}

#[test]
fn test_move_to_last_child_deeper() {
    let tree = memory_tree();
    let mut f = build_fixture(&tree);
    tree.move_to_last_child(&mut f.a1, f.a2x.id.unwrap()).unwrap();
    assert_eq!((f.a1.left, f.a1.right, f.a1.level), (5, 6, 5));
    assert_eq!(f.a1.parent_id, f.a2x.id);
    assert_eq!(bounds(&tree, &f.a2), (3, 8, 3));
    assert_eq!(bounds(&tree, &f.a2x), (4, 7, 4));
    assert_consistent(&tree);
}

#[test]
fn test_move_in_place_is_stable() {
    let tree = sqlite_tree();
    let mut f = build_fixture(&tree);
    let before = tree.fulltree(None).unwrap();
    tree.move_to_prev_sibling(&mut f.a, &f.b).unwrap();
    tree.move_to_first_child(&mut f.a1, &f.a).unwrap();
    tree.clear_cache();
    assert_eq!(tree.fulltree(None).unwrap(), before);
}

fn rejected_moves_leave_state<S: NodeStore>(tree: &NestedSet<S>) {
    let mut f = build_fixture(tree);
    let before = tree.fulltree(None).unwrap();

    let into_descendant = tree.move_to_last_child(&mut f.a, &f.a2x).unwrap_err();
    assert!(into_descendant.is_validation());
    let a_id = f.a.id.unwrap();
    let onto_self = tree
        .move_to(&mut f.a, a_id, Position::FirstChild)
        .unwrap_err();
    assert!(onto_self.is_validation());
    let beside_root = tree.move_to_next_sibling(&mut f.b, &f.root).unwrap_err();
    assert!(beside_root.is_validation());
    let root_into_child = tree.move_to_first_child(&mut f.root, &f.b).unwrap_err();
    assert!(root_into_child.is_validation());
    let mut unsaved = Node::new();
    assert!(
        tree.move_to_first_child(&mut unsaved, &f.root)
            .unwrap_err()
            .is_validation()
    );

    tree.clear_cache();
    assert_eq!(tree.fulltree(None).unwrap(), before);
}

#[test]
fn test_rejected_moves_sqlite() {
    rejected_moves_leave_state(&sqlite_tree());
}

#[test]
fn test_rejected_moves_memory() {
    rejected_moves_leave_state(&memory_tree());
}

#[test]
fn test_cross_scope_move() {
    let tree = sqlite_tree();
    let mut f = build_fixture(&tree);
    let mut other = Node::new();
    tree.make_root(&mut other, None).unwrap();
    assert_eq!(other.scope, 2);

    tree.move_to_last_child(&mut f.a, &other).unwrap();
    assert_eq!((f.a.left, f.a.right, f.a.level, f.a.scope), (2, 9, 2, 2));
    assert_eq!(f.a.parent_id, other.id);
    let moved = tree.descendants(&f.a, Default::default()).unwrap();
    assert_eq!(
        ids(&moved),
        vec![f.a1.id.unwrap(), f.a2.id.unwrap(), f.a2x.id.unwrap()]
    );
    assert!(moved.iter().all(|n| n.scope == 2));

    assert_eq!(bounds(&tree, &other), (1, 10, 1));
    assert_eq!(bounds(&tree, &f.root), (1, 4, 1));
    assert_eq!(bounds(&tree, &f.b), (2, 3, 2));
    assert_consistent(&tree);
}

#[test]
fn test_move_root_into_other_scope() {
    let tree = memory_tree();
    let f = build_fixture(&tree);
    let mut other = Node::new();
    tree.make_root(&mut other, None).unwrap();
    tree.move_to_first_child(&mut other, &f.b).unwrap();
    assert_eq!((other.left, other.right, other.level, other.scope), (11, 12, 3, 1));
    assert_eq!(other.parent_id, f.b.id);
    assert!(tree.root(2).unwrap().is_none());
    assert_eq!(tree.roots().unwrap().len(), 1);
    assert_consistent(&tree);
}

#[test]
fn test_move_refreshes_only_moved_node() {
    let tree = sqlite_tree();
    let mut f = build_fixture(&tree);
    let stale_a = f.a;
    tree.move_to_first_child(&mut f.b, &f.a).unwrap();
    assert_eq!(f.a, stale_a);
    tree.reload(&mut f.a).unwrap();
    assert_eq!(f.a.right, 11);
}
