//! Unit tests for surface state and the commit cascade

use super::*;
use crate::protocol::ProtocolError;

fn buffer(id: u32) -> BufferRef {
    BufferRef {
        id,
        width: 64,
        height: 32,
    }
}

/// Parent with one synchronized child
fn parent_and_child() -> (SurfaceTree, SurfaceId, SurfaceId) {
    let mut tree = SurfaceTree::new();
    let parent = tree.create();
    let child = tree.create();
    tree.make_subsurface(child, parent).unwrap();
    (tree, parent, child)
}

fn children(tree: &SurfaceTree, id: SurfaceId) -> Vec<SurfaceId> {
    tree.get(id).unwrap().children().to_vec()
}

#[test]
fn test_root_commit_applies_immediately() {
    let mut tree = SurfaceTree::new();
    let surface = tree.create();

    tree.mutate_pending(surface, SurfaceDelta::Attach(Some(buffer(1))))
        .unwrap();
    tree.mutate_pending(surface, SurfaceDelta::SetBufferScale(2))
        .unwrap();
    assert_eq!(tree.get(surface).unwrap().applied().buffer, None);

    let applied = tree.commit(surface).unwrap();

    assert_eq!(applied, vec![surface]);
    let node = tree.get(surface).unwrap();
    assert_eq!(node.applied().buffer, Some(buffer(1)));
    assert_eq!(node.applied().size(), Some((32, 16)));
    assert_eq!(node.applied().serial, 1);
    assert!(node.pending().is_empty());
}

#[test]
fn test_damage_accumulates_as_union() {
    let mut tree = SurfaceTree::new();
    let surface = tree.create();

    tree.mutate_pending(surface, SurfaceDelta::Damage(Rect::new(0, 0, 10, 10)))
        .unwrap();
    tree.mutate_pending(surface, SurfaceDelta::Damage(Rect::new(20, 20, 5, 5)))
        .unwrap();
    // Covered by the first rectangle
    tree.mutate_pending(surface, SurfaceDelta::Damage(Rect::new(2, 2, 3, 3)))
        .unwrap();
    tree.commit(surface).unwrap();

    let damage = &tree.get(surface).unwrap().applied().damage;
    assert_eq!(damage.rects().len(), 2);
    assert!(damage.contains_point(21, 21));
    assert_eq!(damage.bounds(), Some(Rect::new(0, 0, 25, 25)));
}

#[test]
fn test_damage_at_coordinate_limits_is_kept() {
    let mut tree = SurfaceTree::new();
    let surface = tree.create();

    tree.mutate_pending(surface, SurfaceDelta::Damage(Rect::new(0, 0, 10, 10)))
        .unwrap();
    tree.mutate_pending(
        surface,
        SurfaceDelta::Damage(Rect::new(i32::MAX - 5, 0, 10, 10)),
    )
    .unwrap();
    tree.mutate_pending(
        surface,
        SurfaceDelta::Damage(Rect::new(0, i32::MIN, i32::MAX, i32::MAX)),
    )
    .unwrap();
    tree.commit(surface).unwrap();

    let damage = &tree.get(surface).unwrap().applied().damage;
    assert_eq!(damage.rects().len(), 3);
    assert!(damage.contains_point(i32::MAX - 1, 5));
    assert!(!damage.contains_point(i32::MAX - 6, 5));
    assert_eq!(
        damage.bounds(),
        Some(Rect::new(0, i32::MIN, i32::MAX, i32::MAX))
    );
}

#[test]
fn test_later_attach_replaces_uncommitted_buffer() {
    let mut tree = SurfaceTree::new();
    let surface = tree.create();

    tree.mutate_pending(surface, SurfaceDelta::Attach(Some(buffer(1))))
        .unwrap();
    tree.mutate_pending(surface, SurfaceDelta::Attach(Some(buffer(2))))
        .unwrap();
    tree.commit(surface).unwrap();

    assert_eq!(tree.get(surface).unwrap().applied().buffer, Some(buffer(2)));
}

#[test]
fn test_sync_child_waits_for_parent() {
    let (mut tree, parent, child) = parent_and_child();

    tree.mutate_pending(child, SurfaceDelta::SetPosition { x: 5, y: 7 })
        .unwrap();
    let applied = tree.commit(child).unwrap();

    assert!(applied.is_empty());
    assert_eq!(tree.get(child).unwrap().applied().position, (0, 0));
    assert!(tree.get(child).unwrap().cached().is_some());

    let applied = tree.commit(parent).unwrap();

    assert_eq!(applied, vec![parent, child]);
    assert_eq!(tree.get(child).unwrap().applied().position, (5, 7));
    assert!(tree.get(child).unwrap().cached().is_none());
}

#[test]
fn test_cached_commits_merge() {
    let (mut tree, parent, child) = parent_and_child();

    tree.mutate_pending(child, SurfaceDelta::Attach(Some(buffer(1))))
        .unwrap();
    tree.mutate_pending(child, SurfaceDelta::Damage(Rect::new(0, 0, 4, 4)))
        .unwrap();
    tree.commit(child).unwrap();
    tree.mutate_pending(child, SurfaceDelta::Damage(Rect::new(10, 0, 4, 4)))
        .unwrap();
    tree.commit(child).unwrap();
    tree.commit(parent).unwrap();

    let applied = tree.get(child).unwrap().applied();
    assert_eq!(applied.buffer, Some(buffer(1)));
    assert_eq!(applied.damage.rects().len(), 2);
    assert_eq!(applied.serial, 1);
}

#[test]
fn test_desync_child_applies_on_own_commit() {
    let (mut tree, parent, child) = parent_and_child();
    tree.set_sync_mode(child, SyncMode::Desynchronized).unwrap();

    tree.mutate_pending(child, SurfaceDelta::Attach(Some(buffer(3))))
        .unwrap();
    let applied = tree.commit(child).unwrap();

    assert_eq!(applied, vec![child]);
    assert_eq!(tree.get(child).unwrap().applied().buffer, Some(buffer(3)));

    // The parent's cascade skips desynchronized children
    assert_eq!(tree.commit(parent).unwrap(), vec![parent]);
}

#[test]
fn test_switch_to_desync_flushes_cache() {
    let (mut tree, _parent, child) = parent_and_child();

    tree.mutate_pending(child, SurfaceDelta::SetPosition { x: 1, y: 1 })
        .unwrap();
    tree.commit(child).unwrap();

    let applied = tree
        .set_sync_mode(child, SyncMode::Desynchronized)
        .unwrap();

    assert_eq!(applied, vec![child]);
    assert_eq!(tree.get(child).unwrap().applied().position, (1, 1));

    // Switching again with nothing cached is quiet
    assert!(tree
        .set_sync_mode(child, SyncMode::Desynchronized)
        .unwrap()
        .is_empty());
}

#[test]
fn test_cascade_is_depth_first_in_stacking_order() {
    let mut tree = SurfaceTree::new();
    let root = tree.create();
    let a = tree.create();
    let b = tree.create();
    let a1 = tree.create();
    tree.make_subsurface(a, root).unwrap();
    tree.make_subsurface(b, root).unwrap();
    tree.make_subsurface(a1, a).unwrap();

    for node in [a1, b, a] {
        tree.mutate_pending(node, SurfaceDelta::SetBufferScale(2))
            .unwrap();
        tree.commit(node).unwrap();
    }

    let applied = tree.commit(root).unwrap();

    assert_eq!(applied, vec![root, a, a1, b]);
}

#[test]
fn test_grandchild_reaches_applied_through_idle_child() {
    let mut tree = SurfaceTree::new();
    let root = tree.create();
    let child = tree.create();
    let grandchild = tree.create();
    tree.make_subsurface(child, root).unwrap();
    tree.make_subsurface(grandchild, child).unwrap();

    tree.mutate_pending(grandchild, SurfaceDelta::SetPosition { x: 3, y: 3 })
        .unwrap();
    tree.commit(grandchild).unwrap();

    let applied = tree.commit(root).unwrap();

    assert_eq!(applied, vec![root, grandchild]);
    assert_eq!(tree.get(grandchild).unwrap().applied().position, (3, 3));
}

#[test]
fn test_placement_applies_at_commit() {
    let mut tree = SurfaceTree::new();
    let root = tree.create();
    let a = tree.create();
    let b = tree.create();
    let c = tree.create();
    for node in [a, b, c] {
        tree.make_subsurface(node, root).unwrap();
    }
    assert_eq!(children(&tree, root), vec![a, b, c]);

    tree.place_below(c, a).unwrap();
    assert_eq!(children(&tree, root), vec![a, b, c]);

    tree.commit(c).unwrap();
    assert_eq!(children(&tree, root), vec![a, b, c]);

    tree.commit(root).unwrap();
    assert_eq!(children(&tree, root), vec![c, a, b]);

    tree.set_sync_mode(a, SyncMode::Desynchronized).unwrap();
    tree.place_above(a, b).unwrap();
    tree.commit(a).unwrap();
    assert_eq!(children(&tree, root), vec![c, b, a]);
}

#[test]
fn test_place_against_non_sibling_is_rejected() {
    let mut tree = SurfaceTree::new();
    let root = tree.create();
    let other_root = tree.create();
    let a = tree.create();
    let stranger = tree.create();
    tree.make_subsurface(a, root).unwrap();
    tree.make_subsurface(stranger, other_root).unwrap();

    assert_eq!(
        tree.place_above(a, stranger),
        Err(ProtocolError::NotASibling {
            surface: a,
            sibling: stranger
        })
    );
    assert!(tree.place_below(a, a).is_err());
    assert!(tree.place_above(a, root).is_err());
    assert!(tree.get(a).unwrap().pending().placement.is_none());
}

#[test]
fn test_subsurface_creation_rejects_cycles_and_roles() {
    let mut tree = SurfaceTree::new();
    let root = tree.create();
    let child = tree.create();
    tree.make_subsurface(child, root).unwrap();

    assert!(matches!(
        tree.make_subsurface(root, root),
        Err(ProtocolError::BadSurface { .. })
    ));
    assert!(matches!(
        tree.make_subsurface(root, child),
        Err(ProtocolError::BadSurface { .. })
    ));
    assert_eq!(
        tree.make_subsurface(child, root),
        Err(ProtocolError::RoleAlreadyAssigned(child))
    );
    assert_eq!(tree.parent(root), None);
}

#[test]
fn test_destroy_parent_orphans_children() {
    let (mut tree, parent, child) = parent_and_child();

    tree.mutate_pending(child, SurfaceDelta::SetPosition { x: 9, y: 9 })
        .unwrap();
    tree.commit(child).unwrap();

    let orphans = tree.destroy(parent);

    assert_eq!(orphans, vec![child]);
    assert!(!tree.contains(parent));
    assert_eq!(tree.parent(child), None);
    // Cached state was discarded, applied state kept
    assert_eq!(tree.get(child).unwrap().applied().position, (0, 0));
    assert!(tree.get(child).unwrap().cached().is_none());

    // Orphans apply their own commits
    tree.mutate_pending(child, SurfaceDelta::SetPosition { x: 2, y: 2 })
        .unwrap();
    assert_eq!(tree.commit(child).unwrap(), vec![child]);
    assert_eq!(tree.get(child).unwrap().applied().position, (2, 2));
}

#[test]
fn test_destroyed_id_is_not_reused() {
    let mut tree = SurfaceTree::new();
    let first = tree.create();
    tree.destroy(first);
    let second = tree.create();

    assert_ne!(first, second);
    assert!(!tree.contains(first));
    assert_eq!(tree.commit(first), Err(ProtocolError::DeadSurface(first)));
    assert!(tree.destroy(first).is_empty());
}

#[test]
fn test_remove_role_detaches_from_parent() {
    let (mut tree, parent, child) = parent_and_child();
    tree.mutate_pending(child, SurfaceDelta::SetPosition { x: 4, y: 4 })
        .unwrap();
    tree.commit(child).unwrap();

    assert!(tree.remove_subsurface_role(child));
    assert!(!tree.remove_subsurface_role(child));

    assert!(children(&tree, parent).is_empty());
    assert_eq!(tree.get(child).unwrap().role(), SurfaceRole::None);
    assert!(tree.get(child).unwrap().cached().is_none());

    // The surface can take the role again
    assert!(tree.make_subsurface(child, parent).is_ok());
}

#[test]
fn test_stale_placement_is_dropped_at_apply() {
    let mut tree = SurfaceTree::new();
    let root = tree.create();
    let a = tree.create();
    let b = tree.create();
    tree.make_subsurface(a, root).unwrap();
    tree.make_subsurface(b, root).unwrap();

    tree.place_below(b, a).unwrap();
    tree.commit(b).unwrap();
    tree.destroy(a);
    tree.commit(root).unwrap();

    assert_eq!(children(&tree, root), vec![b]);
}
