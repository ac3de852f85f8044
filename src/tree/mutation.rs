//! Structural mutations: insert, move, delete, and make_root.
//!
//! Each mutation re-reads the nodes it depends on after taking the exclusive
//! lock, so decisions never rest on a caller's stale copy.

use tracing::{debug, warn};

use crate::{
    TreeError,
    fault_injection::FaultPoint,
    node::{Node, NodeRef},
    store::{Column, Delta, Filter, NodeStore},
};

use super::NestedSet;

/// Placement relative to a target node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Position {
    FirstChild,
    LastChild,
    PrevSibling,
    NextSibling,
}

impl Position {
    pub fn is_child(self) -> bool {
        matches!(self, Position::FirstChild | Position::LastChild)
    }

    /// First left value the placed node occupies.
    fn destination(self, target: &Node) -> i64 {
        match self {
            Position::FirstChild => target.left + 1,
            Position::LastChild => target.right,
            Position::PrevSibling => target.left,
            Position::NextSibling => target.right + 1,
        }
    }

    fn level_offset(self) -> i64 {
        if self.is_child() { 1 } else { 0 }
    }

    fn parent_id(self, target: &Node) -> Option<i64> {
        if self.is_child() {
            target.id
        } else {
            target.parent_id
        }
    }

    /// Siblings of a root would be a second `left = 1` row.
    fn check_target(self, target: &Node) -> Result<(), TreeError> {
        if !self.is_child() && target.is_root() {
            return Err(TreeError::validation(format!(
                "cannot place a sibling next to root node {}",
                target.id.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

impl<S: NodeStore> NestedSet<S> {
    /// Persists an unsaved `node` at `position` relative to `target` and
    /// refreshes it to the stored row.
    pub fn insert<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
        position: Position,
    ) -> Result<(), TreeError> {
        if node.is_persisted() {
            return Err(TreeError::validation(format!(
                "node {} is already saved",
                node.id.unwrap_or_default()
            )));
        }
        let target = target.into();
        let stored = self.mutate(|touched| {
            let target = self.resolve_target(target)?;
            position.check_target(&target)?;
            let left = position.destination(&target);
            let mut fresh = Node {
                id: None,
                left,
                right: left + 1,
                level: target.level + position.level_offset(),
                scope: target.scope,
                parent_id: position.parent_id(&target),
            };
            touched.scope(fresh.scope);
            self.open_gap(fresh.scope, left, 2)?;
            let persisted = self
                .check_fault(FaultPoint::InsertBeforePersist)
                .and_then(|_| self.store.insert(&fresh));
            match persisted {
                Ok(id) => {
                    fresh.id = Some(id);
                    Ok(fresh)
                }
                Err(err) => {
                    warn!(scope = fresh.scope, left, error = %err, "insert failed, closing reserved space");
                    if let Err(compensation) = self.close_gap(fresh.scope, left, 2) {
                        warn!(error = %compensation, "closing reserved space failed");
                    } else {
                        self.metrics.record_compensation();
                    }
                    Err(err)
                }
            }
        })?;
        self.metrics.record_insert();
        debug!(
            id = stored.id,
            scope = stored.scope,
            left = stored.left,
            right = stored.right,
            ?position,
            "inserted node"
        );
        *node = stored;
        Ok(())
    }

    pub fn insert_as_first_child<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.insert(node, target, Position::FirstChild)
    }

    pub fn insert_as_last_child<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.insert(node, target, Position::LastChild)
    }

    pub fn insert_as_prev_sibling<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.insert(node, target, Position::PrevSibling)
    }

    pub fn insert_as_next_sibling<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.insert(node, target, Position::NextSibling)
    }

    /// Relocates `node` and its subtree to `position` relative to `target`,
    /// possibly into another scope.
    pub fn move_to<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
        position: Position,
    ) -> Result<(), TreeError> {
        let id = node.require_id("move")?;
        let target = target.into();
        let moved = self.mutate(|touched| {
            let current = self.get(id)?;
            let target = self.resolve_target(target)?;
            if target.id == current.id {
                return Err(TreeError::validation(format!(
                    "cannot move node {id} relative to itself"
                )));
            }
            if target.is_descendant_of(&current) {
                return Err(TreeError::validation(format!(
                    "cannot move node {id} into its own descendant {}",
                    target.id.unwrap_or_default()
                )));
            }
            position.check_target(&target)?;

            let size = current.size();
            let dest = position.destination(&target);
            let level_delta = target.level - current.level + position.level_offset();
            touched.scope(current.scope);
            touched.scope(target.scope);

            self.open_gap(target.scope, dest, size)?;
            let (mut from_left, mut from_right) = (current.left, current.right);
            if current.scope == target.scope && from_left >= dest {
                from_left += size;
                from_right += size;
            }

            self.check_fault(FaultPoint::MoveBeforeRelocate)?;
            let offset = dest - from_left;
            self.store.bulk_update(
                &Delta::new()
                    .add(Column::Left, offset)
                    .add(Column::Right, offset)
                    .add(Column::Level, level_delta)
                    .set(Column::Scope, Some(target.scope)),
                &Filter::in_scope(current.scope)
                    .ge(Column::Left, from_left)
                    .le(Column::Right, from_right),
            )?;

            self.check_fault(FaultPoint::MoveBeforeReclaim)?;
            self.close_gap(current.scope, from_left, size)?;

            let mut moved = self.get(id)?;
            let parent_id = position.parent_id(&target);
            if moved.parent_id != parent_id {
                moved.parent_id = parent_id;
                self.store.update(&moved)?;
            }
            Ok(moved)
        })?;
        self.metrics.record_move();
        debug!(
            id,
            scope = moved.scope,
            left = moved.left,
            right = moved.right,
            ?position,
            "moved node"
        );
        *node = moved;
        Ok(())
    }

    pub fn move_to_first_child<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.move_to(node, target, Position::FirstChild)
    }

    pub fn move_to_last_child<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.move_to(node, target, Position::LastChild)
    }

    pub fn move_to_prev_sibling<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.move_to(node, target, Position::PrevSibling)
    }

    pub fn move_to_next_sibling<'t>(
        &self,
        node: &mut Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<(), TreeError> {
        self.move_to(node, target, Position::NextSibling)
    }

    /// Removes `node` with its whole subtree and returns the number of rows
    /// deleted. `node` is reset to an unsaved value.
    pub fn delete(&self, node: &mut Node) -> Result<usize, TreeError> {
        let id = node.require_id("delete")?;
        let (removed, scope) = self.mutate(|touched| {
            let current = self.get(id)?;
            touched.scope(current.scope);
            let removed = self.store.delete(
                &Filter::in_scope(current.scope)
                    .ge(Column::Left, current.left)
                    .le(Column::Right, current.right),
            )?;
            self.check_fault(FaultPoint::DeleteBeforeReclaim)?;
            self.close_gap(current.scope, current.left, current.size())?;
            Ok((removed, current.scope))
        })?;
        self.metrics.record_delete();
        debug!(id, scope, removed, "deleted subtree");
        *node = Node::new();
        Ok(removed)
    }

    /// Makes `node` the root of a scope: a fresh scope when `scope` is
    /// `None`, otherwise `scope`, which must hold no rows yet.
    ///
    /// An unsaved node is persisted as `{1, 2, level 1}`. A saved non-root
    /// node moves there together with its subtree. A node that already is a
    /// root is left untouched.
    pub fn make_root(&self, node: &mut Node, scope: Option<i64>) -> Result<(), TreeError> {
        let existing = node.id;
        let (stored, changed) = self.mutate(|touched| {
            let current = match existing {
                Some(id) => Some(self.get(id)?),
                None => None,
            };
            if let Some(current) = current
                && current.is_root()
            {
                return Ok((current, false));
            }

            let scope = match scope {
                Some(scope) => {
                    if self.store.count(&Filter::in_scope(scope))? > 0 {
                        return Err(TreeError::validation(format!(
                            "scope {scope} is already in use"
                        )));
                    }
                    scope
                }
                None => self.store.max_scope()?.map_or(1, |max| max + 1),
            };
            touched.scope(scope);

            let (Some(id), Some(current)) = (existing, current) else {
                let mut root = Node {
                    id: None,
                    left: 1,
                    right: 2,
                    level: 1,
                    scope,
                    parent_id: None,
                };
                root.id = Some(self.store.insert(&root)?);
                return Ok((root, true));
            };

            touched.scope(current.scope);
            let size = current.size();
            self.store.bulk_update(
                &Delta::new()
                    .add(Column::Left, 1 - current.left)
                    .add(Column::Right, 1 - current.left)
                    .add(Column::Level, 1 - current.level)
                    .set(Column::Scope, Some(scope)),
                &Filter::in_scope(current.scope)
                    .ge(Column::Left, current.left)
                    .le(Column::Right, current.right),
            )?;
            self.close_gap(current.scope, current.left, size)?;

            let mut root = self.get(id)?;
            root.parent_id = None;
            self.store.update(&root)?;
            Ok((root, true))
        })?;
        if changed {
            self.metrics.record_make_root();
            debug!(
                id = stored.id,
                scope = stored.scope,
                right = stored.right,
                "made root"
            );
        }
        *node = stored;
        Ok(())
    }
}
