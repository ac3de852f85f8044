//! Recomputes intervals and levels from the `parent_id` chain.

use ahash::AHashSet;
use tracing::debug;

use crate::{
    TreeError,
    fault_injection::FaultPoint,
    node::Node,
    store::{Column, Filter, NodeStore, Order, SortDirection},
};

use super::{NestedSet, Touched};

struct Frame {
    node: Node,
    left: i64,
    level: i64,
    children: std::vec::IntoIter<Node>,
    next: i64,
}

impl<S: NodeStore> NestedSet<S> {
    /// Renumbers the subtree under `node` starting at left 1.
    pub fn rebuild_tree(&self, node: &mut Node) -> Result<i64, TreeError> {
        self.rebuild_tree_from(node, 1)
    }

    /// Renumbers the subtree under `node` depth-first, giving `node` the
    /// interval that starts at `left`. Children keep their current left order
    /// and take `node`'s scope. Returns one past the new right bound.
    pub fn rebuild_tree_from(&self, node: &mut Node, left: i64) -> Result<i64, TreeError> {
        let id = node.require_id("rebuild")?;
        if left < 1 {
            return Err(TreeError::validation(format!(
                "rebuild must start at left 1 or later, got {left}"
            )));
        }
        let (next, rebuilt, written) = self.mutate(|touched| {
            let top = self.get(id)?;
            let (next, written) = self.renumber(top, left, touched)?;
            self.check_fault(FaultPoint::RebuildBeforeCommit)?;
            Ok((next, self.get(id)?, written))
        })?;
        self.metrics.record_rebuild();
        debug!(id, scope = rebuilt.scope, right = rebuilt.right, written, "rebuilt subtree");
        *node = rebuilt;
        Ok(next)
    }

    fn children_of(&self, id: Option<i64>) -> Result<Vec<Node>, TreeError> {
        let Some(id) = id else {
            return Ok(Vec::new());
        };
        self.store.read(
            &Filter::new().eq(Column::Parent, id),
            &Order::by(Column::Left, SortDirection::Asc).then(Column::Id, SortDirection::Asc),
            None,
        )
    }

    /// Iterative depth-first walk; each row is written once its right bound
    /// is known. Returns `(right + 1, rows written)`.
    fn renumber(
        &self,
        top: Node,
        left: i64,
        touched: &mut Touched,
    ) -> Result<(i64, usize), TreeError> {
        let scope = top.scope;
        touched.scope(scope);
        let mut visited = AHashSet::new();
        visited.insert(top.id);
        let mut written = 0;
        let mut stack = vec![Frame {
            node: top,
            left,
            level: if left == 1 { 1 } else { top.level },
            children: self.children_of(top.id)?.into_iter(),
            next: left + 1,
        }];

        loop {
            let Some(frame) = stack.last_mut() else {
                return Err(TreeError::validation("rebuild walked past its root"));
            };
            if let Some(child) = frame.children.next() {
                let (child_left, child_level) = (frame.next, frame.level + 1);
                if !visited.insert(child.id) {
                    return Err(TreeError::validation(format!(
                        "parent_id cycle through node {}",
                        child.id.unwrap_or_default()
                    )));
                }
                touched.scope(child.scope);
                stack.push(Frame {
                    node: child,
                    left: child_left,
                    level: child_level,
                    children: self.children_of(child.id)?.into_iter(),
                    next: child_left + 1,
                });
                continue;
            }

            let Some(done) = stack.pop() else {
                return Err(TreeError::validation("rebuild walked past its root"));
            };
            let right = done.next;
            let rebuilt = Node {
                left: done.left,
                right,
                level: done.level,
                scope,
                ..done.node
            };
            if rebuilt != done.node {
                self.store.update(&rebuilt)?;
                written += 1;
            }
            match stack.last_mut() {
                Some(parent) => parent.next = right + 1,
                None => return Ok((right + 1, written)),
            }
        }
    }
}
