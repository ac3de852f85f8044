//! Relationship queries built from interval, level, and scope predicates.
//!
//! Every listing is one store read, memoized on the tree handle under the
//! full state of the node it was asked about.

use crate::{
    TreeError,
    cache::QueryKey,
    node::{Node, NodeRef},
    store::{Column, Filter, NodeStore, Order, SortDirection},
};

use super::NestedSet;

/// Options for [`NestedSet::parents`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParentsQuery {
    pub include_root: bool,
    pub include_self: bool,
    pub direction: SortDirection,
    /// Only the nearest ancestor, at most one row. Overrides `include_self`.
    pub direct_only: bool,
}

impl Default for ParentsQuery {
    fn default() -> Self {
        Self {
            include_root: true,
            include_self: false,
            direction: SortDirection::Asc,
            direct_only: false,
        }
    }
}

/// Options for [`NestedSet::descendants`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DescendantsQuery {
    pub include_self: bool,
    pub direction: SortDirection,
    pub direct_only: bool,
    pub leaves_only: bool,
    pub limit: Option<usize>,
}

impl<S: NodeStore> NestedSet<S> {
    /// The node with `left = 1` in `scope`.
    pub fn root(&self, scope: i64) -> Result<Option<Node>, TreeError> {
        let found = self.cached(QueryKey::Root { scope }, || {
            self.store.read(
                &Filter::in_scope(scope).eq(Column::Left, 1),
                &Order::none(),
                Some(1),
            )
        })?;
        Ok(found.into_iter().next())
    }

    pub fn root_of(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        self.root(node.scope)
    }

    /// Every root, one per scope, ordered by scope.
    pub fn roots(&self) -> Result<Vec<Node>, TreeError> {
        self.cached(QueryKey::Roots, || {
            self.store.read(
                &Filter::new().eq(Column::Left, 1),
                &Order::by(Column::Scope, SortDirection::Asc),
                None,
            )
        })
    }

    /// Direct parent, `None` for a root.
    pub fn parent(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        node.require_id("query the parent of")?;
        let Some(parent_id) = node.parent_id else {
            return Ok(None);
        };
        if node.is_root() {
            return Ok(None);
        }
        let found = self.cached(QueryKey::Parent { node: *node }, || {
            self.store
                .read(&Filter::by_id(parent_id), &Order::none(), Some(1))
        })?;
        Ok(found.into_iter().next())
    }

    /// Ancestors of `node`, ordered by left.
    pub fn parents(&self, node: &Node, query: ParentsQuery) -> Result<Vec<Node>, TreeError> {
        node.require_id("query the parents of")?;
        self.cached(
            QueryKey::Parents {
                node: *node,
                query,
            },
            || {
                let mut filter = Filter::in_scope(node.scope);
                filter = if query.include_self {
                    filter
                        .le(Column::Left, node.left)
                        .ge(Column::Right, node.right)
                } else {
                    filter
                        .lt(Column::Left, node.left)
                        .gt(Column::Right, node.right)
                };
                if !query.include_root {
                    filter = filter.ne(Column::Left, 1);
                }
                let mut limit = None;
                if query.direct_only {
                    filter = filter.eq(Column::Level, node.level - 1);
                    limit = Some(1);
                }
                self.store
                    .read(&filter, &Order::by(Column::Left, query.direction), limit)
            },
        )
    }

    /// Direct children of `node`.
    pub fn children(
        &self,
        node: &Node,
        include_self: bool,
        direction: SortDirection,
        limit: Option<usize>,
    ) -> Result<Vec<Node>, TreeError> {
        self.descendants(
            node,
            DescendantsQuery {
                include_self,
                direction,
                direct_only: true,
                leaves_only: false,
                limit,
            },
        )
    }

    pub fn first_child(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        Ok(self
            .children(node, false, SortDirection::Asc, Some(1))?
            .into_iter()
            .next())
    }

    pub fn last_child(&self, node: &Node) -> Result<Option<Node>, TreeError> {
        Ok(self
            .children(node, false, SortDirection::Desc, Some(1))?
            .into_iter()
            .next())
    }

    /// Nodes inside `node`'s interval, ordered by left.
    pub fn descendants(
        &self,
        node: &Node,
        query: DescendantsQuery,
    ) -> Result<Vec<Node>, TreeError> {
        node.require_id("query the descendants of")?;
        self.cached(
            QueryKey::Descendants {
                node: *node,
                query,
            },
            || {
                let mut filter = Filter::in_scope(node.scope);
                filter = if query.include_self {
                    filter
                        .ge(Column::Left, node.left)
                        .le(Column::Right, node.right)
                } else {
                    filter
                        .gt(Column::Left, node.left)
                        .lt(Column::Right, node.right)
                };
                if query.direct_only {
                    let levels = if query.include_self {
                        vec![node.level, node.level + 1]
                    } else {
                        vec![node.level + 1]
                    };
                    filter = filter.one_of(Column::Level, levels);
                }
                if query.leaves_only {
                    filter = filter.leaves_only();
                }
                self.store.read(
                    &filter,
                    &Order::by(Column::Left, query.direction),
                    query.limit,
                )
            },
        )
    }

    /// Leaves anywhere under `node`; with `include_self`, a leaf `node`
    /// lists itself.
    pub fn leaves(
        &self,
        node: &Node,
        include_self: bool,
        direction: SortDirection,
    ) -> Result<Vec<Node>, TreeError> {
        self.descendants(
            node,
            DescendantsQuery {
                include_self,
                direction,
                leaves_only: true,
                ..DescendantsQuery::default()
            },
        )
    }

    /// Nodes sharing `node`'s parent. A root's only candidate in its scope
    /// is itself.
    pub fn siblings(
        &self,
        node: &Node,
        include_self: bool,
        direction: SortDirection,
    ) -> Result<Vec<Node>, TreeError> {
        let id = node.require_id("query the siblings of")?;
        self.cached(
            QueryKey::Siblings {
                node: *node,
                include_self,
                direction,
            },
            || {
                let mut filter = Filter::in_scope(node.scope).eq(Column::Level, node.level);
                if let Some(parent_id) = node.parent_id {
                    // A dangling parent_id has no interval to bound the siblings.
                    let Some(parent) = self.store.get(parent_id)? else {
                        return Ok(Vec::new());
                    };
                    filter = filter
                        .gt(Column::Left, parent.left)
                        .lt(Column::Right, parent.right);
                }
                if !include_self {
                    filter = filter.ne(Column::Id, id);
                }
                self.store
                    .read(&filter, &Order::by(Column::Left, direction), None)
            },
        )
    }

    /// One scope ordered by left, or every scope ordered by scope then left.
    pub fn fulltree(&self, scope: Option<i64>) -> Result<Vec<Node>, TreeError> {
        self.cached(QueryKey::FullTree { scope }, || match scope {
            Some(scope) => self.store.read(
                &Filter::in_scope(scope),
                &Order::by(Column::Left, SortDirection::Asc),
                None,
            ),
            None => self.store.read(
                &Filter::new(),
                &Order::by(Column::Scope, SortDirection::Asc)
                    .then(Column::Left, SortDirection::Asc),
                None,
            ),
        })
    }

    /// Stored descendant rows; equals [`Node::descendant_count`] on a
    /// consistent tree.
    pub fn count_descendants(&self, node: &Node) -> Result<i64, TreeError> {
        node.require_id("count the descendants of")?;
        self.store.count(
            &Filter::in_scope(node.scope)
                .gt(Column::Left, node.left)
                .lt(Column::Right, node.right),
        )
    }

    pub fn is_descendant<'t>(
        &self,
        node: &Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<bool, TreeError> {
        Ok(node.is_descendant_of(&self.lookup(target.into())?))
    }

    pub fn is_child<'t>(
        &self,
        node: &Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<bool, TreeError> {
        Ok(node.is_child_of(&self.lookup(target.into())?))
    }

    pub fn is_parent<'t>(
        &self,
        node: &Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<bool, TreeError> {
        Ok(node.is_parent_of(&self.lookup(target.into())?))
    }

    pub fn is_sibling<'t>(
        &self,
        node: &Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<bool, TreeError> {
        Ok(node.is_sibling_of(&self.lookup(target.into())?))
    }

    pub fn is_in_parents<'t>(
        &self,
        node: &Node,
        target: impl Into<NodeRef<'t>>,
    ) -> Result<bool, TreeError> {
        Ok(node.is_in_parents_of(&self.lookup(target.into())?))
    }

    /// A loaded instance is used as given; an identifier costs one read.
    fn lookup(&self, target: NodeRef<'_>) -> Result<Node, TreeError> {
        match target {
            NodeRef::Node(node) => Ok(*node),
            NodeRef::Id(id) => self.get(id),
        }
    }
}
