//! Node entity and the pure relationship predicates derived from its
//! interval, level, scope, and parent fields.

use serde::{Deserialize, Serialize};

/// One row of the nested-set table.
///
/// A node with `id == None` has not been persisted yet; its interval fields
/// are meaningless until an insert or `make_root` assigns them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    pub id: Option<i64>,
    pub left: i64,
    pub right: i64,
    pub level: i64,
    pub scope: i64,
    pub parent_id: Option<i64>,
}

impl Node {
    /// A fresh, unsaved node.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Width of the interval, `right - left + 1`. Always even for a stored node.
    pub fn size(&self) -> i64 {
        self.right - self.left + 1
    }

    /// Descendant count implied by the interval width.
    pub fn descendant_count(&self) -> i64 {
        (self.size() - 2) / 2
    }

    pub fn has_children(&self) -> bool {
        self.size() > 2
    }

    pub fn is_leaf(&self) -> bool {
        !self.has_children()
    }

    pub fn is_root(&self) -> bool {
        self.left == 1
    }

    /// `self` lies strictly inside `other`'s interval in the same scope.
    pub fn is_descendant_of(&self, other: &Node) -> bool {
        self.left > other.left && self.right < other.right && self.scope == other.scope
    }

    pub fn is_child_of(&self, other: &Node) -> bool {
        self.parent_id.is_some() && self.parent_id == other.id
    }

    pub fn is_parent_of(&self, other: &Node) -> bool {
        other.is_child_of(self)
    }

    /// Both nodes share the same direct parent. A node is never its own sibling.
    pub fn is_sibling_of(&self, other: &Node) -> bool {
        if self.id.is_some() && self.id == other.id {
            return false;
        }
        self.parent_id.is_some() && self.parent_id == other.parent_id
    }

    /// `self` is one of `other`'s ancestors.
    pub fn is_in_parents_of(&self, other: &Node) -> bool {
        other.is_descendant_of(self)
    }

    pub(crate) fn require_id(&self, action: &str) -> Result<i64, crate::TreeError> {
        self.id
            .ok_or_else(|| crate::TreeError::validation(format!("cannot {action} an unsaved node")))
    }
}

/// A node passed either by identifier or as an already loaded instance.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Id(i64),
    Node(&'a Node),
}

impl NodeRef<'_> {
    pub(crate) fn id(&self) -> Option<i64> {
        match self {
            NodeRef::Id(id) => Some(*id),
            NodeRef::Node(node) => node.id,
        }
    }
}

impl From<i64> for NodeRef<'_> {
    fn from(value: i64) -> Self {
        NodeRef::Id(value)
    }
}

impl<'a> From<&'a Node> for NodeRef<'a> {
    fn from(value: &'a Node) -> Self {
        NodeRef::Node(value)
    }
}

impl<'a> From<&'a mut Node> for NodeRef<'a> {
    fn from(value: &'a mut Node) -> Self {
        NodeRef::Node(value)
    }
}
