//! Store-independent predicates, column deltas, and orderings.
//!
//! The engine describes every read and bulk write with these values; each
//! [`NodeStore`](super::NodeStore) translates them (SQL text for SQLite,
//! direct evaluation for the memory store).

use serde::{Deserialize, Serialize};

use crate::node::Node;

/// Structural column of the node table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Id,
    Left,
    Right,
    Level,
    Scope,
    Parent,
}

impl Column {
    pub const ALL: [Column; 6] = [
        Column::Id,
        Column::Left,
        Column::Right,
        Column::Level,
        Column::Scope,
        Column::Parent,
    ];

    /// Value of this column on `node`; `None` models SQL `NULL`.
    pub fn value(self, node: &Node) -> Option<i64> {
        match self {
            Column::Id => node.id,
            Column::Left => Some(node.left),
            Column::Right => Some(node.right),
            Column::Level => Some(node.level),
            Column::Scope => Some(node.scope),
            Column::Parent => node.parent_id,
        }
    }

    pub(crate) fn assign(self, node: &mut Node, value: Option<i64>) {
        match self {
            Column::Id => node.id = value,
            Column::Left => node.left = value.unwrap_or_default(),
            Column::Right => node.right = value.unwrap_or_default(),
            Column::Level => node.level = value.unwrap_or_default(),
            Column::Scope => node.scope = value.unwrap_or_default(),
            Column::Parent => node.parent_id = value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    pub fn as_sql(self) -> &'static str {
        match self {
            Cmp::Eq => "=",
            Cmp::Ne => "<>",
            Cmp::Lt => "<",
            Cmp::Le => "<=",
            Cmp::Gt => ">",
            Cmp::Ge => ">=",
        }
    }

    pub fn eval(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Cmp::Eq => lhs == rhs,
            Cmp::Ne => lhs != rhs,
            Cmp::Lt => lhs < rhs,
            Cmp::Le => lhs <= rhs,
            Cmp::Gt => lhs > rhs,
            Cmp::Ge => lhs >= rhs,
        }
    }
}

/// A single conjunct of a [`Filter`]. Comparisons against `NULL` are false,
/// as in SQL.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Condition {
    Compare {
        column: Column,
        cmp: Cmp,
        value: i64,
    },
    IsNull(Column),
    /// `column <cmp> other + offset`, e.g. `right = left + 1` for leaves.
    Relative {
        column: Column,
        cmp: Cmp,
        other: Column,
        offset: i64,
    },
    OneOf {
        column: Column,
        values: Vec<i64>,
    },
}

impl Condition {
    pub fn matches(&self, node: &Node) -> bool {
        match self {
            Condition::Compare { column, cmp, value } => column
                .value(node)
                .map(|lhs| cmp.eval(lhs, *value))
                .unwrap_or(false),
            Condition::IsNull(column) => column.value(node).is_none(),
            Condition::Relative {
                column,
                cmp,
                other,
                offset,
            } => match (column.value(node), other.value(node)) {
                (Some(lhs), Some(rhs)) => cmp.eval(lhs, rhs + offset),
                _ => false,
            },
            Condition::OneOf { column, values } => column
                .value(node)
                .map(|lhs| values.contains(&lhs))
                .unwrap_or(false),
        }
    }
}

/// Conjunction of conditions. An empty filter matches every row.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self::new().eq(Column::Id, id)
    }

    pub fn in_scope(scope: i64) -> Self {
        Self::new().eq(Column::Scope, scope)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn compare(self, column: Column, cmp: Cmp, value: i64) -> Self {
        self.with(Condition::Compare { column, cmp, value })
    }

    pub fn eq(self, column: Column, value: i64) -> Self {
        self.compare(column, Cmp::Eq, value)
    }

    pub fn ne(self, column: Column, value: i64) -> Self {
        self.compare(column, Cmp::Ne, value)
    }

    pub fn lt(self, column: Column, value: i64) -> Self {
        self.compare(column, Cmp::Lt, value)
    }

    pub fn le(self, column: Column, value: i64) -> Self {
        self.compare(column, Cmp::Le, value)
    }

    pub fn gt(self, column: Column, value: i64) -> Self {
        self.compare(column, Cmp::Gt, value)
    }

    pub fn ge(self, column: Column, value: i64) -> Self {
        self.compare(column, Cmp::Ge, value)
    }

    pub fn is_null(self, column: Column) -> Self {
        self.with(Condition::IsNull(column))
    }

    pub fn one_of(self, column: Column, values: Vec<i64>) -> Self {
        self.with(Condition::OneOf { column, values })
    }

    /// Rows whose interval is exactly one wide.
    pub fn leaves_only(self) -> Self {
        self.with(Condition::Relative {
            column: Column::Right,
            cmp: Cmp::Eq,
            other: Column::Left,
            offset: 1,
        })
    }

    pub fn matches(&self, node: &Node) -> bool {
        self.conditions.iter().all(|c| c.matches(node))
    }
}

/// One column change inside a bulk update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    Add(Column, i64),
    Set(Column, Option<i64>),
}

/// Set of column changes applied to every row matching a filter. All
/// assignments read the row's values from before the update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Delta {
    assignments: Vec<Assignment>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, column: Column, amount: i64) -> Self {
        self.assignments.push(Assignment::Add(column, amount));
        self
    }

    pub fn set(mut self, column: Column, value: Option<i64>) -> Self {
        self.assignments.push(Assignment::Set(column, value));
        self
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn apply(&self, node: &Node) -> Node {
        let mut updated = *node;
        for assignment in &self.assignments {
            match *assignment {
                Assignment::Add(column, amount) => {
                    let value = column.value(node).map(|v| v + amount);
                    column.assign(&mut updated, value);
                }
                Assignment::Set(column, value) => column.assign(&mut updated, value),
            }
        }
        updated
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort keys applied left to right.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Order {
    keys: Vec<(Column, SortDirection)>,
}

impl Order {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn by(column: Column, direction: SortDirection) -> Self {
        Self::none().then(column, direction)
    }

    pub fn then(mut self, column: Column, direction: SortDirection) -> Self {
        self.keys.push((column, direction));
        self
    }

    pub fn keys(&self) -> &[(Column, SortDirection)] {
        &self.keys
    }

    pub fn compare(&self, a: &Node, b: &Node) -> std::cmp::Ordering {
        for (column, direction) in &self.keys {
            let ordering = column.value(a).cmp(&column.value(b));
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    }
}
