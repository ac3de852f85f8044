//! Structural integrity sweep over stored intervals.

use ahash::AHashSet;
use serde::Serialize;

use crate::{
    TreeError,
    node::Node,
    store::{Column, Filter, NodeStore, Order, SortDirection},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Violation {
    /// `left >= right`, `left < 1`, or an odd interval width.
    MalformedInterval { id: Option<i64>, left: i64, right: i64 },
    /// Intervals that are neither disjoint nor nested.
    Overlap { id: Option<i64>, other: Option<i64> },
    /// A scope must hold exactly one `left = 1` row.
    RootCount { count: usize },
    ParentMismatch {
        id: Option<i64>,
        expected: Option<i64>,
        actual: Option<i64>,
    },
    LevelMismatch {
        id: Option<i64>,
        expected: i64,
        actual: i64,
    },
    DuplicateBound { value: i64 },
    /// Bounds of `n` rows must be exactly `1..=2n`.
    BoundsNotContiguous { expected_max: i64, actual_max: i64 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub scope: i64,
    pub total_nodes: usize,
    pub violations: Vec<Violation>,
}

impl IntegrityReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

pub fn check_scope<S: NodeStore>(store: &S, scope: i64) -> Result<IntegrityReport, TreeError> {
    let rows = store.read(
        &Filter::in_scope(scope),
        &Order::by(Column::Left, SortDirection::Asc).then(Column::Id, SortDirection::Asc),
        None,
    )?;
    Ok(sweep(scope, &rows))
}

/// One report per scope present in the store, ordered by scope.
pub fn check_all<S: NodeStore>(store: &S) -> Result<Vec<IntegrityReport>, TreeError> {
    let rows = store.read(
        &Filter::new(),
        &Order::by(Column::Scope, SortDirection::Asc)
            .then(Column::Left, SortDirection::Asc)
            .then(Column::Id, SortDirection::Asc),
        None,
    )?;
    Ok(rows
        .chunk_by(|a, b| a.scope == b.scope)
        .map(|group| sweep(group[0].scope, group))
        .collect())
}

/// `rows` must be sorted by left.
fn sweep(scope: i64, rows: &[Node]) -> IntegrityReport {
    let mut report = IntegrityReport {
        scope,
        total_nodes: rows.len(),
        violations: Vec::new(),
    };
    if rows.is_empty() {
        return report;
    }

    let roots = rows.iter().filter(|row| row.left == 1).count();
    if roots != 1 {
        report.violations.push(Violation::RootCount { count: roots });
    }

    let mut bounds = AHashSet::with_capacity(rows.len() * 2);
    let mut actual_max = 0;
    for row in rows {
        for value in [row.left, row.right] {
            if !bounds.insert(value) {
                report.violations.push(Violation::DuplicateBound { value });
            }
            actual_max = actual_max.max(value);
        }
    }
    let expected_max = rows.len() as i64 * 2;
    if actual_max != expected_max || bounds.len() as i64 != expected_max {
        report.violations.push(Violation::BoundsNotContiguous {
            expected_max,
            actual_max,
        });
    }

    let mut stack: Vec<&Node> = Vec::new();
    for row in rows {
        if row.left < 1 || row.left >= row.right || row.size() % 2 != 0 {
            report.violations.push(Violation::MalformedInterval {
                id: row.id,
                left: row.left,
                right: row.right,
            });
            continue;
        }
        while stack.last().is_some_and(|top| top.right < row.left) {
            stack.pop();
        }
        let (expected_parent, expected_level) = match stack.last() {
            Some(top) => {
                if row.right >= top.right {
                    report.violations.push(Violation::Overlap {
                        id: row.id,
                        other: top.id,
                    });
                }
                (top.id, top.level + 1)
            }
            None => (None, 1),
        };
        if row.parent_id != expected_parent {
            report.violations.push(Violation::ParentMismatch {
                id: row.id,
                expected: expected_parent,
                actual: row.parent_id,
            });
        }
        if row.level != expected_level {
            report.violations.push(Violation::LevelMismatch {
                id: row.id,
                expected: expected_level,
                actual: row.level,
            });
        }
        stack.push(row);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, left: i64, right: i64, level: i64, parent: Option<i64>) -> Node {
        Node {
            id: Some(id),
            left,
            right,
            level,
            scope: 1,
            parent_id: parent,
        }
    }

    #[test]
    fn test_consistent_tree() {
        let rows = [
            row(1, 1, 8, 1, None),
            row(2, 2, 5, 2, Some(1)),
            row(3, 3, 4, 3, Some(2)),
            row(4, 6, 7, 2, Some(1)),
        ];
        let report = sweep(1, &rows);
        assert!(report.is_consistent(), "{:?}", report.violations);
        assert_eq!(report.total_nodes, 4);
    }

    #[test]
    fn test_detects_overlap_and_parent_mismatch() {
        let rows = [
            row(1, 1, 8, 1, None),
            row(2, 2, 5, 2, Some(1)),
            row(3, 4, 7, 3, Some(1)),
            row(4, 6, 7, 2, Some(1)),
        ];
        let report = sweep(1, &rows);
        assert!(report.violations.contains(&Violation::Overlap {
            id: Some(3),
            other: Some(2),
        }));
        assert!(report.violations.contains(&Violation::ParentMismatch {
            id: Some(3),
            expected: Some(2),
            actual: Some(1),
        }));
        assert!(report.violations.contains(&Violation::DuplicateBound { value: 7 }));
    }

    #[test]
    fn test_detects_missing_root_and_gap() {
        let rows = [row(1, 2, 5, 1, None)];
        let report = sweep(1, &rows);
        assert!(report.violations.contains(&Violation::RootCount { count: 0 }));
        assert!(report.violations.contains(&Violation::BoundsNotContiguous {
            expected_max: 2,
            actual_max: 5,
        }));
    }
}
