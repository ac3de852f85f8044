//! Interval allocator: opens and closes runs of left/right values in a scope.
//!
//! Update order keeps every row valid under `CHECK (left < right)` after each
//! statement: opening shifts rights before lefts, closing shifts lefts before
//! rights.

use tracing::trace;

use crate::{
    TreeError,
    store::{Column, Delta, Filter, NodeStore},
};

use super::NestedSet;

impl<S: NodeStore> NestedSet<S> {
    /// Adds `size` to every left and right at or after `start` in `scope`.
    pub fn create_space(&self, scope: i64, start: i64, size: i64) -> Result<(), TreeError> {
        check_space(start, size)?;
        self.mutate(|touched| {
            touched.scope(scope);
            self.open_gap(scope, start, size)
        })
    }

    /// Subtracts `size` from every left and right at or after `start` in
    /// `scope`. The run `[start, start + size)` must already be empty.
    pub fn delete_space(&self, scope: i64, start: i64, size: i64) -> Result<(), TreeError> {
        check_space(start, size)?;
        self.mutate(|touched| {
            touched.scope(scope);
            self.close_gap(scope, start, size)
        })
    }

    /// Lock-free body of [`NestedSet::create_space`]; callers hold the lock.
    pub(crate) fn open_gap(&self, scope: i64, start: i64, size: i64) -> Result<(), TreeError> {
        let rights = self.store.bulk_update(
            &Delta::new().add(Column::Right, size),
            &Filter::in_scope(scope).ge(Column::Right, start),
        )?;
        let lefts = self.store.bulk_update(
            &Delta::new().add(Column::Left, size),
            &Filter::in_scope(scope).ge(Column::Left, start),
        )?;
        trace!(scope, start, size, rights, lefts, "opened gap");
        Ok(())
    }

    pub(crate) fn close_gap(&self, scope: i64, start: i64, size: i64) -> Result<(), TreeError> {
        let lefts = self.store.bulk_update(
            &Delta::new().add(Column::Left, -size),
            &Filter::in_scope(scope).ge(Column::Left, start),
        )?;
        let rights = self.store.bulk_update(
            &Delta::new().add(Column::Right, -size),
            &Filter::in_scope(scope).ge(Column::Right, start),
        )?;
        trace!(scope, start, size, lefts, rights, "closed gap");
        Ok(())
    }
}

fn check_space(start: i64, size: i64) -> Result<(), TreeError> {
    if start < 1 {
        return Err(TreeError::validation(format!(
            "space must start at 1 or later, got {start}"
        )));
    }
    if size < 1 {
        return Err(TreeError::validation(format!(
            "space size must be positive, got {size}"
        )));
    }
    Ok(())
}
