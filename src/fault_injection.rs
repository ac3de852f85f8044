//! Failure points inside multi-step mutations, armed per tree handle.

use ahash::AHashMap;
use parking_lot::Mutex;

use crate::TreeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// After `create_space`, before the new row is written.
    InsertBeforePersist,
    /// After the destination gap is open, before the subtree is relocated.
    MoveBeforeRelocate,
    /// After the subtree is relocated, before the vacated space is closed.
    MoveBeforeReclaim,
    /// After the subtree rows are deleted, before the space is closed.
    DeleteBeforeReclaim,
    /// After every rebuilt row is written, before the lock is released.
    RebuildBeforeCommit,
}

#[derive(Default)]
pub struct FaultRegistry {
    armed: Mutex<AHashMap<FaultPoint, usize>>,
}

impl FaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        self.armed.lock().clear();
    }

    /// The next `failures` passes through `point` fail.
    pub fn configure(&self, point: FaultPoint, failures: usize) {
        let mut guard = self.armed.lock();
        if failures == 0 {
            guard.remove(&point);
        } else {
            guard.insert(point, failures);
        }
    }

    pub(crate) fn check(&self, point: FaultPoint) -> Result<(), TreeError> {
        let mut guard = self.armed.lock();
        if let Some(remaining) = guard.get_mut(&point)
            && *remaining > 0
        {
            *remaining -= 1;
            if *remaining == 0 {
                guard.remove(&point);
            }
            return Err(TreeError::fault_injection(format!("{point:?}")));
        }
        Ok(())
    }
}
