//! The result of a committed counter write.

use serde::{Deserialize, Serialize};

/// A committed counter state as reported by the store.
///
/// Every successful write bumps `revision` by exactly one inside the same
/// atomic operation that changes `value`, so revisions give a total order
/// over writes regardless of which task observes them first. A store that
/// has never been written reports revision `0` and value `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateChange {
    /// The counter value after the write.
    pub value: i64,
    /// Store-assigned write sequence number.
    pub revision: u64,
}

impl StateChange {
    /// Construct a state change.
    pub const fn new(value: i64, revision: u64) -> Self {
        Self { value, revision }
    }

    /// Whether `self` was committed after `other`.
    pub const fn supersedes(&self, other: &Self) -> bool {
        self.revision > other.revision
    }

    /// Compute the state that results from applying `delta` to `self`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Overflow`](crate::StoreError::Overflow) if the
    /// new value does not fit in an `i64`, or
    /// [`StoreError::Corrupt`](crate::StoreError::Corrupt) if the revision
    /// counter is exhausted.
    pub fn apply(self, delta: i64) -> Result<Self, crate::StoreError> {
        let value = self
            .value
            .checked_add(delta)
            .ok_or(crate::StoreError::Overflow {
                value: self.value,
                delta,
            })?;
        Ok(Self {
            value,
            revision: self.next_revision()?,
        })
    }

    /// Compute the state that results from forcing the value to zero.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`](crate::StoreError::Corrupt) if the
    /// revision counter is exhausted.
    pub fn zeroed(self) -> Result<Self, crate::StoreError> {
        Ok(Self {
            value: 0,
            revision: self.next_revision()?,
        })
    }

    fn next_revision(self) -> Result<u64, crate::StoreError> {
        self.revision
            .checked_add(1)
            .ok_or_else(|| crate::StoreError::Corrupt("revision counter exhausted".to_owned()))
    }
}
