//! Error types surfaced by the counter core.

use tally_db::StoreError;

/// Errors returned to callers of the gateway and hub.
///
/// Delivery failures to individual observers are deliberately absent:
/// they are handled inside the hub by evicting the observer and never
/// reach the request that triggered the publish.
#[derive(Debug, thiserror::Error)]
pub enum TallyError {
    /// The backing store could not be reached or rejected the write.
    /// Nothing was committed and nothing was broadcast.
    #[error("storage unavailable: {source}")]
    StorageUnavailable {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },
}
