//! Error types for the counter store.
//!
//! All backend failures are propagated via [`StoreError`], which wraps the
//! underlying [`sqlx`], [`fred`] and I/O errors. Callers above the store
//! treat every variant as "the backing medium could not commit or serve
//! the request" -- the counter is never partially updated.

/// Errors that can occur in the counter store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// Reading or writing the counter file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted counter document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Applying the delta would overflow the signed 64-bit counter.
    #[error("counter overflow: {value} + {delta} does not fit in i64")]
    Overflow {
        /// The value stored before the rejected write.
        value: i64,
        /// The delta that was rejected.
        delta: i64,
    },

    /// The backend returned data that is not a valid counter.
    #[error("corrupt counter state: {0}")]
    Corrupt(String),

    /// The backing medium is offline.
    #[error("store offline")]
    Offline,

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}
