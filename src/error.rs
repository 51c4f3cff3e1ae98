//! Error types for the device state model.

use thiserror::Error;

/// Result type alias for tracker operations that can fail.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// The recoverable failures this model can report. Everything else in the
/// crate is total over its typed domain and returns no `Result`.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// A watchlist pattern failed to compile. The previously active pattern
    /// remains in effect.
    #[error("invalid SSID watchlist pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A record reconstructed from stored or external data carried a schema
    /// signature that does not match this build. Recovery policy (discard or
    /// migrate) belongs to the serialization layer.
    #[error("schema signature mismatch for {record}: expected {expected:#010x}, found {found:#010x}")]
    SchemaMismatch {
        record: &'static str,
        expected: u32,
        found: u32,
    },
}
