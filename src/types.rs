//! Core type definitions for the Trellis lineage analysis engine.
//!
//! # Type Aliases
//!
//! Common identifiers are defined as type aliases for clarity:
//!
//! - [`AssetId`] = `String`: Catalog asset identifier
//! - [`EdgeId`] = `String`: Lineage edge identifier
//! - [`JobId`] = `String`: Analysis job identifier (UUID-based)

/// Unique identifier for a catalog asset.
pub type AssetId = String;

/// Unique identifier for a lineage edge.
pub type EdgeId = String;

/// Unique identifier for an analysis job.
pub type JobId = String;

/// Current time as milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
