//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Flow identifier used by configuration and client tests.
pub const FLOW_ID: &str = "11111111-2222-3333-4444-555555555555";

/// Source collection identifier used across tests.
pub const SOURCE_COLLECTION: &str = "aaaaaaaa-0000-0000-0000-000000000001";

/// Destination collection identifier used across tests.
pub const DEST_COLLECTION: &str = "aaaaaaaa-0000-0000-0000-000000000002";

/// Completed scan directory as written by the DAQ system.
pub const REFERENCE_SCAN: &str = "/xfel/ffs/dat/ue_251023_FXL/rawData/251023_alignment_00001_DIR";

/// Source path of [`REFERENCE_SCAN`] on the source collection.
pub const REFERENCE_SOURCE: &str = "/~/dat/ue_251023_FXL/rawData/251023_alignment_00001_DIR/";

/// Destination path of [`REFERENCE_SCAN`] under `/backup`.
pub const REFERENCE_DEST: &str = "/backup/ue_251023_FXL/rawData/251023_alignment_00001_DIR/";
