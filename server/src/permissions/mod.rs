//! Per-department permission flags.
//!
//! One record per department holding five boolean flags. Unknown departments
//! read as all-false; older records are backfilled on read.

pub mod routes;
pub mod store;
