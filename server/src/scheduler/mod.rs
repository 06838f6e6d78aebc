//! Periodic cleanup of expired and aged-out documents.
//!
//! The same sweep runs from a background timer and from
//! `POST /api/cleanup-now`. Each pass is stateless, so timer and manual
//! runs may interleave freely.

pub mod cleanup;
pub mod routes;
pub mod task;
