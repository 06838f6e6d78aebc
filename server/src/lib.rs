//! EventDesk scheduling server library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod audit;
pub mod auth;
pub mod config;
pub mod cors;
pub mod db;
pub mod error;
pub mod permissions;
pub mod realtime;
pub mod resources;
pub mod routes;
pub mod scheduler;
pub mod state;
