//! Shared library surface for road-safety server utilities and tests.

pub mod api;
pub mod config;
pub mod loops;
pub mod state;
