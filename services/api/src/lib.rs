//! services/api/src/lib.rs
//!
//! Library root for the `api` service. The binaries in `src/bin` wire the
//! adapters, services, and web layer defined here into a running server.

pub mod adapters;
pub mod ai;
pub mod config;
pub mod error;
pub mod web;
