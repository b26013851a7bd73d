//! services/api/src/lib.rs
//!
//! The library half of the `api` service: configuration, adapters for the core
//! ports, and the axum web layer. The binaries in `src/bin` build on it.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
