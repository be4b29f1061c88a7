//! services/api/src/lib.rs
//!
//! The HTTP service around `educare_core`: configuration, the Postgres and
//! local-disk adapters, and the axum handlers.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
