//! Shared utilities for the channel resolver workspace.
//!
//! This crate provides the cross-cutting concerns used by every other
//! `channel-*` crate: a unified error type and the session-wide tunables
//! that govern the bundled HTTP backend's concurrency and retry behavior.

pub mod config;
pub mod errors;
