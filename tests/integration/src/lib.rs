//! Integration test utilities for the presence coordinator
//!
//! This crate provides helpers for running two participants of one
//! conversation against a shared in-process hub, and for reaching a live
//! Redis when one is configured.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
