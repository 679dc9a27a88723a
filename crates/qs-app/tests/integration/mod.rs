//! Shared integration test helpers.

pub mod common;
