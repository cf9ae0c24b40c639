//! Test utilities for hatload.
//!
//! This crate provides a fake storefront to run load tests against, and a tracing setup for tests.
//! See the modules for all available utilities.

pub mod server;
pub mod tracing;
