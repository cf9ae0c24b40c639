//! Simulated user traffic for the hat storefront.
//!
//! A [`Scenario`] describes a number of simulated users. Each user visits the homepage once and
//! then keeps picking one of three [`Task`]s with weighted probability, pausing for a random
//! [wait time](scenario::WaitTime) in between:
//!
//! | task     | request                | weight |
//! |----------|------------------------|--------|
//! | `index`  | `GET /`                | 1      |
//! | `list`   | `GET /list`            | 4      |
//! | `browse` | `GET /hatme?style=...` | 20     |
//!
//! The style of a `browse` request is picked uniformly from a [`Catalog`]. [`run`] drives all
//! users against an [`HttpRemote`] and returns a [`Report`] with request counts, failures and
//! latency percentiles per task.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod catalog;
pub mod cli;
pub mod config;
pub mod healthcheck;
pub mod http;
pub mod loadtest;
pub mod metrics;
pub mod observability;
pub mod report;
pub mod scenario;
pub mod task;
mod user;

pub use crate::catalog::{Catalog, CatalogVariant};
pub use crate::healthcheck::healthcheck;
pub use crate::http::HttpRemote;
pub use crate::loadtest::{run, run_until};
pub use crate::report::Report;
pub use crate::scenario::Scenario;
pub use crate::task::{Task, TaskWeights};
