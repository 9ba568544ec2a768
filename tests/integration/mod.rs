//! Integration test suite for cc-sandbox
//!
//! End-to-end tests of the update workflow and the command-line surface.
//! Nothing here touches the network or needs a container engine: the update
//! flow runs against the in-memory fakes from `cc_sandbox::test_utils`, and
//! CLI runs are limited to paths that stay offline.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: black-box runs of the `cc-sandbox` binary
//! - **probe**: environment probe caching under concurrency
//! - **update_flow**: CLI update and image refresh through the public API

mod cli;
mod probe;
mod update_flow;
