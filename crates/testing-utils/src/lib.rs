//! # PubSched Testing Utils
//!
//! Shared testing utilities for the publish scheduler workspace.
//! This crate provides in-memory mock repositories and test data builders
//! that can be used across all other crates in the workspace.
//!
//! ## Usage
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! pubsched-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! Then use the mocks in your tests:
//!
//! ```rust
//! use pubsched_testing_utils::mocks::*;
//! use pubsched_testing_utils::builders::*;
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
