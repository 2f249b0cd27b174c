//! Common test utilities for integration and scenario tests.
//!
//! This module provides an in-memory repository for engine tests and
//! helpers for creating temporary git repositories.
//!
//! Note: Each integration test file compiles as a separate crate,
//! so not all helpers are used in every test file. We suppress
//! dead_code warnings at the module level.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fake_repo;
pub mod test_repo;

pub use fake_repo::{FakeRepo, sha};
pub use test_repo::TestRepo;

/// Skip the current test when git is not installed
#[macro_export]
macro_rules! skip_if_no_git {
    () => {
        if !$crate::common::test_repo::git_available() {
            eprintln!("git not found, skipping");
            return;
        }
    };
}
