//! End-to-end tests of the gate through the delivery controller.
//!
//! Run with: `cargo test --test e2e`

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod delivery;
mod harness;
mod verification;

pub use harness::TestHarness;
