//! Common utilities for integration tests

#![allow(dead_code)]

pub mod test_helpers;

// Re-export commonly used items
pub use test_helpers::{
    dutch_practice,
    fully_mature,
    init_logging,
    relative_error,
    young_filter,
};
