//! Shared fixtures and mocks for the integration tests.

pub mod fixtures;
pub mod mocks;
