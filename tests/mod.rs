//! Integration tests for cloudy's resolution pipeline.

pub mod common;
pub mod integration;

/// Common test setup and utilities
pub mod test_utils {
    use std::sync::Once;
    use tracing::Level;

    static INIT: Once = Once::new();

    /// Route the crate's tracing output through the test harness.
    pub fn init() {
        INIT.call_once(|| {
            tracing_subscriber::fmt()
                .with_max_level(Level::DEBUG)
                .with_test_writer()
                .init();
        });
    }
}
