//! Global subscriber installation.

#![allow(
    clippy::tests_outside_test_module,
    missing_docs,
    reason = "Integration tests have different conventions"
)]

use mimir_core::telemetry::{init_test_tracing, init_tracing};
use tracing::info;

#[test]
fn test_init_tracing_installs_once() {
    assert!(init_tracing(), "first install should succeed");
    info!("tracing installed");

    assert!(!init_tracing(), "a second install must be refused");
    // The test subscriber defers to the one already installed
    init_test_tracing();
}
