// File: pointmill-core/src/test_utils/mod.rs

pub mod memory;

pub use memory::MemoryBackend;

/// Install a compact tracing subscriber for test debugging. Safe to call
/// from every test; repeat calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
