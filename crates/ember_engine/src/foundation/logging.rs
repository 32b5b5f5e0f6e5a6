//! Logging setup for the `log` facade

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system.
///
/// Honors `RUST_LOG`; defaults to `info` when unset. Vulkan
/// validation-layer messages arrive under the `vulkan` target, so they
/// can be filtered separately (`RUST_LOG=info,vulkan=debug`).
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
