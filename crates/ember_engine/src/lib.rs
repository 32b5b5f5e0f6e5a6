//! # Ember Engine
//!
//! A minimal real-time rendering engine: one window, one Vulkan device,
//! one graphics pipeline, one textured screen quad drawn each frame,
//! and a toy falling-particle simulation ticking alongside it.
//!
//! The renderer keeps exactly one frame in flight and performs a
//! strictly sequential acquire → record → submit → wait → present cycle
//! per frame. All GPU waits are bounded by a configurable timeout.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ember_engine::{Engine, EngineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     ember_engine::foundation::logging::init();
//!     let mut engine = Engine::new(EngineConfig::default())?;
//!     engine.run();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod simulation;

mod engine;

pub use config::EngineConfig;
pub use engine::{Engine, EngineError};
