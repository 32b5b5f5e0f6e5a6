//! Rendering backend
//!
//! A GLFW window plus a single-pipeline Vulkan renderer that draws one
//! textured screen quad per frame with one frame in flight.

pub mod vulkan;
pub mod window;

pub use vulkan::renderer::VulkanRenderer;
pub use window::{Window, WindowError};
