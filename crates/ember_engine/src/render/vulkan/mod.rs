//! Vulkan rendering backend
//!
//! RAII wrappers over the ash API. Each object owns its handles and
//! releases them on drop; aggregates declare dependents first so Rust's
//! field drop order tears everything down in reverse acquisition order.

pub mod buffer;
pub mod commands;
pub mod context;
pub mod descriptor;
pub mod framebuffer;
pub mod pipeline;
pub mod render_pass;
pub mod renderer;
pub mod swapchain;
pub mod sync;
pub mod texture;

pub use context::{
    LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanError, VulkanInstance, VulkanResult,
};
pub use renderer::VulkanRenderer;
