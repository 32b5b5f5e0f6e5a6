//! Command pool management
//!
//! The per-frame protocol allocates one primary command buffer, records
//! it, and frees it back to the pool after the frame's fence wait, so
//! the pool is created without the reset flag.

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// Command pool wrapper with RAII cleanup.
pub struct CommandPool {
    device: Device,
    pool: vk::CommandPool,
}

impl CommandPool {
    /// Create a command pool for the given queue family.
    pub fn new(device: Device, queue_family_index: u32) -> VulkanResult<Self> {
        let create_info =
            vk::CommandPoolCreateInfo::builder().queue_family_index(queue_family_index);

        let pool = unsafe {
            device
                .create_command_pool(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        Ok(Self { device, pool })
    }

    /// Allocate a single primary command buffer.
    pub fn allocate_primary(&self) -> VulkanResult<vk::CommandBuffer> {
        let alloc_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        let buffers = unsafe {
            self.device
                .allocate_command_buffers(&alloc_info)
                .map_err(VulkanError::Api)?
        };
        Ok(buffers[0])
    }

    /// Return a command buffer to the pool.
    pub fn free(&self, command_buffer: vk::CommandBuffer) {
        unsafe {
            self.device
                .free_command_buffers(self.pool, &[command_buffer]);
        }
    }

    /// Command pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            // All command buffers must have finished before the pool
            // goes away; destroying the pool frees them.
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}
