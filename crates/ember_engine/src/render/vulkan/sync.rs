//! Synchronization primitives for the single frame in flight
//!
//! Two binary semaphores order GPU work (acquire → draw → present) and
//! one fence lets the CPU wait for submission to finish before reusing
//! the command buffer. Every CPU-side wait is bounded; a timeout comes
//! back as an error rather than stalling the process.

use ash::{vk, Device};

use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// GPU-side ordering signal between queue operations.
pub struct Semaphore {
    device: Device,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Create a binary semaphore.
    pub fn new(device: Device) -> VulkanResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe {
            device
                .create_semaphore(&create_info, None)
                .map_err(VulkanError::Api)?
        };
        Ok(Self { device, semaphore })
    }

    /// Semaphore handle.
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_semaphore(self.semaphore, None);
        }
    }
}

/// CPU-observable GPU-completion signal.
pub struct Fence {
    device: Device,
    fence: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally already signaled.
    pub fn new(device: Device, signaled: bool) -> VulkanResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);
        let fence = unsafe {
            device
                .create_fence(&create_info, None)
                .map_err(VulkanError::Api)?
        };
        Ok(Self { device, fence })
    }

    /// Block until the fence signals or `timeout_ns` elapses. A
    /// timeout is reported as [`VulkanError::Timeout`].
    pub fn wait(&self, timeout_ns: u64) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.fence], true, timeout_ns)
                .map_err(|e| match e {
                    vk::Result::TIMEOUT => VulkanError::Timeout(timeout_ns),
                    other => VulkanError::Api(other),
                })
        }
    }

    /// Return the fence to the unsignaled state.
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .reset_fences(&[self.fence])
                .map_err(VulkanError::Api)
        }
    }

    /// Fence handle.
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.fence, None);
        }
    }
}

/// Synchronization objects for the one frame in flight.
pub struct FrameSync {
    /// Signaled when the acquired swapchain image is ready.
    pub acquire: Semaphore,
    /// Signaled when submitted commands finish executing.
    pub submit_complete: Semaphore,
    /// CPU wait handle for the same submission.
    pub in_flight: Fence,
}

impl FrameSync {
    /// Create the per-frame synchronization objects. The fence starts
    /// unsignaled; it is reset before each submit and waited on after.
    pub fn new(device: Device) -> VulkanResult<Self> {
        let acquire = Semaphore::new(device.clone())?;
        let submit_complete = Semaphore::new(device.clone())?;
        let in_flight = Fence::new(device, false)?;

        Ok(Self {
            acquire,
            submit_complete,
            in_flight,
        })
    }
}
