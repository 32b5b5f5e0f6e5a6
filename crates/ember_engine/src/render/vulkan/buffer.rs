//! Buffer allocation and the long-lived staging buffer
//!
//! The staging buffer is host-visible, host-coherent, and persistently
//! mapped for its entire lifetime. Copies into it are bounds-checked
//! and fail loudly instead of overflowing.

use ash::{vk, Device, Instance};

use crate::render::vulkan::context::{VulkanError, VulkanResult};

/// Default staging capacity, sized generously for startup uploads.
pub const STAGING_BUFFER_SIZE: vk::DeviceSize = 10 * 1024 * 1024;

/// Find the lowest-indexed memory type whose bit is set in
/// `type_bits` and whose property flags contain `required`.
pub fn find_memory_type_index(
    type_bits: u32,
    required: vk::MemoryPropertyFlags,
    properties: &vk::PhysicalDeviceMemoryProperties,
) -> Option<u32> {
    (0..properties.memory_type_count).find(|&i| {
        (type_bits & (1 << i)) != 0
            && properties.memory_types[i as usize]
                .property_flags
                .contains(required)
    })
}

/// Reject copies that do not leave headroom in the destination.
fn check_copy_bounds(requested: vk::DeviceSize, capacity: vk::DeviceSize) -> VulkanResult<()> {
    if requested >= capacity {
        log::error!("rejected staging copy of {requested} bytes into a {capacity}-byte buffer");
        return Err(VulkanError::StagingOverflow {
            requested,
            capacity,
        });
    }
    Ok(())
}

/// Host-visible staging buffer with a persistent mapping.
pub struct StagingBuffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    mapped: *mut u8,
}

impl StagingBuffer {
    /// Allocate and persistently map a transfer-source buffer.
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
    ) -> VulkanResult<Self> {
        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(vk::BufferUsageFlags::TRANSFER_SRC)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe {
            device
                .create_buffer(&buffer_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };

        let memory_type_index = find_memory_type_index(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &memory_properties,
        )
        .ok_or_else(|| {
            log::error!("no host-visible memory type for the staging buffer");
            VulkanError::NoSuitableMemoryType
        })?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe {
            device
                .allocate_memory(&alloc_info, None)
                .map_err(VulkanError::Api)?
        };

        unsafe {
            device
                .bind_buffer_memory(buffer, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        // Mapped once here, unmapped only on drop.
        let mapped = unsafe {
            device
                .map_memory(memory, 0, size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        } as *mut u8;

        Ok(Self {
            device,
            buffer,
            memory,
            size,
            mapped,
        })
    }

    /// Copy `data` into the start of the buffer. Fails loudly without
    /// writing anything when the data does not fit or the buffer has
    /// no mapping.
    pub fn write(&self, data: &[u8]) -> VulkanResult<()> {
        check_copy_bounds(data.len() as vk::DeviceSize, self.size)?;
        if self.mapped.is_null() {
            log::error!("staging buffer has no mapped pointer");
            return Err(VulkanError::InitializationFailed(
                "staging buffer is not mapped".to_string(),
            ));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), self.mapped, data.len());
        }
        Ok(())
    }

    /// Buffer handle.
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Declared capacity in bytes.
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for StagingBuffer {
    fn drop(&mut self) {
        unsafe {
            self.device.unmap_memory(self.memory);
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_table(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: flags.len() as u32,
            ..Default::default()
        };
        for (i, &property_flags) in flags.iter().enumerate() {
            properties.memory_types[i] = vk::MemoryType {
                property_flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn picks_lowest_matching_type() {
        let table = memory_table(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);
        let found = find_memory_type_index(
            0b111,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &table,
        );
        assert_eq!(found, Some(1));
    }

    #[test]
    fn respects_type_bits_mask() {
        let table = memory_table(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        ]);
        // Bit 0 masked out: only type 1 is compatible.
        let found =
            find_memory_type_index(0b10, vk::MemoryPropertyFlags::DEVICE_LOCAL, &table);
        assert_eq!(found, Some(1));
    }

    #[test]
    fn superset_flags_satisfy_request() {
        let table = memory_table(&[
            vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT
                | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);
        let found =
            find_memory_type_index(0b1, vk::MemoryPropertyFlags::HOST_VISIBLE, &table);
        assert_eq!(found, Some(0));
    }

    #[test]
    fn no_match_is_none() {
        let table = memory_table(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
        ]);
        let found = find_memory_type_index(
            0b11,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            &table,
        );
        assert_eq!(found, None);
    }

    #[test]
    fn copy_bounds_reject_at_capacity() {
        assert!(check_copy_bounds(10, 10).is_err());
        assert!(check_copy_bounds(11, 10).is_err());
        assert!(check_copy_bounds(9, 10).is_ok());
    }
}
