//! Device-local texture upload
//!
//! Pixels go host → staging buffer → device-local image via a one-shot
//! command buffer with explicit layout-transition barriers on either
//! side of the copy. The upload blocks on a dedicated fence; it runs
//! once at startup, not per frame.

use ash::{vk, Device, Instance};

use crate::assets::ImageData;
use crate::render::vulkan::buffer::{find_memory_type_index, StagingBuffer};
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::context::{VulkanError, VulkanResult};
use crate::render::vulkan::sync::Fence;

const TEXTURE_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

/// Sampled 2D texture: image, backing memory, view, sampler.
pub struct Texture {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    sampler: vk::Sampler,
    extent: vk::Extent2D,
}

impl Texture {
    /// Upload decoded RGBA8 pixels into a new device-local image.
    ///
    /// The staging write is bounds-checked before any GPU object is
    /// created, so an oversized image is rejected without side
    /// effects. The wait on the upload fence is bounded by
    /// `timeout_ns`.
    pub fn upload(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        command_pool: &CommandPool,
        graphics_queue: vk::Queue,
        staging: &StagingBuffer,
        image_data: &ImageData,
        timeout_ns: u64,
    ) -> VulkanResult<Self> {
        staging.write(&image_data.data)?;

        let extent = vk::Extent2D {
            width: image_data.width,
            height: image_data.height,
        };

        let image_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(1)
            .array_layers(1)
            .format(TEXTURE_FORMAT)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::SAMPLED)
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe {
            device
                .create_image(&image_info, None)
                .map_err(VulkanError::Api)?
        };

        let requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let memory_type_index = find_memory_type_index(
            requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            &memory_properties,
        )
        .ok_or_else(|| {
            log::error!("no device-local memory type for texture");
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
                .bind_image_memory(image, memory, 0)
                .map_err(VulkanError::Api)?;
        }

        Self::record_and_submit_upload(
            &device,
            command_pool,
            graphics_queue,
            staging.handle(),
            image,
            extent,
            timeout_ns,
        )?;

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(TEXTURE_FORMAT)
            .subresource_range(color_subresource_range());

        let view = unsafe {
            device
                .create_image_view(&view_info, None)
                .map_err(VulkanError::Api)?
        };

        let sampler_info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(false)
            .max_anisotropy(1.0)
            .border_color(vk::BorderColor::INT_OPAQUE_BLACK)
            .unnormalized_coordinates(false)
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR);

        let sampler = unsafe {
            device
                .create_sampler(&sampler_info, None)
                .map_err(VulkanError::Api)?
        };

        log::info!("uploaded texture {}x{}", extent.width, extent.height);

        Ok(Self {
            device,
            image,
            memory,
            view,
            sampler,
            extent,
        })
    }

    /// One-shot command buffer: barrier to TRANSFER_DST, buffer→image
    /// copy, barrier to SHADER_READ_ONLY, then a fenced submit the
    /// caller blocks on.
    fn record_and_submit_upload(
        device: &Device,
        command_pool: &CommandPool,
        graphics_queue: vk::Queue,
        staging_buffer: vk::Buffer,
        image: vk::Image,
        extent: vk::Extent2D,
        timeout_ns: u64,
    ) -> VulkanResult<()> {
        let cmd = command_pool.allocate_primary()?;

        let result = (|| {
            let begin_info = vk::CommandBufferBeginInfo::builder()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            unsafe {
                device
                    .begin_command_buffer(cmd, &begin_info)
                    .map_err(VulkanError::Api)?;
            }

            let to_transfer = vk::ImageMemoryBarrier::builder()
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .src_access_mask(vk::AccessFlags::empty())
                .dst_access_mask(vk::AccessFlags::TRANSFER_WRITE);

            unsafe {
                device.cmd_pipeline_barrier(
                    cmd,
                    vk::PipelineStageFlags::TOP_OF_PIPE,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[to_transfer.build()],
                );
            }

            let region = vk::BufferImageCopy::builder()
                .buffer_offset(0)
                .buffer_row_length(0)
                .buffer_image_height(0)
                .image_subresource(vk::ImageSubresourceLayers {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    mip_level: 0,
                    base_array_layer: 0,
                    layer_count: 1,
                })
                .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                .image_extent(vk::Extent3D {
                    width: extent.width,
                    height: extent.height,
                    depth: 1,
                });

            unsafe {
                device.cmd_copy_buffer_to_image(
                    cmd,
                    staging_buffer,
                    image,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    &[region.build()],
                );
            }

            let to_shader_read = vk::ImageMemoryBarrier::builder()
                .old_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                .new_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(color_subresource_range())
                .src_access_mask(vk::AccessFlags::TRANSFER_WRITE)
                .dst_access_mask(vk::AccessFlags::SHADER_READ);

            unsafe {
                device.cmd_pipeline_barrier(
                    cmd,
                    vk::PipelineStageFlags::TRANSFER,
                    vk::PipelineStageFlags::FRAGMENT_SHADER,
                    vk::DependencyFlags::empty(),
                    &[],
                    &[],
                    &[to_shader_read.build()],
                );
            }

            unsafe {
                device.end_command_buffer(cmd).map_err(VulkanError::Api)?;
            }

            let upload_fence = Fence::new(device.clone(), false)?;
            let command_buffers = [cmd];
            let submit_info = vk::SubmitInfo::builder().command_buffers(&command_buffers);

            unsafe {
                device
                    .queue_submit(graphics_queue, &[submit_info.build()], upload_fence.handle())
                    .map_err(VulkanError::Api)?;
            }

            upload_fence.wait(timeout_ns)
        })();

        command_pool.free(cmd);
        result
    }

    /// Image view for descriptor binding.
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Sampler for descriptor binding.
    pub fn sampler(&self) -> vk::Sampler {
        self.sampler
    }

    /// Texture dimensions.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

fn color_subresource_range() -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level: 0,
        level_count: 1,
        base_array_layer: 0,
        layer_count: 1,
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
            self.device.destroy_image_view(self.view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}
