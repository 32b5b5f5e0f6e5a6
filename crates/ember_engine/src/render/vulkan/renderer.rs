//! Renderer construction and the per-frame submission protocol
//!
//! Construction runs the full setup chain once: context → swapchain →
//! render pass → framebuffers → pipeline → texture upload → sync
//! objects. Each frame then performs a strictly sequential
//! acquire → record → submit → wait → present → reclaim cycle with a
//! single frame in flight. A failed frame drains the queue, reclaims
//! its command buffer, and rebuilds the sync objects before returning
//! the error. `render_frame` is not reentrant.

use ash::vk;

use crate::assets::ResourceLoader;
use crate::config::RendererConfig;
use crate::render::vulkan::buffer::{StagingBuffer, STAGING_BUFFER_SIZE};
use crate::render::vulkan::commands::CommandPool;
use crate::render::vulkan::context::{VulkanContext, VulkanError, VulkanResult};
use crate::render::vulkan::descriptor::{
    write_texture_descriptor, DescriptorPool, DescriptorSetLayout,
};
use crate::render::vulkan::framebuffer::Framebuffer;
use crate::render::vulkan::pipeline::{GraphicsPipeline, ShaderModule};
use crate::render::vulkan::render_pass::RenderPass;
use crate::render::vulkan::swapchain::Swapchain;
use crate::render::vulkan::sync::FrameSync;
use crate::render::vulkan::texture::Texture;
use crate::render::window::Window;

/// The screen quad is two triangles generated in the vertex shader.
const QUAD_VERTEX_COUNT: u32 = 6;

/// The Vulkan renderer.
///
/// Field order is teardown order: dependents first, the context (and
/// with it device and instance) last. `drop` waits for the device to
/// go idle before any of that starts.
pub struct VulkanRenderer {
    frame_sync: FrameSync,
    command_pool: CommandPool,
    descriptor_pool: DescriptorPool,
    descriptor_set: vk::DescriptorSet,
    set_layout: DescriptorSetLayout,
    texture: Texture,
    staging: StagingBuffer,
    pipeline: GraphicsPipeline,
    framebuffers: Vec<Framebuffer>,
    render_pass: RenderPass,
    swapchain: Swapchain,
    context: VulkanContext,
    clear_color: [f32; 4],
    gpu_timeout_ns: u64,
}

impl VulkanRenderer {
    /// Build the complete rendering context against a window.
    /// Acquisition is monotonic; the first failure aborts construction
    /// and everything built so far unwinds through its own drop.
    pub fn new(
        window: &mut Window,
        config: &RendererConfig,
        resources: &ResourceLoader,
    ) -> VulkanResult<Self> {
        let context = VulkanContext::new(window, "Ember Engine")?;
        let device = context.device_handle();

        let (fb_width, fb_height) = window.framebuffer_size();
        let swapchain = Swapchain::new(
            context.instance(),
            device.clone(),
            context.surface,
            &context.surface_loader,
            &context.physical_device,
            vk::Extent2D {
                width: fb_width,
                height: fb_height,
            },
        )?;

        let render_pass = RenderPass::new_present_pass(device.clone(), swapchain.format().format)?;

        let framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| {
                Framebuffer::new(
                    device.clone(),
                    render_pass.handle(),
                    &[view],
                    swapchain.extent(),
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let set_layout = DescriptorSetLayout::sampled_texture(device.clone())?;

        let pipeline = {
            let vertex_bytes = resources
                .read_shader(&config.vertex_shader)
                .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
            let fragment_bytes = resources
                .read_shader(&config.fragment_shader)
                .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
            let vertex_shader = ShaderModule::from_bytes(device.clone(), &vertex_bytes)?;
            let fragment_shader = ShaderModule::from_bytes(device.clone(), &fragment_bytes)?;
            // Modules drop at the end of this block; the pipeline
            // keeps no reference to them.
            GraphicsPipeline::new(
                device.clone(),
                render_pass.handle(),
                &vertex_shader,
                &fragment_shader,
                set_layout.handle(),
            )?
        };

        let command_pool = CommandPool::new(device.clone(), context.graphics_family())?;

        let staging = StagingBuffer::new(
            device.clone(),
            context.instance(),
            context.physical_device.device,
            STAGING_BUFFER_SIZE,
        )?;

        let image_data = resources
            .load_image(&config.texture)
            .map_err(|e| VulkanError::InitializationFailed(e.to_string()))?;
        let texture = Texture::upload(
            device.clone(),
            context.instance(),
            context.physical_device.device,
            &command_pool,
            context.graphics_queue(),
            &staging,
            &image_data,
            config.gpu_timeout_ns,
        )?;

        let descriptor_pool = DescriptorPool::new(device.clone(), 1)?;
        let descriptor_set = descriptor_pool.allocate(&[set_layout.handle()])?[0];
        write_texture_descriptor(&device, descriptor_set, texture.view(), texture.sampler());

        let frame_sync = FrameSync::new(device)?;

        log::info!("renderer initialized");

        Ok(Self {
            frame_sync,
            command_pool,
            descriptor_pool,
            descriptor_set,
            set_layout,
            texture,
            staging,
            pipeline,
            framebuffers,
            render_pass,
            swapchain,
            context,
            clear_color: config.clear_color,
            gpu_timeout_ns: config.gpu_timeout_ns,
        })
    }

    /// Run one frame: acquire → record → submit → wait → present →
    /// reclaim. Errors are returned for the caller to report; a failed
    /// frame re-synchronizes on the way out, so the renderer stays
    /// usable for the next frame.
    pub fn render_frame(&mut self) -> VulkanResult<()> {
        // Acquire. On failure the semaphore was not signaled and
        // nothing has been allocated yet.
        let (image_index, _suboptimal) = unsafe {
            self.swapchain
                .loader()
                .acquire_next_image(
                    self.swapchain.handle(),
                    self.gpu_timeout_ns,
                    self.frame_sync.acquire.handle(),
                    vk::Fence::null(),
                )
                .map_err(|e| match e {
                    vk::Result::TIMEOUT => VulkanError::Timeout(self.gpu_timeout_ns),
                    other => VulkanError::Api(other),
                })?
        };

        // The acquire semaphore is now signaled. Every failure from
        // here on goes through recovery: the command buffer must be
        // reclaimed, and a binary semaphore left signaled with nothing
        // waiting on it would make the next frame's acquire invalid.
        if let Err(e) = validate_image_index(image_index, self.framebuffers.len() as u32) {
            self.recover_after_failed_frame(None);
            return Err(e);
        }

        let cmd = match self.command_pool.allocate_primary() {
            Ok(cmd) => cmd,
            Err(e) => {
                self.recover_after_failed_frame(None);
                return Err(e);
            }
        };

        if let Err(e) = self.submit_and_present(cmd, image_index) {
            self.recover_after_failed_frame(Some(cmd));
            return Err(e);
        }

        // Reclaim: safe now, the fence wait proved execution finished.
        self.command_pool.free(cmd);

        Ok(())
    }

    /// Record, submit, fence-wait, and present for the acquired image.
    fn submit_and_present(&self, cmd: vk::CommandBuffer, image_index: u32) -> VulkanResult<()> {
        let device = &self.context.device.device;

        // Record
        self.record_commands(cmd, image_index)?;

        // Submit
        self.frame_sync.in_flight.reset()?;

        let wait_semaphores = [self.frame_sync.acquire.handle()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [cmd];
        let signal_semaphores = [self.frame_sync.submit_complete.handle()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            device
                .queue_submit(
                    self.context.graphics_queue(),
                    &[submit_info.build()],
                    self.frame_sync.in_flight.handle(),
                )
                .map_err(VulkanError::Api)?;
        }

        // Wait: the command buffer and swapchain image must not be
        // reused while the GPU still owns them.
        self.frame_sync.in_flight.wait(self.gpu_timeout_ns)?;

        // Present
        let swapchains = [self.swapchain.handle()];
        let image_indices = [image_index];
        let present_wait = [self.frame_sync.submit_complete.handle()];
        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&present_wait)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        unsafe {
            self.swapchain
                .loader()
                .queue_present(self.context.graphics_queue(), &present_info)
                .map_err(VulkanError::Api)?;
        }

        Ok(())
    }

    /// A failed frame can leave the GPU mid-execution, a command
    /// buffer unreclaimed, and a binary semaphore signaled with
    /// nothing waiting on it. Drain the queue, free the buffer, and
    /// rebuild the sync objects so the next frame starts unsignaled.
    fn recover_after_failed_frame(&mut self, cmd: Option<vk::CommandBuffer>) {
        unsafe {
            // The buffer and semaphores may still be owned by
            // in-flight work (e.g. after a fence timeout).
            let _ = self.context.device.device.device_wait_idle();
        }
        if let Some(cmd) = cmd {
            self.command_pool.free(cmd);
        }
        match FrameSync::new(self.context.device_handle()) {
            Ok(sync) => self.frame_sync = sync,
            Err(e) => log::error!("failed to rebuild frame sync objects: {e}"),
        }
    }

    /// Record the frame's commands against the framebuffer for the
    /// acquired image index.
    fn record_commands(&self, cmd: vk::CommandBuffer, image_index: u32) -> VulkanResult<()> {
        let device = &self.context.device.device;
        let extent = self.swapchain.extent();

        let begin_info =
            vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            device
                .begin_command_buffer(cmd, &begin_info)
                .map_err(VulkanError::Api)?;
        }

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];
        let render_pass_begin = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass.handle())
            .framebuffer(self.framebuffers[image_index as usize].handle())
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            device.cmd_begin_render_pass(cmd, &render_pass_begin, vk::SubpassContents::INLINE);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: extent.width as f32,
                height: extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            };
            device.cmd_set_viewport(cmd, 0, &[viewport]);
            device.cmd_set_scissor(cmd, 0, &[scissor]);

            device.cmd_bind_pipeline(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.handle(),
            );
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline.layout(),
                0,
                &[self.descriptor_set],
                &[],
            );
            device.cmd_draw(cmd, QUAD_VERTEX_COUNT, 1, 0, 0);

            device.cmd_end_render_pass(cmd);
            device.end_command_buffer(cmd).map_err(VulkanError::Api)?;
        }

        Ok(())
    }

    /// Number of swapchain images the renderer cycles through.
    pub fn image_count(&self) -> u32 {
        self.swapchain.image_count()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        unsafe {
            // Nothing may be destroyed while the GPU is still working.
            let _ = self.context.device.device.device_wait_idle();
        }
        // Fields drop in declaration order: sync objects and pools
        // first, swapchain next, the context (device, instance) last.
    }
}

/// Every per-image array is indexed by the acquired image index; an
/// index past the image count would read the wrong frame's resources.
fn validate_image_index(index: u32, image_count: u32) -> VulkanResult<()> {
    if index >= image_count {
        return Err(VulkanError::ImageIndexOutOfRange { index, image_count });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_index_must_stay_in_range() {
        // Round-robin acquire over a 2-image swapchain stays valid
        // for any number of cycles.
        for frame in 0..10u32 {
            assert!(validate_image_index(frame % 2, 2).is_ok());
        }
        assert!(validate_image_index(2, 2).is_err());
        assert!(validate_image_index(0, 0).is_err());
    }
}
