//! Swapchain negotiation and per-image views
//!
//! The image-count request is `min + 1`, clamped down when the surface
//! reports a nonzero maximum. The count returned with the images is
//! authoritative; images and views always have matching lengths.

use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Instance};

use crate::render::vulkan::context::{PhysicalDeviceInfo, VulkanError, VulkanResult};

/// Preferred presentation format: 8-bit BGRA, sRGB-encoded.
const PREFERRED_FORMAT: vk::Format = vk::Format::B8G8R8A8_SRGB;

/// Request one image more than the minimum, bounded by the maximum
/// when the surface declares one (zero means unbounded).
pub fn negotiate_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let requested = caps.min_image_count + 1;
    if caps.max_image_count != 0 && requested > caps.max_image_count {
        caps.max_image_count
    } else {
        requested
    }
}

/// Pick the preferred surface format, falling back to the first
/// supported one (with a warning) when it is absent. `None` only for
/// an empty format list, which a conformant driver never reports.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    if formats.is_empty() {
        return None;
    }
    Some(
        formats
            .iter()
            .copied()
            .find(|f| f.format == PREFERRED_FORMAT)
            .unwrap_or_else(|| {
                log::warn!(
                    "preferred surface format {PREFERRED_FORMAT:?} unavailable, falling back to {:?}",
                    formats[0].format
                );
                formats[0]
            }),
    )
}

/// Swapchain with its images and views.
pub struct Swapchain {
    device: Device,
    loader: SwapchainLoader,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    image_count: u32,
}

impl Swapchain {
    /// Negotiate and create the swapchain for a surface.
    pub fn new(
        instance: &Instance,
        device: Device,
        surface: vk::SurfaceKHR,
        surface_loader: &Surface,
        physical_device: &PhysicalDeviceInfo,
        window_extent: vk::Extent2D,
    ) -> VulkanResult<Self> {
        let loader = SwapchainLoader::new(instance, &device);

        let caps = unsafe {
            surface_loader
                .get_physical_device_surface_capabilities(physical_device.device, surface)
                .map_err(VulkanError::Api)?
        };
        let formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(physical_device.device, surface)
                .map_err(VulkanError::Api)?
        };

        let format = choose_surface_format(&formats).ok_or_else(|| {
            VulkanError::InitializationFailed("surface reports no formats".to_string())
        })?;

        // The surface dictates the extent unless it leaves it open.
        let extent = if caps.current_extent.width != u32::MAX {
            caps.current_extent
        } else {
            vk::Extent2D {
                width: window_extent.width.clamp(
                    caps.min_image_extent.width,
                    caps.max_image_extent.width,
                ),
                height: window_extent.height.clamp(
                    caps.min_image_extent.height,
                    caps.max_image_extent.height,
                ),
            }
        };

        let requested_count = negotiate_image_count(&caps);

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(requested_count)
            .image_format(format.format)
            .image_color_space(format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(caps.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(vk::PresentModeKHR::FIFO)
            .clipped(true);

        let swapchain = unsafe {
            loader
                .create_swapchain(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        // The driver may return more images than requested; the
        // returned count is authoritative from here on.
        let images = unsafe {
            loader
                .get_swapchain_images(swapchain)
                .map_err(VulkanError::Api)?
        };
        let image_count = images.len() as u32;
        log::info!(
            "swapchain created: {} images, {:?}, {}x{}",
            image_count,
            format.format,
            extent.width,
            extent.height
        );

        let image_views: Result<Vec<_>, _> = images
            .iter()
            .map(|&image| {
                let view_info = vk::ImageViewCreateInfo::builder()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(format.format)
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                unsafe { device.create_image_view(&view_info, None) }
            })
            .collect();
        let image_views = image_views.map_err(VulkanError::Api)?;

        debug_assert_eq!(images.len(), image_views.len());

        Ok(Self {
            device,
            loader,
            swapchain,
            images,
            image_views,
            format,
            extent,
            image_count,
        })
    }

    /// Swapchain extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Negotiated surface format.
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// The presentable images, same length and order as the views.
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One view per swapchain image, same order as the images.
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Swapchain handle.
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    /// Extension loader for acquire/present calls.
    pub fn loader(&self) -> &SwapchainLoader {
        &self.loader
    }

    /// Authoritative image count.
    pub fn image_count(&self) -> u32 {
        self.image_count
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.destroy_image_view(view, None);
            }
            self.loader.destroy_swapchain(self.swapchain, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            ..Default::default()
        }
    }

    fn format(f: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format: f,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn image_count_is_min_plus_one() {
        assert_eq!(negotiate_image_count(&caps(1, 2)), 2);
        assert_eq!(negotiate_image_count(&caps(2, 3)), 3);
    }

    #[test]
    fn image_count_clamps_to_max() {
        assert_eq!(negotiate_image_count(&caps(3, 3)), 3);
    }

    #[test]
    fn zero_max_means_unbounded() {
        assert_eq!(negotiate_image_count(&caps(3, 0)), 4);
    }

    #[test]
    fn preferred_format_wins_when_present() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM),
            format(vk::Format::B8G8R8A8_SRGB),
        ];
        assert_eq!(
            choose_surface_format(&formats).unwrap().format,
            vk::Format::B8G8R8A8_SRGB
        );
    }

    #[test]
    fn falls_back_to_first_supported_format() {
        let formats = [
            format(vk::Format::R8G8B8A8_UNORM),
            format(vk::Format::B8G8R8A8_UNORM),
        ];
        assert_eq!(
            choose_surface_format(&formats).unwrap().format,
            vk::Format::R8G8B8A8_UNORM
        );
    }

    #[test]
    fn empty_format_list_is_none() {
        assert!(choose_surface_format(&[]).is_none());
    }
}
