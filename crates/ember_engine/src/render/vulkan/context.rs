//! Vulkan context: instance, adapter selection, logical device
//!
//! Construction is monotonic: instance → surface → physical device →
//! logical device, each step failing the whole build. Teardown runs in
//! reverse via field drop order plus explicit `Drop` impls.

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::{Surface, Swapchain as SwapchainLoader};
use ash::{vk, Device, Entry, Instance};
use std::ffi::{CStr, CString};
use thiserror::Error;

use crate::render::window::Window;

/// Vulkan-specific error types.
#[derive(Error, Debug)]
pub enum VulkanError {
    /// General Vulkan API error with result code.
    #[error("Vulkan API error: {0:?}")]
    Api(vk::Result),

    /// Context initialization failed outside of a raw API call.
    #[error("initialization failed: {0}")]
    InitializationFailed(String),

    /// No physical device supports Vulkan.
    #[error("no GPU with Vulkan support found")]
    NoAdapter,

    /// The selected adapter exposes no graphics-capable queue family.
    #[error("no queue family with graphics support")]
    NoGraphicsQueueFamily,

    /// No memory type satisfies an allocation's requirements.
    #[error("no suitable memory type found")]
    NoSuitableMemoryType,

    /// A host-to-staging copy would not fit the staging buffer.
    #[error("staging buffer overflow: {requested} bytes into a {capacity}-byte buffer")]
    StagingOverflow {
        /// Bytes the caller asked to copy.
        requested: u64,
        /// Declared staging-buffer capacity.
        capacity: u64,
    },

    /// A bounded GPU wait expired before the GPU signaled.
    #[error("GPU wait timed out after {0} ns")]
    Timeout(u64),

    /// The swapchain returned an image index past its own image count.
    #[error("acquired image index {index} out of range for {image_count} swapchain images")]
    ImageIndexOutOfRange {
        /// Index returned by the acquire call.
        index: u32,
        /// Number of images the swapchain holds.
        image_count: u32,
    },
}

/// Result type for Vulkan operations.
pub type VulkanResult<T> = Result<T, VulkanError>;

const VALIDATION_LAYER: &str = "VK_LAYER_KHRONOS_validation";

/// Vulkan instance with optional validation messenger.
pub struct VulkanInstance {
    /// Vulkan entry point.
    pub entry: Entry,
    /// Vulkan instance handle.
    pub instance: Instance,
    debug_utils: Option<DebugUtils>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl VulkanInstance {
    /// Create an instance with the window's required extensions, the
    /// Khronos validation layer when available, and a debug messenger
    /// routing validation output into the logger.
    pub fn new(window: &Window, app_name: &str) -> VulkanResult<Self> {
        let entry = unsafe { Entry::load() }.map_err(|e| {
            VulkanError::InitializationFailed(format!("failed to load Vulkan: {e:?}"))
        })?;

        let app_name_cstr = CString::new(app_name).unwrap();
        let engine_name_cstr = CString::new("EmberEngine").unwrap();
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name_cstr)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(&engine_name_cstr)
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let required_extensions = window.required_instance_extensions().map_err(|e| {
            VulkanError::InitializationFailed(format!("failed to get required extensions: {e}"))
        })?;
        let cstr_extensions: Vec<CString> = required_extensions
            .iter()
            .map(|ext| CString::new(ext.as_str()).unwrap())
            .collect();
        let mut extensions: Vec<*const i8> =
            cstr_extensions.iter().map(|ext| ext.as_ptr()).collect();

        // Requesting an absent extension or layer fails instance
        // creation, so probe first. Missing debug utils only costs
        // the messenger, not the renderer.
        let debug_utils_available = Self::debug_utils_available(&entry)?;
        if debug_utils_available {
            extensions.push(DebugUtils::name().as_ptr());
        } else {
            log::warn!("VK_EXT_debug_utils not available, validation output disabled");
        }

        let validation_available = Self::validation_layer_available(&entry)?;
        let layer_name = CString::new(VALIDATION_LAYER).unwrap();
        let layer_ptrs: Vec<*const i8> = if validation_available {
            vec![layer_name.as_ptr()]
        } else {
            log::warn!("{VALIDATION_LAYER} not available, validation disabled");
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layer_ptrs);

        let instance = unsafe {
            entry
                .create_instance(&create_info, None)
                .map_err(VulkanError::Api)?
        };

        // Messenger absence is a warning, not fatal.
        let (debug_utils, debug_messenger) = if debug_utils_available {
            let debug_utils = DebugUtils::new(&entry, &instance);
            match Self::create_debug_messenger(&debug_utils) {
                Ok(messenger) => (Some(debug_utils), Some(messenger)),
                Err(e) => {
                    log::warn!("debug messenger unavailable: {e}");
                    (None, None)
                }
            }
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    fn debug_utils_available(entry: &Entry) -> VulkanResult<bool> {
        let extensions = entry
            .enumerate_instance_extension_properties(None)
            .map_err(VulkanError::Api)?;
        Ok(extensions.iter().any(|ext| {
            let name = unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) };
            name == DebugUtils::name()
        }))
    }

    fn validation_layer_available(entry: &Entry) -> VulkanResult<bool> {
        let layers = entry
            .enumerate_instance_layer_properties()
            .map_err(VulkanError::Api)?;
        Ok(layers.iter().any(|layer| {
            let name = unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) };
            name.to_string_lossy() == VALIDATION_LAYER
        }))
    }

    fn create_debug_messenger(
        debug_utils: &DebugUtils,
    ) -> VulkanResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
            )
            .pfn_user_callback(Some(debug_callback));

        unsafe {
            debug_utils
                .create_debug_utils_messenger(&create_info, None)
                .map_err(VulkanError::Api)
        }
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) =
                (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Validation-layer messages land in the logger under the `vulkan`
/// target, mapped onto ordinary log levels.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!(target: "vulkan", "{message_type:?} - {message}");
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!(target: "vulkan", "{message_type:?} - {message}");
    } else {
        log::debug!(target: "vulkan", "{message_type:?} - {message}");
    }

    vk::FALSE
}

/// Select the lowest-indexed queue family advertising graphics support.
pub fn select_graphics_family(families: &[vk::QueueFamilyProperties]) -> Option<u32> {
    families
        .iter()
        .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
        .map(|index| index as u32)
}

/// Selected physical adapter and its graphics queue family.
pub struct PhysicalDeviceInfo {
    /// Physical device handle.
    pub device: vk::PhysicalDevice,
    /// Device properties (name, limits).
    pub properties: vk::PhysicalDeviceProperties,
    /// Index of the graphics-capable queue family.
    pub graphics_family: u32,
}

impl PhysicalDeviceInfo {
    /// Pick an adapter: the first one, with a warning when several are
    /// present (single-GPU assumption, no ranking). Fails hard when no
    /// adapter or no graphics-capable queue family exists.
    pub fn select(instance: &Instance) -> VulkanResult<Self> {
        let devices = unsafe {
            instance
                .enumerate_physical_devices()
                .map_err(VulkanError::Api)?
        };

        if devices.is_empty() {
            log::error!("no GPU with Vulkan support found");
            return Err(VulkanError::NoAdapter);
        }
        if devices.len() > 1 {
            log::warn!(
                "{} physical devices available, using the first",
                devices.len()
            );
        }
        let device = devices[0];

        let properties = unsafe { instance.get_physical_device_properties(device) };
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(device) };

        let graphics_family = select_graphics_family(&queue_families).ok_or_else(|| {
            log::error!("selected GPU has no graphics-capable queue family");
            VulkanError::NoGraphicsQueueFamily
        })?;

        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy() };
        log::info!("selected GPU: {name} (graphics queue family {graphics_family})");

        Ok(Self {
            device,
            properties,
            graphics_family,
        })
    }
}

/// Logical device exposing one graphics queue.
pub struct LogicalDevice {
    /// Device handle.
    pub device: Device,
    /// The single graphics queue.
    pub graphics_queue: vk::Queue,
    /// Queue family the graphics queue belongs to.
    pub graphics_family: u32,
}

impl LogicalDevice {
    /// Create the device with exactly one queue from the graphics
    /// family and the swapchain extension enabled.
    pub fn new(instance: &Instance, physical_device: &PhysicalDeviceInfo) -> VulkanResult<Self> {
        let queue_priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(physical_device.graphics_family)
            .queue_priorities(&queue_priorities)
            .build()];

        let required_extensions = [SwapchainLoader::name().as_ptr()];
        let device_features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&required_extensions)
            .enabled_features(&device_features);

        let device = unsafe {
            instance
                .create_device(physical_device.device, &create_info, None)
                .map_err(VulkanError::Api)?
        };

        let graphics_queue =
            unsafe { device.get_device_queue(physical_device.graphics_family, 0) };

        Ok(Self {
            device,
            graphics_queue,
            graphics_family: physical_device.graphics_family,
        })
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_device(None);
        }
    }
}

/// Core Vulkan resources: instance, surface, adapter, device.
///
/// Field order matters: `device` drops before `instance`, and the
/// surface is destroyed in `drop` before either.
pub struct VulkanContext {
    /// Presentation surface bound to the window.
    pub surface: vk::SurfaceKHR,
    /// Surface extension loader.
    pub surface_loader: Surface,
    /// Selected physical adapter.
    pub physical_device: PhysicalDeviceInfo,
    /// Logical device and its graphics queue.
    pub device: LogicalDevice,
    /// Instance and validation messenger.
    pub instance: VulkanInstance,
}

impl VulkanContext {
    /// Build the context against a window.
    pub fn new(window: &mut Window, app_name: &str) -> VulkanResult<Self> {
        let instance = VulkanInstance::new(window, app_name)?;

        let surface_loader = Surface::new(&instance.entry, &instance.instance);
        let surface = window
            .create_vulkan_surface(instance.instance.handle())
            .map_err(|e| VulkanError::InitializationFailed(format!("surface creation: {e}")))?;

        let physical_device = PhysicalDeviceInfo::select(&instance.instance)?;
        let device = LogicalDevice::new(&instance.instance, &physical_device)?;

        Ok(Self {
            surface,
            surface_loader,
            physical_device,
            device,
            instance,
        })
    }

    /// The ash instance.
    pub fn instance(&self) -> &Instance {
        &self.instance.instance
    }

    /// A clone of the device handle for RAII wrappers to own.
    pub fn device_handle(&self) -> Device {
        self.device.device.clone()
    }

    /// The graphics queue.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.device.graphics_queue
    }

    /// The graphics queue family index.
    pub fn graphics_family(&self) -> u32 {
        self.device.graphics_family
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device.device_wait_idle();
            self.surface_loader.destroy_surface(self.surface, None);
        }
        // Remaining fields drop in declaration order: device before
        // instance, so nothing outlives the instance.
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    #[test]
    fn selects_lowest_graphics_family() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
            family(vk::QueueFlags::GRAPHICS),
        ];
        assert_eq!(select_graphics_family(&families), Some(1));
    }

    #[test]
    fn graphics_only_family_at_index_zero() {
        let families = [family(vk::QueueFlags::GRAPHICS)];
        assert_eq!(select_graphics_family(&families), Some(0));
    }

    #[test]
    fn no_graphics_family_is_none() {
        let families = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::COMPUTE),
        ];
        assert_eq!(select_graphics_family(&families), None);
    }

    #[test]
    fn empty_family_list_is_none() {
        assert_eq!(select_graphics_family(&[]), None);
    }
}
