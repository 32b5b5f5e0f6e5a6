//! Window management using GLFW
//!
//! Provides window creation, event polling, and Vulkan surface
//! creation. Resizing is disabled; the swapchain is built once.

use thiserror::Error;

/// Window management errors.
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW itself failed to initialize.
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be created.
    #[error("window creation failed")]
    CreationFailed,

    /// Any other GLFW-reported failure.
    #[error("GLFW error: {0}")]
    Glfw(String),
}

/// Result type for window operations.
pub type WindowResult<T> = Result<T, WindowError>;

/// GLFW window wrapper.
pub struct Window {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    width: u32,
    height: u32,
}

impl Window {
    /// Create a fixed-size window configured for Vulkan rendering.
    pub fn new(title: &str, width: u32, height: u32) -> WindowResult<Self> {
        let mut glfw =
            glfw::init(glfw::fail_on_errors).map_err(|_| WindowError::InitializationFailed)?;

        // No OpenGL context; Vulkan is hooked up separately.
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        // Resizing would invalidate the swapchain, which is built once.
        glfw.window_hint(glfw::WindowHint::Resizable(false));

        let (mut window, events) = glfw
            .create_window(width, height, title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);

        log::info!("window created ({width}x{height})");

        Ok(Self {
            glfw,
            window,
            events,
            width,
            height,
        })
    }

    /// Whether the user has requested the window to close.
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Poll pending window events. Call once per main-loop iteration.
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
        for (_, event) in glfw::flush_messages(&self.events) {
            if let glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) = event {
                self.window.set_should_close(true);
            }
        }
    }

    /// Configured window width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Configured window height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Framebuffer size in pixels, which is what the swapchain wants.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width as u32, height as u32)
    }

    /// Vulkan instance extensions GLFW needs for surface creation.
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or_else(|| WindowError::Glfw("failed to get required extensions".to_string()))
    }

    /// Create a Vulkan surface for this window.
    pub fn create_vulkan_surface(
        &mut self,
        instance: ash::vk::Instance,
    ) -> WindowResult<ash::vk::SurfaceKHR> {
        let mut surface = ash::vk::SurfaceKHR::null();
        let result = self
            .window
            .create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == ash::vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::Glfw(format!(
                "failed to create Vulkan surface: {result:?}"
            )))
        }
    }
}
