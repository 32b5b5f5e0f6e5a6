//! Engine entry point and main loop

use nalgebra::Vector2;
use thiserror::Error;

use crate::assets::ResourceLoader;
use crate::config::EngineConfig;
use crate::foundation::time::Timer;
use crate::render::vulkan::context::VulkanError;
use crate::render::window::{Window, WindowError};
use crate::render::VulkanRenderer;
use crate::simulation::Simulation;

/// Errors that can abort engine construction.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Window creation failed.
    #[error("window creation failed: {0}")]
    Window(#[from] WindowError),

    /// Renderer initialization failed.
    #[error("renderer initialization failed: {0}")]
    Renderer(#[from] VulkanError),
}

/// The engine: one window, one renderer, one simulation.
///
/// The renderer is declared before the window so the presentation
/// surface is destroyed before the window it was created from.
pub struct Engine {
    renderer: VulkanRenderer,
    window: Window,
    simulation: Simulation,
    timer: Timer,
}

impl Engine {
    /// Build the engine from a configuration. Any initialization
    /// failure aborts construction; there is no partially-usable
    /// engine state.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let mut window = Window::new(
            &config.window.title,
            config.window.width,
            config.window.height,
        )?;

        let resources = ResourceLoader::new(&config.resources_root);
        let renderer = VulkanRenderer::new(&mut window, &config.renderer, &resources)?;

        let simulation = Simulation::new(Vector2::new(
            config.window.width as f32,
            config.window.height as f32,
        ));

        Ok(Self {
            renderer,
            window,
            simulation,
            timer: Timer::new(),
        })
    }

    /// The simulation, for spawning entities before `run`.
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.simulation
    }

    /// Read-only access to the simulation.
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Run the main loop until the window is closed. Per-frame render
    /// failures are logged and the loop continues; they do not
    /// terminate the engine.
    pub fn run(&mut self) {
        log::info!("entering main loop");

        while !self.window.should_close() {
            self.window.poll_events();
            self.timer.tick();
            self.simulation.update();

            if let Err(e) = self.renderer.render_frame() {
                log::error!("frame failed: {e}");
            }
        }

        log::info!(
            "main loop exited after {} frames ({:.1} fps average)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );
    }
}
