//! Falling-particles demo
//!
//! Spawns a buffer of particles at random positions, then runs the
//! engine loop: the simulation pulls them down while the renderer
//! draws the textured screen quad each frame.

use ember_engine::simulation::{Transform, MAX_ENTITIES};
use ember_engine::{Engine, EngineConfig};
use rand::Rng;
use std::path::Path;

const CONFIG_PATH: &str = "particles.toml";
const PARTICLE_SIZE: f32 = 10.0;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    ember_engine::foundation::logging::init();

    let config = if Path::new(CONFIG_PATH).exists() {
        log::info!("loading configuration from {CONFIG_PATH}");
        EngineConfig::from_file(CONFIG_PATH)?
    } else {
        log::info!("no {CONFIG_PATH}, using defaults");
        EngineConfig::default()
    };

    let width = config.window.width as f32;
    let height = config.window.height as f32;

    let mut engine = Engine::new(config)?;

    let mut rng = rand::thread_rng();
    for _ in 0..MAX_ENTITIES {
        let x = rng.gen_range(0.0..width);
        let y = rng.gen_range(0.0..height);
        engine
            .simulation_mut()
            .spawn(Transform::new(x, y, PARTICLE_SIZE, PARTICLE_SIZE));
    }
    log::info!("spawned {} particles", engine.simulation().entity_count());

    engine.run();
    Ok(())
}
