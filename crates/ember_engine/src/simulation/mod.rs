//! Toy falling-particle simulation
//!
//! A fixed-capacity buffer of axis-aligned squares pulled down by
//! gravity, clamped at the floor, and nudged apart when they overlap.
//! Single-owner, single-writer: the engine ticks it once per frame and
//! the renderer may read the entity buffer for draw parameters.

use nalgebra::Vector2;

/// Hard cap on the entity buffer. Spawns past this are dropped.
pub const MAX_ENTITIES: usize = 1000;

/// Downward displacement applied to every entity per tick.
const GRAVITY: f32 = 0.5;

/// Position and size of one simulated square.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Top-left corner in window coordinates.
    pub position: Vector2<f32>,
    /// Width and height of the square.
    pub size: Vector2<f32>,
}

impl Transform {
    /// Build a transform from scalar position and size.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            position: Vector2::new(x, y),
            size: Vector2::new(width, height),
        }
    }
}

/// One simulated entity.
#[derive(Debug, Clone, Copy)]
pub struct Entity {
    /// The entity's transform.
    pub transform: Transform,
}

/// The particle simulation and its entity buffer.
pub struct Simulation {
    entities: Vec<Entity>,
    bounds: Vector2<f32>,
}

impl Simulation {
    /// Create an empty simulation confined to `bounds`
    /// (window width/height).
    pub fn new(bounds: Vector2<f32>) -> Self {
        Self {
            entities: Vec::with_capacity(MAX_ENTITIES),
            bounds,
        }
    }

    /// Append an entity. At capacity the entity is dropped and an
    /// error is logged; the simulation keeps running.
    pub fn spawn(&mut self, transform: Transform) -> Option<usize> {
        if self.entities.len() >= MAX_ENTITIES {
            log::error!("entity limit reached ({MAX_ENTITIES}), dropping spawn");
            return None;
        }
        self.entities.push(Entity { transform });
        Some(self.entities.len() - 1)
    }

    /// Advance the simulation one tick: gravity, floor clamp, then
    /// pairwise overlap resolution.
    pub fn update(&mut self) {
        let floor = self.bounds.y;
        for i in 0..self.entities.len() {
            let t = &mut self.entities[i].transform;
            t.position.y += GRAVITY;
            if t.position.y >= floor - t.size.y {
                t.position.y = floor - t.size.y;
            }

            for j in 0..self.entities.len() {
                if i == j {
                    continue;
                }
                if overlaps(&self.entities[i], &self.entities[j]) {
                    // Push the upper entity up and the lower one down.
                    if self.entities[i].transform.position.y
                        < self.entities[j].transform.position.y
                    {
                        self.entities[i].transform.position.y -= GRAVITY;
                        self.entities[j].transform.position.y += GRAVITY;
                    } else {
                        self.entities[i].transform.position.y += GRAVITY;
                        self.entities[j].transform.position.y -= GRAVITY;
                    }
                }
            }
        }
    }

    /// Read-only view of the entity buffer, the interface point for
    /// per-entity draw parameters.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

/// Axis-aligned bounding-box overlap test.
fn overlaps(a: &Entity, b: &Entity) -> bool {
    let (ap, asz) = (a.transform.position, a.transform.size);
    let (bp, bsz) = (b.transform.position, b.transform.size);
    ap.x < bp.x + bsz.x && ap.x + asz.x > bp.x && ap.y < bp.y + bsz.y && ap.y + asz.y > bp.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn simulation() -> Simulation {
        Simulation::new(Vector2::new(1280.0, 720.0))
    }

    #[test]
    fn spawn_past_capacity_drops_entity() {
        let mut sim = simulation();
        for i in 0..MAX_ENTITIES {
            assert_eq!(sim.spawn(Transform::new(i as f32, 0.0, 10.0, 10.0)), Some(i));
        }
        assert_eq!(sim.spawn(Transform::new(0.0, 0.0, 10.0, 10.0)), None);
        assert_eq!(sim.entity_count(), MAX_ENTITIES);
    }

    #[test]
    fn gravity_pulls_entities_down() {
        let mut sim = simulation();
        sim.spawn(Transform::new(100.0, 100.0, 10.0, 10.0));

        sim.update();
        assert_relative_eq!(sim.entities()[0].transform.position.y, 100.5);

        sim.update();
        assert_relative_eq!(sim.entities()[0].transform.position.y, 101.0);
    }

    #[test]
    fn floor_clamps_position() {
        let mut sim = simulation();
        sim.spawn(Transform::new(100.0, 709.8, 10.0, 10.0));

        sim.update();
        assert_relative_eq!(sim.entities()[0].transform.position.y, 710.0);

        // Stays put once resting on the floor.
        sim.update();
        assert_relative_eq!(sim.entities()[0].transform.position.y, 710.0);
    }

    #[test]
    fn overlapping_entities_separate_vertically() {
        let mut sim = simulation();
        sim.spawn(Transform::new(100.0, 100.0, 10.0, 10.0));
        sim.spawn(Transform::new(100.0, 105.0, 10.0, 10.0));

        sim.update();

        // The upper entity was nudged back up against gravity, the
        // lower one pushed further down.
        let y0 = sim.entities()[0].transform.position.y;
        let y1 = sim.entities()[1].transform.position.y;
        assert!(y0 < y1);
        assert!(y1 - y0 > 5.0);
    }

    #[test]
    fn non_overlapping_entities_fall_independently() {
        let mut sim = simulation();
        sim.spawn(Transform::new(0.0, 0.0, 10.0, 10.0));
        sim.spawn(Transform::new(500.0, 0.0, 10.0, 10.0));

        sim.update();
        assert_relative_eq!(sim.entities()[0].transform.position.y, 0.5);
        assert_relative_eq!(sim.entities()[1].transform.position.y, 0.5);
    }
}
