//! Level definitions.
//!
//! A [`Level`] is plain data: spawn point, obstacles and the entities the
//! hazard layer watches. [`Level::build`] turns it into a running
//! [`Simulation`] with its own physics world.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::{ConfigError, LevelError};
use crate::hazards::{HazardDef, JumpPadDef, SlowZoneDef, Spin, SpinAxis};
use crate::obstacle::{EntityShape, Obstacle, Transform};
use crate::simulation::Simulation;

fn default_fall_limit() -> f32 {
    -20.0
}

/// A playable level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Level identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Where the player's body center starts.
    pub spawn: Vec3,

    /// Falling below this height respawns the player.
    #[serde(default = "default_fall_limit")]
    pub fall_limit: f32,

    /// Countdown length, `None` uses the configured default.
    #[serde(default)]
    pub timer_secs: Option<f32>,

    #[serde(default)]
    pub obstacles: Vec<Obstacle>,

    /// Pickup positions.
    #[serde(default)]
    pub pickups: Vec<Vec3>,

    #[serde(default)]
    pub hazards: Vec<HazardDef>,

    #[serde(default)]
    pub jump_pads: Vec<JumpPadDef>,

    #[serde(default)]
    pub slow_zones: Vec<SlowZoneDef>,
}

impl Level {
    /// Create an empty level.
    pub fn new(id: &str, name: &str, spawn: Vec3) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            spawn,
            fall_limit: default_fall_limit(),
            timer_secs: None,
            obstacles: Vec::new(),
            pickups: Vec::new(),
            hazards: Vec::new(),
            jump_pads: Vec::new(),
            slow_zones: Vec::new(),
        }
    }

    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(source)?)
    }

    /// Build a simulation for this level.
    pub fn build(&self, config: &GameConfig) -> Result<Simulation, LevelError> {
        Simulation::new(config.clone(), self)
    }

    // ========================================================================
    // Builders
    // ========================================================================

    pub fn with_timer(mut self, secs: f32) -> Self {
        self.timer_secs = Some(secs);
        self
    }

    /// Add a solid box.
    pub fn add_block(&mut self, center: Vec3, half_extents: Vec3) -> &mut Self {
        self.obstacles.push(Obstacle::block(center, half_extents));
        self
    }

    pub fn add_obstacle(&mut self, obstacle: Obstacle) -> &mut Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn add_pickup(&mut self, position: Vec3) -> &mut Self {
        self.pickups.push(position);
        self
    }

    pub fn add_jump_pad(&mut self, position: Vec3, force: f32) -> &mut Self {
        self.jump_pads.push(JumpPadDef { position, force });
        self
    }

    pub fn add_slow_zone(&mut self, center: Vec3, half_extents: Vec3, speed_factor: f32) -> &mut Self {
        self.slow_zones.push(SlowZoneDef {
            shape: EntityShape::Aabb { half_extents },
            transform: Transform::at(center),
            speed_factor,
        });
        self
    }

    // ========================================================================
    // Shipped levels
    // ========================================================================

    /// Walled square floor with a ring of pickups. Handy for tests.
    pub fn flat_arena() -> Self {
        let mut level = Self::new("flat_arena", "Flat Arena", Vec3::new(0.0, 1.0, 0.0));
        let size = 25.0;
        let wall_height = 3.0;

        // Floor, top face at y=0
        level.add_block(Vec3::new(0.0, -0.5, 0.0), Vec3::new(size, 0.5, size));

        for (center, half) in [
            (Vec3::new(0.0, wall_height, -size), Vec3::new(size, wall_height, 0.5)),
            (Vec3::new(0.0, wall_height, size), Vec3::new(size, wall_height, 0.5)),
            (Vec3::new(size, wall_height, 0.0), Vec3::new(0.5, wall_height, size)),
            (Vec3::new(-size, wall_height, 0.0), Vec3::new(0.5, wall_height, size)),
        ] {
            level.add_block(center, half);
        }

        for i in 0..4 {
            let angle = i as f32 * FRAC_PI_2;
            level.add_pickup(Vec3::new(angle.sin() * 8.0, 1.0, angle.cos() * 8.0));
        }
        level
    }

    /// The island course: stepping stones, a chain of moving platforms up
    /// to the goal, jump pads, a mud pit and a spinning bar.
    pub fn demo_course() -> Self {
        let mut level = Self::new("island", "Crystal Island", Vec3::new(0.0, 1.5, 0.0));
        level.timer_secs = Some(180.0);

        // Island ground
        level.add_block(Vec3::new(0.0, -0.5, 0.0), Vec3::new(30.0, 0.5, 30.0));

        // Stepping stones up to the lift, each one jump higher
        for (i, top) in [1.2_f32, 2.4, 3.6, 4.8].into_iter().enumerate() {
            let z = -6.0 + 2.0 * i as f32;
            level.add_block(
                Vec3::new(8.0, top / 2.0, z),
                Vec3::new(1.0, top / 2.0, 0.9),
            );
        }

        // Moving platforms: lift, slider, diagonal, shuttle, finale
        let half = |w: f32, d: f32| Vec3::new(w / 2.0, 0.25, d / 2.0);
        for (start, end, speed, size, yaw) in [
            (Vec3::new(8.0, 5.5, 3.0), Vec3::new(8.0, 7.5, 3.0), 1.2, half(3.0, 3.0), 0.0),
            (Vec3::new(12.0, 7.0, 1.0), Vec3::new(16.0, 7.0, 1.0), 1.5, half(3.0, 3.0), FRAC_PI_2),
            (Vec3::new(18.0, 8.2, 4.0), Vec3::new(16.0, 8.2, 6.0), 1.0, half(2.5, 2.5), FRAC_PI_4),
            (Vec3::new(20.0, 9.5, 2.0), Vec3::new(20.0, 9.5, -2.0), 1.3, half(3.0, 3.0), 0.0),
            (Vec3::new(24.0, 10.5, 0.0), Vec3::new(24.0, 12.0, 0.0), 1.8, half(2.8, 2.8), FRAC_PI_3),
        ] {
            level.add_obstacle(Obstacle::moving_block(start, end, speed, size).with_yaw(yaw));
        }

        // Goal platform
        level.add_block(Vec3::new(28.0, 12.5, 0.0), half(5.0, 5.0));

        // Jump pads on the ground and on raised pillars
        level
            .add_jump_pad(Vec3::new(0.0, 0.25, 4.0), 18.0)
            .add_block(Vec3::new(-6.0, 2.5, 10.0), Vec3::new(1.5, 2.5, 1.5))
            .add_jump_pad(Vec3::new(-6.0, 5.25, 10.0), 16.0)
            .add_block(Vec3::new(2.0, 4.0, 17.0), Vec3::new(1.5, 4.0, 1.5))
            .add_jump_pad(Vec3::new(2.0, 8.25, 17.0), 19.0);

        // Mud pit in front of the pillars
        level.add_slow_zone(Vec3::new(-4.0, 0.5, 4.0), Vec3::new(2.5, 1.0, 2.0), 0.04);

        // Knocker bar over the slider
        level.hazards.push(HazardDef {
            position: Vec3::new(18.0, 9.0, 0.0),
            knockback_force: None,
            spin: Some(Spin {
                axis: SpinAxis::X,
                speed: 1.5,
            }),
            half_extents: Vec3::new(0.25, 0.25, 2.0),
        });

        // Crystals
        for position in [
            Vec3::new(8.0, 3.4, -4.0),
            Vec3::new(-6.0, 6.5, 10.0),
            Vec3::new(2.0, 9.5, 17.0),
            Vec3::new(20.0, 10.8, 0.0),
            Vec3::new(28.0, 13.8, 0.0),
        ] {
            level.add_pickup(position);
        }

        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obstacle::ObstacleKind;

    #[test]
    fn test_demo_course_contents() {
        let level = Level::demo_course();
        assert_eq!(level.pickups.len(), 5);
        assert_eq!(level.jump_pads.len(), 3);
        assert_eq!(level.hazards.len(), 1);
        assert_eq!(level.slow_zones.len(), 1);

        let moving = level
            .obstacles
            .iter()
            .filter(|o| matches!(o.kind, ObstacleKind::Moving(_)))
            .count();
        assert_eq!(moving, 5);
    }

    #[test]
    fn test_level_from_ron_uses_defaults() {
        let level = Level::from_ron_str(
            r#"(
                id: "tiny",
                name: "Tiny",
                spawn: (0.0, 1.0, 0.0),
                pickups: [(3.0, 1.0, 0.0)],
            )"#,
        )
        .unwrap();

        assert_eq!(level.id, "tiny");
        assert_eq!(level.fall_limit, -20.0);
        assert_eq!(level.timer_secs, None);
        assert_eq!(level.pickups, vec![Vec3::new(3.0, 1.0, 0.0)]);
        assert!(level.obstacles.is_empty());
    }

    #[test]
    fn test_level_ron_round_trip() {
        let level = Level::demo_course();
        let text = ron::to_string(&level).unwrap();
        assert_eq!(Level::from_ron_str(&text).unwrap(), level);
    }
}
