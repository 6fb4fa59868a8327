//! Per-level simulation - the frame loop.
//!
//! One [`Simulation::tick`] is one frame, run to completion in a fixed
//! order:
//!
//! 1. countdown timer (pause short-circuits the whole tick)
//! 2. moving platforms
//! 3. character motor (reads input, commits movement, clears edges)
//! 4. physics step
//! 5. transform sync and fall check
//! 6. hazards and pickups
//! 7. camera
//!
//! The frame loop registration is cancelled before anything is released,
//! so no tick can ever run against a torn-down world.

use crystalrun_physics::PhysicsWorld;
use glam::Vec3;

use crate::camera::{CameraRig, LookInput};
use crate::config::GameConfig;
use crate::error::LevelError;
use crate::hazards::{HazardLayer, LayerReport, LevelEvents};
use crate::input::InputState;
use crate::level::Level;
use crate::motor::{CharacterMotor, MotorStep, PlayerTransform, MAX_TICK};
use crate::platforms::MovingPlatform;
use crate::timer::{CountdownTimer, TimerTick};

/// Registration of a simulation with the host's frame scheduler.
#[derive(Debug, Clone, Default)]
pub struct FrameLoop {
    registered: bool,
    frames: u64,
}

impl FrameLoop {
    pub fn register(&mut self) {
        self.registered = true;
        log::debug!("frame loop registered");
    }

    /// Stop scheduling frames. Idempotent.
    pub fn cancel(&mut self) {
        if self.registered {
            self.registered = false;
            log::debug!("frame loop cancelled after {} frames", self.frames);
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub transform: PlayerTransform,
    /// `None` when the motor skipped the tick.
    pub motor: Option<MotorStep>,
    pub layer: LayerReport,
    /// The player fell out of the level and was put back at the spawn.
    pub respawned: bool,
    pub time_left: f32,
}

/// Result of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Running(FrameReport),
    /// Gameplay frozen; the last transform is still published.
    Paused(PlayerTransform),
    /// Every pickup collected this frame. The loop is now cancelled.
    Completed(FrameReport),
    /// The timer ran out this frame. The loop is now cancelled.
    Failed,
    /// The loop is no longer registered; nothing ran.
    Stopped,
}

/// Final numbers of a finished level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSummary {
    pub level_id: String,
    pub collected: u32,
    pub total: u32,
    pub frames: u64,
    pub time_left: f32,
}

/// A running level.
#[derive(Debug)]
pub struct Simulation {
    // Declared first so it is cancelled before the world goes away
    frame_loop: FrameLoop,

    level_id: String,
    fall_limit: f32,
    config: GameConfig,

    world: PhysicsWorld,
    motor: CharacterMotor,
    layer: HazardLayer,
    platforms: Vec<MovingPlatform>,
    camera: CameraRig,
    timer: CountdownTimer,
}

impl Simulation {
    /// Build the level into a fresh physics world and start its loop.
    pub fn new(config: GameConfig, level: &Level) -> Result<Self, LevelError> {
        let mut world = PhysicsWorld::new();

        let mut platforms = Vec::new();
        for obstacle in &level.obstacles {
            if let Some(platform) = obstacle.register(&mut world)?.platform {
                platforms.push(platform);
            }
        }

        let mut layer = HazardLayer::new(config.layer.clone());
        for position in &level.pickups {
            layer.add_pickup(&mut world, *position)?;
        }
        for hazard in &level.hazards {
            layer.add_hazard(&mut world, hazard)?;
        }
        for pad in &level.jump_pads {
            layer.add_jump_pad(&mut world, pad)?;
        }
        for zone in &level.slow_zones {
            layer.add_slow_zone(&mut world, zone)?;
        }

        let mut motor = CharacterMotor::new(config.motor.clone(), config.controller.clone());
        motor.attach(&mut world, level.spawn)?;

        let mut camera = CameraRig::new(config.camera.clone());
        camera.snap_to(motor.state().position);

        let mut timer = CountdownTimer::new();
        timer.start(level.timer_secs.unwrap_or(config.timer.duration_secs));

        let mut frame_loop = FrameLoop::default();
        frame_loop.register();

        log::info!(
            "level '{}' built: {} colliders, {} pickups, {} moving platforms",
            level.id,
            world.collider_count(),
            layer.total_pickups(),
            platforms.len()
        );

        Ok(Self {
            frame_loop,
            level_id: level.id.clone(),
            fall_limit: level.fall_limit,
            config,
            world,
            motor,
            layer,
            platforms,
            camera,
            timer,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn motor(&self) -> &CharacterMotor {
        &self.motor
    }

    pub fn layer(&self) -> &HazardLayer {
        &self.layer
    }

    pub fn platforms(&self) -> &[MovingPlatform] {
        &self.platforms
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn frame_loop(&self) -> &FrameLoop {
        &self.frame_loop
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_registered()
    }

    /// Pause or resume. Returns whether the game is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.timer.toggle_pause()
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Run one frame.
    pub fn tick(
        &mut self,
        input: &mut InputState,
        events: &mut dyn LevelEvents,
    ) -> Result<TickOutcome, LevelError> {
        if !self.frame_loop.is_registered() {
            return Ok(TickOutcome::Stopped);
        }
        // Every system shares the step the motor integrates
        let dt = self.config.delta_time().min(MAX_TICK);

        if self.timer.is_paused() {
            // Presses made while paused don't fire on resume
            input.reset_just_pressed();
            input.take_look_delta();
            return Ok(TickOutcome::Paused(self.motor.transform()));
        }

        if self.timer.advance(dt) == TimerTick::Expired {
            log::info!("level '{}' failed: out of time", self.level_id);
            self.frame_loop.cancel();
            return Ok(TickOutcome::Failed);
        }

        // Movers settle before the character queries
        for platform in &mut self.platforms {
            platform.update(&mut self.world, dt)?;
        }

        let look = LookInput {
            drag: input.take_look_delta(),
            keys: input.snapshot().look_axes(),
        };
        let motor = self
            .motor
            .update(&mut self.world, input, self.camera.heading(), dt)?;

        self.world.step(dt);
        let mut transform = self
            .motor
            .sync_transform(&self.world)
            .unwrap_or_else(|| self.motor.transform());

        let respawned = transform.position.y < self.fall_limit;
        if respawned {
            log::info!("player fell below {:.1}, respawning", self.fall_limit);
            self.motor.respawn(&mut self.world)?;
            transform = self.motor.transform();
            self.camera.snap_to(transform.position);
        }

        let layer = self
            .layer
            .update(dt, &mut self.motor, &mut self.world, events)?;

        self.camera.update(self.motor.state().position, look, dt);

        self.frame_loop.frames += 1;
        let report = FrameReport {
            frame: self.frame_loop.frames,
            transform,
            motor,
            layer,
            respawned,
            time_left: self.timer.remaining(),
        };

        if layer.completed {
            log::info!(
                "level '{}' complete with {:.1}s left",
                self.level_id,
                self.timer.remaining()
            );
            self.timer.stop();
            self.frame_loop.cancel();
            return Ok(TickOutcome::Completed(report));
        }

        Ok(TickOutcome::Running(report))
    }

    /// Stop the loop, then release the level's physics objects.
    pub fn teardown(mut self) -> LevelSummary {
        self.frame_loop.cancel();
        self.timer.stop();

        let summary = LevelSummary {
            level_id: self.level_id.clone(),
            collected: self.layer.collected(),
            total: self.layer.total_pickups(),
            frames: self.frame_loop.frames(),
            time_left: self.timer.remaining(),
        };

        self.motor.detach(&mut self.world);
        self.world.clear();
        log::info!("level '{}' unloaded", summary.level_id);
        summary
    }

    /// Player feet position.
    pub fn player_position(&self) -> Vec3 {
        self.motor.state().position
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazards::NoEvents;
    use crate::input::Action;
    use crate::motor::MovementBasis;
    use crate::obstacle::Obstacle;
    use crystalrun_physics::{ColliderShape, QueryFilter};

    fn quiet_level() -> Level {
        let mut level = Level::new("test", "Test", Vec3::new(0.0, 1.0, 0.0));
        level.add_block(Vec3::new(0.0, -0.5, 0.0), Vec3::new(20.0, 0.5, 20.0));
        level.add_pickup(Vec3::new(15.0, 1.0, 15.0));
        level
    }

    fn run(sim: &mut Simulation, input: &mut InputState, ticks: usize) {
        for _ in 0..ticks {
            sim.tick(input, &mut NoEvents).unwrap();
        }
    }

    #[test]
    fn test_fall_scenario_through_the_loop() {
        let mut level = quiet_level();
        level.spawn = Vec3::new(0.0, 10.0, 0.0);
        let mut sim = level.build(&GameConfig::default()).unwrap();
        let mut input = InputState::default();

        run(&mut sim, &mut input, 120);

        let state = sim.motor().state();
        assert!(state.is_grounded);
        assert_eq!(state.vertical_velocity, 0.0);
        assert!(state.position.y.abs() < 0.03, "feet y={}", state.position.y);
        assert_eq!(sim.frame_loop().frames(), 120);
    }

    #[test]
    fn test_forward_moves_away_from_camera() {
        let mut sim = quiet_level().build(&GameConfig::default()).unwrap();
        let mut input = InputState::default();
        run(&mut sim, &mut input, 10);
        let start = sim.player_position();

        input.press(Action::Forward);
        run(&mut sim, &mut input, 60);

        // Follow camera sits at +Z looking toward -Z
        let moved = sim.player_position() - start;
        assert!(moved.z < -4.0, "moved {moved:?}");
        assert!(moved.x.abs() < 0.05);
    }

    #[test]
    fn test_completion_cancels_loop() {
        let mut level = quiet_level();
        level.pickups = vec![Vec3::new(0.5, 1.0, 0.0), Vec3::new(0.0, 1.0, 0.9)];
        let mut sim = level.build(&GameConfig::default()).unwrap();
        let mut input = InputState::default();

        let outcome = sim.tick(&mut input, &mut NoEvents).unwrap();
        let TickOutcome::Completed(report) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(report.layer.pickups_collected, 2);
        assert!(!sim.is_running());
        assert_eq!(sim.tick(&mut input, &mut NoEvents).unwrap(), TickOutcome::Stopped);
        assert_eq!(sim.frame_loop().frames(), 1);

        let summary = sim.teardown();
        assert_eq!(summary.collected, 2);
        assert_eq!(summary.total, 2);
    }

    #[test]
    fn test_timer_expiry_fails_and_stops() {
        let level = quiet_level().with_timer(0.5);
        let mut sim = level.build(&GameConfig::default()).unwrap();
        let mut input = InputState::default();

        let mut ticks = 0;
        loop {
            ticks += 1;
            match sim.tick(&mut input, &mut NoEvents).unwrap() {
                TickOutcome::Running(_) => {}
                TickOutcome::Failed => break,
                other => panic!("unexpected {other:?}"),
            }
            assert!(ticks < 100);
        }
        assert!((29..=32).contains(&ticks), "failed after {ticks} ticks");

        // The world is still alive but nothing steps it any more
        let steps = sim.world().step_count();
        for _ in 0..10 {
            assert_eq!(sim.tick(&mut input, &mut NoEvents).unwrap(), TickOutcome::Stopped);
        }
        assert_eq!(sim.world().step_count(), steps);

        let summary = sim.teardown();
        assert_eq!(summary.time_left, 0.0);
        assert_eq!(summary.collected, 0);
    }

    #[test]
    fn test_pause_freezes_gameplay_and_drops_presses() {
        let mut sim = quiet_level().build(&GameConfig::default()).unwrap();
        let mut input = InputState::default();
        run(&mut sim, &mut input, 30);
        let before = *sim.motor().state();
        let time = sim.timer().remaining();

        assert!(sim.toggle_pause());
        input.press(Action::Jump);
        for _ in 0..30 {
            let outcome = sim.tick(&mut input, &mut NoEvents).unwrap();
            assert!(matches!(outcome, TickOutcome::Paused(_)));
        }
        assert_eq!(*sim.motor().state(), before);
        assert_eq!(sim.timer().remaining(), time);
        assert!(!input.just_pressed(Action::Jump));

        // Holding jump through the resume does not jump
        assert!(!sim.toggle_pause());
        run(&mut sim, &mut input, 5);
        assert!(sim.motor().state().is_grounded);
    }

    #[test]
    fn test_fall_out_respawns() {
        let mut level = Level::new("void", "Void", Vec3::new(0.0, 1.0, 0.0));
        level.fall_limit = -5.0;
        level.add_pickup(Vec3::new(50.0, 0.0, 0.0));
        let mut sim = level.build(&GameConfig::default()).unwrap();
        let mut input = InputState::default();

        let mut respawned = false;
        for _ in 0..120 {
            if let TickOutcome::Running(report) = sim.tick(&mut input, &mut NoEvents).unwrap() {
                respawned |= report.respawned;
            }
        }
        assert!(respawned);
        assert!(sim.player_position().y > -5.0);
    }

    #[test]
    fn test_platform_collider_follows_and_carries() {
        let mut level = Level::new("ferry", "Ferry", Vec3::new(0.0, 1.2, 0.0));
        level.add_obstacle(Obstacle::moving_block(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, -20.0),
            3.0,
            Vec3::new(1.5, 0.25, 1.5),
        ));
        level.add_pickup(Vec3::new(50.0, 0.0, 0.0));
        let config = GameConfig {
            motor: crate::motor::MotorConfig {
                movement_basis: MovementBasis::World,
                ..Default::default()
            },
            ..GameConfig::default()
        };
        let mut sim = level.build(&config).unwrap();
        let mut input = InputState::default();

        run(&mut sim, &mut input, 120);

        // Platform travelled 6 m; the player rode along and stands on it
        let platform = sim.platforms()[0].position();
        assert!((platform.z + 6.0).abs() < 0.1, "platform at {platform:?}");
        let feet = sim.player_position();
        assert!(sim.motor().state().is_grounded);
        assert!((feet.y - 0.25).abs() < 0.05, "feet {feet:?}");
        assert!((feet.z - platform.z).abs() < 1.0, "left behind at {feet:?}");

        // Old spot is free, new spot is solid
        let probe = ColliderShape::capsule(0.9, 0.5);
        let filter = QueryFilter::solid();
        assert!(!sim.world().intersects(Vec3::new(0.0, 0.5, 0.0), &probe, filter));
        assert!(sim.world().intersects(platform, &ColliderShape::ball(0.1), filter));
    }

    #[test]
    fn test_stays_grounded_on_descending_platform() {
        let mut level = Level::new("lift", "Lift", Vec3::new(0.0, 1.6, 0.0));
        level.add_obstacle(Obstacle::moving_block(
            Vec3::ZERO,
            Vec3::new(0.0, -6.0, 0.0),
            2.0,
            Vec3::new(1.5, 0.25, 1.5),
        ));
        level.add_pickup(Vec3::new(50.0, 0.0, 0.0));
        let config = GameConfig {
            motor: crate::motor::MotorConfig {
                movement_basis: MovementBasis::World,
                ..Default::default()
            },
            ..GameConfig::default()
        };
        let mut sim = level.build(&config).unwrap();
        let mut input = InputState::default();

        // Down for 180 ticks, then back up
        let mut landed_at = None;
        for frame in 0..300 {
            sim.tick(&mut input, &mut NoEvents).unwrap();
            let grounded = sim.motor().state().is_grounded;
            match landed_at {
                None if grounded => landed_at = Some(frame),
                None => {}
                Some(first) => {
                    assert!(grounded, "airborne at frame {frame}, landed at {first}");
                    let top = sim.platforms()[0].position().y + 0.25;
                    let feet = sim.player_position().y;
                    assert!((feet - top).abs() < 0.06, "feet {feet} over top {top}");
                }
            }
        }
        assert!(landed_at.is_some_and(|frame| frame < 60), "landed at {landed_at:?}");
    }

    #[test]
    fn test_long_ticks_are_clamped_for_every_system() {
        let mut level = quiet_level();
        level.add_obstacle(Obstacle::moving_block(
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, -20.0),
            1.0,
            Vec3::splat(0.5),
        ));
        let config = GameConfig {
            tick_rate: 5,
            ..GameConfig::default()
        };
        let mut sim = level.build(&config).unwrap();
        let mut input = InputState::default();

        run(&mut sim, &mut input, 1);

        let elapsed = config.timer.duration_secs - sim.timer().remaining();
        assert!((elapsed - 0.066).abs() < 1e-4, "timer advanced {elapsed}");
        let platform = sim.platforms()[0].position();
        assert!((platform.z + 0.066).abs() < 1e-4, "platform at {platform:?}");
    }

    #[test]
    fn test_determinism() {
        let script: Vec<(bool, bool, bool)> = (0..240)
            .map(|i| (i % 2 == 0, i % 3 == 0, i % 40 == 0))
            .collect();

        let play = || {
            let mut sim = Level::demo_course().build(&GameConfig::default()).unwrap();
            let mut input = InputState::default();
            for &(forward, right, jump) in &script {
                for (action, down) in [(Action::Forward, forward), (Action::Right, right), (Action::Jump, jump)] {
                    if down {
                        input.press(action);
                    } else {
                        input.release(action);
                    }
                }
                sim.tick(&mut input, &mut NoEvents).unwrap();
            }
            (*sim.motor().state(), sim.camera().position())
        };

        let (first, camera_a) = play();
        let (second, camera_b) = play();
        assert_eq!(first, second);
        assert_eq!(camera_a, camera_b);
    }
}
