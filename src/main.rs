//! Crystalrun - headless runner.
//!
//! Plays the shipped levels with a simple autopilot that walks toward the
//! nearest remaining pickup, and logs what happens. Pass a RON config path
//! as the first argument to override the defaults. `RUST_LOG=debug` shows
//! jumps, pads and knockbacks.

use anyhow::{Context, Result};
use crystalrun_game::{
    Action, Campaign, GameConfig, InputState, Level, LevelEvents, LevelPhase, Simulation,
};
use glam::Vec3;

/// Safety stop for a level the autopilot can't finish (frames).
const MAX_FRAMES_PER_LEVEL: u32 = 60 * 600;

/// Distance below which an axis counts as reached.
const STEER_DEADZONE: f32 = 0.3;

/// Logs HUD events.
#[derive(Default)]
struct Hud {
    collected: u32,
}

impl LevelEvents for Hud {
    fn on_pickup_collected(&mut self, count: u32) {
        self.collected += 1;
        log::info!("HUD: {count} collected");
    }

    fn on_all_collected(&mut self) {
        log::info!("HUD: level clear!");
    }
}

/// Hold the keys that steer toward the nearest pickup, jumping now and then.
fn autopilot(simulation: &Simulation, input: &mut InputState, frame: u32) {
    let position = simulation.player_position();
    let target = simulation
        .layer()
        .pickups()
        .iter()
        .filter(|p| !p.collected)
        .map(|p| p.position)
        .min_by(|a, b| a.distance(position).total_cmp(&b.distance(position)));

    let Some(target) = target else {
        input.release_all();
        return;
    };

    // Steer in camera space: forward is the camera heading, right is its cross with up
    let heading = simulation.camera().heading().unwrap_or(Vec3::NEG_Z);
    let right = heading.cross(Vec3::Y);
    let to_target = target - position;
    let forward_amount = to_target.dot(heading);
    let right_amount = to_target.dot(right);

    let set = |input: &mut InputState, action: Action, down: bool| {
        if down {
            input.press(action);
        } else {
            input.release(action);
        }
    };
    set(input, Action::Forward, forward_amount > STEER_DEADZONE);
    set(input, Action::Back, forward_amount < -STEER_DEADZONE);
    set(input, Action::Right, right_amount > STEER_DEADZONE);
    set(input, Action::Left, right_amount < -STEER_DEADZONE);
    set(input, Action::Jump, to_target.y > 1.0 && frame % 30 == 0);
}

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(&path).with_context(|| format!("loading config {path}"))?,
        None => GameConfig::default(),
    };

    let levels = vec![Level::flat_arena(), Level::demo_course()];
    let mut campaign = Campaign::new(levels, config).context("creating campaign")?;
    let mut input = InputState::default();
    let mut hud = Hud::default();

    campaign.load().context("loading first level")?;

    loop {
        let mut frame = 0;
        let phase = loop {
            let Some(simulation) = campaign.simulation() else {
                break campaign.phase();
            };
            autopilot(simulation, &mut input, frame);

            let phase = campaign.frame(&mut input, &mut hud)?;
            frame += 1;
            if phase != LevelPhase::Active || frame >= MAX_FRAMES_PER_LEVEL {
                break phase;
            }
        };

        input.release_all();
        let phase = match phase {
            LevelPhase::Complete => campaign.continue_on()?,
            LevelPhase::Failed => campaign.quit()?,
            LevelPhase::Active => {
                log::warn!("giving up on level {} after {frame} frames", campaign.level_index());
                break;
            }
            other => other,
        };
        if phase == LevelPhase::Finished {
            break;
        }
    }

    for summary in campaign.summaries() {
        println!(
            "{}: {}/{} pickups in {} frames, {:.1}s left",
            summary.level_id, summary.collected, summary.total, summary.frames, summary.time_left
        );
    }
    println!("pickups this session: {}", hud.collected);
    Ok(())
}
