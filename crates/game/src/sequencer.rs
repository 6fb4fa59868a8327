//! Level sequencing.
//!
//! ```text
//!            Loaded            AllCollected
//! Loading ──────────▶ Active ─────────────▶ Complete ──┐ Unload
//!    ▲                  │                              ▼
//!    │                  │ TimerExpired             Unloading ──▶ Finished
//!    │                  ▼                              │  (no next level)
//!    │               Failed ───────────────────────────┤
//!    │                      Retry / Unload             │
//!    └──────────────────────────────────────────────────┘
//!                     Unloaded (next or same level)
//! ```
//!
//! [`LevelSequencer`] is the pure state machine. [`Campaign`] drives it:
//! building simulations on `Loading`, ticking them while `Active` and
//! tearing them down on `Unloading`.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::error::LevelError;
use crate::hazards::LevelEvents;
use crate::input::InputState;
use crate::level::Level;
use crate::simulation::{LevelSummary, Simulation, TickOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelPhase {
    Loading,
    Active,
    Complete,
    Failed,
    Unloading,
    /// No levels left, or the player gave up.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelEvent {
    /// The level's simulation is built and running.
    Loaded,
    AllCollected,
    TimerExpired,
    /// Leave a failed level and play it again.
    Retry,
    /// Leave the current level: on to the next after a win, quit after a loss.
    Unload,
    /// The level's resources are released.
    Unloaded,
}

/// State machine over an ordered list of levels.
#[derive(Debug, Clone)]
pub struct LevelSequencer {
    count: usize,
    index: usize,
    phase: LevelPhase,
    /// Level to load once unloading finishes, `None` to finish.
    next: Option<usize>,
}

impl LevelSequencer {
    pub fn new(count: usize) -> Result<Self, LevelError> {
        if count == 0 {
            return Err(LevelError::NoLevels);
        }
        Ok(Self {
            count,
            index: 0,
            phase: LevelPhase::Loading,
            next: None,
        })
    }

    /// Start at a given level instead of the first.
    pub fn starting_at(count: usize, index: usize) -> Result<Self, LevelError> {
        let mut sequencer = Self::new(count)?;
        if index >= count {
            return Err(LevelError::UnknownLevel(index));
        }
        sequencer.index = index;
        Ok(sequencer)
    }

    pub fn phase(&self) -> LevelPhase {
        self.phase
    }

    /// Index of the level being loaded, played or unloaded.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn level_count(&self) -> usize {
        self.count
    }

    /// Apply an event and return the new phase.
    pub fn handle(&mut self, event: LevelEvent) -> Result<LevelPhase, LevelError> {
        use LevelEvent as E;
        use LevelPhase as P;

        let phase = match (self.phase, event) {
            (P::Loading, E::Loaded) => P::Active,
            (P::Active, E::AllCollected) => P::Complete,
            (P::Active, E::TimerExpired) => P::Failed,
            (P::Complete, E::Unload) => {
                self.next = Some(self.index + 1).filter(|&next| next < self.count);
                P::Unloading
            }
            (P::Failed, E::Retry) => {
                self.next = Some(self.index);
                P::Unloading
            }
            (P::Failed, E::Unload) => {
                self.next = None;
                P::Unloading
            }
            (P::Unloading, E::Unloaded) => match self.next.take() {
                Some(next) => {
                    self.index = next;
                    P::Loading
                }
                None => P::Finished,
            },
            (phase, event) => return Err(LevelError::InvalidTransition { phase, event }),
        };

        log::info!(
            "level {}: {:?} --{event:?}--> {phase:?}",
            self.index,
            self.phase
        );
        self.phase = phase;
        Ok(phase)
    }
}

/// Plays a list of levels through the sequencer.
#[derive(Debug)]
pub struct Campaign {
    levels: Vec<Level>,
    config: GameConfig,
    sequencer: LevelSequencer,
    simulation: Option<Simulation>,
    summaries: Vec<LevelSummary>,
}

impl Campaign {
    pub fn new(levels: Vec<Level>, config: GameConfig) -> Result<Self, LevelError> {
        let sequencer = LevelSequencer::new(levels.len())?;
        Ok(Self {
            levels,
            config,
            sequencer,
            simulation: None,
            summaries: Vec::new(),
        })
    }

    pub fn phase(&self) -> LevelPhase {
        self.sequencer.phase()
    }

    pub fn level_index(&self) -> usize {
        self.sequencer.index()
    }

    pub fn current_level(&self) -> Option<&Level> {
        self.levels.get(self.sequencer.index())
    }

    pub fn simulation(&self) -> Option<&Simulation> {
        self.simulation.as_ref()
    }

    pub fn simulation_mut(&mut self) -> Option<&mut Simulation> {
        self.simulation.as_mut()
    }

    /// Summaries of every level unloaded so far, in order.
    pub fn summaries(&self) -> &[LevelSummary] {
        &self.summaries
    }

    /// Build the current level if one is waiting to load.
    pub fn load(&mut self) -> Result<LevelPhase, LevelError> {
        if self.sequencer.phase() != LevelPhase::Loading {
            return Err(LevelError::InvalidTransition {
                phase: self.sequencer.phase(),
                event: LevelEvent::Loaded,
            });
        }
        let index = self.sequencer.index();
        let level = self
            .levels
            .get(index)
            .ok_or(LevelError::UnknownLevel(index))?;
        self.simulation = Some(level.build(&self.config)?);
        self.sequencer.handle(LevelEvent::Loaded)
    }

    /// Run one frame of the active level.
    pub fn frame(
        &mut self,
        input: &mut InputState,
        events: &mut dyn LevelEvents,
    ) -> Result<LevelPhase, LevelError> {
        if self.sequencer.phase() != LevelPhase::Active {
            return Ok(self.sequencer.phase());
        }
        let simulation = self.simulation.as_mut().ok_or(LevelError::TornDown)?;
        match simulation.tick(input, events)? {
            TickOutcome::Completed(_) => self.sequencer.handle(LevelEvent::AllCollected),
            TickOutcome::Failed => self.sequencer.handle(LevelEvent::TimerExpired),
            TickOutcome::Running(_) | TickOutcome::Paused(_) | TickOutcome::Stopped => {
                Ok(self.sequencer.phase())
            }
        }
    }

    /// After a win: go to the next level, or finish after the last one.
    pub fn continue_on(&mut self) -> Result<LevelPhase, LevelError> {
        self.leave(LevelEvent::Unload)
    }

    /// After a loss: play the same level again.
    pub fn retry(&mut self) -> Result<LevelPhase, LevelError> {
        self.leave(LevelEvent::Retry)
    }

    /// After a loss: stop playing.
    pub fn quit(&mut self) -> Result<LevelPhase, LevelError> {
        self.leave(LevelEvent::Unload)
    }

    /// Unload the current level and load whatever comes next.
    fn leave(&mut self, event: LevelEvent) -> Result<LevelPhase, LevelError> {
        self.sequencer.handle(event)?;

        // Teardown cancels the frame loop before releasing the world
        if let Some(simulation) = self.simulation.take() {
            self.summaries.push(simulation.teardown());
        }

        match self.sequencer.handle(LevelEvent::Unloaded)? {
            LevelPhase::Loading => self.load(),
            phase => Ok(phase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hazards::NoEvents;
    use glam::Vec3;

    #[test]
    fn test_happy_path_through_two_levels() {
        let mut seq = LevelSequencer::new(2).unwrap();
        assert_eq!(seq.handle(LevelEvent::Loaded).unwrap(), LevelPhase::Active);
        assert_eq!(seq.handle(LevelEvent::AllCollected).unwrap(), LevelPhase::Complete);
        assert_eq!(seq.handle(LevelEvent::Unload).unwrap(), LevelPhase::Unloading);
        assert_eq!(seq.handle(LevelEvent::Unloaded).unwrap(), LevelPhase::Loading);
        assert_eq!(seq.index(), 1);

        seq.handle(LevelEvent::Loaded).unwrap();
        seq.handle(LevelEvent::AllCollected).unwrap();
        seq.handle(LevelEvent::Unload).unwrap();
        assert_eq!(seq.handle(LevelEvent::Unloaded).unwrap(), LevelPhase::Finished);
    }

    #[test]
    fn test_retry_reloads_same_level() {
        let mut seq = LevelSequencer::starting_at(3, 1).unwrap();
        seq.handle(LevelEvent::Loaded).unwrap();
        assert_eq!(seq.handle(LevelEvent::TimerExpired).unwrap(), LevelPhase::Failed);
        seq.handle(LevelEvent::Retry).unwrap();
        assert_eq!(seq.handle(LevelEvent::Unloaded).unwrap(), LevelPhase::Loading);
        assert_eq!(seq.index(), 1);
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        let mut seq = LevelSequencer::new(1).unwrap();
        let err = seq.handle(LevelEvent::AllCollected).unwrap_err();
        assert!(matches!(
            err,
            LevelError::InvalidTransition {
                phase: LevelPhase::Loading,
                event: LevelEvent::AllCollected
            }
        ));
        // State is unchanged after a rejected event
        assert_eq!(seq.phase(), LevelPhase::Loading);

        seq.handle(LevelEvent::Loaded).unwrap();
        seq.handle(LevelEvent::AllCollected).unwrap();
        assert!(seq.handle(LevelEvent::Retry).is_err());
        assert!(seq.handle(LevelEvent::TimerExpired).is_err());
    }

    #[test]
    fn test_empty_and_out_of_range() {
        assert!(matches!(LevelSequencer::new(0), Err(LevelError::NoLevels)));
        assert!(matches!(
            LevelSequencer::starting_at(2, 5),
            Err(LevelError::UnknownLevel(5))
        ));
    }

    fn pickup_at_spawn(id: &str) -> Level {
        let mut level = Level::new(id, id, Vec3::new(0.0, 1.0, 0.0));
        level.add_block(Vec3::new(0.0, -0.5, 0.0), Vec3::new(10.0, 0.5, 10.0));
        level.add_pickup(Vec3::new(0.0, 1.0, 0.0));
        level
    }

    #[test]
    fn test_campaign_plays_levels_in_order() {
        let levels = vec![pickup_at_spawn("first"), pickup_at_spawn("second")];
        let mut campaign = Campaign::new(levels, GameConfig::default()).unwrap();
        let mut input = InputState::default();

        assert_eq!(campaign.load().unwrap(), LevelPhase::Active);
        assert_eq!(campaign.frame(&mut input, &mut NoEvents).unwrap(), LevelPhase::Complete);
        // Frames after completion are no-ops
        assert_eq!(campaign.frame(&mut input, &mut NoEvents).unwrap(), LevelPhase::Complete);

        assert_eq!(campaign.continue_on().unwrap(), LevelPhase::Active);
        assert_eq!(campaign.current_level().unwrap().id, "second");

        campaign.frame(&mut input, &mut NoEvents).unwrap();
        assert_eq!(campaign.continue_on().unwrap(), LevelPhase::Finished);
        assert!(campaign.simulation().is_none());

        let ids: Vec<_> = campaign.summaries().iter().map(|s| s.level_id.as_str()).collect();
        assert_eq!(ids, ["first", "second"]);
    }

    #[test]
    fn test_campaign_retry_after_timeout() {
        let mut level = pickup_at_spawn("timed");
        level.pickups = vec![Vec3::new(9.0, 1.0, 9.0)];
        let level = level.with_timer(0.1);
        let mut campaign = Campaign::new(vec![level], GameConfig::default()).unwrap();
        let mut input = InputState::default();
        campaign.load().unwrap();

        let mut phase = LevelPhase::Active;
        for _ in 0..20 {
            phase = campaign.frame(&mut input, &mut NoEvents).unwrap();
        }
        assert_eq!(phase, LevelPhase::Failed);
        assert!(!campaign.simulation().unwrap().is_running());

        assert_eq!(campaign.retry().unwrap(), LevelPhase::Active);
        assert!(campaign.simulation().unwrap().is_running());
        assert_eq!(campaign.summaries().len(), 1);

        for _ in 0..20 {
            campaign.frame(&mut input, &mut NoEvents).unwrap();
        }
        assert_eq!(campaign.quit().unwrap(), LevelPhase::Finished);
    }
}
