//! Player input handling.
//!
//! Raw key and mouse events arrive from the host whenever it delivers them,
//! asynchronously to the frame loop. They are written into [`InputState`]
//! by listeners registered once at startup; the tick only reads it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Logical actions the game reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    LookLeft,
    LookRight,
    LookUp,
    LookDown,
}

impl Action {
    pub const COUNT: usize = 9;

    pub const ALL: [Action; Self::COUNT] = [
        Action::Forward,
        Action::Back,
        Action::Left,
        Action::Right,
        Action::Jump,
        Action::LookLeft,
        Action::LookRight,
        Action::LookUp,
        Action::LookDown,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

/// State of one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionState {
    /// The key is down.
    pub held: bool,
    /// The key went down since the last reset.
    pub just_pressed: bool,
}

/// Key name to action mapping.
///
/// Key names are compared case-insensitively, so `"W"` with shift held
/// still moves forward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyBindings {
    bindings: Vec<(String, Action)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        let mut bindings = Self {
            bindings: Vec::new(),
        };
        bindings
            .bind("w", Action::Forward)
            .bind("s", Action::Back)
            .bind("a", Action::Left)
            .bind("d", Action::Right)
            .bind(" ", Action::Jump)
            .bind("space", Action::Jump)
            .bind("arrowleft", Action::LookLeft)
            .bind("arrowright", Action::LookRight)
            .bind("arrowup", Action::LookUp)
            .bind("arrowdown", Action::LookDown);
        bindings
    }
}

impl KeyBindings {
    /// Bind a key, replacing any previous binding of the same key.
    pub fn bind(&mut self, key: &str, action: Action) -> &mut Self {
        let key = key.to_lowercase();
        self.bindings.retain(|(k, _)| *k != key);
        self.bindings.push((key, action));
        self
    }

    pub fn action_for(&self, key: &str) -> Option<Action> {
        let key = key.to_lowercase();
        self.bindings
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, action)| *action)
    }
}

/// Copy of the input state taken at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputSnapshot {
    states: [ActionState; Action::COUNT],
}

impl InputSnapshot {
    pub fn get(&self, action: Action) -> ActionState {
        self.states[action.index()]
    }

    pub fn held(&self, action: Action) -> bool {
        self.get(action).held
    }

    pub fn just_pressed(&self, action: Action) -> bool {
        self.get(action).just_pressed
    }

    /// Movement axes from held keys: `x` is right, `y` is forward.
    ///
    /// Not normalized, a diagonal has length sqrt(2).
    pub fn movement_axes(&self) -> Vec2 {
        let axis = |positive: Action, negative: Action| {
            f32::from(u8::from(self.held(positive))) - f32::from(u8::from(self.held(negative)))
        };
        Vec2::new(
            axis(Action::Right, Action::Left),
            axis(Action::Forward, Action::Back),
        )
    }

    /// Look keys as yaw/pitch axes: `x` turns right, `y` looks up.
    pub fn look_axes(&self) -> Vec2 {
        let axis = |positive: Action, negative: Action| {
            f32::from(u8::from(self.held(positive))) - f32::from(u8::from(self.held(negative)))
        };
        Vec2::new(
            axis(Action::LookRight, Action::LookLeft),
            axis(Action::LookUp, Action::LookDown),
        )
    }

    /// Check if any movement input is active.
    pub fn has_movement(&self) -> bool {
        self.movement_axes() != Vec2::ZERO
    }
}

/// Held and edge-triggered state of every action, plus mouse drag.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    states: [ActionState; Action::COUNT],
    bindings: KeyBindings,
    dragging: bool,
    look_delta: Vec2,
}

impl InputState {
    pub fn new(bindings: KeyBindings) -> Self {
        Self {
            bindings,
            ..Self::default()
        }
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Handle a key-down event. Returns the action it maps to, if any.
    pub fn key_down(&mut self, key: &str) -> Option<Action> {
        let action = self.bindings.action_for(key)?;
        self.press(action);
        Some(action)
    }

    /// Handle a key-up event. Returns the action it maps to, if any.
    pub fn key_up(&mut self, key: &str) -> Option<Action> {
        let action = self.bindings.action_for(key)?;
        self.release(action);
        Some(action)
    }

    /// Press an action. Auto-repeat of an already held key is not a new press.
    pub fn press(&mut self, action: Action) {
        let state = &mut self.states[action.index()];
        if !state.held {
            state.held = true;
            state.just_pressed = true;
        }
    }

    /// Release an action.
    ///
    /// A pending `just_pressed` survives so a tap shorter than a frame is
    /// still seen by the next tick.
    pub fn release(&mut self, action: Action) {
        self.states[action.index()].held = false;
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        for state in &mut self.states {
            state.held = false;
        }
        self.dragging = false;
    }

    pub fn mouse_button(&mut self, pressed: bool) {
        self.dragging = pressed;
    }

    /// Mouse motion in pixels. Only counts while dragging.
    pub fn mouse_move(&mut self, dx: f32, dy: f32) {
        if self.dragging {
            self.look_delta += Vec2::new(dx, dy);
        }
    }

    /// Take the accumulated drag since the last call.
    pub fn take_look_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_delta)
    }

    pub fn held(&self, action: Action) -> bool {
        self.states[action.index()].held
    }

    pub fn just_pressed(&self, action: Action) -> bool {
        self.states[action.index()].just_pressed
    }

    pub fn snapshot(&self) -> InputSnapshot {
        InputSnapshot {
            states: self.states,
        }
    }

    /// Clear every edge flag once the tick has consumed them.
    pub fn reset_just_pressed(&mut self) {
        for state in &mut self.states {
            state.just_pressed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_press_is_edge_triggered() {
        let mut input = InputState::default();
        assert_eq!(input.key_down(" "), Some(Action::Jump));
        assert!(input.just_pressed(Action::Jump));
        assert!(input.held(Action::Jump));

        input.reset_just_pressed();
        assert!(!input.just_pressed(Action::Jump));
        assert!(input.held(Action::Jump));

        // Auto-repeat while held must not re-arm the edge
        input.key_down(" ");
        assert!(!input.just_pressed(Action::Jump));
    }

    #[test]
    fn test_tap_between_ticks_is_seen_once() {
        let mut input = InputState::default();
        input.key_down("space");
        input.key_up("space");

        let snapshot = input.snapshot();
        assert!(snapshot.just_pressed(Action::Jump));
        assert!(!snapshot.held(Action::Jump));

        input.reset_just_pressed();
        assert!(!input.snapshot().just_pressed(Action::Jump));
    }

    #[test]
    fn test_keys_are_case_insensitive_and_unknown_ignored() {
        let mut input = InputState::default();
        assert_eq!(input.key_down("W"), Some(Action::Forward));
        assert!(input.held(Action::Forward));
        assert_eq!(input.key_down("q"), None);
        assert_eq!(input.key_up("w"), Some(Action::Forward));
        assert!(!input.held(Action::Forward));
    }

    #[test]
    fn test_movement_axes() {
        let mut input = InputState::default();
        input.key_down("w");
        input.key_down("d");
        assert_eq!(input.snapshot().movement_axes(), Vec2::new(1.0, 1.0));

        input.key_down("s");
        assert_eq!(input.snapshot().movement_axes(), Vec2::new(1.0, 0.0));
        assert!(input.snapshot().has_movement());

        input.release_all();
        assert!(!input.snapshot().has_movement());
    }

    #[test]
    fn test_mouse_drag_accumulates_only_while_pressed() {
        let mut input = InputState::default();
        input.mouse_move(10.0, 5.0);
        assert_eq!(input.take_look_delta(), Vec2::ZERO);

        input.mouse_button(true);
        input.mouse_move(10.0, 5.0);
        input.mouse_move(2.0, -1.0);
        assert_eq!(input.take_look_delta(), Vec2::new(12.0, 4.0));
        assert_eq!(input.take_look_delta(), Vec2::ZERO);
    }

    #[test]
    fn test_rebinding_replaces_key() {
        let mut bindings = KeyBindings::default();
        bindings.bind("w", Action::Jump);
        assert_eq!(bindings.action_for("w"), Some(Action::Jump));
        assert_eq!(bindings.action_for("s"), Some(Action::Back));
    }
}
