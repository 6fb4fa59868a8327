//! Trace results and query filters.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::flags::ContentFlags;
use super::shape::ColliderHandle;

/// Result of sweeping a shape through the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceResult {
    /// How far along the trace path we got before hitting something.
    ///
    /// - `1.0` = traveled the full distance (no collision)
    /// - `0.0` = hit something immediately at start
    /// - `0.5` = hit something halfway through
    pub fraction: f32,

    /// Final position of the shape center after the trace.
    ///
    /// If `fraction < 1.0`, this is the last clear position found before
    /// the impact.
    pub end_position: Vec3,

    /// Surface normal at the impact point.
    ///
    /// Points away from the surface that was hit. `None` if no collision
    /// occurred (`fraction == 1.0`).
    pub hit_normal: Option<Vec3>,

    /// Content flags of what was hit.
    pub hit_contents: ContentFlags,

    /// Collider that was hit, if any.
    pub hit_collider: Option<ColliderHandle>,

    /// Whether the trace started inside solid geometry.
    ///
    /// Movement code should push the shape out before moving.
    pub started_in_solid: bool,

    /// Whether the shape could not move at all.
    pub all_solid: bool,
}

impl Default for TraceResult {
    fn default() -> Self {
        Self::no_hit(Vec3::ZERO)
    }
}

impl TraceResult {
    /// Create a trace result indicating no collision occurred.
    pub fn no_hit(end_position: Vec3) -> Self {
        Self {
            fraction: 1.0,
            end_position,
            hit_normal: None,
            hit_contents: ContentFlags::EMPTY,
            hit_collider: None,
            started_in_solid: false,
            all_solid: false,
        }
    }

    /// Create a trace result indicating a collision occurred.
    pub fn hit(fraction: f32, end_position: Vec3, normal: Vec3) -> Self {
        Self {
            fraction,
            end_position,
            hit_normal: Some(normal),
            hit_contents: ContentFlags::SOLID,
            hit_collider: None,
            started_in_solid: false,
            all_solid: false,
        }
    }

    /// Check if this trace hit something.
    #[inline]
    pub fn hit_something(&self) -> bool {
        self.fraction < 1.0
    }

    /// Get the hit normal, defaulting to up if none.
    #[inline]
    pub fn normal_or_up(&self) -> Vec3 {
        self.hit_normal.unwrap_or(Vec3::Y)
    }
}

/// Which colliders a query is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Only colliders whose contents intersect this mask are considered.
    pub mask: ContentFlags,
    /// Ignore sensor colliders.
    pub exclude_sensors: bool,
    /// Ignore colliders attached to dynamic bodies.
    pub exclude_dynamic: bool,
    /// A collider to skip, usually the querying shape's own.
    pub exclude_collider: Option<ColliderHandle>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::solid()
    }
}

impl QueryFilter {
    /// What blocks a moving player.
    pub fn solid() -> Self {
        Self {
            mask: ContentFlags::MASK_PLAYER_SOLID,
            exclude_sensors: true,
            exclude_dynamic: false,
            exclude_collider: None,
        }
    }

    /// Sensors only, for overlap tests.
    pub fn sensors(mask: ContentFlags) -> Self {
        Self {
            mask,
            exclude_sensors: false,
            exclude_dynamic: false,
            exclude_collider: None,
        }
    }

    pub fn mask(mut self, mask: ContentFlags) -> Self {
        self.mask = mask;
        self
    }

    pub fn exclude_collider(mut self, collider: ColliderHandle) -> Self {
        self.exclude_collider = Some(collider);
        self
    }

    pub fn exclude_dynamic(mut self, exclude: bool) -> Self {
        self.exclude_dynamic = exclude;
        self
    }
}
