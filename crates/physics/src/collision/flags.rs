//! Content flags for collision filtering.
//!
//! Every collider carries a set of content flags. Queries pass a mask and
//! only see colliders whose contents intersect it.

use serde::{Deserialize, Serialize};

/// Content flags describe what type of volume a collider is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContentFlags(pub u32);

impl ContentFlags {
    /// Empty space - nothing here.
    pub const EMPTY: Self = Self(0);

    /// Solid level geometry - ground, walls, platforms.
    pub const SOLID: Self = Self(1 << 0);

    /// Blocks the player but nothing else (invisible level bounds).
    pub const PLAYER_CLIP: Self = Self(1 << 1);

    /// The player's own collider.
    pub const PLAYER_BODY: Self = Self(1 << 2);

    /// Collectible pickup volume.
    pub const PICKUP: Self = Self(1 << 3);

    /// Damaging hazard (rotating bars).
    pub const HAZARD: Self = Self(1 << 4);

    /// Jump pad trigger.
    pub const JUMP_PAD: Self = Self(1 << 5);

    /// Mud or other slowing ground.
    pub const MUD: Self = Self(1 << 6);

    /// Standard mask for player movement traces.
    pub const MASK_PLAYER_SOLID: Self = Self(Self::SOLID.0 | Self::PLAYER_CLIP.0);

    /// Everything a player can overlap without being blocked.
    pub const MASK_TRIGGERS: Self =
        Self(Self::PICKUP.0 | Self::HAZARD.0 | Self::JUMP_PAD.0 | Self::MUD.0);

    /// Check if these flags contain a specific flag.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any of the given flags are set.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Combine two flag sets.
    #[inline]
    pub fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Remove flags from this set.
    #[inline]
    pub fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl std::ops::BitOr for ContentFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for ContentFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_mask_ignores_triggers() {
        let mask = ContentFlags::MASK_PLAYER_SOLID;
        assert!(mask.intersects(ContentFlags::SOLID));
        assert!(mask.intersects(ContentFlags::PLAYER_CLIP));
        assert!(!mask.intersects(ContentFlags::JUMP_PAD));
        assert!(!mask.intersects(ContentFlags::MUD));
        assert!(!mask.intersects(ContentFlags::PLAYER_BODY));
    }

    #[test]
    fn test_union_and_difference() {
        let both = ContentFlags::SOLID | ContentFlags::HAZARD;
        assert!(both.contains(ContentFlags::HAZARD));
        assert_eq!(both.difference(ContentFlags::HAZARD), ContentFlags::SOLID);
        assert_eq!(both & ContentFlags::SOLID, ContentFlags::SOLID);
        assert_eq!(ContentFlags::EMPTY.union(ContentFlags::MUD), ContentFlags::MUD);
    }
}
