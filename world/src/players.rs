//! Authoritative player state.

use nestbox_core::{AncestorFrame, Location, PlayerId, PlayerSnapshot};

/// A participant's position and containment path.
///
/// `ancestors.len()` is the player's nesting depth; each frame's cell holds
/// the box the player is inside of at that depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Player {
    pub(crate) id: PlayerId,
    pub(crate) location: Location,
    pub(crate) ancestors: Vec<AncestorFrame>,
}

impl Player {
    /// Creates a player standing in the root level with an empty stack.
    pub(crate) fn new(id: PlayerId, location: Location) -> Self {
        Self {
            id,
            location,
            ancestors: Vec::new(),
        }
    }

    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            location: self.location.clone(),
            ancestors: self.ancestors.clone(),
        }
    }
}
