#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Nestbox engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the session layer. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands
//! via its `apply` entry point, and then reports [`Event`] values describing
//! exactly what changed. Read-only consumers receive [`WorldSnapshot`] values
//! that can be serialised for transport.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Adds a participant to the world at the root spawn cell.
    AddPlayer {
        /// Identifier requested for the new player.
        player: PlayerId,
    },
    /// Permanently removes a participant from the world.
    RemovePlayer {
        /// Identifier of the player leaving the session.
        player: PlayerId,
    },
    /// Requests that a player take a single step in the provided direction.
    MovePlayer {
        /// Identifier of the player attempting to move.
        player: PlayerId,
        /// Direction of travel for the attempted step.
        direction: Direction,
    },
    /// Discards all live mutation and restores the world from its template.
    ResetWorld,
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a player joined the world.
    PlayerAdded {
        /// Identifier of the player that joined.
        player: PlayerId,
        /// Cell the player was placed on.
        location: Location,
    },
    /// Reports that a player-related command was rejected.
    PlayerRejected {
        /// Identifier named in the rejected command.
        player: PlayerId,
        /// Specific reason the command failed.
        reason: PlayerError,
    },
    /// Confirms that a player left the world.
    PlayerRemoved {
        /// Identifier of the player that left.
        player: PlayerId,
    },
    /// Confirms that a player completed a step.
    PlayerMoved {
        /// Identifier of the player that moved.
        player: PlayerId,
        /// Location occupied before the step.
        from: Location,
        /// Location occupied after the step.
        to: Location,
        /// Nesting depth of the player after the step.
        depth: usize,
    },
    /// Confirms that a box was displaced as part of a push.
    BoxMoved {
        /// Cell the box occupied before the push.
        from: Location,
        /// Cell the box occupies after the push.
        to: Location,
        /// Level rendered inside the box, if it is a container.
        container: Option<ContainerRef>,
    },
    /// Reports that a requested step was infeasible.
    MoveBlocked {
        /// Identifier of the player whose step was blocked.
        player: PlayerId,
        /// Direction of the attempted step.
        direction: Direction,
    },
    /// Announces that every goal in the world is covered.
    PuzzleSolved,
    /// Announces that the world was restored from its template.
    WorldReset,
}

/// Cardinal movement directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward decreasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward increasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// All four directions in clockwise order starting from north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Returns the direction pointing the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Reports whether the direction travels along the row axis.
    #[must_use]
    pub const fn is_horizontal(self) -> bool {
        matches!(self, Self::East | Self::West)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the adjacent cell in `direction`.
    ///
    /// Yields `None` when the step would leave the non-negative quadrant.
    /// Upper bounds are the caller's concern since coordinates carry no
    /// knowledge of the grid they index.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        let (column, row) = match direction {
            Direction::North => (Some(self.column), self.row.checked_sub(1)),
            Direction::East => (self.column.checked_add(1), Some(self.row)),
            Direction::South => (Some(self.column), self.row.checked_add(1)),
            Direction::West => (self.column.checked_sub(1), Some(self.row)),
        };
        Some(CellCoord::new(column?, row?))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Contents of a single grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tile {
    /// Open floor.
    Empty,
    /// Impassable, immovable wall.
    Wall,
    /// Pushable box, possibly a container for another level.
    Box,
    /// Open floor that must be covered by a box to solve the puzzle.
    Goal,
}

impl Tile {
    /// Reports whether a box or player may move onto the tile unobstructed.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Empty | Self::Goal)
    }
}

/// Stable identity of a level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelId(String);

impl LevelId {
    /// Creates a level identifier from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of the level.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Association between a box and the level instance it opens into.
///
/// The tag distinguishes this box from every other box rendering the same
/// level, so identity survives pushes even when several boxes share a level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerRef {
    level: LevelId,
    tag: u32,
}

impl ContainerRef {
    /// Creates a container reference for the provided level and tag.
    #[must_use]
    pub const fn new(level: LevelId, tag: u32) -> Self {
        Self { level, tag }
    }

    /// Level rendered inside the box.
    #[must_use]
    pub const fn level(&self) -> &LevelId {
        &self.level
    }

    /// Uniqueness tag of this occurrence.
    #[must_use]
    pub const fn tag(&self) -> u32 {
        self.tag
    }
}

/// Unique identifier assigned to a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(u32);

impl PlayerId {
    /// Creates a new player identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// A cell within a named level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Level containing the cell.
    pub level: LevelId,
    /// Cell within the level.
    pub cell: CellCoord,
}

impl Location {
    /// Creates a location from its parts.
    #[must_use]
    pub const fn new(level: LevelId, cell: CellCoord) -> Self {
        Self { level, cell }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.level, self.cell)
    }
}

/// One step of an ancestor stack.
///
/// Records the enclosing level and the cell, inside it, of the box whose
/// interior is the next level down.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AncestorFrame {
    /// Enclosing level.
    pub level: LevelId,
    /// Cell of the box in `level` that the frame descends into.
    pub cell: CellCoord,
}

impl AncestorFrame {
    /// Creates an ancestor frame.
    #[must_use]
    pub const fn new(level: LevelId, cell: CellCoord) -> Self {
        Self { level, cell }
    }
}

/// Result of a movement attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveOutcome {
    /// The step was infeasible; nothing changed.
    Blocked,
    /// The player moved within its current level.
    Moved {
        /// Number of boxes displaced by the step.
        pushed: usize,
    },
    /// The player stepped into a container box.
    Entered {
        /// Level the player entered.
        level: LevelId,
        /// Number of boxes displaced by the step.
        pushed: usize,
    },
    /// The player stepped out through the edge of its level.
    Exited {
        /// Level the player arrived in.
        level: LevelId,
        /// Number of boxes displaced by the step.
        pushed: usize,
    },
}

impl MoveOutcome {
    /// Reports whether the step was feasible.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Blocked)
    }

    /// Number of boxes the step displaced.
    #[must_use]
    pub const fn pushed(&self) -> usize {
        match self {
            Self::Blocked => 0,
            Self::Moved { pushed }
            | Self::Entered { pushed, .. }
            | Self::Exited { pushed, .. } => *pushed,
        }
    }
}

/// Result of a push attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushOutcome {
    /// The push was infeasible; nothing changed.
    Blocked,
    /// The push chain was displaced.
    Pushed {
        /// Number of boxes moved, including the one pushed directly.
        boxes: usize,
    },
}

impl PushOutcome {
    /// Reports whether the push was feasible.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Pushed { .. })
    }
}

/// Reasons a player command may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerError {
    /// A player with the requested identifier already exists.
    AlreadyPresent,
    /// No player with the provided identifier exists.
    MissingPlayer,
    /// The root level has no free open cell to place the player on.
    NoSpawnCell,
}

/// Immutable representation of a single level used for queries and transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Identity of the level.
    pub id: LevelId,
    /// Number of columns in the grid.
    pub width: u32,
    /// Number of rows in the grid.
    pub height: u32,
    /// Live tiles in row-major order.
    pub tiles: Vec<Tile>,
    /// Container references keyed by the cell of their box, in cell order.
    pub containers: Vec<(CellCoord, ContainerRef)>,
}

impl LevelSnapshot {
    /// Returns the tile at `cell`, or `None` when it lies outside the grid.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        if cell.column() >= self.width || cell.row() >= self.height {
            return None;
        }
        let index = usize::try_from(cell.row()).ok()? * usize::try_from(self.width).ok()?
            + usize::try_from(cell.column()).ok()?;
        self.tiles.get(index).copied()
    }

    /// Returns the container reference stored for `cell`, if any.
    #[must_use]
    pub fn container(&self, cell: CellCoord) -> Option<&ContainerRef> {
        self.containers
            .iter()
            .find(|(coord, _)| *coord == cell)
            .map(|(_, container)| container)
    }
}

/// Immutable representation of a single player's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Identifier of the player.
    pub id: PlayerId,
    /// Current level and cell.
    pub location: Location,
    /// Containment path from the root level, outermost first.
    pub ancestors: Vec<AncestorFrame>,
}

/// Read-only snapshot of the whole world, published after every mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Root level of the world.
    pub root: LevelId,
    /// Levels in identifier order.
    pub levels: Vec<LevelSnapshot>,
    /// Players in identifier order.
    pub players: Vec<PlayerSnapshot>,
    /// Whether every goal has been covered.
    pub solved: bool,
}

impl WorldSnapshot {
    /// Looks up a level by identifier.
    #[must_use]
    pub fn level(&self, id: &LevelId) -> Option<&LevelSnapshot> {
        self.levels.iter().find(|level| &level.id == id)
    }

    /// Looks up a player by identifier.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&PlayerSnapshot> {
        self.players.iter().find(|player| player.id == id)
    }
}
