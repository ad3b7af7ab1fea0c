//! Rebuilding a live world from a published [`WorldSnapshot`].

use std::{collections::BTreeMap, sync::Arc};

use nestbox_core::{CellCoord, LevelId, Tile, WorldSnapshot};
use thiserror::Error;

use crate::{players::Player, Level, World, WorldTemplate};

/// Reasons a snapshot cannot be restored against a template.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The snapshot was taken from a world with a different root.
    #[error("snapshot root `{found}` does not match template root `{expected}`")]
    RootMismatch {
        /// Root declared by the template.
        expected: LevelId,
        /// Root recorded in the snapshot.
        found: LevelId,
    },
    /// The snapshot holds a level the template never declared.
    #[error("snapshot level `{0}` is not part of the template")]
    UnknownLevel(LevelId),
    /// A template level is absent from the snapshot.
    #[error("template level `{0}` is missing from the snapshot")]
    MissingLevel(LevelId),
    /// A level's dimensions differ from the template's.
    #[error("level `{level}` is {width}x{height} in the snapshot")]
    ShapeMismatch {
        /// Offending level.
        level: LevelId,
        /// Width recorded in the snapshot.
        width: u32,
        /// Height recorded in the snapshot.
        height: u32,
    },
    /// The tile vector does not cover the grid exactly.
    #[error("level `{level}` carries {found} tiles, expected {expected}")]
    TileCount {
        /// Offending level.
        level: LevelId,
        /// Cells in the grid.
        expected: usize,
        /// Tiles in the snapshot.
        found: usize,
    },
    /// A container reference points at a cell that holds no box.
    #[error("level `{level}` has a container at {cell} without a box")]
    ContainerOffBox {
        /// Offending level.
        level: LevelId,
        /// Cell of the stray reference.
        cell: CellCoord,
    },
    /// A player stands outside its level or inside a wall or box.
    #[error("player location `{level}` {cell} is not an open cell")]
    PlayerOutOfBounds {
        /// Level the player claims to be in.
        level: LevelId,
        /// Cell the player claims to occupy.
        cell: CellCoord,
    },
    /// A player or ancestor frame names a level the template lacks.
    #[error("player references unknown level `{0}`")]
    UnknownPlayerLevel(LevelId),
}

impl World {
    /// Rebuilds a world from `snapshot`, validating it against `template`.
    ///
    /// Replicas use this to mirror the authority without replaying commands.
    pub fn from_snapshot(
        template: Arc<WorldTemplate>,
        snapshot: &WorldSnapshot,
    ) -> Result<Self, SnapshotError> {
        if snapshot.root != *template.root() {
            return Err(SnapshotError::RootMismatch {
                expected: template.root().clone(),
                found: snapshot.root.clone(),
            });
        }

        let mut levels = BTreeMap::new();
        for level in &snapshot.levels {
            let Some(declared) = template.level(&level.id) else {
                return Err(SnapshotError::UnknownLevel(level.id.clone()));
            };
            let declared = declared.level();
            if declared.width() != level.width || declared.height() != level.height {
                return Err(SnapshotError::ShapeMismatch {
                    level: level.id.clone(),
                    width: level.width,
                    height: level.height,
                });
            }
            let expected = declared.tiles().len();
            if level.tiles.len() != expected {
                return Err(SnapshotError::TileCount {
                    level: level.id.clone(),
                    expected,
                    found: level.tiles.len(),
                });
            }
            for (cell, _) in &level.containers {
                if level.tile(*cell) != Some(Tile::Box) {
                    return Err(SnapshotError::ContainerOffBox {
                        level: level.id.clone(),
                        cell: *cell,
                    });
                }
            }

            let live = Level::new(
                level.id.clone(),
                level.width,
                level.height,
                level.tiles.clone(),
                level.containers.iter().cloned().collect(),
            );
            let _ = levels.insert(level.id.clone(), live);
        }

        if let Some(missing) = template
            .levels()
            .find(|declared| !levels.contains_key(declared.id()))
        {
            return Err(SnapshotError::MissingLevel(missing.id().clone()));
        }

        let mut players = BTreeMap::new();
        for player in &snapshot.players {
            let frames = player.ancestors.iter().map(|frame| &frame.level);
            for level in frames.chain(std::iter::once(&player.location.level)) {
                if !levels.contains_key(level) {
                    return Err(SnapshotError::UnknownPlayerLevel(level.clone()));
                }
            }
            let standing = levels
                .get(&player.location.level)
                .and_then(|level: &Level| level.tile(player.location.cell));
            if !standing.is_some_and(Tile::is_open) {
                return Err(SnapshotError::PlayerOutOfBounds {
                    level: player.location.level.clone(),
                    cell: player.location.cell,
                });
            }

            let _ = players.insert(
                player.id,
                Player {
                    id: player.id,
                    location: player.location.clone(),
                    ancestors: player.ancestors.clone(),
                },
            );
        }

        Ok(Self {
            template,
            levels,
            players,
            solved: snapshot.solved,
        })
    }
}
