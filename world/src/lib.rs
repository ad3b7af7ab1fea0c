#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Nestbox.
//!
//! The world owns every live level and player. Mutation happens only through
//! [`apply`], [`attempt_move`] and [`try_push`]. Everything in [`query`] takes a
//! shared reference and never changes state.

mod level;
mod movement;
mod players;
mod push;
mod snapshot;
mod template;
pub mod topology;

use std::{collections::BTreeMap, sync::Arc};

use nestbox_core::{
    AncestorFrame, CellCoord, Command, Direction, Event, LevelId, Location, MoveOutcome,
    PlayerError, PlayerId, PushOutcome, Tile,
};

pub use level::Level;
pub use snapshot::SnapshotError;
pub use template::{LevelTemplate, TemplateBuilder, TemplateError, WorldTemplate};

use players::Player;

/// Represents the authoritative Nestbox world state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct World {
    template: Arc<WorldTemplate>,
    levels: BTreeMap<LevelId, Level>,
    players: BTreeMap<PlayerId, Player>,
    solved: bool,
}

impl World {
    /// Creates a world from a deep copy of the template's levels, with no players.
    #[must_use]
    pub fn new(template: Arc<WorldTemplate>) -> Self {
        let levels = fresh_levels(&template);
        Self {
            template,
            levels,
            players: BTreeMap::new(),
            solved: false,
        }
    }

    /// Discards all live mutation and players, restoring the template state.
    pub fn reset(&mut self) {
        self.levels = fresh_levels(&self.template);
        self.players.clear();
        self.solved = false;
        log::info!("world reset to template `{}`", self.template.root());
    }

    pub(crate) fn level(&self, id: &LevelId) -> Option<&Level> {
        self.levels.get(id)
    }

    pub(crate) fn tile(&self, location: &Location) -> Option<Tile> {
        self.level(&location.level)?.tile(location.cell)
    }

    pub(crate) fn player_at(&self, location: &Location) -> Option<PlayerId> {
        self.players
            .values()
            .find(|player| &player.location == location)
            .map(|player| player.id)
    }

    pub(crate) fn base_tile(&self, location: &Location) -> Tile {
        self.template
            .level(&location.level)
            .map_or(Tile::Empty, |template| {
                topology::base_tile(template, location.cell)
            })
    }

    fn spawn_cell(&self) -> Option<CellCoord> {
        let root = self.template.root();
        let level = self.level(root)?;
        let free = |cell: CellCoord| {
            level.tile(cell).is_some_and(Tile::is_open)
                && self
                    .player_at(&Location::new(root.clone(), cell))
                    .is_none()
        };

        let spawn = self.template.spawn();
        if free(spawn) {
            return Some(spawn);
        }
        topology::nearest_matching(level.cells(), spawn, free)
    }

    fn add_player(&mut self, id: PlayerId, out_events: &mut Vec<Event>) {
        if self.players.contains_key(&id) {
            out_events.push(Event::PlayerRejected {
                player: id,
                reason: PlayerError::AlreadyPresent,
            });
            return;
        }

        let Some(cell) = self.spawn_cell() else {
            log::warn!("no free spawn cell for {id}");
            out_events.push(Event::PlayerRejected {
                player: id,
                reason: PlayerError::NoSpawnCell,
            });
            return;
        };

        let location = Location::new(self.template.root().clone(), cell);
        let _ = self.players.insert(id, Player::new(id, location.clone()));
        log::info!("{id} joined at {location}");
        out_events.push(Event::PlayerAdded {
            player: id,
            location,
        });
    }

    fn remove_player(&mut self, id: PlayerId, out_events: &mut Vec<Event>) {
        if self.players.remove(&id).is_some() {
            log::info!("{id} left");
            out_events.push(Event::PlayerRemoved { player: id });
        } else {
            out_events.push(Event::PlayerRejected {
                player: id,
                reason: PlayerError::MissingPlayer,
            });
        }
    }

    /// Marks the world solved the first time no goal tile remains in any
    /// level's live grid.
    fn evaluate_win(&mut self, out_events: &mut Vec<Event>) {
        if self.solved {
            return;
        }
        if self.levels.values().any(|level| level.goal_count() > 0) {
            return;
        }
        self.solved = true;
        log::info!("every goal is covered, puzzle solved");
        out_events.push(Event::PuzzleSolved);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::AddPlayer { player } => world.add_player(player, out_events),
        Command::RemovePlayer { player } => world.remove_player(player, out_events),
        Command::MovePlayer { player, direction } => {
            let _ = attempt_move(world, player, direction, out_events);
        }
        Command::ResetWorld => {
            world.reset();
            out_events.push(Event::WorldReset);
        }
    }
}

/// Moves a player one step, pushing, entering or exiting as the grid demands.
///
/// A blocked step leaves the world untouched and reports
/// [`Event::MoveBlocked`]. Unknown players are always blocked.
pub fn attempt_move(
    world: &mut World,
    player: PlayerId,
    direction: Direction,
    out_events: &mut Vec<Event>,
) -> MoveOutcome {
    movement::attempt(world, player, direction, out_events)
}

/// Pushes the box at `origin` one cell in `direction`.
///
/// `ancestors` is the containment path above `origin.level`, outermost first.
/// Either the whole push chain moves or nothing does.
pub fn try_push(
    world: &mut World,
    origin: &Location,
    direction: Direction,
    ancestors: &[AncestorFrame],
    out_events: &mut Vec<Event>,
) -> PushOutcome {
    let Some(plan) = push::plan_push(world, origin, direction, ancestors) else {
        log::trace!("push of {origin} toward {direction:?} blocked");
        return PushOutcome::Blocked;
    };
    let boxes = plan.len();
    plan.apply(world, out_events);
    world.evaluate_win(out_events);
    PushOutcome::Pushed { boxes }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::sync::Arc;

    use nestbox_core::{
        AncestorFrame, Direction, LevelId, Location, MoveOutcome, PlayerId, PlayerSnapshot,
        PushOutcome, WorldSnapshot,
    };

    use super::{movement, push, Level, World, WorldTemplate};

    /// Reports what [`attempt_move`](super::attempt_move) would do, without doing it.
    #[must_use]
    pub fn check_move(world: &World, player: PlayerId, direction: Direction) -> MoveOutcome {
        movement::plan_move(world, player, direction)
            .map_or(MoveOutcome::Blocked, |plan| plan.outcome())
    }

    /// Reports what [`try_push`](super::try_push) would do, without doing it.
    #[must_use]
    pub fn check_push(
        world: &World,
        origin: &Location,
        direction: Direction,
        ancestors: &[AncestorFrame],
    ) -> PushOutcome {
        push::plan_push(world, origin, direction, ancestors)
            .map_or(PushOutcome::Blocked, |plan| PushOutcome::Pushed {
                boxes: plan.len(),
            })
    }

    /// Provides read-only access to a live level.
    #[must_use]
    pub fn level<'world>(world: &'world World, id: &LevelId) -> Option<&'world Level> {
        world.level(id)
    }

    /// Iterates over the live levels in identifier order.
    pub fn levels(world: &World) -> impl Iterator<Item = &Level> {
        world.levels.values()
    }

    /// Template the world was created from.
    #[must_use]
    pub fn template(world: &World) -> &Arc<WorldTemplate> {
        &world.template
    }

    /// Captures a single player's state.
    #[must_use]
    pub fn player(world: &World, player: PlayerId) -> Option<PlayerSnapshot> {
        world.players.get(&player).map(|player| player.snapshot())
    }

    /// Captures every player's state in identifier order.
    #[must_use]
    pub fn players(world: &World) -> Vec<PlayerSnapshot> {
        world.players.values().map(|player| player.snapshot()).collect()
    }

    /// Number of uncovered goal tiles across every level.
    #[must_use]
    pub fn remaining_goals(world: &World) -> usize {
        world.levels.values().map(Level::goal_count).sum()
    }

    /// Reports whether the puzzle has been solved.
    #[must_use]
    pub fn is_solved(world: &World) -> bool {
        world.solved
    }

    /// Captures the whole world for transport.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot {
        WorldSnapshot {
            root: world.template.root().clone(),
            levels: world.levels.values().map(Level::snapshot).collect(),
            players: players(world),
            solved: world.solved,
        }
    }
}

fn fresh_levels(template: &WorldTemplate) -> BTreeMap<LevelId, Level> {
    template
        .levels()
        .map(|level| (level.id().clone(), level.level().clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corridor() -> Arc<WorldTemplate> {
        let mut builder = TemplateBuilder::new("root");
        let _ = builder
            .add_level("root", &["######", "#@.BG#", "######"], &[])
            .unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn new_world_has_no_players() {
        let world = World::new(corridor());
        assert!(query::players(&world).is_empty());
        assert_eq!(query::remaining_goals(&world), 1);
        assert!(!query::is_solved(&world));
    }

    #[test]
    fn add_player_uses_spawn_then_nearest_free_cell() {
        let mut world = World::new(corridor());
        let mut events = Vec::new();
        apply(&mut world, Command::AddPlayer { player: PlayerId::new(1) }, &mut events);
        apply(&mut world, Command::AddPlayer { player: PlayerId::new(2) }, &mut events);

        let root = LevelId::new("root");
        assert_eq!(
            events,
            vec![
                Event::PlayerAdded {
                    player: PlayerId::new(1),
                    location: Location::new(root.clone(), CellCoord::new(1, 1)),
                },
                Event::PlayerAdded {
                    player: PlayerId::new(2),
                    location: Location::new(root, CellCoord::new(2, 1)),
                },
            ]
        );
    }

    #[test]
    fn duplicate_and_missing_players_are_rejected() {
        let mut world = World::new(corridor());
        let mut events = Vec::new();
        apply(&mut world, Command::AddPlayer { player: PlayerId::new(1) }, &mut events);
        events.clear();

        apply(&mut world, Command::AddPlayer { player: PlayerId::new(1) }, &mut events);
        apply(&mut world, Command::RemovePlayer { player: PlayerId::new(9) }, &mut events);

        assert_eq!(
            events,
            vec![
                Event::PlayerRejected {
                    player: PlayerId::new(1),
                    reason: PlayerError::AlreadyPresent,
                },
                Event::PlayerRejected {
                    player: PlayerId::new(9),
                    reason: PlayerError::MissingPlayer,
                },
            ]
        );
    }

    #[test]
    fn reset_restores_template_and_drops_players() {
        let template = corridor();
        let mut world = World::new(Arc::clone(&template));
        let mut events = Vec::new();
        apply(&mut world, Command::AddPlayer { player: PlayerId::new(1) }, &mut events);
        for _ in 0..2 {
            apply(
                &mut world,
                Command::MovePlayer {
                    player: PlayerId::new(1),
                    direction: Direction::East,
                },
                &mut events,
            );
        }
        assert!(query::is_solved(&world));

        apply(&mut world, Command::ResetWorld, &mut events);
        assert_eq!(world, World::new(template));
        assert_eq!(events.last(), Some(&Event::WorldReset));
    }

    #[test]
    fn unknown_player_move_is_blocked() {
        let mut world = World::new(corridor());
        let before = world.clone();
        let mut events = Vec::new();
        let outcome = attempt_move(&mut world, PlayerId::new(4), Direction::East, &mut events);

        assert_eq!(outcome, MoveOutcome::Blocked);
        assert_eq!(world, before);
        assert_eq!(
            events,
            vec![Event::MoveBlocked {
                player: PlayerId::new(4),
                direction: Direction::East,
            }]
        );
    }
}
