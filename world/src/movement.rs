//! Single-step player movement: walking, pushing, entering and exiting boxes.

use nestbox_core::{
    AncestorFrame, Direction, Event, Location, MoveOutcome, PlayerId, Tile,
};

use crate::{
    players::Player,
    push::{self, PushPlan},
    topology, Level, World,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepKind {
    Walk,
    Enter,
    Exit,
}

/// Everything a feasible step changes, computed without touching the world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct MovePlan {
    kind: StepKind,
    pushes: PushPlan,
    destination: Location,
    ancestors: Vec<AncestorFrame>,
}

impl MovePlan {
    pub(crate) fn outcome(&self) -> MoveOutcome {
        let pushed = self.pushes.len();
        match self.kind {
            StepKind::Walk => MoveOutcome::Moved { pushed },
            StepKind::Enter => MoveOutcome::Entered {
                level: self.destination.level.clone(),
                pushed,
            },
            StepKind::Exit => MoveOutcome::Exited {
                level: self.destination.level.clone(),
                pushed,
            },
        }
    }

    fn commit(self, world: &mut World, player: PlayerId, out_events: &mut Vec<Event>) {
        let mut ancestors = self.ancestors;
        self.pushes.relocate(&mut ancestors);
        self.pushes.apply(world, out_events);
        let Some(state) = world.players.get_mut(&player) else {
            return;
        };
        let from = std::mem::replace(&mut state.location, self.destination.clone());
        state.ancestors = ancestors;
        let depth = state.ancestors.len();
        log::debug!("{player} {from} -> {} at depth {depth}", self.destination);
        out_events.push(Event::PlayerMoved {
            player,
            from,
            to: self.destination,
            depth,
        });
    }
}

/// Plans a single step for `player` without mutating anything.
pub(crate) fn plan_move(world: &World, player: PlayerId, direction: Direction) -> Option<MovePlan> {
    let player = world.players.get(&player)?;
    let level = world.level(&player.location.level)?;
    match topology::neighbor(level, player.location.cell, direction) {
        Some(next) => plan_step(world, player, level, Location::new(level.id().clone(), next), direction),
        None => plan_exit(world, player, direction),
    }
}

/// Commits a step, then evaluates the win condition.
pub(crate) fn attempt(
    world: &mut World,
    player: PlayerId,
    direction: Direction,
    out_events: &mut Vec<Event>,
) -> MoveOutcome {
    let Some(plan) = plan_move(world, player, direction) else {
        log::trace!("{player} blocked moving {direction:?}");
        out_events.push(Event::MoveBlocked { player, direction });
        return MoveOutcome::Blocked;
    };
    let outcome = plan.outcome();
    plan.commit(world, player, out_events);
    world.evaluate_win(out_events);
    outcome
}

fn plan_step(
    world: &World,
    player: &Player,
    level: &Level,
    target: Location,
    direction: Direction,
) -> Option<MovePlan> {
    if occupied_by_other(world, player, &target) {
        return None;
    }

    if let Some(pushes) = clear(world, player, &target, direction, &player.ancestors) {
        return Some(MovePlan {
            kind: StepKind::Walk,
            pushes,
            destination: target,
            ancestors: player.ancestors.clone(),
        });
    }

    // The box would not budge; step inside it instead if it is a container.
    if level.tile(target.cell) != Some(Tile::Box) {
        return None;
    }
    let container = level.container(target.cell)?;
    let nested = world.level(container.level())?;
    if !topology::is_edge_enterable(nested, direction) {
        return None;
    }
    let entry = Location::new(
        container.level().clone(),
        topology::entry_position(nested, direction)?,
    );

    let mut ancestors = player.ancestors.clone();
    ancestors.push(AncestorFrame::new(target.level, target.cell));
    let pushes = clear(world, player, &entry, direction, &ancestors)?;
    Some(MovePlan {
        kind: StepKind::Enter,
        pushes,
        destination: entry,
        ancestors,
    })
}

fn plan_exit(world: &World, player: &Player, direction: Direction) -> Option<MovePlan> {
    let (depth, target) = push::exit_target(world, &player.ancestors, direction)?;
    let outer = &player.ancestors[..depth];
    let pushes = clear(world, player, &target, direction, outer)?;
    Some(MovePlan {
        kind: StepKind::Exit,
        pushes,
        destination: target,
        ancestors: outer.to_vec(),
    })
}

/// Plans making `target` walkable, pushing a box off it when one is there.
fn clear(
    world: &World,
    player: &Player,
    target: &Location,
    direction: Direction,
    ancestors: &[AncestorFrame],
) -> Option<PushPlan> {
    if occupied_by_other(world, player, target) {
        return None;
    }
    match world.tile(target)? {
        Tile::Wall => None,
        Tile::Empty | Tile::Goal => Some(PushPlan::default()),
        Tile::Box => push::plan_push(world, target, direction, ancestors),
    }
}

fn occupied_by_other(world: &World, player: &Player, target: &Location) -> bool {
    world
        .player_at(target)
        .is_some_and(|occupant| occupant != player.id)
}
