//! Recursive push resolution across nested levels.
//!
//! Planning reads the world through a shared reference and records every box
//! relocation a push implies as a [`BoxTransfer`]. Nothing is written until
//! the whole chain is known to be feasible, after which [`PushPlan::apply`]
//! replays the transfers farthest box first, so each destination is already
//! vacant when it is written.

use std::collections::HashSet;

use nestbox_core::{AncestorFrame, CellCoord, ContainerRef, Direction, Event, Location, Tile};

use crate::{topology, Level, World};

/// A single planned relocation of a box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BoxTransfer {
    from: Location,
    to: Location,
}

/// Ordered box relocations implied by a feasible push.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PushPlan {
    transfers: Vec<BoxTransfer>,
}

impl PushPlan {
    /// Number of boxes the plan moves.
    pub(crate) fn len(&self) -> usize {
        self.transfers.len()
    }

    /// Points every frame naming a moved box at the cell the box moves to.
    ///
    /// Each frame follows at most one transfer, matched against the box's
    /// position before the plan is applied.
    pub(crate) fn relocate(&self, frames: &mut [AncestorFrame]) {
        for frame in frames {
            let Some(transfer) = self
                .transfers
                .iter()
                .find(|transfer| transfer.from.level == frame.level && transfer.from.cell == frame.cell)
            else {
                continue;
            };
            log::trace!("frame {} follows its box to {}", transfer.from, transfer.to);
            *frame = AncestorFrame::new(transfer.to.level.clone(), transfer.to.cell);
        }
    }

    /// Writes every transfer into the world.
    ///
    /// Players standing inside a moved container keep their frames on it.
    pub(crate) fn apply(self, world: &mut World, out_events: &mut Vec<Event>) {
        for player in world.players.values_mut() {
            self.relocate(&mut player.ancestors);
        }
        for BoxTransfer { from, to } in self.transfers {
            let base = world.base_tile(&from);
            let Some(source) = world.levels.get_mut(&from.level) else {
                continue;
            };
            let container = source.take_box(from.cell, base);
            if let Some(destination) = world.levels.get_mut(&to.level) {
                destination.place_box(to.cell, container.clone());
            }
            log::debug!("box {from} -> {to}");
            out_events.push(Event::BoxMoved {
                from,
                to,
                container,
            });
        }
    }
}

/// Plans pushing the box at `origin` one cell in `direction`.
///
/// `ancestors` is the containment path above `origin.level`. Returns `None`
/// when the push is infeasible.
pub(crate) fn plan_push(
    world: &World,
    origin: &Location,
    direction: Direction,
    ancestors: &[AncestorFrame],
) -> Option<PushPlan> {
    let mut planner = Planner::new(world, direction);
    let pushed = planner.push(origin, ancestors);
    log::trace!(
        "push from {origin} {direction:?} visited {} boxes, feasible: {pushed}",
        planner.visited
    );
    pushed.then_some(PushPlan {
        transfers: planner.transfers,
    })
}

/// Cell reached by leaving through the edge of the innermost level.
///
/// Walks the stack from the top; a frame whose box cell also sits on the
/// crossed edge hands off to the frame above it. Returns the index of the
/// frame that was used, which is also the length of the stack that remains
/// valid at the target, or `None` when every level's edge is crossed.
pub(crate) fn exit_target(
    world: &World,
    ancestors: &[AncestorFrame],
    direction: Direction,
) -> Option<(usize, Location)> {
    for (depth, frame) in ancestors.iter().enumerate().rev() {
        let level = world.level(&frame.level)?;
        if let Some(cell) = topology::neighbor(level, frame.cell, direction) {
            return Some((depth, Location::new(frame.level.clone(), cell)));
        }
    }
    None
}

struct Planner<'w> {
    world: &'w World,
    direction: Direction,
    // Boxes on the active recursion path. A box can move at most once per
    // push, so meeting one again means the chain loops back on itself.
    in_flight: Vec<Location>,
    // Pushes shown infeasible without meeting an in-flight box.
    failed: HashSet<(Location, Vec<AncestorFrame>)>,
    // Set while the current subtree has been cut short by an in-flight box.
    looped: bool,
    visited: usize,
    transfers: Vec<BoxTransfer>,
}

impl<'w> Planner<'w> {
    fn new(world: &'w World, direction: Direction) -> Self {
        Planner {
            world,
            direction,
            in_flight: Vec::new(),
            failed: HashSet::new(),
            looped: false,
            visited: 0,
            transfers: Vec::new(),
        }
    }

    fn push(&mut self, origin: &Location, ancestors: &[AncestorFrame]) -> bool {
        if self.in_flight.contains(origin) {
            self.looped = true;
            return false;
        }
        let key = (origin.clone(), ancestors.to_vec());
        if self.failed.contains(&key) {
            return false;
        }
        self.visited += 1;

        let looped_above = std::mem::take(&mut self.looped);
        let pushed = self.push_uncached(origin, ancestors);
        let looped_here = self.looped;
        self.looped = looped_above || looped_here;

        if !pushed && !looped_here {
            let _ = self.failed.insert(key);
        }
        pushed
    }

    fn push_uncached(&mut self, origin: &Location, ancestors: &[AncestorFrame]) -> bool {
        let world = self.world;
        let Some(level) = world.level(&origin.level) else {
            return false;
        };
        if level.tile(origin.cell) != Some(Tile::Box) {
            return false;
        }

        let mark = self.transfers.len();
        self.in_flight.push(origin.clone());
        let pushed = match topology::neighbor(level, origin.cell, self.direction) {
            Some(next) => self.push_within(level, origin, next, ancestors),
            None => self.push_out(origin, ancestors),
        };
        let _ = self.in_flight.pop();

        if !pushed {
            self.transfers.truncate(mark);
        }
        pushed
    }

    fn push_out(&mut self, origin: &Location, ancestors: &[AncestorFrame]) -> bool {
        let Some((depth, target)) = exit_target(self.world, ancestors, self.direction) else {
            return false;
        };
        self.push_into(origin, target, &ancestors[..depth])
    }

    fn push_within(
        &mut self,
        level: &Level,
        origin: &Location,
        next: CellCoord,
        ancestors: &[AncestorFrame],
    ) -> bool {
        let target = Location::new(origin.level.clone(), next);
        if self.push_into(origin, target.clone(), ancestors) {
            return true;
        }
        if level.tile(next) != Some(Tile::Box) {
            return false;
        }
        let Some(container) = level.container(next) else {
            return false;
        };
        self.push_inside(origin, &target, container, ancestors)
    }

    /// Re-parents the box at `origin` into the level behind `container`.
    fn push_inside(
        &mut self,
        origin: &Location,
        container_cell: &Location,
        container: &ContainerRef,
        ancestors: &[AncestorFrame],
    ) -> bool {
        let Some(nested) = self.world.level(container.level()) else {
            return false;
        };
        if !topology::is_edge_enterable(nested, self.direction) {
            return false;
        }
        let Some(entry) = topology::entry_position(nested, self.direction) else {
            return false;
        };

        let mut extended = ancestors.to_vec();
        extended.push(AncestorFrame::new(
            container_cell.level.clone(),
            container_cell.cell,
        ));
        self.push_into(
            origin,
            Location::new(container.level().clone(), entry),
            &extended,
        )
    }

    /// Moves the box at `origin` onto `target`, clearing it first if needed.
    ///
    /// `ancestors` is the containment path above `target.level`.
    fn push_into(&mut self, origin: &Location, target: Location, ancestors: &[AncestorFrame]) -> bool {
        if self.world.player_at(&target).is_some() {
            return false;
        }
        let feasible = match self.world.tile(&target) {
            None | Some(Tile::Wall) => false,
            Some(Tile::Empty | Tile::Goal) => true,
            Some(Tile::Box) => self.push(&target, ancestors),
        };
        if feasible {
            self.transfers.push(BoxTransfer {
                from: origin.clone(),
                to: target,
            });
        }
        feasible
    }
}
