#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session adapter that owns the authoritative world and mirrors it to replicas.
//!
//! Exactly one [`Authority`] mutates a world. It turns participant intents into
//! world commands, processes each to completion, and hands a numbered
//! [`WorldSnapshot`] to its [`Publisher`] whenever the world changed. A
//! [`Replica`] rebuilds a read-only world from those snapshots so that other
//! participants can run check-only moves locally.

use std::sync::Arc;

use nestbox_core::{
    Command, Direction, Event, MoveOutcome, PlayerError, PlayerId, WorldSnapshot,
};
use nestbox_world::{self as world, query, SnapshotError, World, WorldTemplate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Requests a participant can deliver to the authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    /// Participant starts playing.
    Join {
        /// Participant joining the session.
        player: PlayerId,
    },
    /// Participant leaves for good.
    Leave {
        /// Participant leaving the session.
        player: PlayerId,
    },
    /// Participant attempts a single step.
    Move {
        /// Participant moving.
        player: PlayerId,
        /// Direction of the step.
        direction: Direction,
    },
    /// Restores every level to its template state.
    Reset,
}

/// Reasons the authority refuses an intent.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The participant already plays in this session.
    #[error("{0} already joined")]
    AlreadyJoined(PlayerId),
    /// The participant never joined or has left.
    #[error("{0} is not part of the session")]
    UnknownPlayer(PlayerId),
    /// Every open root cell is taken.
    #[error("no free spawn cell for {0}")]
    NoSpawnCell(PlayerId),
    /// A published snapshot did not fit the replica's template.
    #[error("snapshot rejected: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Receives every state the authority commits.
pub trait Publisher {
    /// Publishes the world state numbered `sequence`.
    fn publish(&mut self, sequence: u64, snapshot: &WorldSnapshot);
}

impl<F> Publisher for F
where
    F: FnMut(u64, &WorldSnapshot),
{
    fn publish(&mut self, sequence: u64, snapshot: &WorldSnapshot) {
        self(sequence, snapshot);
    }
}

/// Single owner of the authoritative world.
#[derive(Debug)]
pub struct Authority<P> {
    world: World,
    publisher: P,
    sequence: u64,
}

impl<P: Publisher> Authority<P> {
    /// Starts a session over a fresh copy of `template`.
    ///
    /// Nothing is published until the first state-changing intent.
    #[must_use]
    pub fn new(template: Arc<WorldTemplate>, publisher: P) -> Self {
        Self {
            world: World::new(template),
            publisher,
            sequence: 0,
        }
    }

    /// Processes one intent to completion and returns the events it produced.
    ///
    /// A snapshot is published only when the world changed; blocked moves
    /// return their events without publishing.
    pub fn handle(&mut self, intent: Intent) -> Result<Vec<Event>, SessionError> {
        let mut events = Vec::new();
        match intent {
            Intent::Join { player } => self.join(player, &mut events)?,
            Intent::Leave { player } => {
                self.require(player)?;
                world::apply(
                    &mut self.world,
                    Command::RemovePlayer { player },
                    &mut events,
                );
            }
            Intent::Move { player, direction } => {
                self.require(player)?;
                let outcome = world::attempt_move(&mut self.world, player, direction, &mut events);
                if !outcome.is_success() {
                    return Ok(events);
                }
            }
            Intent::Reset => self.reset(&mut events),
        }
        self.publish();
        Ok(events)
    }

    /// Reports what a move would do without committing it.
    #[must_use]
    pub fn check_move(&self, player: PlayerId, direction: Direction) -> MoveOutcome {
        query::check_move(&self.world, player, direction)
    }

    /// Read-only access to the authoritative world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// Number of the most recently published snapshot, zero before the first.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Captures the current world state.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        query::snapshot(&self.world)
    }

    fn require(&self, player: PlayerId) -> Result<(), SessionError> {
        if query::player(&self.world, player).is_none() {
            log::warn!("rejected intent from unknown {player}");
            return Err(SessionError::UnknownPlayer(player));
        }
        Ok(())
    }

    fn join(&mut self, player: PlayerId, events: &mut Vec<Event>) -> Result<(), SessionError> {
        if query::player(&self.world, player).is_some() {
            log::warn!("rejected duplicate join from {player}");
            return Err(SessionError::AlreadyJoined(player));
        }
        world::apply(&mut self.world, Command::AddPlayer { player }, events);
        let rejected = events.iter().any(|event| {
            matches!(
                event,
                Event::PlayerRejected {
                    reason: PlayerError::NoSpawnCell,
                    ..
                }
            )
        });
        if rejected {
            return Err(SessionError::NoSpawnCell(player));
        }
        Ok(())
    }

    /// Resets the world and places every current participant back at spawn.
    fn reset(&mut self, events: &mut Vec<Event>) {
        let participants: Vec<PlayerId> = query::players(&self.world)
            .into_iter()
            .map(|player| player.id)
            .collect();
        world::apply(&mut self.world, Command::ResetWorld, events);
        for player in participants {
            world::apply(&mut self.world, Command::AddPlayer { player }, events);
        }
    }

    fn publish(&mut self) {
        self.sequence = self.sequence.saturating_add(1);
        let snapshot = query::snapshot(&self.world);
        log::debug!("publishing snapshot {}", self.sequence);
        self.publisher.publish(self.sequence, &snapshot);
    }
}

/// Read-only mirror of the authority, rebuilt from published snapshots.
#[derive(Clone, Debug)]
pub struct Replica {
    template: Arc<WorldTemplate>,
    world: World,
    sequence: u64,
}

impl Replica {
    /// Creates a replica showing the template state until a snapshot arrives.
    #[must_use]
    pub fn new(template: Arc<WorldTemplate>) -> Self {
        Self {
            world: World::new(Arc::clone(&template)),
            template,
            sequence: 0,
        }
    }

    /// Adopts a published snapshot.
    ///
    /// Returns `Ok(false)` and keeps the current state when `sequence` is not
    /// newer than the last adopted snapshot.
    pub fn receive(&mut self, sequence: u64, snapshot: &WorldSnapshot) -> Result<bool, SessionError> {
        if sequence <= self.sequence {
            log::trace!("ignoring stale snapshot {sequence}, holding {}", self.sequence);
            return Ok(false);
        }
        self.world = World::from_snapshot(Arc::clone(&self.template), snapshot)?;
        self.sequence = sequence;
        Ok(true)
    }

    /// Reports what a move would do on the mirrored world.
    #[must_use]
    pub fn check_move(&self, player: PlayerId, direction: Direction) -> MoveOutcome {
        query::check_move(&self.world, player, direction)
    }

    /// Captures the mirrored world state.
    #[must_use]
    pub fn snapshot(&self) -> WorldSnapshot {
        query::snapshot(&self.world)
    }

    /// Number of the last adopted snapshot, zero before the first.
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }
}
