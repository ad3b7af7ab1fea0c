//! Live level storage: a tile grid plus the container references of its boxes.

use std::collections::BTreeMap;

use nestbox_core::{CellCoord, ContainerRef, LevelId, LevelSnapshot, Tile};

/// Rectangular grid of tiles with a stable identity.
///
/// Every key of the container map holds [`Tile::Box`]. The only mutators are
/// [`Level::take_box`] and [`Level::place_box`], which keep the grid and the
/// map in step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Level {
    id: LevelId,
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    containers: BTreeMap<CellCoord, ContainerRef>,
}

impl Level {
    pub(crate) fn new(
        id: LevelId,
        width: u32,
        height: u32,
        tiles: Vec<Tile>,
        containers: BTreeMap<CellCoord, ContainerRef>,
    ) -> Self {
        Self {
            id,
            width,
            height,
            tiles,
            containers,
        }
    }

    /// Identity of the level.
    #[must_use]
    pub const fn id(&self) -> &LevelId {
        &self.id
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Reports whether `cell` lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Returns the tile at `cell`, or `None` outside the grid.
    #[must_use]
    pub fn tile(&self, cell: CellCoord) -> Option<Tile> {
        self.index(cell)
            .and_then(|index| self.tiles.get(index).copied())
    }

    /// Returns the container reference of the box at `cell`, if any.
    #[must_use]
    pub fn container(&self, cell: CellCoord) -> Option<&ContainerRef> {
        self.containers.get(&cell)
    }

    /// Iterates over container boxes in cell order.
    pub fn containers(&self) -> impl Iterator<Item = (CellCoord, &ContainerRef)> {
        self.containers.iter().map(|(cell, container)| (*cell, container))
    }

    /// Live tiles in row-major order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Iterates over every cell of the grid in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let width = self.width;
        (0..self.height).flat_map(move |row| (0..width).map(move |column| CellCoord::new(column, row)))
    }

    /// Number of uncovered goal tiles in the live grid.
    #[must_use]
    pub fn goal_count(&self) -> usize {
        self.tiles.iter().filter(|tile| **tile == Tile::Goal).count()
    }

    /// Captures the level for transport.
    #[must_use]
    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            id: self.id.clone(),
            width: self.width,
            height: self.height,
            tiles: self.tiles.clone(),
            containers: self
                .containers
                .iter()
                .map(|(cell, container)| (*cell, container.clone()))
                .collect(),
        }
    }

    /// Removes the box at `cell`, leaving `base` behind.
    ///
    /// Returns the container reference the box carried.
    pub(crate) fn take_box(&mut self, cell: CellCoord, base: Tile) -> Option<ContainerRef> {
        if let Some(index) = self.index(cell) {
            self.tiles[index] = base;
        }
        self.containers.remove(&cell)
    }

    /// Places a box at `cell`, carrying `container` when it is a container box.
    pub(crate) fn place_box(&mut self, cell: CellCoord, container: Option<ContainerRef>) {
        let Some(index) = self.index(cell) else {
            return;
        };
        self.tiles[index] = Tile::Box;
        match container {
            Some(container) => {
                let _ = self.containers.insert(cell, container);
            }
            None => {
                let _ = self.containers.remove(&cell);
            }
        }
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(row * width + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip() -> Level {
        let mut containers = BTreeMap::new();
        let _ = containers.insert(
            CellCoord::new(1, 0),
            ContainerRef::new(LevelId::new("inner"), 0),
        );
        Level::new(
            LevelId::new("strip"),
            3,
            1,
            vec![Tile::Goal, Tile::Box, Tile::Empty],
            containers,
        )
    }

    #[test]
    fn take_box_restores_base_and_returns_container() {
        let mut level = strip();
        let container = level.take_box(CellCoord::new(1, 0), Tile::Empty);

        assert_eq!(container.map(|c| c.tag()), Some(0));
        assert_eq!(level.tile(CellCoord::new(1, 0)), Some(Tile::Empty));
        assert_eq!(level.containers().count(), 0);
    }

    #[test]
    fn place_box_over_goal_hides_it() {
        let mut level = strip();
        level.place_box(CellCoord::new(0, 0), None);

        assert_eq!(level.tile(CellCoord::new(0, 0)), Some(Tile::Box));
        assert_eq!(level.goal_count(), 0);
        assert!(level.container(CellCoord::new(0, 0)).is_none());
    }

    #[test]
    fn out_of_bounds_tile_is_none() {
        let level = strip();
        assert_eq!(level.tile(CellCoord::new(3, 0)), None);
        assert_eq!(level.tile(CellCoord::new(0, 1)), None);
    }

    #[test]
    fn cells_iterate_row_major() {
        let level = strip();
        let cells: Vec<_> = level.cells().collect();
        assert_eq!(
            cells,
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(1, 0),
                CellCoord::new(2, 0)
            ]
        );
    }
}
