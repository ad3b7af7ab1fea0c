//! Pure grid queries shared by the movement and push engines.

use nestbox_core::{CellCoord, Direction, Tile};

use crate::{level::Level, template::LevelTemplate};

/// Returns the cell adjacent to `cell` in `direction`, or `None` when the
/// step crosses the edge of `level`.
#[must_use]
pub fn neighbor(level: &Level, cell: CellCoord, direction: Direction) -> Option<CellCoord> {
    cell.step(direction).filter(|next| level.contains(*next))
}

/// Reports whether `cell` is a wall.
///
/// Cells outside the grid count as open space, so the outside of a level
/// reads uniformly as non-wall.
#[must_use]
pub fn is_wall(level: &Level, cell: CellCoord) -> bool {
    level.tile(cell) == Some(Tile::Wall)
}

/// Reports whether something travelling in `direction` can enter `level`.
///
/// The edge facing the traveller must hold at least one non-wall cell.
#[must_use]
pub fn is_edge_enterable(level: &Level, direction: Direction) -> bool {
    edge(level, direction.opposite())
        .into_iter()
        .any(|cell| !is_wall(level, cell))
}

/// Cell where something travelling in `direction` lands when entering `level`.
///
/// The midpoint of the entry edge wins unless it is a wall, in which case the
/// nearest non-wall edge cell by Manhattan distance is chosen, earliest in
/// scan order on ties. `None` when the edge is fully walled.
#[must_use]
pub fn entry_position(level: &Level, direction: Direction) -> Option<CellCoord> {
    let edge = edge(level, direction.opposite());
    let midpoint = *edge.get(edge.len() / 2)?;
    if !is_wall(level, midpoint) {
        return Some(midpoint);
    }
    nearest_matching(edge, midpoint, |cell| !is_wall(level, cell))
}

/// Tile left behind when a box vacates `cell`: the template's goal if there
/// was one, otherwise empty floor.
#[must_use]
pub fn base_tile(template: &LevelTemplate, cell: CellCoord) -> Tile {
    if template.is_goal(cell) {
        Tile::Goal
    } else {
        Tile::Empty
    }
}

/// Picks the accepted cell closest to `origin`, keeping the first on ties.
pub(crate) fn nearest_matching<I, F>(cells: I, origin: CellCoord, mut accept: F) -> Option<CellCoord>
where
    I: IntoIterator<Item = CellCoord>,
    F: FnMut(CellCoord) -> bool,
{
    let mut best: Option<(u32, CellCoord)> = None;
    for cell in cells {
        if !accept(cell) {
            continue;
        }
        let distance = cell.manhattan_distance(origin);
        if best.map_or(true, |(closest, _)| distance < closest) {
            best = Some((distance, cell));
        }
    }
    best.map(|(_, cell)| cell)
}

/// Cells along the `side` edge of `level`, in scan order.
fn edge(level: &Level, side: Direction) -> Vec<CellCoord> {
    if side.is_horizontal() {
        let column = match side {
            Direction::West => 0,
            _ => level.width().saturating_sub(1),
        };
        (0..level.height()).map(|row| CellCoord::new(column, row)).collect()
    } else {
        let row = match side {
            Direction::North => 0,
            _ => level.height().saturating_sub(1),
        };
        (0..level.width()).map(|column| CellCoord::new(column, row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{TemplateBuilder, WorldTemplate};
    use nestbox_core::LevelId;

    fn template(rows: &[&str]) -> WorldTemplate {
        let mut builder = TemplateBuilder::new("grid");
        let _ = builder.add_level("grid", rows, &[]).unwrap();
        builder.build().unwrap()
    }

    fn grid(template: &WorldTemplate) -> &LevelTemplate {
        template.level(&LevelId::new("grid")).unwrap()
    }

    #[test]
    fn outside_cells_are_not_walls() {
        let template = template(&["#.#", "###"]);
        let level = grid(&template).level();
        assert!(is_wall(level, CellCoord::new(2, 1)));
        assert!(!is_wall(level, CellCoord::new(3, 1)));
        assert!(!is_wall(level, CellCoord::new(0, 2)));
    }

    #[test]
    fn neighbor_stops_at_edges() {
        let template = template(&["...", "..."]);
        let level = grid(&template).level();
        assert_eq!(neighbor(level, CellCoord::new(0, 0), Direction::West), None);
        assert_eq!(neighbor(level, CellCoord::new(2, 1), Direction::East), None);
        assert_eq!(neighbor(level, CellCoord::new(2, 1), Direction::South), None);
        assert_eq!(
            neighbor(level, CellCoord::new(1, 1), Direction::North),
            Some(CellCoord::new(1, 0))
        );
    }

    #[test]
    fn walled_entry_edge_is_not_enterable() {
        let template = template(&["#..", "#..", "#.."]);
        let level = grid(&template).level();
        assert!(!is_edge_enterable(level, Direction::East));
        assert!(is_edge_enterable(level, Direction::West));
        assert!(is_edge_enterable(level, Direction::South));
        assert_eq!(entry_position(level, Direction::East), None);
    }

    #[test]
    fn entry_uses_edge_midpoint() {
        let template = template(&[".....", ".....", "....."]);
        let level = grid(&template).level();
        assert_eq!(entry_position(level, Direction::East), Some(CellCoord::new(0, 1)));
        assert_eq!(entry_position(level, Direction::West), Some(CellCoord::new(4, 1)));
        assert_eq!(entry_position(level, Direction::South), Some(CellCoord::new(2, 0)));
        assert_eq!(entry_position(level, Direction::North), Some(CellCoord::new(2, 2)));
    }

    #[test]
    fn entry_lies_on_the_edge_behind_the_traveller() {
        let template = template(&["....", "....", "....", "...."]);
        let level = grid(&template).level();
        for direction in Direction::ALL {
            let entry = entry_position(level, direction).unwrap();
            assert_eq!(neighbor(level, entry, direction.opposite()), None, "{direction:?}");
            assert!(neighbor(level, entry, direction).is_some(), "{direction:?}");
        }
    }

    #[test]
    fn walled_midpoint_falls_back_to_nearest_in_scan_order() {
        let template = template(&[".#.", "...", "..."]);
        let level = grid(&template).level();
        assert_eq!(entry_position(level, Direction::South), Some(CellCoord::new(0, 0)));

        let template = self::template(&["#.#.#"]);
        let level = grid(&template).level();
        assert_eq!(entry_position(level, Direction::South), Some(CellCoord::new(1, 0)));
    }

    #[test]
    fn base_tile_recovers_covered_goals() {
        let template = template(&["G*B."]);
        let grid = grid(&template);
        assert_eq!(base_tile(grid, CellCoord::new(0, 0)), Tile::Goal);
        assert_eq!(base_tile(grid, CellCoord::new(1, 0)), Tile::Goal);
        assert_eq!(base_tile(grid, CellCoord::new(2, 0)), Tile::Empty);
        assert_eq!(base_tile(grid, CellCoord::new(3, 0)), Tile::Empty);
    }
}
