//! ASCII frames of live levels, using the level-pack glyphs.

use nestbox_core::{CellCoord, LevelId, LevelSnapshot, Tile, WorldSnapshot};
use nestbox_world::{LevelTemplate, WorldTemplate};

/// Draws `level` with every player standing in it.
///
/// Container boxes show the first letter of the level they open into,
/// uppercased when resting on a goal.
pub(crate) fn frame(snapshot: &WorldSnapshot, template: &WorldTemplate, level: &LevelId) -> Option<String> {
    let live = snapshot.level(level)?;
    let goals = template.level(level)?;

    let mut out = format!("[{level}]\n");
    for row in 0..live.height {
        for column in 0..live.width {
            let cell = CellCoord::new(column, row);
            let occupied = snapshot
                .players
                .iter()
                .any(|player| player.location.level == *level && player.location.cell == cell);
            out.push(if occupied {
                '@'
            } else {
                glyph(live, goals, cell)
            });
        }
        out.push('\n');
    }
    Some(out)
}

fn glyph(live: &LevelSnapshot, goals: &LevelTemplate, cell: CellCoord) -> char {
    match live.tile(cell) {
        Some(Tile::Wall) => '#',
        Some(Tile::Goal) => 'G',
        Some(Tile::Empty) | None => '.',
        Some(Tile::Box) => {
            let on_goal = goals.is_goal(cell);
            match live.container(cell) {
                Some(container) => {
                    let letter = container
                        .level()
                        .as_str()
                        .chars()
                        .find(char::is_ascii_alphabetic)
                        .unwrap_or('c')
                        .to_ascii_lowercase();
                    if on_goal {
                        letter.to_ascii_uppercase()
                    } else {
                        letter
                    }
                }
                None if on_goal => '*',
                None => 'B',
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nestbox_core::{Command, Direction, PlayerId};
    use nestbox_world::{self as world, query, TemplateBuilder, World};

    use super::*;

    #[test]
    fn draws_players_boxes_and_containers() {
        let mut builder = TemplateBuilder::new("root");
        let _ = builder
            .add_level("root", &["#@BG#", "#.k.#", "#*..#"], &[('k', "keep")])
            .unwrap()
            .add_level("keep", &["."], &[])
            .unwrap();
        let template = Arc::new(builder.build().unwrap());
        let mut world = World::new(Arc::clone(&template));
        let mut events = Vec::new();
        world::apply(&mut world, Command::AddPlayer { player: PlayerId::new(0) }, &mut events);
        world::apply(
            &mut world,
            Command::MovePlayer {
                player: PlayerId::new(0),
                direction: Direction::East,
            },
            &mut events,
        );

        let drawn = frame(&query::snapshot(&world), &template, &LevelId::new("root")).unwrap();
        assert_eq!(drawn, "[root]\n#.@*#\n#.k.#\n#*..#\n");
    }

    #[test]
    fn unknown_level_has_no_frame() {
        let mut builder = TemplateBuilder::new("root");
        let _ = builder.add_level("root", &["@"], &[]).unwrap();
        let template = builder.build().unwrap();
        let snapshot = query::snapshot(&World::new(Arc::new(template.clone())));
        assert_eq!(frame(&snapshot, &template, &LevelId::new("attic")), None);
    }
}
