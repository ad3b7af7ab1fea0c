//! Immutable level templates and the text format used to author them.

use std::collections::{BTreeMap, BTreeSet};

use nestbox_core::{CellCoord, ContainerRef, LevelId, Tile};
use thiserror::Error;

use crate::{level::Level, topology};

/// Immutable starting state of a single level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelTemplate {
    level: Level,
    covered_goals: BTreeSet<CellCoord>,
}

impl LevelTemplate {
    /// Identity of the level.
    #[must_use]
    pub const fn id(&self) -> &LevelId {
        self.level.id()
    }

    /// Starting grid and container map.
    #[must_use]
    pub const fn level(&self) -> &Level {
        &self.level
    }

    /// Reports whether `cell` holds a goal, including goals that start under a box.
    #[must_use]
    pub fn is_goal(&self, cell: CellCoord) -> bool {
        self.covered_goals.contains(&cell) || self.level.tile(cell) == Some(Tile::Goal)
    }
}

/// Immutable set of level templates a world is created from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldTemplate {
    root: LevelId,
    spawn: CellCoord,
    levels: BTreeMap<LevelId, LevelTemplate>,
}

impl WorldTemplate {
    /// Level new players start in.
    #[must_use]
    pub const fn root(&self) -> &LevelId {
        &self.root
    }

    /// Preferred cell for new players in the root level.
    #[must_use]
    pub const fn spawn(&self) -> CellCoord {
        self.spawn
    }

    /// Looks up a level template by identifier.
    #[must_use]
    pub fn level(&self, id: &LevelId) -> Option<&LevelTemplate> {
        self.levels.get(id)
    }

    /// Iterates over the level templates in identifier order.
    pub fn levels(&self) -> impl Iterator<Item = &LevelTemplate> {
        self.levels.values()
    }
}

/// Errors reported while assembling a [`WorldTemplate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A level had no rows or no columns.
    #[error("level `{0}` has no cells")]
    EmptyLevel(LevelId),
    /// A row's length differed from the first row's.
    #[error("level `{level}` row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        /// Level containing the row.
        level: LevelId,
        /// Zero-based row index.
        row: u32,
        /// Width established by the first row.
        expected: u32,
        /// Width of the offending row.
        found: u32,
    },
    /// A glyph had no meaning in the grid format.
    #[error("level `{level}` has unknown glyph `{glyph}` at {cell}")]
    UnknownGlyph {
        /// Level containing the glyph.
        level: LevelId,
        /// Offending character.
        glyph: char,
        /// Position of the glyph.
        cell: CellCoord,
    },
    /// A container glyph had no entry in the level's link table.
    #[error("level `{level}` uses container `{glyph}` without a link")]
    UnlinkedContainer {
        /// Level containing the glyph.
        level: LevelId,
        /// Lowercase container key.
        glyph: char,
    },
    /// A container linked to a level that was never added.
    #[error("level `{level}` links to unknown level `{target}`")]
    DanglingLink {
        /// Level containing the container.
        level: LevelId,
        /// Missing level.
        target: LevelId,
    },
    /// Two levels shared an identifier.
    #[error("level `{0}` defined twice")]
    DuplicateLevel(LevelId),
    /// The root level was never added.
    #[error("root level `{0}` is missing")]
    MissingRoot(LevelId),
    /// A spawn marker appeared outside the root level.
    #[error("spawn marker in `{0}`, only the root level may hold one")]
    SpawnOutsideRoot(LevelId),
    /// More than one spawn marker appeared.
    #[error("root level `{0}` has more than one spawn marker")]
    MultipleSpawns(LevelId),
    /// The root level has no open cell to start on.
    #[error("root level `{0}` has no open cell for players")]
    NoOpenCell(LevelId),
}

/// Assembles a [`WorldTemplate`] from text rows.
///
/// | Glyph | Tile |
/// |-------|------|
/// | `#` | wall |
/// | `.` `_` space | empty |
/// | `G` | goal |
/// | `B` | inert box |
/// | `*` | inert box on a goal |
/// | `@` | empty, player spawn (root only) |
/// | `a`..`z` | container box, level given by the link table |
/// | `A`..`Z` other than `B`/`G` | container box on a goal, linked by its lowercase letter |
#[derive(Debug)]
pub struct TemplateBuilder {
    root: LevelId,
    levels: BTreeMap<LevelId, LevelTemplate>,
    spawn: Option<CellCoord>,
    next_tag: u32,
}

impl TemplateBuilder {
    /// Starts a template whose players spawn in `root`.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: LevelId::new(root),
            levels: BTreeMap::new(),
            spawn: None,
            next_tag: 0,
        }
    }

    /// Parses and adds a level.
    ///
    /// `links` maps lowercase container glyphs to the level each box opens into.
    pub fn add_level<S: AsRef<str>>(
        &mut self,
        id: impl Into<String>,
        rows: &[S],
        links: &[(char, &str)],
    ) -> Result<&mut Self, TemplateError> {
        let id = LevelId::new(id);
        if self.levels.contains_key(&id) {
            return Err(TemplateError::DuplicateLevel(id));
        }

        let height = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let width = rows
            .first()
            .map_or(0, |row| u32::try_from(row.as_ref().chars().count()).unwrap_or(u32::MAX));
        if width == 0 || height == 0 {
            return Err(TemplateError::EmptyLevel(id));
        }

        let mut tiles = Vec::with_capacity(rows.len() * width as usize);
        let mut containers = BTreeMap::new();
        let mut covered_goals = BTreeSet::new();

        for (row_index, row) in rows.iter().enumerate() {
            let row_index = u32::try_from(row_index).unwrap_or(u32::MAX);
            let found = u32::try_from(row.as_ref().chars().count()).unwrap_or(u32::MAX);
            if found != width {
                return Err(TemplateError::RaggedRow {
                    level: id,
                    row: row_index,
                    expected: width,
                    found,
                });
            }

            for (column, glyph) in (0..width).zip(row.as_ref().chars()) {
                let cell = CellCoord::new(column, row_index);
                let tile = match glyph {
                    '#' => Tile::Wall,
                    '.' | '_' | ' ' => Tile::Empty,
                    'G' => Tile::Goal,
                    'B' => Tile::Box,
                    '*' => {
                        let _ = covered_goals.insert(cell);
                        Tile::Box
                    }
                    '@' => {
                        if id != self.root {
                            return Err(TemplateError::SpawnOutsideRoot(id));
                        }
                        if self.spawn.replace(cell).is_some() {
                            return Err(TemplateError::MultipleSpawns(id));
                        }
                        Tile::Empty
                    }
                    key if key.is_ascii_alphabetic() => {
                        let lower = key.to_ascii_lowercase();
                        let Some((_, target)) = links.iter().find(|(glyph, _)| *glyph == lower)
                        else {
                            return Err(TemplateError::UnlinkedContainer {
                                level: id,
                                glyph: lower,
                            });
                        };
                        if key.is_ascii_uppercase() {
                            let _ = covered_goals.insert(cell);
                        }
                        let tag = self.next_tag;
                        self.next_tag = self.next_tag.saturating_add(1);
                        let _ = containers.insert(cell, ContainerRef::new(LevelId::new(*target), tag));
                        Tile::Box
                    }
                    glyph => {
                        return Err(TemplateError::UnknownGlyph {
                            level: id,
                            glyph,
                            cell,
                        })
                    }
                };
                tiles.push(tile);
            }
        }

        let level = Level::new(id.clone(), width, height, tiles, containers);
        let _ = self.levels.insert(
            id,
            LevelTemplate {
                level,
                covered_goals,
            },
        );
        Ok(self)
    }

    /// Validates cross-level links and produces the template.
    pub fn build(self) -> Result<WorldTemplate, TemplateError> {
        let Some(root) = self.levels.get(&self.root) else {
            return Err(TemplateError::MissingRoot(self.root.clone()));
        };

        for template in self.levels.values() {
            for (_, container) in template.level.containers() {
                if !self.levels.contains_key(container.level()) {
                    return Err(TemplateError::DanglingLink {
                        level: template.id().clone(),
                        target: container.level().clone(),
                    });
                }
            }
        }

        let spawn = match self.spawn {
            Some(spawn) => spawn,
            None => {
                let level = root.level();
                let center = CellCoord::new(level.width() / 2, level.height() / 2);
                topology::nearest_matching(level.cells(), center, |cell| {
                    level.tile(cell).is_some_and(Tile::is_open)
                })
                .ok_or_else(|| TemplateError::NoOpenCell(self.root.clone()))?
            }
        };

        Ok(WorldTemplate {
            root: self.root,
            spawn,
            levels: self.levels,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_glyphs_and_assigns_unique_tags() {
        let mut builder = TemplateBuilder::new("root");
        let _ = builder
            .add_level("root", &["#####", "#@aA#", "#G*B#", "#####"], &[('a', "inner")])
            .unwrap()
            .add_level("inner", &["..", ".."], &[])
            .unwrap();
        let template = builder.build().unwrap();

        assert_eq!(template.spawn(), CellCoord::new(1, 1));
        let root = template.level(&LevelId::new("root")).unwrap();
        let first = root.level().container(CellCoord::new(2, 1)).unwrap();
        let second = root.level().container(CellCoord::new(3, 1)).unwrap();
        assert_eq!(first.level(), &LevelId::new("inner"));
        assert_ne!(first.tag(), second.tag());

        assert!(root.is_goal(CellCoord::new(1, 2)));
        assert!(root.is_goal(CellCoord::new(2, 2)));
        assert!(root.is_goal(CellCoord::new(3, 1)));
        assert!(!root.is_goal(CellCoord::new(3, 2)));
        assert!(!root.is_goal(CellCoord::new(2, 1)));
    }

    #[test]
    fn rejects_ragged_rows() {
        let mut builder = TemplateBuilder::new("root");
        let error = builder.add_level("root", &["###", "##"], &[]).unwrap_err();
        assert_eq!(
            error,
            TemplateError::RaggedRow {
                level: LevelId::new("root"),
                row: 1,
                expected: 3,
                found: 2,
            }
        );
    }

    #[test]
    fn rejects_unlinked_container() {
        let mut builder = TemplateBuilder::new("root");
        let error = builder.add_level("root", &["@q"], &[]).unwrap_err();
        assert!(matches!(
            error,
            TemplateError::UnlinkedContainer { glyph: 'q', .. }
        ));
    }

    #[test]
    fn rejects_dangling_link() {
        let mut builder = TemplateBuilder::new("root");
        let _ = builder.add_level("root", &["@a"], &[('a', "nowhere")]).unwrap();
        assert!(matches!(
            builder.build(),
            Err(TemplateError::DanglingLink { .. })
        ));
    }

    #[test]
    fn rejects_spawn_outside_root() {
        let mut builder = TemplateBuilder::new("root");
        let error = builder.add_level("inner", &["@."], &[]).unwrap_err();
        assert_eq!(error, TemplateError::SpawnOutsideRoot(LevelId::new("inner")));
    }

    #[test]
    fn missing_root_is_reported() {
        let mut builder = TemplateBuilder::new("root");
        let _ = builder.add_level("inner", &[".."], &[]).unwrap();
        assert_eq!(
            builder.build().unwrap_err(),
            TemplateError::MissingRoot(LevelId::new("root"))
        );
    }

    #[test]
    fn spawn_defaults_to_open_cell_nearest_center() {
        let mut builder = TemplateBuilder::new("root");
        let _ = builder
            .add_level("root", &["#####", "#.#.#", "#####"], &[])
            .unwrap();
        let template = builder.build().unwrap();
        assert_eq!(template.spawn(), CellCoord::new(1, 1));
    }
}
