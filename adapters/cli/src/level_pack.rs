//! TOML level packs turned into world templates.

use std::collections::BTreeMap;

use nestbox_world::{TemplateBuilder, TemplateError, WorldTemplate};
use thiserror::Error;

/// Level pack format version understood by this adapter.
pub(crate) const SUPPORTED_PACK_VERSION: u32 = 1;

/// Demo pack used when no `--levels` file is given.
pub(crate) const DEFAULT_PACK: &str = include_str!("../levels/default.toml");

#[derive(Debug, serde::Deserialize)]
struct Pack {
    version: u32,
    root: String,
    levels: Vec<PackLevel>,
}

#[derive(Debug, serde::Deserialize)]
struct PackLevel {
    id: String,
    rows: Vec<String>,
    #[serde(default)]
    links: BTreeMap<String, String>,
}

/// Failures while reading a level pack.
#[derive(Debug, Error)]
pub(crate) enum LevelPackError {
    #[error("failed to parse level pack toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("unsupported level pack version {found}; expected {}", SUPPORTED_PACK_VERSION)]
    UnsupportedVersion { found: u32 },
    #[error("level `{level}` has link key `{key}`, expected a single lowercase letter")]
    BadLinkKey { level: String, key: String },
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Parses a level pack and assembles its template.
pub(crate) fn parse(contents: &str) -> Result<WorldTemplate, LevelPackError> {
    let pack: Pack = toml::from_str(contents)?;
    if pack.version != SUPPORTED_PACK_VERSION {
        return Err(LevelPackError::UnsupportedVersion {
            found: pack.version,
        });
    }

    let mut builder = TemplateBuilder::new(pack.root);
    for level in pack.levels {
        let mut links = Vec::with_capacity(level.links.len());
        for (key, target) in &level.links {
            let mut chars = key.chars();
            let glyph = match (chars.next(), chars.next()) {
                (Some(glyph), None) if glyph.is_ascii_lowercase() => glyph,
                _ => {
                    return Err(LevelPackError::BadLinkKey {
                        level: level.id,
                        key: key.clone(),
                    })
                }
            };
            links.push((glyph, target.as_str()));
        }
        let _ = builder.add_level(level.id.as_str(), &level.rows, &links)?;
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use nestbox_core::{CellCoord, LevelId};

    use super::*;

    #[test]
    fn default_pack_builds() {
        let template = parse(DEFAULT_PACK).unwrap();
        assert_eq!(template.root(), &LevelId::new("hall"));
        assert_eq!(template.spawn(), CellCoord::new(1, 1));
        assert_eq!(template.levels().count(), 2);
    }

    #[test]
    fn rejects_unknown_version() {
        let error = parse("version = 2\nroot = \"r\"\nlevels = []\n").unwrap_err();
        assert!(matches!(
            error,
            LevelPackError::UnsupportedVersion { found: 2 }
        ));
    }

    #[test]
    fn rejects_multi_letter_link_keys() {
        let contents = r#"
version = 1
root = "r"

[[levels]]
id = "r"
rows = ["@a"]
links = { ab = "r" }
"#;
        assert!(matches!(
            parse(contents),
            Err(LevelPackError::BadLinkKey { .. })
        ));
    }

    #[test]
    fn surfaces_template_errors() {
        let contents = r#"
version = 1
root = "r"

[[levels]]
id = "r"
rows = ["@a"]
links = { a = "nowhere" }
"#;
        assert!(matches!(
            parse(contents),
            Err(LevelPackError::Template(TemplateError::DanglingLink { .. }))
        ));
    }
}
