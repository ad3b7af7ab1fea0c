#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays Nestbox level packs in the terminal.

mod level_pack;
mod render;

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use nestbox_core::{Direction, Event, PlayerId, WorldSnapshot};
use nestbox_system_session::{Authority, Intent};
use nestbox_world::{query, World, WorldTemplate};

const PLAYER: PlayerId = PlayerId::new(0);

#[derive(Parser, Debug)]
#[command(name = "nestbox", about = "Recursive box-pushing puzzles", version)]
struct Cli {
    #[command(subcommand)]
    command: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Join the puzzle as a single player and apply a move script.
    Play(PlayArgs),
    /// Print every level of a pack in its starting state.
    Show(PackArgs),
}

#[derive(Args, Debug)]
struct PackArgs {
    /// Level pack TOML; the built-in demo pack is used when omitted.
    #[arg(long)]
    levels: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct PlayArgs {
    #[command(flatten)]
    pack: PackArgs,

    /// Moves as N/E/S/W or U/R/D/L, case-insensitive; whitespace is ignored.
    #[arg(long, default_value = "")]
    moves: String,

    /// Print the final world snapshot as JSON instead of ASCII frames.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Nestbox command-line interface.
fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::init();

    match cli.command {
        Mode::Play(args) => play(&args),
        Mode::Show(args) => show(&args),
    }
}

fn load_pack(args: &PackArgs) -> Result<Arc<WorldTemplate>> {
    let template = match &args.levels {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("failed to read level pack at {}", path.display()))?;
            level_pack::parse(&contents)
                .with_context(|| format!("invalid level pack {}", path.display()))?
        }
        None => level_pack::parse(level_pack::DEFAULT_PACK)
            .context("built-in level pack is invalid")?,
    };
    log::info!(
        "loaded {} levels rooted at `{}`",
        template.levels().count(),
        template.root()
    );
    Ok(Arc::new(template))
}

fn play(args: &PlayArgs) -> Result<()> {
    let template = load_pack(&args.pack)?;
    let moves = parse_moves(&args.moves)?;
    let mut authority = Authority::new(Arc::clone(&template), |sequence: u64, _: &WorldSnapshot| {
        log::debug!("committed state {sequence}");
    });
    let _ = authority
        .handle(Intent::Join { player: PLAYER })
        .context("could not place the player")?;

    if !args.json {
        print_current(&authority.snapshot(), &template);
    }
    for direction in moves {
        let pushed = authority.check_move(PLAYER, direction).pushed();
        let events = authority.handle(Intent::Move {
            player: PLAYER,
            direction,
        })?;
        if args.json {
            continue;
        }
        if pushed > 0 {
            println!("{direction:?}: pushed {pushed} box(es)");
        }
        for event in &events {
            match event {
                Event::MoveBlocked { direction, .. } => println!("{direction:?}: blocked"),
                Event::PuzzleSolved => println!("solved!"),
                _ => {}
            }
        }
        print_current(&authority.snapshot(), &template);
    }

    let snapshot = authority.snapshot();
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&snapshot).context("failed to encode snapshot")?
        );
    } else {
        println!(
            "{} goal(s) remaining{}",
            query::remaining_goals(authority.world()),
            if snapshot.solved { ", puzzle solved" } else { "" }
        );
    }
    Ok(())
}

fn show(args: &PackArgs) -> Result<()> {
    let template = load_pack(args)?;
    let snapshot = query::snapshot(&World::new(Arc::clone(&template)));
    for level in template.levels() {
        if let Some(frame) = render::frame(&snapshot, &template, level.id()) {
            println!("{frame}");
        }
    }
    Ok(())
}

fn print_current(snapshot: &WorldSnapshot, template: &WorldTemplate) {
    let Some(player) = snapshot.player(PLAYER) else {
        return;
    };
    if let Some(frame) = render::frame(snapshot, template, &player.location.level) {
        println!("depth {}\n{frame}", player.ancestors.len());
    }
}

fn parse_moves(script: &str) -> Result<Vec<Direction>> {
    script
        .chars()
        .filter(|glyph| !glyph.is_whitespace())
        .map(|glyph| match glyph.to_ascii_uppercase() {
            'N' | 'U' => Ok(Direction::North),
            'E' | 'R' => Ok(Direction::East),
            'S' | 'D' => Ok(Direction::South),
            'W' | 'L' => Ok(Direction::West),
            _ => bail!("unknown move `{glyph}`; use N/E/S/W or U/R/D/L"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_move_alphabets() {
        assert_eq!(
            parse_moves("n e\tS w u R d l").unwrap(),
            vec![
                Direction::North,
                Direction::East,
                Direction::South,
                Direction::West,
                Direction::North,
                Direction::East,
                Direction::South,
                Direction::West,
            ]
        );
        assert!(parse_moves("NX").is_err());
    }

    #[test]
    fn demo_pack_solution_solves_it() {
        let template = load_pack(&PackArgs { levels: None }).unwrap();
        let mut authority = Authority::new(template, |_: u64, _: &WorldSnapshot| {});
        let _ = authority.handle(Intent::Join { player: PLAYER }).unwrap();

        let mut events = Vec::new();
        for direction in parse_moves("EEESWWSEEE").unwrap() {
            events.extend(
                authority
                    .handle(Intent::Move {
                        player: PLAYER,
                        direction,
                    })
                    .unwrap(),
            );
        }

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::MoveBlocked { .. })));
        assert!(query::is_solved(authority.world()));
        assert_eq!(
            authority
                .snapshot()
                .player(PLAYER)
                .map(|player| player.ancestors.len()),
            Some(1)
        );
    }
}
