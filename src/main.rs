#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! Magpie, a bitboard chess engine speaking UCI.

#[macro_use]
mod macros;

mod chess;
mod cli;
mod errors;
mod evaluation;
mod historytable;
mod lookups;
mod perft;
mod rng;
mod search;
mod searchinfo;
mod timemgmt;
mod transpositiontable;
mod uci;
mod util;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::{
    chess::{board::Board, magic::AttackTables},
    cli::{Cli, Subcommands},
    search::SearchSession,
    searchinfo::SearchInfo,
    timemgmt::SearchLimit,
};

/// The name of the engine.
pub static NAME: &str = "Magpie";
/// The version of the engine.
pub static VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    // stdout belongs to the protocol, so diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let hash_mb = cli.hash.map(usize::try_from).transpose().context("hash size does not fit in memory")?;

    let start = std::time::Instant::now();
    let tables = Arc::new(AttackTables::new().context("failed to build the attack tables")?);
    tracing::info!(elapsed_ms = start.elapsed().as_millis(), "attack tables ready");

    match cli.subcommand {
        Some(Subcommands::Perft { depth, fen: Some(fen) }) => {
            let mut pos = Board::from_fen(&fen, tables).with_context(|| format!("invalid FEN \"{fen}\""))?;
            perft::divide(&mut pos, depth);
            Ok(())
        }
        Some(Subcommands::Perft { depth, fen: None }) => perft::gamut(&tables, depth),
        Some(Subcommands::Bench { depth }) => uci::bench(&tables, depth, hash_mb).map(|_| ()),
        Some(Subcommands::Search { fen, depth, movetime }) => {
            let mut pos = match fen {
                Some(fen) => Board::from_fen(&fen, tables).with_context(|| format!("invalid FEN \"{fen}\""))?,
                None => Board::new(tables),
            };
            let limit = match (depth, movetime) {
                (Some(depth), _) => SearchLimit::Depth(depth.clamp(1, util::MAX_DEPTH - 1)),
                (None, Some(movetime)) => SearchLimit::Time(movetime),
                (None, None) => SearchLimit::Depth(8),
            };
            let mut session = SearchSession::default();
            if let Some(mb) = hash_mb {
                session.set_hash_size(mb);
            }
            let mut info = SearchInfo::new(limit);
            pos.search_position(&mut info, &mut session);
            Ok(())
        }
        None => uci::main_loop(tables, hash_mb),
    }
}
