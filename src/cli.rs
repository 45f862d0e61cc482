use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(author, version, about)]
pub struct Cli {
    /// Hash table size in MB - if omitted, the default table size is used
    #[clap(long, value_name = "MB", value_parser = clap::value_parser!(u64).range(1..=65536))]
    pub hash: Option<u64>,
    #[clap(subcommand)]
    pub subcommand: Option<Subcommands>,
}

#[derive(Subcommand)]
pub enum Subcommands {
    /// Count move paths from a position, printing the count below each root move.
    /// Without a FEN, runs the built-in suite of reference positions instead.
    Perft {
        /// Depth to count to.
        #[clap(long, value_name = "N", default_value = "5")]
        depth: usize,
        /// Position to count from.
        #[clap(long, value_name = "FEN")]
        fen: Option<String>,
    },
    /// Search a fixed set of positions to a fixed depth and report the node count.
    Bench {
        #[clap(long, value_name = "N", default_value = "8")]
        depth: i32,
    },
    /// Search a single position and print the best move.
    Search {
        #[clap(long, value_name = "FEN")]
        fen: Option<String>,
        /// Depth to search to.
        #[clap(long, value_name = "N", conflicts_with = "movetime")]
        depth: Option<i32>,
        /// Milliseconds to search for.
        #[clap(long, value_name = "MS")]
        movetime: Option<u64>,
    },
}
