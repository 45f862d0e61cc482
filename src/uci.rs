use std::{
    io::{BufRead, Write},
    mem::size_of,
    num::ParseIntError,
    str::FromStr,
    sync::{
        Arc,
        atomic::{self, AtomicBool},
        mpsc,
    },
};

use anyhow::Context;
use thiserror::Error;

use crate::{
    NAME, VERSION,
    chess::{board::Board, magic::AttackTables, piece::Colour},
    errors::{FenParseError, MoveParseError},
    evaluation::{MATE_SCORE, is_mate_score},
    perft,
    search::SearchSession,
    searchinfo::SearchInfo,
    timemgmt::SearchLimit,
    transpositiontable::{TT, TTEntry},
    util::MEGABYTE,
};

const MAX_HASH_MB: usize = 1 << 16;

#[derive(Debug, Error)]
enum UciError {
    #[error("ParseGo: {0}")]
    ParseGo(String),
    #[error("ParseOption: {0}")]
    ParseOption(String),
    #[error("ParseFen: {0}")]
    ParseFen(#[from] FenParseError),
    #[error("ParseMove: {0}")]
    ParseMove(#[from] MoveParseError),
    #[error("UnexpectedCommandTermination: {0}")]
    UnexpectedCommandTermination(String),
    #[error("InvalidFormat: {0}")]
    InvalidFormat(String),
    #[error("UnknownCommand: {0}")]
    UnknownCommand(String),
}

impl From<ParseIntError> for UciError {
    fn from(pie: ParseIntError) -> Self {
        Self::ParseOption(pie.to_string())
    }
}

/// Parses the token following `name` in a command.
fn parse_next<'a, T>(parts: &mut impl Iterator<Item = &'a str>, name: &str) -> Result<T, UciError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parts
        .next()
        .ok_or_else(|| UciError::InvalidFormat(format!("nothing after \"{name}\"")))?
        .parse()
        .map_err(|e| UciError::InvalidFormat(format!("value for {name} is not a number: {e}")))
}

// position fen
// position startpos
// ... moves e2e4 e7e5 b7b8q
fn parse_position(text: &str, pos: &mut Board) -> Result<(), UciError> {
    let mut parts = text.split_ascii_whitespace();
    let command = parts.next().ok_or_else(|| {
        UciError::UnexpectedCommandTermination("No command in parse_position".into())
    })?;
    if command != "position" {
        return Err(UciError::InvalidFormat("Expected 'position'".into()));
    }
    let determiner = parts.next().ok_or_else(|| {
        UciError::UnexpectedCommandTermination("No determiner after \"position\"".into())
    })?;
    if determiner == "startpos" {
        pos.set_startpos();
        let moves = parts.next(); // skip "moves"
        if !matches!(moves, Some("moves") | None) {
            return Err(UciError::InvalidFormat(
                "Expected either \"moves\" or no content to follow \"startpos\".".into(),
            ));
        }
    } else {
        if determiner != "fen" {
            return Err(UciError::InvalidFormat(format!(
                "Unknown term after \"position\": {determiner}"
            )));
        }
        let mut fen = String::new();
        for part in &mut parts {
            if part == "moves" {
                break;
            }
            fen.push_str(part);
            fen.push(' ');
        }
        pos.set_from_fen(&fen)?;
    }
    // an illegal move part way through leaves the position at the last good move.
    pos.play_uci_moves(parts)?;
    Ok(())
}

fn parse_go(text: &str, pos: &Board) -> Result<SearchLimit, UciError> {
    let mut depth: Option<i32> = None;
    let mut moves_to_go: Option<u64> = None;
    let mut movetime: Option<u64> = None;
    let mut clocks: [Option<u64>; 2] = [None; 2];
    let mut incs: [Option<u64>; 2] = [None; 2];
    let mut infinite = false;

    let mut parts = text.split_ascii_whitespace();
    let command = parts
        .next()
        .ok_or_else(|| UciError::UnexpectedCommandTermination("No command in parse_go".into()))?;
    if command != "go" {
        return Err(UciError::InvalidFormat("Expected \"go\"".into()));
    }

    while let Some(part) = parts.next() {
        match part {
            "depth" => depth = Some(parse_next(&mut parts, part)?),
            "movestogo" => moves_to_go = Some(parse_next(&mut parts, part)?),
            "movetime" => movetime = Some(parse_next(&mut parts, part)?),
            "wtime" => clocks[Colour::White] = Some(parse_next(&mut parts, part)?),
            "btime" => clocks[Colour::Black] = Some(parse_next(&mut parts, part)?),
            "winc" => incs[Colour::White] = Some(parse_next(&mut parts, part)?),
            "binc" => incs[Colour::Black] = Some(parse_next(&mut parts, part)?),
            "infinite" => infinite = true,
            other => tracing::warn!(term = other, "ignoring term in go command"),
        }
    }

    if let Some(depth) = depth {
        if depth < 1 {
            return Err(UciError::ParseGo(format!("depth must be at least 1, got {depth}")));
        }
        return Ok(SearchLimit::Depth(depth));
    }
    if let Some(movetime) = movetime {
        return Ok(SearchLimit::Time(movetime));
    }
    if infinite {
        return Ok(SearchLimit::Infinite);
    }
    let us = pos.turn();
    Ok(clocks[us].map_or(SearchLimit::Infinite, |our_clock| SearchLimit::Dynamic {
        our_clock,
        our_inc: incs[us].unwrap_or(0),
        moves_to_go,
    }))
}

fn parse_setoption(text: &str, session: &mut SearchSession) -> Result<(), UciError> {
    use UciError::UnexpectedCommandTermination;
    let mut parts = text.split_ascii_whitespace().skip(1);
    if parts.next() != Some("name") {
        return Err(UciError::InvalidFormat("expected \"name\" after \"setoption\"".into()));
    }
    let opt_name = parts.next().ok_or_else(|| {
        UnexpectedCommandTermination("no option name given after \"setoption name\"".into())
    })?;
    if parts.next() != Some("value") {
        return Err(UnexpectedCommandTermination(format!(
            "no value after \"setoption name {opt_name}\""
        )));
    }
    let opt_value = parts.next().ok_or_else(|| {
        UnexpectedCommandTermination(format!(
            "no option value given after \"setoption name {opt_name} value\""
        ))
    })?;
    match opt_name {
        "Hash" => {
            let megabytes: usize = opt_value.parse()?;
            if !(1..=MAX_HASH_MB).contains(&megabytes) {
                return Err(UciError::ParseOption(format!(
                    "Hash must be between 1 and {MAX_HASH_MB}, got {megabytes}"
                )));
            }
            session.set_hash_size(megabytes);
        }
        _ => tracing::warn!(option = opt_name, "ignoring unknown option"),
    }
    Ok(())
}

static KEEP_RUNNING: AtomicBool = AtomicBool::new(true);

fn stdin_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (sender, receiver) = mpsc::channel();
    std::thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(|| stdin_reader_worker(std::io::stdin().lock(), sender))?;
    Ok(receiver)
}

fn stdin_reader_worker(mut input: impl BufRead, sender: mpsc::Sender<String>) {
    let mut linebuf = String::with_capacity(128);
    while let Ok(bytes) = input.read_line(&mut linebuf) {
        if bytes == 0 {
            // EOF: treat a closed stdin as a request to quit.
            if sender.send("quit".into()).is_err() {
                tracing::debug!("UCI loop exited before stdin closed");
            }
            break;
        }
        let cmd = linebuf.trim();
        if cmd.is_empty() {
            linebuf.clear();
            continue;
        }
        if sender.send(cmd.to_owned()).is_err() {
            break;
        }
        if !KEEP_RUNNING.load(atomic::Ordering::SeqCst) {
            break;
        }
        linebuf.clear();
    }
}

/// Renders a score the way UCI expects it: centipawns, or moves to mate.
pub fn format_score(score: i32) -> String {
    if is_mate_score(score) {
        let plies_to_mate = MATE_SCORE - score.abs();
        let moves_to_mate = (plies_to_mate + 1) / 2;
        if score > 0 {
            format!("mate {moves_to_mate}")
        } else {
            format!("mate -{moves_to_mate}")
        }
    } else {
        format!("cp {score}")
    }
}

fn print_uci_response() {
    let default_hash = TT::DEFAULT_ENTRIES * size_of::<TTEntry>() / MEGABYTE;
    println!("id name {NAME} {VERSION}");
    println!("id author the {NAME} authors");
    println!("option name Hash type spin default {default_hash} min 1 max {MAX_HASH_MB}");
    println!("uciok");
}

pub fn main_loop(tables: Arc<AttackTables>, hash_mb: Option<usize>) -> anyhow::Result<()> {
    let stdin = stdin_reader().context("failed to start the stdin reader thread")?;

    let mut pos = Board::new(tables);
    let mut session = SearchSession::default();
    if let Some(mb) = hash_mb {
        session.set_hash_size(mb);
    }
    let mut info = SearchInfo::default();
    info.set_stdin(&stdin);

    loop {
        std::io::stdout().flush().context("failed to flush stdout")?;
        let line = match info.deferred.take() {
            Some(line) => line,
            None => match stdin.recv() {
                Ok(line) => line,
                Err(_) => break,
            },
        };
        let input = line.trim();
        tracing::debug!(command = input, "received");

        let res = match input {
            "" => continue,
            "uci" => {
                print_uci_response();
                Ok(())
            }
            "isready" => {
                println!("readyok");
                Ok(())
            }
            "quit" => {
                info.quit = true;
                break;
            }
            // nothing is running between searches.
            "stop" => Ok(()),
            "ucinewgame" => {
                pos.set_startpos();
                session.new_game();
                Ok(())
            }
            "d" => {
                println!("{}", pos.diagram());
                println!("Fen: {pos}");
                println!("Key: {:016x}", pos.key());
                Ok(())
            }
            input if input.starts_with("setoption") => parse_setoption(input, &mut session),
            input if input.starts_with("position") => parse_position(input, &mut pos),
            input if input.starts_with("go") => parse_go(input, &pos).map(|limit| {
                info.set_limit(limit);
                pos.search_position(&mut info, &mut session);
            }),
            input if input.starts_with("perft") => {
                let mut parts = input.split_ascii_whitespace().skip(1);
                parse_next::<usize>(&mut parts, "perft").map(|depth| {
                    perft::divide(&mut pos, depth);
                })
            }
            _ => Err(UciError::UnknownCommand(input.to_string())),
        };

        if let Err(e) = res {
            println!("info string {e}");
        }

        if info.quit {
            // quit can arrive during a search.
            break;
        }
    }
    KEEP_RUNNING.store(false, atomic::Ordering::SeqCst);
    Ok(())
}

const BENCH_POSITIONS: [&str; 8] = [
    Board::STARTING_FEN,
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
    "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
    "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    "r1bq1rk1/pp2ppbp/2np1np1/8/3NP3/2N1BP2/PPPQ2PP/R3KB1R w KQ - 3 9",
    "6k1/5pp1/4p2p/8/3P4/2Q3P1/5P1P/2q3K1 w - - 0 40",
    "8/8/4kpp1/3p4/p2P1P2/P3K1P1/8/8 b - - 2 45",
    "2r2rk1/1bqnbppp/p2ppn2/1p6/3NP3/1BN1BP2/PPPQ2PP/2KR3R w - - 4 14",
];

/// Searches each bench position to a fixed depth with a fresh session and
/// reports the total node count, a signature for the search's behaviour.
pub fn bench(tables: &Arc<AttackTables>, depth: i32, hash_mb: Option<usize>) -> anyhow::Result<u64> {
    let mut session = SearchSession::default();
    if let Some(mb) = hash_mb {
        session.set_hash_size(mb);
    }
    let mut info = SearchInfo::default();
    info.print_to_stdout = false;
    let start = std::time::Instant::now();
    let mut total_nodes = 0;
    for fen in BENCH_POSITIONS {
        let mut pos = Board::from_fen(fen, Arc::clone(tables))
            .with_context(|| format!("failed to parse bench position \"{fen}\""))?;
        session.new_game();
        info.set_limit(SearchLimit::Depth(depth));
        let (score, best_move) = pos.search_position(&mut info, &mut session);
        let best_move = best_move.map_or_else(|| "0000".into(), |m| m.to_string());
        println!("{fen:<75} {best_move:>6} {:>10} {:>10}", format_score(score), info.nodes);
        total_nodes += info.nodes;
    }
    let elapsed = start.elapsed();
    #[allow(clippy::cast_possible_truncation)]
    let nps = (u128::from(total_nodes) * 1_000_000 / elapsed.as_micros().max(1)) as u64;
    println!("{total_nodes} nodes {nps} nps");
    Ok(total_nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chess::magic::test_tables, evaluation::mate_in};

    #[test]
    fn scores_are_formatted_as_centipawns_or_moves_to_mate() {
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(-120), "cp -120");
        assert_eq!(format_score(mate_in(1)), "mate 1");
        assert_eq!(format_score(mate_in(3)), "mate 2");
        assert_eq!(format_score(-mate_in(2)), "mate -1");
    }

    #[test]
    fn reader_forwards_lines_and_quits_on_eof() {
        let (tx, rx) = mpsc::channel();
        stdin_reader_worker(std::io::Cursor::new("uci\n\n  isready \n"), tx);
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), ["uci", "isready", "quit"]);

        // the loop may already be gone when stdin closes.
        let (tx, rx) = mpsc::channel();
        drop(rx);
        stdin_reader_worker(std::io::Cursor::new(""), tx);
    }

    #[test]
    fn position_command_plays_moves() {
        let mut pos = Board::new(test_tables());
        parse_position("position startpos moves e2e4 e7e5 g1f3", &mut pos).unwrap();
        assert_eq!(
            pos.to_string(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R b KQkq - 1 2"
        );
        assert_eq!(pos.height(), 0);
        parse_position("position fen 4k3/8/8/8/8/8/4P3/4K3 w - - 0 1 moves e2e4", &mut pos).unwrap();
        assert_eq!(pos.to_string(), "4k3/8/8/8/4P3/8/8/4K3 b - e3 0 1");
        assert!(parse_position("position startpos moves e2e5", &mut pos).is_err());
        assert!(parse_position("position sideways", &mut pos).is_err());
    }

    #[test]
    fn go_command_limits() {
        let pos = Board::new(test_tables());
        assert_eq!(parse_go("go depth 7", &pos).unwrap(), SearchLimit::Depth(7));
        assert_eq!(parse_go("go movetime 1500", &pos).unwrap(), SearchLimit::Time(1500));
        assert_eq!(parse_go("go infinite", &pos).unwrap(), SearchLimit::Infinite);
        assert_eq!(
            parse_go("go wtime 60000 btime 50000 winc 1000 binc 500 movestogo 20", &pos).unwrap(),
            SearchLimit::Dynamic {
                our_clock: 60_000,
                our_inc: 1000,
                moves_to_go: Some(20)
            }
        );
        assert!(parse_go("go depth", &pos).is_err());
        assert!(parse_go("go depth 0", &pos).is_err());
    }

    #[test]
    fn bench_is_deterministic() {
        let tables = test_tables();
        let first = bench(&tables, 3, Some(1)).unwrap();
        let second = bench(&tables, 3, Some(1)).unwrap();
        assert_eq!(first, second);
        assert!(first > 0);
    }

    #[test]
    fn hash_option_resizes_the_table() {
        let mut session = SearchSession::new(TT::with_entries(16));
        parse_setoption("setoption name Hash value 1", &mut session).unwrap();
        assert_eq!(session.tt.len(), MEGABYTE / size_of::<TTEntry>());
        assert!(parse_setoption("setoption name Hash value 0", &mut session).is_err());
        assert!(parse_setoption("setoption name Hash", &mut session).is_err());
    }
}
