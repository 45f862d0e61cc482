use std::{sync::Arc, time::Instant};

use anyhow::{Context, bail};

use crate::chess::{
    board::{Board, movegen::MoveList},
    magic::AttackTables,
};

/// Reference positions with their known move-path counts at depths 1, 2, 3, ...
pub const PERFT_SUITE: [(&str, &[u64]); 6] = [
    (Board::STARTING_FEN, &[20, 400, 8902, 197_281, 4_865_609]),
    (
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        &[48, 2039, 97_862, 4_085_603],
    ),
    ("8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1", &[14, 191, 2812, 43_238, 674_624]),
    (
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        &[6, 264, 9467, 422_333],
    ),
    (
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        &[44, 1486, 62_379, 2_103_487],
    ),
    (
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
        &[46, 2079, 89_890, 3_894_594],
    ),
];

pub fn perft(pos: &mut Board, depth: usize) -> u64 {
    #[cfg(debug_assertions)]
    if let Err(e) = pos.check_validity() {
        panic!("invalid position in perft: {e}");
    }

    if depth == 0 {
        return 1;
    }

    let mut ml = MoveList::new();
    pos.generate_moves(&mut ml);

    let mut count = 0;
    for &m in ml.iter_moves() {
        if !pos.make_move(m, false) {
            continue;
        }
        count += perft(pos, depth - 1);
        pos.unmake_move();
    }

    count
}

/// Perft with the count below each root move printed, for narrowing down generator bugs.
pub fn divide(pos: &mut Board, depth: usize) -> u64 {
    let start = Instant::now();
    let mut ml = MoveList::new();
    pos.generate_moves(&mut ml);

    let mut total = 0;
    for &m in ml.iter_moves() {
        if !pos.make_move(m, false) {
            continue;
        }
        let count = perft(pos, depth.saturating_sub(1));
        pos.unmake_move();
        println!("{m}: {count}");
        total += count;
    }

    let elapsed = start.elapsed();
    println!();
    println!("Nodes searched: {total}");
    tracing::info!(depth, nodes = total, elapsed_ms = elapsed.as_millis(), "perft finished");
    total
}

/// Runs every position of `PERFT_SUITE` to every known depth up to `max_depth`.
pub fn gamut(tables: &Arc<AttackTables>, max_depth: usize) -> anyhow::Result<()> {
    let start = Instant::now();
    for (fen, counts) in PERFT_SUITE {
        let mut pos = Board::from_fen(fen, Arc::clone(tables))
            .with_context(|| format!("failed to parse suite position \"{fen}\""))?;
        for (depth, &expected) in (1..=max_depth).zip(counts) {
            let nodes = perft(&mut pos, depth);
            if nodes != expected {
                bail!("perft failed on fen {fen}, depth {depth}: expected {expected}, got {nodes}");
            }
            println!("PASS: fen {fen}, depth {depth}");
        }
    }
    tracing::info!(elapsed_ms = start.elapsed().as_millis(), "perft suite passed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::magic::test_tables;

    #[test]
    fn perft_start_position() {
        let mut pos = Board::new(test_tables());
        assert_eq!(perft(&mut pos, 1), 20);
        assert_eq!(perft(&mut pos, 2), 400);
        assert_eq!(perft(&mut pos, 3), 8_902);
        assert_eq!(perft(&mut pos, 4), 197_281);
    }

    #[test]
    fn perft_kiwipete() {
        let (fen, counts) = PERFT_SUITE[1];
        let mut pos = Board::from_fen(fen, test_tables()).unwrap();
        for (depth, &expected) in (1..=3).zip(counts) {
            assert_eq!(perft(&mut pos, depth), expected, "depth {depth}");
        }
    }

    #[test]
    fn perft_suite_shallow() {
        gamut(&test_tables(), 2).unwrap();
    }

    #[test]
    fn divide_matches_perft() {
        let (fen, _) = PERFT_SUITE[4];
        let mut pos = Board::from_fen(fen, test_tables()).unwrap();
        let before = pos.clone();
        assert_eq!(divide(&mut pos, 2), perft(&mut pos, 2));
        assert_eq!(pos, before);
    }
}
