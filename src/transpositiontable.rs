use std::mem::size_of;

use crate::{
    chess::chessmove::Move,
    evaluation::MINIMUM_MATE_SCORE,
    util::MEGABYTE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Bound {
    #[default]
    None = 0,
    Upper = 1,
    Lower = 2,
    Exact = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TTEntry {
    pub key: u64,
    pub m: Option<Move>,
    pub score: i32,
    pub depth: u8,
    pub bound: Bound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TTHit {
    pub mov: Option<Move>,
    pub depth: i32,
    pub bound: Bound,
    pub value: i32,
}

impl TTHit {
    /// The score to return immediately, if this entry is deep enough and its
    /// bound already settles the window `(alpha, beta)`.
    pub fn cutoff(&self, depth: i32, alpha: i32, beta: i32) -> Option<i32> {
        if self.depth < depth {
            return None;
        }
        match self.bound {
            Bound::Exact => Some(self.value),
            Bound::Lower if self.value >= beta => Some(self.value),
            Bound::Upper if self.value <= alpha => Some(self.value),
            _ => None,
        }
    }
}

/// Single-slot, always-replace hash table of search results.
#[derive(Debug)]
pub struct TT {
    table: Vec<TTEntry>,
}

impl Default for TT {
    fn default() -> Self {
        Self::with_entries(Self::DEFAULT_ENTRIES)
    }
}

impl TT {
    pub const DEFAULT_ENTRIES: usize = 0x40_0000;

    pub fn with_entries(entries: usize) -> Self {
        Self {
            table: vec![TTEntry::default(); entries.max(1)],
        }
    }

    /// Reallocates the table to fill `megabytes` of memory, dropping every entry.
    pub fn resize(&mut self, megabytes: usize) {
        let start = std::time::Instant::now();
        let entries = megabytes * MEGABYTE / size_of::<TTEntry>();
        self.table = Vec::new();
        self.table = vec![TTEntry::default(); entries.max(1)];
        tracing::info!(
            megabytes,
            entries = self.table.len(),
            elapsed_us = start.elapsed().as_micros(),
            "hash table resized"
        );
    }

    pub fn clear(&mut self) {
        self.table.fill(TTEntry::default());
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn index(&self, key: u64) -> usize {
        #![allow(clippy::cast_possible_truncation)]
        (key % self.table.len() as u64) as usize
    }

    /// Writes an entry, overwriting whatever occupied the slot.
    pub fn store(
        &mut self,
        key: u64,
        ply: usize,
        best_move: Option<Move>,
        score: i32,
        flag: Bound,
        depth: i32,
    ) {
        let index = self.index(key);
        let slot = &mut self.table[index];
        // keep the old move if we have nothing better for the same position.
        let m = best_move.or(if slot.key == key { slot.m } else { None });
        *slot = TTEntry {
            key,
            m,
            score: normalise_mate_score(score, ply),
            depth: depth.clamp(0, i32::from(u8::MAX)).try_into().unwrap_or(u8::MAX),
            bound: flag,
        };
    }

    pub fn probe(&self, key: u64, ply: usize) -> Option<TTHit> {
        let entry = &self.table[self.index(key)];
        if entry.key != key || entry.bound == Bound::None {
            return None;
        }
        Some(TTHit {
            mov: entry.m,
            depth: entry.depth.into(),
            bound: entry.bound,
            value: reconstruct_mate_score(entry.score, ply),
        })
    }

    /// Occupancy of the first thousand slots, in permille.
    pub fn hashfull(&self) -> usize {
        self.table.iter().take(1000).filter(|e| e.bound != Bound::None).count() * 1000
            / self.table.len().min(1000)
    }
}

/// Mate scores are stored relative to the node they were found at, not the root.
const fn normalise_mate_score(mut score: i32, ply: usize) -> i32 {
    #![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    if score >= MINIMUM_MATE_SCORE {
        score += ply as i32;
    } else if score <= -MINIMUM_MATE_SCORE {
        score -= ply as i32;
    }
    score
}

const fn reconstruct_mate_score(mut score: i32, ply: usize) -> i32 {
    #![allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    if score >= MINIMUM_MATE_SCORE {
        score -= ply as i32;
    } else if score <= -MINIMUM_MATE_SCORE {
        score += ply as i32;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chess::{piece::Piece, types::Square},
        evaluation::{mate_in, mated_in},
    };

    #[test]
    fn exact_entry_round_trip() {
        let mut tt = TT::with_entries(1024);
        let key = 0xDEAD_BEEF_0123_4567;
        tt.store(key, 3, None, 123, Bound::Exact, 6);
        for depth in 0..=6 {
            assert_eq!(tt.probe(key, 3).and_then(|h| h.cutoff(depth, -1000, 1000)), Some(123));
        }
        assert_eq!(tt.probe(key, 3).and_then(|h| h.cutoff(7, -1000, 1000)), None);
        assert_eq!(tt.probe(key ^ 1, 3).and_then(|h| h.cutoff(1, -1000, 1000)), None);
    }

    #[test]
    fn bound_semantics() {
        let mut tt = TT::with_entries(64);
        tt.store(1, 0, None, 50, Bound::Lower, 4);
        assert_eq!(tt.probe(1, 0).and_then(|h| h.cutoff(4, 0, 40)), Some(50));
        assert_eq!(tt.probe(1, 0).and_then(|h| h.cutoff(4, 0, 60)), None);
        tt.store(2, 0, None, -50, Bound::Upper, 4);
        assert_eq!(tt.probe(2, 0).and_then(|h| h.cutoff(4, -40, 0)), Some(-50));
        assert_eq!(tt.probe(2, 0).and_then(|h| h.cutoff(4, -60, 0)), None);
    }

    #[test]
    fn collisions_overwrite() {
        let mut tt = TT::with_entries(8);
        tt.store(3, 0, None, 10, Bound::Exact, 9);
        tt.store(11, 0, None, 20, Bound::Exact, 1);
        assert!(tt.probe(3, 0).is_none());
        assert_eq!(tt.probe(11, 0).map(|h| h.value), Some(20));
    }

    #[test]
    fn mate_scores_are_ply_corrected() {
        let mut tt = TT::with_entries(64);
        // found mate-in-5-from-root at ply 2: mate is 3 plies away from this node.
        tt.store(7, 2, None, mate_in(5), Bound::Exact, 3);
        // reached again at ply 4, the same mate is now 7 plies from the root.
        assert_eq!(tt.probe(7, 4).map(|h| h.value), Some(mate_in(7)));
        tt.store(8, 2, None, mated_in(5), Bound::Exact, 3);
        assert_eq!(tt.probe(8, 0).map(|h| h.value), Some(mated_in(3)));
        tt.store(9, 2, None, 300, Bound::Exact, 3);
        assert_eq!(tt.probe(9, 10).map(|h| h.value), Some(300));
    }

    #[test]
    fn best_move_is_retained_and_cleared() {
        let mut tt = TT::with_entries(64);
        let m = Move::new(Square::E2, Square::E4, Piece::WP, None, Move::DOUBLE_PUSH_FLAG);
        tt.store(5, 0, Some(m), 0, Bound::Lower, 2);
        tt.store(5, 0, None, 0, Bound::Upper, 3);
        assert_eq!(tt.probe(5, 0).and_then(|h| h.mov), Some(m));
        tt.clear();
        assert!(tt.probe(5, 0).is_none());
        tt.resize(1);
        assert_eq!(tt.len(), MEGABYTE / size_of::<TTEntry>());
    }
}
