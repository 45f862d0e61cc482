use std::fmt::Display;

use arrayvec::ArrayVec;

use crate::{chess::chessmove::Move, util::MAX_PLY};

/// A principal variation, as reported by one node of the search.
#[derive(Clone, Debug, Default)]
pub struct PVariation {
    pub(crate) score: i32,
    pub(crate) moves: ArrayVec<Move, MAX_PLY>,
}

impl PVariation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub const fn score(&self) -> i32 {
        self.score
    }

    /// Replaces this line with `m` followed by the child's line.
    pub(crate) fn load_from(&mut self, m: Move, rest: &Self) {
        self.moves.clear();
        self.moves.push(m);
        // the child line is at most one ply shorter than ours, truncate if not.
        let room = self.moves.remaining_capacity().min(rest.moves.len());
        self.moves.extend(rest.moves[..room].iter().copied());
    }
}

impl Display for PVariation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.moves.is_empty() {
            write!(f, "pv")?;
        }
        for m in self.moves() {
            write!(f, " {m}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::{piece::Piece, types::Square};

    #[test]
    fn load_from_prepends() {
        let e4 = Move::new(Square::E2, Square::E4, Piece::WP, None, Move::DOUBLE_PUSH_FLAG);
        let e5 = Move::new(Square::E7, Square::E5, Piece::BP, None, Move::DOUBLE_PUSH_FLAG);
        let mut child = PVariation::new();
        child.load_from(e5, &PVariation::new());
        let mut parent = PVariation::new();
        parent.load_from(e4, &child);
        assert_eq!(parent.moves(), &[e4, e5]);
        assert_eq!(parent.to_string(), "pv e2e4 e7e5");
        assert_eq!(PVariation::new().to_string(), "");
    }
}
