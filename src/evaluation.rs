// The granularity of evaluation in this engine is in centipawns.

pub mod score;
mod tables;

use score::S;
use tables::{CENTRE_DISTANCE, EG_TABLES, MG_TABLES};

use crate::{
    chess::{
        board::Board,
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::Square,
    },
    util::{MAX_DEPTH, MAX_PLY},
};

/// The value of checkmate.
/// To recover depth-to-mate, we subtract depth (ply) from this value.
/// e.g. if white has a mate in two ply, the output from a depth-5 search will be
/// two less than `MATE_SCORE`.
pub const MATE_SCORE: i32 = 49_000;
pub const fn mate_in(ply: usize) -> i32 {
    #![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    debug_assert!(ply <= MAX_PLY);
    MATE_SCORE - ply as i32
}
pub const fn mated_in(ply: usize) -> i32 {
    -mate_in(ply)
}

/// A threshold over which scores must be mate.
pub const MINIMUM_MATE_SCORE: i32 = MATE_SCORE - MAX_DEPTH;

pub const fn is_mate_score(score: i32) -> bool {
    score.abs() >= MINIMUM_MATE_SCORE
}

/// The value of a draw.
pub const DRAW_SCORE: i32 = 0;

pub static PIECE_VALUES: [S; 6] = [
    S(82, 94),
    S(337, 281),
    S(365, 297),
    S(477, 512),
    S(1025, 936),
    S(0, 0),
];

/// Contribution of each piece type to the game phase.
const PHASE_WEIGHTS: [i32; 6] = [0, 1, 1, 2, 4, 0];
/// The phase of the full starting material.
pub const MAX_PHASE: i32 = 24;
/// Below this much of its own material, a side is considered to be in its endgame.
const ENDGAME_PHASE_MATERIAL: i32 = 2 * PHASE_WEIGHTS[3] + PHASE_WEIGHTS[2] + PHASE_WEIGHTS[1];

/// Applied to each pawn that shares its file with friendly pawns.
pub const DOUBLED_PAWN_MALUS: S = S(10, 10);
/// Applied when a pawn has no friendly pawns on either neighbouring file.
pub const ISOLATED_PAWN_MALUS: S = S(10, 10);
/// Indexed by relative rank.
pub const PASSED_PAWN_BONUS: [i32; 8] = [0, 5, 10, 20, 30, 45, 60, 0];
/// For a rook with no friendly pawns on its file. Applied to kings as a malus.
pub const SEMI_OPEN_FILE_BONUS: S = S(15, 15);
/// On top of the semi-open bonus, for a file with no pawns at all.
pub const OPEN_FILE_BONUS: S = S(20, 20);
/// Per friendly piece next to the king.
pub const KING_SHIELD_BONUS: S = S(10, 5);
/// Per square attacked by a knight, bishop, rook or queen.
pub const MOBILITY_BONUS: S = S(3, 5);

/// Squares strictly in front of `sq` from `colour`'s point of view, on any file.
const fn forward_ranks(colour: Colour, sq: Square) -> SquareSet {
    let rank = sq.rank().index();
    match colour {
        Colour::White if rank < 7 => SquareSet::from_inner(!0 << (8 * (rank + 1))),
        Colour::Black if rank > 0 => SquareSet::from_inner(!0 >> (8 * (8 - rank))),
        _ => SquareSet::EMPTY,
    }
}

impl Board {
    /// Computes a score for the position, from the point of view of the side to move.
    pub fn evaluate(&self) -> i32 {
        let white = self.side_term(Colour::White);
        let black = self.side_term(Colour::Black);
        let mut score = white - black;

        let white_phase = self.phase_of(Colour::White);
        let black_phase = self.phase_of(Colour::Black);
        let mop_up = self.mop_up_term(Colour::White, white_phase, black_phase)
            - self.mop_up_term(Colour::Black, black_phase, white_phase);
        score.1 += mop_up;

        let phase = (white_phase + black_phase).min(MAX_PHASE);
        let score = score.value(phase, MAX_PHASE);

        if self.turn() == Colour::White { score } else { -score }
    }

    /// Material-weighted phase contribution of one side's pieces.
    pub fn phase_of(&self, colour: Colour) -> i32 {
        #![allow(clippy::cast_possible_wrap)]
        Piece::of_colour(colour)
            .map(|p| PHASE_WEIGHTS[p.piece_type().index()] * self.pieces(p).count() as i32)
            .sum()
    }

    /// Everything one side earns on its own, as a positive score for that side.
    fn side_term(&self, colour: Colour) -> S {
        let mut score = S::NULL;
        for pt in PieceType::all() {
            for sq in self.pieces(Piece::new(colour, pt)) {
                let rel = sq.relative_to(colour);
                score += PIECE_VALUES[pt.index()];
                score += S(MG_TABLES[pt.index()][rel], EG_TABLES[pt.index()][rel]);
            }
        }
        score += self.pawn_structure_term(colour);
        score += self.file_term(colour);
        score += self.king_shield_term(colour);
        score += self.mobility_term(colour);
        score
    }

    fn pawn_structure_term(&self, colour: Colour) -> S {
        #![allow(clippy::cast_possible_wrap)]
        let our_pawns = self.pieces(Piece::new(colour, PieceType::Pawn));
        let their_pawns = self.pieces(Piece::new(!colour, PieceType::Pawn));
        let mut score = S::NULL;
        for sq in our_pawns {
            let file = SquareSet::file_of(sq);
            let on_file = (our_pawns & file).count() as i32;
            score -= DOUBLED_PAWN_MALUS * (on_file - 1);

            let neighbours = file.adjacent_files();
            if our_pawns & neighbours == SquareSet::EMPTY {
                score -= ISOLATED_PAWN_MALUS;
            }

            // blocked by an enemy pawn in front or beside, or by a friendly pawn in front.
            let span = forward_ranks(colour, sq);
            let stoppers = (their_pawns & (file | neighbours)) | (our_pawns & file);
            if stoppers & span == SquareSet::EMPTY {
                let bonus = PASSED_PAWN_BONUS[sq.rank().relative_to(colour).index()];
                score += S(bonus, bonus);
            }
        }
        score
    }

    fn file_term(&self, colour: Colour) -> S {
        let our_pawns = self.pieces(Piece::new(colour, PieceType::Pawn));
        let all_pawns = our_pawns | self.pieces(Piece::new(!colour, PieceType::Pawn));
        let openness = |sq: Square| {
            let file = SquareSet::file_of(sq);
            let mut bonus = S::NULL;
            if our_pawns & file == SquareSet::EMPTY {
                bonus += SEMI_OPEN_FILE_BONUS;
            }
            if all_pawns & file == SquareSet::EMPTY {
                bonus += OPEN_FILE_BONUS;
            }
            bonus
        };

        let mut score: S = self.pieces(Piece::new(colour, PieceType::Rook)).iter().map(openness).sum();
        // a king on an open file is exposed.
        score -= openness(self.king_sq(colour));
        score
    }

    fn king_shield_term(&self, colour: Colour) -> S {
        #![allow(clippy::cast_possible_wrap)]
        let around = self.tables().king_attacks(self.king_sq(colour));
        KING_SHIELD_BONUS * (around & self.colour(colour)).count() as i32
    }

    fn mobility_term(&self, colour: Colour) -> S {
        #![allow(clippy::cast_possible_wrap)]
        let t = self.tables();
        let occupied = self.occupied();
        let mut squares = 0;
        for sq in self.pieces(Piece::new(colour, PieceType::Knight)) {
            squares += (t.knight_attacks(sq) & !self.colour(colour)).count();
        }
        for pt in [PieceType::Bishop, PieceType::Rook, PieceType::Queen] {
            for sq in self.pieces(Piece::new(colour, pt)) {
                squares += t.attacks_by_type(pt, sq, occupied).count();
            }
        }
        MOBILITY_BONUS * squares as i32
    }

    /// Rewards pushing the enemy king to the edge and walking our own king towards it,
    /// once the opponent is down to endgame material and we are not behind.
    fn mop_up_term(&self, colour: Colour, our_phase: i32, their_phase: i32) -> i32 {
        let weight = ENDGAME_PHASE_MATERIAL - their_phase.min(ENDGAME_PHASE_MATERIAL);
        if our_phase < their_phase || weight == 0 {
            return 0;
        }
        let ours = self.king_sq(colour);
        let theirs = self.king_sq(!colour);
        let score = CENTRE_DISTANCE[theirs] * 10 + (14 - i32::from(Square::manhattan(ours, theirs))) * 4;
        score * weight / ENDGAME_PHASE_MATERIAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::magic::test_tables;

    fn eval(fen: &str) -> i32 {
        Board::from_fen(fen, test_tables()).unwrap().evaluate()
    }

    /// Mirrors a FEN vertically and swaps the colours.
    fn flip(fen: &str) -> String {
        let mut parts = fen.split(' ');
        let board = parts.next().unwrap();
        let side = parts.next().unwrap();
        let swap = |s: &str| {
            s.chars()
                .map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c.to_ascii_uppercase() })
                .collect::<String>()
        };
        let board = board.split('/').rev().map(swap).collect::<Vec<_>>().join("/");
        let side = if side == "w" { "b" } else { "w" };
        format!("{board} {side} - - 0 1")
    }

    #[test]
    fn start_position_is_balanced() {
        assert_eq!(eval(Board::STARTING_FEN), 0);
    }

    #[test]
    fn evaluation_is_colour_symmetric() {
        for fen in [
            "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w - - 0 1",
            "4k3/8/8/3PP3/8/8/5p2/4K3 w - - 0 1",
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w - - 0 1",
            "6k1/8/8/8/8/8/8/3QK3 b - - 0 1",
        ] {
            assert_eq!(eval(fen), eval(&flip(fen)), "{fen}");
        }
    }

    #[test]
    fn extra_material_is_good() {
        assert!(eval("4k3/8/8/8/8/8/8/3QK3 w - - 0 1") > 800);
        assert!(eval("4k3/8/8/8/8/8/8/3QK3 b - - 0 1") < -800);
    }

    #[test]
    fn passed_pawns_are_rewarded() {
        // same material, but the e-pawn on the left is unopposed.
        let passed = eval("4k3/8/8/4P3/8/8/8/4K3 w - - 0 1");
        let blocked = eval("4k3/4p3/8/4P3/8/8/8/4K3 w - - 0 1");
        let lone_black = eval("4k3/4p3/8/8/8/8/8/4K3 w - - 0 1");
        assert!(passed > blocked - lone_black);
    }

    #[test]
    fn mate_scores() {
        assert!(is_mate_score(mate_in(3)));
        assert!(is_mate_score(mated_in(10)));
        assert!(!is_mate_score(3000));
        assert_eq!(mate_in(0), -mated_in(0));
    }
}
