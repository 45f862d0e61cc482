use std::{
    fmt::{Display, Formatter},
    ops::{Deref, DerefMut},
};

use arrayvec::ArrayVec;

use crate::chess::{
    board::Board,
    chessmove::Move,
    piece::{Colour, Piece, PieceType},
    squareset::SquareSet,
    types::Square,
};

/// Comfortably above the largest known number of moves in a legal position (218).
pub const MAX_POSITION_MOVES: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveListEntry {
    pub score: i32,
    pub mov: Move,
}

#[derive(Clone, Debug, Default)]
pub struct MoveList {
    inner: ArrayVec<MoveListEntry, MAX_POSITION_MOVES>,
}

impl MoveList {
    pub fn new() -> Self {
        Self {
            inner: ArrayVec::new(),
        }
    }

    fn push(&mut self, m: Move) {
        // overflow here means the generator is broken, not that the position is unusual.
        self.inner.push(MoveListEntry { mov: m, score: 0 });
    }

    pub fn iter_moves(&self) -> impl Iterator<Item = &Move> {
        self.inner.iter().map(|e| &e.mov)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    /// Selection step for lazy move ordering: swaps the best-scored entry
    /// in `index..` into `index` and returns its move.
    pub fn pick(&mut self, index: usize) -> Option<Move> {
        let best = (index..self.inner.len()).max_by_key(|&i| (self.inner[i].score, std::cmp::Reverse(i)))?;
        self.inner.swap(index, best);
        Some(self.inner[index].mov)
    }
}

impl Deref for MoveList {
    type Target = [MoveListEntry];

    fn deref(&self) -> &[MoveListEntry] {
        &self.inner
    }
}

impl DerefMut for MoveList {
    fn deref_mut(&mut self) -> &mut [MoveListEntry] {
        &mut self.inner
    }
}

impl Display for MoveList {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        if self.inner.is_empty() {
            return write!(f, "MoveList: (0) []");
        }
        writeln!(f, "MoveList: ({}) [", self.inner.len())?;
        for m in &self.inner[0..self.inner.len() - 1] {
            writeln!(f, "  {} ${}, ", m.mov, m.score)?;
        }
        let last = &self.inner[self.inner.len() - 1];
        writeln!(f, "  {} ${}", last.mov, last.score)?;
        write!(f, "]")
    }
}

pub trait MoveGenMode {
    const SKIP_QUIETS: bool;
}

pub struct SkipQuiets;
impl MoveGenMode for SkipQuiets {
    const SKIP_QUIETS: bool = true;
}
pub struct AllMoves;
impl MoveGenMode for AllMoves {
    const SKIP_QUIETS: bool = false;
}

impl Board {
    /// Pushes a pawn move, expanding it into the four promotions when it lands on a back rank.
    fn push_pawn_move(move_list: &mut MoveList, from: Square, to: Square, pawn: Piece, flags: u32) {
        if SquareSet::BACK_RANKS.contains_square(to) {
            for promo in PieceType::PROMOTIONS {
                let promo = Piece::new(pawn.colour(), promo);
                move_list.push(Move::new(from, to, pawn, Some(promo), flags));
            }
        } else {
            move_list.push(Move::new(from, to, pawn, None, flags));
        }
    }

    fn generate_pawn_forward(&self, move_list: &mut MoveList) {
        let us = self.turn();
        let pawn = Piece::new(us, PieceType::Pawn);
        let our_pawns = self.pieces(pawn);
        let empty = self.empty();

        let (single, double) = match us {
            Colour::White => {
                let single = our_pawns.north_one() & empty;
                let double = (our_pawns & SquareSet::RANK_2).north_one() & empty;
                (single, double.north_one() & empty)
            }
            Colour::Black => {
                let single = our_pawns.south_one() & empty;
                let double = (our_pawns & SquareSet::RANK_7).south_one() & empty;
                (single, double.south_one() & empty)
            }
        };

        for to in single {
            let Some(from) = to.pawn_push(!us) else { continue };
            Self::push_pawn_move(move_list, from, to, pawn, 0);
        }
        for to in double {
            let Some(from) = to.pawn_push(!us).and_then(|sq| sq.pawn_push(!us)) else {
                continue;
            };
            move_list.push(Move::new(from, to, pawn, None, Move::DOUBLE_PUSH_FLAG));
        }
    }

    fn generate_pawn_caps(&self, move_list: &mut MoveList) {
        let us = self.turn();
        let pawn = Piece::new(us, PieceType::Pawn);
        let their_pieces = self.colour(!us);
        let t = self.tables();

        for from in self.pieces(pawn) {
            let attacks = t.pawn_attacks(us, from);
            for to in attacks & their_pieces {
                Self::push_pawn_move(move_list, from, to, pawn, Move::CAPTURE_FLAG);
            }
            // the en passant square is treated as an occupied target only while it exists.
            if let Some(ep) = self.ep_sq() {
                if attacks.contains_square(ep) {
                    let flags = Move::CAPTURE_FLAG | Move::EP_FLAG;
                    move_list.push(Move::new(from, ep, pawn, None, flags));
                }
            }
        }
    }

    fn generate_piece_moves<Mode: MoveGenMode>(&self, move_list: &mut MoveList) {
        let us = self.turn();
        let our_pieces = self.colour(us);
        let their_pieces = self.colour(!us);
        let occupied = self.occupied();
        let valid_targets = if Mode::SKIP_QUIETS { their_pieces } else { !our_pieces };
        let t = self.tables();

        for pt in [
            PieceType::Knight,
            PieceType::Bishop,
            PieceType::Rook,
            PieceType::Queen,
            PieceType::King,
        ] {
            let piece = Piece::new(us, pt);
            for from in self.pieces(piece) {
                let attacks = t.attacks_by_type(pt, from, occupied) & valid_targets;
                for to in attacks {
                    let flags = if their_pieces.contains_square(to) { Move::CAPTURE_FLAG } else { 0 };
                    move_list.push(Move::new(from, to, piece, None, flags));
                }
            }
        }
    }

    fn generate_castling_moves(&self, move_list: &mut MoveList) {
        let us = self.turn();
        let rights = self.castling_rights();
        let occupied = self.occupied();
        let king = Piece::new(us, PieceType::King);

        // (right held, king from, king to, squares that must be empty, squares that must be safe)
        let candidates = match us {
            Colour::White => [
                (
                    rights.kingside(Colour::White),
                    Square::E1,
                    Square::G1,
                    Square::F1.as_set() | Square::G1.as_set(),
                    [Square::E1, Square::F1],
                ),
                (
                    rights.queenside(Colour::White),
                    Square::E1,
                    Square::C1,
                    Square::D1.as_set() | Square::C1.as_set() | Square::B1.as_set(),
                    [Square::E1, Square::D1],
                ),
            ],
            Colour::Black => [
                (
                    rights.kingside(Colour::Black),
                    Square::E8,
                    Square::G8,
                    Square::F8.as_set() | Square::G8.as_set(),
                    [Square::E8, Square::F8],
                ),
                (
                    rights.queenside(Colour::Black),
                    Square::E8,
                    Square::C8,
                    Square::D8.as_set() | Square::C8.as_set() | Square::B8.as_set(),
                    [Square::E8, Square::D8],
                ),
            ],
        };

        for (allowed, from, to, must_be_empty, must_be_safe) in candidates {
            if !allowed || (occupied & must_be_empty) != SquareSet::EMPTY {
                continue;
            }
            // the landing square is checked by the legality test in make_move.
            if must_be_safe.iter().any(|&sq| self.sq_attacked(sq, !us)) {
                continue;
            }
            move_list.push(Move::new(from, to, king, None, Move::CASTLE_FLAG));
        }
    }

    /// Every pseudo-legal move for the side to move.
    pub fn generate_moves(&self, move_list: &mut MoveList) {
        move_list.clear();
        self.generate_pawn_forward(move_list);
        self.generate_pawn_caps(move_list);
        self.generate_piece_moves::<AllMoves>(move_list);
        self.generate_castling_moves(move_list);
    }

    /// Pseudo-legal captures only, including en passant and capturing promotions.
    pub fn generate_captures(&self, move_list: &mut MoveList) {
        move_list.clear();
        self.generate_pawn_caps(move_list);
        self.generate_piece_moves::<SkipQuiets>(move_list);
    }
}
