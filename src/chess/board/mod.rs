pub mod makemove;
pub mod movegen;

use std::{
    fmt::{self, Debug, Display, Formatter},
    sync::Arc,
};

use arrayvec::ArrayVec;

use crate::{
    chess::{
        board::movegen::{MAX_POSITION_MOVES, MoveList},
        chessmove::Move,
        fen::Fen,
        magic::AttackTables,
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::{CastlingRights, File, Rank, Square},
    },
    errors::{FenParseError, MoveParseError, PositionValidityError},
    lookups::{castle_key, ep_key, piece_key, side_key},
};

/// Index of the union of both sides' pieces in `State::occupancies`.
pub const BOTH: usize = 2;
/// Index of the empty squares in `State::occupancies`.
pub const EMPTY: usize = 3;

/// Everything a move can change. Copying this out and back in is how moves are undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// One square-set per coloured piece, indexed by `Piece`.
    pub bitboards: [SquareSet; 12],
    /// White's pieces, black's pieces, all pieces, and empty squares.
    pub occupancies: [SquareSet; 4],
    pub side: Colour,
    pub castle_perm: CastlingRights,
    /// The square a pawn may capture onto en passant, if any.
    pub ep_square: Option<Square>,
    /// The number of half moves made since the last capture or pawn advance.
    pub fifty_move_counter: u8,
    /// Zobrist hash of the position.
    pub key: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            bitboards: [SquareSet::EMPTY; 12],
            occupancies: [SquareSet::EMPTY, SquareSet::EMPTY, SquareSet::EMPTY, SquareSet::FULL],
            side: Colour::White,
            castle_perm: CastlingRights::NONE,
            ep_square: None,
            fifty_move_counter: 0,
            key: 0,
        }
    }
}

#[derive(Clone)]
pub struct Board {
    tables: Arc<AttackTables>,
    /// Copyable state for the board.
    pub(crate) state: State,
    /// The number of half moves made since the start of the game.
    ply: usize,
    /// The number of half moves made since the root of the current search.
    height: usize,
    /// The state before each move made, most recent last.
    history: Vec<State>,
}

impl Debug for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("fen", &self.to_string())
            .field("height", &self.height)
            .field("ply", &self.ply)
            .field("key", &format_args!("{:016x}", self.state.key))
            .finish_non_exhaustive()
    }
}

impl PartialEq for Board {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state && self.ply == other.ply && self.history == other.history
    }
}

impl Board {
    pub const STARTING_FEN: &'static str =
        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    /// The starting position.
    pub fn new(tables: Arc<AttackTables>) -> Self {
        let mut out = Self {
            tables,
            state: State::default(),
            ply: 0,
            height: 0,
            history: Vec::new(),
        };
        // the starting FEN is a constant and always parses.
        if let Ok(fen) = Fen::parse(Self::STARTING_FEN) {
            out.load(&fen);
        }
        out
    }

    pub fn from_fen(fen: &str, tables: Arc<AttackTables>) -> Result<Self, FenParseError> {
        let mut out = Self::new(tables);
        out.set_from_fen(fen)?;
        Ok(out)
    }

    pub fn set_startpos(&mut self) {
        if let Ok(fen) = Fen::parse(Self::STARTING_FEN) {
            self.load(&fen);
        }
    }

    pub fn set_from_fen(&mut self, fen: &str) -> Result<(), FenParseError> {
        let fen = Fen::parse(fen)?;
        let mut candidate = self.clone();
        candidate.load(&fen);
        // the side that just moved cannot still be in check.
        let waiting = candidate.king_sq(!fen.turn);
        if candidate.sq_attacked(waiting, fen.turn) {
            return Err(FenParseError::WaitingInCheck);
        }
        *self = candidate;
        Ok(())
    }

    fn load(&mut self, fen: &Fen) {
        self.state = State {
            bitboards: fen.pieces,
            side: fen.turn,
            castle_perm: fen.castling,
            ep_square: fen.ep,
            fifty_move_counter: fen.halfmove,
            ..State::default()
        };
        self.refresh_occupancies();
        self.state.key = self.generate_pos_key();
        self.ply = (fen.fullmove - 1) * 2 + usize::from(fen.turn == Colour::Black);
        self.height = 0;
        self.history.clear();
    }

    pub fn tables(&self) -> &AttackTables {
        &self.tables
    }

    pub const fn turn(&self) -> Colour {
        self.state.side
    }

    pub const fn ep_sq(&self) -> Option<Square> {
        self.state.ep_square
    }

    pub const fn castling_rights(&self) -> CastlingRights {
        self.state.castle_perm
    }

    pub const fn fifty_move_counter(&self) -> u8 {
        self.state.fifty_move_counter
    }

    pub const fn key(&self) -> u64 {
        self.state.key
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    /// Marks the current position as the root of a search.
    pub fn zero_height(&mut self) {
        self.height = 0;
    }

    pub fn pieces(&self, piece: Piece) -> SquareSet {
        self.state.bitboards[piece]
    }

    pub fn colour(&self, colour: Colour) -> SquareSet {
        self.state.occupancies[colour.index()]
    }

    pub fn occupied(&self) -> SquareSet {
        self.state.occupancies[BOTH]
    }

    pub fn empty(&self) -> SquareSet {
        self.state.occupancies[EMPTY]
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        if !self.occupied().contains_square(sq) {
            return None;
        }
        Piece::all().find(|&p| self.state.bitboards[p].contains_square(sq))
    }

    pub fn king_sq(&self, side: Colour) -> Square {
        let kings = self.state.bitboards[Piece::new(side, PieceType::King)];
        debug_assert_eq!(kings.count(), 1);
        kings.first().unwrap_or_default()
    }

    /// Recomputes the four occupancy sets from the twelve piece sets.
    pub fn refresh_occupancies(&mut self) {
        self.state.occupancies = self.derived_occupancies();
    }

    fn derived_occupancies(&self) -> [SquareSet; 4] {
        let bbs = &self.state.bitboards;
        let white = bbs[..6].iter().fold(SquareSet::EMPTY, |acc, &bb| acc | bb);
        let black = bbs[6..].iter().fold(SquareSet::EMPTY, |acc, &bb| acc | bb);
        [white, black, white | black, !(white | black)]
    }

    /// Computes the Zobrist key of the position from scratch.
    pub fn generate_pos_key(&self) -> u64 {
        let mut key = 0;
        for piece in Piece::all() {
            for sq in self.state.bitboards[piece] {
                key ^= piece_key(piece, sq);
            }
        }
        if self.state.side == Colour::Black {
            key ^= side_key();
        }
        key ^= ep_key(self.state.ep_square);
        key ^= castle_key(self.state.castle_perm);
        key
    }

    /// Is `sq` attacked by any piece of colour `side`?
    pub fn sq_attacked(&self, sq: Square, side: Colour) -> bool {
        let t = &*self.tables;
        let bbs = &self.state.bitboards;
        let occupied = self.occupied();

        // a pawn of `side` attacks sq iff a pawn of the other colour on sq would attack it.
        if t.pawn_attacks(!side, sq) & bbs[Piece::new(side, PieceType::Pawn)] != SquareSet::EMPTY {
            return true;
        }
        if t.knight_attacks(sq) & bbs[Piece::new(side, PieceType::Knight)] != SquareSet::EMPTY {
            return true;
        }
        if t.king_attacks(sq) & bbs[Piece::new(side, PieceType::King)] != SquareSet::EMPTY {
            return true;
        }
        let queens = bbs[Piece::new(side, PieceType::Queen)];
        let diagonal = bbs[Piece::new(side, PieceType::Bishop)] | queens;
        if t.bishop_attacks(sq, occupied) & diagonal != SquareSet::EMPTY {
            return true;
        }
        let orthogonal = bbs[Piece::new(side, PieceType::Rook)] | queens;
        t.rook_attacks(sq, occupied) & orthogonal != SquareSet::EMPTY
    }

    /// Is the side to move in check?
    pub fn in_check(&self) -> bool {
        let us = self.turn();
        self.sq_attacked(self.king_sq(us), !us)
    }

    /// Checks the structural invariants of the position.
    pub fn check_validity(&self) -> Result<(), PositionValidityError> {
        let bbs = &self.state.bitboards;
        for first in Piece::all() {
            for second in Piece::all().filter(|&p| p > first) {
                if let Some(square) = (bbs[first] & bbs[second]).first() {
                    return Err(PositionValidityError::OverlappingPieces {
                        square,
                        first,
                        second,
                    });
                }
            }
        }

        let derived = self.derived_occupancies();
        for (index, (ours, expected)) in self.state.occupancies.iter().zip(derived).enumerate() {
            if *ours != expected {
                return Err(PositionValidityError::OccupancyMismatch { index });
            }
        }

        for colour in Colour::all() {
            let count = bbs[Piece::new(colour, PieceType::King)].count();
            if count != 1 {
                return Err(PositionValidityError::KingCount { colour, count });
            }
        }

        if let Some(ep) = self.state.ep_square {
            let expected = match self.turn() {
                Colour::White => Rank::Six,
                Colour::Black => Rank::Three,
            };
            if ep.rank() != expected {
                return Err(PositionValidityError::BadEnPassant(ep));
            }
        }

        let recomputed = self.generate_pos_key();
        if recomputed != self.state.key {
            return Err(PositionValidityError::KeyMismatch {
                incremental: self.state.key,
                recomputed,
            });
        }

        Ok(())
    }

    /// Has the current position occurred before, within reach of the fifty-move window?
    ///
    /// A single earlier occurrence inside the search tree is enough; positions that
    /// only occurred in the game history need two earlier occurrences.
    pub fn is_repetition(&self) -> bool {
        let mut counter = 0;
        // distance to the last irreversible move
        let moves_since_zeroing = self.fifty_move_counter() as usize;
        // a repetition is first possible at four ply back:
        for (dist_back, u) in self
            .history
            .iter()
            .rev()
            .enumerate()
            .take(moves_since_zeroing)
            .skip(3)
            .step_by(2)
        {
            if u.key == self.state.key {
                // in-tree, can twofold:
                if dist_back < self.height {
                    return true;
                }
                // partially materialised, proper threefold:
                counter += 1;
                if counter >= 2 {
                    return true;
                }
            }
        }
        false
    }

    /// Neither side can possibly deliver mate.
    pub fn insufficient_material(&self) -> bool {
        let bbs = &self.state.bitboards;
        let heavy = bbs[Piece::WP] | bbs[Piece::BP] | bbs[Piece::WR] | bbs[Piece::BR];
        if heavy != SquareSet::EMPTY || (bbs[Piece::WQ] | bbs[Piece::BQ]) != SquareSet::EMPTY {
            return false;
        }

        let (wb, bb) = (bbs[Piece::WB], bbs[Piece::BB]);
        let (wn, bn) = (bbs[Piece::WN], bbs[Piece::BN]);
        if wb.count() + wn.count() > 1 || bb.count() + bn.count() > 1 {
            return false;
        }

        // bishops on opposite colours can still construct a mate with help.
        match (wb.first(), bb.first()) {
            (Some(w), Some(b)) => w.is_light() == b.is_light(),
            _ => true,
        }
    }

    /// Is the current position drawn by rule, ignoring stalemate?
    /// The root is never reported as drawn, as the search must still pick a move.
    pub fn is_draw(&self) -> bool {
        self.height != 0
            && (self.fifty_move_counter() >= 100
                || self.is_repetition()
                || self.insufficient_material())
    }

    /// Whether the side to move has anything but pawns and a king.
    /// Positions where this is false are prone to zugzwang.
    pub fn zugzwang_unlikely(&self) -> bool {
        let us = self.turn();
        let pawns_and_king = self.pieces(Piece::new(us, PieceType::Pawn))
            | self.pieces(Piece::new(us, PieceType::King));
        self.colour(us) != pawns_and_king
    }

    pub fn legal_moves(&mut self) -> ArrayVec<Move, MAX_POSITION_MOVES> {
        let mut legal_moves = ArrayVec::new();
        let mut move_list = MoveList::new();
        self.generate_moves(&mut move_list);
        for &m in move_list.iter_moves() {
            if self.make_move(m, false) {
                self.unmake_move();
                legal_moves.push(m);
            }
        }
        legal_moves
    }

    /// Maps long algebraic notation onto one of the legal moves in this position.
    pub fn parse_uci(&mut self, uci: &str) -> Result<Move, MoveParseError> {
        let bytes = uci.as_bytes();
        if !(4..=5).contains(&bytes.len()) {
            return Err(MoveParseError::InvalidLength(bytes.len()));
        }
        let from = uci
            .get(0..2)
            .and_then(|s| s.parse::<Square>().ok())
            .ok_or_else(|| MoveParseError::InvalidFromSquare(uci.chars().take(2).collect()))?;
        let to = uci
            .get(2..4)
            .and_then(|s| s.parse::<Square>().ok())
            .ok_or_else(|| MoveParseError::InvalidToSquare(uci.chars().skip(2).take(2).collect()))?;
        let promo = match uci.chars().nth(4) {
            None => None,
            Some(c) => Some(
                PieceType::from_promo_char(c).ok_or(MoveParseError::InvalidPromotionPiece(c))?,
            ),
        };

        self.legal_moves()
            .into_iter()
            .find(|m| {
                m.from() == from
                    && m.to() == to
                    && m.promotion().map(Piece::piece_type) == promo
            })
            .ok_or_else(|| MoveParseError::IllegalMove(uci.to_string()))
    }

    /// A human-readable diagram of the board.
    pub fn diagram(&self) -> String {
        let mut out = String::new();
        for rank in (0..8).rev() {
            out.push_str(&format!(" {} ", rank + 1));
            for file in 0..8 {
                let sq = Square::from_rank_file(
                    Rank::from_index(rank).unwrap_or(Rank::One),
                    File::from_index(file).unwrap_or(File::A),
                );
                out.push(' ');
                out.push(self.piece_at(sq).map_or('.', Piece::char));
            }
            out.push('\n');
        }
        out.push_str("\n    a b c d e f g h\n\n");
        out.push_str(&format!("FEN: {self}\n"));
        out.push_str(&format!("Key: {:016x}\n", self.state.key));
        out
    }
}

impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            let mut counter = 0;
            for file in 0..8u8 {
                let sq = Square::from_rank_file(
                    Rank::from_index(rank).unwrap_or(Rank::One),
                    File::from_index(file).unwrap_or(File::A),
                );
                if let Some(piece) = self.piece_at(sq) {
                    if counter != 0 {
                        write!(f, "{counter}")?;
                    }
                    counter = 0;
                    write!(f, "{piece}")?;
                } else {
                    counter += 1;
                }
            }
            if counter != 0 {
                write!(f, "{counter}")?;
            }
            if rank != 0 {
                write!(f, "/")?;
            }
        }

        match self.turn() {
            Colour::White => write!(f, " w ")?,
            Colour::Black => write!(f, " b ")?,
        }
        write!(f, "{} ", self.state.castle_perm)?;
        match self.state.ep_square {
            Some(ep) => write!(f, "{ep}")?,
            None => write!(f, "-")?,
        }
        write!(f, " {} {}", self.state.fifty_move_counter, self.ply / 2 + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chess::magic::test_tables;

    const FENS: [&str; 5] = [
        Board::STARTING_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "rnbqkb1r/pp1p1pPp/8/2p1pP2/1P1P4/3P3P/P1P1P3/RNBQKBNR w KQkq e6 0 1",
        "r2q1rk1/ppp2ppp/2n1bn2/2b1p3/3pP3/3P1NPP/PPP1NPB1/R1BQ1RK1 b - - 0 9",
        "2r3k1/R7/8/1R6/8/8/P4KPP/8 w - - 0 40",
    ];

    #[test]
    fn fen_round_trip() {
        for fen in FENS {
            let board = Board::from_fen(fen, test_tables()).unwrap();
            assert_eq!(board.to_string(), fen);
            board.check_validity().unwrap();
        }
    }

    #[test]
    fn occupancies_match_piece_sets() {
        let board = Board::new(test_tables());
        assert_eq!(board.colour(Colour::White), SquareSet::RANK_1 | SquareSet::RANK_2);
        assert_eq!(board.colour(Colour::Black), SquareSet::RANK_7 | SquareSet::RANK_8);
        assert_eq!(board.occupied().count(), 32);
        assert_eq!(board.empty(), !board.occupied());
    }

    #[test]
    fn key_depends_on_every_field() {
        let tables = test_tables();
        let base = Board::from_fen("4k3/8/8/3pP3/8/8/8/R3K3 w Q d6 0 1", tables.clone()).unwrap();
        let no_ep = Board::from_fen("4k3/8/8/3pP3/8/8/8/R3K3 w Q - 0 1", tables.clone()).unwrap();
        let no_castle = Board::from_fen("4k3/8/8/3pP3/8/8/8/R3K3 w - d6 0 1", tables.clone()).unwrap();
        let black = Board::from_fen("4k3/8/8/3pP3/8/8/8/R3K3 b Q - 0 1", tables).unwrap();
        assert_ne!(base.key(), no_ep.key());
        assert_ne!(base.key(), no_castle.key());
        assert_ne!(no_ep.key(), black.key());
    }

    #[test]
    fn attacks_and_check() {
        let tables = test_tables();
        let board = Board::from_fen("4k3/8/8/8/8/8/3q4/4K3 w - - 0 1", tables.clone()).unwrap();
        assert!(board.in_check());
        assert!(board.sq_attacked(Square::D1, Colour::Black));
        assert!(board.sq_attacked(Square::H6, Colour::Black));
        assert!(!board.sq_attacked(Square::H5, Colour::Black));
        let board = Board::from_fen("4k3/8/8/8/8/5p2/8/4K3 w - - 0 1", tables).unwrap();
        assert!(board.sq_attacked(Square::E2, Colour::Black));
        assert!(board.sq_attacked(Square::G2, Colour::Black));
        assert!(!board.sq_attacked(Square::F2, Colour::Black));
        assert!(!board.in_check());
    }

    #[test]
    fn waiting_side_in_check_is_rejected() {
        let err = Board::from_fen("4k3/8/8/8/8/8/4R3/4K3 w - - 0 1", test_tables()).unwrap_err();
        assert_eq!(err, FenParseError::WaitingInCheck);
    }

    #[test]
    fn insufficient_material() {
        let tables = test_tables();
        let cases = [
            ("4k3/8/8/8/8/8/8/4K3 w - - 0 1", true),
            ("4k3/8/8/8/8/8/8/4KN2 w - - 0 1", true),
            ("4kb2/8/8/8/8/8/8/2B1K3 w - - 0 1", true),
            ("4k1b1/8/8/8/8/8/8/2B1K3 w - - 0 1", false),
            ("4k3/8/8/8/8/8/8/3NKN2 w - - 0 1", false),
            ("4k3/8/8/8/8/8/4P3/4K3 w - - 0 1", false),
        ];
        for (fen, expected) in cases {
            let board = Board::from_fen(fen, tables.clone()).unwrap();
            assert_eq!(board.insufficient_material(), expected, "{fen}");
        }
    }

    #[test]
    fn uci_parsing() {
        let mut board = Board::new(test_tables());
        let m = board.parse_uci("e2e4").unwrap();
        assert!(m.is_double_push());
        assert_eq!(board.parse_uci("e2e5"), Err(MoveParseError::IllegalMove("e2e5".into())));
        assert_eq!(board.parse_uci("e2"), Err(MoveParseError::InvalidLength(2)));
        assert_eq!(
            board.parse_uci("z2e4"),
            Err(MoveParseError::InvalidFromSquare("z2".into()))
        );
        assert_eq!(
            board.parse_uci("e7e8x"),
            Err(MoveParseError::InvalidPromotionPiece('x'))
        );
    }
}
