use crate::{
    chess::{
        board::Board,
        chessmove::Move,
        piece::{Piece, PieceType},
        types::Square,
    },
    lookups::{castle_key, ep_key, piece_key, side_key},
};

impl Board {
    fn toggle_piece(&mut self, piece: Piece, sq: Square) {
        self.state.bitboards[piece] = self.state.bitboards[piece].toggle_square(sq);
        self.state.key ^= piece_key(piece, sq);
    }

    /// Makes a pseudo-legal move, returning whether it was legal.
    ///
    /// With `captures_only` set, quiet moves are refused unless the side to move is in check.
    /// A refused or illegal move leaves the board exactly as it was.
    pub fn make_move(&mut self, m: Move, captures_only: bool) -> bool {
        #[cfg(debug_assertions)]
        if let Err(e) = self.check_validity() {
            panic!("invalid position before make_move({m:?}): {e}");
        }

        if captures_only && !m.is_capture() && !self.in_check() {
            return false;
        }

        let us = self.turn();
        let from = m.from();
        let to = m.to();
        let piece = m.piece();
        debug_assert_eq!(piece.colour(), us);

        self.history.push(self.state.clone());

        self.toggle_piece(piece, from);
        self.toggle_piece(piece, to);

        if m.is_capture() && !m.is_ep() {
            let victim = Piece::of_colour(!us).find(|&p| self.state.bitboards[p].contains_square(to));
            debug_assert!(victim.is_some(), "capture of an empty square: {m:?}");
            if let Some(victim) = victim {
                self.toggle_piece(victim, to);
            }
        }

        if let Some(promo) = m.promotion() {
            self.toggle_piece(piece, to);
            self.toggle_piece(promo, to);
        }

        if m.is_ep() {
            // the captured pawn stands behind the target square.
            if let Some(victim_sq) = to.pawn_push(!us) {
                self.toggle_piece(Piece::new(!us, PieceType::Pawn), victim_sq);
            }
        }

        self.state.key ^= ep_key(self.state.ep_square);
        self.state.ep_square = None;
        if m.is_double_push() {
            self.state.ep_square = from.pawn_push(us);
            self.state.key ^= ep_key(self.state.ep_square);
        }

        if m.is_castle() {
            let (rook_from, rook_to) = match to {
                Square::G1 => (Square::H1, Square::F1),
                Square::C1 => (Square::A1, Square::D1),
                Square::G8 => (Square::H8, Square::F8),
                _ => (Square::A8, Square::D8),
            };
            let rook = Piece::new(us, PieceType::Rook);
            self.toggle_piece(rook, rook_from);
            self.toggle_piece(rook, rook_to);
        }

        self.state.key ^= castle_key(self.state.castle_perm);
        self.state.castle_perm.update(from, to);
        self.state.key ^= castle_key(self.state.castle_perm);

        if piece.piece_type() == PieceType::Pawn || m.is_capture() {
            self.state.fifty_move_counter = 0;
        } else {
            self.state.fifty_move_counter = self.state.fifty_move_counter.saturating_add(1);
        }

        self.refresh_occupancies();

        self.state.side = !us;
        self.state.key ^= side_key();
        self.ply += 1;
        self.height += 1;

        // reversed in_check fn, as we have now swapped sides
        if self.sq_attacked(self.king_sq(us), !us) {
            self.unmake_move();
            return false;
        }

        #[cfg(debug_assertions)]
        if let Err(e) = self.check_validity() {
            panic!("invalid position after make_move({m:?}): {e}");
        }

        true
    }

    /// Restores the position from before the last successful `make_move`.
    pub fn unmake_move(&mut self) {
        let Some(state) = self.history.pop() else {
            debug_assert!(false, "no move to unmake");
            return;
        };
        self.height -= 1;
        self.ply -= 1;
        self.state = state;
    }

    /// Passes the turn. Must not be used while in check.
    pub fn make_nullmove(&mut self) {
        debug_assert!(!self.in_check());

        self.history.push(self.state.clone());

        self.state.key ^= ep_key(self.state.ep_square);
        self.state.key ^= side_key();
        self.state.ep_square = None;
        self.state.side = self.state.side.flip();
        self.ply += 1;
        self.height += 1;
    }

    pub fn unmake_nullmove(&mut self) {
        self.unmake_move();
    }

    /// Plays a sequence of moves in UCI notation, as sent by `position ... moves ...`.
    pub fn play_uci_moves<'a>(
        &mut self,
        moves: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), crate::errors::MoveParseError> {
        for text in moves {
            let m = self.parse_uci(text)?;
            self.make_move(m, false);
        }
        // positions before the root are game history, not search tree.
        self.zero_height();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::chess::{
        board::{Board, movegen::MoveList},
        magic::test_tables,
        types::{CastlingRights, Square},
    };

    const FENS: [&str; 6] = [
        Board::STARTING_FEN,
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "r3k2r/Pppp1ppp/1b3nbN/nP6/BBP1P3/q4N2/Pp1P2PP/R2Q1RK1 w kq - 0 1",
        "rnbq1k1r/pp1Pbppp/2p5/8/2B5/8/PPP1NnPP/RNBQK2R w KQ - 1 8",
        "r4rk1/1pp1qppp/p1np1n2/2b1p1B1/2B1P1b1/P1NP1N2/1PP1QPPP/R4RK1 w - - 0 10",
    ];

    fn walk(board: &mut Board, depth: usize) {
        if depth == 0 {
            return;
        }
        let mut ml = MoveList::new();
        board.generate_moves(&mut ml);
        for &m in ml.iter_moves() {
            let before = board.clone();
            if !board.make_move(m, false) {
                assert_eq!(*board, before, "illegal move {m:?} changed the board");
                continue;
            }
            assert_eq!(board.key(), board.generate_pos_key(), "key drift after {m:?}");
            board.check_validity().unwrap();
            walk(board, depth - 1);
            board.unmake_move();
            assert_eq!(*board, before, "unmake of {m:?} did not restore the board");
        }
    }

    #[test]
    fn make_unmake_is_symmetric_and_keys_stay_consistent() {
        for fen in FENS {
            let mut board = Board::from_fen(fen, test_tables()).unwrap();
            walk(&mut board, 2);
        }
    }

    #[test]
    fn captures_only_refuses_quiet_moves() {
        let mut board = Board::new(test_tables());
        let m = board.parse_uci("e2e4").unwrap();
        let before = board.clone();
        assert!(!board.make_move(m, true));
        assert_eq!(board, before);
        // in check, quiet evasions are allowed.
        let mut board =
            Board::from_fen("4k3/8/8/8/8/8/3q4/4K3 w - - 0 1", test_tables()).unwrap();
        let m = board.parse_uci("e1f1").unwrap();
        assert!(board.make_move(m, true));
    }

    #[test]
    fn castling_moves_the_rook_and_clears_rights() {
        let mut board =
            Board::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1", test_tables()).unwrap();
        let m = board.parse_uci("e1g1").unwrap();
        assert!(m.is_castle());
        assert!(board.make_move(m, false));
        assert_eq!(board.piece_at(Square::F1), Some(crate::chess::piece::Piece::WR));
        assert_eq!(board.piece_at(Square::H1), None);
        assert_eq!(board.castling_rights(), CastlingRights::from_bits(0b1100));
        let m = board.parse_uci("h8h1").unwrap();
        assert!(board.make_move(m, false));
        assert_eq!(board.castling_rights(), CastlingRights::from_bits(0b1000));
    }

    #[test]
    fn double_push_arms_en_passant_and_capture_clears_it() {
        let mut board =
            Board::from_fen("4k3/3p4/8/4P3/8/8/8/4K3 b - - 0 1", test_tables()).unwrap();
        let m = board.parse_uci("d7d5").unwrap();
        assert!(board.make_move(m, false));
        assert_eq!(board.ep_sq(), Some(Square::D6));
        let m = board.parse_uci("e5d6").unwrap();
        assert!(m.is_ep());
        assert!(board.make_move(m, false));
        assert_eq!(board.ep_sq(), None);
        assert_eq!(board.piece_at(Square::D5), None);
        assert_eq!(board.fifty_move_counter(), 0);
        assert_eq!(board.key(), board.generate_pos_key());
    }

    #[test]
    fn illegal_moves_leave_the_board_alone() {
        // the knight on d2 is pinned against the king.
        let mut board =
            Board::from_fen("4k3/8/8/8/1b6/8/3N4/4K3 w - - 0 1", test_tables()).unwrap();
        let mut ml = MoveList::new();
        board.generate_moves(&mut ml);
        let pinned = ml.iter_moves().find(|m| m.from() == Square::D2).copied().unwrap();
        let before = board.clone();
        assert!(!board.make_move(pinned, false));
        assert_eq!(board, before);
    }

    #[test]
    fn null_move_round_trip() {
        let mut board =
            Board::from_fen("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1", test_tables()).unwrap();
        let before = board.clone();
        board.make_nullmove();
        assert_eq!(board.ep_sq(), None);
        assert_eq!(board.key(), board.generate_pos_key());
        board.unmake_nullmove();
        assert_eq!(board, before);
    }
}
