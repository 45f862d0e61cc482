use std::str::SplitWhitespace;

use crate::{
    chess::{
        piece::{Colour, Piece, PieceType},
        squareset::SquareSet,
        types::{CastlingRights, File, Rank, Square},
    },
    errors::FenParseError,
};

/// A parsed FEN record, not yet attached to a board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fen {
    pub pieces: [SquareSet; 12],
    pub turn: Colour,
    pub castling: CastlingRights,
    pub ep: Option<Square>,
    pub halfmove: u8,
    pub fullmove: usize,
}

impl Fen {
    /// Parse a FEN string.
    /// The halfmove clock and fullmove number may be omitted, defaulting to 0 and 1.
    pub fn parse(fen: &str) -> Result<Self, FenParseError> {
        let mut tokens = fen.split_whitespace();
        let result = Self::parse_inner(&mut tokens)?;
        if let Some(extra) = tokens.next() {
            return Err(FenParseError::ExtraTokens(extra.to_string()));
        }
        Ok(result)
    }

    fn parse_inner(tokens: &mut SplitWhitespace<'_>) -> Result<Self, FenParseError> {
        let board_str = tokens.next().ok_or(FenParseError::MissingBoard)?;
        let pieces = Self::parse_board(board_str)?;

        let turn = match tokens.next() {
            Some("w") => Colour::White,
            Some("b") => Colour::Black,
            Some(other) => return Err(FenParseError::InvalidSide(other.to_string())),
            None => return Err(FenParseError::MissingSide),
        };

        let castling = tokens.next().map_or(Ok(CastlingRights::NONE), |s| Self::parse_castling(s, &pieces))?;

        let ep = match tokens.next() {
            None | Some("-") => None,
            Some(s) => Some(Self::parse_ep(s, turn, &pieces)?),
        };

        let halfmove = match tokens.next() {
            None => 0,
            Some(s) => s
                .parse::<u8>()
                .map_err(|_| FenParseError::InvalidHalfmoveClock(s.to_string()))?,
        };

        let fullmove = match tokens.next() {
            None => 1,
            Some(s) => s
                .parse::<usize>()
                .map_err(|_| FenParseError::InvalidFullmoveNumber(s.to_string()))?
                .max(1),
        };

        Ok(Self {
            pieces,
            turn,
            castling,
            ep,
            halfmove,
            fullmove,
        })
    }

    fn parse_board(board_str: &str) -> Result<[SquareSet; 12], FenParseError> {
        let mut pieces = [SquareSet::EMPTY; 12];

        let ranks = board_str.split('/').collect::<Vec<_>>();
        if ranks.len() != 8 {
            return Err(FenParseError::BoardSegments(ranks.len()));
        }

        // FEN lists rank 8 first.
        for (rank_str, rank_idx) in ranks.iter().zip((0..8u8).rev()) {
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                    #[allow(clippy::cast_possible_truncation)]
                    let skip = skip as u8;
                    file += skip;
                } else {
                    let piece = Piece::from_char(c).ok_or(FenParseError::UnexpectedCharacter(c))?;
                    let (Some(r), Some(f)) = (Rank::from_index(rank_idx), File::from_index(file))
                    else {
                        return Err(FenParseError::BadSquaresInSegment((*rank_str).to_string()));
                    };
                    let sq = Square::from_rank_file(r, f);
                    pieces[piece] = pieces[piece].add_square(sq);
                    file += 1;
                }
                if file > 8 {
                    return Err(FenParseError::BadSquaresInSegment((*rank_str).to_string()));
                }
            }
            if file != 8 {
                return Err(FenParseError::BadSquaresInSegment((*rank_str).to_string()));
            }
        }

        if (pieces[Piece::WP] | pieces[Piece::BP]) & SquareSet::BACK_RANKS != SquareSet::EMPTY {
            return Err(FenParseError::PawnsOnBackranks);
        }

        for colour in Colour::all() {
            match pieces[Piece::new(colour, PieceType::King)].count() {
                0 => return Err(FenParseError::MissingKing { colour }),
                1 => (),
                _ => return Err(FenParseError::DuplicateKings { colour }),
            }
        }

        Ok(pieces)
    }

    fn parse_castling(s: &str, pieces: &[SquareSet; 12]) -> Result<CastlingRights, FenParseError> {
        let mut rights = CastlingRights::NONE;
        if s == "-" {
            return Ok(rights);
        }
        for c in s.chars() {
            let (flag, king, rook) = match c {
                'K' => (CastlingRights::WKCA, (Piece::WK, Square::E1), (Piece::WR, Square::H1)),
                'Q' => (CastlingRights::WQCA, (Piece::WK, Square::E1), (Piece::WR, Square::A1)),
                'k' => (CastlingRights::BKCA, (Piece::BK, Square::E8), (Piece::BR, Square::H8)),
                'q' => (CastlingRights::BQCA, (Piece::BK, Square::E8), (Piece::BR, Square::A8)),
                _ => return Err(FenParseError::InvalidCastling(c)),
            };
            // movegen and makemove take both pieces on their home squares for granted.
            for (piece, sq) in [king, rook] {
                if !pieces[piece].contains_square(sq) {
                    return Err(FenParseError::CastlingPiecesMissing(c));
                }
            }
            rights.add(flag);
        }
        Ok(rights)
    }

    fn parse_ep(s: &str, turn: Colour, pieces: &[SquareSet; 12]) -> Result<Square, FenParseError> {
        let sq = s
            .parse::<Square>()
            .map_err(|_| FenParseError::InvalidEnPassant(s.to_string()))?;
        // the target square sits behind a pawn that just double-pushed.
        let expected = match turn {
            Colour::White => Rank::Six,
            Colour::Black => Rank::Three,
        };
        if sq.rank() != expected {
            return Err(FenParseError::InvalidEnPassant(s.to_string()));
        }
        let pusher = Piece::new(!turn, PieceType::Pawn);
        if !sq.pawn_push(!turn).is_some_and(|pawn_sq| pieces[pusher].contains_square(pawn_sq)) {
            return Err(FenParseError::NoEnPassantPawn(s.to_string()));
        }
        Ok(sq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_start_position() {
        let fen = Fen::parse("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").unwrap();
        assert_eq!(fen.turn, Colour::White);
        assert_eq!(fen.castling, CastlingRights::ALL);
        assert_eq!(fen.ep, None);
        assert_eq!(fen.pieces[Piece::WP], SquareSet::RANK_2);
        assert_eq!(fen.pieces[Piece::BK], Square::E8.as_set());
        assert_eq!(fen.fullmove, 1);
    }

    #[test]
    fn clocks_are_optional() {
        let fen = Fen::parse("4k3/8/8/8/8/8/8/4K3 b - -").unwrap();
        assert_eq!(fen.halfmove, 0);
        assert_eq!(fen.fullmove, 1);
        assert_eq!(fen.turn, Colour::Black);
    }

    #[test]
    fn parses_en_passant() {
        let fen =
            Fen::parse("rnbqkb1r/pp1p1pPp/8/2p1pP2/1P1P4/3P3P/P1P1P3/RNBQKBNR w KQkq e6 0 1")
                .unwrap();
        assert_eq!(fen.ep, Some(Square::E6));
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Fen::parse(""), Err(FenParseError::MissingBoard));
        assert_eq!(
            Fen::parse("8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenParseError::BoardSegments(7))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K2 w - - 0 1"),
            Err(FenParseError::BadSquaresInSegment("4K2".into()))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4X3 w - - 0 1"),
            Err(FenParseError::UnexpectedCharacter('X'))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/8 w - - 0 1"),
            Err(FenParseError::MissingKing {
                colour: Colour::White
            })
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K3 x - - 0 1"),
            Err(FenParseError::InvalidSide("x".into()))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K2R w KX - 0 1"),
            Err(FenParseError::InvalidCastling('X'))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K3 w - e4 0 1"),
            Err(FenParseError::InvalidEnPassant("e4".into()))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K3 w - - zero 1"),
            Err(FenParseError::InvalidHalfmoveClock("zero".into()))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/P3K3 w - - 0 1"),
            Err(FenParseError::PawnsOnBackranks)
        );
    }

    #[test]
    fn castling_rights_need_king_and_rook_at_home() {
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K3 w K - 0 1"),
            Err(FenParseError::CastlingPiecesMissing('K'))
        );
        assert_eq!(
            Fen::parse("r3k2r/8/8/8/8/8/8/R4K1R w Q - 0 1"),
            Err(FenParseError::CastlingPiecesMissing('Q'))
        );
        assert_eq!(
            Fen::parse("r3k3/8/8/8/8/8/8/4K3 b kq - 0 1"),
            Err(FenParseError::CastlingPiecesMissing('k'))
        );
        let fen = Fen::parse("r3k3/8/8/8/8/8/8/4K3 b q - 0 1").unwrap();
        assert_eq!(fen.castling.bits(), CastlingRights::BQCA);
    }

    #[test]
    fn en_passant_needs_a_pawn_that_just_pushed() {
        assert_eq!(
            Fen::parse("4k3/8/8/4P3/8/8/8/4K3 w - d6 0 1"),
            Err(FenParseError::NoEnPassantPawn("d6".into()))
        );
        assert_eq!(
            Fen::parse("4k3/8/8/8/8/8/8/4K3 b - e3 0 1"),
            Err(FenParseError::NoEnPassantPawn("e3".into()))
        );
        let fen = Fen::parse("4k3/8/8/3pP3/8/8/8/4K3 w - d6 0 1").unwrap();
        assert_eq!(fen.ep, Some(Square::D6));
    }
}
