use thiserror::Error;

use crate::chess::{
    piece::{Colour, Piece, PieceType},
    types::Square,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveParseError {
    #[error("invalid move length {0}")]
    InvalidLength(usize),
    #[error("invalid from-square \"{0}\"")]
    InvalidFromSquare(String),
    #[error("invalid to-square \"{0}\"")]
    InvalidToSquare(String),
    #[error("invalid promotion piece {0}")]
    InvalidPromotionPiece(char),
    #[error("illegal move {0}")]
    IllegalMove(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenParseError {
    #[error("FEN string is empty")]
    MissingBoard,
    #[error("expected 8 rank segments, found {0}")]
    BoardSegments(usize),
    #[error("rank segment \"{0}\" does not describe exactly 8 squares")]
    BadSquaresInSegment(String),
    #[error("unexpected character '{0}' in board segment")]
    UnexpectedCharacter(char),
    #[error("pawns on the back ranks")]
    PawnsOnBackranks,
    #[error("{colour} has no king")]
    MissingKing { colour: Colour },
    #[error("{colour} has more than one king")]
    DuplicateKings { colour: Colour },
    #[error("missing side to move")]
    MissingSide,
    #[error("invalid side to move \"{0}\"")]
    InvalidSide(String),
    #[error("invalid castling character '{0}'")]
    InvalidCastling(char),
    #[error("invalid en passant square \"{0}\"")]
    InvalidEnPassant(String),
    #[error("castling right '{0}' without king and rook on their home squares")]
    CastlingPiecesMissing(char),
    #[error("en passant square \"{0}\" without a capturable pawn in front of it")]
    NoEnPassantPawn(String),
    #[error("invalid halfmove clock \"{0}\"")]
    InvalidHalfmoveClock(String),
    #[error("invalid fullmove number \"{0}\"")]
    InvalidFullmoveNumber(String),
    #[error("the side not to move is in check")]
    WaitingInCheck,
    #[error("unexpected trailing token \"{0}\"")]
    ExtraTokens(String),
}

/// Raised when the randomized search for a magic multiplier runs out of attempts.
/// Without a complete set of magics the slider tables are unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MagicError {
    #[error("no magic number for a {piece} on {square} after {attempts} attempts")]
    NotFound {
        piece: PieceType,
        square: Square,
        attempts: u64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionValidityError {
    #[error("{square} is claimed by both {first} and {second}")]
    OverlappingPieces {
        square: Square,
        first: Piece,
        second: Piece,
    },
    #[error("occupancy set {index} does not match the piece sets")]
    OccupancyMismatch { index: usize },
    #[error("{colour} has {count} kings")]
    KingCount { colour: Colour, count: u32 },
    #[error("incremental key {incremental:016x} differs from recomputed key {recomputed:016x}")]
    KeyMismatch { incremental: u64, recomputed: u64 },
    #[error("en passant square {0} is on an impossible rank")]
    BadEnPassant(Square),
}
