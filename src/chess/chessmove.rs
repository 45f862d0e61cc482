use std::fmt::{Debug, Display, Formatter};

use crate::chess::{piece::Piece, types::Square};

/// A move, packed into the low 24 bits of a `u32`.
///
/// ```text
/// bits  0..6   source square
/// bits  6..12  target square
/// bits 12..16  moving piece
/// bits 16..20  promoted piece (0 if none: a white pawn is never a promotion target)
/// bit  20      capture
/// bit  21      double pawn push
/// bit  22      en passant
/// bit  23      castling
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Move {
    data: u32,
}

impl Move {
    const FROM_MASK: u32 = 0x00_003F;
    const TO_MASK: u32 = 0x00_0FC0;
    const PIECE_MASK: u32 = 0x00_F000;
    const PROMO_MASK: u32 = 0x0F_0000;
    pub const CAPTURE_FLAG: u32 = 0x10_0000;
    pub const DOUBLE_PUSH_FLAG: u32 = 0x20_0000;
    pub const EP_FLAG: u32 = 0x40_0000;
    pub const CASTLE_FLAG: u32 = 0x80_0000;
    const FLAGS_MASK: u32 =
        Self::CAPTURE_FLAG | Self::DOUBLE_PUSH_FLAG | Self::EP_FLAG | Self::CASTLE_FLAG;

    pub const NULL: Self = Self { data: 0 };

    pub fn new(from: Square, to: Square, piece: Piece, promotion: Option<Piece>, flags: u32) -> Self {
        debug_assert!(flags & Self::FLAGS_MASK == flags);
        debug_assert!(promotion != Some(Piece::WP));
        let promo = promotion.map_or(0, |p| u32::from(p.inner()));
        Self {
            data: u32::from(from.inner())
                | (u32::from(to.inner()) << 6)
                | (u32::from(piece.inner()) << 12)
                | (promo << 16)
                | flags,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn from(self) -> Square {
        // SAFETY: six bits can only hold values in 0..64.
        unsafe { Square::new_unchecked((self.data & Self::FROM_MASK) as u8) }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn to(self) -> Square {
        // SAFETY: six bits can only hold values in 0..64.
        unsafe { Square::new_unchecked(((self.data & Self::TO_MASK) >> 6) as u8) }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn piece(self) -> Piece {
        match Piece::from_index(((self.data & Self::PIECE_MASK) >> 12) as u8) {
            Some(piece) => piece,
            None => Piece::WP,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    pub const fn promotion(self) -> Option<Piece> {
        match (self.data & Self::PROMO_MASK) >> 16 {
            0 => None,
            v => Piece::from_index(v as u8),
        }
    }

    pub const fn is_promo(self) -> bool {
        self.data & Self::PROMO_MASK != 0
    }

    pub const fn is_capture(self) -> bool {
        self.data & Self::CAPTURE_FLAG != 0
    }

    pub const fn is_double_push(self) -> bool {
        self.data & Self::DOUBLE_PUSH_FLAG != 0
    }

    pub const fn is_ep(self) -> bool {
        self.data & Self::EP_FLAG != 0
    }

    pub const fn is_castle(self) -> bool {
        self.data & Self::CASTLE_FLAG != 0
    }

    /// Neither a capture nor a promotion.
    pub const fn is_quiet(self) -> bool {
        !self.is_capture() && !self.is_promo()
    }

    pub const fn is_null(self) -> bool {
        self.data == 0
    }

    pub const fn inner(self) -> u32 {
        self.data
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            return write!(f, "0000");
        }
        write!(f, "{}{}", self.from(), self.to())?;
        if let Some(promo) = self.promotion().and_then(|p| p.piece_type().promo_char()) {
            write!(f, "{promo}")?;
        }
        Ok(())
    }
}

impl Debug for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}{}", self.piece(), self, if self.is_capture() { " x" } else { "" })?;
        for (set, name) in [
            (self.is_double_push(), " dbl"),
            (self.is_ep(), " ep"),
            (self.is_castle(), " castle"),
        ] {
            if set {
                write!(f, "{name}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_survive_packing() {
        let m = Move::new(Square::G7, Square::H8, Piece::BP, Some(Piece::BN), Move::CAPTURE_FLAG);
        assert_eq!(m.from(), Square::G7);
        assert_eq!(m.to(), Square::H8);
        assert_eq!(m.piece(), Piece::BP);
        assert_eq!(m.promotion(), Some(Piece::BN));
        assert!(m.is_capture());
        assert!(m.is_promo());
        assert!(!m.is_quiet());
        assert!(!m.is_ep() && !m.is_castle() && !m.is_double_push());
        assert!(m.inner() < 1 << 24);
    }

    #[test]
    fn flags_are_independent() {
        let dbl = Move::new(Square::E2, Square::E4, Piece::WP, None, Move::DOUBLE_PUSH_FLAG);
        assert!(dbl.is_double_push() && dbl.is_quiet());
        assert_eq!(dbl.promotion(), None);
        let ep = Move::new(
            Square::E5,
            Square::D6,
            Piece::WP,
            None,
            Move::CAPTURE_FLAG | Move::EP_FLAG,
        );
        assert!(ep.is_ep() && ep.is_capture() && !ep.is_double_push());
        let castle = Move::new(Square::E8, Square::C8, Piece::BK, None, Move::CASTLE_FLAG);
        assert!(castle.is_castle() && castle.is_quiet());
        assert_eq!(castle.piece(), Piece::BK);
    }

    #[test]
    fn uci_formatting() {
        let m = Move::new(Square::A7, Square::A8, Piece::WP, Some(Piece::WQ), 0);
        assert_eq!(m.to_string(), "a7a8q");
        let m = Move::new(Square::G1, Square::F3, Piece::WN, None, 0);
        assert_eq!(m.to_string(), "g1f3");
        assert_eq!(Move::NULL.to_string(), "0000");
    }
}
