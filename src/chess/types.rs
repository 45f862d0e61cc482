use std::{
    fmt::{self, Display},
    mem::size_of,
    ops::{Index, IndexMut},
    str::FromStr,
};

use crate::chess::{piece::Colour, squareset::SquareSet};

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum File {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl File {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn char(self) -> char {
        (b'a' + self as u8) as char
    }
}

#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum Rank {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
}

impl Rank {
    pub const fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            // SAFETY: inner is less than 8, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(index) })
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// The rank as seen from `side`'s point of view, so that
    /// a pawn's starting rank is always `Rank::Two`.
    pub const fn relative_to(self, side: Colour) -> Self {
        match side {
            Colour::White => self,
            // SAFETY: 7 - x is in 0..8 for every x in 0..8.
            Colour::Black => unsafe { std::mem::transmute::<u8, Self>(7 - self as u8) },
        }
    }
}

#[rustfmt::skip]
#[derive(PartialEq, Eq, Clone, Copy, PartialOrd, Ord, Hash, Debug, Default)]
#[repr(u8)]
pub enum Square {
    #[default]
    A1, B1, C1, D1, E1, F1, G1, H1,
    A2, B2, C2, D2, E2, F2, G2, H2,
    A3, B3, C3, D3, E3, F3, G3, H3,
    A4, B4, C4, D4, E4, F4, G4, H4,
    A5, B5, C5, D5, E5, F5, G5, H5,
    A6, B6, C6, D6, E6, F6, G6, H6,
    A7, B7, C7, D7, E7, F7, G7, H7,
    A8, B8, C8, D8, E8, F8, G8, H8,
}

// "no square" is expressed as `Option::None`, which must stay off-board and free.
const _SQUARE_ASSERT: () = assert!(size_of::<Square>() == size_of::<Option<Square>>());

impl<T> Index<Square> for [T; 64] {
    type Output = T;

    fn index(&self, index: Square) -> &Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked(index as usize) }
    }
}

impl<T> IndexMut<Square> for [T; 64] {
    fn index_mut(&mut self, index: Square) -> &mut Self::Output {
        // SAFETY: the legal values for this type are all in bounds.
        unsafe { self.get_unchecked_mut(index as usize) }
    }
}

static SQUARE_NAMES: [&str; 64] = [
    "a1", "b1", "c1", "d1", "e1", "f1", "g1", "h1", "a2", "b2", "c2", "d2", "e2", "f2", "g2", "h2",
    "a3", "b3", "c3", "d3", "e3", "f3", "g3", "h3", "a4", "b4", "c4", "d4", "e4", "f4", "g4", "h4",
    "a5", "b5", "c5", "d5", "e5", "f5", "g5", "h5", "a6", "b6", "c6", "d6", "e6", "f6", "g6", "h6",
    "a7", "b7", "c7", "d7", "e7", "f7", "g7", "h7", "a8", "b8", "c8", "d8", "e8", "f8", "g8", "h8",
];

impl Square {
    pub const fn from_rank_file(rank: Rank, file: File) -> Self {
        let inner = rank as u8 * 8 + file as u8;
        // SAFETY: Rank and File are constrained such that inner is always < 64.
        unsafe { std::mem::transmute(inner) }
    }

    pub const fn new(inner: u8) -> Option<Self> {
        if inner < 64 {
            // SAFETY: inner is less than 64, so it corresponds to a valid enum variant.
            Some(unsafe { std::mem::transmute::<u8, Self>(inner) })
        } else {
            None
        }
    }

    /// SAFETY: you may only call this function with value of `inner` less than 64.
    pub const unsafe fn new_unchecked(inner: u8) -> Self {
        debug_assert!(inner < 64);
        // SAFETY: caller's precondition.
        unsafe { std::mem::transmute(inner) }
    }

    pub const fn flip_rank(self) -> Self {
        // SAFETY: flipping the rank bits of a value in 0..64 stays in 0..64.
        unsafe { std::mem::transmute(self as u8 ^ 0b111_000) }
    }

    pub const fn relative_to(self, side: Colour) -> Self {
        match side {
            Colour::White => self,
            Colour::Black => self.flip_rank(),
        }
    }

    /// The file that this square is on.
    pub const fn file(self) -> File {
        // SAFETY: `self as u8 % 8` is always less than 8.
        unsafe { std::mem::transmute(self as u8 % 8) }
    }

    /// The rank that this square is on.
    pub const fn rank(self) -> Rank {
        // SAFETY: `self as u8 / 8` is always less than 8.
        unsafe { std::mem::transmute(self as u8 / 8) }
    }

    /// Chebyshev distance, the number of king steps between two squares.
    pub const fn distance(a: Self, b: Self) -> u8 {
        let files = (a as u8 % 8).abs_diff(b as u8 % 8);
        let ranks = (a as u8 / 8).abs_diff(b as u8 / 8);
        max!(files, ranks)
    }

    /// Manhattan distance between two squares.
    pub const fn manhattan(a: Self, b: Self) -> u8 {
        (a as u8 % 8).abs_diff(b as u8 % 8) + (a as u8 / 8).abs_diff(b as u8 / 8)
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn inner(self) -> u8 {
        self as u8
    }

    pub const fn add(self, offset: u8) -> Option<Self> {
        Self::new(self as u8 + offset)
    }

    pub const fn sub(self, offset: u8) -> Option<Self> {
        match (self as u8).checked_sub(offset) {
            Some(v) => Self::new(v),
            None => None,
        }
    }

    pub const fn as_set(self) -> SquareSet {
        SquareSet::from_square(self)
    }

    /// The square one step forward for a pawn of colour `side`.
    pub const fn pawn_push(self, side: Colour) -> Option<Self> {
        match side {
            Colour::White => self.add(8),
            Colour::Black => self.sub(8),
        }
    }

    /// Whether this is a light square.
    pub const fn is_light(self) -> bool {
        (self as u8 / 8 + self as u8 % 8) % 2 == 1
    }

    pub fn all() -> impl DoubleEndedIterator<Item = Self> {
        // SAFETY: all values are within `0..64`.
        (0..64u8).map(|i| unsafe { std::mem::transmute(i) })
    }

    pub fn name(self) -> &'static str {
        SQUARE_NAMES[self]
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Square {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SQUARE_NAMES
            .iter()
            .position(|&name| name == s)
            .and_then(|index| -> Option<u8> { index.try_into().ok() })
            .and_then(Self::new)
            .ok_or("Invalid square name")
    }
}

/// Castling rights, packed as four independent bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CastlingRights {
    data: u8,
}

/// Rights that survive a move touching each square.
/// Vacating or capturing on a king or rook home square masks out the matching rights.
#[rustfmt::skip]
static CASTLING_UPDATE: [u8; 64] = [
    13, 15, 15, 15, 12, 15, 15, 14,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
     7, 15, 15, 15,  3, 15, 15, 11,
];

impl CastlingRights {
    pub const WKCA: u8 = 0b0001;
    pub const WQCA: u8 = 0b0010;
    pub const BKCA: u8 = 0b0100;
    pub const BQCA: u8 = 0b1000;
    #[cfg(test)]
    pub const ALL: Self = Self { data: 0b1111 };
    pub const NONE: Self = Self { data: 0 };

    #[cfg(test)]
    pub const fn from_bits(bits: u8) -> Self {
        Self { data: bits & 0b1111 }
    }

    pub const fn bits(self) -> u8 {
        self.data
    }

    pub const fn hashkey_index(self) -> usize {
        self.data as usize
    }

    pub const fn has(self, flag: u8) -> bool {
        self.data & flag != 0
    }

    pub const fn kingside(self, side: Colour) -> bool {
        match side {
            Colour::White => self.has(Self::WKCA),
            Colour::Black => self.has(Self::BKCA),
        }
    }

    pub const fn queenside(self, side: Colour) -> bool {
        match side {
            Colour::White => self.has(Self::WQCA),
            Colour::Black => self.has(Self::BQCA),
        }
    }

    pub fn add(&mut self, flag: u8) {
        self.data |= flag & 0b1111;
    }

    /// Masks out every right lost by a move between `from` and `to`.
    pub fn update(&mut self, from: Square, to: Square) {
        self.data &= CASTLING_UPDATE[from] & CASTLING_UPDATE[to];
    }
}

impl Display for CastlingRights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data == 0 {
            return write!(f, "-");
        }
        for (flag, c) in [(Self::WKCA, 'K'), (Self::WQCA, 'Q'), (Self::BKCA, 'k'), (Self::BQCA, 'q')] {
            if self.has(flag) {
                write!(f, "{c}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_flipping() {
        assert_eq!(Square::A1.flip_rank(), Square::A8);
        assert_eq!(Square::H1.flip_rank(), Square::H8);
        assert_eq!(Square::E2.relative_to(Colour::Black), Square::E7);
        assert_eq!(Square::E2.relative_to(Colour::White), Square::E2);
    }

    #[test]
    fn square_names_round_trip() {
        for sq in Square::all() {
            assert_eq!(sq.name().parse::<Square>(), Ok(sq));
        }
        assert!("i9".parse::<Square>().is_err());
        assert!("-".parse::<Square>().is_err());
    }

    #[test]
    fn distances() {
        assert_eq!(Square::distance(Square::A1, Square::H8), 7);
        assert_eq!(Square::manhattan(Square::A1, Square::H8), 14);
        assert_eq!(Square::distance(Square::E4, Square::F6), 2);
    }

    #[test]
    fn rook_moves_strip_rights() {
        let mut rights = CastlingRights::ALL;
        rights.update(Square::H1, Square::H5);
        assert!(!rights.kingside(Colour::White));
        assert!(rights.queenside(Colour::White));
        // capturing the a8 rook removes black's queenside right.
        rights.update(Square::B7, Square::A8);
        assert!(!rights.queenside(Colour::Black));
        assert!(rights.kingside(Colour::Black));
        assert_eq!(rights.to_string(), "Qk");
    }

    #[test]
    fn king_moves_strip_both_rights() {
        let mut rights = CastlingRights::ALL;
        rights.update(Square::E8, Square::E7);
        assert_eq!(rights.bits(), CastlingRights::WKCA | CastlingRights::WQCA);
        rights.update(Square::E1, Square::G1);
        assert_eq!(rights, CastlingRights::NONE);
        assert_eq!(rights.to_string(), "-");
    }
}
