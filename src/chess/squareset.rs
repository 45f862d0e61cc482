use std::{
    fmt::Display,
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not, Shl, Shr, Sub},
};

use crate::chess::types::Square;

/// A set of squares, with support for very fast set operations and in-order iteration.
/// Most chess engines call this type `Bitboard`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct SquareSet {
    inner: u64,
}

impl SquareSet {
    pub const EMPTY: Self = Self { inner: 0 };
    pub const FULL: Self = Self { inner: !0 };

    pub const RANK_1: Self = Self::from_inner(0x0000_0000_0000_00FF);
    pub const RANK_2: Self = Self::from_inner(0x0000_0000_0000_FF00);
    pub const RANK_7: Self = Self::from_inner(0x00FF_0000_0000_0000);
    pub const RANK_8: Self = Self::from_inner(0xFF00_0000_0000_0000);
    pub const FILE_A: Self = Self::from_inner(0x0101_0101_0101_0101);
    pub const FILE_H: Self = Self::from_inner(0x8080_8080_8080_8080);

    pub const BACK_RANKS: Self = Self::RANK_1.union(Self::RANK_8);

    pub const fn from_inner(inner: u64) -> Self {
        Self { inner }
    }

    pub const fn from_square(square: Square) -> Self {
        Self {
            inner: 1 << square.index(),
        }
    }

    pub const fn file_of(square: Square) -> Self {
        Self::from_inner(Self::FILE_A.inner << (square.index() % 8))
    }

    pub const fn inner(self) -> u64 {
        self.inner
    }

    pub const fn count(self) -> u32 {
        self.inner.count_ones()
    }

    pub const fn is_empty(self) -> bool {
        self.inner == 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self {
            inner: self.inner | other.inner,
        }
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self {
            inner: self.inner & other.inner,
        }
    }

    pub const fn contains_square(self, square: Square) -> bool {
        (self.inner & (1 << square.index())) != 0
    }

    pub const fn add_square(self, square: Square) -> Self {
        Self {
            inner: self.inner | (1 << square.index()),
        }
    }

    pub const fn remove_square(self, square: Square) -> Self {
        Self {
            inner: self.inner & !(1 << square.index()),
        }
    }

    pub const fn toggle_square(self, square: Square) -> Self {
        Self {
            inner: self.inner ^ (1 << square.index()),
        }
    }

    /// The lowest set square, if any.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn first(self) -> Option<Square> {
        Square::new(self.inner.trailing_zeros() as u8)
    }

    #[allow(clippy::missing_const_for_fn)]
    pub fn iter(self) -> SquareIter {
        SquareIter::new(self.inner)
    }

    pub const fn north_one(self) -> Self {
        Self::from_inner(self.inner << 8)
    }
    pub const fn south_one(self) -> Self {
        Self::from_inner(self.inner >> 8)
    }
    pub const fn north_east_one(self) -> Self {
        Self::from_inner((self.inner << 9) & !Self::FILE_A.inner)
    }
    pub const fn north_west_one(self) -> Self {
        Self::from_inner((self.inner << 7) & !Self::FILE_H.inner)
    }
    pub const fn south_east_one(self) -> Self {
        Self::from_inner((self.inner >> 7) & !Self::FILE_A.inner)
    }
    pub const fn south_west_one(self) -> Self {
        Self::from_inner((self.inner >> 9) & !Self::FILE_H.inner)
    }

    /// The squares on the files either side of each square in the set.
    pub const fn adjacent_files(self) -> Self {
        let mut files = 0;
        cfor!(let mut file = 0; file < 8; file += 1; {
            if self.inner & (Self::FILE_A.inner << file) != 0 {
                if file > 0 {
                    files |= Self::FILE_A.inner << (file - 1);
                }
                if file < 7 {
                    files |= Self::FILE_A.inner << (file + 1);
                }
            }
        });
        Self::from_inner(files)
    }

    pub const fn many(self) -> bool {
        self.inner & self.inner.wrapping_sub(1) != 0
    }
}

/// Iterator over the squares of a square-set.
/// The squares are returned in increasing order.
pub struct SquareIter {
    value: u64,
}

impl SquareIter {
    pub const fn new(value: u64) -> Self {
        Self { value }
    }
}

impl Iterator for SquareIter {
    type Item = Square;

    fn next(&mut self) -> Option<Self::Item> {
        if self.value == 0 {
            None
        } else {
            #[allow(clippy::cast_possible_truncation)]
            let lsb = self.value.trailing_zeros() as u8;
            self.value &= self.value - 1;
            // SAFETY: u64::trailing_zeros of a non-zero value is within `0..64`,
            // all of which correspond to valid enum variants of Square.
            Some(unsafe { Square::new_unchecked(lsb) })
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.value.count_ones() as usize;
        (n, Some(n))
    }
}

impl IntoIterator for SquareSet {
    type Item = Square;
    type IntoIter = SquareIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl BitOr for SquareSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner | rhs.inner,
        }
    }
}

impl BitOrAssign for SquareSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.inner |= rhs.inner;
    }
}

impl BitAnd for SquareSet {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner & rhs.inner,
        }
    }
}

impl BitAndAssign for SquareSet {
    fn bitand_assign(&mut self, rhs: Self) {
        self.inner &= rhs.inner;
    }
}

impl BitXor for SquareSet {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner ^ rhs.inner,
        }
    }
}

impl BitXorAssign for SquareSet {
    fn bitxor_assign(&mut self, rhs: Self) {
        self.inner ^= rhs.inner;
    }
}

impl Sub for SquareSet {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            inner: self.inner & !rhs.inner,
        }
    }
}

impl Not for SquareSet {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self { inner: !self.inner }
    }
}

impl Shr<u8> for SquareSet {
    type Output = Self;

    fn shr(self, rhs: u8) -> Self::Output {
        Self {
            inner: self.inner >> rhs,
        }
    }
}

impl Shl<u8> for SquareSet {
    type Output = Self;

    fn shl(self, rhs: u8) -> Self::Output {
        Self {
            inner: self.inner << rhs,
        }
    }
}

impl Display for SquareSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                let bit = 1u64 << (rank * 8 + file);
                write!(f, "{}", if self.inner & bit != 0 { '1' } else { '.' })?;
            }
            if rank > 0 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
