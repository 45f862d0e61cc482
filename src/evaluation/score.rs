use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

/// A midgame/endgame score pair, blended by game phase at the end of evaluation.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct S(pub i32, pub i32);

impl Add for S {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0, self.1 + rhs.1)
    }
}

impl Sub for S {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0, self.1 - rhs.1)
    }
}

impl AddAssign for S {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
        self.1 += rhs.1;
    }
}

impl SubAssign for S {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
        self.1 -= rhs.1;
    }
}

impl Neg for S {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0, -self.1)
    }
}

impl Mul<i32> for S {
    type Output = Self;

    fn mul(self, rhs: i32) -> Self {
        Self(self.0 * rhs, self.1 * rhs)
    }
}

impl Sum for S {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self(0, 0), |acc, x| acc + x)
    }
}

impl Display for S {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "S({}, {})", self.0, self.1)
    }
}

impl S {
    pub const NULL: Self = Self(0, 0);

    /// Blends the pair, where `phase` runs from 0 (bare kings) to `max_phase` (full material).
    pub const fn value(self, phase: i32, max_phase: i32) -> i32 {
        (self.0 * phase + self.1 * (max_phase - phase)) / max_phase
    }
}

#[cfg(test)]
mod tests {
    use super::S;

    #[test]
    fn blending() {
        let s = S(100, 40);
        assert_eq!(s.value(24, 24), 100);
        assert_eq!(s.value(0, 24), 40);
        assert_eq!(s.value(12, 24), 70);
        assert_eq!((s - S(10, 10)) * 2, S(180, 60));
        assert_eq!([S(1, 2), S(3, 4)].into_iter().sum::<S>(), S(4, 6));
    }
}
