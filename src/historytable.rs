use crate::{
    chess::{chessmove::Move, piece::Piece, types::Square},
    util::MAX_PLY,
};

const fn history_bonus(depth: i32) -> i32 {
    if depth > 13 {
        32
    } else {
        16 * depth * depth + 128 * max!(depth - 1, 0)
    }
}

pub const MAX_HISTORY: i16 = i16::MAX / 2;

/// Moves `val` towards the bonus, with a gravity term that keeps it inside `±MAX_HISTORY`.
pub fn update_history(val: &mut i16, depth: i32, is_good: bool) {
    #![allow(clippy::cast_possible_truncation)]
    let delta = if is_good { history_bonus(depth) } else { -history_bonus(depth) };
    *val += delta as i16 - (i32::from(*val) * delta.abs() / i32::from(MAX_HISTORY)) as i16;
}

/// Quiet-move history, indexed by moving piece and target square.
#[derive(Clone)]
pub struct HistoryTable {
    table: [[i16; 64]; 12],
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryTable {
    pub const fn new() -> Self {
        Self { table: [[0; 64]; 12] }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().flatten().for_each(|x| *x = 0);
    }

    pub fn get(&self, piece: Piece, sq: Square) -> i16 {
        self.table[piece][sq]
    }

    pub fn get_mut(&mut self, piece: Piece, sq: Square) -> &mut i16 {
        &mut self.table[piece][sq]
    }
}

/// Two quiet moves per ply that recently caused a beta cutoff.
#[derive(Clone)]
pub struct KillerTable {
    table: [[Option<Move>; 2]; MAX_PLY + 1],
}

impl Default for KillerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl KillerTable {
    pub const fn new() -> Self {
        Self { table: [[None; 2]; MAX_PLY + 1] }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(|k| *k = [None; 2]);
    }

    /// Records a killer at `height`, pushing the older one into the second slot.
    pub fn insert(&mut self, height: usize, m: Move) {
        let Some(slots) = self.table.get_mut(height) else { return };
        if slots[0] != Some(m) {
            slots[1] = slots[0];
            slots[0] = Some(m);
        }
    }

    /// Which slot `m` occupies at `height`, if any.
    pub fn slot_of(&self, height: usize, m: Move) -> Option<usize> {
        self.table.get(height)?.iter().position(|&k| k == Some(m))
    }

    /// Forgets the killers of the next ply, so that siblings don't inherit stale cousins.
    pub fn clear_child(&mut self, height: usize) {
        if let Some(slots) = self.table.get_mut(height + 1) {
            *slots = [None; 2];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_is_bounded() {
        let mut val = 0;
        for _ in 0..1000 {
            update_history(&mut val, 12, true);
        }
        assert!(val > 0 && val <= MAX_HISTORY);
        for _ in 0..1000 {
            update_history(&mut val, 12, false);
        }
        assert!(val < 0 && val >= -MAX_HISTORY);
    }

    #[test]
    fn killers_shift() {
        let a = Move::new(Square::G1, Square::F3, Piece::WN, None, 0);
        let b = Move::new(Square::B1, Square::C3, Piece::WN, None, 0);
        let c = Move::new(Square::E2, Square::E3, Piece::WP, None, 0);
        let mut k = KillerTable::new();
        k.insert(3, a);
        k.insert(3, a);
        assert_eq!(k.slot_of(3, a), Some(0));
        assert_eq!(k.slot_of(3, b), None);
        k.insert(3, b);
        assert_eq!((k.slot_of(3, b), k.slot_of(3, a)), (Some(0), Some(1)));
        k.insert(3, c);
        assert_eq!(k.slot_of(3, a), None);
        assert_eq!(k.slot_of(4, c), None);
        k.clear_child(2);
        assert_eq!(k.slot_of(3, c), None);
    }
}
