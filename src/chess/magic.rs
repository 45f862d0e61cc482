use std::time::Instant;

use crate::{
    chess::{
        piece::{Colour, PieceType},
        squareset::SquareSet,
        types::Square,
    },
    errors::MagicError,
    rng::XorShiftState,
};

/// How many candidate multipliers are tried per square before giving up.
pub const MAX_MAGIC_ATTEMPTS: u64 = 100_000_000;

/// Expands the `index`-th subset of `mask`, taking the mask's squares
/// in ascending order as the bits of `index`.
pub const fn set_occupancy(index: usize, mut mask: SquareSet) -> SquareSet {
    let mut occupancy = SquareSet::EMPTY;

    let bits = mask.count();
    cfor!(let mut count = 0; count < bits; count += 1; {
        let Some(square) = mask.first() else {
            break;
        };
        mask = mask.remove_square(square);
        if index & (1 << count) != 0 {
            occupancy = occupancy.add_square(square);
        }
    });

    occupancy
}

/// Squares whose occupancy can change a bishop's attacks from `sq`.
/// The board edge never blocks anything, so it is left out.
pub const fn bishop_relevance_mask(sq: Square) -> SquareSet {
    let mut attacks = 0;

    let (mut f, mut r);

    let tr = sq.rank() as i32;
    let tf = sq.file() as i32;

    cfor!((r, f) = (tr + 1, tf + 1); r <= 6 && f <= 6; (r, f) = (r + 1, f + 1); {
        attacks |= 1 << (r * 8 + f);
    });
    cfor!((r, f) = (tr + 1, tf - 1); r <= 6 && f >= 1; (r, f) = (r + 1, f - 1); {
        attacks |= 1 << (r * 8 + f);
    });
    cfor!((r, f) = (tr - 1, tf + 1); r >= 1 && f <= 6; (r, f) = (r - 1, f + 1); {
        attacks |= 1 << (r * 8 + f);
    });
    cfor!((r, f) = (tr - 1, tf - 1); r >= 1 && f >= 1; (r, f) = (r - 1, f - 1); {
        attacks |= 1 << (r * 8 + f);
    });

    SquareSet::from_inner(attacks)
}

/// Squares whose occupancy can change a rook's attacks from `sq`.
pub const fn rook_relevance_mask(sq: Square) -> SquareSet {
    let mut attacks = 0;

    let (mut f, mut r);

    let tr = sq.rank() as i32;
    let tf = sq.file() as i32;

    cfor!(r = tr + 1; r <= 6; r += 1; {
        attacks |= 1 << (r * 8 + tf);
    });
    cfor!(r = tr - 1; r >= 1; r -= 1; {
        attacks |= 1 << (r * 8 + tf);
    });
    cfor!(f = tf + 1; f <= 6; f += 1; {
        attacks |= 1 << (tr * 8 + f);
    });
    cfor!(f = tf - 1; f >= 1; f -= 1; {
        attacks |= 1 << (tr * 8 + f);
    });

    SquareSet::from_inner(attacks)
}

/// Ray-cast bishop attacks. Slow, but obviously correct.
pub const fn bishop_attacks_on_the_fly(square: Square, block: SquareSet) -> SquareSet {
    let mut attacks = 0;
    let block = block.inner();

    let (mut f, mut r);

    let tr = square.rank() as i32;
    let tf = square.file() as i32;

    cfor!((r, f) = (tr + 1, tf + 1); r <= 7 && f <= 7; (r, f) = (r + 1, f + 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!((r, f) = (tr + 1, tf - 1); r <= 7 && f >= 0; (r, f) = (r + 1, f - 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!((r, f) = (tr - 1, tf + 1); r >= 0 && f <= 7; (r, f) = (r - 1, f + 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!((r, f) = (tr - 1, tf - 1); r >= 0 && f >= 0; (r, f) = (r - 1, f - 1); {
        let sq_bb = 1 << (r * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });

    SquareSet::from_inner(attacks)
}

/// Ray-cast rook attacks.
pub const fn rook_attacks_on_the_fly(square: Square, block: SquareSet) -> SquareSet {
    let mut attacks = 0;
    let block = block.inner();

    let (mut f, mut r);

    let tr = square.rank() as i32;
    let tf = square.file() as i32;

    cfor!(r = tr + 1; r <= 7; r += 1; {
        let sq_bb = 1 << (r * 8 + tf);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!(r = tr - 1; r >= 0; r -= 1; {
        let sq_bb = 1 << (r * 8 + tf);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!(f = tf + 1; f <= 7; f += 1; {
        let sq_bb = 1 << (tr * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });
    cfor!(f = tf - 1; f >= 0; f -= 1; {
        let sq_bb = 1 << (tr * 8 + f);
        attacks |= sq_bb;
        if block & sq_bb != 0 {
            break;
        }
    });

    SquareSet::from_inner(attacks)
}

const fn init_jumping_attacks<const IS_KNIGHT: bool>() -> [SquareSet; 64] {
    let mut attacks = [SquareSet::EMPTY; 64];
    let deltas: &[i8; 8] = if IS_KNIGHT {
        &[17, 15, 10, 6, -17, -15, -10, -6]
    } else {
        &[9, 8, 7, 1, -9, -8, -7, -1]
    };

    cfor!(let mut sq = 0u8; sq < 64; sq += 1; {
        let mut attacks_bb = 0;
        cfor!(let mut idx = 0; idx < 8; idx += 1; {
            #[allow(clippy::cast_possible_wrap)]
            let attacked = sq as i8 + deltas[idx];
            if 0 <= attacked && attacked < 64 {
                // a jump that wraps round the board edge lands far away.
                let from_file = (sq % 8) as i8;
                let to_file = attacked % 8;
                if (from_file - to_file).abs() <= 2 {
                    attacks_bb |= 1 << attacked;
                }
            }
        });
        attacks[sq as usize] = SquareSet::from_inner(attacks_bb);
    });

    attacks
}

const fn init_pawn_attacks() -> [[SquareSet; 64]; 2] {
    let mut attacks = [[SquareSet::EMPTY; 64]; 2];
    cfor!(let mut sq = 0u8; sq < 64; sq += 1; {
        let bb = SquareSet::from_inner(1 << sq);
        attacks[0][sq as usize] = bb.north_east_one().union(bb.north_west_one());
        attacks[1][sq as usize] = bb.south_east_one().union(bb.south_west_one());
    });
    attacks
}

/// A per-square magic multiplier, addressing one slice of a dense attack table.
#[derive(Clone, Copy, Debug, Default)]
pub struct MagicEntry {
    pub mask: SquareSet,
    pub magic: u64,
    pub shift: u8,
    pub offset: usize,
}

impl MagicEntry {
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(&self, blockers: SquareSet) -> usize {
        let relevant = blockers.intersection(self.mask).inner();
        self.offset + (relevant.wrapping_mul(self.magic) >> self.shift) as usize
    }
}

/// Tries sparse random multipliers until one maps every occupancy subset of the
/// relevance mask onto a slot without two different attack sets colliding.
/// Returns the multiplier and the dense attack table it indexes.
fn find_magic(
    square: Square,
    piece: PieceType,
    rng: &mut XorShiftState,
    max_attempts: u64,
) -> Result<(u64, Vec<SquareSet>), MagicError> {
    let (mask, attacks_of): (SquareSet, fn(Square, SquareSet) -> SquareSet) = match piece {
        PieceType::Bishop => (bishop_relevance_mask(square), bishop_attacks_on_the_fly),
        _ => (rook_relevance_mask(square), rook_attacks_on_the_fly),
    };
    let relevant_bits = mask.count();
    let variations = 1usize << relevant_bits;

    let occupancies = (0..variations)
        .map(|i| set_occupancy(i, mask))
        .collect::<Vec<_>>();
    let attacks = occupancies
        .iter()
        .map(|&occ| attacks_of(square, occ))
        .collect::<Vec<_>>();

    let mut used = vec![SquareSet::EMPTY; variations];

    for _ in 0..max_attempts {
        let magic = rng.sparse_u64();

        // bad multipliers spread too few bits into the index.
        if (mask.inner().wrapping_mul(magic) & 0xFF00_0000_0000_0000).count_ones() < 6 {
            continue;
        }

        used.fill(SquareSet::EMPTY);

        // slider attacks are never empty, so EMPTY marks a free slot.
        let fail = occupancies.iter().zip(&attacks).any(|(occ, &attack)| {
            #[allow(clippy::cast_possible_truncation)]
            let index = (occ.inner().wrapping_mul(magic) >> (64 - relevant_bits)) as usize;
            let slot = &mut used[index];
            if *slot == SquareSet::EMPTY {
                *slot = attack;
                false
            } else {
                *slot != attack
            }
        });

        if !fail {
            return Ok((magic, used));
        }
    }

    Err(MagicError::NotFound {
        piece,
        square,
        attempts: max_attempts,
    })
}

/// Every attack lookup the move generator and evaluation need.
///
/// Built once per process and shared read-only between boards.
pub struct AttackTables {
    pawn: [[SquareSet; 64]; 2],
    knight: [SquareSet; 64],
    king: [SquareSet; 64],
    bishop_entries: [MagicEntry; 64],
    rook_entries: [MagicEntry; 64],
    bishop_table: Vec<SquareSet>,
    rook_table: Vec<SquareSet>,
}

impl AttackTables {
    /// Builds all tables, searching for magics from the default seed.
    pub fn new() -> Result<Self, MagicError> {
        Self::with_rng(&mut XorShiftState::new())
    }

    /// Builds all tables, drawing magic candidates from `rng`.
    pub fn with_rng(rng: &mut XorShiftState) -> Result<Self, MagicError> {
        let start = Instant::now();

        let mut bishop_entries = [MagicEntry::default(); 64];
        let mut rook_entries = [MagicEntry::default(); 64];
        let mut bishop_table = Vec::new();
        let mut rook_table = Vec::new();

        for (piece, entries, table) in [
            (PieceType::Bishop, &mut bishop_entries, &mut bishop_table),
            (PieceType::Rook, &mut rook_entries, &mut rook_table),
        ] {
            for square in Square::all() {
                let (magic, attacks) = find_magic(square, piece, rng, MAX_MAGIC_ATTEMPTS)?;
                let mask = if piece == PieceType::Bishop {
                    bishop_relevance_mask(square)
                } else {
                    rook_relevance_mask(square)
                };
                #[allow(clippy::cast_possible_truncation)]
                let shift = (64 - mask.count()) as u8;
                entries[square] = MagicEntry {
                    mask,
                    magic,
                    shift,
                    offset: table.len(),
                };
                table.extend_from_slice(&attacks);
            }
        }

        tracing::debug!(
            bishop_slots = bishop_table.len(),
            rook_slots = rook_table.len(),
            elapsed_us = start.elapsed().as_micros(),
            "attack tables initialised"
        );

        Ok(Self {
            pawn: init_pawn_attacks(),
            knight: init_jumping_attacks::<true>(),
            king: init_jumping_attacks::<false>(),
            bishop_entries,
            rook_entries,
            bishop_table,
            rook_table,
        })
    }

    /// Squares a pawn of `colour` on `sq` attacks.
    pub fn pawn_attacks(&self, colour: Colour, sq: Square) -> SquareSet {
        self.pawn[colour][sq]
    }

    pub fn knight_attacks(&self, sq: Square) -> SquareSet {
        self.knight[sq]
    }

    pub fn king_attacks(&self, sq: Square) -> SquareSet {
        self.king[sq]
    }

    pub fn bishop_attacks(&self, sq: Square, blockers: SquareSet) -> SquareSet {
        let index = self.bishop_entries[sq].index(blockers);
        self.bishop_table[index]
    }

    pub fn rook_attacks(&self, sq: Square, blockers: SquareSet) -> SquareSet {
        let index = self.rook_entries[sq].index(blockers);
        self.rook_table[index]
    }

    pub fn queen_attacks(&self, sq: Square, blockers: SquareSet) -> SquareSet {
        self.bishop_attacks(sq, blockers) | self.rook_attacks(sq, blockers)
    }

    /// Attacks of a non-pawn piece type.
    pub fn attacks_by_type(&self, pt: PieceType, sq: Square, blockers: SquareSet) -> SquareSet {
        match pt {
            PieceType::Pawn => {
                debug_assert!(false, "Invalid piece type: {pt:?}");
                SquareSet::EMPTY
            }
            PieceType::Knight => self.knight_attacks(sq),
            PieceType::Bishop => self.bishop_attacks(sq, blockers),
            PieceType::Rook => self.rook_attacks(sq, blockers),
            PieceType::Queen => self.queen_attacks(sq, blockers),
            PieceType::King => self.king_attacks(sq),
        }
    }

    #[cfg(test)]
    pub fn bishop_entry(&self, sq: Square) -> &MagicEntry {
        &self.bishop_entries[sq]
    }

    #[cfg(test)]
    pub fn rook_entry(&self, sq: Square) -> &MagicEntry {
        &self.rook_entries[sq]
    }
}

/// One table per test binary; magic discovery is too slow to repeat in every test.
#[cfg(test)]
pub fn test_tables() -> std::sync::Arc<AttackTables> {
    use std::sync::{Arc, OnceLock};
    static TABLES: OnceLock<Arc<AttackTables>> = OnceLock::new();
    TABLES
        .get_or_init(|| Arc::new(AttackTables::new().expect("magic discovery failed")))
        .clone()
}
