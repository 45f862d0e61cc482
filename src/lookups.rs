use crate::{
    chess::{
        piece::Piece,
        types::{CastlingRights, Square},
    },
    rng::XorShiftState,
};

/// Zobrist keys, drawn once from the deterministic generator at compile time.
pub struct ZobristKeys {
    pub pieces: [[u64; 64]; 12],
    pub ep_files: [u64; 8],
    pub castling: [u64; 16],
    pub side: u64,
}

const fn init_hash_keys() -> ZobristKeys {
    let mut state = XorShiftState::new();
    let mut pieces = [[0; 64]; 12];
    cfor!(let mut index = 0; index < 12; index += 1; {
        cfor!(let mut sq = 0; sq < 64; sq += 1; {
            let key;
            (key, state) = state.next_self();
            pieces[index][sq] = key;
        });
    });
    let mut ep_files = [0; 8];
    cfor!(let mut file = 0; file < 8; file += 1; {
        let key;
        (key, state) = state.next_self();
        ep_files[file] = key;
    });
    let mut castling = [0; 16];
    cfor!(let mut index = 0; index < 16; index += 1; {
        let key;
        (key, state) = state.next_self();
        castling[index] = key;
    });
    let (side, _) = state.next_self();
    ZobristKeys {
        pieces,
        ep_files,
        castling,
        side,
    }
}

pub static KEYS: ZobristKeys = init_hash_keys();

/// Key for a piece standing on a square.
pub fn piece_key(piece: Piece, sq: Square) -> u64 {
    KEYS.pieces[piece][sq]
}

/// Key for an en passant target; `None` contributes nothing.
pub fn ep_key(ep: Option<Square>) -> u64 {
    ep.map_or(0, |sq| KEYS.ep_files[sq.file().index()])
}

pub fn castle_key(rights: CastlingRights) -> u64 {
    KEYS.castling[rights.hashkey_index()]
}

pub fn side_key() -> u64 {
    KEYS.side
}
