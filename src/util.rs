use crate::evaluation::MATE_SCORE;

/// The deepest the search will ever go, in plies from the root.
pub const MAX_DEPTH: i32 = 64;
pub const MAX_PLY: usize = MAX_DEPTH as usize;
/// Strictly greater than any score the search can return.
pub const INFINITY: i32 = 50_000;
const _INFINITY_ASSERT: () = assert!(INFINITY > MATE_SCORE);
pub const MEGABYTE: usize = 1024 * 1024;
