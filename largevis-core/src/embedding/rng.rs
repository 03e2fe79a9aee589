//! Deterministic per-block random streams for the SGD workers.
//!
//! Work is split into fixed-size blocks of iterations. Each block draws from
//! its own `SmallRng`, seeded by mixing the run seed with the block index, so
//! a single-threaded run is reproducible and parallel blocks never share a
//! generator.

use rand::{SeedableRng, rngs::SmallRng};

/// SplitMix64 increment (the 64-bit golden ratio) used for per-block seed
/// derivation.
const BLOCK_SEED_SPACING: u64 = 0x9E37_79B9_7F4A_7C15;
const SPLITMIX_MULT_A: u64 = 0xBF58_476D_1CE4_E5B9;
const SPLITMIX_MULT_B: u64 = 0x94D0_49BB_1331_11EB;

#[inline]
pub(crate) fn mix_block_seed(base_seed: u64, block: u64) -> u64 {
    splitmix64(base_seed ^ block.wrapping_add(1).wrapping_mul(BLOCK_SEED_SPACING))
}

#[inline]
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(BLOCK_SEED_SPACING);
    state = (state ^ (state >> 30)).wrapping_mul(SPLITMIX_MULT_A);
    state = (state ^ (state >> 27)).wrapping_mul(SPLITMIX_MULT_B);
    state ^ (state >> 31)
}

pub(crate) fn block_rng(base_seed: u64, block: u64) -> SmallRng {
    SmallRng::seed_from_u64(mix_block_seed(base_seed, block))
}
