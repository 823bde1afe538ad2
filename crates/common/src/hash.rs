//! Deterministic hashing shared by every seeded generator.
//!
//! These functions must stay bit-for-bit stable: terrain variants, star
//! fields and light flicker phases are all keyed by them, and a change here
//! would visibly reshuffle the world between sessions.

/// Splitmix64: a fast, high-quality deterministic mixing step.
pub fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Hash a 2D integer coordinate together with a seed.
pub fn hash2d(x: i32, y: i32, seed: u64) -> u64 {
    let packed = ((x as u32 as u64) << 32) | (y as u32 as u64);
    splitmix64(splitmix64(seed) ^ packed)
}

/// FNV-1a over a string, used to derive per-instance seeds from server ids.
pub fn hash_str(s: &str) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in s.as_bytes() {
        h ^= b as u64;
        h = h.wrapping_mul(0x0100_0000_01b3);
    }
    h
}

/// Map a hash onto `[0, 1)` using its top 24 bits.
pub fn unit_f32(hash: u64) -> f32 {
    (hash >> 40) as f32 / (1u64 << 24) as f32
}
