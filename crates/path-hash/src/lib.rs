//! Integer hashing for deterministic sample generation.
//!
//! Built around the MurmurHash3 x86_32 mixing steps (Austin Appleby).
//! Inputs are 32-bit words rather than bytes, so hashing a pixel coordinate,
//! a sample index and a dimension never goes through a byte buffer.
//! Word input is read little-endian, which makes `murmur3_32(&[w], seed)`
//! equal to the byte-oriented reference hash of `w.to_le_bytes()`.

const C1: u32 = 0xcc9e2d51;
const C2: u32 = 0x1b873593;

/// Mix one 32-bit block into the running hash state.
#[inline]
fn mix_block(mut h: u32, k: u32) -> u32 {
    let mut k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k = k.wrapping_mul(C2);

    h ^= k;
    h = h.rotate_left(13);
    h.wrapping_mul(5).wrapping_add(0xe6546b64)
}

/// Final avalanche of MurmurHash3.
#[inline]
pub fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}

/// MurmurHash3 x86_32 over a slice of words.
#[inline]
pub fn murmur3_32(words: &[u32], seed: u32) -> u32 {
    let mut h = seed;
    for &k in words {
        h = mix_block(h, k);
    }
    h ^= (words.len() * 4) as u32;
    fmix32(h)
}

/// Hash a single value.
#[inline]
pub fn hash_u32(a: u32) -> u32 {
    murmur3_32(&[a], 0)
}

/// Hash two values (order matters).
#[inline]
pub fn hash_u32x2(a: u32, b: u32) -> u32 {
    murmur3_32(&[a, b], 0)
}

/// Hash three values (order matters).
#[inline]
pub fn hash_u32x3(a: u32, b: u32, c: u32) -> u32 {
    murmur3_32(&[a, b, c], 0)
}

/// Map a hash to a float in `[0, 1)`.
///
/// Uses the top 24 bits so every result is exactly representable.
#[inline]
pub fn to_unit_float(h: u32) -> f32 {
    (h >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}
