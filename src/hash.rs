//! MurmurHash3 (x86, 32-bit), reproduced bit-for-bit from the reference
//! implementation this crate's fingerprinting contract is pinned to.
//!
//! The algorithm is a black box from the rest of the crate's point of view:
//! deterministic, pure, and independent of any process state besides its
//! two arguments.

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;
const BLOCK_ROTATION: u32 = 15;
const HASH_ROTATION: u32 = 13;
const HASH_MULTIPLIER: u32 = 5;
const HASH_ADDITION: u32 = 0xe654_6b64;
const FINAL_SHIFT_1: u32 = 16;
const FINAL_SHIFT_2: u32 = 13;
const FINAL_MUL_1: u32 = 0x85eb_ca6b;
const FINAL_MUL_2: u32 = 0xc2b2_ae35;

#[inline]
fn mix_block(mut block: u32) -> u32 {
    block = block.wrapping_mul(C1);
    block = block.rotate_left(BLOCK_ROTATION);
    block.wrapping_mul(C2)
}

/// Computes the 32-bit MurmurHash3 fingerprint of `data` under `seed`.
///
/// This is a pure function: the same `(data, seed)` pair always yields the
/// same fingerprint, and calling it never mutates any process-wide state.
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let mut hash = seed;
    let chunks = data.chunks_exact(4);
    let tail = chunks.remainder();

    for chunk in chunks {
        let block = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        hash ^= mix_block(block);
        hash = hash.rotate_left(HASH_ROTATION);
        hash = hash.wrapping_mul(HASH_MULTIPLIER).wrapping_add(HASH_ADDITION);
    }

    let mut tail_block: u32 = 0;
    match tail.len() {
        3 => {
            tail_block ^= (tail[2] as u32) << 16;
            tail_block ^= (tail[1] as u32) << 8;
            tail_block ^= tail[0] as u32;
        }
        2 => {
            tail_block ^= (tail[1] as u32) << 8;
            tail_block ^= tail[0] as u32;
        }
        1 => {
            tail_block ^= tail[0] as u32;
        }
        _ => {}
    }
    if !tail.is_empty() {
        hash ^= mix_block(tail_block);
    }

    hash ^= hash >> FINAL_SHIFT_1;
    hash = hash.wrapping_mul(FINAL_MUL_1);
    hash ^= hash >> FINAL_SHIFT_2;
    hash = hash.wrapping_mul(FINAL_MUL_2);
    hash ^= hash >> FINAL_SHIFT_1;
    hash
}
