//! Key hashing and the byte-aligned hash-bit partition.
//!
//! Keys are hashed with a process-lifetime random key, initialized once via
//! `std::sync::Once` and fed into a keyed SipHash. Only a 64-bit digest is
//! needed per key (one selector path per lookup, not a content address), so
//! `siphasher::sip::SipHasher13` is used directly as a `std::hash::Hasher`.

use std::hash::{Hash, Hasher};
use std::sync::Once;

use rand::RngCore;
use siphasher::sip::SipHasher13;

static mut SIP_KEY: [u8; 16] = [0; 16];
static INIT: Once = Once::new();

fn init_sip_key() {
    INIT.call_once(|| {
        let mut rng = rand::thread_rng();
        unsafe {
            rng.fill_bytes(&mut SIP_KEY[..]);
        }
    });
}

/// Hashes `key` to a 64-bit digest using the process-lifetime siphash key.
pub(crate) fn hash_key<K: Hash + ?Sized>(key: &K) -> u64 {
    init_sip_key();
    // SAFETY: SIP_KEY is written exactly once, by `init_sip_key`'s
    // `Once::call_once`, before any read here; all reads happen-after that
    // write via the `Once` synchronization.
    let sip_key = unsafe { SIP_KEY };
    let mut hasher = SipHasher13::new_with_key(&sip_key);
    key.hash(&mut hasher);
    hasher.finish()
}

/// Number of bits dedicated to the leaf selector: bits `[0, 16)`.
pub(crate) const LEAF_SELECTOR_BITS: u32 = 16;

/// The leaf-local selector for `h`: the low 16 bits, used directly as the
/// "hash" fed into the leaf's xor-probe sequence. Leaves never see
/// any other bits of `h`, so this value is stable across all tree reshapes.
#[inline]
pub(crate) fn leaf_selector(h: u64) -> u16 {
    (h & 0xFFFF) as u16
}

/// Extracts the `bits`-wide selector for interior level `i` (1-based,
/// root-first) out of a tree with `d` interior levels total: bits
/// `[16 + 8*(d-i), 16 + 8*(d-i) + bits)`. Each interior level gets a
/// full byte of address space to itself (even if `bits < 8`, the unused
/// high bits of that byte are simply never read by any level), so growing
/// one level's fanout never renumbers any other level's selector.
#[inline]
pub(crate) fn level_selector(h: u64, d: usize, i: usize, bits: u32) -> usize {
    debug_assert!(i >= 1 && i <= d);
    debug_assert!(bits <= 8);
    let shift = LEAF_SELECTOR_BITS + 8 * ((d - i) as u32);
    let mask = if bits == 0 { 0 } else { (1u64 << bits) - 1 };
    ((h >> shift) & mask) as usize
}

/// Extracts the selector for the interior level that is `depth_index` steps
/// below the root (0-based), in a tree with `d` interior levels total. This
/// is the form the descent code actually wants: it walks root-first and
/// knows how many levels it has already descended through, not the 1-based
/// level index directly.
#[inline]
pub(crate) fn level_selector_at_depth(h: u64, d: usize, depth_index: usize, bits: u32) -> usize {
    level_selector(h, d, depth_index + 1, bits)
}
