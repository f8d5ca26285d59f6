//! Shard and segment selection.
//!
//! Sequential customer ids are the common case, so ids are run through the
//! 32-bit murmur3 finalizer before reduction. The mix is deterministic across
//! runs; two distinct ids can still land on the same slot, which only costs
//! contention.

/// Avalanche the bits of `key`.
#[inline]
pub(crate) const fn spread(key: u32) -> u32 {
    let mut h = key;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// Maps `key` onto `0..slots`. `slots` must be non-zero.
#[inline]
pub(crate) const fn slot_index(key: u32, slots: usize) -> usize {
    spread(key) as usize % slots
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_is_deterministic() {
        assert_eq!(spread(1234), spread(1234));
        assert_ne!(spread(1), spread(2));
    }

    #[test]
    fn sequential_ids_fill_every_slot() {
        const SLOTS: usize = 16;
        let mut counts = [0_usize; SLOTS];
        for id in 0..16_000 {
            counts[slot_index(id, SLOTS)] += 1;
        }
        for count in counts {
            assert!((800..1200).contains(&count), "skewed slot: {count}");
        }
    }

    #[test]
    fn single_slot_always_maps_to_zero() {
        assert_eq!(slot_index(u32::MAX, 1), 0);
    }
}
