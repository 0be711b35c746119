//! Distributes the fixed frame bit budget across the BFUs.
//!
//! Each BFU's word length comes from an importance score mixing its
//! scale factor index (signal level) with a per-position masking offset
//! table, weighted by how spread out the scale factors are. A global
//! shift is bisected until the mantissas fit the budget left after the
//! fixed fields.

use crate::codec::scale::ScaledBlock;
use crate::core::tables::{bfu_to_band, BFU_AMOUNT_TAB, SPECS_PER_BFU};
use crate::core::types::{BlockSizeMode, FRAME_BITS, MAX_BFUS};

/// Fixed bits of the frame header (BSM fields + BFU amount fields)
pub const FRAME_OVERHEAD_BITS: usize = 16;
/// Word length field + scale factor field per transmitted BFU
pub const PER_BFU_OVERHEAD_BITS: usize = 10;

/// Masking offsets per BFU position, long window mode. Lower bands get
/// a head start, the top of the hi band none at all.
const FIXED_BIT_ALLOC_LONG: [u32; MAX_BFUS] = [
    7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 7, 6, 6, 6, 6, 6, 6, 6, 6, // low
    6, 6, 6, 6, 5, 5, 5, 5, 5, 5, 5, 5, 4, 4, 4, 4, // mid
    4, 4, 4, 4, 3, 3, 3, 3, 2, 2, 2, 2, 1, 1, 0, 0, // hi
];

/// Masking offsets per BFU position, short window mode. Transients keep
/// more of the upper bands.
const FIXED_BIT_ALLOC_SHORT: [u32; MAX_BFUS] = [
    8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 8, 7, 7, 7, 7, 7, 7, 7, 7, // low
    7, 7, 7, 7, 6, 6, 6, 6, 6, 6, 6, 6, 5, 5, 5, 5, // mid
    5, 5, 5, 5, 4, 4, 4, 4, 3, 3, 3, 3, 2, 2, 2, 2, // hi
];

const SHIFT_LO: f64 = -8.0;
const SHIFT_HI: f64 = 24.0;

/// Word-length allocator over one frame's scaled BFUs.
pub struct BitAllocator {
    bfu_idx_const: u32,
    fast_search: bool,
}

impl BitAllocator {
    /// `bfu_idx_const` 0 selects the adaptive BFU count, 1..=8 pins it
    /// to the matching `BFU_AMOUNT_TAB` entry.
    pub fn new(bfu_idx_const: u32, fast_search: bool) -> Self {
        Self {
            bfu_idx_const,
            fast_search,
        }
    }

    /// Pick the BFU amount index and per-BFU word lengths for one frame.
    /// The returned vector has `BFU_AMOUNT_TAB[idx]` entries and always
    /// fits the frame budget.
    pub fn allocate(&self, scaled: &[ScaledBlock], mode: &BlockSizeMode) -> (usize, Vec<u8>) {
        debug_assert_eq!(scaled.len(), MAX_BFUS);
        let spread = scale_factor_spread(scaled);

        if self.bfu_idx_const > 0 {
            let idx = (self.bfu_idx_const - 1) as usize;
            return (idx, fit(scaled, mode, BFU_AMOUNT_TAB[idx], spread));
        }

        if self.fast_search {
            // one full-width pass, then a binary search of the amount
            // table for the smallest count covering every coded BFU
            let full = fit(scaled, mode, MAX_BFUS, spread);
            let used = highest_used(&full);
            let idx = BFU_AMOUNT_TAB.partition_point(|&k| k < used);
            let idx = idx.min(BFU_AMOUNT_TAB.len() - 1);
            return (idx, fit(scaled, mode, BFU_AMOUNT_TAB[idx], spread));
        }

        // adaptive: walk down from the widest count while the extra
        // BFUs stay silent, refitting at each step
        let mut idx = BFU_AMOUNT_TAB.len() - 1;
        let mut lengths = fit(scaled, mode, BFU_AMOUNT_TAB[idx], spread);
        while idx > 0 && highest_used(&lengths) <= BFU_AMOUNT_TAB[idx - 1] {
            idx -= 1;
            lengths = fit(scaled, mode, BFU_AMOUNT_TAB[idx], spread);
        }
        (idx, lengths)
    }
}

/// Total frame bits implied by an allocation.
pub fn bits_used(lengths: &[u8]) -> usize {
    let mantissa: usize = lengths
        .iter()
        .enumerate()
        .map(|(i, &wl)| SPECS_PER_BFU[i] * wl as usize)
        .sum();
    FRAME_OVERHEAD_BITS + PER_BFU_OVERHEAD_BITS * lengths.len() + mantissa
}

/// Number of BFUs up to and including the last one with a word length.
fn highest_used(lengths: &[u8]) -> usize {
    lengths
        .iter()
        .rposition(|&wl| wl > 0)
        .map(|p| p + 1)
        .unwrap_or(0)
}

/// Normalized standard deviation of the scale factor indices, the
/// tonal/noise balance knob of the importance formula.
fn scale_factor_spread(scaled: &[ScaledBlock]) -> f64 {
    let n = scaled.len() as f64;
    let mean = scaled
        .iter()
        .map(|b| b.scale_factor_index as f64)
        .sum::<f64>()
        / n;
    let sigma = (scaled
        .iter()
        .map(|b| {
            let d = b.scale_factor_index as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n)
        .sqrt();
    (sigma.min(14.0)) / 14.0
}

/// Word lengths for a given BFU count at a given shift.
fn calc_allocation(
    scaled: &[ScaledBlock],
    mode: &BlockSizeMode,
    bfu_num: usize,
    spread: f64,
    shift: f64,
) -> Vec<u8> {
    (0..bfu_num)
        .map(|i| {
            let fixed = if mode.is_short(bfu_to_band(i)) {
                FIXED_BIT_ALLOC_SHORT[i]
            } else {
                FIXED_BIT_ALLOC_LONG[i]
            };
            let importance = spread * (scaled[i].scale_factor_index as f64 / 3.2)
                + (1.0 - spread) * fixed as f64
                - shift;
            if importance > 16.0 {
                16
            } else if importance < 2.0 {
                0
            } else {
                importance as u8
            }
        })
        .collect()
}

/// Bisect the shift until the allocation fits the frame budget.
fn fit(scaled: &[ScaledBlock], mode: &BlockSizeMode, bfu_num: usize, spread: f64) -> Vec<u8> {
    let mut lo = SHIFT_LO;
    let mut hi = SHIFT_HI;
    // every word length is zero at SHIFT_HI, which always fits
    while hi - lo > 0.01 {
        let mid = (lo + hi) / 2.0;
        let lengths = calc_allocation(scaled, mode, bfu_num, spread, mid);
        if bits_used(&lengths) <= FRAME_BITS {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    let lengths = calc_allocation(scaled, mode, bfu_num, spread, hi);
    debug_assert!(bits_used(&lengths) <= FRAME_BITS);
    lengths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::scale::scale_frame;

    fn scaled_from(mut fill: impl FnMut(usize) -> f64, mode: &BlockSizeMode) -> Vec<ScaledBlock> {
        let mut specs = [0.0; 512];
        for (i, s) in specs.iter_mut().enumerate() {
            *s = fill(i);
        }
        scale_frame(&specs, mode)
    }

    #[test]
    fn allocation_respects_budget() {
        let mode = BlockSizeMode::default();
        // crude white-ish noise
        let mut seed = 0x12345678u32;
        let scaled = scaled_from(
            |_| {
                seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
                (seed >> 16) as f64 - 32768.0
            },
            &mode,
        );
        for idx_const in 0..=8 {
            let alloc = BitAllocator::new(idx_const, false);
            let (idx, lengths) = alloc.allocate(&scaled, &mode);
            assert_eq!(lengths.len(), BFU_AMOUNT_TAB[idx]);
            assert!(bits_used(&lengths) <= FRAME_BITS);
            assert!(lengths.iter().all(|&wl| wl == 0 || (2..=16).contains(&wl)));
        }
    }

    #[test]
    fn fixed_count_is_honored() {
        let mode = BlockSizeMode::default();
        let scaled = scaled_from(|i| (i as f64 * 0.13).sin() * 20000.0, &mode);
        let alloc = BitAllocator::new(3, false);
        let (idx, lengths) = alloc.allocate(&scaled, &mode);
        assert_eq!(idx, 2);
        assert_eq!(lengths.len(), BFU_AMOUNT_TAB[2]);
    }

    #[test]
    fn adaptive_shrinks_for_narrowband_content() {
        let mode = BlockSizeMode::default();
        // energy only in the low band
        let scaled = scaled_from(
            |i| if i < 64 { 20000.0 } else { 0.0 },
            &mode,
        );
        let (idx, _) = BitAllocator::new(0, false).allocate(&scaled, &mode);
        assert!(idx < BFU_AMOUNT_TAB.len() - 1);
    }

    #[test]
    fn fast_search_matches_budget_too() {
        let mode = BlockSizeMode::new(true, true, true);
        let scaled = scaled_from(|i| ((i * 37) % 512) as f64 * 50.0, &mode);
        let (idx, lengths) = BitAllocator::new(0, true).allocate(&scaled, &mode);
        assert_eq!(lengths.len(), BFU_AMOUNT_TAB[idx]);
        assert!(bits_used(&lengths) <= FRAME_BITS);
    }
}
