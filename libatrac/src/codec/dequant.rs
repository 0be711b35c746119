//! Rebuilds the 512-line spectrum from an unpacked sound unit.

use crate::codec::bitstream::UnpackedFrame;
use crate::core::tables::{
    bfu_to_band, BFU_START_LONG, BFU_START_SHORT, SCALE_TABLE, SPECS_PER_BFU,
};

/// Dequantize every transmitted BFU into its spectral position; BFUs
/// with word length 0 (and everything beyond the BFU count) stay zero.
pub fn dequantize(frame: &UnpackedFrame) -> [f64; 512] {
    let mut specs = [0.0; 512];
    for bfu in 0..frame.bfu_count {
        let wl = frame.word_lengths[bfu];
        if wl < 2 {
            continue;
        }
        let scale = SCALE_TABLE[frame.scale_indices[bfu] as usize];
        let max_quant = ((1i32 << (wl - 1)) - 1) as f64;

        let start = if frame.mode.is_short(bfu_to_band(bfu)) {
            BFU_START_SHORT[bfu]
        } else {
            BFU_START_LONG[bfu]
        };
        for (j, &mantissa) in frame.mantissas[bfu]
            .iter()
            .enumerate()
            .take(SPECS_PER_BFU[bfu])
        {
            specs[start + j] = mantissa as f64 / max_quant * scale;
        }
    }
    specs
}
