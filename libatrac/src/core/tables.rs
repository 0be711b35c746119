//! Shared quantization and BFU layout tables.
//!
//! These are the published ATRAC1 constants. They are process-wide
//! immutable: built once on first use and shared without locking.

use std::sync::LazyLock;

use super::types::MAX_BFUS;

/// Hard ceiling for spectral magnitudes fed to the scaler
pub const MAX_SCALE: f64 = 65536.0;

/// The 64-entry logarithmic scale factor table, `2^((i - 15) / 3)`.
///
/// Entry 0 is 2^-5, entry 63 is 65536, matching the +/-32768 PCM
/// convention used throughout the codec.
pub static SCALE_TABLE: LazyLock<[f64; 64]> = LazyLock::new(|| {
    let mut table = [0.0; 64];
    for (i, entry) in table.iter_mut().enumerate() {
        *entry = 2.0f64.powf((i as f64 - 15.0) / 3.0);
    }
    table
});

/// Usable BFU counts, indexed by the 3-bit field in the frame header
pub const BFU_AMOUNT_TAB: [usize; 8] = [20, 28, 32, 36, 40, 44, 48, 52];

/// BFU index ranges per band: [0, 20) low, [20, 36) mid, [36, 52) hi
pub const BLOCKS_PER_BAND: [usize; 4] = [0, 20, 36, 52];

/// Spectral lines in each BFU
pub const SPECS_PER_BFU: [usize; MAX_BFUS] = [
    8, 8, 8, 8, 4, 4, 4, 4, 8, 8, 8, 8, 6, 6, 6, 6, 6, 6, 6, 6, // low band
    6, 6, 6, 6, 7, 7, 7, 7, 9, 9, 9, 9, 10, 10, 10, 10, // mid band
    12, 12, 12, 12, 12, 12, 12, 12, 20, 20, 20, 20, 20, 20, 20, 20, // hi band
];

/// Start position of each BFU in the spectrum, long window mode
pub const BFU_START_LONG: [usize; MAX_BFUS] = [
    0, 8, 16, 24, 32, 36, 40, 44, 48, 56, 64, 72, 80, 86, 92, 98, 104, 110, 116, 122, // low
    128, 134, 140, 146, 152, 159, 166, 173, 180, 189, 198, 207, 216, 226, 236, 246, // mid
    256, 268, 280, 292, 304, 316, 328, 340, 352, 372, 392, 412, 432, 452, 472, 492, // hi
];

/// Start position of each BFU in the spectrum, short window mode.
///
/// Short mode interleaves the BFUs across the 32-sample MDCT blocks of
/// the band, so consecutive BFU indices stride across blocks.
pub const BFU_START_SHORT: [usize; MAX_BFUS] = [
    0, 32, 64, 96, 8, 40, 72, 104, 12, 44, 76, 108, 20, 52, 84, 116, 26, 58, 90, 122, // low
    128, 160, 192, 224, 134, 166, 198, 230, 141, 173, 205, 237, 150, 182, 214, 246, // mid
    256, 288, 320, 352, 384, 416, 448, 480, 268, 300, 332, 364, 396, 428, 460, 492, // hi
];

/// Band that owns the given BFU index
pub fn bfu_to_band(bfu: usize) -> usize {
    if bfu < BLOCKS_PER_BAND[1] {
        0
    } else if bfu < BLOCKS_PER_BAND[2] {
        1
    } else {
        2
    }
}
