//! Block-floating scaler: per BFU, pick the smallest scale factor table
//! entry covering the peak magnitude and emit normalized coefficients.

use log::warn;

use crate::core::tables::{
    BFU_START_LONG, BFU_START_SHORT, BLOCKS_PER_BAND, MAX_SCALE, SCALE_TABLE, SPECS_PER_BFU,
};
use crate::core::types::{BlockSizeMode, NUM_BANDS};

/// One scaled BFU: the table index and the values normalized to [-1, 1].
#[derive(Debug, Clone)]
pub struct ScaledBlock {
    pub scale_factor_index: u8,
    pub values: Vec<f64>,
}

/// Scale a single BFU. Stateless.
pub fn scale_block(input: &[f64]) -> ScaledBlock {
    let mut max_abs: f64 = 0.0;
    for &v in input {
        let a = v.abs();
        if a > max_abs {
            if a > MAX_SCALE {
                warn!("scale saturation: spectral magnitude {a} exceeds {MAX_SCALE}");
                max_abs = MAX_SCALE;
            } else {
                max_abs = a;
            }
        }
    }

    let scale_factor_index = SCALE_TABLE
        .iter()
        .position(|&s| s >= max_abs)
        .unwrap_or(SCALE_TABLE.len() - 1) as u8;
    let scale_factor = SCALE_TABLE[scale_factor_index as usize];

    let values = input
        .iter()
        .map(|&v| {
            let scaled = v / scale_factor;
            if scaled.abs() > 1.0 {
                warn!("scaled value {scaled} out of range, clamping");
                scaled.clamp(-1.0, 1.0)
            } else {
                scaled
            }
        })
        .collect();

    ScaledBlock {
        scale_factor_index,
        values,
    }
}

/// Scale all 52 BFUs of a spectral frame in BFU order.
pub fn scale_frame(specs: &[f64], mode: &BlockSizeMode) -> Vec<ScaledBlock> {
    debug_assert_eq!(specs.len(), 512);
    let mut blocks = Vec::with_capacity(SPECS_PER_BFU.len());
    for band in 0..NUM_BANDS {
        let short = mode.is_short(band);
        for bfu in BLOCKS_PER_BAND[band]..BLOCKS_PER_BAND[band + 1] {
            let start = if short {
                BFU_START_SHORT[bfu]
            } else {
                BFU_START_LONG[bfu]
            };
            blocks.push(scale_block(&specs[start..start + SPECS_PER_BFU[bfu]]));
        }
    }
    blocks
}
