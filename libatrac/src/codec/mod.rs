//! The ATRAC1 signal path: QMF band split, windowed MDCT with
//! transient-driven window switching, block-floating quantization, bit
//! allocation and sound unit packing, plus the inverse pipeline.

pub mod bitalloc;
pub mod bitstream;
pub mod decoder;
pub mod dequant;
pub mod encoder;
pub mod mdct;
pub mod qmf;
pub mod scale;
pub mod transient;

// Re-export main types
pub use bitalloc::BitAllocator;
pub use bitstream::{pack_frame, unpack_frame, UnpackedFrame};
pub use decoder::Atrac1Decoder;
pub use dequant::dequantize;
pub use encoder::Atrac1Encoder;
pub use mdct::{Atrac1Mdct, Mdct, SINE_WINDOW};
pub use qmf::{SplitFilterBank, SynthesisFilterBank};
pub use scale::{scale_block, scale_frame, ScaledBlock};
pub use transient::{invert_spectrum, TransientDetector};

use crate::error::{AtracError, AtracResult};

/// How the per-band window length is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Run the transient detector per band
    Auto,
    /// Skip detection and honor the window mask
    NoTransient,
}

/// Encoder options validated at processor construction.
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    /// 0 = adaptive BFU count, 1..=8 pins `BFU_AMOUNT_TAB[n - 1]`
    pub bfu_idx_const: u32,
    /// Binary-search BFU count selection instead of the linear scan
    pub fast_bfu_search: bool,
    pub window_mode: WindowMode,
    /// Forced short windows when `window_mode` is `NoTransient`
    /// (bit 0 = low, bit 1 = mid, bit 2 = hi)
    pub window_mask: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            bfu_idx_const: 0,
            fast_bfu_search: false,
            window_mode: WindowMode::Auto,
            window_mask: 0,
        }
    }
}

impl EncoderSettings {
    pub fn validate(&self) -> AtracResult<()> {
        if self.bfu_idx_const > 8 {
            return Err(AtracError::InvalidSettings(format!(
                "bfu_idx_const must be 0..=8, got {}",
                self.bfu_idx_const
            )));
        }
        if self.window_mask > 7 {
            return Err(AtracError::InvalidSettings(format!(
                "window_mask uses bits 0..=2, got {:#x}",
                self.window_mask
            )));
        }
        Ok(())
    }
}
