//! Serialization of one 212-byte sound unit.
//!
//! Wire layout, MSB first: three 2-bit block size modes plus 2 reserved
//! bits, then the 3-bit BFU amount index plus the two auxiliary amount
//! fields (2 + 3 bits, always zero here), then one 4-bit word length
//! code and one 6-bit scale factor index per transmitted BFU, then the
//! mantissas at their declared word lengths, then zero padding.
//!
//! The low/mid window fields store `2 - log_count`, the hi field stores
//! `3 - log_count`, and the word length code stores `wl - 1` (0 for a
//! BFU with no mantissas).

use crate::codec::bitalloc::bits_used;
use crate::codec::scale::ScaledBlock;
use crate::core::bitio::{BitReader, BitWriter};
use crate::core::tables::{BFU_AMOUNT_TAB, SPECS_PER_BFU};
use crate::core::types::{BlockSizeMode, FRAME_BITS, FRAME_BYTES, MAX_BFUS};
use crate::error::{AtracError, AtracResult};

/// Fully parsed contents of one sound unit.
#[derive(Debug, Clone)]
pub struct UnpackedFrame {
    pub mode: BlockSizeMode,
    pub bfu_count: usize,
    pub word_lengths: [u8; MAX_BFUS],
    pub scale_indices: [u8; MAX_BFUS],
    /// Sign-extended mantissas, one vector per transmitted BFU
    pub mantissas: Vec<Vec<i32>>,
}

/// Quantize and serialize one frame. `word_lengths` holds the
/// allocation for the first `BFU_AMOUNT_TAB[bfu_idx]` BFUs.
pub fn pack_frame(
    mode: BlockSizeMode,
    bfu_idx: usize,
    word_lengths: &[u8],
    scaled: &[ScaledBlock],
) -> AtracResult<[u8; FRAME_BYTES]> {
    let bfu_count = BFU_AMOUNT_TAB[bfu_idx];
    debug_assert_eq!(word_lengths.len(), bfu_count);
    debug_assert_eq!(scaled.len(), MAX_BFUS);

    let used = bits_used(word_lengths);
    if used > FRAME_BITS {
        // the allocator guarantees this never happens
        return Err(AtracError::BitBudgetExceeded {
            used,
            budget: FRAME_BITS,
        });
    }

    let mut writer = BitWriter::new();
    writer.write_bits(2 - mode.log_count[0] as u32, 2);
    writer.write_bits(2 - mode.log_count[1] as u32, 2);
    writer.write_bits(3 - mode.log_count[2] as u32, 2);
    writer.write_bits(0, 2);
    writer.write_bits(bfu_idx as u32, 3);
    writer.write_bits(0, 2);
    writer.write_bits(0, 3);

    for &wl in word_lengths {
        writer.write_bits(wl.saturating_sub(1) as u32, 4);
    }
    for block in scaled.iter().take(bfu_count) {
        writer.write_bits(block.scale_factor_index as u32, 6);
    }
    for (i, &wl) in word_lengths.iter().enumerate() {
        if wl < 2 {
            continue;
        }
        let max_quant = (1i32 << (wl - 1)) - 1;
        let mask = (1u32 << wl) - 1;
        for &v in &scaled[i].values {
            let mantissa = (v * max_quant as f64).round().clamp(
                -max_quant as f64,
                max_quant as f64,
            ) as i32;
            writer.write_bits(mantissa as u32 & mask, wl);
        }
    }

    let bytes = writer.into_bytes_padded(FRAME_BYTES);
    Ok(bytes.try_into().expect("frame is exactly 212 bytes"))
}

/// Parse and validate one sound unit.
pub fn unpack_frame(data: &[u8]) -> AtracResult<UnpackedFrame> {
    if data.len() != FRAME_BYTES {
        return Err(AtracError::MalformedFrame(format!(
            "expected {FRAME_BYTES} bytes, got {}",
            data.len()
        )));
    }

    let mut reader = BitReader::new(data);

    let mut log_count = [0u8; 3];
    for (band, log) in log_count.iter_mut().enumerate() {
        let wire = reader.read_bits(2) as u8;
        *log = match (band, wire) {
            (0 | 1, 0 | 2) => 2 - wire,
            (2, 0 | 3) => 3 - wire,
            _ => {
                return Err(AtracError::MalformedFrame(format!(
                    "invalid block size mode {wire} for band {band}"
                )))
            }
        };
    }
    let mode = BlockSizeMode { log_count };
    reader.read_bits(2); // reserved

    let bfu_idx = reader.read_bits(3) as usize;
    let bfu_count = BFU_AMOUNT_TAB[bfu_idx];
    reader.read_bits(2);
    reader.read_bits(3);

    let mut word_lengths = [0u8; MAX_BFUS];
    for wl in word_lengths.iter_mut().take(bfu_count) {
        let code = reader.read_bits(4) as u8;
        *wl = if code == 0 { 0 } else { code + 1 };
    }
    let mut scale_indices = [0u8; MAX_BFUS];
    for sf in scale_indices.iter_mut().take(bfu_count) {
        *sf = reader.read_bits(6) as u8;
    }

    // reject frames whose declared mantissas overflow the budget before
    // touching the payload
    let used = bits_used(&word_lengths[..bfu_count]);
    if used > FRAME_BITS {
        return Err(AtracError::MalformedFrame(format!(
            "declared {used} bits exceed the {FRAME_BITS} bit frame"
        )));
    }

    let mut mantissas = Vec::with_capacity(bfu_count);
    for (i, &wl) in word_lengths.iter().enumerate().take(bfu_count) {
        let mut values = Vec::new();
        if wl >= 2 {
            values.reserve(SPECS_PER_BFU[i]);
            for _ in 0..SPECS_PER_BFU[i] {
                values.push(reader.read_signed(wl));
            }
        }
        mantissas.push(values);
    }

    Ok(UnpackedFrame {
        mode,
        bfu_count,
        word_lengths,
        scale_indices,
        mantissas,
    })
}
