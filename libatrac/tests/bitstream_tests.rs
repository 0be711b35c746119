#[cfg(test)]
mod bitstream_tests {
    use libatrac_audio::{
        dequantize, pack_frame, scale_frame, unpack_frame, AtracError, BitAllocator,
        BlockSizeMode, BFU_AMOUNT_TAB, FRAME_BYTES, SCALE_TABLE,
    };

    fn lcg(seed: &mut u64) -> f64 {
        *seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((*seed >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 2.0
    }

    fn random_specs(seed: u64) -> [f64; 512] {
        let mut s = seed;
        let mut specs = [0.0; 512];
        for v in specs.iter_mut() {
            *v = lcg(&mut s) * 30000.0;
        }
        specs
    }

    #[test]
    fn bsm_roundtrip_all_modes() {
        for mask in 0u32..8 {
            let mode = BlockSizeMode::from_mask(mask);
            let specs = random_specs(0x1000 + mask as u64);
            let scaled = scale_frame(&specs, &mode);
            let (bfu_idx, lengths) = BitAllocator::new(0, false).allocate(&scaled, &mode);

            let frame = pack_frame(mode, bfu_idx, &lengths, &scaled).unwrap();
            let unpacked = unpack_frame(&frame).unwrap();

            assert_eq!(unpacked.mode, mode, "mask {mask}");
            assert_eq!(unpacked.bfu_count, BFU_AMOUNT_TAB[bfu_idx]);
        }
    }

    #[test]
    fn word_lengths_and_scale_indices_survive() {
        let mode = BlockSizeMode::default();
        let specs = random_specs(0xbeef);
        let scaled = scale_frame(&specs, &mode);
        let (bfu_idx, lengths) = BitAllocator::new(8, false).allocate(&scaled, &mode);

        let frame = pack_frame(mode, bfu_idx, &lengths, &scaled).unwrap();
        let unpacked = unpack_frame(&frame).unwrap();

        for (i, &wl) in lengths.iter().enumerate() {
            assert_eq!(unpacked.word_lengths[i], wl, "word length {i}");
            assert_eq!(
                unpacked.scale_indices[i],
                scaled[i].scale_factor_index,
                "scale index {i}"
            );
        }
    }

    #[test]
    fn mantissas_dequantize_within_quantizer_step() {
        let mode = BlockSizeMode::default();
        let specs = random_specs(0x7777);
        let scaled = scale_frame(&specs, &mode);
        let (bfu_idx, lengths) = BitAllocator::new(8, false).allocate(&scaled, &mode);

        let frame = pack_frame(mode, bfu_idx, &lengths, &scaled).unwrap();
        let unpacked = unpack_frame(&frame).unwrap();
        let rebuilt = dequantize(&unpacked);

        // every transmitted coefficient must come back within one
        // quantizer step of the original
        let mut checked = 0;
        for (bfu, &wl) in lengths.iter().enumerate() {
            if wl < 2 {
                continue;
            }
            let sf = SCALE_TABLE[scaled[bfu].scale_factor_index as usize];
            let step = sf / ((1i32 << (wl - 1)) - 1) as f64;
            // long mode BFU layout is contiguous per the start table
            let start = libatrac_audio::core::tables::BFU_START_LONG[bfu];
            for (j, &orig) in scaled[bfu].values.iter().enumerate() {
                let expected = orig * sf;
                assert!(
                    (rebuilt[start + j] - expected).abs() <= step,
                    "bfu {bfu} line {j}"
                );
                checked += 1;
            }
        }
        assert!(checked > 100, "too few transmitted coefficients to judge");
    }

    #[test]
    fn oversized_declaration_is_rejected() {
        // hand-build a frame whose word lengths alone overflow the
        // 1696-bit budget: all long, 52 BFUs, every word length 16
        let mut frame = vec![0u8; FRAME_BYTES];
        frame[0] = 0b10_10_11_00; // BSM wire codes: low 2, mid 2, hi 3
        frame[1] = 0b111_00_000; // BFU amount index 7 -> 52 BFUs
        // word length fields start 16 bits in; 52 nibbles of 0xf
        for i in 0..26 {
            frame[2 + i] = 0xff;
        }
        let err = unpack_frame(&frame).unwrap_err();
        assert!(matches!(err, AtracError::MalformedFrame(_)), "got {err:?}");
    }

    #[test]
    fn invalid_block_size_mode_is_rejected() {
        let mut frame = vec![0u8; FRAME_BYTES];
        frame[0] = 0b01_10_11_00; // low band BSM code 1 is invalid
        assert!(unpack_frame(&frame).is_err());
    }

    #[test]
    fn wrong_frame_length_is_rejected() {
        assert!(unpack_frame(&[0u8; 100]).is_err());
        assert!(unpack_frame(&[0u8; FRAME_BYTES + 1]).is_err());
    }

    #[test]
    fn empty_frame_unpacks_as_silence() {
        // all-zero payload with a valid header: long windows everywhere
        let mut frame = vec![0u8; FRAME_BYTES];
        frame[0] = 0b10_10_11_00;
        let unpacked = unpack_frame(&frame).unwrap();
        assert_eq!(unpacked.bfu_count, BFU_AMOUNT_TAB[0]);
        assert!(unpacked.word_lengths.iter().all(|&wl| wl == 0));
        let specs = dequantize(&unpacked);
        assert!(specs.iter().all(|&v| v == 0.0));
    }
}
