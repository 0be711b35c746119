//! Per-frame encode orchestration: band split, window decision, MDCT,
//! scaling, bit allocation and packing, per channel.

use log::debug;

use crate::codec::bitalloc::BitAllocator;
use crate::codec::bitstream::pack_frame;
use crate::codec::mdct::Atrac1Mdct;
use crate::codec::qmf::SplitFilterBank;
use crate::codec::scale::scale_frame;
use crate::codec::transient::{invert_spectrum, TransientDetector};
use crate::codec::{EncoderSettings, WindowMode};
use crate::core::types::{BlockSizeMode, FRAME_BYTES, NUM_SAMPLES};
use crate::error::{AtracError, AtracResult};

/// Persistent per-channel encoder state: QMF histories, band delay
/// lines (the upper halves carry the MDCT overlap) and the transient
/// detectors.
struct ChannelState {
    split: SplitFilterBank,
    pcm_buf_low: [f64; 256],
    pcm_buf_mid: [f64; 256],
    pcm_buf_hi: [f64; 512],
    detectors: [TransientDetector; 3],
}

impl ChannelState {
    fn new() -> Self {
        Self {
            split: SplitFilterBank::new(),
            pcm_buf_low: [0.0; 256],
            pcm_buf_mid: [0.0; 256],
            pcm_buf_hi: [0.0; 512],
            detectors: [
                TransientDetector::new(32, 128),
                TransientDetector::new(32, 128),
                TransientDetector::new(32, 256),
            ],
        }
    }
}

/// ATRAC1 encoder for one stream of up to two channels.
pub struct Atrac1Encoder {
    settings: EncoderSettings,
    channels: usize,
    mdct: Atrac1Mdct,
    allocator: BitAllocator,
    state: Vec<ChannelState>,
    frame_index: u64,
}

impl Atrac1Encoder {
    pub fn new(channels: u8, settings: EncoderSettings) -> AtracResult<Self> {
        settings.validate()?;
        if channels == 0 || channels > 2 {
            return Err(AtracError::InvalidSettings(format!(
                "channel count must be 1 or 2, got {channels}"
            )));
        }
        let allocator = BitAllocator::new(settings.bfu_idx_const, settings.fast_bfu_search);
        Ok(Self {
            settings,
            channels: channels as usize,
            mdct: Atrac1Mdct::new(),
            allocator,
            state: (0..channels).map(|_| ChannelState::new()).collect(),
            frame_index: 0,
        })
    }

    pub fn channels(&self) -> u8 {
        self.channels as u8
    }

    /// Encode one interleaved 512-sample block into one 212-byte sound
    /// unit per channel.
    pub fn encode_frame(&mut self, pcm: &[f64]) -> AtracResult<Vec<[u8; FRAME_BYTES]>> {
        if pcm.len() != NUM_SAMPLES * self.channels {
            return Err(AtracError::InvalidSettings(format!(
                "expected {} interleaved samples, got {}",
                NUM_SAMPLES * self.channels,
                pcm.len()
            )));
        }

        let mut frames = Vec::with_capacity(self.channels);
        for channel in 0..self.channels {
            let mut src = [0.0; NUM_SAMPLES];
            for (i, s) in src.iter_mut().enumerate() {
                *s = pcm[i * self.channels + channel];
            }

            let state = &mut self.state[channel];
            state.split.split(
                &src,
                &mut state.pcm_buf_low[..128],
                &mut state.pcm_buf_mid[..128],
                &mut state.pcm_buf_hi[..256],
            );

            let window_mask = match self.settings.window_mode {
                WindowMode::Auto => {
                    let mut mask = 0u32;
                    if state.detectors[0].detect(&state.pcm_buf_low[..128]) {
                        mask |= 0x1;
                    }
                    let inv_mid = invert_spectrum(&state.pcm_buf_mid[..128]);
                    if state.detectors[1].detect(&inv_mid) {
                        mask |= 0x2;
                    }
                    let inv_hi = invert_spectrum(&state.pcm_buf_hi[..256]);
                    if state.detectors[2].detect(&inv_hi) {
                        mask |= 0x4;
                    }
                    mask
                }
                WindowMode::NoTransient => self.settings.window_mask,
            };
            let mode = BlockSizeMode::from_mask(window_mask);
            if window_mask != 0 {
                debug!(
                    "frame {} ch {channel}: short windows, mask {window_mask:#x}",
                    self.frame_index
                );
            }

            let mut specs = [0.0; 512];
            self.mdct.mdct_frame(
                &mut specs,
                &mut state.pcm_buf_low,
                &mut state.pcm_buf_mid,
                &mut state.pcm_buf_hi,
                mode,
            );

            let scaled = scale_frame(&specs, &mode);
            let (bfu_idx, word_lengths) = self.allocator.allocate(&scaled, &mode);
            frames.push(pack_frame(mode, bfu_idx, &word_lengths, &scaled)?);
        }

        self.frame_index += 1;
        Ok(frames)
    }
}
