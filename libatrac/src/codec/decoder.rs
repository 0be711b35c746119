//! Per-frame decode orchestration: unpack, dequantize, inverse MDCT
//! with overlap-add, QMF synthesis and PCM clamping, per channel.

use log::debug;

use crate::codec::bitstream::unpack_frame;
use crate::codec::dequant::dequantize;
use crate::codec::mdct::Atrac1Mdct;
use crate::codec::qmf::SynthesisFilterBank;
use crate::core::types::{NUM_SAMPLES, PCM_VALUE_MAX, PCM_VALUE_MIN};
use crate::error::{AtracError, AtracResult};

struct ChannelState {
    synthesis: SynthesisFilterBank,
    pcm_buf_low: [f64; 256],
    pcm_buf_mid: [f64; 256],
    pcm_buf_hi: [f64; 512],
}

impl ChannelState {
    fn new() -> Self {
        Self {
            synthesis: SynthesisFilterBank::new(),
            pcm_buf_low: [0.0; 256],
            pcm_buf_mid: [0.0; 256],
            pcm_buf_hi: [0.0; 512],
        }
    }
}

/// ATRAC1 decoder for one stream of up to two channels.
pub struct Atrac1Decoder {
    channels: usize,
    mdct: Atrac1Mdct,
    state: Vec<ChannelState>,
    frame_index: u64,
}

impl Atrac1Decoder {
    pub fn new(channels: u8) -> AtracResult<Self> {
        if channels == 0 || channels > 2 {
            return Err(AtracError::InvalidSettings(format!(
                "channel count must be 1 or 2, got {channels}"
            )));
        }
        Ok(Self {
            channels: channels as usize,
            mdct: Atrac1Mdct::new(),
            state: (0..channels).map(|_| ChannelState::new()).collect(),
            frame_index: 0,
        })
    }

    pub fn channels(&self) -> u8 {
        self.channels as u8
    }

    /// Decode one 212-byte sound unit per channel into one interleaved
    /// 512-sample block, clamped to the 16-bit PCM range.
    pub fn decode_frame(&mut self, frames: &[impl AsRef<[u8]>]) -> AtracResult<Vec<f64>> {
        if frames.len() != self.channels {
            return Err(AtracError::MalformedFrame(format!(
                "expected {} channel frames, got {}",
                self.channels,
                frames.len()
            )));
        }

        let mut pcm = vec![0.0; NUM_SAMPLES * self.channels];
        for (channel, frame) in frames.iter().enumerate() {
            let unpacked = unpack_frame(frame.as_ref())?;
            if unpacked.mode.log_count.iter().any(|&log| log != 0) {
                debug!(
                    "frame {} ch {channel}: short windows, {} BFUs",
                    self.frame_index, unpacked.bfu_count
                );
            }
            let mut specs = dequantize(&unpacked);

            let state = &mut self.state[channel];
            self.mdct.imdct_frame(
                &mut specs,
                unpacked.mode,
                &mut state.pcm_buf_low,
                &mut state.pcm_buf_mid,
                &mut state.pcm_buf_hi,
            );

            let mut sum = [0.0; NUM_SAMPLES];
            state.synthesis.synthesis(
                &mut sum,
                &state.pcm_buf_low[..128],
                &state.pcm_buf_mid[..128],
                &state.pcm_buf_hi[..256],
            );

            for (i, &v) in sum.iter().enumerate() {
                pcm[i * self.channels + channel] = v.clamp(PCM_VALUE_MIN, PCM_VALUE_MAX);
            }
        }
        self.frame_index += 1;
        Ok(pcm)
    }
}
