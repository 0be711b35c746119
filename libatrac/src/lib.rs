#![allow(clippy::needless_range_loop)]

//! Encoder/decoder for the ATRAC1 perceptual audio codec and its AEA
//! container. 44.1 kHz PCM goes through a three-band QMF split, a
//! long/short windowed MDCT, block-floating quantization and a
//! psychoacoustically weighted bit allocation into fixed 212-byte sound
//! units; decoding inverts the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod codec;
pub mod core;
pub mod error;

mod reader;
mod writer;

pub use codec::{
    dequantize, invert_spectrum, pack_frame, scale_block, scale_frame, unpack_frame,
    Atrac1Decoder, Atrac1Encoder, Atrac1Mdct, BitAllocator, EncoderSettings, Mdct, ScaledBlock,
    SplitFilterBank, SynthesisFilterBank, TransientDetector, UnpackedFrame, WindowMode,
};
pub use crate::core::{
    BlockSizeMode, BFU_AMOUNT_TAB, CODEC_DELAY, FRAME_BITS, FRAME_BYTES, MAX_BFUS, NUM_BANDS,
    NUM_SAMPLES, SCALE_TABLE,
};
pub use error::{AtracError, AtracResult};
pub use reader::{AeaFile, AeaFileSource, AeaHeader, AeaReader};
pub use writer::AeaWriter;

// container constants

/// AEA magic bytes
pub const AEA_MAGIC: [u8; 4] = [0x00, 0x08, 0x00, 0x00];

/// Fixed AEA header size
pub const AEA_HEADER_SIZE: usize = 2048;

/// Title field width inside the header
pub const AEA_TITLE_SIZE: usize = 256;

/// The only sample rate ATRAC1 carries
pub const SAMPLE_RATE: u32 = 44100;

// io seams

/// Pull source of interleaved PCM blocks.
pub trait PcmSource {
    /// Fill `buf` with up to `samples_per_channel * channels` interleaved
    /// samples; returns the number of samples per channel delivered
    /// (0 at end of stream).
    fn read_block(&mut self, samples_per_channel: usize, buf: &mut Vec<f64>)
        -> AtracResult<usize>;
    fn channels(&self) -> u8;
}

/// Sink for interleaved PCM blocks.
pub trait PcmSink {
    fn write_block(&mut self, interleaved: &[f64]) -> AtracResult<()>;
}

/// Source of compressed sound units (the container read side).
pub trait FrameSource {
    fn read_frame(&mut self) -> AtracResult<Option<Vec<u8>>>;
    fn channels(&self) -> u8;
}

/// Sink for compressed sound units (the container write side).
pub trait FrameSink {
    fn write_frame(&mut self, frame: &[u8]) -> AtracResult<()>;
}

/// In-memory PCM source over an interleaved slice.
pub struct SlicePcmSource<'a> {
    samples: &'a [f64],
    channels: u8,
    pos: usize,
}

impl<'a> SlicePcmSource<'a> {
    pub fn new(samples: &'a [f64], channels: u8) -> Self {
        Self {
            samples,
            channels,
            pos: 0,
        }
    }
}

impl PcmSource for SlicePcmSource<'_> {
    fn read_block(
        &mut self,
        samples_per_channel: usize,
        buf: &mut Vec<f64>,
    ) -> AtracResult<usize> {
        let want = samples_per_channel * self.channels as usize;
        let take = want.min(self.samples.len() - self.pos);
        buf.clear();
        buf.extend_from_slice(&self.samples[self.pos..self.pos + take]);
        self.pos += take;
        Ok(take / self.channels as usize)
    }

    fn channels(&self) -> u8 {
        self.channels
    }
}

/// In-memory PCM sink collecting interleaved samples.
#[derive(Default)]
pub struct VecPcmSink {
    pub samples: Vec<f64>,
}

impl PcmSink for VecPcmSink {
    fn write_block(&mut self, interleaved: &[f64]) -> AtracResult<()> {
        self.samples.extend_from_slice(interleaved);
        Ok(())
    }
}

// stream drivers

/// Encode a whole PCM stream into a frame sink. The cancellation flag
/// is checked between frames; a cancelled run returns the number of
/// sound units emitted so far.
pub fn encode_stream(
    source: &mut dyn PcmSource,
    sink: &mut dyn FrameSink,
    settings: EncoderSettings,
    cancel: &AtomicBool,
) -> AtracResult<u64> {
    let channels = source.channels();
    let mut encoder = Atrac1Encoder::new(channels, settings)?;
    let mut block = Vec::new();
    let mut written = 0u64;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(written);
        }
        let got = source.read_block(NUM_SAMPLES, &mut block)?;
        if got == 0 {
            return Ok(written);
        }
        // zero-pad a trailing partial block
        block.resize(NUM_SAMPLES * channels as usize, 0.0);
        for frame in encoder.encode_frame(&block)? {
            sink.write_frame(&frame)?;
            written += 1;
        }
    }
}

/// Decode a whole frame stream into a PCM sink. The cancellation flag
/// is checked between frames.
pub fn decode_stream(
    source: &mut dyn FrameSource,
    sink: &mut dyn PcmSink,
    cancel: &AtomicBool,
) -> AtracResult<u64> {
    let channels = source.channels();
    let mut decoder = Atrac1Decoder::new(channels)?;
    let mut decoded = 0u64;

    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(decoded);
        }
        let mut frames: Vec<Vec<u8>> = Vec::with_capacity(channels as usize);
        for _ in 0..channels {
            match source.read_frame()? {
                Some(frame) => frames.push(frame),
                None => return Ok(decoded),
            }
        }
        let pcm = decoder.decode_frame(&frames)?;
        sink.write_block(&pcm)?;
        decoded += 1;
    }
}

// convenience api

/// Encode interleaved samples (16-bit float range) into a complete AEA
/// file.
pub fn encode(
    samples: &[f64],
    channels: u8,
    title: &str,
    settings: EncoderSettings,
) -> AtracResult<Vec<u8>> {
    let mut source = SlicePcmSource::new(samples, channels);
    let mut writer = AeaWriter::new(title, channels);
    encode_stream(
        &mut source,
        &mut writer,
        settings,
        &AtomicBool::new(false),
    )?;
    writer.finish()
}

/// Decode a complete AEA file into interleaved samples.
pub fn decode(aea: &[u8]) -> AtracResult<(Vec<f64>, u8)> {
    let file = AeaReader::new().read(aea)?;
    let channels = file.header.channels;
    let mut source = file.frame_source();
    let mut sink = VecPcmSink::default();
    decode_stream(&mut source, &mut sink, &AtomicBool::new(false))?;
    Ok((sink.samples, channels))
}

// tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aea_header_roundtrip() {
        let writer = AeaWriter::new("test track", 1);
        let bytes = writer.finish().unwrap();
        assert_eq!(bytes.len(), AEA_HEADER_SIZE);

        let file = AeaReader::new().read(&bytes).unwrap();
        assert_eq!(file.header.title, "test track");
        assert_eq!(file.header.channels, 1);
        assert_eq!(file.header.frame_count, 0);
        assert!(file.frames.is_empty());
    }

    #[test]
    fn aea_frames_roundtrip() {
        let mut writer = AeaWriter::new("frames", 2);
        let a = [0x11u8; FRAME_BYTES];
        let b = [0x22u8; FRAME_BYTES];
        writer.write_frame(&a).unwrap();
        writer.write_frame(&b).unwrap();
        let bytes = writer.finish().unwrap();

        let file = AeaReader::new().read(&bytes).unwrap();
        assert_eq!(file.header.frame_count, 2);
        assert_eq!(file.frames[0], a.to_vec());
        assert_eq!(file.frames[1], b.to_vec());
        assert_eq!(file.length_in_samples(), 512);
    }

    #[test]
    fn aea_rejects_bad_magic() {
        let bytes = vec![0xffu8; AEA_HEADER_SIZE];
        assert!(matches!(
            AeaReader::new().read(&bytes),
            Err(AtracError::ContainerFormat(_))
        ));
    }

    #[test]
    fn aea_rejects_short_file() {
        assert!(AeaReader::new().read(&[0u8; 64]).is_err());
    }

    #[test]
    fn writer_rejects_wrong_frame_size() {
        let mut writer = AeaWriter::new("", 1);
        assert!(writer.write_frame(&[0u8; 100]).is_err());
    }

    #[test]
    fn cancellation_stops_between_frames() {
        let samples = vec![0.0; NUM_SAMPLES * 4];
        let mut source = SlicePcmSource::new(&samples, 1);
        let mut writer = AeaWriter::new("", 1);
        let cancel = AtomicBool::new(true);
        let written =
            encode_stream(&mut source, &mut writer, EncoderSettings::default(), &cancel).unwrap();
        assert_eq!(written, 0);
    }
}
