use crate::core::types::FRAME_BYTES;
use crate::error::{AtracError, AtracResult};
use crate::{FrameSource, AEA_HEADER_SIZE, AEA_MAGIC, AEA_TITLE_SIZE};

/// Parsed AEA header fields
#[derive(Debug, Clone)]
pub struct AeaHeader {
    /// Track title, NUL-terminated on disk
    pub title: String,
    /// Total sound unit count across all channels
    pub frame_count: u32,
    pub channels: u8,
}

/// A fully parsed AEA file: header plus the channel-interleaved sound
/// units.
#[derive(Debug, Clone)]
pub struct AeaFile {
    pub header: AeaHeader,
    pub frames: Vec<Vec<u8>>,
}

impl AeaFile {
    /// Stream length in samples per channel
    pub fn length_in_samples(&self) -> u64 {
        let channels = self.header.channels.max(1) as u64;
        self.header.frame_count as u64 / channels * 512
    }

    /// Iterate the sound units in container order
    pub fn frame_source(self) -> AeaFileSource {
        AeaFileSource {
            channels: self.header.channels,
            frames: self.frames,
            pos: 0,
        }
    }
}

/// binary reader for the AEA container
pub struct AeaReader;

impl AeaReader {
    /// new reader
    pub fn new() -> Self {
        AeaReader
    }

    /// read and parse an AEA file
    pub fn read(&self, data: &[u8]) -> AtracResult<AeaFile> {
        if data.len() < AEA_HEADER_SIZE {
            return Err(AtracError::ContainerFormat(
                "file shorter than the AEA header".to_string(),
            ));
        }

        // magic
        if data[0..4] != AEA_MAGIC {
            return Err(AtracError::ContainerFormat(
                "invalid AEA file: bad magic".to_string(),
            ));
        }

        let header = self.read_header(data)?;

        // the payload is a whole number of sound units
        let payload = &data[AEA_HEADER_SIZE..];
        let available = payload.len() / FRAME_BYTES;
        let count = (header.frame_count as usize).min(available);

        let frames = (0..count)
            .map(|i| payload[i * FRAME_BYTES..(i + 1) * FRAME_BYTES].to_vec())
            .collect();

        Ok(AeaFile { header, frames })
    }

    fn read_header(&self, data: &[u8]) -> AtracResult<AeaHeader> {
        let title_bytes = &data[4..4 + AEA_TITLE_SIZE];
        let title_end = title_bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(AEA_TITLE_SIZE);
        let title = String::from_utf8_lossy(&title_bytes[..title_end]).into_owned();

        let frame_count =
            u32::from_le_bytes(data[260..264].try_into().expect("header length checked"));
        let channels = data[264];
        if channels != 1 && channels != 2 {
            return Err(AtracError::ContainerFormat(format!(
                "invalid AEA channel count {channels}"
            )));
        }

        Ok(AeaHeader {
            title,
            frame_count,
            channels,
        })
    }
}

impl Default for AeaReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame-at-a-time view over a parsed AEA file.
pub struct AeaFileSource {
    channels: u8,
    frames: Vec<Vec<u8>>,
    pos: usize,
}

impl FrameSource for AeaFileSource {
    fn read_frame(&mut self) -> AtracResult<Option<Vec<u8>>> {
        if self.pos >= self.frames.len() {
            return Ok(None);
        }
        let frame = self.frames[self.pos].clone();
        self.pos += 1;
        Ok(Some(frame))
    }

    fn channels(&self) -> u8 {
        self.channels
    }
}
