use crate::core::types::FRAME_BYTES;
use crate::error::{AtracError, AtracResult};
use crate::{FrameSink, AEA_HEADER_SIZE, AEA_MAGIC, AEA_TITLE_SIZE};

/// binary writer for the AEA container
pub struct AeaWriter {
    title: String,
    channels: u8,
    frames: Vec<Vec<u8>>,
}

impl AeaWriter {
    /// new writer; the title is truncated to the 255 bytes the header
    /// can carry
    pub fn new(title: &str, channels: u8) -> Self {
        AeaWriter {
            title: title.to_string(),
            channels,
            frames: Vec::new(),
        }
    }

    /// Sound units written so far
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// build the complete AEA file
    pub fn finish(self) -> AtracResult<Vec<u8>> {
        let mut buffer = vec![0u8; AEA_HEADER_SIZE];
        buffer[0..4].copy_from_slice(&AEA_MAGIC);

        let title = self.title.as_bytes();
        let title_len = title.len().min(AEA_TITLE_SIZE - 1);
        buffer[4..4 + title_len].copy_from_slice(&title[..title_len]);

        buffer[260..264].copy_from_slice(&(self.frames.len() as u32).to_le_bytes());
        buffer[264] = self.channels;

        for frame in &self.frames {
            buffer.extend_from_slice(frame);
        }
        Ok(buffer)
    }
}

impl FrameSink for AeaWriter {
    fn write_frame(&mut self, frame: &[u8]) -> AtracResult<()> {
        if frame.len() != FRAME_BYTES {
            return Err(AtracError::ContainerFormat(format!(
                "sound unit must be {FRAME_BYTES} bytes, got {}",
                frame.len()
            )));
        }
        self.frames.push(frame.to_vec());
        Ok(())
    }
}
