pub mod bitio;
pub mod tables;
pub mod types;

pub use bitio::{BitReader, BitWriter};

pub use tables::{
    bfu_to_band, BFU_AMOUNT_TAB, BFU_START_LONG, BFU_START_SHORT, BLOCKS_PER_BAND, MAX_SCALE,
    SCALE_TABLE, SPECS_PER_BFU,
};

pub use types::{
    BlockSizeMode, CODEC_DELAY, FRAME_BITS, FRAME_BYTES, MAX_BFUS, NUM_BANDS, NUM_SAMPLES,
    PCM_VALUE_MAX, PCM_VALUE_MIN,
};
