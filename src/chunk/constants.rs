//! Chunk header layout and reserved event ids.

/// Leading bytes of every chunk.
pub const MAGIC: [u8; 4] = *b"FLR\0";

/// Format version written into the header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
}

pub const VERSION: Version = Version { major: 2, minor: 0 };

pub const MAGIC_OFFSET: usize = 0;
pub const VERSION_OFFSET: usize = 4;
pub const SIZE_OFFSET: usize = 8;
pub const CONSTANT_POOL_OFFSET: usize = 16;
pub const METADATA_OFFSET: usize = 24;
pub const START_NANOS_OFFSET: usize = 32;
pub const DURATION_OFFSET: usize = 40;
pub const START_TICKS_OFFSET: usize = 48;
pub const TICKS_PER_SECOND_OFFSET: usize = 56;
pub const FEATURES_OFFSET: usize = 64;
pub const HEADER_SIZE: usize = 68;

/// Feature flag: integers in the chunk body are compressed.
pub const FEATURE_COMPRESSED_INTS: i32 = 1;

pub const METADATA_EVENT_ID: i64 = 0;
pub const CHECKPOINT_EVENT_ID: i64 = 1;

/// Checkpoint type mask marking a flush checkpoint.
pub const CHECKPOINT_FLUSH: u8 = 1;
