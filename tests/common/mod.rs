//! Common test utilities for flr-writer integration tests.

pub mod reader;
#[allow(unused_imports)]
pub use reader::{
    read_checkpoint, read_header, read_metadata, records, Checkpoint, Cursor, Element, Header,
    MetadataEvent, Record,
};

use flr_writer::{Recording, RecordingSettings};

/// Start time used by recordings built with [`fixed_recording`].
#[allow(dead_code)]
pub const START_NANOS: i64 = 1_700_000_000_000_000_000;

/// A recording with pinned start timestamps.
#[allow(dead_code)]
pub fn fixed_recording() -> Recording {
    Recording::new(RecordingSettings {
        start_timestamp_nanos: Some(START_NANOS),
        start_ticks: Some(0),
        ..Default::default()
    })
    .expect("Failed to create recording")
}
