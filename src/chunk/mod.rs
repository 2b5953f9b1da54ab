//! Chunk assembly.
//!
//! A chunk is laid out as
//!
//! ```text
//! +--------+----------------------+------------+----------------+
//! | header | event, event, ...    | checkpoint | metadata event |
//! +--------+----------------------+------------+----------------+
//! ```
//!
//! The header is written when the chunk opens with its size, offset and
//! duration slots zeroed; [`Chunk::finish`] patches them once the
//! checkpoint and metadata events have been appended. Every event,
//! including the checkpoint and the metadata event, starts with its own
//! total size so readers can skip records they do not understand.

pub mod constants;

use std::time::Instant;

use crate::clock;
use crate::encode::{self, Encoding};
use crate::error::{RecordingError, Result};
use crate::recording::RecordingSettings;
use crate::types::Types;
use crate::value::TypedValue;
use crate::writer::ByteWriter;
use constants::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChunkState {
    Open,
    Finished,
}

/// An in-memory chunk accepting events until it is finished.
#[derive(Debug)]
pub struct Chunk {
    buf: ByteWriter,
    scratch: ByteWriter,
    start_nanos: i64,
    start_ticks: i64,
    /// Measures the duration independently of a pinned `start_ticks`.
    opened_at: Instant,
    event_count: usize,
    state: ChunkState,
}

impl Chunk {
    /// Open a chunk and write its header. Start time and ticks come from
    /// the settings when set, from the clocks otherwise.
    pub fn new(settings: &RecordingSettings) -> Self {
        let start_nanos = settings
            .start_timestamp_nanos
            .unwrap_or_else(clock::wall_clock_nanos);
        let start_ticks = settings.start_ticks.unwrap_or_else(clock::monotonic_ticks);

        let mut buf = ByteWriter::with_capacity(settings.initial_buffer_capacity.max(HEADER_SIZE));
        buf.write_bytes(&MAGIC)
            .write_short_raw(VERSION.major as i16)
            .write_short_raw(VERSION.minor as i16)
            // size, constant pool offset, metadata offset
            .write_long_raw(0)
            .write_long_raw(0)
            .write_long_raw(0)
            .write_long_raw(start_nanos)
            // duration
            .write_long_raw(0)
            .write_long_raw(start_ticks)
            .write_long_raw(clock::TICKS_PER_SECOND)
            .write_int_raw(FEATURE_COMPRESSED_INTS);

        tracing::debug!(
            "Opened chunk at {} ns (ticks {})",
            start_nanos,
            start_ticks
        );
        Self {
            buf,
            scratch: ByteWriter::default(),
            start_nanos,
            start_ticks,
            opened_at: Instant::now(),
            event_count: 0,
            state: ChunkState::Open,
        }
    }

    pub fn start_nanos(&self) -> i64 {
        self.start_nanos
    }

    pub fn start_ticks(&self) -> i64 {
        self.start_ticks
    }

    pub fn event_count(&self) -> usize {
        self.event_count
    }

    /// Bytes written so far, header included.
    pub fn bytes_written(&self) -> usize {
        self.buf.position()
    }

    pub fn has_events(&self) -> bool {
        self.event_count > 0
    }

    pub fn is_finished(&self) -> bool {
        self.state == ChunkState::Finished
    }

    /// Append one event. The value's type must extend `jdk.jfr.Event`, and
    /// every pool-backed value it references must already be interned.
    pub fn write_event(&mut self, event: &TypedValue) -> Result<()> {
        if self.is_finished() {
            return Err(RecordingError::ChunkFinished);
        }
        let event_type = event.value_type();
        if !event_type.is_event() {
            return Err(RecordingError::NotAnEvent {
                type_name: event_type.name().to_string(),
            });
        }

        self.scratch.reset();
        self.scratch.write_long(event_type.id().as_i64());
        encode::write_fields(&mut self.scratch, event, Encoding::Event)?;

        self.buf
            .write_len(self.scratch.self_sized_len())
            .write_bytes(self.scratch.as_bytes());
        self.event_count += 1;
        Ok(())
    }

    /// Append the checkpoint and metadata events, patch the header and hand
    /// out the chunk bytes. On error nothing is appended and the chunk stays
    /// open.
    pub fn finish(&mut self, types: &Types) -> Result<Vec<u8>> {
        if self.is_finished() {
            return Err(RecordingError::ChunkFinished);
        }
        let unresolved = types.resolve_all();
        if unresolved > 0 {
            tracing::warn!(
                "Finishing chunk with {} unresolved forward references",
                unresolved
            );
        }
        let duration = self.elapsed_ticks();

        let mut tail = ByteWriter::default();
        let pool_count = self.write_checkpoint(&mut tail, types, duration)?;
        let metadata_rel = tail.position();
        types.with_metadata(|metadata| {
            metadata.write_meta_event(&mut tail, self.start_ticks, duration)
        })?;

        let checkpoint_offset = self.buf.position();
        let metadata_offset = checkpoint_offset + metadata_rel;
        self.buf.write_bytes(tail.as_bytes());
        let size = self.buf.position();

        self.buf.write_long_raw_at(SIZE_OFFSET, size as i64);
        self.buf
            .write_long_raw_at(CONSTANT_POOL_OFFSET, checkpoint_offset as i64);
        self.buf
            .write_long_raw_at(METADATA_OFFSET, metadata_offset as i64);
        self.buf.write_long_raw_at(DURATION_OFFSET, duration);
        self.state = ChunkState::Finished;

        tracing::info!(
            "Finished chunk: {} bytes, {} events, {} constant pools, checkpoint at {}, metadata at {}",
            size,
            self.event_count,
            pool_count,
            checkpoint_offset,
            metadata_offset
        );
        Ok(std::mem::take(&mut self.buf).into_bytes())
    }

    /// Ticks since the chunk was opened. Ticks are nanoseconds.
    fn elapsed_ticks(&self) -> i64 {
        i64::try_from(self.opened_at.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }

    fn write_checkpoint(&self, out: &mut ByteWriter, types: &Types, duration: i64) -> Result<usize> {
        let mut body = ByteWriter::default();
        body.write_long(CHECKPOINT_EVENT_ID)
            .write_long(self.start_ticks)
            .write_long(duration)
            // delta to the previous checkpoint
            .write_long(0)
            .write_byte(CHECKPOINT_FLUSH);
        let pool_count = types.constant_pools().write_to(&mut body)?;
        out.write_len(body.self_sized_len()).write_bytes(body.as_bytes());
        Ok(pool_count)
    }
}
