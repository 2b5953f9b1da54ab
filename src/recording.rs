//! Recording sessions: a type registry plus a sequence of chunks.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::error::{RecordingError, Result};
use crate::types::{
    jdk, Builtin, Type, TypeStructureBuilder, Types, ANNOTATION_SUPER_TYPE, EVENT_SUPER_TYPE,
};
use crate::value::TypedValue;

/// Default initial capacity of a chunk buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;

/// Settings of a recording session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    /// Wall clock start of every chunk, in nanoseconds since the epoch.
    /// Read from the system clock when unset.
    pub start_timestamp_nanos: Option<i64>,
    /// Tick value at the start of every chunk. Read from the monotonic
    /// clock when unset.
    pub start_ticks: Option<i64>,
    /// Register the JDK type catalog. Event types need it for their
    /// implicit fields.
    pub initialize_jdk_types: bool,
    /// Initial capacity of the chunk buffer in bytes.
    pub initial_buffer_capacity: usize,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        RecordingSettings {
            start_timestamp_nanos: None,
            start_ticks: None,
            initialize_jdk_types: true,
            initial_buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

/// A recording session.
///
/// Types and constant pools live as long as the session; chunks come and go.
/// Every chunk carries every non-empty pool, so each one can be read on its
/// own.
#[derive(Debug)]
pub struct Recording {
    types: Arc<Types>,
    settings: RecordingSettings,
    chunk: Option<Chunk>,
}

impl Recording {
    pub fn new(settings: RecordingSettings) -> Result<Self> {
        let types = if settings.initialize_jdk_types {
            Types::new()?
        } else {
            Types::builtins_only()
        };
        Ok(Self {
            types: Arc::new(types),
            settings,
            chunk: None,
        })
    }

    /// The session's type registry. Clone the `Arc` to build values on
    /// other threads.
    pub fn types(&self) -> &Arc<Types> {
        &self.types
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    pub fn register_type<F>(&self, name: &str, supertype: Option<&str>, declare: F) -> Result<Type>
    where
        F: FnOnce(&mut TypeStructureBuilder<'_>) -> Result<()>,
    {
        self.types.get_or_add(name, supertype, declare)
    }

    /// Register an event type. The implicit `startTime`, `eventThread` and
    /// `stackTrace` fields come first, followed by the fields `declare` adds.
    pub fn register_event_type<F>(&self, name: &str, declare: F) -> Result<Type>
    where
        F: FnOnce(&mut TypeStructureBuilder<'_>) -> Result<()>,
    {
        self.types.get_or_add(name, Some(EVENT_SUPER_TYPE), |b| {
            b.add_field_with("startTime", Builtin::Long, |f| {
                f.add_annotation(jdk::ANNOTATION_TIMESTAMP, Some(jdk::TICKS_UNIT))?;
                Ok(())
            })?
            .add_field("eventThread", jdk::THREAD)
            .add_field("stackTrace", jdk::STACK_TRACE);
            declare(b)
        })
    }

    pub fn register_annotation_type<F>(&self, name: &str, declare: F) -> Result<Type>
    where
        F: FnOnce(&mut TypeStructureBuilder<'_>) -> Result<()>,
    {
        self.types
            .get_or_add(name, Some(ANNOTATION_SUPER_TYPE), declare)
    }

    pub fn has_open_chunk(&self) -> bool {
        self.chunk.is_some()
    }

    /// Resolve pending forward references and open a new chunk.
    pub fn begin_chunk(&mut self) -> Result<()> {
        if self.chunk.is_some() {
            return Err(RecordingError::ChunkAlreadyOpen);
        }
        let unresolved = self.types.resolve_all();
        if unresolved > 0 {
            tracing::debug!(
                "Opening chunk with {} unresolved forward references",
                unresolved
            );
        }
        self.chunk = Some(Chunk::new(&self.settings));
        Ok(())
    }

    /// Write an event into the open chunk, opening one if needed.
    pub fn write_event(&mut self, event: &TypedValue) -> Result<()> {
        if self.chunk.is_none() {
            self.begin_chunk()?;
        }
        match self.chunk.as_mut() {
            Some(chunk) => chunk.write_event(event),
            None => Err(RecordingError::ChunkFinished),
        }
    }

    /// Finish the open chunk and return its bytes. Without an open chunk an
    /// empty one is produced. If finishing fails the chunk stays open.
    pub fn finish_chunk(&mut self) -> Result<Vec<u8>> {
        if self.chunk.is_none() {
            self.begin_chunk()?;
        }
        let Some(chunk) = self.chunk.as_mut() else {
            return Err(RecordingError::ChunkFinished);
        };
        let bytes = chunk.finish(&self.types)?;
        self.chunk = None;
        Ok(bytes)
    }

    /// Finish the open chunk and write it to `out`. Returns the chunk size.
    pub fn write_chunk<W: Write>(&mut self, out: &mut W) -> anyhow::Result<usize> {
        let bytes = self.finish_chunk().context("Failed to finish chunk")?;
        out.write_all(&bytes)
            .with_context(|| format!("Failed to write chunk of {} bytes", bytes.len()))?;
        Ok(bytes.len())
    }
}
