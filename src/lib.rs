//! flr-writer - a write-only recorder for Flight Recorder chunks.
//!
//! A recording session registers types, builds typed values against them and
//! writes events into chunks. Each finished chunk is a self-contained byte
//! sequence: header, events, a constant pool checkpoint and the metadata
//! event describing every type.
//!
//! # Modules
//!
//! - [`writer`] - growable byte buffer with the format's integer and string encodings
//! - [`types`] - type registry, forward references and the JDK type catalog
//! - [`value`] - immutable typed values and the field value builder
//! - [`metadata`] - registered types, the string table and the metadata event
//! - [`pool`] - per-type constant pools and their dependency order
//! - [`chunk`] - chunk header, event records and chunk assembly
//! - [`recording`] - session facade and settings
//!
//! # Example
//!
//! ```no_run
//! use flr_writer::{Builtin, Recording, RecordingSettings};
//!
//! let mut recording = Recording::new(RecordingSettings::default())?;
//! let request = recording.register_event_type("my.RequestEvent", |b| {
//!     b.add_field("url", Builtin::String)
//!         .add_field("status", Builtin::Int);
//!     Ok(())
//! })?;
//! let event = recording.types().as_value_with(&request, |b| {
//!     b.put("url", "/x")?.put("status", 200i32)?;
//!     Ok(())
//! })?;
//! recording.write_event(&event)?;
//! let chunk: Vec<u8> = recording.finish_chunk()?;
//! # Ok::<(), flr_writer::RecordingError>(())
//! ```

pub mod chunk;
pub mod clock;
mod encode;
pub mod error;
pub mod metadata;
pub mod pool;
pub mod recording;
pub mod type_ids;
pub mod types;
pub mod value;
pub mod writer;

// Re-export for convenience
pub use chunk::Chunk;
pub use error::{ErrorKind, RecordingError, Result};
pub use recording::{Recording, RecordingSettings};
pub use type_ids::TypeId;
pub use types::{jdk, Builtin, ConcreteType, Type, TypeStructureBuilder, Types};
pub use value::{FieldValueBuilder, Scalar, TypedFieldValue, TypedValue};
pub use writer::ByteWriter;
