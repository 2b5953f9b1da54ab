//! Error types for type registration, value construction and chunk assembly.
//!
//! Every failure in this crate is a synchronous contract violation by the
//! caller. Nothing is retried and nothing is transient, so the variants
//! describe which contract was broken and [`RecordingError::kind`] sorts them
//! into invalid-argument and invalid-state failures.

use std::fmt;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RecordingError>;

/// Broad classification of a [`RecordingError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller passed a value, type or name that the target rejects.
    InvalidArgument,
    /// The operation is not valid in the current state of the session.
    InvalidState,
}

/// Errors raised by the recording engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordingError {
    /// An event was written whose type does not extend `jdk.jfr.Event`.
    NotAnEvent { type_name: String },
    /// A value was rejected by the type it was offered to.
    IncompatibleValue { type_name: String, detail: String },
    /// A non-array field was given a value sequence whose length is not one.
    ArrayArity { field: String, len: usize },
    /// A value sequence was supplied for a field that is not an array.
    NotAnArray { field: String },
    /// A custom type tried to take the name of a built-in type.
    BuiltinNameClash { name: String },
    /// A type was looked up by name and does not exist.
    UnknownType { name: String },
    /// A type used as an annotation does not extend `java.lang.annotation.Annotation`.
    NotAnAnnotation { type_name: String },
    /// A forward reference was used before its target was registered and resolved.
    UnresolvedType { name: String },
    /// A null value of an inline type would expand into itself forever.
    RecursiveInlineType { type_name: String },
    /// A pool-backed value reached the writer without a constant pool index.
    NotInterned { type_name: String },
    /// The chunk has already been finished.
    ChunkFinished,
    /// A chunk is already open for this recording.
    ChunkAlreadyOpen,
    /// The metadata string table is missing a string the schema refers to.
    UnknownString { value: String },
}

impl RecordingError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecordingError::NotAnEvent { .. }
            | RecordingError::IncompatibleValue { .. }
            | RecordingError::ArrayArity { .. }
            | RecordingError::NotAnArray { .. }
            | RecordingError::BuiltinNameClash { .. }
            | RecordingError::UnknownType { .. }
            | RecordingError::NotAnAnnotation { .. }
            | RecordingError::RecursiveInlineType { .. } => ErrorKind::InvalidArgument,
            RecordingError::UnresolvedType { .. }
            | RecordingError::NotInterned { .. }
            | RecordingError::ChunkFinished
            | RecordingError::ChunkAlreadyOpen
            | RecordingError::UnknownString { .. } => ErrorKind::InvalidState,
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::NotAnEvent { type_name } => {
                write!(f, "{type_name}: not an event type (supertype must be jdk.jfr.Event)")
            }
            RecordingError::IncompatibleValue { type_name, detail } => {
                write!(f, "{type_name}: cannot accept {detail}")
            }
            RecordingError::ArrayArity { field, len } => {
                write!(f, "{field}: non-array field needs exactly one value, got {len}")
            }
            RecordingError::NotAnArray { field } => {
                write!(f, "{field}: field is not an array")
            }
            RecordingError::BuiltinNameClash { name } => {
                write!(f, "{name}: name is reserved for a built-in type")
            }
            RecordingError::UnknownType { name } => write!(f, "{name}: unknown type"),
            RecordingError::NotAnAnnotation { type_name } => {
                write!(f, "{type_name}: not an annotation type")
            }
            RecordingError::UnresolvedType { name } => {
                write!(f, "{name}: forward reference has not been resolved")
            }
            RecordingError::RecursiveInlineType { type_name } => {
                write!(f, "{type_name}: null inline value contains itself; set the field")
            }
            RecordingError::NotInterned { type_name } => {
                write!(f, "{type_name}: value has no constant pool index")
            }
            RecordingError::ChunkFinished => write!(f, "chunk is already finished"),
            RecordingError::ChunkAlreadyOpen => write!(f, "a chunk is already open"),
            RecordingError::UnknownString { value } => {
                write!(f, "'{value}' is missing from the metadata string table")
            }
        }
    }
}

impl std::error::Error for RecordingError {}
