//! Serialization of typed values into event and checkpoint bodies.
//!
//! Values are written in one of two contexts. In an event body strings are
//! always inline. Inside a constant pool entry, nested strings that carry a
//! pool index are written as references to the string pool. In both
//! contexts a pool-backed composite is written as its bare pool index and
//! any other composite is written field by field.

use crate::error::{RecordingError, Result};
use crate::type_ids::TypeId;
use crate::types::{Builtin, ConcreteType};
use crate::value::{Scalar, TypedValue};
use crate::writer::ByteWriter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Encoding {
    Event,
    ConstantPool,
}

/// Write `value` into a field slot.
pub(crate) fn write_value(w: &mut ByteWriter, value: &TypedValue, encoding: Encoding) -> Result<()> {
    write_value_in(w, value, encoding, &mut Vec::new())
}

/// Write every declared field of a composite value in declaration order.
pub(crate) fn write_fields(w: &mut ByteWriter, value: &TypedValue, encoding: Encoding) -> Result<()> {
    write_fields_in(w, value, encoding, &mut Vec::new())
}

/// `null_path` holds the inline types whose null value is being expanded
/// above the current slot.
fn write_value_in(
    w: &mut ByteWriter,
    value: &TypedValue,
    encoding: Encoding,
    null_path: &mut Vec<TypeId>,
) -> Result<()> {
    match value.value_type() {
        ConcreteType::Builtin(b) => write_builtin(w, b.builtin(), value, encoding),
        ConcreteType::Composite(c) if c.has_constant_pool() => {
            w.write_long(pool_reference(value)?);
            Ok(())
        }
        ConcreteType::Composite(c) if value.is_null() => {
            // A null inline value expands into the nulls of its fields, so a
            // type met again inside its own expansion never bottoms out.
            if null_path.contains(&c.id()) {
                return Err(RecordingError::RecursiveInlineType {
                    type_name: c.name().to_string(),
                });
            }
            null_path.push(c.id());
            let written = write_fields_in(w, value, encoding, null_path);
            null_path.pop();
            written
        }
        ConcreteType::Composite(_) => write_fields_in(w, value, encoding, null_path),
    }
}

fn write_fields_in(
    w: &mut ByteWriter,
    value: &TypedValue,
    encoding: Encoding,
    null_path: &mut Vec<TypeId>,
) -> Result<()> {
    for field_value in value.field_values()? {
        if field_value.field().is_array() {
            w.write_len(field_value.values().len());
        }
        for element in field_value.values() {
            write_value_in(w, element, encoding, null_path)?;
        }
    }
    Ok(())
}

/// Write the body of a constant pool entry: the value itself rather than a
/// reference to it.
pub(crate) fn write_pool_entry(w: &mut ByteWriter, value: &TypedValue) -> Result<()> {
    match value.value_type() {
        // The entry of the string pool is the string, not a reference to it.
        ConcreteType::Builtin(b) => write_builtin(w, b.builtin(), value, Encoding::Event),
        ConcreteType::Composite(_) => write_fields(w, value, Encoding::ConstantPool),
    }
}

fn pool_reference(value: &TypedValue) -> Result<i64> {
    if value.is_null() {
        return Ok(0);
    }
    value
        .constant_pool_index()
        .ok_or_else(|| RecordingError::NotInterned {
            type_name: value.value_type().name().to_string(),
        })
}

fn write_builtin(
    w: &mut ByteWriter,
    builtin: Builtin,
    value: &TypedValue,
    encoding: Encoding,
) -> Result<()> {
    let Some(scalar) = value.scalar() else {
        write_null(w, builtin);
        return Ok(());
    };
    match scalar {
        Scalar::Byte(v) => w.write_byte(*v as u8),
        Scalar::Char(v) => w.write_char(*v),
        Scalar::Short(v) => w.write_short(*v),
        Scalar::Int(v) => w.write_int(*v),
        Scalar::Long(v) => w.write_long(*v),
        Scalar::Float(v) => w.write_float(*v),
        Scalar::Double(v) => w.write_double(*v),
        Scalar::Boolean(v) => w.write_boolean(*v),
        Scalar::String(s) => match (encoding, value.constant_pool_index()) {
            (Encoding::ConstantPool, Some(index)) if !s.is_empty() => w.write_string_ref(index),
            _ => w.write_compact_utf(Some(s)),
        },
    };
    Ok(())
}

fn write_null(w: &mut ByteWriter, builtin: Builtin) {
    match builtin {
        Builtin::Byte => w.write_byte(0),
        Builtin::Char => w.write_char('\0'),
        Builtin::Short => w.write_short(0),
        Builtin::Int => w.write_int(0),
        Builtin::Long => w.write_long(0),
        Builtin::Float => w.write_float(0.0),
        Builtin::Double => w.write_double(0.0),
        Builtin::Boolean => w.write_boolean(false),
        Builtin::String => w.write_compact_utf(None),
    };
}
