//! Immutable typed values.
//!
//! A [`TypedValue`] is either null, a [`Scalar`] of a built-in type, or a
//! map of field values of a composite type. Values are built through
//! [`crate::Types::as_value`] and [`crate::Types::as_value_with`], which
//! check acceptance and intern pool-backed values on the way out.

mod builder;

pub use builder::FieldValueBuilder;

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{RecordingError, Result};
use crate::types::{Builtin, ConcreteType, TypedField};

/// Raw payload of a built-in value.
#[derive(Clone, Debug)]
pub enum Scalar {
    Byte(i8),
    Char(char),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    String(String),
}

impl Scalar {
    /// The built-in type this payload belongs to.
    pub fn builtin(&self) -> Builtin {
        match self {
            Scalar::Byte(_) => Builtin::Byte,
            Scalar::Char(_) => Builtin::Char,
            Scalar::Short(_) => Builtin::Short,
            Scalar::Int(_) => Builtin::Int,
            Scalar::Long(_) => Builtin::Long,
            Scalar::Float(_) => Builtin::Float,
            Scalar::Double(_) => Builtin::Double,
            Scalar::Boolean(_) => Builtin::Boolean,
            Scalar::String(_) => Builtin::String,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

// Floats compare by bit pattern so that every scalar can key a constant pool.
impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Byte(a), Scalar::Byte(b)) => a == b,
            (Scalar::Char(a), Scalar::Char(b)) => a == b,
            (Scalar::Short(a), Scalar::Short(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Long(a), Scalar::Long(b)) => a == b,
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Double(a), Scalar::Double(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Boolean(a), Scalar::Boolean(b)) => a == b,
            (Scalar::String(a), Scalar::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Scalar {}

impl Hash for Scalar {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.builtin().hash(state);
        match self {
            Scalar::Byte(v) => v.hash(state),
            Scalar::Char(v) => v.hash(state),
            Scalar::Short(v) => v.hash(state),
            Scalar::Int(v) => v.hash(state),
            Scalar::Long(v) => v.hash(state),
            Scalar::Float(v) => v.to_bits().hash(state),
            Scalar::Double(v) => v.to_bits().hash(state),
            Scalar::Boolean(v) => v.hash(state),
            Scalar::String(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Byte(v) => write!(f, "byte {v}"),
            Scalar::Char(v) => write!(f, "char {v:?}"),
            Scalar::Short(v) => write!(f, "short {v}"),
            Scalar::Int(v) => write!(f, "int {v}"),
            Scalar::Long(v) => write!(f, "long {v}"),
            Scalar::Float(v) => write!(f, "float {v}"),
            Scalar::Double(v) => write!(f, "double {v}"),
            Scalar::Boolean(v) => write!(f, "boolean {v}"),
            Scalar::String(v) => write!(f, "string {v:?}"),
        }
    }
}

macro_rules! scalar_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from(value: $t) -> Self {
                    Scalar::$variant(value.into())
                }
            }
        )*
    };
}

scalar_from!(
    i8 => Byte,
    char => Char,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    bool => Boolean,
    String => String,
    &str => String,
    &String => String,
);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum Payload {
    Null,
    Scalar(Scalar),
    Fields(Arc<BTreeMap<String, TypedFieldValue>>),
}

/// A value of some concrete type.
///
/// Equality and hashing cover the type and the payload but not the constant
/// pool index, so an interned value equals the value it was interned from.
#[derive(Clone, Debug)]
pub struct TypedValue {
    value_type: ConcreteType,
    payload: Payload,
    cp_index: Option<i64>,
}

impl TypedValue {
    /// The canonical null value of `value_type`.
    pub fn null(value_type: ConcreteType) -> Self {
        Self {
            value_type,
            payload: Payload::Null,
            cp_index: None,
        }
    }

    pub(crate) fn from_scalar(value_type: ConcreteType, scalar: Scalar) -> Self {
        Self {
            value_type,
            payload: Payload::Scalar(scalar),
            cp_index: None,
        }
    }

    pub(crate) fn from_fields(
        value_type: ConcreteType,
        fields: BTreeMap<String, TypedFieldValue>,
    ) -> Self {
        Self {
            value_type,
            payload: Payload::Fields(Arc::new(fields)),
            cp_index: None,
        }
    }

    pub(crate) fn with_constant_pool_index(mut self, index: i64) -> Self {
        self.cp_index = Some(index);
        self
    }

    pub fn value_type(&self) -> &ConcreteType {
        &self.value_type
    }

    pub fn is_null(&self) -> bool {
        matches!(self.payload, Payload::Null)
    }

    /// Scalar payload of a built-in value; `None` for null and composite values.
    pub fn scalar(&self) -> Option<&Scalar> {
        match &self.payload {
            Payload::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Explicitly populated field value, if any.
    pub fn field(&self, name: &str) -> Option<&TypedFieldValue> {
        match &self.payload {
            Payload::Fields(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Index of this value in its type's constant pool. `None` until the
    /// value has been interned.
    pub fn constant_pool_index(&self) -> Option<i64> {
        self.cp_index
    }

    /// One entry per declared field, in declaration order. Fields that were
    /// never populated get the null value of their type, or an empty
    /// sequence for arrays.
    pub fn field_values(&self) -> Result<Vec<TypedFieldValue>> {
        let populated = match &self.payload {
            Payload::Fields(fields) => Some(fields),
            _ => None,
        };
        let mut out = Vec::with_capacity(self.value_type.fields().len());
        for field in self.value_type.fields() {
            if let Some(value) = populated.and_then(|p| p.get(field.name())) {
                out.push(value.clone());
                continue;
            }
            let value = if field.is_array() {
                TypedFieldValue::array(field.clone(), Vec::new())?
            } else {
                let null = TypedValue::null(field.field_type().concrete()?);
                TypedFieldValue::new(field.clone(), null)
            };
            out.push(value);
        }
        Ok(out)
    }
}

impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        self.value_type == other.value_type && self.payload == other.payload
    }
}

impl Eq for TypedValue {}

impl Hash for TypedValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value_type.hash(state);
        self.payload.hash(state);
    }
}

/// A field paired with its value or, for array fields, its values.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypedFieldValue {
    field: TypedField,
    values: Vec<TypedValue>,
}

impl TypedFieldValue {
    pub fn new(field: TypedField, value: TypedValue) -> Self {
        Self {
            field,
            values: vec![value],
        }
    }

    /// Fails when `field` is not an array and `values` does not hold exactly
    /// one element.
    pub fn array(field: TypedField, values: Vec<TypedValue>) -> Result<Self> {
        if !field.is_array() && values.len() != 1 {
            return Err(RecordingError::ArrayArity {
                field: field.name().to_string(),
                len: values.len(),
            });
        }
        Ok(Self { field, values })
    }

    pub fn field(&self) -> &TypedField {
        &self.field
    }

    /// The single value of a non-array field.
    pub fn value(&self) -> Option<&TypedValue> {
        if self.field.is_array() {
            None
        } else {
            self.values.first()
        }
    }

    pub fn values(&self) -> &[TypedValue] {
        &self.values
    }
}
