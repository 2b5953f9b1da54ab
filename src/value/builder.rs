use std::collections::BTreeMap;

use super::{Scalar, TypedFieldValue, TypedValue};
use crate::error::{RecordingError, Result};
use crate::types::{ConcreteType, TypedField, Types};

/// Populates the fields of a composite value inside [`Types::as_value_with`].
///
/// Naming a field the type does not declare is a no-op, so helpers shared
/// between several types can populate a superset of fields. Every other
/// mismatch fails the call.
pub struct FieldValueBuilder<'a> {
    types: &'a Types,
    value_type: ConcreteType,
    fields: BTreeMap<String, TypedFieldValue>,
}

impl<'a> FieldValueBuilder<'a> {
    pub(crate) fn new(types: &'a Types, value_type: ConcreteType) -> Self {
        Self {
            types,
            value_type,
            fields: BTreeMap::new(),
        }
    }

    pub fn value_type(&self) -> &ConcreteType {
        &self.value_type
    }

    pub fn types(&self) -> &'a Types {
        self.types
    }

    /// Set a field from a bare scalar. Simple composite field types wrap the
    /// scalar into their single field.
    pub fn put(&mut self, name: &str, value: impl Into<Scalar>) -> Result<&mut Self> {
        let Some(field) = self.declared(name) else {
            return Ok(self);
        };
        let value = self.types.as_value(field.field_type(), value)?;
        self.store(field, vec![value])
    }

    pub fn put_array<I>(&mut self, name: &str, values: I) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Into<Scalar>,
    {
        let Some(field) = self.declared_array(name)? else {
            return Ok(self);
        };
        let values = values
            .into_iter()
            .map(|v| self.types.as_value(field.field_type(), v))
            .collect::<Result<Vec<_>>>()?;
        self.store(field, values)
    }

    pub fn put_value(&mut self, name: &str, value: TypedValue) -> Result<&mut Self> {
        let Some(field) = self.declared(name) else {
            return Ok(self);
        };
        let value = self.accept(&field, value)?;
        self.store(field, vec![value])
    }

    pub fn put_values<I>(&mut self, name: &str, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = TypedValue>,
    {
        let Some(field) = self.declared_array(name)? else {
            return Ok(self);
        };
        let values = values
            .into_iter()
            .map(|v| self.accept(&field, v))
            .collect::<Result<Vec<_>>>()?;
        self.store(field, values)
    }

    /// Build a composite field value in place.
    pub fn put_with<F>(&mut self, name: &str, build: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut FieldValueBuilder<'a>) -> Result<()>,
    {
        let Some(field) = self.declared(name) else {
            return Ok(self);
        };
        let value = self.types.as_value_with(field.field_type(), build)?;
        self.store(field, vec![value])
    }

    /// Build one element of a composite array field per callback.
    pub fn put_array_with<I, F>(&mut self, name: &str, builds: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(&mut FieldValueBuilder<'a>) -> Result<()>,
    {
        let Some(field) = self.declared_array(name)? else {
            return Ok(self);
        };
        let values = builds
            .into_iter()
            .map(|build| self.types.as_value_with(field.field_type(), build))
            .collect::<Result<Vec<_>>>()?;
        self.store(field, values)
    }

    pub(crate) fn finish(self) -> TypedValue {
        TypedValue::from_fields(self.value_type, self.fields)
    }

    fn declared(&self, name: &str) -> Option<TypedField> {
        let field = self.value_type.field(name).cloned();
        if field.is_none() {
            tracing::trace!(
                "{}: ignoring value for undeclared field {}",
                self.value_type.name(),
                name
            );
        }
        field
    }

    fn declared_array(&self, name: &str) -> Result<Option<TypedField>> {
        match self.declared(name) {
            Some(field) if !field.is_array() => Err(RecordingError::NotAnArray {
                field: field.name().to_string(),
            }),
            other => Ok(other),
        }
    }

    fn accept(&self, field: &TypedField, value: TypedValue) -> Result<TypedValue> {
        let field_type = field.field_type().concrete()?;
        if field_type.can_accept(&value) {
            return Ok(value);
        }
        if field_type.is_simple() {
            let inner = &field_type.fields()[0];
            if inner.field_type().concrete()?.can_accept(&value) {
                return self.types.wrap_simple(&field_type, value);
            }
        }
        Err(RecordingError::IncompatibleValue {
            type_name: field_type.name().to_string(),
            detail: format!("a value of type {}", value.value_type().name()),
        })
    }

    fn store(&mut self, field: TypedField, values: Vec<TypedValue>) -> Result<&mut Self> {
        let name = field.name().to_string();
        let value = TypedFieldValue::array(field, values)?;
        self.fields.insert(name, value);
        Ok(self)
    }
}
