use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use super::{CompositeType, ConcreteType, ResolvableType, Type, TypeSpec, Types};
use super::ANNOTATION_SUPER_TYPE;
use crate::error::{RecordingError, Result};

/// An annotation attached to a type or a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Annotation {
    annotation_type: ConcreteType,
    value: Option<String>,
}

impl Annotation {
    /// Fails unless `annotation_type` extends `java.lang.annotation.Annotation`.
    pub fn new(annotation_type: &Type, value: Option<&str>) -> Result<Self> {
        let annotation_type = annotation_type.concrete()?;
        if annotation_type.supertype() != Some(ANNOTATION_SUPER_TYPE) {
            return Err(RecordingError::NotAnAnnotation {
                type_name: annotation_type.name().to_string(),
            });
        }
        Ok(Self {
            annotation_type,
            value: value.map(str::to_string),
        })
    }

    pub fn annotation_type(&self) -> &ConcreteType {
        &self.annotation_type
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// A named, typed slot of a composite type.
#[derive(Clone, Debug)]
pub struct TypedField {
    name: String,
    field_type: Type,
    array: bool,
    annotations: Vec<Annotation>,
}

impl TypedField {
    pub fn new(name: &str, field_type: Type) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            array: false,
            annotations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &Type {
        &self.field_type
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub(super) fn replace_self_type(mut self, owner: &str, owner_ref: &Weak<CompositeType>) -> Self {
        if matches!(self.field_type, Type::SelfType) {
            self.field_type = Type::Resolvable(Arc::new(ResolvableType::resolved_to(
                owner,
                owner_ref.clone(),
            )));
        }
        self
    }
}

impl PartialEq for TypedField {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.field_type == other.field_type
    }
}

impl Eq for TypedField {}

impl Hash for TypedField {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.field_type.name().hash(state);
    }
}

/// Declares a single field inside [`super::TypeStructureBuilder::add_field_with`].
pub struct TypedFieldBuilder<'a> {
    types: &'a Types,
    field: TypedField,
}

impl<'a> TypedFieldBuilder<'a> {
    pub(super) fn new(types: &'a Types, name: &str, field_type: Type) -> Self {
        Self {
            types,
            field: TypedField::new(name, field_type),
        }
    }

    pub fn as_array(&mut self) -> &mut Self {
        self.field.array = true;
        self
    }

    pub fn add_annotation<'s>(
        &mut self,
        annotation_type: impl Into<TypeSpec<'s>>,
        value: Option<&str>,
    ) -> Result<&mut Self> {
        let annotation_type = self.types.existing_type(annotation_type.into())?;
        self.field
            .annotations
            .push(Annotation::new(&annotation_type, value)?);
        Ok(self)
    }

    pub(super) fn build(self) -> TypedField {
        self.field
    }
}
