use super::{Annotation, Builtin, Type, TypedField, TypedFieldBuilder, Types};
use crate::error::Result;

/// Ways to name a type when declaring fields and annotations.
#[derive(Clone, Debug)]
pub enum TypeSpec<'a> {
    Type(Type),
    Builtin(Builtin),
    Named(&'a str),
}

impl From<Type> for TypeSpec<'_> {
    fn from(value: Type) -> Self {
        TypeSpec::Type(value)
    }
}

impl From<&Type> for TypeSpec<'_> {
    fn from(value: &Type) -> Self {
        TypeSpec::Type(value.clone())
    }
}

impl From<Builtin> for TypeSpec<'_> {
    fn from(value: Builtin) -> Self {
        TypeSpec::Builtin(value)
    }
}

impl<'a> From<&'a str> for TypeSpec<'a> {
    fn from(value: &'a str) -> Self {
        TypeSpec::Named(value)
    }
}

impl<'a> From<&'a String> for TypeSpec<'a> {
    fn from(value: &'a String) -> Self {
        TypeSpec::Named(value)
    }
}

/// Fields and annotations collected for a type that is about to be created.
#[derive(Debug, Default)]
pub struct TypeStructure {
    pub(crate) fields: Vec<TypedField>,
    pub(crate) annotations: Vec<Annotation>,
}

impl TypeStructure {
    pub fn fields(&self) -> &[TypedField] {
        &self.fields
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// Collects the structure of a new type inside [`Types::get_or_add`].
///
/// Fields named by a type that is not registered yet become forward
/// references, so declaration order between types does not matter as long as
/// [`Types::resolve_all`] runs before the first chunk.
pub struct TypeStructureBuilder<'a> {
    types: &'a Types,
    structure: TypeStructure,
}

impl<'a> TypeStructureBuilder<'a> {
    pub(crate) fn new(types: &'a Types) -> Self {
        Self {
            types,
            structure: TypeStructure::default(),
        }
    }

    /// Placeholder for the type under construction. Replaced by the real
    /// type as soon as its field list is final.
    pub fn self_type(&self) -> Type {
        Type::SelfType
    }

    pub fn types(&self) -> &'a Types {
        self.types
    }

    pub fn add_field<'s>(&mut self, name: &str, field_type: impl Into<TypeSpec<'s>>) -> &mut Self {
        let field_type = self.types.type_for_field(field_type.into());
        self.structure
            .fields
            .push(TypedField::new(name, field_type));
        self
    }

    pub fn add_field_with<'s, F>(
        &mut self,
        name: &str,
        field_type: impl Into<TypeSpec<'s>>,
        declare: F,
    ) -> Result<&mut Self>
    where
        F: FnOnce(&mut TypedFieldBuilder<'a>) -> Result<()>,
    {
        let field_type = self.types.type_for_field(field_type.into());
        let mut builder = TypedFieldBuilder::new(self.types, name, field_type);
        declare(&mut builder)?;
        self.structure.fields.push(builder.build());
        Ok(self)
    }

    pub fn add_annotation<'s>(
        &mut self,
        annotation_type: impl Into<TypeSpec<'s>>,
        value: Option<&str>,
    ) -> Result<&mut Self> {
        let annotation_type = self.types.existing_type(annotation_type.into())?;
        self.structure
            .annotations
            .push(Annotation::new(&annotation_type, value)?);
        Ok(self)
    }

    pub(crate) fn finish(self) -> TypeStructure {
        self.structure
    }
}
