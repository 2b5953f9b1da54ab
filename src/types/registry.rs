use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{
    jdk, Builtin, BuiltinType, CompositeType, ConcreteType, Type, TypeSpec, TypeStructureBuilder,
};
use crate::error::{RecordingError, Result};
use crate::metadata::Metadata;
use crate::pool::ConstantPools;
use crate::type_ids::TypeIdGenerator;
use crate::value::{FieldValueBuilder, Scalar, TypedFieldValue, TypedValue};

/// Type registry of one recording session.
///
/// Owns the id generator, the metadata (every registered type plus the
/// schema string table) and the constant pools. It is `Send + Sync`; all
/// methods take `&self`.
#[derive(Debug)]
pub struct Types {
    ids: TypeIdGenerator,
    builtins: Vec<Arc<BuiltinType>>,
    metadata: RwLock<Metadata>,
    pools: ConstantPools,
}

impl Types {
    /// A registry with the built-in types and the JDK catalog.
    pub fn new() -> Result<Self> {
        let types = Self::builtins_only();
        jdk::register(&types)?;
        tracing::debug!(
            "Type registry ready with {} types",
            types.read_metadata().len()
        );
        Ok(types)
    }

    /// A registry holding only the built-in types.
    pub fn builtins_only() -> Self {
        let ids = TypeIdGenerator::new();
        let pools = ConstantPools::new();
        let mut metadata = Metadata::new();
        let builtins: Vec<Arc<BuiltinType>> = Builtin::ALL
            .into_iter()
            .map(|b| Arc::new(BuiltinType::new(ids.get_or_create(b.type_name()), b)))
            .collect();
        for builtin in &builtins {
            let concrete = ConcreteType::Builtin(Arc::clone(builtin));
            if builtin.has_constant_pool() {
                pools.register(&concrete);
            }
            metadata.register(concrete);
        }
        Self {
            ids,
            builtins,
            metadata: RwLock::new(metadata),
            pools,
        }
    }

    pub fn builtin(&self, builtin: Builtin) -> Type {
        Type::Builtin(Arc::clone(&self.builtins[builtin.index()]))
    }

    /// Look up a type by name. When it does not exist and `as_resolvable`
    /// is set, a pending forward reference is returned instead; it starts
    /// working once a type of that name is registered and
    /// [`Types::resolve_all`] has run.
    pub fn get_type(&self, name: &str, as_resolvable: bool) -> Option<Type> {
        if let Some(found) = self.read_metadata().get(name) {
            return Some(found.clone().into());
        }
        if !as_resolvable {
            return None;
        }
        let mut metadata = self.write_metadata();
        // Registered between the two locks.
        if let Some(found) = metadata.get(name) {
            return Some(found.clone().into());
        }
        Some(Type::Resolvable(metadata.pending(name)))
    }

    /// Register a composite type, or return the type already registered
    /// under `name`. `declare` only runs when the type is new.
    ///
    /// `declare` runs without holding the registry lock. When two threads
    /// register the same new name at once both callbacks may run; the first
    /// to take the write lock wins and the other structure is dropped, so
    /// both callers get the same type back. Callbacks should not have side
    /// effects beyond describing the structure.
    pub fn get_or_add<F>(&self, name: &str, supertype: Option<&str>, declare: F) -> Result<Type>
    where
        F: FnOnce(&mut TypeStructureBuilder<'_>) -> Result<()>,
    {
        if Builtin::of_name(name).is_some() {
            return Err(RecordingError::BuiltinNameClash {
                name: name.to_string(),
            });
        }
        if let Some(existing) = self.read_metadata().get(name) {
            return Ok(existing.clone().into());
        }

        // The callback may look up other types, so it runs without the lock.
        let mut builder = TypeStructureBuilder::new(self);
        declare(&mut builder)?;
        let structure = builder.finish();

        let mut metadata = self.write_metadata();
        if let Some(existing) = metadata.get(name) {
            return Ok(existing.clone().into());
        }
        let id = self.ids.get_or_create(name);
        let composite = CompositeType::new_arc(id, name, supertype, structure);
        let concrete = ConcreteType::Composite(Arc::clone(&composite));
        if composite.has_constant_pool() {
            self.pools.register(&concrete);
        }
        metadata.register(concrete);
        tracing::debug!(
            "Registered type {} (id {}, supertype {:?}, {} fields)",
            name,
            id,
            supertype,
            composite.fields().len()
        );
        Ok(Type::Composite(composite))
    }

    /// Resolve every pending forward reference whose target now exists.
    /// Returns the number still pending. Safe to call repeatedly.
    pub fn resolve_all(&self) -> usize {
        self.write_metadata().resolve_all()
    }

    pub fn unresolved_count(&self) -> usize {
        self.read_metadata().unresolved_count()
    }

    /// Build a value of `value_type` from a scalar. A simple composite type
    /// wraps the scalar into its single field. Pool-backed values come back
    /// interned.
    pub fn as_value(&self, value_type: &Type, value: impl Into<Scalar>) -> Result<TypedValue> {
        self.value_of(&value_type.concrete()?, value.into())
    }

    /// Build a composite value by populating its fields in `build`.
    pub fn as_value_with<'a, F>(&'a self, value_type: &Type, build: F) -> Result<TypedValue>
    where
        F: FnOnce(&mut FieldValueBuilder<'a>) -> Result<()>,
    {
        let concrete = value_type.concrete()?;
        if concrete.is_builtin() {
            return Err(RecordingError::IncompatibleValue {
                type_name: concrete.name().to_string(),
                detail: "a field map".to_string(),
            });
        }
        let mut builder = FieldValueBuilder::new(self, concrete);
        build(&mut builder)?;
        Ok(self.intern(builder.finish()))
    }

    /// The canonical null value of `value_type`.
    pub fn null_value(&self, value_type: &Type) -> Result<TypedValue> {
        Ok(TypedValue::null(value_type.concrete()?))
    }

    pub fn constant_pools(&self) -> &ConstantPools {
        &self.pools
    }

    /// Run `f` with shared access to the metadata.
    pub fn with_metadata<R>(&self, f: impl FnOnce(&Metadata) -> R) -> R {
        f(&self.read_metadata())
    }

    pub(crate) fn type_for_field(&self, spec: TypeSpec<'_>) -> Type {
        match spec {
            TypeSpec::Type(t) => t,
            TypeSpec::Builtin(b) => self.builtin(b),
            TypeSpec::Named(name) => match Builtin::of_name(name) {
                Some(b) => self.builtin(b),
                // Always `Some` when asking for a resolvable.
                None => self
                    .get_type(name, true)
                    .unwrap_or_else(|| Type::Resolvable(self.write_metadata().pending(name))),
            },
        }
    }

    pub(crate) fn existing_type(&self, spec: TypeSpec<'_>) -> Result<Type> {
        match spec {
            TypeSpec::Type(t) => Ok(t),
            TypeSpec::Builtin(b) => Ok(self.builtin(b)),
            TypeSpec::Named(name) => {
                self.get_type(name, false)
                    .ok_or_else(|| RecordingError::UnknownType {
                        name: name.to_string(),
                    })
            }
        }
    }

    /// Wrap an already built value into the single field of a simple type.
    pub(crate) fn wrap_simple(&self, simple: &ConcreteType, inner: TypedValue) -> Result<TypedValue> {
        let field = simple.fields()[0].clone();
        let mut fields = BTreeMap::new();
        fields.insert(field.name().to_string(), TypedFieldValue::new(field, inner));
        Ok(self.intern(TypedValue::from_fields(simple.clone(), fields)))
    }

    fn value_of(&self, value_type: &ConcreteType, scalar: Scalar) -> Result<TypedValue> {
        match value_type {
            ConcreteType::Builtin(b) if b.builtin().accepts(&scalar) => {
                Ok(self.intern(TypedValue::from_scalar(value_type.clone(), scalar)))
            }
            ConcreteType::Composite(c) if c.is_simple() => {
                let inner_type = c.fields()[0].field_type().concrete()?;
                let inner = self.value_of(&inner_type, scalar)?;
                self.wrap_simple(value_type, inner)
            }
            _ => Err(RecordingError::IncompatibleValue {
                type_name: value_type.name().to_string(),
                detail: scalar.to_string(),
            }),
        }
    }

    fn intern(&self, value: TypedValue) -> TypedValue {
        if value.value_type().has_constant_pool() {
            self.pools.add_or_get(value)
        } else {
            value
        }
    }

    fn read_metadata(&self) -> RwLockReadGuard<'_, Metadata> {
        self.metadata.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_metadata(&self) -> RwLockWriteGuard<'_, Metadata> {
        self.metadata.write().unwrap_or_else(PoisonError::into_inner)
    }
}
