//! Type system of the recording.
//!
//! A [`Type`] is one of four variants:
//!
//! - [`Type::Builtin`]: primitives and `java.lang.String`, leaf types without fields
//! - [`Type::Composite`]: declared types owning fields and annotations
//! - [`Type::Resolvable`]: a named forward reference that delegates to a
//!   concrete type once [`Types::resolve_all`] has found it
//! - [`Type::SelfType`]: placeholder for "the type being declared", only valid
//!   inside a [`TypeStructureBuilder`] callback
//!
//! Code that needs a type's data goes through [`Type::concrete`], which yields
//! a [`ConcreteType`] (built-in or composite) or an invalid-state error for
//! references that are not resolved yet.
//!
//! Fields never hold a strong reference to their own type or to a type
//! registered after them: self references and forward references are stored
//! as [`ResolvableType`]s pointing at a weak handle. Strong edges only point
//! at types that already existed, so the type graph cannot form `Arc` cycles.

mod builtin;
mod field;
pub mod jdk;
mod registry;
mod structure;

pub use builtin::{Builtin, BuiltinType};
pub use field::{Annotation, TypedField, TypedFieldBuilder};
pub use registry::Types;
pub use structure::{TypeSpec, TypeStructure, TypeStructureBuilder};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock, Weak};

use crate::error::{RecordingError, Result};
use crate::type_ids::TypeId;
use crate::value::Scalar;

/// Supertype shared by all event types.
pub const EVENT_SUPER_TYPE: &str = "jdk.jfr.Event";

/// Supertype shared by all annotation types.
pub const ANNOTATION_SUPER_TYPE: &str = "java.lang.annotation.Annotation";

/// Name reported by the self-type placeholder.
pub const SELF_TYPE_NAME: &str = "<self>";

/// A registered, user-declared type.
#[derive(Debug)]
pub struct CompositeType {
    id: TypeId,
    name: String,
    supertype: Option<String>,
    fields: Vec<TypedField>,
    annotations: Vec<Annotation>,
    constant_pool: bool,
    simple: bool,
}

impl CompositeType {
    /// Build the type, rewriting every self-type placeholder among the
    /// fields to a reference to the type itself.
    pub(crate) fn new_arc(
        id: TypeId,
        name: &str,
        supertype: Option<&str>,
        structure: TypeStructure,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<CompositeType>| {
            let fields: Vec<TypedField> = structure
                .fields
                .into_iter()
                .map(|field| field.replace_self_type(name, weak))
                .collect();
            let simple = fields.len() == 1
                && !fields[0].is_array()
                && matches!(fields[0].field_type(), Type::Builtin(_));
            CompositeType {
                id,
                name: name.to_string(),
                supertype: supertype.map(str::to_string),
                fields,
                annotations: structure.annotations,
                // Events are written inline, everything else is interned.
                constant_pool: supertype != Some(EVENT_SUPER_TYPE),
                simple,
            }
        })
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supertype(&self) -> Option<&str> {
        self.supertype.as_deref()
    }

    pub fn fields(&self) -> &[TypedField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&TypedField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn has_constant_pool(&self) -> bool {
        self.constant_pool
    }

    /// Exactly one non-array field of a built-in type.
    pub fn is_simple(&self) -> bool {
        self.simple
    }
}

#[derive(Debug)]
enum ResolvedTarget {
    Builtin(Arc<BuiltinType>),
    Composite(Weak<CompositeType>),
}

/// Forward reference to a type by name.
#[derive(Debug)]
pub struct ResolvableType {
    name: String,
    target: OnceLock<ResolvedTarget>,
}

impl ResolvableType {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            target: OnceLock::new(),
        }
    }

    fn resolved_to(name: &str, target: Weak<CompositeType>) -> Self {
        let resolvable = Self::new(name);
        // Freshly created, so the cell is empty.
        let _ = resolvable.target.set(ResolvedTarget::Composite(target));
        resolvable
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    /// Point this reference at `target`. Returns `false` if it was already
    /// resolved; the first resolution wins.
    pub(crate) fn resolve(&self, target: &ConcreteType) -> bool {
        let resolved = match target {
            ConcreteType::Builtin(b) => ResolvedTarget::Builtin(Arc::clone(b)),
            ConcreteType::Composite(c) => ResolvedTarget::Composite(Arc::downgrade(c)),
        };
        self.target.set(resolved).is_ok()
    }

    pub fn target(&self) -> Result<ConcreteType> {
        match self.target.get() {
            Some(ResolvedTarget::Builtin(b)) => Ok(ConcreteType::Builtin(Arc::clone(b))),
            Some(ResolvedTarget::Composite(weak)) => weak
                .upgrade()
                .map(ConcreteType::Composite)
                .ok_or_else(|| self.unresolved()),
            None => Err(self.unresolved()),
        }
    }

    fn unresolved(&self) -> RecordingError {
        RecordingError::UnresolvedType {
            name: self.name.clone(),
        }
    }
}

/// Handle to a type of any variant. Cheap to clone.
#[derive(Clone, Debug)]
pub enum Type {
    Builtin(Arc<BuiltinType>),
    Composite(Arc<CompositeType>),
    Resolvable(Arc<ResolvableType>),
    SelfType,
}

impl Type {
    /// The type name. Available for every variant, including unresolved
    /// forward references.
    pub fn name(&self) -> &str {
        match self {
            Type::Builtin(b) => b.name(),
            Type::Composite(c) => c.name(),
            Type::Resolvable(r) => r.name(),
            Type::SelfType => SELF_TYPE_NAME,
        }
    }

    /// The concrete type behind this handle.
    pub fn concrete(&self) -> Result<ConcreteType> {
        match self {
            Type::Builtin(b) => Ok(ConcreteType::Builtin(Arc::clone(b))),
            Type::Composite(c) => Ok(ConcreteType::Composite(Arc::clone(c))),
            Type::Resolvable(r) => r.target(),
            Type::SelfType => Err(RecordingError::UnresolvedType {
                name: SELF_TYPE_NAME.to_string(),
            }),
        }
    }

    pub fn is_resolved(&self) -> bool {
        match self {
            Type::Builtin(_) | Type::Composite(_) => true,
            Type::Resolvable(r) => r.is_resolved(),
            Type::SelfType => false,
        }
    }

    pub fn id(&self) -> Result<TypeId> {
        Ok(self.concrete()?.id())
    }

    pub fn supertype(&self) -> Result<Option<String>> {
        Ok(self.concrete()?.supertype().map(str::to_string))
    }

    pub fn is_builtin(&self) -> Result<bool> {
        Ok(self.concrete()?.is_builtin())
    }

    pub fn is_simple(&self) -> Result<bool> {
        Ok(self.concrete()?.is_simple())
    }

    pub fn has_constant_pool(&self) -> Result<bool> {
        Ok(self.concrete()?.has_constant_pool())
    }

    /// True when both handles name the same type. Unresolved references
    /// compare by name.
    pub fn is_same(&self, other: &Type) -> bool {
        match (self.concrete(), other.concrete()) {
            (Ok(a), Ok(b)) => a == b,
            (Err(_), Err(_)) => self.name() == other.name(),
            _ => false,
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for Type {}

impl From<ConcreteType> for Type {
    fn from(value: ConcreteType) -> Self {
        match value {
            ConcreteType::Builtin(b) => Type::Builtin(b),
            ConcreteType::Composite(c) => Type::Composite(c),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A type whose data is available: built-in or composite.
#[derive(Clone, Debug)]
pub enum ConcreteType {
    Builtin(Arc<BuiltinType>),
    Composite(Arc<CompositeType>),
}

impl ConcreteType {
    pub fn id(&self) -> TypeId {
        match self {
            ConcreteType::Builtin(b) => b.id(),
            ConcreteType::Composite(c) => c.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ConcreteType::Builtin(b) => b.name(),
            ConcreteType::Composite(c) => c.name(),
        }
    }

    pub fn supertype(&self) -> Option<&str> {
        match self {
            ConcreteType::Builtin(_) => None,
            ConcreteType::Composite(c) => c.supertype(),
        }
    }

    pub fn fields(&self) -> &[TypedField] {
        match self {
            ConcreteType::Builtin(_) => &[],
            ConcreteType::Composite(c) => c.fields(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&TypedField> {
        self.fields().iter().find(|f| f.name() == name)
    }

    pub fn annotations(&self) -> &[Annotation] {
        match self {
            ConcreteType::Builtin(_) => &[],
            ConcreteType::Composite(c) => c.annotations(),
        }
    }

    pub fn builtin(&self) -> Option<Builtin> {
        match self {
            ConcreteType::Builtin(b) => Some(b.builtin()),
            ConcreteType::Composite(_) => None,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, ConcreteType::Builtin(_))
    }

    pub fn is_simple(&self) -> bool {
        match self {
            ConcreteType::Builtin(_) => false,
            ConcreteType::Composite(c) => c.is_simple(),
        }
    }

    pub fn is_event(&self) -> bool {
        self.supertype() == Some(EVENT_SUPER_TYPE)
    }

    pub fn has_constant_pool(&self) -> bool {
        match self {
            ConcreteType::Builtin(b) => b.has_constant_pool(),
            ConcreteType::Composite(c) => c.has_constant_pool(),
        }
    }

    /// Whether a typed value can be stored where this type is expected.
    pub fn can_accept(&self, value: &crate::value::TypedValue) -> bool {
        value.value_type() == self
    }

    /// Whether a raw scalar can be turned into a value of this type. Simple
    /// composites delegate to their single field.
    pub fn accepts_scalar(&self, scalar: &Scalar) -> bool {
        match self {
            ConcreteType::Builtin(b) => b.builtin().accepts(scalar),
            ConcreteType::Composite(c) => {
                c.is_simple()
                    && c.fields()[0]
                        .field_type()
                        .concrete()
                        .is_ok_and(|t| t.accepts_scalar(scalar))
            }
        }
    }
}

impl PartialEq for ConcreteType {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id() && self.name() == other.name()
    }
}

impl Eq for ConcreteType {}

impl Hash for ConcreteType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for ConcreteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
