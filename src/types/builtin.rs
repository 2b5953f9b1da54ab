use crate::type_ids::TypeId;
use crate::value::Scalar;

/// The built-in leaf types of the format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    String,
}

impl Builtin {
    /// All built-ins in registration order.
    pub const ALL: [Builtin; 9] = [
        Builtin::Byte,
        Builtin::Char,
        Builtin::Short,
        Builtin::Int,
        Builtin::Long,
        Builtin::Float,
        Builtin::Double,
        Builtin::Boolean,
        Builtin::String,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            Builtin::Byte => "byte",
            Builtin::Char => "char",
            Builtin::Short => "short",
            Builtin::Int => "int",
            Builtin::Long => "long",
            Builtin::Float => "float",
            Builtin::Double => "double",
            Builtin::Boolean => "boolean",
            Builtin::String => "java.lang.String",
        }
    }

    pub fn of_name(name: &str) -> Option<Builtin> {
        Self::ALL.into_iter().find(|b| b.type_name() == name)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Strict match between the built-in and the scalar's variant; no
    /// widening is performed.
    pub fn accepts(self, scalar: &Scalar) -> bool {
        scalar.builtin() == self
    }
}

/// Registered instance of a built-in type.
#[derive(Debug)]
pub struct BuiltinType {
    id: TypeId,
    builtin: Builtin,
}

impl BuiltinType {
    pub(crate) fn new(id: TypeId, builtin: Builtin) -> Self {
        Self { id, builtin }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.builtin.type_name()
    }

    pub fn builtin(&self) -> Builtin {
        self.builtin
    }

    /// Strings are interned in a constant pool; the other built-ins are
    /// always written inline.
    pub fn has_constant_pool(&self) -> bool {
        self.builtin == Builtin::String
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for b in Builtin::ALL {
            assert_eq!(Builtin::of_name(b.type_name()), Some(b));
        }
        assert_eq!(Builtin::of_name("java.lang.Thread"), None);
    }

    #[test]
    fn test_accepts_is_strict() {
        assert!(Builtin::Int.accepts(&Scalar::Int(1)));
        assert!(!Builtin::Long.accepts(&Scalar::Int(1)));
        assert!(Builtin::String.accepts(&Scalar::from("x")));
    }
}
