//! Registry of every type in a recording and the schema ("metadata event")
//! describing them.
//!
//! The metadata event body is a string table followed by an element tree:
//!
//! ```text
//! root
//! ├── metadata
//! │   └── class (name, id [, superType] [, simpleType])   one per type
//! │       ├── field (name, class [, dimension] [, constantPool])
//! │       │   └── annotation (class [, value])
//! │       └── annotation (class [, value])
//! └── region
//! ```
//!
//! Every element name, attribute key and attribute value is written as an
//! index into the string table, so all of them are stored while types are
//! registered.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::chunk::constants::METADATA_EVENT_ID;
use crate::error::{RecordingError, Result};
use crate::type_ids::TypeId;
use crate::types::{Annotation, Builtin, ConcreteType, ResolvableType, TypedField};
use crate::writer::ByteWriter;

const VAL_1: &str = "1";
const CLASS_KEY: &str = "class";
const FIELD_KEY: &str = "field";
const NAME_KEY: &str = "name";
const ID_KEY: &str = "id";
const VALUE_KEY: &str = "value";
const SUPER_TYPE_KEY: &str = "superType";
const CONSTANT_POOL_KEY: &str = "constantPool";
const SIMPLE_TYPE_KEY: &str = "simpleType";
const ROOT_KEY: &str = "root";
const METADATA_KEY: &str = "metadata";
const TRUE_VALUE: &str = "true";
const REGION_KEY: &str = "region";
const DIMENSION_KEY: &str = "dimension";
const ANNOTATION_KEY: &str = "annotation";

/// Strings every schema needs, in the order they enter the table.
const SCHEMA_STRINGS: [&str; 15] = [
    VAL_1,
    CLASS_KEY,
    FIELD_KEY,
    NAME_KEY,
    ID_KEY,
    VALUE_KEY,
    SUPER_TYPE_KEY,
    CONSTANT_POOL_KEY,
    SIMPLE_TYPE_KEY,
    ROOT_KEY,
    METADATA_KEY,
    TRUE_VALUE,
    REGION_KEY,
    DIMENSION_KEY,
    ANNOTATION_KEY,
];

/// Deduplicated strings with stable, insertion-ordered indices.
#[derive(Debug, Default)]
pub struct StringTable {
    indices: HashMap<String, usize>,
    strings: Vec<String>,
}

impl StringTable {
    /// Store `value` unless present; returns its index either way.
    pub fn store(&mut self, value: &str) -> usize {
        if let Some(&index) = self.indices.get(value) {
            return index;
        }
        let index = self.strings.len();
        self.strings.push(value.to_string());
        self.indices.insert(value.to_string(), index);
        index
    }

    pub fn index(&self, value: &str) -> Option<usize> {
        self.indices.get(value).copied()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

/// Type registry and string table of one recording session.
#[derive(Debug)]
pub struct Metadata {
    by_name: HashMap<String, ConcreteType>,
    by_id: BTreeMap<TypeId, ConcreteType>,
    strings: StringTable,
    unresolved: HashMap<String, Arc<ResolvableType>>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}

impl Metadata {
    pub fn new() -> Self {
        let mut strings = StringTable::default();
        for s in SCHEMA_STRINGS {
            strings.store(s);
        }
        Self {
            by_name: HashMap::new(),
            by_id: BTreeMap::new(),
            strings,
            unresolved: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ConcreteType> {
        self.by_name.get(name)
    }

    pub fn get_by_id(&self, id: TypeId) -> Option<&ConcreteType> {
        self.by_id.get(&id)
    }

    /// All types in registration order.
    pub fn types(&self) -> impl Iterator<Item = &ConcreteType> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Add a type and the strings its schema entry needs. A type whose name
    /// is already taken is ignored.
    pub fn register(&mut self, value_type: ConcreteType) {
        if self.by_name.contains_key(value_type.name()) {
            return;
        }
        self.store_type_strings(&value_type);
        self.by_name
            .insert(value_type.name().to_string(), value_type.clone());
        self.by_id.insert(value_type.id(), value_type);
    }

    /// The pending forward reference for `name`, created on first request.
    pub fn pending(&mut self, name: &str) -> Arc<ResolvableType> {
        Arc::clone(
            self.unresolved
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(ResolvableType::new(name))),
        )
    }

    /// Resolve every pending reference whose target is now registered.
    /// Returns how many remain pending.
    pub fn resolve_all(&mut self) -> usize {
        let by_name = &self.by_name;
        self.unresolved.retain(|name, pending| match by_name.get(name) {
            Some(target) => {
                pending.resolve(target);
                tracing::debug!("Resolved forward reference to {} (id {})", name, target.id());
                false
            }
            None => true,
        });
        self.unresolved.len()
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }

    pub fn unresolved_names(&self) -> impl Iterator<Item = &str> {
        self.unresolved.keys().map(String::as_str)
    }

    pub fn string_index(&self, value: &str) -> Result<usize> {
        self.strings
            .index(value)
            .ok_or_else(|| RecordingError::UnknownString {
                value: value.to_string(),
            })
    }

    /// Append the self-sized metadata event to `out`.
    pub fn write_meta_event(
        &self,
        out: &mut ByteWriter,
        start_ticks: i64,
        duration: i64,
    ) -> Result<()> {
        let mut body = ByteWriter::default();
        body.write_long(METADATA_EVENT_ID)
            .write_long(start_ticks)
            .write_long(duration)
            // metadata id
            .write_long(0)
            .write_len(self.strings.len());
        for s in self.strings.iter() {
            body.write_compact_utf(Some(s));
        }
        self.write_root(&mut body)?;

        let total = body.self_sized_len();
        out.write_len(total).write_bytes(body.as_bytes());
        Ok(())
    }

    fn write_root(&self, w: &mut ByteWriter) -> Result<()> {
        self.element(w, ROOT_KEY, 0)?;
        // metadata and region
        w.write_len(2);

        self.element(w, METADATA_KEY, 0)?;
        w.write_len(self.by_id.len());
        for value_type in self.by_id.values() {
            self.write_type(w, value_type)?;
        }

        self.element(w, REGION_KEY, 0)?;
        w.write_len(0);
        Ok(())
    }

    fn write_type(&self, w: &mut ByteWriter, value_type: &ConcreteType) -> Result<()> {
        let mut attributes = 2;
        if value_type.supertype().is_some() {
            attributes += 1;
        }
        if value_type.is_simple() {
            attributes += 1;
        }
        self.element(w, CLASS_KEY, attributes)?;
        self.attribute(w, NAME_KEY, value_type.name())?;
        self.attribute(w, ID_KEY, &value_type.id().to_string())?;
        if let Some(supertype) = value_type.supertype() {
            self.attribute(w, SUPER_TYPE_KEY, supertype)?;
        }
        if value_type.is_simple() {
            self.attribute(w, SIMPLE_TYPE_KEY, TRUE_VALUE)?;
        }

        w.write_len(value_type.fields().len() + value_type.annotations().len());
        for field in value_type.fields() {
            self.write_field(w, field)?;
        }
        for annotation in value_type.annotations() {
            self.write_annotation(w, annotation)?;
        }
        Ok(())
    }

    fn write_field(&self, w: &mut ByteWriter, field: &TypedField) -> Result<()> {
        let field_type = field.field_type().concrete()?;
        // Strings are pooled but readers must not see them marked as such.
        let constant_pool =
            field_type.has_constant_pool() && field_type.builtin() != Some(Builtin::String);

        let mut attributes = 2;
        if field.is_array() {
            attributes += 1;
        }
        if constant_pool {
            attributes += 1;
        }
        self.element(w, FIELD_KEY, attributes)?;
        self.attribute(w, NAME_KEY, field.name())?;
        self.attribute(w, CLASS_KEY, &field_type.id().to_string())?;
        if field.is_array() {
            self.attribute(w, DIMENSION_KEY, VAL_1)?;
        }
        if constant_pool {
            self.attribute(w, CONSTANT_POOL_KEY, TRUE_VALUE)?;
        }

        w.write_len(field.annotations().len());
        for annotation in field.annotations() {
            self.write_annotation(w, annotation)?;
        }
        Ok(())
    }

    fn write_annotation(&self, w: &mut ByteWriter, annotation: &Annotation) -> Result<()> {
        let attributes = if annotation.value().is_some() { 2 } else { 1 };
        self.element(w, ANNOTATION_KEY, attributes)?;
        self.attribute(
            w,
            CLASS_KEY,
            &annotation.annotation_type().id().to_string(),
        )?;
        if let Some(value) = annotation.value() {
            self.attribute(w, VALUE_KEY, value)?;
        }
        // no children
        w.write_len(0);
        Ok(())
    }

    fn element(&self, w: &mut ByteWriter, name: &str, attributes: usize) -> Result<()> {
        w.write_len(self.string_index(name)?).write_len(attributes);
        Ok(())
    }

    fn attribute(&self, w: &mut ByteWriter, key: &str, value: &str) -> Result<()> {
        w.write_len(self.string_index(key)?)
            .write_len(self.string_index(value)?);
        Ok(())
    }

    fn store_type_strings(&mut self, value_type: &ConcreteType) {
        self.strings.store(value_type.name());
        if let Some(supertype) = value_type.supertype() {
            self.strings.store(supertype);
        }
        self.strings.store(&value_type.id().to_string());
        for field in value_type.fields() {
            self.strings.store(field.name());
            self.store_annotation_strings(field.annotations());
        }
        self.store_annotation_strings(value_type.annotations());
    }

    fn store_annotation_strings(&mut self, annotations: &[Annotation]) {
        for annotation in annotations {
            if let Some(value) = annotation.value() {
                self.strings.store(value);
            }
        }
    }
}
