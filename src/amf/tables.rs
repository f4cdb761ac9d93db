//! Reference tables
//!
//! Three append-only tables for AMF3 (strings, objects, class traits) and
//! one for AMF0 (objects). All four live for exactly one top-level decode
//! and must be cleared before a fresh decode begins.
//!
//! Arrays and objects reserve a *shared* cell before their body is
//! decoded: `reserve_array`/`reserve_typed_object` push a `Value` that
//! already wraps the returned `Rc` into the table, so a reference read
//! mid-body aliases the exact allocation the caller later fills in via
//! that same `Rc`. Dates and byte arrays can't self-reference (spec.md
//! §4.4), so they keep the simpler reserve-a-placeholder/overwrite-it
//! shape via `reserve_object`/`finish_object`.

use std::cell::RefCell;
use std::rc::Rc;

use super::error::{AmfError, RefTable};
use super::value::{ClassDefinition, TypedObjectData, Value};

#[derive(Default)]
pub struct Amf0Tables {
    pub objects: Vec<Value>,
}

impl Amf0Tables {
    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn reserve_array(&mut self) -> Rc<RefCell<Vec<Value>>> {
        let cell = Rc::new(RefCell::new(Vec::new()));
        let idx = self.objects.len();
        self.objects.push(Value::Array(cell.clone()));
        tracing::trace!(table = "amf0.objects", index = idx, "reference reserved (array)");
        cell
    }

    pub fn reserve_typed_object(&mut self) -> Rc<RefCell<TypedObjectData>> {
        let cell = Rc::new(RefCell::new(TypedObjectData {
            class_name: String::new(),
            fields: Vec::new(),
        }));
        let idx = self.objects.len();
        self.objects.push(Value::TypedObject(cell.clone()));
        tracing::trace!(table = "amf0.objects", index = idx, "reference reserved (object)");
        cell
    }

    pub fn get(&self, idx: usize) -> Result<Value, AmfError> {
        let value = self
            .objects
            .get(idx)
            .cloned()
            .ok_or(AmfError::ReferenceOutOfRange(RefTable::Amf0Object, idx))?;
        tracing::trace!(table = "amf0.objects", index = idx, "reference fetched");
        Ok(value)
    }
}

#[derive(Default)]
pub struct Amf3Tables {
    pub strings: Vec<String>,
    pub objects: Vec<Value>,
    pub classes: Vec<ClassDefinition>,
}

impl Amf3Tables {
    pub fn clear(&mut self) {
        self.strings.clear();
        self.objects.clear();
        self.classes.clear();
    }

    pub fn store_string(&mut self, s: String) {
        tracing::trace!(table = "amf3.strings", index = self.strings.len(), value = %s, "reference stored");
        self.strings.push(s);
    }

    pub fn get_string(&self, idx: usize) -> Result<String, AmfError> {
        let s = self
            .strings
            .get(idx)
            .cloned()
            .ok_or(AmfError::ReferenceOutOfRange(RefTable::Amf3String, idx))?;
        tracing::trace!(table = "amf3.strings", index = idx, "reference fetched");
        Ok(s)
    }

    pub fn reserve_array(&mut self) -> Rc<RefCell<Vec<Value>>> {
        let cell = Rc::new(RefCell::new(Vec::new()));
        let idx = self.objects.len();
        self.objects.push(Value::Array(cell.clone()));
        tracing::trace!(table = "amf3.objects", index = idx, "reference reserved (array)");
        cell
    }

    pub fn reserve_typed_object(&mut self) -> Rc<RefCell<TypedObjectData>> {
        let cell = Rc::new(RefCell::new(TypedObjectData {
            class_name: String::new(),
            fields: Vec::new(),
        }));
        let idx = self.objects.len();
        self.objects.push(Value::TypedObject(cell.clone()));
        tracing::trace!(table = "amf3.objects", index = idx, "reference reserved (object)");
        cell
    }

    /// Reserve a plain placeholder slot for a non-cyclic value (Date,
    /// ByteArray). Must be paired with `finish_object`.
    pub fn reserve_object(&mut self) -> usize {
        let idx = self.objects.len();
        self.objects.push(Value::Null);
        tracing::trace!(table = "amf3.objects", index = idx, "reference reserved");
        idx
    }

    pub fn finish_object(&mut self, idx: usize, value: Value) {
        tracing::trace!(table = "amf3.objects", index = idx, ?value, "reference stored");
        self.objects[idx] = value;
    }

    pub fn get_object(&self, idx: usize) -> Result<Value, AmfError> {
        let value = self
            .objects
            .get(idx)
            .cloned()
            .ok_or(AmfError::ReferenceOutOfRange(RefTable::Amf3Object, idx))?;
        tracing::trace!(table = "amf3.objects", index = idx, "reference fetched");
        Ok(value)
    }

    pub fn store_class(&mut self, def: ClassDefinition) {
        tracing::trace!(table = "amf3.classes", index = self.classes.len(), class = %def.class_name, "reference stored");
        self.classes.push(def);
    }

    pub fn get_class(&self, idx: usize) -> Result<ClassDefinition, AmfError> {
        let def = self
            .classes
            .get(idx)
            .cloned()
            .ok_or(AmfError::ReferenceOutOfRange(RefTable::Amf3Class, idx))?;
        tracing::trace!(table = "amf3.classes", index = idx, "reference fetched");
        Ok(def)
    }
}
