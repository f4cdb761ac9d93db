//! AMF value types
//!
//! AMF0 and AMF3 both decode into this single tree. Object-shaped values
//! (`TypedObject`) keep insertion order so callers can rely on the order
//! properties appeared on the wire.
//!
//! `Array` and `TypedObject` wrap their data in `Rc<RefCell<_>>` rather
//! than holding it directly: AMF3 (and AMF0) let an object or array
//! reference itself, or an ancestor, before that container's own body
//! has finished decoding. The decoder reserves the shared cell up front
//! and hands out clones of the `Rc` to any self-reference encountered
//! mid-body, then fills the cell in once decoding completes — every
//! earlier clone observes the final content because they all point at
//! the same allocation. An owned, by-value tree has no way to represent
//! that without this indirection.

use std::cell::RefCell;
use std::rc::Rc;

/// Unified AMF0/AMF3 value representation.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value (AMF0: 0x05, AMF3: 0x01)
    Null,

    /// Boolean value (AMF0: 0x01, AMF3: 0x02/0x03)
    Boolean(bool),

    /// IEEE 754 double-precision floating point (AMF0: 0x00, AMF3: 0x05)
    Number(f64),

    /// AMF3 29-bit signed integer (AMF3: 0x04)
    Integer(i32),

    /// UTF-8 text (AMF0: 0x02, AMF3: 0x06)
    String(String),

    /// Raw byte blob (AMF3 ByteArray: 0x0C)
    Bytes(Vec<u8>),

    /// Milliseconds since epoch. AMF3 dates always carry a zero UTC offset;
    /// AMF0 dates carry whatever offset (in minutes) was on the wire,
    /// converted to hours per spec.md.
    Date { millis: f64, utc_offset_hours: i16 },

    /// Dense, zero-based ordered sequence. Shared so a nested
    /// self-reference aliases the same backing vector.
    Array(Rc<RefCell<Vec<Value>>>),

    /// Key-value object, insertion order preserved, shared for the same
    /// reason as `Array`.
    TypedObject(Rc<RefCell<TypedObjectData>>),

    /// AMF0 object-end sentinel. Internal only; never returned to callers.
    ObjectTerminate,
}

/// The actual contents of a `TypedObject`, behind the shared cell.
/// `class_name` is empty for anonymous AMF0 objects.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedObjectData {
    pub class_name: String,
    pub fields: Vec<(String, Value)>,
}

impl Value {
    /// Build an `Array` value from already-decoded elements.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Build a `TypedObject` value from a class name and its fields.
    pub fn typed_object(class_name: String, fields: Vec<(String, Value)>) -> Self {
        Value::TypedObject(Rc::new(RefCell::new(TypedObjectData { class_name, fields })))
    }

    /// Look up a field by name on a `TypedObject`, cloning it out from
    /// behind the shared cell.
    pub fn field(&self, key: &str) -> Option<Value> {
        match self {
            Value::TypedObject(data) => data
                .borrow()
                .fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    pub fn class_name(&self) -> Option<String> {
        match self {
            Value::TypedObject(data) => Some(data.borrow().class_name.clone()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<Vec<Value>> {
        match self {
            Value::Array(a) => Some(a.borrow().clone()),
            _ => None,
        }
    }
}

/// Structural equality, except `Array`/`TypedObject` short-circuit on
/// `Rc::ptr_eq` before recursing into their borrowed content. Without
/// that shortcut, comparing a self-referencing object to itself would
/// recurse into its own "self" field forever; checking pointer identity
/// first means a cycle closed by aliasing (the only kind this decoder
/// produces) compares equal without ever re-entering the cycle.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (
                Value::Date {
                    millis: m1,
                    utc_offset_hours: o1,
                },
                Value::Date {
                    millis: m2,
                    utc_offset_hours: o2,
                },
            ) => m1 == m2 && o1 == o2,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::TypedObject(a), Value::TypedObject(b)) => {
                Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow()
            }
            (Value::ObjectTerminate, Value::ObjectTerminate) => true,
            _ => false,
        }
    }
}

/// AMF3 trait descriptor: class name, encoding, and sealed property order.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDefinition {
    pub class_name: String,
    pub externalizable: bool,
    pub dynamic: bool,
    pub encoding: u8,
    pub properties: Vec<String>,
}

impl ClassDefinition {
    pub fn new(class_name: String, encoding: u8, properties: Vec<String>) -> Self {
        Self {
            class_name,
            externalizable: encoding == 1,
            dynamic: encoding == 2,
            encoding,
            properties,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_object_preserves_field_order() {
        let obj = Value::typed_object(
            "Point".into(),
            vec![("x".into(), Value::Number(1.0)), ("y".into(), Value::Number(2.0))],
        );
        match &obj {
            Value::TypedObject(data) => {
                let data = data.borrow();
                assert_eq!(data.fields[0].0, "x");
                assert_eq!(data.fields[1].0, "y");
            }
            _ => panic!("expected TypedObject"),
        }
        assert_eq!(obj.field("y"), Some(Value::Number(2.0)));
        assert_eq!(obj.field("z"), None);
    }

    #[test]
    fn class_definition_derives_flags_from_encoding() {
        let externalizable = ClassDefinition::new("DSA".into(), 1, vec![]);
        assert!(externalizable.externalizable);
        assert!(!externalizable.dynamic);

        let dynamic = ClassDefinition::new("".into(), 2, vec!["a".into()]);
        assert!(!dynamic.externalizable);
        assert!(dynamic.dynamic);
    }

    #[test]
    fn self_referencing_object_is_equal_to_itself_via_pointer_identity() {
        let obj = Value::typed_object("Node".into(), vec![]);
        if let Value::TypedObject(cell) = &obj {
            cell.borrow_mut().fields.push(("self".into(), obj.clone()));
        }
        let self_field = obj.field("self").unwrap();
        assert_eq!(self_field, obj);
    }
}
