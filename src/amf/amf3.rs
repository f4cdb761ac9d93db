//! AMF3 decoder
//!
//! AMF3 is the ActionScript 3.0 serialization format: a type-tag dispatch
//! over U29-tagged values with three parallel reference tables (strings,
//! objects, class traits).
//!
//! Type Markers:
//! ```text
//! 0x00 - Undefined
//! 0x01 - Null
//! 0x02 - Boolean false
//! 0x03 - Boolean true
//! 0x04 - Integer (29-bit signed)
//! 0x05 - Double
//! 0x06 - String
//! 0x08 - Date
//! 0x09 - Array
//! 0x0A - Object
//! 0x0C - ByteArray
//! ```

use super::cursor::Cursor;
use super::error::{AmfError, Dialect, RefTable};
use super::externalizable;
use super::mutf8;
use super::tables::Amf3Tables;
use super::value::{ClassDefinition, TypedObjectData, Value};
use super::varint;

const MARKER_UNDEFINED: u8 = 0x00;
const MARKER_NULL: u8 = 0x01;
const MARKER_FALSE: u8 = 0x02;
const MARKER_TRUE: u8 = 0x03;
const MARKER_INTEGER: u8 = 0x04;
const MARKER_DOUBLE: u8 = 0x05;
const MARKER_STRING: u8 = 0x06;
const MARKER_XML_DOC: u8 = 0x07;
const MARKER_DATE: u8 = 0x08;
const MARKER_ARRAY: u8 = 0x09;
const MARKER_OBJECT: u8 = 0x0A;
const MARKER_XML: u8 = 0x0B;
const MARKER_BYTE_ARRAY: u8 = 0x0C;
const MARKER_VECTOR_INT: u8 = 0x0D;
const MARKER_VECTOR_UINT: u8 = 0x0E;
const MARKER_VECTOR_DOUBLE: u8 = 0x0F;
const MARKER_VECTOR_OBJECT: u8 = 0x10;
const MARKER_DICTIONARY: u8 = 0x11;

/// AMF3 decoder with reference tables
pub struct Amf3Decoder {
    tables: Amf3Tables,
}

impl Amf3Decoder {
    pub fn new() -> Self {
        Self {
            tables: Amf3Tables::default(),
        }
    }

    /// Clear all three reference tables. Callers must do this before each
    /// fresh top-level decode.
    pub fn reset(&mut self) {
        self.tables.clear();
    }

    /// Decode a single AMF3 value.
    pub fn decode(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let marker = cursor.read_u8()?;
        tracing::trace!(marker = format!("0x{marker:02X}"), "decoding AMF3 value");
        let value = self.decode_value(marker, cursor)?;
        tracing::trace!(?value, "decoded AMF3 value");
        Ok(value)
    }

    fn decode_value(&mut self, marker: u8, cursor: &mut Cursor) -> Result<Value, AmfError> {
        match marker {
            MARKER_UNDEFINED => Ok(Value::String("AMF3_UNDEFINED".to_string())),
            MARKER_NULL => Ok(Value::Null),
            MARKER_FALSE => Ok(Value::Boolean(false)),
            MARKER_TRUE => Ok(Value::Boolean(true)),
            MARKER_INTEGER => self.decode_integer(cursor),
            MARKER_DOUBLE => Ok(Value::Number(cursor.read_f64_be()?)),
            MARKER_STRING => Ok(Value::String(self.read_string(cursor)?)),
            MARKER_DATE => self.decode_date(cursor),
            MARKER_ARRAY => self.decode_array(cursor),
            MARKER_OBJECT => self.decode_object(cursor),
            MARKER_BYTE_ARRAY => self.decode_byte_array(cursor),
            MARKER_XML_DOC => Err(AmfError::UnsupportedType(Dialect::Amf3, "XMLDocument")),
            MARKER_XML => Err(AmfError::UnsupportedType(Dialect::Amf3, "XML")),
            MARKER_VECTOR_INT => Err(AmfError::UnsupportedType(Dialect::Amf3, "Vector<int>")),
            MARKER_VECTOR_UINT => Err(AmfError::UnsupportedType(Dialect::Amf3, "Vector<uint>")),
            MARKER_VECTOR_DOUBLE => {
                Err(AmfError::UnsupportedType(Dialect::Amf3, "Vector<double>"))
            }
            MARKER_VECTOR_OBJECT => {
                Err(AmfError::UnsupportedType(Dialect::Amf3, "Vector<Object>"))
            }
            MARKER_DICTIONARY => Err(AmfError::UnsupportedType(Dialect::Amf3, "Dictionary")),
            _ => Err(AmfError::UnknownMarker(Dialect::Amf3, marker)),
        }
    }

    fn decode_integer(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let raw = varint::read_u29(cursor)?;
        Ok(Value::Integer(varint::sign_extend_u29(raw)))
    }

    /// Read a U29-tagged string: low bit clear is a back-reference, set is
    /// an inline length in bytes. Non-empty strings are appended to the
    /// string table; empty strings never are.
    pub(super) fn read_string(&mut self, cursor: &mut Cursor) -> Result<String, AmfError> {
        let tag = varint::read_u29(cursor)?;
        if tag & 1 == 0 {
            return self.tables.get_string((tag >> 1) as usize);
        }
        let len = (tag >> 1) as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let bytes = cursor.read_bytes(len)?;
        let s = mutf8::decode(bytes)?;
        self.tables.store_string(s.clone());
        Ok(s)
    }

    fn decode_date(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let tag = varint::read_u29(cursor)?;
        if tag & 1 == 0 {
            return self.tables.get_object((tag >> 1) as usize);
        }
        let millis = cursor.read_f64_be()?;
        let value = Value::Date {
            millis,
            utc_offset_hours: 0,
        };
        let idx = self.tables.reserve_object();
        self.tables.finish_object(idx, value.clone());
        Ok(value)
    }

    fn decode_array(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let tag = varint::read_u29(cursor)?;
        if tag & 1 == 0 {
            let idx = (tag >> 1) as usize;
            let value = self.tables.get_object(idx)?;
            return match value {
                Value::Array(_) => Ok(value),
                _ => Err(AmfError::ReferenceOutOfRange(RefTable::Amf3Object, idx)),
            };
        }
        let size = (tag >> 1) as usize;
        let key = self.read_string(cursor)?;
        if !key.is_empty() {
            return Err(AmfError::AssociativeArrayUnsupported);
        }
        let cell = self.tables.reserve_array();
        let mut elements = Vec::with_capacity(size.min(cursor.remaining()));
        for _ in 0..size {
            elements.push(self.decode(cursor)?);
        }
        *cell.borrow_mut() = elements;
        Ok(Value::Array(cell))
    }

    fn decode_object(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let tag = varint::read_u29(cursor)?;
        if tag & 1 == 0 {
            return self.tables.get_object((tag >> 1) as usize);
        }

        let trait_def = if tag & 2 == 0 {
            self.tables.get_class((tag >> 2) as usize)?
        } else {
            let encoding = ((tag >> 2) & 0x03) as u8;
            let property_count = (tag >> 4) as usize;
            let class_name = self.read_string(cursor)?;
            let mut properties = Vec::with_capacity(property_count);
            for _ in 0..property_count {
                properties.push(self.read_string(cursor)?);
            }
            let def = ClassDefinition::new(class_name, encoding, properties);
            self.tables.store_class(def.clone());
            def
        };

        let cell = self.tables.reserve_typed_object();

        if trait_def.externalizable {
            let built = externalizable::decode(self, cursor, &trait_def.class_name)?;
            let data = match built {
                Value::TypedObject(built_cell) => built_cell.borrow().clone(),
                other => TypedObjectData {
                    class_name: trait_def.class_name.clone(),
                    fields: vec![("value".to_string(), other)],
                },
            };
            *cell.borrow_mut() = data;
        } else {
            let mut fields = Vec::with_capacity(trait_def.properties.len());
            for prop_name in &trait_def.properties {
                let v = self.decode(cursor)?;
                fields.push((prop_name.clone(), v));
            }
            if trait_def.dynamic {
                loop {
                    let key = self.read_string(cursor)?;
                    if key.is_empty() {
                        break;
                    }
                    let v = self.decode(cursor)?;
                    fields.push((key, v));
                }
            }
            *cell.borrow_mut() = TypedObjectData {
                class_name: trait_def.class_name.clone(),
                fields,
            };
        }

        Ok(Value::TypedObject(cell))
    }

    fn decode_byte_array(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let tag = varint::read_u29(cursor)?;
        if tag & 1 == 0 {
            return self.tables.get_object((tag >> 1) as usize);
        }
        let len = (tag >> 1) as usize;
        let bytes = cursor.read_bytes(len)?.to_vec();
        let value = Value::Bytes(bytes);
        let idx = self.tables.reserve_object();
        self.tables.finish_object(idx, value.clone());
        Ok(value)
    }
}

impl Default for Amf3Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(bytes: &[u8]) -> Result<Value, AmfError> {
        let mut decoder = Amf3Decoder::new();
        let mut cursor = Cursor::new(bytes);
        decoder.decode(&mut cursor)
    }

    #[test]
    fn integer_128_sign_extends_correctly() {
        let bytes = [0x04, 0x81, 0x00];
        assert_eq!(decode_one(&bytes).unwrap(), Value::Integer(128));
    }

    #[test]
    fn string_back_reference_resolves_to_prior_value() {
        let mut decoder = Amf3Decoder::new();
        let bytes = [0x06, 0x05, 0x61, 0x62, 0x06, 0x00];
        let mut cursor = Cursor::new(&bytes);
        let first = decoder.decode(&mut cursor).unwrap();
        let second = decoder.decode(&mut cursor).unwrap();
        assert_eq!(first, Value::String("ab".into()));
        assert_eq!(second, Value::String("ab".into()));
        assert_eq!(decoder.tables.strings.len(), 1);
    }

    #[test]
    fn empty_string_is_never_stored() {
        let mut decoder = Amf3Decoder::new();
        let bytes = [0x06, 0x01]; // tag (0<<1)|1 = inline, length 0
        let mut cursor = Cursor::new(&bytes);
        let v = decoder.decode(&mut cursor).unwrap();
        assert_eq!(v, Value::String(String::new()));
        assert!(decoder.tables.strings.is_empty());
    }

    #[test]
    fn undefined_emits_literal_token() {
        assert_eq!(
            decode_one(&[0x00]).unwrap(),
            Value::String("AMF3_UNDEFINED".into())
        );
    }

    #[test]
    fn typed_object_with_self_reference_resolves_to_the_finished_object() {
        // Trait: inline, not externalizable, not dynamic, 1 sealed prop "self".
        // tag = (property_count<<4) | (encoding<<2) | (trait_inline<<1) | inline_flag
        //     = (1<<4) | (0<<2) | 0b11 = 0x13
        let mut bytes = vec![0x0A, 0x13];
        bytes.push(0x01); // class name: inline, len 0 -> (0<<1)|1 = 1
        bytes.push(0x09); // prop name "self": len 4 -> (4<<1)|1 = 9
        bytes.extend_from_slice(b"self");
        bytes.push(0x0A); // nested value marker: Object
        bytes.push(0x00); // object reference tag (0<<1)|0 = 0 -> ref index 0

        let value = decode_one(&bytes).unwrap();
        match &value {
            Value::TypedObject(data) => {
                let data = data.borrow();
                assert_eq!(data.class_name, "");
                assert_eq!(data.fields[0].0, "self");
                // The reference captured mid-body aliases the same cell
                // this object finishes into, so it now equals the
                // finished object rather than a stuck placeholder.
                assert_eq!(data.fields[0].1, value);
            }
            _ => panic!("expected TypedObject"),
        }
    }

    #[test]
    fn associative_array_is_unsupported() {
        // tag=(0<<1)|1=1 (size 0, inline), then non-empty key "a" -> (1<<1)|1=3, 'a'
        let bytes = [0x09, 0x01, 0x03, b'a'];
        assert_eq!(
            decode_one(&bytes),
            Err(AmfError::AssociativeArrayUnsupported)
        );
    }

    #[test]
    fn byte_array_back_reference_resolves() {
        let mut decoder = Amf3Decoder::new();
        // Inline byte array of length 2: tag=(2<<1)|1=5
        let bytes = [0x0C, 0x05, 0x01, 0x02, 0x0C, 0x00];
        let mut cursor = Cursor::new(&bytes);
        let first = decoder.decode(&mut cursor).unwrap();
        let second = decoder.decode(&mut cursor).unwrap();
        assert_eq!(first, Value::Bytes(vec![1, 2]));
        assert_eq!(second, Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn unknown_marker_errors() {
        assert_eq!(
            decode_one(&[0xFE]),
            Err(AmfError::UnknownMarker(Dialect::Amf3, 0xFE))
        );
    }

    #[test]
    fn vector_marker_is_unsupported_not_unknown() {
        assert_eq!(
            decode_one(&[MARKER_VECTOR_INT]),
            Err(AmfError::UnsupportedType(Dialect::Amf3, "Vector<int>"))
        );
    }
}
