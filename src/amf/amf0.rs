//! AMF0 decoder
//!
//! AMF0 is the original Action Message Format used in Flash/RTMP. This
//! decoder also owns the handoff into AMF3 via the 0x11 marker.
//!
//! Type Markers:
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x01 - Boolean
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x03 - Object (key-value pairs until 0x000009)
//! 0x05 - Null
//! 0x07 - Reference (16-bit index)
//! 0x0A - Strict Array (dense array)
//! 0x0B - Date (double + timezone)
//! 0x10 - Typed Object (class name + properties)
//! 0x11 - AVM+ (switch to AMF3)
//! ```

use super::amf3::Amf3Decoder;
use super::cursor::Cursor;
use super::error::{AmfError, Dialect};
use super::tables::Amf0Tables;
use super::value::{TypedObjectData, Value};

const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_MOVIE_CLIP: u8 = 0x04;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_REFERENCE: u8 = 0x07;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_STRICT_ARRAY: u8 = 0x0A;
const MARKER_DATE: u8 = 0x0B;
const MARKER_LONG_STRING: u8 = 0x0C;
const MARKER_UNSUPPORTED: u8 = 0x0D;
const MARKER_RECORDSET: u8 = 0x0E;
const MARKER_XML_DOCUMENT: u8 = 0x0F;
const MARKER_TYPED_OBJECT: u8 = 0x10;
const MARKER_AVMPLUS: u8 = 0x11;

/// AMF0 decoder. Owns an `Amf3Decoder` for the 0x11 AVM+ handoff, since
/// any AMF0 value can switch dialects mid-stream.
pub struct Amf0Decoder {
    tables: Amf0Tables,
    amf3: Amf3Decoder,
}

impl Amf0Decoder {
    pub fn new() -> Self {
        Self {
            tables: Amf0Tables::default(),
            amf3: Amf3Decoder::new(),
        }
    }

    /// Clear the AMF0 object table and the nested AMF3 decoder's tables.
    /// Call once per top-level decode.
    pub fn reset(&mut self) {
        self.tables.clear();
        self.amf3.reset();
    }

    pub fn decode(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let marker = cursor.read_u8()?;
        tracing::trace!(marker = format!("0x{marker:02X}"), "decoding AMF0 value");
        let value = self.decode_value(marker, cursor)?;
        tracing::trace!(?value, "decoded AMF0 value");
        Ok(value)
    }

    fn decode_value(&mut self, marker: u8, cursor: &mut Cursor) -> Result<Value, AmfError> {
        match marker {
            MARKER_NUMBER => Ok(Value::Number(cursor.read_f64_be()?)),
            MARKER_BOOLEAN => Ok(Value::Boolean(cursor.read_bool()?)),
            MARKER_STRING => Ok(Value::String(self.read_utf8(cursor)?)),
            MARKER_OBJECT => self.decode_object(cursor),
            MARKER_MOVIE_CLIP => Err(AmfError::UnsupportedType(Dialect::Amf0, "MovieClip")),
            MARKER_NULL => Ok(Value::Null),
            MARKER_UNDEFINED => Err(AmfError::UnsupportedType(Dialect::Amf0, "Undefined")),
            MARKER_REFERENCE => self.decode_reference(cursor),
            MARKER_ECMA_ARRAY => Err(AmfError::UnsupportedType(Dialect::Amf0, "MixedArray")),
            MARKER_OBJECT_END => Ok(Value::ObjectTerminate),
            MARKER_STRICT_ARRAY => self.decode_array(cursor),
            MARKER_DATE => self.decode_date(cursor),
            MARKER_LONG_STRING => Err(AmfError::UnsupportedType(Dialect::Amf0, "LongString")),
            MARKER_UNSUPPORTED => Err(AmfError::UnsupportedType(Dialect::Amf0, "Unsupported")),
            MARKER_RECORDSET => Err(AmfError::UnsupportedType(Dialect::Amf0, "RecordSet")),
            MARKER_XML_DOCUMENT => Err(AmfError::UnsupportedType(Dialect::Amf0, "XmlDocument")),
            MARKER_TYPED_OBJECT => self.decode_typed_object(cursor),
            MARKER_AVMPLUS => self.amf3.decode(cursor),
            _ => Err(AmfError::UnknownMarker(Dialect::Amf0, marker)),
        }
    }

    /// u16-length-prefixed UTF-8 string. AMF0 strings are strict UTF-8,
    /// unlike AMF3's modified UTF-8.
    fn read_utf8(&mut self, cursor: &mut Cursor) -> Result<String, AmfError> {
        let len = cursor.read_u16_be()? as usize;
        let bytes = cursor.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AmfError::MalformedUtf8(e.utf8_error().valid_up_to()))
    }

    /// Repeatedly read (key, value) pairs until the object-end sentinel.
    /// The empty key is always consumed as part of the canonical
    /// terminator, even though its length bytes encode zero.
    fn decode_property_pairs(&mut self, cursor: &mut Cursor) -> Result<Vec<(String, Value)>, AmfError> {
        let mut fields = Vec::new();
        loop {
            let key = self.read_utf8(cursor)?;
            let value = self.decode(cursor)?;
            if matches!(value, Value::ObjectTerminate) {
                break;
            }
            fields.push((key, value));
        }
        Ok(fields)
    }

    fn decode_object(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let cell = self.tables.reserve_typed_object();
        let fields = self.decode_property_pairs(cursor)?;
        *cell.borrow_mut() = TypedObjectData {
            class_name: String::new(),
            fields,
        };
        Ok(Value::TypedObject(cell))
    }

    fn decode_typed_object(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let class_name = self.read_utf8(cursor)?;
        let cell = self.tables.reserve_typed_object();
        let fields = self.decode_property_pairs(cursor)?;
        *cell.borrow_mut() = TypedObjectData { class_name, fields };
        Ok(Value::TypedObject(cell))
    }

    fn decode_array(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let count = cursor.read_u32_be()? as usize;
        let cell = self.tables.reserve_array();
        let mut elements = Vec::with_capacity(count.min(cursor.remaining()));
        for _ in 0..count {
            elements.push(self.decode(cursor)?);
        }
        *cell.borrow_mut() = elements;
        Ok(Value::Array(cell))
    }

    fn decode_date(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let millis = cursor.read_f64_be()?;
        let minutes = cursor.read_i16_be()?;
        Ok(Value::Date {
            millis,
            utc_offset_hours: minutes / 60,
        })
    }

    fn decode_reference(&mut self, cursor: &mut Cursor) -> Result<Value, AmfError> {
        let idx = cursor.read_u16_be()? as usize;
        self.tables.get(idx)
    }
}

impl Default for Amf0Decoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(bytes: &[u8]) -> Result<Value, AmfError> {
        let mut decoder = Amf0Decoder::new();
        let mut cursor = Cursor::new(bytes);
        decoder.decode(&mut cursor)
    }

    #[test]
    fn number_decodes() {
        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&1.0f64.to_be_bytes());
        assert_eq!(decode_one(&bytes).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn boolean_and_string_decode() {
        assert_eq!(decode_one(&[0x01, 0x01]).unwrap(), Value::Boolean(true));
        let bytes = [0x02, 0x00, 0x03, b'f', b'o', b'o'];
        assert_eq!(decode_one(&bytes).unwrap(), Value::String("foo".into()));
    }

    #[test]
    fn anonymous_object_terminates_on_empty_key_and_end_marker() {
        let mut bytes = vec![0x03];
        bytes.extend_from_slice(&[0x00, 0x01, b'a']);
        bytes.push(0x00);
        bytes.extend_from_slice(&1.0f64.to_be_bytes());
        bytes.extend_from_slice(&[0x00, 0x00]); // empty key
        bytes.push(0x09); // object-end marker
        let value = decode_one(&bytes).unwrap();
        match value {
            Value::TypedObject(data) => {
                let data = data.borrow();
                assert_eq!(data.class_name, "");
                assert_eq!(data.fields, vec![("a".to_string(), Value::Number(1.0))]);
            }
            _ => panic!("expected TypedObject"),
        }
    }

    #[test]
    fn array_self_reference_resolves_to_the_finished_array() {
        let mut bytes = vec![0x0A];
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.push(0x07); // reference marker
        bytes.extend_from_slice(&0u16.to_be_bytes());
        let value = decode_one(&bytes).unwrap();
        match &value {
            Value::Array(elements) => {
                let elements = elements.borrow();
                assert_eq!(elements.len(), 1);
                assert_eq!(elements[0], value);
            }
            _ => panic!("expected Array"),
        }
    }

    #[test]
    fn typed_object_decodes_class_name_and_fields() {
        let mut bytes = vec![0x10];
        bytes.extend_from_slice(&[0x00, 0x05]);
        bytes.extend_from_slice(b"Point");
        bytes.extend_from_slice(&[0x00, 0x00]); // empty key
        bytes.push(0x09);
        let value = decode_one(&bytes).unwrap();
        match value {
            Value::TypedObject(data) => {
                let data = data.borrow();
                assert_eq!(data.class_name, "Point");
                assert!(data.fields.is_empty());
            }
            _ => panic!("expected TypedObject"),
        }
    }

    #[test]
    fn avmplus_marker_hands_off_to_amf3() {
        let bytes = [0x11, 0x04, 0x81, 0x00];
        assert_eq!(decode_one(&bytes).unwrap(), Value::Integer(128));
    }

    #[test]
    fn mixed_array_is_unsupported() {
        assert_eq!(
            decode_one(&[0x08, 0x00, 0x00, 0x00, 0x00]),
            Err(AmfError::UnsupportedType(Dialect::Amf0, "MixedArray"))
        );
    }

    #[test]
    fn unknown_marker_errors() {
        assert_eq!(
            decode_one(&[0xFE]),
            Err(AmfError::UnknownMarker(Dialect::Amf0, 0xFE))
        );
    }

    #[test]
    fn date_converts_minutes_offset_to_hours() {
        let mut bytes = vec![0x0B];
        bytes.extend_from_slice(&0.0f64.to_be_bytes());
        bytes.extend_from_slice(&120i16.to_be_bytes());
        assert_eq!(
            decode_one(&bytes).unwrap(),
            Value::Date {
                millis: 0.0,
                utc_offset_hours: 2
            }
        );
    }
}
