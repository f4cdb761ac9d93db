//! Decode error taxonomy
//!
//! Every kind is fatal to the current top-level decode: no error is
//! recovered locally, and a failed decode never returns partial results.

use std::fmt;

/// Which dialect a marker or unsupported-type error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Amf0,
    Amf3,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Amf0 => write!(f, "AMF0"),
            Dialect::Amf3 => write!(f, "AMF3"),
        }
    }
}

/// Which reference table an out-of-range index was read against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTable {
    Amf0Object,
    Amf3String,
    Amf3Object,
    Amf3Class,
}

impl fmt::Display for RefTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTable::Amf0Object => write!(f, "AMF0 object table"),
            RefTable::Amf3String => write!(f, "AMF3 string table"),
            RefTable::Amf3Object => write!(f, "AMF3 object table"),
            RefTable::Amf3Class => write!(f, "AMF3 class table"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmfError {
    /// A read went past the end of the buffer.
    UnexpectedEof,
    /// Marker byte not recognized at all.
    UnknownMarker(Dialect, u8),
    /// Marker recognized but deliberately unimplemented.
    UnsupportedType(Dialect, &'static str),
    /// AMF3 modified-UTF-8 decoding failed at the given byte offset
    /// within the string.
    MalformedUtf8(usize),
    /// AMF3 array carried a non-empty associative key.
    AssociativeArrayUnsupported,
    /// AMF3 externalizable class not in the handler set.
    UnknownExternalizable { class_name: String, raw_hex: String },
    /// Envelope did not consume the whole buffer.
    TrailingBytes {
        position: usize,
        length: usize,
        raw_hex: String,
    },
    /// A back-reference pointed at or past the current table size.
    ReferenceOutOfRange(RefTable, usize),
    /// A UUID-bearing byte array wasn't exactly 16 bytes.
    InvalidUuidBytes(usize),
}

impl fmt::Display for AmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfError::UnexpectedEof => write!(f, "unexpected end of buffer"),
            AmfError::UnknownMarker(dialect, marker) => {
                write!(f, "unknown {dialect} marker 0x{marker:02X}")
            }
            AmfError::UnsupportedType(dialect, name) => {
                write!(f, "unsupported {dialect} type: {name}")
            }
            AmfError::MalformedUtf8(offset) => {
                write!(f, "malformed modified-UTF-8 at byte offset {offset}")
            }
            AmfError::AssociativeArrayUnsupported => {
                write!(f, "AMF3 associative arrays are not supported")
            }
            AmfError::UnknownExternalizable { class_name, raw_hex } => {
                write!(f, "unknown externalizable class \"{class_name}\" (raw bytes: {raw_hex})")
            }
            AmfError::TrailingBytes {
                position,
                length,
                raw_hex,
            } => write!(
                f,
                "trailing bytes after decode: consumed {position} of {length} bytes ({raw_hex})"
            ),
            AmfError::ReferenceOutOfRange(table, index) => {
                write!(f, "reference index {index} out of range for {table}")
            }
            AmfError::InvalidUuidBytes(len) => {
                write!(f, "expected 16 bytes for UUID conversion, got {len}")
            }
        }
    }
}

impl std::error::Error for AmfError {}

/// Renders the unconsumed tail as lowercase hex, for `TrailingBytes`.
pub fn hex_tail(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}
