//! Top-level invocation-response envelope
//!
//! Optional `0x00` version byte, then four AMF0 values decoded in order.
//! Mirrors how the teacher's `session/context.rs` assembles a result
//! struct field by field from decoded pieces.

use super::amf0::Amf0Decoder;
use super::cursor::Cursor;
use super::error::{hex_tail, AmfError};
use super::value::Value;

/// The four-field response plus the optional version byte.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeResponse {
    pub version: Option<u8>,
    pub result: Value,
    pub invoke_id: Value,
    pub service_call: Value,
    pub data: Value,
}

/// Decode a full invocation-response buffer: optional version byte, then
/// `result`, `invokeId`, `serviceCall`, `data` as AMF0 values (any of
/// which may switch into AMF3 via the 0x11 marker). Errors if the buffer
/// isn't fully consumed.
pub fn decode_invoke_response(buffer: &[u8]) -> Result<InvokeResponse, AmfError> {
    let mut cursor = Cursor::new(buffer);
    let mut decoder = Amf0Decoder::new();
    decoder.reset();

    let version = if buffer.first() == Some(&0x00) {
        cursor.read_u8()?;
        Some(0)
    } else {
        None
    };

    let result = decoder.decode(&mut cursor)?;
    let invoke_id = decoder.decode(&mut cursor)?;
    let service_call = decoder.decode(&mut cursor)?;
    let data = decoder.decode(&mut cursor)?;

    if cursor.position() != buffer.len() {
        return Err(AmfError::TrailingBytes {
            position: cursor.position(),
            length: buffer.len(),
            raw_hex: hex_tail(cursor.tail()),
        });
    }

    tracing::debug!(
        version,
        position = cursor.position(),
        "invoke response fully decoded"
    );

    Ok(InvokeResponse {
        version,
        result,
        invoke_id,
        service_call,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_plus_four_nulls() {
        let bytes = [0x00, 0x05, 0x05, 0x05, 0x05];
        let response = decode_invoke_response(&bytes).unwrap();
        assert_eq!(response.version, Some(0));
        assert_eq!(response.result, Value::Null);
        assert_eq!(response.invoke_id, Value::Null);
        assert_eq!(response.service_call, Value::Null);
        assert_eq!(response.data, Value::Null);
    }

    #[test]
    fn number_result_with_three_trailing_nulls() {
        let mut bytes = vec![0x00, 0x00];
        bytes.extend_from_slice(&1.0f64.to_be_bytes());
        bytes.extend_from_slice(&[0x05, 0x05, 0x05]);
        let response = decode_invoke_response(&bytes).unwrap();
        assert_eq!(response.result, Value::Number(1.0));
        assert_eq!(response.invoke_id, Value::Null);
    }

    #[test]
    fn boolean_then_string_invoke_id() {
        let mut bytes = vec![0x00, 0x01, 0x01, 0x02, 0x00, 0x03];
        bytes.extend_from_slice(b"foo");
        bytes.extend_from_slice(&[0x05, 0x05]);
        let response = decode_invoke_response(&bytes).unwrap();
        assert_eq!(response.result, Value::Boolean(true));
        assert_eq!(response.invoke_id, Value::String("foo".into()));
    }

    #[test]
    fn amf0_to_amf3_switch_decodes_integer() {
        let bytes = [0x00, 0x05, 0x11, 0x04, 0x81, 0x00, 0x05, 0x05];
        let response = decode_invoke_response(&bytes).unwrap();
        assert_eq!(response.result, Value::Null);
        assert_eq!(response.invoke_id, Value::Integer(128));
    }

    #[test]
    fn no_version_byte_when_first_byte_is_not_zero() {
        // result = Boolean(true) via marker 0x01, no leading version byte.
        let bytes = [0x01, 0x01, 0x05, 0x05, 0x05];
        let response = decode_invoke_response(&bytes).unwrap();
        assert_eq!(response.version, None);
        assert_eq!(response.result, Value::Boolean(true));
    }

    #[test]
    fn trailing_bytes_after_full_tuple_is_an_error() {
        let mut bytes = vec![0x00, 0x05, 0x05, 0x05, 0x05];
        bytes.push(0xFF);
        match decode_invoke_response(&bytes) {
            Err(AmfError::TrailingBytes { position, length, .. }) => {
                assert_eq!(position, 5);
                assert_eq!(length, 6);
            }
            other => panic!("expected TrailingBytes, got {other:?}"),
        }
    }
}
