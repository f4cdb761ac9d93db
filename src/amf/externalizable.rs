//! Flex/Flash externalizable class bodies
//!
//! A handful of AMF3 classes self-describe their own wire body instead of
//! using the trait-driven property list: the Flex data-services messages
//! (`DSA`/`DSK`), the `ArrayCollection` wrapper, and a fixed set of
//! Riot-platform notification classes whose body is just length-prefixed
//! JSON.

use super::amf3::Amf3Decoder;
use super::cursor::Cursor;
use super::error::{hex_tail, AmfError};
use super::value::Value;

const JSON_WRAPPED_CLASSES: &[&str] = &[
    "com.riotgames.platform.systemstate.ClientSystemStatesNotification",
    "com.riotgames.platform.broadcast.BroadcastNotification",
    "com.riotgames.platform.summoner.SummonerCatalog",
    "com.riotgames.platform.game.GameTypeConfigDTO",
];

/// Dispatch an externalizable class body by name.
pub fn decode(
    decoder: &mut Amf3Decoder,
    cursor: &mut Cursor,
    class_name: &str,
) -> Result<Value, AmfError> {
    match class_name {
        "flex.messaging.io.ArrayCollection" => decode_array_collection(decoder, cursor),
        "DSA" => decode_dsa(decoder, cursor).map(|fields| typed("DSA", fields)),
        "DSK" => decode_dsk(decoder, cursor),
        name if JSON_WRAPPED_CLASSES.contains(&name) => decode_json_wrapped(cursor, name),
        other => Err(AmfError::UnknownExternalizable {
            class_name: other.to_string(),
            raw_hex: hex_tail(cursor.tail()),
        }),
    }
}

fn typed(class_name: &str, fields: Vec<(String, Value)>) -> Value {
    Value::typed_object(class_name.to_string(), fields)
}

fn decode_array_collection(
    decoder: &mut Amf3Decoder,
    cursor: &mut Cursor,
) -> Result<Value, AmfError> {
    let array = decoder.decode(cursor)?;
    Ok(typed(
        "flex.messaging.io.ArrayCollection",
        vec![("source".to_string(), array)],
    ))
}

fn decode_json_wrapped(cursor: &mut Cursor, class_name: &str) -> Result<Value, AmfError> {
    let len = cursor.read_u32_be()? as usize;
    let bytes = cursor.read_bytes(len)?;
    let text = std::str::from_utf8(bytes).map_err(|_| AmfError::UnknownExternalizable {
        class_name: class_name.to_string(),
        raw_hex: hex_tail(bytes),
    })?;
    let json: serde_json::Value = serde_json::from_str(text).map_err(|_| {
        AmfError::UnknownExternalizable {
            class_name: class_name.to_string(),
            raw_hex: hex_tail(bytes),
        }
    })?;

    let fields = match json {
        serde_json::Value::Object(map) => {
            map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect()
        }
        other => vec![("value".to_string(), json_to_value(other))],
    };
    Ok(typed(class_name, fields))
}

fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(0.0)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => {
            Value::array(arr.into_iter().map(json_to_value).collect())
        }
        serde_json::Value::Object(map) => Value::typed_object(
            String::new(),
            map.into_iter().map(|(k, v)| (k, json_to_value(v))).collect(),
        ),
    }
}

/// Read a flag block: one or more flag bytes, continuing while bit 7 is set.
fn read_flag_block(cursor: &mut Cursor) -> Result<Vec<u8>, AmfError> {
    let mut flags = Vec::new();
    loop {
        let byte = cursor.read_u8()?;
        flags.push(byte);
        if byte & 0x80 == 0 {
            break;
        }
    }
    Ok(flags)
}

/// Decode-and-discard every set bit in `[bits_consumed, 6)` of `flag`.
fn discard_remaining(
    decoder: &mut Amf3Decoder,
    cursor: &mut Cursor,
    flag: u8,
    bits_consumed: u32,
) -> Result<(), AmfError> {
    for bit in bits_consumed..6 {
        if flag & (1 << bit) != 0 {
            let discarded = decoder.decode(cursor)?;
            tracing::info!(bit, value = ?discarded, "discarding unrecognized DSA/DSK flag field");
        }
    }
    Ok(())
}

fn decode_dsa(decoder: &mut Amf3Decoder, cursor: &mut Cursor) -> Result<Vec<(String, Value)>, AmfError> {
    let mut fields = Vec::new();

    let flags = read_flag_block(cursor)?;
    for (i, &flag) in flags.iter().enumerate() {
        let bits_consumed = match i {
            0 => {
                const NAMES: [&str; 7] = [
                    "body",
                    "clientId",
                    "destination",
                    "headers",
                    "messageId",
                    "timeStamp",
                    "timeToLive",
                ];
                for (bit, name) in NAMES.iter().enumerate() {
                    if flag & (1 << bit) != 0 {
                        let value = decoder.decode(cursor)?;
                        fields.push((name.to_string(), value));
                    }
                }
                7
            }
            1 => {
                if flag & 0x01 != 0 {
                    let bytes = decoder.decode(cursor)?;
                    fields.push(("clientId".to_string(), Value::String(bytes_to_uuid(&bytes)?)));
                }
                if flag & 0x02 != 0 {
                    let bytes = decoder.decode(cursor)?;
                    fields.push(("messageId".to_string(), Value::String(bytes_to_uuid(&bytes)?)));
                }
                2
            }
            _ => 0,
        };
        discard_remaining(decoder, cursor, flag, bits_consumed)?;
    }

    let flags = read_flag_block(cursor)?;
    for (i, &flag) in flags.iter().enumerate() {
        let bits_consumed = if i == 0 {
            if flag & 0x01 != 0 {
                let value = decoder.decode(cursor)?;
                fields.push(("correlationId".to_string(), value));
            }
            if flag & 0x02 != 0 {
                cursor.read_u8()?;
                let bytes = decoder.decode(cursor)?;
                fields.push(("correlationId".to_string(), Value::String(bytes_to_uuid(&bytes)?)));
            }
            2
        } else {
            0
        };
        discard_remaining(decoder, cursor, flag, bits_consumed)?;
    }

    Ok(fields)
}

fn decode_dsk(decoder: &mut Amf3Decoder, cursor: &mut Cursor) -> Result<Value, AmfError> {
    let fields = decode_dsa(decoder, cursor)?;

    let flags = read_flag_block(cursor)?;
    for &flag in &flags {
        discard_remaining(decoder, cursor, flag, 0)?;
    }

    Ok(typed("DSK", fields))
}

/// Hex-encode a 16-byte array with dashes before byte indices 4, 6, 8, 10.
/// Validates the source value is an AMF3 ByteArray of exactly 16 bytes,
/// erroring instead of emitting a malformed string for any other length.
fn bytes_to_uuid(value: &Value) -> Result<String, AmfError> {
    let bytes = match value {
        Value::Bytes(b) => b,
        _ => return Err(AmfError::InvalidUuidBytes(0)),
    };
    if bytes.len() != 16 {
        return Err(AmfError::InvalidUuidBytes(bytes.len()));
    }
    let mut s = String::with_capacity(36);
    for (i, b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            s.push('-');
        }
        s.push_str(&format!("{b:02x}"));
    }
    Ok(s)
}
