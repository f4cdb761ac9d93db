//! AMF0/AMF3 decoding
//!
//! `envelope::decode_invoke_response` is the public entry point; the rest
//! of this module tree is the machinery it's built from.

mod amf0;
mod amf3;
mod cursor;
mod envelope;
mod error;
mod externalizable;
mod mutf8;
mod tables;
mod value;
mod varint;

pub use amf0::Amf0Decoder;
pub use amf3::Amf3Decoder;
pub use envelope::{decode_invoke_response, InvokeResponse};
pub use error::AmfError;
pub use value::{ClassDefinition, Value};
