//! AMF0/AMF3 decoder for RTMP invocation responses.
//!
//! See [`decode_invoke_response`] for the entry point.

mod amf;

pub use amf::{decode_invoke_response, Amf0Decoder, Amf3Decoder, AmfError, ClassDefinition, InvokeResponse, Value};
