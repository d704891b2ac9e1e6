//! Read typed values out of field arguments.

use serde_json::{Map, Value};

use crate::translation::error::Error;

fn invalid(argument: &str, message: &str) -> Error {
    Error::InvalidArgument {
        argument: argument.to_string(),
        message: message.to_string(),
    }
}

/// A present, non-null argument value.
pub fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

pub fn as_object<'v>(argument: &str, value: &'v Value) -> Result<&'v Map<String, Value>, Error> {
    value
        .as_object()
        .ok_or_else(|| invalid(argument, "expected an object"))
}

pub fn as_array<'v>(argument: &str, value: &'v Value) -> Result<&'v Vec<Value>, Error> {
    value
        .as_array()
        .ok_or_else(|| invalid(argument, "expected a list"))
}

pub fn as_str<'v>(argument: &str, value: &'v Value) -> Result<&'v str, Error> {
    value
        .as_str()
        .ok_or_else(|| invalid(argument, "expected a string"))
}

/// A page size: a non-negative integer that fits 32 bits.
pub fn as_limit(argument: &str, value: &Value) -> Result<u32, Error> {
    value
        .as_u64()
        .and_then(|limit| u32::try_from(limit).ok())
        .ok_or_else(|| invalid(argument, "expected a non-negative integer"))
}

pub fn as_offset(argument: &str, value: &Value) -> Result<u64, Error> {
    value
        .as_u64()
        .ok_or_else(|| invalid(argument, "expected a non-negative integer"))
}
