//! A minimal decoder for the self-describing metadata region.
//!
//! This is not a general UBJSON implementation. The metadata writer only
//! ever emits objects, strings, unsigned bytes and 32-bit integers, so
//! that's all we accept; anything else fails the decode, which the caller
//! treats as "no metadata".

use std::collections::BTreeMap;

use thiserror::Error;

use crate::reader;

const OBJECT_OPEN: u8 = b'{';
const OBJECT_CLOSE: u8 = b'}';
const STRING: u8 = b'S';
const UINT8: u8 = b'U';
const INT32: u8 = b'l';

#[derive(Debug, Error)]
pub enum UbjsonError {
    #[error("value marker {marker:#04x} at position {position} is not supported")]
    UnsupportedMarker { marker: u8, position: usize },

    #[error("ran out of bytes at position {0}")]
    UnexpectedEnd(usize),

    #[error("string length at position {0} is not an unsigned integer")]
    BadStringLength(usize),
}

/// A decoded metadata value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Object(BTreeMap<String, Value>),
    Str(String),
    U8(u8),
    I32(i32),
}

impl Value {
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Numeric accessor covering both integer widths.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::U8(value) => Some(i64::from(*value)),
            Value::I32(value) => Some(i64::from(*value)),
            _ => None,
        }
    }
}

/// Decodes the single value starting at the front of `buf`.
pub fn decode(buf: &[u8]) -> Result<Value, UbjsonError> {
    Decoder { buf, position: 0 }.read_value()
}

struct Decoder<'a> {
    buf: &'a [u8],
    position: usize,
}

impl Decoder<'_> {
    fn read_value(&mut self) -> Result<Value, UbjsonError> {
        let marker = self.next_byte()?;
        match marker {
            OBJECT_OPEN => self.read_object(),
            STRING => self.read_string().map(Value::Str),
            UINT8 => self.next_byte().map(Value::U8),
            INT32 => self.read_i32().map(Value::I32),
            other => Err(UbjsonError::UnsupportedMarker {
                marker: other,
                position: self.position - 1,
            }),
        }
    }

    fn read_object(&mut self) -> Result<Value, UbjsonError> {
        let mut fields = BTreeMap::new();

        while self.peek()? != OBJECT_CLOSE {
            let key = self.read_string()?;
            fields.insert(key, self.read_value()?);
        }

        // Step past the termination marker.
        self.position += 1;

        Ok(Value::Object(fields))
    }

    /// Object keys and string values are both length-prefixed; the length
    /// is itself a tagged integer value.
    fn read_string(&mut self) -> Result<String, UbjsonError> {
        let length = match self.read_value()? {
            Value::U8(value) => usize::from(value),
            Value::I32(value) if value >= 0 => value as usize,
            _ => return Err(UbjsonError::BadStringLength(self.position)),
        };

        let start = self.position;
        let end = start.checked_add(length).ok_or(UbjsonError::UnexpectedEnd(start))?;
        let bytes = self.buf.get(start..end).ok_or(UbjsonError::UnexpectedEnd(start))?;
        self.position = end;

        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    fn read_i32(&mut self) -> Result<i32, UbjsonError> {
        let value = reader::read_i32(self.buf, self.position).ok_or(UbjsonError::UnexpectedEnd(self.position))?;
        self.position += 4;
        Ok(value)
    }

    fn next_byte(&mut self) -> Result<u8, UbjsonError> {
        let byte = self.peek()?;
        self.position += 1;
        Ok(byte)
    }

    fn peek(&self) -> Result<u8, UbjsonError> {
        reader::read_u8(self.buf, self.position).ok_or(UbjsonError::UnexpectedEnd(self.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_nested_objects() {
        // { "startAt": "2017-12-18T21:14:14Z", "lastFrame": 3694,
        //   "players": { "0": { "characters": { "18": 5209 } } } }
        let mut buf = Vec::new();
        buf.push(b'{');
        buf.extend_from_slice(b"U\x07startAt");
        buf.extend_from_slice(b"SU\x142017-12-18T21:14:14Z");
        buf.extend_from_slice(b"U\x09lastFrame");
        buf.push(b'l');
        buf.extend_from_slice(&3694i32.to_be_bytes());
        buf.extend_from_slice(b"U\x07players");
        buf.extend_from_slice(b"{U\x010{U\x0Acharacters{U\x0218");
        buf.push(b'l');
        buf.extend_from_slice(&5209i32.to_be_bytes());
        buf.extend_from_slice(b"}}}");
        buf.push(b'}');

        let value = decode(&buf).expect("well-formed object");
        let root = value.as_object().expect("root is an object");

        assert_eq!(root.get("startAt").and_then(Value::as_str), Some("2017-12-18T21:14:14Z"));
        assert_eq!(root.get("lastFrame").and_then(Value::as_i64), Some(3694));

        let frames = root
            .get("players")
            .and_then(Value::as_object)
            .and_then(|players| players.get("0"))
            .and_then(Value::as_object)
            .and_then(|player| player.get("characters"))
            .and_then(Value::as_object)
            .and_then(|characters| characters.get("18"))
            .and_then(Value::as_i64);
        assert_eq!(frames, Some(5209));
    }

    #[test]
    fn unsupported_marker_is_an_error() {
        // 'd' (float32) is a real UBJSON marker we deliberately don't handle.
        let buf = b"{U\x01xd\x00\x00\x00\x00}";
        assert!(matches!(
            decode(buf),
            Err(UbjsonError::UnsupportedMarker { marker: b'd', .. })
        ));
    }

    #[test]
    fn truncated_buffer_is_an_error() {
        let buf = b"{U\x07startAt";
        assert!(matches!(decode(buf), Err(UbjsonError::UnexpectedEnd(_))));
    }

    #[test]
    fn string_length_must_be_an_integer() {
        // Object key whose length decodes to a string instead of an integer.
        let buf = b"{SU\x01a}";
        assert!(matches!(decode(buf), Err(UbjsonError::BadStringLength(_))));
    }
}
