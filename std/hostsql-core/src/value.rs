//!
//! Host Value Representation
//!
//! Host values are dynamically typed. Only a subset can be stored in the
//! database (nil, integers, floats, strings); `True`, symbols and lists exist
//! so that the bind path can reject them with a proper error.
//!
//! Strings are byte sequences with an encoding flag:
//! - multibyte: character text, bound as TEXT
//! - unibyte: raw bytes, bound as BLOB
//!

use std::borrow::Cow;

/// A dynamically-typed host value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    True,
    Integer(i64),
    Float(f64),
    String(HostString),
    Symbol(String),
    List(Vec<Value>),
}

impl Value {
    /// Character text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::String(HostString::text(s))
    }

    /// Raw byte value
    pub fn unibyte(bytes: impl Into<Vec<u8>>) -> Self {
        Value::String(HostString::unibyte(bytes))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    /// `t` for true, `nil` for false
    pub fn from_bool(b: bool) -> Self {
        if b { Value::True } else { Value::Nil }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Name of the value's type as the host reports it
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::True => "t",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(s) if s.is_multibyte() => "string",
            Value::String(_) => "unibyte-string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&HostString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::from_bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<HostString> for Value {
    fn from(s: HostString) -> Self {
        Value::String(s)
    }
}

/// A host string: raw bytes plus the multibyte flag.
///
/// Multibyte strings are not guaranteed to be valid UTF-8; text read back
/// from the engine is kept byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostString {
    bytes: Vec<u8>,
    multibyte: bool,
}

impl HostString {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            bytes: s.into().into_bytes(),
            multibyte: true,
        }
    }

    /// Character text from bytes that are not checked for validity
    pub fn multibyte(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            multibyte: true,
        }
    }

    pub fn unibyte(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            multibyte: false,
        }
    }

    pub fn is_multibyte(&self) -> bool {
        self.multibyte
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

impl From<&str> for HostString {
    fn from(s: &str) -> Self {
        HostString::text(s)
    }
}

impl From<String> for HostString {
    fn from(s: String) -> Self {
        HostString::text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_unibyte_flags() {
        let text = HostString::text("héllo");
        assert!(text.is_multibyte());
        assert_eq!(text.len(), 6);

        let raw = HostString::unibyte(vec![0xff, 0x00, 0x41]);
        assert!(!raw.is_multibyte());
        assert_eq!(raw.as_bytes(), &[0xff, 0x00, 0x41]);
        assert_eq!(raw.to_string_lossy(), "\u{fffd}\u{0}A");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::True.type_name(), "t");
        assert_eq!(Value::from(3).type_name(), "integer");
        assert_eq!(Value::from(1.5).type_name(), "float");
        assert_eq!(Value::text("x").type_name(), "string");
        assert_eq!(Value::unibyte(*b"x").type_name(), "unibyte-string");
        assert_eq!(Value::symbol("foo").type_name(), "symbol");
        assert_eq!(Value::List(vec![]).type_name(), "list");
    }

    #[test]
    fn test_bool_conversion() {
        assert_eq!(Value::from(true), Value::True);
        assert_eq!(Value::from(false), Value::Nil);
        assert!(Value::from(false).is_nil());
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(42).as_integer(), Some(42));
        assert_eq!(Value::from(42).as_float(), None);
        assert_eq!(Value::from(0.5).as_float(), Some(0.5));
        assert_eq!(
            Value::from("hi").as_string().map(HostString::as_bytes),
            Some(&b"hi"[..])
        );
    }
}
