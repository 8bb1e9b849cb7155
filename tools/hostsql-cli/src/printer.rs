//!
//! Printing host values back in script syntax.
//!
//! Floats always carry a decimal point so they read back as floats.
//! Unibyte strings print as `#u"..."` with `\xHH` for anything outside
//! printable ASCII.
//!

use std::fmt;

use hostsql_core::{HostString, Value};

/// Display adapter for a value in script syntax
pub struct Printed<'a>(pub &'a Value);

impl fmt::Display for Printed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self.0)
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Nil => f.write_str("nil"),
        Value::True => f.write_str("t"),
        Value::Integer(i) => write!(f, "{}", i),
        Value::Float(x) => write_float(f, *x),
        Value::String(s) if s.is_multibyte() => write_text(f, s),
        Value::String(s) => write_unibyte(f, s.as_bytes()),
        Value::Symbol(name) => f.write_str(name),
        Value::List(items) => {
            f.write_str("(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write_value(f, item)?;
            }
            f.write_str(")")
        }
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        return f.write_str("nan");
    }
    if x.is_infinite() {
        return f.write_str(if x > 0.0 { "inf" } else { "-inf" });
    }
    let repr = format!("{:?}", x);
    match repr.find('e') {
        Some(e) if !repr[..e].contains('.') => write!(f, "{}.0{}", &repr[..e], &repr[e..]),
        _ => f.write_str(&repr),
    }
}

fn write_text(f: &mut fmt::Formatter<'_>, s: &HostString) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.to_string_lossy().chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("\"")
}

fn write_unibyte(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("#u\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            b'\t' => f.write_str("\\t")?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\x{:02x}", b)?,
        }
    }
    f.write_str("\"")
}
