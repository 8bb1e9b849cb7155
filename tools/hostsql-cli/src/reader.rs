//!
//! Script Reader
//!
//! Turns script text into host values with nom. A script is a sequence of
//! forms separated by whitespace and `;` line comments.
//!
//! Syntax:
//!   nil, t             - nil and true
//!   42, -7, 1.5, 2e3   - integers and floats
//!   "text\n"           - multibyte string (\" \\ \n \t escapes)
//!   #u"\x00\xff"       - unibyte string (same escapes plus \xHH)
//!   name               - symbol
//!   (a b c)            - list
//!
//! Errors carry a byte span into the source so they can be rendered with
//! miette (see `diagnostic`).
//!

use std::ops::Range;

use hostsql_core::{HostString, Value};
use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char, multispace1, not_line_ending};
use nom::combinator::value;
use nom::error::{ErrorKind, ParseError};
use nom::multi::many0_count;
use nom::sequence::pair;
use nom::IResult;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadErrorKind {
    #[error("expected a form")]
    ExpectedForm,

    #[error("unexpected `)`")]
    UnexpectedClose,

    #[error("unclosed list")]
    UnclosedList,

    #[error("unclosed string")]
    UnclosedString,

    #[error("invalid escape sequence `\\{0}`")]
    InvalidEscape(char),

    #[error("invalid byte escape, expected `\\x` and two hex digits")]
    InvalidByteEscape,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ReadError {
    pub kind: ReadErrorKind,
    pub span: Range<usize>,
}

/// A top-level form and where it sits in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Form {
    pub value: Value,
    pub span: Range<usize>,
}

type RResult<'a, O> = IResult<&'a str, O, RError<'a>>;

#[derive(Debug, Clone, PartialEq)]
struct RError<'a> {
    input: &'a str,
    kind: ReadErrorKind,
}

impl<'a> ParseError<&'a str> for RError<'a> {
    fn from_error_kind(input: &'a str, _kind: ErrorKind) -> Self {
        RError {
            input,
            kind: ReadErrorKind::ExpectedForm,
        }
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

fn failure(input: &str, kind: ReadErrorKind) -> nom::Err<RError<'_>> {
    nom::Err::Failure(RError { input, kind })
}

/// Whitespace and comments
fn ws(input: &str) -> RResult<'_, ()> {
    let comment = pair(char(';'), not_line_ending);
    value((), many0_count(alt((value((), multispace1), value((), comment)))))(input)
}

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | ';')
}

fn looks_numeric(token: &str) -> bool {
    let rest = token.strip_prefix(['+', '-']).unwrap_or(token);
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    rest.starts_with(|c: char| c.is_ascii_digit())
}

fn classify(token: &str) -> Value {
    match token {
        "nil" => return Value::Nil,
        "t" => return Value::True,
        _ => {}
    }
    if looks_numeric(token) {
        if let Ok(i) = token.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = token.parse::<f64>() {
            return Value::Float(f);
        }
    }
    Value::symbol(token)
}

fn atom(input: &str) -> RResult<'_, Value> {
    let (rest, token) = take_while1(is_atom_char)(input)?;
    Ok((rest, classify(token)))
}

/// Body of a string literal after its opening quote. `open` points at the
/// literal's start for unclosed-string errors.
fn string_body<'a>(open: &'a str, body: &'a str, unibyte: bool) -> RResult<'a, Vec<u8>> {
    let mut out = Vec::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Ok((&body[i + 1..], out)),
            '\\' => {
                let at = &body[i..];
                let byte = match chars.next() {
                    Some((_, '"')) => b'"',
                    Some((_, '\\')) => b'\\',
                    Some((_, 'n')) => b'\n',
                    Some((_, 't')) => b'\t',
                    Some((_, 'x')) if unibyte => {
                        let byte = body
                            .get(i + 2..i + 4)
                            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                        let Some(byte) = byte else {
                            return Err(failure(at, ReadErrorKind::InvalidByteEscape));
                        };
                        chars.next();
                        chars.next();
                        byte
                    }
                    Some((_, other)) => return Err(failure(at, ReadErrorKind::InvalidEscape(other))),
                    None => return Err(failure(open, ReadErrorKind::UnclosedString)),
                };
                out.push(byte);
            }
            _ => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    Err(failure(open, ReadErrorKind::UnclosedString))
}

fn string(input: &str) -> RResult<'_, Value> {
    let (body, _) = char('"')(input)?;
    let (rest, bytes) = string_body(input, body, false)?;
    Ok((rest, Value::String(HostString::multibyte(bytes))))
}

fn unibyte_string(input: &str) -> RResult<'_, Value> {
    let (body, _) = tag("#u\"")(input)?;
    let (rest, bytes) = string_body(input, body, true)?;
    Ok((rest, Value::unibyte(bytes)))
}

fn list(input: &str) -> RResult<'_, Value> {
    let (mut rest, _) = char('(')(input)?;
    let mut items = Vec::new();
    loop {
        let (after_ws, ()) = ws(rest)?;
        if after_ws.is_empty() {
            return Err(failure(input, ReadErrorKind::UnclosedList));
        }
        if let Some(after) = after_ws.strip_prefix(')') {
            return Ok((after, Value::List(items)));
        }
        let (after, item) = form(after_ws)?;
        items.push(item);
        rest = after;
    }
}

fn form(input: &str) -> RResult<'_, Value> {
    if input.starts_with(')') {
        return Err(failure(input, ReadErrorKind::UnexpectedClose));
    }
    alt((list, unibyte_string, string, atom))(input)
}

fn to_read_error(source: &str, err: nom::Err<RError<'_>>) -> ReadError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let start = source.len() - e.input.len();
            let width = match e.kind {
                ReadErrorKind::InvalidEscape(c) => 1 + c.len_utf8(),
                ReadErrorKind::InvalidByteEscape => 2,
                _ => e.input.chars().next().map_or(0, char::len_utf8),
            };
            ReadError {
                kind: e.kind,
                span: start..(start + width).min(source.len()),
            }
        }
        nom::Err::Incomplete(_) => ReadError {
            kind: ReadErrorKind::ExpectedForm,
            span: source.len()..source.len(),
        },
    }
}

/// Read every form in `source`
pub fn read_forms(source: &str) -> Result<Vec<Form>, ReadError> {
    let offset = |rest: &str| source.len() - rest.len();
    let mut forms = Vec::new();
    let mut input = source;
    loop {
        let (rest, ()) = ws(input).map_err(|e| to_read_error(source, e))?;
        if rest.is_empty() {
            return Ok(forms);
        }
        let start = offset(rest);
        let (after, value) = form(rest).map_err(|e| to_read_error(source, e))?;
        forms.push(Form {
            value,
            span: start..offset(after),
        });
        input = after;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(source: &str) -> Value {
        let mut forms = read_forms(source).unwrap();
        assert_eq!(forms.len(), 1, "{source}");
        forms.remove(0).value
    }

    #[test]
    fn test_atoms() {
        assert_eq!(read_one("nil"), Value::Nil);
        assert_eq!(read_one("t"), Value::True);
        assert_eq!(read_one("42"), Value::Integer(42));
        assert_eq!(read_one("-7"), Value::Integer(-7));
        assert_eq!(read_one("1.5"), Value::Float(1.5));
        assert_eq!(read_one("-.5"), Value::Float(-0.5));
        assert_eq!(read_one("2e3"), Value::Float(2000.0));
        assert_eq!(read_one("sqlite3-open"), Value::symbol("sqlite3-open"));
        assert_eq!(read_one("inf"), Value::symbol("inf"));
        assert_eq!(read_one("-"), Value::symbol("-"));
    }

    #[test]
    fn test_strings() {
        assert_eq!(read_one(r#""hi there""#), Value::text("hi there"));
        assert_eq!(read_one(r#""a\"b\\c\n\t""#), Value::text("a\"b\\c\n\t"));
        assert_eq!(read_one(r#""héllo""#), Value::text("héllo"));
        assert_eq!(read_one(r#""""#), Value::text(""));
        assert_eq!(
            read_one(r#"#u"\x00ab\xFF""#),
            Value::unibyte(vec![0x00, b'a', b'b', 0xff])
        );
    }

    #[test]
    fn test_lists_and_comments() {
        let forms = read_forms(
            "; open a database\n(sqlite3-open \":memory:\")  ; trailing\n(f (g 1) ())\n",
        )
        .unwrap();
        assert_eq!(forms.len(), 2);
        assert_eq!(
            forms[0].value,
            Value::List(vec![Value::symbol("sqlite3-open"), Value::text(":memory:")])
        );
        assert_eq!(
            forms[1].value,
            Value::List(vec![
                Value::symbol("f"),
                Value::List(vec![Value::symbol("g"), Value::Integer(1)]),
                Value::List(vec![]),
            ])
        );
    }

    #[test]
    fn test_form_spans() {
        let source = "  (a 1)\n(b)";
        let forms = read_forms(source).unwrap();
        assert_eq!(&source[forms[0].span.clone()], "(a 1)");
        assert_eq!(&source[forms[1].span.clone()], "(b)");
    }

    #[test]
    fn test_empty_script() {
        assert!(read_forms("").unwrap().is_empty());
        assert!(read_forms("  ; nothing here\n\n").unwrap().is_empty());
    }

    #[test]
    fn test_errors_point_at_source() {
        let err = read_forms("(a (b 1)").unwrap_err();
        assert_eq!(err.kind, ReadErrorKind::UnclosedList);
        assert_eq!(err.span, 0..1);

        let err = read_forms("(a)\n)").unwrap_err();
        assert_eq!(err.kind, ReadErrorKind::UnexpectedClose);
        assert_eq!(err.span, 4..5);

        let err = read_forms("(a \"open").unwrap_err();
        assert_eq!(err.kind, ReadErrorKind::UnclosedString);
        assert_eq!(err.span, 3..4);

        let err = read_forms(r#""bad \q""#).unwrap_err();
        assert_eq!(err.kind, ReadErrorKind::InvalidEscape('q'));
        assert_eq!(err.span, 5..7);

        let err = read_forms(r#""no \x41 in text""#).unwrap_err();
        assert_eq!(err.kind, ReadErrorKind::InvalidEscape('x'));

        let err = read_forms(r#"#u"\xZZ""#).unwrap_err();
        assert_eq!(err.kind, ReadErrorKind::InvalidByteEscape);
        assert_eq!(err.span, 3..5);
    }
}
