//! Property-list reader for `.xcspec` files.
//!
//! Xcode ships xcspecs as OpenStep ("ASCII") property lists, and tools
//! often convert them to XML or binary form. All three encodings are read:
//!
//! - XML and binary plists through the [`plist`] crate
//! - OpenStep plists, which that crate does not read, through a [`chumsky`]
//!   grammar
//!
//! Numbers, dates and data are not interpreted; they are kept as text.

use std::io::Cursor;
use std::path::Path;

use chumsky::prelude::*;
use indexmap::IndexMap;
use log::trace;

use crate::error::{Error, Result};

/// A property-list value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlistValue {
    String(String),
    Bool(bool),
    Array(Vec<PlistValue>),
    Dict(IndexMap<String, PlistValue>),
}

impl PlistValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PlistValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            PlistValue::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&IndexMap<String, PlistValue>> {
        match self {
            PlistValue::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Render a scalar the way build settings spell it: booleans become
    /// `YES` / `NO`. Arrays and dicts have no setting form.
    pub fn as_setting_string(&self) -> Option<String> {
        match self {
            PlistValue::String(s) => Some(s.clone()),
            PlistValue::Bool(true) => Some("YES".to_string()),
            PlistValue::Bool(false) => Some("NO".to_string()),
            PlistValue::Array(_) | PlistValue::Dict(_) => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Entry points
// ═══════════════════════════════════════════════════════════════════════════════

fn is_xml(source: &str) -> bool {
    let head = source.trim_start_matches('\u{feff}').trim_start();
    head.starts_with("<?xml") || head.starts_with("<!DOCTYPE") || head.starts_with("<plist")
}

/// Parse a property list from text, detecting XML vs. OpenStep encoding.
pub fn parse_plist(source: &str) -> Result<PlistValue> {
    if is_xml(source) {
        parse_xml_plist(source)
    } else {
        parse_ascii_plist(source)
    }
}

/// Read and parse a property list from disk, in any of the three encodings.
pub fn load_plist(path: impl AsRef<Path>) -> Result<PlistValue> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    trace!("reading property list {}", path.display());

    let bytes = std::fs::read(path)?;
    if bytes.starts_with(b"bplist") {
        return parse_binary_plist(&bytes);
    }
    let source = String::from_utf8(bytes).map_err(|_| {
        Error::UnsupportedConversion(format!("{} is not UTF-8 text", path.display()))
    })?;

    parse_plist(&source)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  XML and binary – plist crate
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse an XML property list (`<plist version="1.0">…</plist>`).
pub fn parse_xml_plist(source: &str) -> Result<PlistValue> {
    let cursor = Cursor::new(source.trim_start_matches('\u{feff}').as_bytes());
    let value = plist::Value::from_reader_xml(cursor)?;
    from_plist_value(value)
}

/// Parse a binary (`bplist00`) property list.
pub fn parse_binary_plist(bytes: &[u8]) -> Result<PlistValue> {
    let value = plist::Value::from_reader(Cursor::new(bytes))?;
    from_plist_value(value)
}

fn integer_text(i: plist::Integer) -> String {
    i.as_signed()
        .map(|v| v.to_string())
        .or_else(|| i.as_unsigned().map(|v| v.to_string()))
        .unwrap_or_default()
}

fn from_plist_value(value: plist::Value) -> Result<PlistValue> {
    let converted = match value {
        plist::Value::String(s) => PlistValue::String(s),
        plist::Value::Boolean(b) => PlistValue::Bool(b),
        plist::Value::Array(items) => PlistValue::Array(
            items
                .into_iter()
                .map(from_plist_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        plist::Value::Dictionary(dict) => PlistValue::Dict(
            dict.into_iter()
                .map(|(key, value)| Ok::<_, Error>((key, from_plist_value(value)?)))
                .collect::<Result<IndexMap<_, _>>>()?,
        ),
        plist::Value::Integer(i) => PlistValue::String(integer_text(i)),
        plist::Value::Real(r) => PlistValue::String(r.to_string()),
        // Same spelling as OpenStep `<hex data>`.
        plist::Value::Data(bytes) => {
            PlistValue::String(bytes.iter().map(|b| format!("{b:02x}")).collect())
        }
        other => {
            return Err(Error::MalformedPlist(format!(
                "unsupported property-list value {other:?}"
            )));
        }
    };
    Ok(converted)
}

// ═══════════════════════════════════════════════════════════════════════════════
//  OpenStep – chumsky
// ═══════════════════════════════════════════════════════════════════════════════

/// Whitespace, `// line` and `/* block */` comments.
fn blank<'a>() -> impl Parser<'a, &'a str, (), extra::Err<Simple<'a, char>>> + Clone {
    let line_comment = just("//").then(none_of('\n').repeated()).ignored();
    let block_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then(just("*/"))
        .ignored();
    let space = any().filter(|c: &char| c.is_whitespace()).ignored();

    choice((line_comment, block_comment, space)).repeated().ignored()
}

/// A punctuation character surrounded by optional blanks.
fn token<'a>(c: char) -> impl Parser<'a, &'a str, char, extra::Err<Simple<'a, char>>> + Clone {
    blank().ignore_then(just(c)).then_ignore(blank())
}

fn is_unquoted_char(c: &char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '+' | '/' | ':' | '.' | '-')
}

/// Build the chumsky parser for OpenStep property lists.
fn ascii_plist_parser<'a>() -> impl Parser<'a, &'a str, PlistValue, extra::Err<Simple<'a, char>>> {
    // ── Strings ──────────────────────────────────────────────────────────
    let escape = just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('r').to('\r'),
        any(),
    )));

    let double_quoted = just('"')
        .ignore_then(none_of("\\\"").or(escape).repeated().collect::<String>())
        .then_ignore(just('"'));

    let single_quoted = just('\'')
        .ignore_then(none_of('\'').repeated().collect::<String>())
        .then_ignore(just('\''));

    let unquoted = any()
        .filter(is_unquoted_char)
        .repeated()
        .at_least(1)
        .collect::<String>();

    let string = choice((double_quoted, single_quoted, unquoted));

    // ── <hex data> kept as text ─────────────────────────────────────────
    let data = just('<')
        .ignore_then(none_of('>').repeated().to_slice())
        .then_ignore(just('>'))
        .map(|s: &str| s.split_whitespace().collect::<String>());

    let value = recursive(|value| {
        let array = value
            .clone()
            .separated_by(token(','))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(token('('), token(')'))
            .map(PlistValue::Array);

        let entry = string
            .clone()
            .then_ignore(token('='))
            .then(value)
            .then_ignore(token(';'));

        let dict = entry
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(token('{'), token('}'))
            .map(|entries| PlistValue::Dict(entries.into_iter().collect()));

        choice((
            dict,
            array,
            data.map(PlistValue::String),
            string.clone().map(PlistValue::String),
        ))
    });

    blank().ignore_then(value).then_ignore(blank())
}

/// Parse an OpenStep (`{ Key = Value; }`) property list.
pub fn parse_ascii_plist(source: &str) -> Result<PlistValue> {
    let source = source.trim_start_matches('\u{feff}');
    ascii_plist_parser()
        .parse(source)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            Error::MalformedPlist(messages.join("; "))
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
