//! Property-list documents as a generic value tree.
//!
//! Analyzer reports arrive as XML property lists or as JSON documents with
//! the same shape. Both are read into a `PlistValue` so the tree parser
//! only deals with one representation. Binary property lists are rejected.

use std::collections::BTreeMap;
use std::fmt::Display;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const BINARY_MAGIC: &[u8] = b"bplist";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Error raised when a document is not a readable property list.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct PlistError(String);

impl PlistError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A node of a property-list document.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
    Dict(BTreeMap<String, PlistValue>),
    Array(Vec<PlistValue>),
    String(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Date(String),
    /// Base64 payload with whitespace removed, not decoded.
    Data(String),
    /// JSON `null` as an array item. Kept so that item positions match the
    /// source document.
    Null,
}

impl PlistValue {
    pub fn as_dict(&self) -> Option<&BTreeMap<String, PlistValue>> {
        match self {
            Self::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PlistValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Element name of the value, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Dict(_) => "dict",
            Self::Array(_) => "array",
            Self::String(_) => "string",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Data(_) => "data",
            Self::Null => "null",
        }
    }
}

/// Parse a report document, detecting XML or JSON by its first character.
pub fn parse_document(bytes: &[u8]) -> Result<PlistValue, PlistError> {
    if bytes.starts_with(BINARY_MAGIC) {
        return Err(PlistError::new("binary property lists are not supported"));
    }
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PlistError::new(format!("document is not valid UTF-8: {e}")))?;

    if text.trim_start().starts_with(['{', '[']) {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| PlistError::new(format!("invalid JSON: {e}")))?;
        return match from_json(value) {
            PlistValue::Null => Err(PlistError::new("document is null")),
            value => Ok(value),
        };
    }
    parse_xml(text)
}

/// Convert a JSON value. A `null` map value is treated as an absent key;
/// a `null` array item becomes `PlistValue::Null` in place.
pub fn from_json(value: serde_json::Value) -> PlistValue {
    use serde_json::Value;

    match value {
        Value::Null => PlistValue::Null,
        Value::Bool(b) => PlistValue::Boolean(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => PlistValue::Integer(i),
            None => PlistValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => PlistValue::String(s),
        Value::Array(items) => PlistValue::Array(items.into_iter().map(from_json).collect()),
        Value::Object(map) => PlistValue::Dict(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, from_json(v)))
                .collect(),
        ),
    }
}

/// Parse an XML property list.
pub fn parse_xml(text: &str) -> Result<PlistValue, PlistError> {
    let mut doc = XmlDocument::new(text);
    let value = match doc.next()? {
        Event::Start(e) if e.name().as_ref() == b"plist" => {
            let value = doc.element()?;
            doc.close(b"plist")?;
            value
        }
        Event::Start(e) => doc.value(&e, false)?,
        Event::Empty(e) => doc.value(&e, true)?,
        Event::Eof => return Err(PlistError::new("document is empty")),
        other => return Err(doc.unexpected(&other, "a property list")),
    };

    match doc.next()? {
        Event::Eof => Ok(value),
        other => Err(doc.unexpected(&other, "end of document")),
    }
}

// -- XML reader --

struct XmlDocument<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> XmlDocument<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            reader: Reader::from_str(text),
        }
    }

    fn fail(&self, message: impl Display) -> PlistError {
        PlistError::new(format!(
            "{message} at byte {}",
            self.reader.buffer_position()
        ))
    }

    fn unexpected(&self, event: &Event<'_>, wanted: &str) -> PlistError {
        let found = match event {
            Event::Start(e) | Event::Empty(e) => {
                format!("<{}>", String::from_utf8_lossy(e.name().as_ref()))
            }
            Event::End(e) => format!("</{}>", String::from_utf8_lossy(e.name().as_ref())),
            Event::Eof => "end of document".to_string(),
            _ => "character data".to_string(),
        };
        self.fail(format!("expected {wanted}, found {found}"))
    }

    /// Next event with prolog, comments and processing instructions
    /// skipped.
    fn raw(&mut self) -> Result<Event<'a>, PlistError> {
        loop {
            let event = self.reader.read_event().map_err(|e| self.fail(e))?;
            match event {
                Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Next structural event; whitespace between elements is skipped.
    fn next(&mut self) -> Result<Event<'a>, PlistError> {
        loop {
            match self.raw()? {
                Event::Text(t) if t.iter().all(|b| b.is_ascii_whitespace()) => continue,
                other => return Ok(other),
            }
        }
    }

    fn close(&mut self, name: &[u8]) -> Result<(), PlistError> {
        match self.next()? {
            Event::End(e) if e.name().as_ref() == name => Ok(()),
            other => Err(self.unexpected(
                &other,
                &format!("</{}>", String::from_utf8_lossy(name)),
            )),
        }
    }

    /// The next event must open a value.
    fn element(&mut self) -> Result<PlistValue, PlistError> {
        match self.next()? {
            Event::Start(e) => self.value(&e, false),
            Event::Empty(e) => self.value(&e, true),
            other => Err(self.unexpected(&other, "a value element")),
        }
    }

    fn value(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<PlistValue, PlistError> {
        let name = start.name();
        let name = name.as_ref();
        let value = match name {
            b"dict" if empty => PlistValue::Dict(BTreeMap::new()),
            b"dict" => self.dict()?,
            b"array" if empty => PlistValue::Array(Vec::new()),
            b"array" => self.array()?,
            b"true" | b"false" => {
                if !empty {
                    self.close(name)?;
                }
                PlistValue::Boolean(name == b"true")
            }
            b"string" => PlistValue::String(self.text(name, empty)?),
            b"date" => PlistValue::Date(self.text(name, empty)?.trim().to_string()),
            b"data" => {
                let text = self.text(name, empty)?;
                PlistValue::Data(text.chars().filter(|c| !c.is_whitespace()).collect())
            }
            b"integer" => {
                let text = self.text(name, empty)?;
                let text = text.trim();
                let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                    Some(hex) => i64::from_str_radix(hex, 16),
                    None => text.parse::<i64>(),
                };
                PlistValue::Integer(
                    parsed.map_err(|_| self.fail(format!("invalid integer '{text}'")))?,
                )
            }
            b"real" => {
                let text = self.text(name, empty)?;
                PlistValue::Real(
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| self.fail(format!("invalid real '{}'", text.trim())))?,
                )
            }
            other => {
                return Err(self.fail(format!(
                    "unknown element <{}>",
                    String::from_utf8_lossy(other)
                )))
            }
        };
        Ok(value)
    }

    fn dict(&mut self) -> Result<PlistValue, PlistError> {
        let mut entries = BTreeMap::new();
        loop {
            match self.next()? {
                Event::End(e) if e.name().as_ref() == b"dict" => {
                    return Ok(PlistValue::Dict(entries));
                }
                Event::Start(e) if e.name().as_ref() == b"key" => {
                    let key = self.text(b"key", false)?;
                    let value = self.element()?;
                    entries.insert(key, value);
                }
                Event::Empty(e) if e.name().as_ref() == b"key" => {
                    let value = self.element()?;
                    entries.insert(String::new(), value);
                }
                other => return Err(self.unexpected(&other, "<key> or </dict>")),
            }
        }
    }

    fn array(&mut self) -> Result<PlistValue, PlistError> {
        let mut items = Vec::new();
        loop {
            match self.next()? {
                Event::End(e) if e.name().as_ref() == b"array" => {
                    return Ok(PlistValue::Array(items));
                }
                Event::Start(e) => items.push(self.value(&e, false)?),
                Event::Empty(e) => items.push(self.value(&e, true)?),
                other => return Err(self.unexpected(&other, "a value element or </array>")),
            }
        }
    }

    /// Character content up to the closing tag `end`, with entity and
    /// character references resolved.
    fn text(&mut self, end: &[u8], empty: bool) -> Result<String, PlistError> {
        let mut out = String::new();
        if empty {
            return Ok(out);
        }
        loop {
            match self.raw()? {
                Event::Text(t) => {
                    let decoded = t.decode().map_err(|e| self.fail(e))?;
                    out.push_str(&decoded);
                }
                Event::CData(c) => {
                    out.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Event::GeneralRef(r) => {
                    let name = r.decode().map_err(|e| self.fail(e))?;
                    let resolved = resolve_reference(&name)
                        .ok_or_else(|| self.fail(format!("unknown entity &{name};")))?;
                    out.push(resolved);
                }
                Event::End(e) if e.name().as_ref() == end => return Ok(out),
                other => {
                    return Err(self.unexpected(
                        &other,
                        &format!("</{}>", String::from_utf8_lossy(end)),
                    ))
                }
            }
        }
    }
}

/// Resolve a predefined entity or a numeric character reference.
fn resolve_reference(name: &str) -> Option<char> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}
