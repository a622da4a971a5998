//! XML response to JSON mapping.
//!
//! A response is first reduced to its payload document (the content of the SOAP
//! body, or the whole document when it is not an envelope), written out as a
//! standalone UTF-8 document, and then re-read as a generic element tree that is
//! converted to JSON:
//!
//! - the result is `{ <root local name>: <root value> }`;
//! - a leaf element without attributes becomes its trimmed text;
//! - otherwise the element becomes an object of attributes and children in
//!   document order, repeated sibling names collapsing into an array;
//! - text mixed with child elements is kept under the `""` key.

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value as JsonValue};

use crate::error::MappingError;

const ENVELOPE: &[u8] = b"Envelope";
const BODY: &[u8] = b"Body";

/// Maps a raw response body to its canonical JSON string.
pub fn response_to_json(raw: &[u8]) -> Result<String, MappingError> {
    let value = response_to_value(raw)?;
    Ok(serde_json::to_string(&value)?)
}

pub fn response_to_value(raw: &[u8]) -> Result<JsonValue, MappingError> {
    let text = std::str::from_utf8(raw).map_err(|e| MappingError::Malformed(e.to_string()))?;
    let document = extract_payload(text.trim_start_matches('\u{feff}'))?;
    xml_to_json(&document)
}

/// Writes the payload element of `text` out as a standalone document with an XML declaration.
///
/// Namespace declarations the payload inherits from the envelope are copied onto its root.
pub fn extract_payload(text: &str) -> Result<String, MappingError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(serialize_err)?;

    let mut depth = 0usize;
    let mut rooted = false;
    let mut envelope = false;
    let mut in_body = false;
    let mut inherited: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    // Depth of the payload root while it is being copied.
    let mut copying: Option<usize> = None;
    let mut copied = false;

    loop {
        let event = reader.read_event().map_err(malformed)?;
        if let Event::Start(e) | Event::Empty(e) = &event {
            if depth == 0 {
                if rooted {
                    return Err(MappingError::Malformed("multiple root elements".into()));
                }
                rooted = true;
            }
            if copying.is_none() && !copied && (depth == 0 || (in_body && depth == 2)) {
                if depth == 0 && e.local_name().as_ref() == ENVELOPE {
                    collect_namespaces(e, &mut inherited)?;
                } else {
                    let root = with_namespaces(e, &inherited)?;
                    let root = if matches!(event, Event::Start(_)) {
                        copying = Some(depth + 1);
                        Event::Start(root)
                    } else {
                        copied = true;
                        Event::Empty(root)
                    };
                    writer.write_event(root).map_err(serialize_err)?;
                    if copying.is_some() {
                        depth += 1;
                    }
                    continue;
                }
            }
        }
        let copy = match &event {
            Event::Eof => break,
            Event::Start(e) => {
                depth += 1;
                if copying.is_some() {
                    true
                } else {
                    if depth == 1 && e.local_name().as_ref() == ENVELOPE {
                        envelope = true;
                    } else if envelope && depth == 2 && e.local_name().as_ref() == BODY {
                        collect_namespaces(e, &mut inherited)?;
                        in_body = true;
                    }
                    false
                }
            }
            Event::Empty(_) => copying.is_some(),
            Event::End(_) => {
                let copy = copying.is_some();
                if copying == Some(depth) {
                    copying = None;
                    copied = true;
                }
                if in_body && depth == 2 {
                    in_body = false;
                }
                depth = depth.saturating_sub(1);
                copy
            }
            Event::Text(t) => {
                if depth == 0 && !t.is_empty() {
                    return Err(MappingError::Malformed("text outside of the root element".into()));
                }
                copying.is_some()
            }
            Event::CData(_) => copying.is_some(),
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => false,
        };
        if copy {
            writer.write_event(event).map_err(serialize_err)?;
        }
    }

    if depth != 0 {
        return Err(MappingError::Malformed("unexpected end of document".into()));
    }
    if !copied {
        return Err(if envelope {
            MappingError::EmptyBody
        } else {
            MappingError::NoRootElement
        });
    }
    String::from_utf8(writer.into_inner()).map_err(serialize_err)
}

fn is_namespace_decl(key: &[u8]) -> bool {
    key == b"xmlns" || key.starts_with(b"xmlns:")
}

/// Records the `xmlns` declarations of `start`, replacing outer ones with the same prefix.
fn collect_namespaces(
    start: &BytesStart,
    into: &mut Vec<(Vec<u8>, Vec<u8>)>,
) -> Result<(), MappingError> {
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = attr.key.as_ref();
        if is_namespace_decl(key) {
            into.retain(|(k, _)| k.as_slice() != key);
            into.push((key.to_vec(), attr.value.into_owned()));
        }
    }
    Ok(())
}

/// `start` plus every inherited declaration it does not redeclare itself.
fn with_namespaces(
    start: &BytesStart,
    inherited: &[(Vec<u8>, Vec<u8>)],
) -> Result<BytesStart<'static>, MappingError> {
    let mut own = Vec::new();
    for attr in start.attributes() {
        own.push(attr.map_err(malformed)?.key.as_ref().to_vec());
    }
    let mut root = start.clone().into_owned();
    for (key, value) in inherited {
        if !own.contains(key) {
            root.push_attribute((key.as_slice(), value.as_slice()));
        }
    }
    Ok(root)
}

/// Converts a standalone XML document to `{ <root>: <value> }`.
pub fn xml_to_json(document: &str) -> Result<JsonValue, MappingError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, JsonValue)> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Eof => break,
            Event::Start(e) => stack.push(Node::open(&e)?),
            Event::Empty(e) => {
                let node = Node::open(&e)?;
                attach(&mut stack, &mut root, node.finish())?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| MappingError::Malformed("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, node.finish())?;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(malformed)?;
                match stack.last_mut() {
                    Some(node) => node.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(MappingError::Malformed(
                            "text outside of the root element".into(),
                        ))
                    }
                }
            }
            Event::CData(c) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err(MappingError::Malformed("unexpected end of document".into()));
    }
    let (name, value) = root.ok_or(MappingError::NoRootElement)?;
    let mut map = Map::new();
    map.insert(name, value);
    Ok(JsonValue::Object(map))
}

struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<(String, JsonValue)>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self, MappingError> {
        let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(malformed)?;
            let is_namespace_decl = attr.key.as_ref() == b"xmlns"
                || attr.key.prefix().is_some_and(|p| p.as_ref() == b"xmlns");
            if is_namespace_decl {
                continue;
            }
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value().map_err(malformed)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    fn finish(self) -> (String, JsonValue) {
        let text = self.text.trim();
        if self.children.is_empty() && self.attributes.is_empty() {
            return (self.name, JsonValue::String(text.to_string()));
        }
        let mut map = Map::new();
        for (k, v) in self.attributes {
            insert_collapsing(&mut map, k, JsonValue::String(v));
        }
        for (k, v) in self.children {
            insert_collapsing(&mut map, k, v);
        }
        if !text.is_empty() {
            insert_collapsing(&mut map, String::new(), JsonValue::String(text.to_string()));
        }
        (self.name, JsonValue::Object(map))
    }
}

fn attach(
    stack: &mut [Node],
    root: &mut Option<(String, JsonValue)>,
    (name, value): (String, JsonValue),
) -> Result<(), MappingError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push((name, value)),
        None if root.is_some() => {
            return Err(MappingError::Malformed("multiple root elements".into()))
        }
        None => *root = Some((name, value)),
    }
    Ok(())
}

// Node values are only strings or objects, so an array already in the map
// can only come from an earlier collapse.
fn insert_collapsing(map: &mut Map<String, JsonValue>, key: String, value: JsonValue) {
    match map.get_mut(&key) {
        None => {
            map.insert(key, value);
        }
        Some(JsonValue::Array(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::replace(existing, JsonValue::Null);
            *existing = JsonValue::Array(vec![first, value]);
        }
    }
}

fn malformed(e: impl std::fmt::Display) -> MappingError {
    MappingError::Malformed(e.to_string())
}

fn serialize_err(e: impl std::fmt::Display) -> MappingError {
    MappingError::Serialize(e.to_string())
}
