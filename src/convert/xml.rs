//! Permissive XML-to-value reader.
//!
//! No schema is applied. Elements with only text become strings, elements
//! with children become objects, repeated sibling elements are collected
//! into an array, and attributes are kept under an `@_` prefix. Text is
//! never coerced to numbers, so codes such as `0012` keep their zeros.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ConvertError;
use crate::value::{RawRecord, RawValue};

const ATTRIBUTE_PREFIX: &str = "@_";
const TEXT_KEY: &str = "#text";

struct Frame {
    name: String,
    children: RawRecord,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>, position: u64) -> Result<Self, ConvertError> {
        let mut children = RawRecord::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| xml_error(position, e))?;
            let key = format!(
                "{}{}",
                ATTRIBUTE_PREFIX,
                String::from_utf8_lossy(attr.key.as_ref())
            );
            let value = attr.unescape_value().map_err(|e| xml_error(position, e))?;
            children.insert(key, RawValue::text(value.into_owned()));
        }

        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            children,
            text: String::new(),
        })
    }

    fn into_value(mut self) -> (String, RawValue) {
        let value = if self.children.is_empty() {
            RawValue::text(self.text)
        } else {
            if !self.text.is_empty() {
                self.children.insert(TEXT_KEY.to_string(), RawValue::text(self.text));
            }
            RawValue::Mapping(self.children)
        };
        (self.name, value)
    }
}

fn xml_error(position: u64, err: impl std::fmt::Display) -> ConvertError {
    ConvertError::Xml {
        position,
        message: err.to_string(),
    }
}

/// Insert a child under `name`, turning repeated names into an array.
fn attach(parent: &mut RawRecord, name: String, value: RawValue) {
    match parent.get_mut(&name) {
        Some(RawValue::Sequence(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::replace(existing, RawValue::null());
            *existing = RawValue::Sequence(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

pub fn parse_xml(xml: &str) -> Result<RawValue, ConvertError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root = RawRecord::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(position, e))?;

        match event {
            Event::Eof => break,
            Event::Start(ref e) => stack.push(Frame::open(e, position)?),
            Event::Empty(ref e) => {
                let (name, value) = Frame::open(e, position)?.into_value();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| xml_error(position, "closing tag without opening tag"))?;
                let (name, value) = frame.into_value();
                match stack.last_mut() {
                    Some(parent) => attach(&mut parent.children, name, value),
                    None => attach(&mut root, name, value),
                }
            }
            Event::Text(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    let text = e.unescape().map_err(|err| xml_error(position, err))?;
                    frame.text.push_str(&text);
                }
            }
            Event::CData(ref e) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            // Declarations, comments, processing instructions, doctype
            _ => {}
        }

        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(xml_error(
            reader.buffer_position() as u64,
            format!("unclosed element <{}>", open.name),
        ));
    }

    Ok(RawValue::Mapping(root))
}
