//! XML property lists (`<plist version="1.0">`).
//!
//! Reading goes through `quick-xml`'s event reader into a small element tree,
//! which is then mapped onto [`Value`]. Writing emits events straight from the
//! value tree.
//!
//! Types XML cannot express are written in their conventional stand-ins:
//! sets become `<array>`, uids become `<dict><key>CF$UID</key>...</dict>`.
//! Reading does not reverse either mapping.
//!
//! Elements nested more than [`MAX_DEPTH`] levels below `<plist>` are
//! rejected with `LimitExceeded` while the document is still being read.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::{PlistError, Result};
use crate::value::{Date, Dictionary, Integer, Real, Value, MAX_DEPTH};

const DOCTYPE: &str =
    r#"plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd""#;

/// Parse an XML property list.
///
/// The document root is normally `<plist>` wrapping one value; a bare value
/// element as the root is accepted too.
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    let root = read_document(bytes)?;
    if root.name != "plist" {
        return element_to_value(&root);
    }
    match root.children.as_slice() {
        [value] => element_to_value(value),
        [] => Err(xml_error("<plist> element is empty")),
        _ => Err(xml_error("<plist> element holds more than one value")),
    }
}

pub fn from_str(text: &str) -> Result<Value> {
    from_bytes(text.as_bytes())
}

/// Serialize a value tree as an XML property list document.
pub fn to_string(value: &Value) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    emit(&mut writer, Event::DocType(BytesText::from_escaped(DOCTYPE)))?;
    emit(
        &mut writer,
        Event::Start(BytesStart::new("plist").with_attributes([("version", "1.0")])),
    )?;
    write_value(&mut writer, value)?;
    emit(&mut writer, Event::End(BytesEnd::new("plist")))?;

    let mut out = String::from_utf8(writer.into_inner())
        .map_err(|_| xml_error("writer produced invalid UTF-8"))?;
    out.push('\n');
    Ok(out)
}

/// A parsed element: its name, concatenated text and child elements.
#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

fn read_document(bytes: &[u8]) -> Result<Element> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;
    // `<array>` and `<dict>` elements on the stack.
    let mut containers = 0;

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(start) => {
                let name = element_name(&start)?;
                if is_container(&name) {
                    check_depth(containers + 1)?;
                    containers += 1;
                }
                // `<plist>` and one leaf element may wrap the containers.
                check_depth(stack.len().saturating_sub(1))?;
                stack.push(Element {
                    name,
                    ..Element::default()
                });
            }
            Event::Empty(start) => {
                let name = element_name(&start)?;
                if is_container(&name) {
                    check_depth(containers + 1)?;
                }
                let element = Element {
                    name,
                    ..Element::default()
                };
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| xml_error("closing tag without an opening tag"))?;
                if is_container(&element.name) {
                    containers -= 1;
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&text.unescape().map_err(xml_error)?);
                }
            }
            Event::CData(data) => {
                if let Some(open) = stack.last_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(xml_error(format!("element <{}> is never closed", open.name)));
    }
    root.ok_or_else(|| xml_error("document has no root element"))
}

fn is_container(name: &str) -> bool {
    matches!(name, "array" | "dict")
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > MAX_DEPTH {
        return Err(PlistError::LimitExceeded(format!(
            "containers nested deeper than {MAX_DEPTH} levels"
        )));
    }
    Ok(())
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    std::str::from_utf8(start.name().as_ref())
        .map(str::to_string)
        .map_err(xml_error)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(xml_error("document has more than one root element"));
    }
    Ok(())
}

fn element_to_value(element: &Element) -> Result<Value> {
    let text = element.text.as_str();
    match element.name.as_str() {
        "dict" => {
            let mut dict = Dictionary::new();
            let mut children = element.children.iter();
            while let Some(key) = children.next() {
                if key.name != "key" {
                    return Err(xml_error(format!(
                        "expected <key> in <dict>, found <{}>",
                        key.name
                    )));
                }
                let value = children
                    .next()
                    .ok_or_else(|| xml_error(format!("key '{}' has no value", key.text)))?;
                dict.insert(key.text.clone(), element_to_value(value)?);
            }
            Ok(Value::Dictionary(dict))
        }
        "array" => element
            .children
            .iter()
            .map(element_to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        "string" => Ok(Value::String(text.to_string())),
        "integer" => parse_integer(text.trim())
            .map(Value::Integer)
            .ok_or_else(|| xml_error(format!("invalid integer '{}'", text.trim()))),
        "real" => text
            .trim()
            .parse::<f64>()
            .map(|r| Value::Real(Real::double(r)))
            .map_err(|_| xml_error(format!("invalid real '{}'", text.trim()))),
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        "date" => Date::parse(text)
            .map(Value::Date)
            .ok_or_else(|| xml_error(format!("invalid date '{}'", text.trim()))),
        "data" => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map(Value::Data)
                .map_err(|err| xml_error(format!("invalid base64 data: {err}")))
        }
        other => Err(xml_error(format!("unexpected element <{other}>"))),
    }
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_integer(text: &str) -> Option<Integer> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    Integer::new(if negative { -magnitude } else { magnitude })
}

fn write_value<W: std::io::Write>(writer: &mut Writer<W>, value: &Value) -> Result<()> {
    match value {
        Value::Dictionary(dict) => write_dictionary(writer, dict.iter()),
        Value::Array(items) | Value::Set(items) => {
            if items.is_empty() {
                return emit(writer, Event::Empty(BytesStart::new("array")));
            }
            emit(writer, Event::Start(BytesStart::new("array")))?;
            for item in items {
                write_value(writer, item)?;
            }
            emit(writer, Event::End(BytesEnd::new("array")))
        }
        Value::String(s) => write_text_element(writer, "string", s),
        Value::Integer(i) => write_text_element(writer, "integer", &i.to_string()),
        Value::Real(r) => write_text_element(writer, "real", &r.value().to_string()),
        Value::Boolean(true) => emit(writer, Event::Empty(BytesStart::new("true"))),
        Value::Boolean(false) => emit(writer, Event::Empty(BytesStart::new("false"))),
        Value::Date(d) => write_text_element(writer, "date", &d.to_xml_string()),
        Value::Data(bytes) => write_text_element(writer, "data", &STANDARD.encode(bytes)),
        Value::Uid(uid) => {
            let id = Value::from(uid.get());
            write_dictionary(writer, std::iter::once((&"CF$UID".to_string(), &id)))
        }
    }
}

fn write_dictionary<'v, W: std::io::Write>(
    writer: &mut Writer<W>,
    entries: impl ExactSizeIterator<Item = (&'v String, &'v Value)>,
) -> Result<()> {
    if entries.len() == 0 {
        return emit(writer, Event::Empty(BytesStart::new("dict")));
    }
    emit(writer, Event::Start(BytesStart::new("dict")))?;
    for (key, value) in entries {
        write_text_element(writer, "key", key)?;
        write_value(writer, value)?;
    }
    emit(writer, Event::End(BytesEnd::new("dict")))
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    // An indenting writer would put whitespace between an empty start and end tag.
    if text.is_empty() {
        return emit(writer, Event::Empty(BytesStart::new(name)));
    }
    emit(writer, Event::Start(BytesStart::new(name)))?;
    emit(writer, Event::Text(BytesText::new(text)))?;
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit<W: std::io::Write>(writer: &mut Writer<W>, event: Event<'_>) -> Result<()> {
    writer.write_event(event).map_err(xml_error)
}

fn xml_error(err: impl std::fmt::Display) -> PlistError {
    PlistError::Xml(err.to_string())
}
