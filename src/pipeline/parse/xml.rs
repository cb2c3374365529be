use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ParseError;
use crate::types::activity::FileFormat;

pub(super) enum Node<'a> {
    Open(&'a [(String, String)]),
    Text(&'a str),
    Close,
}

/// Stream an XML document, calling `visit` with the qualified element path
/// for every element start, text run and element end. Returns the root
/// element's qualified name.
pub(super) fn walk<F>(bytes: &[u8], format: FileFormat, mut visit: F) -> Result<String, ParseError>
where
    F: FnMut(&[String], Node<'_>) -> Result<(), ParseError>,
{
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut path: Vec<String> = Vec::new();
    let mut root: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let (name, attributes) = open_element(&e, format)?;
                root.get_or_insert_with(|| name.clone());
                path.push(name);
                visit(&path, Node::Open(&attributes))?;
            }
            Ok(Event::Empty(e)) => {
                let (name, attributes) = open_element(&e, format)?;
                root.get_or_insert_with(|| name.clone());
                path.push(name);
                visit(&path, Node::Open(&attributes))?;
                visit(&path, Node::Close)?;
                path.pop();
            }
            Ok(Event::Text(e)) => {
                if !path.is_empty() {
                    let text = e
                        .unescape()
                        .map_err(|e| ParseError::decode(format, e.to_string()))?;
                    visit(&path, Node::Text(&text))?;
                }
            }
            Ok(Event::CData(e)) => {
                if !path.is_empty() {
                    let inner = e.into_inner();
                    let text = std::str::from_utf8(&inner)
                        .map_err(|e| ParseError::decode(format, e.to_string()))?;
                    visit(&path, Node::Text(text.trim()))?;
                }
            }
            Ok(Event::End(_)) => {
                visit(&path, Node::Close)?;
                path.pop();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::decode(format, e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = path.last() {
        return Err(ParseError::decode(
            format,
            format!("unexpected end of document inside <{}>", open),
        ));
    }

    root.ok_or_else(|| ParseError::decode(format, "document has no root element"))
}

fn open_element(
    e: &BytesStart<'_>,
    format: FileFormat,
) -> Result<(String, Vec<(String, String)>), ParseError> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| ParseError::decode(format, e.to_string()))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| ParseError::decode(format, e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| ParseError::decode(format, e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| ParseError::decode(format, e.to_string()))?;
        attributes.push((key.to_string(), value.into_owned()));
    }

    Ok((name, attributes))
}

/// Element name with any namespace prefix removed.
pub(super) fn local_name(qualified: &str) -> &str {
    qualified
        .rsplit_once(':')
        .map_or(qualified, |(_, local)| local)
}

/// Local names of the last `n` elements of `path`, outermost first.
pub(super) fn tail(path: &[String], n: usize) -> Vec<&str> {
    path[path.len().saturating_sub(n)..]
        .iter()
        .map(|name| local_name(name))
        .collect()
}

pub(super) fn attribute<'a>(attributes: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(k, _)| local_name(k) == key)
        .map(|(_, v)| v.as_str())
}

pub(super) fn number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(super) fn timestamp(text: &str) -> Option<DateTime<Utc>> {
    text.trim().parse::<DateTime<Utc>>().ok()
}
