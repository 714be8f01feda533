//! Small helpers over `quick-xml` for working on raw part text.
//!
//! The writer edits slide XML by byte ranges rather than through a DOM, so
//! most helpers here return spans into the original string.

use hymn_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::ops::Range;

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Unescaped value of the attribute whose qualified name is `key`.
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Integer attribute, e.g. EMU offsets.
pub(crate) fn attr_i64(e: &BytesStart<'_>, key: &[u8]) -> Option<i64> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

/// Escape text for element content or attribute values.
pub(crate) fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Reader for a slice of a part, which may close elements it never opened.
fn fragment_reader(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.check_end_names(false);
    reader
}

/// Spans of every outermost element named `name` (local name), in order.
pub(crate) fn element_spans(xml: &str, name: &str) -> Result<Vec<Range<usize>>> {
    let mut reader = fragment_reader(xml);
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut open: Option<(usize, usize)> = None;

    loop {
        let before = reader.buffer_position();
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                depth += 1;
                if open.is_none() && local_name(e.name().as_ref()) == name.as_bytes() {
                    open = Some((before, depth));
                }
            }
            Ok(Event::Empty(ref e)) => {
                if open.is_none() && local_name(e.name().as_ref()) == name.as_bytes() {
                    spans.push(before..reader.buffer_position());
                }
            }
            Ok(Event::End(_)) => {
                if let Some((start, open_depth)) = open {
                    if open_depth == depth {
                        spans.push(start..reader.buffer_position());
                        open = None;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error scanning for <{name}>: {e}"))),
            _ => {}
        }
    }

    Ok(spans)
}

/// Span of the first element named `name`.
pub(crate) fn first_element(xml: &str, name: &str) -> Result<Option<Range<usize>>> {
    Ok(element_spans(xml, name)?.into_iter().next())
}

/// Values of every `r:`-prefixed attribute, i.e. relationship references.
pub(crate) fn relationship_refs(xml: &str) -> Result<Vec<String>> {
    let mut reader = fragment_reader(xml);
    let mut refs: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                for a in e.attributes().flatten() {
                    if a.key.as_ref().starts_with(b"r:") {
                        let value = String::from_utf8_lossy(&a.value).to_string();
                        if !value.is_empty() && !refs.contains(&value) {
                            refs.push(value);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(format!("Error reading relationship ids: {e}"))),
            _ => {}
        }
    }

    Ok(refs)
}

/// Largest `id` on any `cNvPr`, so new shapes can be numbered after it.
pub(crate) fn max_shape_id(xml: &str) -> u32 {
    let mut reader = Reader::from_str(xml);
    let mut max = 1;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if local_name(e.name().as_ref()) == b"cNvPr" =>
            {
                if let Some(id) = attr(e, b"id").and_then(|v| v.parse().ok()) {
                    max = max.max(id);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    max
}

/// Replace every quoted attribute value in `map` with its new value.
///
/// Goes through placeholders so that `rId2 -> rId3` and `rId3 -> rId2`
/// in the same map do not clobber each other.
pub(crate) fn remap_quoted(xml: &str, map: &[(String, String)]) -> String {
    let mut out = xml.to_string();
    for (i, (old, _)) in map.iter().enumerate() {
        out = out.replace(&format!("\"{old}\""), &format!("\"\u{1}{i}\u{1}\""));
    }
    for (i, (_, new)) in map.iter().enumerate() {
        out = out.replace(&format!("\"\u{1}{i}\u{1}\""), &format!("\"{new}\""));
    }
    out
}
