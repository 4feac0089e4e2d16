//! Markup reader - source text to a raw node tree.
//!
//! The compiler front half: parse template markup into [`MarkupNode`]s
//! with quick-xml, keeping whitespace intact (text nodes carry meaning in
//! templates) and decoding entities. Placeholder syntax is untouched here;
//! text and attribute values still contain raw `${...}` segments for the
//! tokenizer.
//!
//! Template sources are fragments, not documents, so the input is wrapped
//! in a synthetic root element before parsing. Error positions are mapped
//! back to the unwrapped source.

use quick_xml::escape::resolve_xml_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::TemplateError;

const SYNTHETIC_ROOT: &str = "template-root";

/// A parsed markup node, before any generator is built from it.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element {
        tag: String,
        /// Attributes in source order, raw values (placeholders intact).
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Text(String),
}

/// Parse a markup fragment into its top-level nodes.
///
/// `file` is an optional origin label (a path or URL) carried into error
/// positions.
pub fn parse_markup(source: &str, file: Option<&str>) -> Result<Vec<MarkupNode>, TemplateError> {
    let wrapped = format!("<{SYNTHETIC_ROOT}>{source}</{SYNTHETIC_ROOT}>");
    let prefix_len = SYNTHETIC_ROOT.len() + 2;
    let mut reader = Reader::from_str(&wrapped);

    // (tag, attributes, children) frames; index 0 is the synthetic root.
    let mut stack: Vec<(String, Vec<(String, String)>, Vec<MarkupNode>)> =
        vec![(SYNTHETIC_ROOT.to_string(), Vec::new(), Vec::new())];
    let mut roots: Vec<MarkupNode> = Vec::new();

    loop {
        let position = reader.buffer_position();
        match reader.read_event() {
            Err(err) => {
                return Err(markup_error(
                    &err.to_string(),
                    source,
                    position as usize,
                    prefix_len,
                    file,
                ))
            }
            Ok(Event::Start(start)) => {
                let (tag, attributes) =
                    read_tag(&start, source, position as usize, prefix_len, file)?;
                stack.push((tag, attributes, Vec::new()));
            }
            Ok(Event::Empty(start)) => {
                let (tag, attributes) =
                    read_tag(&start, source, position as usize, prefix_len, file)?;
                push_child(
                    &mut stack,
                    &mut roots,
                    MarkupNode::Element {
                        tag,
                        attributes,
                        children: Vec::new(),
                    },
                );
            }
            Ok(Event::End(_)) => {
                // Name balance is checked by the reader itself.
                if let Some((tag, attributes, children)) = stack.pop() {
                    if stack.is_empty() {
                        // Synthetic root closed; its children are the result.
                        roots = children;
                    } else {
                        push_child(
                            &mut stack,
                            &mut roots,
                            MarkupNode::Element {
                                tag,
                                attributes,
                                children,
                            },
                        );
                    }
                }
            }
            Ok(Event::Text(text)) => {
                let decoded = text.decode().map_err(|err| {
                    markup_error(&err.to_string(), source, position as usize, prefix_len, file)
                })?;
                push_text(&mut stack, decoded.as_ref());
            }
            Ok(Event::GeneralRef(entity)) => {
                let raw = entity.decode().map_err(|err| {
                    markup_error(&err.to_string(), source, position as usize, prefix_len, file)
                })?;
                push_text(&mut stack, &resolve_entity(&raw));
            }
            Ok(Event::CData(cdata)) => {
                let text = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                push_text(&mut stack, &text);
            }
            Ok(Event::Comment(_)) | Ok(Event::PI(_)) | Ok(Event::Decl(_))
            | Ok(Event::DocType(_)) => {}
            Ok(Event::Eof) => {
                if stack.len() > 1 {
                    let open = &stack[stack.len() - 1].0;
                    return Err(markup_error(
                        &format!("unclosed element <{open}>"),
                        source,
                        wrapped.len(),
                        prefix_len,
                        file,
                    ));
                }
                break;
            }
        }
    }

    Ok(roots)
}

fn read_tag(
    start: &BytesStart,
    source: &str,
    position: usize,
    prefix_len: usize,
    file: Option<&str>,
) -> Result<(String, Vec<(String, String)>), TemplateError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr
            .map_err(|err| markup_error(&err.to_string(), source, position, prefix_len, file))?;
        let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| markup_error(&err.to_string(), source, position, prefix_len, file))?
            .into_owned();
        attributes.push((name, value));
    }
    Ok((tag, attributes))
}

/// Append a child to the innermost open element (or the result set once
/// the synthetic root has closed).
fn push_child(
    stack: &mut [(String, Vec<(String, String)>, Vec<MarkupNode>)],
    roots: &mut Vec<MarkupNode>,
    node: MarkupNode,
) {
    match stack.last_mut() {
        Some((_, _, children)) => children.push(node),
        None => roots.push(node),
    }
}

/// Entity references split runs of text into several events; adjacent
/// text merges back into one node so placeholder spans stay contiguous.
fn push_text(stack: &mut [(String, Vec<(String, String)>, Vec<MarkupNode>)], text: &str) {
    if let Some((_, _, children)) = stack.last_mut() {
        if let Some(MarkupNode::Text(existing)) = children.last_mut() {
            existing.push_str(text);
            return;
        }
        children.push(MarkupNode::Text(text.to_string()));
    }
}

/// Named entities via quick-xml's table, numeric `&#NN;` / `&#xNN;` by
/// code point, anything else passed through verbatim.
fn resolve_entity(raw: &str) -> String {
    if let Some(resolved) = resolve_xml_entity(raw) {
        return resolved.to_string();
    }
    if let Some(rest) = raw.strip_prefix('#') {
        let code = if let Some(hex) = rest.strip_prefix('x').or_else(|| rest.strip_prefix('X')) {
            u32::from_str_radix(hex, 16).ok()
        } else {
            rest.parse::<u32>().ok()
        };
        if let Some(ch) = code.and_then(char::from_u32) {
            return ch.to_string();
        }
    }
    format!("&{raw};")
}

/// Map a byte offset inside the wrapped buffer back to a line/column in
/// the original source.
fn markup_error(
    message: &str,
    source: &str,
    position: usize,
    prefix_len: usize,
    file: Option<&str>,
) -> TemplateError {
    let offset = position.saturating_sub(prefix_len).min(source.len());
    let consumed = &source[..offset];
    let line = consumed.matches('\n').count() as u32 + 1;
    let column = match consumed.rfind('\n') {
        Some(last) => (offset - last) as u32,
        None => offset as u32 + 1,
    };
    tracing::debug!(message, file, line, column, "markup parse failed");
    TemplateError::Markup {
        message: message.to_string(),
        file: file.map(str::to_string),
        line: Some(line),
        column: Some(column),
    }
}
