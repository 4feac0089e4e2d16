//! Template compiler - markup in, generator tree out.
//!
//! Compilation happens once per template source: parse the markup, walk
//! the node tree and build a [`Template`] for every node, then fold them
//! into a single template with [`concatenate`]. All expression parsing
//! happens here too, so a successfully compiled template never fails at
//! render time.
//!
//! Tag dispatch order: built-in directives (`if`, `unless`, `for`, `view`,
//! `yield`), then custom tag handlers registered on the [`Registry`],
//! then the plain element generator.

pub mod literal;
pub mod markup;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::binder::{self, AttrPart};
use crate::directives;
use crate::dom::NodeRef;
use crate::error::TemplateError;
use crate::expr::{Action, Getter};
use crate::registry::{Registry, TagProps};
use crate::render::{concatenate, Rendered, Template};
use crate::value::Value;

use literal::Segment;
use markup::MarkupNode;

/// Compile template source into a reusable [`Template`].
///
/// `file` labels the source in error positions (a path or URL).
pub fn compile(
    registry: &Rc<Registry>,
    source: &str,
    file: Option<&str>,
) -> Result<Template, TemplateError> {
    let _span = tracing::debug_span!("compile", file = file.unwrap_or("<inline>")).entered();
    let nodes = markup::parse_markup(source, file)?;
    let generators = build_generators(registry, &nodes)?;
    Ok(concatenate(generators))
}

/// One generator per markup node, in document order. Text nodes fan out
/// into one generator per tokenized segment.
fn build_generators(
    registry: &Rc<Registry>,
    nodes: &[MarkupNode],
) -> Result<Vec<Template>, TemplateError> {
    let mut generators = Vec::new();
    for node in nodes {
        match node {
            MarkupNode::Text(text) => {
                for segment in literal::tokenize(text)? {
                    match segment {
                        Segment::Text(literal) if literal.is_empty() => {}
                        Segment::Text(literal) => generators.push(static_text(literal)),
                        Segment::Expr(expression) => {
                            generators.push(dynamic_text(Getter::compile(&expression)?))
                        }
                    }
                }
            }
            MarkupNode::Element {
                tag,
                attributes,
                children,
            } => {
                generators.push(element(registry, tag, attributes, children)?);
            }
        }
    }
    Ok(generators)
}

fn element(
    registry: &Rc<Registry>,
    tag: &str,
    attributes: &[(String, String)],
    children: &[MarkupNode],
) -> Result<Template, TemplateError> {
    let content = concatenate(build_generators(registry, children)?);
    let tag_lower = tag.to_ascii_lowercase();

    match tag_lower.as_str() {
        "if" => {
            return Ok(directives::condition(
                content,
                optional_getter(attributes, "cond")?,
                false,
            ))
        }
        "unless" => {
            return Ok(directives::condition(
                content,
                optional_getter(attributes, "cond")?,
                true,
            ))
        }
        "for" => {
            return Ok(directives::list(
                registry,
                content,
                optional_getter(attributes, "each")?,
                attribute(attributes, "as").unwrap_or("content").to_string(),
                attribute(attributes, "index").unwrap_or("index").to_string(),
                optional_getter(attributes, "from")?,
            ))
        }
        "view" => {
            return Ok(directives::transclude(
                registry,
                content,
                optional_getter(attributes, "template")?,
                optional_getter(attributes, "state")?,
            ))
        }
        "yield" => return Ok(directives::yield_target()),
        _ => {}
    }

    if let Some(handler) = registry.tag_handler(&tag_lower) {
        let props = TagProps {
            attributes: attributes.iter().cloned().collect::<HashMap<_, _>>(),
            content,
        };
        return handler(registry, props);
    }

    element_generator(registry, tag, attributes, content)
}

fn attribute<'a>(attributes: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn optional_getter(
    attributes: &[(String, String)],
    name: &str,
) -> Result<Option<Getter>, TemplateError> {
    attribute(attributes, name)
        .map(|src| Getter::compile(src))
        .transpose()
}

// =============================================================================
// Leaf generators
// =============================================================================

fn static_text(literal: String) -> Template {
    Template::new(move |doc, _, _| {
        Rendered::new(vec![doc.create_text_node(&literal)], Box::new(|_| {}))
    })
}

/// Text node driven by a getter; re-evaluated on every update.
fn dynamic_text(getter: Getter) -> Template {
    Template::new(move |doc, state, _| {
        let node = doc.create_text_node(&getter.eval(state).display_string());
        let handle = node.clone();
        let getter = getter.clone();
        Rendered::new(
            vec![node],
            Box::new(move |new_state| {
                handle.set_text(&getter.eval(new_state).display_string());
            }),
        )
    })
}

/// Ordinary element. Event listeners are registered exactly once at
/// creation; they read the current state through a cell refreshed at the
/// top of every update. Plain attributes re-apply on every update through
/// the registry's attribute-handler table.
fn element_generator(
    registry: &Rc<Registry>,
    tag: &str,
    attributes: &[(String, String)],
    content: Template,
) -> Result<Template, TemplateError> {
    let mut events: Vec<(String, Action)> = Vec::new();
    let mut plain: Vec<(String, Vec<AttrPart>)> = Vec::new();
    for (name, value) in attributes {
        match name.strip_prefix("on-") {
            Some(event_type) => events.push((event_type.to_string(), Action::compile(value)?)),
            None => plain.push((name.clone(), binder::compile_attribute(value)?)),
        }
    }

    let tag = tag.to_string();
    let events = Rc::new(events);
    let plain = Rc::new(plain);
    let registry = Rc::downgrade(registry);

    Ok(Template::new(move |doc, state, dispatch| {
        let el = doc.create_element(&tag);
        let current_state = Rc::new(RefCell::new(state.clone()));

        for (event_type, action) in events.iter() {
            let action = action.clone();
            let cell = current_state.clone();
            let dispatch = dispatch.clone();
            el.add_event_listener(
                event_type,
                Rc::new(move |payload| {
                    let state = cell.borrow().clone();
                    action.run(&state, payload, &dispatch);
                }),
            );
        }

        let mut child_content = content.render(doc, state, dispatch);
        for node in child_content.output() {
            el.append_child(&node);
        }

        let handle = el.clone();
        let plain = plain.clone();
        let registry = registry.clone();
        let mut update = move |new_state: &Value| {
            *current_state.borrow_mut() = new_state.clone();
            for (name, parts) in plain.iter() {
                binder::apply_attribute(&registry, &handle, name, parts, new_state);
            }
            child_content.update(new_state);
        };
        update(state);

        let output: Vec<NodeRef> = vec![el];
        Rendered::new(output, Box::new(update))
    }))
}
