//! Template registry - named templates, custom tags, attribute handlers.
//!
//! A `Registry` is an explicit object passed to `compile`; nothing in the
//! engine is ambient or global. It owns three tables:
//!
//! - named templates (`register`/`get`), write-once per name: directives
//!   that take a template by string resolve through this table;
//! - custom tag handlers, consulted during compilation for any element
//!   that is not a built-in directive;
//! - attribute handlers, consulted on every attribute application
//!   (`class` is installed by default with flag-list semantics).
//!
//! Compiled templates hold the registry weakly, so dropping the registry
//! never leaks through template-held cycles; late lookups against a
//! dropped registry resolve to nothing.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::binder::{self, AttrPart};
use crate::dom::NodeRef;
use crate::error::TemplateError;
use crate::expr::Getter;
use crate::fetch::{self, AsyncTemplate};
use crate::render::{Rendered, Template};
use crate::value::Value;

/// What a custom tag handler receives for each occurrence of its tag:
/// the raw attribute map and the pre-compiled child content.
pub struct TagProps {
    pub attributes: HashMap<String, String>,
    pub content: Template,
}

/// Compile-time hook for a registered tag name.
pub type TagHandler = Rc<dyn Fn(&Rc<Registry>, TagProps) -> Result<Template, TemplateError>>;

/// Update-time hook for a registered attribute name.
pub type AttributeHandler = Rc<dyn Fn(&NodeRef, &Value, &[AttrPart])>;

pub struct Registry {
    templates: RefCell<HashMap<String, Template>>,
    tag_handlers: RefCell<HashMap<String, TagHandler>>,
    attribute_handlers: RefCell<HashMap<String, AttributeHandler>>,
}

impl Registry {
    /// Create a registry with the stock attribute handlers installed.
    pub fn new() -> Rc<Registry> {
        let registry = Rc::new(Registry {
            templates: RefCell::new(HashMap::new()),
            tag_handlers: RefCell::new(HashMap::new()),
            attribute_handlers: RefCell::new(HashMap::new()),
        });
        registry.register_attribute_handler(
            "class",
            Rc::new(|el, state, parts| {
                el.set_attribute("class", &binder::flag_list(parts, state));
            }),
        );
        registry
    }

    /// Compile template source against this registry.
    pub fn compile(
        self: &Rc<Self>,
        source: &str,
        file: Option<&str>,
    ) -> Result<Template, TemplateError> {
        crate::compile::compile(self, source, file)
    }

    /// Look up a named template.
    pub fn get(&self, name: &str) -> Option<Template> {
        self.templates.borrow().get(name).cloned()
    }

    /// Register a named template. Names are write-once: a second
    /// registration under the same name returns the existing template
    /// untouched and never runs the supplier.
    ///
    /// When `props` lists comma-separated property names, a tag handler
    /// for the name is installed as well: each occurrence of the tag
    /// evaluates the caller's attribute expressions into a derived state
    /// (shadowing the base state's fields) on first render and on every
    /// update.
    pub fn register(
        self: &Rc<Self>,
        name: &str,
        props: Option<&str>,
        supplier: impl FnOnce() -> Result<Template, TemplateError>,
    ) -> Result<Template, TemplateError> {
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }
        let template = supplier()?;
        self.templates
            .borrow_mut()
            .insert(name.to_string(), template.clone());

        if let Some(props) = props {
            let names: Vec<String> = props
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            self.register_tag_handler(name, property_handler(names, template.clone()));
        }
        tracing::debug!(template = name, "template registered");
        Ok(template)
    }

    /// Install a custom tag handler, replacing any previous one.
    pub fn register_tag_handler(&self, name: &str, handler: TagHandler) {
        self.tag_handlers
            .borrow_mut()
            .insert(name.to_string(), handler);
    }

    pub(crate) fn tag_handler(&self, name: &str) -> Option<TagHandler> {
        self.tag_handlers.borrow().get(name).cloned()
    }

    /// Install an attribute handler, replacing any previous one.
    pub fn register_attribute_handler(&self, name: &str, handler: AttributeHandler) {
        self.attribute_handlers
            .borrow_mut()
            .insert(name.to_string(), handler);
    }

    pub(crate) fn attribute_handler(&self, name: &str) -> Option<AttributeHandler> {
        self.attribute_handlers.borrow().get(name).cloned()
    }

    /// Register a template whose source arrives later (see [`crate::fetch`]).
    pub fn fetch(self: &Rc<Self>, url: &str, placeholder_class: Option<&str>) -> AsyncTemplate {
        fetch::async_template(self, url, placeholder_class)
    }
}

/// Tag handler wrapping a registered template with named properties. Each
/// property's value comes from the caller's attribute of the same name,
/// compiled as an expression over the caller's state; absent attributes
/// bind `Undefined`.
fn property_handler(names: Vec<String>, template: Template) -> TagHandler {
    Rc::new(move |_registry, props: TagProps| {
        let mut getters: Vec<(String, Option<Getter>)> = Vec::with_capacity(names.len());
        for name in &names {
            let getter = props
                .attributes
                .get(name)
                .map(|src| Getter::compile(src))
                .transpose()?;
            getters.push((name.clone(), getter));
        }
        let getters = Rc::new(getters);
        let template = template.clone();

        Ok(Template::new(move |doc, state, dispatch| {
            let getters = getters.clone();
            let derive = move |state: &Value| -> Value {
                state.extended(getters.iter().map(|(name, getter)| {
                    let value = getter
                        .as_ref()
                        .map(|g| g.eval(state))
                        .unwrap_or(Value::Undefined);
                    (name.clone(), value)
                }))
            };

            let mut instance = template.render(doc, &derive(state), dispatch);
            let output = instance.output_handle();
            Rendered::from_parts(
                output,
                Box::new(move |new_state| instance.update(&derive(new_state))),
            )
        }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeRef};
    use crate::render::noop_dispatch;
    use crate::testing::render_to_string;
    use serde_json::json;

    fn state(json: serde_json::Value) -> Value {
        Value::from_json(json)
    }

    fn mount(registry: &Rc<Registry>, source: &str, initial: &Value) -> (NodeRef, Rendered) {
        let template = registry.compile(source, None).unwrap();
        let doc = Document::new();
        let rendered = template.render(&doc, initial, &noop_dispatch());
        let root = doc.create_element("div");
        for node in rendered.output() {
            root.append_child(&node);
        }
        (root, rendered)
    }

    #[test]
    fn test_names_are_write_once() {
        let registry = Registry::new();
        let first = registry
            .register("widget", None, || registry.compile("<p>one</p>", None))
            .unwrap();
        let second = registry
            .register("widget", None, || registry.compile("<p>two</p>", None))
            .unwrap();
        assert!(first.same(&second));
        assert!(registry.get("widget").unwrap().same(&first));
    }

    #[test]
    fn test_supplier_error_propagates_and_registers_nothing() {
        let registry = Registry::new();
        let result = registry.register("bad", None, || registry.compile("<p>${a +}</p>", None));
        assert!(result.is_err());
        assert!(registry.get("bad").is_none());
    }

    #[test]
    fn test_registered_properties_derive_state_per_use() {
        let registry = Registry::new();
        registry
            .register("greeting", Some("who"), || {
                registry.compile("<p>Hello, ${who}!</p>", None)
            })
            .unwrap();

        let (root, mut rendered) = mount(
            &registry,
            r#"<greeting who="user.name"></greeting>"#,
            &state(json!({"user": {"name": "Ada"}})),
        );
        assert_eq!(render_to_string(&root.children()), "<p>Hello, Ada!</p>");

        rendered.update(&state(json!({"user": {"name": "Grace"}})));
        assert_eq!(render_to_string(&root.children()), "<p>Hello, Grace!</p>");
    }

    #[test]
    fn test_absent_property_attribute_binds_undefined() {
        let registry = Registry::new();
        registry
            .register("tag", Some("a, b"), || {
                registry.compile("<p>[${a}][${b}]</p>", None)
            })
            .unwrap();
        let (root, _) = mount(
            &registry,
            r#"<tag a="'x'"></tag>"#,
            &state(json!({})),
        );
        assert_eq!(render_to_string(&root.children()), "<p>[x][]</p>");
    }

    #[test]
    fn test_custom_tag_handler_receives_attributes_and_content() {
        let registry = Registry::new();
        registry.register_tag_handler(
            "boxed",
            Rc::new(|registry, props| {
                let kind = props.attributes.get("kind").cloned().unwrap_or_default();
                let inner = props.content;
                let wrapper = registry.compile(&format!(r#"<div class="{kind}"></div>"#), None)?;
                Ok(Template::new(move |doc, state, dispatch| {
                    let shell = wrapper.render(doc, state, dispatch);
                    let mut body = inner.render(doc, state, dispatch);
                    let host = shell.output()[0].clone();
                    for node in body.output() {
                        host.append_child(&node);
                    }
                    let output = shell.output_handle();
                    let mut shell = shell;
                    Rendered::from_parts(
                        output,
                        Box::new(move |new_state| {
                            shell.update(new_state);
                            body.update(new_state);
                        }),
                    )
                }))
            }),
        );

        let (root, _) = mount(
            &registry,
            r#"<boxed kind="note"><p>${msg}</p></boxed>"#,
            &state(json!({"msg": "hi"})),
        );
        assert_eq!(
            render_to_string(&root.children()),
            r#"<div class="note"><p>hi</p></div>"#
        );
    }

    #[test]
    fn test_default_class_handler_renders_flag_lists() {
        let registry = Registry::new();
        let (root, mut rendered) = mount(
            &registry,
            r#"<nav class="menu ${menu.open}"></nav>"#,
            &state(json!({"menu": {"open": true}})),
        );
        let nav = root.children()[0].clone();
        assert_eq!(nav.attribute("class").as_deref(), Some("menu open"));

        rendered.update(&state(json!({"menu": {"open": false}})));
        assert_eq!(nav.attribute("class").as_deref(), Some("menu"));
    }
}
