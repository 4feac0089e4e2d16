//! Node tree - elements, text nodes, fragments.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::value::Value;

/// Event listener attached to an element. Receives the event payload.
pub type Listener = Rc<dyn Fn(&Value)>;

// =============================================================================
// Document
// =============================================================================

/// Node factory handle, threaded through every generator per the render
/// protocol. Carries no state of its own; two documents produce
/// indistinguishable nodes.
#[derive(Clone, Default)]
pub struct Document;

impl Document {
    /// Create a document handle.
    pub fn new() -> Document {
        Document
    }

    /// Create an element node.
    pub fn create_element(&self, tag: &str) -> NodeRef {
        NodeRef(Rc::new(NodeData {
            kind: NodeKind::Element {
                tag: tag.to_string(),
                attributes: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
            },
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    /// Create a text node.
    pub fn create_text_node(&self, text: &str) -> NodeRef {
        NodeRef(Rc::new(NodeData {
            kind: NodeKind::Text(RefCell::new(text.to_string())),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    /// Create a document fragment.
    pub fn create_fragment(&self) -> NodeRef {
        NodeRef(Rc::new(NodeData {
            kind: NodeKind::Fragment,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
        }))
    }

    /// Create a marker: an empty text node adopted by a throwaway fragment,
    /// so sibling insertion works before the marker is attached anywhere
    /// real. The marker is never removed by the engine, only relocated by
    /// normal sibling insertion when its owner's output is appended.
    pub fn create_marker(&self) -> NodeRef {
        let marker = self.create_text_node("");
        let fragment = self.create_fragment();
        fragment.append_child(&marker);
        marker
    }
}

// =============================================================================
// Nodes
// =============================================================================

enum NodeKind {
    Element {
        tag: String,
        attributes: RefCell<Vec<(String, String)>>,
        listeners: RefCell<Vec<(String, Listener)>>,
    },
    Text(RefCell<String>),
    Fragment,
}

struct NodeData {
    kind: NodeKind,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<NodeRef>>,
}

/// Handle to a live node. Clones share the node; identity is [`NodeRef::same`].
#[derive(Clone)]
pub struct NodeRef(Rc<NodeData>);

impl NodeRef {
    /// Node identity (pointer equality).
    pub fn same(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Element tag name, if this is an element.
    pub fn tag(&self) -> Option<&str> {
        match &self.0.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// True for text nodes.
    pub fn is_text(&self) -> bool {
        matches!(self.0.kind, NodeKind::Text(_))
    }

    /// Current parent, if attached.
    pub fn parent(&self) -> Option<NodeRef> {
        self.0.parent.borrow().upgrade().map(NodeRef)
    }

    /// Snapshot of the current children.
    pub fn children(&self) -> Vec<NodeRef> {
        self.0.children.borrow().clone()
    }

    /// Append `child` as the last child, detaching it from any previous
    /// parent first.
    pub fn append_child(&self, child: &NodeRef) {
        detach(child);
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    // -------------------------------------------------------------------------
    // Text
    // -------------------------------------------------------------------------

    /// Text of a text node (empty for other kinds).
    pub fn text(&self) -> String {
        match &self.0.kind {
            NodeKind::Text(text) => text.borrow().clone(),
            _ => String::new(),
        }
    }

    /// Replace the text of a text node. No-op on other kinds.
    pub fn set_text(&self, text: &str) {
        if let NodeKind::Text(current) = &self.0.kind {
            *current.borrow_mut() = text.to_string();
        }
    }

    /// Concatenated text of this node and all descendants, in tree order.
    pub fn text_content(&self) -> String {
        match &self.0.kind {
            NodeKind::Text(text) => text.borrow().clone(),
            _ => self
                .0
                .children
                .borrow()
                .iter()
                .map(NodeRef::text_content)
                .collect(),
        }
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    /// Set or replace an attribute. No-op on non-elements.
    pub fn set_attribute(&self, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &self.0.kind {
            let mut attributes = attributes.borrow_mut();
            if let Some(entry) = attributes.iter_mut().find(|(n, _)| n == name) {
                entry.1 = value.to_string();
            } else {
                attributes.push((name.to_string(), value.to_string()));
            }
        }
    }

    /// Snapshot of all attributes in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        match &self.0.kind {
            NodeKind::Element { attributes, .. } => attributes.borrow().clone(),
            _ => Vec::new(),
        }
    }

    /// Read an attribute.
    pub fn attribute(&self, name: &str) -> Option<String> {
        match &self.0.kind {
            NodeKind::Element { attributes, .. } => attributes
                .borrow()
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    /// Register a listener for `event_type`. Listeners are never
    /// deregistered; they live as long as the element.
    pub fn add_event_listener(&self, event_type: &str, listener: Listener) {
        if let NodeKind::Element { listeners, .. } = &self.0.kind {
            listeners
                .borrow_mut()
                .push((event_type.to_string(), listener));
        }
    }

    /// Fire an event on this node. Listeners registered for `event_type`
    /// run in registration order with the given payload. No propagation:
    /// the engine registers listeners directly on the elements it binds.
    pub fn emit(&self, event_type: &str, payload: &Value) {
        let matching: Vec<Listener> = match &self.0.kind {
            NodeKind::Element { listeners, .. } => listeners
                .borrow()
                .iter()
                .filter(|(t, _)| t == event_type)
                .map(|(_, l)| l.clone())
                .collect(),
            _ => Vec::new(),
        };
        for listener in matching {
            listener(payload);
        }
    }
}

// =============================================================================
// Structural mutation
// =============================================================================

/// Insert `child` just before `reference`, in `reference`'s parent.
/// No-op (with a warning) when the reference is detached.
pub fn insert_before(child: &NodeRef, reference: &NodeRef) {
    let Some(parent) = reference.parent() else {
        tracing::warn!("insert_before against a detached reference node");
        return;
    };
    detach(child);
    let mut children = parent.0.children.borrow_mut();
    let position = children
        .iter()
        .position(|c| c.same(reference))
        .unwrap_or(children.len());
    children.insert(position, child.clone());
    *child.0.parent.borrow_mut() = Rc::downgrade(&parent.0);
}

/// Remove a node from its parent, if it has one.
pub fn detach(node: &NodeRef) {
    if let Some(parent) = node.parent() {
        parent.0.children.borrow_mut().retain(|c| !c.same(node));
        *node.0.parent.borrow_mut() = Weak::new();
    }
}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.0.kind {
            NodeKind::Element { tag, .. } => write!(f, "<{tag}>"),
            NodeKind::Text(text) => write!(f, "#text({:?})", text.borrow()),
            NodeKind::Fragment => write!(f, "#fragment"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_text_content() {
        let doc = Document::new();
        let p = doc.create_element("p");
        p.append_child(&doc.create_text_node("Hello, "));
        p.append_child(&doc.create_text_node("World!"));
        assert_eq!(p.text_content(), "Hello, World!");
        assert_eq!(p.children().len(), 2);
    }

    #[test]
    fn test_insert_before_positions_node() {
        let doc = Document::new();
        let parent = doc.create_element("ul");
        let a = doc.create_text_node("a");
        let c = doc.create_text_node("c");
        parent.append_child(&a);
        parent.append_child(&c);

        let b = doc.create_text_node("b");
        insert_before(&b, &c);
        assert_eq!(parent.text_content(), "abc");
    }

    #[test]
    fn test_append_reparents() {
        let doc = Document::new();
        let fragment = doc.create_fragment();
        let node = doc.create_text_node("x");
        fragment.append_child(&node);
        assert!(node.parent().unwrap().same(&fragment));

        let real = doc.create_element("div");
        real.append_child(&node);
        assert!(node.parent().unwrap().same(&real));
        assert!(fragment.children().is_empty());
    }

    #[test]
    fn test_detach_clears_parent() {
        let doc = Document::new();
        let parent = doc.create_element("div");
        let child = doc.create_text_node("x");
        parent.append_child(&child);

        detach(&child);
        assert!(child.parent().is_none());
        assert!(parent.children().is_empty());

        // Detaching twice is harmless.
        detach(&child);
    }

    #[test]
    fn test_marker_has_fragment_parent() {
        let doc = Document::new();
        let marker = doc.create_marker();
        let parent = marker.parent().expect("marker must be parented");
        assert_eq!(parent.children().len(), 1);
        assert!(marker.is_text());
        assert_eq!(marker.text(), "");
    }

    #[test]
    fn test_attributes() {
        let doc = Document::new();
        let el = doc.create_element("input");
        assert_eq!(el.attribute("type"), None);
        el.set_attribute("type", "text");
        el.set_attribute("type", "number");
        assert_eq!(el.attribute("type"), Some("number".to_string()));
    }

    #[test]
    fn test_emit_runs_matching_listeners() {
        use std::cell::Cell;

        let doc = Document::new();
        let button = doc.create_element("button");
        let clicks = Rc::new(Cell::new(0));

        let clicks_clone = clicks.clone();
        button.add_event_listener("click", Rc::new(move |_| {
            clicks_clone.set(clicks_clone.get() + 1);
        }));

        button.emit("click", &Value::Null);
        button.emit("keydown", &Value::Null);
        button.emit("click", &Value::Null);
        assert_eq!(clicks.get(), 2);
    }
}
