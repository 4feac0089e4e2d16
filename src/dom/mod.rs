//! Live document model.
//!
//! A minimal, single-threaded node tree with exactly the mutation surface
//! the render engine needs:
//! - [`Document`] - node factory (elements, text, fragments, markers)
//! - [`NodeRef`] - cheap cloneable handle to a node (`Rc` inside)
//! - [`insert_before`] / [`detach`] - the two structural mutations
//!   directives perform
//! - attributes, text content and per-node event listeners
//!
//! Nodes have no layout, no styling and no namespace handling; they exist
//! so that generators can mutate a real tree in place and tests can observe
//! node identity across updates.

mod node;

pub use node::{detach, insert_before, Document, Listener, NodeRef};
