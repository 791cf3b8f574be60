//! # domgraft
//!
//! A managed facade over an arena-owned XML document tree. The crate hands
//! out safe-feeling, typed handles to tree nodes, tracks which handles are
//! allowed to trigger destruction of the underlying storage, and repairs
//! XML namespace scoping whenever nodes are relocated or detached.
//!
//! Parsing, serialization, XPath, and schema validation are external
//! collaborators reached through the narrow [`engine`] boundary; this crate
//! owns only the node-identity, lifetime, and namespace-reconciliation
//! logic layered on top of it.
//!
//! ## Quick start
//!
//! ```
//! use domgraft::{mutate, Document, Engine, Node};
//!
//! let mut engine = Engine::new();
//! let doc = Document::create(&mut engine, Some("1.0"), None);
//! let doc_h = doc.handle().unwrap();
//!
//! let root_h = engine.create_element(doc_h, None, "root");
//! engine.append_child(doc_h, root_h).unwrap();
//!
//! let root = Node::wrap(&engine, root_h.into_raw()).unwrap();
//! let child_h = engine.create_element(doc_h, None, "child");
//! let child = Node::wrap(&engine, child_h.into_raw()).unwrap();
//!
//! mutate::add_child(&mut engine, &root, &child).unwrap();
//! assert_eq!(child.name(&engine).unwrap(), "child");
//! ```
//!
//! ## Ownership
//!
//! Every wrapper starts *persistent*. Call [`Node::make_mortal`] (or wrap
//! with [`Node::wrap_mortal`]) to opt into automatic release, and scope it
//! with [`with_mortal`] so the release fires on every exit path. Releasing
//! zeroes the wrapper's handle; any further use is a typed
//! [`DomError::InvalidNode`], never a touch of freed storage.

pub mod engine;
pub mod error;
pub mod mutate;
pub mod node;
pub mod ns;
pub mod pool;

// Re-export primary types at the crate root for convenience.
pub use engine::{Engine, EngineConfig, Handle, NodeData, NodeKind, TypeTag};
pub use error::{DomError, Result};
pub use node::{with_mortal, Document, Node};
pub use pool::DocumentPool;
