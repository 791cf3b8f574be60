//! Arena-based stand-in for the foreign XML engine.
//!
//! The facade treats the XML engine (parsing, serialization, XPath, schema)
//! as an external collaborator reached through a narrow call boundary. This
//! module models that collaborator's tree the same way the rest of the
//! crate's ancestry models libxml2's: an arena of nodes owned by an
//! [`Engine`] value, addressed by stable integer handles. [`Handle`] is a
//! newtype over `NonZeroU32`; the raw value `0` means "no node" everywhere
//! a raw handle crosses the boundary.
//!
//! The engine owns all node memory. Wrappers built on top of it (see
//! [`crate::node`]) are thin views and never owners, except where the
//! ownership model explicitly marks mortality and routes destruction
//! through one of the per-category free primitives below.

mod node;

pub use node::{NodeKind, TypeTag};

use std::num::NonZeroU32;

/// A typed index into the engine's node arena.
///
/// `Handle` is a newtype over `NonZeroU32`, so `Option<Handle>` has the
/// same size as `Handle` (niche optimization). Two handles refer to the
/// same node iff their raw values are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(NonZeroU32);

impl Handle {
    /// Creates a `Handle` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("Handle index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Converts this `Handle` to a raw `u32` for the wrapper boundary.
    ///
    /// The returned value is always non-zero (valid handles start at 1).
    /// Raw `0` represents "no node".
    #[must_use]
    pub fn into_raw(self) -> u32 {
        self.0.get()
    }

    /// Creates a `Handle` from a raw `u32`, if non-zero.
    ///
    /// Returns `None` if `raw` is 0.
    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }
}

/// Storage for a single node in the engine arena.
///
/// Each node stores its kind (element, text, declaration, etc.) plus links
/// to parent, children, and siblings for tree navigation.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node, if any.
    pub parent: Option<Handle>,
    /// First child node.
    pub first_child: Option<Handle>,
    /// Last child node (for O(1) append).
    pub last_child: Option<Handle>,
    /// Next sibling.
    pub next_sibling: Option<Handle>,
    /// Previous sibling.
    pub prev_sibling: Option<Handle>,
    /// The owning document, if any. Namespace declarations and standalone
    /// allocations may have none.
    pub(crate) doc: Option<Handle>,
    /// Set once by a free primitive. A freed slot keeps its payload (the
    /// arena never shrinks) but is dead to every boundary call.
    pub(crate) freed: bool,
}

impl NodeData {
    fn new(kind: NodeKind, doc: Option<Handle>) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
            doc,
            freed: false,
        }
    }
}

/// A structural refusal reported by an engine primitive.
///
/// Refusals are normal outcomes at the boundary (e.g., a cross-document
/// append); the facade wraps them with operation context before returning
/// them to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    /// The engine's reason, unmodified.
    pub message: String,
}

impl Refusal {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Construction-time configuration for the engine adapter.
///
/// Error reporting is per-engine, not a process-wide switch.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// When true, structural refusals are logged via `log::warn!` before
    /// being returned.
    pub report_structural_errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            report_structural_errors: true,
        }
    }
}

/// The node arena and the boundary primitives the facade consumes.
///
/// All structural state lives here. The facade's wrappers hold handles
/// into this arena and nothing else.
#[derive(Debug)]
pub struct Engine {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with explicit configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (Handle uses NonZeroU32).
        nodes.push(NodeData::new(NodeKind::DocumentFragment, None));
        Self { nodes, config }
    }

    fn alloc(&mut self, kind: NodeKind, doc: Option<Handle>) -> Handle {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind, doc));
        Handle::from_index(index)
    }

    // --- Node access ---

    /// Unchecked node access for crate internals, which only see handles
    /// that already passed a liveness gate. Public callers go through
    /// [`Engine::get`].
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a slot in the arena.
    pub(crate) fn node(&self, id: Handle) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: Handle) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Checked node access: returns `None` if the handle is out of range
    /// or refers to a freed slot.
    #[must_use]
    pub fn get(&self, id: Handle) -> Option<&NodeData> {
        self.nodes
            .get(id.as_index())
            .filter(|data| !data.freed)
    }

    /// Returns true if the handle refers to a live (not yet freed) slot.
    #[must_use]
    pub fn is_alive(&self, id: Handle) -> bool {
        self.get(id).is_some()
    }

    /// Reads the node-type tag. Never fails for a valid handle.
    #[must_use]
    pub fn tag(&self, id: Handle) -> TypeTag {
        self.node(id).kind.tag()
    }

    /// Returns the owning document of a node, if any.
    #[must_use]
    pub fn doc_of(&self, id: Handle) -> Option<Handle> {
        self.node(id).doc
    }

    /// Returns the total number of nodes in the arena (excluding the
    /// placeholder at index 0).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: Handle) -> Option<Handle> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: Handle) -> Option<Handle> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: Handle) -> Option<Handle> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    #[must_use]
    pub fn next_sibling(&self, id: Handle) -> Option<Handle> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: Handle) -> Option<Handle> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: Handle) -> Children<'_> {
        Children {
            engine: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over a node and its ancestors (walking up).
    pub fn ancestors(&self, id: Handle) -> Ancestors<'_> {
        Ancestors {
            engine: self,
            next: Some(id),
        }
    }

    // --- Link surgery (used by the tree mutator) ---

    pub(crate) fn set_parent(&mut self, id: Handle, parent: Option<Handle>) {
        self.node_mut(id).parent = parent;
    }

    pub(crate) fn set_first_child(&mut self, id: Handle, child: Option<Handle>) {
        self.node_mut(id).first_child = child;
    }

    pub(crate) fn set_last_child(&mut self, id: Handle, child: Option<Handle>) {
        self.node_mut(id).last_child = child;
    }

    pub(crate) fn set_next_sibling(&mut self, id: Handle, sib: Option<Handle>) {
        self.node_mut(id).next_sibling = sib;
    }

    pub(crate) fn set_prev_sibling(&mut self, id: Handle, sib: Option<Handle>) {
        self.node_mut(id).prev_sibling = sib;
    }

    // --- Creation ---

    /// Creates a new document node.
    pub fn create_document(
        &mut self,
        version: Option<&str>,
        encoding: Option<&str>,
    ) -> Handle {
        let id = self.alloc(
            NodeKind::Document {
                version: version.map(str::to_owned),
                encoding: encoding.map(str::to_owned),
                standalone: None,
                base_uri: None,
                int_subset: None,
            },
            None,
        );
        self.node_mut(id).doc = Some(id);
        id
    }

    /// Creates an element node owned by `doc`. The element starts detached,
    /// with no namespace and no attributes.
    pub fn create_element(&mut self, doc: Handle, prefix: Option<&str>, name: &str) -> Handle {
        self.alloc(
            NodeKind::Element {
                name: name.to_owned(),
                prefix: prefix.map(str::to_owned),
                ns: None,
                ns_decls: Vec::new(),
                attrs: Vec::new(),
            },
            Some(doc),
        )
    }

    /// Creates a text node owned by `doc`.
    pub fn create_text(&mut self, doc: Handle, content: &str) -> Handle {
        self.alloc(
            NodeKind::Text {
                content: content.to_owned(),
            },
            Some(doc),
        )
    }

    /// Creates a comment node owned by `doc`.
    pub fn create_comment(&mut self, doc: Handle, content: &str) -> Handle {
        self.alloc(
            NodeKind::Comment {
                content: content.to_owned(),
            },
            Some(doc),
        )
    }

    /// Creates a CDATA section node owned by `doc`.
    pub fn create_cdata(&mut self, doc: Handle, content: &str) -> Handle {
        self.alloc(
            NodeKind::CData {
                content: content.to_owned(),
            },
            Some(doc),
        )
    }

    /// Creates a processing instruction node owned by `doc`.
    pub fn create_pi(&mut self, doc: Handle, target: &str, data: Option<&str>) -> Handle {
        self.alloc(
            NodeKind::ProcessingInstruction {
                target: target.to_owned(),
                data: data.map(str::to_owned),
            },
            Some(doc),
        )
    }

    /// Creates an attribute node on `element`.
    ///
    /// The attribute's `parent` is the element, but it is never linked into
    /// the sibling chain — attributes are not structural children.
    pub fn create_attribute(
        &mut self,
        element: Handle,
        prefix: Option<&str>,
        name: &str,
        value: &str,
    ) -> Handle {
        let doc = self.node(element).doc;
        let attr = self.alloc(
            NodeKind::Attribute {
                name: name.to_owned(),
                prefix: prefix.map(str::to_owned),
                ns: None,
                value: value.to_owned(),
            },
            doc,
        );
        self.node_mut(attr).parent = Some(element);
        if let NodeKind::Element { attrs, .. } = &mut self.node_mut(element).kind {
            attrs.push(attr);
        }
        attr
    }

    /// Creates a DTD node, links it as a child of the document, and records
    /// it as the document's internal subset.
    pub fn create_dtd(
        &mut self,
        doc: Handle,
        name: &str,
        system_id: Option<&str>,
        public_id: Option<&str>,
    ) -> Handle {
        let dtd = self.alloc(
            NodeKind::Dtd {
                name: name.to_owned(),
                system_id: system_id.map(str::to_owned),
                public_id: public_id.map(str::to_owned),
            },
            Some(doc),
        );
        self.link_last(doc, dtd);
        if let NodeKind::Document { int_subset, .. } = &mut self.node_mut(doc).kind {
            *int_subset = Some(dtd);
        }
        dtd
    }

    /// Splices `child` in as the last child of `parent`. Internal; assumes
    /// `child` is detached.
    fn link_last(&mut self, parent: Handle, child: Handle) {
        self.node_mut(child).parent = Some(parent);
        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
            self.node_mut(parent).last_child = Some(child);
        } else {
            self.node_mut(parent).first_child = Some(child);
            self.node_mut(parent).last_child = Some(child);
        }
    }

    // --- Structural primitives ---

    /// Appends `child` as the last child of `parent`.
    ///
    /// # Errors
    ///
    /// Refuses when `child` belongs to a different document than `parent`,
    /// or when `child` is still linked somewhere (detach it first).
    pub fn append_child(&mut self, parent: Handle, child: Handle) -> Result<(), Refusal> {
        if let Some(refusal) = self.check_linkable(parent, child) {
            return Err(refusal);
        }
        self.link_last(parent, child);
        Ok(())
    }

    /// Inserts `new_child` before `reference` in the parent's child list.
    ///
    /// # Errors
    ///
    /// Refuses when `reference` is detached, when `new_child` belongs to a
    /// different document, or when `new_child` is still linked somewhere.
    pub fn insert_before(&mut self, reference: Handle, new_child: Handle) -> Result<(), Refusal> {
        let Some(parent) = self.node(reference).parent else {
            return Err(self.refuse("reference node has no parent"));
        };
        if let Some(refusal) = self.check_linkable(parent, new_child) {
            return Err(refusal);
        }

        self.node_mut(new_child).parent = Some(parent);
        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }
        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
        Ok(())
    }

    fn check_linkable(&self, parent: Handle, child: Handle) -> Option<Refusal> {
        if self.node(child).parent.is_some() {
            return Some(self.refuse("child is already linked; detach it first"));
        }
        match (self.node(parent).doc, self.node(child).doc) {
            (Some(p), Some(c)) if p != c => {
                Some(self.refuse("child belongs to a different document"))
            }
            _ => None,
        }
    }

    fn refuse(&self, message: &str) -> Refusal {
        if self.config.report_structural_errors {
            log::warn!(target: "domgraft.engine", "structural refusal: {message}");
        }
        Refusal::new(message)
    }

    /// Unlinks a DTD node. Dedicated primitive: besides the splice, it
    /// clears the owning document's internal-subset back-pointer.
    pub fn unlink_dtd(&mut self, dtd: Handle) {
        debug_assert_eq!(self.tag(dtd), TypeTag::Dtd);
        if let Some(doc) = self.node(dtd).doc {
            if let NodeKind::Document { int_subset, .. } = &mut self.node_mut(doc).kind {
                if *int_subset == Some(dtd) {
                    *int_subset = None;
                }
            }
        }
        self.splice_out(dtd);
    }

    fn splice_out(&mut self, id: Handle) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;
        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }
        self.node_mut(id).parent = None;
        self.node_mut(id).prev_sibling = None;
        self.node_mut(id).next_sibling = None;
    }

    // --- Namespaces ---

    /// Declares a namespace on `element` and returns the new declaration.
    pub fn declare_ns(&mut self, element: Handle, prefix: Option<&str>, uri: &str) -> Handle {
        let doc = self.node(element).doc;
        let decl = self.alloc(
            NodeKind::NamespaceDecl {
                prefix: prefix.map(str::to_owned),
                uri: uri.to_owned(),
            },
            doc,
        );
        self.add_ns_def(element, decl);
        decl
    }

    /// Sets (or clears) a node's active namespace reference.
    pub fn set_ns(&mut self, id: Handle, decl: Option<Handle>) {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { ns, .. } | NodeKind::Attribute { ns, .. } => *ns = decl,
            _ => {}
        }
    }

    /// Returns a node's active namespace reference, if any.
    #[must_use]
    pub fn ns_of(&self, id: Handle) -> Option<Handle> {
        match &self.node(id).kind {
            NodeKind::Element { ns, .. } | NodeKind::Attribute { ns, .. } => *ns,
            _ => None,
        }
    }

    /// Returns the local namespace declarations of an element.
    ///
    /// Returns an empty slice for non-element nodes — only elements carry
    /// declarations.
    #[must_use]
    pub fn local_decls(&self, id: Handle) -> &[Handle] {
        match &self.node(id).kind {
            NodeKind::Element { ns_decls, .. } => ns_decls,
            _ => &[],
        }
    }

    /// Removes `decl` from an element's local declaration list, comparing
    /// by handle identity (two distinct declarations may carry identical
    /// prefix and URI strings).
    ///
    /// Returns true if the declaration was present and removed.
    pub fn remove_ns_def(&mut self, id: Handle, decl: Handle) -> bool {
        if let NodeKind::Element { ns_decls, .. } = &mut self.node_mut(id).kind {
            if let Some(pos) = ns_decls.iter().position(|&d| d == decl) {
                ns_decls.remove(pos);
                return true;
            }
        }
        false
    }

    /// Appends `decl` to an element's local declaration list.
    pub fn add_ns_def(&mut self, id: Handle, decl: Handle) {
        if let NodeKind::Element { ns_decls, .. } = &mut self.node_mut(id).kind {
            ns_decls.push(decl);
        }
    }

    /// Returns the prefix of a namespace declaration.
    #[must_use]
    pub fn decl_prefix(&self, decl: Handle) -> Option<&str> {
        match &self.node(decl).kind {
            NodeKind::NamespaceDecl { prefix, .. } => prefix.as_deref(),
            _ => None,
        }
    }

    /// Returns the URI of a namespace declaration, or `""` for any other
    /// node kind.
    #[must_use]
    pub fn decl_uri(&self, decl: Handle) -> &str {
        match &self.node(decl).kind {
            NodeKind::NamespaceDecl { uri, .. } => uri,
            _ => "",
        }
    }

    /// Returns the attribute nodes of an element.
    #[must_use]
    pub fn attrs(&self, id: Handle) -> &[Handle] {
        match &self.node(id).kind {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// Ancestor-scoped namespace lookup: starting at `from` and walking up
    /// through parents, returns the first local declaration whose prefix
    /// matches. Returns `None` when no declaration is in scope — a normal
    /// outcome, not a failure.
    #[must_use]
    pub fn search_ns(&self, from: Handle, prefix: Option<&str>) -> Option<Handle> {
        for node in self.ancestors(from) {
            for &decl in self.local_decls(node) {
                if self.decl_prefix(decl) == prefix {
                    return Some(decl);
                }
            }
        }
        None
    }

    /// Clones a namespace declaration (prefix and URI) into a brand-new,
    /// unattached declaration.
    pub fn clone_ns(&mut self, decl: Handle) -> Handle {
        let (prefix, uri) = match &self.node(decl).kind {
            NodeKind::NamespaceDecl { prefix, uri } => (prefix.clone(), uri.clone()),
            _ => (None, String::new()),
        };
        let doc = self.node(decl).doc;
        self.alloc(NodeKind::NamespaceDecl { prefix, uri }, doc)
    }

    // --- Release primitives ---

    fn mark_freed(&mut self, id: Handle) {
        let data = self.node_mut(id);
        debug_assert!(!data.freed, "engine free primitive called twice on a node");
        data.freed = true;
    }

    /// Frees a namespace declaration. Must be called at most once per
    /// declaration.
    pub fn free_namespace(&mut self, decl: Handle) {
        debug_assert_eq!(self.tag(decl), TypeTag::NamespaceDecl);
        self.mark_freed(decl);
    }

    /// Frees an attribute node.
    pub fn free_attribute(&mut self, attr: Handle) {
        debug_assert_eq!(self.tag(attr), TypeTag::Attribute);
        self.mark_freed(attr);
    }

    /// Frees a node and its whole subtree, including attributes and local
    /// namespace declarations.
    pub fn free_node(&mut self, id: Handle) {
        let mut owned: Vec<Handle> = self.attrs(id).to_vec();
        owned.extend_from_slice(self.local_decls(id));
        for h in owned {
            if !self.node(h).freed {
                self.mark_freed(h);
            }
        }
        let children: Vec<Handle> = self.children(id).collect();
        for child in children {
            self.free_node(child);
        }
        self.mark_freed(id);
    }

    /// Frees a document and everything reachable from it. Cascades — no
    /// per-descendant release is required, but no handle into the tree may
    /// be used afterward.
    pub fn free_document(&mut self, doc: Handle) {
        debug_assert_eq!(self.tag(doc), TypeTag::Document);
        self.free_node(doc);
    }

    // --- Content projection helpers ---

    /// Returns the concatenated text of a node and all its descendants
    /// (the XPath string-value for elements and documents).
    #[must_use]
    pub fn text_content(&self, id: Handle) -> String {
        let mut buf = String::new();
        self.collect_text(id, &mut buf);
        buf
    }

    fn collect_text(&self, id: Handle, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => buf.push_str(content),
            NodeKind::Attribute { value, .. } => buf.push_str(value),
            _ => {
                for child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    engine: &'a Engine,
    next: Option<Handle>,
}

impl Iterator for Children<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.engine.node(current).next_sibling;
        Some(current)
    }
}

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    engine: &'a Engine,
    next: Option<Handle>,
}

impl Iterator for Ancestors<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.engine.node(current).parent;
        Some(current)
    }
}
