//! Typed node wrappers: the handle registry and the ownership model.
//!
//! A [`Node`] is a thin facade over one arena handle: the raw handle value,
//! the node class assigned at wrap time, and a *mortal* flag. Wrappers never
//! own tree memory. A mortal wrapper opts into automatic release via
//! [`Node::auto_free`]; a persistent wrapper (the default) is never released
//! automatically.
//!
//! Releasing a wrapper zeroes its handle as the final step, and every
//! operation rejects a zero handle with [`DomError::InvalidNode`] before
//! touching the arena. This is what makes a double release a typed error
//! instead of a double free.

use crate::engine::{Engine, Handle, NodeKind, TypeTag};
use crate::error::{DomError, Result};

/// A typed facade over one node handle.
///
/// Constructed by [`Node::wrap`], which reads the node-type tag from the
/// engine and records it as the wrapper's class. The class never changes;
/// the handle is zeroed by [`Node::release`].
#[derive(Debug, Clone)]
pub struct Node {
    raw: u32,
    class: TypeTag,
    mortal: bool,
}

impl Node {
    /// Wraps a raw handle into a typed, persistent node wrapper.
    ///
    /// Reads the node-type tag from the engine to select the class.
    /// Wrapping never mutates the tree.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNode` if `raw` is zero or does not refer to a live
    /// node.
    pub fn wrap(engine: &Engine, raw: u32) -> Result<Self> {
        let handle = Handle::from_raw(raw).ok_or(DomError::InvalidNode)?;
        let data = engine.get(handle).ok_or(DomError::InvalidNode)?;
        Ok(Self {
            raw,
            class: data.kind.tag(),
            mortal: false,
        })
    }

    /// Like [`Node::wrap`], but the returned wrapper is already mortal.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNode` if `raw` is zero or does not refer to a live
    /// node.
    pub fn wrap_mortal(engine: &Engine, raw: u32) -> Result<Self> {
        let mut node = Self::wrap(engine, raw)?;
        node.mortal = true;
        Ok(node)
    }

    /// Returns the raw handle value. Zero after release.
    #[must_use]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Returns the node class recorded at wrap time.
    #[must_use]
    pub fn class(&self) -> TypeTag {
        self.class
    }

    /// Returns the non-zero handle, or `InvalidNode` if this wrapper has
    /// been released.
    pub fn handle(&self) -> Result<Handle> {
        Handle::from_raw(self.raw).ok_or(DomError::InvalidNode)
    }

    /// Validity gate run at the entry of every operation: non-zero handle
    /// referring to a live arena slot.
    pub(crate) fn live(&self, engine: &Engine) -> Result<Handle> {
        let handle = self.handle()?;
        if engine.is_alive(handle) {
            Ok(handle)
        } else {
            Err(DomError::InvalidNode)
        }
    }

    // --- Ownership ---

    /// Returns true if this wrapper is eligible for automatic release.
    #[must_use]
    pub fn is_mortal(&self) -> bool {
        self.mortal
    }

    /// Marks this wrapper mortal. Pure — the tree is untouched.
    pub fn make_mortal(&mut self) {
        self.mortal = true;
    }

    /// Marks this wrapper persistent. Pure — the tree is untouched.
    pub fn make_persistent(&mut self) {
        self.mortal = false;
    }

    /// Releases the underlying node through the class-appropriate engine
    /// free primitive, then zeroes this wrapper's handle.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNode` if the handle is already zero (e.g., a second
    /// release) or stale.
    pub fn release(&mut self, engine: &mut Engine) -> Result<()> {
        let handle = self.live(engine)?;
        match self.class {
            TypeTag::Attribute => engine.free_attribute(handle),
            TypeTag::NamespaceDecl => engine.free_namespace(handle),
            TypeTag::Document => engine.free_document(handle),
            _ => engine.free_node(handle),
        }
        log::trace!(target: "domgraft.node", "released {:?} handle {}", self.class, self.raw);
        self.raw = 0;
        Ok(())
    }

    /// No-op unless mortal, in which case the node is released.
    ///
    /// # Errors
    ///
    /// Propagates `InvalidNode` from [`Node::release`].
    pub fn auto_free(&mut self, engine: &mut Engine) -> Result<()> {
        if self.mortal {
            self.release(engine)
        } else {
            Ok(())
        }
    }

    // --- Name and value projection ---

    /// Returns the node's name.
    ///
    /// Elements and attributes combine prefix and local name with a colon;
    /// text-like and document nodes report synthetic fixed names;
    /// declaration-class nodes report their declared name unmodified.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNode` if the handle is zero or stale.
    pub fn name(&self, engine: &Engine) -> Result<String> {
        let handle = self.live(engine)?;
        let name = match &engine.node(handle).kind {
            NodeKind::Element { name, prefix, .. }
            | NodeKind::Attribute { name, prefix, .. } => match prefix {
                Some(p) => format!("{p}:{name}"),
                None => name.clone(),
            },
            NodeKind::Text { .. } => "#text".to_string(),
            NodeKind::CData { .. } => "#cdata-section".to_string(),
            NodeKind::Comment { .. } => "#comment".to_string(),
            NodeKind::Document { .. } => "#document".to_string(),
            NodeKind::DocumentFragment => "#document-fragment".to_string(),
            NodeKind::ProcessingInstruction { target, .. } => target.clone(),
            NodeKind::EntityRef { name }
            | NodeKind::Notation { name }
            | NodeKind::Dtd { name, .. }
            | NodeKind::ElementDecl { name }
            | NodeKind::AttributeDecl { name }
            | NodeKind::EntityDecl { name } => name.clone(),
            NodeKind::NamespaceDecl { prefix, .. } => {
                prefix.clone().unwrap_or_else(|| "xmlns".to_string())
            }
            NodeKind::XIncludeStart => "xinclude_start".to_string(),
            NodeKind::XIncludeEnd => "xinclude_end".to_string(),
        };
        Ok(name)
    }

    /// Returns the node's value.
    ///
    /// Text-like nodes report their string content; elements, documents,
    /// and fragments report their XPath string-value (concatenated
    /// descendant text); attributes report their stored value; namespace
    /// declarations report their URI.
    ///
    /// # Errors
    ///
    /// Returns `InvalidNode` if the handle is zero or stale.
    pub fn value(&self, engine: &Engine) -> Result<String> {
        let handle = self.live(engine)?;
        let value = match &engine.node(handle).kind {
            NodeKind::Text { content }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => content.clone(),
            NodeKind::ProcessingInstruction { data, .. } => {
                data.clone().unwrap_or_default()
            }
            NodeKind::Attribute { value, .. } => value.clone(),
            NodeKind::NamespaceDecl { uri, .. } => uri.clone(),
            NodeKind::Element { .. }
            | NodeKind::Document { .. }
            | NodeKind::DocumentFragment => engine.text_content(handle),
            _ => String::new(),
        };
        Ok(value)
    }

    // --- Attributes ---

    /// Looks up an attribute value by name on an element.
    ///
    /// # Errors
    ///
    /// `InvalidNode` for a zero/stale handle, `InvalidAttribute` when this
    /// wrapper is not an element or the name is empty, `AttributeNotFound`
    /// on a lookup miss.
    pub fn attribute(&self, engine: &Engine, name: &str) -> Result<String> {
        let handle = self.live(engine)?;
        if self.class != TypeTag::Element || name.is_empty() {
            return Err(DomError::InvalidAttribute);
        }
        for &attr in engine.attrs(handle) {
            if let NodeKind::Attribute {
                name: attr_name,
                value,
                ..
            } = &engine.node(attr).kind
            {
                if attr_name == name {
                    return Ok(value.clone());
                }
            }
        }
        Err(DomError::AttributeNotFound {
            name: name.to_string(),
        })
    }

    /// Sets an attribute on an element, updating an existing attribute of
    /// the same name in place. Returns the attribute node's handle.
    ///
    /// # Errors
    ///
    /// `InvalidNode` for a zero/stale handle, `InvalidAttribute` when this
    /// wrapper is not an element or the name is empty.
    pub fn set_attribute(&self, engine: &mut Engine, name: &str, value: &str) -> Result<Handle> {
        let handle = self.live(engine)?;
        if self.class != TypeTag::Element || name.is_empty() {
            return Err(DomError::InvalidAttribute);
        }
        let existing = engine.attrs(handle).iter().copied().find(|&attr| {
            matches!(&engine.node(attr).kind,
                NodeKind::Attribute { name: n, .. } if n == name)
        });
        if let Some(attr) = existing {
            if let NodeKind::Attribute { value: v, .. } = &mut engine.node_mut(attr).kind {
                *v = value.to_string();
            }
            return Ok(attr);
        }
        Ok(engine.create_attribute(handle, None, name, value))
    }

    // --- Namespaces ---

    /// Declares a namespace locally on an element and returns the new
    /// declaration's handle.
    ///
    /// # Errors
    ///
    /// `InvalidNode` for a zero/stale handle, `InvalidNamespace` when this
    /// wrapper is not an element.
    pub fn declare_namespace(
        &self,
        engine: &mut Engine,
        prefix: Option<&str>,
        uri: &str,
    ) -> Result<Handle> {
        let handle = self.live(engine)?;
        if self.class != TypeTag::Element {
            return Err(DomError::InvalidNamespace);
        }
        Ok(engine.declare_ns(handle, prefix, uri))
    }

    /// Points this node's active-namespace reference at an existing
    /// declaration.
    ///
    /// # Errors
    ///
    /// `InvalidNode` for a zero/stale handle or a non-element,
    /// non-attribute wrapper; `InvalidNamespace` when `decl_raw` is zero,
    /// stale, or not a namespace declaration.
    pub fn set_namespace(&self, engine: &mut Engine, decl_raw: u32) -> Result<()> {
        let handle = self.live(engine)?;
        if !matches!(self.class, TypeTag::Element | TypeTag::Attribute) {
            return Err(DomError::InvalidNode);
        }
        let decl = Handle::from_raw(decl_raw).ok_or(DomError::InvalidNamespace)?;
        match engine.get(decl) {
            Some(data) if data.kind.tag() == TypeTag::NamespaceDecl => {}
            _ => return Err(DomError::InvalidNamespace),
        }
        engine.set_ns(handle, Some(decl));
        Ok(())
    }
}

/// Runs `f` with a node wrapper and guarantees [`Node::auto_free`] on every
/// exit path — the scoped-resource pattern for mortal wrappers.
///
/// When `f` succeeds, a release failure is surfaced; when `f` fails, its
/// error takes precedence.
///
/// # Errors
///
/// Propagates the closure's error, or the release error.
pub fn with_mortal<T, F>(engine: &mut Engine, mut node: Node, f: F) -> Result<T>
where
    F: FnOnce(&mut Engine, &mut Node) -> Result<T>,
{
    let outcome = f(engine, &mut node);
    let released = node.auto_free(engine);
    match outcome {
        Ok(value) => released.map(|()| value),
        Err(e) => Err(e),
    }
}

/// A distinguished wrapper for document handles.
///
/// Documents own whole trees: releasing one cascades over every descendant
/// through the engine's document-free primitive, after which no wrapper
/// for a descendant may be used. Released `Document` wrappers are the unit
/// of recycling for [`crate::pool::DocumentPool`].
#[derive(Debug)]
pub struct Document {
    raw: u32,
    mortal: bool,
}

impl Document {
    /// Returns an empty wrapper: handle zero, persistent. Used by the pool
    /// and by callers that bind a fresh handle afterwards.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            raw: 0,
            mortal: false,
        }
    }

    /// Creates a fresh document in the engine and binds it.
    pub fn create(engine: &mut Engine, version: Option<&str>, encoding: Option<&str>) -> Self {
        let handle = engine.create_document(version, encoding);
        Self {
            raw: handle.into_raw(),
            mortal: false,
        }
    }

    /// Wraps a raw handle known to be a document.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` if `raw` is zero, stale, or not a document node.
    pub fn wrap(engine: &Engine, raw: u32) -> Result<Self> {
        let handle = Handle::from_raw(raw).ok_or(DomError::InvalidDocument)?;
        match engine.get(handle) {
            Some(data) if data.kind.tag() == TypeTag::Document => Ok(Self {
                raw,
                mortal: false,
            }),
            _ => Err(DomError::InvalidDocument),
        }
    }

    /// Binds a fresh engine handle to this wrapper (e.g., right after
    /// [`DocumentPool::acquire`](crate::pool::DocumentPool::acquire)).
    pub fn bind(&mut self, handle: Handle) {
        self.raw = handle.into_raw();
    }

    /// Returns the raw handle value. Zero after release or for a pooled
    /// wrapper awaiting a bind.
    #[must_use]
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Returns the non-zero handle, or `InvalidDocument`.
    pub fn handle(&self) -> Result<Handle> {
        Handle::from_raw(self.raw).ok_or(DomError::InvalidDocument)
    }

    fn live(&self, engine: &Engine) -> Result<Handle> {
        let handle = self.handle()?;
        if engine.is_alive(handle) {
            Ok(handle)
        } else {
            Err(DomError::InvalidDocument)
        }
    }

    /// Returns true if this wrapper is eligible for automatic release.
    #[must_use]
    pub fn is_mortal(&self) -> bool {
        self.mortal
    }

    /// Marks this wrapper mortal.
    pub fn make_mortal(&mut self) {
        self.mortal = true;
    }

    /// Marks this wrapper persistent.
    pub fn make_persistent(&mut self) {
        self.mortal = false;
    }

    /// Returns the root element of the document, wrapped, if any.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for a zero/stale handle.
    pub fn root_element(&self, engine: &Engine) -> Result<Option<Node>> {
        let handle = self.live(engine)?;
        for child in engine.children(handle) {
            if engine.tag(child) == TypeTag::Element {
                return Node::wrap(engine, child.into_raw()).map(Some);
            }
        }
        Ok(None)
    }

    /// Returns the document's internal subset (DTD) node, if any.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for a zero/stale handle.
    pub fn internal_subset(&self, engine: &Engine) -> Result<Option<Node>> {
        let handle = self.live(engine)?;
        match &engine.node(handle).kind {
            NodeKind::Document {
                int_subset: Some(dtd),
                ..
            } => Node::wrap(engine, dtd.into_raw()).map(Some),
            _ => Ok(None),
        }
    }

    /// Returns the XML version from the document's declaration.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for a zero/stale handle.
    pub fn version(&self, engine: &Engine) -> Result<Option<String>> {
        let handle = self.live(engine)?;
        match &engine.node(handle).kind {
            NodeKind::Document { version, .. } => Ok(version.clone()),
            _ => Err(DomError::InvalidDocument),
        }
    }

    /// Returns the encoding from the document's declaration.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for a zero/stale handle.
    pub fn encoding(&self, engine: &Engine) -> Result<Option<String>> {
        let handle = self.live(engine)?;
        match &engine.node(handle).kind {
            NodeKind::Document { encoding, .. } => Ok(encoding.clone()),
            _ => Err(DomError::InvalidDocument),
        }
    }

    /// Returns the standalone flag from the document's declaration.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for a zero/stale handle.
    pub fn standalone(&self, engine: &Engine) -> Result<Option<bool>> {
        let handle = self.live(engine)?;
        match &engine.node(handle).kind {
            NodeKind::Document { standalone, .. } => Ok(*standalone),
            _ => Err(DomError::InvalidDocument),
        }
    }

    /// Returns the document's base URI, if set.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for a zero/stale handle.
    pub fn base_uri(&self, engine: &Engine) -> Result<Option<String>> {
        let handle = self.live(engine)?;
        match &engine.node(handle).kind {
            NodeKind::Document { base_uri, .. } => Ok(base_uri.clone()),
            _ => Err(DomError::InvalidDocument),
        }
    }

    /// Sets the document's base URI.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` for a zero/stale handle.
    pub fn set_base_uri(&self, engine: &mut Engine, uri: &str) -> Result<()> {
        let handle = self.live(engine)?;
        if let NodeKind::Document { base_uri, .. } = &mut engine.node_mut(handle).kind {
            *base_uri = Some(uri.to_string());
        }
        Ok(())
    }

    /// Frees the document's whole tree through the engine, then zeroes
    /// this wrapper's handle.
    ///
    /// # Errors
    ///
    /// `InvalidDocument` if the handle is already zero or stale.
    pub fn release(&mut self, engine: &mut Engine) -> Result<()> {
        let handle = self.live(engine)?;
        engine.free_document(handle);
        log::debug!(target: "domgraft.node", "released document handle {}", self.raw);
        self.raw = 0;
        Ok(())
    }

    /// No-op unless mortal, in which case the document is released.
    ///
    /// # Errors
    ///
    /// Propagates `InvalidDocument` from [`Document::release`].
    pub fn auto_free(&mut self, engine: &mut Engine) -> Result<()> {
        if self.mortal {
            self.release(engine)
        } else {
            Ok(())
        }
    }

    /// Resets this wrapper for pool reuse: handle zero, persistent.
    pub(crate) fn reset(&mut self) {
        self.raw = 0;
        self.mortal = false;
    }
}
