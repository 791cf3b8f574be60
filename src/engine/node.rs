//! Node kind and type-tag definitions.
//!
//! `NodeKind` carries the payload for each node category in the engine's
//! arena; `TypeTag` is its fieldless mirror, read by the handle registry to
//! dispatch wrapper construction. The tag space is closed and fully
//! enumerated: an out-of-range tag cannot be represented, and every match
//! on it is exhaustive.

use super::Handle;

/// The kind of a tree node and its associated data.
///
/// Navigation links (parent, children, siblings) are stored in
/// [`NodeData`](super::NodeData), not here.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The document node that owns a whole tree.
    Document {
        /// XML version from the XML declaration (e.g., "1.0").
        version: Option<String>,
        /// Encoding from the XML declaration (e.g., "UTF-8").
        encoding: Option<String>,
        /// Standalone flag from the XML declaration.
        standalone: Option<bool>,
        /// Base URI of the document, if known.
        base_uri: Option<String>,
        /// Internal-subset (DTD) back-pointer, cleared by
        /// [`Engine::unlink_dtd`](super::Engine::unlink_dtd).
        int_subset: Option<Handle>,
    },

    /// An element node, e.g., `<foo:item>`.
    Element {
        /// The element's local name.
        name: String,
        /// Namespace prefix, if any.
        prefix: Option<String>,
        /// Active namespace reference. Need not be declared locally — it
        /// may point at an ancestor's declaration.
        ns: Option<Handle>,
        /// Local namespace declarations carried by this element.
        ns_decls: Vec<Handle>,
        /// Attribute nodes owned by this element. Attributes are not
        /// structural children; they never appear in the sibling chain.
        attrs: Vec<Handle>,
    },

    /// An attribute node.
    Attribute {
        /// The attribute's local name.
        name: String,
        /// Namespace prefix, if any.
        prefix: Option<String>,
        /// Active namespace reference, if any.
        ns: Option<Handle>,
        /// The attribute value.
        value: String,
    },

    /// A text node containing character data.
    Text {
        /// The text content.
        content: String,
    },

    /// A CDATA section.
    CData {
        /// The CDATA content (no escaping applied).
        content: String,
    },

    /// A comment node.
    Comment {
        /// The comment text (without delimiters).
        content: String,
    },

    /// A processing instruction, e.g., `<?target data?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// An entity reference node.
    EntityRef {
        /// The entity name (without `&` and `;`).
        name: String,
    },

    /// A document fragment node.
    DocumentFragment,

    /// A notation declared in the DTD.
    Notation {
        /// The notation name.
        name: String,
    },

    /// A document type declaration node.
    Dtd {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
    },

    /// An element declaration inside the DTD.
    ElementDecl {
        /// The declared element name.
        name: String,
    },

    /// An attribute-list declaration inside the DTD.
    AttributeDecl {
        /// The declared attribute name.
        name: String,
    },

    /// An entity declaration inside the DTD.
    EntityDecl {
        /// The declared entity name.
        name: String,
    },

    /// A namespace declaration: a (prefix, URI) pair. Attached to an
    /// element's local declaration list, or referenced from a node's
    /// active-namespace slot, or both.
    NamespaceDecl {
        /// The declared prefix; `None` for the default namespace.
        prefix: Option<String>,
        /// The declared URI.
        uri: String,
    },

    /// Marker left at the start of an expanded XInclude.
    XIncludeStart,

    /// Marker left at the end of an expanded XInclude.
    XIncludeEnd,
}

impl NodeKind {
    /// Returns the fieldless type tag for this kind.
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Document { .. } => TypeTag::Document,
            Self::Element { .. } => TypeTag::Element,
            Self::Attribute { .. } => TypeTag::Attribute,
            Self::Text { .. } => TypeTag::Text,
            Self::CData { .. } => TypeTag::CData,
            Self::Comment { .. } => TypeTag::Comment,
            Self::ProcessingInstruction { .. } => TypeTag::ProcessingInstruction,
            Self::EntityRef { .. } => TypeTag::EntityRef,
            Self::DocumentFragment => TypeTag::DocumentFragment,
            Self::Notation { .. } => TypeTag::Notation,
            Self::Dtd { .. } => TypeTag::Dtd,
            Self::ElementDecl { .. } => TypeTag::ElementDecl,
            Self::AttributeDecl { .. } => TypeTag::AttributeDecl,
            Self::EntityDecl { .. } => TypeTag::EntityDecl,
            Self::NamespaceDecl { .. } => TypeTag::NamespaceDecl,
            Self::XIncludeStart => TypeTag::XIncludeStart,
            Self::XIncludeEnd => TypeTag::XIncludeEnd,
        }
    }
}

/// The closed set of node categories, as read from a node's storage.
///
/// Wrapper construction dispatches on this tag. Matching is exhaustive
/// everywhere — there is no "unknown tag" arm to reach at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Element node.
    Element,
    /// Attribute node.
    Attribute,
    /// Text node.
    Text,
    /// CDATA section node.
    CData,
    /// Entity reference node.
    EntityRef,
    /// Processing instruction node.
    ProcessingInstruction,
    /// Comment node.
    Comment,
    /// Document node.
    Document,
    /// Document fragment node.
    DocumentFragment,
    /// Notation node.
    Notation,
    /// Document type declaration node.
    Dtd,
    /// Element declaration node (DTD).
    ElementDecl,
    /// Attribute-list declaration node (DTD).
    AttributeDecl,
    /// Entity declaration node (DTD).
    EntityDecl,
    /// Namespace declaration node.
    NamespaceDecl,
    /// XInclude start marker.
    XIncludeStart,
    /// XInclude end marker.
    XIncludeEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_round_trip_for_payload_kinds() {
        let elem = NodeKind::Element {
            name: "item".to_string(),
            prefix: None,
            ns: None,
            ns_decls: vec![],
            attrs: vec![],
        };
        assert_eq!(elem.tag(), TypeTag::Element);

        let text = NodeKind::Text {
            content: "hi".to_string(),
        };
        assert_eq!(text.tag(), TypeTag::Text);

        let decl = NodeKind::NamespaceDecl {
            prefix: Some("foo".to_string()),
            uri: "urn:x".to_string(),
        };
        assert_eq!(decl.tag(), TypeTag::NamespaceDecl);
    }
}
