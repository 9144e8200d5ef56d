//! Node type definitions.
//!
//! The `NodeKind` enum is the tagged sum of every node type the document
//! tree can hold. Each variant carries the node-type-specific payload;
//! the parent link and sibling index live in `NodeData`, not here.

use super::NodeId;

/// The kind of an XML node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// An element node, e.g., `<t:title lang="en">`.
    Element {
        /// Namespace prefix (e.g., `"t"` in `t:title`), if any.
        prefix: Option<String>,
        /// The element's local name.
        tag: String,
        /// Attributes on this element, in document order.
        attributes: Vec<Attribute>,
        /// Child nodes, in document order. Each child's cached index
        /// equals its offset in this list.
        children: Vec<NodeId>,
    },

    /// Character data: plain text or a CDATA section.
    CharData {
        /// The content (already decoded — character references resolved).
        data: String,
        /// True when this node round-trips as a `<![CDATA[...]]>` section.
        cdata: bool,
        /// True when the content consists entirely of space, tab, CR, and
        /// LF bytes *and* the node was produced by the parser, `set_data`,
        /// or the indenter. Nodes authored through `create_text` and
        /// friends leave this unset so indentation never strips them.
        whitespace: bool,
    },

    /// A comment node, e.g., `<!-- ... -->`.
    Comment {
        /// The comment text (without the `<!--` and `-->` delimiters).
        text: String,
    },

    /// A processing instruction, e.g., `<?xml-stylesheet href="a.xsl"?>`.
    ProcInst {
        /// The PI target (e.g., `"xml-stylesheet"`).
        target: String,
        /// The instruction body following the target. Empty when absent.
        inst: String,
    },

    /// A directive, e.g., `<!DOCTYPE html>` or `<!ENTITY ...>`.
    Directive {
        /// The directive body (without the `<!` and `>` delimiters).
        body: String,
    },
}

impl NodeKind {
    /// Returns `true` for `Element` nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Returns `true` for `CharData` nodes (plain text and CDATA alike).
    #[must_use]
    pub fn is_char_data(&self) -> bool {
        matches!(self, Self::CharData { .. })
    }
}

/// An attribute attached to an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Namespace prefix (e.g., `"xml"` for `xml:lang`), if any.
    pub prefix: Option<String>,
    /// The attribute's local name.
    pub key: String,
    /// The attribute value (fully decoded).
    pub value: String,
    /// The element this attribute is attached to. Cleared before a removed
    /// attribute is handed back to the caller.
    pub owner: Option<NodeId>,
}

impl Attribute {
    /// Returns the attribute's full key, including the namespace prefix
    /// when one is present (`prefix:key`).
    #[must_use]
    pub fn full_key(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{p}:{}", self.key),
            None => self.key.clone(),
        }
    }
}

/// Returns `true` if every byte of `s` is an XML whitespace character
/// (space, tab, carriage return, or line feed). The empty string counts
/// as whitespace.
#[must_use]
pub fn is_whitespace(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Splits a full tag or key into optional prefix and local part.
///
/// `"t:title"` → `(Some("t"), "title")`
/// `"title"` → `(None, "title")`
#[must_use]
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.find(':') {
        Some(pos) => (Some(&name[..pos]), &name[pos + 1..]),
        None => (None, name),
    }
}

/// Returns `true` if a requested prefix matches a node's prefix.
///
/// An empty requested prefix matches any prefix with the same local name;
/// an explicit prefix must match exactly.
pub(crate) fn prefix_match(requested: Option<&str>, actual: Option<&str>) -> bool {
    match requested {
        None => true,
        Some(r) => actual == Some(r),
    }
}
