//! Arena-based editable XML document tree.
//!
//! This module implements the core tree representation using arena allocation
//! with typed indices. All nodes live in a contiguous `Vec<NodeData>` owned by
//! the [`Document`], and are referenced by [`NodeId`] — a newtype over
//! `NonZeroU32`.
//!
//! This design provides O(1) node access, cache-friendly layout, no reference
//! counting overhead, and safe bulk deallocation (drop the `Document` and
//! everything is freed).
//!
//! # Architecture
//!
//! Every node stores a parent link and its cached index among the parent's
//! children; elements own an ordered `Vec<NodeId>` of children. The mutators
//! on `Document` maintain the invariant that each child's cached index equals
//! its physical offset, and that every attribute's owner back-reference points
//! at the element holding it. Detaching a node never frees it from the arena;
//! the caller may re-attach it elsewhere.

mod node;

pub use node::{is_whitespace, split_name, Attribute, NodeKind};

use std::io::{Read, Write};
use std::num::NonZeroU32;

use crate::error::{Error, ParseDiagnostic};
use crate::parser::ReadSettings;
use crate::serial::{IndentSettings, WriteSettings};

/// A typed index into the document's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`, meaning it can never be zero
/// and `Option<NodeId>` has the same size as `NodeId` (niche optimization).
/// A `NodeId` is only meaningful together with the `Document` that created
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is (element, character data, etc.) and its
    /// payload.
    pub kind: NodeKind,
    /// Parent element, if attached. The document's synthetic root has no
    /// parent.
    pub parent: Option<NodeId>,
    /// Cached position among the parent's children. Always equal to the
    /// physical offset while attached; 0 while detached.
    pub index: usize,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            index: 0,
        }
    }
}

fn empty_element() -> NodeKind {
    NodeKind::Element {
        prefix: None,
        tag: String::new(),
        attributes: Vec::new(),
        children: Vec::new(),
    }
}

/// An editable XML document.
///
/// The `Document` owns all nodes in an arena and provides methods for tree
/// navigation and mutation. All operations go through `&Document`
/// (navigation) or `&mut Document` (mutation).
///
/// The document itself is represented by a synthetic element with an empty
/// tag and no parent; its children are the prolog nodes (processing
/// instructions, comments, a byte-order mark) plus the root element.
///
/// # Examples
///
/// ```
/// use xylem::Document;
///
/// let mut doc = Document::new();
/// doc.read_from_str("<store><book lang=\"en\"/></store>").unwrap();
/// let book = doc.find_element("/store/book").unwrap();
/// assert_eq!(doc.select_attr_value(book, "lang", "?"), "en");
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The synthetic root element holding the document's top-level nodes.
    base: NodeId,
    /// Detached element returned by [`not_nil`](Document::not_nil); all
    /// mutators are no-ops on it.
    sentinel: NodeId,
    /// Settings applied by the `read_from_*` entry points.
    pub read_settings: ReadSettings,
    /// Settings applied by the `write_to_*` entry points.
    pub write_settings: WriteSettings,
    /// Repairs recorded during the most recent permissive read.
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a new empty document.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32)
        nodes.push(NodeData::new(empty_element()));
        // Index 1: the synthetic document root
        nodes.push(NodeData::new(empty_element()));
        // Index 2: the not_nil sentinel
        nodes.push(NodeData::new(empty_element()));
        Self {
            nodes,
            base: NodeId::from_index(1),
            sentinel: NodeId::from_index(2),
            read_settings: ReadSettings::default(),
            write_settings: WriteSettings::default(),
            diagnostics: Vec::new(),
        }
    }

    /// Returns the synthetic root element holding the document's top-level
    /// nodes (prolog, root element, trailing comments).
    #[must_use]
    pub fn document_node(&self) -> NodeId {
        self.base
    }

    /// Returns the document's root element, if it has one.
    #[must_use]
    pub fn root(&self) -> Option<NodeId> {
        self.children(self.base)
            .iter()
            .copied()
            .find(|&id| self.node(id).kind.is_element())
    }

    /// Replaces the document's root element with `e`.
    ///
    /// The old root (if any) is detached from the document but preserved as
    /// a free-standing subtree; `e` is detached from any prior parent and
    /// takes the old root's position, or is appended when the document had
    /// no root.
    pub fn set_root(&mut self, e: NodeId) {
        if e == self.sentinel || !self.node(e).kind.is_element() {
            return;
        }
        self.detach(e);

        if let Some(old) = self.root() {
            let pos = self.node(old).index;
            self.node_mut(old).parent = None;
            self.node_mut(old).index = 0;
            if let Some(children) = self.children_mut(self.base) {
                children[pos] = e;
            }
            self.node_mut(e).parent = Some(self.base);
            self.node_mut(e).index = pos;
        } else {
            self.add_child(self.base, e);
        }
    }

    /// Returns a reference to the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a node of this document.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    /// Returns a mutable reference to the `NodeData` for the given node.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Allocates a detached node in the arena and returns its `NodeId`.
    pub(crate) fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    // --- Detached constructors ---

    /// Creates a detached element. `full_tag` may include a namespace
    /// prefix (`"t:title"`).
    pub fn new_element(&mut self, full_tag: &str) -> NodeId {
        let (prefix, tag) = split_name(full_tag);
        self.alloc(NodeKind::Element {
            prefix: prefix.map(str::to_string),
            tag: tag.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        })
    }

    /// Creates a detached character data node.
    pub fn new_text(&mut self, data: &str) -> NodeId {
        self.alloc(NodeKind::CharData {
            data: data.to_string(),
            cdata: false,
            whitespace: false,
        })
    }

    /// Creates a detached CDATA node.
    pub fn new_cdata(&mut self, data: &str) -> NodeId {
        self.alloc(NodeKind::CharData {
            data: data.to_string(),
            cdata: true,
            whitespace: false,
        })
    }

    /// Creates a detached comment node.
    pub fn new_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeKind::Comment {
            text: text.to_string(),
        })
    }

    /// Creates a detached processing instruction node.
    pub fn new_proc_inst(&mut self, target: &str, inst: &str) -> NodeId {
        self.alloc(NodeKind::ProcInst {
            target: target.to_string(),
            inst: inst.to_string(),
        })
    }

    /// Creates a detached directive node.
    pub fn new_directive(&mut self, body: &str) -> NodeId {
        self.alloc(NodeKind::Directive {
            body: body.to_string(),
        })
    }

    // --- Attached constructors ---

    /// Creates an element and appends it to `parent`'s children.
    pub fn create_element(&mut self, parent: NodeId, full_tag: &str) -> NodeId {
        if parent == self.sentinel {
            return self.sentinel;
        }
        let e = self.new_element(full_tag);
        self.add_child(parent, e);
        e
    }

    /// Creates an element under `parent` and passes it to a continuation
    /// for further construction. Returns the new element.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylem::Document;
    ///
    /// let mut doc = Document::new();
    /// let base = doc.document_node();
    /// doc.create_child(base, "root", |doc, root| {
    ///     doc.create_child(root, "item", |doc, item| {
    ///         doc.create_attr(item, "id", "1");
    ///     });
    /// });
    /// assert_eq!(doc.write_to_string().unwrap(), r#"<root><item id="1"/></root>"#);
    /// ```
    pub fn create_child<F>(&mut self, parent: NodeId, full_tag: &str, f: F) -> NodeId
    where
        F: FnOnce(&mut Self, NodeId),
    {
        let e = self.create_element(parent, full_tag);
        f(self, e);
        e
    }

    /// Creates a character data node and appends it to `parent`'s children.
    pub fn create_text(&mut self, parent: NodeId, data: &str) -> NodeId {
        if parent == self.sentinel {
            return self.sentinel;
        }
        let t = self.new_text(data);
        self.add_child(parent, t);
        t
    }

    /// Creates a CDATA node and appends it to `parent`'s children.
    pub fn create_cdata(&mut self, parent: NodeId, data: &str) -> NodeId {
        if parent == self.sentinel {
            return self.sentinel;
        }
        let t = self.new_cdata(data);
        self.add_child(parent, t);
        t
    }

    /// Creates a comment node and appends it to `parent`'s children.
    pub fn create_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        if parent == self.sentinel {
            return self.sentinel;
        }
        let c = self.new_comment(text);
        self.add_child(parent, c);
        c
    }

    /// Creates a processing instruction node and appends it to `parent`'s
    /// children.
    pub fn create_proc_inst(&mut self, parent: NodeId, target: &str, inst: &str) -> NodeId {
        if parent == self.sentinel {
            return self.sentinel;
        }
        let p = self.new_proc_inst(target, inst);
        self.add_child(parent, p);
        p
    }

    /// Creates a directive node and appends it to `parent`'s children.
    pub fn create_directive(&mut self, parent: NodeId, body: &str) -> NodeId {
        if parent == self.sentinel {
            return self.sentinel;
        }
        let d = self.new_directive(body);
        self.add_child(parent, d);
        d
    }

    // --- Navigation ---

    /// Returns the parent element of a node, if attached.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the node's position among its parent's children.
    #[must_use]
    pub fn index(&self, id: NodeId) -> usize {
        self.node(id).index
    }

    /// Returns the children of a node, in document order. Non-element
    /// nodes have no children.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Element { children, .. } => children,
            _ => &[],
        }
    }

    fn children_mut(&mut self, id: NodeId) -> Option<&mut Vec<NodeId>> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Returns an iterator over the element children of a node, skipping
    /// character data, comments, and other non-element children.
    pub fn child_elements(&self, id: NodeId) -> ChildElements<'_> {
        ChildElements {
            doc: self,
            parent: id,
            pos: 0,
        }
    }

    /// Returns the nearest following sibling that is an element, skipping
    /// any character data or comments in between.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let siblings = self.children(parent);
        siblings[self.node(id).index + 1..]
            .iter()
            .copied()
            .find(|&s| self.node(s).kind.is_element())
    }

    /// Returns the nearest preceding sibling that is an element.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id).parent?;
        let siblings = self.children(parent);
        siblings[..self.node(id).index]
            .iter()
            .rev()
            .copied()
            .find(|&s| self.node(s).kind.is_element())
    }

    /// Returns the local name of an element, or `None` for other nodes.
    #[must_use]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Returns the namespace prefix of an element, if it has one.
    #[must_use]
    pub fn prefix(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { prefix, .. } => prefix.as_deref(),
            _ => None,
        }
    }

    /// Returns the element's full tag, including the namespace prefix when
    /// one is present (`prefix:tag`).
    #[must_use]
    pub fn full_tag(&self, id: NodeId) -> Option<String> {
        match &self.node(id).kind {
            NodeKind::Element { prefix, tag, .. } => Some(match prefix {
                Some(p) => format!("{p}:{tag}"),
                None => tag.clone(),
            }),
            _ => None,
        }
    }

    // --- Mutation ---

    /// Detaches `child` from any prior parent and appends it to `parent`'s
    /// children.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == self.sentinel || child == self.sentinel {
            return;
        }
        if !self.node(parent).kind.is_element() {
            return;
        }
        self.detach(child);
        let index = self.children(parent).len();
        self.node_mut(child).parent = Some(parent);
        self.node_mut(child).index = index;
        if let Some(children) = self.children_mut(parent) {
            children.push(child);
        }
    }

    /// Inserts `child` at position `index` among `parent`'s children.
    ///
    /// The position is clamped to `[0, len]`; `child` is first detached from
    /// any prior parent (when moving within the same parent, the position is
    /// interpreted after removal). The tail of the child list is reindexed.
    pub fn insert_child_at(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if parent == self.sentinel || child == self.sentinel {
            return;
        }
        if !self.node(parent).kind.is_element() {
            return;
        }
        if index >= self.children(parent).len() {
            self.add_child(parent, child);
            return;
        }

        let mut index = index;
        if let Some(p) = self.node(child).parent {
            if p == parent && self.node(child).index < index {
                index -= 1;
            }
            self.detach(child);
        }

        self.node_mut(child).parent = Some(parent);
        self.node_mut(child).index = index;
        if let Some(children) = self.children_mut(parent) {
            children.insert(index, child);
        }
        self.reindex_from(parent, index + 1);
    }

    /// Detaches and returns the child at position `index`, or `None` when
    /// the position is out of range.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Option<NodeId> {
        if parent == self.sentinel {
            return None;
        }
        let &child = self.children(parent).get(index)?;
        self.detach(child);
        Some(child)
    }

    /// Detaches and returns `child` if it is currently a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Option<NodeId> {
        if parent == self.sentinel {
            return None;
        }
        if self.node(child).parent != Some(parent) {
            return None;
        }
        self.detach(child);
        Some(child)
    }

    /// Detaches a node from its parent. The node stays allocated in the
    /// arena and may be re-attached elsewhere.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let index = self.node(id).index;
        if let Some(children) = self.children_mut(parent) {
            children.remove(index);
        }
        self.node_mut(id).parent = None;
        self.node_mut(id).index = 0;
        self.reindex_from(parent, index);
    }

    /// Rewrites every child's cached index to its physical offset.
    pub fn reindex_children(&mut self, parent: NodeId) {
        self.reindex_from(parent, 0);
    }

    fn reindex_from(&mut self, parent: NodeId, start: usize) {
        let ids: Vec<NodeId> = self.children(parent)[start..].to_vec();
        for (offset, id) in ids.into_iter().enumerate() {
            self.node_mut(id).index = start + offset;
        }
    }

    /// Detaches and returns the full child list. The returned nodes keep
    /// stale parent links until re-attached via
    /// [`replace_children`](Document::replace_children).
    pub(crate) fn take_children(&mut self, parent: NodeId) -> Vec<NodeId> {
        match &mut self.node_mut(parent).kind {
            NodeKind::Element { children, .. } => std::mem::take(children),
            _ => Vec::new(),
        }
    }

    /// Installs a new child list, rewriting every child's parent link and
    /// cached index. Callers guarantee each id is owned by no other
    /// element.
    pub(crate) fn replace_children(&mut self, parent: NodeId, new_children: Vec<NodeId>) {
        for (i, &id) in new_children.iter().enumerate() {
            self.node_mut(id).parent = Some(parent);
            self.node_mut(id).index = i;
        }
        if let Some(children) = self.children_mut(parent) {
            *children = new_children;
        }
    }

    pub(crate) fn clear_children(&mut self, parent: NodeId) {
        let ids: Vec<NodeId> = self.children(parent).to_vec();
        for id in ids {
            self.node_mut(id).parent = None;
            self.node_mut(id).index = 0;
        }
        if let Some(children) = self.children_mut(parent) {
            children.clear();
        }
    }

    // --- Attributes ---

    /// Returns the attributes of an element, in document order. Non-element
    /// nodes have no attributes.
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    fn attributes_mut(&mut self, id: NodeId) -> Option<&mut Vec<Attribute>> {
        match &mut self.node_mut(id).kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    /// Creates an attribute on `e`, replacing the value of an existing
    /// attribute with the same prefix and key. `full_key` may include a
    /// namespace prefix (`"xml:lang"`).
    pub fn create_attr(&mut self, e: NodeId, full_key: &str, value: &str) {
        if e == self.sentinel {
            return;
        }
        let (prefix, key) = split_name(full_key);
        let prefix = prefix.map(str::to_string);
        let Some(attrs) = self.attributes_mut(e) else {
            return;
        };
        for a in attrs.iter_mut() {
            if a.prefix == prefix && a.key == key {
                a.value = value.to_string();
                return;
            }
        }
        attrs.push(Attribute {
            prefix,
            key: key.to_string(),
            value: value.to_string(),
            owner: Some(e),
        });
    }

    pub(crate) fn push_attr(&mut self, e: NodeId, prefix: Option<String>, key: &str, value: &str) {
        let attr = Attribute {
            prefix,
            key: key.to_string(),
            value: value.to_string(),
            owner: Some(e),
        };
        if let Some(attrs) = self.attributes_mut(e) {
            attrs.push(attr);
        }
    }

    /// Returns the first attribute matching `full_key`. A bare key matches
    /// any prefix with the same local name; an explicit prefix must match
    /// exactly.
    #[must_use]
    pub fn select_attr(&self, e: NodeId, full_key: &str) -> Option<&Attribute> {
        let (prefix, key) = split_name(full_key);
        self.attributes(e)
            .iter()
            .find(|a| node::prefix_match(prefix, a.prefix.as_deref()) && a.key == key)
    }

    /// Returns the value of the first attribute matching `full_key`, or
    /// `default` when no attribute matches.
    #[must_use]
    pub fn select_attr_value<'a>(&'a self, e: NodeId, full_key: &str, default: &'a str) -> &'a str {
        self.select_attr(e, full_key)
            .map_or(default, |a| a.value.as_str())
    }

    /// Removes and returns the first attribute matching `full_key`. The
    /// returned attribute's owner back-reference is cleared.
    pub fn remove_attr(&mut self, e: NodeId, full_key: &str) -> Option<Attribute> {
        if e == self.sentinel {
            return None;
        }
        let (prefix, key) = split_name(full_key);
        let pos = self
            .attributes(e)
            .iter()
            .position(|a| node::prefix_match(prefix, a.prefix.as_deref()) && a.key == key)?;
        let attrs = self.attributes_mut(e)?;
        let mut attr = attrs.remove(pos);
        attr.owner = None;
        Some(attr)
    }

    /// Stably sorts the element's attributes by (prefix, key) in Unicode
    /// code point order. Attributes without a prefix sort before prefixed
    /// ones.
    pub fn sort_attrs(&mut self, e: NodeId) {
        if e == self.sentinel {
            return;
        }
        if let Some(attrs) = self.attributes_mut(e) {
            attrs.sort_by(|a, b| {
                let ap = a.prefix.as_deref().unwrap_or("");
                let bp = b.prefix.as_deref().unwrap_or("");
                (ap, a.key.as_str()).cmp(&(bp, b.key.as_str()))
            });
        }
    }

    // --- Element selection ---

    /// Returns the first child element matching `full_tag`. A bare tag
    /// matches any prefix with the same local name; an explicit prefix must
    /// match exactly.
    #[must_use]
    pub fn select_element(&self, e: NodeId, full_tag: &str) -> Option<NodeId> {
        let (prefix, tag) = split_name(full_tag);
        self.children(e).iter().copied().find(|&c| {
            matches!(&self.node(c).kind, NodeKind::Element { prefix: cp, tag: ct, .. }
                if node::prefix_match(prefix, cp.as_deref()) && ct == tag)
        })
    }

    /// Returns all child elements matching `full_tag`, in document order.
    #[must_use]
    pub fn select_elements(&self, e: NodeId, full_tag: &str) -> Vec<NodeId> {
        let (prefix, tag) = split_name(full_tag);
        self.children(e)
            .iter()
            .copied()
            .filter(|&c| {
                matches!(&self.node(c).kind, NodeKind::Element { prefix: cp, tag: ct, .. }
                    if node::prefix_match(prefix, cp.as_deref()) && ct == tag)
            })
            .collect()
    }

    // --- Character data ---

    /// Returns the content of a character data node, or `None` for other
    /// node kinds.
    #[must_use]
    pub fn char_data(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::CharData { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Replaces the content of a character data node, reclassifying its
    /// whitespace flag from the new content.
    pub fn set_data(&mut self, id: NodeId, text: &str) {
        if id == self.sentinel {
            return;
        }
        if let NodeKind::CharData {
            data, whitespace, ..
        } = &mut self.node_mut(id).kind
        {
            *data = text.to_string();
            *whitespace = is_whitespace(text);
        }
    }

    /// Returns `true` if the node is character data classified as
    /// whitespace (parsed or indent-inserted content consisting entirely of
    /// space, tab, CR, and LF).
    #[must_use]
    pub fn is_whitespace(&self, id: NodeId) -> bool {
        matches!(
            &self.node(id).kind,
            NodeKind::CharData {
                whitespace: true,
                ..
            }
        )
    }

    /// Returns `true` if the node is a CDATA section.
    #[must_use]
    pub fn is_cdata(&self, id: NodeId) -> bool {
        matches!(&self.node(id).kind, NodeKind::CharData { cdata: true, .. })
    }

    /// Returns the concatenated text of the element's leading run of
    /// character data children (plain text and CDATA alike). Comments
    /// inside the run are skipped; the run ends at the first element.
    #[must_use]
    pub fn text(&self, e: NodeId) -> String {
        let mut text = String::new();
        for &c in self.children(e) {
            match &self.node(c).kind {
                NodeKind::CharData { data, .. } => text.push_str(data),
                NodeKind::Comment { .. } => {}
                _ => break,
            }
        }
        text
    }

    /// Replaces the element's leading run of character data children with a
    /// single plain text node holding `text`. An empty `text` removes the
    /// run entirely.
    pub fn set_text(&mut self, e: NodeId, text: &str) {
        if e == self.sentinel {
            return;
        }
        self.replace_char_data_run(e, 0, text, false);
    }

    /// Like [`set_text`](Document::set_text), but the replacement is a
    /// single CDATA node.
    pub fn set_cdata(&mut self, e: NodeId, text: &str) {
        if e == self.sentinel {
            return;
        }
        self.replace_char_data_run(e, 0, text, true);
    }

    /// Returns the concatenated text of the character data siblings
    /// immediately following this element, up to the next non-character-data
    /// sibling.
    #[must_use]
    pub fn tail(&self, e: NodeId) -> String {
        let Some(parent) = self.node(e).parent else {
            return String::new();
        };
        let mut text = String::new();
        for &s in &self.children(parent)[self.node(e).index + 1..] {
            match &self.node(s).kind {
                NodeKind::CharData { data, .. } => text.push_str(data),
                _ => break,
            }
        }
        text
    }

    /// Replaces the character data siblings immediately following this
    /// element with a single plain text node holding `text`. An empty
    /// `text` removes the trailing run entirely.
    pub fn set_tail(&mut self, e: NodeId, text: &str) {
        if e == self.sentinel {
            return;
        }
        let Some(parent) = self.node(e).parent else {
            return;
        };
        let start = self.node(e).index + 1;
        self.replace_char_data_run(parent, start, text, false);
    }

    /// Finds the index of the first child at or after `start` that is not
    /// character data.
    fn term_char_data_index(&self, e: NodeId, start: usize) -> usize {
        let children = self.children(e);
        for (i, &c) in children.iter().enumerate().skip(start) {
            if !self.node(c).kind.is_char_data() {
                return i;
            }
        }
        children.len()
    }

    fn replace_char_data_run(&mut self, e: NodeId, start: usize, text: &str, cdata: bool) {
        let end = self.term_char_data_index(e, start);
        if end == start {
            if !text.is_empty() {
                let id = self.alloc(NodeKind::CharData {
                    data: text.to_string(),
                    cdata,
                    whitespace: false,
                });
                self.insert_child_at(e, start, id);
            }
            return;
        }

        if text.is_empty() {
            for _ in start..end {
                self.remove_child_at(e, start);
            }
            return;
        }

        let first = self.children(e)[start];
        if let NodeKind::CharData {
            data,
            cdata: is_cdata,
            whitespace,
        } = &mut self.node_mut(first).kind
        {
            *data = text.to_string();
            *is_cdata = cdata;
            *whitespace = false;
        }
        for _ in start + 1..end {
            self.remove_child_at(e, start + 1);
        }
    }

    // --- Paths ---

    /// Returns the absolute path from the document root to this element,
    /// e.g. `/store/book/title`. The synthetic document root contributes
    /// nothing, so it yields `/`.
    #[must_use]
    pub fn get_path(&self, e: NodeId) -> String {
        let mut tags = Vec::new();
        let mut cur = Some(e);
        while let Some(id) = cur {
            if let NodeKind::Element { tag, .. } = &self.node(id).kind {
                if !tag.is_empty() {
                    tags.push(tag.as_str());
                }
            }
            cur = self.node(id).parent;
        }
        tags.reverse();
        format!("/{}", tags.join("/"))
    }

    /// Returns the shortest relative path from `from` to this element,
    /// composed of `.`, `..`, and `./name` segments. Returns `None` when
    /// the two elements share no common ancestor.
    #[must_use]
    pub fn get_relative_path(&self, e: NodeId, from: NodeId) -> Option<String> {
        let to_chain = self.ancestor_chain(e);
        let from_chain = self.ancestor_chain(from);

        let common = to_chain
            .iter()
            .zip(from_chain.iter())
            .take_while(|(a, b)| a == b)
            .count();
        if common == 0 {
            return None;
        }

        let ups = from_chain.len() - common;
        let downs: Vec<&str> = to_chain[common..]
            .iter()
            .filter_map(|&id| self.tag(id))
            .collect();

        if ups == 0 {
            if downs.is_empty() {
                return Some(".".to_string());
            }
            return Some(format!("./{}", downs.join("/")));
        }

        let mut segs = vec![".."; ups];
        segs.extend(downs);
        Some(segs.join("/"))
    }

    /// Returns the chain of ancestors from the root down to `e`, inclusive.
    fn ancestor_chain(&self, e: NodeId) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cur = Some(e);
        while let Some(id) = cur {
            chain.push(id);
            cur = self.node(id).parent;
        }
        chain.reverse();
        chain
    }

    // --- Namespaces ---

    /// Returns the namespace URI in scope for this element, resolved by
    /// walking toward the root collecting `xmlns` and `xmlns:prefix`
    /// declarations. Elements whose prefix resolves to no URI, in a tree
    /// with no default namespace in scope, yield the empty string.
    #[must_use]
    pub fn namespace_uri(&self, e: NodeId) -> String {
        match &self.node(e).kind {
            NodeKind::Element { prefix: None, .. } => self.find_default_namespace_uri(e),
            NodeKind::Element {
                prefix: Some(p), ..
            } => self.find_local_namespace_uri(e, p),
            _ => String::new(),
        }
    }

    /// Returns the namespace URI in scope for an attribute. Unprefixed
    /// attributes are in no namespace and always yield the empty string.
    #[must_use]
    pub fn attr_namespace_uri(&self, a: &Attribute) -> String {
        let (Some(prefix), Some(owner)) = (&a.prefix, a.owner) else {
            return String::new();
        };
        self.find_local_namespace_uri(owner, prefix)
    }

    fn find_default_namespace_uri(&self, e: NodeId) -> String {
        let mut cur = Some(e);
        while let Some(id) = cur {
            for a in self.attributes(id) {
                if a.prefix.is_none() && a.key == "xmlns" {
                    return a.value.clone();
                }
            }
            cur = self.node(id).parent;
        }
        String::new()
    }

    fn find_local_namespace_uri(&self, e: NodeId, prefix: &str) -> String {
        let mut cur = Some(e);
        while let Some(id) = cur {
            for a in self.attributes(id) {
                if a.prefix.as_deref() == Some("xmlns") && a.key == prefix {
                    return a.value.clone();
                }
            }
            cur = self.node(id).parent;
        }
        String::new()
    }

    // --- not_nil ---

    /// Returns `e` when present, or a sentinel no-op element otherwise, so
    /// that call chains on missing query results have no observable effect.
    ///
    /// # Examples
    ///
    /// ```
    /// use xylem::Document;
    ///
    /// let mut doc = Document::new();
    /// doc.read_from_str("<enabled>true</enabled>").unwrap();
    /// let base = doc.document_node();
    /// let visible = doc.select_element(base, "visible");
    /// let visible = doc.not_nil(visible);
    /// doc.set_text(visible, "true"); // no-op: <visible> does not exist
    /// assert_eq!(doc.write_to_string().unwrap(), "<enabled>true</enabled>");
    /// ```
    #[must_use]
    pub fn not_nil(&self, e: Option<NodeId>) -> NodeId {
        e.unwrap_or(self.sentinel)
    }

    /// Returns `true` when `e` is the sentinel produced by
    /// [`not_nil`](Document::not_nil) for a missing element.
    #[must_use]
    pub fn is_nil_sentinel(&self, e: NodeId) -> bool {
        e == self.sentinel
    }

    // --- Path queries ---

    /// Finds the first element matching the path expression, evaluated from
    /// the document root. A path that fails to compile yields `None`
    /// silently; use [`Path::compile`](crate::path::Path::compile) and
    /// [`find_element_path`](Document::find_element_path) to observe
    /// compile errors.
    #[must_use]
    pub fn find_element(&self, path: &str) -> Option<NodeId> {
        self.find_element_from(self.base, path)
    }

    /// Finds all elements matching the path expression, evaluated from the
    /// document root, in document order with duplicates suppressed.
    #[must_use]
    pub fn find_elements(&self, path: &str) -> Vec<NodeId> {
        self.find_elements_from(self.base, path)
    }

    /// Finds the first element matching a precompiled path, evaluated from
    /// the document root.
    #[must_use]
    pub fn find_element_path(&self, path: &crate::path::Path) -> Option<NodeId> {
        crate::path::find_all(self, self.base, path).into_iter().next()
    }

    /// Finds all elements matching a precompiled path, evaluated from the
    /// document root.
    #[must_use]
    pub fn find_elements_path(&self, path: &crate::path::Path) -> Vec<NodeId> {
        crate::path::find_all(self, self.base, path)
    }

    /// Finds the first element matching the path expression, evaluated from
    /// the given context element.
    #[must_use]
    pub fn find_element_from(&self, context: NodeId, path: &str) -> Option<NodeId> {
        let compiled = crate::path::Path::compile(path).ok()?;
        crate::path::find_all(self, context, &compiled)
            .into_iter()
            .next()
    }

    /// Finds all elements matching the path expression, evaluated from the
    /// given context element.
    #[must_use]
    pub fn find_elements_from(&self, context: NodeId, path: &str) -> Vec<NodeId> {
        match crate::path::Path::compile(path) {
            Ok(compiled) => crate::path::find_all(self, context, &compiled),
            Err(_) => Vec::new(),
        }
    }

    // --- Reading ---

    /// Reads a document from a string, replacing the document's current
    /// contents. On error no partial tree is retained.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed input and [`Error::Encoding`]
    /// when the declared encoding cannot be handled.
    pub fn read_from_str(&mut self, s: &str) -> Result<(), Error> {
        let decoder = self.read_settings.charset_decoder.clone();
        let text = crate::encoding::decode_declared(s, decoder.as_ref())?;
        self.read_text(&text)
    }

    /// Reads a document from raw bytes, detecting the encoding from the
    /// byte-order mark and the XML declaration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed input and [`Error::Encoding`]
    /// when the encoding cannot be determined or decoded.
    pub fn read_from_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let decoder = self.read_settings.charset_decoder.clone();
        let text = crate::encoding::decode_input(bytes, decoder.as_ref())?;
        self.read_text(&text)
    }

    /// Reads a document from a reader.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the reader fails, plus the error
    /// conditions of [`read_from_bytes`](Document::read_from_bytes).
    pub fn read_from_reader<R: Read>(&mut self, mut r: R) -> Result<(), Error> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        self.read_from_bytes(&bytes)
    }

    /// Reads a document from a file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be opened or read, plus
    /// the error conditions of [`read_from_bytes`](Document::read_from_bytes).
    pub fn read_from_file<P: AsRef<std::path::Path>>(&mut self, path: P) -> Result<(), Error> {
        let file = std::fs::File::open(path)?;
        self.read_from_reader(file)
    }

    fn read_text(&mut self, text: &str) -> Result<(), Error> {
        self.clear_children(self.base);
        self.diagnostics.clear();
        if let Err(e) = crate::parser::parse_into(self, text) {
            self.clear_children(self.base);
            return Err(e.into());
        }
        Ok(())
    }

    // --- Writing ---

    /// Serializes the document to a writer using the document's
    /// [`WriteSettings`].
    ///
    /// # Errors
    ///
    /// Propagates writer failures verbatim.
    pub fn write_to<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        for &child in self.children(self.base) {
            crate::serial::write_node(self, child, w, &self.write_settings)?;
        }
        Ok(())
    }

    /// Serializes the document to a string.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors the writer-based
    /// entry points.
    pub fn write_to_string(&self) -> Result<String, Error> {
        let bytes = self.write_to_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Serializes the document to a byte vector.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature mirrors the writer-based
    /// entry points.
    pub fn write_to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    /// Serializes the document to a file, creating or truncating it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be created or written.
    pub fn write_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Error> {
        let mut file = std::fs::File::create(path)?;
        self.write_to(&mut file)?;
        Ok(())
    }

    /// Serializes a single node (and its subtree) to a writer with the
    /// given settings.
    ///
    /// # Errors
    ///
    /// Propagates writer failures verbatim.
    pub fn write_node_to<W: Write>(
        &self,
        id: NodeId,
        w: &mut W,
        settings: &WriteSettings,
    ) -> std::io::Result<()> {
        crate::serial::write_node(self, id, w, settings)
    }

    // --- Indentation ---

    /// Pretty-prints the document by inserting newline and indentation
    /// character data between child nodes, using `spaces` spaces per
    /// nesting level. Passing [`NO_INDENT`](crate::serial::NO_INDENT)
    /// removes indentation instead.
    pub fn indent(&mut self, spaces: i32) {
        let settings = IndentSettings::new().spaces(spaces);
        self.indent_with_settings(&settings);
    }

    /// Pretty-prints the document using one tab per nesting level.
    pub fn indent_tabs(&mut self) {
        let settings = IndentSettings::new().use_tabs(true);
        self.indent_with_settings(&settings);
    }

    /// Pretty-prints the document with full control over the indentation
    /// behavior. Previously inserted indentation is stripped first, so the
    /// operation is idempotent.
    pub fn indent_with_settings(&mut self, settings: &IndentSettings) {
        crate::serial::indent_document(self, settings);
    }

    /// Removes indentation from the document without adding a trailing
    /// newline. Equivalent to `indent(NO_INDENT)`.
    pub fn unindent(&mut self) {
        self.indent(crate::serial::NO_INDENT);
    }

    /// Pretty-prints the subtree rooted at `e` for standalone serialization
    /// via [`write_node_to`](Document::write_node_to).
    pub fn indent_within(&mut self, e: NodeId, settings: &IndentSettings) {
        if e == self.sentinel {
            return;
        }
        crate::serial::indent_element(self, e, settings);
    }
}

/// Iterator over the element children of a node.
pub struct ChildElements<'a> {
    doc: &'a Document,
    parent: NodeId,
    pos: usize,
}

impl Iterator for ChildElements<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let children = self.doc.children(self.parent);
        while self.pos < children.len() {
            let id = children[self.pos];
            self.pos += 1;
            if self.doc.node(id).kind.is_element() {
                return Some(id);
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn check_indexes(doc: &Document, e: NodeId) {
        for (i, &c) in doc.children(e).iter().enumerate() {
            assert_eq!(doc.node(c).index, i, "child index mismatch");
            assert_eq!(doc.node(c).parent, Some(e), "child parent mismatch");
            if doc.node(c).kind.is_element() {
                check_indexes(doc, c);
            }
        }
    }

    #[test]
    fn test_new_document_is_empty() {
        let doc = Document::new();
        assert!(doc.root().is_none());
        assert!(doc.children(doc.document_node()).is_empty());
    }

    #[test]
    fn test_create_and_navigate() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        let child = doc.create_element(root, "child");

        assert_eq!(doc.root(), Some(root));
        assert_eq!(doc.parent(child), Some(root));
        assert_eq!(doc.parent(root), Some(base));
        assert_eq!(doc.parent(base), None);
        assert_eq!(doc.tag(child), Some("child"));
        check_indexes(&doc, base);
    }

    #[test]
    fn test_prefixed_tag() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "t:title");
        assert_eq!(doc.prefix(e), Some("t"));
        assert_eq!(doc.tag(e), Some("title"));
        assert_eq!(doc.full_tag(e), Some("t:title".to_string()));
    }

    #[test]
    fn test_add_child_reparents() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        let a = doc.create_element(root, "a");
        let b = doc.create_element(root, "b");
        let inner = doc.create_element(a, "inner");

        doc.add_child(b, inner);

        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[inner]);
        assert_eq!(doc.parent(inner), Some(b));
        check_indexes(&doc, base);
    }

    #[test]
    fn test_insert_child_at_clamps() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        doc.create_element(root, "a");
        doc.create_element(root, "b");

        let c = doc.new_element("c");
        doc.insert_child_at(root, 999, c);
        assert_eq!(doc.node(c).index, 2);
        check_indexes(&doc, base);
    }

    #[test]
    fn test_insert_child_at_same_parent_moves() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        let a = doc.create_element(root, "a");
        let b = doc.create_element(root, "b");
        let c = doc.create_element(root, "c");

        // Moving a forward within the same parent: the target index is
        // interpreted after removal.
        doc.insert_child_at(root, 2, a);
        assert_eq!(doc.children(root), &[b, a, c]);
        check_indexes(&doc, base);
    }

    #[test]
    fn test_remove_child_at() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        let a = doc.create_element(root, "a");
        let b = doc.create_element(root, "b");

        assert_eq!(doc.remove_child_at(root, 0), Some(a));
        assert_eq!(doc.parent(a), None);
        assert_eq!(doc.children(root), &[b]);
        assert_eq!(doc.node(b).index, 0);
        assert_eq!(doc.remove_child_at(root, 5), None);
    }

    #[test]
    fn test_remove_child_by_identity() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        let a = doc.create_element(root, "a");
        let stranger = doc.new_element("x");

        assert_eq!(doc.remove_child(root, stranger), None);
        assert_eq!(doc.remove_child(root, a), Some(a));
        assert!(doc.children(root).is_empty());
    }

    #[test]
    fn test_attr_replace_on_create() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "book");
        doc.create_attr(e, "lang", "fr");
        doc.create_attr(e, "lang", "en");

        assert_eq!(doc.attributes(e).len(), 1);
        assert_eq!(doc.select_attr_value(e, "lang", "?"), "en");
    }

    #[test]
    fn test_attr_owner_backref() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "root");
        doc.create_attr(e, "bar", "1");

        assert_eq!(doc.select_attr(e, "bar").unwrap().owner, Some(e));
        let removed = doc.remove_attr(e, "bar").unwrap();
        assert_eq!(removed.owner, None);
        assert_eq!(removed.value, "1");
        assert!(doc.select_attr(e, "bar").is_none());
    }

    #[test]
    fn test_attr_prefix_matching() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "el");
        doc.create_attr(e, "t:lang", "en");

        // A bare key matches any prefix; an explicit prefix must match.
        assert!(doc.select_attr(e, "lang").is_some());
        assert!(doc.select_attr(e, "t:lang").is_some());
        assert!(doc.select_attr(e, "p:lang").is_none());
    }

    #[test]
    fn test_select_element_prefix_matching() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "book");
        let title = doc.create_element(root, "t:title");

        assert_eq!(doc.select_element(root, "title"), Some(title));
        assert_eq!(doc.select_element(root, "t:title"), Some(title));
        assert_eq!(doc.select_element(root, "p:title"), None);
    }

    #[test]
    fn test_sort_attrs_order() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "el");
        for (k, v) in [
            ("foo", "5"),
            ("Foo", "2"),
            ("aaa", "4"),
            ("AAA", "1"),
            ("a01", "3"),
            ("z", "6"),
            ("a:ZZZ", "9"),
            ("a:AAA", "8"),
        ] {
            doc.create_attr(e, k, v);
        }
        doc.sort_attrs(e);
        let keys: Vec<String> = doc.attributes(e).iter().map(Attribute::full_key).collect();
        assert_eq!(keys, ["AAA", "Foo", "a01", "aaa", "foo", "z", "a:AAA", "a:ZZZ"]);
    }

    #[test]
    fn test_text_skips_comments() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let a = doc.create_element(base, "a");
        doc.create_text(a, "123");
        doc.create_comment(a, " test ");
        doc.create_text(a, "456");
        assert_eq!(doc.text(a), "123456");
    }

    #[test]
    fn test_text_stops_at_element() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let a = doc.create_element(base, "a");
        doc.create_text(a, "1");
        doc.create_element(a, "inner");
        doc.create_text(a, "2");
        assert_eq!(doc.text(a), "1");
    }

    #[test]
    fn test_set_text_replaces_run() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");

        doc.set_text(root, "foo");
        assert_eq!(doc.text(root), "foo");
        assert_eq!(doc.children(root).len(), 1);

        doc.set_text(root, "bar");
        assert_eq!(doc.text(root), "bar");
        assert_eq!(doc.children(root).len(), 1);

        doc.create_cdata(root, "cdata");
        assert_eq!(doc.text(root), "barcdata");
        assert_eq!(doc.children(root).len(), 2);

        doc.set_text(root, "qux");
        assert_eq!(doc.text(root), "qux");
        assert_eq!(doc.children(root).len(), 1);

        doc.set_text(root, "");
        assert_eq!(doc.text(root), "");
        assert!(doc.children(root).is_empty());
    }

    #[test]
    fn test_set_tail() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        let child = doc.create_element(root, "child");
        doc.create_text(root, "\n\t");
        doc.set_text(child, "foo");

        assert_eq!(doc.tail(child), "\n\t");

        doc.create_cdata(root, "    ");
        assert_eq!(doc.tail(child), "\n\t    ");

        doc.set_tail(child, "");
        assert_eq!(doc.tail(child), "");
        assert_eq!(doc.children(root).len(), 1);

        doc.set_tail(child, "\t\t\t");
        assert_eq!(doc.tail(child), "\t\t\t");
        assert_eq!(doc.children(root).len(), 2);
    }

    #[test]
    fn test_sibling_navigation_skips_non_elements() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let root = doc.create_element(base, "root");
        let a = doc.create_element(root, "a");
        doc.create_text(root, " ");
        doc.create_comment(root, "x");
        let b = doc.create_element(root, "b");

        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.prev_sibling(b), Some(a));
        assert_eq!(doc.prev_sibling(a), None);
        assert_eq!(doc.next_sibling(b), None);
        assert_eq!(doc.next_sibling(root), None);
    }

    #[test]
    fn test_set_root_preserves_position() {
        let mut doc = Document::new();
        let base = doc.document_node();
        doc.create_proc_inst(base, "test", "a=\"wow\"");
        let old = doc.create_element(base, "book");

        let new = doc.new_element("root");
        doc.set_root(new);

        assert_eq!(doc.root(), Some(new));
        assert_eq!(doc.parent(old), None);
        assert_eq!(doc.node(new).index, 1);
        check_indexes(&doc, base);

        doc.set_root(old);
        assert_eq!(doc.root(), Some(old));
        assert_eq!(doc.parent(new), None);
    }

    #[test]
    fn test_clone_is_deep() {
        let mut doc = Document::new();
        doc.read_from_str("<store><book lang=\"en\"><title>T</title></book></store>")
            .unwrap();
        let copy = doc.clone();

        let s1 = doc.write_to_string().unwrap();
        let s2 = copy.write_to_string().unwrap();
        assert_eq!(s1, s2);

        let title = doc.find_element("./store/book/title").unwrap();
        let parent = doc.parent(title).unwrap();
        doc.remove_child_at(parent, doc.index(title));

        let s1 = doc.write_to_string().unwrap();
        let s2 = copy.write_to_string().unwrap();
        assert_ne!(s1, s2);
    }

    #[test]
    fn test_not_nil_chains_are_noops() {
        let mut doc = Document::new();
        doc.read_from_str("<enabled>true</enabled>").unwrap();
        let base = doc.document_node();

        let enabled = doc.not_nil(doc.select_element(base, "enabled"));
        doc.set_text(enabled, "false");

        let visible = doc.not_nil(doc.select_element(base, "visible"));
        assert!(doc.is_nil_sentinel(visible));
        doc.set_text(visible, "true");
        doc.create_attr(visible, "a", "1");
        let inner = doc.create_element(visible, "inner");
        assert!(doc.is_nil_sentinel(inner));

        assert_eq!(doc.write_to_string().unwrap(), "<enabled>false</enabled>");
    }

    #[test]
    fn test_namespace_uri_walks_ancestors() {
        let mut doc = Document::new();
        doc.read_from_str(
            "<root xmlns=\"https://root.example.com\">\
             <child1 xmlns=\"https://child.example.com\"><grandchild/></child1>\
             <child2/></root>",
        )
        .unwrap();

        let root = doc.root().unwrap();
        let child1 = doc.select_element(root, "child1").unwrap();
        let child2 = doc.select_element(root, "child2").unwrap();
        let grandchild = doc.select_element(child1, "grandchild").unwrap();

        assert_eq!(doc.namespace_uri(doc.document_node()), "");
        assert_eq!(doc.namespace_uri(root), "https://root.example.com");
        assert_eq!(doc.namespace_uri(child1), "https://child.example.com");
        assert_eq!(doc.namespace_uri(child2), "https://root.example.com");
        assert_eq!(doc.namespace_uri(grandchild), "https://child.example.com");
    }

    #[test]
    fn test_child_elements_iterator() {
        let mut doc = Document::new();
        doc.read_from_str("<root>x<a/>y<b/><!--c--><c/></root>").unwrap();
        let root = doc.root().unwrap();
        let tags: Vec<&str> = doc
            .child_elements(root)
            .filter_map(|e| doc.tag(e))
            .collect();
        assert_eq!(tags, ["a", "b", "c"]);
    }

    #[test]
    fn test_reindex_children() {
        let mut doc = Document::new();
        doc.read_from_str("<root><c1/><c2/><c3/><c4/><c5/></root>").unwrap();
        doc.unindent();
        let root = doc.root().unwrap();
        assert_eq!(doc.children(root).len(), 5);

        doc.reindex_children(root);
        check_indexes(&doc, doc.document_node());

        let e = doc.new_element("foo");
        doc.insert_child_at(root, 0, e);
        check_indexes(&doc, doc.document_node());
        doc.remove_child_at(root, 0);
        check_indexes(&doc, doc.document_node());
    }

    #[test]
    fn test_get_path_of_document_node() {
        let doc = Document::new();
        assert_eq!(doc.get_path(doc.document_node()), "/");
    }

    #[test]
    fn test_get_relative_path_disjoint_trees() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let a = doc.create_element(base, "a");
        let detached = doc.new_element("x");
        assert_eq!(doc.get_relative_path(a, detached), None);
    }
}
