//! Tree-mutating pretty-printer.
//!
//! Indentation works by inserting whitespace-classified character data
//! nodes between the children of each element: a newline plus the
//! per-level indent string before every non-character-data child, and a
//! newline plus one level less before each closing tag. Previously
//! inserted (or parsed) whitespace nodes are stripped first, which makes
//! the operation idempotent and lets `NO_INDENT` remove formatting
//! entirely. Character data authored through `create_text`/`set_tail`
//! is never classified as whitespace and survives untouched.

use crate::tree::{Document, NodeId, NodeKind};

/// Passed as the space count to [`Document::indent`] to remove
/// indentation instead of adding it.
pub const NO_INDENT: i32 = -1;

/// Settings controlling pretty-printing.
///
/// Use the builder pattern to configure:
///
/// ```
/// use xylem::IndentSettings;
///
/// let settings = IndentSettings::new()
///     .spaces(2)
///     .preserve_leaf_whitespace(true);
/// ```
#[derive(Debug, Clone)]
pub struct IndentSettings {
    /// Spaces per nesting level; [`NO_INDENT`] disables indentation and
    /// strips existing whitespace nodes. Ignored when `use_tabs` is set.
    pub spaces: i32,
    /// Use one tab per nesting level instead of spaces.
    pub use_tabs: bool,
    /// Use `\r\n` newlines instead of `\n`.
    pub use_crlf: bool,
    /// Keep the interior of a text-only element verbatim when it consists
    /// entirely of whitespace.
    pub preserve_leaf_whitespace: bool,
    /// Trim the trailing newline at the end of the document.
    pub suppress_trailing_whitespace: bool,
}

impl Default for IndentSettings {
    fn default() -> Self {
        Self {
            spaces: 4,
            use_tabs: false,
            use_crlf: false,
            preserve_leaf_whitespace: false,
            suppress_trailing_whitespace: false,
        }
    }
}

impl IndentSettings {
    /// Creates settings with the defaults: four spaces, LF newlines.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of spaces per nesting level.
    #[must_use]
    pub fn spaces(mut self, spaces: i32) -> Self {
        self.spaces = spaces;
        self
    }

    /// Enables or disables tab indentation.
    #[must_use]
    pub fn use_tabs(mut self, yes: bool) -> Self {
        self.use_tabs = yes;
        self
    }

    /// Enables or disables CRLF newlines.
    #[must_use]
    pub fn use_crlf(mut self, yes: bool) -> Self {
        self.use_crlf = yes;
        self
    }

    /// Enables or disables preservation of whitespace-only leaf interiors.
    #[must_use]
    pub fn preserve_leaf_whitespace(mut self, yes: bool) -> Self {
        self.preserve_leaf_whitespace = yes;
        self
    }

    /// Enables or disables trimming of the document's trailing newline.
    #[must_use]
    pub fn suppress_trailing_whitespace(mut self, yes: bool) -> Self {
        self.suppress_trailing_whitespace = yes;
        self
    }
}

/// Produces the whitespace run inserted before a child at a given depth.
struct IndentText {
    newline: &'static str,
    level: String,
    enabled: bool,
}

impl IndentText {
    fn from_settings(settings: &IndentSettings, use_crlf: bool) -> Self {
        let newline = if use_crlf { "\r\n" } else { "\n" };
        if settings.use_tabs {
            return Self {
                newline,
                level: "\t".to_string(),
                enabled: true,
            };
        }
        if settings.spaces < 0 {
            return Self {
                newline,
                level: String::new(),
                enabled: false,
            };
        }
        #[allow(clippy::cast_sign_loss)]
        Self {
            newline,
            level: " ".repeat(settings.spaces as usize),
            enabled: true,
        }
    }

    /// The text inserted at `depth`; negative depth yields a bare
    /// newline. Empty when indentation is disabled.
    fn at(&self, depth: i32) -> String {
        if !self.enabled {
            return String::new();
        }
        let mut s = String::from(self.newline);
        for _ in 0..depth.max(0) {
            s.push_str(&self.level);
        }
        s
    }
}

/// Indents the whole document. The document's children sit at depth 0:
/// no indent text before the first top-level node, a bare newline after
/// the root element.
pub(crate) fn indent_document(doc: &mut Document, settings: &IndentSettings) {
    let use_crlf = settings.use_crlf || doc.write_settings.use_crlf;
    let text = IndentText::from_settings(settings, use_crlf);
    let base = doc.document_node();
    indent_children(doc, base, 0, &text, settings);

    if settings.suppress_trailing_whitespace {
        while let Some(&last) = doc.children(base).last() {
            if !doc.is_whitespace(last) {
                break;
            }
            doc.detach(last);
        }
    }
}

/// Indents the subtree rooted at `e` for standalone serialization; `e`'s
/// own children sit at depth 1.
pub(crate) fn indent_element(doc: &mut Document, e: NodeId, settings: &IndentSettings) {
    let use_crlf = settings.use_crlf || doc.write_settings.use_crlf;
    let text = IndentText::from_settings(settings, use_crlf);
    indent_children(doc, e, 1, &text, settings);
}

fn indent_children(
    doc: &mut Document,
    e: NodeId,
    depth: i32,
    text: &IndentText,
    settings: &IndentSettings,
) {
    strip_indent(doc, e, settings);
    let old = doc.take_children(e);
    if old.is_empty() {
        doc.replace_children(e, old);
        return;
    }

    let mut new = Vec::with_capacity(old.len() * 2 + 1);
    let mut is_char_data = false;
    let mut first_non_char_data = true;
    for c in old {
        is_char_data = doc.node(c).kind.is_char_data();
        // Insert newline+indent before each non-character-data child.
        // Exceptions: the first such child at document depth, and
        // children adjacent to character data runs.
        if !is_char_data {
            if !first_non_char_data || depth > 0 {
                push_indent(doc, &mut new, text.at(depth));
            }
            first_non_char_data = false;
        }

        new.push(c);

        if doc.node(c).kind.is_element() {
            indent_children(doc, c, depth + 1, text, settings);
        }
    }

    // Insert newline+indent before the closing tag unless the last child
    // was character data.
    if !is_char_data && (!first_non_char_data || depth > 0) {
        push_indent(doc, &mut new, text.at(depth - 1));
    }

    doc.replace_children(e, new);
}

fn push_indent(doc: &mut Document, new: &mut Vec<NodeId>, text: String) {
    if text.is_empty() {
        return;
    }
    let id = doc.alloc(NodeKind::CharData {
        data: text,
        cdata: false,
        whitespace: true,
    });
    new.push(id);
}

/// Removes whitespace-classified character data children, except the
/// single whitespace child of a leaf when `preserve_leaf_whitespace` is
/// set.
fn strip_indent(doc: &mut Document, e: NodeId, settings: &IndentSettings) {
    let children = doc.children(e);
    let whitespace_count = children.iter().filter(|&&c| doc.is_whitespace(c)).count();
    if whitespace_count == 0 {
        return;
    }
    if whitespace_count == children.len()
        && children.len() == 1
        && settings.preserve_leaf_whitespace
    {
        return;
    }

    let old = doc.take_children(e);
    let mut new = Vec::with_capacity(old.len() - whitespace_count);
    for c in old {
        if doc.is_whitespace(c) {
            doc.node_mut(c).parent = None;
            doc.node_mut(c).index = 0;
        } else {
            new.push(c);
        }
    }
    doc.replace_children(e, new);
}
