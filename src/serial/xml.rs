//! XML serializer.
//!
//! Walks the tree in document order and writes XML text with the
//! escaping profile selected by [`WriteSettings`].

use std::io::Write;

use crate::parser::input::is_xml_char;
use crate::tree::{Document, NodeId, NodeKind};

/// Settings controlling how documents are written.
///
/// Use the builder pattern to configure:
///
/// ```
/// use xylem::WriteSettings;
///
/// let settings = WriteSettings::default()
///     .canonical_end_tags(true)
///     .canonical_text(true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct WriteSettings {
    /// Emit explicit `</tag>` end tags even for elements with no
    /// children.
    pub canonical_end_tags: bool,
    /// In character data, escape only `&`, `<`, `>`, and CR (as `&#xD;`);
    /// apostrophe and quote stay literal. Without this flag the five
    /// predefined entities are all escaped.
    pub canonical_text: bool,
    /// In attribute values, escape `&`, `<`, `"`, and tab/LF/CR as
    /// numeric references; `>` and apostrophe stay literal.
    pub canonical_attr_val: bool,
    /// Enclose attribute values in single quotes; the escaping rules
    /// adjust so apostrophes are escaped instead of quotes.
    pub attr_single_quote: bool,
    /// Use `\r\n` line endings when indenting; otherwise `\n`.
    pub use_crlf: bool,
}

impl WriteSettings {
    /// Enables or disables explicit end tags for childless elements.
    #[must_use]
    pub fn canonical_end_tags(mut self, yes: bool) -> Self {
        self.canonical_end_tags = yes;
        self
    }

    /// Enables or disables the canonical character data escaping profile.
    #[must_use]
    pub fn canonical_text(mut self, yes: bool) -> Self {
        self.canonical_text = yes;
        self
    }

    /// Enables or disables the canonical attribute value escaping profile.
    #[must_use]
    pub fn canonical_attr_val(mut self, yes: bool) -> Self {
        self.canonical_attr_val = yes;
        self
    }

    /// Enables or disables single-quoted attribute values.
    #[must_use]
    pub fn attr_single_quote(mut self, yes: bool) -> Self {
        self.attr_single_quote = yes;
        self
    }

    /// Enables or disables CRLF line endings for indentation.
    #[must_use]
    pub fn use_crlf(mut self, yes: bool) -> Self {
        self.use_crlf = yes;
        self
    }
}

/// The escaping profile applied to a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EscapeMode {
    /// Escape the five predefined entities; tab, LF, and CR stay literal.
    Normal,
    /// Canonical character data: `&`, `<`, `>`, and CR only.
    CanonicalText,
    /// Canonical attribute value: `&`, `<`, `"`, and whitespace as
    /// numeric references.
    CanonicalAttr,
}

/// Serializes a node and its subtree.
pub(crate) fn write_node<W: Write>(
    doc: &Document,
    id: NodeId,
    w: &mut W,
    settings: &WriteSettings,
) -> std::io::Result<()> {
    match &doc.node(id).kind {
        NodeKind::Element {
            prefix,
            tag,
            attributes,
            children,
        } => {
            w.write_all(b"<")?;
            if let Some(p) = prefix {
                w.write_all(p.as_bytes())?;
                w.write_all(b":")?;
            }
            w.write_all(tag.as_bytes())?;

            for attr in attributes {
                w.write_all(b" ")?;
                w.write_all(attr.full_key().as_bytes())?;
                let (open, mode) = if settings.attr_single_quote {
                    // Single-quoted values always use the normal profile
                    // so apostrophes are escaped.
                    (b"='".as_slice(), EscapeMode::Normal)
                } else if settings.canonical_attr_val {
                    (b"=\"".as_slice(), EscapeMode::CanonicalAttr)
                } else {
                    (b"=\"".as_slice(), EscapeMode::Normal)
                };
                w.write_all(open)?;
                write_escaped(w, &attr.value, mode)?;
                w.write_all(if settings.attr_single_quote { b"'" } else { b"\"" })?;
            }

            if children.is_empty() && !settings.canonical_end_tags {
                w.write_all(b"/>")?;
            } else {
                w.write_all(b">")?;
                for &child in children {
                    write_node(doc, child, w, settings)?;
                }
                w.write_all(b"</")?;
                if let Some(p) = prefix {
                    w.write_all(p.as_bytes())?;
                    w.write_all(b":")?;
                }
                w.write_all(tag.as_bytes())?;
                w.write_all(b">")?;
            }
        }
        NodeKind::CharData { data, cdata, .. } => {
            if *cdata {
                w.write_all(b"<![CDATA[")?;
                w.write_all(data.as_bytes())?;
                w.write_all(b"]]>")?;
            } else {
                let mode = if settings.canonical_text {
                    EscapeMode::CanonicalText
                } else {
                    EscapeMode::Normal
                };
                write_escaped(w, data, mode)?;
            }
        }
        NodeKind::Comment { text } => {
            w.write_all(b"<!--")?;
            w.write_all(text.as_bytes())?;
            w.write_all(b"-->")?;
        }
        NodeKind::ProcInst { target, inst } => {
            w.write_all(b"<?")?;
            w.write_all(target.as_bytes())?;
            if !inst.is_empty() {
                w.write_all(b" ")?;
                w.write_all(inst.as_bytes())?;
            }
            w.write_all(b"?>")?;
        }
        NodeKind::Directive { body } => {
            w.write_all(b"<!")?;
            w.write_all(body.as_bytes())?;
            w.write_all(b">")?;
        }
    }
    Ok(())
}

/// Writes `text` with the escaping rules of `mode`. Code points invalid
/// in XML are replaced with `U+FFFD`.
fn write_escaped<W: Write>(w: &mut W, text: &str, mode: EscapeMode) -> std::io::Result<()> {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if mode != EscapeMode::CanonicalAttr => out.push_str("&gt;"),
            '\'' if mode == EscapeMode::Normal => out.push_str("&apos;"),
            '"' if mode != EscapeMode::CanonicalText => out.push_str("&quot;"),
            '\t' if mode == EscapeMode::CanonicalAttr => out.push_str("&#x9;"),
            '\n' if mode == EscapeMode::CanonicalAttr => out.push_str("&#xA;"),
            '\r' if mode != EscapeMode::Normal => out.push_str("&#xD;"),
            c if !is_xml_char(c) => out.push('\u{FFFD}'),
            c => out.push(c),
        }
    }
    w.write_all(out.as_bytes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn build_escape_doc(input: &str) -> Document {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "e");
        doc.set_text(e, input);
        doc.create_attr(e, "a", input);
        doc
    }

    #[test]
    fn test_escape_normal_mode() {
        let doc = build_escape_doc("&<>'\"\t\n\r");
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<e a=\"&amp;&lt;&gt;&apos;&quot;\t\n\r\">&amp;&lt;&gt;&apos;&quot;\t\n\r</e>"
        );
    }

    #[test]
    fn test_escape_canonical_attr_mode() {
        let mut doc = build_escape_doc("&<>'\"\t\n\r");
        doc.write_settings = WriteSettings::default().canonical_attr_val(true);
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<e a=\"&amp;&lt;>'&quot;&#x9;&#xA;&#xD;\">&amp;&lt;&gt;&apos;&quot;\t\n\r</e>"
        );
    }

    #[test]
    fn test_escape_canonical_text_mode() {
        let mut doc = build_escape_doc("&<>'\"\t\n\r");
        doc.write_settings = WriteSettings::default().canonical_text(true);
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<e a=\"&amp;&lt;&gt;&apos;&quot;\t\n\r\">&amp;&lt;&gt;'\"\t\n&#xD;</e>"
        );
    }

    #[test]
    fn test_invalid_chars_become_replacement() {
        let doc = build_escape_doc("\u{0}\u{1f}\u{8}\t\n\r");
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<e a=\"\u{FFFD}\u{FFFD}\u{FFFD}\t\n\r\">\u{FFFD}\u{FFFD}\u{FFFD}\t\n\r</e>"
        );

        let mut doc = build_escape_doc("\u{0}\u{1f}\u{8}\t\n\r");
        doc.write_settings = WriteSettings::default().canonical_attr_val(true);
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<e a=\"\u{FFFD}\u{FFFD}\u{FFFD}&#x9;&#xA;&#xD;\">\u{FFFD}\u{FFFD}\u{FFFD}\t\n\r</e>"
        );
    }

    #[test]
    fn test_canonical_end_tags() {
        let mut doc = Document::new();
        let base = doc.document_node();
        doc.create_element(base, "empty");
        assert_eq!(doc.write_to_string().unwrap(), "<empty/>");

        doc.write_settings = WriteSettings::default().canonical_end_tags(true);
        assert_eq!(doc.write_to_string().unwrap(), "<empty></empty>");
    }

    #[test]
    fn test_attr_single_quote() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "a");
        doc.create_attr(e, "title", "it's \"quoted\"");
        doc.write_settings = WriteSettings::default().attr_single_quote(true);
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<a title='it&apos;s &quot;quoted&quot;'/>"
        );
    }

    #[test]
    fn test_write_proc_inst_and_directive() {
        let mut doc = Document::new();
        let base = doc.document_node();
        doc.create_proc_inst(base, "xml-stylesheet", "type=\"text/xsl\" href=\"style.xsl\"");
        doc.create_proc_inst(base, "break", "");
        doc.create_directive(base, "DOCTYPE html");
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<?xml-stylesheet type=\"text/xsl\" href=\"style.xsl\"?><?break?><!DOCTYPE html>"
        );
    }

    #[test]
    fn test_write_cdata_verbatim() {
        let mut doc = Document::new();
        let base = doc.document_node();
        let e = doc.create_element(base, "script");
        doc.create_cdata(e, "x < 1 && y > 2");
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<script><![CDATA[x < 1 && y > 2]]></script>"
        );
    }

    #[test]
    fn test_write_subtree() {
        let mut doc = Document::new();
        doc.read_from_str("<store><book><title>T</title></book></store>")
            .unwrap();
        let book = doc.find_element("//book").unwrap();
        let mut out = Vec::new();
        doc.write_node_to(book, &mut out, &WriteSettings::default())
            .unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out),
            "<book><title>T</title></book>"
        );
    }

    #[test]
    fn test_replacement_char_passes_through() {
        let doc = build_escape_doc("ok\u{FFFD}ok");
        assert_eq!(
            doc.write_to_string().unwrap(),
            "<e a=\"ok\u{FFFD}ok\">ok\u{FFFD}ok</e>"
        );
    }
}
