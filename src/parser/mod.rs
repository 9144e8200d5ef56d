//! Document parser.
//!
//! A hand-rolled parser in two layers: a lexer producing XML lexical
//! tokens (start/end tags, character data, CDATA sections, comments,
//! processing instructions, directives) and a tree builder consuming that
//! stream while maintaining the open-element stack.
//!
//! The parser is hand-rolled (not combinator-based) because:
//! 1. Permissive-mode repairs require fine-grained control over parse state
//! 2. The auto-close machinery needs one token of lookahead into the
//!    builder's stack
//! 3. Performance — no abstraction overhead

pub(crate) mod builder;
pub(crate) mod input;
pub(crate) mod lexer;

use std::collections::HashMap;
use std::sync::Arc;

use crate::encoding::EncodingError;
use crate::error::ParseError;
use crate::tree::Document;

/// Tag names treated as implicitly self-closing under permissive mode,
/// covering the HTML void elements.
///
/// Pass to [`ReadSettings::auto_close`] to parse HTML-flavored input:
///
/// ```
/// use xylem::{Document, ReadSettings, HTML_AUTO_CLOSE};
///
/// let mut doc = Document::new();
/// doc.read_settings = ReadSettings::default()
///     .permissive(true)
///     .auto_close(HTML_AUTO_CLOSE);
/// doc.read_from_str("<br>some text<br>").unwrap();
/// assert_eq!(doc.write_to_string().unwrap(), "<br/>some text<br/>");
/// ```
pub const HTML_AUTO_CLOSE: &[&str] = &[
    "basefont", "br", "area", "link", "img", "param", "hr", "input", "col", "frame", "isindex",
    "base", "meta",
];

/// A pluggable character-set decoder.
///
/// Invoked with the declared encoding label and the raw input bytes when
/// the label is not recognized by the built-in transcoder. Returns the
/// decoded bytes (which must form valid UTF-8) or an error.
pub type CharsetDecoder =
    Arc<dyn Fn(&str, &[u8]) -> Result<Vec<u8>, EncodingError> + Send + Sync>;

/// Settings controlling how documents are read.
///
/// Use the builder pattern to configure:
///
/// ```
/// use xylem::ReadSettings;
///
/// let settings = ReadSettings::default()
///     .permissive(true)
///     .preserve_cdata(true);
/// ```
#[derive(Default)]
pub struct ReadSettings {
    /// If true, tolerate and repair common mistakes: missing end tags at
    /// end of input, mismatched end tags, unknown entities (kept as
    /// literal text), and attributes without values.
    pub permissive: bool,
    /// Tag names treated as implicitly self-closed under permissive mode.
    /// Matching is ASCII case-insensitive on the local name.
    pub auto_close: Vec<String>,
    /// If true, CDATA sections become dedicated CDATA nodes that
    /// round-trip as `<![CDATA[...]]>`; otherwise their payload becomes
    /// ordinary character data.
    pub preserve_cdata: bool,
    /// If true, repeated attribute keys are all retained in source order;
    /// otherwise the last occurrence wins, in the position of the first.
    pub preserve_duplicate_attrs: bool,
    /// If true, reject any element or significant character data after
    /// the first top-level element closes.
    pub validate_input: bool,
    /// Entity replacement values consulted after the five predefined XML
    /// entities.
    pub entity: HashMap<String, String>,
    /// Decoder for declared encodings the built-in transcoder does not
    /// recognize.
    pub charset_decoder: Option<CharsetDecoder>,
}

impl Clone for ReadSettings {
    fn clone(&self) -> Self {
        Self {
            permissive: self.permissive,
            auto_close: self.auto_close.clone(),
            preserve_cdata: self.preserve_cdata,
            preserve_duplicate_attrs: self.preserve_duplicate_attrs,
            validate_input: self.validate_input,
            entity: self.entity.clone(),
            charset_decoder: self.charset_decoder.clone(),
        }
    }
}

impl std::fmt::Debug for ReadSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadSettings")
            .field("permissive", &self.permissive)
            .field("auto_close", &self.auto_close)
            .field("preserve_cdata", &self.preserve_cdata)
            .field("preserve_duplicate_attrs", &self.preserve_duplicate_attrs)
            .field("validate_input", &self.validate_input)
            .field("entity", &format_args!("{} entries", self.entity.len()))
            .field(
                "charset_decoder",
                &self.charset_decoder.as_ref().map(|_| "..."),
            )
            .finish()
    }
}

impl ReadSettings {
    /// Enables or disables permissive mode.
    #[must_use]
    pub fn permissive(mut self, yes: bool) -> Self {
        self.permissive = yes;
        self
    }

    /// Sets the tag names treated as implicitly self-closing under
    /// permissive mode.
    #[must_use]
    pub fn auto_close<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.auto_close = tags.into_iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    /// Enables or disables dedicated CDATA nodes.
    #[must_use]
    pub fn preserve_cdata(mut self, yes: bool) -> Self {
        self.preserve_cdata = yes;
        self
    }

    /// Enables or disables retention of duplicate attributes.
    #[must_use]
    pub fn preserve_duplicate_attrs(mut self, yes: bool) -> Self {
        self.preserve_duplicate_attrs = yes;
        self
    }

    /// Enables or disables rejection of content after the root element.
    #[must_use]
    pub fn validate_input(mut self, yes: bool) -> Self {
        self.validate_input = yes;
        self
    }

    /// Sets the caller-supplied entity map.
    #[must_use]
    pub fn entity(mut self, entity: HashMap<String, String>) -> Self {
        self.entity = entity;
        self
    }

    /// Sets the character-set decoder callback, invoked for declared
    /// encodings the built-in transcoder does not recognize.
    #[must_use]
    pub fn charset_decoder(
        mut self,
        decoder: impl Fn(&str, &[u8]) -> Result<Vec<u8>, EncodingError> + Send + Sync + 'static,
    ) -> Self {
        self.charset_decoder = Some(Arc::new(decoder));
        self
    }
}

/// Parses decoded text into the document using its
/// [`ReadSettings`](Document::read_settings).
///
/// The caller clears prior document contents and discards the partial
/// tree on error.
pub(crate) fn parse_into(doc: &mut Document, text: &str) -> Result<(), ParseError> {
    builder::TreeBuilder::new(doc).parse(text)
}
