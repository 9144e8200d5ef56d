//! Tree-building state machine.
//!
//! Consumes the lexer's token stream and reconstructs the document tree,
//! maintaining a stack of open elements. Enforces element balance in
//! strict mode; under permissive mode it repairs mismatched and missing
//! end tags, and honors the auto-close set in the manner of HTML void
//! elements: whenever the innermost open element is in the set and the
//! next token does not close it, its close is synthesized first.

use std::collections::HashSet;

use crate::error::{ErrorSeverity, ParseError};
use crate::parser::lexer::{Lexer, Token};
use crate::parser::ReadSettings;
use crate::tree::{is_whitespace, split_name, Document, NodeId, NodeKind};

pub(crate) struct TreeBuilder<'d> {
    doc: &'d mut Document,
    settings: ReadSettings,
    /// Lowercased auto-close tag names.
    auto_close: HashSet<String>,
    /// Open element stack. The document node itself is never pushed.
    stack: Vec<NodeId>,
    /// True once the first top-level element has been closed.
    root_closed: bool,
}

impl<'d> TreeBuilder<'d> {
    pub fn new(doc: &'d mut Document) -> Self {
        let settings = doc.read_settings.clone();
        let auto_close = settings
            .auto_close
            .iter()
            .map(|t| t.to_ascii_lowercase())
            .collect();
        Self {
            doc,
            settings,
            auto_close,
            stack: Vec::new(),
            root_closed: false,
        }
    }

    /// Parses `text` into the document. The caller is responsible for
    /// clearing prior contents; on error the caller discards the partial
    /// tree.
    pub fn parse(mut self, text: &str) -> Result<(), ParseError> {
        // A leading byte-order mark is preserved as document char data.
        let text = match text.strip_prefix('\u{FEFF}') {
            Some(rest) => {
                let base = self.doc.document_node();
                self.doc.create_text(base, "\u{FEFF}");
                rest
            }
            None => text,
        };

        let mut lexer = Lexer::new(text, &self.settings);
        let result = self.run(&mut lexer);
        self.doc.diagnostics.extend(lexer.into_diagnostics());
        result
    }

    fn run(&mut self, lexer: &mut Lexer<'_>) -> Result<(), ParseError> {
        while let Some(token) = lexer.next_token()? {
            self.synthesize_auto_closes(Some(&token), lexer);
            match token {
                Token::ElementStart {
                    name,
                    attrs,
                    self_closing,
                } => self.on_element_start(&name, attrs, self_closing, lexer)?,
                Token::ElementEnd { name } => self.on_element_end(&name, lexer)?,
                Token::Text(data) => self.on_text(&data, lexer)?,
                Token::CData(data) => self.on_cdata(&data),
                Token::Comment(text) => {
                    let top = self.top();
                    self.doc.create_comment(top, &text);
                }
                Token::ProcInst { target, inst } => {
                    let top = self.top();
                    self.doc.create_proc_inst(top, &target, &inst);
                }
                Token::Directive(body) => {
                    let top = self.top();
                    self.doc.create_directive(top, &body);
                }
            }
        }

        // End of input: every open element is unbalanced. Permissive mode
        // invents the missing end tags.
        self.synthesize_auto_closes(None, lexer);
        if !self.stack.is_empty() {
            if !self.settings.permissive {
                return Err(lexer.error_here("unexpected end of input"));
            }
            while let Some(top) = self.stack.pop() {
                let tag = self.doc.full_tag(top).unwrap_or_default();
                lexer.record(
                    ErrorSeverity::Error,
                    format!("element <{tag}> has no end tag"),
                );
            }
            self.root_closed = true;
        }
        Ok(())
    }

    fn top(&self) -> NodeId {
        self.stack
            .last()
            .copied()
            .unwrap_or_else(|| self.doc.document_node())
    }

    /// While the innermost open element is in the auto-close set and the
    /// incoming token does not close it, synthesize its end tag.
    fn synthesize_auto_closes(&mut self, token: Option<&Token>, lexer: &mut Lexer<'_>) {
        if !self.settings.permissive || self.auto_close.is_empty() {
            return;
        }
        while let Some(&top) = self.stack.last() {
            let Some(tag) = self.doc.tag(top) else {
                break;
            };
            let lower = tag.to_ascii_lowercase();
            if !self.auto_close.contains(&lower) {
                break;
            }
            let closes_top = matches!(token, Some(Token::ElementEnd { name })
                if split_name(name).1.eq_ignore_ascii_case(&lower));
            if closes_top {
                break;
            }
            self.stack.pop();
            if self.stack.is_empty() {
                self.root_closed = true;
            }
            lexer.record(
                ErrorSeverity::Warning,
                format!("auto-closed element <{lower}>"),
            );
        }
    }

    fn on_element_start(
        &mut self,
        name: &str,
        attrs: Vec<(String, String)>,
        self_closing: bool,
        lexer: &Lexer<'_>,
    ) -> Result<(), ParseError> {
        if self.stack.is_empty() && self.root_closed && self.settings.validate_input {
            return Err(lexer.error_here("invalid XML format: content after document element"));
        }

        let parent = self.top();
        let e = self.doc.create_element(parent, name);

        for (full_key, value) in attrs {
            if self.settings.preserve_duplicate_attrs {
                let (prefix, key) = split_name(&full_key);
                self.doc
                    .push_attr(e, prefix.map(str::to_string), key, &value);
            } else {
                // Last occurrence of a key wins, in the position of the
                // first.
                self.doc.create_attr(e, &full_key, &value);
            }
        }

        if self_closing {
            if self.stack.is_empty() {
                self.root_closed = true;
            }
        } else {
            self.stack.push(e);
        }
        Ok(())
    }

    fn on_element_end(&mut self, name: &str, lexer: &mut Lexer<'_>) -> Result<(), ParseError> {
        loop {
            let Some(&top) = self.stack.last() else {
                return Err(lexer.error_here(format!("unexpected end element </{name}>")));
            };
            let top_tag = self.doc.full_tag(top).unwrap_or_default();
            if top_tag == name {
                self.stack.pop();
                if self.stack.is_empty() {
                    self.root_closed = true;
                }
                return Ok(());
            }
            if !self.settings.permissive {
                return Err(lexer.error_here(format!("element <{top_tag}> closed by </{name}>")));
            }
            // Permissive repair: close the open element and try the end
            // tag again one level up.
            self.stack.pop();
            if self.stack.is_empty() {
                self.root_closed = true;
            }
            lexer.record(
                ErrorSeverity::Error,
                format!("element <{top_tag}> closed by </{name}>"),
            );
        }
    }

    fn on_text(&mut self, data: &str, lexer: &Lexer<'_>) -> Result<(), ParseError> {
        // Character data outside all elements attaches to the document,
        // whitespace included, so unindented input round-trips exactly.
        // Input validation rejects significant text there.
        if self.stack.is_empty() && self.settings.validate_input && !is_whitespace(data) {
            return Err(lexer.error_here("invalid XML format: character data outside root element"));
        }
        let top = self.top();
        self.attach_char_data(top, data, false);
        Ok(())
    }

    fn on_cdata(&mut self, data: &str) {
        let top = self.top();
        if self.settings.preserve_cdata {
            self.doc.create_cdata(top, data);
        } else {
            self.attach_char_data(top, data, false);
        }
    }

    /// Attaches parsed character data, classifying whitespace by content.
    fn attach_char_data(&mut self, parent: NodeId, data: &str, cdata: bool) {
        let id = self.doc.alloc(NodeKind::CharData {
            data: data.to_string(),
            cdata,
            whitespace: is_whitespace(data),
        });
        self.doc.add_child(parent, id);
    }
}
