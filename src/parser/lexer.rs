//! Lexical token layer.
//!
//! The [`Lexer`] pulls one [`Token`] at a time from the input: start and
//! end element tags (with attribute lists), character data, CDATA
//! sections, comments, processing instructions, and directives. Entity
//! and character references are resolved here; line endings normalize to
//! `\n` per XML 1.0 §2.11.

use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError};
use crate::parser::input::ParserInput;
use crate::parser::ReadSettings;

/// A single lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// A start tag, e.g. `<book lang="en">` or `<br/>`.
    ElementStart {
        /// The full tag name, prefix included.
        name: String,
        /// Attributes as (full key, decoded value) pairs, in source order.
        attrs: Vec<(String, String)>,
        /// True for `<tag/>` empty-element syntax.
        self_closing: bool,
    },
    /// An end tag, e.g. `</book>`. The name includes the prefix.
    ElementEnd { name: String },
    /// Character data with references resolved.
    Text(String),
    /// A `<![CDATA[...]]>` section's payload.
    CData(String),
    /// A comment's text.
    Comment(String),
    /// A processing instruction.
    ProcInst { target: String, inst: String },
    /// A `<!...>` directive's body.
    Directive(String),
}

/// Pull-based tokenizer over a decoded UTF-8 document.
pub(crate) struct Lexer<'a> {
    input: ParserInput<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, settings: &ReadSettings) -> Self {
        let mut input = ParserInput::new(text);
        input.set_permissive(settings.permissive);
        input.entity_map = settings.entity.clone();
        Self { input }
    }

    /// Creates a fatal `ParseError` at the current location.
    pub fn error_here(&self, message: impl Into<String>) -> ParseError {
        self.input.error_here(message)
    }

    /// Records a repair made under permissive mode.
    pub fn record(&mut self, severity: ErrorSeverity, message: String) {
        self.input.record(severity, message);
    }

    /// Consumes the lexer, yielding the diagnostics it accumulated.
    pub fn into_diagnostics(self) -> Vec<ParseDiagnostic> {
        self.input.diagnostics
    }

    /// Pulls the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        if self.input.done() {
            return Ok(None);
        }
        if self.input.cur() != Some(b'<') {
            return self.lex_text().map(Some);
        }
        if self.input.starts_with(b"<![CDATA[") {
            return self.lex_cdata().map(Some);
        }
        if self.input.starts_with(b"<!--") {
            return self.lex_comment().map(Some);
        }
        if self.input.starts_with(b"<!") {
            return self.lex_directive().map(Some);
        }
        if self.input.starts_with(b"</") {
            return self.lex_end_tag().map(Some);
        }
        if self.input.starts_with(b"<?") {
            return self.lex_proc_inst().map(Some);
        }
        self.lex_start_tag().map(Some)
    }

    fn lex_text(&mut self) -> Result<Token, ParseError> {
        let mut data = String::new();
        while !self.input.done() && self.input.cur() != Some(b'<') {
            if self.input.cur() == Some(b'&') {
                data.push_str(&self.input.parse_reference()?);
            } else {
                data.push(self.input.read_char()?);
            }
        }
        Ok(Token::Text(data))
    }

    fn lex_cdata(&mut self) -> Result<Token, ParseError> {
        self.input.consume(b"<![CDATA[")?;
        let mut data = String::new();
        loop {
            if self.input.done() {
                return Err(self.input.error_here("unexpected end of input in CDATA section"));
            }
            if self.input.starts_with(b"]]>") {
                self.input.bump(3);
                break;
            }
            data.push(self.input.read_char()?);
        }
        Ok(Token::CData(data))
    }

    fn lex_comment(&mut self) -> Result<Token, ParseError> {
        self.input.consume(b"<!--")?;
        let mut text = String::new();
        loop {
            if self.input.done() {
                return Err(self.input.error_here("unexpected end of input in comment"));
            }
            if self.input.starts_with(b"-->") {
                self.input.bump(3);
                break;
            }
            text.push(self.input.read_char()?);
        }
        Ok(Token::Comment(text))
    }

    /// Lexes a `<!...>` directive (DOCTYPE, ENTITY, or any other
    /// declaration), tracking `[...]` nesting and quoted strings so an
    /// internal subset's brackets and quotes don't end the scan early.
    fn lex_directive(&mut self) -> Result<Token, ParseError> {
        self.input.consume(b"<!")?;
        let mut body = String::new();
        let mut depth: u32 = 0;
        loop {
            if self.input.done() {
                return Err(self.input.error_here("unexpected end of input in directive"));
            }
            match self.input.cur() {
                Some(q @ (b'"' | b'\'')) => {
                    body.push(self.input.read_char()?);
                    loop {
                        if self.input.done() {
                            return Err(self
                                .input
                                .error_here("unexpected end of input in directive"));
                        }
                        let ch = self.input.read_char()?;
                        body.push(ch);
                        if ch == q as char {
                            break;
                        }
                    }
                }
                Some(b'[') => {
                    depth += 1;
                    body.push(self.input.read_char()?);
                }
                Some(b']') => {
                    depth = depth.saturating_sub(1);
                    body.push(self.input.read_char()?);
                }
                Some(b'>') if depth == 0 => {
                    self.input.bump(1);
                    break;
                }
                _ => body.push(self.input.read_char()?),
            }
        }
        Ok(Token::Directive(body))
    }

    fn lex_proc_inst(&mut self) -> Result<Token, ParseError> {
        self.input.consume(b"<?")?;
        let target = self
            .input
            .parse_name()
            .map_err(|_| self.input.error_here("expected processing instruction target"))?;

        let mut inst = String::new();
        if !self.input.starts_with(b"?>") {
            if !self.input.skip_whitespace() {
                return Err(self
                    .input
                    .error_here("whitespace required after processing instruction target"));
            }
            loop {
                if self.input.done() {
                    return Err(self
                        .input
                        .error_here("unexpected end of input in processing instruction"));
                }
                if self.input.starts_with(b"?>") {
                    break;
                }
                inst.push(self.input.read_char()?);
            }
        }
        self.input.consume(b"?>")?;
        Ok(Token::ProcInst { target, inst })
    }

    fn lex_start_tag(&mut self) -> Result<Token, ParseError> {
        self.input.consume(b"<")?;
        let name = self
            .input
            .parse_name()
            .map_err(|_| self.input.error_here("expected element name after <"))?;

        let mut attrs: Vec<(String, String)> = Vec::new();
        let self_closing;
        loop {
            let had_ws = self.input.skip_whitespace();
            match self.input.cur() {
                Some(b'>') => {
                    self.input.bump(1);
                    self_closing = false;
                    break;
                }
                Some(b'/') if self.input.starts_with(b"/>") => {
                    self.input.bump(2);
                    self_closing = true;
                    break;
                }
                None => {
                    return Err(self.input.error_here("unexpected end of input in element"));
                }
                _ => {}
            }
            if !had_ws {
                return Err(self.input.error_here("whitespace required between attributes"));
            }

            let key = self.input.parse_name()?;
            self.input.skip_whitespace();
            if self.input.cur() == Some(b'=') {
                self.input.bump(1);
                self.input.skip_whitespace();
                let value = self.input.parse_attribute_value()?;
                attrs.push((key, value));
            } else if self.input.permissive() {
                // A bare attribute takes its local name as its value.
                let local = key.rsplit(':').next().unwrap_or(&key).to_string();
                self.input.record(
                    ErrorSeverity::Warning,
                    format!("attribute '{key}' has no value"),
                );
                attrs.push((key, local));
            } else {
                return Err(self.input.error_here(format!("attribute '{key}' missing value")));
            }
        }

        Ok(Token::ElementStart {
            name,
            attrs,
            self_closing,
        })
    }

    fn lex_end_tag(&mut self) -> Result<Token, ParseError> {
        self.input.consume(b"</")?;
        let name = self
            .input
            .parse_name()
            .map_err(|_| self.input.error_here("expected element name after </"))?;
        self.input.skip_whitespace();
        self.input.consume(b">")?;
        Ok(Token::ElementEnd { name })
    }
}
