//! Low-level scanning over decoded input.
//!
//! [`ParserInput`] owns the cursor the lexer advances through the
//! document: byte peeks, character reads with newline folding, name
//! scanning, and reference resolution against the predefined XML
//! entities and the caller's entity map. Line and column information is
//! derived from the byte offset only when an error or diagnostic is
//! actually produced, so the scanning hot path carries no position
//! bookkeeping.

use std::collections::HashMap;

use crate::entities::XML_ENTITIES;
use crate::error::{ErrorSeverity, ParseDiagnostic, ParseError, SourceLocation};

// -------------------------------------------------------------------------
// XML character classes (XML 1.0 §2.2, §2.3)
// -------------------------------------------------------------------------

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2 `[2]`.
///
/// The XML 1.0 (Fifth Edition) `Char` production allows:
/// `#x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
pub(crate) fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
pub(crate) fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 [4a].
pub(crate) fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

// -------------------------------------------------------------------------
// ParserInput
// -------------------------------------------------------------------------

/// Cursor over a decoded UTF-8 document.
pub(crate) struct ParserInput<'a> {
    /// The full input text.
    text: &'a str,

    /// Byte offset of the cursor.
    pos: usize,

    /// Whether the scanner tolerates and repairs malformed input.
    permissive: bool,

    /// Diagnostics describing permissive-mode repairs.
    pub(crate) diagnostics: Vec<ParseDiagnostic>,

    /// Caller-supplied entity replacement values, consulted after the
    /// predefined XML entities.
    pub(crate) entity_map: HashMap<String, String>,
}

impl<'a> ParserInput<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            permissive: false,
            diagnostics: Vec::new(),
            entity_map: HashMap::new(),
        }
    }

    /// Enables or disables permissive mode.
    pub fn set_permissive(&mut self, yes: bool) {
        self.permissive = yes;
    }

    /// Returns whether permissive mode is enabled.
    pub fn permissive(&self) -> bool {
        self.permissive
    }

    // -- Cursor --

    /// Returns `true` once the whole input has been consumed.
    pub fn done(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Returns the byte under the cursor without moving it.
    pub fn cur(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    /// Returns `true` if the unread input begins with `prefix`.
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.text.as_bytes()[self.pos..].starts_with(prefix)
    }

    /// Moves the cursor forward by `n` bytes, saturating at the end.
    pub fn bump(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.text.len());
    }

    /// Consumes `expected` or fails without moving the cursor.
    pub fn consume(&mut self, expected: &[u8]) -> Result<(), ParseError> {
        if self.starts_with(expected) {
            self.bump(expected.len());
            return Ok(());
        }
        let want = String::from_utf8_lossy(expected);
        Err(self.error_here(format!("expected `{want}`")))
    }

    /// Skips over a run of whitespace bytes. Returns `true` if the
    /// cursor moved.
    pub fn skip_whitespace(&mut self) -> bool {
        let run = self.text.as_bytes()[self.pos..]
            .iter()
            .take_while(|&&b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
            .count();
        self.bump(run);
        run > 0
    }

    /// Reads one character, folding `\r` and `\r\n` into `\n` (XML 1.0
    /// §2.11) and checking it against the `Char` production.
    pub fn read_char(&mut self) -> Result<char, ParseError> {
        let Some(ch) = self.text[self.pos..].chars().next() else {
            return Err(self.error_here("input ended unexpectedly"));
        };
        self.bump(ch.len_utf8());
        if ch == '\r' {
            if self.cur() == Some(b'\n') {
                self.bump(1);
            }
            return Ok('\n');
        }
        if !is_xml_char(ch) {
            let msg = format!("character U+{:04X} is not allowed in XML", ch as u32);
            if !self.permissive {
                return Err(self.error_here(msg));
            }
            self.record(ErrorSeverity::Error, msg);
        }
        Ok(ch)
    }

    // -- Names (XML 1.0 §2.3) --

    /// Scans a `Name`: one `NameStartChar` followed by any number of
    /// `NameChar`s. Fails without moving the cursor.
    pub fn parse_name(&mut self) -> Result<String, ParseError> {
        let rest = &self.text[self.pos..];
        match rest.chars().next() {
            None => return Err(self.error_here("name expected before end of input")),
            Some(c) if !is_name_start_char(c) => {
                return Err(self.error_here(format!("'{c}' cannot start a name")));
            }
            Some(_) => {}
        }
        let len = rest
            .char_indices()
            .find(|&(offset, c)| offset > 0 && !is_name_char(c))
            .map_or(rest.len(), |(offset, _)| offset);
        let name = rest[..len].to_string();
        self.bump(len);
        Ok(name)
    }

    // -- References (XML 1.0 §4.1) --

    /// Resolves an `&...;` reference to its replacement text.
    ///
    /// Character references (`&#NNN;`, `&#xHHH;`) always resolve. Entity
    /// names resolve through the predefined XML entities and then the
    /// caller's entity map. Anything else is fatal, unless permissive
    /// mode keeps the reference as literal text.
    pub fn parse_reference(&mut self) -> Result<String, ParseError> {
        self.consume(b"&")?;
        if self.cur() == Some(b'#') {
            self.bump(1);
            return self.parse_char_ref().map(|c| c.to_string());
        }

        let name = match self.parse_name() {
            Ok(name) => name,
            // A name scan fails without consuming anything, so the bare
            // ampersand can pass through as text.
            Err(e) => {
                if self.permissive {
                    return Ok("&".to_string());
                }
                return Err(e);
            }
        };
        if self.cur() != Some(b';') {
            let msg = format!("reference &{name} is not closed with ';'");
            if !self.permissive {
                return Err(self.error_here(msg));
            }
            self.record(ErrorSeverity::Warning, msg);
            return Ok(format!("&{name}"));
        }
        self.bump(1);

        if let Some(&(_, replacement)) = XML_ENTITIES.iter().find(|&&(n, _)| n == name) {
            return Ok(replacement.to_string());
        }
        if let Some(replacement) = self.entity_map.get(&name) {
            return Ok(replacement.clone());
        }
        let msg = format!("entity &{name}; is not declared");
        if !self.permissive {
            return Err(self.error_here(msg));
        }
        self.record(ErrorSeverity::Warning, msg);
        Ok(format!("&{name};"))
    }

    /// Decodes the digits of a character reference; the cursor sits just
    /// past `&#`.
    fn parse_char_ref(&mut self) -> Result<char, ParseError> {
        let radix = if self.cur() == Some(b'x') {
            self.bump(1);
            16
        } else {
            10
        };

        let rest = &self.text[self.pos..];
        let Some(end) = rest.find(';') else {
            return Err(self.error_here("character reference is not closed with ';'"));
        };
        let digits = &rest[..end];
        let code = u32::from_str_radix(digits, radix)
            .map_err(|_| self.error_here("malformed digits in character reference"))?;
        self.bump(end + 1);

        match char::from_u32(code).filter(|&c| is_xml_char(c)) {
            Some(c) => Ok(c),
            None => Err(self.error_here(format!(
                "character reference resolves to U+{code:04X}, which XML forbids"
            ))),
        }
    }

    // -- Attribute values (XML 1.0 §3.3.3) --

    /// Scans a quoted attribute value, resolving references and folding
    /// tab, LF, and CR to spaces.
    pub fn parse_attribute_value(&mut self) -> Result<String, ParseError> {
        let quote = match self.cur() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error_here("attribute value is missing its opening quote")),
        };
        self.bump(1);

        let mut value = String::new();
        loop {
            match self.cur() {
                None => {
                    return Err(
                        self.error_here("attribute value not closed before end of input")
                    );
                }
                Some(q) if q == quote => {
                    self.bump(1);
                    return Ok(value);
                }
                Some(b'&') => value.push_str(&self.parse_reference()?),
                Some(b'<') => {
                    return Err(self.error_here("raw '<' inside an attribute value"));
                }
                // read_char folds CR into LF, so matching tab and LF
                // covers all three whitespace characters.
                Some(_) => match self.read_char()? {
                    '\t' | '\n' => value.push(' '),
                    c => value.push(c),
                },
            }
        }
    }

    // -- Errors and diagnostics --

    /// Computes the line and column of the cursor. Errors are rare, so
    /// this walks the consumed prefix instead of keeping counters
    /// up to date on every advance.
    pub fn location(&self) -> SourceLocation {
        let consumed = &self.text[..self.pos];
        let line = consumed.bytes().filter(|&b| b == b'\n').count() + 1;
        let line_start = consumed.rfind('\n').map_or(0, |i| i + 1);
        let column = consumed[line_start..].chars().count() + 1;
        SourceLocation {
            line: u32::try_from(line).unwrap_or(u32::MAX),
            column: u32::try_from(column).unwrap_or(u32::MAX),
            byte_offset: self.pos,
        }
    }

    /// Builds a `ParseError` pointing at the cursor.
    pub fn error_here(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            location: self.location(),
        }
    }

    /// Records a repair made under permissive mode.
    pub fn record(&mut self, severity: ErrorSeverity, message: String) {
        let location = self.location();
        self.diagnostics.push(ParseDiagnostic {
            severity,
            message,
            location,
        });
    }
}
