//! Encoding detection and transcoding.
//!
//! Implements BOM sniffing and XML declaration encoding detection per
//! XML 1.0 Section 4.3.3 and Appendix F, bridging to `encoding_rs` for
//! character encoding conversion. Declared encodings `encoding_rs` does
//! not recognize fall through to the caller's
//! [`CharsetDecoder`](crate::parser::CharsetDecoder) hook.
//!
//! # Encoding Detection Strategy
//!
//! 1. Check for a Byte Order Mark (BOM) at the start of the input.
//! 2. A UTF-16 BOM selects the indicated byte order; a UTF-8 BOM is kept
//!    in the decoded text (it round-trips as document character data).
//! 3. With no BOM, default to UTF-8 (per the XML specification).
//! 4. Inspect the XML declaration's `encoding=` attribute; when it names
//!    a different encoding, re-decode the raw bytes with it.

use std::fmt;

use crate::parser::CharsetDecoder;

/// An error that occurs during encoding detection or transcoding.
#[derive(Debug, Clone)]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    /// Creates a new `EncodingError` with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error: {}", self.message)
    }
}

impl std::error::Error for EncodingError {}

/// Detects the encoding of an XML byte stream by inspecting the Byte Order Mark.
///
/// Returns a tuple of (encoding name, number of BOM bytes). The encoding
/// name is an IANA charset name suitable for passing to `encoding_rs`.
///
/// Per XML 1.0 Appendix F, the BOM detection order is:
/// - `EF BB BF` -> UTF-8
/// - `FE FF`    -> UTF-16 BE
/// - `FF FE`    -> UTF-16 LE
/// - No BOM     -> UTF-8 (default per XML spec)
#[must_use]
pub fn detect_encoding(bytes: &[u8]) -> (&'static str, usize) {
    if bytes.len() >= 3 && bytes[0] == 0xEF && bytes[1] == 0xBB && bytes[2] == 0xBF {
        ("UTF-8", 3)
    } else if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        ("UTF-16BE", 2)
    } else if bytes.len() >= 2 && bytes[0] == 0xFF && bytes[1] == 0xFE {
        ("UTF-16LE", 2)
    } else {
        ("UTF-8", 0)
    }
}

/// Transcodes a byte slice from the named encoding into a UTF-8 `String`.
///
/// Uses `encoding_rs::Encoding::for_label` to look up the encoding by its
/// IANA name (case-insensitive).
///
/// # Errors
///
/// Returns `EncodingError` if the encoding name is not recognized or if
/// transcoding fails due to malformed input bytes.
pub fn transcode(bytes: &[u8], encoding_name: &str) -> Result<String, EncodingError> {
    let encoding = encoding_rs::Encoding::for_label(encoding_name.as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {encoding_name}")))?;

    let (result, _used_encoding, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(EncodingError::new(format!(
            "malformed byte sequence for encoding {encoding_name}"
        )));
    }
    Ok(result.into_owned())
}

/// Extracts the `encoding` attribute value from an XML declaration.
///
/// This performs a lightweight scan to find a pattern like
/// `encoding="..."` or `encoding='...'` without running the full parser.
/// Returns `None` if no XML declaration or no encoding attribute is found.
fn extract_decl_encoding(text: &str) -> Option<String> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let decl_end = text.find("?>")?;
    let decl = &text[..decl_end];

    if !decl.starts_with("<?xml") {
        return None;
    }

    let enc_pos = decl.find("encoding")?;
    let after_enc = decl[enc_pos + "encoding".len()..].trim_start();
    let after_eq = after_enc.strip_prefix('=')?.trim_start();

    let quote = after_eq.as_bytes().first().copied()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &after_eq[1..];
    let end = value.find(quote as char)?;
    Some(value[..end].to_string())
}

/// Returns `true` if the label is a recognized alias for UTF-8.
fn is_utf8_label(label: &str) -> bool {
    label.eq_ignore_ascii_case("UTF-8") || label.eq_ignore_ascii_case("UTF8")
}

/// Handles the declared encoding for string input.
///
/// The input is already decoded text, so recognized labels pass through
/// unchanged; only labels unknown to the built-in transcoder are handed
/// to the caller's decoder hook, which may rewrite the whole token
/// stream.
///
/// # Errors
///
/// Returns `EncodingError` when the declared label is unknown to both
/// the built-in transcoder and the hook, or when the hook fails.
pub(crate) fn decode_declared(
    text: &str,
    decoder: Option<&CharsetDecoder>,
) -> Result<String, EncodingError> {
    let Some(label) = extract_decl_encoding(text) else {
        return Ok(text.to_string());
    };
    if is_utf8_label(&label) || encoding_rs::Encoding::for_label(label.as_bytes()).is_some() {
        return Ok(text.to_string());
    }
    let Some(decoder) = decoder else {
        return Err(EncodingError::new(format!(
            "unsupported encoding '{label}' and no charset decoder supplied"
        )));
    };
    let decoded = decoder(&label, text.as_bytes())?;
    String::from_utf8(decoded).map_err(|_| {
        EncodingError::new(format!(
            "charset decoder for '{label}' produced invalid UTF-8"
        ))
    })
}

/// Decodes raw XML bytes into a UTF-8 string, automatically detecting the
/// encoding.
///
/// A UTF-8 BOM is preserved in the returned text (the parser keeps it as
/// document character data); UTF-16 BOMs are consumed by transcoding.
///
/// # Errors
///
/// Returns `EncodingError` if the bytes contain invalid sequences for the
/// detected encoding, or the declared encoding is unknown to both the
/// built-in transcoder and the caller's decoder hook.
pub(crate) fn decode_input(
    bytes: &[u8],
    decoder: Option<&CharsetDecoder>,
) -> Result<String, EncodingError> {
    let (bom_encoding, bom_skip) = detect_encoding(bytes);

    if bom_encoding != "UTF-8" {
        // UTF-16: encoding_rs consumes the BOM during transcoding.
        return transcode(bytes, bom_encoding);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => {
            if bom_skip > 0 {
                // A UTF-8 BOM wins over any declaration.
                return Ok(text.to_string());
            }
            match extract_decl_encoding(text) {
                Some(label) if !is_utf8_label(&label) => {
                    decode_with_label(bytes, &label, decoder)
                }
                _ => Ok(text.to_string()),
            }
        }
        Err(_) => {
            // Not valid UTF-8. The XML declaration is required to be in
            // ASCII-compatible bytes, so scan for the declared label in
            // the raw bytes.
            let Some(label) = extract_encoding_from_ascii_bytes(bytes) else {
                return Err(EncodingError::new("input is not valid UTF-8"));
            };
            decode_with_label(bytes, &label, decoder)
        }
    }
}

fn decode_with_label(
    bytes: &[u8],
    label: &str,
    decoder: Option<&CharsetDecoder>,
) -> Result<String, EncodingError> {
    if encoding_rs::Encoding::for_label(label.as_bytes()).is_some() {
        return transcode(bytes, label);
    }
    let Some(decoder) = decoder else {
        return Err(EncodingError::new(format!(
            "unsupported encoding '{label}' and no charset decoder supplied"
        )));
    };
    let decoded = decoder(label, bytes)?;
    String::from_utf8(decoded).map_err(|_| {
        EncodingError::new(format!(
            "charset decoder for '{label}' produced invalid UTF-8"
        ))
    })
}

/// Extracts the `encoding` attribute from raw bytes by treating them as
/// ASCII.
///
/// This is the fallback when the input is not valid UTF-8 and has no BOM.
/// Returns `None` if no encoding declaration is found.
fn extract_encoding_from_ascii_bytes(bytes: &[u8]) -> Option<String> {
    // Only scan a reasonable prefix for the XML declaration.
    let limit = bytes.len().min(200);
    let scan = &bytes[..limit];

    if !scan.starts_with(b"<?xml") {
        return None;
    }

    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];

    let enc_needle = b"encoding";
    let enc_pos = decl
        .windows(enc_needle.len())
        .position(|w| w == enc_needle)?;
    let after_enc = skip_ascii_whitespace(&decl[enc_pos + enc_needle.len()..]);
    if after_enc.first() != Some(&b'=') {
        return None;
    }
    let after_eq = skip_ascii_whitespace(&after_enc[1..]);

    let quote = *after_eq.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &after_eq[1..];
    let end = value.iter().position(|&b| b == quote)?;
    let encoding_bytes = &value[..end];

    if encoding_bytes.iter().all(u8::is_ascii) {
        Some(String::from_utf8_lossy(encoding_bytes).into_owned())
    } else {
        None
    }
}

/// Skips leading ASCII whitespace bytes (space, tab, CR, LF).
fn skip_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t' || b == b'\r' || b == b'\n')
        .count();
    &bytes[skip..]
}
