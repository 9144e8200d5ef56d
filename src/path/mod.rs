//! Path expression compilation and evaluation.
//!
//! Implements a pragmatic subset of XPath-like path expressions over the
//! document tree: relative and absolute navigation, descendant search
//! (`//`), attribute predicates, positional predicates, child-element
//! predicates, and function predicates (`text()`, `namespace-uri()`,
//! `namespace-prefix()`, `local-name()`, `name()`).
//!
//! A path compiles into an immutable sequence of segments, each holding a
//! selector and zero or more filters. Compile once with
//! [`Path::compile`] to amortize parsing over repeated queries; the
//! string-based `find_element`/`find_elements` entry points compile per
//! call and silently return empty results on compile failure.
//!
//! # Grammar
//!
//! ```text
//! Path      := ('/' | './' | '../' | '//')? Step ('/' Step)*
//! Step      := Name Predicate*
//! Name      := '.' | '..' | '*' | (Prefix ':')? LocalName
//! Predicate := '[' Expr ']'
//! Expr      := Integer                      positional, 1-based
//!            | '-' Integer                  positional, from the end
//!            | '@' Name                     has attribute
//!            | '@' Name '=' 'literal'       attribute equals
//!            | Name                         has child element
//!            | Name '=' 'literal'           child element with text
//!            | Function '(' ')'             e.g. text()
//!            | Function '(' ')' '=' 'literal'
//! ```

use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::tree::{split_name, Document, NodeId, NodeKind};

/// The error produced when a path expression fails to compile.
#[derive(Debug, Clone)]
pub struct PathError {
    /// A human-readable description of the syntax problem.
    pub message: String,
}

impl PathError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid path: {}", self.message)
    }
}

impl std::error::Error for PathError {}

/// A compiled path expression, reusable across queries and documents.
///
/// # Examples
///
/// ```
/// use xylem::{Document, Path};
///
/// let mut doc = Document::new();
/// doc.read_from_str("<a><b1><c/></b1><b2><c/></b2></a>").unwrap();
/// let path = Path::compile("//c").unwrap();
/// assert_eq!(doc.find_elements_path(&path).len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Path {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
struct Segment {
    selector: Selector,
    filters: Vec<Filter>,
}

#[derive(Debug, Clone)]
enum Selector {
    /// The root of the tree containing the context element (leading `/`).
    Root,
    /// The context element itself (`.`).
    Current,
    /// The context element's parent (`..`).
    Parent,
    /// Child elements matching a name (`tag`, `p:tag`, or `*`).
    Children { prefix: Option<String>, tag: String },
    /// The context element and all its descendants (the empty step
    /// produced by `//`).
    Descendants,
}

#[derive(Debug, Clone)]
enum Filter {
    /// `[n]` — 1-based position in the candidate list; negative counts
    /// from the end.
    Pos(i64),
    /// `[@key]`
    Attr { prefix: Option<String>, key: String },
    /// `[@key='value']`
    AttrVal {
        prefix: Option<String>,
        key: String,
        value: String,
    },
    /// `[tag]`
    Child { prefix: Option<String>, tag: String },
    /// `[tag='value']`
    ChildVal {
        prefix: Option<String>,
        tag: String,
        value: String,
    },
    /// `[fn()]` or `[fn()='value']`
    Func {
        func: PathFunc,
        value: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathFunc {
    Text,
    NamespaceUri,
    NamespacePrefix,
    LocalName,
    Name,
}

impl Path {
    /// Compiles a path expression.
    ///
    /// # Errors
    ///
    /// Returns [`PathError`] for malformed expressions: empty or
    /// unterminated filters, mismatched quotes, or unknown functions.
    pub fn compile(path: &str) -> Result<Self, PathError> {
        // A trailing "//" selects every descendant.
        let normalized;
        let mut path = path;
        if path.ends_with("//") {
            normalized = format!("{path}*");
            path = &normalized;
        }

        let mut segments = Vec::new();
        if let Some(rest) = path.strip_prefix('/') {
            segments.push(Segment {
                selector: Selector::Root,
                filters: Vec::new(),
            });
            path = rest;
        }

        for piece in split_steps(path) {
            segments.push(parse_segment(piece)?);
        }

        Ok(Self { segments })
    }
}

/// Splits a path on `/` separators, ignoring separators inside quoted
/// filter literals.
fn split_steps(path: &str) -> Vec<&str> {
    let bytes = path.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quote = false;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\'' {
            in_quote = !in_quote;
        } else if b == b'/' && !in_quote {
            pieces.push(&path[start..i]);
            start = i + 1;
        }
    }
    pieces.push(&path[start..]);
    pieces
}

fn parse_segment(piece: &str) -> Result<Segment, PathError> {
    let mut parts = piece.split('[');
    let selector = parse_selector(parts.next().unwrap_or_default());
    let mut filters = Vec::new();
    for part in parts {
        let Some(expr) = part.strip_suffix(']') else {
            return Err(PathError::new("filter is missing its closing bracket"));
        };
        filters.push(parse_filter(expr)?);
    }
    Ok(Segment { selector, filters })
}

fn parse_selector(name: &str) -> Selector {
    match name {
        "." => Selector::Current,
        ".." => Selector::Parent,
        "" => Selector::Descendants,
        _ => {
            let (prefix, tag) = split_name(name);
            Selector::Children {
                prefix: prefix.map(str::to_string),
                tag: tag.to_string(),
            }
        }
    }
}

fn parse_filter(expr: &str) -> Result<Filter, PathError> {
    if expr.is_empty() {
        return Err(PathError::new("filter expression is empty"));
    }

    // Comparison forms: [@key='v'], [fn()='v'], [tag='v']
    if let Some(eq) = expr.find("='") {
        let key = &expr[..eq];
        let rest = &expr[eq + 2..];
        let Some(close) = rest.find('\'') else {
            return Err(PathError::new("filter has mismatched quotes"));
        };
        if close != rest.len() - 1 {
            return Err(PathError::new("filter has mismatched quotes"));
        }
        let value = rest[..close].to_string();

        if let Some(attr) = key.strip_prefix('@') {
            let (prefix, key) = split_name(attr);
            return Ok(Filter::AttrVal {
                prefix: prefix.map(str::to_string),
                key: key.to_string(),
                value,
            });
        }
        if let Some(name) = key.strip_suffix("()") {
            return Ok(Filter::Func {
                func: parse_func(name)?,
                value: Some(value),
            });
        }
        let (prefix, tag) = split_name(key);
        return Ok(Filter::ChildVal {
            prefix: prefix.map(str::to_string),
            tag: tag.to_string(),
            value,
        });
    }

    // Existence forms: [@key], [fn()], [n], [tag]
    if let Some(attr) = expr.strip_prefix('@') {
        let (prefix, key) = split_name(attr);
        return Ok(Filter::Attr {
            prefix: prefix.map(str::to_string),
            key: key.to_string(),
        });
    }
    if let Some(name) = expr.strip_suffix("()") {
        let func = parse_func(name)?;
        if matches!(func, PathFunc::LocalName | PathFunc::Name) {
            return Err(PathError::new(format!(
                "function {name}() requires a comparison value"
            )));
        }
        return Ok(Filter::Func { func, value: None });
    }
    if is_integer(expr) {
        let pos: i64 = expr
            .parse()
            .map_err(|_| PathError::new("positional filter out of range"))?;
        // 1-based from the start; negative positions count from the end.
        let index = if pos > 0 { pos - 1 } else { pos };
        return Ok(Filter::Pos(index));
    }

    let (prefix, tag) = split_name(expr);
    Ok(Filter::Child {
        prefix: prefix.map(str::to_string),
        tag: tag.to_string(),
    })
}

fn parse_func(name: &str) -> Result<PathFunc, PathError> {
    match name {
        "text" => Ok(PathFunc::Text),
        "namespace-uri" => Ok(PathFunc::NamespaceUri),
        "namespace-prefix" => Ok(PathFunc::NamespacePrefix),
        "local-name" => Ok(PathFunc::LocalName),
        "name" => Ok(PathFunc::Name),
        _ => Err(PathError::new(format!("unknown function {name}()"))),
    }
}

fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Evaluates a compiled path against a context element, returning all
/// matches in document order with duplicates suppressed.
pub(crate) fn find_all(doc: &Document, context: NodeId, path: &Path) -> Vec<NodeId> {
    let mut results = Vec::new();
    if path.segments.is_empty() {
        return results;
    }

    let mut in_results = HashSet::new();
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
    queue.push_back((context, 0));

    while let Some((e, seg_index)) = queue.pop_front() {
        let segment = &path.segments[seg_index];
        let mut candidates = apply_selector(doc, e, &segment.selector);
        for filter in &segment.filters {
            apply_filter(doc, filter, &mut candidates);
        }

        if seg_index + 1 == path.segments.len() {
            for c in candidates {
                if in_results.insert(c) {
                    results.push(c);
                }
            }
        } else {
            for c in candidates {
                queue.push_back((c, seg_index + 1));
            }
        }
    }
    results
}

fn apply_selector(doc: &Document, e: NodeId, selector: &Selector) -> Vec<NodeId> {
    match selector {
        Selector::Root => {
            let mut root = e;
            while let Some(parent) = doc.parent(root) {
                root = parent;
            }
            vec![root]
        }
        Selector::Current => vec![e],
        Selector::Parent => doc.parent(e).map(|p| vec![p]).unwrap_or_default(),
        Selector::Children { prefix, tag } => doc
            .child_elements(e)
            .filter(|&c| element_matches(doc, c, prefix.as_deref(), tag))
            .collect(),
        Selector::Descendants => {
            let mut found = Vec::new();
            let mut queue = VecDeque::new();
            queue.push_back(e);
            while let Some(cur) = queue.pop_front() {
                found.push(cur);
                queue.extend(doc.child_elements(cur));
            }
            found
        }
    }
}

fn element_matches(doc: &Document, e: NodeId, prefix: Option<&str>, tag: &str) -> bool {
    let NodeKind::Element {
        prefix: ep,
        tag: et,
        ..
    } = &doc.node(e).kind
    else {
        return false;
    };
    let prefix_ok = match prefix {
        None => true,
        Some(p) => ep.as_deref() == Some(p),
    };
    prefix_ok && (tag == "*" || et == tag)
}

fn has_matching_attr(
    doc: &Document,
    e: NodeId,
    prefix: Option<&str>,
    key: &str,
    value: Option<&str>,
) -> bool {
    doc.attributes(e).iter().any(|a| {
        let prefix_ok = match prefix {
            None => true,
            Some(p) => a.prefix.as_deref() == Some(p),
        };
        prefix_ok && a.key == key && value.map_or(true, |v| a.value == v)
    })
}

fn apply_filter(doc: &Document, filter: &Filter, candidates: &mut Vec<NodeId>) {
    match filter {
        Filter::Pos(index) => {
            let len = candidates.len() as i64;
            let keep = if *index >= 0 { *index } else { len + *index };
            if keep >= 0 && keep < len {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let kept = candidates[keep as usize];
                candidates.clear();
                candidates.push(kept);
            } else {
                candidates.clear();
            }
        }
        Filter::Attr { prefix, key } => {
            candidates.retain(|&e| has_matching_attr(doc, e, prefix.as_deref(), key, None));
        }
        Filter::AttrVal { prefix, key, value } => {
            candidates
                .retain(|&e| has_matching_attr(doc, e, prefix.as_deref(), key, Some(value)));
        }
        Filter::Child { prefix, tag } => {
            candidates.retain(|&e| {
                doc.child_elements(e)
                    .any(|c| element_matches(doc, c, prefix.as_deref(), tag))
            });
        }
        Filter::ChildVal { prefix, tag, value } => {
            candidates.retain(|&e| {
                doc.child_elements(e)
                    .any(|c| element_matches(doc, c, prefix.as_deref(), tag) && doc.text(c) == *value)
            });
        }
        Filter::Func { func, value } => {
            candidates.retain(|&e| func_matches(doc, e, *func, value.as_deref()));
        }
    }
}

fn func_matches(doc: &Document, e: NodeId, func: PathFunc, value: Option<&str>) -> bool {
    match func {
        PathFunc::Text => match value {
            Some(v) => doc.text(e) == v,
            None => !doc.text(e).is_empty(),
        },
        PathFunc::NamespaceUri => match value {
            Some(v) => doc.namespace_uri(e) == v,
            None => !doc.namespace_uri(e).is_empty(),
        },
        PathFunc::NamespacePrefix => match value {
            Some(v) => doc.prefix(e) == Some(v),
            None => doc.prefix(e).is_some(),
        },
        PathFunc::LocalName => value.is_some_and(|v| doc.tag(e) == Some(v)),
        PathFunc::Name => value.is_some_and(|v| doc.full_tag(e).as_deref() == Some(v)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc_from(s: &str) -> Document {
        let mut doc = Document::new();
        doc.read_from_str(s).unwrap();
        doc
    }

    #[test]
    fn test_compile_rejects_malformed_filters() {
        for bad in [
            "//a[",
            "//a[]",
            "//a[@b='1]",
            "//a[@b='1'x]",
            "//a[unknown-fn()]",
            "//a[local-name()]",
        ] {
            assert!(Path::compile(bad).is_err(), "should not compile: {bad}");
        }
    }

    #[test]
    fn test_compile_accepts_supported_forms() {
        for good in [
            "/a/b/c",
            "./a",
            "../b",
            "//*",
            "//a//b",
            "a[2]",
            "a[-1]",
            "a[@id]",
            "a[@id='x']",
            "a[b]",
            "a[b='text']",
            "a[text()]",
            "a[text()='x']",
            "//*[namespace-uri()='u']",
            "//*[namespace-prefix()='p']",
            "//*[local-name()='a']",
            "//*[name()='p:a']",
        ] {
            assert!(Path::compile(good).is_ok(), "should compile: {good}");
        }
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let doc = doc_from("<a><b><c/></b></a>");
        let c = doc.find_element("/a/b/c").unwrap();
        assert_eq!(doc.tag(c), Some("c"));

        let b = doc.find_element("./a/b").unwrap();
        assert_eq!(doc.find_element_from(b, "./c"), Some(c));
        assert_eq!(doc.find_element_from(b, ".."), doc.find_element("/a"));
        // An absolute path from a nested context jumps to the tree root.
        assert_eq!(doc.find_element_from(c, "/a/b"), Some(b));
    }

    #[test]
    fn test_descendant_search_in_document_order() {
        let doc = doc_from("<a><b1><c x=\"1\"/></b1><b2><c x=\"2\"/></b2></a>");
        let found = doc.find_elements("//c");
        assert_eq!(found.len(), 2);
        assert_eq!(doc.select_attr_value(found[0], "x", ""), "1");
        assert_eq!(doc.select_attr_value(found[1], "x", ""), "2");
    }

    #[test]
    fn test_wildcard_step() {
        let doc = doc_from("<a><b/>text<c/><!--x--><d/></a>");
        assert_eq!(doc.find_elements("/a/*").len(), 3);
    }

    #[test]
    fn test_positional_filters() {
        let doc = doc_from("<a><b i=\"1\"/><b i=\"2\"/><b i=\"3\"/></a>");
        let second = doc.find_element("/a/b[2]").unwrap();
        assert_eq!(doc.select_attr_value(second, "i", ""), "2");
        let last = doc.find_element("/a/b[-1]").unwrap();
        assert_eq!(doc.select_attr_value(last, "i", ""), "3");
        assert!(doc.find_element("/a/b[7]").is_none());
    }

    #[test]
    fn test_attribute_filters() {
        let doc = doc_from(r#"<a><b id="x"/><b id="y"/><b/></a>"#);
        assert_eq!(doc.find_elements("/a/b[@id]").len(), 2);
        let y = doc.find_element("/a/b[@id='y']").unwrap();
        assert_eq!(doc.select_attr_value(y, "id", ""), "y");
        assert!(doc.find_element("/a/b[@id='z']").is_none());
    }

    #[test]
    fn test_child_and_text_filters() {
        let doc = doc_from(
            "<library><book><title>Alpha</title></book>\
             <book><title>Beta</title></book><shelf/></library>",
        );
        assert_eq!(doc.find_elements("/library/book[title]").len(), 2);
        let beta = doc.find_element("/library/book[title='Beta']").unwrap();
        assert_eq!(doc.text(doc.select_element(beta, "title").unwrap()), "Beta");
        assert_eq!(doc.find_elements("//title[text()]").len(), 2);
        assert_eq!(doc.find_elements("//title[text()='Alpha']").len(), 1);
    }

    #[test]
    fn test_bad_path_yields_empty_via_string_api() {
        let doc = doc_from("<a><b/></a>");
        assert!(doc.find_element("//a[").is_none());
        assert!(doc.find_elements("//a[").is_empty());
    }

    #[test]
    fn test_trailing_descendant_selects_everything_below() {
        let doc = doc_from("<a><b><c/></b></a>");
        // "//" at the end expands to every descendant-or-self element.
        let all = doc.find_elements("//");
        assert_eq!(all.len(), 4); // synthetic root + a + b + c
    }

    #[test]
    fn test_quoted_slash_does_not_split_steps() {
        let doc = doc_from(r#"<a><b href="x/y"/></a>"#);
        assert!(doc.find_element("/a/b[@href='x/y']").is_some());
    }

    #[test]
    fn test_name_functions() {
        let doc = doc_from(r#"<root xmlns:v="u"><v:a/><a/></root>"#);
        assert_eq!(doc.find_elements("//*[namespace-prefix()='v']").len(), 1);
        assert_eq!(doc.find_elements("//*[local-name()='a']").len(), 2);
        assert_eq!(doc.find_elements("//*[name()='v:a']").len(), 1);
    }

    #[test]
    fn test_duplicate_suppression() {
        let doc = doc_from("<a><b/><c/></a>");
        // Every child's parent is the same <a>; the result holds it once.
        let found = doc.find_elements("/a/*/..");
        assert_eq!(found.len(), 1);
        assert_eq!(doc.tag(found[0]), Some("a"));
    }
}
