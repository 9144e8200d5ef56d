//! # xylem
//!
//! An editable in-memory XML document tree with path queries, permissive
//! HTML-style parsing, and fine control over serialization: indentation,
//! canonical escaping, CDATA preservation, and stable attribute sorting.
//!
//! ## Quick Start
//!
//! ```
//! use xylem::Document;
//!
//! let mut doc = Document::new();
//! doc.read_from_str("<store><book lang=\"en\"><title>Great Expectations</title></book></store>").unwrap();
//!
//! let title = doc.find_element("//book/title").unwrap();
//! assert_eq!(doc.text(title), "Great Expectations");
//!
//! doc.set_text(title, "Bleak House");
//! doc.indent(2);
//! assert_eq!(
//!     doc.write_to_string().unwrap(),
//!     "<store>\n  <book lang=\"en\">\n    <title>Bleak House</title>\n  </book>\n</store>\n"
//! );
//! ```

pub mod encoding;
pub mod entities;
pub mod error;
pub mod parser;
pub mod path;
pub mod serial;
pub mod tree;

// Re-export primary types at the crate root for convenience.
pub use error::Error;
pub use parser::{CharsetDecoder, ReadSettings, HTML_AUTO_CLOSE};
pub use path::{Path, PathError};
pub use serial::{IndentSettings, WriteSettings, NO_INDENT};
pub use tree::{Attribute, Document, NodeId, NodeKind};
