//! Serialization and indentation.
//!
//! This module serializes a `Document` tree back to XML text, with
//! configurable escaping profiles ([`WriteSettings`]) and tree-mutating
//! pretty-printing ([`IndentSettings`]). The canonical escaping modes
//! produce output closer to XML-C14N conventions for attribute values
//! and element text.

mod indent;
mod xml;

pub use indent::{IndentSettings, NO_INDENT};
pub use xml::WriteSettings;

pub(crate) use indent::{indent_document, indent_element};
pub(crate) use xml::write_node;
