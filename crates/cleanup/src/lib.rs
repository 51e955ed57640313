//! Outer tool around the `xml` core: CLI parsing, bulk file discovery, and
//! the cosmetic pre/post passes that make formatter output byte-stable across
//! platforms. The core stays I/O free; everything that touches files lives
//! here.

pub mod cli;
mod discover;
mod indenter;
mod passes;

pub use crate::discover::find_xml_files;
pub use crate::indenter::{indent_xml, IndentOptions};
pub use crate::passes::{
    normalize_line_endings, normalize_single_line_comments, space_before_self_close,
    space_comment_after_tag, trim_to_first_element,
};
