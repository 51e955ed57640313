//! Streaming XML tokenizer and indentation formatter.
//!
//! Two-stage pipeline with no intermediate tree: a [`Tokenizer`] walks an
//! immutable byte buffer and hands out span tokens; a [`Formatter`] consumes
//! them and writes indented bytes into an owned sink. The formatter supports
//! full pretty printing and an indent-only discipline that keeps the author's
//! line breaks and rewrites nothing but each line's leading whitespace.
//!
//! The core does no I/O and never fails on malformed input; unterminated
//! constructs span to end of buffer and formatting proceeds. Cosmetic
//! post-processing (comment spacing, `/>` spacing, CRLF normalization) is the
//! caller's concern.

mod formatter;
mod options;
mod path;
mod token;
mod tokenizer;

pub use crate::formatter::Formatter;
pub use crate::options::FormatOptions;
pub use crate::path::PathMode;
pub use crate::token::{ParseContext, Token, TokenKind, TokenKindSet};
pub use crate::tokenizer::Tokenizer;
