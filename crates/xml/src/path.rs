//! Positional path builder.
//!
//! A scan-only walk over the token stream that answers "which element contains
//! this byte position". It keeps its own stack and sibling counts and never
//! touches the formatter's output state, so it can be called at any point.

use core::fmt::Write as _;
use core::ops::BitOr;
use std::collections::HashMap;

use crate::formatter::Formatter;
use crate::token::TokenKind;
use crate::tokenizer::Tokenizer;

/// Path rendering flags, composed with `|`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathMode(u32);

impl PathMode {
    /// Local names only; namespace prefixes are stripped.
    pub const BASIC: PathMode = PathMode(1 << 0);
    /// Keep `ns:` prefixes on step names.
    pub const WITH_NAMESPACE: PathMode = PathMode(1 << 1);
    /// Append `[@key='val']` predicates for configured identity attributes.
    pub const KEEP_ID_ATTRIBUTE: PathMode = PathMode(1 << 2);
    /// Append the 1-based `[n]` position among same-name siblings.
    pub const WITH_NODE_INDEX: PathMode = PathMode(1 << 3);

    pub const fn contains(self, other: PathMode) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for PathMode {
    type Output = PathMode;

    fn bitor(self, rhs: PathMode) -> PathMode {
        PathMode(self.0 | rhs.0)
    }
}

impl Default for PathMode {
    fn default() -> Self {
        PathMode::WITH_NAMESPACE
    }
}

struct PathStep {
    name: String,
    /// 1-based position among siblings of the same name under one parent.
    index: usize,
    last_attr: Option<String>,
    id_attrs: Vec<(String, String)>,
    child_counts: HashMap<String, usize>,
}

impl<'src> Formatter<'src> {
    /// Path expression for the element containing `position`.
    ///
    /// Returns an empty string when the position precedes any element.
    pub fn current_path(&self, position: usize, mode: PathMode) -> String {
        let src = self.source_bytes();
        let mut tokenizer = Tokenizer::new(src);
        let mut root_counts: HashMap<String, usize> = HashMap::new();
        let mut stack: Vec<PathStep> = Vec::new();

        loop {
            let token = tokenizer.parse_next();
            if token.kind == TokenKind::EndOfFile || token.start > position {
                break;
            }
            match token.kind {
                TokenKind::TagOpening => {
                    let name =
                        String::from_utf8_lossy(&src[token.start + 1..token.end()]).into_owned();
                    let counts = match stack.last_mut() {
                        Some(step) => &mut step.child_counts,
                        None => &mut root_counts,
                    };
                    let slot = counts.entry(name.clone()).or_insert(0);
                    *slot += 1;
                    let index = *slot;
                    stack.push(PathStep {
                        name,
                        index,
                        last_attr: None,
                        id_attrs: Vec::new(),
                        child_counts: HashMap::new(),
                    });
                }
                TokenKind::TagClosing | TokenKind::TagSelfClosingEnd => {
                    stack.pop();
                }
                TokenKind::AttrName => {
                    if let Some(step) = stack.last_mut() {
                        step.last_attr =
                            Some(String::from_utf8_lossy(&src[token.range()]).into_owned());
                    }
                }
                TokenKind::AttrValue => {
                    if let Some(step) = stack.last_mut() {
                        if let Some(attr) = step.last_attr.clone() {
                            if self.options().is_identity_attribute(&attr) {
                                let value = strip_quotes(&src[token.range()]);
                                step.id_attrs
                                    .push((attr, String::from_utf8_lossy(value).into_owned()));
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        let mut out = String::new();
        for step in &stack {
            out.push('/');
            if mode.contains(PathMode::WITH_NAMESPACE) {
                out.push_str(&step.name);
            } else {
                out.push_str(step.name.rsplit(':').next().unwrap_or(&step.name));
            }
            if mode.contains(PathMode::WITH_NODE_INDEX) {
                let _ = write!(out, "[{}]", step.index);
            }
            if mode.contains(PathMode::KEEP_ID_ATTRIBUTE) {
                for (key, value) in &step.id_attrs {
                    if self.options().dump_id_attribute_names {
                        let _ = write!(out, "[@{key}='{value}']");
                    } else {
                        let _ = write!(out, "['{value}']");
                    }
                }
            }
        }
        out
    }
}

fn strip_quotes(bytes: &[u8]) -> &[u8] {
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return &bytes[1..bytes.len() - 1];
        }
    }
    bytes
}
