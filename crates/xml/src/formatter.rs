//! Indentation formatter.
//!
//! Consumes the token stream and writes bytes into an owned sink. Two
//! disciplines: pretty printing reshapes whitespace entirely, indent-only
//! keeps the author's line structure and rewrites nothing but the leading
//! whitespace of each line. Inside an applied `xml:space="preserve"` scope
//! both disciplines suspend and bytes pass through verbatim.
//!
//! Invariants:
//! - The formatter never fails on malformed input; tokens it cannot place are
//!   emitted verbatim.
//! - `level_counter` tracks unbounded logical depth; `indent_level` is its
//!   projection under `max_indent_level`, so deep branches resurface at the
//!   correct indent.

use crate::options::FormatOptions;
use crate::token::{Token, TokenKind};
use crate::tokenizer::Tokenizer;

/// Per-element state while its subtree is being formatted.
struct OpenElement {
    name_start: usize,
    name_len: usize,
    /// A child block token (tag, comment, CDATA, instruction, declaration)
    /// was emitted inside this element.
    has_child: bool,
    /// Non-whitespace character data was emitted inside this element; the
    /// element is mixed content and must stay on one line.
    has_text: bool,
}

/// Token-stream formatter bound to one source buffer and one output sink.
///
/// Reuse after a completed run requires [`Formatter::reset`].
pub struct Formatter<'src> {
    src: &'src [u8],
    options: FormatOptions,
    tokenizer: Tokenizer<'src>,
    out: Vec<u8>,
    level_counter: usize,
    indent_level: usize,
    open_elements: Vec<OpenElement>,
    last_emitted: TokenKind,
    attr_index: usize,
    at_line_start: bool,
}

impl<'src> Formatter<'src> {
    pub fn new(src: &'src [u8], options: FormatOptions) -> Self {
        Self {
            src,
            options,
            tokenizer: Tokenizer::new(src),
            out: Vec::new(),
            level_counter: 0,
            indent_level: 0,
            open_elements: Vec::new(),
            last_emitted: TokenKind::Undefined,
            attr_index: 0,
            at_line_start: true,
        }
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub(crate) fn source_bytes(&self) -> &'src [u8] {
        self.src
    }

    /// Formatted bytes produced so far.
    pub fn output(&self) -> &[u8] {
        &self.out
    }

    pub fn into_output(self) -> Vec<u8> {
        self.out
    }

    /// Make the formatter ready for another run over the same buffer.
    pub fn reset(&mut self) {
        self.tokenizer.reset();
        self.out.clear();
        self.level_counter = 0;
        self.indent_level = 0;
        self.open_elements.clear();
        self.last_emitted = TokenKind::Undefined;
        self.attr_index = 0;
        self.at_line_start = true;
    }

    /// Drive the tokenizer to completion, producing indented output.
    pub fn pretty_print(&mut self) -> &[u8] {
        log::trace!(target: "xml.formatter", "pretty print, {} source bytes", self.src.len());
        loop {
            let token = self.tokenizer.parse_next();
            if token.kind == TokenKind::EndOfFile {
                break;
            }
            if self.preserving() {
                self.process_preserved(token);
            } else if self.options.indent_only {
                self.process_indent_only(token);
            } else {
                self.process_pretty(token);
            }
        }
        self.finish();
        &self.out
    }

    /// Emit every structural and text token adjacently, stripping whitespace
    /// outside preserve scopes.
    pub fn linearize(&mut self) -> &[u8] {
        loop {
            let token = self.tokenizer.parse_next();
            if token.kind == TokenKind::EndOfFile {
                break;
            }
            if self.preserving() {
                self.write_token(&token);
                continue;
            }
            match token.kind {
                TokenKind::Whitespace | TokenKind::LineBreak => {}
                TokenKind::AttrName => {
                    // Attribute separation must survive the stripped
                    // whitespace or the tag would fuse into one word.
                    self.out.push(b' ');
                    self.write_token(&token);
                }
                TokenKind::Text => {
                    let range = token.range();
                    let trimmed = trim_space(&self.src[range]);
                    self.out.extend_from_slice(trimmed);
                }
                _ => self.write_token(&token),
            }
        }
        &self.out
    }

    /// Render the token stream as kind names joined by `separator`, with the
    /// raw payload appended when `detailed`. Debugging aid.
    pub fn debug_tokens(&self, separator: &str, detailed: bool) -> String {
        let mut tokenizer = Tokenizer::new(self.src);
        let mut parts = Vec::new();
        loop {
            let token = tokenizer.parse_next();
            if token.kind == TokenKind::EndOfFile {
                break;
            }
            if detailed {
                parts.push(format!(
                    "{}({})",
                    token.kind.name(),
                    String::from_utf8_lossy(&self.src[token.range()])
                ));
            } else {
                parts.push(token.kind.name().to_string());
            }
        }
        parts.join(separator)
    }

    fn preserving(&self) -> bool {
        self.options.apply_space_preserve && self.tokenizer.is_space_preserve()
    }

    /// Verbatim pass-through inside a preserve scope. Level and element
    /// bookkeeping still runs so formatting resumes correctly after the scope
    /// closes.
    fn process_preserved(&mut self, token: Token) {
        match token.kind {
            TokenKind::TagOpening => {
                self.note_child();
                self.push_open(&token);
                self.raise_level();
                self.attr_index = 0;
            }
            TokenKind::TagClosing | TokenKind::TagSelfClosingEnd => {
                self.open_elements.pop();
                self.lower_level();
            }
            _ => {}
        }
        self.write_token(&token);
        self.at_line_start = token.kind == TokenKind::LineBreak;
        self.last_emitted = token.kind;
    }

    fn process_pretty(&mut self, token: Token) {
        match token.kind {
            TokenKind::TagOpening => {
                self.block_break();
                self.note_child();
                self.push_open(&token);
                self.write_token(&token);
                self.raise_level();
                self.attr_index = 0;
            }
            TokenKind::TagOpeningEnd => {
                if self.try_auto_close() {
                    return;
                }
                self.write_token(&token);
            }
            TokenKind::TagSelfClosingEnd => {
                self.open_elements.pop();
                self.lower_level();
                self.write_token(&token);
            }
            TokenKind::TagClosing => {
                let closed = self.open_elements.pop();
                self.lower_level();
                let inline = match closed {
                    Some(el) => {
                        !el.has_child || (self.options.ensure_conformity && el.has_text)
                    }
                    None => false,
                };
                if !self.out.is_empty() && !inline {
                    self.write_eol();
                    self.write_indentation();
                }
                self.write_token(&token);
            }
            TokenKind::TagClosingEnd => self.write_token(&token),
            TokenKind::AttrName => {
                if self.options.indent_attributes && self.attr_index > 0 {
                    self.write_eol();
                    self.write_indentation();
                } else {
                    self.out.push(b' ');
                }
                self.write_token(&token);
                self.attr_index += 1;
            }
            TokenKind::Equal | TokenKind::AttrValue => self.write_token(&token),
            TokenKind::Text => {
                if trim_space(&self.src[token.range()]).is_empty() {
                    return;
                }
                self.note_text();
                let range = token.range();
                self.out.extend_from_slice(trim_space(&self.src[range]));
                self.last_emitted = TokenKind::Text;
                return;
            }
            // Pretty printing generates its own line structure.
            TokenKind::Whitespace | TokenKind::LineBreak => return,
            TokenKind::Comment
            | TokenKind::Cdata
            | TokenKind::Instruction
            | TokenKind::DeclarationBeg
            | TokenKind::DeclarationEnd
            | TokenKind::DeclarationSelfClosing => {
                self.block_break();
                self.note_child();
                self.write_token(&token);
            }
            TokenKind::Undefined | TokenKind::EndOfFile => return,
        }
        self.last_emitted = token.kind;
    }

    /// Indent-only line machine: `LineBreak` returns to the line start,
    /// leading whitespace is swallowed, and the first real token of a line
    /// emits the computed indentation in its place.
    fn process_indent_only(&mut self, token: Token) {
        match token.kind {
            TokenKind::LineBreak => {
                self.write_token(&token);
                self.at_line_start = true;
                self.last_emitted = TokenKind::LineBreak;
                return;
            }
            TokenKind::Whitespace => {
                if !self.at_line_start {
                    self.write_token(&token);
                    self.last_emitted = TokenKind::Whitespace;
                }
                return;
            }
            TokenKind::TagOpening => {
                self.note_child();
                self.push_open(&token);
                self.write_line_positioned(&token);
                self.raise_level();
                self.attr_index = 0;
            }
            TokenKind::TagClosing | TokenKind::TagSelfClosingEnd => {
                self.open_elements.pop();
                self.lower_level();
                self.write_line_positioned(&token);
            }
            TokenKind::TagOpeningEnd => {
                if self.try_auto_close() {
                    return;
                }
                self.write_line_positioned(&token);
            }
            TokenKind::Text => {
                self.note_text();
                self.write_line_positioned(&token);
            }
            TokenKind::Undefined | TokenKind::EndOfFile => return,
            _ => self.write_line_positioned(&token),
        }
        self.last_emitted = token.kind;
    }

    /// Line break plus indentation before a block-level token, unless the
    /// output is empty or mixed content forbids it.
    fn block_break(&mut self) {
        if self.out.is_empty() {
            return;
        }
        if self.options.ensure_conformity && self.in_mixed_content() {
            return;
        }
        self.write_eol();
        self.write_indentation();
    }

    fn in_mixed_content(&self) -> bool {
        self.last_emitted == TokenKind::Text
            || self.open_elements.last().is_some_and(|el| el.has_text)
    }

    /// `<a></a>` with an exactly empty body collapses to `<a/>`. The `>` of
    /// the opening tag is replaced by `/>` and the closing pair is consumed.
    fn try_auto_close(&mut self) -> bool {
        if !self.options.auto_close_tags {
            return false;
        }
        let peeked = self.tokenizer.peek_next();
        if peeked.kind != TokenKind::TagClosing || !self.closes_innermost(&peeked) {
            return false;
        }
        self.tokenizer.parse_next();
        self.tokenizer.parse_until(TokenKind::TagClosingEnd);
        if self.options.indent_only && self.at_line_start {
            self.write_indentation();
            self.at_line_start = false;
        }
        self.out.extend_from_slice(b"/>");
        self.open_elements.pop();
        self.lower_level();
        self.last_emitted = TokenKind::TagSelfClosingEnd;
        true
    }

    fn closes_innermost(&self, closing: &Token) -> bool {
        let Some(top) = self.open_elements.last() else {
            return false;
        };
        let bytes = &self.src[closing.range()];
        bytes.len() >= 2
            && bytes[2..] == self.src[top.name_start..top.name_start + top.name_len]
    }

    fn push_open(&mut self, token: &Token) {
        debug_assert!(token.len >= 1);
        self.open_elements.push(OpenElement {
            name_start: token.start + 1,
            name_len: token.len - 1,
            has_child: false,
            has_text: false,
        });
    }

    fn note_child(&mut self) {
        if let Some(element) = self.open_elements.last_mut() {
            element.has_child = true;
        }
    }

    fn note_text(&mut self) {
        if let Some(element) = self.open_elements.last_mut() {
            element.has_text = true;
        }
    }

    fn raise_level(&mut self) {
        self.level_counter += 1;
        self.indent_level = self.level_counter.min(self.options.indent_cap());
    }

    fn lower_level(&mut self) {
        self.level_counter = self.level_counter.saturating_sub(1);
        self.indent_level = self.level_counter.min(self.options.indent_cap());
    }

    fn write_line_positioned(&mut self, token: &Token) {
        if self.at_line_start {
            self.write_indentation();
            self.at_line_start = false;
        }
        self.write_token(token);
    }

    fn write_token(&mut self, token: &Token) {
        let range = token.range();
        self.out.extend_from_slice(&self.src[range]);
    }

    fn write_eol(&mut self) {
        let eol = self.options.eol_chars.as_bytes();
        self.out.extend_from_slice(eol);
    }

    fn write_indentation(&mut self) {
        for _ in 0..self.indent_level {
            let indent = self.options.indent_chars.as_bytes();
            self.out.extend_from_slice(indent);
        }
    }

    /// The formatted document always ends with a line terminator.
    fn finish(&mut self) {
        if self.out.is_empty() {
            return;
        }
        if !matches!(self.out.last(), Some(b'\n' | b'\r')) {
            self.write_eol();
        }
    }
}

fn trim_space(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t'))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b' ' | b'\t'))
        .map_or(start, |at| at + 1);
    &bytes[start..end]
}
