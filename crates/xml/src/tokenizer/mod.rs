//! Streaming XML tokenizer.
//!
//! A lexical classifier, not a validating parser: it walks an immutable byte
//! buffer with a cursor and a small [`ParseContext`] and hands out one token
//! per call. The contract is that every byte of the source lands in exactly
//! one token, in order, even for malformed input — unterminated constructs
//! span to end-of-buffer and tokenization continues with `EndOfFile`.
//!
//! Invariants:
//! - Token ranges are non-overlapping and monotonically non-decreasing; their
//!   concatenation reproduces the source buffer byte for byte.
//! - `declaration_depth` is zero outside declarations and strictly positive
//!   between a `DeclarationBeg` and its matching `DeclarationEnd`.
//! - Lookahead never rewinds the cursor: peeked tokens are parked in a FIFO
//!   that `parse_next` drains first, so context mutations apply exactly once.

use std::collections::VecDeque;

use crate::token::{ParseContext, Token, TokenKind, TokenKindSet};

mod cursor;

use cursor::{is_name_byte, DeclarationShape};

/// Pull-based tokenizer over one source buffer.
///
/// The buffer must outlive every token handed out; tokens reference it by
/// offset and length and are resolved through [`Tokenizer::text`].
pub struct Tokenizer<'src> {
    src: &'src [u8],
    pos: usize,
    context: ParseContext,
    has_attr_name: bool,
    attr_name: Option<Token>,
    expect_attr_value: bool,
    pending_preserve: bool,
    preserve_stack: Vec<bool>,
    lookahead: VecDeque<Token>,
}

impl<'src> Tokenizer<'src> {
    pub fn new(src: &'src [u8]) -> Self {
        Self {
            src,
            pos: 0,
            context: ParseContext::default(),
            has_attr_name: false,
            attr_name: None,
            expect_attr_value: false,
            pending_preserve: false,
            preserve_stack: Vec::new(),
            lookahead: VecDeque::new(),
        }
    }

    pub fn source(&self) -> &'src [u8] {
        self.src
    }

    /// Bytes of a token produced by this tokenizer.
    pub fn text(&self, token: &Token) -> &'src [u8] {
        &self.src[token.range()]
    }

    /// Current parsing context (the same snapshot new tokens receive).
    pub fn context(&self) -> ParseContext {
        self.context
    }

    /// Whether the current scope sits under `xml:space="preserve"`.
    ///
    /// While an opening tag is mid-parse the element being opened has not yet
    /// pushed its scope, so this reports the parent's state.
    pub fn is_space_preserve(&self) -> bool {
        self.preserve_stack.last().copied().unwrap_or(false)
    }

    /// Depth of the preserve stack; equals the currently open element depth
    /// once each opening tag has completed.
    pub fn preserve_depth(&self) -> usize {
        self.preserve_stack.len()
    }

    /// Reinitialize for another run over the same buffer.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.context = ParseContext::default();
        self.has_attr_name = false;
        self.attr_name = None;
        self.expect_attr_value = false;
        self.pending_preserve = false;
        self.preserve_stack.clear();
        self.lookahead.clear();
    }

    /// Produce the next token. Returns `EndOfFile` forever once exhausted.
    pub fn parse_next(&mut self) -> Token {
        if let Some(token) = self.lookahead.pop_front() {
            return token;
        }
        self.fetch_token()
    }

    /// Advance until a token whose kind is in `kinds` is produced and return
    /// it. Returns the `EndOfFile` token if no match occurs.
    pub fn parse_until(&mut self, kinds: impl Into<TokenKindSet>) -> Token {
        let kinds = kinds.into();
        loop {
            let token = self.parse_next();
            if kinds.contains(token.kind) || token.kind == TokenKind::EndOfFile {
                return token;
            }
        }
    }

    /// Look at the next token without consuming it.
    pub fn peek_next(&mut self) -> Token {
        if let Some(token) = self.lookahead.front() {
            return *token;
        }
        let token = self.fetch_token();
        if token.kind != TokenKind::EndOfFile {
            self.lookahead.push_back(token);
        }
        token
    }

    /// Look past Text/Whitespace/LineBreak noise to the next structural token
    /// without consuming anything: the skipped tokens (and the structural one)
    /// are parked in the lookahead FIFO for later `parse_next` calls.
    /// Idempotent until the FIFO is drained.
    pub fn next_structure_token(&mut self) -> Token {
        if let Some(token) = self.lookahead.iter().find(|t| t.kind.is_structural()) {
            return *token;
        }
        loop {
            let token = self.fetch_token();
            if token.kind == TokenKind::EndOfFile {
                return token;
            }
            self.lookahead.push_back(token);
            if token.kind.is_structural() {
                return token;
            }
        }
    }

    fn emit(&self, kind: TokenKind, start: usize) -> Token {
        let token = Token {
            kind,
            start,
            len: self.pos - start,
            context: self.context,
        };
        log::trace!(
            target: "xml.tokenizer",
            "token {} at {}..{}",
            kind.name(),
            token.start,
            token.end()
        );
        token
    }

    fn fetch_token(&mut self) -> Token {
        let start = self.pos;
        let Some(head) = self.peek_byte() else {
            return self.emit(TokenKind::EndOfFile, start);
        };

        // Line breaks and whitespace runs tokenize the same way inside and
        // outside tags; the snapshot context tells the consumer which one it
        // was.
        if head == b'\r' || head == b'\n' {
            self.read_until_first_not_of(b"\r\n");
            return self.emit(TokenKind::LineBreak, start);
        }
        if head == b' ' || head == b'\t' {
            self.read_until_first_not_of(b" \t");
            return self.emit(TokenKind::Whitespace, start);
        }

        if self.context.in_opening_tag {
            return self.fetch_in_opening_tag(start, head);
        }
        if self.context.in_closing_tag {
            return self.fetch_in_closing_tag(start, head);
        }
        self.fetch_markup_or_text(start, head)
    }

    fn fetch_in_opening_tag(&mut self, start: usize, head: u8) -> Token {
        match head {
            b'>' => {
                self.read_chars(1);
                self.context.in_opening_tag = false;
                let entering = self.pending_preserve || self.is_space_preserve();
                self.preserve_stack.push(entering);
                self.pending_preserve = false;
                self.emit(TokenKind::TagOpeningEnd, start)
            }
            b'/' if self.peek_byte_at(1) == Some(b'>') => {
                self.read_chars(2);
                self.context.in_opening_tag = false;
                // A self-closing element opens no scope; a pending
                // xml:space="preserve" on it is discarded.
                self.pending_preserve = false;
                self.emit(TokenKind::TagSelfClosingEnd, start)
            }
            b'=' => {
                self.read_chars(1);
                if self.has_attr_name {
                    self.expect_attr_value = true;
                }
                self.emit(TokenKind::Equal, start)
            }
            b'"' | b'\'' => {
                self.read_chars(1);
                self.read_until(&[head], true);
                self.expect_attr_value = false;
                self.has_attr_name = false;
                let token = self.emit(TokenKind::AttrValue, start);
                self.note_attr_value(token);
                token
            }
            _ => {
                if self.expect_attr_value {
                    if self.read_word(true) == 0 {
                        self.read_chars(1);
                    }
                    self.expect_attr_value = false;
                    self.has_attr_name = false;
                    let token = self.emit(TokenKind::AttrValue, start);
                    self.note_attr_value(token);
                    return token;
                }
                if self.read_word(false) == 0 {
                    // Stray byte inside a tag: account for it and move on.
                    self.read_chars(1);
                    return self.emit(TokenKind::Text, start);
                }
                let token = self.emit(TokenKind::AttrName, start);
                self.has_attr_name = true;
                self.attr_name = Some(token);
                token
            }
        }
    }

    fn fetch_in_closing_tag(&mut self, start: usize, head: u8) -> Token {
        if head == b'>' {
            self.read_chars(1);
            self.context.in_closing_tag = false;
            // A mismatched closing tag may find the stack already empty.
            self.preserve_stack.pop();
            return self.emit(TokenKind::TagClosingEnd, start);
        }
        if self.read_word(false) == 0 {
            self.read_chars(1);
        }
        self.emit(TokenKind::Text, start)
    }

    fn fetch_markup_or_text(&mut self, start: usize, head: u8) -> Token {
        if head == b'<' {
            if self.starts_with(b"<?") {
                self.read_chars(2);
                self.read_until(b"?>", true);
                return self.emit(TokenKind::Instruction, start);
            }
            if self.starts_with(b"<!--") {
                self.read_chars(4);
                self.read_until(b"-->", true);
                return self.emit(TokenKind::Comment, start);
            }
            if self.starts_with(b"<![CDATA[") {
                self.read_chars(9);
                self.read_until(b"]]>", true);
                return self.emit(TokenKind::Cdata, start);
            }
            if self.starts_with(b"<!") {
                return match self.read_declaration() {
                    DeclarationShape::Bracketed => {
                        self.context.declaration_depth += 1;
                        self.emit(TokenKind::DeclarationBeg, start)
                    }
                    DeclarationShape::SelfClosed | DeclarationShape::Unterminated => {
                        self.emit(TokenKind::DeclarationSelfClosing, start)
                    }
                };
            }
            if self.starts_with(b"</") {
                self.read_chars(2);
                self.read_word(false);
                self.context.in_closing_tag = true;
                return self.emit(TokenKind::TagClosing, start);
            }
            if self.peek_byte_at(1).is_some_and(is_name_byte) {
                self.read_chars(1);
                self.read_word(false);
                self.context.in_opening_tag = true;
                self.has_attr_name = false;
                self.attr_name = None;
                self.expect_attr_value = false;
                self.pending_preserve = false;
                return self.emit(TokenKind::TagOpening, start);
            }
            // A `<` that opens nothing recognizable is plain text.
            self.read_chars(1);
            self.read_until_first_of(self.text_stops());
            return self.emit(TokenKind::Text, start);
        }

        if self.context.declaration_depth > 0 && head == b']' {
            if self.peek_byte_at(1) == Some(b'>') {
                self.read_chars(2);
                self.context.declaration_depth -= 1;
                return self.emit(TokenKind::DeclarationEnd, start);
            }
            // A lone `]` in the internal subset is text.
            self.read_chars(1);
            return self.emit(TokenKind::Text, start);
        }

        self.read_until_first_of(self.text_stops());
        if self.pos == start {
            self.read_chars(1);
        }
        self.emit(TokenKind::Text, start)
    }

    /// Text runs stop at markup and line breaks; inside a declaration's
    /// internal subset they additionally stop at `]` so the closing `]>` can
    /// be recognized.
    fn text_stops(&self) -> &'static [u8] {
        if self.context.declaration_depth > 0 {
            b"<\r\n]"
        } else {
            b"<\r\n"
        }
    }

    fn note_attr_value(&mut self, value: Token) {
        let Some(name) = self.attr_name else {
            return;
        };
        if self.text(&name) != b"xml:space" {
            return;
        }
        let mut bytes = self.text(&value);
        if bytes.len() >= 2 {
            let first = bytes[0];
            if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
                bytes = &bytes[1..bytes.len() - 1];
            }
        }
        if bytes == b"preserve" {
            self.pending_preserve = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Tokenizer;
    use crate::token::{Token, TokenKind};

    fn lex(src: &[u8]) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(src);
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.parse_next();
            if token.kind == TokenKind::EndOfFile {
                break;
            }
            tokens.push(token);
            assert!(
                tokens.len() <= src.len() + 1,
                "tokenizer failed to make progress on {:?}",
                String::from_utf8_lossy(src)
            );
        }
        tokens
    }

    fn snapshot(src: &[u8]) -> Vec<String> {
        lex(src)
            .iter()
            .map(|token| {
                format!(
                    "{}({})",
                    token.kind.name(),
                    String::from_utf8_lossy(&src[token.range()])
                )
            })
            .collect()
    }

    #[test]
    fn tokens_cover_the_source_without_gaps() {
        let inputs: &[&[u8]] = &[
            b"<a><b/></a>",
            b"<a b=\"1\" c='2'>text</a>",
            b"<?xml version=\"1.0\"?>\r\n<r>\n\t<c/>\n</r>\n",
            b"<!DOCTYPE greeting [ <!ELEMENT greeting (#PCDATA)> ]>",
            b"<a><!-- note --><![CDATA[ <raw> ]]></a>",
            b"no markup at all",
            b"<a>broken",
            b"< stray <b/>",
            b"<a xml:space=\"preserve\">  kept  </a>",
        ];
        for src in inputs {
            let tokens = lex(src);
            let mut at = 0;
            for token in &tokens {
                assert_eq!(
                    token.start,
                    at,
                    "gap before {} in {:?}",
                    token.kind.name(),
                    String::from_utf8_lossy(src)
                );
                at = token.end();
            }
            assert_eq!(at, src.len(), "tail lost in {:?}", String::from_utf8_lossy(src));
        }
    }

    #[test]
    fn simple_element_with_attributes() {
        let got = snapshot(b"<a b=\"1\" c='2'/>");
        let expected = vec![
            "TagOpening(<a)",
            "Whitespace( )",
            "AttrName(b)",
            "Equal(=)",
            "AttrValue(\"1\")",
            "Whitespace( )",
            "AttrName(c)",
            "Equal(=)",
            "AttrValue('2')",
            "TagSelfClosingEnd(/>)",
        ];
        assert_eq!(got, expected);
    }

    #[test]
    fn unquoted_attribute_value_runs_to_tag_end() {
        let got = snapshot(b"<a b=1>");
        assert_eq!(
            got,
            vec![
                "TagOpening(<a)",
                "Whitespace( )",
                "AttrName(b)",
                "Equal(=)",
                "AttrValue(1)",
                "TagOpeningEnd(>)",
            ]
        );
    }

    #[test]
    fn text_splits_around_line_breaks_and_leading_whitespace() {
        let got = snapshot(b"<a>\r\n  hello world  \r\n</a>");
        assert_eq!(
            got,
            vec![
                "TagOpening(<a)",
                "TagOpeningEnd(>)",
                "LineBreak(\r\n)",
                "Whitespace(  )",
                "Text(hello world  )",
                "LineBreak(\r\n)",
                "TagClosing(</a)",
                "TagClosingEnd(>)",
            ]
        );
    }

    #[test]
    fn consecutive_line_breaks_form_one_token() {
        let got = snapshot(b"<a/>\r\n\r\n\n<b/>");
        assert_eq!(
            got,
            vec![
                "TagOpening(<a)",
                "TagSelfClosingEnd(/>)",
                "LineBreak(\r\n\r\n\n)",
                "TagOpening(<b)",
                "TagSelfClosingEnd(/>)",
            ]
        );
    }

    #[test]
    fn instruction_comment_and_cdata_are_single_tokens() {
        let got = snapshot(b"<?xml version=\"1.0\"?><!-- a\nmulti -- line --><![CDATA[x]]>");
        assert_eq!(
            got,
            vec![
                "Instruction(<?xml version=\"1.0\"?>)",
                "Comment(<!-- a\nmulti -- line -->)",
                "CDATA(<![CDATA[x]]>)",
            ]
        );
    }

    #[test]
    fn unterminated_comment_spans_to_end_of_buffer() {
        let src: &[u8] = b"<a><!-- never closed";
        let tokens = lex(src);
        let last = tokens.last().expect("tokens");
        assert_eq!(last.kind, TokenKind::Comment);
        assert_eq!(last.end(), src.len());

        let mut tokenizer = Tokenizer::new(src);
        for _ in 0..tokens.len() {
            tokenizer.parse_next();
        }
        assert_eq!(tokenizer.parse_next().kind, TokenKind::EndOfFile);
        assert_eq!(tokenizer.parse_next().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn doctype_internal_subset_tokenizes_as_beg_inner_end() {
        let src: &[u8] = b"<!DOCTYPE greeting [ <!ELEMENT greeting (#PCDATA)> ]>";
        let got = snapshot(src);
        assert_eq!(
            got,
            vec![
                "DeclarationBeg(<!DOCTYPE greeting [)",
                "Whitespace( )",
                "DeclarationSelfClosing(<!ELEMENT greeting (#PCDATA)>)",
                "Whitespace( )",
                "DeclarationEnd(]>)",
            ]
        );

        let tokens = lex(src);
        assert!(tokens[1].context.declaration_depth > 0);
        assert_eq!(tokens.last().expect("tokens").context.declaration_depth, 0);
    }

    #[test]
    fn declaration_without_subset_is_self_closing() {
        let got = snapshot(b"<!DOCTYPE html><r/>");
        assert_eq!(
            got,
            vec![
                "DeclarationSelfClosing(<!DOCTYPE html>)",
                "TagOpening(<r)",
                "TagSelfClosingEnd(/>)",
            ]
        );
    }

    #[test]
    fn preserve_scope_follows_xml_space_attribute() {
        let src: &[u8] = b"<a xml:space=\"preserve\"><b></b></a><c>";
        let mut tokenizer = Tokenizer::new(src);
        assert!(!tokenizer.is_space_preserve());

        // Past <a ... > the scope preserves.
        while tokenizer.parse_next().kind != TokenKind::TagOpeningEnd {}
        assert!(tokenizer.is_space_preserve());
        assert_eq!(tokenizer.preserve_depth(), 1);

        // <b> inherits the preserve state of its parent.
        while tokenizer.parse_next().kind != TokenKind::TagOpeningEnd {}
        assert!(tokenizer.is_space_preserve());
        assert_eq!(tokenizer.preserve_depth(), 2);

        // </b> pops back into the still-preserving parent scope.
        while tokenizer.parse_next().kind != TokenKind::TagClosingEnd {}
        assert!(tokenizer.is_space_preserve());

        // </a> leaves the preserve scope entirely.
        while tokenizer.parse_next().kind != TokenKind::TagClosingEnd {}
        assert!(!tokenizer.is_space_preserve());
        assert_eq!(tokenizer.preserve_depth(), 0);

        // A later sibling does not preserve.
        while tokenizer.parse_next().kind != TokenKind::TagOpeningEnd {}
        assert!(!tokenizer.is_space_preserve());
    }

    #[test]
    fn self_closing_element_discards_pending_preserve() {
        let mut tokenizer = Tokenizer::new(b"<a xml:space=\"preserve\"/><b>");
        while tokenizer.parse_next().kind != TokenKind::TagSelfClosingEnd {}
        assert_eq!(tokenizer.preserve_depth(), 0);
        while tokenizer.parse_next().kind != TokenKind::TagOpeningEnd {}
        assert!(!tokenizer.is_space_preserve());
    }

    #[test]
    fn mismatched_closing_tag_does_not_underflow_the_stack() {
        let tokens = lex(b"</ghost><a></a>");
        assert_eq!(tokens[0].kind, TokenKind::TagClosing);
        assert_eq!(tokens[1].kind, TokenKind::TagClosingEnd);
    }

    #[test]
    fn parse_until_accepts_a_mask_of_kinds() {
        let mut tokenizer = Tokenizer::new(b"<a>text<!--c--><b/>");
        let token = tokenizer.parse_until(TokenKind::Comment | TokenKind::Cdata);
        assert_eq!(token.kind, TokenKind::Comment);
        let token = tokenizer.parse_until(TokenKind::Comment | TokenKind::Cdata);
        assert_eq!(token.kind, TokenKind::EndOfFile);
    }

    #[test]
    fn next_structure_token_is_idempotent_and_preserves_order() {
        let src: &[u8] = b"<a>  \r\n text \r\n<b/></a>";
        let mut tokenizer = Tokenizer::new(src);
        while tokenizer.parse_next().kind != TokenKind::TagOpeningEnd {}

        let first = tokenizer.next_structure_token();
        let second = tokenizer.next_structure_token();
        assert_eq!(first, second, "lookahead must not consume");
        assert_eq!(first.kind, TokenKind::TagOpening);
        assert_eq!(&src[first.range()], b"<b");

        // The skipped noise drains in source order before the structural one.
        let kinds: Vec<TokenKind> = (0..5).map(|_| tokenizer.parse_next().kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Whitespace,
                TokenKind::LineBreak,
                TokenKind::Whitespace,
                TokenKind::Text,
                TokenKind::LineBreak,
            ]
        );
        assert_eq!(tokenizer.parse_next(), first);
    }

    #[test]
    fn peek_next_does_not_consume() {
        let mut tokenizer = Tokenizer::new(b"<a></a>");
        while tokenizer.parse_next().kind != TokenKind::TagOpeningEnd {}
        let peeked = tokenizer.peek_next();
        assert_eq!(peeked.kind, TokenKind::TagClosing);
        assert_eq!(tokenizer.parse_next(), peeked);
    }

    #[test]
    fn context_snapshot_distinguishes_whitespace_positions() {
        let tokens = lex(b"<a b=\"1\"> </a>");
        let in_tag = &tokens[1];
        assert_eq!(in_tag.kind, TokenKind::Whitespace);
        assert!(in_tag.context.in_opening_tag);

        let between = &tokens[6];
        assert_eq!(between.kind, TokenKind::Whitespace);
        assert!(!between.context.in_opening_tag);
        assert!(!between.context.in_closing_tag);
    }

    #[test]
    fn reset_allows_a_second_identical_run() {
        let src: &[u8] = b"<a xml:space=\"preserve\">x</a>";
        let mut tokenizer = Tokenizer::new(src);
        let first: Vec<Token> = std::iter::from_fn(|| {
            let t = tokenizer.parse_next();
            (t.kind != TokenKind::EndOfFile).then_some(t)
        })
        .collect();
        tokenizer.reset();
        let second: Vec<Token> = std::iter::from_fn(|| {
            let t = tokenizer.parse_next();
            (t.kind != TokenKind::EndOfFile).then_some(t)
        })
        .collect();
        assert_eq!(first, second);
    }
}
