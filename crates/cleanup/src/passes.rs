//! Cosmetic passes around the core formatter.
//!
//! These run on raw bytes, before and after formatting, and are deliberately
//! dumb textual rewrites: the formatter already guarantees structure, the
//! passes only polish spacing and line endings so output is byte-stable
//! across platforms.

use memchr::memchr;

/// Drop everything preceding the first `<` (BOMs, stray prologue whitespace).
/// Content without any `<` is returned unchanged.
pub fn trim_to_first_element(content: &[u8]) -> &[u8] {
    match memchr(b'<', content) {
        Some(at) => &content[at..],
        None => content,
    }
}

/// Normalize every line ending to CRLF: a lone CR becomes CRLF, a lone LF
/// becomes CRLF, existing CRLF pairs are kept.
pub fn normalize_line_endings(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + content.len() / 8);
    let mut i = 0;
    while i < content.len() {
        match content[i] {
            b'\r' => {
                out.extend_from_slice(b"\r\n");
                if content.get(i + 1) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => out.extend_from_slice(b"\r\n"),
            byte => out.push(byte),
        }
        i += 1;
    }
    out
}

/// A comment kept on the same line as the tag before it gets exactly one
/// space, never a tab and never nothing.
pub fn space_comment_after_tag(content: &[u8]) -> Vec<u8> {
    let content = replace_all(content, b">\t<!--", b"> <!--");
    replace_all(&content, b"><!--", b"> <!--")
}

/// Every `/>` is preceded by exactly one space. A double quote already gets
/// its space from the dedicated `"/>"` rewrite, so it is excluded from the
/// generic insertion.
pub fn space_before_self_close(content: &[u8]) -> Vec<u8> {
    let content = replace_all(content, b"\"/>", b"\" />");
    let mut out = Vec::with_capacity(content.len() + 16);
    let mut i = 0;
    while i < content.len() {
        if content[i] == b'/' && content.get(i + 1) == Some(&b'>') {
            if i > 0 && !matches!(content[i - 1], b' ' | b'"') {
                out.push(b' ');
            }
            out.extend_from_slice(b"/>");
            i += 2;
            continue;
        }
        out.push(content[i]);
        i += 1;
    }
    out
}

/// Re-wrap single-line comments as `<!-- body -->`: surrounding spaces
/// trimmed, interior space runs collapsed, empty bodies rendered as
/// `<!-- -->`. Comments with embedded CR/LF are left untouched.
pub fn normalize_single_line_comments(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut i = 0;
    while i < content.len() {
        let Some(rel) = find(&content[i..], b"<!--") else {
            out.extend_from_slice(&content[i..]);
            break;
        };
        let start = i + rel;
        out.extend_from_slice(&content[i..start]);
        let Some(end_rel) = find(&content[start + 4..], b"-->") else {
            out.extend_from_slice(&content[start..]);
            break;
        };
        let end = start + 4 + end_rel;
        let body = &content[start + 4..end];
        if body.iter().any(|b| matches!(b, b'\n' | b'\r')) {
            out.extend_from_slice(&content[start..end + 3]);
        } else {
            out.extend_from_slice(b"<!--");
            let trimmed = trim_spaces(body);
            if trimmed.is_empty() {
                out.extend_from_slice(b" ");
            } else {
                out.push(b' ');
                let mut last_was_space = false;
                for &byte in trimmed {
                    if byte == b' ' {
                        if !last_was_space {
                            out.push(byte);
                            last_was_space = true;
                        }
                    } else {
                        out.push(byte);
                        last_was_space = false;
                    }
                }
                out.push(b' ');
            }
            out.extend_from_slice(b"-->");
        }
        i = end + 3;
    }
    out
}

fn trim_spaces(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|&b| b != b' ')
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(start, |at| at + 1);
    &bytes[start..end]
}

fn replace_all(content: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut i = 0;
    while i < content.len() {
        match find(&content[i..], from) {
            Some(rel) => {
                out.extend_from_slice(&content[i..i + rel]);
                out.extend_from_slice(to);
                i += rel + from.len();
            }
            None => {
                out.extend_from_slice(&content[i..]);
                break;
            }
        }
    }
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    debug_assert!(!needle.is_empty());
    let mut at = 0;
    while at + needle.len() <= haystack.len() {
        let rel = memchr(needle[0], &haystack[at..])?;
        let pos = at + rel;
        if pos + needle.len() > haystack.len() {
            return None;
        }
        if &haystack[pos..pos + needle.len()] == needle {
            return Some(pos);
        }
        at = pos + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_line_endings, normalize_single_line_comments, space_before_self_close,
        space_comment_after_tag, trim_to_first_element,
    };

    #[test]
    fn trim_drops_bom_and_prologue_noise() {
        assert_eq!(trim_to_first_element(b"\xef\xbb\xbf  \n<a/>"), b"<a/>");
        assert_eq!(trim_to_first_element(b"<a/>"), b"<a/>");
        assert_eq!(trim_to_first_element(b"no markup"), b"no markup");
    }

    #[test]
    fn line_endings_all_become_crlf() {
        assert_eq!(normalize_line_endings(b"a\rb"), b"a\r\nb");
        assert_eq!(normalize_line_endings(b"a\nb"), b"a\r\nb");
        assert_eq!(normalize_line_endings(b"a\r\nb"), b"a\r\nb");
        assert_eq!(normalize_line_endings(b"a\r\rb"), b"a\r\n\r\nb");
        assert_eq!(normalize_line_endings(b"a\n\nb"), b"a\r\n\r\nb");
    }

    #[test]
    fn crlf_normalization_is_idempotent() {
        let once = normalize_line_endings(b"a\rb\nc\r\nd");
        let twice = normalize_line_endings(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn comment_directly_after_tag_gets_one_space() {
        assert_eq!(space_comment_after_tag(b"<a><!--x-->"), b"<a> <!--x-->");
        assert_eq!(space_comment_after_tag(b"<a>\t<!--x-->"), b"<a> <!--x-->");
        // A line break between tag and comment is not "the same line".
        assert_eq!(
            space_comment_after_tag(b"<a>\r\n\t<!--x-->"),
            b"<a>\r\n\t<!--x-->"
        );
    }

    #[test]
    fn self_close_spacing_covers_names_and_quotes() {
        assert_eq!(space_before_self_close(b"<b/>"), b"<b />");
        assert_eq!(space_before_self_close(b"<b a=\"1\"/>"), b"<b a=\"1\" />");
        assert_eq!(space_before_self_close(b"<b a='1'/>"), b"<b a='1' />");
        // Already spaced stays as is.
        assert_eq!(space_before_self_close(b"<b />"), b"<b />");
    }

    #[test]
    fn single_line_comments_are_rewrapped() {
        assert_eq!(
            normalize_single_line_comments(b"<!--x-->"),
            b"<!-- x -->"
        );
        assert_eq!(
            normalize_single_line_comments(b"<!--   a   b  -->"),
            b"<!-- a b -->"
        );
        assert_eq!(normalize_single_line_comments(b"<!---->"), b"<!-- -->");
        assert_eq!(normalize_single_line_comments(b"<!--    -->"), b"<!-- -->");
    }

    #[test]
    fn multi_line_comments_are_untouched() {
        let src: &[u8] = b"<!--  a\r\n  b  -->";
        assert_eq!(normalize_single_line_comments(src), src);
    }

    #[test]
    fn unterminated_comment_is_left_alone() {
        let src: &[u8] = b"<a><!-- open";
        assert_eq!(normalize_single_line_comments(src), src);
    }

    #[test]
    fn comment_rewrap_is_idempotent() {
        let once = normalize_single_line_comments(b"<!--  x   y -->");
        let twice = normalize_single_line_comments(&once);
        assert_eq!(once, twice);
    }
}
