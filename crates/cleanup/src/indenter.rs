//! The indenting pipeline: pre-process, format, post-process.

use xml::{FormatOptions, Formatter};

use crate::passes;

/// Tool-level settings, a thin layer over [`FormatOptions`].
#[derive(Clone, Debug)]
pub struct IndentOptions {
    pub indent_chars: String,
    pub eol_chars: String,
    /// Keep the author's line breaks and only rewrite leading whitespace.
    pub indent_only: bool,
    /// Collapse `<a></a>` pairs with empty bodies into `<a/>`.
    pub auto_close_empty_elements: bool,
}

impl Default for IndentOptions {
    fn default() -> Self {
        Self {
            indent_chars: "\t".to_string(),
            eol_chars: "\n".to_string(),
            indent_only: true,
            auto_close_empty_elements: true,
        }
    }
}

/// Run the full pipeline over one document.
///
/// Everything before the first `<` is dropped and line endings are normalized
/// to CRLF before formatting, so the formatter sees a stable shape; the
/// cosmetic passes and a final CRLF normalization run on its output. The
/// result is byte-stable: running it over its own output yields the same
/// bytes.
pub fn indent_xml(content: &[u8], options: &IndentOptions) -> Vec<u8> {
    let content = passes::trim_to_first_element(content);
    let content = passes::normalize_line_endings(content);

    let format_options = FormatOptions {
        indent_chars: options.indent_chars.clone(),
        eol_chars: options.eol_chars.clone(),
        auto_close_tags: options.auto_close_empty_elements,
        indent_only: options.indent_only,
        apply_space_preserve: true,
        ..FormatOptions::default()
    };
    let mut formatter = Formatter::new(&content, format_options);
    let formatted = formatter.pretty_print().to_vec();
    log::debug!(
        target: "cleanup.indenter",
        "formatted {} bytes into {}",
        content.len(),
        formatted.len()
    );

    let formatted = passes::space_comment_after_tag(&formatted);
    let formatted = passes::space_before_self_close(&formatted);
    let formatted = passes::normalize_single_line_comments(&formatted);
    passes::normalize_line_endings(&formatted)
}
