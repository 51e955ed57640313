//! Formatter configuration.

/// Options driving [`crate::Formatter`].
#[derive(Clone, Debug)]
pub struct FormatOptions {
    /// String written once per indent level.
    pub indent_chars: String,
    /// String written as a line break.
    pub eol_chars: String,
    /// Cap on the indent multiplier; deeper levels still count logically but
    /// stop adding indent characters. `0` means unlimited.
    pub max_indent_level: usize,
    /// Keep output well formed around mixed content: text stays glued to its
    /// neighboring tags and no breaks are inserted where the source had none.
    pub ensure_conformity: bool,
    /// Rewrite `<a></a>` pairs with exactly empty bodies as `<a/>`.
    pub auto_close_tags: bool,
    /// Place each attribute after the first on its own line, one level deeper
    /// than its element. Ignored under `indent_only`, which never inserts
    /// line breaks.
    pub indent_attributes: bool,
    /// Keep the author's line breaks and only rewrite the leading whitespace
    /// of each line.
    pub indent_only: bool,
    /// Honor `xml:space="preserve"`: inside a preserve scope every byte is
    /// emitted verbatim.
    pub apply_space_preserve: bool,
    /// Attribute names treated as identity keys by the path builder.
    pub identity_attributes: Vec<String>,
    /// Render identity predicates as `[@key='val']`; with `false` the key is
    /// omitted (`['val']`).
    pub dump_id_attribute_names: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            indent_chars: "\t".to_string(),
            eol_chars: "\n".to_string(),
            max_indent_level: 255,
            ensure_conformity: true,
            auto_close_tags: false,
            indent_attributes: false,
            indent_only: false,
            apply_space_preserve: false,
            identity_attributes: Vec::new(),
            dump_id_attribute_names: true,
        }
    }
}

impl FormatOptions {
    /// Effective indent cap; `max_indent_level == 0` lifts the cap entirely.
    pub(crate) fn indent_cap(&self) -> usize {
        if self.max_indent_level == 0 {
            usize::MAX
        } else {
            self.max_indent_level
        }
    }

    pub(crate) fn is_identity_attribute(&self, name: &str) -> bool {
        self.identity_attributes.iter().any(|attr| attr == name)
    }
}
