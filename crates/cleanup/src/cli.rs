//! Command-line interface parsing.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::indenter::IndentOptions;

const LONG_ABOUT: &str = "A tool for indenting XML files.

If no arguments are given, all XML and XSD files in the current folder and
subfolders are indented in place, using tabs for indentation and indent-only
mode.

If output-file is not specified, output is written to stdout.";

#[derive(Parser, Debug)]
#[command(
    name = "xmlcleanup",
    version,
    about = "Indent XML files while preserving the author's line structure",
    long_about = LONG_ABOUT
)]
pub struct Cli {
    /// Input file to format.
    pub input: Option<PathBuf>,
    /// Output file; stdout when omitted.
    pub output: Option<PathBuf>,
    #[arg(
        short = 't',
        long = "tabs",
        action = ArgAction::SetTrue,
        conflicts_with = "spaces",
        help = "Use tabs for indentation (default)"
    )]
    pub tabs: bool,
    #[arg(
        short = 's',
        long = "spaces",
        value_name = "N",
        num_args = 0..=1,
        default_missing_value = "2",
        help = "Use N spaces for indentation"
    )]
    pub spaces: Option<usize>,
    #[arg(
        short = 'i',
        long = "indent-only",
        action = ArgAction::SetTrue,
        conflicts_with = "full_format",
        help = "Only adjust indentation, preserve linebreaks (default)"
    )]
    pub indent_only: bool,
    #[arg(
        short = 'f',
        long = "full-format",
        action = ArgAction::SetTrue,
        help = "Full formatting (adds linebreaks)"
    )]
    pub full_format: bool,
    #[arg(
        short = 'a',
        long = "auto-close",
        action = ArgAction::SetTrue,
        conflicts_with = "no_auto_close",
        help = "Auto-close empty elements (default)"
    )]
    pub auto_close: bool,
    #[arg(
        short = 'n',
        long = "no-auto-close",
        action = ArgAction::SetTrue,
        help = "Don't auto-close empty elements"
    )]
    pub no_auto_close: bool,
}

impl Cli {
    /// Map the flag surface onto pipeline options. Tabs, indent-only and
    /// auto-close are the defaults; the negative flags override them.
    pub fn indent_options(&self) -> IndentOptions {
        IndentOptions {
            indent_chars: match self.spaces {
                Some(count) => " ".repeat(count),
                None => "\t".to_string(),
            },
            indent_only: !self.full_format,
            auto_close_empty_elements: !self.no_auto_close,
            ..IndentOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("xmlcleanup").chain(args.iter().copied()))
            .expect("parse cli")
    }

    #[test]
    fn defaults_are_tabs_indent_only_auto_close() {
        let options = parse(&["input.xml"]).indent_options();
        assert_eq!(options.indent_chars, "\t");
        assert!(options.indent_only);
        assert!(options.auto_close_empty_elements);
    }

    #[test]
    fn spaces_flag_takes_an_optional_count() {
        assert_eq!(parse(&["-s", "4", "in.xml"]).indent_options().indent_chars, "    ");
        // Trailing -s without a count falls back to two spaces.
        assert_eq!(parse(&["in.xml", "-s"]).indent_options().indent_chars, "  ");
    }

    #[test]
    fn mode_flags_flip_the_defaults() {
        let options = parse(&["-f", "-n", "in.xml"]).indent_options();
        assert!(!options.indent_only);
        assert!(!options.auto_close_empty_elements);

        let options = parse(&["-i", "-a", "in.xml"]).indent_options();
        assert!(options.indent_only);
        assert!(options.auto_close_empty_elements);
    }

    #[test]
    fn positional_arguments_map_to_input_and_output() {
        let cli = parse(&["-t", "in.xml", "out.xml"]);
        assert_eq!(cli.input.as_deref().and_then(|p| p.to_str()), Some("in.xml"));
        assert_eq!(cli.output.as_deref().and_then(|p| p.to_str()), Some("out.xml"));
    }

    #[test]
    fn conflicting_flags_are_rejected() {
        assert!(Cli::try_parse_from(["xmlcleanup", "-t", "-s", "2", "in.xml"]).is_err());
        assert!(Cli::try_parse_from(["xmlcleanup", "-i", "-f", "in.xml"]).is_err());
        assert!(Cli::try_parse_from(["xmlcleanup", "-a", "-n", "in.xml"]).is_err());
    }
}
