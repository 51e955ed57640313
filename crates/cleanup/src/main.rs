// CLI entrypoint for xmlcleanup.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use clap::Parser;

use cleanup::cli::Cli;
use cleanup::{find_xml_files, indent_xml, IndentOptions};

fn main() {
    // Zero arguments means bulk mode over the current directory.
    if env::args_os().len() <= 1 {
        process::exit(run_bulk());
    }

    let cli = Cli::parse();
    let options = cli.indent_options();
    let Some(input) = cli.input.as_deref() else {
        eprintln!("Error: No valid input file specified");
        process::exit(1);
    };
    if let Err(err) = run_single(input, cli.output.as_deref(), &options) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run_single(input: &Path, output: Option<&Path>, options: &IndentOptions) -> io::Result<()> {
    let content = fs::read(input)?;
    let formatted = indent_xml(&content, options);
    match output {
        Some(path) => {
            fs::write(path, &formatted)?;
            println!("Formatted XML written to {}", path.display());
        }
        None => io::stdout().write_all(&formatted)?,
    }
    Ok(())
}

fn run_bulk() -> i32 {
    println!(
        "No arguments provided. Processing all XML and XSD files in current directory and subdirectories..."
    );
    let files = match find_xml_files(Path::new(".")) {
        Ok(files) => files,
        Err(err) => {
            eprintln!("Error while searching for XML files: {err}");
            return 1;
        }
    };
    if files.is_empty() {
        println!("No XML or XSD files found.");
        return 0;
    }
    println!("Found {} XML/XSD files to process.", files.len());

    let options = IndentOptions::default();
    let mut success_count = 0usize;
    for file in &files {
        match process_in_place(file, &options) {
            Ok(()) => {
                println!("Formatted: {}", file.display());
                success_count += 1;
            }
            Err(err) => eprintln!("Error processing {}: {err}", file.display()),
        }
    }
    println!(
        "Successfully processed {success_count} out of {} files.",
        files.len()
    );
    0
}

fn process_in_place(path: &Path, options: &IndentOptions) -> io::Result<()> {
    let content = fs::read(path)?;
    let formatted = indent_xml(&content, options);
    fs::write(path, &formatted)
}
