//! Bulk file discovery for the zero-argument mode.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Recursively collect every `.xml` and `.xsd` file under `root`, sorted so
/// bulk runs process files in a stable order.
pub fn find_xml_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_dir() {
            collect(&path, files)?;
        } else if file_type.is_file() && has_xml_extension(&path) {
            files.push(path);
        }
    }
    Ok(())
}

fn has_xml_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("xml" | "xsd")
    )
}
