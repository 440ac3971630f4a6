//! Marker attribute insertion above type declarations.
//!
//! Used to exclude engine-side C# scripts from obfuscation by planting an
//! attribute (e.g. `[Obfuz.ObfuzIgnore]`) above every class and struct
//! declaration that does not already carry it, directly or through the
//! attribute stack above the declaration.

use thiserror::Error;

use crate::cache;

/// A type declaration line: `class` or `struct` keyword followed by a name.
const DECLARATION_PATTERN: &str = r"\b(class|struct)\b\s+\w+";

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("Failed to compile annotation pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Insert `marker` above every unannotated type declaration.
///
/// A declaration counts as annotated when the marker appears on the
/// declaration line itself or on any line above it reachable through blank
/// lines and `[...]` attribute lines. Inserted lines copy the declaration's
/// indentation (and carriage return, for CRLF files). Returns the rewritten
/// document and the number of insertions; zero insertions means the document
/// is returned unchanged.
pub fn apply_marker(document: &str, marker: &str) -> Result<(String, usize), AnnotateError> {
    let decl_re = cache::get_or_compile(DECLARATION_PATTERN)?;

    let lines: Vec<&str> = document.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut inserted = 0;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        let is_declaration = !trimmed.starts_with("//") && decl_re.is_match(line);

        if is_declaration && !line.contains(marker) && !marker_above(&lines, index, marker) {
            let indent: String = line
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect();
            let cr = if line.ends_with('\r') { "\r" } else { "" };
            out.push(format!("{indent}{marker}{cr}"));
            inserted += 1;
        }

        out.push((*line).to_string());
    }

    Ok((out.join("\n"), inserted))
}

/// Scan upward from the declaration through blank lines and attribute lines,
/// looking for the marker. Any other line ends the scan.
fn marker_above(lines: &[&str], mut index: usize, marker: &str) -> bool {
    while index > 0 {
        index -= 1;
        let line = lines[index].trim();
        if line.is_empty() {
            continue;
        }
        if line.contains(marker) {
            return true;
        }
        if line.starts_with('[') {
            continue;
        }
        return false;
    }
    false
}
