//! Spreadsheet row import.
//!
//! Operators paste one tab-separated row per app from the planning sheet.
//! The row names the application id, a display name, and which variant to
//! build; the variant is marked with the sheet's own vocabulary (白包 for a
//! white package, B面 for a B-side build). Import never partially succeeds:
//! a row without a tab separator or without a package id is rejected whole.

use std::fmt;

use crate::cache;
use crate::config::schema::{BuildProfile, PackageMode};

/// Application id cell: `com.` followed by at least two more segments.
const PACKAGE_ID_PATTERN: &str = r"^com(\.[a-z0-9_]+){2,}$";

const BSIDE_KEYWORDS: [&str; 3] = ["B面", "B 面", "b面"];
const WHITE_KEYWORDS: [&str; 2] = ["原提白包", "白包"];

/// Version code policy: white packages ship 1, B-side builds 10001.
pub const WHITE_VERSION_CODE: u32 = 1;
pub const BSIDE_VERSION_CODE: u32 = 10001;

/// Identity fields derived from one sheet row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowImport {
    pub identifier: String,
    pub display_name: String,
    pub mode: PackageMode,
    pub version_code: u32,
}

impl RowImport {
    /// Merge into a profile, leaving everything the row does not name.
    pub fn apply_to(&self, profile: &mut BuildProfile) {
        profile.app.identifier = self.identifier.clone();
        if !self.display_name.is_empty() {
            profile.app.display_name = self.display_name.clone();
        }
        profile.app.version_code = self.version_code;
        profile.mode = self.mode;
    }
}

#[derive(Debug)]
pub enum ImportError {
    /// Pasted text is not a tab-separated row.
    NotTabSeparated,
    /// No cell holds an application id.
    NoPackageId { row: String },
    /// Row carries both white-package and B-side markers.
    AmbiguousMode { row: String },
    Pattern(regex::Error),
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::NotTabSeparated => {
                write!(f, "row is not tab-separated; paste the sheet row unmodified")
            }
            ImportError::NoPackageId { row } => {
                write!(f, "no application id (com.x.y) cell in row: {row}")
            }
            ImportError::AmbiguousMode { row } => {
                write!(f, "row marks both white-package and B-side: {row}")
            }
            ImportError::Pattern(source) => write!(f, "failed to compile import pattern: {source}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ImportError::Pattern(source) => Some(source),
            _ => None,
        }
    }
}

/// Parse one tab-separated sheet row into identity fields.
pub fn parse_row(row: &str) -> Result<RowImport, ImportError> {
    if !row.contains('\t') {
        return Err(ImportError::NotTabSeparated);
    }

    let cells: Vec<&str> = row.split('\t').map(str::trim).collect();

    let re = cache::get_or_compile(PACKAGE_ID_PATTERN).map_err(ImportError::Pattern)?;
    let package_index = cells
        .iter()
        .position(|cell| re.is_match(cell))
        .ok_or_else(|| ImportError::NoPackageId {
            row: row.trim().to_string(),
        })?;

    // The display name follows the id, skipping mode markers and icon or
    // keystore cells.
    let display_name = cells[package_index + 1..]
        .iter()
        .find(|cell| !cell.is_empty() && !is_artifact_cell(cell) && !is_mode_cell(cell))
        .map(|cell| cell.to_string())
        .unwrap_or_default();

    let is_bside = cells
        .iter()
        .any(|cell| BSIDE_KEYWORDS.iter().any(|k| cell.contains(k)));
    let is_white = cells
        .iter()
        .any(|cell| WHITE_KEYWORDS.iter().any(|k| cell.contains(k)));
    if is_bside && is_white {
        return Err(ImportError::AmbiguousMode {
            row: row.trim().to_string(),
        });
    }

    let (mode, version_code) = if is_bside {
        (PackageMode::Inject, BSIDE_VERSION_CODE)
    } else {
        (PackageMode::Clean, WHITE_VERSION_CODE)
    };

    Ok(RowImport {
        identifier: cells[package_index].to_string(),
        display_name,
        mode,
        version_code,
    })
}

fn is_artifact_cell(cell: &str) -> bool {
    let lower = cell.to_lowercase();
    [".png", ".jpg", ".jpeg", ".jks", ".keystore"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn is_mode_cell(cell: &str) -> bool {
    BSIDE_KEYWORDS
        .iter()
        .chain(WHITE_KEYWORDS.iter())
        .any(|k| cell.contains(k))
}
