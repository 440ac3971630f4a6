//! B-side activity stub rendering and staged source copying.
//!
//! Stub handling is deliberately conservative: removal only ever touches a
//! file whose content is exactly the rendered stub, so hand-written sources
//! that happen to share a class name are never deleted.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum StubError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// What happened to one staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagedFile {
    Copied(PathBuf),
    Unchanged(PathBuf),
}

/// Outcome of a guarded stub removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StubRemoval {
    Removed,
    Absent,
    /// File exists but is not our stub; left alone.
    KeptForeign,
}

/// The minimal B-side activity source. The shape is fixed so removal can
/// verify authorship by equality.
pub fn render_stub(package: &str, class_name: &str) -> String {
    format!(
        "package {package};\n\nimport android.app.Activity;\n\npublic class {class_name} extends Activity {{\n}}\n"
    )
}

/// Copy every top-level `*.java` from the staging directory into the
/// destination, creating directories as needed. Files already identical at
/// the destination are reported unchanged and not rewritten.
pub fn stage_sources(staging_dir: &Path, dest_dir: &Path) -> Result<Vec<StagedFile>, StubError> {
    stage_inner(staging_dir, dest_dir, true)
}

/// Same walk and comparison as [`stage_sources`] with every write withheld;
/// `Copied` entries report what a real run would copy.
pub fn preview_sources(staging_dir: &Path, dest_dir: &Path) -> Result<Vec<StagedFile>, StubError> {
    stage_inner(staging_dir, dest_dir, false)
}

fn stage_inner(
    staging_dir: &Path,
    dest_dir: &Path,
    write: bool,
) -> Result<Vec<StagedFile>, StubError> {
    let mut staged = Vec::new();

    for entry in WalkDir::new(staging_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("java") {
            continue;
        }
        let Some(name) = path.file_name() else { continue };

        let dest = dest_dir.join(name);
        let content = fs::read(path)?;
        if dest.exists() && fs::read(&dest)? == content {
            staged.push(StagedFile::Unchanged(dest));
            continue;
        }

        if write {
            fs::create_dir_all(dest_dir)?;
            fs::write(&dest, &content)?;
        }
        staged.push(StagedFile::Copied(dest));
    }

    Ok(staged)
}

/// First `*.java` file stem in the staging directory, if any. Used to enrich
/// config validation messages, never to pick the class silently.
pub fn detect_class_name(staging_dir: &Path) -> Option<String> {
    WalkDir::new(staging_dir)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| {
            entry.path().extension().and_then(|e| e.to_str()) == Some("java")
        })
        .and_then(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string)
        })
}

/// Ensure `<dest_dir>/<class_name>.java` holds the rendered stub.
/// Returns true when the file was written, false when already identical.
pub fn ensure_stub(dest_dir: &Path, package: &str, class_name: &str) -> Result<bool, StubError> {
    let path = dest_dir.join(format!("{class_name}.java"));
    let rendered = render_stub(package, class_name);

    if path.exists() && fs::read_to_string(&path)? == rendered {
        return Ok(false);
    }

    fs::create_dir_all(dest_dir)?;
    fs::write(&path, rendered)?;
    Ok(true)
}

/// Remove the stub for `class_name`, but only when the file content is
/// exactly the rendered stub.
pub fn remove_stub(
    dest_dir: &Path,
    package: &str,
    class_name: &str,
) -> Result<StubRemoval, StubError> {
    let path = dest_dir.join(format!("{class_name}.java"));
    if !path.exists() {
        return Ok(StubRemoval::Absent);
    }
    if fs::read_to_string(&path)? != render_stub(package, class_name) {
        return Ok(StubRemoval::KeptForeign);
    }
    fs::remove_file(&path)?;
    Ok(StubRemoval::Removed)
}
