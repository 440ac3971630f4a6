//! Build-script patching: ordered literal substitutions and dependency
//! coordinate insertion.
//!
//! Both operations are total. A token or anchor that is absent leaves the
//! document unchanged and is reported, never raised; template files vary
//! enough across editor versions that absence is normal.

use crate::config::schema::Substitution;

/// Anchor for dependency insertion. Only the first occurrence is targeted so
/// nested `buildscript { dependencies { } }` blocks never receive
/// application coordinates.
pub const DEPENDENCIES_ANCHOR: &str = "dependencies {";

/// Per-item report for substitutions and dependency lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GradleOutcome {
    Applied { occurrences: usize },
    AlreadyApplied,
    NotFound,
}

impl GradleOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, GradleOutcome::Applied { .. })
    }
}

/// Apply ordered literal substitution pairs, each to every occurrence.
///
/// Pairs are applied sequentially, so later pairs see the text earlier pairs
/// produced. A pair whose token is gone but whose replacement is present
/// counts as already applied, which is what makes template flag flips
/// (`**MINIFY_RELEASE**` and friends) reapplication-safe.
pub fn apply_substitutions(
    document: &str,
    pairs: &[Substitution],
) -> (String, Vec<GradleOutcome>) {
    let mut text = document.to_string();
    let mut outcomes = Vec::with_capacity(pairs.len());

    for pair in pairs {
        // Empty tokens are rejected by profile validation; stay total anyway.
        if pair.find.is_empty() {
            outcomes.push(GradleOutcome::NotFound);
            continue;
        }

        let occurrences = text.matches(pair.find.as_str()).count();
        if occurrences == 0 {
            if !pair.replace.is_empty() && text.contains(pair.replace.as_str()) {
                outcomes.push(GradleOutcome::AlreadyApplied);
            } else {
                outcomes.push(GradleOutcome::NotFound);
            }
            continue;
        }

        text = text.replace(pair.find.as_str(), pair.replace.as_str());
        outcomes.push(GradleOutcome::Applied { occurrences });
    }

    (text, outcomes)
}

/// Insert a dependency coordinate line after the first `dependencies {`
/// anchor, four spaces deep. A line already present verbatim anywhere in the
/// document is never duplicated.
pub fn apply_dependency(document: &str, line: &str) -> (String, GradleOutcome) {
    let line = line.trim();
    if line.is_empty() {
        return (document.to_string(), GradleOutcome::NotFound);
    }
    if document.contains(line) {
        return (document.to_string(), GradleOutcome::AlreadyApplied);
    }

    match document.find(DEPENDENCIES_ANCHOR) {
        Some(offset) => {
            let mut text = document.to_string();
            text.insert_str(
                offset + DEPENDENCIES_ANCHOR.len(),
                &format!("\n    {line}"),
            );
            (text, GradleOutcome::Applied { occurrences: 1 })
        }
        None => (document.to_string(), GradleOutcome::NotFound),
    }
}
