//! Mode reconciliation and post-export hygiene for the Android manifest.
//!
//! Planners here never touch the file system. They inspect the document,
//! decide what (if anything) must change, and hand byte-span edits back to
//! the caller. An absent anchor is a `NoOp`, an already-converged document
//! is `AlreadyApplied`; neither is an error.

use std::ops::Range;

use thiserror::Error;

use super::fragment::{self, DEFAULT_PLAYER_ACTIVITY};
use crate::cache;
use crate::config::schema::{ActivityConfig, PackageMode};
use crate::edit::{Edit, PatchPlan};

/// Closing tag of the application scope; injection inserts just above it.
const APPLICATION_CLOSE: &str = "</application>";

const LAUNCH_MODE_FROM: &str = r#"android:launchMode="singleTask""#;
const LAUNCH_MODE_TO: &str = r#"android:launchMode="singleTop""#;

/// Predictive-back opt-in attribute; exported manifests must not pin it.
const BACK_CALLBACK_PATTERN: &str = r#"\s*android:enableOnBackInvokedCallback="(?:true|false)""#;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Failed to compile manifest pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Reconcile the document with the requested package mode.
///
/// Clean removes every marker fragment together with the line it occupies,
/// so no blank line is left behind. Inject replaces an existing fragment in
/// place with the canonical serialization, or inserts one immediately before
/// `</application>` when none exists. Either way the result holds the
/// zero-or-one fragment invariant; duplicated fragments in a corrupted input
/// are healed rather than refused.
pub fn plan_activity_patch(
    document: &str,
    mode: PackageMode,
    config: &ActivityConfig,
) -> Result<PatchPlan, ManifestError> {
    let fragments = fragment::find_all(document, config)?;

    match mode {
        PackageMode::Clean => {
            if fragments.is_empty() {
                return Ok(PatchPlan::AlreadyApplied(
                    "no secondary activity fragment present".to_string(),
                ));
            }

            let mut edits = Vec::with_capacity(fragments.len());
            let mut last_end = 0;
            for range in fragments {
                let span = expand_to_line(document, range, last_end);
                last_end = span.end;
                edits.push(Edit::new(span.start, span.end, "", &document[span]));
            }
            Ok(PatchPlan::Edits(edits))
        }
        PackageMode::Inject => {
            let canonical = fragment::serialize(config);

            if let Some((first, rest)) = fragments.split_first() {
                let current = &document[first.clone()];
                if current == canonical && rest.is_empty() {
                    return Ok(PatchPlan::AlreadyApplied(
                        "secondary activity fragment already canonical".to_string(),
                    ));
                }

                let mut edits = vec![Edit::new(first.start, first.end, &canonical, current)];

                // Extra fragments violate the zero-or-one invariant; drop them.
                let mut last_end = first.end;
                for range in rest {
                    let span = expand_to_line(document, range.clone(), last_end);
                    last_end = span.end;
                    edits.push(Edit::new(span.start, span.end, "", &document[span]));
                }
                Ok(PatchPlan::Edits(edits))
            } else {
                match insertion_edit(document, &canonical) {
                    Some(edit) => Ok(PatchPlan::Edits(vec![edit])),
                    None => Ok(PatchPlan::NoOp(format!(
                        "no {APPLICATION_CLOSE} tag to insert before"
                    ))),
                }
            }
        }
    }
}

/// Rewrite non-stock activity class names under the config's package prefix
/// to the configured class name.
///
/// The stock player activity is never renamed. When no renameable name
/// attribute exists, fall back to the marker fragment itself (it may still
/// carry the stock name after a template upgrade) and rewrite its name
/// attribute in place.
pub fn plan_rename(document: &str, config: &ActivityConfig) -> Result<PatchPlan, ManifestError> {
    let target = config.class_name.as_str();
    let re = cache::get_or_compile(&fragment::name_attribute_pattern(&config.package))?;

    let mut edits = Vec::new();
    let mut renameable = 0;
    for caps in re.captures_iter(document) {
        let Some(simple) = caps.get(1) else { continue };
        if simple.as_str() == DEFAULT_PLAYER_ACTIVITY {
            continue;
        }
        renameable += 1;
        if simple.as_str() == target {
            continue;
        }
        edits.push(Edit::new(
            simple.start(),
            simple.end(),
            target,
            simple.as_str(),
        ));
    }

    if !edits.is_empty() {
        return Ok(PatchPlan::Edits(edits));
    }
    if renameable > 0 {
        return Ok(PatchPlan::AlreadyApplied(
            "activity class names already match".to_string(),
        ));
    }

    // Nothing outside the stock name matched; retarget the marker fragment
    // directly if one exists.
    if let Some(range) = fragment::find_all(document, config)?.into_iter().next() {
        let within = &document[range.clone()];
        if let Some(caps) = re.captures(within) {
            let Some(simple) = caps.get(1) else {
                return Ok(PatchPlan::NoOp(
                    "fragment carries no name attribute under the package prefix".to_string(),
                ));
            };
            if simple.as_str() == target {
                return Ok(PatchPlan::AlreadyApplied(
                    "fragment already names the configured class".to_string(),
                ));
            }
            return Ok(PatchPlan::Edits(vec![Edit::new(
                range.start + simple.start(),
                range.start + simple.end(),
                target,
                simple.as_str(),
            )]));
        }
    }

    Ok(PatchPlan::NoOp(
        "no activity name attribute to rename".to_string(),
    ))
}

/// Post-export manifest hygiene: demote `singleTask` launch modes to
/// `singleTop` and strip the predictive-back attribute wherever it appears.
/// Both rewrites are convergent, so a second pass always reports
/// already-applied.
pub fn plan_export_adjustments(document: &str) -> Result<PatchPlan, ManifestError> {
    let mut edits = Vec::new();

    for (offset, _) in document.match_indices(LAUNCH_MODE_FROM) {
        edits.push(Edit::new(
            offset,
            offset + LAUNCH_MODE_FROM.len(),
            LAUNCH_MODE_TO,
            LAUNCH_MODE_FROM,
        ));
    }

    let re = cache::get_or_compile(BACK_CALLBACK_PATTERN)?;
    for m in re.find_iter(document) {
        edits.push(Edit::new(m.start(), m.end(), "", m.as_str()));
    }

    if edits.is_empty() {
        return Ok(PatchPlan::AlreadyApplied(
            "launch mode and back-callback attributes already adjusted".to_string(),
        ));
    }
    Ok(PatchPlan::Edits(edits))
}

/// Expand a fragment span to cover the whole line when the fragment owns it.
///
/// Only expands when everything before the span on its first line and after
/// it on its last line is whitespace; a fragment sharing a line with other
/// content is removed surgically. `min_start` keeps consecutive expanded
/// spans from overlapping.
fn expand_to_line(document: &str, range: Range<usize>, min_start: usize) -> Range<usize> {
    let line_start = document[..range.start].rfind('\n').map_or(0, |i| i + 1);
    let prefix_blank = document[line_start..range.start]
        .chars()
        .all(|c| c == ' ' || c == '\t');

    let line_end = document[range.end..]
        .find('\n')
        .map_or(document.len(), |i| range.end + i + 1);
    let suffix_blank = document[range.end..line_end]
        .chars()
        .all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));

    if prefix_blank && suffix_blank {
        line_start.max(min_start)..line_end
    } else {
        range
    }
}

/// Zero-width insertion of the canonical fragment above `</application>`,
/// indented one level deeper than the closing tag.
fn insertion_edit(document: &str, canonical: &str) -> Option<Edit> {
    let close = document.find(APPLICATION_CLOSE)?;
    let line_start = document[..close].rfind('\n').map_or(0, |i| i + 1);
    let indent = &document[line_start..close];

    if indent.chars().all(|c| c == ' ' || c == '\t') {
        Some(Edit::insert_at(
            line_start,
            format!("{indent}  {canonical}\n"),
        ))
    } else {
        // Close tag shares its line with other content; split before it.
        Some(Edit::insert_at(close, format!("\n{canonical}\n")))
    }
}
