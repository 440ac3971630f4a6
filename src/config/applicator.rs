//! Profile applicator - runs variant profiles with idempotency checks
//!
//! This module turns a validated profile into an ordered list of steps and
//! drives them against the project tree:
//! - Gates the whole profile on the editor version that produced the export
//! - Resolves target files, skipping optional ones and failing on required ones
//! - Plans each step as byte-span edits and re-checks structure before writing
//! - Reports one result per step; check mode reports the same without writes

use crate::annotate;
use crate::config::schema::{BuildProfile, PackageMode, ValidationError};
use crate::config::version::{matches_requirement, VersionError};
use crate::edit::{apply_all, write_document, EditError, EditResult, PatchPlan};
use crate::gradle::{self, GradleOutcome};
use crate::manifest::{plan_activity_patch, plan_export_adjustments, plan_rename};
use crate::safety::{ProjectGuard, SafetyError};
use crate::source::{self, StagedFile, StubError, StubRemoval};
use crate::validate::{check_manifest, check_source};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Result of running a single step
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for success/failure"]
pub enum PatchResult {
    /// Step mutated the tree (or would, in check mode)
    Applied { file: PathBuf },
    /// Desired state already present; nothing written
    AlreadyApplied { file: PathBuf },
    /// Optional target or anchor absent; never an error
    Skipped { reason: String },
    /// Step refused to write; the tree is untouched
    Failed { file: PathBuf, reason: String },
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied { file } => {
                write!(f, "Applied to {}", file.display())
            }
            PatchResult::AlreadyApplied { file } => {
                write!(f, "Already applied to {}", file.display())
            }
            PatchResult::Skipped { reason } => {
                write!(f, "Skipped: {}", reason)
            }
            PatchResult::Failed { file, reason } => {
                write!(f, "Failed on {}: {}", file.display(), reason)
            }
        }
    }
}

/// Errors during profile application
#[derive(Debug)]
pub enum ApplicationError {
    /// Version filtering error
    Version(VersionError),
    /// File I/O error
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Edit application error
    Edit(EditError),
    /// Path escaped the project or hit a forbidden directory
    Safety(SafetyError),
    /// Profile rejected before any file was touched
    Validation(ValidationError),
    /// A file the step cannot proceed without is missing
    MissingTargetFile { path: PathBuf },
    /// A profile-derived pattern failed to compile
    Pattern { file: PathBuf, reason: String },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Version(e) => write!(f, "version error: {}", e),
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Edit(e) => write!(f, "edit error: {}", e),
            ApplicationError::Safety(e) => write!(f, "path refused: {}", e),
            ApplicationError::Validation(e) => write!(f, "profile rejected: {}", e),
            ApplicationError::MissingTargetFile { path } => {
                write!(f, "required source file missing: {}", path.display())
            }
            ApplicationError::Pattern { file, reason } => {
                write!(f, "pattern error in {}: {}", file.display(), reason)
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Version(e) => Some(e),
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Edit(e) => Some(e),
            ApplicationError::Safety(e) => Some(e),
            ApplicationError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<VersionError> for ApplicationError {
    fn from(e: VersionError) -> Self {
        ApplicationError::Version(e)
    }
}

impl From<EditError> for ApplicationError {
    fn from(e: EditError) -> Self {
        ApplicationError::Edit(e)
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Safety(e)
    }
}

/// One unit of work derived from the profile. The id doubles as the report
/// label, so reruns line up step for step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    ManifestActivity,
    ManifestRename,
    ManifestExport,
    SourceHook,
    StageSources,
    ActivityStub,
    GradleFlags(String),
    GradleDeps(String),
    Annotate(String),
}

impl Step {
    fn id(&self) -> String {
        match self {
            Step::ManifestActivity => "manifest-activity".to_string(),
            Step::ManifestRename => "manifest-rename".to_string(),
            Step::ManifestExport => "manifest-export".to_string(),
            Step::SourceHook => "source-hook".to_string(),
            Step::StageSources => "stage-sources".to_string(),
            Step::ActivityStub => "activity-stub".to_string(),
            Step::GradleFlags(file) => format!("gradle-flags:{file}"),
            Step::GradleDeps(file) => format!("gradle-deps:{file}"),
            Step::Annotate(target) => format!("annotate:{target}"),
        }
    }
}

/// The ordered step list for a profile. Derived from configuration alone so
/// version-gated runs can report the same labels without touching the tree.
fn plan_steps(profile: &BuildProfile) -> Vec<Step> {
    let mut steps = vec![Step::ManifestActivity];

    if profile.mode == PackageMode::Inject {
        steps.push(Step::ManifestRename);
        steps.push(Step::ManifestExport);
        if profile.hook.is_some() {
            steps.push(Step::SourceHook);
        }
        steps.push(Step::StageSources);
    }
    steps.push(Step::ActivityStub);

    if !profile.gradle.substitutions.is_empty() {
        for file in &profile.paths.gradle_files {
            steps.push(Step::GradleFlags(file.clone()));
        }
    }
    if !profile.gradle.dependencies.is_empty() {
        for file in &profile.paths.dependency_files {
            steps.push(Step::GradleDeps(file.clone()));
        }
    }

    if let Some(annotations) = &profile.annotations {
        for target in &annotations.targets {
            steps.push(Step::Annotate(target.clone()));
        }
    }

    steps
}

/// Apply a profile to a project tree
///
/// # Arguments
///
/// * `profile` - The variant profile to apply
/// * `project_root` - Root directory of the Unity project or Gradle export
/// * `editor_version` - Normalized editor version of the project (e.g., "2021.3.44")
///
/// # Returns
///
/// A vector of (step id, result) pairs, one per derived step
pub fn apply_profile(
    profile: &BuildProfile,
    project_root: &Path,
    editor_version: &str,
) -> Vec<(String, Result<PatchResult, ApplicationError>)> {
    run_profile(profile, project_root, editor_version, true)
}

/// Check step status without mutating the project.
///
/// This mirrors `apply_profile` result semantics (`Applied` means "would
/// apply"), with every write withheld.
pub fn check_profile(
    profile: &BuildProfile,
    project_root: &Path,
    editor_version: &str,
) -> Vec<(String, Result<PatchResult, ApplicationError>)> {
    run_profile(profile, project_root, editor_version, false)
}

fn run_profile(
    profile: &BuildProfile,
    project_root: &Path,
    editor_version: &str,
    write: bool,
) -> Vec<(String, Result<PatchResult, ApplicationError>)> {
    let steps = plan_steps(profile);

    if let Err(mut issues) = profile.validate() {
        // The usual malformed inject profile forgot its class name; if the
        // staging directory already declares one, say so.
        if profile.mode == PackageMode::Inject && profile.activity.class_name.trim().is_empty() {
            let staging = project_root.join(&profile.paths.staging_dir);
            if let Some(found) = source::detect_class_name(&staging) {
                issues.push_note(format!(
                    "staging declares class {found}; set [activity] class_name to adopt it"
                ));
            }
        }
        return vec![(
            "profile".to_string(),
            Err(ApplicationError::Validation(issues)),
        )];
    }

    match matches_requirement(
        editor_version,
        profile.meta.editor_version_range.as_deref(),
    ) {
        Ok(true) => {}
        Ok(false) => {
            let req = profile
                .meta
                .editor_version_range
                .as_deref()
                .unwrap_or("")
                .trim();
            let reason = if req.is_empty() {
                format!("editor version {editor_version} does not satisfy the profile version constraints")
            } else {
                format!(
                    "editor version {editor_version} does not satisfy editor_version_range {req}"
                )
            };
            return steps
                .iter()
                .map(|step| {
                    (
                        step.id(),
                        Ok(PatchResult::Skipped {
                            reason: reason.clone(),
                        }),
                    )
                })
                .collect();
        }
        Err(e) => {
            return steps
                .iter()
                .map(|step| (step.id(), Err(ApplicationError::Version(e.clone()))))
                .collect();
        }
    }

    let guard = match ProjectGuard::new(project_root) {
        Ok(guard) => guard,
        Err(e) => return vec![("project".to_string(), Err(ApplicationError::Safety(e)))],
    };

    let mut results = manifest_group(profile, project_root, &guard, write);
    for step in &steps {
        match step {
            // Produced by the manifest group above.
            Step::ManifestActivity | Step::ManifestRename | Step::ManifestExport => {}
            other => results.push((other.id(), run_step(other, profile, project_root, &guard, write))),
        }
    }
    results
}

/// All manifest passes share one read and one write. Each pass plans against
/// the document the previous pass produced, so check mode sees the same
/// sequence a real apply would, and an idempotent rerun stays byte-identical.
fn manifest_group(
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
) -> Vec<(String, Result<PatchResult, ApplicationError>)> {
    let mut passes = vec![(Step::ManifestActivity.id(), ManifestPass::Activity)];
    if profile.mode == PackageMode::Inject {
        passes.push((Step::ManifestRename.id(), ManifestPass::Rename));
        passes.push((Step::ManifestExport.id(), ManifestPass::Export));
    }

    let Some(path) = first_existing_manifest(profile, root) else {
        let reason = format!(
            "no manifest found; tried {}",
            profile.paths.manifest_candidates.join(", ")
        );
        return passes
            .into_iter()
            .map(|(id, _)| {
                (
                    id,
                    Ok(PatchResult::Skipped {
                        reason: reason.clone(),
                    }),
                )
            })
            .collect();
    };

    let setup = guard
        .validate_path(&path)
        .map_err(ApplicationError::from)
        .and_then(|checked| {
            fs::read_to_string(&checked)
                .map_err(|source| ApplicationError::Io {
                    path: checked.clone(),
                    source,
                })
                .map(|content| (checked, content))
        });
    let (checked, original) = match setup {
        Ok(loaded) => loaded,
        Err(e) => {
            let mut first = Some(e);
            return passes
                .into_iter()
                .map(|(id, _)| match first.take() {
                    Some(e) => (id, Err(e)),
                    None => (
                        id,
                        Ok(PatchResult::Skipped {
                            reason: "earlier manifest step failed".to_string(),
                        }),
                    ),
                })
                .collect();
        }
    };

    let mut doc = original.clone();
    let mut rows = Vec::new();

    for (id, pass) in passes {
        let plan = match pass {
            ManifestPass::Activity => plan_activity_patch(&doc, profile.mode, &profile.activity),
            ManifestPass::Rename => plan_rename(&doc, &profile.activity),
            ManifestPass::Export => plan_export_adjustments(&doc),
        };
        let plan = match plan {
            Ok(plan) => plan,
            Err(e) => {
                rows.push((
                    id,
                    Err(ApplicationError::Pattern {
                        file: checked.clone(),
                        reason: e.to_string(),
                    }),
                ));
                continue;
            }
        };

        match plan {
            PatchPlan::AlreadyApplied(_) => {
                rows.push((
                    id,
                    Ok(PatchResult::AlreadyApplied {
                        file: checked.clone(),
                    }),
                ));
            }
            PatchPlan::NoOp(reason) => {
                rows.push((id, Ok(PatchResult::Skipped { reason })));
            }
            PatchPlan::Edits(edits) => match apply_all(&doc, edits) {
                Ok((patched, results)) => {
                    if let Err(violation) =
                        check_manifest(&doc, &patched, profile.mode, &profile.activity)
                    {
                        rows.push((
                            id,
                            Ok(PatchResult::Failed {
                                file: checked.clone(),
                                reason: violation.to_string(),
                            }),
                        ));
                        continue;
                    }
                    let outcome = if results.iter().any(EditResult::is_applied) {
                        PatchResult::Applied {
                            file: checked.clone(),
                        }
                    } else {
                        PatchResult::AlreadyApplied {
                            file: checked.clone(),
                        }
                    };
                    doc = patched;
                    rows.push((id, Ok(outcome)));
                }
                Err(e) => {
                    rows.push((id, Err(ApplicationError::Edit(e))));
                }
            },
        }
    }

    if write && doc != original {
        let written = guard
            .revalidate(&checked)
            .map_err(ApplicationError::from)
            .and_then(|target| write_document(&target, &doc).map_err(ApplicationError::from));
        if let Err(e) = written {
            let reason = format!("write failed: {e}");
            for row in rows.iter_mut() {
                if matches!(row.1, Ok(PatchResult::Applied { .. })) {
                    row.1 = Ok(PatchResult::Failed {
                        file: checked.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }
    }

    rows
}

enum ManifestPass {
    Activity,
    Rename,
    Export,
}

fn run_step(
    step: &Step,
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
) -> Result<PatchResult, ApplicationError> {
    match step {
        Step::SourceHook => hook_step(profile, root, guard, write),
        Step::StageSources => stage_step(profile, root, guard, write),
        Step::ActivityStub => stub_step(profile, root, guard, write),
        Step::GradleFlags(rel) => gradle_flags_step(profile, root, guard, write, rel),
        Step::GradleDeps(rel) => gradle_deps_step(profile, root, guard, write, rel),
        Step::Annotate(rel) => annotate_step(profile, root, guard, write, rel),
        Step::ManifestActivity | Step::ManifestRename | Step::ManifestExport => {
            Ok(PatchResult::Skipped {
                reason: "manifest steps run as a group".to_string(),
            })
        }
    }
}

fn hook_step(
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
) -> Result<PatchResult, ApplicationError> {
    let Some(hook) = profile.hook.as_ref() else {
        return Ok(PatchResult::Skipped {
            reason: "no hook configured".to_string(),
        });
    };

    // Unlike manifests, a missing player source means the export itself is
    // broken; proceeding would ship a B-side package without its hook.
    let path = root.join(&profile.paths.player_source);
    if !path.is_file() {
        return Err(ApplicationError::MissingTargetFile { path });
    }

    let checked = guard.validate_path(&path)?;
    let content = fs::read_to_string(&checked).map_err(|source| ApplicationError::Io {
        path: checked.clone(),
        source,
    })?;

    let plan = source::plan_hook_injection(&content, hook).map_err(|e| {
        ApplicationError::Pattern {
            file: checked.clone(),
            reason: e.to_string(),
        }
    })?;

    match plan {
        PatchPlan::AlreadyApplied(_) => Ok(PatchResult::AlreadyApplied { file: checked }),
        PatchPlan::NoOp(reason) => Ok(PatchResult::Skipped { reason }),
        PatchPlan::Edits(edits) => {
            let (patched, results) = apply_all(&content, edits)?;

            if let Err(violation) = check_source(&content, &patched, &hook.name) {
                return Ok(PatchResult::Failed {
                    file: checked,
                    reason: violation.to_string(),
                });
            }
            if !results.iter().any(EditResult::is_applied) {
                return Ok(PatchResult::AlreadyApplied { file: checked });
            }
            if write {
                let target = guard.revalidate(&checked)?;
                write_document(&target, &patched)?;
            }
            Ok(PatchResult::Applied { file: checked })
        }
    }
}

fn stage_step(
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
) -> Result<PatchResult, ApplicationError> {
    let staging = root.join(&profile.paths.staging_dir);
    if !staging.is_dir() {
        return Ok(PatchResult::Skipped {
            reason: format!("no staging directory at {}", profile.paths.staging_dir),
        });
    }

    let staging = guard.validate_path(&staging)?;
    let dest = guard.validate_new_file(root.join(&profile.paths.java_out))?;

    let staged = if write {
        source::stage_sources(&staging, &dest)
    } else {
        source::preview_sources(&staging, &dest)
    }
    .map_err(|e| stub_io(&staging, e))?;

    if staged.is_empty() {
        return Ok(PatchResult::Skipped {
            reason: "staging directory has no .java sources".to_string(),
        });
    }
    let copied = staged
        .iter()
        .filter(|file| matches!(file, StagedFile::Copied(_)))
        .count();
    if copied == 0 {
        Ok(PatchResult::AlreadyApplied { file: dest })
    } else {
        Ok(PatchResult::Applied { file: dest })
    }
}

fn stub_step(
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
) -> Result<PatchResult, ApplicationError> {
    let class_name = profile.activity.class_name.trim();
    if class_name.is_empty() {
        return Ok(PatchResult::Skipped {
            reason: "no activity class name configured".to_string(),
        });
    }

    let dest = guard.validate_new_file(root.join(&profile.paths.java_out))?;
    let stub_path = dest.join(format!("{class_name}.java"));
    let package = &profile.activity.package;

    match profile.mode {
        PackageMode::Inject => {
            // A staged source and a previous stub both satisfy presence.
            if stub_path.is_file() {
                return Ok(PatchResult::AlreadyApplied { file: stub_path });
            }
            if write {
                source::ensure_stub(&dest, package, class_name).map_err(|e| stub_io(&dest, e))?;
            }
            Ok(PatchResult::Applied { file: stub_path })
        }
        PackageMode::Clean => {
            if write {
                match source::remove_stub(&dest, package, class_name)
                    .map_err(|e| stub_io(&dest, e))?
                {
                    StubRemoval::Removed => Ok(PatchResult::Applied { file: stub_path }),
                    StubRemoval::Absent => Ok(PatchResult::AlreadyApplied { file: stub_path }),
                    StubRemoval::KeptForeign => Ok(PatchResult::Skipped {
                        reason: format!(
                            "{} is not the generated stub; left alone",
                            stub_path.display()
                        ),
                    }),
                }
            } else if !stub_path.is_file() {
                Ok(PatchResult::AlreadyApplied { file: stub_path })
            } else {
                let content =
                    fs::read_to_string(&stub_path).map_err(|source| ApplicationError::Io {
                        path: stub_path.clone(),
                        source,
                    })?;
                if content == source::render_stub(package, class_name) {
                    Ok(PatchResult::Applied { file: stub_path })
                } else {
                    Ok(PatchResult::Skipped {
                        reason: format!(
                            "{} is not the generated stub; left alone",
                            stub_path.display()
                        ),
                    })
                }
            }
        }
    }
}

fn gradle_flags_step(
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
    rel: &str,
) -> Result<PatchResult, ApplicationError> {
    let path = root.join(rel);
    if !path.is_file() {
        return Ok(PatchResult::Skipped {
            reason: format!("{rel} not present"),
        });
    }

    let checked = guard.validate_path(&path)?;
    let content = fs::read_to_string(&checked).map_err(|source| ApplicationError::Io {
        path: checked.clone(),
        source,
    })?;

    let (patched, outcomes) = gradle::apply_substitutions(&content, &profile.gradle.substitutions);
    if outcomes.iter().any(GradleOutcome::is_applied) {
        if write {
            let target = guard.revalidate(&checked)?;
            write_document(&target, &patched)?;
        }
        Ok(PatchResult::Applied { file: checked })
    } else if outcomes
        .iter()
        .any(|outcome| matches!(outcome, GradleOutcome::AlreadyApplied))
    {
        Ok(PatchResult::AlreadyApplied { file: checked })
    } else {
        Ok(PatchResult::Skipped {
            reason: format!("no substitution token present in {rel}"),
        })
    }
}

fn gradle_deps_step(
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
    rel: &str,
) -> Result<PatchResult, ApplicationError> {
    let path = root.join(rel);
    if !path.is_file() {
        return Ok(PatchResult::Skipped {
            reason: format!("{rel} not present"),
        });
    }

    let checked = guard.validate_path(&path)?;
    let content = fs::read_to_string(&checked).map_err(|source| ApplicationError::Io {
        path: checked.clone(),
        source,
    })?;

    let mut text = content;
    let mut applied = 0usize;
    let mut already = 0usize;
    for line in &profile.gradle.dependencies {
        let (next, outcome) = gradle::apply_dependency(&text, line);
        text = next;
        match outcome {
            GradleOutcome::Applied { .. } => applied += 1,
            GradleOutcome::AlreadyApplied => already += 1,
            GradleOutcome::NotFound => {}
        }
    }

    if applied > 0 {
        if write {
            let target = guard.revalidate(&checked)?;
            write_document(&target, &text)?;
        }
        Ok(PatchResult::Applied { file: checked })
    } else if already > 0 {
        Ok(PatchResult::AlreadyApplied { file: checked })
    } else {
        Ok(PatchResult::Skipped {
            reason: format!("no dependencies block in {rel}"),
        })
    }
}

fn annotate_step(
    profile: &BuildProfile,
    root: &Path,
    guard: &ProjectGuard,
    write: bool,
    rel: &str,
) -> Result<PatchResult, ApplicationError> {
    let Some(annotations) = profile.annotations.as_ref() else {
        return Ok(PatchResult::Skipped {
            reason: "no annotations configured".to_string(),
        });
    };

    let target = root.join(rel);
    if !target.exists() {
        return Ok(PatchResult::Skipped {
            reason: format!("annotation target {rel} not present"),
        });
    }

    let files: Vec<PathBuf> = if target.is_dir() {
        WalkDir::new(&target)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension().and_then(|e| e.to_str()) == Some("cs"))
            .map(|entry| entry.into_path())
            .collect()
    } else {
        vec![target.clone()]
    };

    let mut inserted_total = 0;
    for file in files {
        let checked = guard.validate_path(&file)?;
        let content = fs::read_to_string(&checked).map_err(|source| ApplicationError::Io {
            path: checked.clone(),
            source,
        })?;
        let (patched, inserted) = annotate::apply_marker(&content, &annotations.marker).map_err(
            |e| ApplicationError::Pattern {
                file: checked.clone(),
                reason: e.to_string(),
            },
        )?;
        if inserted > 0 {
            inserted_total += inserted;
            if write {
                let target = guard.revalidate(&checked)?;
                write_document(&target, &patched)?;
            }
        }
    }

    if inserted_total > 0 {
        Ok(PatchResult::Applied { file: target })
    } else {
        Ok(PatchResult::AlreadyApplied { file: target })
    }
}

fn first_existing_manifest(profile: &BuildProfile, root: &Path) -> Option<PathBuf> {
    profile
        .paths
        .manifest_candidates
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|path| path.is_file())
}

fn stub_io(path: &Path, e: StubError) -> ApplicationError {
    match e {
        StubError::Io(source) => ApplicationError::Io {
            path: path.to_path_buf(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ActivityConfig, GradleConfig, HookSpec, Metadata, Substitution};

    fn named(name: &str) -> Metadata {
        Metadata {
            name: name.to_string(),
            ..Metadata::default()
        }
    }

    fn inject_profile() -> BuildProfile {
        BuildProfile {
            meta: named("bside"),
            mode: PackageMode::Inject,
            activity: ActivityConfig {
                class_name: "FooActivity".to_string(),
                ..ActivityConfig::default()
            },
            hook: Some(HookSpec {
                name: "getInstallReferrer".to_string(),
                body: "    private void getInstallReferrer() {\n    }".to_string(),
                ..HookSpec::default()
            }),
            gradle: GradleConfig {
                substitutions: vec![Substitution {
                    find: "minifyEnabled **MINIFY_RELEASE**".to_string(),
                    replace: "minifyEnabled true".to_string(),
                }],
                dependencies: vec![
                    "implementation 'com.android.installreferrer:installreferrer:2.2'".to_string(),
                ],
            },
            ..BuildProfile::default()
        }
    }

    #[test]
    fn test_step_ids_for_clean_defaults() {
        let profile = BuildProfile {
            meta: named("white"),
            ..BuildProfile::default()
        };
        let ids: Vec<String> = plan_steps(&profile).iter().map(Step::id).collect();
        assert_eq!(ids, vec!["manifest-activity", "activity-stub"]);
    }

    #[test]
    fn test_step_ids_for_inject_profile() {
        let ids: Vec<String> = plan_steps(&inject_profile()).iter().map(Step::id).collect();
        assert_eq!(
            ids,
            vec![
                "manifest-activity",
                "manifest-rename",
                "manifest-export",
                "source-hook",
                "stage-sources",
                "activity-stub",
                "gradle-flags:launcher/build.gradle",
                "gradle-flags:unityLibrary/build.gradle",
                "gradle-flags:Assets/Plugins/Android/launcherTemplate.gradle",
                "gradle-flags:Assets/Plugins/Android/mainTemplate.gradle",
                "gradle-deps:unityLibrary/build.gradle",
                "gradle-deps:Assets/Plugins/Android/mainTemplate.gradle",
            ]
        );
    }

    #[test]
    fn test_version_gate_skips_every_step() {
        let mut profile = inject_profile();
        profile.meta.editor_version_range = Some(">=2021.3".to_string());

        let temp = tempfile::tempdir().unwrap();
        let results = apply_profile(&profile, temp.path(), "2019.4.40");

        assert_eq!(results.len(), plan_steps(&profile).len());
        for (_, result) in results {
            assert!(matches!(result, Ok(PatchResult::Skipped { .. })));
        }
    }

    #[test]
    fn test_unparseable_version_fans_out_as_error() {
        let mut profile = inject_profile();
        profile.meta.editor_version_range = Some(">=2021.3".to_string());

        let temp = tempfile::tempdir().unwrap();
        let results = apply_profile(&profile, temp.path(), "not-a-version");

        assert!(!results.is_empty());
        for (_, result) in results {
            assert!(matches!(result, Err(ApplicationError::Version(_))));
        }
    }

    #[test]
    fn test_malformed_profile_rejected_before_any_step() {
        let mut profile = inject_profile();
        profile.activity.class_name.clear();

        let temp = tempfile::tempdir().unwrap();
        let results = apply_profile(&profile, temp.path(), "2021.3.44");

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "profile");
        assert!(matches!(
            results[0].1,
            Err(ApplicationError::Validation(_))
        ));
    }

    #[test]
    fn test_class_name_hint_from_staging() {
        let mut profile = inject_profile();
        profile.activity.class_name.clear();

        let temp = tempfile::tempdir().unwrap();
        let staging = temp.path().join("staging");
        fs::create_dir_all(&staging).unwrap();
        fs::write(staging.join("BarActivity.java"), "class BarActivity {}").unwrap();

        let results = check_profile(&profile, temp.path(), "2021.3.44");
        let Err(ApplicationError::Validation(issues)) = &results[0].1 else {
            panic!("expected validation error, got {:?}", results[0].1);
        };
        assert!(issues.to_string().contains("BarActivity"));
    }

    #[test]
    fn test_missing_player_source_is_fatal_in_check_mode() {
        let profile = inject_profile();
        let temp = tempfile::tempdir().unwrap();

        let results = check_profile(&profile, temp.path(), "2021.3.44");
        let hook = results
            .iter()
            .find(|(id, _)| id == "source-hook")
            .map(|(_, result)| result);
        assert!(matches!(
            hook,
            Some(Err(ApplicationError::MissingTargetFile { .. }))
        ));
    }

    #[test]
    fn test_check_mode_threads_manifest_passes() {
        // A pristine export: inject check must report the rename pass against
        // the document the activity pass would have produced, not the
        // original.
        let profile = inject_profile();
        let temp = tempfile::tempdir().unwrap();
        let manifest_dir = temp.path().join("unityLibrary/src/main");
        fs::create_dir_all(&manifest_dir).unwrap();
        fs::write(
            manifest_dir.join("AndroidManifest.xml"),
            "<manifest>\n  <application>\n    <activity android:name=\"com.unity3d.player.UnityPlayerActivity\" android:launchMode=\"singleTask\" />\n  </application>\n</manifest>\n",
        )
        .unwrap();

        let results = check_profile(&profile, temp.path(), "2021.3.44");
        let by_id = |id: &str| {
            results
                .iter()
                .find(|(step, _)| step == id)
                .map(|(_, result)| result)
        };

        assert!(matches!(
            by_id("manifest-activity"),
            Some(Ok(PatchResult::Applied { .. }))
        ));
        // Export demotes singleTask; it must not fail on a missing fragment.
        assert!(matches!(
            by_id("manifest-export"),
            Some(Ok(PatchResult::Applied { .. }))
        ));
        // Nothing was written.
        let manifest = fs::read_to_string(manifest_dir.join("AndroidManifest.xml")).unwrap();
        assert!(!manifest.contains("FooActivity"));
        assert!(manifest.contains("singleTask"));
    }

    #[test]
    fn test_patch_result_display() {
        let applied = PatchResult::Applied {
            file: PathBuf::from("/tmp/AndroidManifest.xml"),
        };
        assert!(applied.to_string().contains("Applied"));

        let already = PatchResult::AlreadyApplied {
            file: PathBuf::from("/tmp/AndroidManifest.xml"),
        };
        assert!(already.to_string().contains("Already applied"));

        let skipped = PatchResult::Skipped {
            reason: "no manifest found".to_string(),
        };
        assert!(skipped.to_string().contains("Skipped"));

        let failed = PatchResult::Failed {
            file: PathBuf::from("/tmp/AndroidManifest.xml"),
            reason: "fragment count".to_string(),
        };
        assert!(failed.to_string().contains("Failed"));
    }
}
