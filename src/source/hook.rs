//! Hook injection into the player activity source.
//!
//! The idempotence guard is the literal `name();`: a document that already
//! invokes the hook receives no call-site or body edits, so a hand-wired
//! call stays exactly as found. Otherwise the call is inserted after the
//! first matching anchor statement, or after the entry method's opening
//! brace when no anchor matches, and the body goes before the final closing
//! brace unless a `void name(` declaration already exists. Import lines
//! carry an independent guard: each is inserted after the package
//! declaration only when absent verbatim.

use thiserror::Error;

use crate::cache;
use crate::config::schema::HookSpec;
use crate::edit::{Edit, PatchPlan};

/// First `package x.y.z;` declaration in the document.
const PACKAGE_LINE_PATTERN: &str = r"(?m)^package\s+[A-Za-z_][A-Za-z0-9_.]*\s*;";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to compile source pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Plan the hook injection for one source document.
///
/// Pattern misses are reported as `NoOp` with a closest-line hint so a typo
/// in a profile anchor is findable from the step report; only the workflow
/// layer decides whether a missing FILE is fatal.
pub fn plan_hook_injection(document: &str, spec: &HookSpec) -> Result<PatchPlan, SourceError> {
    let mut edits = Vec::new();
    let mut misses = Vec::new();

    let invocation = format!("{}();", spec.name);

    if !document.contains(&invocation) {
        match call_site_edit(document, spec) {
            Some(edit) => edits.push(edit),
            None => misses.push(call_site_miss(document, spec)),
        }

        if !declares_hook(document, &spec.name)? {
            match body_edit(document, &spec.body) {
                Some(edit) => edits.push(edit),
                None => misses.push("no closing brace to hold the hook body".to_string()),
            }
        }
    }

    let missing: Vec<&String> = spec
        .imports
        .iter()
        .filter(|line| !document.contains(line.as_str()))
        .collect();
    if !missing.is_empty() {
        match package_line_end(document)? {
            Some(offset) => {
                let block: String = missing.iter().map(|line| format!("\n{line}")).collect();
                edits.push(Edit::insert_at(offset, block));
            }
            None => misses.push("no package declaration to anchor imports".to_string()),
        }
    }

    if edits.is_empty() {
        if misses.is_empty() {
            return Ok(PatchPlan::AlreadyApplied(
                "hook invocation and imports already present".to_string(),
            ));
        }
        return Ok(PatchPlan::NoOp(misses.join("; ")));
    }
    Ok(PatchPlan::Edits(edits))
}

/// Insert `name();` after the first matching anchor, or after the entry
/// method's opening brace when no anchor is present in the document.
fn call_site_edit(document: &str, spec: &HookSpec) -> Option<Edit> {
    for anchor in spec.anchors.iter().filter(|a| !a.is_empty()) {
        if let Some(offset) = document.find(anchor.as_str()) {
            let indent = line_indent(document, offset);
            return Some(Edit::insert_at(
                offset + anchor.len(),
                format!("\n{indent}{}();", spec.name),
            ));
        }
    }

    if spec.entry_method.is_empty() {
        return None;
    }
    let signature = document.find(&spec.entry_method)?;
    let brace = signature + document[signature..].find('{')?;
    let indent = line_indent(document, signature);
    Some(Edit::insert_at(
        brace + 1,
        format!("\n{indent}    {}();", spec.name),
    ))
}

/// True when a `void name(` declaration already exists.
fn declares_hook(document: &str, name: &str) -> Result<bool, SourceError> {
    let re = cache::get_or_compile(&format!(r"void\s+{}\s*\(", regex::escape(name)))?;
    Ok(re.is_match(document))
}

/// Insert the hook body before the document's final closing brace,
/// normalized to sit on its own lines.
fn body_edit(document: &str, body: &str) -> Option<Edit> {
    let last_brace = document.rfind('}')?;
    let mut text = body.trim_end().to_string();
    if !text.starts_with('\n') {
        text.insert(0, '\n');
    }
    text.push('\n');
    Some(Edit::insert_at(last_brace, text))
}

fn package_line_end(document: &str) -> Result<Option<usize>, SourceError> {
    let re = cache::get_or_compile(PACKAGE_LINE_PATTERN)?;
    Ok(re.find(document).map(|m| m.end()))
}

fn line_indent(document: &str, offset: usize) -> String {
    let line_start = document[..offset].rfind('\n').map_or(0, |i| i + 1);
    document[line_start..]
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .collect()
}

/// Miss report naming the most similar existing line, so profile typos in
/// anchor statements are findable without opening the target file.
fn call_site_miss(document: &str, spec: &HookSpec) -> String {
    let needle = spec
        .anchors
        .first()
        .map(String::as_str)
        .unwrap_or(spec.entry_method.as_str());

    let closest = document
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .max_by(|a, b| {
            let sim_a = strsim::normalized_levenshtein(a, needle);
            let sim_b = strsim::normalized_levenshtein(b, needle);
            sim_a.partial_cmp(&sim_b).unwrap_or(std::cmp::Ordering::Equal)
        });

    match closest {
        Some(line) => format!("no anchor statement matched (closest line: {line:?})"),
        None => "no anchor statement matched in empty document".to_string(),
    }
}
