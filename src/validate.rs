//! Structural checks run between planning and writing.
//!
//! A planner only reasons about the spans it produced; these checks look at
//! the whole mutated document and refuse the write when an invariant does
//! not hold. Like the edit layer, they compare before and after: only
//! violations the patch would introduce block it, never damage the document
//! already carried.

use thiserror::Error;

use crate::config::schema::{ActivityConfig, PackageMode};
use crate::manifest::fragment;

const APPLICATION_CLOSE: &str = "</application>";

#[derive(Error, Debug)]
pub enum StructureError {
    #[error("Expected {expected} marker fragment(s) after patch, found {found}")]
    FragmentCount { expected: usize, found: usize },

    #[error("Patch dropped the </application> close tag")]
    LostApplicationClose,

    #[error("Brace balance changed from {before} to {after}")]
    BraceImbalance { before: i64, after: i64 },

    #[error("Hook call {call:?} appears {count} times, expected at most 1")]
    RepeatedHookCall { call: String, count: usize },

    #[error("Failed to compile structure pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Check a patched manifest: the fragment count must match the mode, and
/// the application element must still close if it closed before.
pub fn check_manifest(
    original: &str,
    patched: &str,
    mode: PackageMode,
    config: &ActivityConfig,
) -> Result<(), StructureError> {
    let expected = match mode {
        PackageMode::Clean => 0,
        PackageMode::Inject => 1,
    };
    let found = fragment::find_all(patched, config)?.len();
    if found != expected {
        return Err(StructureError::FragmentCount { expected, found });
    }

    if original.contains(APPLICATION_CLOSE) && !patched.contains(APPLICATION_CLOSE) {
        return Err(StructureError::LostApplicationClose);
    }

    Ok(())
}

/// Check a patched source document: the injected text must not change the
/// brace balance, and the call guard literal must occur at most once.
pub fn check_source(original: &str, patched: &str, hook_name: &str) -> Result<(), StructureError> {
    let before = brace_balance(original);
    let after = brace_balance(patched);
    if before != after {
        return Err(StructureError::BraceImbalance { before, after });
    }

    // Same literal the injection guard tests, so guard and check agree.
    let call = format!("{hook_name}();");
    let count = patched.matches(&call).count();
    if count > 1 {
        return Err(StructureError::RepeatedHookCall { call, count });
    }

    Ok(())
}

fn brace_balance(document: &str) -> i64 {
    let open = document.bytes().filter(|b| *b == b'{').count() as i64;
    let close = document.bytes().filter(|b| *b == b'}').count() as i64;
    open - close
}
