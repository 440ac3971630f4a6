//! Variant Patcher: idempotent build-variant patching for Unity Android exports
//!
//! A patching tool that reconciles an exported Gradle project (or the Assets
//! templates that feed one) with a declared build variant: a clean white
//! package, or a B-side package carrying its secondary activity, install
//! referrer hook, and gradle adjustments.
//!
//! # Architecture
//!
//! All text operations compile down to a single primitive: [`Edit`], a
//! verified byte-span replacement applied in batches against an in-memory
//! document. Intelligence lives in the planners (manifest, source, gradle),
//! not in the application logic; plans are plain values, so check mode is
//! the same code path with writes withheld.
//!
//! # Safety
//!
//! - All edits verify expected before-text before applying
//! - Atomic file writes (tempfile + fsync + rename)
//! - Project boundary enforcement
//! - Structural checks between planning and writing
//! - Idempotent operations: a second run is byte-identical
//!
//! # Example
//!
//! ```
//! use variant_patcher::edit::{apply_all, Edit};
//!
//! let manifest = "<application>\n</application>\n";
//! let edit = Edit::insert_at(14, "  <activity />\n");
//!
//! let (patched, results) = apply_all(manifest, vec![edit]).unwrap();
//! assert!(patched.contains("<activity />"));
//! assert!(results[0].is_applied());
//! ```

pub mod annotate;
pub mod cache;
pub mod config;
pub mod edit;
pub mod gradle;
pub mod manifest;
pub mod safety;
pub mod source;
pub mod validate;

// Re-exports
pub use config::{
    apply_profile, check_profile, load_from_path, load_from_str, matches_requirement,
    ApplicationError, BuildProfile, ConfigError, PackageMode, PatchResult, VersionError,
};
pub use edit::{
    apply_all, write_document, Edit, EditError, EditResult, EditVerification, PatchPlan,
};
pub use safety::{ProjectGuard, SafetyError};
pub use validate::{check_manifest, check_source, StructureError};
