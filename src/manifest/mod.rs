//! Android manifest patching.
//!
//! The manifest is treated as text, not as a DOM: every operation is an
//! anchored, non-greedy pattern over the raw document, compiled down to
//! byte-span edits. This keeps untouched regions byte-identical, which is
//! what makes reapplication and diff review trustworthy.

pub mod fragment;
pub mod patcher;

pub use fragment::DEFAULT_PLAYER_ACTIVITY;
pub use patcher::{
    plan_activity_patch, plan_export_adjustments, plan_rename, ManifestError,
};
