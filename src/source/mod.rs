//! Java source patching: hook injection into the player activity and
//! lifecycle management of the B-side activity stub.

pub mod hook;
pub mod stub;

pub use hook::{plan_hook_injection, SourceError};
pub use stub::{
    detect_class_name, ensure_stub, preview_sources, remove_stub, render_stub, stage_sources,
    StagedFile, StubError, StubRemoval,
};
