pub mod applicator;
pub mod import;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{apply_profile, check_profile, ApplicationError, PatchResult};
pub use import::{parse_row, ImportError, RowImport};
pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{
    ActivityConfig, AnnotationConfig, AppIdentity, BuildProfile, GradleConfig, HookSpec, Metadata,
    PackageMode, ProjectPaths, Substitution, ValidationError, ValidationIssue,
};
pub use version::{matches_requirement, normalize_editor_version, VersionError};
