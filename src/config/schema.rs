use serde::Deserialize;
use std::fmt;

/// Recreation-suppression tokens the stock templates put on the secondary
/// activity; profiles override the list when a variant needs less.
pub const DEFAULT_CONFIG_CHANGES: [&str; 15] = [
    "mcc",
    "mnc",
    "locale",
    "touchscreen",
    "keyboard",
    "keyboardHidden",
    "navigation",
    "orientation",
    "screenLayout",
    "uiMode",
    "screenSize",
    "smallestScreenSize",
    "fontScale",
    "layoutDirection",
    "density",
];

/// Which variant the project tree should end up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageMode {
    /// White package: the secondary activity must be absent.
    #[default]
    Clean,
    /// B-side package: the secondary activity must be present, exactly once.
    Inject,
}

/// The whole TOML-declared variant description. One profile per run; modes
/// are mutually exclusive, so profiles never stack.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct BuildProfile {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub mode: PackageMode,
    #[serde(default)]
    pub app: AppIdentity,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub hook: Option<HookSpec>,
    #[serde(default)]
    pub gradle: GradleConfig,
    #[serde(default)]
    pub annotations: Option<AnnotationConfig>,
    #[serde(default)]
    pub paths: ProjectPaths,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Semver requirement gating the whole profile against the editor
    /// version that produced the project, e.g. ">=2021.3".
    #[serde(default)]
    pub editor_version_range: Option<String>,
}

/// App identity carried for reporting and spreadsheet import. Never drives
/// engine player settings; those belong to the host.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct AppIdentity {
    pub identifier: String,
    pub display_name: String,
    pub version: String,
    pub version_code: u32,
    pub portrait: bool,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            identifier: String::new(),
            display_name: String::new(),
            version: "1.0".to_string(),
            version_code: 1,
            portrait: true,
        }
    }
}

/// The secondary activity as it should appear in the manifest.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ActivityConfig {
    /// Simple class name, e.g. `FooActivity`. Required in inject mode.
    pub class_name: String,
    pub package: String,
    /// Ordered tokens, serialized pipe-delimited.
    pub config_changes: Vec<String>,
    pub exported: bool,
    pub hardware_accelerated: bool,
    /// Marker theme; doubles as the fragment detection anchor.
    pub theme: String,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            class_name: String::new(),
            package: "com.unity3d.player".to_string(),
            config_changes: DEFAULT_CONFIG_CHANGES.iter().map(|s| s.to_string()).collect(),
            exported: false,
            hardware_accelerated: true,
            theme: "@android:style/Theme.Light.NoTitleBar".to_string(),
        }
    }
}

impl ActivityConfig {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.package, self.class_name)
    }
}

/// A hook to inject into the player activity source.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct HookSpec {
    /// Bare method name; `name();` is both the planted call and the
    /// idempotence guard.
    pub name: String,
    /// Full method text planted before the document's final closing brace.
    pub body: String,
    /// Anchor statements tried in order; first match wins. Defaults cover
    /// the frame-layout player template and the classic one.
    pub anchors: Vec<String>,
    /// Entry-point signature used when no anchor matches; the call is
    /// planted after its opening brace.
    pub entry_method: String,
    /// Import lines required by the body; inserted verbatim when missing.
    pub imports: Vec<String>,
}

impl Default for HookSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            body: String::new(),
            anchors: vec![
                "mUnityPlayer.getFrameLayout().requestFocus();".to_string(),
                "mUnityPlayer.requestFocus();".to_string(),
            ],
            entry_method: "protected void onCreate(Bundle savedInstanceState)".to_string(),
            imports: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct GradleConfig {
    pub substitutions: Vec<Substitution>,
    pub dependencies: Vec<String>,
}

/// One ordered literal substitution pair.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub find: String,
    pub replace: String,
}

/// Marker attribute insertion over C# sources.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AnnotationConfig {
    pub marker: String,
    /// Project-relative files or directories; directories are walked for
    /// `.cs` files.
    pub targets: Vec<String>,
}

/// Project-relative target paths. Defaults cover both a pre-export Unity
/// project (Assets templates) and an exported Gradle tree; steps skip paths
/// that do not exist.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectPaths {
    /// Manifest candidates; the first existing file wins.
    pub manifest_candidates: Vec<String>,
    pub player_source: String,
    /// Substitution targets.
    pub gradle_files: Vec<String>,
    /// Dependency insertion targets.
    pub dependency_files: Vec<String>,
    /// Directory of prebuilt `.java` sources copied in verbatim.
    pub staging_dir: String,
    /// Where generated stubs and staged sources land.
    pub java_out: String,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            manifest_candidates: vec![
                "unityLibrary/src/main/AndroidManifest.xml".to_string(),
                "unityLibrary/src/main/manifests/AndroidManifest.xml".to_string(),
                "Assets/Plugins/Android/AndroidManifest.xml".to_string(),
            ],
            player_source: "unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"
                .to_string(),
            gradle_files: vec![
                "launcher/build.gradle".to_string(),
                "unityLibrary/build.gradle".to_string(),
                "Assets/Plugins/Android/launcherTemplate.gradle".to_string(),
                "Assets/Plugins/Android/mainTemplate.gradle".to_string(),
            ],
            dependency_files: vec![
                "unityLibrary/build.gradle".to_string(),
                "Assets/Plugins/Android/mainTemplate.gradle".to_string(),
            ],
            staging_dir: "staging".to_string(),
            java_out: "unityLibrary/src/main/java/com/unity3d/player".to_string(),
        }
    }
}

impl BuildProfile {
    /// Reject malformed profiles before any file is touched. Collects every
    /// issue rather than stopping at the first.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.meta.name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                section: "meta",
                field: "name",
            });
        }

        if self.mode == PackageMode::Inject && self.activity.class_name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                section: "activity",
                field: "class_name",
            });
        }
        if !self.activity.class_name.is_empty() && !is_identifier(&self.activity.class_name) {
            issues.push(ValidationIssue::InvalidValue {
                section: "activity",
                field: "class_name",
                message: format!("{:?} is not a bare class name", self.activity.class_name),
            });
        }
        if self.activity.package.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                section: "activity",
                field: "package",
            });
        }
        if self.activity.theme.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                section: "activity",
                field: "theme",
            });
        }
        for token in &self.activity.config_changes {
            if token.is_empty() || token.contains(['|', '"']) || token.contains(char::is_whitespace)
            {
                issues.push(ValidationIssue::InvalidValue {
                    section: "activity",
                    field: "config_changes",
                    message: format!("invalid token {token:?}"),
                });
            }
        }

        if let Some(hook) = &self.hook {
            if hook.name.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    section: "hook",
                    field: "name",
                });
            } else if !is_identifier(&hook.name) {
                issues.push(ValidationIssue::InvalidValue {
                    section: "hook",
                    field: "name",
                    message: format!("{:?} is not a bare method name", hook.name),
                });
            }
            if hook.body.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    section: "hook",
                    field: "body",
                });
            }
            for anchor in &hook.anchors {
                if anchor.trim().is_empty() {
                    issues.push(ValidationIssue::InvalidValue {
                        section: "hook",
                        field: "anchors",
                        message: "blank anchor statement".to_string(),
                    });
                }
            }
            for import in &hook.imports {
                if import.trim().is_empty() {
                    issues.push(ValidationIssue::InvalidValue {
                        section: "hook",
                        field: "imports",
                        message: "blank import line".to_string(),
                    });
                }
            }
        }

        for (index, pair) in self.gradle.substitutions.iter().enumerate() {
            if pair.find.is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    section: "gradle",
                    field: "substitutions",
                    message: format!("pair {index} has an empty find token"),
                });
            }
        }
        for dependency in &self.gradle.dependencies {
            if dependency.trim().is_empty() {
                issues.push(ValidationIssue::InvalidValue {
                    section: "gradle",
                    field: "dependencies",
                    message: "blank dependency line".to_string(),
                });
            }
        }

        if let Some(annotations) = &self.annotations {
            if annotations.marker.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    section: "annotations",
                    field: "marker",
                });
            }
            if annotations.targets.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    section: "annotations",
                    field: "targets",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    /// Append advisory context, e.g. a class name found in staging.
    pub fn push_note(&mut self, message: String) {
        self.issues.push(ValidationIssue::Note(message));
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone)]
pub enum ValidationIssue {
    MissingField {
        section: &'static str,
        field: &'static str,
    },
    InvalidValue {
        section: &'static str,
        field: &'static str,
        message: String,
    },
    Note(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { section, field } => {
                write!(f, "profile section [{section}] missing required field '{field}'")
            }
            ValidationIssue::InvalidValue {
                section,
                field,
                message,
            } => {
                write!(f, "profile field [{section}].{field} is invalid: {message}")
            }
            ValidationIssue::Note(message) => write!(f, "note: {message}"),
        }
    }
}
