//! Canonical form and detection of the secondary activity fragment.
//!
//! The fragment is the single `<activity … />` element that marks a B-side
//! build. Its theme attribute doubles as the detection marker: stock player
//! activities never carry it, so "element under the player package prefix
//! with the marker theme" identifies the fragment regardless of attribute
//! order or who wrote it.

use std::ops::Range;

use crate::cache;
use crate::config::schema::ActivityConfig;

/// Simple name of the activity the host template registers by default.
/// Rename operations must leave it alone.
pub const DEFAULT_PLAYER_ACTIVITY: &str = "UnityPlayerActivity";

/// Serialize the config into the canonical fragment element.
///
/// Attribute order is fixed (name, configChanges, exported,
/// hardwareAccelerated, theme) so that repeated injections are byte-stable
/// and equality against an existing fragment is a plain string compare.
pub fn serialize(config: &ActivityConfig) -> String {
    format!(
        r#"<activity android:name="{}" android:configChanges="{}" android:exported="{}" android:hardwareAccelerated="{}" android:theme="{}" />"#,
        config.qualified_name(),
        config.config_changes.join("|"),
        config.exported,
        config.hardware_accelerated,
        config.theme,
    )
}

/// Regex source for fragment detection, built from the config's package
/// prefix and marker theme. Tolerates attribute reordering and multi-line
/// elements; never crosses a `>` boundary.
pub fn detection_pattern(config: &ActivityConfig) -> String {
    format!(
        r#"<activity\s+android:name="{}\.[^"]+"[^>]+?android:theme="{}"[^>]*/>"#,
        regex::escape(&config.package),
        regex::escape(&config.theme),
    )
}

/// Regex source for `android:name` attributes under a package prefix.
/// Capture group 1 is the simple class name.
pub fn name_attribute_pattern(package: &str) -> String {
    format!(
        r#"android:name="{}\.([A-Za-z0-9_]+)""#,
        regex::escape(package)
    )
}

/// All fragment spans in the document, in document order.
pub fn find_all(
    document: &str,
    config: &ActivityConfig,
) -> Result<Vec<Range<usize>>, regex::Error> {
    let re = cache::get_or_compile(&detection_pattern(config))?;
    Ok(re.find_iter(document).map(|m| m.range()).collect())
}
