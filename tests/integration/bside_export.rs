//! Integration tests for the shipped bside profile.
//!
//! Uses a 2021.3-era mock Gradle export (frameLayout player template with
//! the classic requestFocus anchor).

use std::fs;
use tempfile::TempDir;
use variant_patcher::config::{apply_profile, check_profile, load_from_path, PatchResult};
use variant_patcher::manifest::fragment;
use variant_patcher::source::render_stub;

const STOCK_MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" xmlns:tools="http://schemas.android.com/tools">
  <application android:extractNativeLibs="true">
    <activity android:name="com.unity3d.player.UnityPlayerActivity" android:theme="@style/UnityThemeSelector" android:launchMode="singleTask">
      <intent-filter>
        <action android:name="android.intent.action.MAIN" />
        <category android:name="android.intent.category.LAUNCHER" />
      </intent-filter>
      <meta-data android:name="unityplayer.UnityActivity" android:value="true" />
    </activity>
  </application>
</manifest>
"#;

const PLAYER_ACTIVITY: &str = r#"package com.unity3d.player;

import android.app.Activity;
import android.os.Bundle;

public class UnityPlayerActivity extends Activity {
    protected UnityPlayer mUnityPlayer;

    @Override
    protected void onCreate(Bundle savedInstanceState) {
        super.onCreate(savedInstanceState);
        mUnityPlayer = new UnityPlayer(this);
        setContentView(mUnityPlayer.getFrameLayout());
        mUnityPlayer.requestFocus();
    }

    @Override
    protected void onDestroy() {
        mUnityPlayer.destroy();
        super.onDestroy();
    }
}
"#;

const LAUNCHER_GRADLE: &str = r#"apply plugin: 'com.android.application'

dependencies {
    implementation project(':unityLibrary')
}

android {
    compileSdkVersion 30
    buildTypes {
        release {
            minifyEnabled false
            proguardFiles getDefaultProguardFile('proguard-android.txt')
        }
        debug {
            minifyEnabled false
        }
    }
}
"#;

const LIBRARY_GRADLE: &str = r#"apply plugin: 'com.android.library'

dependencies {
    implementation fileTree(dir: 'libs', include: ['*.jar'])
}

android {
    compileSdkVersion 30
}
"#;

fn setup_mock_export() -> TempDir {
    let dir = TempDir::new().unwrap();

    fs::create_dir_all(
        dir.path()
            .join("unityLibrary/src/main/java/com/unity3d/player"),
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("launcher")).unwrap();
    fs::create_dir_all(dir.path().join("staging")).unwrap();

    fs::write(
        dir.path().join("build.gradle"),
        "// Top-level build file generated by the export\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("unityLibrary/src/main/AndroidManifest.xml"),
        STOCK_MANIFEST,
    )
    .unwrap();
    fs::write(
        dir.path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
        PLAYER_ACTIVITY,
    )
    .unwrap();
    fs::write(dir.path().join("launcher/build.gradle"), LAUNCHER_GRADLE).unwrap();
    fs::write(dir.path().join("unityLibrary/build.gradle"), LIBRARY_GRADLE).unwrap();

    // Prebuilt secondary activity source waiting to be staged in
    fs::write(
        dir.path().join("staging/GatewayActivity.java"),
        render_stub("com.unity3d.player", "GatewayActivity"),
    )
    .unwrap();

    dir
}

fn profile_file() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("profiles/bside.toml")
}

#[test]
fn test_bside_profile_applies() {
    let export = setup_mock_export();
    let profile = load_from_path(profile_file()).expect("Failed to load bside.toml");
    let results = apply_profile(&profile, export.path(), "2021.3.44");

    let mut applied = 0;
    for (step_id, result) in &results {
        match result {
            Ok(PatchResult::Applied { .. }) => applied += 1,
            Ok(PatchResult::AlreadyApplied { .. }) => {}
            Ok(PatchResult::Skipped { reason }) => {
                println!("⊘ {}: Skipped - {}", step_id, reason);
            }
            Ok(PatchResult::Failed { reason, .. }) => panic!("✗ {}: Failed - {}", step_id, reason),
            Err(e) => panic!("✗ {}: Error - {}", step_id, e),
        }
    }
    assert!(applied > 0, "Nothing was applied to a pristine export");

    // Manifest: fragment inserted above the close tag, launch mode demoted
    let manifest =
        fs::read_to_string(export.path().join("unityLibrary/src/main/AndroidManifest.xml"))
            .unwrap();
    let expected = STOCK_MANIFEST
        .replace("singleTask", "singleTop")
        .replace(
            "  </application>",
            &format!(
                "    {}\n  </application>",
                fragment::serialize(&profile.activity)
            ),
        );
    assert_eq!(manifest, expected);

    // Player source: call after the anchor, body before the final brace,
    // import after the package line
    let player = fs::read_to_string(
        export
            .path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
    )
    .unwrap();
    assert!(player.contains("        mUnityPlayer.requestFocus();\n        startGateway();"));
    assert!(player.contains("    private void startGateway() {"));
    assert!(player.starts_with("package com.unity3d.player;\nimport android.content.Intent;\n"));

    // Gradle: minify flipped in the launcher, dependencies inserted in the
    // library build script
    let launcher = fs::read_to_string(export.path().join("launcher/build.gradle")).unwrap();
    assert!(!launcher.contains("minifyEnabled false"));
    assert_eq!(launcher.matches("minifyEnabled true").count(), 2);

    let library = fs::read_to_string(export.path().join("unityLibrary/build.gradle")).unwrap();
    assert!(library.contains("implementation 'androidx.appcompat:appcompat:1.6.1'"));
    assert!(library.contains("implementation 'com.squareup.okhttp3:okhttp:3.12.13'"));

    // Staged source landed next to the player activity
    assert!(export
        .path()
        .join("unityLibrary/src/main/java/com/unity3d/player/GatewayActivity.java")
        .is_file());
}

#[test]
fn test_bside_profile_idempotent() {
    let export = setup_mock_export();
    let profile = load_from_path(profile_file()).expect("Failed to load bside.toml");

    let first = apply_profile(&profile, export.path(), "2021.3.44");
    for (step_id, result) in &first {
        assert!(
            !matches!(result, Ok(PatchResult::Failed { .. }) | Err(_)),
            "first run failed at {}: {:?}",
            step_id,
            result
        );
    }

    let touched = [
        "unityLibrary/src/main/AndroidManifest.xml",
        "unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java",
        "unityLibrary/src/main/java/com/unity3d/player/GatewayActivity.java",
        "launcher/build.gradle",
        "unityLibrary/build.gradle",
    ];
    let snapshot: Vec<String> = touched
        .iter()
        .map(|rel| fs::read_to_string(export.path().join(rel)).unwrap())
        .collect();

    let second = apply_profile(&profile, export.path(), "2021.3.44");
    for (step_id, result) in &second {
        assert!(
            !matches!(result, Ok(PatchResult::Applied { .. })),
            "second run re-applied {}: {:?}",
            step_id,
            result
        );
        assert!(
            !matches!(result, Ok(PatchResult::Failed { .. }) | Err(_)),
            "second run failed at {}: {:?}",
            step_id,
            result
        );
    }

    // Byte-identical second run
    for (rel, before) in touched.iter().zip(snapshot) {
        let after = fs::read_to_string(export.path().join(rel)).unwrap();
        assert_eq!(after, before, "{} changed on rerun", rel);
    }
}

#[test]
fn test_bside_version_gate_skips_old_editor() {
    let export = setup_mock_export();
    let profile = load_from_path(profile_file()).expect("Failed to load bside.toml");

    // bside.toml requires >=2019.4
    let results = apply_profile(&profile, export.path(), "2019.3.0");

    assert!(!results.is_empty());
    for (step_id, result) in &results {
        assert!(
            matches!(result, Ok(PatchResult::Skipped { .. })),
            "{} was not gated: {:?}",
            step_id,
            result
        );
    }

    let manifest =
        fs::read_to_string(export.path().join("unityLibrary/src/main/AndroidManifest.xml"))
            .unwrap();
    assert_eq!(manifest, STOCK_MANIFEST);
}

#[test]
fn test_bside_check_mode_leaves_tree_untouched() {
    let export = setup_mock_export();
    let profile = load_from_path(profile_file()).expect("Failed to load bside.toml");

    let results = check_profile(&profile, export.path(), "2021.3.44");

    let pending = results
        .iter()
        .filter(|(_, r)| matches!(r, Ok(PatchResult::Applied { .. })))
        .count();
    assert!(pending > 0, "check on a pristine export should report pending steps");

    let manifest =
        fs::read_to_string(export.path().join("unityLibrary/src/main/AndroidManifest.xml"))
            .unwrap();
    assert_eq!(manifest, STOCK_MANIFEST);

    let player = fs::read_to_string(
        export
            .path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
    )
    .unwrap();
    assert_eq!(player, PLAYER_ACTIVITY);

    assert!(!export
        .path()
        .join("unityLibrary/src/main/java/com/unity3d/player/GatewayActivity.java")
        .exists());
}

#[test]
fn test_bside_missing_player_source_is_fatal() {
    let export = setup_mock_export();
    fs::remove_file(
        export
            .path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
    )
    .unwrap();

    let profile = load_from_path(profile_file()).expect("Failed to load bside.toml");
    let results = apply_profile(&profile, export.path(), "2021.3.44");

    let hook = results
        .iter()
        .find(|(id, _)| id == "source-hook")
        .expect("no source-hook step");
    assert!(hook.1.is_err(), "missing player source must be an error");

    // The manifest step is independent and still lands
    let manifest = results
        .iter()
        .find(|(id, _)| id == "manifest-activity")
        .expect("no manifest-activity step");
    assert!(matches!(manifest.1, Ok(PatchResult::Applied { .. })));
}

#[test]
fn test_bside_single_hook_invocation_after_reruns() {
    let export = setup_mock_export();
    let profile = load_from_path(profile_file()).expect("Failed to load bside.toml");

    apply_profile(&profile, export.path(), "2021.3.44");
    apply_profile(&profile, export.path(), "2021.3.44");
    apply_profile(&profile, export.path(), "2021.3.44");

    let player = fs::read_to_string(
        export
            .path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
    )
    .unwrap();
    let calls = player
        .lines()
        .filter(|line| line.trim() == "startGateway();")
        .count();
    assert_eq!(calls, 1);

    let imports = player.matches("import android.content.Intent;").count();
    assert_eq!(imports, 1);
}
