//! Integration tests for the shipped white (clean) profile.
//!
//! White is the inverse of bside: it strips the secondary activity fragment
//! and the generated stub so the export is publishable again. Hook calls and
//! gradle edits are inject-side state it does not own and must survive.

use std::fs;
use tempfile::TempDir;
use variant_patcher::config::{apply_profile, load_from_path, PatchResult};
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

const STUB_PATH: &str = "unityLibrary/src/main/java/com/unity3d/player/GatewayActivity.java";

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

    fs::write(
        dir.path().join("staging/GatewayActivity.java"),
        render_stub("com.unity3d.player", "GatewayActivity"),
    )
    .unwrap();

    dir
}

fn white_profile() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("profiles/white.toml")
}

fn bside_profile() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("profiles/bside.toml")
}

#[test]
fn test_white_pristine_export_is_converged() {
    let export = setup_mock_export();
    let profile = load_from_path(white_profile()).expect("Failed to load white.toml");

    let results = apply_profile(&profile, export.path(), "2021.3.44");

    // Clean mode derives exactly two steps
    let ids: Vec<&str> = results.iter().map(|(id, _)| id.as_str()).collect();
    assert_eq!(ids, ["manifest-activity", "activity-stub"]);

    for (step_id, result) in &results {
        assert!(
            matches!(result, Ok(PatchResult::AlreadyApplied { .. })),
            "{} on a stock export should converge: {:?}",
            step_id,
            result
        );
    }

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

    assert!(!export.path().join(STUB_PATH).exists());
}

#[test]
fn test_white_strips_bside_artifacts() {
    let export = setup_mock_export();
    let bside = load_from_path(bside_profile()).expect("Failed to load bside.toml");
    let white = load_from_path(white_profile()).expect("Failed to load white.toml");

    for (step_id, result) in &apply_profile(&bside, export.path(), "2021.3.44") {
        assert!(
            !matches!(result, Ok(PatchResult::Failed { .. }) | Err(_)),
            "bside setup failed at {}: {:?}",
            step_id,
            result
        );
    }
    assert!(export.path().join(STUB_PATH).is_file());

    let results = apply_profile(&white, export.path(), "2021.3.44");
    for (step_id, result) in &results {
        assert!(
            matches!(result, Ok(PatchResult::Applied { .. })),
            "{} found nothing to strip: {:?}",
            step_id,
            result
        );
    }

    // Fragment removed whole-line; the launch mode demotion stays because the
    // clean profile runs no export pass
    let manifest =
        fs::read_to_string(export.path().join("unityLibrary/src/main/AndroidManifest.xml"))
            .unwrap();
    assert_eq!(manifest, STOCK_MANIFEST.replace("singleTask", "singleTop"));

    assert!(!export.path().join(STUB_PATH).exists());

    // Inject-side edits outside the clean profile's scope survive
    let player = fs::read_to_string(
        export
            .path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
    )
    .unwrap();
    assert!(player.contains("startGateway();"));
    assert!(player.contains("import android.content.Intent;"));

    let launcher = fs::read_to_string(export.path().join("launcher/build.gradle")).unwrap();
    assert_eq!(launcher.matches("minifyEnabled true").count(), 2);

    let library = fs::read_to_string(export.path().join("unityLibrary/build.gradle")).unwrap();
    assert!(library.contains("implementation 'androidx.appcompat:appcompat:1.6.1'"));
}

#[test]
fn test_white_second_run_byte_identical() {
    let export = setup_mock_export();
    let bside = load_from_path(bside_profile()).expect("Failed to load bside.toml");
    let white = load_from_path(white_profile()).expect("Failed to load white.toml");

    apply_profile(&bside, export.path(), "2021.3.44");
    apply_profile(&white, export.path(), "2021.3.44");

    let touched = [
        "unityLibrary/src/main/AndroidManifest.xml",
        "unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java",
        "launcher/build.gradle",
        "unityLibrary/build.gradle",
    ];
    let snapshot: Vec<String> = touched
        .iter()
        .map(|rel| fs::read_to_string(export.path().join(rel)).unwrap())
        .collect();

    let second = apply_profile(&white, export.path(), "2021.3.44");
    for (step_id, result) in &second {
        assert!(
            matches!(result, Ok(PatchResult::AlreadyApplied { .. })),
            "white rerun was not a no-op at {}: {:?}",
            step_id,
            result
        );
    }

    for (rel, before) in touched.iter().zip(snapshot) {
        let after = fs::read_to_string(export.path().join(rel)).unwrap();
        assert_eq!(after, before, "{} changed on rerun", rel);
    }
    assert!(!export.path().join(STUB_PATH).exists());
}

#[test]
fn test_mode_exclusivity_roundtrip() {
    let export = setup_mock_export();
    let bside = load_from_path(bside_profile()).expect("Failed to load bside.toml");
    let white = load_from_path(white_profile()).expect("Failed to load white.toml");

    apply_profile(&bside, export.path(), "2021.3.44");
    let manifest_after_bside =
        fs::read_to_string(export.path().join("unityLibrary/src/main/AndroidManifest.xml"))
            .unwrap();
    let player_after_bside = fs::read_to_string(
        export
            .path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
    )
    .unwrap();

    apply_profile(&white, export.path(), "2021.3.44");
    assert!(!export.path().join(STUB_PATH).exists());

    let results = apply_profile(&bside, export.path(), "2021.3.44");
    for (step_id, result) in &results {
        assert!(
            !matches!(result, Ok(PatchResult::Failed { .. }) | Err(_)),
            "reinject failed at {}: {:?}",
            step_id,
            result
        );
    }

    // Reinjection lands on the same bytes as the first pass
    let manifest =
        fs::read_to_string(export.path().join("unityLibrary/src/main/AndroidManifest.xml"))
            .unwrap();
    assert_eq!(manifest, manifest_after_bside);

    assert!(export.path().join(STUB_PATH).is_file());

    // The hook guard keeps the call count at one across the flip
    let player = fs::read_to_string(
        export
            .path()
            .join("unityLibrary/src/main/java/com/unity3d/player/UnityPlayerActivity.java"),
    )
    .unwrap();
    assert_eq!(player, player_after_bside);
    assert_eq!(
        player
            .lines()
            .filter(|line| line.trim() == "startGateway();")
            .count(),
        1
    );
}
