// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample() -> Workspace {
    Workspace::new(
        "/tmp/client-0-abcd",
        "client-0",
        vec![
            PathBuf::from("build.gradle.kts"),
            PathBuf::from("src/main/kotlin/Main.kt"),
        ],
    )
}

#[test]
fn resolve_joins_root() {
    let ws = sample();
    assert_eq!(
        ws.resolve("src/main/kotlin/Main.kt"),
        PathBuf::from("/tmp/client-0-abcd/src/main/kotlin/Main.kt")
    );
}

#[test]
fn contains_matches_relative_paths_only() {
    let ws = sample();
    assert!(ws.contains("build.gradle.kts"));
    assert!(ws.contains("src/main/kotlin/Main.kt"));
    assert!(!ws.contains("Main.kt"));
}

#[test]
fn accessors() {
    let ws = sample();
    assert_eq!(ws.project(), "client-0");
    assert_eq!(ws.root(), Path::new("/tmp/client-0-abcd"));
    assert_eq!(ws.files().len(), 2);
}
