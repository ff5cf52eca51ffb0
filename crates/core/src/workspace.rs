// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioned workspace descriptor.
//!
//! A workspace is a temporary project directory instantiated from templates.
//! It is shared by every client bound to it and must outlive their
//! connections; deletion is owned by whoever provisioned it.

use std::path::{Path, PathBuf};

/// A temporary project directory created for one test run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    project: String,
    files: Vec<PathBuf>,
}

impl Workspace {
    /// Describe a workspace rooted at `root`. `files` are relative to `root`.
    pub fn new(root: impl Into<PathBuf>, project: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            project: project.into(),
            files,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project name substituted into the templates
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Instantiated files, relative to the root
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Absolute path of a file inside the workspace
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn contains(&self, relative: impl AsRef<Path>) -> bool {
        let relative = relative.as_ref();
        self.files.iter().any(|f| f == relative)
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
