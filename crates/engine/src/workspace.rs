// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace provisioning from project templates

use crate::error::ProvisionError;
use lspload_core::{IdGen, UuidIdGen, Workspace};
use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Directory that receives Kotlin sources
pub const SOURCE_DIR: &str = "src/main/kotlin";

const TEMPLATE_SUFFIX: &str = ".template";

/// Matches `{{ projectName }}`, tolerating whitespace inside the braces
#[allow(clippy::expect_used)]
static PROJECT_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*projectName\s*\}\}").expect("constant regex pattern is valid")
});

const BUNDLED: &[(&str, &str)] = &[
    (
        "build.gradle.kts.template",
        include_str!("templates/build.gradle.kts.template"),
    ),
    (
        "settings.gradle.kts.template",
        include_str!("templates/settings.gradle.kts.template"),
    ),
    ("Main.kt.template", include_str!("templates/Main.kt.template")),
    (
        "Completion.kt.template",
        include_str!("templates/Completion.kt.template"),
    ),
];

/// Replace every project name placeholder in `content`
pub fn substitute_placeholder(content: &str, project: &str) -> String {
    PROJECT_NAME_PATTERN
        .replace_all(content, regex::NoExpand(project))
        .into_owned()
}

/// Where a template lands inside the workspace, relative to its root
pub fn destination(template_name: &str) -> PathBuf {
    let name = template_name
        .strip_suffix(TEMPLATE_SUFFIX)
        .unwrap_or(template_name);
    if name.ends_with(".kt") {
        Path::new(SOURCE_DIR).join(name)
    } else {
        PathBuf::from(name)
    }
}

/// One template file: its name (suffix included) and raw content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub name: String,
    pub content: String,
}

/// Where templates are read from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TemplateSource {
    /// Templates compiled into the binary
    #[default]
    Bundled,
    Directory(PathBuf),
}

impl TemplateSource {
    /// Load the template set; an absent or empty set is an error
    pub fn load(&self) -> Result<Vec<Template>, ProvisionError> {
        match self {
            TemplateSource::Bundled => Ok(BUNDLED
                .iter()
                .map(|(name, content)| Template {
                    name: name.to_string(),
                    content: content.to_string(),
                })
                .collect()),
            TemplateSource::Directory(dir) => load_directory(dir),
        }
    }
}

fn load_directory(dir: &Path) -> Result<Vec<Template>, ProvisionError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ProvisionError::TemplatesNotFound(dir.to_path_buf()))
        }
        Err(source) => {
            return Err(ProvisionError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut templates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ProvisionError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let content = fs::read_to_string(&path).map_err(|source| ProvisionError::Io {
            path: path.clone(),
            source,
        })?;
        templates.push(Template {
            name: entry.file_name().to_string_lossy().into_owned(),
            content,
        });
    }

    if templates.is_empty() {
        return Err(ProvisionError::TemplatesNotFound(dir.to_path_buf()));
    }
    templates.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(templates)
}

/// Creates and deletes temporary project directories
#[derive(Clone)]
pub struct WorkspaceProvisioner<I: IdGen = UuidIdGen> {
    base: PathBuf,
    source: TemplateSource,
    ids: I,
}

impl WorkspaceProvisioner<UuidIdGen> {
    pub fn new(base: impl Into<PathBuf>, source: TemplateSource) -> Self {
        Self::with_id_gen(base, source, UuidIdGen)
    }
}

impl<I: IdGen> WorkspaceProvisioner<I> {
    pub fn with_id_gen(base: impl Into<PathBuf>, source: TemplateSource, ids: I) -> Self {
        Self {
            base: base.into(),
            source,
            ids,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Create `<base>/<project>-<suffix>` populated from the template set.
    ///
    /// A partially written directory is removed before an error is returned.
    pub fn spawn_workspace(&self, project: &str) -> Result<Workspace, ProvisionError> {
        let templates = self.source.load()?;
        let root = self.base.join(format!("{}-{}", project, self.ids.next()));
        fs::create_dir_all(&self.base).map_err(|source| ProvisionError::Io {
            path: self.base.clone(),
            source,
        })?;
        fs::create_dir(&root).map_err(|source| ProvisionError::Io {
            path: root.clone(),
            source,
        })?;

        match write_templates(&root, project, &templates) {
            Ok(files) => {
                tracing::debug!(
                    project,
                    root = %root.display(),
                    files = files.len(),
                    "workspace provisioned"
                );
                Ok(Workspace::new(root, project, files))
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&root) {
                    if cleanup.kind() != io::ErrorKind::NotFound {
                        tracing::warn!(root = %root.display(), error = %cleanup, "failed to remove partial workspace");
                    }
                }
                Err(e)
            }
        }
    }

    /// Delete a workspace tree. Missing directories count as deleted.
    pub fn cleanup(&self, workspace: &Workspace) {
        match fs::remove_dir_all(workspace.root()) {
            Ok(()) => tracing::debug!(root = %workspace.root().display(), "workspace removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                root = %workspace.root().display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

fn write_templates(
    root: &Path,
    project: &str,
    templates: &[Template],
) -> Result<Vec<PathBuf>, ProvisionError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ProvisionError::Io { path, source }
    };

    let mut files = Vec::with_capacity(templates.len());
    for template in templates {
        let relative = destination(&template.name);
        let target = root.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        fs::write(&target, substitute_placeholder(&template.content, project))
            .map_err(io_err(&target))?;
        files.push(relative);
    }
    Ok(files)
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
