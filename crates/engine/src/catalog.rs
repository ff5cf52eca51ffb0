// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operations a load client can issue, bound to workspace resources

use crate::workspace::SOURCE_DIR;
use lspload_adapters::{LanguageClient, LanguageClientError, RequestOutcome};
use lspload_core::{Position, Workspace};
use rand::Rng;
use std::path::{Path, PathBuf};

const HOVER_FILE: &str = "Main.kt";
const COMPLETION_FILE: &str = "Completion.kt";
const HOVER_POSITION: Position = Position::new(1, 7);
const COMPLETION_POSITION: Position = Position::new(2, 49);
const REFERENCES_POSITION: Position = Position::new(2, 16);
const SYMBOL_QUERY: &str = "log";
const EDIT_TEXT: &str = "\nfun shout(text: String) = log(text.uppercase())\n";

/// One request against a document of the workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Hover { resource: PathBuf, position: Position },
    Completion { resource: PathBuf, position: Position },
    References { resource: PathBuf, position: Position },
    WorkspaceSymbol { resource: PathBuf, query: String },
    /// Append `text` to the document through a full-content change
    Edit { resource: PathBuf, text: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Hover { .. } => "hover",
            Operation::Completion { .. } => "completion",
            Operation::References { .. } => "references",
            Operation::WorkspaceSymbol { .. } => "workspace_symbols",
            Operation::Edit { .. } => "edit",
        }
    }

    /// Document opened around the request
    pub fn resource(&self) -> &Path {
        match self {
            Operation::Hover { resource, .. }
            | Operation::Completion { resource, .. }
            | Operation::References { resource, .. }
            | Operation::WorkspaceSymbol { resource, .. }
            | Operation::Edit { resource, .. } => resource,
        }
    }
}

/// Fixed list of operations for one workspace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationCatalog {
    operations: Vec<Operation>,
}

impl OperationCatalog {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self { operations }
    }

    /// Bind the standard operations to the workspace's Kotlin sources
    pub fn for_workspace(workspace: &Workspace, with_edits: bool) -> Self {
        let source = |file: &str| workspace.resolve(Path::new(SOURCE_DIR).join(file));
        let completion_file = source(COMPLETION_FILE);

        let mut operations = vec![
            Operation::Hover {
                resource: source(HOVER_FILE),
                position: HOVER_POSITION,
            },
            Operation::Completion {
                resource: completion_file.clone(),
                position: COMPLETION_POSITION,
            },
            Operation::References {
                resource: completion_file.clone(),
                position: REFERENCES_POSITION,
            },
            Operation::WorkspaceSymbol {
                resource: completion_file.clone(),
                query: SYMBOL_QUERY.to_string(),
            },
        ];
        if with_edits {
            operations.push(Operation::Edit {
                resource: completion_file,
                text: EDIT_TEXT.to_string(),
            });
        }
        Self { operations }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Distinct documents the operations touch, in catalog order
    pub fn resources(&self) -> Vec<&Path> {
        let mut resources: Vec<&Path> = Vec::new();
        for operation in &self.operations {
            let resource = operation.resource();
            if !resources.contains(&resource) {
                resources.push(resource);
            }
        }
        resources
    }

    /// Pick one operation uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Operation> {
        if self.operations.is_empty() {
            return None;
        }
        self.operations.get(rng.random_range(0..self.operations.len()))
    }
}

/// Run one operation: open the resource, issue the request, close it again.
///
/// The close is attempted even when the request fails; the request's error
/// takes precedence over the close's.
pub async fn execute<C: LanguageClient>(
    client: &C,
    operation: &Operation,
) -> Result<RequestOutcome, LanguageClientError> {
    let resource = operation.resource();
    client.open_document(resource).await?;

    let result = issue(client, operation).await;

    let closed = client.close_document(resource).await;
    let outcome = result?;
    closed?;
    Ok(outcome)
}

/// Issue the operation's request against a document that is already open
pub async fn issue<C: LanguageClient>(
    client: &C,
    operation: &Operation,
) -> Result<RequestOutcome, LanguageClientError> {
    let resource = operation.resource();
    match operation {
        Operation::Hover { position, .. } => client.hover(resource, *position).await,
        Operation::Completion { position, .. } => client.completion(resource, *position).await,
        Operation::References { position, .. } => client.references(resource, *position).await,
        Operation::WorkspaceSymbol { query, .. } => client.workspace_symbol(query).await,
        Operation::Edit { text, .. } => edit(client, resource, text).await,
    }
}

async fn edit<C: LanguageClient>(
    client: &C,
    resource: &Path,
    text: &str,
) -> Result<RequestOutcome, LanguageClientError> {
    let current = tokio::fs::read_to_string(resource)
        .await
        .map_err(|source| LanguageClientError::ReadDocument {
            path: resource.to_path_buf(),
            source,
        })?;
    client
        .change_document(resource, &format!("{current}{text}"))
        .await?;
    Ok(RequestOutcome::default())
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
