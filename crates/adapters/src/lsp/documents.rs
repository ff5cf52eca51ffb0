// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-resource document synchronization state

use super::LanguageClientError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Open flag and version for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentState {
    pub open: bool,
    pub version: i32,
}

/// Tracks which documents a client has open and their versions.
///
/// Versions start at 1 on the first open and only ever increase, including
/// across close/re-open cycles.
#[derive(Debug, Default)]
pub struct DocumentTracker {
    documents: HashMap<PathBuf, DocumentState>,
}

impl DocumentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a document open, returning the version to announce
    pub fn open(&mut self, path: &Path) -> Result<i32, LanguageClientError> {
        let entry = self
            .documents
            .entry(path.to_path_buf())
            .or_insert(DocumentState {
                open: false,
                version: 0,
            });
        if entry.open {
            return Err(LanguageClientError::DocumentAlreadyOpen(path.to_path_buf()));
        }
        entry.open = true;
        entry.version += 1;
        Ok(entry.version)
    }

    /// Bump the version of an open document
    pub fn change(&mut self, path: &Path) -> Result<i32, LanguageClientError> {
        match self.documents.get_mut(path) {
            Some(state) if state.open => {
                state.version += 1;
                Ok(state.version)
            }
            _ => Err(LanguageClientError::DocumentNotOpen(path.to_path_buf())),
        }
    }

    pub fn close(&mut self, path: &Path) -> Result<(), LanguageClientError> {
        match self.documents.get_mut(path) {
            Some(state) if state.open => {
                state.open = false;
                Ok(())
            }
            _ => Err(LanguageClientError::DocumentNotOpen(path.to_path_buf())),
        }
    }

    pub fn get(&self, path: &Path) -> Option<DocumentState> {
        self.documents.get(path).copied()
    }

    pub fn open_count(&self) -> usize {
        self.documents.values().filter(|d| d.open).count()
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
