// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Repository cache store.
//!
//! Gitpluck keeps a bare clone of every repository it has fetched from in one
//! place called the __repository store__. Reusing a clone means later runs
//! only have to fetch what changed upstream.
//!
//! # Repository Store Layout
//!
//! The store can be placed anywhere on the user's file system. However, the
//! default location is `$XDG_CACHE_HOME/gitpluck`. Entries are grouped into
//! one directory per owner, and each repository gets a ".git" extension. So,
//! `$XDG_CACHE_HOME/gitpluck/rust-lang/cargo.git` is the bare clone of
//! `rust-lang/cargo`.
//!
//! The store is a cache. Any entry can be deleted at any time, it just gets
//! cloned again on next use.

use crate::fetch::RepoTarget;

use git2::Repository;
use std::{
    fs::remove_dir_all,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Local store of bare repository clones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    store_path: PathBuf,
}

impl Store {
    /// Open repository store at target path.
    ///
    /// Creates the store directory if it does not already exist.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::CreateStore`] if store directory cannot be
    ///   created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store_path = path.into();

        // INVARIANT: Store directory always exists once opened.
        mkdirp::mkdirp(&store_path).map_err(|err| StoreError::CreateStore {
            source: err,
            store_path: store_path.clone(),
        })?;

        Ok(Self { store_path })
    }

    /// Path to store directory.
    pub fn path(&self) -> &Path {
        self.store_path.as_path()
    }

    /// Path where bare clone of target repository lives.
    pub fn entry_path(&self, target: &RepoTarget) -> PathBuf {
        self.store_path
            .join(&target.owner)
            .join(format!("{}.git", target.repo))
    }

    /// Open existing store entry.
    ///
    /// Entries that exist but cannot be opened as a repository are removed,
    /// and reported as missing, so the caller can clone them again.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::RemoveEntry`] if broken entry cannot be removed.
    #[instrument(skip(self), level = "debug")]
    pub fn open_entry(&self, target: &RepoTarget) -> Result<Option<Repository>> {
        let path = self.entry_path(target);
        if !path.exists() {
            debug!("no store entry for {target}");
            return Ok(None);
        }

        match Repository::open_bare(&path) {
            Ok(repository) => Ok(Some(repository)),
            Err(err) => {
                warn!("store entry for {target} is broken, removing it: {err}");
                self.remove_entry(target)?;
                Ok(None)
            }
        }
    }

    /// Remove store entry of target repository.
    ///
    /// # Errors
    ///
    /// - Return [`StoreError::RemoveEntry`] if entry cannot be removed.
    pub fn remove_entry(&self, target: &RepoTarget) -> Result<()> {
        let path = self.entry_path(target);
        if !path.exists() {
            return Ok(());
        }

        remove_dir_all(&path).map_err(|err| StoreError::RemoveEntry {
            source: err,
            entry_path: path,
        })
    }
}

/// All possible error types for repository store interaction.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store directory cannot be created when missing.
    #[error("failed to create repository store at {:?}", store_path.display())]
    CreateStore {
        #[source]
        source: std::io::Error,
        store_path: PathBuf,
    },

    /// Store entry cannot be removed.
    #[error("failed to remove store entry at {:?}", entry_path.display())]
    RemoveEntry {
        #[source]
        source: std::io::Error,
        entry_path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
