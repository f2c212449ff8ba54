// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fetch and extraction engine.
//!
//! Planning decides _what_ to take from a repository, the engine behind the
//! [`Fetcher`] trait decides _how_: getting hold of the repository contents,
//! walking its files, applying a [`Selection`], writing files, and handling
//! files that already exist at the destination.
//!
//! The trait is all the executor ever sees. [`Git2Fetcher`] is the real thing,
//! backed by bare clones kept in a local [`Store`](crate::store::Store), but
//! any implementation works, e.g., an in-memory recorder in tests.

pub mod git;
pub mod typo;

pub use git::Git2Fetcher;

use crate::plan::Selection;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Repository an engine call operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoTarget {
    pub owner: String,
    pub repo: String,
    pub case_insensitive: bool,
}

impl Display for RepoTarget {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}/{}", self.owner, self.repo)
    }
}

/// Options for listing repository files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Directory that downloads would be written to.
    pub dest: PathBuf,

    /// Only list files that already exist under `dest`.
    pub conflicts_only: bool,

    /// Files to list.
    pub selection: Selection,

    /// Text printed in front of every listed path.
    pub prefix: Option<String>,
}

/// Options for downloading repository files.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// Directory to write files into.
    pub dest: PathBuf,

    /// Files to download.
    pub selection: Selection,

    /// How to write files.
    pub extract: ExtractOptions,

    /// Called with the destination path of every file written.
    pub on_file_written: Option<FileWrittenHook>,
}

/// How extracted files land on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    pub overwrite: OverwritePolicy,

    /// Number of leading path components to drop.
    pub strip: Option<usize>,
}

/// What to do when a file already exists at the destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverwritePolicy {
    /// Replace existing files without asking.
    #[default]
    Overwrite,

    /// Never replace existing files.
    KeepExisting,

    /// Only replace files older than the fetched revision.
    KeepNewer,

    /// Replace anything in the way, directories included.
    Force,
}

/// Callback for written files.
#[derive(Clone)]
pub struct FileWrittenHook(Arc<dyn Fn(&Path) + Send + Sync>);

impl FileWrittenHook {
    pub fn new(hook: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        Self(Arc::new(hook))
    }

    pub fn call(&self, path: &Path) {
        (self.0)(path)
    }
}

impl Debug for FileWrittenHook {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str("FileWrittenHook(..)")
    }
}

/// Requested file that matched nothing, along with a close existing match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typo {
    pub original: String,
    pub suggestion: String,
}

/// Layer of indirection for fetch and extraction.
///
/// Each call runs to completion before returning. Calls never share state
/// besides the destination directory.
pub trait Fetcher: Send + Sync {
    /// List files in repository that match selection.
    fn list<'a>(&'a self, target: &'a RepoTarget, options: ListOptions)
        -> BoxFuture<'a, Result<()>>;

    /// Download files in repository that match selection.
    ///
    /// Returns suggestions for literal paths that matched nothing.
    fn download_to<'a>(
        &'a self,
        target: &'a RepoTarget,
        options: DownloadOptions,
    ) -> BoxFuture<'a, Result<Vec<Typo>>>;
}

/// Fetch engine error types.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Repository cache store fails.
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// File cannot be written to destination.
    #[error("failed to write {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory occupies the path a file should be written to.
    #[error("directory in the way of {:?}, use force to replace it", path.display())]
    DirectoryInTheWay { path: PathBuf },

    /// Blocking task panicked or got cancelled.
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    /// Plain I/O fails.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = FetchError> = std::result::Result<T, E>;
