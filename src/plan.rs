// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Execution planning.
//!
//! Turns the path specs a user typed into an ordered list of
//! [`ResolvedGroup`]s: one per repository, each carrying the [`Selection`] of
//! files to operate on.
//!
//! # Pipeline
//!
//! 1. Every raw spec is normalized and split into owner, repository, and inner
//!    path (see [`spec`]).
//! 2. Inner paths are grouped by owner and repository, keeping input order
//!    (see [`group`]).
//! 3. Each repository's inner paths become a [`Selection`] (see [`pattern`]).
//!
//! Planning is pure. It never touches the network or the file system, and it
//! finishes for the whole input before anything gets executed. A typo in the
//! last spec therefore stops the run before the first repository is fetched.
//!
//! # Ordering
//!
//! Groups come out in the order their owner/repository pair first showed up
//! in the input. Executing them in that order gives users a simple rule for
//! overlapping writes: left to right, the last one wins.

pub mod group;
pub mod pattern;
pub mod spec;

pub use group::{group_by_owner, OwnerGroup};
pub use pattern::{resolve_selection, GlobError, PathPattern, Selection};
pub use spec::{destructure, normalize};

use crate::fetch::RepoTarget;

use tracing::{debug, instrument};

/// Files to operate on within one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGroup {
    pub owner: String,
    pub repo: String,
    pub case_insensitive: bool,
    pub selection: Selection,
}

impl ResolvedGroup {
    /// Repository this group targets.
    pub fn target(&self) -> RepoTarget {
        RepoTarget {
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            case_insensitive: self.case_insensitive,
        }
    }
}

/// Resolve raw path specs into an ordered execution plan.
///
/// List mode always compiles a pattern for restricted repositories, because
/// listing never works off of exact file paths.
///
/// # Errors
///
/// - Return [`PlanError`] if any spec is invalid. Nothing is returned for the
///   valid specs in that case.
#[instrument(skip(paths), level = "debug")]
pub fn resolve<S: AsRef<str>>(
    paths: &[S],
    list_mode: bool,
    case_insensitive: bool,
) -> Result<Vec<ResolvedGroup>> {
    let group = group_by_owner(paths)?;
    let mut plan = Vec::with_capacity(group.len());

    for (owner, repo, specs) in group.iter() {
        let selection = resolve_selection(specs, list_mode, case_insensitive)?;
        debug!("{owner}/{repo}: {selection:?}");
        plan.push(ResolvedGroup {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
            case_insensitive,
            selection,
        });
    }

    Ok(plan)
}

/// Reason a path spec was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SpecDefect {
    #[error("path is empty")]
    Empty,

    #[error("path contains whitespace")]
    Whitespace,

    #[error("expected owner/repo[/path]")]
    MissingOwnerOrRepo,

    #[error("owner and repo cannot be `.` or `..`")]
    RelativeSegment,
}

/// Planning error types.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// No path specs given at all.
    #[error("no paths given")]
    NoInput,

    /// Path spec is malformed.
    #[error("invalid path {path:?}: {defect}")]
    InvalidPathSpec { path: String, defect: SpecDefect },

    /// Path spec negates a whole repository.
    #[error("cannot negate the entire repo: {path:?}")]
    Negation { path: String },

    /// Glob spec does not compile.
    #[error("invalid glob {spec:?}")]
    PatternCompile {
        spec: String,
        #[source]
        source: GlobError,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PlanError> = std::result::Result<T, E>;
