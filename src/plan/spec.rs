// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path specification parsing.
//!
//! A __path spec__ names a repository and optionally something inside of it,
//! using the shape `[!]owner/repo[/inner_path]`. Users tend to paste these
//! straight out of a browser or a shell history, so the parser forgives a
//! stray leading slash and surrounding whitespace, and treats a trailing slash
//! as "everything below this directory".

use crate::plan::{PlanError, Result};

/// Wildcard that matches across any number of path segments.
pub const RECURSIVE_WILDCARD: &str = "**";

/// Canonicalize a raw path spec.
///
/// Trims surrounding whitespace (internal whitespace is left alone), strips
/// exactly one leading `/`, and appends [`RECURSIVE_WILDCARD`] when the
/// result ends with `/`. Nothing else is touched: no slash collapsing, no case
/// folding.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let path = trimmed.strip_prefix('/').unwrap_or(trimmed);

    if path.ends_with('/') {
        format!("{path}{RECURSIVE_WILDCARD}")
    } else {
        path.to_owned()
    }
}

/// Path spec split into its components.
///
/// Owner and repository are left as [`None`] when their segment is empty, so
/// the caller can decide how to report the problem. An absent inner path means
/// the whole repository was requested.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Destructured {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub inner: Option<String>,
}

/// Split a normalized path spec into owner, repository, and inner path.
///
/// A `!` in front of the owner negates the spec. The marker is moved onto the
/// inner path so the pattern compiler sees `!inner`.
///
/// # Errors
///
/// - Return [`PlanError::Negation`] if the negated spec names a whole
///   repository.
pub fn destructure(normalized: &str) -> Result<Destructured> {
    let mut segments = normalized.split('/');
    let owner = segments.next().unwrap_or_default();
    let repo = segments.next().unwrap_or_default();
    let inner = segments.collect::<Vec<_>>().join("/");

    let (owner, negated) = match owner.strip_prefix('!') {
        Some(owner) => (owner, true),
        None => (owner, false),
    };

    let whole_repo = inner.is_empty() || inner == RECURSIVE_WILDCARD;
    if negated && whole_repo {
        return Err(PlanError::Negation {
            path: normalized.to_owned(),
        });
    }

    let inner = match (whole_repo, negated) {
        (true, _) => None,
        (false, true) => Some(format!("!{inner}")),
        (false, false) => Some(inner),
    };

    Ok(Destructured {
        owner: non_empty(owner),
        repo: non_empty(repo),
        inner,
    })
}

fn non_empty(segment: &str) -> Option<String> {
    (!segment.is_empty()).then(|| segment.to_owned())
}
