// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Group path specs by owner and repository.

use crate::plan::{
    spec::{destructure, normalize},
    PlanError, Result, SpecDefect,
};

/// Path specs grouped by owner, then by repository.
///
/// # Invariant
///
/// - Owners are unique, and kept in the order they were first seen.
/// - Repositories are unique per owner, and kept in first-seen order.
/// - Inner paths keep input order, duplicates included.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OwnerGroup {
    owners: Vec<OwnerEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OwnerEntry {
    name: String,
    repos: Vec<RepoEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RepoEntry {
    name: String,
    specs: Vec<String>,
}

impl OwnerGroup {
    /// Construct new empty owner group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an inner path for a repository.
    ///
    /// The owner and repository entries are created on first sight even when
    /// `spec` is [`None`], which is how a whole-repository request is stored.
    pub fn push(&mut self, owner: &str, repo: &str, spec: Option<String>) {
        let owner_index = match self.owners.iter().position(|entry| entry.name == owner) {
            Some(index) => index,
            None => {
                self.owners.push(OwnerEntry {
                    name: owner.to_owned(),
                    repos: Vec::new(),
                });
                self.owners.len() - 1
            }
        };

        let repos = &mut self.owners[owner_index].repos;
        let repo_index = match repos.iter().position(|entry| entry.name == repo) {
            Some(index) => index,
            None => {
                repos.push(RepoEntry {
                    name: repo.to_owned(),
                    specs: Vec::new(),
                });
                repos.len() - 1
            }
        };

        if let Some(spec) = spec {
            repos[repo_index].specs.push(spec);
        }
    }

    /// Inner paths recorded for a repository.
    pub fn get(&self, owner: &str, repo: &str) -> Option<&[String]> {
        self.owners
            .iter()
            .find(|entry| entry.name == owner)?
            .repos
            .iter()
            .find(|entry| entry.name == repo)
            .map(|entry| entry.specs.as_slice())
    }

    /// Iterate over `(owner, repo, inner_paths)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &[String])> {
        self.owners.iter().flat_map(|owner| {
            owner.repos.iter().map(move |repo| {
                (
                    owner.name.as_str(),
                    repo.name.as_str(),
                    repo.specs.as_slice(),
                )
            })
        })
    }

    /// Number of distinct repositories.
    pub fn len(&self) -> usize {
        self.owners.iter().map(|owner| owner.repos.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

/// Fold raw path specs into an [`OwnerGroup`].
///
/// Every path is normalized, checked, and destructured in input order. The
/// whole list is validated before anything is returned, so one bad path at the
/// end still stops the run before any repository is touched.
///
/// # Errors
///
/// - Return [`PlanError::NoInput`] if `paths` is empty.
/// - Return [`PlanError::InvalidPathSpec`] if a path is empty, contains
///   whitespace, or lacks an owner or repository.
/// - Return [`PlanError::Negation`] if a whole repository is negated.
pub fn group_by_owner<S: AsRef<str>>(paths: &[S]) -> Result<OwnerGroup> {
    if paths.is_empty() {
        return Err(PlanError::NoInput);
    }

    let mut group = OwnerGroup::new();
    for raw in paths {
        let raw = raw.as_ref();
        let normalized = normalize(raw);

        if normalized.is_empty() {
            return Err(invalid(raw, SpecDefect::Empty));
        }

        if normalized.contains(char::is_whitespace) {
            return Err(invalid(raw, SpecDefect::Whitespace));
        }

        let parts = destructure(&normalized)?;
        let (Some(owner), Some(repo)) = (parts.owner, parts.repo) else {
            return Err(invalid(raw, SpecDefect::MissingOwnerOrRepo));
        };

        // INVARIANT: Owner and repo name directories in the repository store.
        if [&owner, &repo].iter().any(|name| matches!(name.as_str(), "." | "..")) {
            return Err(invalid(raw, SpecDefect::RelativeSegment));
        }

        group.push(&owner, &repo, parts.inner);
    }

    Ok(group)
}

fn invalid(path: &str, defect: SpecDefect) -> PlanError {
    PlanError::InvalidPathSpec {
        path: path.to_owned(),
        defect,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test]
    fn group_by_owner_and_repo() -> anyhow::Result<()> {
        let group = group_by_owner(&[
            "owner1/repo1/path1",
            "owner1/repo1/path2",
            "owner2/repo1/path1",
        ])?;

        let result = group.iter().collect::<Vec<_>>();
        let owner1 = vec!["path1".to_string(), "path2".to_string()];
        let owner2 = vec!["path1".to_string()];
        let expect = vec![
            ("owner1", "repo1", owner1.as_slice()),
            ("owner2", "repo1", owner2.as_slice()),
        ];
        assert_eq!(result, expect);
        assert_eq!(group.len(), 2);

        Ok(())
    }

    #[test]
    fn group_keeps_first_seen_order() -> anyhow::Result<()> {
        let group = group_by_owner(&[
            "zeta/b/one",
            "alpha/a/two",
            "zeta/a/three",
            "zeta/b/four",
            "zeta/b/one",
        ])?;

        let result = group
            .iter()
            .map(|(owner, repo, specs)| format!("{owner}/{repo}:{}", specs.join(",")))
            .collect::<Vec<_>>();
        let expect = [
            "zeta/b:one,four,one",
            "zeta/a:three",
            "alpha/a:two",
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn group_whole_repo_creates_empty_entry() -> anyhow::Result<()> {
        let group = group_by_owner(&["owner/repo", "/owner/other/", "owner/repo/**"])?;

        assert_eq!(group.get("owner", "repo"), Some(&[][..]));
        assert_eq!(group.get("owner", "other"), Some(&[][..]));
        assert_eq!(group.get("owner", "missing"), None);

        Ok(())
    }

    #[test]
    fn group_carries_negation_and_directories() -> anyhow::Result<()> {
        let group = group_by_owner(&["owner/repo/src/", "!owner/repo/src/test.rs"])?;

        let expect = ["src/**".to_string(), "!src/test.rs".to_string()];
        assert_eq!(group.get("owner", "repo"), Some(&expect[..]));

        Ok(())
    }

    #[test]
    fn group_rejects_no_input() {
        let result = group_by_owner::<&str>(&[]);
        assert!(matches!(result, Err(PlanError::NoInput)));
    }

    #[test_case("owner1", SpecDefect::MissingOwnerOrRepo; "owner only")]
    #[test_case("/", SpecDefect::Empty; "lone slash")]
    #[test_case("   ", SpecDefect::Empty; "blank")]
    #[test_case("owner/my repo", SpecDefect::Whitespace; "embedded space")]
    #[test_case("//repo/path", SpecDefect::MissingOwnerOrRepo; "empty owner")]
    #[test_case("../x/README.md", SpecDefect::RelativeSegment; "parent owner")]
    #[test_case("owner/../x", SpecDefect::RelativeSegment; "parent repo")]
    #[test_case("./repo", SpecDefect::RelativeSegment; "current owner")]
    #[test_case("!owner/./secret.txt", SpecDefect::RelativeSegment; "current repo negated")]
    #[test]
    fn group_rejects_invalid_path(path: &str, expect: SpecDefect) {
        use pretty_assertions::assert_eq;
        match group_by_owner(&["owner/repo/ok.txt", path]) {
            Err(PlanError::InvalidPathSpec { defect, .. }) => assert_eq!(defect, expect),
            other => panic!("expected invalid path spec, got {other:?}"),
        }
    }
}
