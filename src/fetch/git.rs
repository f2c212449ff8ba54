// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fetch engine backed by libgit2.
//!
//! Repositories are kept as bare clones in the [`Store`]. A bare clone has no
//! working tree, so files are read straight out of the HEAD commit's tree and
//! written to the destination directory. Nothing else in the destination is
//! touched.

use crate::{
    fetch::{
        typo, DownloadOptions, FetchError, Fetcher, ListOptions, OverwritePolicy, RepoTarget,
        Result, Typo,
    },
    plan::Selection,
    store::Store,
};

use auth_git2::{GitAuthenticator, Prompter};
use futures::{future::BoxFuture, FutureExt};
use git2::{build::RepoBuilder, Config, FetchOptions, ObjectType, Oid, RemoteCallbacks, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    collections::VecDeque,
    fs::{metadata, remove_dir_all, symlink_metadata, write},
    io::Write,
    path::Path,
    time::{self, Duration, SystemTime},
};
use tracing::{debug, info, instrument, warn};

/// Default remote URL template.
pub const DEFAULT_REMOTE: &str = "https://github.com/{owner}/{repo}.git";

/// Fetch engine that clones repositories through libgit2.
#[derive(Debug, Clone)]
pub struct Git2Fetcher {
    store: Store,
    remote: String,
    progress: bool,
}

impl Git2Fetcher {
    /// Construct new libgit2 fetcher.
    ///
    /// The `remote` template gets `{owner}` and `{repo}` replaced to form the
    /// URL of each repository.
    pub fn new(store: Store, remote: impl Into<String>) -> Self {
        Self {
            store,
            remote: remote.into(),
            progress: false,
        }
    }

    /// Show transfer progress while cloning or fetching.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Remote URL of target repository.
    pub fn remote_url(&self, target: &RepoTarget) -> String {
        self.remote
            .replace("{owner}", &target.owner)
            .replace("{repo}", &target.repo)
    }

    /// Collect the lines [`Fetcher::list`] prints for target repository.
    ///
    /// # Errors
    ///
    /// - Return [`FetchError`] if the repository cannot be synced or read.
    pub async fn listing(&self, target: &RepoTarget, options: ListOptions) -> Result<Vec<String>> {
        let fetcher = self.clone();
        let target = target.clone();
        tokio::task::spawn_blocking(move || fetcher.listing_blocking(&target, &options)).await?
    }

    fn listing_blocking(&self, target: &RepoTarget, options: &ListOptions) -> Result<Vec<String>> {
        let repository = self.sync(target)?;
        let entries = list_tree_entries(&repository)?;
        let (selected, _) = select(&entries, &options.selection, target.case_insensitive);
        let prefix = options.prefix.as_deref().unwrap_or_default();

        Ok(selected
            .into_iter()
            .filter(|entry| !options.conflicts_only || options.dest.join(&entry.path).exists())
            .map(|entry| format!("{prefix}{}", entry.path))
            .collect())
    }

    fn download_blocking(&self, target: &RepoTarget, options: &DownloadOptions) -> Result<Vec<Typo>> {
        let repository = self.sync(target)?;
        let entries = list_tree_entries(&repository)?;
        let commit_time = head_commit_time(&repository)?;
        let (selected, unmatched) = select(&entries, &options.selection, target.case_insensitive);
        let strip = options.extract.strip.unwrap_or(0);

        for entry in selected {
            let Some(relative) = strip_components(&entry.path, strip) else {
                debug!("nothing left of {:?} after stripping {strip}", entry.path);
                continue;
            };

            let dest = options.dest.join(relative);
            if !should_write(&dest, options.extract.overwrite, commit_time) {
                info!("keep existing {:?}", dest.display());
                continue;
            }

            let blob = repository.find_blob(entry.oid)?;
            write_file(&dest, blob.content(), entry.mode, options.extract.overwrite)?;
            debug!("wrote {:?}", dest.display());

            if let Some(hook) = &options.on_file_written {
                hook.call(&dest);
            }
        }

        let typos = unmatched
            .into_iter()
            .filter_map(|original| {
                typo::suggest(original, entries.iter().map(|entry| entry.path.as_str())).map(
                    |suggestion| Typo {
                        original: original.to_owned(),
                        suggestion: suggestion.to_owned(),
                    },
                )
            })
            .collect();

        Ok(typos)
    }

    // INVARIANT: Store entry reflects the remote's current HEAD on success.
    #[instrument(skip(self), level = "debug")]
    fn sync(&self, target: &RepoTarget) -> Result<Repository> {
        let bar = if self.progress {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        bar.set_style(style);
        bar.set_message(target.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        let prompter = IndicatifPrompter::new(bar.clone());
        let authenticator = GitAuthenticator::default().set_prompter(prompter);
        let config = Config::open_default()?;

        let progress_bar = bar.clone();
        let mut throttle = time::Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(move |progress| {
            if throttle.elapsed() > Duration::from_millis(10) {
                throttle = time::Instant::now();
                progress_bar.set_length(progress.total_objects() as u64);
                progress_bar.set_position(progress.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);

        let repository = match self.store.open_entry(target)? {
            Some(repository) => {
                info!("fetch {target}");
                repository
                    .find_remote("origin")?
                    .fetch(&[] as &[&str], Some(&mut fo), None)?;
                fast_forward_head(&repository)?;
                repository
            }
            None => {
                let url = self.remote_url(target);
                info!("clone {target} from {url}");
                RepoBuilder::new()
                    .bare(true)
                    .fetch_options(fo)
                    .clone(&url, &self.store.entry_path(target))?
            }
        };
        bar.finish_and_clear();

        Ok(repository)
    }
}

impl Fetcher for Git2Fetcher {
    fn list<'a>(&'a self, target: &'a RepoTarget, options: ListOptions) -> BoxFuture<'a, Result<()>> {
        async move {
            let lines = self.listing(target, options).await?;
            let mut stdout = std::io::stdout().lock();
            for line in lines {
                writeln!(stdout, "{line}")?;
            }

            Ok(())
        }
        .boxed()
    }

    fn download_to<'a>(
        &'a self,
        target: &'a RepoTarget,
        options: DownloadOptions,
    ) -> BoxFuture<'a, Result<Vec<Typo>>> {
        let fetcher = self.clone();
        let target = target.clone();
        async move {
            tokio::task::spawn_blocking(move || fetcher.download_blocking(&target, &options)).await?
        }
        .boxed()
    }
}

/// File found in a repository tree.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TreeEntry {
    path: String,
    oid: Oid,
    mode: i32,
}

// Thank you Eric at https://www.hydrogen18.com/blog/list-all-files-git-repo-pygit2.html.
fn list_tree_entries(repository: &Repository) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let tree = repository.head()?.peel_to_commit()?.tree()?;
    let mut trees_and_paths = VecDeque::new();
    trees_and_paths.push_front((tree, String::new()));

    // Use DFS to traverse commit tree.
    while let Some((tree, prefix)) = trees_and_paths.pop_front() {
        for tree_entry in &tree {
            let Some(name) = tree_entry.name() else {
                warn!("skip non-UTF-8 entry under {prefix:?}");
                continue;
            };
            let path = format!("{prefix}{name}");

            match tree_entry.kind() {
                // INVARIANT: Hit a tree? Traverse it!
                Some(ObjectType::Tree) => {
                    let next_tree = repository.find_tree(tree_entry.id())?;
                    trees_and_paths.push_front((next_tree, format!("{path}/")));
                }
                // INVARIANT: Hit a blob? Record our current path!
                Some(ObjectType::Blob) => entries.push(TreeEntry {
                    path,
                    oid: tree_entry.id(),
                    mode: tree_entry.filemode(),
                }),
                _ => continue,
            }
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

// Returns selected entries, and the literal paths that matched nothing.
fn select<'e, 's>(
    entries: &'e [TreeEntry],
    selection: &'s Selection,
    case_insensitive: bool,
) -> (Vec<&'e TreeEntry>, Vec<&'s str>) {
    match selection {
        Selection::WholeRepo => (entries.iter().collect(), Vec::new()),
        Selection::CompiledPattern(pattern) => (
            entries
                .iter()
                .filter(|entry| pattern.is_match(&entry.path))
                .collect(),
            Vec::new(),
        ),
        Selection::LiteralFiles(paths) => {
            let mut selected = Vec::new();
            let mut unmatched = Vec::new();
            for requested in paths {
                let found = entries.iter().find(|entry| {
                    if case_insensitive {
                        entry.path.to_lowercase() == requested.to_lowercase()
                    } else {
                        entry.path == *requested
                    }
                });
                match found {
                    Some(entry) => selected.push(entry),
                    None => unmatched.push(requested.as_str()),
                }
            }
            (selected, unmatched)
        }
    }
}

fn strip_components(path: &str, strip: usize) -> Option<&str> {
    if strip == 0 {
        return Some(path);
    }

    path.splitn(strip + 1, '/')
        .nth(strip)
        .filter(|rest| !rest.is_empty())
}

fn should_write(dest: &Path, policy: OverwritePolicy, commit_time: SystemTime) -> bool {
    match policy {
        OverwritePolicy::Overwrite | OverwritePolicy::Force => true,
        OverwritePolicy::KeepExisting => symlink_metadata(dest).is_err(),
        OverwritePolicy::KeepNewer => match metadata(dest).and_then(|meta| meta.modified()) {
            Ok(modified) => modified <= commit_time,
            Err(_) => true,
        },
    }
}

fn write_file(dest: &Path, content: &[u8], mode: i32, policy: OverwritePolicy) -> Result<()> {
    let write_error = |err| FetchError::Write {
        source: err,
        path: dest.to_path_buf(),
    };

    if dest.is_dir() {
        if policy != OverwritePolicy::Force {
            return Err(FetchError::DirectoryInTheWay {
                path: dest.to_path_buf(),
            });
        }
        remove_dir_all(dest).map_err(write_error)?;
    }

    if let Some(parent) = dest.parent() {
        mkdirp::mkdirp(parent).map_err(write_error)?;
    }
    write(dest, content).map_err(write_error)?;

    #[cfg(unix)]
    if mode == i32::from(git2::FileMode::BlobExecutable) {
        use std::{fs::set_permissions, os::unix::fs::PermissionsExt};
        set_permissions(dest, PermissionsExt::from_mode(0o755)).map_err(write_error)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    Ok(())
}

fn head_commit_time(repository: &Repository) -> Result<SystemTime> {
    let seconds = repository.head()?.peel_to_commit()?.time().seconds();
    Ok(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds.max(0) as u64))
}

// Bare clones track the remote through "refs/remotes/origin/*", so a fetch
// alone leaves the local branch HEAD points at behind.
fn fast_forward_head(repository: &Repository) -> Result<()> {
    let head = repository.head()?;
    let Some(branch) = head.shorthand().map(str::to_owned) else {
        return Ok(());
    };

    match repository.refname_to_id(&format!("refs/remotes/origin/{branch}")) {
        Ok(oid) => {
            repository.reference(
                &format!("refs/heads/{branch}"),
                oid,
                true,
                "gitpluck: fast-forward to origin",
            )?;
        }
        Err(err) => warn!("cannot fast-forward {branch}: {err}"),
    }

    Ok(())
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    pub(crate) bar: ProgressBar,
}

impl IndicatifPrompter {
    /// Construct new progress bar authenticator.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| {
            let username = Text::new("username").prompt().ok()?;
            let password = Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()?;
            Some((username, password))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| {
            Password::new("password")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| {
            Password::new("passphrase")
                .without_confirmation()
                .prompt()
                .ok()
        })
    }
}
