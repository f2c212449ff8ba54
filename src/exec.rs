// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Plan execution.
//!
//! Runs each [`ResolvedGroup`] of a plan through a [`Fetcher`], strictly one
//! after another, in plan order. There is no parallelism across groups, since
//! later groups are allowed to overwrite what earlier groups wrote.

use crate::{
    fetch::{
        DownloadOptions, ExtractOptions, FetchError, Fetcher, FileWrittenHook, ListOptions,
        RepoTarget, Typo,
    },
    plan::ResolvedGroup,
};

use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// What to do with each group.
#[derive(Debug, Clone)]
pub enum Mode {
    List(ListSettings),
    Download(DownloadSettings),
}

impl Mode {
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

/// Settings shared by every list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListSettings {
    pub dest: PathBuf,
    pub conflicts_only: bool,

    /// Prefix listed paths with `owner/repo/`.
    pub prefix: bool,
}

/// Settings shared by every download call.
#[derive(Debug, Clone, Default)]
pub struct DownloadSettings {
    pub dest: PathBuf,
    pub extract: ExtractOptions,
    pub on_file_written: Option<FileWrittenHook>,
}

/// Execute plan group by group.
///
/// Every engine call is awaited before the next one starts. The first failure
/// stops the run; groups already done stay done.
///
/// # Errors
///
/// - Return [`ExecError::Provider`] naming the group whose engine call failed.
#[instrument(skip_all, fields(groups = groups.len()), level = "debug")]
pub async fn execute(
    fetcher: &dyn Fetcher,
    groups: &[ResolvedGroup],
    mode: &Mode,
) -> Result<Vec<Typo>> {
    let mut typos = Vec::new();

    for group in groups {
        let target = group.target();
        match mode {
            Mode::List(settings) => {
                debug!("list {target}");
                let options = ListOptions {
                    dest: settings.dest.clone(),
                    conflicts_only: settings.conflicts_only,
                    selection: group.selection.clone(),
                    prefix: settings.prefix.then(|| format!("{target}/")),
                };
                fetcher
                    .list(&target, options)
                    .await
                    .map_err(|source| provider_error(&target, source))?;
            }
            Mode::Download(settings) => {
                info!("download {target}");
                let options = DownloadOptions {
                    dest: settings.dest.clone(),
                    selection: group.selection.clone(),
                    extract: settings.extract,
                    on_file_written: settings.on_file_written.clone(),
                };
                let found = fetcher
                    .download_to(&target, options)
                    .await
                    .map_err(|source| provider_error(&target, source))?;
                typos.extend(found);
            }
        }
    }

    Ok(typos)
}

fn provider_error(target: &RepoTarget, source: FetchError) -> ExecError {
    ExecError::Provider {
        owner: target.owner.clone(),
        repo: target.repo.clone(),
        source,
    }
}

/// Execution error types.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Fetch engine failed on a group.
    #[error("failed to process {owner}/{repo}")]
    Provider {
        owner: String,
        repo: String,
        #[source]
        source: FetchError,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ExecError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fetch::OverwritePolicy,
        plan::{resolve, Selection},
    };

    use futures::{future::BoxFuture, FutureExt};
    use pretty_assertions::assert_eq;
    use std::{
        path::Path,
        sync::{Arc, Mutex},
    };

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        List {
            target: String,
            selection: Selection,
            prefix: Option<String>,
            conflicts_only: bool,
        },
        Download {
            target: String,
            selection: Selection,
            extract: ExtractOptions,
        },
    }

    #[derive(Debug, Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail_on: Option<String>,
        typos: Vec<(String, Typo)>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn check(&self, target: &RepoTarget) -> crate::fetch::Result<()> {
            match &self.fail_on {
                Some(name) if *name == target.to_string() => {
                    Err(std::io::Error::other("connection reset").into())
                }
                _ => Ok(()),
            }
        }
    }

    impl Fetcher for Recorder {
        fn list<'a>(
            &'a self,
            target: &'a RepoTarget,
            options: ListOptions,
        ) -> BoxFuture<'a, crate::fetch::Result<()>> {
            async move {
                self.calls.lock().unwrap().push(Call::List {
                    target: target.to_string(),
                    selection: options.selection,
                    prefix: options.prefix,
                    conflicts_only: options.conflicts_only,
                });
                self.check(target)
            }
            .boxed()
        }

        fn download_to<'a>(
            &'a self,
            target: &'a RepoTarget,
            options: DownloadOptions,
        ) -> BoxFuture<'a, crate::fetch::Result<Vec<Typo>>> {
            async move {
                self.calls.lock().unwrap().push(Call::Download {
                    target: target.to_string(),
                    selection: options.selection,
                    extract: options.extract,
                });
                if let Some(hook) = &options.on_file_written {
                    hook.call(Path::new("written.txt"));
                }
                self.check(target)?;

                Ok(self
                    .typos
                    .iter()
                    .filter(|(name, _)| *name == target.to_string())
                    .map(|(_, typo)| typo.clone())
                    .collect())
            }
            .boxed()
        }
    }

    fn download() -> Mode {
        Mode::Download(DownloadSettings {
            dest: PathBuf::from("out"),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn execute_calls_engine_in_plan_order() -> anyhow::Result<()> {
        let recorder = Recorder::default();
        let groups = resolve(&["owner1/repo/a.txt", "owner2/repo/b.txt"], false, false)?;

        execute(&recorder, &groups, &download()).await?;

        let result = recorder.calls();
        let expect = vec![
            Call::Download {
                target: "owner1/repo".into(),
                selection: Selection::LiteralFiles(vec!["a.txt".into()]),
                extract: ExtractOptions::default(),
            },
            Call::Download {
                target: "owner2/repo".into(),
                selection: Selection::LiteralFiles(vec!["b.txt".into()]),
                extract: ExtractOptions::default(),
            },
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[tokio::test]
    async fn execute_empty_plan_calls_nothing() -> anyhow::Result<()> {
        let recorder = Recorder::default();

        let typos = execute(&recorder, &[], &download()).await?;

        assert!(typos.is_empty());
        assert!(recorder.calls().is_empty());
        assert!(!Path::new("out").exists());

        Ok(())
    }

    #[tokio::test]
    async fn execute_list_mode() -> anyhow::Result<()> {
        let recorder = Recorder::default();
        let mode = Mode::List(ListSettings {
            dest: PathBuf::from("."),
            conflicts_only: true,
            prefix: true,
        });
        let groups = resolve(&["octo/tools", "octo/site/docs/"], mode.is_list(), false)?;

        execute(&recorder, &groups, &mode).await?;

        let result = recorder.calls();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result[0],
            Call::List {
                target: "octo/tools".into(),
                selection: Selection::WholeRepo,
                prefix: Some("octo/tools/".into()),
                conflicts_only: true,
            }
        );
        assert!(matches!(
            &result[1],
            Call::List { selection: Selection::CompiledPattern(_), .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn execute_stops_at_first_failure() -> anyhow::Result<()> {
        let recorder = Recorder {
            fail_on: Some("b/two".into()),
            ..Default::default()
        };
        let groups = resolve(&["a/one", "b/two", "c/three"], false, false)?;

        let result = execute(&recorder, &groups, &download()).await;

        match result {
            Err(ExecError::Provider { owner, repo, .. }) => {
                assert_eq!((owner.as_str(), repo.as_str()), ("b", "two"));
            }
            other => panic!("expected provider error, got {other:?}"),
        }
        let targets = recorder
            .calls()
            .into_iter()
            .map(|call| match call {
                Call::Download { target, .. } | Call::List { target, .. } => target,
            })
            .collect::<Vec<_>>();
        assert_eq!(targets, ["a/one", "b/two"]);

        Ok(())
    }

    #[tokio::test]
    async fn execute_collects_typos_and_forwards_settings() -> anyhow::Result<()> {
        let typo = |original: &str, suggestion: &str| Typo {
            original: original.into(),
            suggestion: suggestion.into(),
        };
        let recorder = Recorder {
            typos: vec![
                ("b/two".into(), typo("READEM.md", "README.md")),
                ("a/one".into(), typo("mian.rs", "main.rs")),
            ],
            ..Default::default()
        };
        let written = Arc::new(Mutex::new(Vec::new()));
        let sink = written.clone();
        let extract = ExtractOptions {
            overwrite: OverwritePolicy::KeepNewer,
            strip: Some(1),
        };
        let mode = Mode::Download(DownloadSettings {
            dest: PathBuf::from("out"),
            extract,
            on_file_written: Some(FileWrittenHook::new(move |path| {
                sink.lock().unwrap().push(path.to_path_buf());
            })),
        });
        let groups = resolve(&["a/one/mian.rs", "b/two/READEM.md"], false, false)?;

        let typos = execute(&recorder, &groups, &mode).await?;

        assert_eq!(
            typos,
            [typo("mian.rs", "main.rs"), typo("READEM.md", "README.md")]
        );
        assert_eq!(written.lock().unwrap().len(), 2);
        assert!(recorder.calls().iter().all(|call| matches!(
            call,
            Call::Download { extract: forwarded, .. } if *forwarded == extract
        )));

        Ok(())
    }
}
