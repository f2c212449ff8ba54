// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{remote_root, remote_template, RepoFixture};

use gitpluck::{
    execute,
    fetch::{ExtractOptions, FileWrittenHook, ListOptions, OverwritePolicy},
    resolve, DownloadSettings, Git2Fetcher, Mode, RepoTarget, Store, Typo,
};

use anyhow::Result;
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tokio::runtime::Runtime;

fn fetcher() -> Result<Git2Fetcher> {
    let store = Store::open(std::env::current_dir()?.join("store"))?;
    Ok(Git2Fetcher::new(store, remote_template()?))
}

fn download(specs: &[&str], dest: impl Into<PathBuf>, extract: ExtractOptions) -> Result<Vec<Typo>> {
    let groups = resolve(specs, false, false)?;
    let mode = Mode::Download(DownloadSettings {
        dest: dest.into(),
        extract,
        on_file_written: None,
    });
    let fetcher = fetcher()?;

    Ok(Runtime::new()?.block_on(execute(&fetcher, &groups, &mode))?)
}

fn tools_fixture() -> Result<RepoFixture> {
    let fixture = RepoFixture::new(remote_root()?, "octo", "tools")?;
    fixture.commit_files(&[
        ("README.md", "read me\n"),
        ("LICENSE", "MIT\n"),
        ("src/lib.rs", "pub fn lib() {}\n"),
        ("src/bin/main.rs", "fn main() {}\n"),
        ("docs/guide.md", "guide\n"),
    ])?;
    Ok(fixture)
}

fn read(path: impl AsRef<Path>) -> Result<String> {
    Ok(read_to_string(path)?)
}

#[sealed_test]
fn download_literal_files_and_suggest_typos() -> Result<()> {
    tools_fixture()?;

    let typos = download(
        &["octo/tools/README.md", "octo/tools/src/lbi.rs"],
        "out",
        ExtractOptions::default(),
    )?;

    assert_eq!(read("out/README.md")?, "read me\n");
    assert!(!Path::new("out/LICENSE").exists());
    assert_eq!(
        typos,
        vec![Typo {
            original: "src/lbi.rs".into(),
            suggestion: "src/lib.rs".into(),
        }]
    );

    Ok(())
}

#[sealed_test]
fn download_directory_with_negation() -> Result<()> {
    tools_fixture()?;

    let typos = download(
        &["octo/tools/src/", "!octo/tools/src/bin/main.rs"],
        "out",
        ExtractOptions::default(),
    )?;

    assert!(typos.is_empty());
    assert_eq!(read("out/src/lib.rs")?, "pub fn lib() {}\n");
    assert!(!Path::new("out/src/bin/main.rs").exists());
    assert!(!Path::new("out/README.md").exists());

    Ok(())
}

#[sealed_test]
fn download_whole_repository_with_strip() -> Result<()> {
    tools_fixture()?;

    download(
        &["octo/tools"],
        "out",
        ExtractOptions {
            strip: Some(1),
            ..Default::default()
        },
    )?;

    assert_eq!(read("out/lib.rs")?, "pub fn lib() {}\n");
    assert_eq!(read("out/bin/main.rs")?, "fn main() {}\n");
    assert_eq!(read("out/guide.md")?, "guide\n");
    assert!(!Path::new("out/README.md").exists());
    assert!(!Path::new("out/src").exists());

    Ok(())
}

#[sealed_test]
fn later_repository_wins_shared_files() -> Result<()> {
    let first = RepoFixture::new(remote_root()?, "octo", "first")?;
    first.commit_files(&[("shared.txt", "first\n")])?;
    let second = RepoFixture::new(remote_root()?, "octo", "second")?;
    second.commit_files(&[("shared.txt", "second\n")])?;

    let specs = ["octo/first/shared.txt", "octo/second/shared.txt"];
    download(&specs, "overwrite", ExtractOptions::default())?;
    assert_eq!(read("overwrite/shared.txt")?, "second\n");

    let keep = ExtractOptions {
        overwrite: OverwritePolicy::KeepExisting,
        ..Default::default()
    };
    download(&specs, "keep", keep)?;
    assert_eq!(read("keep/shared.txt")?, "first\n");

    Ok(())
}

#[sealed_test]
fn directory_in_the_way_needs_force() -> Result<()> {
    tools_fixture()?;
    create_dir_all("out/README.md/nested")?;

    let result = download(&["octo/tools/README.md"], "out", ExtractOptions::default());
    assert!(result.is_err());
    assert!(Path::new("out/README.md").is_dir());

    let force = ExtractOptions {
        overwrite: OverwritePolicy::Force,
        ..Default::default()
    };
    download(&["octo/tools/README.md"], "out", force)?;
    assert_eq!(read("out/README.md")?, "read me\n");

    Ok(())
}

#[sealed_test]
fn report_every_file_written() -> Result<()> {
    tools_fixture()?;

    let written = Arc::new(Mutex::new(Vec::new()));
    let record = written.clone();
    let groups = resolve(&["octo/tools/docs/"], false, false)?;
    let mode = Mode::Download(DownloadSettings {
        dest: "out".into(),
        extract: ExtractOptions::default(),
        on_file_written: Some(FileWrittenHook::new(move |path| {
            record.lock().unwrap().push(path.to_path_buf())
        })),
    });
    let fetcher = fetcher()?;
    Runtime::new()?.block_on(execute(&fetcher, &groups, &mode))?;

    assert_eq!(
        *written.lock().unwrap(),
        vec![PathBuf::from("out/docs/guide.md")]
    );

    Ok(())
}

#[sealed_test]
fn list_conflicts_with_prefix() -> Result<()> {
    tools_fixture()?;
    create_dir_all("out/src")?;
    write("out/src/lib.rs", "local\n")?;

    let groups = resolve(&["octo/tools/src/**/*.rs"], true, false)?;
    let group = &groups[0];
    let fetcher = fetcher()?;
    let runtime = Runtime::new()?;

    let all = runtime.block_on(fetcher.listing(
        &group.target(),
        ListOptions {
            dest: "out".into(),
            conflicts_only: false,
            selection: group.selection.clone(),
            prefix: None,
        },
    ))?;
    assert_eq!(all, ["src/bin/main.rs", "src/lib.rs"]);

    let conflicts = runtime.block_on(fetcher.listing(
        &group.target(),
        ListOptions {
            dest: "out".into(),
            conflicts_only: true,
            selection: group.selection.clone(),
            prefix: Some("octo/tools/".into()),
        },
    ))?;
    assert_eq!(conflicts, ["octo/tools/src/lib.rs"]);

    Ok(())
}

#[sealed_test]
fn list_ignoring_case() -> Result<()> {
    tools_fixture()?;

    let groups = resolve(&["octo/tools/readme.*"], true, true)?;
    let target = RepoTarget {
        owner: "octo".into(),
        repo: "tools".into(),
        case_insensitive: true,
    };
    assert_eq!(groups[0].target(), target);

    let listed = Runtime::new()?.block_on(fetcher()?.listing(
        &target,
        ListOptions {
            dest: "out".into(),
            selection: groups[0].selection.clone(),
            ..Default::default()
        },
    ))?;
    assert_eq!(listed, ["README.md"]);

    Ok(())
}

#[sealed_test]
fn sync_picks_up_new_commits() -> Result<()> {
    let fixture = tools_fixture()?;
    download(&["octo/tools/README.md"], "out", ExtractOptions::default())?;

    fixture.commit_files(&[("CHANGELOG.md", "v2\n")])?;
    let typos = download(&["octo/tools/CHANGELOG.md"], "out", ExtractOptions::default())?;

    assert!(typos.is_empty());
    assert_eq!(read("out/CHANGELOG.md")?, "v2\n");

    Ok(())
}
